use super::ui;
use crate::core::chat::{ChatError, ChatProvider, ChatSession};
use crate::core::error::FetchError;
use anyhow::Result;
use std::io::Write;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

#[derive(Debug, PartialEq)]
enum Input<'a> {
    Quit,
    Reset,
    Model(Option<&'a str>),
    Help,
    Unknown(&'a str),
    Message(&'a str),
}

fn parse_input(line: &str) -> Input<'_> {
    let Some(command) = line.strip_prefix('/') else {
        return Input::Message(line);
    };
    let (name, arg) = match command.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, Some(arg.trim()).filter(|a| !a.is_empty())),
        None => (command, None),
    };
    match name {
        "quit" | "exit" => Input::Quit,
        "reset" => Input::Reset,
        "model" => Input::Model(arg),
        "help" => Input::Help,
        _ => Input::Unknown(line),
    }
}

fn error_hint(error: &ChatError) -> Option<&'static str> {
    match error {
        ChatError::Unauthorized | ChatError::MissingApiKey => {
            Some("Check chat.api_key in the config or the OPENAI_API_KEY variable.")
        }
        ChatError::ModelNotAvailable(_) => Some("Switch models with /model NAME."),
        ChatError::RateLimited => Some("Wait a moment before sending again."),
        ChatError::Fetch(FetchError::Network(_) | FetchError::Timeout(_)) => {
            Some("Is the server at chat.base_url reachable?")
        }
        _ => None,
    }
}

const HELP: &str = "Commands: /model [NAME], /reset, /help, /quit";

/// Runs the interactive chat loop until `/quit` or end of input.
///
/// A failed request leaves the transcript as it was before the message was
/// sent, so the user can retry.
pub async fn run<R, W>(
    provider: &dyn ChatProvider,
    session: &mut ChatSession,
    input: R,
    out: &mut W,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    writeln!(
        out,
        "{} {}",
        ui::style_text("Chatting with", ui::StyleType::Label),
        ui::style_text(session.model(), ui::StyleType::Value)
    )?;
    writeln!(out, "{}", ui::style_text(HELP, ui::StyleType::Subtle))?;

    loop {
        write!(out, "\n> ")?;
        out.flush()?;
        let Some(line) = lines.next_line().await? else {
            writeln!(out)?;
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match parse_input(line) {
            Input::Quit => break,
            Input::Help => writeln!(out, "{HELP}")?,
            Input::Reset => {
                session.reset();
                writeln!(out, "Conversation cleared.")?;
            }
            Input::Model(None) => writeln!(out, "Current model: {}", session.model())?,
            Input::Model(Some(name)) => {
                if session.set_model(name) {
                    writeln!(
                        out,
                        "Switched to {}. Conversation cleared.",
                        session.model()
                    )?;
                } else {
                    writeln!(out, "Already using {}.", session.model())?;
                }
            }
            Input::Unknown(command) => writeln!(
                out,
                "{}",
                ui::style_text(
                    &format!("Unknown command: {command}. {HELP}"),
                    ui::StyleType::Warning
                )
            )?,
            Input::Message(text) => {
                session.push_user(text);
                let pb = ui::new_spinner("Thinking...");
                let result = provider.complete(&session.request()).await;
                pb.finish_and_clear();
                match result {
                    Ok(reply) => {
                        session.push_assistant(&reply);
                        writeln!(out, "{reply}")?;
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "Chat completion failed");
                        session.discard_pending();
                        writeln!(
                            out,
                            "{}",
                            ui::style_text(&format!("Error: {e}"), ui::StyleType::Error)
                        )?;
                        if let Some(hint) = error_hint(&e) {
                            writeln!(out, "{}", ui::style_text(hint, ui::StyleType::Subtle))?;
                        }
                    }
                }
            }
        }
    }

    Ok(())
}
