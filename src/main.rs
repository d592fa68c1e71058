use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use fxdash::core::log::init_logging;
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Show the latest exchange rates
    Rates {
        /// Base (pivot) currency, e.g. USD
        #[arg(short, long)]
        base: Option<String>,
        /// Comma-separated currencies to show
        #[arg(short, long, value_delimiter = ',')]
        targets: Option<Vec<String>>,
        /// Amount of the base currency to convert
        #[arg(short, long, allow_negative_numbers = true)]
        amount: Option<f64>,
        /// Also write the table to this CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Convert an amount between two currencies
    Convert {
        #[arg(allow_negative_numbers = true)]
        amount: f64,
        from: String,
        to: String,
        /// Snapshot to convert through
        #[arg(short, long)]
        base: Option<String>,
    },
    /// Show current weather and the forecast for a Korean city
    Weather {
        /// Korean or English city name
        city: Option<String>,
        /// Number of forecast days (1-16)
        #[arg(short, long)]
        days: Option<u8>,
        /// Include the next 24 hours
        #[arg(long)]
        hourly: bool,
    },
    /// Chat with an OpenAI-compatible model
    Chat {
        #[arg(short, long)]
        model: Option<String>,
        #[arg(short, long)]
        temperature: Option<f32>,
        /// System prompt sent before the conversation
        #[arg(short, long = "system")]
        system_prompt: Option<String>,
    },
}

impl From<Commands> for fxdash::AppCommand {
    fn from(cmd: Commands) -> fxdash::AppCommand {
        match cmd {
            Commands::Rates {
                base,
                targets,
                amount,
                csv,
            } => fxdash::AppCommand::Rates {
                base,
                targets,
                amount,
                csv,
            },
            Commands::Convert {
                amount,
                from,
                to,
                base,
            } => fxdash::AppCommand::Convert {
                amount,
                from,
                to,
                base,
            },
            Commands::Weather { city, days, hourly } => {
                fxdash::AppCommand::Weather { city, days, hourly }
            }
            Commands::Chat {
                model,
                temperature,
                system_prompt,
            } => fxdash::AppCommand::Chat {
                model,
                temperature,
                system_prompt,
            },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => fxdash::cli::setup::setup(),
        Some(cmd) => fxdash::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> fxdash::AppCommand {
        let cli = Cli::try_parse_from(args.iter().copied()).unwrap();
        cli.command.unwrap().into()
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_convert_accepts_negative_amount() {
        assert_eq!(
            parse(&["fxdash", "convert", "-5", "USD", "KRW"]),
            fxdash::AppCommand::Convert {
                amount: -5.0,
                from: "USD".to_string(),
                to: "KRW".to_string(),
                base: None,
            }
        );
    }

    #[test]
    fn test_rates_accepts_negative_amount_and_targets() {
        assert_eq!(
            parse(&["fxdash", "rates", "--amount", "-12.5", "-t", "KRW,EUR"]),
            fxdash::AppCommand::Rates {
                base: None,
                targets: Some(vec!["KRW".to_string(), "EUR".to_string()]),
                amount: Some(-12.5),
                csv: None,
            }
        );
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "fxdash", "convert", "1", "USD", "EUR", "-v", "-c", "x.yaml",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config_path.as_deref(), Some("x.yaml"));
    }
}
