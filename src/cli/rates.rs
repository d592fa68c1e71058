use super::ui;
use crate::core::currency::{RateSnapshot, RateSnapshotProvider};
use anyhow::{Context, Result};
use comfy_table::{Attribute, Cell};
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

const EXAMPLE_KRW_AMOUNT: f64 = 10_000.0;

pub struct RatesOptions {
    pub base: String,
    pub targets: Vec<String>,
    pub amount: f64,
    pub csv: Option<PathBuf>,
}

pub async fn run(provider: &dyn RateSnapshotProvider, options: &RatesOptions) -> Result<()> {
    let snapshot = fetch_snapshot(provider, &options.base).await?;

    let selected = snapshot.select(&options.targets);
    if selected.is_empty() {
        println!(
            "{}",
            ui::style_text(
                "No currencies to display. Check the configured targets.",
                ui::StyleType::Warning
            )
        );
        return Ok(());
    }

    println!(
        "{} {}  |  {} {}",
        ui::style_text("Base currency:", ui::StyleType::Label),
        ui::style_text(snapshot.pivot(), ui::StyleType::Value),
        ui::style_text("Updated (UTC):", ui::StyleType::Label),
        format_updated(&snapshot),
    );
    println!("{}", display_rates_table(&snapshot, &selected, options.amount));

    if let Some(line) = example_line(&snapshot) {
        println!("{}", ui::style_text(&line, ui::StyleType::Subtle));
    }

    if let Some(path) = &options.csv {
        let written = write_csv_file(path, &snapshot, &selected, options.amount)?;
        println!("Saved CSV to {}", written.display());
    }

    Ok(())
}

pub async fn run_convert(
    provider: &dyn RateSnapshotProvider,
    base: &str,
    amount: f64,
    from: &str,
    to: &str,
) -> Result<()> {
    let snapshot = fetch_snapshot(provider, base).await?;
    let converted = snapshot.convert(amount, from, to)?;

    println!(
        "{} {} = {} {}",
        ui::format_amount(amount, 2),
        from.trim().to_uppercase(),
        ui::style_text(&ui::format_amount(converted, 2), ui::StyleType::Value),
        to.trim().to_uppercase(),
    );
    println!(
        "{}",
        ui::style_text(
            &format!(
                "Rates quoted against {} as of {} UTC",
                snapshot.pivot(),
                format_updated(&snapshot)
            ),
            ui::StyleType::Subtle
        )
    );
    Ok(())
}

async fn fetch_snapshot(provider: &dyn RateSnapshotProvider, base: &str) -> Result<RateSnapshot> {
    let pb = ui::new_spinner("Fetching exchange rates...");
    let result = provider.latest(base).await;
    pb.finish_and_clear();
    result.with_context(|| format!("Failed to fetch exchange rates for {base}"))
}

fn format_updated(snapshot: &RateSnapshot) -> String {
    snapshot
        .observed_at_utc()
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn amount_header(snapshot: &RateSnapshot, amount: f64) -> String {
    format!("{amount:.2} {}", snapshot.pivot())
}

fn display_rates_table(
    snapshot: &RateSnapshot,
    selected: &BTreeMap<String, f64>,
    amount: f64,
) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Currency"),
        ui::header_cell("Rate"),
        ui::header_cell(&format!("{} →", amount_header(snapshot, amount))),
    ]);

    for (code, rate) in selected {
        table.add_row(vec![
            Cell::new(code).add_attribute(Attribute::Bold),
            ui::number_cell(format!("{rate:.4}")),
            ui::number_cell(ui::format_amount(amount * rate, 2)),
        ]);
    }
    table.to_string()
}

/// The "10,000 KRW in the pivot" hint, when the snapshot can convert it.
fn example_line(snapshot: &RateSnapshot) -> Option<String> {
    let converted = snapshot
        .convert(EXAMPLE_KRW_AMOUNT, "KRW", snapshot.pivot())
        .ok()?;
    Some(format!(
        "e.g. {} KRW → {}: {} {}",
        ui::format_amount(EXAMPLE_KRW_AMOUNT, 0),
        snapshot.pivot(),
        ui::format_amount(converted, 2),
        snapshot.pivot()
    ))
}

/// Writes the rates table as CSV, with the header `currency,rate,<amount> <BASE>`.
pub fn write_csv<W: io::Write>(
    writer: W,
    snapshot: &RateSnapshot,
    selected: &BTreeMap<String, f64>,
    amount: f64,
) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    let header = amount_header(snapshot, amount);
    wtr.write_record(["currency", "rate", header.as_str()])?;
    for (code, rate) in selected {
        let rate_text = rate.to_string();
        let converted = ui::format_amount(amount * rate, 2);
        wtr.write_record([code.as_str(), rate_text.as_str(), converted.as_str()])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes the CSV to `path`, or to `rates_<BASE>.csv` inside it when `path`
/// is a directory. Returns the file written.
fn write_csv_file(
    path: &Path,
    snapshot: &RateSnapshot,
    selected: &BTreeMap<String, f64>,
    amount: f64,
) -> Result<PathBuf> {
    let target = if path.is_dir() {
        path.join(format!("rates_{}.csv", snapshot.pivot()))
    } else {
        path.to_path_buf()
    };
    let file = std::fs::File::create(&target)
        .with_context(|| format!("Failed to create CSV file: {}", target.display()))?;
    write_csv(file, snapshot, selected, amount)
        .with_context(|| format!("Failed to write CSV file: {}", target.display()))?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn snapshot() -> RateSnapshot {
        RateSnapshot::new(
            "USD",
            1_700_000_000,
            [("KRW", 1300.0), ("JPY", 150.0), ("EUR", 0.92)],
        )
        .unwrap()
    }

    #[test]
    fn test_write_csv() {
        let snapshot = snapshot();
        let selected = snapshot.select(["krw", "EUR", "XXX"]);
        let mut buf = Vec::new();

        write_csv(&mut buf, &snapshot, &selected, 100.0).unwrap();

        let output = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "currency,rate,100.00 USD");
        assert_eq!(lines[1], "EUR,0.92,92.00");
        assert_eq!(lines[2], "KRW,1300,\"130,000.00\"");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_write_csv_file_into_directory() {
        let temp_dir = TempDir::new().unwrap();
        let snapshot = snapshot();
        let selected = snapshot.select(["JPY"]);

        let written = write_csv_file(temp_dir.path(), &snapshot, &selected, 1.0).unwrap();

        assert_eq!(written, temp_dir.path().join("rates_USD.csv"));
        let content = std::fs::read_to_string(written).unwrap();
        assert!(content.starts_with("currency,rate,1.00 USD\n"));
        assert!(content.contains("JPY,150,150.00"));
    }

    #[test]
    fn test_example_line() {
        let line = example_line(&snapshot()).unwrap();
        assert_eq!(line, "e.g. 10,000 KRW → USD: 7.69 USD");

        let no_krw = RateSnapshot::new("USD", 0, [("EUR", 0.92)]).unwrap();
        assert!(example_line(&no_krw).is_none());

        let krw_pivot = RateSnapshot::new("KRW", 0, [("USD", 0.00077)]).unwrap();
        assert_eq!(
            example_line(&krw_pivot).unwrap(),
            "e.g. 10,000 KRW → KRW: 10,000.00 KRW"
        );
    }

    #[test]
    fn test_display_rates_table() {
        let snapshot = snapshot();
        let selected = snapshot.select(["KRW"]);
        let table = display_rates_table(&snapshot, &selected, 100.0);

        assert!(table.contains("KRW"));
        assert!(table.contains("1300.0000"));
        assert!(table.contains("130,000.00"));
        assert!(table.contains("100.00 USD"));
    }

    #[test]
    fn test_format_updated() {
        assert_eq!(format_updated(&snapshot()), "2023-11-14 22:13:20");
    }
}
