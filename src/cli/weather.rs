use super::ui;
use crate::core::weather::{
    City, CurrentWeather, DailyForecast, Forecast, ForecastOptions, HourlyForecast, Location,
    Units, WeatherCondition, WeatherError, WeatherProvider,
};
use anyhow::{Context, Result};
use comfy_table::{Attribute, Cell};

const HOURLY_ROWS: usize = 24;

pub async fn run(
    provider: &dyn WeatherProvider,
    city_name: &str,
    options: &ForecastOptions,
) -> Result<()> {
    let city = City::lookup(city_name)?;

    let pb = ui::new_spinner(&format!("Fetching weather for {}...", city.name));
    let result = async {
        let location = provider.geocode(&city).await?;
        let forecast = provider.forecast(&location, options).await?;
        Ok::<_, WeatherError>((location, forecast))
    }
    .await;
    pb.finish_and_clear();
    let (location, forecast) =
        result.with_context(|| format!("Failed to fetch weather for {}", city.name))?;

    println!("{}", display_location(&location, &forecast));
    println!("{}", display_current(&forecast.current, &forecast.units));

    if !forecast.daily.is_empty() {
        println!(
            "\n{}",
            ui::style_text("📅 Daily forecast", ui::StyleType::Title)
        );
        println!("{}", display_daily(&forecast.daily));
    }

    if options.hourly && !forecast.hourly.is_empty() {
        println!(
            "\n{}",
            ui::style_text("🕒 Next 24 hours", ui::StyleType::Title)
        );
        println!("{}", display_hourly(&forecast.hourly, &forecast.hourly_units));
    }

    Ok(())
}

fn display_location(location: &Location, forecast: &Forecast) -> String {
    let mut parts = vec![location.name.clone()];
    if let Some(admin1) = &location.admin1 {
        parts.push(admin1.clone());
    }
    if let Some(country) = &location.country {
        parts.push(country.clone());
    }
    format!(
        "{} ({:.4}, {:.4}) {}",
        ui::style_text(&parts.join(", "), ui::StyleType::Title),
        location.latitude,
        location.longitude,
        ui::style_text(&forecast.timezone, ui::StyleType::Subtle),
    )
}

fn with_unit(unit: &str) -> impl Fn(f64) -> String + '_ {
    move |v| format!("{v:.1}{unit}")
}

fn condition_label(code: Option<i32>) -> String {
    code.map(WeatherCondition::from_wmo_code)
        .map(|c| format!("{} {}", c.emoji(), c))
        .unwrap_or_else(|| "—".to_string())
}

fn display_current(current: &CurrentWeather, units: &Units) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("At"),
        ui::header_cell("Now"),
        ui::header_cell("Temp"),
        ui::header_cell("Feels"),
        ui::header_cell("Humidity"),
        ui::header_cell("Precip."),
        ui::header_cell("Wind"),
    ]);
    table.add_row(vec![
        ui::format_optional_cell(current.time, |t| t.format("%H:%M").to_string()),
        Cell::new(condition_label(current.weather_code)).add_attribute(Attribute::Bold),
        ui::format_optional_cell(current.temperature, with_unit(&units.temperature)),
        ui::format_optional_cell(current.apparent_temperature, with_unit(&units.temperature)),
        ui::format_optional_cell(current.humidity, with_unit(&units.humidity)),
        ui::format_optional_cell(current.precipitation, with_unit(&units.precipitation)),
        ui::format_optional_cell(current.wind_speed, with_unit(&units.wind_speed)),
    ]);
    table.to_string()
}

fn display_daily(daily: &[DailyForecast]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Date"),
        ui::header_cell("Max °C"),
        ui::header_cell("Min °C"),
        ui::header_cell("Rain mm"),
        ui::header_cell("Sunrise"),
        ui::header_cell("Sunset"),
    ]);
    for day in daily {
        table.add_row(vec![
            Cell::new(day.date.format("%Y-%m-%d (%a)")),
            ui::format_optional_cell(day.temperature_max, |v| format!("{v:.1}")),
            ui::format_optional_cell(day.temperature_min, |v| format!("{v:.1}")),
            ui::format_optional_cell(day.precipitation_sum, |v| format!("{v:.1}")),
            ui::format_optional_cell(day.sunrise, |t| t.format("%H:%M").to_string()),
            ui::format_optional_cell(day.sunset, |t| t.format("%H:%M").to_string()),
        ]);
    }
    table.to_string()
}

// Only the first 24 entries are shown.
fn display_hourly(hourly: &[HourlyForecast], units: &Units) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Time"),
        ui::header_cell("Sky"),
        ui::header_cell(&units.temperature),
        ui::header_cell(&units.humidity),
        ui::header_cell(&units.precipitation),
        ui::header_cell(&units.wind_speed),
    ]);
    for hour in hourly.iter().take(HOURLY_ROWS) {
        table.add_row(vec![
            Cell::new(hour.time.format("%m-%d %H:%M")),
            Cell::new(condition_label(hour.weather_code)),
            ui::format_optional_cell(hour.temperature, |v| format!("{v:.1}")),
            ui::format_optional_cell(hour.humidity, |v| format!("{v:.0}")),
            ui::format_optional_cell(hour.precipitation, |v| format!("{v:.1}")),
            ui::format_optional_cell(hour.wind_speed, |v| format!("{v:.1}")),
        ]);
    }
    table.to_string()
}
