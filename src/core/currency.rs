//! Exchange rate snapshots and conversion between the currencies they cover.

use crate::core::error::FetchError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RateError {
    #[error("Unsupported currency pair: {from} -> {to}")]
    UnsupportedCurrencyPair { from: String, to: String },

    #[error("Rate for {code} must be positive, got: {rate}")]
    NonPositiveRate { code: String, rate: f64 },

    #[error("Rates must not quote the pivot currency {0} against itself")]
    PivotInRates(String),

    #[error("Invalid currency code: '{0}'")]
    InvalidCurrencyCode(String),
}

/// Trims and uppercases a currency code for lookup.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

fn validate_code(code: &str) -> Result<String, RateError> {
    let normalized = normalize_code(code);
    if normalized.len() == 3 && normalized.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(normalized)
    } else {
        Err(RateError::InvalidCurrencyCode(code.to_string()))
    }
}

/// A point-in-time set of rates quoted against a single pivot currency.
///
/// Each value is the number of units of that currency per one unit of the
/// pivot. The pivot itself is never present in `rates`; its rate is
/// implicitly 1. A snapshot is immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct RateSnapshot {
    pivot: String,
    observed_at: i64,
    rates: HashMap<String, f64>,
}

impl RateSnapshot {
    /// Builds a snapshot, normalising every code and rejecting rates that are
    /// zero, negative or not finite.
    pub fn new<I, S>(pivot: &str, observed_at: i64, rates: I) -> Result<Self, RateError>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        let pivot = validate_code(pivot)?;
        let mut normalized = HashMap::new();
        for (code, rate) in rates {
            let code = validate_code(code.as_ref())?;
            if code == pivot {
                return Err(RateError::PivotInRates(code));
            }
            if !rate.is_finite() || rate <= 0.0 {
                return Err(RateError::NonPositiveRate { code, rate });
            }
            normalized.insert(code, rate);
        }

        Ok(Self {
            pivot,
            observed_at,
            rates: normalized,
        })
    }

    pub fn pivot(&self) -> &str {
        &self.pivot
    }

    /// Seconds since the Unix epoch at which the upstream captured the rates.
    pub fn observed_at(&self) -> i64 {
        self.observed_at
    }

    pub fn observed_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.observed_at, 0)
    }

    pub fn rates(&self) -> &HashMap<String, f64> {
        &self.rates
    }

    pub fn rate(&self, code: &str) -> Option<f64> {
        self.rates.get(&normalize_code(code)).copied()
    }

    /// Whether `code` is the pivot or has a quoted rate.
    pub fn covers(&self, code: &str) -> bool {
        let code = normalize_code(code);
        code == self.pivot || self.rates.contains_key(&code)
    }

    /// Returns the quoted rates for `targets`, ordered by code. Blank and
    /// unknown targets are skipped.
    pub fn select<I, S>(&self, targets: I) -> BTreeMap<String, f64>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        targets
            .into_iter()
            .map(|t| normalize_code(t.as_ref()))
            .filter(|t| !t.is_empty())
            .filter_map(|t| self.rates.get(&t).map(|rate| (t, *rate)))
            .collect()
    }

    pub fn convert(&self, amount: f64, from: &str, to: &str) -> Result<f64, RateError> {
        convert(amount, from, to, self)
    }
}

/// Converts `amount` of `from` into `to` using the snapshot's rates.
///
/// Equal codes short-circuit to `amount`, whether or not the snapshot quotes
/// them. Otherwise the first matching case wins: pivot to quoted (multiply), quoted
/// to pivot (divide), then quoted to quoted through the pivot. No rounding is
/// applied.
pub fn convert(
    amount: f64,
    from: &str,
    to: &str,
    snapshot: &RateSnapshot,
) -> Result<f64, RateError> {
    let from = normalize_code(from);
    let to = normalize_code(to);
    let pivot = snapshot.pivot.as_str();
    let rates = &snapshot.rates;

    if from == to {
        return Ok(amount);
    }

    if from == pivot
        && let Some(to_rate) = rates.get(&to)
    {
        return Ok(amount * to_rate);
    }
    if to == pivot
        && let Some(from_rate) = rates.get(&from)
    {
        return Ok(amount / from_rate);
    }
    if let (Some(from_rate), Some(to_rate)) = (rates.get(&from), rates.get(&to)) {
        return Ok((amount / from_rate) * to_rate);
    }

    Err(RateError::UnsupportedCurrencyPair { from, to })
}

/// A source of fresh rate snapshots, typically a remote API.
#[async_trait]
pub trait RateSnapshotProvider: Send + Sync {
    async fn latest(&self, base: &str) -> Result<RateSnapshot, FetchError>;
}
