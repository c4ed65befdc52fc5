//! Core data structures for transfer tracing
//!
//! `TransferRecord` is the raw row returned by the explorer's `tokentx` action.
//! `TracedEvent` is the validated, decimal-adjusted event persisted to the
//! output dataset.
//!
//! Created: 2026-10-18

use alloy::primitives::U256;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Null address; transfers to it are burns and are never traced
pub const BURN_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Timestamp format expected by the visualization layer
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Largest number of significant digits a `Decimal` can hold
const DECIMAL_MAX_DIGITS: usize = 28;

/// Largest scale a `Decimal` can hold
const DECIMAL_MAX_SCALE: u32 = 28;

/// Raw token transfer as reported by the block explorer.
///
/// Every field is kept as text so a missing or malformed field only
/// invalidates this record, never the whole response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransferRecord {
    pub block_number: String,
    pub time_stamp: String,
    pub hash: String,
    pub from: String,
    pub to: String,
    pub value: String,
    pub token_decimal: String,
    pub token_name: String,
    pub token_symbol: String,
    /// Set when the explorer row could not be decoded at all
    #[serde(skip)]
    pub decode_error: Option<String>,
}

/// Structural problem with a single transfer record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("field `{field}` is not a valid number: {value:?}")]
    InvalidNumber { field: &'static str, value: String },
    #[error("timestamp out of range: {0}")]
    InvalidTimestamp(i64),
    #[error("value {value} with {decimals} decimals does not fit a decimal")]
    ValueOutOfRange { value: String, decimals: u32 },
    #[error("undecodable row: {0}")]
    Undecodable(String),
}

impl TransferRecord {
    /// Placeholder for a row the explorer sent in an unreadable shape
    pub fn undecodable(hash: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            decode_error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Error from decoding the raw row, if any
    pub fn decode_error(&self) -> Result<(), RecordError> {
        match &self.decode_error {
            Some(e) => Err(RecordError::Undecodable(e.clone())),
            None => Ok(()),
        }
    }

    /// Required text field, rejecting empty values
    fn required<'a>(&'a self, field: &'static str, value: &'a str) -> Result<&'a str, RecordError> {
        let value = value.trim();
        if value.is_empty() {
            return Err(RecordError::MissingField(field));
        }
        Ok(value)
    }

    pub fn to_address(&self) -> Result<&str, RecordError> {
        self.required("to", &self.to)
    }

    pub fn from_address(&self) -> Result<&str, RecordError> {
        self.required("from", &self.from)
    }

    pub fn block_number(&self) -> Result<u64, RecordError> {
        let raw = self.required("blockNumber", &self.block_number)?;
        raw.parse().map_err(|_| RecordError::InvalidNumber {
            field: "blockNumber",
            value: raw.to_string(),
        })
    }

    /// Token decimals; an empty field means 0
    pub fn decimals(&self) -> Result<u32, RecordError> {
        let raw = self.token_decimal.trim();
        if raw.is_empty() {
            return Ok(0);
        }
        raw.parse().map_err(|_| RecordError::InvalidNumber {
            field: "tokenDecimal",
            value: raw.to_string(),
        })
    }

    pub fn timestamp(&self) -> Result<DateTime<Utc>, RecordError> {
        let raw = self.required("timeStamp", &self.time_stamp)?;
        let secs: i64 = raw.parse().map_err(|_| RecordError::InvalidNumber {
            field: "timeStamp",
            value: raw.to_string(),
        })?;
        DateTime::from_timestamp(secs, 0).ok_or(RecordError::InvalidTimestamp(secs))
    }

    /// Decimal-adjusted amount: `value / 10^tokenDecimal`
    pub fn amount(&self) -> Result<Decimal, RecordError> {
        let raw = self.required("value", &self.value)?;
        scale_raw_value(raw, self.decimals()?)
    }
}

/// Convert a raw integer token amount into a human amount.
///
/// The raw value is parsed as a U256 and split into integer and fractional
/// parts so amounts beyond 96 bits still scale correctly. Fractional digits
/// past what a `Decimal` can hold are truncated. A nonzero raw value never
/// truncates to zero: amounts below `1e-28` become `1e-28`.
pub fn scale_raw_value(raw: &str, decimals: u32) -> Result<Decimal, RecordError> {
    let invalid = || RecordError::InvalidNumber {
        field: "value",
        value: raw.to_string(),
    };
    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let value = U256::from_str_radix(raw, 10).map_err(|_| invalid())?;
    let out_of_range = || RecordError::ValueOutOfRange {
        value: raw.to_string(),
        decimals,
    };

    let divisor = U256::from(10u64)
        .checked_pow(U256::from(u64::from(decimals)))
        .ok_or_else(out_of_range)?;
    let integer = value / divisor;
    let mut text = integer.to_string();
    if text.len() > DECIMAL_MAX_DIGITS {
        return Err(out_of_range());
    }

    if decimals > 0 {
        let fraction = format!("{:0>width$}", (value % divisor).to_string(), width = decimals as usize);
        // Leading zeros of a zero integer part are not significant
        let significant = if integer.is_zero() { 0 } else { text.len() };
        let keep = DECIMAL_MAX_DIGITS
            .saturating_sub(significant)
            .min(DECIMAL_MAX_SCALE as usize)
            .min(fraction.len());
        if keep > 0 {
            text.push('.');
            text.push_str(&fraction[..keep]);
        }
    }

    let amount = Decimal::from_str(&text).map_err(|_| out_of_range())?;
    if amount.is_zero() && !value.is_zero() {
        return Ok(Decimal::new(1, DECIMAL_MAX_SCALE));
    }
    Ok(amount.normalize())
}

/// A qualifying transfer captured during traversal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TracedEvent {
    /// Depth at which the event was captured (0 = seed)
    pub layer: u32,
    pub block_number: u64,
    pub timestamp: DateTime<Utc>,
    pub hash: String,
    pub from: String,
    pub to: String,
    /// Decimal-adjusted token amount
    pub value: Decimal,
    pub token_name: String,
    pub token_symbol: String,
}

impl TracedEvent {
    /// Identity used for deduplication: every field except `layer`
    pub fn key(&self) -> EventKey {
        EventKey {
            block_number: self.block_number,
            timestamp: self.timestamp,
            hash: self.hash.clone(),
            from: self.from.clone(),
            to: self.to.clone(),
            value: self.value,
            token_name: self.token_name.clone(),
            token_symbol: self.token_symbol.clone(),
        }
    }

    /// Timestamp rendered as `YYYY-MM-DD HH:MM:SS`
    pub fn readable_timestamp(&self) -> String {
        self.timestamp.format(TIMESTAMP_FORMAT).to_string()
    }
}

impl fmt::Display for TracedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "L{} {} {} -> {} {} {} ({})",
            self.layer,
            self.readable_timestamp(),
            self.from,
            self.to,
            self.value,
            self.token_symbol,
            self.hash
        )
    }
}

/// Deduplication key for a `TracedEvent`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventKey {
    pub block_number: u64,
    pub timestamp: DateTime<Utc>,
    pub hash: String,
    pub from: String,
    pub to: String,
    pub value: Decimal,
    pub token_name: String,
    pub token_symbol: String,
}

/// Case-insensitive comparison for hex addresses
pub fn same_address(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn record(value: &str, decimals: &str) -> TransferRecord {
        TransferRecord {
            block_number: "100".to_string(),
            time_stamp: "1700000000".to_string(),
            hash: "0xhash".to_string(),
            from: "0xaaa".to_string(),
            to: "0xbbb".to_string(),
            value: value.to_string(),
            token_decimal: decimals.to_string(),
            token_name: "Moss Carbon Credit".to_string(),
            token_symbol: "MCO2".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_decimal_adjustment() {
        assert_eq!(record("1500", "2").amount().unwrap(), dec!(15.0));
        assert_eq!(record("1500", "").amount().unwrap(), dec!(1500));
        assert_eq!(record("1", "18").amount().unwrap(), dec!(0.000000000000000001));
        assert_eq!(record("0", "18").amount().unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_tiny_amounts_stay_nonzero() {
        assert_eq!(scale_raw_value("1", 28).unwrap(), Decimal::new(1, 28));
        assert_eq!(scale_raw_value("5", 28).unwrap(), Decimal::new(5, 28));
        // 1.23e-28 truncates to the smallest representable step
        assert_eq!(scale_raw_value("123", 30).unwrap(), Decimal::new(1, 28));
        assert_eq!(scale_raw_value("1", 40).unwrap(), Decimal::new(1, 28));
        assert_eq!(scale_raw_value("0", 40).unwrap(), Decimal::ZERO);
        // 28 significant fractional digits survive behind a zero integer part
        assert_eq!(
            scale_raw_value("1234567890123456789012345678", 28).unwrap(),
            Decimal::from_str("0.1234567890123456789012345678").unwrap()
        );
    }

    #[test]
    fn test_undecodable_record() {
        let r = TransferRecord::undecodable("0xabc", "invalid type: integer `5`");
        assert_eq!(r.hash, "0xabc");
        assert!(matches!(r.decode_error(), Err(RecordError::Undecodable(e)) if e.contains("integer")));
        assert!(record("10", "0").decode_error().is_ok());
    }

    #[test]
    fn test_large_raw_value() {
        // 10^30 raw units with 18 decimals = 10^12 tokens, beyond 96-bit raw range
        let raw = format!("1{}", "0".repeat(30));
        assert_eq!(scale_raw_value(&raw, 18).unwrap(), dec!(1000000000000));
    }

    #[test]
    fn test_malformed_fields() {
        assert!(matches!(
            record("12abc", "2").amount(),
            Err(RecordError::InvalidNumber { field: "value", .. })
        ));
        assert!(matches!(
            record("", "2").amount(),
            Err(RecordError::MissingField("value"))
        ));
        assert!(matches!(
            record("10", "x").decimals(),
            Err(RecordError::InvalidNumber { field: "tokenDecimal", .. })
        ));

        let mut r = record("10", "0");
        r.time_stamp = "soon".to_string();
        assert!(r.timestamp().is_err());
    }

    #[test]
    fn test_readable_timestamp() {
        let r = record("10", "0");
        let event = TracedEvent {
            layer: 0,
            block_number: r.block_number().unwrap(),
            timestamp: r.timestamp().unwrap(),
            hash: r.hash.clone(),
            from: r.from.clone(),
            to: r.to.clone(),
            value: r.amount().unwrap(),
            token_name: r.token_name.clone(),
            token_symbol: r.token_symbol.clone(),
        };
        assert_eq!(event.readable_timestamp(), "2023-11-14 22:13:20");
    }

    #[test]
    fn test_deserialize_explorer_row() {
        let json = r#"{
            "blockNumber": "17000000",
            "timeStamp": "1681000000",
            "hash": "0xabc",
            "from": "0x1111111111111111111111111111111111111111",
            "to": "0x2222222222222222222222222222222222222222",
            "value": "2500000000000000000",
            "tokenName": "Moss Carbon Credit",
            "tokenSymbol": "MCO2",
            "tokenDecimal": "18",
            "confirmations": "12"
        }"#;
        let r: TransferRecord = serde_json::from_str(json).unwrap();
        assert_eq!(r.block_number().unwrap(), 17_000_000);
        assert_eq!(r.amount().unwrap(), dec!(2.5));

        // Missing fields default to empty instead of failing the row
        let partial: TransferRecord = serde_json::from_str(r#"{"hash":"0xdef"}"#).unwrap();
        assert!(matches!(partial.to_address(), Err(RecordError::MissingField("to"))));
    }

    #[test]
    fn test_same_address() {
        assert!(same_address("0xAbC", "0xabc"));
        assert!(!same_address("0xabc", "0xabd"));
    }
}
