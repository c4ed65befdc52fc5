//! Depth-dependent transfer filter
//!
//! Rules, in order:
//! 1. transfers to the burn address are never traced
//! 2. the record must be structurally valid
//! 3. zero-value transfers are dropped
//! 4. at depth 0 only the tracked token symbol qualifies
//! 5. past depth 0 only outgoing transfers of the explored address qualify

use crate::types::{same_address, RecordError, TracedEvent, TransferRecord, BURN_ADDRESS};

/// Why a well-formed record was not traced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterReason {
    BurnAddress,
    ZeroValue,
    /// Depth 0 and the token symbol is not the tracked one
    UntrackedToken,
    /// Depth > 0 and the record is not sent by the explored address
    NotOutgoing,
}

/// Result of evaluating one record
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Accepted(TracedEvent),
    Filtered(FilterReason),
    Malformed(RecordError),
}

/// Filter bound to one tracked token symbol
#[derive(Debug, Clone)]
pub struct EventFilter {
    tracked_symbol: String,
}

impl EventFilter {
    pub fn new(tracked_symbol: impl Into<String>) -> Self {
        Self {
            tracked_symbol: tracked_symbol.into(),
        }
    }

    pub fn tracked_symbol(&self) -> &str {
        &self.tracked_symbol
    }

    /// Whether `record` becomes a traced event when exploring `explored` at `depth`
    pub fn qualifies(&self, record: &TransferRecord, explored: &str, depth: u32) -> bool {
        matches!(self.evaluate(record, explored, depth), RecordOutcome::Accepted(_))
    }

    /// Apply the filter rules and build the event when the record qualifies
    pub fn evaluate(&self, record: &TransferRecord, explored: &str, depth: u32) -> RecordOutcome {
        match self.try_evaluate(record, explored, depth) {
            Ok(Ok(event)) => RecordOutcome::Accepted(event),
            Ok(Err(reason)) => RecordOutcome::Filtered(reason),
            Err(e) => RecordOutcome::Malformed(e),
        }
    }

    fn try_evaluate(
        &self,
        record: &TransferRecord,
        explored: &str,
        depth: u32,
    ) -> Result<Result<TracedEvent, FilterReason>, RecordError> {
        record.decode_error()?;
        let to = record.to_address()?;
        if same_address(to, BURN_ADDRESS) {
            return Ok(Err(FilterReason::BurnAddress));
        }

        let value = record.amount()?;
        let timestamp = record.timestamp()?;
        let block_number = record.block_number()?;
        let from = record.from_address()?;
        if record.hash.trim().is_empty() {
            return Err(RecordError::MissingField("hash"));
        }

        if value.is_zero() {
            return Ok(Err(FilterReason::ZeroValue));
        }
        if depth == 0 && record.token_symbol != self.tracked_symbol {
            return Ok(Err(FilterReason::UntrackedToken));
        }
        if depth > 0 && !same_address(from, explored) {
            return Ok(Err(FilterReason::NotOutgoing));
        }

        Ok(Ok(TracedEvent {
            layer: depth,
            block_number,
            timestamp,
            hash: record.hash.trim().to_string(),
            from: from.to_lowercase(),
            to: to.to_lowercase(),
            value,
            token_name: record.token_name.clone(),
            token_symbol: record.token_symbol.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const SEED: &str = "0xaaaa000000000000000000000000000000000001";
    const OTHER: &str = "0xbbbb000000000000000000000000000000000002";

    fn transfer(from: &str, to: &str, value: &str, symbol: &str) -> TransferRecord {
        TransferRecord {
            block_number: "42".to_string(),
            time_stamp: "1650000000".to_string(),
            hash: "0xfeed".to_string(),
            from: from.to_string(),
            to: to.to_string(),
            value: value.to_string(),
            token_decimal: "2".to_string(),
            token_name: "Moss Carbon Credit".to_string(),
            token_symbol: symbol.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_undecodable_row_is_malformed() {
        let filter = EventFilter::new("MCO2");
        let row = TransferRecord::undecodable("0xfeed", "invalid type: null, expected a string");
        assert!(matches!(
            filter.evaluate(&row, SEED, 0),
            RecordOutcome::Malformed(RecordError::Undecodable(e)) if e.contains("null")
        ));
    }

    #[test]
    fn test_tiny_amount_is_not_zero_value() {
        let filter = EventFilter::new("MCO2");
        let mut tiny = transfer(SEED, OTHER, "5", "MCO2");
        tiny.token_decimal = "28".to_string();
        assert!(filter.qualifies(&tiny, SEED, 0));
        tiny.value = "123".to_string();
        tiny.token_decimal = "30".to_string();
        assert!(filter.qualifies(&tiny, SEED, 0));
    }

    #[test]
    fn test_burn_rejected_at_any_depth() {
        let filter = EventFilter::new("MCO2");
        let burn = transfer(SEED, BURN_ADDRESS, "100", "MCO2");
        assert_eq!(
            filter.evaluate(&burn, SEED, 0),
            RecordOutcome::Filtered(FilterReason::BurnAddress)
        );
        assert!(!filter.qualifies(&burn, SEED, 1));
    }

    #[test]
    fn test_zero_value_rejected() {
        let filter = EventFilter::new("MCO2");
        let zero = transfer(SEED, OTHER, "0", "MCO2");
        assert_eq!(
            filter.evaluate(&zero, SEED, 0),
            RecordOutcome::Filtered(FilterReason::ZeroValue)
        );
    }

    #[test]
    fn test_depth_zero_requires_tracked_symbol() {
        let filter = EventFilter::new("MCO2");
        // Incoming transfer is fine at the root as long as the symbol matches
        assert!(filter.qualifies(&transfer(OTHER, SEED, "100", "MCO2"), SEED, 0));
        assert_eq!(
            filter.evaluate(&transfer(SEED, OTHER, "100", "USDC"), SEED, 0),
            RecordOutcome::Filtered(FilterReason::UntrackedToken)
        );
    }

    #[test]
    fn test_deeper_layers_require_outgoing() {
        let filter = EventFilter::new("MCO2");
        // Any symbol is followed past the root
        assert!(filter.qualifies(&transfer(SEED, OTHER, "100", "USDC"), SEED, 1));
        assert_eq!(
            filter.evaluate(&transfer(OTHER, SEED, "100", "MCO2"), SEED, 2),
            RecordOutcome::Filtered(FilterReason::NotOutgoing)
        );
    }

    #[test]
    fn test_address_case_insensitive() {
        let filter = EventFilter::new("MCO2");
        let upper = SEED.to_uppercase().replace("0X", "0x");
        assert!(filter.qualifies(&transfer(&upper, OTHER, "100", "USDC"), SEED, 1));
    }

    #[test]
    fn test_accepted_event_fields() {
        let filter = EventFilter::new("MCO2");
        match filter.evaluate(&transfer(SEED, OTHER, "1500", "MCO2"), SEED, 0) {
            RecordOutcome::Accepted(event) => {
                assert_eq!(event.layer, 0);
                assert_eq!(event.block_number, 42);
                assert_eq!(event.value, dec!(15));
                assert_eq!(event.readable_timestamp(), "2022-04-15 05:20:00");
                assert_eq!(event.to, OTHER);
            }
            other => panic!("expected accepted, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_reported() {
        let filter = EventFilter::new("MCO2");
        let mut bad = transfer(SEED, OTHER, "1e5", "MCO2");
        assert!(matches!(
            filter.evaluate(&bad, SEED, 0),
            RecordOutcome::Malformed(RecordError::InvalidNumber { field: "value", .. })
        ));

        bad.value = "100".to_string();
        bad.hash = String::new();
        assert_eq!(
            filter.evaluate(&bad, SEED, 0),
            RecordOutcome::Malformed(RecordError::MissingField("hash"))
        );

        let missing_to = TransferRecord::default();
        assert_eq!(
            filter.evaluate(&missing_to, SEED, 0),
            RecordOutcome::Malformed(RecordError::MissingField("to"))
        );
    }
}
