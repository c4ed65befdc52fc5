//! CSV Result Sink
//!
//! Writes traced events to a single CSV file (default: data/result.csv).
//! The file is rewritten on every run; rows keep collection order.
//!
//! Columns: layer, BlockNumber, TimeStamp, Hash, From, To, Value, TokenName, TokenSymbol
//!
//! Created: 2026-10-18

use super::ResultSink;
use crate::types::TracedEvent;
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// CSV sink for the traced event dataset
pub struct CsvResultSink {
    path: PathBuf,
}

impl CsvResultSink {
    /// Column names expected by the dashboard
    pub const HEADERS: &'static [&'static str] = &[
        "layer",
        "BlockNumber",
        "TimeStamp",
        "Hash",
        "From",
        "To",
        "Value",
        "TokenName",
        "TokenSymbol",
    ];

    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_record(writer: &mut impl Write, event: &TracedEvent) -> Result<()> {
        let fields = [
            event.layer.to_string(),
            event.block_number.to_string(),
            event.readable_timestamp(),
            escape_csv_field(&event.hash),
            escape_csv_field(&event.from),
            escape_csv_field(&event.to),
            format_value(event.value),
            escape_csv_field(&event.token_name),
            escape_csv_field(&event.token_symbol),
        ];
        writeln!(writer, "{}", fields.join(","))?;
        Ok(())
    }
}

impl ResultSink for CsvResultSink {
    fn write(&mut self, events: &[TracedEvent]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create output directory: {:?}", parent))?;
        }

        let file = File::create(&self.path)
            .with_context(|| format!("Failed to create result CSV: {:?}", self.path))?;
        let mut writer = BufWriter::new(file);

        writeln!(writer, "{}", Self::HEADERS.join(","))?;
        for event in events {
            Self::write_record(&mut writer, event)?;
        }
        writer.flush()?;

        info!("CSV file {} has been saved ({} rows)", self.path.display(), events.len());
        Ok(())
    }
}

/// Decimal rendering; whole amounts keep a trailing `.0` so the column
/// always reads as a decimal number
fn format_value(value: Decimal) -> String {
    let value = value.normalize();
    if value.scale() == 0 {
        format!("{}.0", value)
    } else {
        value.to_string()
    }
}

/// Escape a CSV field that may contain special characters
fn escape_csv_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
