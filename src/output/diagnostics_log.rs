//! JSONL Diagnostics Logger
//!
//! Writes the recovered failures of a run (fetch failures, malformed
//! records, failed tasks) one JSON object per line, so skipped data can be
//! audited or re-fetched later.
//!
//! Created: 2026-10-18

use crate::trace::Diagnostic;
use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub struct DiagnosticsLogger {
    path: PathBuf,
}

impl DiagnosticsLogger {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Diagnostics file placed next to a result file: `result.csv` -> `result.diagnostics.jsonl`
    pub fn beside(result_path: &Path) -> Self {
        let stem = result_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "result".to_string());
        Self::new(result_path.with_file_name(format!("{}.diagnostics.jsonl", stem)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write(&self, diagnostics: &[Diagnostic]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create diagnostics directory: {:?}", parent))?;
        }

        let file = File::create(&self.path)
            .with_context(|| format!("Failed to create diagnostics file: {:?}", self.path))?;
        let mut writer = BufWriter::new(file);
        for diagnostic in diagnostics {
            let json = serde_json::to_string(diagnostic).context("Failed to serialize diagnostic")?;
            writeln!(writer, "{}", json)?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_beside_result() {
        let logger = DiagnosticsLogger::beside(Path::new("data/result.csv"));
        assert_eq!(logger.path(), Path::new("data/result.diagnostics.jsonl"));
    }

    #[test]
    fn test_write_jsonl() {
        let temp_dir = env::temp_dir().join("token_trace_diag_test");
        let _ = fs::remove_dir_all(&temp_dir);

        let logger = DiagnosticsLogger::new(temp_dir.join("diag.jsonl"));
        logger
            .write(&[
                Diagnostic::FetchFailed {
                    address: "0xz".to_string(),
                    depth: 0,
                    error: "HTTP status 500".to_string(),
                },
                Diagnostic::TaskFailed {
                    seed: "0xa".to_string(),
                    error: "panicked".to_string(),
                },
            ])
            .unwrap();

        let content = fs::read_to_string(logger.path()).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["kind"], "fetch_failed");
        assert_eq!(lines[1]["seed"], "0xa");

        let _ = fs::remove_dir_all(&temp_dir);
    }
}
