//! Block Explorer Access
//!
//! `TransferSource` is the seam between the traversal engine and wherever
//! transfer records come from. The HTTP client talks to an Etherscan-style
//! `account/tokentx` endpoint; `RetryingSource` wraps any source with
//! exponential backoff for transient failures.
//!
//! Created: 2026-10-18

pub mod client;
pub mod retry;

pub use client::{ExplorerClient, ExplorerResponse};
pub use retry::{RetryPolicy, RetryingSource};

use crate::types::TransferRecord;
use async_trait::async_trait;
use thiserror::Error;

/// Failure to retrieve the transfer list for an address
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP status {status}")]
    HttpStatus { status: u16 },
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("explorer returned status {status}: {message} ({detail})")]
    Api {
        status: String,
        message: String,
        detail: String,
    },
}

impl FetchError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Transport(_) => true,
            FetchError::HttpStatus { status } => *status == 429 || *status >= 500,
            FetchError::Decode(_) => false,
            FetchError::Api { message, detail, .. } => {
                let text = format!("{} {}", message, detail).to_lowercase();
                text.contains("rate limit") || text.contains("timeout") || text.contains("busy")
            }
        }
    }
}

/// Source of token transfer records for an address
#[async_trait]
pub trait TransferSource: Send + Sync {
    /// Transfers involving `address`, ascending by block number
    async fn fetch(&self, address: &str) -> Result<Vec<TransferRecord>, FetchError>;
}
