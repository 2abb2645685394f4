use thiserror::Error;

use crate::model::ItemId;

// ── Error kinds ─────────────────────────────────────────────────────
//
// Stable, machine-readable identifiers. UI code matches on these,
// never on the human-readable message string.

/// Stable error kind constants, see [`FeedError::kind`].
pub mod error_kind {
    pub const NETWORK: &str = "NETWORK";
    pub const SERVER: &str = "SERVER";
    pub const TIMEOUT: &str = "TIMEOUT";
    pub const VALIDATION: &str = "VALIDATION";
    pub const DECODE: &str = "DECODE";
    pub const UNKNOWN_ITEM: &str = "UNKNOWN_ITEM";
}

// ── FeedError ───────────────────────────────────────────────────────

/// Error returned by every fallible feed operation.
///
/// Cloneable so the store can keep the last one for observers while the
/// caller receives its own copy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// Backend unreachable or the connection broke before a response.
    #[error("network: {0}")]
    Network(String),

    /// Backend answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Server { status: u16, body: String },

    /// Transport gave up waiting for a response.
    #[error("request timed out")]
    Timeout,

    /// Input rejected before any request was made.
    #[error("validation: {0}")]
    Validation(String),

    /// 2xx response whose body could not be normalized.
    #[error("decode: {0}")]
    Decode(String),

    /// The referenced item is not in this feed.
    #[error("item '{0}' is not in the feed")]
    UnknownItem(ItemId),
}

impl FeedError {
    /// Stable, machine-readable error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            FeedError::Network(_) => error_kind::NETWORK,
            FeedError::Server { .. } => error_kind::SERVER,
            FeedError::Timeout => error_kind::TIMEOUT,
            FeedError::Validation(_) => error_kind::VALIDATION,
            FeedError::Decode(_) => error_kind::DECODE,
            FeedError::UnknownItem(_) => error_kind::UNKNOWN_ITEM,
        }
    }

    /// Whether calling the same operation again may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            FeedError::Network(_) | FeedError::Timeout => true,
            FeedError::Server { status, .. } => *status >= 500 || *status == 429,
            FeedError::Validation(_) | FeedError::Decode(_) | FeedError::UnknownItem(_) => false,
        }
    }
}

impl From<reqwest::Error> for FeedError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FeedError::Timeout
        } else if e.is_decode() {
            FeedError::Decode(e.to_string())
        } else {
            FeedError::Network(e.to_string())
        }
    }
}
