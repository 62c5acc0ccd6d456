//! Error types for forward extraction

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors that can occur while unwrapping a forwarded email
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// No client strategy recognised a forward marker
    #[error("No forwarding functionality found")]
    NoForwardFound,

    /// A client claimed the input but an expected structure was missing
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// A markup part was required but the message has none
    #[error("No HTML payload found")]
    NoHtmlPayload,

    /// The raw message could not be decoded into parts
    #[error("Failed to decode message: {0}")]
    Decode(String),

    /// Unexpected fault outside the extraction taxonomy
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExtractError {
    pub(crate) fn extraction(message: impl Into<String>) -> Self {
        Self::Extraction(message.into())
    }

    /// Classify the error into the tag reported to callers
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::NoForwardFound => FailureKind::NoForwardFound,
            Self::Extraction(_) => FailureKind::Failed,
            Self::NoHtmlPayload => FailureKind::NoHtmlPayloadFound,
            Self::Decode(_) | Self::Internal(_) => FailureKind::Internal,
        }
    }

    /// Whether this is a domain failure rather than an internal fault
    #[must_use]
    pub const fn is_expected(&self) -> bool {
        !matches!(self.kind(), FailureKind::Internal)
    }
}

/// Failure tag surfaced alongside a failed extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    NoForwardFound,
    Failed,
    NoHtmlPayloadFound,
    Internal,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Self::NoForwardFound => "noforwardfound",
            Self::Failed => "failed",
            Self::NoHtmlPayloadFound => "nohtmlpayloadfound",
            Self::Internal => "internal",
        };
        write!(f, "{tag}")
    }
}

/// Result type for extraction operations
pub type Result<T> = std::result::Result<T, ExtractError>;
