//! Core types for extraction results and diagnostics

use crate::error::{ExtractError, FailureKind, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which part of a message a layer was recovered from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Part {
    /// Hierarchical markup (the HTML alternative)
    Html,
    /// Plain text
    Text,
}

impl fmt::Display for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Html => write!(f, "html"),
            Self::Text => write!(f, "text"),
        }
    }
}

/// Fields recovered by one client strategy from a single forward layer.
///
/// The sender is optional here: the plain-text strategies report whatever
/// they find and leave validation to the orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Original sender address
    pub sender: Option<String>,

    /// Original sender display name
    pub sender_name: Option<String>,

    /// Date the original message was sent
    pub date: Option<DateTime<Utc>>,

    /// Remaining body once the forward header block is stripped
    pub body: String,

    /// Name of the heuristic that recovered the body
    pub body_method: &'static str,
}

impl Extraction {
    pub fn new(body: impl Into<String>, body_method: &'static str) -> Self {
        Self {
            body: body.into(),
            body_method,
            ..Self::default()
        }
    }

    /// Clients often echo the address as the display name; drop it then
    #[must_use]
    pub fn without_echoed_name(mut self) -> Self {
        if self.sender_name.is_some() && self.sender_name == self.sender {
            self.sender_name = None;
        }
        self
    }

    pub(crate) fn trace_entry(&self, client: &str, part: Part) -> TraceEntry {
        TraceEntry {
            client: client.to_string(),
            part,
            body_method: (!self.body_method.is_empty()).then(|| self.body_method.to_string()),
            sender: self.sender.clone(),
            sender_name: self.sender_name.clone(),
            date: self.date,
        }
    }
}

/// An accepted extraction: the innermost forwarded message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    /// Original sender address, always syntactically valid
    pub sender: String,

    /// Original sender display name
    pub sender_name: Option<String>,

    /// Date the original message was sent
    pub date: Option<DateTime<Utc>>,

    /// Recovered markup body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,

    /// Recovered plain-text body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ExtractionResult {
    /// The markup body if present, otherwise the text body
    #[must_use]
    pub fn body(&self) -> &str {
        self.html
            .as_deref()
            .or(self.text.as_deref())
            .unwrap_or_default()
    }
}

impl fmt::Display for ExtractionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sender_name {
            Some(name) => write!(f, "{name} <{}>", self.sender),
            None => write!(f, "{}", self.sender),
        }
    }
}

/// One unwrap layer recorded in a [`MatchTrace`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceEntry {
    /// Name of the client strategy that matched
    pub client: String,

    /// Part the layer was found in
    pub part: Part,

    /// Body heuristic that produced the layer's body
    pub body_method: Option<String>,

    pub sender: Option<String>,
    pub sender_name: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

/// Ordered record of the clients matched during one extraction call,
/// outermost layer first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchTrace {
    pub layers: Vec<TraceEntry>,

    /// Message of the error that ended the call, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MatchTrace {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            layers: Vec::new(),
            error: None,
        }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.layers.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Append a layer, returning the updated trace
    #[must_use]
    pub fn record(mut self, entry: TraceEntry) -> Self {
        self.layers.push(entry);
        self
    }

    #[must_use]
    pub fn with_error(mut self, error: &ExtractError) -> Self {
        self.error = Some(error.to_string());
        self
    }

    /// Whether a client with this name matched an earlier layer
    #[must_use]
    pub fn has_matched(&self, client: &str) -> bool {
        self.layers.iter().any(|layer| layer.client == client)
    }

    #[must_use]
    pub fn client_names(&self) -> Vec<&str> {
        self.layers.iter().map(|layer| layer.client.as_str()).collect()
    }

    /// Concatenate the layers of a markup pass and a text pass
    #[must_use]
    pub fn merge(mut self, other: Self) -> Self {
        self.layers.extend(other.layers);
        self.error = self.error.or(other.error);
        self
    }
}

/// Result of a top-level extraction call together with its trace
#[derive(Debug, Clone)]
pub struct Outcome {
    pub result: Result<ExtractionResult>,
    pub trace: MatchTrace,
}

impl Outcome {
    pub(crate) const fn new(result: Result<ExtractionResult>, trace: MatchTrace) -> Self {
        Self { result, trace }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    /// Failure tag, if the call failed
    #[must_use]
    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.result.as_ref().err().map(ExtractError::kind)
    }

    pub fn into_result(self) -> Result<ExtractionResult> {
        self.result
    }
}
