//! The orchestrator: client selection, recursive unwrap and reconciliation

use crate::address::is_valid_sender;
use crate::clients::{ClientStrategy, IPHONE, default_clients};
use crate::error::{ExtractError, Result};
use crate::mime::decode_parts;
use crate::reconcile::{MergePolicy, reconcile};
use crate::types::{Extraction, ExtractionResult, MatchTrace, Outcome, Part};
use std::thread::{self, ScopedJoinHandle};
use tracing::{debug, warn};

/// Upper bound on nested forward layers unwrapped from one markup blob
pub const MAX_UNWRAP_DEPTH: usize = 32;

/// One side of an extraction together with the trace it produced
type Pass = (Result<Extraction>, MatchTrace);

/// Unwraps forwarded messages with an ordered set of client strategies
pub struct Extractor {
    clients: Vec<Box<dyn ClientStrategy>>,
    policy: MergePolicy,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor {
    /// All built-in clients with the default merge policy
    #[must_use]
    pub fn new() -> Self {
        Self::with_policy(MergePolicy::default())
    }

    #[must_use]
    pub fn with_policy(policy: MergePolicy) -> Self {
        Self {
            clients: default_clients(),
            policy,
        }
    }

    /// Custom client list; earlier entries win offset ties
    #[must_use]
    pub fn with_clients(clients: Vec<Box<dyn ClientStrategy>>, policy: MergePolicy) -> Self {
        Self { clients, policy }
    }

    #[must_use]
    pub const fn policy(&self) -> &MergePolicy {
        &self.policy
    }

    /// Registered client names in priority order
    #[must_use]
    pub fn client_names(&self) -> Vec<&'static str> {
        self.clients.iter().map(|client| client.name()).collect()
    }

    /// The client whose forward marker starts earliest in `blob`.
    ///
    /// Ties go to the client registered first.
    #[must_use]
    pub fn matching_client(&self, blob: &str, part: Part, iphone_seen: bool) -> Option<&dyn ClientStrategy> {
        let mut best: Option<(usize, &dyn ClientStrategy)> = None;

        for client in &self.clients {
            let offset = match part {
                Part::Html => client.detect_in_markup(blob),
                Part::Text => client.detect_in_text(blob, iphone_seen),
            };
            let Some(offset) = offset else {
                continue;
            };
            debug!(client = client.name(), offset, %part, "Forward marker found");
            if best.is_none_or(|(lowest, _)| offset < lowest) {
                best = Some((offset, client.as_ref()));
            }
        }

        best.map(|(_, client)| client)
    }

    /// Extract from whichever parts are available.
    ///
    /// With both parts the two passes run concurrently and are reconciled.
    #[must_use]
    pub fn extract(&self, markup: Option<&str>, text: Option<&str>) -> Outcome {
        match (markup, text) {
            (Some(markup), Some(text)) => self.extract_from_both(markup, text),
            (Some(markup), None) => self.extract_from_html(markup),
            (None, Some(text)) => self.extract_from_text(text),
            (None, None) => finish(Err(ExtractError::NoForwardFound), MatchTrace::new()),
        }
    }

    /// Unwrap every forward layer of a markup blob
    #[must_use]
    pub fn extract_from_html(&self, markup: &str) -> Outcome {
        let (result, trace) = self.unwrap_markup(markup, MatchTrace::new(), 0);
        finish(result.and_then(|layer| accept(layer, Part::Html)), trace)
    }

    /// Unwrap a single forward layer of plain text
    #[must_use]
    pub fn extract_from_text(&self, text: &str) -> Outcome {
        let (result, trace) = self.unwrap_text(text, MatchTrace::new());
        finish(result.and_then(|layer| accept(layer, Part::Text)), trace)
    }

    /// Run both passes concurrently and merge them
    #[must_use]
    pub fn extract_from_both(&self, markup: &str, text: &str) -> Outcome {
        let ((markup_result, markup_trace), (text_result, text_trace)) = thread::scope(|scope| {
            let markup_pass = scope.spawn(|| self.unwrap_markup(markup, MatchTrace::new(), 0));
            let text_pass = scope.spawn(|| self.unwrap_text(text, MatchTrace::new()));
            (join_pass(markup_pass, Part::Html), join_pass(text_pass, Part::Text))
        });

        let markup_trace = with_failure(markup_trace, &markup_result);
        let text_trace = with_failure(text_trace, &text_result);
        let trace = markup_trace.merge(text_trace);

        let result = match (markup_result, text_result) {
            (Ok(markup), Ok(text)) => reconcile(markup, text, &self.policy),
            (Ok(markup), Err(_)) => accept(markup, Part::Html),
            (Err(_), Ok(text)) => accept(text, Part::Text),
            (Err(markup_error), Err(text_error)) => Err(neither_side(markup_error, text_error)),
        };
        finish(result, trace)
    }

    /// Decode a raw message and extract from its parts
    #[must_use]
    pub fn extract_from_mime(&self, raw: &[u8]) -> Outcome {
        match decode_parts(raw) {
            Ok(parts) => self.extract(parts.html.as_deref(), parts.text.as_deref()),
            Err(error) => finish(Err(error), MatchTrace::new()),
        }
    }

    /// Decode a raw message and extract from its markup part only
    #[must_use]
    pub fn extract_html_from_mime(&self, raw: &[u8]) -> Outcome {
        match decode_parts(raw) {
            Ok(parts) => match parts.html {
                Some(markup) => self.extract_from_html(&markup),
                None => finish(Err(ExtractError::NoHtmlPayload), MatchTrace::new()),
            },
            Err(error) => finish(Err(error), MatchTrace::new()),
        }
    }

    /// Strip one layer and recurse into the recovered body.
    ///
    /// The innermost layer is the one whose body no client recognizes.
    /// Recursion stops early when a body does not shrink or the depth
    /// limit is reached.
    fn unwrap_markup(&self, markup: &str, trace: MatchTrace, depth: usize) -> Pass {
        let Some(client) = self.matching_client(markup, Part::Html, false) else {
            debug!(depth, "No client matched markup layer");
            return (Err(ExtractError::NoForwardFound), trace);
        };

        let layer = match client.extract_from_markup(markup) {
            Ok(layer) => layer,
            Err(error) => {
                debug!(client = client.name(), depth, %error, "Markup extraction failed");
                return (Err(error), trace);
            }
        };
        if layer.body.is_empty() {
            debug!(client = client.name(), depth, "Recovered markup body is empty");
            return (Err(ExtractError::NoForwardFound), trace);
        }
        if layer.sender.is_none() {
            warn!(client = client.name(), "Markup extraction returned no sender");
            return (
                Err(ExtractError::Internal(format!("{} returned no sender", client.name()))),
                trace,
            );
        }

        let trace = trace.record(layer.trace_entry(client.name(), Part::Html));
        debug!(client = client.name(), depth, body_method = layer.body_method, "Unwrapped markup layer");

        if layer.body.len() >= markup.len() || depth + 1 >= MAX_UNWRAP_DEPTH {
            debug!(depth, "Unwrap stopped before the body stopped matching");
            return (innermost(layer, Part::Html), trace);
        }

        match self.unwrap_markup(&layer.body, trace, depth + 1) {
            (Err(ExtractError::NoForwardFound), trace) => (innermost(layer, Part::Html), trace),
            pass => pass,
        }
    }

    /// Plain-text forwards are unwrapped one layer deep
    fn unwrap_text(&self, text: &str, trace: MatchTrace) -> Pass {
        let iphone_seen = trace.has_matched(IPHONE);
        let Some(client) = self.matching_client(text, Part::Text, iphone_seen) else {
            debug!("No client matched text");
            return (Err(ExtractError::NoForwardFound), trace);
        };

        let layer = match client.extract_from_text(text) {
            Ok(layer) => layer,
            Err(error) => {
                debug!(client = client.name(), %error, "Text extraction failed");
                return (Err(error), trace);
            }
        };
        if layer.body.trim().is_empty() {
            debug!(client = client.name(), "Recovered text body is empty");
            return (Err(ExtractError::NoForwardFound), trace);
        }

        let trace = trace.record(layer.trace_entry(client.name(), Part::Text));
        (innermost(layer, Part::Text), trace)
    }
}

/// Accept the innermost layer: the sender must be valid and the body has
/// its non-breaking spaces flattened.
///
/// Only markup bodies carry the `&nbsp;` entity; plain text keeps it as
/// written.
fn innermost(mut layer: Extraction, part: Part) -> Result<Extraction> {
    if !is_valid_sender(layer.sender.as_deref()) {
        return Err(ExtractError::extraction("Invalid email extracted"));
    }
    layer.body = layer.body.replace('\u{a0}', " ");
    if part == Part::Html {
        layer.body = layer.body.replace("&nbsp;", " ");
    }
    Ok(layer)
}

/// Turn a single-part extraction into the output record
fn accept(layer: Extraction, part: Part) -> Result<ExtractionResult> {
    let sender = layer
        .sender
        .filter(|sender| is_valid_sender(Some(sender)))
        .ok_or_else(|| ExtractError::extraction("Invalid email extracted"))?;
    let (html, text) = match part {
        Part::Html => (Some(layer.body), None),
        Part::Text => (None, Some(layer.body)),
    };
    Ok(ExtractionResult {
        sender,
        sender_name: layer.sender_name,
        date: layer.date,
        html,
        text,
    })
}

/// Failure reported when both passes fail; internal faults are never hidden
fn neither_side(markup_error: ExtractError, text_error: ExtractError) -> ExtractError {
    [markup_error, text_error]
        .into_iter()
        .find(|error| !error.is_expected())
        .unwrap_or(ExtractError::NoForwardFound)
}

fn join_pass(handle: ScopedJoinHandle<'_, Pass>, part: Part) -> Pass {
    handle.join().unwrap_or_else(|_| {
        warn!(%part, "Extraction pass panicked");
        (
            Err(ExtractError::Internal(format!("{part} extraction panicked"))),
            MatchTrace::new(),
        )
    })
}

fn with_failure<T>(trace: MatchTrace, result: &Result<T>) -> MatchTrace {
    match result {
        Err(error) if trace.error.is_none() => trace.with_error(error),
        _ => trace,
    }
}

fn finish(result: Result<ExtractionResult>, trace: MatchTrace) -> Outcome {
    let trace = with_failure(trace, &result);
    Outcome::new(result, trace)
}
