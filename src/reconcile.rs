//! Reconciliation of a markup extraction with a plain-text extraction
//!
//! Markup is the primary source. The text side only wins a field when its
//! body is far longer than the rendered markup body, which means the markup
//! extraction most likely stopped on the wrong block.

use crate::address::is_valid_address;
use crate::dom;
use crate::error::{ExtractError, Result};
use crate::types::{Extraction, ExtractionResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How many times longer the text body must be to override markup fields
pub const DEFAULT_LENGTH_RATIO: usize = 5;

/// Tunables for [`reconcile`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergePolicy {
    /// Text body length over rendered markup length needed for the text
    /// side to override sender and name
    pub length_ratio: usize,

    /// Prefer the text side's fields when its date is older
    pub prefer_older_date: bool,
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self {
            length_ratio: DEFAULT_LENGTH_RATIO,
            prefer_older_date: true,
        }
    }
}

impl MergePolicy {
    /// Whether a text body of `text_len` chars dominates a markup body
    /// rendering to `markup_len` chars
    #[must_use]
    pub const fn text_dominates(&self, text_len: usize, markup_len: usize) -> bool {
        text_len > self.length_ratio.saturating_mul(markup_len)
    }
}

/// Merge the two extractions into one result carrying both bodies
pub fn reconcile(html: Extraction, text: Extraction, policy: &MergePolicy) -> Result<ExtractionResult> {
    let text_sender = text.sender.filter(|sender| is_valid_address(sender));
    let rendered_len = dom::render_text(&html.body).trim().chars().count();
    let text_len = text.body.chars().count();
    let text_dominates = policy.text_dominates(text_len, rendered_len);
    debug!(text_len, rendered_len, text_dominates, "Reconciling markup and text extractions");

    let mut sender = html.sender;
    let mut sender_name = html.sender_name;
    let mut date = html.date;

    if text_dominates && text_sender.is_some() && sender != text_sender {
        sender.clone_from(&text_sender);
    }
    if text_dominates && sender_name != text.sender_name {
        sender_name.clone_from(&text.sender_name);
    }
    if sender.is_none() && text_sender.is_some() {
        sender.clone_from(&text_sender);
        sender_name.clone_from(&text.sender_name);
    }
    if policy.prefer_older_date
        && text_sender.is_some()
        && let (Some(markup_date), Some(text_date)) = (date, text.date)
        && markup_date > text_date
    {
        date = Some(text_date);
        sender = text_sender;
        sender_name = text.sender_name;
    }

    let sender = sender
        .filter(|sender| is_valid_address(sender))
        .ok_or_else(|| ExtractError::extraction("Invalid email extracted"))?;

    Ok(ExtractionResult {
        sender,
        sender_name,
        date,
        html: Some(html.body),
        text: Some(text.body),
    })
}
