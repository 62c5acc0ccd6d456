//! Field-extraction engine shared by every client strategy
//!
//! A client describes itself with ordered pattern lists in a
//! [`ClientDescriptor`]. Each field is recovered by trying the patterns in
//! order; the first pattern yielding a non-empty capture wins.

use crate::dates;
use crate::types::Extraction;
use chrono::{DateTime, Utc};
use regex::Regex;

/// Header labels a client writes into a forward header block
pub const HEADER_LABELS: [&str; 7] = [
    "From:",
    "Subject:",
    "Date:",
    "Sent:",
    "To:",
    "Cc:",
    "Reply-To:",
];

/// Compile a static pattern list in multi-line mode
pub(crate) fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|pattern| Regex::new(&format!("(?m){pattern}")).unwrap())
        .collect()
}

/// Immutable per-client configuration
#[derive(Debug, Clone, Copy)]
pub struct ClientDescriptor {
    /// Display name, also recorded in the match trace
    pub name: &'static str,

    /// Patterns with a `date` capture
    pub date_patterns: &'static [Regex],

    /// `chrono` templates tried against a captured date
    pub date_formats: &'static [&'static str],

    /// Patterns with a `from` capture and optionally a `name` capture
    pub sender_patterns: &'static [Regex],

    /// Patterns with a `to` capture
    pub destination_patterns: &'static [Regex],
}

impl ClientDescriptor {
    /// Sender address from the first pattern with a non-empty `from`
    #[must_use]
    pub fn capture_sender(&self, text: &str) -> Option<String> {
        self.sender_patterns
            .iter()
            .find_map(|pattern| named_capture(pattern, text, "from"))
            .map(|from| from.trim().to_string())
    }

    /// Display name from the first pattern capturing both a non-blank
    /// `name` and a `from`.
    ///
    /// A name wrapped in quotes is returned without them.
    #[must_use]
    pub fn capture_sender_name(&self, text: &str) -> Option<String> {
        self.sender_patterns
            .iter()
            .find_map(|pattern| {
                let caps = pattern.captures(text)?;
                caps.name("from").filter(|m| !m.as_str().is_empty())?;
                let name = unquote(caps.name("name")?.as_str().trim()).trim();
                (!name.is_empty()).then(|| name.to_string())
            })
    }

    /// Destination address; for a list only the last entry is kept
    #[must_use]
    pub fn capture_destination(&self, text: &str) -> Option<String> {
        self.destination_patterns
            .iter()
            .find_map(|pattern| named_capture(pattern, text, "to"))
            .map(|to| to.rsplit(',').next().unwrap_or(to).trim().to_string())
    }

    /// Raw date string, limited to its first line
    #[must_use]
    pub fn capture_date_string(&self, text: &str) -> Option<String> {
        self.date_patterns
            .iter()
            .find_map(|pattern| named_capture(pattern, text, "date"))
            .and_then(|date| date.trim().lines().next())
            .map(ToString::to_string)
    }

    /// Parse the send date.
    ///
    /// Every date pattern's capture is tried against every template before
    /// falling back to the free-form layouts over the whole text.
    #[must_use]
    pub fn parse_date(&self, text: &str) -> Option<DateTime<Utc>> {
        self.date_patterns
            .iter()
            .filter_map(|pattern| named_capture(pattern, text, "date"))
            .find_map(|raw| dates::parse_with_templates(raw.trim(), self.date_formats))
            .or_else(|| dates::parse_special_case(text))
            .map(dates::to_utc)
    }

    /// Single-layer plain-text extraction shared by most clients
    #[must_use]
    pub fn extract_from_text(&self, text: &str) -> Extraction {
        Extraction {
            sender: self.capture_sender(text),
            sender_name: self.capture_sender_name(text),
            date: self.parse_date(text),
            body: body_after_headers(text),
            body_method: "after_headers",
        }
    }
}

fn named_capture<'t>(pattern: &Regex, text: &'t str, group: &str) -> Option<&'t str> {
    pattern
        .captures(text)?
        .name(group)
        .map(|m| m.as_str())
        .filter(|value| !value.is_empty())
}

/// Strip a surrounding pair of double quotes from a display name
#[must_use]
pub fn unquote(name: &str) -> &str {
    match (name.find('"'), name.rfind('"')) {
        (Some(first), Some(last)) if first != last => &name[first + 1..last],
        _ => name,
    }
}

/// The header label that appears last in `text`, judged by the position of
/// each label's first occurrence with line breaks removed.
#[must_use]
pub fn last_header_label(text: &str) -> Option<&'static str> {
    let flat = text.replace('\n', "");
    let mut last: Option<(usize, &'static str)> = None;

    for label in HEADER_LABELS {
        if let Some(index) = flat.find(label)
            && last.is_none_or(|(largest, _)| index > largest)
        {
            last = Some((index, label));
        }
    }

    last.map(|(_, label)| label)
}

/// Whether `text` carries any header label
#[must_use]
pub fn is_header_text(text: &str) -> bool {
    HEADER_LABELS.iter().any(|label| text.contains(label))
}

/// Everything after the line holding the last header label
#[must_use]
pub fn body_after_headers(text: &str) -> String {
    let Some(label) = last_header_label(text) else {
        return String::new();
    };

    let Some(line) = text.match_indices(label).find_map(|(index, _)| {
        let rest = &text[index + label.len()..];
        let line_len = rest.find('\n').unwrap_or(rest.len());
        (line_len > 0).then(|| &text[index..index + label.len() + line_len])
    }) else {
        return String::new();
    };

    text.split(line).skip(1).collect()
}
