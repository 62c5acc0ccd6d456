//! iPhone Mail: `Sent from my iPhone` ahead of `Begin forwarded message:`

use super::{ClientStrategy, IPHONE, strip_newlines};
use crate::dates;
use crate::dom::{self, Dom, Handle};
use crate::error::{ExtractError, Result};
use crate::fields::{self, ClientDescriptor, compile};
use crate::types::Extraction;
use chrono::{DateTime, Utc};
use regex::Regex;
use scraper::Selector;
use std::sync::LazyLock;

static MARKUP_MARKERS: LazyLock<Vec<Regex>> =
    LazyLock::new(|| compile(&[r"Sent from my iPhone.*Begin forwarded message:"]));

static TEXT_MARKERS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"Sent from my iPhone",
        r"Begin forwarded message:",
        r"Sent using the free mail\.com iPhone App\s*Forwarded email",
    ])
});

static QUOTE_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\n|^)(>[ \t]*)+[ \t]*").unwrap());

static BLOCKQUOTE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("blockquote").unwrap());

static DATE_PATTERNS: LazyLock<Vec<Regex>> =
    LazyLock::new(|| compile(&[r"Date:\s*(?P<date>.*\s(at\s)*.*)(\n|To:)"]));

static SENDER_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"From:.*<mailto:(?P<from>.*@.*)>>",
        r"From:(?P<name>[^<]*)<(?P<from>.*@.*)>.*From:",
        r"From:(?P<name>[^<]*)<(?P<from>.*@.*)>.*Date:",
        r"From:(?P<name>[^<]*)<(?P<from>.*@.*)>.*Content:",
        r"From:.*<mailto:(?P<from>[-a-zA-Z0-9~!$%^&*_=+}{'?]+(\.[-a-zA-Z0-9~!$%^&*_=+}{'?]+)*@([a-z0-9_][-a-z0-9_]*(\.[-a-z0-9_]+)*\.[a-z]+|([0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}))(:[0-9]{1,5})?)>>",
        r"From:(?P<name>[^<]*)<(?P<from>[-a-zA-Z0-9~!$%^&*_=+}{'?]+(\.[-a-zA-Z0-9~!$%^&*_=+}{'?]+)*@([a-z0-9_][-a-z0-9_]*(\.[-a-z0-9_]+)*\.[a-z]+|([0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}))(:[0-9]{1,5})?)>((\b|\n)|(From|Date|Content):)",
        r"From:\s*(?P<from>[-a-zA-Z0-9~!$%^&*_=+}{'?]+(\.[-a-zA-Z0-9~!$%^&*_=+}{'?]+)*@([a-z0-9_][-a-z0-9_]*(\.[-a-z0-9_]+)*\.[a-z]+|([0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}))(:[0-9]{1,5})?)",
        r"From:\s*(?P<from>.*)Date:",
    ])
});

pub struct IPhone {
    descriptor: ClientDescriptor,
}

impl IPhone {
    #[must_use]
    pub fn new() -> Self {
        Self {
            descriptor: ClientDescriptor {
                name: IPHONE,
                date_patterns: DATE_PATTERNS.as_slice(),
                date_formats: &[],
                sender_patterns: SENDER_PATTERNS.as_slice(),
                destination_patterns: &[],
            },
        }
    }

    /// Header fields, retried with line breaks removed when the layout
    /// splits a field over several lines
    fn header_fields(&self, text: &str) -> Result<(String, Option<String>, DateTime<Utc>)> {
        let flat = strip_newlines(text);
        let sender = self
            .descriptor
            .capture_sender(text)
            .or_else(|| self.descriptor.capture_sender(&flat))
            .ok_or_else(|| ExtractError::extraction("Couldn't find the sender email address"))?;
        let sender_name = self
            .descriptor
            .capture_sender_name(text)
            .or_else(|| self.descriptor.capture_sender_name(&flat));
        let date = self
            .descriptor
            .capture_date_string(text)
            .or_else(|| self.descriptor.capture_date_string(&flat))
            .and_then(|raw| dates::parse_special_case(&raw))
            .map(dates::to_utc)
            .ok_or_else(|| ExtractError::extraction("Couldn't find the send date"))?;
        Ok((sender, sender_name, date))
    }
}

impl Default for IPhone {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientStrategy for IPhone {
    fn descriptor(&self) -> &ClientDescriptor {
        &self.descriptor
    }

    fn detect_in_markup(&self, markup: &str) -> Option<usize> {
        first_marker(&MARKUP_MARKERS, &strip_newlines(markup))
    }

    fn detect_in_text(&self, text: &str, _iphone_seen: bool) -> Option<usize> {
        first_marker(&TEXT_MARKERS, &strip_newlines(text))
    }

    fn extract_from_markup(&self, markup: &str) -> Result<Extraction> {
        let dom = Dom::parse(markup);
        let quotes: Vec<Handle<'_>> = dom.select(&BLOCKQUOTE).map(|quote| *quote).collect();
        if quotes.is_empty() {
            return Err(ExtractError::extraction("No blockquote tag was found"));
        }
        let (sender, sender_name, date) = self.header_fields(&dom::text_of_all(quotes.iter().copied()))?;

        let (body, body_method) = body_after_top_quote(&dom)
            .map(|body| (body, "method_1"))
            .or_else(|| quotes.get(1).map(|quote| (dom::inner_html(*quote), "method_2")))
            .ok_or_else(|| ExtractError::extraction("Couldn't find the body"))?;

        Ok(Extraction {
            sender: Some(sender),
            sender_name,
            date: Some(date),
            body,
            body_method,
        }
        .without_echoed_name())
    }

    fn extract_from_text(&self, text: &str) -> Result<Extraction> {
        let (sender, sender_name, date) = self.header_fields(text)?;
        Ok(Extraction {
            sender: Some(sender),
            sender_name,
            date: Some(date),
            body: body_after_header_lines(text),
            body_method: "after_headers",
        }
        .without_echoed_name())
    }
}

fn first_marker(markers: &[Regex], text: &str) -> Option<usize> {
    markers
        .iter()
        .find_map(|marker| marker.find(text))
        .map(|m| m.start())
}

/// Top-level nodes following the first top-level blockquote
fn body_after_top_quote(dom: &Dom) -> Option<String> {
    let root = dom.root();
    let quote = dom::element_children(root).find(|child| dom::has_tag(*child, "blockquote"))?;
    Some(dom::join_html(quote.next_siblings()))
}

/// Lines after the one carrying the last header label, with reply quote
/// prefixes stripped
fn body_after_header_lines(text: &str) -> String {
    let last = fields::last_header_label(text);
    let mut first_found = false;
    let mut last_found = false;
    let mut body = String::new();

    for line in text.split('\n') {
        if first_found && last_found {
            body.push_str(line);
            body.push('\n');
        } else if fields::is_header_text(line) {
            first_found = true;
            last_found = last_found || last.is_some_and(|label| line.contains(label));
        }
    }

    QUOTE_PREFIX.replace_all(&body, "\n").trim().to_string()
}
