//! Hotmail: an Outlook-style header block addressed to a hotmail account

use super::ClientStrategy;
use super::outlook2010::{DATE_FORMATS, DESTINATION_PATTERNS, forward_header};
use crate::dom::{self, Dom};
use crate::error::{ExtractError, Result};
use crate::fields::{ClientDescriptor, compile};
use crate::types::Extraction;
use regex::Regex;
use scraper::Selector;
use std::sync::LazyLock;

/// Nodes of the header paragraph that precede the body
const HEADER_NODES: usize = 12;

static MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)\*?To:\*?.*hotmail.*$").unwrap());

static PARAGRAPH_SPAN: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p > * > span").unwrap());

static DATE_PATTERNS: LazyLock<Vec<Regex>> =
    LazyLock::new(|| compile(&[r"\*?Date:\*?\s*(?P<date>.*)$"]));

static SENDER_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"\*?From:\*?(?P<name>[^<]*)<(?P<from>.*)>$",
        r"\*?From:\*?(?P<from>.*)$",
        r"\*?From:\*?(?P<from>[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9.-]+)",
        r"\*?From:\s*(?P<from>[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9.-]+).*To.*$",
    ])
});

pub struct Hotmail {
    descriptor: ClientDescriptor,
}

impl Hotmail {
    #[must_use]
    pub fn new() -> Self {
        Self {
            descriptor: ClientDescriptor {
                name: "hotmail",
                date_patterns: DATE_PATTERNS.as_slice(),
                date_formats: DATE_FORMATS,
                sender_patterns: SENDER_PATTERNS.as_slice(),
                destination_patterns: DESTINATION_PATTERNS.as_slice(),
            },
        }
    }
}

impl Default for Hotmail {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientStrategy for Hotmail {
    fn descriptor(&self) -> &ClientDescriptor {
        &self.descriptor
    }

    fn detect_in_markup(&self, markup: &str) -> Option<usize> {
        MARKER.find(markup).map(|m| m.start())
    }

    fn detect_in_text(&self, text: &str, _iphone_seen: bool) -> Option<usize> {
        match (text.find("*From:*"), text.find("*Sent:*")) {
            (None, None) => None,
            (from, sent) => from.max(sent),
        }
    }

    fn extract_from_markup(&self, markup: &str) -> Result<Extraction> {
        let dom = Dom::parse(markup);
        let header = forward_header(&dom, 3)
            .ok_or_else(|| ExtractError::extraction("Couldn't find the forward header"))?;
        let text = dom::text_of(header);

        let sender = self
            .descriptor
            .capture_sender(&text)
            .ok_or_else(|| ExtractError::extraction("Couldn't find the sender email address"))?;
        let date = self
            .descriptor
            .parse_date(&text)
            .ok_or_else(|| ExtractError::extraction("Couldn't find the send date"))?;
        self.descriptor
            .capture_destination(&text)
            .ok_or_else(|| ExtractError::extraction("Couldn't find the destination email address"))?;

        let body = dom::join_html(
            dom::select_within(header, &PARAGRAPH_SPAN)
                .into_iter()
                .filter(|span| dom::text_of(*span).contains("Date:"))
                .flat_map(|span| span.children())
                .skip(HEADER_NODES),
        );

        Ok(Extraction {
            sender: Some(sender),
            sender_name: self.descriptor.capture_sender_name(&text),
            date: Some(date),
            body,
            body_method: "header_paragraph",
        }
        .without_echoed_name())
    }
}
