//! Lotus Notes: `----- Forwarded by ... on <date> -----`

use super::ClientStrategy;
use crate::dom::{self, Dom, Handle};
use crate::error::{ExtractError, Result};
use crate::fields::{ClientDescriptor, compile};
use crate::types::Extraction;
use regex::Regex;
use scraper::Selector;
use std::collections::HashSet;
use std::sync::LazyLock;

const MARKER: &str = "----- Forwarded by";

static TABLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table").unwrap());

static DATE_PATTERNS: LazyLock<Vec<Regex>> =
    LazyLock::new(|| compile(&[r"----- Forwarded by .*\n.* on (?P<date>[^-]*) -----"]));

static SENDER_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[r"----- Forwarded by [^-]*-*(?P<name>[^<]*)<(?P<from>[^>]*)>"])
});

const DATE_FORMATS: &[&str] = &["%Y/%m/%d %I:%M %p"];

pub struct LotusNotes {
    descriptor: ClientDescriptor,
}

impl LotusNotes {
    #[must_use]
    pub fn new() -> Self {
        Self {
            descriptor: ClientDescriptor {
                name: "lotusnotes",
                date_patterns: DATE_PATTERNS.as_slice(),
                date_formats: DATE_FORMATS,
                sender_patterns: SENDER_PATTERNS.as_slice(),
                destination_patterns: &[],
            },
        }
    }
}

impl Default for LotusNotes {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientStrategy for LotusNotes {
    fn descriptor(&self) -> &ClientDescriptor {
        &self.descriptor
    }

    fn detect_in_markup(&self, markup: &str) -> Option<usize> {
        markup.find(MARKER)
    }

    fn detect_in_text(&self, text: &str, _iphone_seen: bool) -> Option<usize> {
        text.find(MARKER)
    }

    fn extract_from_markup(&self, markup: &str) -> Result<Extraction> {
        let dom = Dom::parse(markup);
        let text = dom.text();

        let sender = self
            .descriptor
            .capture_sender(&text)
            .ok_or_else(|| ExtractError::extraction("Couldn't find the sender email address"))?;
        let date = self
            .descriptor
            .parse_date(&text)
            .ok_or_else(|| ExtractError::extraction("Couldn't find the send date"))?;

        Ok(Extraction {
            sender: Some(sender),
            sender_name: self.descriptor.capture_sender_name(&text.replace('\n', " ")),
            date: Some(date),
            body: body_after_tables(&dom),
            body_method: "after_table",
        }
        .without_echoed_name())
    }
}

/// Elements following any table, each serialized once in document order
fn body_after_tables(dom: &Dom) -> String {
    let mut seen = HashSet::new();
    let body: Vec<Handle<'_>> = dom
        .select(&TABLE)
        .flat_map(|table| dom::next_element_siblings(*table))
        .filter(|sibling| seen.insert(sibling.id()))
        .collect();
    dom::join_html(body)
}
