//! Outlook 2010: a header block introduced by an `<hr>` and a `Sent:` line

use super::ClientStrategy;
use crate::dom::{self, Dom, Handle};
use crate::error::{ExtractError, Result};
use crate::fields::{ClientDescriptor, compile};
use crate::types::Extraction;
use regex::Regex;
use scraper::Selector;
use std::sync::LazyLock;

static RULE_IN_DIV: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div hr").unwrap());
static BOLD: LazyLock<Selector> = LazyLock::new(|| Selector::parse("b").unwrap());
static SPAN: LazyLock<Selector> = LazyLock::new(|| Selector::parse("span").unwrap());

static DATE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"\*?Sent:\*?\s*(?P<date>.*)$",
        r"\*?Date:\*?\s*(?P<date>.*)$",
    ])
});

static SENDER_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"\*?From:\*?(?P<name>[^<]*)<(?P<from>.*)>$",
        r"\*?From:\*?(?P<from>.*)$",
    ])
});

pub(super) static DESTINATION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[r"\*?To:\*?.*<(?P<to>.*)>$", r"\*?To:\*?(?P<to>.*)$"])
});

pub(super) const DATE_FORMATS: &[&str] = &["%Y, %B, %d %I:%M %p", "%A, %d %B %Y %H:%M:%S %Z"];

/// The element holding the forward header rows.
///
/// Normally the parent of the first rule inside a `div`; when that holds no
/// bold labels, the ancestor `levels` up from the first `span` naming the
/// sender.
pub(super) fn forward_header<'a>(dom: &'a Dom, levels: usize) -> Option<Handle<'a>> {
    dom.first(&RULE_IN_DIV)
        .and_then(|rule| dom.parent(rule))
        .filter(|header| !dom::select_within(*header, &BOLD).is_empty())
        .or_else(|| {
            dom.select(&SPAN)
                .find(|span| dom::text_of(**span).contains("From:"))
                .and_then(|span| dom.ancestor(*span, levels))
        })
}

pub struct Outlook2010 {
    descriptor: ClientDescriptor,
}

impl Outlook2010 {
    #[must_use]
    pub fn new() -> Self {
        Self {
            descriptor: ClientDescriptor {
                name: "outlook2010",
                date_patterns: DATE_PATTERNS.as_slice(),
                date_formats: DATE_FORMATS,
                sender_patterns: SENDER_PATTERNS.as_slice(),
                destination_patterns: DESTINATION_PATTERNS.as_slice(),
            },
        }
    }
}

impl Default for Outlook2010 {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientStrategy for Outlook2010 {
    fn descriptor(&self) -> &ClientDescriptor {
        &self.descriptor
    }

    fn detect_in_markup(&self, markup: &str) -> Option<usize> {
        Some(markup.find("<hr")?.max(markup.find("Sent:")?))
    }

    fn detect_in_text(&self, text: &str, _iphone_seen: bool) -> Option<usize> {
        Some(text.find("*From:*")?.min(text.find("*Sent:*")?))
    }

    fn extract_from_markup(&self, markup: &str) -> Result<Extraction> {
        let dom = Dom::parse(markup);
        let header = forward_header(&dom, 4)
            .ok_or_else(|| ExtractError::extraction("Couldn't find the forward header"))?;
        let text = dom::text_of(header);

        let sender = self
            .descriptor
            .capture_sender(&text)
            .ok_or_else(|| ExtractError::extraction("Couldn't find the sender email address"))?;
        self.descriptor
            .capture_destination(&text)
            .ok_or_else(|| ExtractError::extraction("Couldn't find the destination email address"))?;

        Ok(Extraction {
            sender_name: self.descriptor.capture_sender_name(&text),
            date: self.descriptor.parse_date(&text),
            body: dom::join_html(dom::next_element_siblings(header)),
            body_method: "after_header",
            sender: Some(sender),
        }
        .without_echoed_name())
    }
}
