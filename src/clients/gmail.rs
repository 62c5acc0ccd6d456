//! Gmail: `<div class="gmail_quote">---------- Forwarded message ----------`

use super::{ClientStrategy, strip_newlines};
use crate::dom::{self, Dom, Handle};
use crate::error::{ExtractError, Result};
use crate::fields::{ClientDescriptor, compile};
use crate::types::Extraction;
use regex::Regex;
use scraper::Selector;
use std::sync::LazyLock;

const MARKER: &str = "---------- Forwarded message ----------";
const QUOTE_OPEN: &str = r#"<div class="gmail_quote">"#;

static QUOTE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"gmail_quote.*---------- Forwarded message ----------").unwrap());

static LINE_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<\s*br\s*/?\s*>").unwrap());

static GMAIL_QUOTE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.gmail_quote").unwrap());
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());

static DATE_PATTERNS: LazyLock<Vec<Regex>> =
    LazyLock::new(|| compile(&[r"Date:\s*(?P<date>.*)$"]));

static SENDER_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"From:(?P<name>[^<]*)<(?P<from>[^<]*)<(?P<mailto>[^>]*)>\s*>$",
        r"From:(?P<name>[^<]*)<(?P<from>[^>]*)>$",
    ])
});

static DESTINATION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"To:.*,\s*<(?P<to>.*@.*)>$",
        r"To:.*<(?P<to>.*@.*)>$",
        r"To:.*,\s*(?P<to>.*@.*)$",
        r"To:.*(?P<to>.*@.*)$",
    ])
});

const DATE_FORMATS: &[&str] = &[
    "%A, %B %d, %Y at %I:%M %p",
    "%Y-%m-%d %I:%M %p",
    "%B %d, %Y %I:%M %p",
    "%A, %B %d, %Y",
    "%A, %d %B %Y",
    "%Y-%m-%d %H:%M:%S %Z",
    "%Y-%m-%d %H:%M %Z",
    "%Y-%m-%d %H:%M",
    "%d %B %Y at %I:%M %p",
    "%d %B %Y at %H:%M",
    "%d %B %Y %I:%M %p",
    "%d %B %Y %H:%M",
    "%B %d, %Y, %H:%M",
];

pub struct Gmail {
    descriptor: ClientDescriptor,
}

impl Gmail {
    #[must_use]
    pub fn new() -> Self {
        Self {
            descriptor: ClientDescriptor {
                name: "gmail",
                date_patterns: DATE_PATTERNS.as_slice(),
                date_formats: DATE_FORMATS,
                sender_patterns: SENDER_PATTERNS.as_slice(),
                destination_patterns: DESTINATION_PATTERNS.as_slice(),
            },
        }
    }
}

impl Default for Gmail {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientStrategy for Gmail {
    fn descriptor(&self) -> &ClientDescriptor {
        &self.descriptor
    }

    fn detect_in_markup(&self, markup: &str) -> Option<usize> {
        let flat = strip_newlines(markup);
        flat.find(&format!("{QUOTE_OPEN}{MARKER}")).or_else(|| {
            QUOTE_MARKER
                .is_match(&flat)
                .then(|| flat.find(QUOTE_OPEN))
                .flatten()
        })
    }

    fn detect_in_text(&self, text: &str, _iphone_seen: bool) -> Option<usize> {
        text.find(MARKER)
    }

    fn extract_from_markup(&self, markup: &str) -> Result<Extraction> {
        let markup = LINE_BREAK.replace_all(markup, "<br>\n");
        let dom = Dom::parse(&markup);
        let quote = dom
            .first(&GMAIL_QUOTE)
            .ok_or_else(|| ExtractError::extraction("No div with class gmail_quote"))?;
        let text = dom::text_of(quote);

        let sender = sender_link(quote)
            .or_else(|| self.descriptor.capture_sender(&text))
            .ok_or_else(|| ExtractError::extraction("Couldn't find the sender email address"))?;
        let sender_name =
            bold_name(quote).or_else(|| self.descriptor.capture_sender_name(&text));
        let date = self
            .descriptor
            .parse_date(&text)
            .ok_or_else(|| ExtractError::extraction("Couldn't find the date"))?;
        let destination = self
            .descriptor
            .capture_destination(&text)
            .ok_or_else(|| ExtractError::extraction("Couldn't find the destination address"))?;

        let linked = dom::select_within(quote, &ANCHOR)
            .into_iter()
            .any(|anchor| dom::text_of(anchor).contains(&destination));
        if !linked {
            return Err(ExtractError::extraction("Couldn't find the To: tag"));
        }

        let (body, body_method) = match body_after_recipients(quote) {
            body if !body.is_empty() => (body, "method_1"),
            _ => (body_after_to_line(quote).unwrap_or_default(), "method_2"),
        };

        Ok(Extraction {
            sender: Some(sender),
            sender_name,
            date: Some(date),
            body,
            body_method,
        }
        .without_echoed_name())
    }
}

/// Text of the first link inside a top-level `span` of the quote
fn sender_link(quote: Handle<'_>) -> Option<String> {
    dom::element_children(quote)
        .filter(|child| dom::has_tag(*child, "span"))
        .flat_map(dom::element_children)
        .find(|child| dom::has_tag(*child, "a"))
        .map(|anchor| dom::text_of(anchor).trim().to_string())
        .filter(|sender| !sender.is_empty())
}

/// Gmail puts the display name in a top-level `b`
fn bold_name(quote: Handle<'_>) -> Option<String> {
    dom::element_children(quote)
        .filter(|child| dom::has_tag(*child, "b"))
        .find_map(|bold| {
            bold.first_child()
                .and_then(dom::text_data)
                .filter(|text| !text.is_empty())
        })
        .map(|name| name.trim().to_string())
}

/// Quote children from the first `br` after the recipient lines
fn body_after_recipients(quote: Handle<'_>) -> String {
    let children: Vec<Handle<'_>> = quote.children().collect();
    let start = body_start_index(&children);
    dom::join_html(children.into_iter().skip(start))
}

fn body_start_index(children: &[Handle<'_>]) -> usize {
    let mut index = 0;
    let mut to_found = false;

    for (i, child) in children.iter().enumerate() {
        let Some(text) = dom::text_data(*child) else {
            continue;
        };
        if text.contains("To:") {
            if to_found {
                // a second To: belongs to a nested forward
                break;
            }
            to_found = true;
            index = i;
        }
        if text.contains("Cc:") && to_found {
            index = i;
            break;
        }
    }

    if let Some(offset) = children
        .iter()
        .skip(index + 1)
        .position(|child| dom::has_tag(*child, "br"))
    {
        return index + 1 + offset;
    }

    // alternate layout: the body follows the first two divs
    let mut divs = 0;
    for (i, child) in children.iter().enumerate() {
        if dom::has_tag(*child, "div") {
            divs += 1;
        }
        if divs == 2 {
            return i + 1;
        }
    }
    0
}

/// Siblings following the first `br` after the text node holding `To:`
fn body_after_to_line(quote: Handle<'_>) -> Option<String> {
    let to_node = dom::find_text_node(quote, "To:")?;
    let parent = to_node.parent()?;

    let mut to_found = false;
    let mut br_found = false;
    let mut body = Vec::new();
    for child in parent.children() {
        if !to_found {
            to_found = dom::text_data(child).is_some_and(|text| text.contains("To:"));
        } else if !br_found {
            br_found = dom::has_tag(child, "br");
        } else {
            body.push(child);
        }
    }
    Some(dom::join_html(body))
}
