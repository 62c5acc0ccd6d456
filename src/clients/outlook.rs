//! Outlook for Mac: `Begin forwarded message:` with `<blockquote type="cite">`

use super::{ClientStrategy, apple};
use crate::dates;
use crate::dom::{self, Dom, Handle};
use crate::error::{ExtractError, Result};
use crate::fields::{ClientDescriptor, compile, unquote};
use crate::types::Extraction;
use chrono::{DateTime, Utc};
use regex::Regex;
use scraper::Selector;
use std::sync::LazyLock;

const CITE_OPEN: &str = r#"<blockquote type="cite">"#;
const TEXT_MARKER: &str = "------------------------------";

static NESTED_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^.*Date:\s(\w+\s\d+,\s\d+)\sat\s(\d+:\d+:\d+\s\w+)\s*.*$").unwrap()
});

static BLOCKQUOTE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("blockquote").unwrap());
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());
static DIV: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div").unwrap());
static SPAN: LazyLock<Selector> = LazyLock::new(|| Selector::parse("span").unwrap());

static DATE_PATTERNS: LazyLock<Vec<Regex>> =
    LazyLock::new(|| compile(&[r"Date:\s*(?P<date>.*)$"]));

static SENDER_PATTERNS: LazyLock<Vec<Regex>> =
    LazyLock::new(|| compile(&[r"From:\s*(?P<name>.*)(?P<from>.*)>$"]));

static DESTINATION_PATTERNS: LazyLock<Vec<Regex>> =
    LazyLock::new(|| compile(&[r"To:\s*(?P<to>.*)>$"]));

const DATE_FORMATS: &[&str] = &["%B %d, %Y at %I:%M:%S %p", "%B %d, %Y at %I:%M:%S %p %Z"];

pub struct Outlook {
    descriptor: ClientDescriptor,
}

impl Outlook {
    #[must_use]
    pub fn new() -> Self {
        Self {
            descriptor: ClientDescriptor {
                name: "outlook",
                date_patterns: DATE_PATTERNS.as_slice(),
                date_formats: DATE_FORMATS,
                sender_patterns: SENDER_PATTERNS.as_slice(),
                destination_patterns: DESTINATION_PATTERNS.as_slice(),
            },
        }
    }

    /// A single cited blockquote: the body is its last `div`
    fn extract_single(&self, quote: Handle<'_>) -> Result<Extraction> {
        let sender = first_link_text(quote, |_| true)?;
        let divs = dom::select_within(quote, &DIV);

        let body = match divs.last() {
            Some(last) if !dom::text_of(*last).trim().is_empty() => {
                dom::outer_html(*last).trim().to_string()
            }
            _ => dom::inner_html(quote),
        };

        let date_text = divs
            .get(2)
            .and_then(|div| dom::select_within(*div, &SPAN).get(1).copied())
            .map(|span| dom::text_of(span).trim().to_string())
            .unwrap_or_default();

        Ok(Extraction {
            sender: Some(sender),
            sender_name: None,
            date: self.descriptor.parse_date(&date_text),
            body,
            body_method: "last_div",
        })
    }
}

impl Default for Outlook {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientStrategy for Outlook {
    fn descriptor(&self) -> &ClientDescriptor {
        &self.descriptor
    }

    fn detect_in_markup(&self, markup: &str) -> Option<usize> {
        let forwarded = markup.find(apple::MARKER)?;
        let cite = markup.find(CITE_OPEN)?;
        if apple::detect(markup) == Some(forwarded) {
            return None;
        }
        Some(forwarded.min(cite))
    }

    fn detect_in_text(&self, text: &str, _iphone_seen: bool) -> Option<usize> {
        let index = text.find(TEXT_MARKER)?;
        if index == 0 || text[..index].ends_with('>') {
            return None;
        }
        Some(index)
    }

    fn extract_from_markup(&self, markup: &str) -> Result<Extraction> {
        let dom = Dom::parse(markup);
        let quotes: Vec<Handle<'_>> = dom.select(&BLOCKQUOTE).map(|quote| *quote).collect();

        match quotes.as_slice() {
            [] => Err(ExtractError::extraction("No blockquote tag was found")),
            [quote] => self.extract_single(*quote),
            [first, ..] => {
                let sender = first_link_text(*first, |text| text.contains('@'))?;
                let body: String = quotes[body_quote_index(&quotes)..]
                    .iter()
                    .map(|quote| dom::inner_html(*quote).trim().to_string())
                    .collect();

                let header_text = dom::text_of_all(quotes.iter().flat_map(|q| dom::element_children(*q)));
                let sender_name = dom::element_children(*first)
                    .next()
                    .and_then(|row| dom::child_at(row, &[1]))
                    .and_then(dom::text_data)
                    .and_then(|name| {
                        let unquoted = unquote(name);
                        (unquoted.len() != name.len()).then(|| unquoted.to_string())
                    });

                Ok(Extraction {
                    sender: Some(sender),
                    sender_name,
                    date: nested_date(&header_text),
                    body,
                    body_method: "nested_blockquotes",
                }
                .without_echoed_name())
            }
        }
    }
}

/// Text of the first link under `quote` accepted by `accept`, or of the
/// first link when none is accepted
fn first_link_text(quote: Handle<'_>, accept: impl Fn(&str) -> bool) -> Result<String> {
    let links: Vec<String> = dom::select_within(quote, &ANCHOR)
        .into_iter()
        .map(dom::text_of)
        .collect();
    links
        .iter()
        .find(|text| accept(text))
        .or_else(|| links.first())
        .filter(|text| !text.is_empty())
        .cloned()
        .ok_or_else(|| ExtractError::extraction("Couldn't find the sender email address"))
}

/// Index of the blockquote the forwarded body starts at.
///
/// Counts blockquotes that wrap no other blockquote; the second such one
/// holds the body.
fn body_quote_index(quotes: &[Handle<'_>]) -> usize {
    let mut flat = 0;
    for (i, quote) in quotes.iter().enumerate() {
        if !is_nested(*quote) {
            flat += 1;
        }
        if flat == 2 {
            return i;
        }
    }
    flat
}

fn is_nested(quote: Handle<'_>) -> bool {
    dom::element_children(quote).any(|child| {
        dom::has_tag(child, "blockquote")
            || (dom::has_tag(child, "div")
                && dom::element_children(child).any(|inner| dom::has_tag(inner, "blockquote")))
    })
}

/// `Date: June 3, 2014 at 1:47:52 PM EDT` inside the nested header rows
fn nested_date(text: &str) -> Option<DateTime<Utc>> {
    let caps = NESTED_DATE.captures(text)?;
    let raw = format!("{} {}", caps.get(1)?.as_str(), caps.get(2)?.as_str());
    dates::parse_special_case(&raw).map(dates::to_utc)
}
