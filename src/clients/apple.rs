//! Apple Mail: `Begin forwarded message:` followed by a cited blockquote

use super::ClientStrategy;
use crate::dates;
use crate::dom::{self, Dom, Handle};
use crate::error::{ExtractError, Result};
use crate::fields::{ClientDescriptor, compile};
use crate::types::Extraction;
use regex::Regex;
use scraper::Selector;
use std::sync::LazyLock;

pub(crate) const MARKER: &str = "Begin forwarded message:";

static MARKER_LAYOUT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<(br class=(3D)?"")|(div( class=(3D)?"")?)>Begin forwarded message:"#).unwrap()
});

static FROM_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"<b( class=".*")?>From:"#).unwrap());

static MAILTO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i).*?mailto:([A-Z0-9_%+-]+(\.[A-Z0-9_%+-]+)*@([A-Z0-9-]+\.)+[A-Z]{2,32})")
        .unwrap()
});

static HEADER_CHILD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"<b( class=.*)??>(Subject|Reply-To|To|From|Date):.*?</b>").unwrap()
});

static BLOCKQUOTE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("blockquote").unwrap());
static LTR_DIV: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"blockquote div[dir="ltr"]"#).unwrap());

static DATE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"Date:\s*(?P<date>.*\sat\s.*)To:",
        r"Date:\s*(?P<date>.*\sat\s.*)",
    ])
});

static SENDER_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"From:\s*(?P<name>[^<]*)<(?P<from>[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9.-]+)>Date:",
        r"From:\s*(?P<name>[^<]*)<(?P<from>[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9.-]+)>$",
        r"From:\s*(?P<name>[^<]*)<(?P<from>[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9.-]+)>.*$",
        r".*From:\s*(?P<name>[^<]*)<(?P<from>[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9.-]+)>Date:",
        r".*From:\s*(?P<name>[^<]*)<(?P<from>[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9.-]+)>$",
        r".*From:\s*(?P<name>[^<]*)<(?P<from>[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9.-]+)>.*$",
        r"From:\s*(?P<from>[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9.-]+)Date:",
        r"From:\s*(?P<from>[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9.-]+)$",
    ])
});

/// Labels that mark a header row inside the cited blockquote
const ROW_LABELS: [&str; 6] = ["From:", "Subject:", "To:", "Date:", "Cc:", "Reply-To:"];

/// Offset of the Apple forward marker in markup.
///
/// Outlook for Mac writes the same marker, so its detection consults this.
pub(crate) fn detect(markup: &str) -> Option<usize> {
    MARKER_LAYOUT
        .is_match(markup)
        .then(|| markup.find(MARKER))
        .flatten()
}

pub struct Apple {
    descriptor: ClientDescriptor,
}

impl Apple {
    #[must_use]
    pub fn new() -> Self {
        Self {
            descriptor: ClientDescriptor {
                name: "apple",
                date_patterns: DATE_PATTERNS.as_slice(),
                date_formats: &[],
                sender_patterns: SENDER_PATTERNS.as_slice(),
                destination_patterns: &[],
            },
        }
    }

    fn sender(&self, quote: Handle<'_>, header_text: &str) -> Option<String> {
        let mut from_found = false;
        for child in dom::element_children(quote) {
            let markup = dom::inner_html(child);
            from_found = from_found || FROM_HEADER.is_match(&markup);
            if from_found && let Some(caps) = MAILTO.captures(&markup) {
                return caps.get(1).map(|m| m.as_str().to_string());
            }
        }
        self.descriptor.capture_sender(header_text)
    }

    fn sender_name(&self, quote: Handle<'_>, header_text: &str) -> Option<String> {
        let inline = dom::child_at(quote, &[0, 1]).and_then(|cell| {
            cell.children()
                .filter_map(dom::text_data)
                .map(str::trim)
                .find(|text| !text.is_empty())
                .map(|text| text.replace("&lt;", " ").replace('<', " ").trim().to_string())
        });

        inline
            .or_else(|| {
                dom::child_at(quote, &[0, 0, 1])
                    .and_then(|cell| cell.first_child())
                    .and_then(|node| node.first_child().or(Some(node)))
                    .and_then(dom::text_data)
                    .map(|text| text.trim().to_string())
            })
            .filter(|name| !name.is_empty())
            .or_else(|| self.descriptor.capture_sender_name(header_text))
    }

    fn date(&self, quote: Handle<'_>, header_text: &str) -> Option<chrono::NaiveDateTime> {
        [[2, 1, 0], [1, 1, 0]]
            .iter()
            .filter_map(|path| dom::child_at(quote, path).and_then(dom::text_data))
            .find_map(dates::parse_special_case)
            .or_else(|| {
                self.descriptor
                    .capture_date_string(header_text)
                    .and_then(|raw| dates::parse_special_case(&raw))
            })
    }
}

impl Default for Apple {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientStrategy for Apple {
    fn descriptor(&self) -> &ClientDescriptor {
        &self.descriptor
    }

    fn detect_in_markup(&self, markup: &str) -> Option<usize> {
        detect(markup)
    }

    fn detect_in_text(&self, text: &str, iphone_seen: bool) -> Option<usize> {
        if iphone_seen {
            return None;
        }
        text.find(MARKER)
    }

    fn extract_from_markup(&self, markup: &str) -> Result<Extraction> {
        let dom = Dom::parse(markup);
        let quotes: Vec<Handle<'_>> = dom.select(&BLOCKQUOTE).map(|quote| *quote).collect();
        let Some(&quote) = quotes.first() else {
            return Err(ExtractError::extraction("No blockquote tag was found"));
        };
        let header_text = dom::text_of_all(quotes.iter().copied());

        let sender = self
            .sender(quote, &header_text)
            .ok_or_else(|| ExtractError::extraction("Couldn't find the sender email address"))?;
        let sender_name = self.sender_name(quote, &header_text);
        let date = self
            .date(quote, &header_text)
            .map(dates::to_utc)
            .ok_or_else(|| ExtractError::extraction("Couldn't find the send date"))?;

        let (body, body_method) = if let Some(ltr) = dom.first(&LTR_DIV) {
            (dom::inner_html(ltr), "ltr_div")
        } else {
            let headers_stripped = if quotes.len() > 2 {
                dom.parent(quote)
                    .map(|parent| dom.parent(parent).unwrap_or(parent))
                    .map(after_interchange_newline)
            } else {
                Some(after_forward_headers(quote))
            };
            match headers_stripped {
                Some(body) if !body.is_empty() => (body, "after_headers"),
                _ => (body_without_header_rows(quote), "blockquote"),
            }
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

/// Children of `container` following the one that carries the marker
fn after_interchange_newline(container: Handle<'_>) -> String {
    let mut body = Vec::new();
    let mut start_found = false;
    for child in container.children() {
        if start_found {
            if !body.is_empty()
                || !dom::inner_html(child).is_empty()
                || !dom::text_of(child).is_empty()
            {
                body.push(child);
            }
        } else {
            start_found = dom::inner_html(child).contains(MARKER);
        }
    }
    dom::join_html(body)
}

/// Children of the blockquote after the last header row.
///
/// A header row restarts the body and swallows the row that follows it,
/// unless the row also holds a nested forward marker.
fn after_forward_headers(quote: Handle<'_>) -> String {
    let children: Vec<Handle<'_>> = quote.children().collect();
    let mut body = Vec::new();
    let mut unforwarded = false;
    let mut i = 0;

    while i < children.len() {
        let child = children[i];
        let markup = dom::inner_html(child);
        if markup.is_empty() {
            if !body.is_empty() || !dom::text_of(child).is_empty() {
                body.push(child);
            }
        } else if unforwarded || !HEADER_CHILD.is_match(&markup) {
            body.push(child);
        } else if markup.contains(MARKER) {
            unforwarded = true;
            body.push(child);
        } else {
            body.clear();
            i += 1;
        }
        i += 1;
    }
    dom::join_html(body)
}

fn body_without_header_rows(quote: Handle<'_>) -> String {
    dom::join_html(quote.children().filter(|child| !is_header_row(*child)))
}

fn is_header_row(node: Handle<'_>) -> bool {
    [&[0, 0, 0][..], &[0, 0, 0, 0], &[1, 0, 0]].iter().any(|path| {
        dom::child_at(node, path)
            .and_then(dom::text_data)
            .is_some_and(|label| ROW_LABELS.contains(&label.trim()))
    })
}
