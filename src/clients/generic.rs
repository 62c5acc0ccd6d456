//! Fallback strategy for any forward carrying the four header labels
//!
//! There is no client-specific marker to anchor on, so the body is recovered
//! by several independent tree queries. Each returns an optional candidate;
//! the longest candidate that no longer carries a header label wins.

use super::{ClientStrategy, strip_newlines};
use crate::dom::{self, Dom, Handle};
use crate::error::{ExtractError, Result};
use crate::fields::{self, ClientDescriptor, compile};
use crate::types::Extraction;
use regex::Regex;
use scraper::Selector;
use std::sync::LazyLock;
use tracing::trace;

const FORWARDED_MARKER: &str = "----- Forwarded Message -----";
const INNER_FORWARDED_MARKER: &str = "-------- Forwarded Message --------";

/// Labels whose presence marks a candidate body as still holding headers
const RESIDUAL_LABELS: [&str; 4] = ["To:", "Subject:", "Date:", "From:"];

/// Text fragments left over from header rows, never the start of a body
const HEADER_DEBRIS: [&str; 5] = ["", ">", "<", "\" <", "Cc:  <"];

static WORD_SECTION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.WordSection1").unwrap());
static BLOCKQUOTE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("blockquote").unwrap());

static DATE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"(?:Date|Sent):\s*(?P<date>.*)Subject",
        r"(?:Date|Sent):\s*(?P<date>.*)To:",
        r"(?:Date|Sent):\s*(?P<date>[a-zA-Z]* [ at,:0-9]* ([A-Z]{3}))",
        r"(?:Date|Sent):\s*(?P<date>[a-zA-Z]* [ at,:0-9]*)",
        r"(?:Date|Sent):\s*(?P<date>[a-zA-Z0-9 :+,-]*)",
        r"(?:Date|Sent):\s*</\w+>(?P<date>[a-zA-Z0-9 :+,-]*)",
        r"(?:Date|Sent):\s*(?P<date>.*)$",
        r"(?:Date|Sent):\s*[^a-zA-Z0-9:+,-](?P<date>[a-zA-Z0-9 :+,-]*)\s*$",
        r"(?:Date|Sent):.*(?P<date>[0-9 :+,-]+)[^0-9 :+,-]<",
        r"(?:Date|Sent):.*>(?P<date>[a-zA-Z0-9 :+,-]+)<",
    ])
});

static SENDER_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"^From:(?P<name>[^<]*)<(?P<from>[a-zA-Z0-9_.+-]+@([a-zA-Z0-9-]+\.+)?[a-zA-Z0-9-]+\.+[a-zA-Z0-9.-]{2,4})>.*$",
        r"^.*From:(?P<name>[^<]*)<(?P<from>[a-zA-Z0-9_.+-]+@([a-zA-Z0-9-]+\.+)?[a-zA-Z0-9-]+\.+[a-zA-Z0-9.-]{2,4})>.*$",
        r"^From:(?P<name>[^<]*)<(?P<from>[a-zA-Z0-9_.+-]+@([a-zA-Z0-9-]+\.+)?[a-zA-Z0-9-]+\.+[a-zA-Z0-9.-]{2,4})>To.*$",
        r"^.*From:(?P<name>[^<]*)<(?P<from>[a-zA-Z0-9_.+-]+@([a-zA-Z0-9-]+\.+)?[a-zA-Z0-9-]+\.+[a-zA-Z0-9.-]{2,4})>Date.*$",
        r"^From:(?P<name>[^<]*)<(?P<from>[a-zA-Z0-9_.+-]+@([a-zA-Z0-9-]+\.)+?[a-zA-Z0-9-]+\.+[a-zA-Z0-9.-]{2,4})>Subject.*$",
        r"^.*From:(?P<name>[^<]*)<(?P<from>[a-zA-Z0-9_.+-]+@([a-zA-Z0-9-]+\.+)?[a-zA-Z0-9-]+\.+[a-zA-Z0-9.-]{2,4})>Subject.*$",
        r"^.*From:(?P<name>[^<]*)<(?P<from>[a-zA-Z0-9_.+-]+@([a-zA-Z0-9-]+\.+)?[a-zA-Z0-9-]+\.+[a-zA-Z0-9.-]{2,4})>[^a-zA-Z0-9.-]$",
        r"From:(?P<from>[a-zA-Z0-9_.+-]+@([a-zA-Z0-9-]+\.+)?[a-zA-Z0-9-]+\.+[a-zA-Z0-9.-]{2,4})To.*$",
        r"From:(?P<from>[a-zA-Z0-9_.+-]+@([a-zA-Z0-9-]+\.+)?[a-zA-Z0-9-]+\.+[a-zA-Z0-9.-]{2,4})Date.*$",
        r"From:(?P<from>[a-zA-Z0-9_.+-]+@([a-zA-Z0-9-]+\.+)?[a-zA-Z0-9-]+\.+[a-zA-Z0-9.-]{2,4})Subject",
        r"From:\s*(?P<from>[a-zA-Z0-9_.+-]+@([a-zA-Z0-9-]+\.+)?[a-zA-Z0-9-]+\.+[a-zA-Z0-9.-]{2,4})To.*$",
        r"From:\s*(?P<from>[a-zA-Z0-9_.+-]+@([a-zA-Z0-9-]+\.+)?[a-zA-Z0-9-]+\.+[a-zA-Z0-9.-]{2,4})Date.*$",
        r"From:\s*(?P<from>[a-zA-Z0-9_.+-]+@([a-zA-Z0-9-]+\.+)?[a-zA-Z0-9-]+\.+[a-zA-Z0-9.-]{2,4})Subject.*",
        r"From:<(?P<from>[a-zA-Z0-9_.+-]+@([a-zA-Z0-9-]+\.+)?[a-zA-Z0-9-]+\.+[a-zA-Z0-9.-]{2,4})>$",
        r"From:[\s\w]*<(?P<from>[a-zA-Z0-9_.+-]+@([a-zA-Z0-9-]+\.+)?[a-zA-Z0-9-]+\.+[a-zA-Z0-9.-]{2,4})>",
        r"From:[^\s]*[^a-zA-Z0-9_.+-](?P<from>[a-zA-Z0-9_.+-]+@([a-zA-Z0-9-]+\.+)?[a-zA-Z0-9-]+\.+[a-zA-Z0-9.-]{2,4})[^a-zA-Z0-9_.+-]",
        r"From:[^\s]*[^a-zA-Z0-9_.+-](?P<from>[a-zA-Z0-9_.+-]+@([a-zA-Z0-9-]+\.+)?[a-zA-Z0-9-]+\.+[a-zA-Z0-9.-]{2,4})\s+[^a-zA-Z0-9_.+-]",
        r"From:.*[^a-zA-Z0-9_.+-](?P<from>[a-zA-Z0-9_.+-]+@([a-zA-Z0-9-]+\.+)?[a-zA-Z0-9-]+\.+[a-zA-Z0-9.-]{2,4})[^a-zA-Z0-9_.+-].*$",
        r"From:.*[^a-zA-Z0-9_.+-](?P<from>[a-zA-Z0-9_.+-]+@([a-zA-Z0-9-]+\.+)?[a-zA-Z0-9-]+\.+[a-zA-Z0-9.-]{2,4})\s+[^a-zA-Z0-9_.+-].*$",
    ])
});

const DATE_FORMATS: &[&str] = &[
    "%Y, %B, %d %I:%M %p",
    "%A, %d %B %Y %H:%M:%S %Z",
    "%B, %d, %Y at %I:%M:%S %p %Z",
    "%B %d, %Y at %I:%M:%S %p",
    "%B %d, %Y at %I:%M:%S %p %Z",
    "%B %d, %Y at %H:%M:%S %Z",
    "%B %d, %Y at %H:%M:%S",
    "%B %d, %Y %I:%M %p",
    "%B %d, %Y %H:%M",
    "%B %d, %Y, %H:%M",
    "%A, %B %d, %Y at %I:%M %p",
    "%A, %B %d, %Y",
    "%A, %d %B %Y",
    "%A, %B %d, %Y %H:%M",
    "%A, %B %d, %Y %I:%M %p",
    "%d %B %Y %H:%M:%S %Z",
    "%d %B %Y %H:%M:%S",
    "%Y-%B-%d %H:%M:%S %Z",
    "%Y-%m-%d %H:%M:%S %Z",
    "%Y-%m-%d %I:%M:%S %p",
    "%Y-%m-%d %H:%M %Z",
    "%Y-%m-%d %I:%M %p",
    "%Y-%m-%d %H:%M",
    "%A %B %d %Y",
    "%A, %B %d %Y",
    "%d %B %Y %H:%M",
];

/// A body recovery heuristic, tried in order
type BodyMethod = fn(&Dom) -> Option<String>;

const BODY_METHODS: [(&str, BodyMethod); 6] = [
    ("method_1", body_in_container),
    ("word_section", body_in_word_section),
    ("after_header", body_after_header),
    ("special_case", body_after_header_row),
    ("after_title", body_after_title),
    ("find_parent", body_after_quote_ancestor),
];

pub struct Generic {
    descriptor: ClientDescriptor,
}

impl Generic {
    #[must_use]
    pub fn new() -> Self {
        Self {
            descriptor: ClientDescriptor {
                name: "generic",
                date_patterns: DATE_PATTERNS.as_slice(),
                date_formats: DATE_FORMATS,
                sender_patterns: SENDER_PATTERNS.as_slice(),
                destination_patterns: &[],
            },
        }
    }
}

impl Default for Generic {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientStrategy for Generic {
    fn descriptor(&self) -> &ClientDescriptor {
        &self.descriptor
    }

    fn detect_in_markup(&self, markup: &str) -> Option<usize> {
        detect_labels(&strip_newlines(markup))
    }

    fn detect_in_text(&self, text: &str, _iphone_seen: bool) -> Option<usize> {
        detect_labels(text)
    }

    fn extract_from_markup(&self, markup: &str) -> Result<Extraction> {
        let dom = Dom::parse(markup);
        let text = dom.text().replace('\u{a0}', " ");

        let sender = self
            .descriptor
            .capture_sender(&text)
            .ok_or_else(|| ExtractError::extraction("Couldn't find the sender email address"))?;
        let sender_name = self.descriptor.capture_sender_name(&text);
        let date = self
            .descriptor
            .parse_date(&text)
            .ok_or_else(|| ExtractError::extraction("Couldn't find the send date"))?;
        let (body_method, body) =
            best_body(&dom).ok_or_else(|| ExtractError::extraction("Couldn't find the body"))?;

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

/// Offset of `From:` when all four header labels are present
fn detect_labels(text: &str) -> Option<usize> {
    let from = text.find("From:")?;
    text.find("Subject:")?;
    text.find("Date:").or_else(|| text.find("Sent:"))?;
    text.find("To:")?;
    Some(from)
}

/// Run every body method and keep the longest label-free candidate,
/// otherwise the longest one.
fn best_body(dom: &Dom) -> Option<(&'static str, String)> {
    let candidates: Vec<(&'static str, String)> = BODY_METHODS
        .iter()
        .filter_map(|(name, method)| method(dom).map(|body| (*name, body)))
        .filter(|(_, body)| !body.is_empty())
        .collect();

    let longest = |clean_only: bool| {
        candidates
            .iter()
            .filter(|(_, body)| {
                !clean_only || !RESIDUAL_LABELS.iter().any(|label| body.contains(label))
            })
            .fold(None::<&(&'static str, String)>, |best, candidate| match best {
                Some(current) if current.1.len() >= candidate.1.len() => Some(current),
                _ => Some(candidate),
            })
    };

    let (name, body) = longest(true).or_else(|| longest(false))?;
    trace!(body_method = *name, candidates = candidates.len(), "Generic body selected");
    Some((*name, body.clone()))
}

/// The text node carrying the first `From:` label
fn from_node(dom: &Dom) -> Option<Handle<'_>> {
    dom::find_text_node(dom.root(), "From:")
}

/// Label found in the header row layout `row > cell > label` and its variants
fn header_row_label(node: Handle<'_>) -> Option<String> {
    [&[0, 0, 0][..], &[1, 0, 1], &[1, 0, 0]]
        .iter()
        .find_map(|path| dom::child_at(node, path).and_then(dom::text_data))
        .map(|label| label.trim().to_string())
}

/// Climb from the `From:` node to the first ancestor whose text ends with
/// the same header label as the whole document.
fn header_container(dom: &Dom) -> Option<Handle<'_>> {
    let last = fields::last_header_label(&dom.text());
    let from = from_node(dom)?;
    let mut candidate = dom.parent_div(from).or_else(|| dom.container(from))?;
    loop {
        if fields::last_header_label(&dom::text_of(candidate)) == last {
            return Some(candidate);
        }
        candidate = dom.parent_div(candidate)?;
    }
}

/// Same as [`header_container`] but starting from the outermost enclosing div
fn outer_header_container(dom: &Dom) -> Option<Handle<'_>> {
    let last = fields::last_header_label(&dom.text());
    let from = from_node(dom)?;
    let mut candidate = dom
        .outermost_div(from)
        .or_else(|| dom.outermost_container(from))?;
    loop {
        if fields::last_header_label(&dom::text_of(candidate)) == last {
            return Some(candidate);
        }
        candidate = dom.outermost_div(candidate)?;
    }
}

/// Container children following the last header row
fn body_in_container(dom: &Dom) -> Option<String> {
    let container = header_container(dom)?;
    if dom::has_class(container, "h5") {
        return body_in_last_section(dom);
    }

    let children: Vec<Handle<'_>> = container.children().collect();
    let start = body_start_index(&children, &dom::text_of(container));
    (start > 0).then(|| dom::join_html(children.into_iter().skip(start)))
}

/// Layout with the body in the last top-level element after its first child
fn body_in_last_section(dom: &Dom) -> Option<String> {
    let section = dom::element_children(dom.root()).last()?;
    Some(dom::join_html(section.children().skip(1)))
}

fn body_start_index(children: &[Handle<'_>], container_text: &str) -> usize {
    let last = fields::last_header_label(container_text);
    let mut first_found = false;
    let mut last_found = false;

    for (i, child) in children.iter().enumerate() {
        let label = header_row_label(*child);
        let is_header = label.as_deref().is_some_and(fields::is_header_text);
        if is_header {
            first_found = true;
            last_found = last_found || label.as_deref() == last;
        }
        if first_found && last_found && !is_header {
            return i;
        }
    }
    0
}

/// Outlook 2016 single section: a paragraph followed by a blockquote
fn body_in_word_section(dom: &Dom) -> Option<String> {
    let mut sections = dom.select(&WORD_SECTION);
    let section = sections.next()?;
    if sections.next().is_some() {
        return None;
    }

    match section.children().collect::<Vec<_>>().as_slice() {
        [intro, quote] if dom::has_tag(*intro, "p") && dom::has_tag(*quote, "blockquote") => {
            Some(dom::inner_html(*quote)).filter(|body| !body.is_empty())
        }
        _ => None,
    }
}

/// Siblings of the header element after the `Subject:`, `Date:` and `To:`
/// rows have all been seen.
fn body_after_header(dom: &Dom) -> Option<String> {
    let from = from_node(dom)?;
    let mut parent = dom.parent(from).unwrap_or_else(|| dom.root());
    if dom.is_tag(parent, "b") {
        parent = dom.parent(parent).unwrap_or_else(|| dom.root());
    }

    if header_container(dom).is_some_and(|container| container.id() == parent.id()) {
        let following: String = parent
            .next_siblings()
            .filter_map(|sibling| match dom::text_data(sibling) {
                Some(text) => Some(text.to_string()),
                None => Some(dom::inner_html(sibling)).filter(|html| !html.is_empty()),
            })
            .collect();
        if !following.is_empty() {
            return (!following.trim().is_empty()).then_some(following);
        }
    }

    let mut body: Vec<Handle<'_>> = Vec::new();
    let mut date_found = false;
    let mut subject_found = false;
    let mut to_found = false;
    let mut last_was_to = false;

    for child in parent.children() {
        if subject_found && date_found && to_found {
            if let Some(quote) = dom::select_within(parent, &BLOCKQUOTE).first() {
                for node in quote.children() {
                    if starts_body(&body, node) {
                        body.push(node);
                    }
                }
                break;
            }
            if !last_was_to && starts_body(&body, child) {
                body.push(child);
            }
        }

        let text = dom::text_of(child);
        date_found = date_found || text.contains("Date:");
        subject_found = subject_found || text.contains("Subject:");
        if to_found {
            last_was_to = false;
        } else if text.contains("To:") {
            to_found = true;
            last_was_to = true;
        }
    }

    (!body.is_empty()).then(|| dom::join_html(body))
}

/// Whether `node` may be appended to a body collected so far
fn starts_body(body: &[Handle<'_>], node: Handle<'_>) -> bool {
    if !body.is_empty() {
        return true;
    }
    match dom::text_data(node) {
        Some(text) => !HEADER_DEBRIS.contains(&text.trim()),
        None => node.value().is_element() && !dom::has_tag(node, "a") && !dom::has_tag(node, "br"),
    }
}

/// Header rows spread over sibling divs: find the common container of the
/// `From:`, `To:` and `Reply-To:` rows and take what follows the last row.
fn body_after_header_row(dom: &Dom) -> Option<String> {
    let root = dom.root();
    let from = dom::find_text_node(root, "From:")?;
    let to = dom::find_text_node(root, "To:")?;
    let mut reply_div = dom::find_text_node(root, "Reply-To:").and_then(|node| dom.parent_div(node));

    let mut from_div = dom.parent_div(from);
    let mut to_div = Some(dom.parent_div(to)?);
    let mut header_row = from_div?;
    let mut row_is_child = false;

    if to_div.map(|div| div.id()) != from_div.map(|div| div.id()) {
        let mut last_from = from_div;
        let mut last_to = to_div;
        let mut last_reply = None;
        while from_div.map(|div| div.id()) != to_div.map(|div| div.id()) {
            last_from = from_div;
            last_to = to_div;
            from_div = from_div.and_then(|div| dom.container(div));
            to_div = to_div.and_then(|div| dom.container(div));
            if reply_div.is_some() {
                last_reply = reply_div;
                reply_div = reply_div.and_then(|div| dom.container(div));
            }
        }

        if let Some(common) = from_div {
            let rows = [last_from, last_to, last_reply];
            for child in common.children() {
                if let Some(row) = rows.iter().flatten().find(|row| row.id() == child.id()) {
                    header_row = *row;
                    row_is_child = true;
                }
            }
        }
    }

    let mut container = dom.container(header_row)?;
    if !row_is_child
        && let Some(outer) = dom.parent(container)
        && !dom::has_tag(outer, "html")
    {
        header_row = dom.parent(header_row)?;
        container = outer;
    }

    let body = dom::join_html(
        container
            .children()
            .skip_while(|child| child.id() != header_row.id())
            .skip(1),
    );
    (!body.chars().all(char::is_whitespace)).then_some(body)
}

/// Everything from the first `title` element of the outer header container
fn body_after_title(dom: &Dom) -> Option<String> {
    let container = outer_header_container(dom)?;
    Some(dom::join_html(
        container
            .children()
            .skip_while(|child| !dom::has_tag(*child, "title")),
    ))
}

/// Whether `node` opens a quoted original in some known client layout
fn is_quote_boundary(node: Handle<'_>) -> bool {
    if dom::has_tag(node, "span") {
        return dom::attr(node, "id") == Some("OLK_SRC_BODY_SECTION");
    }
    if !dom::has_tag(node, "div") {
        return false;
    }
    matches!(
        dom::attr(node, "name"),
        Some("quote" | "messageReplySection" | "quoted-content")
    ) || dom::attr(node, "class") == Some("gmail_quote")
        || dom::attr(node, "style").is_some_and(|style| style.len() > 100)
}

/// Climb from the `From:` node to a quote boundary and take the siblings
/// following the branch that held the header.
fn body_after_quote_ancestor(dom: &Dom) -> Option<String> {
    let mut branch = from_node(dom)?;
    let mut ancestor = branch;
    let mut reply_header_seen = false;

    while let Some(parent) = dom.parent(ancestor) {
        branch = ancestor;
        ancestor = parent;
        if reply_header_seen {
            break;
        }
        if dom::has_tag(ancestor, "div") && dom::attr(ancestor, "id") == Some("divRplyFwdMsg") {
            reply_header_seen = true;
        } else if is_quote_boundary(ancestor) {
            break;
        }
    }

    if dom.is_root_child(ancestor) {
        let body: String = ancestor
            .next_siblings()
            .map(dom::inner_html)
            .filter(|html| !html.is_empty())
            .collect();
        return (body != "\n").then_some(body);
    }

    let mut children: Vec<Handle<'_>> = ancestor.children().collect();
    let mut marker = branch.id();
    let mut mark_found = false;
    let mut forward_found = false;
    let mut body: Vec<Handle<'_>> = Vec::new();
    let mut i = 0;

    while i < children.len() {
        let child = children[i];
        if mark_found {
            if !forward_found
                && dom::inner_html(child).contains(FORWARDED_MARKER)
                && let Some(inner) = dom::find_text_node(child, INNER_FORWARDED_MARKER)
                && let Some(parent) = inner.parent()
            {
                children = parent.children().collect();
                marker = inner.id();
                mark_found = false;
                forward_found = true;
                body.clear();
                i = 0;
                continue;
            }

            let quoted_content = dom::has_tag(child, "div")
                && dom::attr(child, "name") == Some("quoted-content");
            if !body.is_empty()
                || quoted_content
                || !dom::text_of(child).chars().all(char::is_whitespace)
            {
                body.push(child);
            }
        }
        if child.id() == marker {
            mark_found = true;
        }
        i += 1;
    }

    let body = dom::join_html(body);
    (body != "\n").then_some(body)
}
