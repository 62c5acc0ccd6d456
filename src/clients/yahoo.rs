//! Yahoo Mail: `yahoo_quoted` containers, or an `On ... wrote:` line in a
//! left-to-right header div

use super::{ClientStrategy, strip_newlines};
use crate::dom::{self, Dom, Handle};
use crate::error::{ExtractError, Result};
use crate::fields::{ClientDescriptor, compile};
use crate::types::Extraction;
use regex::Regex;
use scraper::Selector;
use std::sync::LazyLock;
use tracing::trace;

const QUOTED_CLASS: &str = "yahoo_quoted";
const FORWARDED_MARKER: &str = "----- Forwarded Message -----";

static WROTE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?P<fwd>On\s\w*),.*<.*> wrote:").unwrap());
static TEXT_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)On.*<.*> wrote:$").unwrap());
static CONTAINER_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"class="(?P<cssclass>\w+y_msg_container)""#).unwrap());

static QUOTED: LazyLock<Selector> = LazyLock::new(|| Selector::parse("div.yahoo_quoted").unwrap());
static QUOTED_HEADER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div div div div div").unwrap());
static MESSAGE_CONTAINER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.y_msg_container").unwrap());
static LTR_DIV: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"div[dir="ltr"]"#).unwrap());

static DATE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"\s*On\s*(?P<date>.*((AM)|(PM))).*wrote.*$",
        r".*Sent:\s*\w*,\s*(?P<date>.*)\sSubject.*$",
        r".*Sent:\s*\w*,\s*(?P<date>.*)$",
        r"Date:\s*(?P<date>.*)Subject",
        r"Date:\s*(?P<date>.*)To:",
        r"Date:\s*(?P<date>[a-zA-Z]* [ at,:0-9]* ([A-Z]{3}))",
        r"Date:\s*(?P<date>[a-zA-Z]* [ at,:0-9]*)",
        r"Date:\s*(?P<date>[a-zA-Z0-9 :+,-]*)",
        r"Date:\s*</\w+>(?P<date>[a-zA-Z0-9 :+,-]*)",
        r"Date:\s*(?P<date>.*)$",
        r"Sent:\s*[^a-zA-Z0-9:+,-](?P<date>[a-zA-Z0-9 :+,-]*)\s*$",
        r"Date:[\n\s]*(?P<date>.*)Subject",
        r"Date:[\n\s]*(?P<date>.*)To:",
        r"Date:[\n\s]*(?P<date>[a-zA-Z]* [ at,:0-9]* ([A-Z]{3}))",
        r"Date:[\n\s]*(?P<date>[a-zA-Z]* [ at,:0-9]*)",
        r"Date:[\n\s]*(?P<date>[a-zA-Z0-9 :+,-]*)",
        r"Date:[\n\s]*</\w+>(?P<date>[a-zA-Z0-9 :+,-]*)",
        r"Date:[\n\s]*(?P<date>.*)$",
        r"Sent:[\n\s]*[^a-zA-Z0-9:+,-](?P<date>[a-zA-Z0-9 :+,-]*)\s*$",
        r"(?P<date>[a-zA-Z]{3}, \d{1,2} [a-zA-Z]{3} \d{2,4} \d{1,2}:\d{1,2}:\d{1,2} -\d{1,4})",
    ])
});

static SENDER_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    compile(&[
        r"\s*On.*[(AM)|(PM)],(?P<name>[^<]*)<(?P<from>.*)> wrote.*$",
        r".*From:(?P<name>[^<]*)<(?P<from>.*)>.*$",
        r"^From:(?P<name>[^<]*)<(?P<from>[a-zA-Z0-9_.+-]+@([a-zA-Z0-9-]+\.+)?[a-zA-Z0-9-]+\.+[a-zA-Z0-9.-]{2,4})>To.*$",
        r"^From:(?P<name>[^<]*)<(?P<from>[a-zA-Z0-9_.+-]+@([a-zA-Z0-9-]+\.+)?[a-zA-Z0-9-]+\.+[a-zA-Z0-9.-]{2,4})>Date.*$",
        r"^From:(?P<name>[^<]*)<(?P<from>[a-zA-Z0-9_.+-]+@([a-zA-Z0-9-]+\.)+?[a-zA-Z0-9-]+\.+[a-zA-Z0-9.-]{2,4})>Subject.*$",
        r"^.*From:(?P<name>[^<]*)<(?P<from>[a-zA-Z0-9_.+-]+@([a-zA-Z0-9-]+\.+)?[a-zA-Z0-9-]+\.+[a-zA-Z0-9.-]{2,4})>Subject.*$",
        r"^.*From:(?P<name>[^<]*)<(?P<from>[a-zA-Z0-9_.+-]+@([a-zA-Z0-9-]+\.+)?[a-zA-Z0-9-]+\.+[a-zA-Z0-9.-]{2,4})>[^a-zA-Z0-9.-]$",
        r"From:\s*(?P<from>[a-zA-Z0-9_.+-]+@([a-zA-Z0-9-]+\.+)?[a-zA-Z0-9-]+\.+[a-zA-Z0-9.-]{2,4})To.*$",
        r"From:\s*(?P<from>[a-zA-Z0-9_.+-]+@([a-zA-Z0-9-]+\.+)?[a-zA-Z0-9-]+\.+[a-zA-Z0-9.-]{2,4})Subject",
        r"From:\s*<(?P<from>[a-zA-Z0-9_.+-]+@([a-zA-Z0-9-]+\.+)?[a-zA-Z0-9-]+\.+[a-zA-Z0-9.-]{2,4})>$",
        r"From:[\s\w]*<(?P<from>[a-zA-Z0-9_.+-]+@([a-zA-Z0-9-]+\.+)?[a-zA-Z0-9-]+\.+[a-zA-Z0-9.-]{2,4})>",
        r"^.*From:[^a-zA-Z0-9_.+-](?P<from>[a-zA-Z0-9_.+-]+@([a-zA-Z0-9-]+\.+)?[a-zA-Z0-9-]+\.+[a-zA-Z0-9.-]{2,4})[^a-zA-Z0-9_.+-].*$",
    ])
});

const DATE_FORMATS: &[&str] = &[
    "%B %d, %Y %I:%M:%S %p",
    "%A, %B %d, %Y %I:%M %p",
    "%Y, %B, %d %I:%M %p",
    "%A, %d %B %Y %H:%M:%S %Z",
    "%B, %d, %Y at %I:%M:%S %p %Z",
    "%B %d, %Y at %H:%M:%S %Z",
    "%B %d, %Y at %H:%M:%S",
    "%A, %B %d, %Y at %I:%M %p",
    "%A, %B %d, %Y",
    "%d %B %Y %H:%M:%S %Z",
    "%d %B %Y %H:%M:%S",
    "%Y-%B-%d %H:%M:%S %Z",
    "%A %B %d %Y",
    "%a, %d %b %Y %H:%M:%S %z",
];

pub struct Yahoo {
    descriptor: ClientDescriptor,
}

impl Yahoo {
    #[must_use]
    pub fn new() -> Self {
        Self {
            descriptor: ClientDescriptor {
                name: "yahoo",
                date_patterns: DATE_PATTERNS.as_slice(),
                date_formats: DATE_FORMATS,
                sender_patterns: SENDER_PATTERNS.as_slice(),
                destination_patterns: &[],
            },
        }
    }

    fn extract_quoted(&self, quoted: Handle<'_>) -> Result<Extraction> {
        let header = dom::select_within(quoted, &QUOTED_HEADER)
            .first()
            .map(|div| dom::text_of(*div))
            .unwrap_or_default();

        let sender = self
            .descriptor
            .capture_sender(&header)
            .ok_or_else(|| ExtractError::extraction("Couldn't find the sender email address"))?;
        let date = self
            .descriptor
            .parse_date(&header)
            .ok_or_else(|| ExtractError::extraction("Couldn't find the send date"))?;
        let body = dom::select_within(quoted, &MESSAGE_CONTAINER)
            .first()
            .map(|container| dom::inner_html(*container).trim().to_string())
            .ok_or_else(|| ExtractError::extraction("Couldn't find the message container"))?;

        Ok(Extraction {
            sender: Some(sender),
            sender_name: self.descriptor.capture_sender_name(&header),
            date: Some(date),
            body,
            body_method: "yahoo_quoted",
        }
        .without_echoed_name())
    }

    /// Forwards without a `yahoo_quoted` container carry their header in
    /// left-to-right divs; the whole document is the fallback source.
    fn extract_unquoted(&self, dom: &Dom, markup: &str) -> Result<Extraction> {
        let header = dom.select(&LTR_DIV).map(|div| dom::text_of(*div)).collect::<String>();
        let document = dom.text();
        let fields = [header.as_str(), document.as_str()];

        let sender = fields
            .iter()
            .find_map(|text| self.descriptor.capture_sender(text))
            .ok_or_else(|| ExtractError::extraction("Couldn't find the sender email address"))?;
        let sender_name = fields
            .iter()
            .find_map(|text| self.descriptor.capture_sender_name(text));
        let date = fields
            .iter()
            .find_map(|text| self.descriptor.parse_date(text))
            .ok_or_else(|| ExtractError::extraction("Couldn't find the send date"))?;

        let (body, body_method) = body_in_container(dom)
            .map(|body| (body, "method_1"))
            .or_else(|| body_in_named_container(dom, markup).map(|body| (body, "method_2")))
            .or_else(|| body_after_header_div(dom).map(|body| (body, "method_3")))
            .or_else(|| body_after_header_parent(dom).map(|body| (body, "method_4")))
            .ok_or_else(|| ExtractError::extraction("Couldn't find the body"))?;
        trace!(body_method, "Yahoo body located");

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

impl Default for Yahoo {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientStrategy for Yahoo {
    fn descriptor(&self) -> &ClientDescriptor {
        &self.descriptor
    }

    fn detect_in_markup(&self, markup: &str) -> Option<usize> {
        if let Some(index) = markup.find(QUOTED_CLASS).or_else(|| markup.find(FORWARDED_MARKER)) {
            return Some(index);
        }

        let dom = Dom::parse(markup);
        let header = strip_newlines(&dom.select(&LTR_DIV).map(|div| dom::text_of(*div)).collect::<String>());
        let opening = WROTE_LINE.captures(&header)?.name("fwd")?.as_str().trim().to_string();
        strip_newlines(markup).find(&opening)
    }

    fn detect_in_text(&self, text: &str, _iphone_seen: bool) -> Option<usize> {
        TEXT_MARKER.find(text).map(|m| m.start())
    }

    fn extract_from_markup(&self, markup: &str) -> Result<Extraction> {
        let dom = Dom::parse(markup);
        match dom.first(&QUOTED) {
            Some(quoted) => self.extract_quoted(quoted),
            None => self.extract_unquoted(&dom, markup),
        }
    }
}

fn body_in_container(dom: &Dom) -> Option<String> {
    dom.first(&MESSAGE_CONTAINER).map(dom::inner_html)
}

/// Some Yahoo versions prefix the container class, e.g. `yiv123y_msg_container`
fn body_in_named_container(dom: &Dom, markup: &str) -> Option<String> {
    let class = CONTAINER_CLASS.captures(markup)?.name("cssclass")?.as_str().trim().to_string();
    let selector = Selector::parse(&format!("div.{class}")).ok()?;
    dom.first(&selector).map(dom::inner_html)
}

/// First element after the header div, skipping line breaks
fn body_after_header_div(dom: &Dom) -> Option<String> {
    let header = dom.first(&LTR_DIV)?;
    dom::next_element_siblings(header)
        .find(|sibling| !dom::has_tag(*sibling, "br"))
        .map(dom::inner_html)
}

fn body_after_header_parent(dom: &Dom) -> Option<String> {
    let header = dom.first(&LTR_DIV)?;
    dom.parent(header)
        .and_then(|parent| dom::next_element_siblings(parent).next())
        .map(dom::inner_html)
}
