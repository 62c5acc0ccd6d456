//! MIME decoding: split a raw message into its plain-text and markup parts

use crate::error::{ExtractError, Result};
use tracing::debug;

/// Bodies decoded from a raw message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageParts {
    /// First `text/plain` part
    pub text: Option<String>,

    /// First `text/html` part
    pub html: Option<String>,
}

impl MessageParts {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.text.is_none() && self.html.is_none()
    }
}

/// Decode a raw transport message.
///
/// Line endings are normalized to `\n`; empty parts count as absent.
pub fn decode_parts(raw: &[u8]) -> Result<MessageParts> {
    let parsed = mailparse::parse_mail(raw).map_err(|e| ExtractError::Decode(e.to_string()))?;

    let mut text = None;
    let mut html = None;
    if parsed.subparts.is_empty() {
        let content_type = parsed.ctype.mimetype.to_lowercase();
        let body = parsed
            .get_body()
            .map_err(|e| ExtractError::Decode(e.to_string()))?;
        if content_type.contains("text/html") {
            html = Some(body);
        } else {
            text = Some(body);
        }
    } else {
        collect_parts(&parsed, &mut text, &mut html);
    }

    let parts = MessageParts {
        text: normalize(text),
        html: normalize(html),
    };
    debug!(
        has_text = parts.text.is_some(),
        has_html = parts.html.is_some(),
        "Decoded message parts"
    );
    Ok(parts)
}

fn collect_parts(
    parsed: &mailparse::ParsedMail,
    text: &mut Option<String>,
    html: &mut Option<String>,
) {
    for part in &parsed.subparts {
        if part.subparts.is_empty() {
            let content_type = part.ctype.mimetype.to_lowercase();
            let Ok(body) = part.get_body() else {
                continue;
            };
            if content_type.contains("text/plain") && text.is_none() {
                *text = Some(body);
            } else if content_type.contains("text/html") && html.is_none() {
                *html = Some(body);
            }
        } else {
            collect_parts(part, text, html);
        }
    }
}

fn normalize(body: Option<String>) -> Option<String> {
    body.map(|body| body.replace("\r\n", "\n"))
        .filter(|body| !body.trim().is_empty())
}
