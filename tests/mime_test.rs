use unforward::*;

const ALTERNATIVE: &str = r#"From: me@example.com
To: you@example.com
Subject: Fwd: Hello
MIME-Version: 1.0
Content-Type: multipart/alternative; boundary="sep"

--sep
Content-Type: text/plain; charset=UTF-8

---------- Forwarded message ----------
From: John Doe <john@example.com>
Date: Tue, Jun 3, 2014 at 1:47 PM
Subject: Hello
To: me@example.com

Plain body
--sep
Content-Type: text/html; charset=UTF-8

<div dir="ltr">FYI<br><div class="gmail_quote">---------- Forwarded message ----------<br>From: <b class="gmail_sendername">John Doe</b> <span dir="ltr">&lt;<a href="mailto:john@example.com">john@example.com</a>&gt;</span><br>Date: Tue, Jun 3, 2014 at 1:47 PM<br>Subject: Hello<br>To: <a href="mailto:me@example.com">me@example.com</a><br><br><div dir="ltr">Markup body</div></div></div>
--sep--
"#;

const PLAIN_ONLY: &str = "From: me@example.com\r\n\
                          Subject: Fwd: Hello\r\n\
                          Content-Type: text/plain; charset=UTF-8\r\n\
                          \r\n\
                          ---------- Forwarded message ----------\r\n\
                          From: John Doe <john@example.com>\r\n\
                          Date: Tue, Jun 3, 2014 at 1:47 PM\r\n\
                          Subject: Hello\r\n\
                          To: me@example.com\r\n\
                          \r\n\
                          Plain body\r\n";

// --- decode_parts ---

#[test]
fn test_decode_alternative_parts() {
    let parts = decode_parts(ALTERNATIVE.as_bytes()).unwrap();
    assert!(parts.text.as_deref().unwrap().contains("Plain body"));
    assert!(parts.html.as_deref().unwrap().contains("gmail_quote"));
    assert!(!parts.is_empty());
}

#[test]
fn test_decode_normalizes_line_endings() {
    let parts = decode_parts(PLAIN_ONLY.as_bytes()).unwrap();
    let text = parts.text.unwrap();
    assert!(!text.contains('\r'));
    assert!(text.contains("To: me@example.com\n\nPlain body"));
    assert!(parts.html.is_none());
}

#[test]
fn test_decode_single_html_part() {
    let raw = "Content-Type: text/html\r\n\r\n<p>Hello</p>\r\n";
    let parts = decode_parts(raw.as_bytes()).unwrap();
    assert!(parts.text.is_none());
    assert_eq!(parts.html.as_deref().map(str::trim), Some("<p>Hello</p>"));
}

#[test]
fn test_decode_nested_multipart() {
    let raw = concat!(
        "Content-Type: multipart/mixed; boundary=\"outer\"\n\n",
        "--outer\n",
        "Content-Type: multipart/alternative; boundary=\"inner\"\n\n",
        "--inner\n",
        "Content-Type: text/plain\n\n",
        "Nested text\n",
        "--inner\n",
        "Content-Type: text/html\n\n",
        "<p>Nested markup</p>\n",
        "--inner--\n",
        "--outer\n",
        "Content-Type: text/plain\n\n",
        "Attachment text\n",
        "--outer--\n",
    );
    let parts = decode_parts(raw.as_bytes()).unwrap();
    assert!(parts.text.as_deref().unwrap().contains("Nested text"));
    assert!(parts.html.as_deref().unwrap().contains("Nested markup"));
}

#[test]
fn test_decode_blank_part_is_absent() {
    let raw = "Content-Type: text/plain\r\n\r\n   \r\n";
    let parts = decode_parts(raw.as_bytes()).unwrap();
    assert!(parts.is_empty());
}

// --- Extraction from raw messages ---

#[test]
fn test_extract_from_alternative_message() {
    let outcome = Extractor::new().extract_from_mime(ALTERNATIVE.as_bytes());
    assert_eq!(outcome.trace.len(), 2);

    let result = outcome.into_result().unwrap();
    assert_eq!(result.sender, "john@example.com");
    assert_eq!(result.sender_name.as_deref(), Some("John Doe"));
    assert!(result.html.as_deref().unwrap().contains("Markup body"));
    assert!(result.text.as_deref().unwrap().contains("Plain body"));
}

#[test]
fn test_extract_from_plain_message() {
    let outcome = Extractor::new().extract_from_mime(PLAIN_ONLY.as_bytes());
    let result = outcome.into_result().unwrap();
    assert_eq!(result.sender, "john@example.com");
    assert!(result.html.is_none());
    assert!(result.text.as_deref().unwrap().contains("Plain body"));
}

#[test]
fn test_markup_only_extraction_needs_markup() {
    let outcome = Extractor::new().extract_html_from_mime(PLAIN_ONLY.as_bytes());
    assert_eq!(outcome.failure_kind(), Some(FailureKind::NoHtmlPayloadFound));
    assert!(outcome.trace.is_empty());
    assert_eq!(outcome.trace.error.as_deref(), Some("No HTML payload found"));
}

#[test]
fn test_markup_only_extraction_ignores_text() {
    let outcome = Extractor::new().extract_html_from_mime(ALTERNATIVE.as_bytes());
    let result = outcome.into_result().unwrap();
    assert!(result.html.as_deref().unwrap().contains("Markup body"));
    assert!(result.text.is_none());
}

#[test]
fn test_message_without_body() {
    let outcome = Extractor::new().extract_from_mime(b"Subject: empty\r\n\r\n");
    assert_eq!(outcome.failure_kind(), Some(FailureKind::NoForwardFound));
}
