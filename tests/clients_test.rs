use chrono::{TimeZone, Utc};
use unforward::clients::*;
use unforward::*;

const OUTLOOK_MAC_HTML: &str = concat!(
    "<p>FYI</p><span>Begin forwarded message:</span>",
    r#"<blockquote type="cite">"#,
    r#"<div><span>From:</span> <a href="mailto:john@example.com">john@example.com</a></div>"#,
    r#"<div><span>To:</span> <a href="mailto:me@example.com">me@example.com</a></div>"#,
    "<div><span>Date:</span> <span>June 3, 2014 at 1:47:52 PM EDT</span></div>",
    "<div>Outlook body</div></blockquote>",
);

const OUTLOOK_2010_HTML: &str = concat!(
    "<div>FYI</div>",
    "<div><hr><b>From:</b> John Doe &lt;john@example.com&gt;<br>\n",
    "<b>Sent:</b> Tuesday, 03 June 2014 13:47:00 UTC<br>\n",
    "<b>To:</b> me@example.com</div>",
    "<p>Original body</p>",
);

const OUTLOOK_NESTED_HTML: &str = concat!(
    "<p>FYI</p><span>Begin forwarded message:</span>",
    r#"<blockquote type="cite">"#,
    r#"<div><b>From:</b>"John Doe" <a href="mailto:john@example.com">john@example.com</a></div>"#,
    "<div><b>Date:</b> June 3, 2014 at 1:47:52 PM EDT</div>",
    r#"<div><b>To:</b> <a href="mailto:me@example.com">me@example.com</a></div>"#,
    r#"<blockquote type="cite"><div>Original body</div></blockquote>"#,
    "</blockquote>",
);

const HOTMAIL_HTML: &str = concat!(
    "<div>FYI</div><div><p><font><span>",
    "<b>From:</b> John Doe &lt;john@example.com&gt;\n<br>",
    "<b>Date:</b> Tuesday, 03 June 2014 13:47:00 UTC\n<br>",
    "<b>To:</b> me@hotmail.com\n<br>",
    "<b>Cc:</b> jane@example.com\n<br>",
    "<i>Hotmail body</i></span></font></p></div>",
);

const YAHOO_QUOTED_HTML: &str = concat!(
    r#"<div>FYI</div><div class="yahoo_quoted"><div><div><div><div><div>"#,
    "From: John Doe &lt;john@example.com&gt;<br>\n",
    "To: me@example.com<br>\n",
    "Sent: Tuesday, June 3, 2014 1:47:52 PM<br>\n",
    "Subject: Hello</div></div></div></div></div>",
    r#"<div class="y_msg_container"><p>Yahoo body</p></div></div>"#,
);

const YAHOO_HEADER: &str = concat!(
    "<div dir=\"ltr\">----- Forwarded Message -----<br>\n",
    "From: John Doe &lt;john@example.com&gt;<br>\n",
    "To: me@example.com<br>\n",
    "Sent: Tuesday, June 3, 2014 1:47:52 PM<br>\n",
    "Subject: Hello</div>",
);

// --- Gmail ---

#[test]
fn test_gmail_detection() {
    let gmail = Gmail::new();
    let markup = r#"<div>x</div><div class="gmail_quote">---------- Forwarded message ----------<br>"#;
    assert_eq!(gmail.detect_in_markup(markup), Some(12));
    assert_eq!(gmail.detect_in_markup("<div>---------- Forwarded message ----------</div>"), None);
    assert_eq!(gmail.detect_in_text("Hi\n---------- Forwarded message ----------", false), Some(3));
}

#[test]
fn test_gmail_requires_quote_div() {
    let error = Gmail::new().extract_from_markup("<p>nothing</p>").unwrap_err();
    assert_eq!(error.kind(), FailureKind::Failed);
}

// --- Outlook ---

#[test]
fn test_outlook_detection_skips_apple_layout() {
    let outlook = Outlook::new();
    let mac = r#"<p>Begin forwarded message:</p><blockquote type="cite"></blockquote>"#;
    assert_eq!(outlook.detect_in_markup(mac), Some(3));

    let apple = r#"<div>Begin forwarded message:</div><blockquote type="cite"></blockquote>"#;
    assert_eq!(outlook.detect_in_markup(apple), None);
    assert_eq!(outlook.detect_in_markup("<p>Begin forwarded message:</p>"), None);
}

#[test]
fn test_outlook_text_detection() {
    let outlook = Outlook::new();
    let dashes = "-".repeat(30);
    assert_eq!(outlook.detect_in_text(&format!("FYI\n{dashes}\nFrom: a"), false), Some(4));
    assert_eq!(outlook.detect_in_text(&format!("{dashes}\nFrom: a"), false), None);
    assert_eq!(outlook.detect_in_text(&format!("x\n>{dashes}"), false), None);
}

#[test]
fn test_outlook_single_blockquote() {
    let outcome = Extractor::new().extract_from_html(OUTLOOK_MAC_HTML);
    assert_eq!(outcome.trace.client_names(), vec!["outlook"]);
    assert_eq!(outcome.trace.layers[0].body_method.as_deref(), Some("last_div"));

    let result = outcome.into_result().unwrap();
    assert_eq!(result.sender, "john@example.com");
    assert_eq!(result.date, Some(Utc.with_ymd_and_hms(2014, 6, 3, 13, 47, 52).unwrap()));
    assert_eq!(result.html.as_deref(), Some("<div>Outlook body</div>"));
}

#[test]
fn test_outlook_without_blockquote_fails() {
    let error = Outlook::new().extract_from_markup("<p>Begin forwarded message:</p>").unwrap_err();
    assert_eq!(error.to_string(), "Extraction failed: No blockquote tag was found");
}

#[test]
fn test_outlook_nested_blockquotes() {
    let outcome = Extractor::new().extract_from_html(OUTLOOK_NESTED_HTML);
    assert_eq!(outcome.trace.client_names(), vec!["outlook"]);
    assert_eq!(
        outcome.trace.layers[0].body_method.as_deref(),
        Some("nested_blockquotes")
    );

    let result = outcome.into_result().unwrap();
    assert_eq!(result.sender, "john@example.com");
    assert_eq!(result.sender_name.as_deref(), Some("John Doe"));
    assert_eq!(result.date, Some(Utc.with_ymd_and_hms(2014, 6, 3, 13, 47, 52).unwrap()));
    assert_eq!(result.html.as_deref(), Some("<div>Original body</div>"));
}

// --- Outlook 2010 ---

#[test]
fn test_outlook2010_detection() {
    let outlook = Outlook2010::new();
    assert_eq!(outlook.detect_in_markup("<hr>x Sent: y"), Some(6));
    assert_eq!(outlook.detect_in_markup("Sent: y"), None);
    assert_eq!(outlook.detect_in_text("*From:* a\n*Sent:* b", false), Some(0));
    assert_eq!(outlook.detect_in_text("*From:* a", false), None);
}

#[test]
fn test_outlook2010_header_block() {
    let outcome = Extractor::new().extract_from_html(OUTLOOK_2010_HTML);
    assert_eq!(outcome.trace.client_names(), vec!["outlook2010"]);

    let result = outcome.into_result().unwrap();
    assert_eq!(result.sender, "john@example.com");
    assert_eq!(result.sender_name.as_deref(), Some("John Doe"));
    assert_eq!(result.date, Some(Utc.with_ymd_and_hms(2014, 6, 3, 13, 47, 0).unwrap()));
    assert_eq!(result.html.as_deref(), Some("<p>Original body</p>"));
}

// --- Hotmail ---

#[test]
fn test_hotmail_detection() {
    let hotmail = Hotmail::new();
    assert_eq!(hotmail.detect_in_markup("x\n*To:* me@hotmail.com"), Some(2));
    assert_eq!(hotmail.detect_in_markup("To: me@example.com"), None);
    assert_eq!(hotmail.detect_in_text("*From:* a\n*Sent:* b", false), Some(10));
    assert_eq!(hotmail.detect_in_text("*Sent:* b", false), Some(0));
    assert_eq!(hotmail.detect_in_text("From: a", false), None);
}

#[test]
fn test_hotmail_header_paragraph() {
    let outcome = Extractor::new().extract_from_html(HOTMAIL_HTML);
    assert_eq!(outcome.trace.client_names(), vec!["hotmail"]);
    assert_eq!(
        outcome.trace.layers[0].body_method.as_deref(),
        Some("header_paragraph")
    );

    let result = outcome.into_result().unwrap();
    assert_eq!(result.sender, "john@example.com");
    assert_eq!(result.sender_name.as_deref(), Some("John Doe"));
    assert_eq!(result.date, Some(Utc.with_ymd_and_hms(2014, 6, 3, 13, 47, 0).unwrap()));
    assert_eq!(result.html.as_deref(), Some("<i>Hotmail body</i>"));
}

#[test]
fn test_hotmail_requires_destination() {
    let markup = HOTMAIL_HTML.replace("<b>To:</b> me@hotmail.com\n<br>", "");
    let error = Hotmail::new().extract_from_markup(&markup).unwrap_err();
    assert_eq!(
        error.to_string(),
        "Extraction failed: Couldn't find the destination email address"
    );
}

// --- Yahoo ---

#[test]
fn test_yahoo_detection() {
    let yahoo = Yahoo::new();
    assert_eq!(yahoo.detect_in_markup(r#"<div class="yahoo_quoted">x</div>"#), Some(12));
    assert_eq!(
        yahoo.detect_in_markup("<div>----- Forwarded Message -----</div>"),
        Some(5)
    );
    assert_eq!(
        yahoo.detect_in_text("Hi\nOn Tuesday, June 3, 2014, John <john@example.com> wrote:\n", false),
        Some(3)
    );
    assert_eq!(yahoo.detect_in_text("Nothing here", false), None);
}

#[test]
fn test_yahoo_quoted_container() {
    let outcome = Extractor::new().extract_from_html(YAHOO_QUOTED_HTML);
    assert_eq!(outcome.trace.client_names(), vec!["yahoo"]);
    assert_eq!(outcome.trace.layers[0].body_method.as_deref(), Some("yahoo_quoted"));

    let result = outcome.into_result().unwrap();
    assert_eq!(result.sender, "john@example.com");
    assert_eq!(result.sender_name.as_deref(), Some("John Doe"));
    assert_eq!(result.date, Some(Utc.with_ymd_and_hms(2014, 6, 3, 13, 47, 52).unwrap()));
    assert_eq!(result.html.as_deref(), Some("<p>Yahoo body</p>"));
}

#[test]
fn test_yahoo_prefixed_container() {
    let markup = format!(
        r#"{YAHOO_HEADER}<div class="yiv123y_msg_container"><p>Prefixed body</p></div>"#
    );
    let extraction = Yahoo::new().extract_from_markup(&markup).unwrap();
    assert_eq!(extraction.sender.as_deref(), Some("john@example.com"));
    assert_eq!(extraction.body_method, "method_2");
    assert_eq!(extraction.body, "<p>Prefixed body</p>");
}

#[test]
fn test_yahoo_body_after_header_div() {
    let markup = format!("{YAHOO_HEADER}<br><div><p>Unquoted body</p></div>");
    let outcome = Extractor::new().extract_from_html(&markup);
    assert_eq!(outcome.trace.client_names(), vec!["yahoo"]);
    assert_eq!(outcome.trace.layers[0].body_method.as_deref(), Some("method_3"));

    let result = outcome.into_result().unwrap();
    assert_eq!(result.sender, "john@example.com");
    assert_eq!(result.date, Some(Utc.with_ymd_and_hms(2014, 6, 3, 13, 47, 52).unwrap()));
    assert_eq!(result.html.as_deref(), Some("<p>Unquoted body</p>"));
}

#[test]
fn test_yahoo_without_date_fails() {
    let markup = YAHOO_QUOTED_HTML.replace("Sent: Tuesday, June 3, 2014 1:47:52 PM<br>\n", "");
    let error = Yahoo::new().extract_from_markup(&markup).unwrap_err();
    assert_eq!(error.to_string(), "Extraction failed: Couldn't find the send date");
}

// --- Apple and iPhone ---

#[test]
fn test_apple_detection() {
    let apple = Apple::new();
    assert_eq!(apple.detect_in_markup("<div>Begin forwarded message:</div>"), Some(5));
    assert_eq!(apple.detect_in_markup("<p>Begin forwarded message:</p>"), None);
    assert_eq!(apple.detect_in_text("Begin forwarded message:", false), Some(0));
    assert_eq!(apple.detect_in_text("Begin forwarded message:", true), None);
}

#[test]
fn test_iphone_detection() {
    let iphone = IPhone::new();
    assert_eq!(
        iphone.detect_in_markup("<p>Sent from my iPhone</p>\n<div>Begin forwarded message:</div>"),
        Some(3)
    );
    assert_eq!(iphone.detect_in_markup("<div>Begin forwarded message:</div>"), None);
    assert_eq!(iphone.detect_in_text("x\nSent from my iPhone", false), Some(1));
}

#[test]
fn test_iphone_requires_date() {
    let text = "Begin forwarded message:\n\nFrom: John Doe <john@example.com>\nTo: me@example.com\n\nBody";
    let error = IPhone::new().extract_from_text(text).unwrap_err();
    assert_eq!(error.to_string(), "Extraction failed: Couldn't find the send date");
}

// --- Lotus Notes ---

#[test]
fn test_lotus_notes_detection() {
    let lotus = LotusNotes::new();
    assert_eq!(lotus.detect_in_markup("<p>----- Forwarded by Jane</p>"), Some(3));
    assert_eq!(lotus.detect_in_text("----- Forwarded by Jane", false), Some(0));
    assert_eq!(lotus.detect_in_text("----- Forwarded Message -----", false), None);
}

// --- Generic ---

#[test]
fn test_generic_detection_needs_all_labels() {
    let generic = Generic::new();
    let text = "Hi\nFrom: a@example.com\nSent: today\nTo: b@example.com\nSubject: Hello";
    assert_eq!(generic.detect_in_text(text, false), Some(3));
    assert_eq!(generic.detect_in_text("From: a\nSent: today\nTo: b", false), None);
    assert_eq!(generic.detect_in_markup("<p>From: a</p>\n<p>Date: x</p><p>To: b</p><p>Subject: c</p>"), Some(3));
}

#[test]
fn test_generic_text_extraction() {
    let text = "Hi\nFrom: John Doe <john@example.com>\nSent: June 3, 2014 at 1:47:52 PM\nTo: me@example.com\nSubject: Hello\nThe body";
    let extraction = Generic::new().extract_from_text(text).unwrap();
    assert_eq!(extraction.sender.as_deref(), Some("john@example.com"));
    assert_eq!(extraction.body, "\nThe body");
}
