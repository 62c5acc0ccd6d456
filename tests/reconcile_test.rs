use chrono::{DateTime, TimeZone, Utc};
use unforward::*;

fn day(day: u32) -> Option<DateTime<Utc>> {
    Some(Utc.with_ymd_and_hms(2014, 6, day, 12, 0, 0).unwrap())
}

fn side(sender: Option<&str>, name: Option<&str>, date: Option<DateTime<Utc>>, body: &str) -> Extraction {
    Extraction {
        sender: sender.map(ToString::to_string),
        sender_name: name.map(ToString::to_string),
        date,
        ..Extraction::new(body, "after_headers")
    }
}

const LONG_TEXT: &str = "This plain text body is much longer than the markup body it is compared with.";

// --- MergePolicy ---

#[test]
fn test_default_policy() {
    let policy = MergePolicy::default();
    assert_eq!(policy.length_ratio, DEFAULT_LENGTH_RATIO);
    assert!(policy.prefer_older_date);
}

#[test]
fn test_text_dominates_strictly() {
    let policy = MergePolicy::default();
    assert!(policy.text_dominates(51, 10));
    assert!(!policy.text_dominates(50, 10));
    assert!(policy.text_dominates(1, 0));
}

// --- reconcile ---

#[test]
fn test_markup_wins_by_default() {
    let html = side(Some("john@example.com"), Some("John"), day(3), "<p>Same body</p>");
    let text = side(Some("jane@example.com"), Some("Jane"), day(3), "Same body");

    let result = reconcile(html, text, &MergePolicy::default()).unwrap();
    assert_eq!(result.sender, "john@example.com");
    assert_eq!(result.sender_name.as_deref(), Some("John"));
    assert_eq!(result.html.as_deref(), Some("<p>Same body</p>"));
    assert_eq!(result.text.as_deref(), Some("Same body"));
}

#[test]
fn test_long_text_overrides_sender() {
    let html = side(Some("john@example.com"), Some("John"), day(3), "<p>Short</p>");
    let text = side(Some("jane@example.com"), Some("Jane"), day(3), LONG_TEXT);

    let result = reconcile(html, text, &MergePolicy::default()).unwrap();
    assert_eq!(result.sender, "jane@example.com");
    assert_eq!(result.sender_name.as_deref(), Some("Jane"));
    assert_eq!(result.date, day(3));
}

#[test]
fn test_ratio_is_configurable() {
    let html = side(Some("john@example.com"), None, day(3), "<p>Short</p>");
    let text = side(Some("jane@example.com"), None, day(3), LONG_TEXT);
    let policy = MergePolicy {
        length_ratio: 100,
        ..MergePolicy::default()
    };

    let result = reconcile(html, text, &policy).unwrap();
    assert_eq!(result.sender, "john@example.com");
}

#[test]
fn test_invalid_text_sender_never_overrides() {
    let html = side(Some("john@example.com"), Some("John"), day(3), "<p>Short</p>");
    let text = side(Some("not an address"), None, day(1), LONG_TEXT);

    let result = reconcile(html, text, &MergePolicy::default()).unwrap();
    assert_eq!(result.sender, "john@example.com");
    assert_eq!(result.date, day(3));
}

#[test]
fn test_older_text_date_wins() {
    let html = side(Some("john@example.com"), Some("John"), day(4), "<p>Same body</p>");
    let text = side(Some("jane@example.com"), Some("Jane"), day(3), "Same body");

    let result = reconcile(html, text, &MergePolicy::default()).unwrap();
    assert_eq!(result.sender, "jane@example.com");
    assert_eq!(result.sender_name.as_deref(), Some("Jane"));
    assert_eq!(result.date, day(3));
}

#[test]
fn test_older_date_preference_can_be_disabled() {
    let html = side(Some("john@example.com"), Some("John"), day(4), "<p>Same body</p>");
    let text = side(Some("jane@example.com"), Some("Jane"), day(3), "Same body");
    let policy = MergePolicy {
        prefer_older_date: false,
        ..MergePolicy::default()
    };

    let result = reconcile(html, text, &policy).unwrap();
    assert_eq!(result.sender, "john@example.com");
    assert_eq!(result.date, day(4));
}

#[test]
fn test_missing_markup_sender_falls_back_to_text() {
    let html = side(None, None, day(3), "<p>Same body</p>");
    let text = side(Some("jane@example.com"), Some("Jane"), day(3), "Same body");

    let result = reconcile(html, text, &MergePolicy::default()).unwrap();
    assert_eq!(result.sender, "jane@example.com");
    assert_eq!(result.sender_name.as_deref(), Some("Jane"));
}

#[test]
fn test_no_valid_sender_fails() {
    let html = side(Some("broken"), None, day(3), "<p>Same body</p>");
    let text = side(None, None, day(3), "Same body");

    let error = reconcile(html, text, &MergePolicy::default()).unwrap_err();
    assert_eq!(error.kind(), FailureKind::Failed);
    assert_eq!(error.to_string(), "Extraction failed: Invalid email extracted");
}

#[test]
fn test_policy_deserializes() {
    let policy: MergePolicy =
        serde_json::from_str(r#"{"length_ratio": 3, "prefer_older_date": false}"#).unwrap();
    assert_eq!(policy.length_ratio, 3);
    assert!(!policy.prefer_older_date);
}
