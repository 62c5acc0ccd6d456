use chrono::{TimeZone, Utc};
use unforward::*;

fn result(sender_name: Option<&str>) -> ExtractionResult {
    ExtractionResult {
        sender: "john@example.com".to_string(),
        sender_name: sender_name.map(ToString::to_string),
        date: Some(Utc.with_ymd_and_hms(2014, 6, 3, 13, 47, 0).unwrap()),
        html: Some("<p>Body</p>".to_string()),
        text: None,
    }
}

fn entry(client: &str, part: Part) -> TraceEntry {
    TraceEntry {
        client: client.to_string(),
        part,
        body_method: None,
        sender: Some("john@example.com".to_string()),
        sender_name: None,
        date: None,
    }
}

// --- ExtractionResult ---

#[test]
fn test_result_display_with_name() {
    assert_eq!(result(Some("John Doe")).to_string(), "John Doe <john@example.com>");
}

#[test]
fn test_result_display_without_name() {
    assert_eq!(result(None).to_string(), "john@example.com");
}

#[test]
fn test_result_body_prefers_markup() {
    let mut result = result(None);
    result.text = Some("Body".to_string());
    assert_eq!(result.body(), "<p>Body</p>");

    result.html = None;
    assert_eq!(result.body(), "Body");
}

#[test]
fn test_result_serializes_camel_case() {
    let json = serde_json::to_value(result(Some("John Doe"))).unwrap();
    assert_eq!(json["senderName"], "John Doe");
    assert_eq!(json["html"], "<p>Body</p>");
    assert!(json.get("text").is_none());
}

#[test]
fn test_result_roundtrip() {
    let original = result(Some("John Doe"));
    let json = serde_json::to_string(&original).unwrap();
    let parsed: ExtractionResult = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, original);
}

// --- Extraction ---

#[test]
fn test_extraction_drops_echoed_name() {
    let extraction = Extraction {
        sender: Some("john@example.com".to_string()),
        sender_name: Some("john@example.com".to_string()),
        ..Extraction::new("body", "after_headers")
    }
    .without_echoed_name();
    assert!(extraction.sender_name.is_none());
}

#[test]
fn test_extraction_keeps_distinct_name() {
    let extraction = Extraction {
        sender: Some("john@example.com".to_string()),
        sender_name: Some("John Doe".to_string()),
        ..Extraction::new("body", "after_headers")
    }
    .without_echoed_name();
    assert_eq!(extraction.sender_name.as_deref(), Some("John Doe"));
}

// --- MatchTrace ---

#[test]
fn test_trace_records_in_order() {
    let trace = MatchTrace::new()
        .record(entry("gmail", Part::Html))
        .record(entry("apple", Part::Html));
    assert_eq!(trace.len(), 2);
    assert_eq!(trace.client_names(), vec!["gmail", "apple"]);
    assert!(trace.has_matched("apple"));
    assert!(!trace.has_matched("yahoo"));
}

#[test]
fn test_trace_merge_keeps_first_error() {
    let markup = MatchTrace::new()
        .record(entry("gmail", Part::Html))
        .with_error(&ExtractError::NoForwardFound);
    let text = MatchTrace::new()
        .record(entry("gmail", Part::Text))
        .with_error(&ExtractError::NoHtmlPayload);

    let merged = markup.merge(text);
    assert_eq!(merged.len(), 2);
    assert_eq!(merged.layers[1].part, Part::Text);
    assert_eq!(merged.error.as_deref(), Some("No forwarding functionality found"));
}

#[test]
fn test_trace_serialization_omits_missing_error() {
    let json = serde_json::to_value(MatchTrace::new().record(entry("yahoo", Part::Text))).unwrap();
    assert_eq!(json["layers"][0]["client"], "yahoo");
    assert_eq!(json["layers"][0]["part"], "text");
    assert!(json.get("error").is_none());
}

#[test]
fn test_part_display() {
    assert_eq!(Part::Html.to_string(), "html");
    assert_eq!(Part::Text.to_string(), "text");
}

// --- ExtractError ---

#[test]
fn test_error_kinds() {
    assert_eq!(ExtractError::NoForwardFound.kind(), FailureKind::NoForwardFound);
    assert_eq!(ExtractError::Extraction("x".into()).kind(), FailureKind::Failed);
    assert_eq!(ExtractError::NoHtmlPayload.kind(), FailureKind::NoHtmlPayloadFound);
    assert_eq!(ExtractError::Decode("x".into()).kind(), FailureKind::Internal);
    assert_eq!(ExtractError::Internal("x".into()).kind(), FailureKind::Internal);
}

#[test]
fn test_error_expected() {
    assert!(ExtractError::NoForwardFound.is_expected());
    assert!(ExtractError::Extraction("x".into()).is_expected());
    assert!(!ExtractError::Internal("x".into()).is_expected());
}

#[test]
fn test_failure_kind_tags() {
    assert_eq!(FailureKind::NoHtmlPayloadFound.to_string(), "nohtmlpayloadfound");
    assert_eq!(
        serde_json::to_value(FailureKind::NoForwardFound).unwrap(),
        "noforwardfound"
    );
}
