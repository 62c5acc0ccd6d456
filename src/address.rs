//! Email address grammar used to accept or reject a recovered sender

use regex::Regex;

static ADDRESS_REGEX: std::sync::LazyLock<Regex> = std::sync::LazyLock::new(|| {
    Regex::new(
        r#"^(([^<>()\[\]\\.,;:\s@"]+(\.[^<>()\[\]\\.,;:\s@"]+)*)|(".+"))@((\[[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\])|(([a-zA-Z0-9-]+\.)+[a-zA-Z]{2,}))$"#,
    )
    .unwrap()
});

/// Check an address against the fixed email grammar
#[must_use]
pub fn is_valid_address(address: &str) -> bool {
    ADDRESS_REGEX.is_match(address)
}

/// Same as [`is_valid_address`] for an optional sender
#[must_use]
pub fn is_valid_sender(sender: Option<&str>) -> bool {
    sender.is_some_and(is_valid_address)
}
