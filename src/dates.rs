//! Date parsing for forward headers
//!
//! Each client carries an ordered list of `chrono` format templates. When
//! none of them parses a captured date string, a small set of free-form
//! layouts seen in Apple and Outlook headers is tried instead:
//!
//! - `June 3, 2014 at 1:47:52 PM EDT`
//! - `25 October 2016 at 9:55:30 am BST`
//! - `11 April, 2013 6:17:59 PM EDT`

use chrono::{DateTime, Month, NaiveDate, NaiveDateTime, Utc};
use regex::{Captures, Regex};

static MONTH_DAY_YEAR: std::sync::LazyLock<Regex> = std::sync::LazyLock::new(|| {
    Regex::new(r"(\w+)\s(\d+),\s(\d+)\s(?:at\s)*(\d+):(\d+)(?::(\d+))?\s*(\w*)").unwrap()
});

static DAY_MONTH_YEAR: std::sync::LazyLock<Regex> = std::sync::LazyLock::new(|| {
    Regex::new(r"(\d+)\s(\w+)\s(\d+)\s(?:at\s)*(\d+):(\d+):(\d+)\s(\w+)").unwrap()
});

static DAY_MONTH_COMMA_YEAR: std::sync::LazyLock<Regex> = std::sync::LazyLock::new(|| {
    Regex::new(r"(\d+)\s(\w+),\s(\d+)\s(\d+):(\d+):(\d+)\s(\w+)").unwrap()
});

/// Free-form layouts with the capture groups holding month and day.
/// Year, hour, minute, second and meridiem are groups 3 to 7 in all of them.
fn free_form_layouts() -> [(&'static Regex, usize, usize); 3] {
    [
        (&*MONTH_DAY_YEAR, 1, 2),
        (&*DAY_MONTH_YEAR, 2, 1),
        (&*DAY_MONTH_COMMA_YEAR, 2, 1),
    ]
}

/// Parse `raw` with a single template.
///
/// Templates without a time of day resolve to midnight.
#[must_use]
pub fn parse_with_template(raw: &str, template: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, template)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, template)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// First template in `templates` that parses `raw`
#[must_use]
pub fn parse_with_templates(raw: &str, templates: &[&str]) -> Option<NaiveDateTime> {
    templates
        .iter()
        .find_map(|template| parse_with_template(raw, template))
}

/// Search `text` for one of the free-form layouts.
///
/// A `PM` marker adds twelve hours to an hour below twelve.
#[must_use]
pub fn parse_special_case(text: &str) -> Option<NaiveDateTime> {
    free_form_layouts()
        .into_iter()
        .find_map(|(regex, month_group, day_group)| {
            regex
                .captures_iter(text)
                .find_map(|caps| date_from_captures(&caps, month_group, day_group))
        })
}

fn date_from_captures(caps: &Captures<'_>, month_group: usize, day_group: usize) -> Option<NaiveDateTime> {
    let month = caps.get(month_group)?.as_str().parse::<Month>().ok()?;
    let day = number(caps, day_group)?;
    let year = i32::try_from(number(caps, 3)?).ok()?;
    let mut hour = number(caps, 4)?;
    let minute = number(caps, 5)?;
    let second = if caps.get(6).is_some() {
        number(caps, 6)?
    } else {
        0
    };

    let meridiem = caps.get(7).map_or("", |m| m.as_str());
    if meridiem.eq_ignore_ascii_case("PM") && hour < 12 {
        hour += 12;
    }

    NaiveDate::from_ymd_opt(year, month.number_from_month(), day)?.and_hms_opt(hour, minute, second)
}

fn number(caps: &Captures<'_>, group: usize) -> Option<u32> {
    caps.get(group)?.as_str().parse().ok()
}

/// Recovered header times carry no reliable zone; they are taken as UTC
#[must_use]
pub fn to_utc(naive: NaiveDateTime) -> DateTime<Utc> {
    naive.and_utc()
}
