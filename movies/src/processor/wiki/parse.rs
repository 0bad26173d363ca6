//! Free-text parsers for the wiki box office, budget, release date and
//! running time fields.
//!
//! Every parser is a pure function from text to an optional value: text that
//! does not match any recognised form yields `None` instead of an error so a
//! row survives with partial data.

use chrono::NaiveDate;
use std::borrow::Cow;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// `$12.5 million`, `$1.2 billon`: the scaled form, captured unit initial.
static CURRENCY_SCALED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\$\s*[0-9]+\.?[0-9]*\s*([mb])illi?on").expect("valid scaled currency regex")
});

/// `$1,234,567`: leading digits and the separator groups captured apart so
/// the groups can be given back one at a time.
static CURRENCY_GROUPED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\$\s*[0-9]{1,3})((?:[,.][0-9]{3})+)").expect("valid grouped currency regex")
});

static SCALE_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s[mb]illion").expect("valid scale word regex"));

static CURRENCY_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<low>\$\s*[0-9][0-9,.]*)\s*[-—–]\s*\$?\s*[0-9][0-9,.]*")
        .expect("valid currency range regex")
});

static CITATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[0-9]+\]\s*").expect("valid citation regex"));

const MONTHS: &str = "(?:January|February|March|April|May|June|July|August|September|October|November|December)";

static RELEASE_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?P<mdy>{m}\s[0-9]{{1,2}},\s[0-9]{{4}})|(?P<y1>[0-9]{{4}}).(?P<m1>[01][0-9]).(?P<d1>[0-3][0-9])|(?P<my>{m}\s[0-9]{{4}})|(?P<year>[0-9]{{4}})",
        m = MONTHS
    ))
    .expect("valid release date regex")
});

static RUNNING_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<hours>[0-9]+)\s*ho?u?r?s?\s*(?P<minutes>[0-9]*)|(?P<only>[0-9]+)\s*m")
        .expect("valid running time regex")
});

/// Text handed to the parsers: strings as-is, lists joined with a space.
/// Numbers, objects and nulls have no text form.
pub fn joined_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(" "),
        ),
        _ => None,
    }
}

/// Parse a box office style amount into dollars.
pub fn parse_currency(text: &str) -> Option<f64> {
    let collapsed = collapse_ranges(text);
    extract_currency(&collapsed).and_then(parse_dollars)
}

/// Same as [`parse_currency`] with citation markers like `[3]` removed first.
pub fn parse_budget(text: &str) -> Option<f64> {
    let collapsed = collapse_ranges(text);
    let cleaned = CITATION.replace_all(&collapsed, "");
    extract_currency(&cleaned).and_then(parse_dollars)
}

/// First date-looking token, tried as `Month D, YYYY`, `YYYY-MM-DD` (any
/// single separator), `Month YYYY` and bare `YYYY`. Partial dates resolve to
/// the first day of the month or year.
pub fn parse_release_date(text: &str) -> Option<NaiveDate> {
    let caps = RELEASE_DATE.captures(text)?;

    if let Some(m) = caps.name("mdy") {
        return NaiveDate::parse_from_str(m.as_str(), "%B %d, %Y").ok();
    }
    if let (Some(y), Some(m), Some(d)) = (caps.name("y1"), caps.name("m1"), caps.name("d1")) {
        return NaiveDate::from_ymd_opt(
            y.as_str().parse().ok()?,
            m.as_str().parse().ok()?,
            d.as_str().parse().ok()?,
        );
    }
    if let Some(m) = caps.name("my") {
        return NaiveDate::parse_from_str(&format!("1 {}", m.as_str()), "%d %B %Y").ok();
    }
    let year = caps.name("year")?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(year, 1, 1)
}

/// Minutes from `1 hour 45`, `2 hrs`, `102 min`. Missing groups count as
/// zero, so text without numbers yields `0.0`.
pub fn parse_running_time(text: &str) -> f64 {
    let Some(caps) = RUNNING_TIME.captures(text) else {
        return 0.0;
    };
    let group = |name: &str| {
        caps.name(name)
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .unwrap_or(0.0)
    };

    let only = group("only");
    if only == 0.0 {
        group("hours") * 60.0 + group("minutes")
    } else {
        only
    }
}

/// Collapse `$X – Y` ranges to their lower bound, keeping any unit word
/// that follows the range.
fn collapse_ranges(text: &str) -> Cow<'_, str> {
    CURRENCY_RANGE.replace_all(text, "${low}")
}

/// Leftmost currency token, scaled form preferred at each `$`.
fn extract_currency(text: &str) -> Option<&str> {
    text.match_indices('$').find_map(|(start, _)| {
        let tail = &text[start..];
        if let Some(m) = CURRENCY_SCALED.find(tail) {
            return Some(m.as_str());
        }
        grouped_len(tail).map(|len| &tail[..len])
    })
}

/// Length of the grouped-digit token at the start of `text`. Separator groups
/// are released from the right until the token is no longer followed by a
/// ` million`/` billion` word.
fn grouped_len(text: &str) -> Option<usize> {
    let caps = CURRENCY_GROUPED.captures(text)?;
    let head = caps.get(1)?.end();
    let groups = caps.get(2)?.as_str().len() / 4;

    (1..=groups)
        .rev()
        .map(|n| head + n * 4)
        .find(|&end| !SCALE_WORD.is_match(&text[end..]))
}

fn parse_dollars(token: &str) -> Option<f64> {
    if let Some(caps) = CURRENCY_SCALED.captures(token) {
        let scale = match caps.get(1)?.as_str() {
            "b" | "B" => 1e9,
            _ => 1e6,
        };
        let digits: String = token
            .chars()
            .filter(|c| *c != '$' && !c.is_whitespace() && !c.is_ascii_alphabetic())
            .collect();
        return digits.parse::<f64>().ok().map(|value| value * scale);
    }

    grouped_len(token)?;
    let digits: String = token
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect();
    digits.parse::<f64>().ok()
}
