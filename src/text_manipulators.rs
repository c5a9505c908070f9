use std::sync::LazyLock;

use regex::Regex;
use scraper::ElementRef;

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d+(?:[.,]\d+)?").expect("number pattern is valid"));
static INTEGER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("integer pattern is valid"));

/// All text under `node`, with runs of whitespace (including `&nbsp;`)
/// collapsed to a single space.
pub fn extract_text(node: ElementRef) -> String {
    collapse_whitespace(&node.text().collect::<String>())
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split(char::is_whitespace)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Drops a leading `label:` (any case), e.g. `"Size: M"` -> `"M"`.
pub fn strip_label<'a>(text: &'a str, label: &str) -> &'a str {
    let trimmed = text.trim();
    let Some(head) = trimmed.get(..label.len()) else {
        return trimmed;
    };
    let after = &trimmed[label.len()..];
    let ends_label = after.is_empty() || after.starts_with(':') || after.starts_with(char::is_whitespace);
    if !head.eq_ignore_ascii_case(label) || !ends_label {
        return trimmed;
    }
    let rest = after.trim_start();
    rest.strip_prefix(':').unwrap_or(rest).trim()
}

/// First decimal number in free text; `,` is read as a decimal point.
pub fn first_number(text: &str) -> Option<f64> {
    let token = NUMBER.find(text)?.as_str().replace(',', ".");
    token.parse().ok()
}

pub fn first_integer(text: &str) -> Option<u32> {
    INTEGER.find(text)?.as_str().parse().ok()
}

/// Parses a currency-formatted amount such as `"$1,234.50"` or
/// `"Rp 150.000"`.
///
/// A trailing `,-` or `.-` ("no cents", as in `"Rp 150.000,-"`) is dropped,
/// then everything but digits, separators and a minus sign is discarded. When
/// both `.` and `,` appear the last one is the decimal point. When only one
/// kind appears it is a thousands separator if it repeats or is followed by
/// exactly three digits, and a decimal point otherwise. Amounts too large for
/// an `f64` are `None`.
pub fn parse_amount(text: &str) -> Option<f64> {
    let text = text.trim_end();
    let text = text
        .strip_suffix(",-")
        .or_else(|| text.strip_suffix(".-"))
        .unwrap_or(text);
    let kept: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | ',' | '-'))
        .collect();
    let negative = kept.starts_with('-');
    let digits = kept.trim_start_matches('-');
    if !digits.chars().any(|c| c.is_ascii_digit()) || digits.contains('-') {
        return None;
    }

    let decimal_sep = match (digits.rfind('.'), digits.rfind(',')) {
        (Some(dot), Some(comma)) => Some(if dot > comma { '.' } else { ',' }),
        (Some(_), None) => single_separator_role(digits, '.'),
        (None, Some(_)) => single_separator_role(digits, ','),
        (None, None) => None,
    };

    let mut normalized = String::with_capacity(digits.len() + 1);
    if negative {
        normalized.push('-');
    }
    for c in digits.chars() {
        match c {
            '.' | ',' if Some(c) == decimal_sep => normalized.push('.'),
            '.' | ',' => {}
            _ => normalized.push(c),
        }
    }
    normalized.parse().ok().filter(|amount: &f64| amount.is_finite())
}

// `Some(sep)` when `sep` acts as the decimal point.
fn single_separator_role(digits: &str, sep: char) -> Option<char> {
    if digits.matches(sep).count() > 1 {
        return None;
    }
    let after = digits.rsplit(sep).next().unwrap_or_default();
    if after.len() == 3 { None } else { Some(sep) }
}
