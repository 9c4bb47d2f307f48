//! Validators and sanitizers for request arguments.
//!
//! Validators are plugged into `validator` derives on the argument structs;
//! sanitizers run after validation succeeded.

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use serde_json::Value;
use std::borrow::Cow;
use std::sync::LazyLock;
use validator::ValidationError;

pub const DATE_FORMAT: &str = "%d/%m/%Y";
pub const DATE_TIME_FORMAT: &str = "%d/%m/%Y %H:%M";

static NUMERIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ \t\n\r\x0B\x0C]*[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?[ \t\n\r\x0B\x0C]*$")
        .expect("numeric pattern is valid")
});
static SCRIPT_STYLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script[^>]*?>.*?</script>|<style[^>]*?>.*?</style>")
        .expect("script/style pattern is valid")
});
static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[a-zA-Z/!?][^>]*>").expect("tag pattern is valid"));
static LINE_WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\r\n\t ]+").expect("whitespace pattern is valid"));
static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" +").expect("space pattern is valid"));
static OCTET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"%[a-fA-F0-9]{2}").expect("octet pattern is valid"));

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

/// Scalar parameter as a string. Arrays and objects have no string form.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("1".to_string()),
        Value::Bool(false) => Some(String::new()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

pub fn is_numeric_str(s: &str) -> bool {
    NUMERIC.is_match(s)
}

/// Accepts JSON numbers and numeric strings (sign, decimals, exponent,
/// surrounding whitespace).
pub fn numeric(value: &Value) -> Result<(), ValidationError> {
    let ok = match value {
        Value::Number(_) => true,
        Value::String(s) => is_numeric_str(s),
        _ => false,
    };
    if ok {
        Ok(())
    } else {
        Err(invalid("numeric", "must be numeric"))
    }
}

/// Rejects values that cannot be read as text.
pub fn scalar(value: &Value) -> Result<(), ValidationError> {
    match scalar_to_string(value) {
        Some(_) => Ok(()),
        None => Err(invalid("scalar", "must be a string")),
    }
}

pub fn is_valid_date(s: &str) -> bool {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map(|d| d.format(DATE_FORMAT).to_string() == s)
        .unwrap_or(false)
}

/// Parsing and formatting again must give back the exact input, so
/// `1/5/2024` or `01/05/2024 ` are rejected.
pub fn is_valid_date_time(s: &str) -> bool {
    NaiveDateTime::parse_from_str(s, DATE_TIME_FORMAT)
        .map(|d| d.format(DATE_TIME_FORMAT).to_string() == s)
        .unwrap_or(false)
}

pub fn date(value: &Value) -> Result<(), ValidationError> {
    match value {
        Value::String(s) if is_valid_date(s) => Ok(()),
        _ => Err(invalid("date", "must be a date in dd/mm/yyyy format")),
    }
}

pub fn date_time(value: &Value) -> Result<(), ValidationError> {
    match value {
        Value::String(s) if is_valid_date_time(s) => Ok(()),
        _ => Err(invalid(
            "date_time",
            "must be a date and time in dd/mm/yyyy HH:MM format",
        )),
    }
}

/// Absolute value of the integer part; anything unreadable becomes 0.
pub fn sanitize_number(value: &Value) -> u64 {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    // `as` насыщается: NaN -> 0, бесконечность -> u64::MAX
    number.map(|n| n.trunc().abs() as u64).unwrap_or(0)
}

fn php_trim(s: &str) -> &str {
    s.trim_matches(|c| matches!(c, ' ' | '\t' | '\n' | '\r' | '\0' | '\x0B'))
}

fn strip_tags(s: &str) -> String {
    let without_blocks = SCRIPT_STYLE.replace_all(s, "");
    let without_tags = TAG.replace_all(&without_blocks, "");
    // одиночный '<' не должен превратиться в тег позже
    without_tags.replace('<', "&lt;")
}

fn sanitize_text(raw: &str, keep_newlines: bool) -> String {
    let mut filtered = if raw.contains('<') {
        strip_tags(raw)
    } else {
        raw.to_string()
    };

    // многострочный текст сохраняет пробелы, табы и переводы строк как есть
    if !keep_newlines {
        filtered = LINE_WHITESPACE.replace_all(&filtered, " ").into_owned();
    }

    let mut filtered = php_trim(&filtered).to_string();

    let mut found = false;
    while OCTET.is_match(&filtered) {
        filtered = OCTET.replace_all(&filtered, "").into_owned();
        found = true;
    }
    if found {
        filtered = php_trim(&SPACES.replace_all(&filtered, " ")).to_string();
    }

    filtered
}

/// Plain-text field: tags stripped, every whitespace run (newlines included)
/// collapsed to one space, percent-encoded octets removed.
pub fn sanitize_string(value: &Value) -> String {
    scalar_to_string(value)
        .map(|s| sanitize_text(&s, false))
        .unwrap_or_default()
}

/// Long-form text: tags and octets are removed and the ends trimmed, inner
/// whitespace is left untouched.
pub fn sanitize_description(value: &Value) -> String {
    scalar_to_string(value)
        .map(|s| sanitize_text(&s, true))
        .unwrap_or_default()
}
