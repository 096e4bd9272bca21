//! Well-known string formats, used only to annotate fields

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static ISO_DATETIME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:\d{2})?$").unwrap()
});

static ISO_DATE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

static ISO_TIME_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{2}:\d{2}:\d{2}(\.\d+)?$").unwrap());

static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap()
});

static UUID_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$").unwrap()
});

static IPV4_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d{1,3}\.){3}\d{1,3}$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum StringFormat {
    DateTime,
    Date,
    Time,
    Email,
    Uuid,
    Uri,
    Ipv4,
}

impl StringFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            StringFormat::DateTime => "date-time",
            StringFormat::Date => "date",
            StringFormat::Time => "time",
            StringFormat::Email => "email",
            StringFormat::Uuid => "uuid",
            StringFormat::Uri => "uri",
            StringFormat::Ipv4 => "ipv4",
        }
    }
}

/// Classify a string, cheapest checks first
pub fn detect_format(value: &str) -> Option<StringFormat> {
    let len = value.len();
    if len == 0 {
        return None;
    }

    if len > 6
        && (value.starts_with("http://")
            || value.starts_with("https://")
            || value.starts_with("ftp://")
            || value.starts_with("file://"))
    {
        return Some(StringFormat::Uri);
    }

    if len == 10 && ISO_DATE_REGEX.is_match(value) {
        return Some(StringFormat::Date);
    }

    if len == 36 && UUID_REGEX.is_match(value) {
        return Some(StringFormat::Uuid);
    }

    if len >= 19 && ISO_DATETIME_REGEX.is_match(value) {
        return Some(StringFormat::DateTime);
    }

    if len >= 8 && value.contains(':') && ISO_TIME_REGEX.is_match(value) {
        return Some(StringFormat::Time);
    }

    if len > 5 && len < 255 && value.contains('@') && EMAIL_REGEX.is_match(value) {
        return Some(StringFormat::Email);
    }

    if len < 16 && IPV4_REGEX.is_match(value) && value.split('.').all(|part| part.parse::<u8>().is_ok()) {
        return Some(StringFormat::Ipv4);
    }

    None
}
