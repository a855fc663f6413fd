//! Client-side form validation run before any create request leaves the
//! console. Errors are reported per field and never touch the store.
use chrono::NaiveTime;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9]{7,15}$").expect("valid phone regex"));
static IPV4_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^((25[0-5]|2[0-4][0-9]|1[0-9]{2}|[1-9]?[0-9])\.){3}(25[0-5]|2[0-4][0-9]|1[0-9]{2}|[1-9]?[0-9])$")
        .expect("valid ipv4 regex")
});
static CLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([01][0-9]|2[0-3]):[0-5][0-9]$").expect("valid clock regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors {
    pub fields: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &'static str, message: &'static str) {
        self.fields.push(FieldError { field, message });
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.fields.iter().any(|e| e.field == field)
    }

    /// Records `message` against `field` when `value` is blank.
    pub fn require(&mut self, field: &'static str, value: &str, message: &'static str) {
        if value.trim().is_empty() {
            self.push(field, message);
        }
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}: {}", e.field, e.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

pub trait Validate {
    fn validate(&self) -> Result<(), ValidationErrors>;
}

pub fn is_email(value: &str) -> bool {
    EMAIL_RE.is_match(value.trim())
}

/// Accepts 7-15 digits with an optional leading `+`; spaces and dashes are ignored.
pub fn is_phone(value: &str) -> bool {
    let compact: String = value.chars().filter(|c| !matches!(c, ' ' | '-')).collect();
    PHONE_RE.is_match(&compact)
}

pub fn is_ipv4(value: &str) -> bool {
    IPV4_RE.is_match(value.trim())
}

pub fn is_clock_time(value: &str) -> bool {
    CLOCK_RE.is_match(value.trim())
}

/// Break length between two `HH:MM` times, formatted `HH:MM`.
/// Returns `None` unless `end` is strictly after `start`.
pub fn break_duration(start: &str, end: &str) -> Option<String> {
    let start = NaiveTime::parse_from_str(start.trim(), "%H:%M").ok()?;
    let end = NaiveTime::parse_from_str(end.trim(), "%H:%M").ok()?;
    let minutes = (end - start).num_minutes();
    if minutes <= 0 {
        return None;
    }
    Some(format!("{:02}:{:02}", minutes / 60, minutes % 60))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_is_computed_for_forward_ranges() {
        assert_eq!(break_duration("12:00", "13:30").as_deref(), Some("01:30"));
        assert_eq!(break_duration("09:05", "09:20").as_deref(), Some("00:15"));
    }

    #[test]
    fn duration_is_empty_for_backward_or_bad_input() {
        assert_eq!(break_duration("13:00", "12:00"), None);
        assert_eq!(break_duration("12:00", "12:00"), None);
        assert_eq!(break_duration("noon", "13:00"), None);
    }

    #[test]
    fn field_format_checks() {
        assert!(is_email("hr@tecmetrics.io"));
        assert!(!is_email("hr@tecmetrics"));
        assert!(is_phone("+966 50-123-4567"));
        assert!(!is_phone("12ab"));
        assert!(is_ipv4("192.168.1.201"));
        assert!(!is_ipv4("192.168.1.301"));
        assert!(is_clock_time("23:59"));
        assert!(!is_clock_time("24:00"));
    }

    #[test]
    fn errors_display_joins_fields() {
        let mut errs = ValidationErrors::new();
        errs.require("name", " ", "Name is required");
        errs.require("code", "RYD", "Code is required");
        errs.push("email", "Invalid email address");
        assert!(errs.has("name"));
        assert!(!errs.has("code"));
        assert_eq!(errs.to_string(), "name: Name is required; email: Invalid email address");
        assert!(errs.into_result().is_err());
    }
}
