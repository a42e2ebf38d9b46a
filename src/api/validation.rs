//! Request validation for event and RSVP payloads.
//!
//! Everything here is pure so it can be unit-tested without a running server.

use regex::Regex;
use std::sync::LazyLock;

use crate::api::error::ApiError;
use crate::constants::limits::{
    COMMENT_MAX_LENGTH, DESCRIPTION_MAX_LENGTH, LOCATION_MAX_LENGTH, TITLE_MAX_LENGTH,
};

static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("valid date regex"));

static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}:\d{2}$").expect("valid time regex"));

pub const RSVP_STATUSES: &[&str] = &["yes", "no", "maybe"];

/// Strip angle brackets so stored text cannot smuggle markup into pages
/// that render it.
#[must_use]
pub fn sanitize_text(input: &str) -> String {
    input
        .chars()
        .filter(|c| *c != '<' && *c != '>')
        .collect::<String>()
        .trim()
        .to_string()
}

pub fn validate_title(title: &str) -> Result<String, ApiError> {
    let title = sanitize_text(title);
    if title.is_empty() {
        return Err(ApiError::validation("Title is required"));
    }
    if title.chars().count() > TITLE_MAX_LENGTH {
        return Err(ApiError::validation(format!(
            "Title must be at most {TITLE_MAX_LENGTH} characters"
        )));
    }
    Ok(title)
}

pub fn validate_location(location: &str) -> Result<String, ApiError> {
    let location = sanitize_text(location);
    if location.is_empty() {
        return Err(ApiError::validation("Location is required"));
    }
    if location.chars().count() > LOCATION_MAX_LENGTH {
        return Err(ApiError::validation(format!(
            "Location must be at most {LOCATION_MAX_LENGTH} characters"
        )));
    }
    Ok(location)
}

/// An absent or blank description is stored as `NULL`, not as an empty string.
pub fn validate_description(description: Option<&str>) -> Result<Option<String>, ApiError> {
    let Some(description) = description else {
        return Ok(None);
    };
    let description = sanitize_text(description);
    if description.is_empty() {
        return Ok(None);
    }
    if description.chars().count() > DESCRIPTION_MAX_LENGTH {
        return Err(ApiError::validation(format!(
            "Description must be at most {DESCRIPTION_MAX_LENGTH} characters"
        )));
    }
    Ok(Some(description))
}

pub fn validate_event_date(date: &str) -> Result<String, ApiError> {
    let date = date.trim();
    if !DATE_RE.is_match(date) {
        return Err(ApiError::validation("Date must be in YYYY-MM-DD format"));
    }
    Ok(date.to_string())
}

pub fn validate_event_time(time: &str) -> Result<String, ApiError> {
    let time = time.trim();
    if !TIME_RE.is_match(time) {
        return Err(ApiError::validation("Time must be in HH:MM format"));
    }
    Ok(time.to_string())
}

pub fn validate_rsvp_status(status: &str) -> Result<String, ApiError> {
    let status = status.trim().to_lowercase();
    if !RSVP_STATUSES.contains(&status.as_str()) {
        return Err(ApiError::validation(
            "RSVP status must be one of: yes, no, maybe",
        ));
    }
    Ok(status)
}

pub fn validate_rsvp_comment(comment: Option<&str>) -> Result<Option<String>, ApiError> {
    let Some(comment) = comment else {
        return Ok(None);
    };
    let comment = sanitize_text(comment);
    if comment.is_empty() {
        return Ok(None);
    }
    if comment.chars().count() > COMMENT_MAX_LENGTH {
        return Err(ApiError::validation(format!(
            "Comment must be at most {COMMENT_MAX_LENGTH} characters"
        )));
    }
    Ok(Some(comment))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_text_strips_angle_brackets() {
        assert_eq!(sanitize_text("<script>alert(1)</script>"), "scriptalert(1)/script");
        assert_eq!(sanitize_text("  plain text  "), "plain text");
    }

    #[test]
    fn test_validate_title() {
        assert_eq!(validate_title("Game night").unwrap(), "Game night");
        assert!(validate_title("").is_err());
        assert!(validate_title("<>").is_err());
        assert!(validate_title(&"x".repeat(201)).is_err());
        assert!(validate_title(&"x".repeat(200)).is_ok());
    }

    #[test]
    fn test_validate_description_blank_becomes_none() {
        assert_eq!(validate_description(None).unwrap(), None);
        assert_eq!(validate_description(Some("   ")).unwrap(), None);
        assert_eq!(
            validate_description(Some("bring snacks")).unwrap(),
            Some("bring snacks".to_string())
        );
        assert!(validate_description(Some(&"x".repeat(2001))).is_err());
    }

    #[test]
    fn test_validate_event_date() {
        assert!(validate_event_date("2025-06-01").is_ok());
        assert!(validate_event_date("2025-6-1").is_err());
        assert!(validate_event_date("01-06-2025").is_err());
        assert!(validate_event_date("2025-06-01T10:00").is_err());
    }

    #[test]
    fn test_validate_event_time() {
        assert!(validate_event_time("09:30").is_ok());
        assert!(validate_event_time("9:30").is_err());
        assert!(validate_event_time("09:30:00").is_err());
    }

    #[test]
    fn test_validate_rsvp_status() {
        assert_eq!(validate_rsvp_status("yes").unwrap(), "yes");
        assert_eq!(validate_rsvp_status(" Maybe ").unwrap(), "maybe");
        assert!(validate_rsvp_status("attending").is_err());
        assert!(validate_rsvp_status("").is_err());
    }
}
