//! # Field Validation
//!
//! Pure predicate functions that guard record invariants before anything is written to a
//! store.  Every check returns `Ok(())` or a [`ValidationError`] describing the violation;
//! record types collect the failures per field into [`FieldErrors`].
//!
//! ```rust
//! use garden::{check_coordinate, check_non_negative};
//!
//! assert!(check_coordinate(21.433).is_ok());
//! assert!(check_coordinate(181.0).is_err());
//! assert!(check_non_negative(-1.0).is_err());
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

/// Maximum text lengths accepted for record fields.
pub mod limits {
    /// Names, places and other short labels.
    pub const SHORT_TEXT: usize = 256;
    /// Author and georeferencing author names.
    pub const AUTHOR: usize = 512;
    /// Free-form descriptions and notes.
    pub const LONG_TEXT: usize = 8192;
}

/// Smallest accepted longitude or latitude.
pub const MIN_DEGREE: f64 = -180.0;
/// Largest accepted longitude or latitude.
pub const MAX_DEGREE: f64 = 180.0;

/////////////////////////////////////////// ValidationError ///////////////////////////////////////////

/// A single invariant violation.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A degree value lies outside `[MIN_DEGREE, MAX_DEGREE]`.
    OutOfRange {
        /// The offending value.
        value: f64,
    },
    /// A value that must be zero or greater was negative.
    Negative {
        /// The offending value.
        value: f64,
    },
    /// A point in time lies after the moment of the check.
    InFuture {
        /// The offending point in time, formatted.
        value: String,
    },
    /// A required text field was empty or whitespace.
    Blank,
    /// A text field exceeded its maximum length.
    TooLong {
        /// The maximum allowed length in characters.
        max: usize,
        /// The actual length in characters.
        actual: usize,
    },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::OutOfRange { value } => write!(
                f,
                "Value {} should be between {} and {} degrees.",
                value, MIN_DEGREE, MAX_DEGREE
            ),
            ValidationError::Negative { value } => {
                write!(f, "Value {} should be equal or greater than zero.", value)
            }
            ValidationError::InFuture { value } => {
                write!(f, "Date and time {} is later than the current time.", value)
            }
            ValidationError::Blank => write!(f, "This field may not be blank."),
            ValidationError::TooLong { max, actual } => write!(
                f,
                "Ensure this field has no more than {} characters (it has {}).",
                max, actual
            ),
        }
    }
}

impl std::error::Error for ValidationError {}

//////////////////////////////////////////////// checks ////////////////////////////////////////////////

/// Fails when `value` lies outside the closed degree interval or is not finite.
///
/// The same bound is used for longitude and latitude.
pub fn check_coordinate(value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || !(MIN_DEGREE..=MAX_DEGREE).contains(&value) {
        return Err(ValidationError::OutOfRange { value });
    }
    Ok(())
}

/// Fails when `value` is below zero.
pub fn check_non_negative(value: f64) -> Result<(), ValidationError> {
    if value < 0.0 || value.is_nan() {
        return Err(ValidationError::Negative { value });
    }
    Ok(())
}

/// Fails when `timestamp` is strictly later than the current UTC time.
pub fn check_not_future(timestamp: &DateTime<Utc>) -> Result<(), ValidationError> {
    check_not_future_at(timestamp, &Utc::now())
}

/// Fails when `timestamp` is strictly later than `now`.
pub fn check_not_future_at(
    timestamp: &DateTime<Utc>,
    now: &DateTime<Utc>,
) -> Result<(), ValidationError> {
    if timestamp > now {
        return Err(ValidationError::InFuture {
            value: timestamp.to_rfc3339(),
        });
    }
    Ok(())
}

/// Fails when `date` is strictly later than the current UTC date.
pub fn check_date_not_future(date: &NaiveDate) -> Result<(), ValidationError> {
    check_date_not_future_at(date, &Utc::now().date_naive())
}

/// Fails when `date` is strictly later than `today`.
pub fn check_date_not_future_at(
    date: &NaiveDate,
    today: &NaiveDate,
) -> Result<(), ValidationError> {
    if date > today {
        return Err(ValidationError::InFuture {
            value: date.to_string(),
        });
    }
    Ok(())
}

/// Fails when `text` is empty or only whitespace.
pub fn check_not_blank(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::Blank);
    }
    Ok(())
}

/// Fails when `text` is longer than `max` characters.
pub fn check_max_length(text: &str, max: usize) -> Result<(), ValidationError> {
    let actual = text.chars().count();
    if actual > max {
        return Err(ValidationError::TooLong { max, actual });
    }
    Ok(())
}

////////////////////////////////////////////// FieldErrors /////////////////////////////////////////////

/// Validation failures keyed by field name.
///
/// Serializes as `{"field": ["message", ...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    /// Creates an empty set of errors.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a message against `field`.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Records the outcome of a check against `field` if it failed.
    pub fn check(&mut self, field: &str, outcome: Result<(), ValidationError>) {
        if let Err(e) = outcome {
            self.add(field, e.to_string());
        }
    }

    /// Checks a required text field for blankness and length.
    pub fn required_text(&mut self, field: &str, text: &str, max: usize) {
        self.check(field, check_not_blank(text));
        self.check(field, check_max_length(text, max));
    }

    /// Checks an optional text field for length.
    pub fn optional_text(&mut self, field: &str, text: Option<&str>, max: usize) {
        if let Some(text) = text {
            self.check(field, check_max_length(text, max));
        }
    }

    /// Folds another set of errors into this one.
    pub fn merge(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    /// Returns the messages recorded against `field`.
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// Returns true when no field failed.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Converts into `Ok(())` when empty and `Err(self)` otherwise.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{}: {}", field, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

impl std::error::Error for FieldErrors {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn coordinate_bounds_are_inclusive() {
        assert!(check_coordinate(MIN_DEGREE).is_ok());
        assert!(check_coordinate(MAX_DEGREE).is_ok());
        assert!(check_coordinate(0.0).is_ok());
    }

    #[test]
    fn coordinate_outside_bounds_fails() {
        assert_eq!(
            check_coordinate(180.0001),
            Err(ValidationError::OutOfRange { value: 180.0001 })
        );
        assert!(check_coordinate(-180.5).is_err());
    }

    #[test]
    fn coordinate_not_finite_fails() {
        assert!(check_coordinate(f64::NAN).is_err());
        assert!(check_coordinate(f64::INFINITY).is_err());
    }

    #[test]
    fn latitude_shares_longitude_bound() {
        // 120 degrees is not a real latitude but passes the shared bound.
        assert!(check_coordinate(120.0).is_ok());
    }

    #[test]
    fn non_negative() {
        assert!(check_non_negative(0.0).is_ok());
        assert!(check_non_negative(3.893).is_ok());
        assert_eq!(
            check_non_negative(-1.0),
            Err(ValidationError::Negative { value: -1.0 })
        );
    }

    #[test]
    fn not_future_at_boundary() {
        let now = Utc::now();
        assert!(check_not_future_at(&now, &now).is_ok());
        assert!(check_not_future_at(&(now - Duration::seconds(1)), &now).is_ok());
        assert!(check_not_future_at(&(now + Duration::milliseconds(1)), &now).is_err());
    }

    #[test]
    fn not_future_against_clock() {
        assert!(check_not_future(&(Utc::now() - Duration::days(1))).is_ok());
        assert!(check_not_future(&(Utc::now() + Duration::days(1))).is_err());
    }

    #[test]
    fn date_not_future() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert!(check_date_not_future_at(&today, &today).is_ok());
        let tomorrow = today.succ_opt().unwrap();
        assert!(check_date_not_future_at(&tomorrow, &today).is_err());
    }

    #[test]
    fn blank_and_length() {
        assert_eq!(check_not_blank("  "), Err(ValidationError::Blank));
        assert!(check_not_blank("Moscow").is_ok());
        assert!(check_max_length("abc", 3).is_ok());
        assert_eq!(
            check_max_length("abcd", 3),
            Err(ValidationError::TooLong { max: 3, actual: 4 })
        );
    }

    #[test]
    fn field_errors_collect_and_serialize() {
        let mut errors = FieldErrors::new();
        errors.check("altitude", check_non_negative(-1.0));
        errors.check("latitude", check_coordinate(10.0));
        errors.required_text("genus", "", limits::SHORT_TEXT);
        assert!(!errors.is_empty());
        assert_eq!(errors.get("altitude").unwrap().len(), 1);
        assert!(errors.get("latitude").is_none());

        let value = serde_json::to_value(&errors).unwrap();
        assert!(value["altitude"].is_array());
        assert_eq!(value["genus"][0], "This field may not be blank.");
    }

    #[test]
    fn empty_errors_are_ok() {
        assert_eq!(FieldErrors::new().into_result(), Ok(()));
    }
}
