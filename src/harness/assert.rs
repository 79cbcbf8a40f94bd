//! Strict assertions returning errors instead of panicking.

use std::fmt::Debug;

use thiserror::Error;

/// An expected/actual mismatch inside a check.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{context}: expected {expected}, got {actual}")]
pub struct AssertionFailure {
    pub context: String,
    pub expected: String,
    pub actual: String,
}

/// Require `actual == expected` (strict, deep for slices and vectors).
pub fn expect_eq<T: PartialEq + Debug + ?Sized>(context: &str, actual: &T, expected: &T) -> Result<(), AssertionFailure> {
    if actual == expected {
        return Ok(());
    }
    Err(AssertionFailure {
        context: context.to_string(),
        expected: format!("{expected:?}"),
        actual: format!("{actual:?}"),
    })
}

/// Require `condition` to hold.
pub fn expect_true(context: &str, condition: bool) -> Result<(), AssertionFailure> {
    expect_eq(context, &condition, &true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_values_pass() {
        assert!(expect_eq("sum", &15, &15).is_ok());
        assert!(expect_eq("array", &[1, 2, 3][..], &[1, 2, 3][..]).is_ok());
    }

    #[test]
    fn test_mismatch_reports_both_sides() {
        let err = expect_eq("motto", "Existance is pain", "YOLO").unwrap_err();
        assert_eq!(err.expected, "\"YOLO\"");
        assert_eq!(err.actual, "\"Existance is pain\"");
        assert_eq!(err.to_string(), "motto: expected \"YOLO\", got \"Existance is pain\"");
    }

    #[test]
    fn test_deep_equality_checks_length() {
        let err = expect_eq("truncated", &vec![1, 2, 3, 4], &vec![1, 2, 3]).unwrap_err();
        assert_eq!(err.expected, "[1, 2, 3]");
    }

    #[test]
    fn test_expect_true() {
        assert!(expect_true("instance", true).is_ok());
        assert_eq!(expect_true("instance", false).unwrap_err().actual, "false");
    }
}
