//! Validation utilities for the Stock Manager platform

use rust_decimal::Decimal;
use validator::Validate;

use crate::error::{WorkflowError, WorkflowResult};

/// Prefix of generated product references
pub const REFERENCE_PREFIX: &str = "RF";

/// Width of the numeric part of generated references
pub const REFERENCE_DIGITS: usize = 5;

// ============================================================================
// Stock Validations
// ============================================================================

/// Validate stock figures: all non-negative and `min <= max`
pub fn validate_stock_levels(current: Decimal, min: Decimal, max: Decimal) -> Result<(), &'static str> {
    if current < Decimal::ZERO {
        return Err("Current stock cannot be negative");
    }
    validate_thresholds(min, max)
}

/// Validate thresholds alone: non-negative and `min <= max`
pub fn validate_thresholds(min: Decimal, max: Decimal) -> Result<(), &'static str> {
    if min < Decimal::ZERO || max < Decimal::ZERO {
        return Err("Stock thresholds cannot be negative");
    }
    if min > max {
        return Err("Minimum stock cannot exceed maximum stock");
    }
    Ok(())
}

/// Validate a requested quantity is strictly positive
pub fn validate_positive_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Quantity must be greater than zero");
    }
    Ok(())
}

// ============================================================================
// Reference Validations
// ============================================================================

/// Validate a product reference: 1-32 characters, no whitespace
pub fn validate_reference(reference: &str) -> Result<(), &'static str> {
    if reference.is_empty() {
        return Err("Reference is required");
    }
    if reference.chars().count() > 32 {
        return Err("Reference must be at most 32 characters");
    }
    if reference.chars().any(char::is_whitespace) {
        return Err("Reference cannot contain whitespace");
    }
    Ok(())
}

/// Numeric suffix of a generated-style reference (`RF00042` -> 42)
pub fn reference_number(reference: &str) -> Option<u32> {
    let digits = reference.strip_prefix(REFERENCE_PREFIX)?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Next free generated reference after the given ones
pub fn next_reference<'a>(existing: impl IntoIterator<Item = &'a str>) -> String {
    let next = existing
        .into_iter()
        .filter_map(reference_number)
        .max()
        .map_or(1, |n| n + 1);
    format!("{}{:0width$}", REFERENCE_PREFIX, next, width = REFERENCE_DIGITS)
}

// ============================================================================
// Input Validation
// ============================================================================

/// Run derived `validator` rules and report the first failing field
pub fn check_input<T: Validate>(input: &T) -> WorkflowResult<()> {
    input.validate().map_err(|errors| {
        let (field, message) = errors
            .field_errors()
            .into_iter()
            .next()
            .map(|(field, errs)| {
                let message = errs
                    .first()
                    .map(|e| e.code.to_string())
                    .unwrap_or_else(|| "invalid".to_string());
                (field.to_string(), message)
            })
            .unwrap_or_else(|| ("input".to_string(), errors.to_string()));
        WorkflowError::Validation { field, message }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(v: i64) -> Decimal {
        Decimal::from(v)
    }

    #[test]
    fn test_validate_stock_levels() {
        assert!(validate_stock_levels(dec(5), dec(2), dec(10)).is_ok());
        assert!(validate_stock_levels(dec(0), dec(0), dec(0)).is_ok());
        assert!(validate_stock_levels(dec(-1), dec(2), dec(10)).is_err());
        assert!(validate_stock_levels(dec(5), dec(-2), dec(10)).is_err());
        assert!(validate_stock_levels(dec(5), dec(12), dec(10)).is_err());
        assert!(validate_thresholds(dec(2), dec(10)).is_ok());
        assert!(validate_thresholds(dec(12), dec(10)).is_err());
    }

    #[test]
    fn test_validate_positive_quantity() {
        assert!(validate_positive_quantity(dec(1)).is_ok());
        assert!(validate_positive_quantity(dec(0)).is_err());
        assert!(validate_positive_quantity(dec(-3)).is_err());
    }

    #[test]
    fn test_validate_reference() {
        assert!(validate_reference("RF00001").is_ok());
        assert!(validate_reference("VIS-M8-20").is_ok());
        assert!(validate_reference("").is_err());
        assert!(validate_reference("RF 0001").is_err());
        assert!(validate_reference(&"X".repeat(33)).is_err());
    }

    #[test]
    fn test_reference_number() {
        assert_eq!(reference_number("RF00042"), Some(42));
        assert_eq!(reference_number("RF1"), Some(1));
        assert_eq!(reference_number("RF"), None);
        assert_eq!(reference_number("VIS-M8"), None);
        assert_eq!(reference_number("RF12A"), None);
    }

    #[test]
    fn test_next_reference_first() {
        assert_eq!(next_reference(Vec::<&str>::new()), "RF00001");
    }

    #[test]
    fn test_next_reference_skips_custom_references() {
        let existing = ["RF00003", "CUSTOM-9", "RF00011", "RF00002"];
        assert_eq!(next_reference(existing), "RF00012");
    }
}
