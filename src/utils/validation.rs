use crate::utils::error::{EngineError, Result};
use rust_decimal::Decimal;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(EngineError::validation(
            field_name,
            "Value cannot be empty or whitespace-only",
        ));
    }
    Ok(())
}

pub fn validate_non_negative_amount(field_name: &str, value: Decimal) -> Result<()> {
    if value < Decimal::ZERO {
        return Err(EngineError::validation(
            field_name,
            format!("Amount must not be negative, got {}", value),
        ));
    }
    Ok(())
}

pub fn validate_currency_code(field_name: &str, code: &str) -> Result<()> {
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(EngineError::validation(
            field_name,
            format!("'{}' is not a three-letter uppercase currency code", code),
        ));
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(EngineError::validation(
            field_name,
            format!("Value {} must be between {} and {}", value, min, max),
        ));
    }
    Ok(())
}

/// Explicit day numbers supplied by a caller must already be `1..=N`.
pub fn validate_contiguous_numbers(field_name: &str, numbers: &[u32]) -> Result<()> {
    for (index, number) in numbers.iter().enumerate() {
        let expected = index as u32 + 1;
        if *number != expected {
            return Err(EngineError::validation(
                field_name,
                format!(
                    "Day numbers must be contiguous from 1; expected {} at position {}, found {}",
                    expected,
                    index + 1,
                    number
                ),
            ));
        }
    }
    Ok(())
}
