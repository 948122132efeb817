use crate::utils::error::{LivedError, Result};
use chrono::format::{Item, StrftimeItems};

pub const OUTPUT_FORMATS: [&str; 2] = ["csv", "json"];
pub const LOG_FORMATS: [&str; 2] = ["compact", "json"];

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(LivedError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(LivedError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_paths(field_name: &str, paths: &[String]) -> Result<()> {
    if paths.is_empty() {
        return Err(LivedError::MissingConfigError {
            field: field_name.to_string(),
        });
    }
    paths.iter().try_for_each(|path| validate_path(field_name, path))
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(LivedError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(LivedError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
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
        return Err(LivedError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

pub fn validate_one_of(field_name: &str, value: &str, allowed: &[&str]) -> Result<()> {
    if !allowed.contains(&value) {
        return Err(LivedError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Unsupported value. Valid values: {}", allowed.join(", ")),
        });
    }
    Ok(())
}

/// Rejects strftime patterns chrono cannot interpret, before any row is parsed.
pub fn validate_date_formats(field_name: &str, formats: &[String]) -> Result<()> {
    if formats.is_empty() {
        return Err(LivedError::MissingConfigError {
            field: field_name.to_string(),
        });
    }

    for format in formats {
        validate_non_empty_string(field_name, format)?;
        if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
            return Err(LivedError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: format.clone(),
                reason: "Invalid strftime pattern".to_string(),
            });
        }
    }
    Ok(())
}

pub fn validate_exclusive(
    field_a: &str,
    a: Option<usize>,
    field_b: &str,
    b: Option<usize>,
) -> Result<()> {
    if a.is_some() && b.is_some() {
        return Err(LivedError::ConfigValidationError {
            field: format!("{}/{}", field_a, field_b),
            message: "options are mutually exclusive".to_string(),
        });
    }
    Ok(())
}
