//! Ready-made member validators

use regex::Regex;
use std::sync::Arc;

use crate::field::MemberValidator;
use crate::value::Value;

/// Rejects null and empty text
pub fn required() -> MemberValidator {
    Arc::new(|value: &Value| match value {
        Value::Null => Err("value is required".to_string()),
        Value::Text(text) if text.trim().is_empty() => Err("value is required".to_string()),
        _ => Ok(()),
    })
}

/// Rejects text longer than `max` characters
pub fn max_length(max: usize) -> MemberValidator {
    Arc::new(move |value: &Value| match value {
        Value::Text(text) if text.chars().count() > max => Err(format!(
            "length {} exceeds maximum of {}",
            text.chars().count(),
            max
        )),
        _ => Ok(()),
    })
}

/// Requires the scalar text to match `pattern`; nulls pass
pub fn pattern(pattern: &str) -> Result<MemberValidator, regex::Error> {
    let regex = Regex::new(pattern)?;
    Ok(Arc::new(move |value: &Value| {
        match value.scalar_text('.') {
            Some(text) if !regex.is_match(&text) => {
                Err(format!("'{}' does not match pattern '{}'", text, regex.as_str()))
            }
            _ => Ok(()),
        }
    }))
}

/// Requires a numeric value within `min..=max`; nulls pass
pub fn range(min: f64, max: f64) -> MemberValidator {
    Arc::new(move |value: &Value| {
        let number = match value {
            Value::Int(i) => *i as f64,
            Value::Float(f) => *f,
            Value::Null => return Ok(()),
            other => return Err(format!("'{}' is not a number", other)),
        };
        if number < min || number > max {
            Err(format!("{} is outside the range {}..={}", number, min, max))
        } else {
            Ok(())
        }
    })
}
