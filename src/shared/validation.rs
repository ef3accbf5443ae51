//! Validation Utilities
//!
//! Conversion of `validator` failures into `AppError` plus the custom field
//! rules shared by request DTOs.

use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use validator::{ValidationError, ValidationErrors};

use super::error::{AppError, FieldError};

/// Convert validation errors to AppError
pub fn validation_error(errors: ValidationErrors) -> AppError {
    let mut field_errors: Vec<FieldError> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| FieldError {
                field: field.to_string(),
                message: e
                    .message
                    .clone()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string()),
            })
        })
        .collect();

    // HashMap iteration order is not stable
    field_errors.sort_by(|a, b| a.field.cmp(&b.field));

    let message = field_errors
        .first()
        .map(|e| e.message.clone())
        .unwrap_or_else(|| "Validation failed".into());

    AppError::Validation {
        message,
        errors: field_errors,
    }
}

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

/// E.164-like phone: optional `+`, leading non-zero digit, 2 to 15 digits.
pub fn validate_e164_phone(phone: &str) -> Result<(), ValidationError> {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    let ok = (2..=15).contains(&digits.len())
        && digits.chars().all(|c| c.is_ascii_digit())
        && !digits.starts_with('0');
    if ok {
        Ok(())
    } else {
        Err(invalid("phone", "Formato de teléfono inválido"))
    }
}

/// Plain local phone number made of 7 to 15 digits.
pub fn validate_local_phone(phone: &str) -> Result<(), ValidationError> {
    let phone = phone.trim();
    if phone.is_empty() {
        return Ok(());
    }
    if (7..=15).contains(&phone.len()) && phone.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        Err(invalid("phone", "El teléfono debe tener entre 7 y 15 dígitos"))
    }
}

/// Password needs upper and lower case letters, a digit and a symbol.
pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    let upper = password.chars().any(|c| c.is_uppercase());
    let lower = password.chars().any(|c| c.is_lowercase());
    let digit = password.chars().any(|c| c.is_ascii_digit());
    let special = password.chars().any(|c| !c.is_alphanumeric());
    if upper && lower && digit && special {
        Ok(())
    } else {
        Err(invalid(
            "password_strength",
            "La contraseña debe contener mayúsculas, minúsculas, números y caracteres especiales",
        ))
    }
}

/// Absolute http(s) URL.
pub fn validate_http_url(url: &str) -> Result<(), ValidationError> {
    let url = url.trim();
    if url.is_empty() {
        return Ok(());
    }
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    match rest {
        Some(host) if !host.is_empty() && !host.starts_with('/') && !host.contains(' ') => Ok(()),
        _ => Err(invalid("url", "La URL debe ser absoluta (http o https)")),
    }
}

pub fn validate_gender(gender: &str) -> Result<(), ValidationError> {
    match gender.trim() {
        "" | "M" | "F" | "Other" => Ok(()),
        _ => Err(invalid("gender", "El género debe ser M, F u Other")),
    }
}

/// Largest amount a NUMERIC(12,2) column holds.
pub fn max_amount() -> Decimal {
    Decimal::new(999_999_999_999, 2)
}

pub fn validate_positive_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if !amount.is_sign_positive() || amount.is_zero() {
        return Err(invalid("amount", "El monto debe ser mayor a cero"));
    }
    if amount.normalize().scale() > 2 {
        return Err(invalid("amount", "El monto admite como máximo dos decimales"));
    }
    if *amount > max_amount() {
        return Err(invalid("amount", "El monto excede el máximo permitido"));
    }
    Ok(())
}

/// Users must be at least 13 years old.
pub fn validate_minimum_age(date_of_birth: &NaiveDate) -> Result<(), ValidationError> {
    let today = Utc::now().date_naive();
    if *date_of_birth > today {
        return Err(invalid("date_of_birth", "La fecha de nacimiento no puede ser futura"));
    }
    let mut age = today.year() - date_of_birth.year();
    if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
        age -= 1;
    }
    if age >= 13 {
        Ok(())
    } else {
        Err(invalid("date_of_birth", "Debes tener al menos 13 años"))
    }
}
