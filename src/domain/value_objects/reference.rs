//! Human-readable booking and payment references.
//!
//! Format: `{PREFIX}-{yyyyMMddHHmmss}-{6 uppercase hex}`, e.g.
//! `AP-20250301143000-3FA85F`.

use chrono::{DateTime, Utc};
use uuid::Uuid;

pub const APPOINTMENT_PREFIX: &str = "AP";
pub const PAYMENT_PREFIX: &str = "PAY";

/// Build a reference for the given instant with a random suffix.
pub fn generate(prefix: &str, at: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string()[..6].to_uppercase();
    format!("{}-{}-{}", prefix, at.format("%Y%m%d%H%M%S"), suffix)
}

pub fn appointment_reference(at: DateTime<Utc>) -> String {
    generate(APPOINTMENT_PREFIX, at)
}

pub fn payment_reference(at: DateTime<Utc>) -> String {
    generate(PAYMENT_PREFIX, at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_appointment_reference_format() {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 14, 30, 0).unwrap();
        let reference = appointment_reference(at);
        let parts: Vec<&str> = reference.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "AP");
        assert_eq!(parts[1], "20250301143000");
        assert_eq!(parts[2].len(), 6);
        assert!(parts[2]
            .chars()
            .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
    }

    #[test]
    fn test_payment_reference_prefix() {
        assert!(payment_reference(Utc::now()).starts_with("PAY-"));
    }

    #[test]
    fn test_references_differ() {
        let at = Utc::now();
        assert_ne!(appointment_reference(at), appointment_reference(at));
    }
}
