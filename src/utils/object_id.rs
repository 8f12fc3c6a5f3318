use chrono::Utc;
use rand::Rng;

use crate::error::AppError;

pub const OBJECT_ID_LEN: usize = 24;

pub fn is_valid_object_id(id: &str) -> bool {
    id.len() == OBJECT_ID_LEN && id.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Rejects missing or malformed identifiers before any store lookup.
///
/// Returns the canonical lower-case form, which is what the stores hold.
pub fn validate_object_id(id: &str, field_name: &str) -> Result<String, AppError> {
    if id.trim().is_empty() {
        return Err(AppError::Validation(format!("{field_name} is required")));
    }

    if !is_valid_object_id(id) {
        return Err(AppError::Validation(format!(
            "Invalid {field_name} format. Must be a 24-character hexadecimal string"
        )));
    }

    Ok(id.to_ascii_lowercase())
}

/// 8 hex digits of the unix timestamp followed by 16 random hex digits.
pub fn generate() -> String {
    let seconds = Utc::now().timestamp().clamp(0, i64::from(u32::MAX)) as u32;
    let random: u64 = rand::thread_rng().r#gen();
    format!("{seconds:08x}{random:016x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_24_hex_chars_in_either_case() {
        assert!(is_valid_object_id("65a1b2c3d4e5f6a7b8c9d0e1"));
        assert!(is_valid_object_id("65A1B2C3D4E5F6A7B8C9D0E1"));
    }

    #[test]
    fn rejects_wrong_length_or_alphabet() {
        assert!(!is_valid_object_id(""));
        assert!(!is_valid_object_id("65a1b2c3d4e5f6a7b8c9d0e"));
        assert!(!is_valid_object_id("65a1b2c3d4e5f6a7b8c9d0e1f"));
        assert!(!is_valid_object_id("65a1b2c3d4e5f6a7b8c9d0zz"));
    }

    #[test]
    fn validation_messages_name_the_field() {
        let missing = validate_object_id("", "Employee ID").unwrap_err();
        assert_eq!(missing.to_string(), "Employee ID is required");

        let malformed = validate_object_id("not-an-id", "Employee ID").unwrap_err();
        assert!(malformed.to_string().starts_with("Invalid Employee ID format"));
    }

    #[test]
    fn validated_ids_are_lower_cased() {
        assert_eq!(
            validate_object_id("65A1B2C3D4E5F6A7B8C9D0E1", "Employee ID").unwrap(),
            "65a1b2c3d4e5f6a7b8c9d0e1"
        );
        assert_eq!(
            validate_object_id("65a1b2c3d4e5f6a7b8c9d0e1", "Employee ID").unwrap(),
            "65a1b2c3d4e5f6a7b8c9d0e1"
        );
    }

    #[test]
    fn generated_ids_are_valid_and_distinct() {
        let a = generate();
        let b = generate();
        assert!(is_valid_object_id(&a));
        assert!(is_valid_object_id(&b));
        assert_ne!(a, b);
    }
}
