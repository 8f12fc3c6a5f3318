use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use utoipa::ToSchema;

/// Capacity of the reference photo list.
pub const MAX_FACE_IMAGES: usize = 5;
pub const MIN_REGISTRATION_PHOTOS: usize = 3;
pub const DEFAULT_ROLE: &str = "Employee";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(
    example = json!({
        "id": "65a1b2c3d4e5f6a7b8c9d0aa",
        "name": "John Doe",
        "email": "john.doe@company.com",
        "role": "Employee",
        "faceImages": [],
        "createdAt": "2026-01-01T00:00:00Z",
        "updatedAt": "2026-01-01T00:00:00Z"
    })
)]
pub struct Employee {
    pub id: String,

    #[schema(example = "John Doe")]
    pub name: String,

    /// Unique, stored lowercase.
    #[schema(example = "john.doe@company.com")]
    pub email: String,

    #[schema(example = "Employee")]
    pub role: String,

    /// Ordered reference photo URLs, at most five.
    pub face_images: Vec<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Employee {
    pub fn has_reference_photos(&self) -> bool {
        !self.face_images.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct NewEmployee {
    pub name: String,
    pub email: String,
    pub role: String,
}

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\S+@\S+\.\S+$").expect("email pattern compiles"));

pub fn is_valid_email(email: &str) -> bool {
    EMAIL.is_match(email)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape() {
        assert!(is_valid_email("john@company.com"));
        assert!(is_valid_email("a@b.c"));
        assert!(is_valid_email("first.last@sub.domain.org"));

        assert!(!is_valid_email(""));
        assert!(!is_valid_email("john"));
        assert!(!is_valid_email("@company.com"));
        assert!(!is_valid_email("john@company"));
        assert!(!is_valid_email("john@.com"));
        assert!(!is_valid_email("john@company."));
        assert!(!is_valid_email("john doe@company.com"));
    }

    #[test]
    fn serializes_face_images_camel_case() {
        let employee = Employee {
            id: "65a1b2c3d4e5f6a7b8c9d0aa".into(),
            name: "John".into(),
            email: "john@company.com".into(),
            role: DEFAULT_ROLE.into(),
            face_images: vec!["memory://a".into()],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let json = serde_json::to_value(&employee).unwrap();
        assert_eq!(json["faceImages"][0], "memory://a");
        assert!(employee.has_reference_photos());
    }
}
