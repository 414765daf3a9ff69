use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};

use crate::error::AppError;
use crate::users::model::ProfilePatch;

/// Fields that exist on the user record but must never change through this
/// path.
const PROTECTED_FIELDS: &[&str] = &[
    "id",
    "email",
    "password",
    "password_hash",
    "created_at",
    "updated_at",
];

/// Wire body for PATCH /me. Only `name` and `bio` are recognized; anything
/// else lands in `rest` so the boundary can tell a protected-field attempt
/// from harmless junk.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub bio: Option<Option<String>>,
    #[serde(flatten)]
    rest: BTreeMap<String, serde_json::Value>,
}

/// Keeps `"bio": null` (explicit clear) distinct from an absent `bio`.
fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

impl UpdateProfileRequest {
    /// Reject protected-field attempts and hand back a patch that
    /// structurally cannot name anything but the two mutable fields.
    pub fn into_patch(self) -> Result<ProfilePatch, AppError> {
        if self
            .rest
            .keys()
            .any(|k| PROTECTED_FIELDS.contains(&k.as_str()))
        {
            return Err(AppError::ForbiddenFieldMutation);
        }
        Ok(ProfilePatch {
            name: self.name,
            bio: self.bio,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: serde_json::Value) -> UpdateProfileRequest {
        serde_json::from_value(body).expect("deserialize")
    }

    #[test]
    fn empty_body_is_an_empty_patch() {
        let patch = parse(serde_json::json!({})).into_patch().expect("patch");
        assert!(patch.is_empty());
    }

    #[test]
    fn absent_and_null_bio_are_distinct() {
        let absent = parse(serde_json::json!({ "name": "Alice" }));
        assert_eq!(absent.bio, None);

        let cleared = parse(serde_json::json!({ "bio": null }));
        assert_eq!(cleared.bio, Some(None));

        let set = parse(serde_json::json!({ "bio": "hello" }));
        assert_eq!(set.bio, Some(Some("hello".into())));
    }

    #[test]
    fn protected_fields_are_rejected() {
        for field in ["id", "email", "password", "password_hash", "created_at", "updated_at"] {
            let body = serde_json::json!({ "name": "Alice", field: "tampered" });
            let err = parse(body).into_patch().unwrap_err();
            assert!(matches!(err, AppError::ForbiddenFieldMutation), "{field}");
        }
    }

    #[test]
    fn unrecognized_junk_is_ignored() {
        let body = serde_json::json!({ "name": "Alice", "favorite_color": "red" });
        let patch = parse(body).into_patch().expect("patch");
        assert_eq!(patch.name.as_deref(), Some("Alice"));
    }
}
