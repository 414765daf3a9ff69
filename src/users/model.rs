use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::AppError;

/// User record in the database. Not serializable on purpose: clients only
/// ever see `PublicUser`, which has no hash field.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub bio: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Partial profile update. The outer `Option` on `bio` distinguishes
/// "absent" from "explicitly cleared" (`Some(None)`).
#[derive(Debug, Clone, Default)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub bio: Option<Option<String>>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.bio.is_none()
    }

    /// Length checks for the mutable fields. Runs before any store write, so
    /// a patch applies fully or not at all.
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(name) = &self.name {
            let len = name.chars().count();
            if !(2..=120).contains(&len) {
                return Err(AppError::Validation(
                    "Name must be 2-120 characters".into(),
                ));
            }
        }
        if let Some(Some(bio)) = &self.bio {
            if bio.chars().count() > 500 {
                return Err(AppError::Validation(
                    "Bio must be at most 500 characters".into(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_patch_is_empty() {
        assert!(ProfilePatch::default().is_empty());
        let patch = ProfilePatch {
            bio: Some(None),
            ..Default::default()
        };
        assert!(!patch.is_empty());
    }

    #[test]
    fn validate_rejects_short_name() {
        let patch = ProfilePatch {
            name: Some("A".into()),
            ..Default::default()
        };
        assert!(matches!(patch.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn validate_rejects_long_bio() {
        let patch = ProfilePatch {
            bio: Some(Some("x".repeat(501))),
            ..Default::default()
        };
        assert!(matches!(patch.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn validate_accepts_boundary_lengths() {
        let patch = ProfilePatch {
            name: Some("ab".into()),
            bio: Some(Some("x".repeat(500))),
        };
        assert!(patch.validate().is_ok());

        let cleared = ProfilePatch {
            name: Some("x".repeat(120)),
            bio: Some(None),
        };
        assert!(cleared.validate().is_ok());
    }
}
