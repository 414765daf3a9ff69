use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::services::is_valid_email;
use crate::error::AppError;
use crate::users::model::User;

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response returned after register or login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub user: PublicUser,
}

impl AuthResponse {
    pub fn new(access_token: String, user: &User) -> Self {
        Self {
            access_token,
            token_type: "bearer",
            user: PublicUser::from(user),
        }
    }
}

/// Public part of the user returned to the client. There is no hash field
/// here, so the stored credential cannot leak through serialization.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub bio: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            bio: user.bio.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if !is_valid_email(&self.email) {
            return Err(AppError::Validation("Invalid email".into()));
        }
        let password_len = self.password.chars().count();
        if !(6..=64).contains(&password_len) {
            return Err(AppError::Validation(
                "Password must be 6-64 characters".into(),
            ));
        }
        let name_len = self.name.chars().count();
        if !(2..=120).contains(&name_len) {
            return Err(AppError::Validation("Name must be 2-120 characters".into()));
        }
        Ok(())
    }
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if !is_valid_email(&self.email) {
            return Err(AppError::Validation("Invalid email".into()));
        }
        Ok(())
    }
}
