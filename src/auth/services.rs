use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::auth::jwt::JwtKeys;
use crate::auth::password::{self, PHANTOM_HASH};
use crate::error::AppError;
use crate::users::model::User;
use crate::users::store::UserStore;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Emails compare case-insensitively; the store only ever sees this form.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Create a user and sign them in. Expects a normalized email.
pub async fn register(
    store: &dyn UserStore,
    keys: &JwtKeys,
    email: &str,
    password: &str,
    name: &str,
) -> Result<(String, User), AppError> {
    if store
        .find_by_email(email)
        .await
        .map_err(AppError::internal)?
        .is_some()
    {
        warn!("email already registered");
        return Err(AppError::EmailAlreadyExists);
    }

    let hash = password::hash_password(password).map_err(AppError::internal)?;

    // The pre-check above is advisory; under a race the store's unique
    // index decides, and the loser surfaces here as a duplicate.
    let user = store.insert(email, &hash, name).await?;

    let token = keys.sign(user.id).map_err(AppError::internal)?;
    info!(user_id = %user.id, "user registered");
    Ok((token, user))
}

/// Verify credentials and sign the user in. Unknown email and wrong
/// password collapse into one error.
pub async fn login(
    store: &dyn UserStore,
    keys: &JwtKeys,
    email: &str,
    password: &str,
) -> Result<(String, User), AppError> {
    let user = store
        .find_by_email(email)
        .await
        .map_err(AppError::internal)?;

    let Some(user) = user else {
        // Unknown email still pays for a verification, keeping the two
        // failure paths comparable in timing.
        let _ = password::verify_password(password, PHANTOM_HASH);
        warn!("login with unknown email");
        return Err(AppError::InvalidCredentials);
    };

    let ok = password::verify_password(password, &user.password_hash)
        .map_err(AppError::internal)?;
    if !ok {
        warn!(user_id = %user.id, "login with invalid password");
        return Err(AppError::InvalidCredentials);
    }

    let token = keys.sign(user.id).map_err(AppError::internal)?;
    info!(user_id = %user.id, "user logged in");
    Ok((token, user))
}
