use tracing::info;

use crate::auth::dto::PublicUser;
use crate::error::AppError;
use crate::users::model::{ProfilePatch, User};
use crate::users::store::UserStore;

/// Pure projection of the caller's own record.
pub fn get_profile(user: &User) -> PublicUser {
    PublicUser::from(user)
}

/// Apply a partial update to the caller's own profile. Validation runs
/// before any store write; an empty patch returns the record as-is, leaving
/// `updated_at` untouched.
pub async fn update_profile(
    store: &dyn UserStore,
    user: &User,
    patch: ProfilePatch,
) -> Result<User, AppError> {
    patch.validate()?;

    if patch.is_empty() {
        return Ok(user.clone());
    }

    let updated = store.apply_profile_patch(user.id, &patch).await?;
    info!(user_id = %user.id, "profile updated");
    Ok(updated)
}
