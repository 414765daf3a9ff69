use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;

use crate::auth::jwt::JwtKeys;
use crate::error::AppError;
use crate::state::AppState;
use crate::users::model::User;
use crate::users::store::UserStore;

/// Authenticated user for protected routes, resolved from the bearer token.
pub struct CurrentUser(pub User);

/// Header-to-user resolution, separated from the extractor so it can be
/// exercised without HTTP plumbing. Every failure is the same
/// `Unauthorized`.
pub(crate) async fn authenticate(
    store: &dyn UserStore,
    keys: &JwtKeys,
    auth_header: Option<&str>,
) -> Result<User, AppError> {
    let header = auth_header.ok_or(AppError::Unauthorized)?;
    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .ok_or(AppError::Unauthorized)?;

    let user_id = keys.verify(token).map_err(|e| {
        warn!(error = %e, "token rejected");
        AppError::Unauthorized
    })?;

    // Token subjects are trusted only as far as the store confirms them.
    store
        .find_by_id(user_id)
        .await
        .map_err(AppError::internal)?
        .ok_or(AppError::Unauthorized)
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let auth_header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        let user = authenticate(state.store.as_ref(), &keys, auth_header).await?;
        Ok(CurrentUser(user))
    }
}
