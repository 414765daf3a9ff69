use axum::{extract::State, routing::get, Json, Router};
use tracing::instrument;

use crate::{
    auth::{dto::PublicUser, extractors::CurrentUser},
    error::AppError,
    profile::{dto::UpdateProfileRequest, services},
    state::AppState,
};

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/me", get(get_me).patch(update_me))
}

#[instrument(skip(user))]
pub async fn get_me(CurrentUser(user): CurrentUser) -> Json<PublicUser> {
    Json(services::get_profile(&user))
}

#[instrument(skip(state, user, payload))]
pub async fn update_me(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<PublicUser>, AppError> {
    let patch = payload.into_patch()?;
    let updated = services::update_profile(state.store.as_ref(), &user, patch).await?;
    Ok(Json(PublicUser::from(&updated)))
}
