use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, RegisterRequest},
        jwt::JwtKeys,
        services,
    },
    error::AppError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    payload.email = services::normalize_email(&payload.email);
    payload.validate()?;

    let keys = JwtKeys::from_ref(&state);
    let (token, user) = services::register(
        state.store.as_ref(),
        &keys,
        &payload.email,
        &payload.password,
        &payload.name,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(AuthResponse::new(token, &user))))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    payload.email = services::normalize_email(&payload.email);
    payload.validate()?;

    let keys = JwtKeys::from_ref(&state);
    let (token, user) = services::login(
        state.store.as_ref(),
        &keys,
        &payload.email,
        &payload.password,
    )
    .await?;

    Ok(Json(AuthResponse::new(token, &user)))
}
