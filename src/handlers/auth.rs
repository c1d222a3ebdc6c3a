use axum::{extract::State, Json};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::json;
use uuid::Uuid;

use crate::{
    config::Config,
    error::AppError,
    middleware::auth::Claims,
    models::{AuthResponse, LoginRequest, RegisterRequest, User},
    state::AppState,
};

pub async fn register_form() -> Json<serde_json::Value> {
    Json(json!({ "fields": ["username", "password", "confirmation"] }))
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    if req.username.trim().is_empty() {
        return Err(AppError::Validation("must provide username".into()));
    }
    if req.password.is_empty() {
        return Err(AppError::Validation("must provide password".into()));
    }
    if req.password != req.confirmation {
        return Err(AppError::Validation("passwords don't match".into()));
    }

    let password_hash =
        hash(&req.password, DEFAULT_COST).map_err(|e| AppError::Internal(e.to_string()))?;

    // starting cash comes from the column default
    let user_id: Uuid = sqlx::query_scalar(
        "INSERT INTO users (username, password_hash) VALUES ($1, $2) RETURNING id",
    )
    .bind(&req.username)
    .bind(&password_hash)
    .fetch_one(&state.pool)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.constraint().is_some() {
                return AppError::UsernameTaken;
            }
        }
        AppError::Database(e)
    })?;

    log::info!("registered user {}", req.username);

    let token = create_jwt(user_id, &req.username, &state.config)?;

    Ok(Json(AuthResponse {
        token,
        user_id,
        username: req.username,
    }))
}

pub async fn login_form() -> Json<serde_json::Value> {
    Json(json!({ "fields": ["username", "password"] }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AppError> {
    if req.username.is_empty() || req.password.is_empty() {
        return Err(AppError::InvalidCredentials);
    }

    let user: User = sqlx::query_as(
        "SELECT id, username, password_hash, cash, created_at FROM users WHERE username = $1",
    )
    .bind(&req.username)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::InvalidCredentials)?;

    if !verify(&req.password, &user.password_hash).map_err(|e| AppError::Internal(e.to_string()))? {
        return Err(AppError::InvalidCredentials);
    }

    let token = create_jwt(user.id, &user.username, &state.config)?;

    Ok(Json(AuthResponse {
        token,
        user_id: user.id,
        username: user.username,
    }))
}

/// Session identity lives in the signed token, so there is nothing to
/// destroy server-side; the client drops its copy.
pub async fn logout() -> Json<serde_json::Value> {
    Json(json!({ "ok": true }))
}

fn create_jwt(user_id: Uuid, username: &str, config: &Config) -> Result<String, AppError> {
    let exp = (Utc::now() + Duration::hours(config.jwt_expiry_hours)).timestamp();
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(e.to_string()))
}
