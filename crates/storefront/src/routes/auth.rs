//! Authentication route handlers.
//!
//! Signup and signin return the token in the body and also set it as an
//! `HttpOnly; SameSite=Strict` cookie so browser clients need not store it.
//! Changing the password leaves issued tokens untouched.

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use cookie::{Cookie, SameSite};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use veblyss_core::UserProfile;

use super::ApiJson;
use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::RequireAuth;
use crate::models::{UserDocument, keys};
use crate::state::AppState;

/// Signup form data.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Signin form data.
#[derive(Debug, Deserialize)]
pub struct SigninRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// `PUT /api/auth/change-password` body.
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(rename = "currentPassword", default)]
    pub current_password: String,
    #[serde(rename = "newPassword", default)]
    pub new_password: String,
}

/// Body returned by signup and signin.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub user: UserProfile,
    pub token: String,
}

/// Create an account and sign it in.
#[instrument(skip_all)]
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<SignupRequest>,
) -> Result<impl IntoResponse> {
    let user = state
        .auth()
        .signup(&form.name, &form.email, &form.password)
        .await?;
    let (cookie, body) = issue(&state, &user, None)?;

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(body),
    ))
}

/// Sign in with email and password.
#[instrument(skip_all)]
pub async fn signin(
    State(state): State<AppState>,
    ApiJson(form): ApiJson<SigninRequest>,
) -> Result<impl IntoResponse> {
    let user = state.auth().signin(&form.email, &form.password).await?;
    let (cookie, body) = issue(&state, &user, Some("Login successful"))?;

    Ok(([(header::SET_COOKIE, cookie)], Json(body)))
}

/// Clear the token cookie.
#[instrument(skip_all)]
pub async fn signout(State(state): State<AppState>) -> impl IntoResponse {
    let mut cookie = token_cookie(&state, String::new());
    cookie.make_removal();
    clear_sentry_user();

    (
        [(header::SET_COOKIE, cookie.to_string())],
        Json(json!({ "message": "Logout successful" })),
    )
}

/// Replace the signed-in user's password.
#[instrument(skip_all, fields(user_id = %user.id))]
pub async fn change_password(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    ApiJson(form): ApiJson<ChangePasswordRequest>,
) -> Result<impl IntoResponse> {
    state
        .auth()
        .change_password(user.id, &form.current_password, &form.new_password)
        .await?;

    Ok(Json(json!({ "message": "Password changed successfully" })))
}

fn issue(
    state: &AppState,
    user: &UserDocument,
    message: Option<&'static str>,
) -> Result<(String, AuthResponse)> {
    let token = state.tokens().issue(user.id)?;
    set_sentry_user(&user.id);

    let mut cookie = token_cookie(state, token.clone());
    cookie.set_max_age(cookie::time::Duration::seconds(
        state.tokens().ttl().num_seconds(),
    ));

    Ok((
        cookie.to_string(),
        AuthResponse {
            message,
            user: user.profile(),
            token,
        },
    ))
}

fn token_cookie(state: &AppState, value: String) -> Cookie<'static> {
    Cookie::build((keys::TOKEN_COOKIE, value))
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(state.config().client_url.starts_with("https://"))
        .path("/")
        .build()
}
