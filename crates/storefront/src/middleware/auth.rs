//! Authentication extractors.
//!
//! The auth token is read from `Authorization: Bearer <token>` first, then
//! from the `token` cookie. Either way it must verify against the server's
//! signing key; nothing else on the request is trusted as identity.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use cookie::Cookie;

use crate::error::{AppError, set_sentry_user};
use crate::models::{CurrentUser, keys};
use crate::state::AppState;

/// Extractor that requires an authenticated user.
///
/// Rejects with `401 {"error":"Unauthenticated"}` before the handler runs, so
/// no state is touched for anonymous requests.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, user {}!", user.id)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

impl<S> FromRequestParts<S> for RequireAuth
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let token = token_from_headers(&parts.headers).ok_or(AppError::Unauthenticated)?;

        let id = state.tokens().verify(&token).map_err(|e| {
            tracing::debug!(error = %e, "rejected auth token");
            AppError::Unauthenticated
        })?;

        set_sentry_user(&id);
        Ok(Self(CurrentUser { id }))
    }
}

/// Find the raw auth token on a request.
#[must_use]
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    bearer_token(headers).or_else(|| cookie_token(headers))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix(keys::BEARER_PREFIX))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == keys::TOKEN_COOKIE && !cookie.value().is_empty())
        .map(|cookie| cookie.value().to_owned())
}
