//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                    - Liveness check
//! GET    /health/ready              - Readiness check (user store reachable)
//!
//! # Cart (requires auth)
//! POST   /api/cart                  - Add or overwrite an entry
//! PATCH  /api/cart                  - Set an entry's quantity (<= 0 removes)
//! DELETE /api/cart/{productId}      - Remove an entry (idempotent)
//!
//! # User (requires auth)
//! GET    /api/user/current          - Full profile
//! PATCH  /api/user/update-profile   - Change name/email (alias: /api/user/update)
//! PATCH  /api/user/update-address   - Replace addresses (PUT accepted)
//! PATCH  /api/user/update-wishlist  - Replace wishlist (PUT accepted)
//! PATCH  /api/user/update-cart      - Replace cart (PUT accepted)
//!
//! # Auth
//! POST   /api/auth/signup           - Create account, set token cookie
//! POST   /api/auth/signin           - Sign in, set token cookie
//! POST   /api/auth/signout          - Clear token cookie
//! PUT    /api/auth/change-password  - Replace password (requires auth)
//! ```

pub mod auth;
pub mod cart;
pub mod health;
pub mod user;

use axum::{
    Router,
    extract::FromRequest,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, patch, post, put},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::middleware::request_id_middleware;
use crate::state::AppState;

/// JSON body extractor whose rejections use the API error format.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(cart::add).patch(cart::update_quantity))
        .route("/{product_id}", delete(cart::remove))
}

/// Create the user routes router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/current", get(user::current))
        .route("/update-profile", patch(user::update_profile))
        .route("/update", patch(user::update_profile))
        .route(
            "/update-address",
            patch(user::update_address).put(user::update_address),
        )
        .route(
            "/update-wishlist",
            patch(user::update_wishlist).put(user::update_wishlist),
        )
        .route(
            "/update-cart",
            patch(user::update_cart).put(user::update_cart),
        )
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(auth::signup))
        .route("/signin", post(auth::signin))
        .route("/signout", post(auth::signout))
        .route("/change-password", put(auth::change_password))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api/cart", cart_routes())
        .nest("/api/user", user_routes())
        .nest("/api/auth", auth_routes())
        .fallback(not_found)
}

/// Build the complete application: routes, middleware and state.
///
/// Used by the binary and by integration tests, so both exercise the same
/// layer stack.
pub fn app(state: AppState) -> Router {
    let cors = cors_layer(&state.config().client_url);

    routes()
        .with_state(state)
        .layer(middleware::from_fn(request_id_middleware))
        .layer(TraceLayer::new_for_http().make_span_with(|request: &axum::extract::Request| {
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = tracing::field::Empty,
            )
        }))
        .layer(cors)
        // Sentry layers (outermost for full request coverage)
        .layer(sentry_tower::NewSentryLayer::new_from_top())
        .layer(sentry_tower::SentryHttpLayer::new().enable_transaction())
}

/// Credentialed CORS for the configured client origin.
fn cors_layer(client_url: &str) -> CorsLayer {
    let origin = HeaderValue::from_str(client_url.trim_end_matches('/')).map_or_else(
        |_| {
            tracing::warn!(client_url, "invalid client origin, cross-origin requests disabled");
            AllowOrigin::list(std::iter::empty::<HeaderValue>())
        },
        AllowOrigin::exact,
    );

    CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

async fn not_found() -> AppError {
    AppError::NotFound("route".to_owned())
}
