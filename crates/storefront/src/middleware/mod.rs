//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. CORS (credentialed requests from the client origin)
//!
//! Authentication is an extractor ([`RequireAuth`]) rather than a layer so
//! public routes (signup, signin, health) need no opt-out.

pub mod auth;
pub mod request_id;

pub use auth::{RequireAuth, token_from_headers};
pub use request_id::request_id_middleware;
