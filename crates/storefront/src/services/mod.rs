//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - Signup and signin with Argon2 password hashes
//! - `token` - JWT issuing and verification
//! - `update` - Version compare-and-swap loop shared by all writes
//! - `cart` - Per-product cart mutations
//! - `profile` - Profile reads and whole-field replacements

pub mod auth;
pub mod cart;
pub mod profile;
pub mod token;
pub mod update;

pub use auth::{AuthError, AuthService};
pub use cart::CartService;
pub use profile::ProfileService;
pub use token::{TokenError, TokenService};
pub use update::{UpdateError, update_user};
