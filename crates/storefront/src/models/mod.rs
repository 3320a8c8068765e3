//! Domain models for storefront.

pub mod session;
pub mod user;

pub use session::{CurrentUser, keys};
pub use user::{NewUser, UserDocument};
