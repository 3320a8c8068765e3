//! Core types for Veblyss.
//!
//! Type-safe wrappers for identities, money, and the user-owned collections
//! (cart, wishlist, addresses) together with their raw-shape normalizers.

pub mod address;
pub mod cart;
pub mod email;
pub mod id;
pub mod price;
pub mod profile;
pub mod wishlist;

pub use address::{Address, AddressBook};
pub use cart::{Cart, CartEntry, QuantityPatch, RawCart, parse_quantity};
pub use email::{Email, EmailError};
pub use id::*;
pub use price::{CurrencyCode, Price, parse_amount};
pub use profile::UserProfile;
pub use wishlist::Wishlist;
