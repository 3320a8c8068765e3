//! Veblyss Core - Shared types library.
//!
//! This crate provides the types shared by every Veblyss component:
//! - `storefront` - Cart and profile HTTP gateway
//! - `client` - Session cart store and optimistic mutation controller
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. The cart normalizer lives here so the server and
//! the client agree on one canonical cart shape.
//!
//! # Modules
//!
//! - [`types`] - IDs, emails, prices, carts, wishlists, addresses, profiles

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
