//! Veblyss client library.
//!
//! Owns the session's view of the signed-in user and keeps the cart
//! optimistic while requests are in flight.
//!
//! - [`store`] - `ClientStore`: cached profile, pending mutations, notices
//! - [`controller`] - `CartController`: optimistic cart operations with rollback
//! - [`api`] - `StorefrontApi` trait and the `reqwest`-backed `HttpApi`
//! - [`config`] - `ClientConfig` from environment variables

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod controller;
pub mod store;

pub use api::{ApiError, HttpApi, StorefrontApi};
pub use config::ClientConfig;
pub use controller::{CartController, ControllerError};
pub use store::{ClientStore, Notice, PendingMutation, Ticket};
