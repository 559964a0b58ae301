//! Core library for mailgate.
//!
//! Provides the authenticated request gateway for the Aomail API together
//! with the session context, credential stores and preference loading it
//! relies on.

pub mod api;
pub mod auth;
pub mod config;
pub mod preferences;

pub use api::{Gateway, GatewayError, GatewayResult, RequestDescriptor};
pub use auth::{CredentialStore, NavigationEvent, NavigationHandler, Session};
pub use config::{GatewayConfig, RenewalPolicy};
