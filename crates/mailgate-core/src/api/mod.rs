//! Authenticated access to the Aomail REST API.
//!
//! `Gateway` attaches the stored bearer token to every request, renews it
//! once through `token/refresh/` when the API answers 401, and turns every
//! outcome into a `GatewayResult`.

pub mod client;
pub mod error;
pub mod fetch;
pub mod request;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use client::Gateway;
pub use error::{GatewayError, GatewayResult};
pub use fetch::AuthStatus;
pub use request::{FormPart, MultipartForm, RequestBody, RequestDescriptor};
pub use transport::{HttpTransport, RawResponse, Transport, TransportFailure};
