//! JSON convenience wrappers around [`Gateway::send`].
//!
//! Paths are relative to the configured API base URL.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::request::{RequestDescriptor, CONTENT_TYPE};
use super::{Gateway, GatewayResult};

/// Authentication probe endpoint
const IS_AUTHENTICATED_PATH: &str = "is_authenticated/";

const JSON_CONTENT_TYPE: &str = "application/json";

/// Outcome of the authentication probe
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct AuthStatus {
    #[serde(rename = "isAuthenticated", default)]
    pub authenticated: bool,
    #[serde(rename = "isActive", default)]
    pub subscription_active: bool,
}

impl Gateway {
    pub async fn get_data(&self, path: &str) -> GatewayResult {
        self.send(self.json_request(RequestDescriptor::get(self.endpoint(path))))
            .await
    }

    pub async fn post_data(&self, path: &str, body: Value) -> GatewayResult {
        self.send(self.json_request(RequestDescriptor::post(self.endpoint(path))).json(body))
            .await
    }

    pub async fn put_data(&self, path: &str, body: Value) -> GatewayResult {
        self.send(self.json_request(RequestDescriptor::put(self.endpoint(path))).json(body))
            .await
    }

    pub async fn delete_data(&self, path: &str) -> GatewayResult {
        self.send(self.json_request(RequestDescriptor::delete(self.endpoint(path))))
            .await
    }

    /// Ask the API whether the stored credential is still good.
    /// Any failure counts as not authenticated.
    pub async fn is_authenticated(&self) -> AuthStatus {
        match self.get_data(IS_AUTHENTICATED_PATH).await {
            Ok(data) => serde_json::from_value(data).unwrap_or_default(),
            Err(e) => {
                debug!(error = %e, "Authentication check failed");
                AuthStatus::default()
            }
        }
    }

    fn json_request(&self, request: RequestDescriptor) -> RequestDescriptor {
        request.header(CONTENT_TYPE, JSON_CONTENT_TYPE)
    }
}
