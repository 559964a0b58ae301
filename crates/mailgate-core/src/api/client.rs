//! Authenticated request gateway for the Aomail API.
//!
//! Every request goes out with the stored bearer token. A 401 triggers one
//! silent renewal through the refresh endpoint followed by one replay of the
//! original request; whatever the replay returns is final.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::request::RequestDescriptor;
use super::transport::{HttpTransport, RawResponse, Transport};
use super::{GatewayError, GatewayResult};
use crate::auth::{NavigationEvent, NavigationHandler, Session};
use crate::config::{ConfigError, GatewayConfig, RenewalPolicy};

// ============================================================================
// Constants
// ============================================================================

/// Refresh endpoint, relative to the API base URL
const REFRESH_PATH: &str = "token/refresh/";

/// Status that marks an expired or invalid credential
const STATUS_UNAUTHORIZED: u16 = 401;

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    #[serde(rename = "accessToken")]
    access_token: String,
}

/// Gateway between page-level callers and the remote API.
/// Clone is cheap - all state is shared behind `Arc`s.
#[derive(Clone)]
pub struct Gateway {
    transport: Arc<dyn Transport>,
    session: Session,
    navigator: Arc<dyn NavigationHandler>,
    api_base_url: String,
    renewal_policy: RenewalPolicy,
    redirect_when_unauthenticated: bool,
    renewal_lock: Arc<Mutex<()>>,
}

impl Gateway {
    /// Create a gateway that talks HTTP through `reqwest`
    pub fn new(
        config: &GatewayConfig,
        session: Session,
        navigator: Arc<dyn NavigationHandler>,
    ) -> Result<Self, ConfigError> {
        let transport = HttpTransport::new(config.request_timeout())?;
        Ok(Self::with_transport(config, session, navigator, Arc::new(transport)))
    }

    /// Create a gateway over any transport
    pub fn with_transport(
        config: &GatewayConfig,
        session: Session,
        navigator: Arc<dyn NavigationHandler>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            transport,
            session,
            navigator,
            api_base_url: config.api_base_url(),
            renewal_policy: config.renewal_policy,
            redirect_when_unauthenticated: config.redirect_when_unauthenticated,
            renewal_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    /// Absolute URL for a path under the API base
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.api_base_url, path.trim_start_matches('/'))
    }

    /// Send `request` with the stored credential attached.
    ///
    /// At most one renewal happens per call, and the retried request is
    /// never renewed again.
    pub async fn send(&self, request: RequestDescriptor) -> GatewayResult {
        let Some(token) = self.session.credential() else {
            debug!(url = request.url(), "No stored credential, not sending request");
            if self.redirect_when_unauthenticated {
                self.navigator.navigate(NavigationEvent::LoginRequired);
            }
            return Err(GatewayError::Unauthenticated);
        };

        let response = self.execute(&request, &token).await?;
        if response.status != STATUS_UNAUTHORIZED {
            return Self::classify(response);
        }

        debug!(url = request.url(), "Access token rejected, attempting renewal");
        let Some(renewed) = self.renew(&token).await else {
            self.navigator.navigate(NavigationEvent::NotAuthorized);
            return Err(GatewayError::Unauthorized);
        };

        let retried = self.execute(&request, &renewed).await?;
        Self::classify(retried)
    }

    async fn execute(&self, request: &RequestDescriptor, token: &str) -> GatewayResult<RawResponse> {
        self.transport
            .execute(&request.with_bearer(token))
            .await
            .map_err(|e| {
                warn!(method = %request.method(), url = request.url(), error = %e, "Request failed");
                GatewayError::TransportError(e.0)
            })
    }

    fn classify(response: RawResponse) -> GatewayResult {
        if !response.is_success() {
            return Err(GatewayError::from_status(response.status, &response.body));
        }
        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&response.body)
            .map_err(|e| GatewayError::InvalidResponse(format!("Failed to parse JSON response: {}", e)))
    }

    /// Obtain a fresh credential, or `None` if renewal failed.
    async fn renew(&self, expired: &str) -> Option<String> {
        match self.renewal_policy {
            RenewalPolicy::Independent => self.request_renewal(expired).await,
            RenewalPolicy::Serialized => {
                let _guard = self.renewal_lock.lock().await;
                // Another request may have renewed while we waited
                if let Some(current) = self.session.credential() {
                    if current != expired {
                        debug!("Reusing credential renewed by a concurrent request");
                        return Some(current);
                    }
                }
                self.request_renewal(expired).await
            }
        }
    }

    async fn request_renewal(&self, expired: &str) -> Option<String> {
        let request = RequestDescriptor::post(self.endpoint(REFRESH_PATH))
            .json(json!({ "accessToken": expired }));

        let response = match self.transport.execute(&request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Token renewal request failed");
                return None;
            }
        };

        if !response.is_success() {
            warn!(status = response.status, "Token renewal rejected");
            return None;
        }

        let refreshed: RefreshResponse = match serde_json::from_str(&response.body) {
            Ok(refreshed) => refreshed,
            Err(e) => {
                warn!(error = %e, "Failed to parse token renewal response");
                return None;
            }
        };

        if let Err(e) = self.session.record_renewal(&refreshed.access_token) {
            warn!(error = %e, "Failed to persist renewed credential");
        }
        info!("Access token renewed");
        Some(refreshed.access_token)
    }
}
