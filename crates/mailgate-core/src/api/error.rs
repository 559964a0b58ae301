use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Classified outcome of a failed gateway call.
///
/// Classification relies on status codes and structured body fields only,
/// never on the text of the server's message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Not logged in")]
    Unauthenticated,

    #[error("Network error: {0}")]
    TransportError(String),

    #[error("Unauthorized - session could not be renewed")]
    Unauthorized,

    #[error("Not available on the current plan (allowed: {})", .0.join(", "))]
    PlanRestricted(Vec<String>),

    #[error("Subscription is not active")]
    SubscriptionInactive,

    #[error("Request failed with status {status}: {message}")]
    RequestFailed { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Result of a gateway call, carrying the decoded JSON body on success.
pub type GatewayResult<T = Value> = Result<T, GatewayError>;

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl GatewayError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            return body.to_string();
        }
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
    }

    /// Classify a non-success response from its status and body.
    pub fn from_status(status: u16, body: &str) -> Self {
        let parsed: Option<Value> = serde_json::from_str(body).ok();
        let field = |name: &str| parsed.as_ref().and_then(|v| v.get(name));

        if status == 403 {
            return match field("allowedPlans").and_then(Value::as_array) {
                Some(plans) => GatewayError::PlanRestricted(
                    plans
                        .iter()
                        .filter_map(|p| p.as_str().map(str::to_owned))
                        .collect(),
                ),
                None => GatewayError::SubscriptionInactive,
            };
        }

        let message = field("error")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .or_else(|| {
                let trimmed = body.trim();
                (!trimmed.is_empty()).then(|| Self::truncate_body(trimmed))
            })
            .unwrap_or_else(|| {
                StatusCode::from_u16(status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or("Unknown status")
                    .to_string()
            });

        GatewayError::RequestFailed { status, message }
    }

    /// True for the two outcomes that mean the user has to sign in again.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, GatewayError::Unauthenticated | GatewayError::Unauthorized)
    }

    /// HTTP status behind this error, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::RequestFailed { status, .. } => Some(*status),
            GatewayError::PlanRestricted(_) | GatewayError::SubscriptionInactive => Some(403),
            GatewayError::Unauthorized => Some(401),
            _ => None,
        }
    }
}
