//! User preference loading (language, theme, timezone).
//!
//! Values are fetched through the gateway and cached in the session's
//! credential store, so later lookups skip the network. A cached value is
//! only trusted while it is still in the allowed set for its preference.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::api::{Gateway, GatewayError};
use crate::auth::CredentialError;

pub const ALLOWED_LANGUAGES: &[&str] = &[
    "french", "american", "german", "russian", "spanish", "chinese", "indian",
];

pub const ALLOWED_THEMES: &[&str] = &["light", "dark"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum PreferenceKind {
    Language,
    Theme,
    Timezone,
}

impl PreferenceKind {
    pub const ALL: [PreferenceKind; 3] = [
        PreferenceKind::Language,
        PreferenceKind::Theme,
        PreferenceKind::Timezone,
    ];

    /// JSON field and storage slot name
    pub fn field(self) -> &'static str {
        match self {
            PreferenceKind::Language => "language",
            PreferenceKind::Theme => "theme",
            PreferenceKind::Timezone => "timezone",
        }
    }

    /// `None` means any non-empty value is accepted
    pub fn allowed_values(self) -> Option<&'static [&'static str]> {
        match self {
            PreferenceKind::Language => Some(ALLOWED_LANGUAGES),
            PreferenceKind::Theme => Some(ALLOWED_THEMES),
            PreferenceKind::Timezone => None,
        }
    }

    pub fn accepts(self, value: &str) -> bool {
        if value.is_empty() {
            return false;
        }
        self.allowed_values()
            .map_or(true, |allowed| allowed.contains(&value))
    }

    pub fn default_value(self) -> &'static str {
        match self {
            PreferenceKind::Language => "american",
            PreferenceKind::Theme => "light",
            PreferenceKind::Timezone => "UTC",
        }
    }

    fn get_path(self) -> String {
        format!("user/preferences/{}/", self.field())
    }

    fn set_path(self) -> String {
        format!("user/preferences/set_{}/", self.field())
    }
}

impl fmt::Display for PreferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Preferences {
    pub language: Option<String>,
    pub theme: Option<String>,
    pub timezone: Option<String>,
}

impl Preferences {
    pub fn get(&self, kind: PreferenceKind) -> Option<&str> {
        match kind {
            PreferenceKind::Language => self.language.as_deref(),
            PreferenceKind::Theme => self.theme.as_deref(),
            PreferenceKind::Timezone => self.timezone.as_deref(),
        }
    }

    /// Fill every missing value with its default
    pub fn with_defaults(self) -> Self {
        let pick = |value: Option<String>, kind: PreferenceKind| {
            value.or_else(|| Some(kind.default_value().to_string()))
        };
        Self {
            language: pick(self.language, PreferenceKind::Language),
            theme: pick(self.theme, PreferenceKind::Theme),
            timezone: pick(self.timezone, PreferenceKind::Timezone),
        }
    }
}

#[derive(Error, Debug)]
pub enum PreferenceError {
    #[error("{value:?} is not an allowed {kind}")]
    NotAllowed { kind: PreferenceKind, value: String },

    #[error("Failed to cache preference: {0}")]
    Store(#[from] CredentialError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

/// Cached value if valid, otherwise fetched from the API and cached.
/// Any failure along the way yields `None`.
pub async fn load_preference(gateway: &Gateway, kind: PreferenceKind) -> Option<String> {
    let session = gateway.session();
    if let Some(cached) = session.cached_preference(kind) {
        return Some(cached);
    }

    let data = match gateway.get_data(&kind.get_path()).await {
        Ok(data) => data,
        Err(e) => {
            debug!(preference = kind.field(), error = %e, "Failed to fetch preference");
            return None;
        }
    };

    if data.get("error").is_some_and(|e| !e.is_null()) {
        debug!(preference = kind.field(), "Preference endpoint returned an error");
        return None;
    }

    let value = data.get(kind.field()).and_then(Value::as_str)?;
    if !kind.accepts(value) {
        debug!(preference = kind.field(), value, "Ignoring disallowed preference value");
        return None;
    }

    if let Err(e) = session.cache_preference(kind, value) {
        debug!(preference = kind.field(), error = %e, "Failed to cache preference");
    }
    Some(value.to_string())
}

/// Load all preferences in turn, falling back to defaults for missing ones.
pub async fn initialize_preferences(gateway: &Gateway) -> Preferences {
    let mut preferences = Preferences::default();
    for kind in PreferenceKind::ALL {
        let value = load_preference(gateway, kind).await;
        match kind {
            PreferenceKind::Language => preferences.language = value,
            PreferenceKind::Theme => preferences.theme = value,
            PreferenceKind::Timezone => preferences.timezone = value,
        }
    }
    preferences.with_defaults()
}

/// Validate locally, send to the API, then cache.
pub async fn save_preference(
    gateway: &Gateway,
    kind: PreferenceKind,
    value: &str,
) -> Result<(), PreferenceError> {
    if !kind.accepts(value) {
        return Err(PreferenceError::NotAllowed {
            kind,
            value: value.to_string(),
        });
    }

    let mut body = Map::new();
    body.insert(kind.field().to_string(), Value::String(value.to_string()));
    gateway.post_data(&kind.set_path(), Value::Object(body)).await?;
    gateway.session().cache_preference(kind, value)
}
