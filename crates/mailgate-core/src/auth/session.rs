use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use tracing::warn;

use super::credentials::{CredentialError, CredentialStore};
use crate::preferences::{PreferenceError, PreferenceKind, Preferences};

/// Default slot holding the access token
pub const DEFAULT_CREDENTIAL_KEY: &str = "accessToken";

/// Explicit session context shared by the gateway and its callers.
///
/// Owns no token itself: every read goes to the credential store, so a
/// renewal written by one clone is seen by all others.
#[derive(Clone)]
pub struct Session {
    store: Arc<dyn CredentialStore>,
    credential_key: String,
    last_renewal: Arc<RwLock<Option<DateTime<Utc>>>>,
}

impl Session {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self::with_key(store, DEFAULT_CREDENTIAL_KEY)
    }

    pub fn with_key(store: Arc<dyn CredentialStore>, credential_key: impl Into<String>) -> Self {
        Self {
            store,
            credential_key: credential_key.into(),
            last_renewal: Arc::new(RwLock::new(None)),
        }
    }

    pub fn credential_key(&self) -> &str {
        &self.credential_key
    }

    /// Current access token. Store errors and empty values count as absent.
    pub fn credential(&self) -> Option<String> {
        match self.store.load(&self.credential_key) {
            Ok(token) => token.filter(|t| !t.is_empty()),
            Err(e) => {
                warn!(error = %e, "Failed to read stored credential");
                None
            }
        }
    }

    pub fn has_credential(&self) -> bool {
        self.credential().is_some()
    }

    pub fn set_credential(&self, token: &str) -> Result<(), CredentialError> {
        self.store.store(&self.credential_key, token)
    }

    /// Persist a renewed token and remember when it happened
    pub(crate) fn record_renewal(&self, token: &str) -> Result<(), CredentialError> {
        self.set_credential(token)?;
        *self.last_renewal.write().unwrap_or_else(PoisonError::into_inner) = Some(Utc::now());
        Ok(())
    }

    pub fn last_renewal(&self) -> Option<DateTime<Utc>> {
        *self.last_renewal.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Forget the access token and every cached preference
    pub fn clear(&self) -> Result<(), CredentialError> {
        self.store.delete(&self.credential_key)?;
        for kind in PreferenceKind::ALL {
            self.store.delete(kind.field())?;
        }
        *self.last_renewal.write().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }

    /// Cached preference, ignored unless it is still an allowed value
    pub fn cached_preference(&self, kind: PreferenceKind) -> Option<String> {
        match self.store.load(kind.field()) {
            Ok(value) => value.filter(|v| kind.accepts(v)),
            Err(e) => {
                warn!(error = %e, preference = kind.field(), "Failed to read cached preference");
                None
            }
        }
    }

    pub fn cache_preference(&self, kind: PreferenceKind, value: &str) -> Result<(), PreferenceError> {
        if !kind.accepts(value) {
            return Err(PreferenceError::NotAllowed {
                kind,
                value: value.to_string(),
            });
        }
        self.store.store(kind.field(), value)?;
        Ok(())
    }

    /// Snapshot of the cached preferences, without defaults applied
    pub fn preferences(&self) -> Preferences {
        Preferences {
            language: self.cached_preference(PreferenceKind::Language),
            theme: self.cached_preference(PreferenceKind::Theme),
            timezone: self.cached_preference(PreferenceKind::Timezone),
        }
    }
}
