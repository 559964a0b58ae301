//! Authentication module for session state and credential storage.
//!
//! This module provides:
//! - `Session`: Explicit session context (access token, cached preferences)
//! - `CredentialStore`: Persistent slots via keychain, JSON file or memory
//! - `NavigationHandler`: Callback notified when the user must sign in again

pub mod credentials;
pub mod navigation;
pub mod session;

pub use credentials::{CredentialError, CredentialStore, FileStore, KeyringStore, MemoryStore};
pub use navigation::{LogNavigator, NavigationEvent, NavigationHandler, NoopNavigator};
pub use session::{Session, DEFAULT_CREDENTIAL_KEY};
