use tracing::warn;

/// Where the user should be sent after an authentication failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationEvent {
    /// Credential expired and could not be renewed
    NotAuthorized,
    /// No credential stored at all
    LoginRequired,
}

/// Receiver of navigation requests, supplied when the gateway is built.
/// Notifications are fire-and-forget.
pub trait NavigationHandler: Send + Sync {
    fn navigate(&self, event: NavigationEvent);
}

impl<F> NavigationHandler for F
where
    F: Fn(NavigationEvent) + Send + Sync,
{
    fn navigate(&self, event: NavigationEvent) {
        self(event)
    }
}

/// Ignores every navigation request.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNavigator;

impl NavigationHandler for NoopNavigator {
    fn navigate(&self, _event: NavigationEvent) {}
}

/// Reports navigation requests through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNavigator;

impl NavigationHandler for LogNavigator {
    fn navigate(&self, event: NavigationEvent) {
        match event {
            NavigationEvent::NotAuthorized => warn!("Session expired and could not be renewed"),
            NavigationEvent::LoginRequired => warn!("No stored credential, login required"),
        }
    }
}
