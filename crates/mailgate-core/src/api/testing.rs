//! Scripted transports and helpers shared by the unit tests.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::request::RequestDescriptor;
use super::transport::{RawResponse, Transport, TransportFailure};
use super::Gateway;
use crate::auth::{
    CredentialError, CredentialStore, MemoryStore, NavigationEvent, NavigationHandler, Session,
    DEFAULT_CREDENTIAL_KEY,
};
use crate::config::GatewayConfig;

pub const TEST_API_BASE_URL: &str = "https://api.example.test/aomail/";

type Reply = Result<RawResponse, TransportFailure>;

/// Answers requests from a fixed queue, recording every request it sees.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    replies: Arc<Mutex<VecDeque<Reply>>>,
    calls: Arc<Mutex<Vec<RequestDescriptor>>>,
}

impl ScriptedTransport {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(replies.into())),
            calls: Arc::default(),
        }
    }

    pub fn calls(&self) -> Vec<RequestDescriptor> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(&self, request: &RequestDescriptor) -> Reply {
        self.calls.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportFailure("no scripted reply left".into())))
    }
}

type Route = dyn Fn(&RequestDescriptor) -> Pin<Box<dyn Future<Output = Reply> + Send>> + Send + Sync;

/// Answers each request by calling a routing closure.
#[derive(Clone)]
pub struct RoutedTransport {
    route: Arc<Route>,
    calls: Arc<Mutex<usize>>,
}

impl RoutedTransport {
    pub fn new<F, Fut>(route: F) -> Self
    where
        F: Fn(&RequestDescriptor) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Reply> + Send + 'static,
    {
        let route: Arc<Route> = Arc::new(move |request: &RequestDescriptor| {
            Box::pin(route(request)) as Pin<Box<dyn Future<Output = Reply> + Send>>
        });
        Self {
            route,
            calls: Arc::default(),
        }
    }

    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl Transport for RoutedTransport {
    async fn execute(&self, request: &RequestDescriptor) -> Reply {
        *self.calls.lock().unwrap() += 1;
        let reply = (self.route)(request);
        reply.await
    }
}

/// Records navigation events in order.
#[derive(Clone, Default)]
pub struct Navigations {
    events: Arc<Mutex<Vec<NavigationEvent>>>,
}

impl Navigations {
    pub fn handler(&self) -> Arc<dyn NavigationHandler> {
        let events = self.events.clone();
        Arc::new(move |event: NavigationEvent| events.lock().unwrap().push(event))
    }

    pub fn events(&self) -> Vec<NavigationEvent> {
        self.events.lock().unwrap().clone()
    }
}

/// Serves a fixed token but refuses every write.
pub struct ReadOnlyStore {
    token: String,
}

impl ReadOnlyStore {
    pub fn new(token: &str) -> Self {
        Self {
            token: token.to_string(),
        }
    }
}

impl CredentialStore for ReadOnlyStore {
    fn load(&self, key: &str) -> Result<Option<String>, CredentialError> {
        Ok((key == DEFAULT_CREDENTIAL_KEY).then(|| self.token.clone()))
    }

    fn store(&self, _key: &str, _value: &str) -> Result<(), CredentialError> {
        Err(CredentialError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only",
        )))
    }

    fn delete(&self, _key: &str) -> Result<(), CredentialError> {
        Ok(())
    }
}

pub fn gateway_with<T: Transport + 'static>(transport: T, token: Option<&str>) -> Gateway {
    gateway_with_config(
        &GatewayConfig::default(),
        transport,
        token,
        Navigations::default().handler(),
    )
}

pub fn gateway_with_config<T: Transport + 'static>(
    config: &GatewayConfig,
    transport: T,
    token: Option<&str>,
    navigator: Arc<dyn NavigationHandler>,
) -> Gateway {
    let store = match token {
        Some(token) => MemoryStore::with_value(DEFAULT_CREDENTIAL_KEY, token),
        None => MemoryStore::new(),
    };
    let config = GatewayConfig {
        api_base_url: TEST_API_BASE_URL.to_string(),
        ..config.clone()
    };
    Gateway::with_transport(&config, Session::new(Arc::new(store)), navigator, Arc::new(transport))
}
