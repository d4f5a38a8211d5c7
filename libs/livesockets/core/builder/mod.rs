pub mod states;

use crate::core::client::WebSocketClient;
use crate::core::config::ClientConfig;
use crate::traits::*;
use states::*;
use std::marker::PhantomData;
use std::sync::Arc;

type StrategyFactory = Arc<dyn Fn() -> Box<dyn ReconnectionStrategy> + Send + Sync>;

/// Type-state builder for [`WebSocketClient`]
///
/// The URL and the router/handler pair are required; everything else has a
/// default (no auth, [`FixedDelay::default`] reconnection).
pub struct WebSocketClientBuilder<U, Ro, R>
where
    U: UrlState,
    Ro: RouterState,
{
    _url_state: PhantomData<U>,
    _router_state: PhantomData<Ro>,
    url: Option<String>,
    router: Option<R>,
    handler: Option<Box<dyn std::any::Any + Send>>,
    auth: Option<Arc<dyn AuthProvider>>,
    reconnect_strategy: Option<StrategyFactory>,
}

impl WebSocketClientBuilder<NoUrl, NoRouter, ()> {
    /// Create a new builder instance
    pub fn new() -> Self {
        Self {
            _url_state: PhantomData,
            _router_state: PhantomData,
            url: None,
            router: None,
            handler: None,
            auth: None,
            reconnect_strategy: None,
        }
    }
}

impl Default for WebSocketClientBuilder<NoUrl, NoRouter, ()> {
    fn default() -> Self {
        Self::new()
    }
}

// URL setting
impl<Ro, R> WebSocketClientBuilder<NoUrl, Ro, R>
where
    Ro: RouterState,
{
    pub fn url(self, url: impl Into<String>) -> WebSocketClientBuilder<HasUrl, Ro, R> {
        WebSocketClientBuilder {
            _url_state: PhantomData,
            _router_state: PhantomData,
            url: Some(url.into()),
            router: self.router,
            handler: self.handler,
            auth: self.auth,
            reconnect_strategy: self.reconnect_strategy,
        }
    }
}

// Router setting
impl<U> WebSocketClientBuilder<U, NoRouter, ()>
where
    U: UrlState,
{
    /// Set the router and the handler that receives its parsed messages
    pub fn router<NewR>(
        self,
        router: NewR,
        handler: Arc<dyn MessageHandler<NewR::Message>>,
    ) -> WebSocketClientBuilder<U, HasRouter, NewR>
    where
        NewR: MessageRouter,
    {
        WebSocketClientBuilder {
            _url_state: PhantomData,
            _router_state: PhantomData,
            url: self.url,
            router: Some(router),
            handler: Some(Box::new(handler)),
            auth: self.auth,
            reconnect_strategy: self.reconnect_strategy,
        }
    }
}

// Optional configuration methods
impl<U, Ro, R> WebSocketClientBuilder<U, Ro, R>
where
    U: UrlState,
    Ro: RouterState,
{
    pub fn auth(mut self, auth: impl AuthProvider + 'static) -> Self {
        self.auth = Some(Arc::new(auth));
        self
    }

    pub fn auth_provider(mut self, auth: Arc<dyn AuthProvider>) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Strategy consulted after every unexpected close
    ///
    /// Each connection task gets its own copy, so a manual `connect` after
    /// giving up starts over with the full budget.
    pub fn reconnect_strategy<S>(mut self, strategy: S) -> Self
    where
        S: ReconnectionStrategy + Clone + 'static,
    {
        self.reconnect_strategy = Some(Arc::new(move || {
            Box::new(strategy.clone()) as Box<dyn ReconnectionStrategy>
        }));
        self
    }
}

// Build method - only available when all required fields are set
impl<R> WebSocketClientBuilder<HasUrl, HasRouter, R>
where
    R: MessageRouter,
{
    pub fn build(self) -> Result<WebSocketClient<R>> {
        let url = self
            .url
            .ok_or_else(|| SocketError::Configuration("URL must be set".into()))?;
        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            return Err(SocketError::Configuration(format!(
                "URL must use ws:// or wss://, got {}",
                url
            )));
        }

        let router = self
            .router
            .ok_or_else(|| SocketError::Configuration("Router must be set".into()))?;

        let handler = self
            .handler
            .ok_or_else(|| SocketError::Configuration("Handler must be set".into()))?
            .downcast::<Arc<dyn MessageHandler<R::Message>>>()
            .map_err(|_| SocketError::Configuration("Handler type mismatch".into()))?;

        let reconnect_strategy = self.reconnect_strategy.unwrap_or_else(|| {
            Arc::new(|| Box::new(FixedDelay::default()) as Box<dyn ReconnectionStrategy>)
        });

        let config = ClientConfig {
            url,
            router: Arc::new(router),
            handler: *handler,
            auth: self.auth,
            reconnect_strategy,
        };

        Ok(WebSocketClient::new(config))
    }
}
