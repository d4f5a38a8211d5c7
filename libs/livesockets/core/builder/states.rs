//! Type-state markers for [`WebSocketClientBuilder`](super::WebSocketClientBuilder)
//!
//! `build()` only exists once both the URL and the router/handler pair
//! have been supplied.

/// Marker trait for URL state
pub trait UrlState {}

/// URL has not been set
pub struct NoUrl;
impl UrlState for NoUrl {}

/// URL has been set
pub struct HasUrl;
impl UrlState for HasUrl {}

/// Marker trait for router state
pub trait RouterState {}

/// Router and handler have not been set
pub struct NoRouter;
impl RouterState for NoRouter {}

/// Router and handler have been set
pub struct HasRouter;
impl RouterState for HasRouter {}
