//! Read-only view of a request for stages that are generic over the request type.

use std::borrow::Cow;
use std::time::Duration;

use kinvey_core::{HeaderStore, Method, Request};
use serde_json::Value;

/// What a generic stage may read from the request it processes.
pub trait RackRequest {
    /// HTTP method.
    fn method(&self) -> Method;

    /// Effective URL, if any.
    fn url(&self) -> Option<Cow<'_, str>>;

    /// Headers.
    fn headers(&self) -> &HeaderStore;

    /// Body.
    fn body(&self) -> Option<&Value>;

    /// Advisory timeout for transport stages.
    fn timeout(&self) -> Duration;

    /// Whether transport stages follow redirects.
    fn follow_redirect(&self) -> bool;
}

impl RackRequest for Request {
    fn method(&self) -> Method {
        Self::method(self)
    }

    fn url(&self) -> Option<Cow<'_, str>> {
        Self::url(self).map(Cow::Borrowed)
    }

    fn headers(&self) -> &HeaderStore {
        Self::headers(self)
    }

    fn body(&self) -> Option<&Value> {
        self.data()
    }

    fn timeout(&self) -> Duration {
        Self::timeout(self)
    }

    fn follow_redirect(&self) -> bool {
        Self::follow_redirect(self)
    }
}
