//! Exact-match request routing.
//!
//! Routes are keyed by `(method, path)`; there is no wildcard or prefix
//! matching and trailing slashes are significant. The table sits behind a
//! read-write lock so routes may be added while the server is running;
//! a reader sees either the whole entry or nothing.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::http::request::{Method, Request};
use crate::http::response::Response;

/// A request handler. Returning `Err` (or panicking) yields a 500.
pub type Handler = Arc<dyn Fn(&Request) -> anyhow::Result<Response> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteKey {
    pub method: Method,
    pub path: String,
}

impl RouteKey {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
        }
    }
}

/// Outcome of a lookup. A miss is not an error.
#[derive(Debug)]
pub enum Dispatch {
    Handled(Response),
    NoRoute,
}

#[derive(Default)]
pub struct Router {
    routes: RwLock<HashMap<RouteKey, Handler>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `handler` under the exact `(method, path)` key, replacing any
    /// previous handler for that key.
    pub fn register<F>(&self, method: Method, path: impl Into<String>, handler: F)
    where
        F: Fn(&Request) -> anyhow::Result<Response> + Send + Sync + 'static,
    {
        let key = RouteKey::new(method, path);
        tracing::debug!(method = %key.method, path = %key.path, "Route registered");
        self.routes.write().insert(key, Arc::new(handler));
    }

    pub fn get<F>(&self, path: impl Into<String>, handler: F)
    where
        F: Fn(&Request) -> anyhow::Result<Response> + Send + Sync + 'static,
    {
        self.register(Method::GET, path, handler);
    }

    pub fn post<F>(&self, path: impl Into<String>, handler: F)
    where
        F: Fn(&Request) -> anyhow::Result<Response> + Send + Sync + 'static,
    {
        self.register(Method::POST, path, handler);
    }

    pub fn put<F>(&self, path: impl Into<String>, handler: F)
    where
        F: Fn(&Request) -> anyhow::Result<Response> + Send + Sync + 'static,
    {
        self.register(Method::PUT, path, handler);
    }

    pub fn delete<F>(&self, path: impl Into<String>, handler: F)
    where
        F: Fn(&Request) -> anyhow::Result<Response> + Send + Sync + 'static,
    {
        self.register(Method::DELETE, path, handler);
    }

    /// Runs the handler registered for the request's method and path.
    ///
    /// Returns `Err` only when the handler itself fails or panics.
    pub fn dispatch(&self, req: &Request) -> anyhow::Result<Dispatch> {
        let key = RouteKey::new(req.method.clone(), req.path.clone());
        // Clone the handler out so the lock is not held while it runs
        let handler = match self.routes.read().get(&key) {
            Some(h) => Arc::clone(h),
            None => return Ok(Dispatch::NoRoute),
        };

        match panic::catch_unwind(AssertUnwindSafe(|| (*handler)(req))) {
            Ok(result) => result.map(Dispatch::Handled),
            Err(payload) => Err(anyhow::anyhow!(
                "handler panicked: {}",
                panic_message(payload.as_ref())
            )),
        }
    }

    /// Methods registered for `path`, sorted.
    pub fn allowed_methods(&self, path: &str) -> Vec<String> {
        let mut methods: Vec<String> = self
            .routes
            .read()
            .keys()
            .filter(|k| k.path == path)
            .map(|k| k.method.to_string())
            .collect();
        methods.sort();
        methods
    }

    pub fn contains(&self, method: &Method, path: &str) -> bool {
        self.routes
            .read()
            .contains_key(&RouteKey::new(method.clone(), path))
    }

    pub fn len(&self) -> usize {
        self.routes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.read().is_empty()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
