//! Server lifecycle: construction, binding, the accept loop and stopping.
//!
//! ```no_run
//! # async fn demo() -> anyhow::Result<()> {
//! use sentinel::config::Config;
//! use sentinel::http::response::Response;
//! use sentinel::server::Server;
//!
//! let server = Server::new(&Config::default())?;
//! server.router().get("/api/hello", |_| Ok(Response::ok("Hello, World!")));
//!
//! let handle = server.handle();
//! tokio::spawn(async move {
//!     let _ = tokio::signal::ctrl_c().await;
//!     handle.stop();
//! });
//!
//! server.start().await
//! # }
//! ```

pub mod listener;
pub mod shutdown;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::files::StaticFiles;
use crate::http::connection::Service;
use crate::router::Router;
use listener::Limits;
use shutdown::Shutdown;

pub struct Server {
    listen_addr: String,
    limits: Limits,
    service: Service,
    shutdown: Shutdown,
}

impl Server {
    /// Builds a server with an empty router. The static root is created if
    /// it does not exist.
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let files = StaticFiles::new(&cfg.static_files.root, cfg.static_files.index.clone())?;
        tracing::info!(root = %files.root().display(), "Serving static files");

        Ok(Self {
            listen_addr: cfg.server.listen_addr.clone(),
            limits: Limits {
                workers: cfg.server.workers,
                shutdown_grace: Duration::from_secs(cfg.server.shutdown_grace_secs),
            },
            service: Service {
                router: Arc::new(Router::new()),
                files,
                server_name: cfg.server.server_name.clone(),
                read_timeout: Duration::from_secs(cfg.server.read_timeout_secs),
            },
            shutdown: Shutdown::new(),
        })
    }

    /// The routing table. Routes may be added before or after `start`.
    pub fn router(&self) -> Arc<Router> {
        Arc::clone(&self.service.router)
    }

    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            shutdown: self.shutdown.clone(),
        }
    }

    /// Binds the listening socket without accepting yet.
    pub async fn bind(self) -> anyhow::Result<BoundServer> {
        let listener = TcpListener::bind(&self.listen_addr)
            .await
            .with_context(|| format!("binding {}", self.listen_addr))?;

        Ok(BoundServer {
            listener,
            limits: self.limits,
            service: Arc::new(self.service),
            shutdown: self.shutdown,
        })
    }

    /// Binds and serves until stopped.
    pub async fn start(self) -> anyhow::Result<()> {
        self.bind().await?.run().await
    }
}

pub struct BoundServer {
    listener: TcpListener,
    limits: Limits,
    service: Arc<Service>,
    shutdown: Shutdown,
}

impl BoundServer {
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            shutdown: self.shutdown.clone(),
        }
    }

    /// Runs the accept loop. Returns after a stop once in-flight
    /// connections have drained or been aborted.
    pub async fn run(self) -> anyhow::Result<()> {
        let stop = self.shutdown.subscribe();
        // `self.shutdown` stays alive for the whole loop so the channel stays open
        let result = listener::run(self.listener, self.service, self.limits, stop).await;
        drop(self.shutdown);
        result
    }
}

/// Cloneable handle used to stop a running server.
#[derive(Clone)]
pub struct ServerHandle {
    shutdown: Shutdown,
}

impl ServerHandle {
    /// Stops accepting and begins draining. Safe to call repeatedly.
    pub fn stop(&self) {
        if !self.shutdown.is_triggered() {
            tracing::info!("Stopping server");
        }
        self.shutdown.trigger();
    }

    pub fn is_stopped(&self) -> bool {
        self.shutdown.is_triggered()
    }
}
