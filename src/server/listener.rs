use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tracing::info;

use crate::http::connection::{Connection, Service};
use crate::server::shutdown::stopped;

/// Pause after a failed accept so a persistent error (e.g. EMFILE) cannot spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy)]
pub struct Limits {
    /// Connections served concurrently; further accepts wait for a slot.
    pub workers: usize,
    /// How long in-flight connections get to finish after a stop.
    pub shutdown_grace: Duration,
}

/// Accepts connections until `stop` fires, then drains.
pub async fn run(
    listener: TcpListener,
    service: Arc<Service>,
    limits: Limits,
    mut stop: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let slots = Arc::new(Semaphore::new(limits.workers));
    let mut tasks = JoinSet::new();

    info!(
        address = %listener.local_addr()?,
        workers = limits.workers,
        "Listening"
    );

    loop {
        while let Some(done) = tasks.try_join_next() {
            if let Err(e) = done {
                if e.is_panic() {
                    tracing::error!(error = %e, "Connection task panicked");
                }
            }
        }

        // Wait for a free worker before accepting
        let permit = tokio::select! {
            _ = stopped(&mut stop) => break,
            permit = Arc::clone(&slots).acquire_owned() => permit?,
        };

        let (socket, peer) = tokio::select! {
            _ = stopped(&mut stop) => break,
            accepted = listener.accept() => match accepted {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to accept connection");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            },
        };

        tracing::debug!(
            peer = %peer,
            available = slots.available_permits(),
            "Accepted connection"
        );

        if let Err(e) = socket.set_nodelay(true) {
            tracing::debug!(peer = %peer, error = %e, "Failed to set TCP_NODELAY");
        }

        let service = Arc::clone(&service);
        tasks.spawn(async move {
            let _permit = permit;
            let mut conn = Connection::new(socket, peer, service);
            if let Err(e) = conn.run().await {
                tracing::debug!(peer = %peer, error = %e, "Connection error");
            }
        });
    }

    drop(listener);
    info!(in_flight = tasks.len(), "Stopped accepting connections");
    drain(tasks, limits.shutdown_grace).await;
    Ok(())
}

/// Waits for in-flight connections, aborting whatever is left after `grace`.
async fn drain(mut tasks: JoinSet<()>, grace: Duration) {
    let deadline = tokio::time::sleep(grace);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => {
                tracing::warn!(remaining = tasks.len(), "Grace period elapsed, aborting connections");
                tasks.shutdown().await;
                return;
            }
            next = tasks.join_next() => {
                if next.is_none() {
                    return;
                }
            }
        }
    }
}
