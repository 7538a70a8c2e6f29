//! Stop signal shared between the accept loop and its handles.

use std::sync::Arc;
use tokio::sync::watch;

/// Coordinator for stopping the server.
///
/// Backed by a watch channel so a subscriber created after `trigger` still
/// observes the stop.
#[derive(Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Trigger the stop signal. Calling it again has no further effect.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves once `rx` has seen the stop signal.
pub async fn stopped(rx: &mut watch::Receiver<bool>) {
    // A dropped sender means nobody can stop us any more; treat it as a stop
    let _ = rx.wait_for(|stop| *stop).await;
}
