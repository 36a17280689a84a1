use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Success,
    Error,
    Info,
}

/// Transient user-facing notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    pub message: String,
    pub kind: AlertKind,
}

struct AlertInner {
    current: Option<Alert>,
    /// Bumped on every `set`; a dismiss timer only clears its own generation,
    /// so a stale timer never wipes a newer alert.
    generation: u64,
}

/// Holds the single visible alert with a set-now, auto-clear-later lifecycle.
///
/// Each `set` supersedes the previous alert and aborts its dismiss timer.
/// Dropping the center aborts the outstanding timer, so no callback outlives
/// the component. Must be used from within a tokio runtime.
pub struct AlertCenter {
    inner: Arc<Mutex<AlertInner>>,
    dismiss_after: Duration,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl AlertCenter {
    pub fn new(dismiss_after: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(AlertInner {
                current: None,
                generation: 0,
            })),
            dismiss_after,
            timer: Mutex::new(None),
        }
    }

    pub fn set(&self, message: impl Into<String>, kind: AlertKind) {
        let alert = Alert {
            message: message.into(),
            kind,
        };

        let generation = match self.inner.lock() {
            Ok(mut state) => {
                state.generation += 1;
                log::debug!("Alert set ({:?}): {}", alert.kind, alert.message);
                state.current = Some(alert);
                state.generation
            }
            Err(e) => {
                log::error!("Failed to acquire alert lock (non-critical): {}", e);
                return;
            }
        };

        let inner = Arc::clone(&self.inner);
        let delay = self.dismiss_after;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Ok(mut state) = inner.lock() {
                if state.generation == generation {
                    state.current = None;
                }
            }
        });

        match self.timer.lock() {
            Ok(mut timer) => {
                if let Some(previous) = timer.replace(handle) {
                    previous.abort();
                }
            }
            Err(e) => {
                log::error!("Failed to acquire alert timer lock (non-critical): {}", e);
                handle.abort();
            }
        }
    }

    pub fn current(&self) -> Option<Alert> {
        match self.inner.lock() {
            Ok(state) => state.current.clone(),
            Err(e) => {
                log::error!("Failed to acquire alert lock (non-critical): {}", e);
                None
            }
        }
    }

    /// Immediate dismissal, cancelling the pending timer.
    pub fn clear(&self) {
        if let Ok(mut state) = self.inner.lock() {
            state.generation += 1;
            state.current = None;
        }
        if let Ok(mut timer) = self.timer.lock() {
            if let Some(handle) = timer.take() {
                handle.abort();
            }
        }
    }
}

impl Drop for AlertCenter {
    fn drop(&mut self) {
        if let Ok(mut timer) = self.timer.lock() {
            if let Some(handle) = timer.take() {
                handle.abort();
            }
        }
    }
}
