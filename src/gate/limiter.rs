use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::debug;

type Counters = Arc<Mutex<HashMap<String, u32>>>;

/// Per-visitor request counter, cleared every window by a background task.
///
/// The counter map is private; callers only get [`check`](Self::check).
pub struct RateLimiter {
    visitors: Counters,
    limit: u32,
    window: Duration,
    stop_tx: Option<oneshot::Sender<()>>,
    join_handle: Option<JoinHandle<()>>,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            visitors: Arc::new(Mutex::new(HashMap::new())),
            limit,
            window,
            stop_tx: None,
            join_handle: None,
        }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn is_running(&self) -> bool {
        self.join_handle.is_some()
    }

    /// Counts one request from `visitor` and reports whether it is within the limit.
    pub fn check(&self, visitor: &str) -> bool {
        let mut visitors = lock(&self.visitors);
        let count = visitors.entry(visitor.to_string()).or_insert(0);
        *count = count.saturating_add(1);
        *count <= self.limit
    }

    /// Spawns the reset task on the current tokio runtime. Calling it twice is a no-op.
    pub fn start(&mut self) {
        if self.join_handle.is_some() {
            return;
        }

        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let visitors = self.visitors.clone();
        let window = self.window;

        let join_handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut stop_rx => {
                        break;
                    }
                    _ = sleep(window) => {
                        let mut guard = lock(&visitors);
                        debug!(visitors = guard.len(), "rate limiter window reset");
                        guard.clear();
                    }
                }
            }
        });

        self.stop_tx = Some(stop_tx);
        self.join_handle = Some(join_handle);
    }

    /// Signals the reset task to stop and waits for it to finish.
    pub async fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(join_handle) = self.join_handle.take() {
            let _ = join_handle.await;
        }
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(join_handle) = self.join_handle.take() {
            join_handle.abort();
        }
    }
}

// A panic while holding the lock leaves plain counters behind; keep using them.
fn lock(visitors: &Counters) -> MutexGuard<'_, HashMap<String, u32>> {
    visitors
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
