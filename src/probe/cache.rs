//! Short-lived memo of the container detection result

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::ContainerDetector;
use crate::error::Result;

/// Source of monotonic time for cache expiry
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Mutex::new(Instant::now()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Debug, Default)]
struct CacheEntry {
    container_id: String,
    last_check: Option<Instant>,
}

/// Memoizes the container ID for `ttl`.
///
/// Readers share the lock while the entry is fresh. A stale or empty entry
/// triggers a new detection outside the lock; only a successful detection
/// takes the write lock to store the result. A failed detection leaves the
/// entry untouched.
pub struct EnvironmentCache {
    entry: RwLock<CacheEntry>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl EnvironmentCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entry: RwLock::new(CacheEntry::default()),
            ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached container ID if still fresh, otherwise the result of a new detection
    pub async fn get_or_detect(&self, detector: &dyn ContainerDetector) -> Result<String> {
        if let Some(id) = self.cached().await {
            return Ok(id);
        }

        let container_id = detector.detect().await?;

        let mut entry = self.entry.write().await;
        entry.container_id = container_id.clone();
        entry.last_check = Some(self.clock.now());
        tracing::debug!("Cached container ID {}", container_id);

        Ok(container_id)
    }

    /// The cached ID, if one exists and is younger than the TTL
    pub async fn cached(&self) -> Option<String> {
        let entry = self.entry.read().await;
        let checked = entry.last_check?;
        let fresh = self.clock.now().saturating_duration_since(checked) < self.ttl;

        (fresh && !entry.container_id.is_empty()).then(|| entry.container_id.clone())
    }

    /// Forget the cached ID so the next access probes again
    pub async fn invalidate(&self) {
        let mut entry = self.entry.write().await;
        entry.container_id.clear();
        entry.last_check = None;
    }
}
