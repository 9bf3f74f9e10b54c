//! Tree snapshot acquisition with fallback, retry, and an event-refreshed
//! root cache.
//!
//! "No snapshot" is the single most common failure in this class of system,
//! so acquisition tries several strategies in order and the failure path
//! produces a deliberately verbose diagnostic.

use crate::element::UiElement;
use crate::platforms::AccessibilityBridge;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::{debug, instrument, trace};

/// How long a cached root stays usable.
pub const CACHE_VALIDITY: Duration = Duration::from_millis(5000);

const RETRY_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_millis(100);

struct CachedRoot {
    element: UiElement,
    acquired_at: Instant,
}

/// Obtains the current UI tree root, tolerating transient unavailability.
pub struct SnapshotAccessor {
    bridge: Arc<dyn AccessibilityBridge>,
    // Written from the command path and the window-event path concurrently,
    // hence the lock rather than a bare shared pair.
    cache: RwLock<Option<CachedRoot>>,
}

impl SnapshotAccessor {
    pub fn new(bridge: Arc<dyn AccessibilityBridge>) -> Self {
        Self {
            bridge,
            cache: RwLock::new(None),
        }
    }

    /// Acquire the current root, trying in order: direct active-window query,
    /// cache (within validity), window enumeration, then a bounded retry of
    /// the direct query. `None` only after all strategies are exhausted.
    #[instrument(skip(self))]
    pub async fn acquire_root(&self) -> Option<UiElement> {
        if let Some(root) = self.query_active_root() {
            return Some(root);
        }
        if let Some(root) = self.cached_root() {
            trace!("serving root from cache");
            return Some(root);
        }
        if let Some(root) = self.root_from_windows() {
            return Some(root);
        }
        for attempt in 1..=RETRY_ATTEMPTS {
            tokio::time::sleep(RETRY_BACKOFF).await;
            if let Some(root) = self.query_active_root() {
                debug!("active window resolved on retry {attempt}");
                return Some(root);
            }
        }
        debug!("all snapshot strategies exhausted");
        None
    }

    /// Event-driven cache refresh; called on window-lifecycle change
    /// notifications, decoupling cache freshness from command timing.
    pub fn notify_window_changed(&self) {
        if self.query_active_root().is_some() {
            trace!("cache refreshed on window change");
        }
    }

    fn query_active_root(&self) -> Option<UiElement> {
        match self.bridge.active_window_root() {
            Ok(Some(root)) => {
                self.store(root.clone());
                Some(root)
            }
            Ok(None) => None,
            Err(e) => {
                debug!("active window query failed: {e}");
                None
            }
        }
    }

    /// Last cached root, if still within validity and the handle resolves.
    fn cached_root(&self) -> Option<UiElement> {
        let guard = self
            .cache
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let cached = guard.as_ref()?;
        if cached.acquired_at.elapsed() >= CACHE_VALIDITY {
            return None;
        }
        if cached.element.attributes().is_err() {
            debug!("cached root no longer resolves");
            return None;
        }
        Some(cached.element.clone())
    }

    /// Prefer the active window with content; otherwise the first window
    /// with content.
    fn root_from_windows(&self) -> Option<UiElement> {
        let windows = match self.bridge.windows() {
            Ok(windows) => windows,
            Err(e) => {
                debug!("window enumeration failed: {e}");
                return None;
            }
        };
        let chosen = windows
            .iter()
            .find(|w| w.active && w.has_content())
            .or_else(|| windows.iter().find(|w| w.has_content()))?;
        let root = chosen.root.clone()?;
        self.store(root.clone());
        Some(root)
    }

    fn store(&self, element: UiElement) {
        let mut guard = self
            .cache
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Some(CachedRoot {
            element,
            acquired_at: Instant::now(),
        });
    }

    fn cache_state(&self) -> String {
        let guard = self
            .cache
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match guard.as_ref() {
            None => "empty".to_string(),
            Some(cached) => {
                let age = cached.acquired_at.elapsed();
                if age < CACHE_VALIDITY {
                    format!("fresh ({}ms old)", age.as_millis())
                } else {
                    format!("expired ({}ms old)", age.as_millis())
                }
            }
        }
    }

    /// Rich diagnostic for the NoSnapshot failure path; the remote caller
    /// cannot observe device state any other way.
    pub fn diagnostics(&self) -> String {
        let window_count = self
            .bridge
            .windows()
            .map(|windows| windows.len().to_string())
            .unwrap_or_else(|_| "unavailable".to_string());
        format!(
            "service_enabled={}, cache={}, windows={}, device_locked={}",
            self.bridge.service_enabled(),
            self.cache_state(),
            window_count,
            self.bridge.device_locked(),
        )
    }
}
