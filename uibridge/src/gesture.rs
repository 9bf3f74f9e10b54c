//! Stroke synthesis and the async-to-sync gesture bridge.
//!
//! The platform executes gestures asynchronously and reports the outcome
//! through a callback. `GestureExecutor::dispatch` hides that behind a call
//! that resolves only once the device has confirmed completion, cancellation,
//! or the bounded wait has elapsed.

use crate::errors::AutomationError;
use crate::platforms::AccessibilityBridge;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, instrument, warn};

/// Bounded wait for the platform's completion callback.
pub const GESTURE_TIMEOUT: Duration = Duration::from_secs(5);
/// Press duration used for a plain tap.
pub const TAP_DURATION_MS: u64 = 100;
pub const DEFAULT_LONG_PRESS_MS: u64 = 1000;
pub const DEFAULT_SWIPE_MS: u64 = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrokePoint {
    pub x: i32,
    pub y: i32,
}

/// A single touch-point path: one start point, optional further points for a
/// swipe, and a duration. The whole path is traversed in `duration_ms`
/// regardless of distance.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokePath {
    pub points: Vec<StrokePoint>,
    pub duration_ms: u64,
}

impl StrokePath {
    pub fn tap(x: i32, y: i32) -> Self {
        Self {
            points: vec![StrokePoint { x, y }],
            duration_ms: TAP_DURATION_MS,
        }
    }

    pub fn long_press(x: i32, y: i32, duration_ms: u64) -> Self {
        Self {
            points: vec![StrokePoint { x, y }],
            duration_ms,
        }
    }

    /// Straight-line swipe from start to end.
    pub fn swipe(start_x: i32, start_y: i32, end_x: i32, end_y: i32, duration_ms: u64) -> Self {
        Self {
            points: vec![
                StrokePoint {
                    x: start_x,
                    y: start_y,
                },
                StrokePoint { x: end_x, y: end_y },
            ],
            duration_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureOutcome {
    Completed,
    Cancelled,
}

/// One-shot completion signal handed to the platform alongside a stroke.
///
/// Fires at most once: whichever of `completed`/`cancelled` runs first wins,
/// later calls are no-ops. Dropping it unfired is observed by the waiting
/// executor as a cancellation.
pub struct GestureCompletion {
    tx: Mutex<Option<oneshot::Sender<GestureOutcome>>>,
}

impl GestureCompletion {
    pub fn channel() -> (Self, oneshot::Receiver<GestureOutcome>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                tx: Mutex::new(Some(tx)),
            },
            rx,
        )
    }

    pub fn completed(&self) {
        self.fire(GestureOutcome::Completed);
    }

    pub fn cancelled(&self) {
        self.fire(GestureOutcome::Cancelled);
    }

    fn fire(&self, outcome: GestureOutcome) {
        let sender = self
            .tx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        match sender {
            // The receiver may already have timed out and gone away.
            Some(tx) => {
                let _ = tx.send(outcome);
            }
            None => debug!("ignoring duplicate gesture completion: {outcome:?}"),
        }
    }
}

/// Dispatches strokes and blocks the calling task until the device confirms.
#[derive(Clone)]
pub struct GestureExecutor {
    bridge: Arc<dyn AccessibilityBridge>,
}

impl GestureExecutor {
    pub fn new(bridge: Arc<dyn AccessibilityBridge>) -> Self {
        Self { bridge }
    }

    /// Dispatch one stroke and wait for its outcome, up to `GESTURE_TIMEOUT`.
    #[instrument(skip(self, path), fields(points = path.points.len(), duration_ms = path.duration_ms))]
    pub async fn dispatch(&self, path: StrokePath) -> Result<(), AutomationError> {
        if path.points.is_empty() {
            return Err(AutomationError::InvalidArgument(
                "stroke path has no points".to_string(),
            ));
        }
        let (completion, rx) = GestureCompletion::channel();
        self.bridge.dispatch_gesture(path, completion).await?;

        match tokio::time::timeout(GESTURE_TIMEOUT, rx).await {
            Ok(Ok(GestureOutcome::Completed)) => Ok(()),
            Ok(Ok(GestureOutcome::Cancelled)) => Err(AutomationError::GestureCancelled(
                "gesture was cancelled by the platform".to_string(),
            )),
            // Sender dropped without firing; the dispatcher gave up on it.
            Ok(Err(_)) => Err(AutomationError::GestureCancelled(
                "platform dropped the completion signal".to_string(),
            )),
            Err(_) => {
                warn!("gesture did not confirm within {GESTURE_TIMEOUT:?}");
                Err(AutomationError::GestureTimeout(format!(
                    "no completion within {}s",
                    GESTURE_TIMEOUT.as_secs()
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stroke_constructors() {
        let tap = StrokePath::tap(540, 960);
        assert_eq!(tap.points, vec![StrokePoint { x: 540, y: 960 }]);
        assert_eq!(tap.duration_ms, TAP_DURATION_MS);

        let swipe = StrokePath::swipe(540, 1500, 540, 500, 300);
        assert_eq!(swipe.points.len(), 2);
        assert_eq!(swipe.duration_ms, 300);

        let press = StrokePath::long_press(10, 10, 1500);
        assert_eq!(press.points.len(), 1);
        assert_eq!(press.duration_ms, 1500);
    }

    #[tokio::test]
    async fn completion_fires_at_most_once() {
        let (completion, rx) = GestureCompletion::channel();
        completion.completed();
        // Second fire must be silently ignored, not a panic or a second send.
        completion.cancelled();
        assert_eq!(rx.await.unwrap(), GestureOutcome::Completed);
    }

    #[tokio::test]
    async fn dropped_completion_is_observed() {
        let (completion, rx) = GestureCompletion::channel();
        drop(completion);
        assert!(rx.await.is_err());
    }
}
