//! Awaiting events.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::error::{WaitError, WaitResult};
use crate::handler::{Registration, Subscription};
use crate::registry::Registry;

/// Options for [`Registry::wait`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Give up after this long. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Settle a timeout as `Ok(None)` instead of [`WaitError::Timeout`].
    pub resolve_on_timeout: bool,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            resolve_on_timeout: true,
        }
    }
}

impl WaitOptions {
    /// Wait indefinitely.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the timeout in milliseconds.
    #[must_use]
    pub fn with_timeout_ms(self, millis: u64) -> Self {
        self.with_timeout(Duration::from_millis(millis))
    }

    /// Fail with [`WaitError::Timeout`] when the timeout elapses.
    #[must_use]
    pub fn reject_on_timeout(mut self) -> Self {
        self.resolve_on_timeout = false;
        self
    }
}

/// Single-resolution cell shared by the event handler and the timer.
type ResultCell = Arc<Mutex<Option<oneshot::Sender<Vec<Value>>>>>;

/// Claim the cell. Returns `None` if the other trigger already won.
fn claim(cell: &ResultCell) -> Option<oneshot::Sender<Vec<Value>>> {
    cell.lock().unwrap_or_else(PoisonError::into_inner).take()
}

/// Settle the race once the deadline has passed.
///
/// Returns the event's arguments if the handler claimed the cell before the
/// timer could, `None` if the timer wins.
fn settle_after_deadline(
    cell: &ResultCell,
    rx: &mut oneshot::Receiver<Vec<Value>>,
) -> Option<Vec<Value>> {
    if claim(cell).is_some() {
        return None;
    }
    // The handler sends under the lock, so the value is already in the channel.
    rx.try_recv().ok()
}

/// Unregisters the wait handler when the wait settles or is dropped.
struct WaitGuard(Option<Subscription>);

impl Drop for WaitGuard {
    fn drop(&mut self) {
        if let Some(sub) = self.0.take() {
            sub.unregister();
        }
    }
}

impl Registry {
    /// Wait for the next emission of `event`.
    ///
    /// The handler is registered and the timeout starts when `wait` is
    /// called, so an emission between the call and the first poll is not
    /// lost.
    ///
    /// Resolves with the emitted arguments. If the timeout elapses first the
    /// wait resolves with `Ok(None)`, or fails with [`WaitError::Timeout`]
    /// when [`WaitOptions::resolve_on_timeout`] is off. Whichever of the
    /// event and the timer comes first wins; the other is cancelled. Without
    /// a timeout the future stays pending until the event is emitted.
    ///
    /// In unique-events mode an already latched event resolves immediately.
    /// Dropping the future removes its handler.
    ///
    /// # Errors
    ///
    /// The future fails with [`WaitError::Timeout`] if the timeout elapses
    /// and `resolve_on_timeout` is `false`.
    pub fn wait(
        &self,
        event: &str,
        options: WaitOptions,
    ) -> impl Future<Output = WaitResult<Option<Vec<Value>>>> + Send + 'static {
        let (tx, mut rx) = oneshot::channel();
        let cell: ResultCell = Arc::new(Mutex::new(Some(tx)));

        let trigger = Arc::clone(&cell);
        let registration = self.on(event, move |args: &[Value]| {
            // Send under the lock so a timer that finds the cell empty can
            // rely on the value being in the channel.
            let mut slot = trigger.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(tx) = slot.take() {
                let _ = tx.send(args.to_vec());
            }
            Value::Null
        });
        let guard = WaitGuard(registration.and_then(Registration::into_subscription));

        // A deadline past the end of the clock never fires.
        let deadline = options
            .timeout
            .and_then(|limit| Some((limit, Instant::now().checked_add(limit)?)));
        let event = event.to_owned();

        async move {
            let _guard = guard;
            let delivered = async {
                match (&mut rx).await {
                    Ok(args) => args,
                    Err(_) => std::future::pending().await,
                }
            };

            let Some((limit, deadline)) = deadline else {
                return Ok(Some(delivered.await));
            };

            if let Ok(args) = tokio::time::timeout_at(deadline, delivered).await {
                trace!(event = %event, "Wait resolved by event");
                return Ok(Some(args));
            }

            if let Some(args) = settle_after_deadline(&cell, &mut rx) {
                trace!(event = %event, "Wait resolved by event");
                return Ok(Some(args));
            }

            debug!(event = %event, timeout_ms = limit.as_millis(), "Wait timed out");
            if options.resolve_on_timeout {
                Ok(None)
            } else {
                Err(WaitError::Timeout { event })
            }
        }
    }
}
