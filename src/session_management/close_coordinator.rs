//! Single-fire termination signal shared by the activities of one session.
//!
//! Both copy loops may hit an error at nearly the same moment: once one side
//! disconnects, the other loop fails against a connection that is already
//! going away. Only the first report closes the session; every later one is a
//! no-op that neither blocks nor panics.

use std::sync::OnceLock;

use tokio::sync::watch;

use crate::relay::LoopEnd;

#[derive(Debug)]
pub struct CloseCoordinator {
    reason: OnceLock<LoopEnd>,
    done: watch::Sender<bool>,
    monitor_stop: watch::Sender<bool>,
}

impl CloseCoordinator {
    pub fn new() -> Self {
        let (done, _) = watch::channel(false);
        let (monitor_stop, _) = watch::channel(false);
        Self {
            reason: OnceLock::new(),
            done,
            monitor_stop,
        }
    }

    /// Transitions the session from open to closed.
    ///
    /// Returns `true` only for the call that performed the transition; that
    /// call's `reason` is kept as the close reason. The check and the switch
    /// happen under the `done` channel's lock, so a caller inside
    /// [`while_open`](Self::while_open) delays the transition until it is done.
    pub fn fire(&self, reason: LoopEnd) -> bool {
        let mut reason = Some(reason);
        let won = self.done.send_if_modified(|closed| {
            if *closed {
                return false;
            }
            if let Some(reason) = reason.take() {
                let _ = self.reason.set(reason);
            }
            *closed = true;
            true
        });
        if won {
            self.monitor_stop.send_replace(true);
        }
        won
    }

    pub fn is_closed(&self) -> bool {
        *self.done.borrow()
    }

    /// Runs `f` only if the session is still open, holding off any `fire`
    /// until `f` returns. `f` must not fire this coordinator.
    pub fn while_open<T>(&self, f: impl FnOnce() -> T) -> Option<T> {
        let closed = self.done.borrow();
        if *closed {
            return None;
        }
        Some(f())
    }

    pub fn reason(&self) -> Option<&LoopEnd> {
        self.reason.get()
    }

    /// Resolves once the coordinator has fired. Returns immediately if it
    /// already has.
    pub async fn closed(&self) {
        let mut rx = self.done.subscribe();
        // The sender lives in `self`, so the channel cannot close under us.
        let _ = rx.wait_for(|closed| *closed).await;
    }

    /// Stop signal for the periodic monitor.
    pub fn monitor_stop(&self) -> watch::Receiver<bool> {
        self.monitor_stop.subscribe()
    }
}

impl Default for CloseCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
