//! Lifecycle-driven suspend/resume
//!
//! The host application reports foreground/background transitions through a
//! [`LifecycleNotifier`]; the router worker folds them through [`transition`].

use contracts::LifecycleSignal;
use tokio::sync::watch;

/// Whether buffered outputs run their flush loops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Resumed,
    Suspended,
}

/// Work a state change requires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    /// Re-arm every output timer from its own `next_flush_at`
    Resume,
    /// Stop arming timers; in-flight flushes still complete
    Suspend,
}

/// `{active, inactive} x {resumed, suspended}` transition table
///
/// Duplicated signals map to no action.
pub fn transition(state: RunState, signal: LifecycleSignal) -> (RunState, Option<LifecycleAction>) {
    match (state, signal) {
        (RunState::Suspended, LifecycleSignal::Active) => {
            (RunState::Resumed, Some(LifecycleAction::Resume))
        }
        (RunState::Resumed, LifecycleSignal::Inactive) => {
            (RunState::Suspended, Some(LifecycleAction::Suspend))
        }
        (RunState::Resumed, LifecycleSignal::Active) => (RunState::Resumed, None),
        (RunState::Suspended, LifecycleSignal::Inactive) => (RunState::Suspended, None),
    }
}

/// Create a lifecycle channel starting at `initial`
pub fn lifecycle(initial: LifecycleSignal) -> (LifecycleNotifier, LifecycleSignals) {
    let (tx, rx) = watch::channel(initial);
    (LifecycleNotifier { tx }, LifecycleSignals { rx })
}

/// Sending half, held by the host application
#[derive(Debug, Clone)]
pub struct LifecycleNotifier {
    tx: watch::Sender<LifecycleSignal>,
}

impl LifecycleNotifier {
    /// Report a lifecycle signal; duplicates are harmless
    pub fn notify(&self, signal: LifecycleSignal) {
        self.tx.send_replace(signal);
    }

    /// Application moved to the foreground
    pub fn active(&self) {
        self.notify(LifecycleSignal::Active);
    }

    /// Application moved to the background
    pub fn inactive(&self) {
        self.notify(LifecycleSignal::Inactive);
    }
}

/// Receiving half, handed to [`crate::RouterBuilder::lifecycle`]
#[derive(Debug)]
pub struct LifecycleSignals {
    rx: watch::Receiver<LifecycleSignal>,
}

impl LifecycleSignals {
    /// Latest signal, marking it seen
    pub(crate) fn current(&mut self) -> LifecycleSignal {
        *self.rx.borrow_and_update()
    }

    /// Wait for the next signal; `None` once the notifier is dropped
    pub(crate) async fn changed(&mut self) -> Option<LifecycleSignal> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }
}
