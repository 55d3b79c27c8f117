//! Auto-reset wake signal for the render thread.

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

/// Binary event: any thread may raise it, the render thread consumes it.
///
/// Raising an already raised signal is a no-op, so a burst of
/// `SignalFrameReady` calls produces a single wake-up.
#[derive(Debug, Default)]
pub struct WakeSignal {
    raised: Mutex<bool>,
    cond: Condvar,
}

impl WakeSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signal(&self) {
        let mut raised = self.raised.lock();
        *raised = true;
        self.cond.notify_one();
    }

    /// Blocks until signalled or `timeout` elapses. Returns whether the signal
    /// was consumed; it is reset either way.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut raised = self.raised.lock();
        while !*raised {
            if self.cond.wait_until(&mut raised, deadline).timed_out() {
                break;
            }
        }
        std::mem::replace(&mut *raised, false)
    }

    #[cfg(test)]
    fn is_raised(&self) -> bool {
        *self.raised.lock()
    }
}
