//! Pause/stop control state shared between the worker and command threads.
//!
//! Both flags live under a single mutex, with a condvar for pause wakeups:
//!
//! - **Pause** is reversible. The worker blocks in [`ControlState::wait_while_paused`]
//!   at its checkpoints; clearing the flag notifies the condvar.
//! - **Stop** is one-way. Once set it is never cleared, and every checkpoint
//!   exits at its next opportunity. The wait loop uses a bounded timeout so a
//!   stop requested *while paused* is still observed within one poll
//!   interval, without needing a dedicated wakeup for stop.
//!
//! The raw flags are never exposed; all access goes through this interface.

use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// Poll interval for the pause wait loop.
pub const PAUSE_POLL: Duration = Duration::from_millis(200);

#[derive(Debug, Default)]
struct Flags {
    stop: bool,
    paused: bool,
}

/// Mutex-guarded pause/stop flags with a condvar-backed pause gate.
#[derive(Debug, Default)]
pub struct ControlState {
    flags: Mutex<Flags>,
    unpaused: Condvar,
}

impl ControlState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a graceful stop. One-way: there is no way to clear it.
    ///
    /// Also wakes a paused worker so the stop is observed promptly.
    pub fn request_stop(&self) {
        let mut flags = self.flags.lock().unwrap();
        flags.stop = true;
        self.unpaused.notify_all();
    }

    pub fn stop_requested(&self) -> bool {
        self.flags.lock().unwrap().stop
    }

    /// Set or clear the pause flag. Clearing wakes the worker.
    pub fn set_paused(&self, paused: bool) {
        let mut flags = self.flags.lock().unwrap();
        flags.paused = paused;
        if !paused {
            self.unpaused.notify_all();
        }
    }

    pub fn is_paused(&self) -> bool {
        self.flags.lock().unwrap().paused
    }

    /// Block while paused and not stopped, waking on unpause or every
    /// `poll` as a stop backstop.
    pub fn wait_while_paused(&self, poll: Duration) {
        let mut flags = self.flags.lock().unwrap();
        while flags.paused && !flags.stop {
            let (guard, _timeout) = self.unpaused.wait_timeout(flags, poll).unwrap();
            flags = guard;
        }
    }

    /// Worker checkpoint: honor a pending pause, then report whether the
    /// loop should keep going. `false` means a stop was requested.
    pub fn checkpoint(&self) -> bool {
        self.wait_while_paused(PAUSE_POLL);
        !self.stop_requested()
    }
}
