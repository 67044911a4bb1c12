//! Recurring snapshot timer.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

/// Handle to a running auto-backup timer.
///
/// Uses RAII - dropping the handle stops the timer automatically by
/// dropping the internal channel sender, which wakes the timer thread out
/// of its wait.
pub struct AutoBackupHandle {
    _shutdown: Option<mpsc::Sender<()>>,
}

impl AutoBackupHandle {
    /// Spawn a timer thread calling `tick` every `interval`.
    ///
    /// The first tick fires one full interval after the spawn, not
    /// immediately. The thread exits as soon as the handle is dropped.
    pub(crate) fn spawn<F>(interval: Duration, tick: F) -> Self
    where
        F: Fn() + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<()>();
        thread::spawn(move || {
            loop {
                match rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => tick(),
                    // Sender dropped: shut down
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        });
        Self { _shutdown: Some(tx) }
    }

    /// Stop the timer immediately (consumes the handle).
    pub fn stop(mut self) {
        self._shutdown.take();
    }
}
