//! Bounded retry with exponential backoff for transient auth failures.

use std::thread;
use std::time::Duration;

use tracing::debug;

use crate::AuthError;

/// Maximum total attempts (first try plus retries).
pub const MAX_ATTEMPTS: u32 = 3;

/// Base backoff delay; attempt `n` waits `BACKOFF_BASE * 2^n`.
const BACKOFF_BASE: Duration = Duration::from_millis(400);

/// Run `op` up to [`MAX_ATTEMPTS`] times, backing off exponentially between
/// attempts.
///
/// Only failures classified transient by [`AuthError::is_transient`] are
/// retried; any other error is returned to the caller immediately.
///
/// # Errors
///
/// Returns the last error once attempts are exhausted, or the first
/// terminal error.
pub fn with_retry<T, F>(op: F) -> Result<T, AuthError>
where
    F: FnMut() -> Result<T, AuthError>,
{
    retry_with_backoff(BACKOFF_BASE, op)
}

/// Retry with a caller-supplied base delay. Split out so tests can use a
/// near-zero delay.
pub(crate) fn retry_with_backoff<T, F>(base: Duration, mut op: F) -> Result<T, AuthError>
where
    F: FnMut() -> Result<T, AuthError>,
{
    let mut attempt = 0u32;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt + 1 < MAX_ATTEMPTS => {
                let delay = base * 2u32.pow(attempt);
                debug!(
                    "transient auth failure on attempt {}: {e}; retrying in {delay:?}",
                    attempt + 1
                );
                thread::sleep(delay);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
