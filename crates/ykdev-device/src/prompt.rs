//! Touch-prompt reminder timer.
//!
//! Some device operations block until the user touches the key. The
//! [`TouchPrompt`] fires a reminder once after a fixed delay so the user
//! knows why nothing is happening, and is cancelled when the operation
//! completes first. Purely cosmetic: device state never depends on it.

use std::time::Duration;
use tokio::task::JoinHandle;

/// Delay before the reminder fires.
pub const DEFAULT_TOUCH_PROMPT_DELAY: Duration = Duration::from_millis(500);

/// One-shot background reminder, cancelled on drop.
///
/// # Examples
///
/// ```no_run
/// use ykdev_device::TouchPrompt;
///
/// # async fn wait_for_touch() {}
/// # async fn example() {
/// let prompt = TouchPrompt::spawn();
/// wait_for_touch().await;
/// drop(prompt); // operation finished; reminder (if pending) is cancelled
/// # }
/// ```
#[derive(Debug)]
pub struct TouchPrompt {
    task: JoinHandle<()>,
}

impl TouchPrompt {
    /// Spawn a reminder printing to stderr after the default delay.
    #[must_use]
    pub fn spawn() -> Self {
        Self::spawn_after(DEFAULT_TOUCH_PROMPT_DELAY)
    }

    /// Spawn a reminder printing to stderr after `delay`.
    #[must_use]
    pub fn spawn_after(delay: Duration) -> Self {
        Self::spawn_with(delay, || {
            eprintln!("Touch your YubiKey...");
        })
    }

    /// Spawn a reminder running `remind` after `delay`.
    #[must_use]
    pub fn spawn_with<F>(delay: Duration, remind: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            remind();
        });
        TouchPrompt { task }
    }

    /// Cancel the reminder if it has not fired yet.
    pub fn cancel(&self) {
        self.task.abort();
    }
}

impl Drop for TouchPrompt {
    fn drop(&mut self) {
        self.task.abort();
    }
}
