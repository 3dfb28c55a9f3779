//! One-shot cancellable shutoff timer

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Runs its action once, after a delay or as soon as it is cancelled
///
/// The action always runs exactly once: cancelling only brings it forward.
#[derive(Debug)]
pub struct ShutoffTimer {
    cancelled: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl ShutoffTimer {
    /// Spawn the timer thread
    pub fn schedule<F>(after: Duration, action: F) -> io::Result<Self>
    where
        F: FnOnce() + Send + 'static,
    {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);
        let handle = thread::Builder::new()
            .name("shutoff-timer".to_string())
            .spawn(move || {
                // a deadline past the clock's range only fires on cancel
                let deadline = Instant::now().checked_add(after);
                while !flag.load(Ordering::SeqCst) {
                    match deadline {
                        Some(deadline) => {
                            let now = Instant::now();
                            if now >= deadline {
                                break;
                            }
                            thread::park_timeout(deadline - now);
                        }
                        None => thread::park(),
                    }
                }
                action();
            })?;

        Ok(Self { cancelled, handle })
    }

    /// Whether the action has run and the thread exited
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Fire the action now and wait for it
    pub fn cancel(self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.handle.thread().unpark();
        self.join();
    }

    /// Wait for the timer to fire on its own
    pub fn join(self) {
        // a panicking action was already reported by the panic hook
        let _ = self.handle.join();
    }
}
