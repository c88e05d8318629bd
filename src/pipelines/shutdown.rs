// SPDX-License-Identifier: GPL-3.0-only

//! Shutdown coordination between the run loop and the rest of the process
//!
//! The coordinator carries the "exit requested" flag polled by the runner
//! before every iteration, cancel hooks that unblock pending transport reads,
//! and a completion signal raised once the runner has closed every stage.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, OnceLock};
use std::time::Duration;
use tracing::{debug, info};

/// Closure run once when shutdown is first requested
pub type CancelHook = Box<dyn Fn() + Send + Sync>;

/// Identifies a registered cancel hook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HookId(u64);

static GLOBAL: OnceLock<ShutdownCoordinator> = OnceLock::new();

struct Inner {
    exit_requested: AtomicBool,
    next_hook: AtomicU64,
    hooks: Mutex<Vec<(HookId, CancelHook)>>,
    closed: Mutex<bool>,
    closed_cv: Condvar,
}

/// Shared shutdown flag and completion signal
///
/// Cloning is cheap; all clones observe the same flag. Once set, the flag is
/// never cleared.
#[derive(Clone)]
pub struct ShutdownCoordinator {
    inner: Arc<Inner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // The guarded data stays consistent even if a hook panicked
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ShutdownCoordinator {
    /// Create an independent coordinator
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                exit_requested: AtomicBool::new(false),
                next_hook: AtomicU64::new(0),
                hooks: Mutex::new(Vec::new()),
                closed: Mutex::new(false),
                closed_cv: Condvar::new(),
            }),
        }
    }

    /// The process-wide coordinator
    pub fn global() -> &'static ShutdownCoordinator {
        GLOBAL.get_or_init(ShutdownCoordinator::new)
    }

    /// Set the exit flag and run cancel hooks
    ///
    /// Returns true if this call was the one that set the flag.
    pub fn request_shutdown(&self) -> bool {
        if self.inner.exit_requested.swap(true, Ordering::SeqCst) {
            return false;
        }
        info!("Shutdown requested");

        let hooks: Vec<_> = lock(&self.inner.hooks).drain(..).collect();
        debug!(count = hooks.len(), "Running cancel hooks");
        for (_, hook) in hooks {
            hook();
        }
        true
    }

    /// Check the exit flag
    pub fn is_shutdown_requested(&self) -> bool {
        self.inner.exit_requested.load(Ordering::SeqCst)
    }

    /// Register a hook run when shutdown is requested
    ///
    /// If shutdown was already requested the hook runs immediately.
    pub fn register_cancel_hook<F>(&self, hook: F) -> HookId
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = HookId(self.inner.next_hook.fetch_add(1, Ordering::Relaxed));
        {
            let mut hooks = lock(&self.inner.hooks);
            if !self.is_shutdown_requested() {
                hooks.push((id, Box::new(hook)));
                return id;
            }
        }
        hook();
        id
    }

    /// Remove a hook that is no longer needed
    pub fn remove_cancel_hook(&self, id: HookId) {
        lock(&self.inner.hooks).retain(|(hook_id, _)| *hook_id != id);
    }

    /// Number of hooks still registered
    pub fn pending_hooks(&self) -> usize {
        lock(&self.inner.hooks).len()
    }

    /// Signal that the runner reached its terminal state
    pub fn mark_closed(&self) {
        let mut closed = lock(&self.inner.closed);
        *closed = true;
        self.inner.closed_cv.notify_all();
    }

    /// Check whether the runner has closed
    pub fn is_closed(&self) -> bool {
        *lock(&self.inner.closed)
    }

    /// Block until the runner closes, or the timeout elapses
    ///
    /// Returns true if the runner closed.
    pub fn wait_closed(&self, timeout: Option<Duration>) -> bool {
        let closed = lock(&self.inner.closed);
        match timeout {
            Some(timeout) => {
                let (closed, _) = self
                    .inner
                    .closed_cv
                    .wait_timeout_while(closed, timeout, |closed| !*closed)
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                *closed
            }
            None => {
                let closed = self
                    .inner
                    .closed_cv
                    .wait_while(closed, |closed| !*closed)
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                *closed
            }
        }
    }

    /// Request shutdown on Ctrl+C
    pub fn install_ctrlc_handler(&self) -> Result<(), ctrlc::Error> {
        let coordinator = self.clone();
        ctrlc::set_handler(move || {
            coordinator.request_shutdown();
        })
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ShutdownCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownCoordinator")
            .field("exit_requested", &self.is_shutdown_requested())
            .field("closed", &self.is_closed())
            .finish()
    }
}
