//! Completion barrier for a known number of parties.
//!
//! A [`WaitGroup`] counts outstanding parties. Each party signals through a
//! [`Done`] handle; the single owner of the group awaits [`WaitGroup::wait`],
//! which resolves once the count reaches zero.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;

struct Inner {
    remaining: AtomicUsize,
    zero: Notify,
}

/// Waits for a number of parties to signal completion.
pub struct WaitGroup {
    inner: Arc<Inner>,
}

/// Handle used by a party to signal completion.
#[derive(Clone)]
pub struct Done {
    inner: Arc<Inner>,
}

impl WaitGroup {
    /// Create a group expecting `parties` completion signals
    pub fn new(parties: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                remaining: AtomicUsize::new(parties),
                zero: Notify::new(),
            }),
        }
    }

    /// Register `parties` more completion signals.
    pub fn add(&self, parties: usize) {
        self.inner.remaining.fetch_add(parties, Ordering::AcqRel);
    }

    /// Handle for signalling completion
    pub fn handle(&self) -> Done {
        Done {
            inner: self.inner.clone(),
        }
    }

    /// Number of parties that have not signalled yet
    pub fn pending(&self) -> usize {
        self.inner.remaining.load(Ordering::Acquire)
    }

    /// Wait until every registered party has signalled.
    pub async fn wait(self) {
        loop {
            if self.inner.remaining.load(Ordering::Acquire) == 0 {
                return;
            }
            // `notify_one` stores a permit, so a signal landing between the
            // load and this await is not lost.
            self.inner.zero.notified().await;
        }
    }
}

impl std::fmt::Debug for WaitGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaitGroup")
            .field("pending", &self.pending())
            .finish()
    }
}

impl Done {
    /// Signal that one party has completed.
    ///
    /// # Panics
    ///
    /// Panics if the group receives more signals than it has parties.
    pub fn done(&self) {
        let previous = self
            .inner
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        match previous {
            Ok(1) => self.inner.zero.notify_one(),
            Ok(_) => {}
            Err(_) => panic!("WaitGroup signalled more times than it has parties"),
        }
    }

    /// Signal completion when the returned guard is dropped.
    ///
    /// The signal fires exactly once, on normal exit or while unwinding.
    pub fn into_guard(self) -> DoneGuard {
        DoneGuard { done: self }
    }
}

/// Signals its [`Done`] handle on drop.
pub struct DoneGuard {
    done: Done,
}

impl Drop for DoneGuard {
    fn drop(&mut self) {
        self.done.done();
    }
}
