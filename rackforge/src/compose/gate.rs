//! One-shot broadcast gate.
//!
//! A section's overlay pastes must all wait for the moment the base
//! image lands on the canvas. That is a single-fire broadcast event:
//! every current waiter unblocks when the gate opens, and waiters that
//! arrive after it opened pass straight through.

use tokio::sync::watch;

/// Single-fire, multi-waiter gate.
pub struct Gate {
    tx: watch::Sender<bool>,
}

impl Gate {
    /// Creates a closed gate.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Opens the gate. Idempotent; every waiter unblocks exactly once.
    pub fn open(&self) {
        self.tx.send_replace(true);
    }

    /// True once [`open`](Self::open) has been called.
    pub fn is_open(&self) -> bool {
        *self.tx.borrow()
    }

    /// A handle that can wait for the gate to open.
    pub fn waiter(&self) -> GateWaiter {
        GateWaiter {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}

/// Waiting side of a [`Gate`].
pub struct GateWaiter {
    rx: watch::Receiver<bool>,
}

impl GateWaiter {
    /// Waits until the gate opens. Returns `false` if the gate was
    /// dropped while still closed (the opening stage failed).
    pub async fn wait(mut self) -> bool {
        self.rx.wait_for(|open| *open).await.is_ok()
    }
}
