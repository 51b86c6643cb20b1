//! Debounced boolean signal.
//!
//! A raw change arms a deadline; the committed value only changes when the
//! deadline passes without the raw signal reverting.

use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Pending {
    value: bool,
    deadline_s: f64,
}

/// Boolean signal with a single pending transition.
#[derive(Debug, Clone)]
pub struct Debouncer {
    name: &'static str,
    committed: bool,
    pending: Option<Pending>,
}

impl Debouncer {
    pub fn new(name: &'static str, initial: bool) -> Self {
        Self {
            name,
            committed: initial,
            pending: None,
        }
    }

    /// Committed (debounced) value.
    pub fn value(&self) -> bool {
        self.committed
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Deadline of the pending transition, if any.
    pub fn deadline(&self) -> Option<f64> {
        self.pending.map(|p| p.deadline_s)
    }

    /// Feed a raw sample at `now_s`.
    ///
    /// Reverting to the committed value cancels the pending transition.
    /// A new differing value arms a timer of `window_ms`; repeating the value
    /// already pending leaves its deadline alone.
    pub fn set(&mut self, raw: bool, now_s: f64, window_ms: f64) {
        if raw == self.committed {
            if self.pending.take().is_some() {
                debug!("{}: reverted to {} before commit, cancelled", self.name, raw);
            }
            return;
        }
        if matches!(self.pending, Some(p) if p.value == raw) {
            return;
        }
        self.pending = Some(Pending {
            value: raw,
            deadline_s: now_s + window_ms.max(0.0) / 1000.0,
        });
    }

    /// Commit the pending value if its deadline has passed.
    pub fn poll(&mut self, now_s: f64) -> Option<bool> {
        let pending = self.pending?;
        if now_s < pending.deadline_s {
            return None;
        }
        self.pending = None;
        self.committed = pending.value;
        debug!("{}: committed {}", self.name, pending.value);
        Some(pending.value)
    }

    /// Set the committed value directly and drop any pending transition.
    pub fn force(&mut self, value: bool) {
        self.pending = None;
        self.committed = value;
    }
}
