//! Ordered teardown for controller disposal
//!
//! Actions run in reverse order of registration, each exactly once.

use std::fmt;

type TeardownAction = Box<dyn FnOnce() + Send>;

/// Stack of release actions drained by `dispose`.
#[derive(Default)]
pub struct TeardownStack {
    actions: Vec<(&'static str, TeardownAction)>,
    disposed: bool,
}

impl TeardownStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action to run at disposal.
    pub fn push(&mut self, label: &'static str, action: impl FnOnce() + Send + 'static) {
        self.actions.push((label, Box::new(action)));
    }

    /// Take every pending action, last registered first, and mark the stack
    /// disposed. Returns an empty list on later calls.
    ///
    /// The actions are returned rather than run so the caller can release
    /// its own locks first.
    pub fn drain(&mut self) -> Vec<(&'static str, TeardownAction)> {
        self.disposed = true;
        let mut actions = std::mem::take(&mut self.actions);
        actions.reverse();
        actions
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl fmt::Debug for TeardownStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let labels: Vec<_> = self.actions.iter().map(|(label, _)| *label).collect();
        f.debug_struct("TeardownStack")
            .field("actions", &labels)
            .field("disposed", &self.disposed)
            .finish()
    }
}
