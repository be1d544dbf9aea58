//! Two-phase optimistic updates.
//!
//! A client shows its own edits immediately, then learns from the store
//! whether each one stuck. [`Optimistic`] keeps the last confirmed value
//! plus an ordered queue of pending patches; the visible value is always
//! the base with every pending patch applied in order.
//!
//! On confirmation the store's value replaces the base (the store wins)
//! and the patch leaves the queue. On rejection the patch simply leaves
//! the queue. Either way the remaining patches are replayed on top, so the
//! view never depends on the order in which outcomes arrive.

use std::fmt;
use std::sync::Arc;

/// A local edit, replayable on any base value.
pub type Patch<T> = Arc<dyn Fn(&mut T) + Send + Sync>;

/// Identifier handed out by [`Optimistic::apply_local`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PatchId(u64);

impl fmt::Display for PatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "patch-{}", self.0)
    }
}

pub struct PendingPatch<T> {
    pub id: PatchId,
    pub label: String,
    apply: Patch<T>,
}

impl<T> fmt::Debug for PendingPatch<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingPatch")
            .field("id", &self.id)
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

/// What the store said about a pending patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The write succeeded; this is the store's value afterwards.
    Confirmed(T),
    /// The write failed; discard the patch.
    Rejected,
}

/// Confirmed state plus queued local edits.
#[derive(Debug)]
pub struct Optimistic<T> {
    base: T,
    pending: Vec<PendingPatch<T>>,
    view: T,
    next_id: u64,
}

impl<T: Clone> Optimistic<T> {
    #[must_use]
    pub fn new(confirmed: T) -> Self {
        Self {
            view: confirmed.clone(),
            base: confirmed,
            pending: Vec::new(),
            next_id: 0,
        }
    }

    /// The last value the store confirmed.
    #[must_use]
    pub const fn confirmed(&self) -> &T {
        &self.base
    }

    /// What the user should see: base plus pending patches.
    #[must_use]
    pub const fn view(&self) -> &T {
        &self.view
    }

    #[must_use]
    pub fn pending(&self) -> &[PendingPatch<T>] {
        &self.pending
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Queue a local edit and return its id. The view updates immediately.
    pub fn apply_local<F>(&mut self, label: impl Into<String>, patch: F) -> PatchId
    where
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        let id = PatchId(self.next_id);
        self.next_id += 1;
        let apply: Patch<T> = Arc::new(patch);
        apply(&mut self.view);
        self.pending.push(PendingPatch {
            id,
            label: label.into(),
            apply,
        });
        id
    }

    /// Settle a pending patch. Returns `false` for an unknown or already
    /// settled id, in which case nothing changes.
    pub fn reconcile(&mut self, id: PatchId, outcome: Outcome<T>) -> bool {
        let Some(index) = self.pending.iter().position(|p| p.id == id) else {
            tracing::debug!(%id, "reconcile for unknown patch ignored");
            return false;
        };
        let settled = self.pending.remove(index);
        match outcome {
            Outcome::Confirmed(server) => {
                tracing::debug!(%id, label = %settled.label, "patch confirmed");
                self.base = server;
            }
            Outcome::Rejected => {
                tracing::debug!(%id, label = %settled.label, "patch rejected, reverting");
            }
        }
        self.rebuild_view();
        true
    }

    /// Replace the base with a fresh store read, keeping pending patches.
    pub fn refresh(&mut self, server: T) {
        self.base = server;
        self.rebuild_view();
    }

    fn rebuild_view(&mut self) {
        let mut view = self.base.clone();
        for patch in &self.pending {
            (patch.apply)(&mut view);
        }
        self.view = view;
    }
}
