use std::collections::HashSet;

use docdesk_core::{Project, UploadedFile};

/// Resources the reconciler can track. The key is the server-issued id.
pub trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for UploadedFile {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for Project {
    fn key(&self) -> &str {
        &self.id
    }
}

/// Identifies one lifetime of a parent scope; changes on every `reset_scope`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeToken {
    generation: u64,
}

/// Handed out when a refetch is issued and presented back with its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    scope: ScopeToken,
    sequence: u64,
}

impl FetchTicket {
    pub fn scope(&self) -> ScopeToken {
        self.scope
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotOutcome {
    Applied,
    /// The scope changed while the fetch was in flight.
    StaleScope,
    /// A later-issued fetch has already been applied.
    Superseded,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingCounts {
    pub inserts: usize,
    pub deletes: usize,
}

/// Merges the last server snapshot for one parent scope with optimistic
/// inserts and deletes that the server has not confirmed yet.
///
/// Visible order is snapshot order followed by pending inserts in the order
/// they were begun. The first copy of an id wins, so a refreshed snapshot
/// replaces the optimistic copy in place. A pending delete hides an id no
/// matter where else it appears.
#[derive(Debug, Clone)]
pub struct ListReconciler<R> {
    scope: Option<String>,
    generation: u64,
    snapshot: Vec<R>,
    pending_inserts: Vec<R>,
    pending_deletes: HashSet<String>,
    next_fetch: u64,
    applied_fetch: Option<u64>,
}

impl<R> Default for ListReconciler<R> {
    fn default() -> Self {
        Self {
            scope: None,
            generation: 0,
            snapshot: Vec::new(),
            pending_inserts: Vec::new(),
            pending_deletes: HashSet::new(),
            next_fetch: 0,
            applied_fetch: None,
        }
    }
}

impl<R: Keyed + Clone> ListReconciler<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_scope(parent_id: impl Into<String>) -> Self {
        let mut reconciler = Self::default();
        reconciler.reset_scope(parent_id);
        reconciler
    }

    pub fn visible(&self) -> Vec<R> {
        let mut seen = HashSet::new();
        self.snapshot
            .iter()
            .chain(self.pending_inserts.iter())
            .filter(|resource| !self.pending_deletes.contains(resource.key()))
            .filter(|resource| seen.insert(resource.key()))
            .cloned()
            .collect()
    }

    /// Replaces the snapshot wholesale.
    ///
    /// Pending state is kept except where the new snapshot settles it: an
    /// optimistic insert the server now lists, or a delete for an id the
    /// server no longer lists.
    pub fn on_snapshot_loaded(&mut self, resources: Vec<R>) {
        {
            let listed: HashSet<&str> = resources.iter().map(Keyed::key).collect();
            self.pending_inserts
                .retain(|resource| !listed.contains(resource.key()));
            let inserts = &self.pending_inserts;
            self.pending_deletes.retain(|id| {
                listed.contains(id.as_str()) || inserts.iter().any(|resource| resource.key() == id)
            });
        }
        tracing::debug!(
            scope = self.scope.as_deref().unwrap_or("-"),
            listed = resources.len(),
            pending_inserts = self.pending_inserts.len(),
            pending_deletes = self.pending_deletes.len(),
            "snapshot loaded"
        );
        self.snapshot = resources;
    }

    pub fn begin_insert(&mut self, resource: R) {
        tracing::debug!(id = resource.key(), "optimistic insert");
        match self
            .pending_inserts
            .iter_mut()
            .find(|pending| pending.key() == resource.key())
        {
            Some(existing) => *existing = resource,
            None => self.pending_inserts.push(resource),
        }
    }

    /// Returns `true` when an optimistic insert was rolled back.
    pub fn confirm_insert_failed(&mut self, id: &str) -> bool {
        let before = self.pending_inserts.len();
        self.pending_inserts.retain(|pending| pending.key() != id);
        let removed = self.pending_inserts.len() != before;
        tracing::debug!(id, removed, "insert rolled back");
        removed
    }

    /// Returns `true` when the id was not already pending deletion.
    pub fn begin_delete(&mut self, id: &str) -> bool {
        tracing::debug!(id, "optimistic delete");
        self.pending_deletes.insert(id.to_string())
    }

    /// Returns `true` when a pending delete was rolled back.
    pub fn confirm_delete_failed(&mut self, id: &str) -> bool {
        let removed = self.pending_deletes.remove(id);
        tracing::debug!(id, removed, "delete rolled back");
        removed
    }

    pub fn reset_scope(&mut self, parent_id: impl Into<String>) -> ScopeToken {
        let parent_id = parent_id.into();
        tracing::debug!(
            from = self.scope.as_deref().unwrap_or("-"),
            to = parent_id.as_str(),
            "scope reset"
        );
        self.generation = self.generation.wrapping_add(1);
        self.scope = Some(parent_id);
        self.snapshot.clear();
        self.pending_inserts.clear();
        self.pending_deletes.clear();
        self.applied_fetch = None;
        self.scope_token()
    }

    pub fn scope(&self) -> Option<&str> {
        self.scope.as_deref()
    }

    pub fn scope_token(&self) -> ScopeToken {
        ScopeToken {
            generation: self.generation,
        }
    }

    pub fn is_current(&self, token: ScopeToken) -> bool {
        token == self.scope_token()
    }

    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.next_fetch += 1;
        FetchTicket {
            scope: self.scope_token(),
            sequence: self.next_fetch,
        }
    }

    pub fn apply_snapshot(&mut self, ticket: FetchTicket, resources: Vec<R>) -> SnapshotOutcome {
        if !self.is_current(ticket.scope) {
            tracing::debug!(sequence = ticket.sequence, "dropping snapshot for old scope");
            return SnapshotOutcome::StaleScope;
        }
        if self
            .applied_fetch
            .is_some_and(|applied| ticket.sequence < applied)
        {
            tracing::debug!(
                sequence = ticket.sequence,
                applied = self.applied_fetch,
                "dropping superseded snapshot"
            );
            return SnapshotOutcome::Superseded;
        }
        self.applied_fetch = Some(ticket.sequence);
        self.on_snapshot_loaded(resources);
        SnapshotOutcome::Applied
    }

    pub fn snapshot(&self) -> &[R] {
        &self.snapshot
    }

    pub fn is_pending_insert(&self, id: &str) -> bool {
        self.pending_inserts.iter().any(|pending| pending.key() == id)
    }

    pub fn is_pending_delete(&self, id: &str) -> bool {
        self.pending_deletes.contains(id)
    }

    pub fn pending_counts(&self) -> PendingCounts {
        PendingCounts {
            inserts: self.pending_inserts.len(),
            deletes: self.pending_deletes.len(),
        }
    }
}

#[cfg(test)]
#[path = "reconciler_tests.rs"]
mod tests;
