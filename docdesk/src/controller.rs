use std::cell::RefCell;

use docdesk_core::ApiError;
use futures_util::future::join_all;
use thiserror::Error;

use crate::notify::NotificationSink;
use crate::reconciler::{Keyed, ListReconciler, PendingCounts, ScopeToken, SnapshotOutcome};
use crate::remote::RemoteCollection;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("no collection scope is open")]
    NoScope,
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Notification texts for one kind of collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Messages {
    pub created: &'static str,
    pub create_failed: &'static str,
    pub deleted: &'static str,
    pub delete_failed: &'static str,
    pub list_failed: &'static str,
}

impl Messages {
    pub const FILES: Messages = Messages {
        created: "File uploaded successfully",
        create_failed: "Failed to upload file",
        deleted: "File deleted successfully",
        delete_failed: "Failed to delete file",
        list_failed: "Failed to fetch files",
    };

    pub const PROJECTS: Messages = Messages {
        created: "Project created successfully",
        create_failed: "Failed to create project",
        deleted: "Project deleted successfully",
        delete_failed: "Failed to delete project",
        list_failed: "Failed to fetch projects",
    };
}

/// What the caller should do once a mutation settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Followup {
    /// Request a fresh snapshot for the current scope.
    Refetch,
    /// The scope changed while the call was in flight; nothing was applied.
    Discarded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationOutcome<T> {
    pub value: T,
    pub followup: Followup,
}

/// Runs user actions against one remote collection and keeps the visible
/// list in step through a [`ListReconciler`].
///
/// Borrows of the reconciler never span an await, so several actions for
/// the same scope may be in flight at once on one thread.
pub struct CollectionController<C: RemoteCollection, N> {
    remote: C,
    sink: N,
    messages: Messages,
    list: RefCell<ListReconciler<C::Item>>,
}

impl<C, N> CollectionController<C, N>
where
    C: RemoteCollection,
    N: NotificationSink,
{
    pub fn new(remote: C, sink: N, messages: Messages) -> Self {
        Self {
            remote,
            sink,
            messages,
            list: RefCell::new(ListReconciler::new()),
        }
    }

    pub fn remote(&self) -> &C {
        &self.remote
    }

    /// Switches to another parent scope, dropping all state of the old one.
    pub fn open(&self, parent_id: impl Into<String>) -> ScopeToken {
        self.list.borrow_mut().reset_scope(parent_id)
    }

    pub fn scope(&self) -> Option<String> {
        self.list.borrow().scope().map(str::to_string)
    }

    pub fn visible(&self) -> Vec<C::Item> {
        self.list.borrow().visible()
    }

    pub fn pending_counts(&self) -> PendingCounts {
        self.list.borrow().pending_counts()
    }

    pub fn is_current(&self, token: ScopeToken) -> bool {
        self.list.borrow().is_current(token)
    }

    pub async fn refresh(&self) -> Result<SnapshotOutcome, ControllerError> {
        let (ticket, parent_id) = {
            let mut list = self.list.borrow_mut();
            let parent_id = list.scope().ok_or(ControllerError::NoScope)?.to_string();
            (list.begin_fetch(), parent_id)
        };
        match self.remote.list(&parent_id).await {
            Ok(items) => {
                let outcome = self.list.borrow_mut().apply_snapshot(ticket, items);
                tracing::debug!(scope = parent_id.as_str(), ?outcome, "refresh settled");
                Ok(outcome)
            }
            Err(err) => {
                if self.is_current(ticket.scope()) {
                    self.report_failure(self.messages.list_failed, &err);
                }
                Err(err.into())
            }
        }
    }

    /// Create, show optimistically, then attach to the open scope.
    ///
    /// The resource becomes visible as soon as the create step returns its
    /// id. A failed attach removes it again. When the scope changes while
    /// the call is in flight the attach to the original parent still runs,
    /// but the new scope's list is left alone.
    pub async fn create(&self, draft: C::Draft) -> Result<MutationOutcome<C::Item>, ControllerError> {
        let (token, parent_id) = self.current_scope()?;

        let created = match self.remote.create(&parent_id, draft).await {
            Ok(created) => created,
            Err(err) => {
                self.report_failure(self.messages.create_failed, &err);
                return Err(err.into());
            }
        };
        let id = created.key().to_string();
        if self.is_current(token) {
            self.list.borrow_mut().begin_insert(created.clone());
        } else {
            tracing::info!(id = id.as_str(), "created after scope change, not shown");
        }

        if let Err(err) = self.remote.attach(&parent_id, &id).await {
            if self.is_current(token) {
                self.list.borrow_mut().confirm_insert_failed(&id);
            }
            self.report_failure(self.messages.create_failed, &err);
            return Err(err.into());
        }

        self.sink.notify_success(self.messages.created);
        Ok(MutationOutcome {
            value: created,
            followup: self.followup_for(token),
        })
    }

    /// Runs independent creates concurrently; results keep input order.
    pub async fn create_many(
        &self,
        drafts: Vec<C::Draft>,
    ) -> Vec<Result<MutationOutcome<C::Item>, ControllerError>> {
        join_all(drafts.into_iter().map(|draft| self.create(draft))).await
    }

    /// Hides the resource at once; restores it if the remote delete fails.
    ///
    /// A delete for an id that is already pending deletion does not reach
    /// the remote again.
    pub async fn delete(&self, id: &str) -> Result<MutationOutcome<()>, ControllerError> {
        let (token, _) = self.current_scope()?;
        if !self.list.borrow_mut().begin_delete(id) {
            tracing::debug!(id, "delete already in flight");
            return Ok(MutationOutcome {
                value: (),
                followup: Followup::Refetch,
            });
        }

        if let Err(err) = self.remote.delete(id).await {
            if self.is_current(token) {
                self.list.borrow_mut().confirm_delete_failed(id);
            }
            self.report_failure(self.messages.delete_failed, &err);
            return Err(err.into());
        }

        self.sink.notify_success(self.messages.deleted);
        Ok(MutationOutcome {
            value: (),
            followup: self.followup_for(token),
        })
    }

    fn current_scope(&self) -> Result<(ScopeToken, String), ControllerError> {
        let list = self.list.borrow();
        let parent_id = list.scope().ok_or(ControllerError::NoScope)?.to_string();
        Ok((list.scope_token(), parent_id))
    }

    fn followup_for(&self, token: ScopeToken) -> Followup {
        if self.is_current(token) {
            Followup::Refetch
        } else {
            Followup::Discarded
        }
    }

    fn report_failure(&self, summary: &str, err: &ApiError) {
        tracing::warn!(error = %err, "{summary}");
        self.sink
            .notify_failure(&format!("{summary}: {}", err.user_message()));
    }
}

/// `Refetch` when any of the settled mutations asks for it.
pub fn merged_followup<T>(
    results: &[Result<MutationOutcome<T>, ControllerError>],
) -> Option<Followup> {
    let mut followup = None;
    for outcome in results.iter().flatten() {
        match outcome.followup {
            Followup::Refetch => return Some(Followup::Refetch),
            Followup::Discarded => followup = Some(Followup::Discarded),
        }
    }
    followup
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
