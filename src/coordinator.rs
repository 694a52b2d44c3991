//! Fetch coordinator: sequences remote calls against the ticket store.
//!
//! Refreshes replace the store wholesale, but only when the response belongs
//! to the most recently issued refresh. Mutations update the store first and
//! talk to the service second; a failed request is rolled back through the
//! per-dimension [`MutationLedger`] so that it can only undo its own write.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::error::{Result, TaskboardError};
use crate::filter::TicketFilter;
use crate::ledger::{MutationLedger, RefreshSequencer, Settlement};
use crate::service::{TicketPatch, TicketService};
use crate::session::{Credential, SessionContext};
use crate::store::TicketStore;
use crate::types::{Assignee, ProjectId, Ticket, TicketId, TicketStatus};

const NOTICE_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The store now holds `count` tickets from this response
    Applied { count: usize },
    /// A newer refresh was issued before this one completed
    Stale,
    /// The same query is already current; no request was made
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    Confirmed,
    /// The ticket no longer exists, locally or on the server
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Warning,
    Error,
}

/// A user-visible, non-fatal failure report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// A mutation whose optimistic value is already in the store and whose
/// request has not been sent yet. Every staged mutation must be committed,
/// or its ledger entry keeps the optimistic value alive.
#[derive(Debug)]
pub(crate) struct PendingMutation<V> {
    ticket: TicketId,
    seq: u64,
    value: V,
    credential: Credential,
}

pub struct FetchCoordinator<S> {
    service: S,
    store: Arc<TicketStore>,
    session: SessionContext,
    refreshes: Mutex<RefreshSequencer>,
    statuses: Mutex<MutationLedger<TicketStatus>>,
    assignees: Mutex<MutationLedger<Option<Assignee>>>,
    notices: broadcast::Sender<Notice>,
}

impl<S: TicketService> FetchCoordinator<S> {
    pub fn new(service: S, store: Arc<TicketStore>, session: SessionContext) -> Self {
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        Self {
            service,
            store,
            session,
            refreshes: Mutex::new(RefreshSequencer::new()),
            statuses: Mutex::new(MutationLedger::new()),
            assignees: Mutex::new(MutationLedger::new()),
            notices,
        }
    }

    pub fn store(&self) -> &Arc<TicketStore> {
        &self.store
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    /// Fetch the tickets of `project` matching `filter` and replace the store.
    ///
    /// A failed refresh leaves the store as it was.
    pub async fn refresh(
        &self,
        project: ProjectId,
        filter: &TicketFilter,
    ) -> Result<RefreshOutcome> {
        let credential = self.credential()?;
        let query = filter.to_query();
        let seq = self.refreshes.lock().issue(project, query.clone());
        let marks = (
            self.statuses.lock().watermark(),
            self.assignees.lock().watermark(),
        );
        tracing::debug!(seq, %project, query = %query.to_query_string(), "refresh issued");

        let result = self.service.list_tickets(project, &query, &credential).await;

        let mut refreshes = self.refreshes.lock();
        if !refreshes.is_latest(seq) {
            tracing::debug!(seq, "discarding stale refresh response");
            return Ok(RefreshOutcome::Stale);
        }

        match result {
            Ok(tickets) => {
                let count = tickets.len();
                self.apply_refresh(tickets, marks);
                refreshes.mark_applied(seq);
                tracing::info!(seq, %project, count, "refresh applied");
                Ok(RefreshOutcome::Applied { count })
            }
            Err(e) => {
                refreshes.mark_failed(seq);
                drop(refreshes);
                tracing::warn!(seq, %project, error = %e, "refresh failed, keeping current board");
                self.notify(Notice::warning(format!("Could not load tickets: {e}")));
                Err(e)
            }
        }
    }

    /// Refresh unless the same project and query are already current.
    pub async fn refresh_if_changed(
        &self,
        project: ProjectId,
        filter: &TicketFilter,
    ) -> Result<RefreshOutcome> {
        let current = self.refreshes.lock().is_current(project, &filter.to_query());
        if current {
            return Ok(RefreshOutcome::Unchanged);
        }
        self.refresh(project, filter).await
    }

    /// Apply `status` to the store and register the request that will
    /// confirm it. Returns `None` when the ticket is not in the store.
    pub(crate) fn stage_status(
        &self,
        id: TicketId,
        status: TicketStatus,
    ) -> Result<Option<PendingMutation<TicketStatus>>> {
        let credential = self.credential()?;
        let mut ledger = self.statuses.lock();
        let Some(previous) = self.store.apply_status(id, status) else {
            return Ok(None);
        };
        let seq = ledger.begin(id, previous, status);
        tracing::debug!(ticket = %id, seq, from = %previous, to = %status, "status staged");

        Ok(Some(PendingMutation {
            ticket: id,
            seq,
            value: status,
            credential,
        }))
    }

    pub(crate) async fn commit_status(
        &self,
        pending: PendingMutation<TicketStatus>,
    ) -> Result<MutationOutcome> {
        let patch = TicketPatch::status(pending.value);
        self.settle(&self.statuses, pending, patch, revert_status, "move")
            .await
    }

    /// Optimistically set the status of `id` and confirm it with the service.
    pub async fn mutate_status(
        &self,
        id: TicketId,
        status: TicketStatus,
    ) -> Result<MutationOutcome> {
        match self.stage_status(id, status)? {
            Some(pending) => self.commit_status(pending).await,
            None => Ok(MutationOutcome::NotFound),
        }
    }

    pub(crate) fn stage_assignee(
        &self,
        id: TicketId,
        assignee: Option<Assignee>,
    ) -> Result<Option<PendingMutation<Option<Assignee>>>> {
        let credential = self.credential()?;
        let mut ledger = self.assignees.lock();
        let Some(previous) = self.store.apply_assignee(id, assignee.clone()) else {
            return Ok(None);
        };
        let seq = ledger.begin(id, previous, assignee.clone());
        tracing::debug!(
            ticket = %id,
            seq,
            assignee = ?assignee.as_ref().map(|a| a.id),
            "assignee staged"
        );

        Ok(Some(PendingMutation {
            ticket: id,
            seq,
            value: assignee,
            credential,
        }))
    }

    pub(crate) async fn commit_assignee(
        &self,
        pending: PendingMutation<Option<Assignee>>,
    ) -> Result<MutationOutcome> {
        let patch = TicketPatch::assignee(pending.value.as_ref());
        self.settle(&self.assignees, pending, patch, revert_assignee, "reassign")
            .await
    }

    /// Optimistically set the assignee of `id`; `None` unassigns.
    pub async fn mutate_assignee(
        &self,
        id: TicketId,
        assignee: Option<Assignee>,
    ) -> Result<MutationOutcome> {
        match self.stage_assignee(id, assignee)? {
            Some(pending) => self.commit_assignee(pending).await,
            None => Ok(MutationOutcome::NotFound),
        }
    }

    async fn settle<V: Clone>(
        &self,
        ledger: &Mutex<MutationLedger<V>>,
        pending: PendingMutation<V>,
        patch: TicketPatch,
        revert: fn(&TicketStore, TicketId, V),
        action: &str,
    ) -> Result<MutationOutcome> {
        let PendingMutation {
            ticket,
            seq,
            value,
            credential,
        } = pending;

        let result = self.service.patch_ticket(ticket, &patch, &credential).await;

        let reverted = {
            let mut ledger = ledger.lock();
            match ledger.resolve(ticket, seq, value, result.is_ok()) {
                Settlement::Revert(previous) => {
                    revert(&self.store, ticket, previous);
                    true
                }
                Settlement::Keep => false,
            }
        };

        match result {
            Ok(_) => {
                tracing::debug!(%ticket, seq, reverted, "mutation confirmed");
                Ok(MutationOutcome::Confirmed)
            }
            Err(TaskboardError::TicketNotFound(_)) => {
                tracing::debug!(%ticket, seq, "ticket vanished before the mutation resolved");
                Ok(MutationOutcome::NotFound)
            }
            Err(e) => {
                tracing::warn!(%ticket, seq, reverted, error = %e, "mutation failed");
                self.notify(Notice::error(format!("Could not {action} ticket #{ticket}: {e}")));
                Err(e)
            }
        }
    }

    /// Replace the store with a list response, then write back every value
    /// the response cannot know about yet: optimistic values still in flight
    /// and values confirmed after the list was requested.
    fn apply_refresh(&self, tickets: Vec<Ticket>, (status_mark, assignee_mark): (u64, u64)) {
        let mut statuses = self.statuses.lock();
        let mut assignees = self.assignees.lock();
        self.store.replace_all(tickets);

        for (id, status) in statuses.overlay(status_mark) {
            tracing::debug!(ticket = %id, %status, "reapplying status over refresh");
            self.store.apply_status(id, status);
        }
        for (id, assignee) in assignees.overlay(assignee_mark) {
            tracing::debug!(ticket = %id, "reapplying assignee over refresh");
            self.store.apply_assignee(id, assignee);
        }
    }

    fn credential(&self) -> Result<Credential> {
        self.session
            .credential()
            .ok_or(TaskboardError::NotAuthenticated)
    }

    fn notify(&self, notice: Notice) {
        // No subscribers is fine.
        let _ = self.notices.send(notice);
    }
}

fn revert_status(store: &TicketStore, id: TicketId, status: TicketStatus) {
    store.apply_status(id, status);
}

fn revert_assignee(store: &TicketStore, id: TicketId, assignee: Option<Assignee>) {
    store.apply_assignee(id, assignee);
}
