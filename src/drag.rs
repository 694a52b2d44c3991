//! Turns drag releases into status mutations.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::board::parse_column_id;
use crate::coordinator::{FetchCoordinator, MutationOutcome};
use crate::error::{Result, TaskboardError};
use crate::service::TicketService;
use crate::types::TicketId;

/// A drag-release event from the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragRelease {
    pub ticket_id: TicketId,
    /// Column identifier under the pointer, if any
    pub destination: Option<String>,
}

impl DragRelease {
    pub fn new(ticket_id: TicketId, destination: impl Into<String>) -> Self {
        Self {
            ticket_id,
            destination: Some(destination.into()),
        }
    }

    /// Released outside every column
    pub fn outside(ticket_id: TicketId) -> Self {
        Self {
            ticket_id,
            destination: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    NoDestination,
    UnknownColumn,
    /// Removed from the store, e.g. by a concurrent refresh
    TicketNotFound,
    SameColumn,
}

#[derive(Debug)]
pub enum DropOutcome {
    /// The store already shows the new status; the handle resolves when the
    /// service has answered and any rollback has been applied.
    Dispatched(JoinHandle<Result<MutationOutcome>>),
    Ignored(IgnoreReason),
    /// The mutation could not be started
    Rejected(TaskboardError),
}

impl DropOutcome {
    pub fn is_dispatched(&self) -> bool {
        matches!(self, DropOutcome::Dispatched(_))
    }
}

pub struct DragTransitionHandler<S> {
    coordinator: Arc<FetchCoordinator<S>>,
}

impl<S> Clone for DragTransitionHandler<S> {
    fn clone(&self) -> Self {
        Self {
            coordinator: Arc::clone(&self.coordinator),
        }
    }
}

impl<S: TicketService + 'static> DragTransitionHandler<S> {
    pub fn new(coordinator: Arc<FetchCoordinator<S>>) -> Self {
        Self { coordinator }
    }

    /// Handle a drop. Returns as soon as the optimistic update is in the
    /// store; the request runs on a spawned task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn on_drop(&self, release: DragRelease) -> DropOutcome {
        let Some(column) = release.destination.as_deref() else {
            return DropOutcome::Ignored(IgnoreReason::NoDestination);
        };
        let Ok(status) = parse_column_id(column) else {
            tracing::debug!(column, "drop on unknown column ignored");
            return DropOutcome::Ignored(IgnoreReason::UnknownColumn);
        };

        let id = release.ticket_id;
        match self.coordinator.store().status_of(id) {
            None => return DropOutcome::Ignored(IgnoreReason::TicketNotFound),
            Some(current) if current == status => {
                return DropOutcome::Ignored(IgnoreReason::SameColumn);
            }
            Some(_) => {}
        }

        let pending = match self.coordinator.stage_status(id, status) {
            Ok(Some(pending)) => pending,
            Ok(None) => return DropOutcome::Ignored(IgnoreReason::TicketNotFound),
            Err(e) => return DropOutcome::Rejected(e),
        };

        let coordinator = Arc::clone(&self.coordinator);
        DropOutcome::Dispatched(tokio::spawn(async move {
            coordinator.commit_status(pending).await
        }))
    }
}
