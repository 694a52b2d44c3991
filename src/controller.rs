//! Board view state and event dispatch.
//!
//! The controller owns what the board view would otherwise scatter across
//! components: the active project, the filter, and the selected ticket.

use std::sync::Arc;

use crate::board::{Board, project_store};
use crate::coordinator::{FetchCoordinator, MutationOutcome, RefreshOutcome};
use crate::drag::{DragRelease, DragTransitionHandler, DropOutcome};
use crate::error::Result;
use crate::filter::{FilterChange, TicketFilter};
use crate::policy::{Affordances, can_assign_self, can_reassign};
use crate::service::TicketService;
use crate::types::{Assignee, ProjectId, Ticket, TicketId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardEvent {
    FilterChanged(FilterChange),
    /// Refresh even if the query has not changed
    Reload,
    DragReleased(DragRelease),
    /// Open the detail view of a ticket
    Select(TicketId),
    CloseDetail,
    /// Assign the selected ticket to the session user
    AssignToMe,
    /// Assign the selected ticket to someone else, or unassign it
    Reassign(Option<Assignee>),
}

#[derive(Debug)]
pub enum EventOutcome {
    Refreshed(RefreshOutcome),
    Dropped(DropOutcome),
    Mutated(MutationOutcome),
    SelectionChanged(Option<TicketId>),
    /// The role gate hides this action; nothing was sent
    NotPermitted,
    /// The event needs a selected ticket and there is none
    NoSelection,
}

pub struct BoardController<S> {
    coordinator: Arc<FetchCoordinator<S>>,
    drag: DragTransitionHandler<S>,
    project: ProjectId,
    filter: TicketFilter,
    selected: Option<TicketId>,
}

impl<S: TicketService + 'static> BoardController<S> {
    pub fn new(coordinator: Arc<FetchCoordinator<S>>, project: ProjectId) -> Self {
        Self {
            drag: DragTransitionHandler::new(Arc::clone(&coordinator)),
            coordinator,
            project,
            filter: TicketFilter::new(),
            selected: None,
        }
    }

    pub fn with_filter(mut self, filter: TicketFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn project(&self) -> ProjectId {
        self.project
    }

    pub fn filter(&self) -> &TicketFilter {
        &self.filter
    }

    pub fn coordinator(&self) -> &Arc<FetchCoordinator<S>> {
        &self.coordinator
    }

    /// Initial load of the board
    pub async fn load(&self) -> Result<RefreshOutcome> {
        self.coordinator.refresh(self.project, &self.filter).await
    }

    /// Show another project. The filter is kept; the selection is cleared.
    pub async fn switch_project(&mut self, project: ProjectId) -> Result<RefreshOutcome> {
        self.project = project;
        self.selected = None;
        self.load().await
    }

    pub fn board(&self) -> Board {
        project_store(self.coordinator.store())
    }

    /// The selected ticket, if it is still in the store
    pub fn selected_ticket(&self) -> Option<Ticket> {
        self.selected.and_then(|id| self.coordinator.store().get(id))
    }

    pub fn affordances(&self) -> Affordances {
        match self.selected_ticket() {
            Some(ticket) => {
                let user = self.coordinator.session().current_user();
                Affordances::for_ticket(user.as_ref(), &ticket)
            }
            None => Affordances::none(),
        }
    }

    pub async fn handle(&mut self, event: BoardEvent) -> Result<EventOutcome> {
        match event {
            BoardEvent::FilterChanged(change) => {
                self.filter.apply(&change)?;
                let outcome = self
                    .coordinator
                    .refresh_if_changed(self.project, &self.filter)
                    .await?;
                Ok(EventOutcome::Refreshed(outcome))
            }
            BoardEvent::Reload => Ok(EventOutcome::Refreshed(self.load().await?)),
            BoardEvent::DragReleased(release) => {
                Ok(EventOutcome::Dropped(self.drag.on_drop(release)))
            }
            BoardEvent::Select(id) => {
                self.selected = Some(id);
                Ok(EventOutcome::SelectionChanged(self.selected))
            }
            BoardEvent::CloseDetail => {
                self.selected = None;
                Ok(EventOutcome::SelectionChanged(None))
            }
            BoardEvent::AssignToMe => {
                let Some(ticket) = self.selected_ticket() else {
                    return Ok(EventOutcome::NoSelection);
                };
                let user = self.coordinator.session().current_user();
                let Some(me) = user.as_ref().filter(|u| can_assign_self(Some(*u), &ticket)) else {
                    return Ok(EventOutcome::NotPermitted);
                };
                let outcome = self
                    .coordinator
                    .mutate_assignee(ticket.id, Some(me.as_assignee()))
                    .await?;
                Ok(EventOutcome::Mutated(outcome))
            }
            BoardEvent::Reassign(assignee) => {
                let Some(ticket) = self.selected_ticket() else {
                    return Ok(EventOutcome::NoSelection);
                };
                let user = self.coordinator.session().current_user();
                if !can_reassign(user.as_ref()) {
                    return Ok(EventOutcome::NotPermitted);
                }
                let outcome = self.coordinator.mutate_assignee(ticket.id, assignee).await?;
                Ok(EventOutcome::Mutated(outcome))
            }
        }
    }
}
