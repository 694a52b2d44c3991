//! Ticket mutation commands.
//!
//! - `move`: drop a ticket onto a column
//! - `assign`: take, reassign or unassign a ticket

use owo_colors::OwoColorize;
use serde_json::json;

use super::{CommandOutput, colored_status, connect, resolve_project};
use crate::board::parse_column_id;
use crate::config::Config;
use crate::controller::{BoardController, BoardEvent, EventOutcome};
use crate::coordinator::MutationOutcome;
use crate::drag::{DragRelease, DragTransitionHandler, DropOutcome, IgnoreReason};
use crate::error::{Result, TaskboardError};
use crate::filter::TicketFilter;
use crate::types::{Assignee, TicketId, UserId};

/// Who `assign` should hand the ticket to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignTarget {
    Me,
    User(UserId),
    Unassign,
}

/// Move a ticket to another column
pub async fn cmd_move(
    ticket: TicketId,
    column: &str,
    project: Option<u64>,
    output_json: bool,
) -> Result<()> {
    let status = parse_column_id(column)?;
    let config = Config::load()?;
    let project = resolve_project(&config, project)?;
    let coordinator = connect(&config).await?;
    coordinator.refresh(project, &TicketFilter::new()).await?;

    let previous = coordinator.store().status_of(ticket);
    let handler = DragTransitionHandler::new(coordinator);

    let (changed, text) = match handler.on_drop(DragRelease::new(ticket, column)) {
        DropOutcome::Dispatched(handle) => {
            let outcome = handle
                .await
                .map_err(|e| TaskboardError::api(format!("mutation task failed: {e}")))??;
            if outcome == MutationOutcome::NotFound {
                return Err(TaskboardError::TicketNotFound(ticket));
            }
            let from = previous.map(colored_status).unwrap_or_default();
            (true, format!("Moved #{ticket} {from} -> {}", colored_status(status)))
        }
        DropOutcome::Ignored(IgnoreReason::SameColumn) => (
            false,
            format!("#{ticket} is already in {}", colored_status(status))
                .dimmed()
                .to_string(),
        ),
        DropOutcome::Ignored(IgnoreReason::TicketNotFound) => {
            return Err(TaskboardError::TicketNotFound(ticket));
        }
        DropOutcome::Ignored(_) => return Err(TaskboardError::InvalidColumn(column.to_string())),
        DropOutcome::Rejected(e) => return Err(e),
    };

    CommandOutput::new(json!({
        "action": "move",
        "ticket_id": ticket,
        "previous_status": previous,
        "status": status,
        "changed": changed,
    }))
    .with_text(text)
    .print(output_json)
}

/// Change who a ticket is assigned to
pub async fn cmd_assign(
    ticket: TicketId,
    target: AssignTarget,
    project: Option<u64>,
    output_json: bool,
) -> Result<()> {
    let config = Config::load()?;
    let project = resolve_project(&config, project)?;
    let coordinator = connect(&config).await?;

    let mut controller = BoardController::new(coordinator, project);
    controller.load().await?;
    controller.handle(BoardEvent::Select(ticket)).await?;
    if controller.selected_ticket().is_none() {
        return Err(TaskboardError::TicketNotFound(ticket));
    }

    let event = match target {
        AssignTarget::Me => BoardEvent::AssignToMe,
        AssignTarget::Unassign => BoardEvent::Reassign(None),
        AssignTarget::User(id) => {
            BoardEvent::Reassign(Some(known_assignee(&controller, id)))
        }
    };

    match controller.handle(event).await? {
        EventOutcome::Mutated(MutationOutcome::Confirmed) => {}
        EventOutcome::NotPermitted => {
            let role = controller
                .coordinator()
                .session()
                .current_user()
                .map(|u| u.role.to_string())
                .unwrap_or_else(|| "anonymous".to_string());
            return Err(TaskboardError::Forbidden(format!(
                "role '{role}' cannot make this assignment"
            )));
        }
        _ => return Err(TaskboardError::TicketNotFound(ticket)),
    }

    let assignee = controller.selected_ticket().and_then(|t| t.assignee);
    let text = match &assignee {
        Some(a) if !a.email.is_empty() => format!("Assigned #{ticket} to {}", a.email.cyan()),
        Some(a) => format!("Assigned #{ticket} to user {}", a.id.cyan()),
        None => format!("Unassigned #{ticket}"),
    };

    CommandOutput::new(json!({
        "action": "assign",
        "ticket_id": ticket,
        "assignee": assignee,
    }))
    .with_text(text)
    .print(output_json)
}

/// Reuse the denormalized fields of a user already seen on the board.
fn known_assignee<S>(controller: &BoardController<S>, id: UserId) -> Assignee
where
    S: crate::service::TicketService + 'static,
{
    controller
        .coordinator()
        .store()
        .with_tickets_ref(|tickets| {
            tickets
                .iter()
                .filter_map(|t| t.assignee.as_ref())
                .find(|a| a.id == id)
                .cloned()
        })
        .unwrap_or(Assignee {
            id,
            email: String::new(),
            role: None,
        })
}
