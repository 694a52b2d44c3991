mod board;
mod config;
mod mutate;
mod whoami;

pub use board::{BoardOptions, cmd_board};
pub use config::{cmd_config_set, cmd_config_show};
pub use mutate::{AssignTarget, cmd_assign, cmd_move};
pub use whoami::cmd_whoami;

use std::sync::Arc;

use owo_colors::OwoColorize;
use serde_json::Value;

use crate::config::Config;
use crate::coordinator::FetchCoordinator;
use crate::error::{Result, TaskboardError};
use crate::service::HttpTicketService;
use crate::session::{Session, SessionContext};
use crate::store::TicketStore;
use crate::types::{ProjectId, Ticket, TicketPriority, TicketStatus};

/// Command result printed either as JSON or as human-readable text.
pub struct CommandOutput {
    json: Value,
    text: Option<String>,
}

impl CommandOutput {
    pub fn new(json: Value) -> Self {
        Self { json, text: None }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn print(self, as_json: bool) -> Result<()> {
        match self.text {
            Some(text) if !as_json => println!("{text}"),
            _ => println!("{}", serde_json::to_string_pretty(&self.json)?),
        }
        Ok(())
    }
}

/// Build a coordinator against the configured server, signed in with the
/// configured token and the user it belongs to.
pub(crate) async fn connect(config: &Config) -> Result<Arc<FetchCoordinator<HttpTicketService>>> {
    let credential = config.credential().ok_or(TaskboardError::NotAuthenticated)?;
    let service = HttpTicketService::from_config(config)?;
    let user = service.fetch_current_user(&credential).await?;

    let session = SessionContext::logged_in(Session::new(credential, Some(user)));
    Ok(Arc::new(FetchCoordinator::new(
        service,
        Arc::new(TicketStore::new()),
        session,
    )))
}

pub(crate) fn resolve_project(config: &Config, project: Option<u64>) -> Result<ProjectId> {
    project
        .map(ProjectId::new)
        .or(config.default_project)
        .ok_or_else(|| {
            TaskboardError::Config(
                "no project given. Pass --project or run: taskboard config set default_project <id>"
                    .to_string(),
            )
        })
}

pub(crate) fn colored_status(status: TicketStatus) -> String {
    let label = format!("[{status}]");
    match status {
        TicketStatus::Todo => label.yellow().to_string(),
        TicketStatus::InProgress => label.blue().to_string(),
        TicketStatus::Done => label.green().to_string(),
    }
}

/// Format a ticket for single-line display
pub fn format_ticket_line(ticket: &Ticket) -> String {
    let id = format!("#{:<5}", ticket.id).cyan().to_string();
    let priority = format!("[{}]", ticket.priority);
    let priority = match ticket.priority {
        TicketPriority::Critical => priority.red().to_string(),
        TicketPriority::High => priority.yellow().to_string(),
        _ => priority.dimmed().to_string(),
    };
    let assignee = match &ticket.assignee {
        Some(a) if !a.email.is_empty() => format!(" @{}", a.email),
        Some(a) => format!(" @{}", a.id),
        None => String::new(),
    };

    format!("{id} {priority} {}{}", ticket.title, assignee.dimmed())
}
