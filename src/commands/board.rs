use owo_colors::OwoColorize;
use serde_json::json;

use super::{CommandOutput, colored_status, connect, format_ticket_line, resolve_project};
use crate::board::project_store;
use crate::config::Config;
use crate::error::Result;
use crate::filter::TicketFilter;
use crate::types::{TicketPriority, TicketStatus, UserId};

#[derive(Debug, Default)]
pub struct BoardOptions {
    pub project: Option<u64>,
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub assignee: Option<UserId>,
    pub search: Option<String>,
}

impl BoardOptions {
    fn filter(&self) -> TicketFilter {
        TicketFilter {
            status: self.status,
            priority: self.priority,
            assignee_id: self.assignee,
            search: self.search.clone().filter(|s| !s.is_empty()),
        }
    }
}

/// Fetch a project's tickets and print them grouped into the three columns
pub async fn cmd_board(options: BoardOptions, output_json: bool) -> Result<()> {
    let config = Config::load()?;
    let project = resolve_project(&config, options.project)?;
    let coordinator = connect(&config).await?;

    let filter = options.filter();
    coordinator.refresh(project, &filter).await?;
    let board = project_store(coordinator.store());

    let mut text = String::new();
    for column in &board.columns {
        text.push_str(&format!(
            "{} {} ({})\n",
            colored_status(column.status),
            column.name.bold(),
            column.len()
        ));
        if column.is_empty() {
            text.push_str(&format!("  {}\n", "no tickets".dimmed()));
        }
        for ticket in &column.tickets {
            text.push_str(&format!("  {}\n", format_ticket_line(ticket)));
        }
        text.push('\n');
    }
    text.push_str(
        &format!("{} tickets in project {project}", board.total())
            .dimmed()
            .to_string(),
    );

    CommandOutput::new(json!({
        "project_id": project,
        "query": filter.to_query().to_query_string(),
        "columns": board.columns,
    }))
    .with_text(text)
    .print(output_json)
}
