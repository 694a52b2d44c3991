//! Three-column board projection of the ticket store.

use serde::Serialize;

use crate::error::{Result, TaskboardError};
use crate::store::TicketStore;
use crate::types::{Ticket, TicketStatus};

/// Board columns, left to right
pub const COLUMNS: [TicketStatus; 3] = [
    TicketStatus::Todo,
    TicketStatus::InProgress,
    TicketStatus::Done,
];

pub const COLUMN_NAMES: [&str; 3] = ["Todo", "In Progress", "Done"];

fn column_name(status: TicketStatus) -> &'static str {
    match status {
        TicketStatus::Todo => COLUMN_NAMES[0],
        TicketStatus::InProgress => COLUMN_NAMES[1],
        TicketStatus::Done => COLUMN_NAMES[2],
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardColumn {
    pub status: TicketStatus,
    pub name: &'static str,
    pub tickets: Vec<Ticket>,
}

impl BoardColumn {
    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Board {
    pub columns: [BoardColumn; 3],
}

impl Board {
    pub fn column(&self, status: TicketStatus) -> &BoardColumn {
        match status {
            TicketStatus::Todo => &self.columns[0],
            TicketStatus::InProgress => &self.columns[1],
            TicketStatus::Done => &self.columns[2],
        }
    }

    pub fn total(&self) -> usize {
        self.columns.iter().map(BoardColumn::len).sum()
    }
}

/// Partition `tickets` by status, keeping their relative order in each column.
pub fn project_board(tickets: &[Ticket]) -> Board {
    let columns = COLUMNS.map(|status| BoardColumn {
        status,
        name: column_name(status),
        tickets: tickets
            .iter()
            .filter(|t| t.status == status)
            .cloned()
            .collect(),
    });
    Board { columns }
}

pub fn project_store(store: &TicketStore) -> Board {
    store.with_tickets_ref(project_board)
}

/// Resolve a drop-target column identifier to its status.
///
/// Identifiers are the wire status names; anything else is rejected.
pub fn parse_column_id(column: &str) -> Result<TicketStatus> {
    COLUMNS
        .into_iter()
        .find(|status| status.as_str() == column)
        .ok_or_else(|| TaskboardError::InvalidColumn(column.to_string()))
}
