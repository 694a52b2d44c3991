//! Remote ticket service.
//!
//! The service is the authority for ticket state. This module defines the two
//! calls the board needs and the request bodies they take; `http` talks to
//! the real server and `memory` reproduces its behavior in process.

pub mod error;
pub mod http;
pub mod memory;

use std::future::Future;

use serde::Serialize;

use crate::error::Result;
use crate::filter::TicketQuery;
use crate::session::Credential;
use crate::types::{Assignee, ProjectId, Ticket, TicketId, TicketStatus, UserId};

pub use error::{ApiError, RetryPolicy, execute_with_retry};
pub use http::HttpTicketService;
pub use memory::{Failure, MemoryTicketService};

/// Partial update body for `PATCH /tickets/{id}`. Unset fields are omitted;
/// `assignee_id: Some(None)` is sent as `null` and unassigns the ticket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TicketPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TicketStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<Option<UserId>>,
}

impl TicketPatch {
    pub fn status(status: TicketStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn assignee(assignee: Option<&Assignee>) -> Self {
        Self {
            assignee_id: Some(assignee.map(|a| a.id)),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.assignee_id.is_none()
    }
}

/// Common interface for ticket service backends
pub trait TicketService: Send + Sync {
    /// List the tickets of `project` matching `query`
    fn list_tickets(
        &self,
        project: ProjectId,
        query: &TicketQuery,
        credential: &Credential,
    ) -> impl Future<Output = Result<Vec<Ticket>>> + Send;

    /// Apply a partial update and return the updated ticket
    fn patch_ticket(
        &self,
        id: TicketId,
        patch: &TicketPatch,
        credential: &Credential,
    ) -> impl Future<Output = Result<Ticket>> + Send;
}
