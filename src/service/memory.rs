//! In-process ticket service.
//!
//! Mirrors the server's filtering and role rules so the board can be driven
//! without a network. Tests use it to script failures and to delay individual
//! responses, which lets them control the order in which in-flight requests
//! complete.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::error::{Result, TaskboardError};
use crate::filter::TicketQuery;
use crate::session::{Credential, Role, SessionUser};
use crate::types::{Assignee, ProjectId, Ticket, TicketId, TicketPriority, TicketStatus, UserId};

use super::{TicketPatch, TicketService};

/// A scripted failure for the next call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    Unauthenticated,
    Forbidden(String),
    NotFound,
    RateLimited(u64),
    /// A 5xx response
    Server(String),
}

impl Failure {
    fn into_error(self, ticket: Option<TicketId>) -> TaskboardError {
        match self {
            Failure::Unauthenticated => TaskboardError::NotAuthenticated,
            Failure::Forbidden(message) => TaskboardError::Forbidden(message),
            Failure::NotFound => match ticket {
                Some(id) => TaskboardError::TicketNotFound(id),
                None => TaskboardError::Api {
                    status: Some(404),
                    message: "not found".to_string(),
                },
            },
            Failure::RateLimited(seconds) => TaskboardError::RateLimited(seconds),
            Failure::Server(message) => TaskboardError::Api {
                status: Some(500),
                message,
            },
        }
    }
}

#[derive(Debug, Default)]
struct State {
    tickets: Vec<Ticket>,
    /// token -> user
    users: HashMap<String, SessionUser>,
    /// Per-call script; `None` lets that call through
    list_failures: VecDeque<Option<Failure>>,
    patch_failures: VecDeque<Option<Failure>>,
    list_delays: VecDeque<Duration>,
    patch_delays: VecDeque<Duration>,
    list_calls: Vec<(ProjectId, TicketQuery)>,
    patch_calls: Vec<(TicketId, TicketPatch)>,
}

impl State {
    fn authenticate(&self, credential: &Credential) -> Result<SessionUser> {
        self.users
            .get(credential.expose())
            .cloned()
            .ok_or(TaskboardError::NotAuthenticated)
    }

    fn assignee_for(&self, id: UserId) -> Assignee {
        self.users
            .values()
            .find(|u| u.id == id)
            .map(SessionUser::as_assignee)
            .unwrap_or(Assignee {
                id,
                email: String::new(),
                role: None,
            })
    }
}

/// Cloning yields another handle to the same backing state.
#[derive(Debug, Clone, Default)]
pub struct MemoryTicketService {
    state: Arc<Mutex<State>>,
}

impl MemoryTicketService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `user`, authenticated by `token`
    pub fn with_user(self, token: &str, user: SessionUser) -> Self {
        self.state.lock().users.insert(token.to_string(), user);
        self
    }

    /// Add or replace a ticket in `project`
    pub fn insert_ticket(&self, project: ProjectId, mut ticket: Ticket) {
        ticket.project_id = Some(project);
        let mut state = self.state.lock();
        match state.tickets.iter_mut().find(|t| t.id == ticket.id) {
            Some(existing) => *existing = ticket,
            None => state.tickets.push(ticket),
        }
    }

    pub fn with_ticket(self, project: ProjectId, ticket: Ticket) -> Self {
        self.insert_ticket(project, ticket);
        self
    }

    pub fn ticket(&self, id: TicketId) -> Option<Ticket> {
        self.state.lock().tickets.iter().find(|t| t.id == id).cloned()
    }

    pub fn fail_next_list(&self, failure: Failure) {
        self.state.lock().list_failures.push_back(Some(failure));
    }

    pub fn fail_next_patch(&self, failure: Failure) {
        self.state.lock().patch_failures.push_back(Some(failure));
    }

    /// Let the next list call through, ahead of any queued failure
    pub fn pass_next_list(&self) {
        self.state.lock().list_failures.push_back(None);
    }

    /// Let the next patch call through, ahead of any queued failure
    pub fn pass_next_patch(&self) {
        self.state.lock().patch_failures.push_back(None);
    }

    /// Hold the response to the next list call for `delay`
    pub fn delay_next_list(&self, delay: Duration) {
        self.state.lock().list_delays.push_back(delay);
    }

    /// Hold the response to the next patch call for `delay`
    pub fn delay_next_patch(&self, delay: Duration) {
        self.state.lock().patch_delays.push_back(delay);
    }

    pub fn list_calls(&self) -> Vec<(ProjectId, TicketQuery)> {
        self.state.lock().list_calls.clone()
    }

    pub fn patch_calls(&self) -> Vec<(TicketId, TicketPatch)> {
        self.state.lock().patch_calls.clone()
    }
}

impl TicketService for MemoryTicketService {
    async fn list_tickets(
        &self,
        project: ProjectId,
        query: &TicketQuery,
        credential: &Credential,
    ) -> Result<Vec<Ticket>> {
        let (delay, failure) = {
            let mut state = self.state.lock();
            state.list_calls.push((project, query.clone()));
            (state.list_delays.pop_front(), state.list_failures.pop_front().flatten())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(failure) = failure {
            return Err(failure.into_error(None));
        }

        let state = self.state.lock();
        state.authenticate(credential)?;

        let status = query.get("status").map(str::parse::<TicketStatus>).transpose()?;
        let priority = query
            .get("priority")
            .map(str::parse::<TicketPriority>)
            .transpose()?;
        let assignee = query.get("assignee_id").map(str::parse::<UserId>).transpose()?;
        let search = query.get("search").map(str::to_lowercase);

        Ok(state
            .tickets
            .iter()
            .filter(|t| t.project_id == Some(project))
            .filter(|t| status.is_none_or(|s| t.status == s))
            .filter(|t| priority.is_none_or(|p| t.priority == p))
            .filter(|t| assignee.is_none_or(|a| t.assignee_id() == Some(a)))
            .filter(|t| {
                search.as_deref().is_none_or(|needle| {
                    t.title.to_lowercase().contains(needle)
                        || t.description
                            .as_deref()
                            .is_some_and(|d| d.to_lowercase().contains(needle))
                })
            })
            .cloned()
            .collect())
    }

    async fn patch_ticket(
        &self,
        id: TicketId,
        patch: &TicketPatch,
        credential: &Credential,
    ) -> Result<Ticket> {
        let (delay, failure) = {
            let mut state = self.state.lock();
            state.patch_calls.push((id, patch.clone()));
            (state.patch_delays.pop_front(), state.patch_failures.pop_front().flatten())
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(failure) = failure {
            return Err(failure.into_error(Some(id)));
        }

        let mut state = self.state.lock();
        let user = state.authenticate(credential)?;
        let assignee = patch
            .assignee_id
            .map(|target| target.map(|uid| state.assignee_for(uid)));

        let ticket = state
            .tickets
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(TaskboardError::TicketNotFound(id))?;

        match user.role {
            Role::Admin => {}
            Role::Developer => {
                if ticket.assignee_id() != Some(user.id) {
                    return Err(TaskboardError::Forbidden("Not allowed".to_string()));
                }
                if matches!(patch.assignee_id, Some(Some(_))) {
                    return Err(TaskboardError::Forbidden(
                        "Only admin can reassign tickets".to_string(),
                    ));
                }
            }
            _ => return Err(TaskboardError::Forbidden("Not allowed".to_string())),
        }

        if let Some(status) = patch.status {
            ticket.status = status;
        }
        if let Some(assignee) = assignee {
            ticket.assignee = assignee;
        }
        Ok(ticket.clone())
    }
}
