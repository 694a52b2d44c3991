//! Which assignment affordances to show.
//!
//! Advisory only: the ticket service decides, and may reject a request these
//! rules allowed.

use serde::Serialize;

use crate::session::{Role, SessionUser};
use crate::types::Ticket;

/// A developer may take an unassigned ticket.
pub fn can_assign_self(user: Option<&SessionUser>, ticket: &Ticket) -> bool {
    user.is_some_and(|u| u.role == Role::Developer) && ticket.is_unassigned()
}

/// Only admins reassign, whoever currently holds the ticket.
pub fn can_reassign(user: Option<&SessionUser>) -> bool {
    user.is_some_and(|u| u.role == Role::Admin)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Affordances {
    pub assign_self: bool,
    pub reassign: bool,
}

impl Affordances {
    pub fn for_ticket(user: Option<&SessionUser>, ticket: &Ticket) -> Self {
        Self {
            assign_self: can_assign_self(user, ticket),
            reassign: can_reassign(user),
        }
    }

    pub fn none() -> Self {
        Self::default()
    }
}
