//! In-memory ticket store for the active project.
//!
//! The store is the single source of truth for the board. It is written only
//! through `replace_all`, `apply_status` and `apply_assignee`; every other
//! access is a read. Writes are synchronous and visible to the next read.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::types::{Assignee, Ticket, TicketId, TicketStatus};

#[derive(Debug, Default)]
struct StoreInner {
    /// Tickets in the order the server returned them
    tickets: Vec<Ticket>,
    /// Position of each ticket in `tickets`
    index: HashMap<TicketId, usize>,
}

impl StoreInner {
    fn get_mut(&mut self, id: TicketId) -> Option<&mut Ticket> {
        let pos = *self.index.get(&id)?;
        self.tickets.get_mut(pos)
    }
}

#[derive(Debug, Default)]
pub struct TicketStore {
    inner: RwLock<StoreInner>,
}

impl TicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `tickets`.
    pub fn with_tickets(tickets: Vec<Ticket>) -> Self {
        let store = Self::new();
        store.replace_all(tickets);
        store
    }

    /// Replace the whole collection after a successful list fetch.
    ///
    /// Identity is the ticket id: if the server repeats an id, the later
    /// record wins and keeps the earlier position.
    pub fn replace_all(&self, tickets: Vec<Ticket>) {
        let mut deduped: Vec<Ticket> = Vec::with_capacity(tickets.len());
        let mut index: HashMap<TicketId, usize> = HashMap::with_capacity(tickets.len());

        for ticket in tickets {
            match index.get(&ticket.id) {
                Some(&pos) => deduped[pos] = ticket,
                None => {
                    index.insert(ticket.id, deduped.len());
                    deduped.push(ticket);
                }
            }
        }

        let mut inner = self.inner.write();
        inner.tickets = deduped;
        inner.index = index;
    }

    /// Set the status of ticket `id`, returning the value it replaced.
    ///
    /// Returns `None` without touching the store if the ticket is absent.
    pub fn apply_status(&self, id: TicketId, status: TicketStatus) -> Option<TicketStatus> {
        let mut inner = self.inner.write();
        let ticket = inner.get_mut(id)?;
        Some(std::mem::replace(&mut ticket.status, status))
    }

    /// Set the assignee of ticket `id`, returning the value it replaced.
    ///
    /// The outer `None` means the ticket is absent; `Some(None)` means it was
    /// unassigned.
    pub fn apply_assignee(
        &self,
        id: TicketId,
        assignee: Option<Assignee>,
    ) -> Option<Option<Assignee>> {
        let mut inner = self.inner.write();
        let ticket = inner.get_mut(id)?;
        Some(std::mem::replace(&mut ticket.assignee, assignee))
    }

    pub fn get(&self, id: TicketId) -> Option<Ticket> {
        let inner = self.inner.read();
        inner
            .index
            .get(&id)
            .and_then(|&pos| inner.tickets.get(pos))
            .cloned()
    }

    pub fn status_of(&self, id: TicketId) -> Option<TicketStatus> {
        let inner = self.inner.read();
        inner
            .index
            .get(&id)
            .and_then(|&pos| inner.tickets.get(pos))
            .map(|t| t.status)
    }

    pub fn contains(&self, id: TicketId) -> bool {
        self.inner.read().index.contains_key(&id)
    }

    /// Copy of all tickets in server order.
    pub fn snapshot(&self) -> Vec<Ticket> {
        self.inner.read().tickets.clone()
    }

    /// Run `f` over the current tickets without cloning them.
    pub fn with_tickets_ref<R>(&self, f: impl FnOnce(&[Ticket]) -> R) -> R {
        f(&self.inner.read().tickets)
    }

    pub fn len(&self) -> usize {
        self.inner.read().tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
