//! Sequence bookkeeping for in-flight remote operations.
//!
//! Every refresh and every mutation gets a monotonically increasing sequence
//! number. A response is only allowed to change the store if its sequence
//! number is still the latest one issued for the same logical operation.

use std::collections::{BTreeSet, HashMap};

use crate::filter::TicketQuery;
use crate::types::{ProjectId, TicketId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshState {
    InFlight,
    Applied,
    Failed,
}

#[derive(Debug, Clone)]
struct IssuedRefresh {
    seq: u64,
    project: ProjectId,
    query: TicketQuery,
    state: RefreshState,
}

/// Tracks list-fetch requests against the single ticket store.
///
/// The store holds one project at a time, so the latest refresh of any
/// project supersedes all earlier ones.
#[derive(Debug, Default)]
pub struct RefreshSequencer {
    next_seq: u64,
    latest: Option<IssuedRefresh>,
}

impl RefreshSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&mut self, project: ProjectId, query: TicketQuery) -> u64 {
        self.next_seq += 1;
        self.latest = Some(IssuedRefresh {
            seq: self.next_seq,
            project,
            query,
            state: RefreshState::InFlight,
        });
        self.next_seq
    }

    pub fn is_latest(&self, seq: u64) -> bool {
        self.latest.as_ref().is_some_and(|r| r.seq == seq)
    }

    pub fn mark_applied(&mut self, seq: u64) {
        self.set_state(seq, RefreshState::Applied);
    }

    pub fn mark_failed(&mut self, seq: u64) {
        self.set_state(seq, RefreshState::Failed);
    }

    /// Whether issuing `query` for `project` would repeat the latest request,
    /// which is either still in flight or already applied.
    pub fn is_current(&self, project: ProjectId, query: &TicketQuery) -> bool {
        self.latest.as_ref().is_some_and(|r| {
            r.project == project && r.query == *query && r.state != RefreshState::Failed
        })
    }

    fn set_state(&mut self, seq: u64, state: RefreshState) {
        if let Some(latest) = self.latest.as_mut()
            && latest.seq == seq
        {
            latest.state = state;
        }
    }
}

/// What the caller must do to the store after a mutation resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settlement<V> {
    /// Leave the store as it is
    Keep,
    /// Write this value back
    Revert(V),
}

#[derive(Debug)]
struct Entry<V> {
    /// Sequence number of the most recently issued request
    issued: u64,
    /// Value the most recently issued request is trying to set
    latest: V,
    pending: BTreeSet<u64>,
    /// Highest-sequence value the server accepted, or the value captured
    /// before the first request in this burst
    confirmed_seq: u64,
    confirmed: V,
    latest_failed: bool,
}

impl<V: Clone> Entry<V> {
    /// The value the store should show while requests are outstanding, or
    /// `None` when the server has not accepted anything the store lacks.
    fn displayed(&self) -> Option<V> {
        if !self.latest_failed {
            Some(self.latest.clone())
        } else if self.confirmed_seq > 0 {
            Some(self.confirmed.clone())
        } else {
            None
        }
    }
}

/// Per-ticket ledger for one mutable dimension (status or assignee).
#[derive(Debug)]
pub struct MutationLedger<V> {
    next_seq: u64,
    /// Advances on every begin and resolve
    clock: u64,
    entries: HashMap<TicketId, Entry<V>>,
    /// Values the server accepted after all requests for a ticket resolved,
    /// with the clock at which they settled
    settled: HashMap<TicketId, (u64, V)>,
}

impl<V> Default for MutationLedger<V> {
    fn default() -> Self {
        Self {
            next_seq: 0,
            clock: 0,
            entries: HashMap::new(),
            settled: HashMap::new(),
        }
    }
}

impl<V: Clone> MutationLedger<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new request for `id` that sets `value`. `previous` is the
    /// store value the optimistic update replaced; it only becomes the
    /// rollback target when no other request for `id` is outstanding.
    pub fn begin(&mut self, id: TicketId, previous: V, value: V) -> u64 {
        self.next_seq += 1;
        self.clock += 1;
        let seq = self.next_seq;

        self.settled.remove(&id);
        let entry = self.entries.entry(id).or_insert_with(|| Entry {
            issued: 0,
            latest: value.clone(),
            pending: BTreeSet::new(),
            confirmed_seq: 0,
            confirmed: previous,
            latest_failed: false,
        });
        entry.issued = seq;
        entry.latest = value;
        entry.pending.insert(seq);
        entry.latest_failed = false;

        seq
    }

    /// Record the outcome of request `seq`, which tried to set `value`.
    pub fn resolve(&mut self, id: TicketId, seq: u64, value: V, succeeded: bool) -> Settlement<V> {
        self.clock += 1;
        let Some(entry) = self.entries.get_mut(&id) else {
            return Settlement::Keep;
        };

        entry.pending.remove(&seq);

        if succeeded && seq > entry.confirmed_seq {
            entry.confirmed_seq = seq;
            entry.confirmed = value;
        }
        if !succeeded && seq == entry.issued {
            entry.latest_failed = true;
        }

        let settlement = if entry.latest_failed {
            Settlement::Revert(entry.confirmed.clone())
        } else {
            Settlement::Keep
        };

        if entry.pending.is_empty()
            && let Some(entry) = self.entries.remove(&id)
            && entry.confirmed_seq > 0
        {
            self.settled.insert(id, (self.clock, entry.confirmed));
        }

        settlement
    }

    /// Current position of the ledger clock. A refresh records it when issued
    /// and passes it back to [`MutationLedger::overlay`] when applied.
    pub fn watermark(&self) -> u64 {
        self.clock
    }

    /// Values to write over a list response fetched at `since`: the
    /// optimistic value of every outstanding request, and every value the
    /// server accepted after `since`. Settlements the response already
    /// reflects are forgotten.
    pub fn overlay(&mut self, since: u64) -> Vec<(TicketId, V)> {
        self.settled.retain(|_, (at, _)| *at > since);

        let mut values: Vec<(TicketId, V)> = self
            .settled
            .iter()
            .map(|(id, (_, value))| (*id, value.clone()))
            .collect();
        values.extend(
            self.entries
                .iter()
                .filter_map(|(id, entry)| entry.displayed().map(|value| (*id, value))),
        );
        values
    }

    pub fn in_flight(&self, id: TicketId) -> usize {
        self.entries.get(&id).map(|e| e.pending.len()).unwrap_or(0)
    }
}
