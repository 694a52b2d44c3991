//! Board filter state and its translation to the list-tickets query.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TaskboardError};
use crate::types::{TicketPriority, TicketStatus, UserId};

/// The filterable dimensions, in canonical query order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterField {
    Status,
    Priority,
    AssigneeId,
    Search,
}

impl FilterField {
    /// Query parameter name for this field
    pub fn key(&self) -> &'static str {
        match self {
            FilterField::Status => "status",
            FilterField::Priority => "priority",
            FilterField::AssigneeId => "assignee_id",
            FilterField::Search => "search",
        }
    }
}

impl fmt::Display for FilterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for FilterField {
    type Err = TaskboardError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "status" => Ok(FilterField::Status),
            "priority" => Ok(FilterField::Priority),
            "assignee_id" | "assignee" => Ok(FilterField::AssigneeId),
            "search" => Ok(FilterField::Search),
            _ => Err(TaskboardError::InvalidFilter {
                field: "field",
                value: s.to_string(),
            }),
        }
    }
}

/// A filter-change event from the filter bar. An empty value clears the field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterChange {
    pub field: FilterField,
    pub value: String,
}

impl FilterChange {
    pub fn new(field: FilterField, value: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
        }
    }

    pub fn clear(field: FilterField) -> Self {
        Self::new(field, String::new())
    }
}

/// Query parameters for the list-tickets call.
///
/// Only populated fields appear, always in the order status, priority,
/// assignee id, search. Two queries built from equal filters compare equal
/// and serialize to identical strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TicketQuery {
    pairs: Vec<(&'static str, String)>,
}

impl TicketQuery {
    pub fn pairs(&self) -> &[(&'static str, String)] {
        &self.pairs
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// URL-encoded form, e.g. `status=todo&search=login+bug`
    pub fn to_query_string(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.pairs.iter().map(|(k, v)| (*k, v.as_str())))
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketFilter {
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub assignee_id: Option<UserId>,
    pub search: Option<String>,
}

impl TicketFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: TicketStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_priority(mut self, priority: TicketPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn with_assignee(mut self, assignee_id: UserId) -> Self {
        self.assignee_id = Some(assignee_id);
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        let search = search.into();
        self.search = if search.is_empty() { None } else { Some(search) };
        self
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.priority.is_none()
            && self.assignee_id.is_none()
            && self.search.is_none()
    }

    /// Apply a filter-change event. Returns whether the filter changed.
    ///
    /// An invalid value leaves the filter untouched.
    pub fn apply(&mut self, change: &FilterChange) -> Result<bool> {
        let value = change.value.as_str();
        let before = self.clone();

        match change.field {
            FilterField::Status => {
                self.status = if value.is_empty() {
                    None
                } else {
                    Some(value.parse()?)
                };
            }
            FilterField::Priority => {
                self.priority = if value.is_empty() {
                    None
                } else {
                    Some(value.parse()?)
                };
            }
            FilterField::AssigneeId => {
                self.assignee_id = if value.trim().is_empty() {
                    None
                } else {
                    Some(value.parse()?)
                };
            }
            FilterField::Search => {
                self.search = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                };
            }
        }

        Ok(*self != before)
    }

    pub fn to_query(&self) -> TicketQuery {
        let mut pairs = Vec::with_capacity(4);
        if let Some(status) = self.status {
            pairs.push((FilterField::Status.key(), status.to_string()));
        }
        if let Some(priority) = self.priority {
            pairs.push((FilterField::Priority.key(), priority.to_string()));
        }
        if let Some(assignee_id) = self.assignee_id {
            pairs.push((FilterField::AssigneeId.key(), assignee_id.to_string()));
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            pairs.push((FilterField::Search.key(), search.to_string()));
        }
        TicketQuery { pairs }
    }
}
