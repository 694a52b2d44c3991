pub mod board;
pub mod commands;
pub mod config;
pub mod controller;
pub mod coordinator;
pub mod drag;
pub mod error;
pub mod filter;
pub mod ledger;
pub mod policy;
pub mod service;
pub mod session;
pub mod store;
pub mod types;

pub use board::{Board, BoardColumn, COLUMNS, project_board, project_store};
pub use config::Config;
pub use controller::{BoardController, BoardEvent, EventOutcome};
pub use coordinator::{FetchCoordinator, MutationOutcome, Notice, NoticeLevel, RefreshOutcome};
pub use drag::{DragRelease, DragTransitionHandler, DropOutcome, IgnoreReason};
pub use error::{Result, TaskboardError};
pub use filter::{FilterChange, FilterField, TicketFilter, TicketQuery};
pub use policy::{Affordances, can_assign_self, can_reassign};
pub use service::{HttpTicketService, MemoryTicketService, TicketPatch, TicketService};
pub use session::{Credential, Role, Session, SessionContext, SessionUser};
pub use store::TicketStore;
pub use types::{
    Assignee, ProjectId, Ticket, TicketId, TicketPriority, TicketStatus, TicketType, UserId,
};
