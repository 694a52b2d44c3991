//! Shared board fixtures: an in-memory service seeded with users and tickets,
//! and a coordinator signed in as one of those users.

use std::sync::Arc;

use taskboard::{
    Credential, FetchCoordinator, MemoryTicketService, ProjectId, Role, Session, SessionContext,
    SessionUser, Ticket, TicketStatus, TicketStore,
};

pub const PROJECT: ProjectId = ProjectId::new(1);

pub const ADMIN_TOKEN: &str = "admin-token";
pub const DEV_TOKEN: &str = "dev-token";
pub const VIEWER_TOKEN: &str = "viewer-token";

pub fn admin() -> SessionUser {
    SessionUser::new(1, "admin@example.com", Role::Admin)
}

pub fn developer() -> SessionUser {
    SessionUser::new(4, "dev@example.com", Role::Developer)
}

pub fn viewer() -> SessionUser {
    SessionUser::new(5, "viewer@example.com", Role::Viewer)
}

/// Service with the three users registered and no tickets
pub fn service() -> MemoryTicketService {
    MemoryTicketService::new()
        .with_user(ADMIN_TOKEN, admin())
        .with_user(DEV_TOKEN, developer())
        .with_user(VIEWER_TOKEN, viewer())
}

/// Service holding `tickets` in [`PROJECT`]
pub fn service_with(tickets: Vec<Ticket>) -> MemoryTicketService {
    let service = service();
    for ticket in tickets {
        service.insert_ticket(PROJECT, ticket);
    }
    service
}

pub fn ticket(id: u64, status: TicketStatus) -> Ticket {
    Ticket::new(id, format!("Ticket {id}"), status)
}

pub fn assigned(id: u64, status: TicketStatus, user: &SessionUser) -> Ticket {
    let mut ticket = ticket(id, status);
    ticket.assignee = Some(user.as_assignee());
    ticket
}

/// Coordinator over a fresh store, signed in with `token` as `user`
pub fn coordinator(
    service: &MemoryTicketService,
    token: &str,
    user: SessionUser,
) -> Arc<FetchCoordinator<MemoryTicketService>> {
    let session = SessionContext::logged_in(Session::new(Credential::new(token), Some(user)));
    Arc::new(FetchCoordinator::new(
        service.clone(),
        Arc::new(TicketStore::new()),
        session,
    ))
}

pub fn ids(tickets: &[Ticket]) -> Vec<u64> {
    tickets.iter().map(|t| t.id.get()).collect()
}
