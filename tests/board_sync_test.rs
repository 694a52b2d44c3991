#[path = "common/mod.rs"]
mod common;

use std::time::Duration;

use common::fixtures::{
    ADMIN_TOKEN, DEV_TOKEN, PROJECT, admin, assigned, coordinator, developer, ids, service_with,
    ticket,
};
use taskboard::service::Failure;
use taskboard::{
    Affordances, BoardController, BoardEvent, DragRelease, DragTransitionHandler, DropOutcome,
    EventOutcome, FilterChange, FilterField, IgnoreReason, MutationOutcome, NoticeLevel,
    RefreshOutcome, TaskboardError, TicketFilter, TicketId, TicketStatus, UserId, project_store,
};

// ============================================================================
// Refresh
// ============================================================================

#[tokio::test]
async fn test_filtered_refresh_regroups_board() {
    let service = service_with(vec![ticket(1, TicketStatus::Todo), ticket(2, TicketStatus::Done)]);
    let coordinator = coordinator(&service, ADMIN_TOKEN, admin());
    let mut controller = BoardController::new(coordinator.clone(), PROJECT);

    controller
        .handle(BoardEvent::FilterChanged(FilterChange::new(
            FilterField::Status,
            "todo",
        )))
        .await
        .unwrap();

    assert_eq!(ids(&coordinator.store().snapshot()), vec![1]);
    let board = controller.board();
    assert_eq!(ids(&board.column(TicketStatus::Todo).tickets), vec![1]);
    assert!(board.column(TicketStatus::Done).is_empty());

    let (_, query) = service.list_calls().pop().unwrap();
    assert_eq!(query.to_query_string(), "status=todo");
}

#[tokio::test]
async fn test_failed_refresh_leaves_store_identical() {
    let service = service_with(vec![
        ticket(1, TicketStatus::Todo),
        ticket(2, TicketStatus::InProgress),
        ticket(3, TicketStatus::Done),
    ]);
    let coordinator = coordinator(&service, ADMIN_TOKEN, admin());
    coordinator.refresh(PROJECT, &TicketFilter::new()).await.unwrap();
    let before = serde_json::to_string(&coordinator.store().snapshot()).unwrap();
    let mut notices = coordinator.subscribe_notices();

    service.fail_next_list(Failure::Server("connection reset".to_string()));
    let result = coordinator
        .refresh(PROJECT, &TicketFilter::new().with_search("nothing"))
        .await;

    assert!(result.unwrap_err().is_transient());
    let after = serde_json::to_string(&coordinator.store().snapshot()).unwrap();
    assert_eq!(before, after);
    assert_eq!(project_store(coordinator.store()).total(), 3);

    let notice = notices.try_recv().unwrap();
    assert_eq!(notice.level, NoticeLevel::Warning);
    assert!(notice.message.contains("connection reset"));
}

#[tokio::test(start_paused = true)]
async fn test_slow_response_to_older_filter_is_discarded() {
    let service = service_with(vec![
        ticket(1, TicketStatus::Todo),
        ticket(2, TicketStatus::Done),
        ticket(3, TicketStatus::Todo),
    ]);
    let coordinator = coordinator(&service, ADMIN_TOKEN, admin());

    service.delay_next_list(Duration::from_secs(2));
    service.delay_next_list(Duration::from_millis(50));

    let older = TicketFilter::new().with_status(TicketStatus::Todo);
    let newer = TicketFilter::new().with_status(TicketStatus::Done);
    let (older, newer) = tokio::join!(
        coordinator.refresh(PROJECT, &older),
        coordinator.refresh(PROJECT, &newer)
    );

    assert_eq!(newer.unwrap(), RefreshOutcome::Applied { count: 1 });
    assert_eq!(older.unwrap(), RefreshOutcome::Stale);
    assert_eq!(ids(&coordinator.store().snapshot()), vec![2]);
}

#[tokio::test(start_paused = true)]
async fn test_stale_failure_reports_nothing() {
    let service = service_with(vec![ticket(1, TicketStatus::Todo)]);
    let coordinator = coordinator(&service, ADMIN_TOKEN, admin());
    let mut notices = coordinator.subscribe_notices();

    service.delay_next_list(Duration::from_secs(1));
    service.fail_next_list(Failure::Server("boom".to_string()));

    let filter = TicketFilter::new();
    let (first, second) = tokio::join!(
        coordinator.refresh(PROJECT, &filter),
        coordinator.refresh(PROJECT, &filter)
    );

    assert_eq!(first.unwrap(), RefreshOutcome::Stale);
    assert_eq!(second.unwrap(), RefreshOutcome::Applied { count: 1 });
    assert!(notices.try_recv().is_err());
}

// ============================================================================
// Drag and drop
// ============================================================================

#[tokio::test]
async fn test_failed_drop_settles_back_to_original_column() {
    let service = service_with(vec![ticket(7, TicketStatus::Todo)]);
    let coordinator = coordinator(&service, ADMIN_TOKEN, admin());
    coordinator.refresh(PROJECT, &TicketFilter::new()).await.unwrap();
    let handler = DragTransitionHandler::new(coordinator.clone());
    let id = TicketId::new(7);

    service.fail_next_patch(Failure::Server("service unavailable".to_string()));
    let outcome = handler.on_drop(DragRelease::new(id, "in_progress"));

    assert_eq!(
        coordinator.store().status_of(id),
        Some(TicketStatus::InProgress)
    );
    assert_eq!(
        ids(&project_store(coordinator.store()).column(TicketStatus::InProgress).tickets),
        vec![7]
    );

    let DropOutcome::Dispatched(handle) = outcome else {
        panic!("expected the drop to dispatch a mutation, got {outcome:?}");
    };
    assert!(handle.await.unwrap().is_err());

    assert_eq!(coordinator.store().status_of(id), Some(TicketStatus::Todo));
    assert_eq!(service.ticket(id).unwrap().status, TicketStatus::Todo);
}

#[tokio::test]
async fn test_successful_drop_stays_in_destination() {
    let service = service_with(vec![ticket(7, TicketStatus::Todo)]);
    let coordinator = coordinator(&service, ADMIN_TOKEN, admin());
    coordinator.refresh(PROJECT, &TicketFilter::new()).await.unwrap();
    let handler = DragTransitionHandler::new(coordinator.clone());
    let id = TicketId::new(7);

    let DropOutcome::Dispatched(handle) = handler.on_drop(DragRelease::new(id, "done")) else {
        panic!("expected dispatch");
    };
    assert_eq!(handle.await.unwrap().unwrap(), MutationOutcome::Confirmed);

    assert_eq!(coordinator.store().status_of(id), Some(TicketStatus::Done));
    assert_eq!(service.ticket(id).unwrap().status, TicketStatus::Done);

    coordinator.refresh(PROJECT, &TicketFilter::new()).await.unwrap();
    assert_eq!(coordinator.store().status_of(id), Some(TicketStatus::Done));
}

#[tokio::test]
async fn test_drop_on_own_column_sends_nothing() {
    let service = service_with(vec![
        ticket(1, TicketStatus::Todo),
        ticket(2, TicketStatus::InProgress),
        ticket(3, TicketStatus::Done),
    ]);
    let coordinator = coordinator(&service, ADMIN_TOKEN, admin());
    coordinator.refresh(PROJECT, &TicketFilter::new()).await.unwrap();
    let handler = DragTransitionHandler::new(coordinator.clone());

    for (id, column) in [(1, "todo"), (2, "in_progress"), (3, "done")] {
        let outcome = handler.on_drop(DragRelease::new(TicketId::new(id), column));
        assert!(matches!(outcome, DropOutcome::Ignored(IgnoreReason::SameColumn)));
    }
    assert!(service.patch_calls().is_empty());
}

#[tokio::test]
async fn test_drop_of_ticket_removed_by_refresh_is_ignored() {
    let service = service_with(vec![ticket(1, TicketStatus::Todo), ticket(2, TicketStatus::Done)]);
    let coordinator = coordinator(&service, ADMIN_TOKEN, admin());
    coordinator
        .refresh(PROJECT, &TicketFilter::new().with_status(TicketStatus::Done))
        .await
        .unwrap();
    let handler = DragTransitionHandler::new(coordinator.clone());

    let outcome = handler.on_drop(DragRelease::new(TicketId::new(1), "done"));
    assert!(matches!(outcome, DropOutcome::Ignored(IgnoreReason::TicketNotFound)));
    assert!(service.patch_calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_rapid_drops_settle_on_last_confirmed_column() {
    let service = service_with(vec![ticket(7, TicketStatus::Todo)]);
    let coordinator = coordinator(&service, ADMIN_TOKEN, admin());
    coordinator.refresh(PROJECT, &TicketFilter::new()).await.unwrap();
    let handler = DragTransitionHandler::new(coordinator.clone());
    let id = TicketId::new(7);

    // First drop succeeds slowly, second fails quickly.
    service.delay_next_patch(Duration::from_millis(300));
    service.delay_next_patch(Duration::from_millis(20));
    service.pass_next_patch();
    service.fail_next_patch(Failure::Forbidden("Not allowed".to_string()));

    let DropOutcome::Dispatched(first) = handler.on_drop(DragRelease::new(id, "in_progress"))
    else {
        panic!("expected dispatch");
    };
    let DropOutcome::Dispatched(second) = handler.on_drop(DragRelease::new(id, "done")) else {
        panic!("expected dispatch");
    };
    assert_eq!(coordinator.store().status_of(id), Some(TicketStatus::Done));

    assert!(matches!(
        second.await.unwrap(),
        Err(TaskboardError::Forbidden(_))
    ));
    assert_eq!(coordinator.store().status_of(id), Some(TicketStatus::Todo));

    assert_eq!(first.await.unwrap().unwrap(), MutationOutcome::Confirmed);
    assert_eq!(
        coordinator.store().status_of(id),
        Some(TicketStatus::InProgress)
    );
}

// ============================================================================
// Assignment and the role gate
// ============================================================================

#[tokio::test]
async fn test_developer_self_assign_rejected_by_server_rolls_back() {
    let service = service_with(vec![ticket(3, TicketStatus::Todo)]);
    let coordinator = coordinator(&service, DEV_TOKEN, developer());
    let mut notices = coordinator.subscribe_notices();
    let mut controller = BoardController::new(coordinator.clone(), PROJECT);
    controller.load().await.unwrap();

    controller
        .handle(BoardEvent::Select(TicketId::new(3)))
        .await
        .unwrap();
    assert_eq!(
        controller.affordances(),
        Affordances {
            assign_self: true,
            reassign: false
        }
    );

    let result = controller.handle(BoardEvent::AssignToMe).await;
    assert!(matches!(result, Err(TaskboardError::Forbidden(_))));
    assert_eq!(service.patch_calls().len(), 1);

    assert!(controller.selected_ticket().unwrap().is_unassigned());
    let notice = notices.try_recv().unwrap();
    assert_eq!(notice.level, NoticeLevel::Error);
    assert!(notice.message.contains("#3"));
}

#[tokio::test]
async fn test_developer_sees_no_self_assign_on_assigned_ticket() {
    let service = service_with(vec![assigned(3, TicketStatus::Todo, &admin())]);
    let coordinator = coordinator(&service, DEV_TOKEN, developer());
    let mut controller = BoardController::new(coordinator, PROJECT);
    controller.load().await.unwrap();
    controller
        .handle(BoardEvent::Select(TicketId::new(3)))
        .await
        .unwrap();

    assert_eq!(controller.affordances(), Affordances::none());
    let outcome = controller.handle(BoardEvent::AssignToMe).await.unwrap();
    assert!(matches!(outcome, EventOutcome::NotPermitted));
    assert!(service.patch_calls().is_empty());
}

#[tokio::test]
async fn test_admin_reassigns_regardless_of_current_assignee() {
    let service = service_with(vec![assigned(5, TicketStatus::InProgress, &admin())]);
    let coordinator = coordinator(&service, ADMIN_TOKEN, admin());
    let mut controller = BoardController::new(coordinator, PROJECT);
    controller.load().await.unwrap();
    controller
        .handle(BoardEvent::Select(TicketId::new(5)))
        .await
        .unwrap();
    assert!(controller.affordances().reassign);

    let outcome = controller
        .handle(BoardEvent::Reassign(Some(developer().as_assignee())))
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        EventOutcome::Mutated(MutationOutcome::Confirmed)
    ));
    assert_eq!(
        service.ticket(TicketId::new(5)).unwrap().assignee_id(),
        Some(UserId::new(4))
    );

    controller.handle(BoardEvent::Reassign(None)).await.unwrap();
    assert!(controller.selected_ticket().unwrap().is_unassigned());
    assert!(service.ticket(TicketId::new(5)).unwrap().is_unassigned());
}

#[tokio::test]
async fn test_developer_moves_own_ticket_through_board() {
    let service = service_with(vec![assigned(8, TicketStatus::Todo, &developer())]);
    let coordinator = coordinator(&service, DEV_TOKEN, developer());
    let mut controller = BoardController::new(coordinator.clone(), PROJECT);
    controller.load().await.unwrap();

    let outcome = controller
        .handle(BoardEvent::DragReleased(DragRelease::new(
            TicketId::new(8),
            "in_progress",
        )))
        .await
        .unwrap();
    let EventOutcome::Dropped(DropOutcome::Dispatched(handle)) = outcome else {
        panic!("expected dispatch, got {outcome:?}");
    };
    assert_eq!(handle.await.unwrap().unwrap(), MutationOutcome::Confirmed);
    assert_eq!(controller.board().column(TicketStatus::InProgress).len(), 1);
}

#[tokio::test]
async fn test_logged_out_session_disables_affordances_and_calls() {
    let service = service_with(vec![ticket(1, TicketStatus::Todo)]);
    let coordinator = coordinator(&service, ADMIN_TOKEN, admin());
    let mut controller = BoardController::new(coordinator.clone(), PROJECT);
    controller.load().await.unwrap();
    controller
        .handle(BoardEvent::Select(TicketId::new(1)))
        .await
        .unwrap();

    coordinator.session().logout();
    assert_eq!(controller.affordances(), Affordances::none());
    assert!(matches!(
        controller.handle(BoardEvent::Reload).await,
        Err(TaskboardError::NotAuthenticated)
    ));
    assert_eq!(service.list_calls().len(), 1);
}

#[tokio::test]
async fn test_failed_reassign_keeps_confirmed_status() {
    let service = service_with(vec![ticket(3, TicketStatus::Todo)]);
    let coordinator = coordinator(&service, ADMIN_TOKEN, admin());
    coordinator.refresh(PROJECT, &TicketFilter::new()).await.unwrap();
    let id = TicketId::new(3);

    let moved = coordinator.mutate_status(id, TicketStatus::Done).await;
    assert_eq!(moved.unwrap(), MutationOutcome::Confirmed);

    service.fail_next_patch(Failure::Server("service unavailable".to_string()));
    let reassigned = coordinator
        .mutate_assignee(id, Some(developer().as_assignee()))
        .await;
    assert!(reassigned.is_err());

    let ticket = coordinator.store().get(id).unwrap();
    assert!(ticket.is_unassigned());
    assert_eq!(ticket.status, TicketStatus::Done);
}
