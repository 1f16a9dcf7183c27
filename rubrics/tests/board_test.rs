use std::sync::Arc;
use std::time::Duration;

use errors::{ApiError, BoardError};
use gb_core::{CriterionInput, EntityKind, RubricInput, ScoringLevelInput};
use rubrics::{
    BoardActionError, ModalDescriptor, NotificationLevel, QueryCache, QueryKey, QueryStatus,
    RowState, RubricBoard, RubricQueries
};
use testing::fixtures::course_api;
use testing::{InMemoryRubricApi, call};

const OWNER: &str = "ins-1";

async fn loaded_board() -> (Arc<InMemoryRubricApi>, Arc<RubricBoard>) {
    let api = Arc::new(course_api(OWNER).await);
    let board = board_for(&api);
    board.set_owner(Some(OWNER.to_string())).await;
    assert!(board.refresh().await);
    (api, board)
}

fn board_for(api: &Arc<InMemoryRubricApi>) -> Arc<RubricBoard> {
    let cache = Arc::new(QueryCache::new(true, Duration::from_secs(60)));
    let queries = Arc::new(RubricQueries::new(api.clone(), cache, 100, 50));
    Arc::new(RubricBoard::with_queries(queries))
}

async fn wait_for_row(board: &RubricBoard, kind: EntityKind, uuid: &str, expected: RowState) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while board.row_state(kind, uuid).await != expected {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("row never reached the expected state");
}

fn conflict(message: &str) -> ApiError {
    ApiError::Status {
        status: 409,
        message: message.to_string()
    }
}

#[tokio::test]
async fn test_delete_hides_row_before_server_answers() {
    let (api, board) = loaded_board().await;
    let gate = api.hold(call::delete_criterion("essay", "thesis"));

    let task = {
        let board = Arc::clone(&board);
        tokio::spawn(async move { board.delete_criterion("essay", "thesis").await })
    };

    wait_for_row(&board, EntityKind::Criterion, "thesis", RowState::Removing).await;
    let view = board.view().await;
    let essay = view.rubric("essay").unwrap();
    assert!(essay.criterion("thesis").is_none());
    assert!(essay.criterion("grammar").is_some());
    assert_eq!(api.calls(&call::delete_criterion("essay", "thesis")), 1);

    gate.notify_one();
    task.await.unwrap().unwrap();

    let view = board.view().await;
    assert!(view.rubric("essay").unwrap().criterion("thesis").is_none());
    assert_eq!(
        board.row_state(EntityKind::Criterion, "thesis").await,
        RowState::Idle
    );

    let notifications = board.drain_notifications().await;
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].level, NotificationLevel::Success);
    assert_eq!(notifications[0].message, "Criterion deleted");
}

#[tokio::test]
async fn test_failed_delete_keeps_row_hidden() {
    let (api, board) = loaded_board().await;
    api.fail(
        call::delete_criterion("essay", "thesis"),
        ApiError::Status {
            status: 500,
            message: String::new()
        }
    );

    let err = board
        .delete_criterion("essay", "thesis")
        .await
        .unwrap_err();
    let BoardActionError::Mutation(failure) = err else {
        panic!("expected a mutation failure, got {err:?}");
    };
    assert_eq!(failure.message, "Failed to delete criterion");

    assert_eq!(
        board.row_state(EntityKind::Criterion, "thesis").await,
        RowState::RemovalFailed
    );
    assert!(
        board
            .view()
            .await
            .rubric("essay")
            .unwrap()
            .criterion("thesis")
            .is_none()
    );

    // Still present on the server, so a reload must not bring it back.
    board.refresh().await;
    assert!(
        board
            .view()
            .await
            .rubric("essay")
            .unwrap()
            .criterion("thesis")
            .is_none()
    );

    let notifications = board.drain_notifications().await;
    assert_eq!(notifications.len(), 1);
    assert!(notifications[0].is_error());

    assert!(board.restore(EntityKind::Criterion, "thesis").await);
    assert!(
        board
            .view()
            .await
            .rubric("essay")
            .unwrap()
            .criterion("thesis")
            .is_some()
    );
    assert_eq!(
        board.row_state(EntityKind::Criterion, "thesis").await,
        RowState::Idle
    );
}

#[tokio::test]
async fn test_failure_notification_uses_server_message() {
    let (api, board) = loaded_board().await;
    api.fail(call::delete_rubric("lab"), conflict("Rubric is assigned to a course"));

    assert!(board.delete_rubric("lab").await.is_err());

    let notifications = board.drain_notifications().await;
    assert_eq!(notifications[0].message, "Rubric is assigned to a course");
    assert!(board.view().await.rubric("lab").is_none());
}

#[tokio::test]
async fn test_scoring_mutation_refetches_only_its_scope() {
    let (api, board) = loaded_board().await;
    api.reset_calls();

    let input = ScoringLevelInput {
        performance_expectation: Some("Adequate".to_string()),
        ..ScoringLevelInput::default()
    };
    let created = board
        .create_scoring("essay", "thesis", &input)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(api.calls(&call::create_scoring("essay", "thesis")), 1);
    assert_eq!(api.calls_with_prefix("list_"), 1);
    assert_eq!(api.calls(&call::list_scoring("essay", "thesis")), 1);

    let view = board.view().await;
    let thesis = view.rubric("essay").unwrap().criterion("thesis").unwrap();
    assert_eq!(thesis.scoring.len(), 3);
    assert!(thesis.scoring.iter().any(|level| level.uuid == created.uuid));
}

#[tokio::test]
async fn test_criterion_mutation_leaves_sibling_rubric_cached() {
    let (api, board) = loaded_board().await;
    api.reset_calls();

    let input = CriterionInput {
        component_name: Some("Evidence".to_string()),
        ..CriterionInput::default()
    };
    let created = board
        .create_criterion("essay", &input)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(api.calls(&call::list_criteria("essay")), 1);
    assert_eq!(api.calls(&call::list_scoring("essay", &created.uuid)), 1);
    assert_eq!(api.calls(&call::list_rubrics(OWNER)), 0);
    assert_eq!(api.calls(&call::list_criteria("lab")), 0);
    assert_eq!(api.calls_with_prefix("list_scoring:essay/thesis"), 0);
    assert_eq!(api.calls_with_prefix("list_scoring:lab"), 0);

    let view = board.view().await;
    assert_eq!(view.rubric("essay").unwrap().criteria.len(), 3);
}

#[tokio::test]
async fn test_rubric_delete_drops_its_children() {
    let (api, board) = loaded_board().await;
    assert_eq!(board.cache().len().await, 6);
    api.reset_calls();

    board.delete_rubric("essay").await.unwrap();

    let cache = board.cache();
    assert_eq!(api.calls(&call::list_rubrics(OWNER)), 1);
    assert_eq!(api.calls_with_prefix("list_criteria"), 0);
    assert_eq!(cache.len().await, 3);
    for key in [
        QueryKey::criteria("essay"),
        QueryKey::scoring("essay", "thesis"),
        QueryKey::scoring("essay", "grammar")
    ] {
        let state = cache.state(&key).await;
        assert_eq!(state.status, QueryStatus::Idle);
        assert!(state.data.is_none());
    }
    assert!(!cache.state(&QueryKey::criteria("lab")).await.is_stale);
    assert!(!cache.state(&QueryKey::scoring("lab", "method")).await.is_stale);
    assert_eq!(
        cache.state(&QueryKey::rubrics(OWNER)).await.status,
        QueryStatus::Success
    );

    let view = board.view().await;
    assert_eq!(view.trees.len(), 1);
    assert!(view.rubric("essay").is_none());
}

#[tokio::test]
async fn test_criterion_delete_drops_its_scoring_entry() {
    let (_api, board) = loaded_board().await;

    board.delete_criterion("essay", "thesis").await.unwrap();

    let cache = board.cache();
    assert_eq!(cache.len().await, 5);
    assert_eq!(
        cache.state(&QueryKey::scoring("essay", "thesis")).await.status,
        QueryStatus::Idle
    );
    assert_eq!(
        cache.state(&QueryKey::scoring("essay", "grammar")).await.status,
        QueryStatus::Success
    );
}

#[tokio::test]
async fn test_failed_delete_keeps_cache_entries() {
    let (api, board) = loaded_board().await;
    api.fail(call::delete_rubric("essay"), conflict("Rubric is in use"));

    assert!(board.delete_rubric("essay").await.is_err());

    let cache = board.cache();
    assert_eq!(cache.len().await, 6);
    assert_eq!(
        cache.state(&QueryKey::criteria("essay")).await.status,
        QueryStatus::Success
    );
}

#[tokio::test]
async fn test_load_for_previous_owner_is_discarded() {
    let api = Arc::new(course_api(OWNER).await);
    let board = board_for(&api);
    board.set_owner(Some(OWNER.to_string())).await;

    let gate = api.hold(call::list_rubrics(OWNER));
    let task = {
        let board = Arc::clone(&board);
        tokio::spawn(async move { board.refresh().await })
    };

    tokio::time::timeout(Duration::from_secs(5), async {
        while api.calls(&call::list_rubrics(OWNER)) == 0 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();

    board.set_owner(Some("ins-2".to_string())).await;
    gate.notify_one();

    assert!(!task.await.unwrap());
    let view = board.view().await;
    assert_eq!(view.instructor_uuid.as_deref(), Some("ins-2"));
    assert!(view.trees.is_empty());
}

#[tokio::test]
async fn test_board_without_owner_stays_empty() {
    let api = Arc::new(course_api(OWNER).await);
    let board = board_for(&api);

    assert!(board.refresh().await);
    let view = board.view().await;
    assert!(view.trees.is_empty());
    assert!(!view.is_loading);
    assert!(!view.is_error);

    let err = board
        .create_rubric(&RubricInput::default())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        BoardActionError::Board(BoardError::MissingIdentifier {
            identifier: "instructor_uuid".to_string()
        })
    );
    assert_eq!(api.total_calls(), 0);
}

#[tokio::test]
async fn test_saved_dialog_closes_on_success() {
    let (api, board) = loaded_board().await;
    api.respond_with_message(call::create_criterion("lab"), "Criterion saved");

    board
        .open_modal(ModalDescriptor::edit_rubric("lab"))
        .await
        .unwrap();
    board
        .open_modal(ModalDescriptor::create_criterion("lab"))
        .await
        .unwrap();
    assert_eq!(board.modal_depth().await, 2);

    board
        .create_criterion("lab", &CriterionInput::default())
        .await
        .unwrap();

    assert_eq!(board.modal_depth().await, 1);
    assert_eq!(
        board.active_modal().await,
        Some(ModalDescriptor::edit_rubric("lab"))
    );
    let notifications = board.drain_notifications().await;
    assert_eq!(notifications[0].message, "Criterion saved");
}

#[tokio::test]
async fn test_failed_save_keeps_dialog_open() {
    let (api, board) = loaded_board().await;
    api.fail(call::update_rubric("essay"), conflict("Title already in use"));

    board
        .open_modal(ModalDescriptor::edit_rubric("essay"))
        .await
        .unwrap();
    let input = RubricInput {
        title: Some("Lab Report".to_string()),
        ..RubricInput::default()
    };
    assert!(board.update_rubric("essay", &input).await.is_err());

    assert_eq!(board.modal_depth().await, 1);
    assert_eq!(
        board.row_state(EntityKind::Rubric, "essay").await,
        RowState::Idle
    );
    let notifications = board.drain_notifications().await;
    assert!(notifications[0].is_error());
    assert_eq!(notifications[0].message, "Title already in use");
    assert_eq!(
        board.view().await.rubric("essay").unwrap().rubric.title.as_deref(),
        Some("Essay")
    );
}

#[tokio::test]
async fn test_empty_identifier_is_rejected() {
    let (api, board) = loaded_board().await;
    api.reset_calls();

    let err = board.delete_scoring("essay", "", "thesis-a").await.unwrap_err();
    assert_eq!(
        err,
        BoardActionError::Board(BoardError::MissingIdentifier {
            identifier: "criteria_uuid".to_string()
        })
    );
    assert_eq!(api.total_calls(), 0);
}

#[tokio::test]
async fn test_selection_indexes_follow_the_view() {
    let (_api, board) = loaded_board().await;

    let rubrics = board.rubric_index().await;
    assert_eq!(rubrics.len(), 2);
    assert!(rubrics.contains("essay"));
    assert_eq!(
        rubrics.get("lab").and_then(|rubric| rubric.title.as_deref()),
        Some("Lab Report")
    );

    let criteria = board.criterion_index("essay").await;
    assert_eq!(criteria.len(), 2);
    assert!(criteria.contains("grammar"));
    assert!(!criteria.contains("method"));
}
