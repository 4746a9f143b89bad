use chrono::NaiveDate;
use wellnest_core::db::migrations::latest_version;
use wellnest_core::db::open_db_in_memory;
use wellnest_core::{
    CapacityPolicy, Goal, GoalListQuery, GoalRepository, GoalService, GoalServiceError,
    GoalStatus, RepoError, SqliteGoalRepository,
};
use rusqlite::Connection;
use uuid::Uuid;

#[test]
fn create_and_get_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteGoalRepository::try_new(&conn).unwrap();

    let mut goal = Goal::new("Run 5k", "fitness", GoalStatus::Active);
    goal.target_date = NaiveDate::from_ymd_opt(2026, 12, 31);
    let id = repo.create_goal(&goal).unwrap();

    let loaded = repo.get_goal(id).unwrap().unwrap();
    assert_eq!(loaded.id, goal.id);
    assert_eq!(loaded.title, "Run 5k");
    assert_eq!(loaded.category, "fitness");
    assert_eq!(loaded.status, GoalStatus::Active);
    assert_eq!(loaded.target_date, NaiveDate::from_ymd_opt(2026, 12, 31));
    assert_eq!(loaded.progress, 0);
    assert!(loaded.created_at > 0);
}

#[test]
fn create_rejects_invalid_goal() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteGoalRepository::try_new(&conn).unwrap();

    let goal = Goal::new("   ", "fitness", GoalStatus::Backlog);
    let err = repo.create_goal(&goal).unwrap_err();
    assert!(matches!(err, RepoError::GoalValidation(_)));
    assert_eq!(repo.count_active().unwrap(), 0);
}

#[test]
fn update_missing_goal_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteGoalRepository::try_new(&conn).unwrap();

    let goal = Goal::new("ghost", "misc", GoalStatus::Backlog);
    let err = repo.update_goal(&goal).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == goal.id));
}

#[test]
fn list_filters_by_status_and_category() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteGoalRepository::try_new(&conn).unwrap();

    repo.create_goal(&Goal::new("a", "Health", GoalStatus::Active))
        .unwrap();
    repo.create_goal(&Goal::new("b", "health", GoalStatus::Backlog))
        .unwrap();
    repo.create_goal(&Goal::new("c", "career", GoalStatus::Active))
        .unwrap();

    let active = repo
        .list_goals(&GoalListQuery {
            status: Some(GoalStatus::Active),
            ..GoalListQuery::default()
        })
        .unwrap();
    assert_eq!(active.len(), 2);

    let health = repo
        .list_goals(&GoalListQuery {
            category: Some("HEALTH".to_string()),
            ..GoalListQuery::default()
        })
        .unwrap();
    assert_eq!(health.len(), 2);
    assert_eq!(repo.count_active().unwrap(), 2);
}

#[test]
fn delete_removes_only_target_goal() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteGoalRepository::try_new(&conn).unwrap();

    let keep = Goal::new("keep", "misc", GoalStatus::Active);
    let drop_me = Goal::new("drop", "misc", GoalStatus::Active);
    repo.create_goal(&keep).unwrap();
    repo.create_goal(&drop_me).unwrap();

    repo.delete_goal(drop_me.id).unwrap();
    assert!(repo.get_goal(drop_me.id).unwrap().is_none());
    assert!(repo.get_goal(keep.id).unwrap().is_some());
    assert_eq!(repo.count_active().unwrap(), 1);

    let err = repo.delete_goal(drop_me.id).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(_)));
}

#[test]
fn completing_goal_frees_an_active_slot() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteGoalRepository::try_new(&conn).unwrap();
    let goal = Goal::new("Ship it", "career", GoalStatus::Active);
    repo.create_goal(&goal).unwrap();
    let service = GoalService::new(repo, CapacityPolicy::default());

    let completed = service.complete_goal(goal.id).unwrap();
    assert_eq!(completed.status, GoalStatus::Completed);
    assert_eq!(completed.progress, 100);
    assert_eq!(service.count_active().unwrap(), 0);
}

#[test]
fn progress_updates_and_reopen_into_backlog() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteGoalRepository::try_new(&conn).unwrap();
    let goal = Goal::new("Meditate", "mind", GoalStatus::Active);
    repo.create_goal(&goal).unwrap();
    let service = GoalService::new(repo, CapacityPolicy::default());

    let updated = service.update_progress(goal.id, 40).unwrap();
    assert_eq!(updated.progress, 40);
    assert_eq!(updated.status, GoalStatus::Active);

    let done = service.update_progress(goal.id, 100).unwrap();
    assert_eq!(done.status, GoalStatus::Completed);

    let reopened = service.update_progress(goal.id, 90).unwrap();
    assert_eq!(reopened.status, GoalStatus::Backlog);
    assert_eq!(reopened.progress, 90);

    let err = service.update_progress(goal.id, 101).unwrap_err();
    assert!(matches!(err, GoalServiceError::Validation(_)));
}

#[test]
fn service_delete_of_missing_goal_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = GoalService::new(
        SqliteGoalRepository::try_new(&conn).unwrap(),
        CapacityPolicy::default(),
    );

    let missing = Uuid::new_v4();
    let err = service.delete_goal(missing).unwrap_err();
    assert!(matches!(err, GoalServiceError::GoalNotFound(id) if id == missing));
}

#[test]
fn repository_rejects_unmigrated_connection() {
    let conn = Connection::open_in_memory().unwrap();
    let err = match SqliteGoalRepository::try_new(&conn) {
        Ok(_) => panic!("unmigrated connection must be rejected"),
        Err(err) => err,
    };
    match err {
        RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        } => {
            assert_eq!(expected_version, latest_version());
            assert_eq!(actual_version, 0);
        }
        other => panic!("unexpected error: {other}"),
    }
}
