//! Tests for the fixture-backed cloud client

use engine_bridge::config::default_fixtures_dir;
use engine_bridge::{
    ApplyOptions, CloudBackend, CloudTaskClient, Error, FixtureCloudClient, Settings,
};

fn bundled() -> FixtureCloudClient {
    FixtureCloudClient::new(default_fixtures_dir())
}

#[smol_potat::test]
async fn test_lists_bundled_tasks() {
    let tasks = bundled().list().await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].id, "task-123");
    assert_eq!(tasks[0].status.as_deref(), Some("completed"));
}

#[smol_potat::test]
async fn test_shows_conversation_and_diff() {
    let client = bundled();
    let detail = client.show("task-123").await.unwrap();
    assert_eq!(detail.info.id, "task-123");
    assert_eq!(detail.conversation.len(), 2);
    assert_eq!(detail.conversation[0].role, "user");
    assert!(detail.diff.as_deref().unwrap().contains("sample.txt"));

    let diff = client.diff("task-123").await.unwrap();
    assert!(diff.contains("sample.txt"));
}

#[smol_potat::test]
async fn test_unknown_task_is_not_found() {
    match bundled().show("task-999").await {
        Err(Error::NotFound { id }) => assert_eq!(id, "task-999"),
        other => panic!("expected NotFound, got {other:?}"),
    }
    assert!(matches!(bundled().diff("task-999").await, Err(Error::NotFound { .. })));
}

#[smol_potat::test]
async fn test_apply_reports_fixture_branch() {
    let client = bundled();
    let outcome = client.apply("task-123", &ApplyOptions::default()).await.unwrap();
    assert_eq!(outcome.branch, "fixture/task-123");
    assert!(outcome.applied);

    let outcome = client
        .apply(
            "task-123",
            &ApplyOptions {
                branch: Some("review/sample".into()),
                three_way: true,
            },
        )
        .await
        .unwrap();
    assert_eq!(outcome.branch, "review/sample");
}

#[smol_potat::test]
async fn test_fixtures_are_not_a_real_cloud() {
    assert!(!bundled().is_available().await.unwrap());
}

#[smol_potat::test]
async fn test_task_without_diff_has_empty_diff() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("bare.json"), r#"{"id":"bare","title":"No diff"}"#).unwrap();

    let client = FixtureCloudClient::new(dir.path());
    assert_eq!(client.diff("bare").await.unwrap(), "");
    assert!(client.show("bare").await.unwrap().conversation.is_empty());
}

#[smol_potat::test]
async fn test_malformed_fixture_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("tasks.json"), "{ not json").unwrap();

    let result = FixtureCloudClient::new(dir.path()).list().await;
    assert!(matches!(result, Err(Error::Io(_))), "unexpected result: {result:?}");
}

#[smol_potat::test]
async fn test_unconfigured_direct_backend_uses_bundled_fixtures() {
    let settings = Settings::from_vars(Vec::<(String, String)>::new()).unwrap();
    let backend = settings.cloud.direct_backend();
    assert!(matches!(backend, CloudBackend::Fixture { .. }));

    let tasks = backend.connect().list().await.unwrap();
    assert_eq!(tasks[0].id, "task-123");
}
