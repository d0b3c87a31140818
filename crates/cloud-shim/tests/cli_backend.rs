//! The library's CLI cloud backend driving the real `ade-cloud` binary
//! against the bundled fixtures

use engine_bridge::{ApplyOptions, CliCloudClient, CloudTaskClient, Error};

fn client() -> CliCloudClient {
    CliCloudClient::new(env!("CARGO_BIN_EXE_ade-cloud"))
}

#[test]
fn test_unknown_task_is_not_found() {
    smol::block_on(async {
        let client = client();

        match client.show("task-999").await {
            Err(Error::NotFound { id }) => assert_eq!(id, "task-999"),
            other => panic!("expected NotFound, got {other:?}"),
        }
        match client.diff("task-999").await {
            Err(Error::NotFound { id }) => assert_eq!(id, "task-999"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    });
}

#[test]
fn test_fixture_task_round_trips_through_the_binary() {
    smol::block_on(async {
        let client = client();

        let tasks = client.list().await.unwrap();
        assert_eq!(tasks[0].id, "task-123");

        let detail = client.show("task-123").await.unwrap();
        assert_eq!(detail.conversation.len(), 2);
        assert!(client.diff("task-123").await.unwrap().contains("sample.txt"));

        let outcome = client.apply("task-123", &ApplyOptions::default()).await.unwrap();
        assert_eq!(outcome.branch, "fixture/task-123");
    });
}
