//! End-to-end tests against fake engine and cloud binaries
//!
//! Everything lives in one test: writing an executable while another
//! thread forks can make exec fail with "text file busy".
#![cfg(unix)]

mod common;

use common::write_script;
use engine_bridge::{
    ApplyOptions, CliCloudClient, CloudTaskClient, EngineCapabilities, Error, ExecutionEvent,
    ExecutionRequest, Settings, engine_from_settings,
};
use futures::TryStreamExt;

const FAKE_CLOUD: &str = r#"
case "$1" in
  list)
    echo '[{"id":"t1","title":"One","status":"completed"}]'
    ;;
  show)
    if [ "$2" = "t1" ]; then
      echo '{"id":"t1","title":"One","conversation":[{"role":"user","content":"hi"}]}'
    else
      echo "task not found: $2" >&2
      exit 4
    fi
    ;;
  diff)
    if [ "$2" = "t1" ]; then
      printf -- '--- a/sample.txt\n+++ b/sample.txt\n'
    else
      echo "backend unavailable" >&2
      exit 1
    fi
    ;;
  apply)
    echo "{\"branch\":\"cli/$2\",\"applied\":true,\"message\":\"$*\"}"
    ;;
  *)
    echo "unknown command $1" >&2
    exit 2
    ;;
esac
"#;

const FAKE_ENGINE: &str = r#"
if [ "$1" = "--help" ]; then
  echo "Usage: code [--mcp-config FILE] [--chrome-path PATH]"
  exit 0
fi
read -r prompt
printf '{"type":"start"}\n'
printf '{"type":"done","result":{"args":"%s","prompt":"%s"}}\n' "$*" "$prompt"
"#;

const BROKEN_CLOUD: &str = "echo 'this is not json'";

#[test]
fn test_fake_binaries() {
    futures::executor::block_on(async {
        let dir = tempfile::tempdir().unwrap();
        let cloud_bin = write_script(dir.path(), "ade-cloud", FAKE_CLOUD).unwrap();
        let broken_bin = write_script(dir.path(), "broken-cloud", BROKEN_CLOUD).unwrap();
        let engine_bin = write_script(dir.path(), "code", FAKE_ENGINE).unwrap();

        cli_cloud_operations(&cloud_bin.to_string_lossy()).await;
        cli_cloud_bad_output(&broken_bin.to_string_lossy()).await;
        cli_engine_end_to_end(&engine_bin.to_string_lossy(), &cloud_bin.to_string_lossy()).await;
    });
}

async fn cli_cloud_operations(binary: &str) {
    let client = CliCloudClient::new(binary);

    let tasks = client.list().await.unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "One");

    let detail = client.show("t1").await.unwrap();
    assert_eq!(detail.conversation.len(), 1);

    match client.show("nope").await {
        Err(Error::NotFound { id }) => assert_eq!(id, "nope"),
        other => panic!("expected NotFound, got {other:?}"),
    }

    match client.diff("nope").await {
        Err(Error::RemoteRequest { reason, .. }) => assert_eq!(reason, "backend unavailable"),
        other => panic!("expected RemoteRequest, got {other:?}"),
    }

    assert_eq!(client.diff("t1").await.unwrap(), "--- a/sample.txt\n+++ b/sample.txt");

    let outcome = client
        .apply(
            "t1",
            &ApplyOptions {
                branch: Some("review".into()),
                three_way: true,
            },
        )
        .await
        .unwrap();
    assert_eq!(outcome.branch, "cli/t1");
    assert_eq!(outcome.message.as_deref(), Some("apply t1 --branch review --three-way --json"));

    let outcome = client.apply("t1", &ApplyOptions::default()).await.unwrap();
    assert_eq!(outcome.message.as_deref(), Some("apply t1 --json"));

    assert!(client.is_available().await.unwrap());
}

async fn cli_cloud_bad_output(binary: &str) {
    let client = CliCloudClient::new(binary);
    match client.list().await {
        Err(Error::RemoteRequest { reason, .. }) => assert!(reason.contains("this is not json")),
        other => panic!("expected RemoteRequest, got {other:?}"),
    }
}

async fn cli_engine_end_to_end(engine_bin: &str, cloud_bin: &str) {
    let settings = Settings::from_vars([
        ("ADE_ENGINE", "code"),
        ("CODE_ENGINE_BIN", engine_bin),
        ("ADE_CLOUD_BIN", cloud_bin),
    ])
    .unwrap();
    let engine = engine_from_settings(&settings).unwrap();

    let events: Vec<ExecutionEvent> = engine
        .exec(&ExecutionRequest::new("fix the bug\n").arg("--quiet"))
        .unwrap()
        .try_collect()
        .await
        .unwrap();
    assert_eq!(events.len(), 2);
    match &events[1] {
        ExecutionEvent::Done { result: Some(result) } => {
            assert_eq!(result["args"], "exec --jsonl --quiet");
            assert_eq!(result["prompt"], "fix the bug");
        }
        other => panic!("unexpected event: {other:?}"),
    }

    assert_eq!(
        engine.capabilities().await.unwrap(),
        EngineCapabilities {
            supports_browser_control: true,
            supports_mcp: true,
            supports_cloud: true,
        }
    );

    let tasks = engine.cloud().list().await.unwrap();
    assert_eq!(tasks[0].id, "t1");
}
