//! Tests for engine cleanup when a stream is abandoned
#![cfg(unix)]

mod common;

use common::{is_alive, scripted_engine, wait_until_gone};
use engine_bridge::ExecutionRequest;
use futures::StreamExt;

#[test]
fn test_engine_killed_when_stream_dropped_mid_run() {
    futures::executor::block_on(async {
        let bridge = scripted_engine(
            r#"cat >/dev/null
while true; do printf '{"type":"token","value":"tick"}\n'; sleep 0.1; done"#,
        );
        let mut stream = bridge.exec(&ExecutionRequest::new("prompt")).unwrap();
        let pid = stream.pid();

        assert_eq!(stream.next().await.unwrap().unwrap().kind(), "token");
        assert!(is_alive(pid));

        drop(stream);

        assert!(wait_until_gone(pid).await, "engine should be killed when the stream is dropped");
    });
}

#[test]
fn test_engine_killed_when_stream_never_polled() {
    futures::executor::block_on(async {
        let bridge = scripted_engine("exec sleep 30");
        let stream = bridge.exec(&ExecutionRequest::new("prompt")).unwrap();
        let pid = stream.pid();

        drop(stream);

        assert!(wait_until_gone(pid).await, "unpolled engine should be killed on drop");
    });
}
