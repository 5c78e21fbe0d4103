use std::time::Duration;

use codeplay::{
    AckResponse, EventStream, SessionEvent, SessionId, StartRequest, StartResponse, StreamKind,
};

use super::{fixture_source, scratch_is_empty, test_runner, toolchain_available};

const WAIT: Duration = Duration::from_secs(30);

fn start(language: &str, fixture: &str) -> StartRequest {
    StartRequest {
        language: language.to_owned(),
        code: fixture_source(fixture),
    }
}

fn started(response: StartResponse) -> SessionId {
    match response {
        StartResponse::Started { session_id } => session_id,
        StartResponse::Failed { error } => panic!("Failed to start session: {error}"),
    }
}

async fn next_event(events: &mut EventStream) -> SessionEvent {
    tokio::time::timeout(WAIT, events.recv())
        .await
        .expect("Timed out waiting for event")
        .expect("Event stream closed")
}

#[tokio::test]
async fn test_javascript_ready_then_exit() {
    let (runner, mut events) = test_runner("js-ready");
    if !toolchain_available(&runner, "javascript") {
        return;
    }

    let id = started(runner.start_run(&start("javascript", "ready.js")).await);

    assert_eq!(
        next_event(&mut events).await,
        SessionEvent::Output {
            session_id: id.clone(),
            stream_kind: StreamKind::Stdout,
            data: "ready\n".to_owned(),
        }
    );
    match next_event(&mut events).await {
        SessionEvent::Exit { session_id, exit } => {
            assert_eq!(session_id, id);
            assert_eq!(exit.exit_code, Some(0));
            assert_eq!(exit.signal, None);
        }
        other => panic!("Expected exit event, got {other:?}"),
    }
    assert!(scratch_is_empty(&runner));
}

#[tokio::test]
async fn test_javascript_prompt_and_reply() {
    let (runner, mut events) = test_runner("js-prompt");
    if !toolchain_available(&runner, "javascript") {
        return;
    }

    let id = started(runner.start_run(&start("javascript", "prompt.js")).await);

    let mut stdout = String::new();
    while !stdout.contains("name?") {
        if let SessionEvent::Output { data, .. } = next_event(&mut events).await {
            stdout.push_str(&data);
        }
    }

    assert_eq!(runner.send_input(&id, "Ada").await, AckResponse::ok());

    loop {
        match next_event(&mut events).await {
            SessionEvent::Output { data, .. } => stdout.push_str(&data),
            SessionEvent::Exit { exit, .. } => {
                assert_eq!(exit.exit_code, Some(0));
                break;
            }
        }
    }
    assert_eq!(stdout, "name?\nhello Ada\n");
}

#[tokio::test]
async fn test_input_to_unknown_session() {
    let (runner, _events) = test_runner("unknown-session");

    let ack = runner
        .send_input(&SessionId::from("no-such-session"), "hello")
        .await;

    assert!(!ack.ok);
    assert!(ack.error.is_some());
}

#[tokio::test]
async fn test_stop_long_running_python() {
    let (runner, mut events) = test_runner("py-stop");
    if !toolchain_available(&runner, "python") {
        return;
    }

    let id = started(runner.start_run(&start("python", "forever.py")).await);
    match next_event(&mut events).await {
        SessionEvent::Output { data, .. } => assert_eq!(data, "waiting\n"),
        other => panic!("Expected output event, got {other:?}"),
    }

    assert_eq!(runner.stop_run(&id).await, AckResponse::ok());

    match next_event(&mut events).await {
        SessionEvent::Exit { session_id, exit } => {
            assert_eq!(session_id, id);
            assert!(exit.signal.is_some());
        }
        other => panic!("Expected exit event, got {other:?}"),
    }
    assert!(runner.active_sessions().await.is_empty());
    assert!(scratch_is_empty(&runner));
}

#[tokio::test]
async fn test_compile_error_starts_no_session() {
    let (runner, _events) = test_runner("c-session-error");
    if !toolchain_available(&runner, "c") {
        return;
    }

    match runner.start_run(&start("c", "compile_error.c")).await {
        StartResponse::Failed { error } => assert!(error.contains("undefined_symbol"), "{error}"),
        other => panic!("Expected failure, got {other:?}"),
    }
    assert!(runner.active_sessions().await.is_empty());
    assert!(scratch_is_empty(&runner));
}
