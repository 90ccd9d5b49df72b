//! Bridge-side integration tests: the session pool against a live game
//! server, request/response correlation, and the per-user SSE fan-out.

use std::sync::Arc;

use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::time::{Duration, timeout};

use quizwire::error::ServiceError;
use quizwire::server::GameServer;
use quizwire::state::session::SessionPool;
use quizwire::state::sse::SseRegistry;

async fn spawn_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let server = GameServer::new();
    tokio::spawn(server.serve(listener));
    addr
}

fn frame_type(value: &Value) -> &str {
    value.get("type").and_then(Value::as_str).unwrap_or_default()
}

#[tokio::test]
async fn connect_completes_the_register_handshake_and_reuses_sessions() {
    let addr = spawn_server().await;
    let pool = SessionPool::new();
    let sse = SseRegistry::new(8);

    let first = pool.connect("alice", &addr, sse.clone()).await.unwrap();
    assert!(first.is_connected());
    assert_eq!(first.username(), "alice");

    let second = pool.connect("alice", &addr, sse.clone()).await.unwrap();
    assert!(Arc::ptr_eq(&first, &second), "live session must be reused");
}

#[tokio::test]
async fn create_and_join_correlate_with_their_push_frames() {
    let addr = spawn_server().await;
    let pool = SessionPool::new();
    let sse = SseRegistry::new(8);

    let alice = pool.connect("alice", &addr, sse.clone()).await.unwrap();
    let bob = pool.connect("bob", &addr, sse.clone()).await.unwrap();

    let created = alice
        .request_and_wait(
            &json!({"type": "CREATE_GAME", "username": "alice", "theme": "Math"}),
            "GAME_CREATED",
            |_| true,
        )
        .await
        .unwrap();
    let pin = created["game"]["pin"].as_str().unwrap().to_string();
    assert_eq!(pin.len(), 6);

    let joined = bob
        .request_and_wait(
            &json!({"type": "JOIN_GAME", "pin": pin, "username": "bob"}),
            "JOINED_GAME",
            |frame| frame["game"]["pin"].as_str() == Some(pin.as_str()),
        )
        .await
        .unwrap();
    assert_eq!(joined["game"]["players"], json!(["alice", "bob"]));
}

#[tokio::test]
async fn session_frames_reach_the_sse_hub() {
    let addr = spawn_server().await;
    let pool = SessionPool::new();
    let sse = SseRegistry::new(8);

    // Subscribe before connecting so even the handshake frame is observed.
    let mut stream = sse.subscribe("alice");

    let alice = pool.connect("alice", &addr, sse.clone()).await.unwrap();
    let event = timeout(Duration::from_secs(2), stream.recv())
        .await
        .unwrap()
        .unwrap();
    let frame: Value = serde_json::from_str(&event.data).unwrap();
    assert_eq!(frame_type(&frame), "REGISTER_OK");

    alice
        .send(&json!({"type": "CREATE_GAME", "username": "alice"}))
        .unwrap();
    let event = timeout(Duration::from_secs(2), stream.recv())
        .await
        .unwrap()
        .unwrap();
    let frame: Value = serde_json::from_str(&event.data).unwrap();
    assert_eq!(frame_type(&frame), "GAME_CREATED");
}

#[tokio::test]
async fn waiting_for_a_frame_that_never_comes_times_out() {
    let addr = spawn_server().await;
    let pool = SessionPool::new();
    let sse = SseRegistry::new(8);
    let alice = pool.connect("alice", &addr, sse.clone()).await.unwrap();

    // From here on the clock is virtual, so the five-second subscription
    // timer fires as soon as the runtime goes idle.
    tokio::time::pause();

    let err = alice
        .request_and_wait(
            &json!({"type": "LIST_GAMES"}),
            "GAME_CREATED",
            |_| true,
        )
        .await
        .unwrap_err();

    match err {
        ServiceError::Timeout(awaited) => assert_eq!(awaited, "GAME_CREATED"),
        other => panic!("expected a timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn unregistered_usernames_are_not_connected() {
    let pool = SessionPool::new();
    assert!(matches!(
        pool.get("ghost"),
        Err(ServiceError::NotConnected)
    ));
}
