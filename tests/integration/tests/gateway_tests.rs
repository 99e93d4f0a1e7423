//! Gateway end-to-end tests over real sockets
//!
//! Everything runs in-process: in-memory directories and message store,
//! and the in-process bus. No external services are needed.
//!
//! Run with: cargo test -p integration-tests --test gateway_tests

use std::time::Duration;

use integration_tests::{
    assert_json, assert_status, chat_message, join_room, leave_room, Closed, TestBackend,
    TestServer, TestServerOptions,
};
use lunar_common::WebSocketConfig;
use lunar_core::RoomDirectory;
use lunar_gateway::protocol::IncomingCallPayload;
use reqwest::StatusCode;
use serde_json::Value;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use uuid::Uuid;

// ============================================================================
// Messaging
// ============================================================================

#[tokio::test]
async fn test_message_reaches_every_member_and_is_stored() {
    let backend = TestBackend::in_memory();
    let server = TestServer::start(&backend).await.unwrap();
    let (room_id, slug) = backend.room();
    let (alice, alice_token) = backend.user("alice").unwrap();
    let (_bob, bob_token) = backend.user("bob").unwrap();

    let mut a = server.connect(&slug, &alice_token).await.unwrap();
    let mut b = server.connect(&room_id.to_string(), &bob_token).await.unwrap();
    server.wait_for_connections(2).await.unwrap();

    a.send_json(&chat_message(room_id, "hello")).await.unwrap();

    for client in [&mut a, &mut b] {
        let message = client.expect("new_message").await.unwrap();
        assert_eq!(message["content"], "hello");
        assert_eq!(message["roomId"], room_id.to_string());
        assert_eq!(message["sender"]["id"], alice.id.to_string());
        assert_eq!(message["sender"]["username"], alice.username);
    }

    let stored = backend.messages.all();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].content, "hello");
    assert_eq!(stored[0].sender.id, alice.id);
}

#[tokio::test]
async fn test_slug_in_payload_addresses_the_room() {
    let backend = TestBackend::in_memory();
    let server = TestServer::start(&backend).await.unwrap();
    let (room_id, slug) = backend.room();
    let (_alice, token) = backend.user("alice").unwrap();

    let mut a = server.connect(&slug, &token).await.unwrap();
    a.send_json(&serde_json::json!({
        "type": "chat_message",
        "payload": { "room_id": slug, "content": "by slug" }
    }))
    .await
    .unwrap();

    let message = a.expect("new_message").await.unwrap();
    assert_eq!(message["roomId"], room_id.to_string());
}

#[tokio::test]
async fn test_oversized_message_is_rejected_to_sender_only() {
    let backend = TestBackend::in_memory();
    let server = TestServer::start(&backend).await.unwrap();
    let (room_id, slug) = backend.room();
    let (_alice, alice_token) = backend.user("alice").unwrap();
    let (_bob, bob_token) = backend.user("bob").unwrap();

    let mut a = server.connect(&slug, &alice_token).await.unwrap();
    let mut b = server.connect(&slug, &bob_token).await.unwrap();
    server.wait_for_connections(2).await.unwrap();

    a.send_json(&chat_message(room_id, &"x".repeat(6000))).await.unwrap();

    let error = a.expect("error").await.unwrap();
    assert_eq!(error["code"], "CONTENT_TOO_LONG");
    b.expect_silence().await.unwrap();
    assert!(backend.messages.is_empty());

    // The connection is still usable
    a.send_json(&chat_message(room_id, "short")).await.unwrap();
    assert_eq!(a.expect("new_message").await.unwrap()["content"], "short");
    assert_eq!(b.expect("new_message").await.unwrap()["content"], "short");
}

#[tokio::test]
async fn test_malformed_frames_keep_connection_open() {
    let backend = TestBackend::in_memory();
    let server = TestServer::start(&backend).await.unwrap();
    let (room_id, slug) = backend.room();
    let (_alice, token) = backend.user("alice").unwrap();

    let mut a = server.connect(&slug, &token).await.unwrap();

    a.send_text("not json").await.unwrap();
    assert_eq!(a.expect("error").await.unwrap()["code"], "INVALID_FRAME");

    a.send_json(&serde_json::json!({ "type": "chat_message", "payload": { "content": "no room" } }))
        .await
        .unwrap();
    assert_eq!(a.expect("error").await.unwrap()["code"], "INVALID_FRAME");

    a.send_json(&chat_message(room_id, "   ")).await.unwrap();
    assert_eq!(a.expect("error").await.unwrap()["code"], "EMPTY_CONTENT");

    // Unknown kinds are ignored
    a.send_json(&serde_json::json!({ "type": "typing", "payload": {} }))
        .await
        .unwrap();
    a.expect_silence().await.unwrap();

    a.send_json(&chat_message(room_id, "still here")).await.unwrap();
    assert_eq!(a.expect("new_message").await.unwrap()["content"], "still here");
}

#[tokio::test]
async fn test_messages_arrive_in_send_order() {
    let backend = TestBackend::in_memory();
    let server = TestServer::start(&backend).await.unwrap();
    let (room_id, slug) = backend.room();
    let (_alice, alice_token) = backend.user("alice").unwrap();
    let (_bob, bob_token) = backend.user("bob").unwrap();

    let mut a = server.connect(&slug, &alice_token).await.unwrap();
    let mut b = server.connect(&slug, &bob_token).await.unwrap();
    server.wait_for_connections(2).await.unwrap();

    for i in 0..20 {
        a.send_json(&chat_message(room_id, &format!("m{i}"))).await.unwrap();
    }
    for i in 0..20 {
        assert_eq!(b.expect("new_message").await.unwrap()["content"], format!("m{i}"));
    }
}

#[tokio::test]
async fn test_message_to_foreign_room_is_rejected() {
    let backend = TestBackend::in_memory();
    let server = TestServer::start(&backend).await.unwrap();
    let (_home, home_slug) = backend.room();
    let (foreign_id, _) = backend.room();
    let (_alice, token) = backend.user("alice").unwrap();

    let mut a = server.connect(&home_slug, &token).await.unwrap();
    a.send_json(&chat_message(foreign_id, "sneaky")).await.unwrap();

    assert_eq!(a.expect("error").await.unwrap()["code"], "NOT_ROOM_MEMBER");
    assert!(backend.messages.is_empty());
}

#[tokio::test]
async fn test_store_failure_is_not_broadcast() {
    let backend = TestBackend::in_memory();
    let server = TestServer::start(&backend).await.unwrap();
    let (room_id, slug) = backend.room();
    let (_alice, alice_token) = backend.user("alice").unwrap();
    let (_bob, bob_token) = backend.user("bob").unwrap();

    let mut a = server.connect(&slug, &alice_token).await.unwrap();
    let mut b = server.connect(&slug, &bob_token).await.unwrap();
    server.wait_for_connections(2).await.unwrap();

    backend.messages.fail_writes(true);
    a.send_json(&chat_message(room_id, "lost")).await.unwrap();

    assert_eq!(a.expect("error").await.unwrap()["code"], "DATABASE_ERROR");
    b.expect_silence().await.unwrap();
}

// ============================================================================
// Room membership
// ============================================================================

#[tokio::test]
async fn test_leave_room_stops_delivery() {
    let backend = TestBackend::in_memory();
    let server = TestServer::start(&backend).await.unwrap();
    let (room_id, slug) = backend.room();
    let (_alice, alice_token) = backend.user("alice").unwrap();
    let (_bob, bob_token) = backend.user("bob").unwrap();

    let mut a = server.connect(&slug, &alice_token).await.unwrap();
    let mut b = server.connect(&slug, &bob_token).await.unwrap();
    server.wait_for_connections(2).await.unwrap();

    a.send_json(&leave_room(room_id)).await.unwrap();
    a.expect_silence().await.unwrap();

    b.send_json(&chat_message(room_id, "anyone?")).await.unwrap();
    assert_eq!(b.expect("new_message").await.unwrap()["content"], "anyone?");
    a.expect_silence().await.unwrap();
}

#[tokio::test]
async fn test_join_room_adds_a_second_room() {
    let backend = TestBackend::in_memory();
    let server = TestServer::start(&backend).await.unwrap();
    let (_first, first_slug) = backend.room();
    let (second_id, second_slug) = backend.room();
    let (alice, alice_token) = backend.user("alice").unwrap();
    let (_bob, bob_token) = backend.user("bob").unwrap();

    let mut a = server.connect(&first_slug, &alice_token).await.unwrap();
    let mut b = server.connect(&second_slug, &bob_token).await.unwrap();
    server.wait_for_connections(2).await.unwrap();

    // Not a member yet
    a.send_json(&join_room(second_id)).await.unwrap();
    assert_eq!(a.expect("error").await.unwrap()["code"], "NOT_ROOM_MEMBER");

    backend.rooms.add_member(second_id, alice.id).await.unwrap();
    a.send_json(&join_room(second_id)).await.unwrap();
    a.expect_silence().await.unwrap();

    b.send_json(&chat_message(second_id, "welcome")).await.unwrap();
    assert_eq!(a.expect("new_message").await.unwrap()["content"], "welcome");
}

#[tokio::test]
async fn test_connecting_makes_user_a_member() {
    let backend = TestBackend::in_memory();
    let server = TestServer::start(&backend).await.unwrap();
    let (room_id, slug) = backend.room();
    let (_alice, token) = backend.user("alice").unwrap();

    assert_eq!(backend.rooms.member_count(room_id), 0);
    let _a = server.connect(&slug, &token).await.unwrap();
    server.wait_for_connections(1).await.unwrap();
    assert_eq!(backend.rooms.member_count(room_id), 1);
}

#[tokio::test]
async fn test_rejected_upgrade_grants_no_membership() {
    let backend = TestBackend::in_memory();
    let server = TestServer::start(&backend).await.unwrap();
    let (room_id, slug) = backend.room();
    let (_alice, token) = backend.user("alice").unwrap();

    // Authenticated, resolvable room, but not a WebSocket handshake
    let response = server.get_auth(&format!("/rooms/{slug}/ws"), &token).await.unwrap();
    assert!(response.status().is_client_error());
    assert_eq!(backend.rooms.member_count(room_id), 0);
}

#[tokio::test]
async fn test_membership_failure_closes_socket_with_internal_error() {
    let backend = TestBackend::in_memory();
    let server = TestServer::start(&backend).await.unwrap();
    let (room_id, slug) = backend.room();
    let (_alice, token) = backend.user("alice").unwrap();
    backend.rooms.fail_membership_writes(true);

    let mut a = server.connect(&slug, &token).await.unwrap();

    assert_eq!(a.expect_close().await.unwrap(), Closed::Code(1011));
    assert_eq!(backend.rooms.member_count(room_id), 0);
    assert_eq!(server.gateway.active_connections(), 0);
}

#[tokio::test]
async fn test_frame_over_size_limit_closes_only_that_socket() {
    let backend = TestBackend::in_memory();
    let server = TestServer::start_with(
        &backend,
        TestServerOptions {
            websocket: WebSocketConfig {
                max_message_bytes: 16 * 1024,
                ..WebSocketConfig::default()
            },
            ..TestServerOptions::default()
        },
    )
    .await
    .unwrap();
    let (room_id, slug) = backend.room();
    let (_alice, alice_token) = backend.user("alice").unwrap();
    let (_bob, bob_token) = backend.user("bob").unwrap();

    let mut a = server.connect(&slug, &alice_token).await.unwrap();
    let mut b = server.connect(&slug, &bob_token).await.unwrap();
    server.wait_for_connections(2).await.unwrap();

    a.send_text(&"x".repeat(64 * 1024)).await.unwrap();
    a.expect_close().await.unwrap();
    server.wait_for_connections(1).await.unwrap();
    assert!(backend.messages.is_empty());

    b.send_json(&chat_message(room_id, "still up")).await.unwrap();
    assert_eq!(b.expect("new_message").await.unwrap()["content"], "still up");
}

// ============================================================================
// Direct events
// ============================================================================

#[tokio::test]
async fn test_incoming_call_reaches_every_socket_of_the_callee() {
    let backend = TestBackend::in_memory();
    let server = TestServer::start(&backend).await.unwrap();
    let (_room_a, slug_a) = backend.room();
    let (_room_b, slug_b) = backend.room();
    let (callee, callee_token) = backend.user("callee").unwrap();
    let (caller, caller_token) = backend.user("caller").unwrap();

    let mut phone = server.connect(&slug_a, &callee_token).await.unwrap();
    let mut laptop = server.connect(&slug_b, &callee_token).await.unwrap();
    let mut other = server.connect(&slug_a, &caller_token).await.unwrap();
    server.wait_for_connections(3).await.unwrap();

    let call = IncomingCallPayload {
        caller_id: caller.id,
        caller_name: caller.username.clone(),
        room_name: "standup".to_string(),
    };
    server.gateway.relay().incoming_call(callee.id, &call).await.unwrap();

    for client in [&mut phone, &mut laptop] {
        let payload = client.expect("incoming_call").await.unwrap();
        assert_eq!(payload["caller_id"], caller.id.to_string());
        assert_eq!(payload["caller_name"], caller.username);
        assert_eq!(payload["room_name"], "standup");
    }
    other.expect_silence().await.unwrap();
}

#[tokio::test]
async fn test_relay_fans_out_across_gateways() {
    let backend = TestBackend::in_memory();
    let first = TestServer::start(&backend).await.unwrap();
    let second = TestServer::start(&backend).await.unwrap();
    let (room_id, slug) = backend.room();
    let (_alice, alice_token) = backend.user("alice").unwrap();
    let (_bob, bob_token) = backend.user("bob").unwrap();

    let mut a = first.connect(&slug, &alice_token).await.unwrap();
    let mut b = second.connect(&slug, &bob_token).await.unwrap();
    first.wait_for_connections(1).await.unwrap();
    second.wait_for_connections(1).await.unwrap();

    a.send_json(&chat_message(room_id, "across")).await.unwrap();
    assert_eq!(b.expect("new_message").await.unwrap()["content"], "across");
}

// ============================================================================
// Handshake
// ============================================================================

#[tokio::test]
async fn test_handshake_rejections() {
    let backend = TestBackend::in_memory();
    let server = TestServer::start_with(
        &backend,
        TestServerOptions {
            allowed_origins: vec!["https://lunar.example".to_string()],
            ..TestServerOptions::default()
        },
    )
    .await
    .unwrap();
    let (_room_id, slug) = backend.room();
    let (_alice, token) = backend.user("alice").unwrap();
    let origin = Some("https://lunar.example");

    // Missing and invalid tokens
    assert_eq!(server.handshake_status(&slug, None, origin).await.unwrap(), 401);
    assert_eq!(
        server.handshake_status(&slug, Some("garbage"), origin).await.unwrap(),
        401
    );

    // Valid token for a user that no longer exists
    let ghost = backend.jwt.issue_access_token(Uuid::now_v7()).unwrap();
    assert_eq!(server.handshake_status(&slug, Some(&ghost), origin).await.unwrap(), 401);

    // Origin not on the allow-list
    assert_eq!(
        server
            .handshake_status(&slug, Some(&token), Some("https://evil.example"))
            .await
            .unwrap(),
        403
    );

    // Unknown and malformed rooms
    assert_eq!(
        server
            .handshake_status("zzzzzzzzzzz", Some(&token), origin)
            .await
            .unwrap(),
        404
    );
    assert_eq!(
        server.handshake_status("not-a-room", Some(&token), origin).await.unwrap(),
        400
    );

    assert_eq!(server.handshake_status(&slug, Some(&token), origin).await.unwrap(), 101);
    server.wait_for_connections(0).await.unwrap();
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_client_close_releases_connection() {
    let backend = TestBackend::in_memory();
    let server = TestServer::start(&backend).await.unwrap();
    let (_room_id, slug) = backend.room();
    let (_alice, token) = backend.user("alice").unwrap();

    let mut a = server.connect(&slug, &token).await.unwrap();
    server.wait_for_connections(1).await.unwrap();

    a.close().await.unwrap();
    server.wait_for_connections(0).await.unwrap();
}

#[tokio::test]
async fn test_shutdown_closes_sockets_with_going_away() {
    let backend = TestBackend::in_memory();
    let server = TestServer::start(&backend).await.unwrap();
    let (_room_id, slug) = backend.room();
    let (_alice, alice_token) = backend.user("alice").unwrap();
    let (_bob, bob_token) = backend.user("bob").unwrap();

    let mut a = server.connect(&slug, &alice_token).await.unwrap();
    let mut b = server.connect(&slug, &bob_token).await.unwrap();
    server.wait_for_connections(2).await.unwrap();

    server.shutdown();

    assert_eq!(a.expect_close().await.unwrap(), Closed::Code(1001));
    assert_eq!(b.expect_close().await.unwrap(), Closed::Code(1001));
    server.wait_for_connections(0).await.unwrap();
}

#[tokio::test]
async fn test_heartbeat_pings_idle_sockets() {
    let backend = TestBackend::in_memory();
    let server = TestServer::start_with(
        &backend,
        TestServerOptions {
            websocket: WebSocketConfig {
                heartbeat_interval_secs: 1,
                ..WebSocketConfig::default()
            },
            ..TestServerOptions::default()
        },
    )
    .await
    .unwrap();
    let (_room_id, slug) = backend.room();
    let (_alice, token) = backend.user("alice").unwrap();

    let mut a = server.connect(&slug, &token).await.unwrap();

    let frame = a.next_frame(Duration::from_secs(3)).await.unwrap();
    assert!(matches!(frame, Some(WsMessage::Ping(_))), "got {frame:?}");
}

// ============================================================================
// HTTP endpoints
// ============================================================================

#[tokio::test]
async fn test_health_endpoints() {
    let backend = TestBackend::in_memory();
    let server = TestServer::start(&backend).await.unwrap();

    let response = server.get("/health").await.unwrap();
    assert_status(response, StatusCode::OK).await.unwrap();

    let response = server.get("/health/ready").await.unwrap();
    let body: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(body["status"], "ready");
    assert_eq!(body["connections"], 0);
}

#[tokio::test]
async fn test_history_pages_newest_first() {
    let backend = TestBackend::in_memory();
    let server = TestServer::start(&backend).await.unwrap();
    let (room_id, slug) = backend.room();
    let (_alice, token) = backend.user("alice").unwrap();

    let mut a = server.connect(&slug, &token).await.unwrap();
    for i in 0..5 {
        a.send_json(&chat_message(room_id, &format!("m{i}"))).await.unwrap();
        a.expect("new_message").await.unwrap();
    }

    let response = server
        .get_auth(&format!("/rooms/{slug}/messages?limit=2"), &token)
        .await
        .unwrap();
    let page: Value = assert_json(response, StatusCode::OK).await.unwrap();
    let contents: Vec<&str> = page["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, ["m4", "m3"]);

    let cursor = page["nextCursor"].as_str().unwrap();
    let response = server
        .get_auth(
            &format!("/rooms/{room_id}/messages?limit=10&cursor={cursor}"),
            &token,
        )
        .await
        .unwrap();
    let page: Value = assert_json(response, StatusCode::OK).await.unwrap();
    let contents: Vec<&str> = page["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, ["m2", "m1", "m0"]);
    assert!(page.get("nextCursor").is_none());
}

#[tokio::test]
async fn test_history_requires_membership() {
    let backend = TestBackend::in_memory();
    let server = TestServer::start(&backend).await.unwrap();
    let (_room_id, slug) = backend.room();
    let (_carol, token) = backend.user("carol").unwrap();

    let response = server
        .get_auth(&format!("/rooms/{slug}/messages"), &token)
        .await
        .unwrap();
    assert_status(response, StatusCode::FORBIDDEN).await.unwrap();

    let response = server.get(&format!("/rooms/{slug}/messages")).await.unwrap();
    assert_status(response, StatusCode::UNAUTHORIZED).await.unwrap();
}

#[tokio::test]
async fn test_history_rejects_bad_cursor() {
    let backend = TestBackend::in_memory();
    let server = TestServer::start(&backend).await.unwrap();
    let (_room_id, slug) = backend.room();
    let (_alice, token) = backend.user("alice").unwrap();
    let _a = server.connect(&slug, &token).await.unwrap();
    server.wait_for_connections(1).await.unwrap();

    let response = server
        .get_auth(&format!("/rooms/{slug}/messages?cursor=%21%21%21"), &token)
        .await
        .unwrap();
    let body: Value = assert_json(response, StatusCode::BAD_REQUEST).await.unwrap();
    assert_eq!(body["error"]["code"], "INVALID_CURSOR");
}

#[tokio::test]
async fn test_session_endpoints_disabled_without_store() {
    let backend = TestBackend::in_memory();
    let server = TestServer::start(&backend).await.unwrap();

    let response = server
        .post("/auth/refresh", &serde_json::json!({ "refreshToken": "whatever" }))
        .await
        .unwrap();
    let body: Value = assert_json(response, StatusCode::SERVICE_UNAVAILABLE).await.unwrap();
    assert_eq!(body["error"]["code"], "SESSIONS_DISABLED");
}
