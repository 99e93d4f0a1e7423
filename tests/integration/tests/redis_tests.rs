//! Gateway tests against a real Redis
//!
//! These tests require a running Redis instance and REDIS_URL. They are
//! skipped when it is not set.
//!
//! Run with: cargo test -p integration-tests --test redis_tests

use std::sync::Arc;

use integration_tests::{
    assert_json, assert_status, chat_message, redis_url, TestBackend, TestServer,
    TestServerOptions,
};
use lunar_cache::{RedisBus, RedisPool, RedisPoolConfig, RefreshTokenStore};
use lunar_gateway::server::SessionEndpoints;
use reqwest::StatusCode;
use serde_json::{json, Value};

fn redis_pool(url: String) -> RedisPool {
    RedisPool::new(RedisPoolConfig {
        url,
        ..RedisPoolConfig::default()
    })
    .expect("Failed to create Redis pool")
}

fn redis_backend(pool: &RedisPool) -> TestBackend {
    let bus = RedisBus::new(pool.clone()).expect("Failed to create Redis bus");
    TestBackend::with_bus(Arc::new(bus))
}

#[tokio::test]
async fn test_redis_relay_across_gateways() {
    let Some(url) = redis_url() else { return };
    let backend = redis_backend(&redis_pool(url));
    let first = TestServer::start(&backend).await.unwrap();
    let second = TestServer::start(&backend).await.unwrap();
    let (room_id, slug) = backend.room();
    let (_alice, alice_token) = backend.user("alice").unwrap();
    let (_bob, bob_token) = backend.user("bob").unwrap();

    let mut a = first.connect(&slug, &alice_token).await.unwrap();
    let mut b = second.connect(&slug, &bob_token).await.unwrap();
    first.wait_for_connections(1).await.unwrap();
    second.wait_for_connections(1).await.unwrap();

    for i in 0..5 {
        a.send_json(&chat_message(room_id, &format!("m{i}"))).await.unwrap();
    }
    for i in 0..5 {
        assert_eq!(b.expect("new_message").await.unwrap()["content"], format!("m{i}"));
        assert_eq!(a.expect("new_message").await.unwrap()["content"], format!("m{i}"));
    }

    let response = first.get("/health/ready").await.unwrap();
    let body: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(body["connections"], 1);
}

#[tokio::test]
async fn test_refresh_rotates_and_rejects_replay() {
    let Some(url) = redis_url() else { return };
    let pool = redis_pool(url);
    let backend = redis_backend(&pool);
    let store = RefreshTokenStore::new(pool);
    let server = TestServer::start_with(
        &backend,
        TestServerOptions {
            sessions: Some(SessionEndpoints {
                store: store.clone(),
                jwt: backend.jwt.clone(),
            }),
            ..TestServerOptions::default()
        },
    )
    .await
    .unwrap();
    let (user, _) = backend.user("alice").unwrap();
    let first = store.issue(user.id).await.unwrap();

    let response = server
        .post("/auth/refresh", &json!({ "refreshToken": first }))
        .await
        .unwrap();
    let pair: Value = assert_json(response, StatusCode::OK).await.unwrap();
    let access = pair["accessToken"].as_str().unwrap();
    let second = pair["refreshToken"].as_str().unwrap();
    assert_ne!(second, first);
    assert_eq!(pair["tokenType"], "Bearer");
    assert_eq!(backend.jwt.decode_token(access).unwrap().user_id().unwrap(), user.id);

    // The consumed token is dead
    let response = server
        .post("/auth/refresh", &json!({ "refreshToken": first }))
        .await
        .unwrap();
    let body: Value = assert_json(response, StatusCode::UNAUTHORIZED).await.unwrap();
    assert_eq!(body["error"]["code"], "INVALID_REFRESH_TOKEN");

    // Logout revokes the rotated token
    let response = server
        .post_auth("/auth/logout", access, Some(&json!({ "refreshToken": second })))
        .await
        .unwrap();
    assert_status(response, StatusCode::NO_CONTENT).await.unwrap();
    assert!(store.consume(second).await.unwrap_err().is_invalid_token());
}

#[tokio::test]
async fn test_logout_all_revokes_every_session() {
    let Some(url) = redis_url() else { return };
    let pool = redis_pool(url);
    let backend = redis_backend(&pool);
    let store = RefreshTokenStore::new(pool);
    let server = TestServer::start_with(
        &backend,
        TestServerOptions {
            sessions: Some(SessionEndpoints {
                store: store.clone(),
                jwt: backend.jwt.clone(),
            }),
            ..TestServerOptions::default()
        },
    )
    .await
    .unwrap();
    let (user, access) = backend.user("alice").unwrap();
    let phone = store.issue(user.id).await.unwrap();
    let laptop = store.issue(user.id).await.unwrap();

    let response = server.post_auth("/auth/logout-all", &access, None).await.unwrap();
    let body: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(body["revoked"], 2);

    for token in [phone, laptop] {
        assert!(store.consume(&token).await.unwrap_err().is_invalid_token());
    }

    // A new login after logout-all refreshes normally
    let tablet = store.issue(user.id).await.unwrap();
    let response = server
        .post("/auth/refresh", &json!({ "refreshToken": tablet }))
        .await
        .unwrap();
    assert_json::<Value>(response, StatusCode::OK).await.unwrap();
}
