//! Deadline propagation over gRPC against a slow store.

mod common;

use std::time::{Duration, Instant};

use common::TestApp;
use identity_service::grpc::proto::*;
use tonic::{Code, Request};

const SLOW: Duration = Duration::from_secs(3);

#[tokio::test]
async fn client_timeout_surfaces_as_deadline_exceeded() {
    let app = TestApp::spawn().await;
    let key = app.new_app().await;
    app.register(&key, "alice", "secret").await;
    app.store.delay_operation("users.get", SLOW);

    let mut request = Request::new(LoginRequest {
        app_key: key,
        login: "alice".to_string(),
        password: "secret".to_string(),
    });
    request.set_timeout(Duration::from_millis(300));

    let started = Instant::now();
    let err = app.auth_client().await.login(request).await.unwrap_err();

    assert_eq!(err.code(), Code::DeadlineExceeded);
    assert!(started.elapsed() < SLOW);
}

#[tokio::test]
async fn server_request_timeout_surfaces_as_deadline_exceeded() {
    let app = TestApp::spawn_with(|config| config.grpc.request_timeout_seconds = 1).await;
    app.store.delay_operation("apps.exists", SLOW);

    let started = Instant::now();
    let err = app
        .apps_client()
        .await
        .new_app(NewAppRequest {})
        .await
        .unwrap_err();

    assert_eq!(err.code(), Code::DeadlineExceeded);
    assert!(started.elapsed() < SLOW);
}

#[tokio::test]
async fn calls_within_the_timeout_succeed() {
    let app = TestApp::spawn().await;
    let key = app.new_app().await;
    app.store.delay_operation("users.exists", Duration::from_millis(50));

    let mut request = Request::new(RegisterRequest {
        app_key: key,
        login: "bob".to_string(),
        password: "secret".to_string(),
    });
    request.set_timeout(Duration::from_secs(5));

    app.auth_client()
        .await
        .register(request)
        .await
        .expect("Register within its deadline should succeed");
}
