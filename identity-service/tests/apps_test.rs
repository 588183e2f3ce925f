//! App lifecycle integration tests.

mod common;

use std::collections::HashSet;

use common::TestApp;
use identity_service::grpc::proto::*;
use tonic::Code;

#[tokio::test]
async fn new_app_keys_are_distinct_and_independently_deletable() {
    let app = TestApp::spawn().await;

    let mut keys = Vec::new();
    for _ in 0..10 {
        keys.push(app.new_app().await);
    }
    let distinct: HashSet<_> = keys.iter().cloned().collect();
    assert_eq!(distinct.len(), 10);

    let mut apps = app.apps_client().await;
    let mut auth = app.auth_client().await;
    for (i, key) in keys.iter().enumerate() {
        apps.delete_app(DeleteAppRequest { key: key.clone() })
            .await
            .expect("DeleteApp should succeed");

        // The deleted app no longer accepts users; the rest still do.
        let err = auth
            .register(RegisterRequest {
                app_key: key.clone(),
                login: "user".to_string(),
                password: "pw".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), Code::Internal);

        if let Some(next) = keys.get(i + 1) {
            auth.register(RegisterRequest {
                app_key: next.clone(),
                login: format!("user{}", i),
                password: "pw".to_string(),
            })
            .await
            .expect("remaining apps stay usable");
        }
    }
}

#[tokio::test]
async fn delete_app_is_idempotent() {
    let app = TestApp::spawn().await;
    let key = app.new_app().await;
    let mut apps = app.apps_client().await;

    apps.delete_app(DeleteAppRequest { key: key.clone() }).await.unwrap();
    apps.delete_app(DeleteAppRequest { key }).await.unwrap();
}

#[tokio::test]
async fn delete_app_requires_key() {
    let app = TestApp::spawn().await;
    let err = app
        .apps_client()
        .await
        .delete_app(DeleteAppRequest { key: Vec::new() })
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);
}

#[tokio::test]
async fn storage_failure_on_new_app_is_internal() {
    let app = TestApp::spawn().await;
    app.store.fail_operation("apps.save");

    let err = app
        .apps_client()
        .await
        .new_app(NewAppRequest {})
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::Internal);
    assert!(!err.message().contains("injected"));
}

#[tokio::test]
async fn random_key_generator_is_selectable() {
    let app = TestApp::spawn_with(|config| {
        config.keys.generator = identity_service::services::KeyGeneratorKind::Random
    })
    .await;

    let key = app.new_app().await;
    assert_eq!(key.len(), 64);
    assert!(key.iter().all(|b| b.is_ascii_hexdigit()));
}
