//! Account lifecycle integration tests.

mod common;

use chrono::Utc;
use common::TestApp;
use identity_service::grpc::proto::*;
use identity_service::services::TokenService;
use tonic::Code;

#[tokio::test]
async fn register_then_login_returns_token_for_login() {
    let app = TestApp::spawn().await;
    let key = app.new_app().await;
    let mut client = app.auth_client().await;

    app.register(&key, "alice", "correct horse").await;

    let token = client
        .login(LoginRequest {
            app_key: key.clone(),
            login: "alice".to_string(),
            password: "correct horse".to_string(),
        })
        .await
        .expect("Login should succeed")
        .into_inner()
        .token;

    let claims = TokenService::new(chrono::Duration::seconds(3600))
        .validate(&token, &key)
        .expect("token should verify with the app key");
    assert_eq!(claims.login, "alice");
    assert!((claims.exp - (Utc::now().timestamp() + 3600)).abs() <= 1);

    let parsed = client
        .parse_token(ParseTokenRequest {
            app_key: key,
            token,
        })
        .await
        .expect("ParseToken should succeed")
        .into_inner();
    assert_eq!(parsed.login, "alice");
}

#[tokio::test]
async fn duplicate_register_is_rejected_only_within_the_same_app() {
    let app = TestApp::spawn().await;
    let first = app.new_app().await;
    let second = app.new_app().await;
    let mut client = app.auth_client().await;

    app.register(&first, "bob", "pw").await;

    let err = client
        .register(RegisterRequest {
            app_key: first,
            login: "bob".to_string(),
            password: "pw2".to_string(),
        })
        .await
        .expect_err("second register should fail");
    assert_eq!(err.code(), Code::AlreadyExists);

    app.register(&second, "bob", "pw").await;
}

#[tokio::test]
async fn wrong_password_and_unknown_login_get_the_same_status() {
    let app = TestApp::spawn().await;
    let key = app.new_app().await;
    let mut client = app.auth_client().await;
    app.register(&key, "carol", "right").await;

    let wrong = client
        .login(LoginRequest {
            app_key: key.clone(),
            login: "carol".to_string(),
            password: "wrong".to_string(),
        })
        .await
        .unwrap_err();
    let unknown = client
        .login(LoginRequest {
            app_key: key,
            login: "nobody".to_string(),
            password: "right".to_string(),
        })
        .await
        .unwrap_err();

    assert_eq!(wrong.code(), Code::InvalidArgument);
    assert_eq!(wrong.code(), unknown.code());
    assert_eq!(wrong.message(), unknown.message());
}

#[tokio::test]
async fn missing_fields_are_rejected_before_storage() {
    let app = TestApp::spawn().await;
    let mut client = app.auth_client().await;

    let err = client
        .register(RegisterRequest {
            app_key: b"whatever".to_vec(),
            login: String::new(),
            password: "pw".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::InvalidArgument);
    assert_eq!(err.message(), "login is required");

    let err = client
        .login(LoginRequest {
            app_key: Vec::new(),
            login: "dave".to_string(),
            password: "pw".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.message(), "app key is required");

    let err = client
        .register(RegisterRequest {
            app_key: b"whatever".to_vec(),
            login: "dave".to_string(),
            password: String::new(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.message(), "password is required");
}

#[tokio::test]
async fn register_with_unknown_app_is_internal() {
    let app = TestApp::spawn().await;
    let mut client = app.auth_client().await;

    let err = client
        .register(RegisterRequest {
            app_key: b"no-such-app".to_vec(),
            login: "erin".to_string(),
            password: "pw".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::Internal);
}

#[tokio::test]
async fn update_login_and_change_password() {
    let app = TestApp::spawn().await;
    let key = app.new_app().await;
    let mut client = app.auth_client().await;
    app.register(&key, "frank", "old").await;
    app.register(&key, "gina", "pw").await;

    let err = client
        .update_login(UpdateLoginRequest {
            app_key: key.clone(),
            login: "frank".to_string(),
            new_login: "gina".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::AlreadyExists);

    client
        .update_login(UpdateLoginRequest {
            app_key: key.clone(),
            login: "frank".to_string(),
            new_login: "francis".to_string(),
        })
        .await
        .expect("UpdateLogin should succeed");

    client
        .change_password(ChangePasswordRequest {
            app_key: key.clone(),
            login: "francis".to_string(),
            new_password: "new".to_string(),
        })
        .await
        .expect("ChangePassword should succeed");

    client
        .login(LoginRequest {
            app_key: key.clone(),
            login: "francis".to_string(),
            password: "new".to_string(),
        })
        .await
        .expect("Login with new credentials should succeed");

    let err = client
        .change_password(ChangePasswordRequest {
            app_key: key,
            login: "frank".to_string(),
            new_password: "x".to_string(),
        })
        .await
        .unwrap_err();
    assert_eq!(err.code(), Code::Internal);
}

#[tokio::test]
async fn delete_user_removes_account() {
    let app = TestApp::spawn().await;
    let key = app.new_app().await;
    let mut client = app.auth_client().await;
    app.register(&key, "hank", "pw").await;

    let exists = |login: &str| TestUserOnExistRequest {
        app_key: key.clone(),
        login: login.to_string(),
    };

    assert!(client.test_user_on_exist(exists("hank")).await.unwrap().into_inner().exist);

    client
        .delete_user(DeleteUserRequest {
            app_key: key.clone(),
            login: "hank".to_string(),
        })
        .await
        .expect("DeleteUser should succeed");

    assert!(!client.test_user_on_exist(exists("hank")).await.unwrap().into_inner().exist);
}

#[tokio::test]
async fn test_user_on_exist_reports_false_when_storage_fails() {
    let app = TestApp::spawn().await;
    let key = app.new_app().await;
    let mut client = app.auth_client().await;
    app.register(&key, "ivy", "pw").await;

    app.store.fail_operation("users.exists");
    let response = client
        .test_user_on_exist(TestUserOnExistRequest {
            app_key: key,
            login: "ivy".to_string(),
        })
        .await
        .expect("TestUserOnExist never fails on storage errors")
        .into_inner();
    assert!(!response.exist);
}
