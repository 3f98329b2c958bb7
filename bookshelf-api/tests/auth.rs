use std::time::Duration;

use bookshelf_api::config::AuthConfig;
use bookshelf_api::routes::ErrorMessage;
use bookshelf_api::routes::auth::{LoginRequest, RegisterResponse, TokenResponse};
use bookshelf_api::routes::users::ReadUserResponse;
use bookshelf_api::store::Store;
use bookshelf_telemetry::tracing::init_test_tracing;
use reqwest::StatusCode;

mod support;

use crate::support::test_app::{
    TEST_PASSWORD, register_request, register_user, spawn_test_app, spawn_test_app_with,
    test_auth_config, test_deletion_config,
};

#[tokio::test(flavor = "multi_thread")]
async fn registered_user_can_log_in_and_use_the_token() {
    init_test_tracing();
    let app = spawn_test_app().await;

    let response = app.register(&register_request("ada")).await;
    assert!(response.status().is_success());
    let registered: RegisterResponse = response
        .json()
        .await
        .expect("failed to deserialize response");

    let response = app
        .login(&LoginRequest {
            login: "ada".to_string(),
            password: TEST_PASSWORD.to_string(),
        })
        .await;
    assert!(response.status().is_success());
    let login: TokenResponse = response
        .json()
        .await
        .expect("failed to deserialize response");
    assert!(login.expires_at > chrono::Utc::now());

    let response = app.read_user(registered.id, &login.token).await;
    assert!(response.status().is_success());
    let user: ReadUserResponse = response
        .json()
        .await
        .expect("failed to deserialize response");
    assert_eq!(user.id, registered.id);
    assert_eq!(user.login, "ada");
    assert_eq!(user.name, "ada name");
}

#[tokio::test(flavor = "multi_thread")]
async fn registration_token_is_usable_right_away() {
    init_test_tracing();
    let app = spawn_test_app().await;

    let (id, token) = register_user(&app, "grace").await;

    let response = app.read_user(id, &token).await;
    assert!(response.status().is_success());
}

#[tokio::test(flavor = "multi_thread")]
async fn registering_a_taken_login_conflicts() {
    init_test_tracing();
    let app = spawn_test_app().await;
    register_user(&app, "ada").await;

    let response = app.register(&register_request("ada")).await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: ErrorMessage = response
        .json()
        .await
        .expect("failed to deserialize error");
    assert!(body.error.contains("ada"));
}

#[tokio::test(flavor = "multi_thread")]
async fn registering_with_an_empty_field_is_rejected() {
    init_test_tracing();
    let app = spawn_test_app().await;
    let mut request = register_request("ada");
    request.name = "   ".to_string();

    let response = app.register(&request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test(flavor = "multi_thread")]
async fn wrong_password_and_unknown_login_look_the_same() {
    init_test_tracing();
    let app = spawn_test_app().await;
    register_user(&app, "ada").await;

    let wrong_password = app
        .login(&LoginRequest {
            login: "ada".to_string(),
            password: "not the password".to_string(),
        })
        .await;
    let unknown_login = app
        .login(&LoginRequest {
            login: "nobody".to_string(),
            password: TEST_PASSWORD.to_string(),
        })
        .await;

    assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_login.status(), StatusCode::UNAUTHORIZED);
    let wrong_password: ErrorMessage = wrong_password.json().await.unwrap();
    let unknown_login: ErrorMessage = unknown_login.json().await.unwrap();
    assert_eq!(wrong_password.error, unknown_login.error);
}

#[tokio::test(flavor = "multi_thread")]
async fn protected_routes_require_a_token() {
    init_test_tracing();
    let app = spawn_test_app().await;

    let response = app
        .api_client
        .get(format!("{}/v1/users", app.address))
        .send()
        .await
        .expect("failed to execute request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_token_is_a_bad_request() {
    init_test_tracing();
    let app = spawn_test_app().await;

    let response = app.read_all_users("definitely-not-a-token").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test(flavor = "multi_thread")]
async fn token_signed_with_another_key_is_unauthorized() {
    init_test_tracing();
    let app = spawn_test_app().await;
    let other = spawn_test_app_with(
        AuthConfig {
            signing_key: "a-completely-different-signing-key-for-tests".into(),
            ..test_auth_config()
        },
        test_deletion_config(),
    )
    .await;
    let (_, foreign_token) = register_user(&other, "mallory").await;

    let response = app.read_all_users(&foreign_token).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test(flavor = "multi_thread")]
async fn expired_token_is_rejected_and_storage_is_untouched() {
    init_test_tracing();
    let app = spawn_test_app_with(
        AuthConfig {
            token_ttl_secs: 1,
            ..test_auth_config()
        },
        test_deletion_config(),
    )
    .await;
    let (id, token) = register_user(&app, "ada").await;

    tokio::time::sleep(Duration::from_millis(2100)).await;
    let response = app.delete_user(id, &token).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(app.store.find_user_by_id(id).await.unwrap().is_some());
    assert!(app.store.committed_batches().await.is_empty());
}
