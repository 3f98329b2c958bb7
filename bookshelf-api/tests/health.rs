use bookshelf_telemetry::tracing::init_test_tracing;

mod support;

use crate::support::test_app::spawn_test_app;

#[tokio::test(flavor = "multi_thread")]
async fn health_check_works() {
    init_test_tracing();
    let app = spawn_test_app().await;

    let response = app
        .api_client
        .get(format!("{}/health_check", app.address))
        .send()
        .await
        .expect("failed to execute request");

    assert!(response.status().is_success());
    assert_eq!(response.text().await.unwrap(), "ok");
}

#[tokio::test(flavor = "multi_thread")]
async fn metrics_endpoint_works() {
    init_test_tracing();
    let app = spawn_test_app().await;

    let response = app
        .api_client
        .get(format!("{}/metrics", app.address))
        .send()
        .await
        .expect("failed to execute request");

    assert!(response.status().is_success());
}

#[tokio::test(flavor = "multi_thread")]
async fn openapi_document_lists_the_routes() {
    init_test_tracing();
    let app = spawn_test_app().await;

    let response = app
        .api_client
        .get(format!("{}/api-docs/openapi.json", app.address))
        .send()
        .await
        .expect("failed to execute request");

    assert!(response.status().is_success());
    let document: serde_json::Value = response.json().await.unwrap();
    let paths = document["paths"]
        .as_object()
        .expect("openapi document has no paths");
    assert!(paths.contains_key("/v1/auth/register"));
    assert!(paths.contains_key("/v1/books/mine"));
    assert!(paths.contains_key("/v1/users/{user_id}"));
}
