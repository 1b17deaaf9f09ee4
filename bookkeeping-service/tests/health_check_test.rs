//! Health and metrics endpoint tests.

mod common;

use common::TestApp;

#[tokio::test]
async fn health_check_works() {
    let Some(app) = TestApp::spawn().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };

    let response = reqwest::get(format!("{}/health", app.address))
        .await
        .expect("Failed to execute request");
    assert!(response.status().is_success());

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["service"], "bookkeeping-service");

    app.cleanup().await;
}

#[tokio::test]
async fn readiness_reflects_database_health() {
    let Some(app) = TestApp::spawn().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };

    let response = reqwest::get(format!("{}/ready", app.address))
        .await
        .expect("Failed to execute request");
    assert!(response.status().is_success());

    app.cleanup().await;
}

#[tokio::test]
async fn me_reflects_forwarded_user_and_admin_flag() {
    let Some(app) = TestApp::spawn().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };

    let data = app
        .graphql_ok(
            common::TEST_ADMIN,
            "{ me { username isAdmin } }",
            serde_json::json!({}),
        )
        .await;
    assert_eq!(data["me"]["username"], common::TEST_ADMIN);
    assert_eq!(data["me"]["isAdmin"], true);

    let data = app
        .graphql_ok(
            common::TEST_USER,
            "{ me { username isAdmin } }",
            serde_json::json!({}),
        )
        .await;
    assert_eq!(data["me"]["username"], common::TEST_USER);
    assert_eq!(data["me"]["isAdmin"], false);

    app.cleanup().await;
}

#[tokio::test]
async fn metrics_endpoint_exposes_prometheus_text() {
    let Some(app) = TestApp::spawn().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };

    // Exercise a timed query so at least one series exists
    app.graphql_ok(
        common::TEST_USER,
        "{ accounts { code } }",
        serde_json::json!({}),
    )
    .await;

    let response = reqwest::get(format!("{}/metrics", app.address))
        .await
        .expect("Failed to execute request");
    assert!(response.status().is_success());

    let body = response.text().await.unwrap();
    assert!(body.contains("bookkeeping_db_query_duration_seconds"));

    app.cleanup().await;
}
