//! Expense approval workflow integration tests.

mod common;

use common::{TestApp, TEST_ADMIN, TEST_USER};
use serde_json::{json, Value};

const CREATE_EXPENSE: &str = r#"mutation($input: CreateExpenseRequestInput!) {
    createExpenseRequest(input: $input) { expenseId state requester }
}"#;

async fn create_draft(app: &TestApp, user: &str) -> String {
    let attachment_id = app.register_attachment(user).await;
    let data = app
        .graphql_ok(
            user,
            CREATE_EXPENSE,
            json!({ "input": {
                "amount": "120.50",
                "description": "Team lunch",
                "attachmentId": attachment_id
            }}),
        )
        .await;
    assert_eq!(data["createExpenseRequest"]["state"], "DRAFT");
    data["createExpenseRequest"]["expenseId"]
        .as_str()
        .unwrap()
        .to_string()
}

async fn transition(app: &TestApp, user: &str, mutation: &str, expense_id: &str) -> Value {
    app.graphql(
        user,
        &format!(
            "mutation($id: UUID!) {{ {}(expenseId: $id) {{ state approver paymentId }} }}",
            mutation
        ),
        json!({ "id": expense_id }),
    )
    .await
}

#[tokio::test]
async fn full_lifecycle_reaches_closed() {
    let Some(app) = TestApp::spawn().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };
    let expense_id = create_draft(&app, TEST_USER).await;

    let body = transition(&app, TEST_USER, "submitExpenseRequest", &expense_id).await;
    assert_eq!(body["data"]["submitExpenseRequest"]["state"], "PENDING");

    let body = transition(&app, TEST_ADMIN, "approveExpenseRequest", &expense_id).await;
    assert_eq!(body["data"]["approveExpenseRequest"]["state"], "APPROVED");
    assert_eq!(body["data"]["approveExpenseRequest"]["approver"], TEST_ADMIN);

    // Pay requires an existing payment
    let data = app
        .graphql_ok(
            TEST_USER,
            r#"mutation($input: CreatePaymentInput!) {
                createPayment(input: $input) { paymentId }
            }"#,
            json!({ "input": {
                "amount": "120.50",
                "direction": "OUT",
                "method": "BANK"
            }}),
        )
        .await;
    let payment_id = data["createPayment"]["paymentId"].as_str().unwrap();

    let body = app
        .graphql(
            TEST_USER,
            r#"mutation($id: UUID!, $paymentId: UUID!) {
                payExpenseRequest(expenseId: $id, paymentId: $paymentId) { state paymentId }
            }"#,
            json!({ "id": expense_id, "paymentId": payment_id }),
        )
        .await;
    assert_eq!(body["data"]["payExpenseRequest"]["state"], "PAID");
    assert_eq!(body["data"]["payExpenseRequest"]["paymentId"], payment_id);

    let body = transition(&app, TEST_USER, "closeExpenseRequest", &expense_id).await;
    assert_eq!(body["data"]["closeExpenseRequest"]["state"], "CLOSED");

    app.cleanup().await;
}

#[tokio::test]
async fn rejected_request_loops_back_through_edit() {
    let Some(app) = TestApp::spawn().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };
    let expense_id = create_draft(&app, TEST_USER).await;

    transition(&app, TEST_USER, "submitExpenseRequest", &expense_id).await;
    let body = transition(&app, TEST_ADMIN, "rejectExpenseRequest", &expense_id).await;
    assert_eq!(body["data"]["rejectExpenseRequest"]["state"], "REJECTED");

    let body = transition(&app, TEST_USER, "editExpenseRequest", &expense_id).await;
    assert_eq!(body["data"]["editExpenseRequest"]["state"], "DRAFT");

    // Draft again: amendable and resubmittable
    let data = app
        .graphql_ok(
            TEST_USER,
            r#"mutation($id: UUID!, $input: UpdateExpenseRequestInput!) {
                updateExpenseRequest(expenseId: $id, input: $input) { amount }
            }"#,
            json!({ "id": expense_id, "input": { "amount": "99.00" } }),
        )
        .await;
    // NUMERIC(20,4) columns come back at scale 4
    assert_eq!(data["updateExpenseRequest"]["amount"], "99.0000");

    let body = transition(&app, TEST_USER, "submitExpenseRequest", &expense_id).await;
    assert_eq!(body["data"]["submitExpenseRequest"]["state"], "PENDING");

    app.cleanup().await;
}

#[tokio::test]
async fn approve_requires_admin() {
    let Some(app) = TestApp::spawn().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };
    let expense_id = create_draft(&app, TEST_USER).await;
    transition(&app, TEST_USER, "submitExpenseRequest", &expense_id).await;

    let body = transition(&app, TEST_USER, "approveExpenseRequest", &expense_id).await;
    let extensions = TestApp::first_error_extensions(&body);
    assert_eq!(extensions["code"], "FORBIDDEN");

    // Still pending afterwards
    let data = app
        .graphql_ok(
            TEST_USER,
            r#"query($id: UUID!) { expenseRequest(expenseId: $id) { state } }"#,
            json!({ "id": expense_id }),
        )
        .await;
    assert_eq!(data["expenseRequest"]["state"], "PENDING");

    app.cleanup().await;
}

#[tokio::test]
async fn invalid_transition_is_rejected_with_code() {
    let Some(app) = TestApp::spawn().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };
    let expense_id = create_draft(&app, TEST_USER).await;

    // Draft cannot be approved directly
    let body = transition(&app, TEST_ADMIN, "approveExpenseRequest", &expense_id).await;
    let extensions = TestApp::first_error_extensions(&body);
    assert_eq!(extensions["code"], "BAD_USER_INPUT");
    assert_eq!(extensions["reason"], "INVALID_TRANSITION");

    app.cleanup().await;
}

#[tokio::test]
async fn non_draft_request_cannot_be_amended() {
    let Some(app) = TestApp::spawn().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };
    let expense_id = create_draft(&app, TEST_USER).await;
    transition(&app, TEST_USER, "submitExpenseRequest", &expense_id).await;

    let body = app
        .graphql(
            TEST_USER,
            r#"mutation($id: UUID!, $input: UpdateExpenseRequestInput!) {
                updateExpenseRequest(expenseId: $id, input: $input) { amount }
            }"#,
            json!({ "id": expense_id, "input": { "amount": "10.00" } }),
        )
        .await;
    let extensions = TestApp::first_error_extensions(&body);
    assert_eq!(extensions["reason"], "INVALID_TRANSITION");

    app.cleanup().await;
}

#[tokio::test]
async fn amending_with_unknown_attachment_is_a_user_error() {
    let Some(app) = TestApp::spawn().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };
    let expense_id = create_draft(&app, TEST_USER).await;

    let body = app
        .graphql(
            TEST_USER,
            r#"mutation($id: UUID!, $input: UpdateExpenseRequestInput!) {
                updateExpenseRequest(expenseId: $id, input: $input) { amount }
            }"#,
            json!({ "id": expense_id, "input": {
                "attachmentId": "00000000-0000-0000-0000-000000000000"
            }}),
        )
        .await;
    let extensions = TestApp::first_error_extensions(&body);
    assert_eq!(extensions["code"], "BAD_USER_INPUT");

    app.cleanup().await;
}

#[tokio::test]
async fn expense_creation_requires_existing_attachment() {
    let Some(app) = TestApp::spawn().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };

    let body = app
        .graphql(
            TEST_USER,
            CREATE_EXPENSE,
            json!({ "input": {
                "amount": "50.00",
                "attachmentId": "00000000-0000-0000-0000-000000000000"
            }}),
        )
        .await;
    let extensions = TestApp::first_error_extensions(&body);
    assert_eq!(extensions["code"], "BAD_USER_INPUT");

    app.cleanup().await;
}

#[tokio::test]
async fn missing_identity_header_is_unauthenticated() {
    let Some(app) = TestApp::spawn().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };

    let response = reqwest::Client::new()
        .post(format!("{}/graphql", app.address))
        .json(&json!({ "query": "{ categories { name } }" }))
        .send()
        .await
        .unwrap();

    // The identity extractor rejects before the schema executes.
    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);

    app.cleanup().await;
}
