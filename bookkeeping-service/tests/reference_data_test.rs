//! Reference data (accounts, categories, budgets) integration tests.

mod common;

use common::{TestApp, TEST_USER};
use serde_json::json;

const CREATE_CATEGORY: &str = r#"mutation($input: CreateCategoryInput!) {
    createCategory(input: $input) { categoryId name }
}"#;

const SET_BUDGET: &str = r#"mutation($input: SetBudgetInput!) {
    setBudget(input: $input) { budgetId fiscalYear amountPlanned }
}"#;

async fn create_category(app: &TestApp, name: &str) -> String {
    let data = app
        .graphql_ok(
            TEST_USER,
            CREATE_CATEGORY,
            json!({ "input": { "name": name } }),
        )
        .await;
    data["createCategory"]["categoryId"]
        .as_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn bootstrap_accounts_exist_after_startup() {
    let Some(app) = TestApp::spawn().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };

    let data = app
        .graphql_ok(TEST_USER, "{ accounts { code name category } }", json!({}))
        .await;
    let accounts = data["accounts"].as_array().unwrap();
    let codes: Vec<&str> = accounts
        .iter()
        .map(|a| a["code"].as_str().unwrap())
        .collect();

    for code in ["101", "102", "120", "401", "501"] {
        assert!(codes.contains(&code), "missing bootstrap account {}", code);
    }

    app.cleanup().await;
}

#[tokio::test]
async fn duplicate_account_code_conflicts() {
    let Some(app) = TestApp::spawn().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };

    let body = app
        .graphql(
            TEST_USER,
            r#"mutation($input: CreateAccountInput!) {
                createAccount(input: $input) { accountId }
            }"#,
            json!({ "input": { "code": "101", "name": "Duplicate Cash", "category": "ASSET" } }),
        )
        .await;
    let extensions = TestApp::first_error_extensions(&body);
    assert_eq!(extensions["code"], "CONFLICT");

    app.cleanup().await;
}

#[tokio::test]
async fn budget_upsert_overwrites_same_category_and_year() {
    let Some(app) = TestApp::spawn().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };
    let category_id = create_category(&app, "Travel").await;

    let data = app
        .graphql_ok(
            TEST_USER,
            SET_BUDGET,
            json!({ "input": { "categoryId": category_id, "fiscalYear": 2026, "amountPlanned": "5000.00" } }),
        )
        .await;
    let first_id = data["setBudget"]["budgetId"].as_str().unwrap().to_string();

    let data = app
        .graphql_ok(
            TEST_USER,
            SET_BUDGET,
            json!({ "input": { "categoryId": category_id, "fiscalYear": 2026, "amountPlanned": "7500.00" } }),
        )
        .await;

    // Same row, updated amount (NUMERIC scale 4)
    assert_eq!(data["setBudget"]["budgetId"], first_id.as_str());
    assert_eq!(data["setBudget"]["amountPlanned"], "7500.0000");

    let data = app
        .graphql_ok(
            TEST_USER,
            r#"query($year: Int) { budgets(fiscalYear: $year) { budgetId } }"#,
            json!({ "year": 2026 }),
        )
        .await;
    assert_eq!(data["budgets"].as_array().unwrap().len(), 1);

    app.cleanup().await;
}

#[tokio::test]
async fn fiscal_year_before_2000_is_rejected() {
    let Some(app) = TestApp::spawn().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };
    let category_id = create_category(&app, "Hardware").await;

    let body = app
        .graphql(
            TEST_USER,
            SET_BUDGET,
            json!({ "input": { "categoryId": category_id, "fiscalYear": 1999, "amountPlanned": "100.00" } }),
        )
        .await;
    let extensions = TestApp::first_error_extensions(&body);
    assert_eq!(extensions["code"], "BAD_USER_INPUT");

    app.cleanup().await;
}

#[tokio::test]
async fn category_with_budget_cannot_be_deleted() {
    let Some(app) = TestApp::spawn().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };
    let category_id = create_category(&app, "Software").await;

    app.graphql_ok(
        TEST_USER,
        SET_BUDGET,
        json!({ "input": { "categoryId": category_id, "fiscalYear": 2026, "amountPlanned": "100.00" } }),
    )
    .await;

    let body = app
        .graphql(
            TEST_USER,
            r#"mutation($id: UUID!) { deleteCategory(categoryId: $id) }"#,
            json!({ "id": category_id }),
        )
        .await;
    let extensions = TestApp::first_error_extensions(&body);
    assert_eq!(extensions["code"], "BAD_USER_INPUT");
    assert_eq!(extensions["reason"], "CATEGORY_IN_USE");

    app.cleanup().await;
}

#[tokio::test]
async fn unused_category_deletes_cleanly() {
    let Some(app) = TestApp::spawn().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };
    let category_id = create_category(&app, "Ephemeral").await;

    let data = app
        .graphql_ok(
            TEST_USER,
            r#"mutation($id: UUID!) { deleteCategory(categoryId: $id) }"#,
            json!({ "id": category_id }),
        )
        .await;
    assert_eq!(data["deleteCategory"], true);

    let data = app
        .graphql_ok(TEST_USER, "{ categories { name } }", json!({}))
        .await;
    assert!(data["categories"]
        .as_array()
        .unwrap()
        .iter()
        .all(|c| c["name"] != "Ephemeral"));

    app.cleanup().await;
}
