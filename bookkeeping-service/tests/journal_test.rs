//! Journal engine integration tests.

mod common;

use common::{TestApp, TEST_USER};
use serde_json::json;

const CREATE_ENTRY: &str = r#"mutation($input: CreateJournalEntryInput!) {
    createJournalEntry(input: $input) {
        entryId
        description
        createdBy
        lines { accountId debit credit }
    }
}"#;

async fn account_id(app: &TestApp, code: &str) -> String {
    let data = app
        .graphql_ok(TEST_USER, "{ accounts { accountId code } }", json!({}))
        .await;
    data["accounts"]
        .as_array()
        .unwrap()
        .iter()
        .find(|a| a["code"] == code)
        .unwrap_or_else(|| panic!("bootstrap account {} missing", code))["accountId"]
        .as_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn balanced_entry_is_created_with_lines() {
    let Some(app) = TestApp::spawn().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };
    let cash = account_id(&app, "101").await;
    let revenue = account_id(&app, "401").await;

    let data = app
        .graphql_ok(
            TEST_USER,
            CREATE_ENTRY,
            json!({ "input": {
                "description": "Cash sale",
                "lines": [
                    { "accountId": cash, "debit": "250.00" },
                    { "accountId": revenue, "credit": "250.00" }
                ]
            }}),
        )
        .await;

    let entry = &data["createJournalEntry"];
    assert_eq!(entry["description"], "Cash sale");
    assert_eq!(entry["createdBy"], TEST_USER);
    assert_eq!(entry["lines"].as_array().unwrap().len(), 2);

    app.cleanup().await;
}

#[tokio::test]
async fn unbalanced_entry_is_rejected_with_mismatch_code() {
    let Some(app) = TestApp::spawn().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };
    let cash = account_id(&app, "101").await;
    let revenue = account_id(&app, "401").await;

    let body = app
        .graphql(
            TEST_USER,
            CREATE_ENTRY,
            json!({ "input": {
                "lines": [
                    { "accountId": cash, "debit": "250.00" },
                    { "accountId": revenue, "credit": "200.00" }
                ]
            }}),
        )
        .await;

    let extensions = TestApp::first_error_extensions(&body);
    assert_eq!(extensions["code"], "BAD_USER_INPUT");
    assert_eq!(extensions["reason"], "DEBIT_CREDIT_MISMATCH");

    app.cleanup().await;
}

#[tokio::test]
async fn update_with_lines_replaces_the_whole_line_set() {
    let Some(app) = TestApp::spawn().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };
    let cash = account_id(&app, "101").await;
    let bank = account_id(&app, "102").await;
    let revenue = account_id(&app, "401").await;

    let data = app
        .graphql_ok(
            TEST_USER,
            CREATE_ENTRY,
            json!({ "input": {
                "lines": [
                    { "accountId": cash, "debit": "100.00" },
                    { "accountId": revenue, "credit": "100.00" }
                ]
            }}),
        )
        .await;
    let entry_id = data["createJournalEntry"]["entryId"].as_str().unwrap();

    let data = app
        .graphql_ok(
            TEST_USER,
            r#"mutation($id: UUID!, $input: UpdateJournalEntryInput!) {
                updateJournalEntry(entryId: $id, input: $input) {
                    lines { accountId debit credit }
                }
            }"#,
            json!({ "id": entry_id, "input": {
                "lines": [
                    { "accountId": bank, "debit": "60.00" },
                    { "accountId": cash, "debit": "40.00" },
                    { "accountId": revenue, "credit": "100.00" }
                ]
            }}),
        )
        .await;

    assert_eq!(
        data["updateJournalEntry"]["lines"].as_array().unwrap().len(),
        3
    );

    app.cleanup().await;
}

#[tokio::test]
async fn entries_are_searchable_by_description() {
    let Some(app) = TestApp::spawn().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };
    let cash = account_id(&app, "101").await;
    let revenue = account_id(&app, "401").await;

    for desc in ["Office rent March", "Consulting income"] {
        app.graphql_ok(
            TEST_USER,
            CREATE_ENTRY,
            json!({ "input": {
                "description": desc,
                "lines": [
                    { "accountId": cash, "debit": "10.00" },
                    { "accountId": revenue, "credit": "10.00" }
                ]
            }}),
        )
        .await;
    }

    let data = app
        .graphql_ok(
            TEST_USER,
            r#"query($search: String) {
                journalEntries(search: $search) { description }
            }"#,
            json!({ "search": "rent" }),
        )
        .await;

    let entries = data["journalEntries"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["description"], "Office rent March");

    app.cleanup().await;
}

#[tokio::test]
async fn delete_removes_entry_and_lines() {
    let Some(app) = TestApp::spawn().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };
    let cash = account_id(&app, "101").await;
    let revenue = account_id(&app, "401").await;

    let data = app
        .graphql_ok(
            TEST_USER,
            CREATE_ENTRY,
            json!({ "input": {
                "lines": [
                    { "accountId": cash, "debit": "10.00" },
                    { "accountId": revenue, "credit": "10.00" }
                ]
            }}),
        )
        .await;
    let entry_id = data["createJournalEntry"]["entryId"].as_str().unwrap();

    app.graphql_ok(
        TEST_USER,
        r#"mutation($id: UUID!) { deleteJournalEntry(entryId: $id) }"#,
        json!({ "id": entry_id }),
    )
    .await;

    let data = app
        .graphql_ok(
            TEST_USER,
            r#"query($id: UUID!) { journalEntry(entryId: $id) { entryId } }"#,
            json!({ "id": entry_id }),
        )
        .await;
    assert!(data["journalEntry"].is_null());

    app.cleanup().await;
}
