//! Payment reconciliation integration tests.

mod common;

use common::{TestApp, TEST_USER};
use serde_json::{json, Value};

const CREATE_INVOICE: &str = r#"mutation($input: CreateInvoiceInput!) {
    createInvoice(input: $input) { invoiceId invoiceNo status }
}"#;

const CREATE_PAYMENT: &str = r#"mutation($input: CreatePaymentInput!) {
    createPayment(input: $input) { paymentId label overpaidAmount }
}"#;

async fn create_invoice(app: &TestApp, amount: &str) -> String {
    let data = app
        .graphql_ok(
            TEST_USER,
            CREATE_INVOICE,
            json!({ "input": {
                "partnerName": "Acme Corp",
                "amount": amount,
                "dueDate": "2030-06-30"
            }}),
        )
        .await;
    assert_eq!(data["createInvoice"]["status"], "UNPAID");
    data["createInvoice"]["invoiceId"]
        .as_str()
        .unwrap()
        .to_string()
}

async fn pay_invoice(app: &TestApp, invoice_id: &str, amount: &str) -> Value {
    let data = app
        .graphql_ok(
            TEST_USER,
            CREATE_PAYMENT,
            json!({ "input": {
                "amount": amount,
                "direction": "IN",
                "method": "BANK",
                "invoiceId": invoice_id
            }}),
        )
        .await;
    data["createPayment"].clone()
}

async fn invoice_status(app: &TestApp, invoice_id: &str) -> String {
    let data = app
        .graphql_ok(
            TEST_USER,
            r#"query($id: UUID!) { invoice(invoiceId: $id) { status } }"#,
            json!({ "id": invoice_id }),
        )
        .await;
    data["invoice"]["status"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn partial_payment_marks_invoice_partial() {
    let Some(app) = TestApp::spawn().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };
    let invoice_id = create_invoice(&app, "1000.00").await;

    let payment = pay_invoice(&app, &invoice_id, "400.00").await;
    assert_eq!(payment["label"], "PARTIAL");
    assert_eq!(invoice_status(&app, &invoice_id).await, "PARTIAL");

    app.cleanup().await;
}

#[tokio::test]
async fn exact_payment_settles_invoice() {
    let Some(app) = TestApp::spawn().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };
    let invoice_id = create_invoice(&app, "1000.00").await;

    pay_invoice(&app, &invoice_id, "600.00").await;
    let payment = pay_invoice(&app, &invoice_id, "400.00").await;

    assert_eq!(payment["label"], "NORMAL");
    assert_eq!(invoice_status(&app, &invoice_id).await, "PAID");

    app.cleanup().await;
}

#[tokio::test]
async fn overpayment_labels_latest_payment_and_records_excess() {
    let Some(app) = TestApp::spawn().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };
    let invoice_id = create_invoice(&app, "1000.00").await;

    let first = pay_invoice(&app, &invoice_id, "800.00").await;
    let second = pay_invoice(&app, &invoice_id, "300.00").await;

    // Invoice settles; only the most recent payment carries the overpay label
    assert_eq!(invoice_status(&app, &invoice_id).await, "PAID");
    assert_eq!(second["label"], "OVERPAY");
    // NUMERIC(20,4) columns come back at scale 4
    assert_eq!(second["overpaidAmount"], "100.0000");

    let data = app
        .graphql_ok(
            TEST_USER,
            r#"query($id: UUID!) { payment(paymentId: $id) { label overpaidAmount } }"#,
            json!({ "id": first["paymentId"] }),
        )
        .await;
    assert_eq!(data["payment"]["label"], "NORMAL");
    assert!(data["payment"]["overpaidAmount"].is_null());

    app.cleanup().await;
}

#[tokio::test]
async fn deleting_a_payment_re_reconciles_the_invoice() {
    let Some(app) = TestApp::spawn().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };
    let invoice_id = create_invoice(&app, "1000.00").await;

    let payment = pay_invoice(&app, &invoice_id, "1000.00").await;
    assert_eq!(invoice_status(&app, &invoice_id).await, "PAID");

    app.graphql_ok(
        TEST_USER,
        r#"mutation($id: UUID!) { deletePayment(paymentId: $id) }"#,
        json!({ "id": payment["paymentId"] }),
    )
    .await;

    assert_eq!(invoice_status(&app, &invoice_id).await, "UNPAID");

    app.cleanup().await;
}

#[tokio::test]
async fn unlinking_a_payment_re_reconciles_the_invoice() {
    let Some(app) = TestApp::spawn().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };
    let invoice_id = create_invoice(&app, "500.00").await;

    let payment = pay_invoice(&app, &invoice_id, "200.00").await;
    assert_eq!(invoice_status(&app, &invoice_id).await, "PARTIAL");

    app.graphql_ok(
        TEST_USER,
        r#"mutation($id: UUID!, $input: UpdatePaymentInput!) {
            updatePayment(paymentId: $id, input: $input) { invoiceId }
        }"#,
        json!({ "id": payment["paymentId"], "input": { "unlinkInvoice": true } }),
    )
    .await;

    assert_eq!(invoice_status(&app, &invoice_id).await, "UNPAID");

    app.cleanup().await;
}

#[tokio::test]
async fn expense_linked_payment_cannot_be_relinked_to_an_invoice() {
    let Some(app) = TestApp::spawn().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };
    let invoice_id = create_invoice(&app, "100.00").await;

    let attachment_id = app.register_attachment(TEST_USER).await;
    let data = app
        .graphql_ok(
            TEST_USER,
            r#"mutation($input: CreateExpenseRequestInput!) {
                createExpenseRequest(input: $input) { expenseId }
            }"#,
            json!({ "input": { "amount": "50.00", "attachmentId": attachment_id } }),
        )
        .await;
    let expense_id = data["createExpenseRequest"]["expenseId"].clone();

    let data = app
        .graphql_ok(
            TEST_USER,
            CREATE_PAYMENT,
            json!({ "input": {
                "amount": "50.00",
                "direction": "OUT",
                "method": "BANK",
                "expenseRequestId": expense_id
            }}),
        )
        .await;
    let payment_id = data["createPayment"]["paymentId"].clone();

    let body = app
        .graphql(
            TEST_USER,
            r#"mutation($id: UUID!, $input: UpdatePaymentInput!) {
                updatePayment(paymentId: $id, input: $input) { paymentId }
            }"#,
            json!({ "id": payment_id, "input": { "invoiceId": invoice_id } }),
        )
        .await;
    let extensions = TestApp::first_error_extensions(&body);
    assert_eq!(extensions["code"], "BAD_USER_INPUT");

    app.cleanup().await;
}

#[tokio::test]
async fn payment_cannot_reference_invoice_and_expense_together() {
    let Some(app) = TestApp::spawn().await else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return;
    };
    let invoice_id = create_invoice(&app, "100.00").await;

    let body = app
        .graphql(
            TEST_USER,
            CREATE_PAYMENT,
            json!({ "input": {
                "amount": "100.00",
                "direction": "IN",
                "method": "BANK",
                "invoiceId": invoice_id,
                "expenseRequestId": "00000000-0000-0000-0000-000000000000"
            }}),
        )
        .await;
    let extensions = TestApp::first_error_extensions(&body);
    assert_eq!(extensions["code"], "BAD_USER_INPUT");

    app.cleanup().await;
}
