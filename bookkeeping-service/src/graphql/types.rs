//! GraphQL object and input types, converted from the domain models at the
//! API boundary. Lifecycle enums are surfaced as GraphQL enums; rows store
//! them as strings, so conversions go through the models' `from_str`.

use crate::models;
use async_graphql::{Enum, InputObject, SimpleObject};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq)]
#[graphql(rename_items = "SCREAMING_SNAKE_CASE")]
pub enum AccountCategoryGql {
    Asset,
    Liability,
    Equity,
    Revenue,
    Expense,
}

impl From<models::AccountCategory> for AccountCategoryGql {
    fn from(c: models::AccountCategory) -> Self {
        match c {
            models::AccountCategory::Asset => Self::Asset,
            models::AccountCategory::Liability => Self::Liability,
            models::AccountCategory::Equity => Self::Equity,
            models::AccountCategory::Revenue => Self::Revenue,
            models::AccountCategory::Expense => Self::Expense,
        }
    }
}

impl From<AccountCategoryGql> for models::AccountCategory {
    fn from(c: AccountCategoryGql) -> Self {
        match c {
            AccountCategoryGql::Asset => Self::Asset,
            AccountCategoryGql::Liability => Self::Liability,
            AccountCategoryGql::Equity => Self::Equity,
            AccountCategoryGql::Revenue => Self::Revenue,
            AccountCategoryGql::Expense => Self::Expense,
        }
    }
}

#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq)]
#[graphql(rename_items = "SCREAMING_SNAKE_CASE")]
pub enum ExpenseStateGql {
    Draft,
    Pending,
    Approved,
    Paid,
    Rejected,
    Closed,
}

impl From<models::ExpenseState> for ExpenseStateGql {
    fn from(s: models::ExpenseState) -> Self {
        match s {
            models::ExpenseState::Draft => Self::Draft,
            models::ExpenseState::Pending => Self::Pending,
            models::ExpenseState::Approved => Self::Approved,
            models::ExpenseState::Paid => Self::Paid,
            models::ExpenseState::Rejected => Self::Rejected,
            models::ExpenseState::Closed => Self::Closed,
        }
    }
}

impl From<ExpenseStateGql> for models::ExpenseState {
    fn from(s: ExpenseStateGql) -> Self {
        match s {
            ExpenseStateGql::Draft => Self::Draft,
            ExpenseStateGql::Pending => Self::Pending,
            ExpenseStateGql::Approved => Self::Approved,
            ExpenseStateGql::Paid => Self::Paid,
            ExpenseStateGql::Rejected => Self::Rejected,
            ExpenseStateGql::Closed => Self::Closed,
        }
    }
}

#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq)]
#[graphql(rename_items = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatusGql {
    Draft,
    Unpaid,
    Partial,
    Paid,
    Overpay,
}

impl From<models::InvoiceStatus> for InvoiceStatusGql {
    fn from(s: models::InvoiceStatus) -> Self {
        match s {
            models::InvoiceStatus::Draft => Self::Draft,
            models::InvoiceStatus::Unpaid => Self::Unpaid,
            models::InvoiceStatus::Partial => Self::Partial,
            models::InvoiceStatus::Paid => Self::Paid,
            models::InvoiceStatus::Overpay => Self::Overpay,
        }
    }
}

#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq)]
#[graphql(rename_items = "SCREAMING_SNAKE_CASE")]
pub enum PaymentDirectionGql {
    In,
    Out,
}

impl From<models::PaymentDirection> for PaymentDirectionGql {
    fn from(d: models::PaymentDirection) -> Self {
        match d {
            models::PaymentDirection::In => Self::In,
            models::PaymentDirection::Out => Self::Out,
        }
    }
}

impl From<PaymentDirectionGql> for models::PaymentDirection {
    fn from(d: PaymentDirectionGql) -> Self {
        match d {
            PaymentDirectionGql::In => Self::In,
            PaymentDirectionGql::Out => Self::Out,
        }
    }
}

#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq)]
#[graphql(rename_items = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethodGql {
    Bank,
    Cash,
    Other,
}

impl From<models::PaymentMethod> for PaymentMethodGql {
    fn from(m: models::PaymentMethod) -> Self {
        match m {
            models::PaymentMethod::Bank => Self::Bank,
            models::PaymentMethod::Cash => Self::Cash,
            models::PaymentMethod::Other => Self::Other,
        }
    }
}

impl From<PaymentMethodGql> for models::PaymentMethod {
    fn from(m: PaymentMethodGql) -> Self {
        match m {
            PaymentMethodGql::Bank => Self::Bank,
            PaymentMethodGql::Cash => Self::Cash,
            PaymentMethodGql::Other => Self::Other,
        }
    }
}

#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq)]
#[graphql(rename_items = "SCREAMING_SNAKE_CASE")]
pub enum PaymentLabelGql {
    Normal,
    Partial,
    Overpay,
}

impl From<models::PaymentLabel> for PaymentLabelGql {
    fn from(l: models::PaymentLabel) -> Self {
        match l {
            models::PaymentLabel::Normal => Self::Normal,
            models::PaymentLabel::Partial => Self::Partial,
            models::PaymentLabel::Overpay => Self::Overpay,
        }
    }
}

// ---------------------------------------------------------------------------
// Objects
// ---------------------------------------------------------------------------

/// The caller as resolved from the trusted proxy header.
#[derive(SimpleObject, Debug, Clone)]
#[graphql(name = "Caller")]
pub struct CallerObject {
    pub username: String,
    pub is_admin: bool,
}

impl From<&service_core::identity::AuthenticatedIdentity> for CallerObject {
    fn from(i: &service_core::identity::AuthenticatedIdentity) -> Self {
        Self {
            username: i.username.clone(),
            is_admin: i.is_admin,
        }
    }
}

#[derive(SimpleObject, Debug, Clone)]
#[graphql(name = "Account")]
pub struct AccountObject {
    pub account_id: Uuid,
    pub code: String,
    pub name: String,
    pub category: AccountCategoryGql,
    pub created_utc: DateTime<Utc>,
}

impl From<models::Account> for AccountObject {
    fn from(a: models::Account) -> Self {
        let category = a
            .parsed_category()
            .unwrap_or(models::AccountCategory::Asset)
            .into();
        Self {
            account_id: a.account_id,
            code: a.code,
            name: a.name,
            category,
            created_utc: a.created_utc,
        }
    }
}

#[derive(SimpleObject, Debug, Clone)]
#[graphql(name = "Category")]
pub struct CategoryObject {
    pub category_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl From<models::Category> for CategoryObject {
    fn from(c: models::Category) -> Self {
        Self {
            category_id: c.category_id,
            name: c.name,
            description: c.description,
            created_utc: c.created_utc,
        }
    }
}

#[derive(SimpleObject, Debug, Clone)]
#[graphql(name = "Budget")]
pub struct BudgetObject {
    pub budget_id: Uuid,
    pub category_id: Uuid,
    pub fiscal_year: i32,
    pub amount_planned: Decimal,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl From<models::Budget> for BudgetObject {
    fn from(b: models::Budget) -> Self {
        Self {
            budget_id: b.budget_id,
            category_id: b.category_id,
            fiscal_year: b.fiscal_year,
            amount_planned: b.amount_planned,
            created_utc: b.created_utc,
            updated_utc: b.updated_utc,
        }
    }
}

#[derive(SimpleObject, Debug, Clone)]
#[graphql(name = "Attachment")]
pub struct AttachmentObject {
    pub attachment_id: Uuid,
    pub file_name: String,
    pub content_type: String,
    pub uploaded_by: String,
    pub created_utc: DateTime<Utc>,
}

impl From<models::Attachment> for AttachmentObject {
    fn from(a: models::Attachment) -> Self {
        Self {
            attachment_id: a.attachment_id,
            file_name: a.file_name,
            content_type: a.content_type,
            uploaded_by: a.uploaded_by,
            created_utc: a.created_utc,
        }
    }
}

/// Result of registering an attachment: the metadata row plus a presigned
/// URL the client PUTs the bytes to.
#[derive(SimpleObject, Debug, Clone)]
pub struct AttachmentRegistration {
    pub attachment: AttachmentObject,
    pub upload_url: String,
}

#[derive(SimpleObject, Debug, Clone)]
#[graphql(name = "JournalLine")]
pub struct JournalLineObject {
    pub line_id: Uuid,
    pub account_id: Uuid,
    pub debit: Option<Decimal>,
    pub credit: Option<Decimal>,
}

impl From<models::JournalLine> for JournalLineObject {
    fn from(l: models::JournalLine) -> Self {
        Self {
            line_id: l.line_id,
            account_id: l.account_id,
            debit: l.debit,
            credit: l.credit,
        }
    }
}

#[derive(SimpleObject, Debug, Clone)]
#[graphql(name = "JournalEntry")]
pub struct JournalEntryObject {
    pub entry_id: Uuid,
    pub entry_datetime: DateTime<Utc>,
    pub description: Option<String>,
    pub created_by: String,
    pub created_utc: DateTime<Utc>,
    pub lines: Vec<JournalLineObject>,
}

impl From<models::JournalEntryWithLines> for JournalEntryObject {
    fn from(e: models::JournalEntryWithLines) -> Self {
        Self {
            entry_id: e.entry.entry_id,
            entry_datetime: e.entry.entry_datetime,
            description: e.entry.description,
            created_by: e.entry.created_by,
            created_utc: e.entry.created_utc,
            lines: e.lines.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(SimpleObject, Debug, Clone)]
#[graphql(name = "Invoice")]
pub struct InvoiceObject {
    pub invoice_id: Uuid,
    pub invoice_no: String,
    pub partner_name: String,
    pub amount: Decimal,
    pub status: InvoiceStatusGql,
    pub due_date: NaiveDate,
    pub created_by: String,
    pub created_utc: DateTime<Utc>,
}

impl From<models::Invoice> for InvoiceObject {
    fn from(i: models::Invoice) -> Self {
        let status = i
            .parsed_status()
            .unwrap_or(models::InvoiceStatus::Unpaid)
            .into();
        Self {
            invoice_id: i.invoice_id,
            invoice_no: i.invoice_no,
            partner_name: i.partner_name,
            amount: i.amount,
            status,
            due_date: i.due_date,
            created_by: i.created_by,
            created_utc: i.created_utc,
        }
    }
}

#[derive(SimpleObject, Debug, Clone)]
#[graphql(name = "ExpenseRequest")]
pub struct ExpenseRequestObject {
    pub expense_id: Uuid,
    pub amount: Decimal,
    pub state: ExpenseStateGql,
    pub description: Option<String>,
    pub requester: String,
    pub approver: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub attachment_id: Uuid,
    pub account_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub payment_id: Option<Uuid>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl From<models::ExpenseRequest> for ExpenseRequestObject {
    fn from(e: models::ExpenseRequest) -> Self {
        let state = e
            .parsed_state()
            .unwrap_or(models::ExpenseState::Draft)
            .into();
        Self {
            expense_id: e.expense_id,
            amount: e.amount,
            state,
            description: e.description,
            requester: e.requester,
            approver: e.approver,
            approved_at: e.approved_at,
            attachment_id: e.attachment_id,
            account_id: e.account_id,
            category_id: e.category_id,
            payment_id: e.payment_id,
            created_utc: e.created_utc,
            updated_utc: e.updated_utc,
        }
    }
}

#[derive(SimpleObject, Debug, Clone)]
#[graphql(name = "Payment")]
pub struct PaymentObject {
    pub payment_id: Uuid,
    pub amount: Decimal,
    pub paid_at: DateTime<Utc>,
    pub direction: PaymentDirectionGql,
    pub method: PaymentMethodGql,
    pub label: PaymentLabelGql,
    pub invoice_id: Option<Uuid>,
    pub expense_request_id: Option<Uuid>,
    pub overpaid_amount: Option<Decimal>,
    pub note: Option<String>,
    pub created_by: String,
    pub created_utc: DateTime<Utc>,
}

impl From<models::Payment> for PaymentObject {
    fn from(p: models::Payment) -> Self {
        let direction = p
            .parsed_direction()
            .unwrap_or(models::PaymentDirection::In)
            .into();
        let method = p
            .parsed_method()
            .unwrap_or(models::PaymentMethod::Other)
            .into();
        let label = p
            .parsed_label()
            .unwrap_or(models::PaymentLabel::Normal)
            .into();
        Self {
            payment_id: p.payment_id,
            amount: p.amount,
            paid_at: p.paid_at,
            direction,
            method,
            label,
            invoice_id: p.invoice_id,
            expense_request_id: p.expense_request_id,
            overpaid_amount: p.overpaid_amount,
            note: p.note,
            created_by: p.created_by,
            created_utc: p.created_utc,
        }
    }
}

#[derive(SimpleObject, Debug, Clone)]
#[graphql(name = "ProfitLossLine")]
pub struct ProfitLossLineObject {
    pub account_id: Uuid,
    pub account_code: String,
    pub account_name: String,
    pub category: String,
    pub amount: Decimal,
}

impl From<models::ProfitLossLine> for ProfitLossLineObject {
    fn from(l: models::ProfitLossLine) -> Self {
        Self {
            account_id: l.account_id,
            account_code: l.account_code,
            account_name: l.account_name,
            category: l.category,
            amount: l.amount,
        }
    }
}

#[derive(SimpleObject, Debug, Clone)]
#[graphql(name = "ProfitLossStatement")]
pub struct ProfitLossObject {
    pub total_revenue: Decimal,
    pub total_expense: Decimal,
    pub net: Decimal,
    pub lines: Vec<ProfitLossLineObject>,
}

impl From<models::ProfitLossStatement> for ProfitLossObject {
    fn from(s: models::ProfitLossStatement) -> Self {
        Self {
            total_revenue: s.total_revenue,
            total_expense: s.total_expense,
            net: s.net,
            lines: s.lines.into_iter().map(Into::into).collect(),
        }
    }
}

/// Subscription payload: one state change of an expense request or invoice.
#[derive(SimpleObject, Debug, Clone)]
pub struct StateChangeObject {
    pub event_type: String,
    pub id: Uuid,
    pub old_state: String,
    pub new_state: String,
    pub actor: Option<String>,
}

impl From<models::StateChangeEvent> for StateChangeObject {
    fn from(e: models::StateChangeEvent) -> Self {
        Self {
            event_type: e.event_type,
            id: e.id,
            old_state: e.old_state,
            new_state: e.new_state,
            actor: e.actor,
        }
    }
}

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

#[derive(InputObject, Debug, Clone)]
pub struct CreateAccountInput {
    pub code: String,
    pub name: String,
    pub category: AccountCategoryGql,
}

impl From<CreateAccountInput> for models::CreateAccount {
    fn from(i: CreateAccountInput) -> Self {
        Self {
            code: i.code,
            name: i.name,
            category: i.category.into(),
        }
    }
}

#[derive(InputObject, Debug, Clone)]
pub struct CreateCategoryInput {
    pub name: String,
    pub description: Option<String>,
}

impl From<CreateCategoryInput> for models::CreateCategory {
    fn from(i: CreateCategoryInput) -> Self {
        Self {
            name: i.name,
            description: i.description,
        }
    }
}

#[derive(InputObject, Debug, Clone, Default)]
pub struct UpdateCategoryInput {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl From<UpdateCategoryInput> for models::UpdateCategory {
    fn from(i: UpdateCategoryInput) -> Self {
        Self {
            name: i.name,
            description: i.description,
        }
    }
}

#[derive(InputObject, Debug, Clone)]
pub struct SetBudgetInput {
    pub category_id: Uuid,
    pub fiscal_year: i32,
    pub amount_planned: Decimal,
}

impl From<SetBudgetInput> for models::SetBudget {
    fn from(i: SetBudgetInput) -> Self {
        Self {
            category_id: i.category_id,
            fiscal_year: i.fiscal_year,
            amount_planned: i.amount_planned,
        }
    }
}

#[derive(InputObject, Debug, Clone)]
pub struct RegisterAttachmentInput {
    pub file_name: String,
    pub content_type: String,
}

impl From<RegisterAttachmentInput> for models::CreateAttachment {
    fn from(i: RegisterAttachmentInput) -> Self {
        Self {
            file_name: i.file_name,
            content_type: i.content_type,
        }
    }
}

#[derive(InputObject, Debug, Clone)]
pub struct JournalLineInput {
    pub account_id: Uuid,
    pub debit: Option<Decimal>,
    pub credit: Option<Decimal>,
}

impl From<JournalLineInput> for models::JournalLineInput {
    fn from(i: JournalLineInput) -> Self {
        Self {
            account_id: i.account_id,
            debit: i.debit,
            credit: i.credit,
        }
    }
}

#[derive(InputObject, Debug, Clone)]
pub struct CreateJournalEntryInput {
    pub entry_datetime: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub lines: Vec<JournalLineInput>,
}

impl From<CreateJournalEntryInput> for models::CreateJournalEntry {
    fn from(i: CreateJournalEntryInput) -> Self {
        Self {
            entry_datetime: i.entry_datetime,
            description: i.description,
            lines: i.lines.into_iter().map(Into::into).collect(),
        }
    }
}

/// Supplying `lines` replaces the entry's whole line set.
#[derive(InputObject, Debug, Clone, Default)]
pub struct UpdateJournalEntryInput {
    pub entry_datetime: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub lines: Option<Vec<JournalLineInput>>,
}

impl From<UpdateJournalEntryInput> for models::UpdateJournalEntry {
    fn from(i: UpdateJournalEntryInput) -> Self {
        Self {
            entry_datetime: i.entry_datetime,
            description: i.description,
            lines: i
                .lines
                .map(|lines| lines.into_iter().map(Into::into).collect()),
        }
    }
}

#[derive(InputObject, Debug, Clone)]
pub struct CreateInvoiceInput {
    pub partner_name: String,
    pub amount: Decimal,
    pub due_date: NaiveDate,
}

impl From<CreateInvoiceInput> for models::CreateInvoice {
    fn from(i: CreateInvoiceInput) -> Self {
        Self {
            partner_name: i.partner_name,
            amount: i.amount,
            due_date: i.due_date,
        }
    }
}

#[derive(InputObject, Debug, Clone)]
pub struct CreateExpenseRequestInput {
    pub amount: Decimal,
    pub description: Option<String>,
    pub attachment_id: Uuid,
    pub account_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
}

impl From<CreateExpenseRequestInput> for models::CreateExpenseRequest {
    fn from(i: CreateExpenseRequestInput) -> Self {
        Self {
            amount: i.amount,
            description: i.description,
            attachment_id: i.attachment_id,
            account_id: i.account_id,
            category_id: i.category_id,
        }
    }
}

#[derive(InputObject, Debug, Clone, Default)]
pub struct UpdateExpenseRequestInput {
    pub amount: Option<Decimal>,
    pub description: Option<String>,
    pub attachment_id: Option<Uuid>,
    pub account_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
}

impl From<UpdateExpenseRequestInput> for models::UpdateExpenseRequest {
    fn from(i: UpdateExpenseRequestInput) -> Self {
        Self {
            amount: i.amount,
            description: i.description,
            attachment_id: i.attachment_id,
            account_id: i.account_id,
            category_id: i.category_id,
        }
    }
}

#[derive(InputObject, Debug, Clone)]
pub struct CreatePaymentInput {
    pub amount: Decimal,
    pub paid_at: Option<DateTime<Utc>>,
    pub direction: PaymentDirectionGql,
    pub method: PaymentMethodGql,
    pub invoice_id: Option<Uuid>,
    pub expense_request_id: Option<Uuid>,
    pub note: Option<String>,
}

impl From<CreatePaymentInput> for models::CreatePayment {
    fn from(i: CreatePaymentInput) -> Self {
        Self {
            amount: i.amount,
            paid_at: i.paid_at,
            direction: i.direction.into(),
            method: i.method.into(),
            invoice_id: i.invoice_id,
            expense_request_id: i.expense_request_id,
            note: i.note,
        }
    }
}

/// `invoice_id` relinks the payment; `unlink_invoice: true` clears the link.
/// Setting both is rejected.
#[derive(InputObject, Debug, Clone, Default)]
pub struct UpdatePaymentInput {
    pub amount: Option<Decimal>,
    pub paid_at: Option<DateTime<Utc>>,
    pub method: Option<PaymentMethodGql>,
    pub invoice_id: Option<Uuid>,
    #[graphql(default = false)]
    pub unlink_invoice: bool,
    pub note: Option<String>,
}

impl UpdatePaymentInput {
    pub fn into_patch(self) -> Result<models::UpdatePayment, &'static str> {
        let invoice_id = match (self.invoice_id, self.unlink_invoice) {
            (Some(_), true) => return Err("invoiceId and unlinkInvoice are mutually exclusive"),
            (Some(id), false) => Some(Some(id)),
            (None, true) => Some(None),
            (None, false) => None,
        };
        Ok(models::UpdatePayment {
            amount: self.amount,
            paid_at: self.paid_at,
            method: self.method.map(Into::into),
            invoice_id,
            note: self.note,
        })
    }
}
