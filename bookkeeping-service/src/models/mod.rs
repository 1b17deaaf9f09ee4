//! Domain models for bookkeeping-service.

mod account;
mod attachment;
mod budget;
mod category;
mod expense;
mod invoice;
mod journal;
mod outbox;
mod payment;
mod report;

pub use account::{
    Account, AccountCategory, CreateAccount, BOOTSTRAP_ACCOUNTS, CODE_BANK, CODE_CASH,
    CODE_EXPENSE, CODE_RECEIVABLE, CODE_REVENUE,
};
pub use attachment::{Attachment, CreateAttachment};
pub use budget::{Budget, SetBudget};
pub use category::{Category, CreateCategory, UpdateCategory};
pub use expense::{
    CreateExpenseRequest, ExpenseEvent, ExpenseRequest, ExpenseState, TransitionOutcome,
    UpdateExpenseRequest,
};
pub use invoice::{
    format_invoice_no, invoice_no_prefix, next_invoice_no, CreateInvoice, Invoice, InvoiceStatus,
};
pub use journal::{
    ensure_balanced, CreateJournalEntry, JournalEntry, JournalEntryWithLines, JournalLine,
    JournalLineInput, JournalRange, UpdateJournalEntry,
};
pub use outbox::{OutboxEvent, StateChangeEvent};
pub use payment::{
    CreatePayment, Payment, PaymentDirection, PaymentLabel, PaymentMethod, Reconciliation,
    UpdatePayment,
};
pub use report::{ProfitLossLine, ProfitLossStatement};
