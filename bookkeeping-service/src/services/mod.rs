pub mod database;
pub mod events;
pub mod expenses;
pub mod invoices;
pub mod journal;
pub mod metrics;
pub mod outbox;
pub mod payments;
pub mod pdf;
pub mod reference;
pub mod reports;
pub mod storage;
pub mod webhook;

pub use database::Database;
pub use events::EventBus;
pub use expenses::ExpenseWorkflow;
pub use invoices::Invoicing;
pub use metrics::get_metrics;
pub use outbox::Dispatcher;
pub use payments::Payments;
pub use pdf::{HeadlessBrowserRenderer, MinimalPdfRenderer, PdfRenderer};
pub use storage::{LocalStorage, S3Storage, Storage, DEFAULT_PRESIGN_TTL};
pub use webhook::WebhookClient;
