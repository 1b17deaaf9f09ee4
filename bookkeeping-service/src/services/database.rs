//! Database connection pool, bootstrap, and reference-data operations.

use crate::models::{
    Account, AccountCategory, Attachment, CreateAccount, CreateAttachment, BOOTSTRAP_ACCOUNTS,
};
use crate::services::metrics::DB_QUERY_DURATION;
use service_core::error::AppError;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    /// Create the required ledger accounts if any are missing. Runs at every
    /// startup; existing codes are left untouched.
    #[instrument(skip(self))]
    pub async fn bootstrap_accounts(&self) -> Result<(), AppError> {
        for (code, name, category) in BOOTSTRAP_ACCOUNTS {
            let created = sqlx::query(
                r#"
                INSERT INTO accounts (account_id, code, name, category)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (code) DO NOTHING
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(code)
            .bind(name)
            .bind(category.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to bootstrap account: {}", e))
            })?;

            if created.rows_affected() > 0 {
                info!(code = code, name = name, "Bootstrap account created");
            }
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Account Operations
    // -------------------------------------------------------------------------

    /// Create a new account.
    #[instrument(skip(self, input), fields(code = %input.code))]
    pub async fn create_account(&self, input: &CreateAccount) -> Result<Account, AppError> {
        input.validate()?;

        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_account"])
            .start_timer();

        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (account_id, code, name, category)
            VALUES ($1, $2, $3, $4)
            RETURNING account_id, code, name, category, created_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&input.code)
        .bind(&input.name)
        .bind(input.category.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!(
                    "Account with code '{}' already exists",
                    input.code
                ))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create account: {}", e)),
        })?;

        timer.observe_duration();

        info!(account_id = %account.account_id, category = %account.category, "Account created");

        Ok(account)
    }

    /// Get an account by ID.
    pub async fn get_account(&self, account_id: Uuid) -> Result<Option<Account>, AppError> {
        let account = sqlx::query_as::<_, Account>(
            "SELECT account_id, code, name, category, created_utc FROM accounts WHERE account_id = $1",
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get account: {}", e)))?;

        Ok(account)
    }

    /// Get an account by its unique code.
    pub async fn get_account_by_code(&self, code: &str) -> Result<Option<Account>, AppError> {
        let account = sqlx::query_as::<_, Account>(
            "SELECT account_id, code, name, category, created_utc FROM accounts WHERE code = $1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get account: {}", e)))?;

        Ok(account)
    }

    /// List accounts, optionally filtered by category, ordered by code.
    #[instrument(skip(self))]
    pub async fn list_accounts(
        &self,
        category: Option<AccountCategory>,
    ) -> Result<Vec<Account>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_accounts"])
            .start_timer();

        let accounts = sqlx::query_as::<_, Account>(
            r#"
            SELECT account_id, code, name, category, created_utc
            FROM accounts
            WHERE ($1::varchar IS NULL OR category = $1)
            ORDER BY code
            "#,
        )
        .bind(category.map(|c| c.as_str()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list accounts: {}", e)))?;

        timer.observe_duration();

        Ok(accounts)
    }

    // -------------------------------------------------------------------------
    // Attachment Operations
    // -------------------------------------------------------------------------

    /// Register an attachment. The caller uploads the bytes separately via a
    /// presigned URL against `storage_key`.
    #[instrument(skip(self, input), fields(file_name = %input.file_name))]
    pub async fn create_attachment(
        &self,
        input: &CreateAttachment,
        storage_key: &str,
        uploaded_by: &str,
    ) -> Result<Attachment, AppError> {
        input.validate()?;

        let attachment = sqlx::query_as::<_, Attachment>(
            r#"
            INSERT INTO attachments (attachment_id, storage_key, file_name, content_type, uploaded_by)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING attachment_id, storage_key, file_name, content_type, uploaded_by, created_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(storage_key)
        .bind(&input.file_name)
        .bind(&input.content_type)
        .bind(uploaded_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to create attachment: {}", e))
        })?;

        info!(attachment_id = %attachment.attachment_id, "Attachment registered");

        Ok(attachment)
    }

    /// Get an attachment by ID.
    pub async fn get_attachment(
        &self,
        attachment_id: Uuid,
    ) -> Result<Option<Attachment>, AppError> {
        let attachment = sqlx::query_as::<_, Attachment>(
            r#"
            SELECT attachment_id, storage_key, file_name, content_type, uploaded_by, created_utc
            FROM attachments
            WHERE attachment_id = $1
            "#,
        )
        .bind(attachment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get attachment: {}", e)))?;

        Ok(attachment)
    }
}
