//! Journal engine: balanced double-entry records.

use crate::models::{
    ensure_balanced, CreateJournalEntry, JournalEntry, JournalEntryWithLines, JournalLine,
    JournalLineInput, JournalRange, UpdateJournalEntry,
};
use crate::services::database::Database;
use crate::services::metrics::{DB_QUERY_DURATION, JOURNAL_ENTRIES_TOTAL};
use chrono::Utc;
use service_core::error::AppError;
use sqlx::{Postgres, Transaction};
use tracing::{info, instrument};
use uuid::Uuid;

async fn insert_lines(
    tx: &mut Transaction<'_, Postgres>,
    entry_id: Uuid,
    lines: &[JournalLineInput],
) -> Result<Vec<JournalLine>, AppError> {
    let mut inserted = Vec::with_capacity(lines.len());
    for line in lines {
        let row = sqlx::query_as::<_, JournalLine>(
            r#"
            INSERT INTO journal_lines (line_id, entry_id, account_id, debit, credit)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING line_id, entry_id, account_id, debit, credit
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(entry_id)
        .bind(line.account_id)
        .bind(line.debit)
        .bind(line.credit)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                AppError::BadRequest(anyhow::anyhow!(
                    "Account {} does not exist",
                    line.account_id
                ))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to insert line: {}", e)),
        })?;
        inserted.push(row);
    }
    Ok(inserted)
}

impl Database {
    /// Create a journal entry with its lines atomically. The balance gate
    /// runs before anything is persisted.
    #[instrument(skip(self, input), fields(lines = input.lines.len()))]
    pub async fn create_journal_entry(
        &self,
        input: &CreateJournalEntry,
        actor: &str,
    ) -> Result<JournalEntryWithLines, AppError> {
        ensure_balanced(&input.lines).inspect_err(|_| {
            JOURNAL_ENTRIES_TOTAL.with_label_values(&["rejected"]).inc();
        })?;

        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_journal_entry"])
            .start_timer();

        let mut tx = self.pool().begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let entry = sqlx::query_as::<_, JournalEntry>(
            r#"
            INSERT INTO journal_entries (entry_id, entry_datetime, description, created_by)
            VALUES ($1, $2, $3, $4)
            RETURNING entry_id, entry_datetime, description, created_by, created_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.entry_datetime.unwrap_or_else(Utc::now))
        .bind(&input.description)
        .bind(actor)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to insert entry: {}", e)))?;

        let lines = insert_lines(&mut tx, entry.entry_id, &input.lines).await?;

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit entry: {}", e))
        })?;

        timer.observe_duration();
        JOURNAL_ENTRIES_TOTAL.with_label_values(&["ok"]).inc();

        info!(entry_id = %entry.entry_id, lines = lines.len(), "Journal entry created");

        Ok(JournalEntryWithLines { entry, lines })
    }

    /// Update an entry. Supplying lines replaces all existing lines in one
    /// transaction (delete-then-recreate); the balance gate applies to the
    /// replacement set.
    #[instrument(skip(self, patch))]
    pub async fn update_journal_entry(
        &self,
        entry_id: Uuid,
        patch: &UpdateJournalEntry,
    ) -> Result<JournalEntryWithLines, AppError> {
        if let Some(lines) = &patch.lines {
            ensure_balanced(lines)?;
        }

        let mut tx = self.pool().begin().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
        })?;

        let entry = sqlx::query_as::<_, JournalEntry>(
            r#"
            UPDATE journal_entries
            SET entry_datetime = COALESCE($2, entry_datetime),
                description = COALESCE($3, description)
            WHERE entry_id = $1
            RETURNING entry_id, entry_datetime, description, created_by, created_utc
            "#,
        )
        .bind(entry_id)
        .bind(patch.entry_datetime)
        .bind(&patch.description)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to update entry: {}", e)))?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Journal entry {} not found", entry_id)))?;

        let lines = if let Some(lines) = &patch.lines {
            sqlx::query("DELETE FROM journal_lines WHERE entry_id = $1")
                .bind(entry_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(anyhow::anyhow!("Failed to delete lines: {}", e))
                })?;
            insert_lines(&mut tx, entry_id, lines).await?
        } else {
            sqlx::query_as::<_, JournalLine>(
                "SELECT line_id, entry_id, account_id, debit, credit FROM journal_lines WHERE entry_id = $1",
            )
            .bind(entry_id)
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to fetch lines: {}", e)))?
        };

        tx.commit().await.map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to commit update: {}", e))
        })?;

        info!(entry_id = %entry_id, "Journal entry updated");

        Ok(JournalEntryWithLines { entry, lines })
    }

    /// Get an entry with its lines.
    pub async fn get_journal_entry(
        &self,
        entry_id: Uuid,
    ) -> Result<Option<JournalEntryWithLines>, AppError> {
        let entry = sqlx::query_as::<_, JournalEntry>(
            r#"
            SELECT entry_id, entry_datetime, description, created_by, created_utc
            FROM journal_entries
            WHERE entry_id = $1
            "#,
        )
        .bind(entry_id)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get entry: {}", e)))?;

        let Some(entry) = entry else {
            return Ok(None);
        };

        let lines = sqlx::query_as::<_, JournalLine>(
            "SELECT line_id, entry_id, account_id, debit, credit FROM journal_lines WHERE entry_id = $1",
        )
        .bind(entry_id)
        .fetch_all(self.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to fetch lines: {}", e)))?;

        Ok(Some(JournalEntryWithLines { entry, lines }))
    }

    /// List entries newest-first, filtered by datetime range and a
    /// case-insensitive substring match on description.
    #[instrument(skip(self, range))]
    pub async fn find_journal_entries(
        &self,
        range: &JournalRange,
    ) -> Result<Vec<JournalEntryWithLines>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_journal_entries"])
            .start_timer();

        let entries = sqlx::query_as::<_, JournalEntry>(
            r#"
            SELECT entry_id, entry_datetime, description, created_by, created_utc
            FROM journal_entries
            WHERE ($1::timestamptz IS NULL OR entry_datetime >= $1)
              AND ($2::timestamptz IS NULL OR entry_datetime <= $2)
              AND ($3::text IS NULL OR description ILIKE '%' || $3 || '%')
            ORDER BY entry_datetime DESC
            "#,
        )
        .bind(range.from)
        .bind(range.to)
        .bind(&range.search)
        .fetch_all(self.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list entries: {}", e)))?;

        let mut result = Vec::with_capacity(entries.len());
        for entry in entries {
            let lines = sqlx::query_as::<_, JournalLine>(
                "SELECT line_id, entry_id, account_id, debit, credit FROM journal_lines WHERE entry_id = $1",
            )
            .bind(entry.entry_id)
            .fetch_all(self.pool())
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to fetch lines: {}", e))
            })?;
            result.push(JournalEntryWithLines { entry, lines });
        }

        timer.observe_duration();

        Ok(result)
    }

    /// Delete an entry; lines cascade.
    #[instrument(skip(self))]
    pub async fn delete_journal_entry(&self, entry_id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM journal_entries WHERE entry_id = $1")
            .bind(entry_id)
            .execute(self.pool())
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete entry: {}", e))
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(anyhow::anyhow!(
                "Journal entry {} not found",
                entry_id
            )));
        }

        info!(entry_id = %entry_id, "Journal entry deleted");

        Ok(())
    }
}
