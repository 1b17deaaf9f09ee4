//! Category and budget operations.

use crate::models::{Budget, Category, CreateCategory, SetBudget, UpdateCategory};
use crate::services::database::Database;
use crate::services::metrics::DB_QUERY_DURATION;
use service_core::error::AppError;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

impl Database {
    // -------------------------------------------------------------------------
    // Category Operations
    // -------------------------------------------------------------------------

    /// Create a category.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_category(&self, input: &CreateCategory) -> Result<Category, AppError> {
        input.validate()?;

        let category = sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (category_id, name, description)
            VALUES ($1, $2, $3)
            RETURNING category_id, name, description, created_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&input.name)
        .bind(&input.description)
        .fetch_one(self.pool())
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!(
                    "Category '{}' already exists",
                    input.name
                ))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create category: {}", e)),
        })?;

        info!(category_id = %category.category_id, "Category created");

        Ok(category)
    }

    /// Update a category.
    #[instrument(skip(self, patch))]
    pub async fn update_category(
        &self,
        category_id: Uuid,
        patch: &UpdateCategory,
    ) -> Result<Category, AppError> {
        let category = sqlx::query_as::<_, Category>(
            r#"
            UPDATE categories
            SET name = COALESCE($2, name),
                description = COALESCE($3, description)
            WHERE category_id = $1
            RETURNING category_id, name, description, created_utc
            "#,
        )
        .bind(category_id)
        .bind(&patch.name)
        .bind(&patch.description)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!("Category name already taken"))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to update category: {}", e)),
        })?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Category {} not found", category_id)))?;

        Ok(category)
    }

    /// Get a category by ID.
    pub async fn get_category(&self, category_id: Uuid) -> Result<Option<Category>, AppError> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT category_id, name, description, created_utc FROM categories WHERE category_id = $1",
        )
        .bind(category_id)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to get category: {}", e)))?;

        Ok(category)
    }

    /// List all categories, alphabetically.
    pub async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT category_id, name, description, created_utc FROM categories ORDER BY name",
        )
        .fetch_all(self.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list categories: {}", e)))?;

        Ok(categories)
    }

    /// Delete a category. Guarded in application code: any referencing budget
    /// or expense request blocks deletion, independent of FK constraints.
    #[instrument(skip(self))]
    pub async fn delete_category(&self, category_id: Uuid) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_category"])
            .start_timer();

        let references: i64 = sqlx::query_scalar(
            r#"
            SELECT (SELECT COUNT(*) FROM budgets WHERE category_id = $1)
                 + (SELECT COUNT(*) FROM expense_requests WHERE category_id = $1)
            "#,
        )
        .bind(category_id)
        .fetch_one(self.pool())
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to count references: {}", e))
        })?;

        if references > 0 {
            return Err(AppError::BusinessRule(
                "CATEGORY_IN_USE",
                anyhow::anyhow!(
                    "Category {} is referenced by {} budget(s) or expense request(s)",
                    category_id,
                    references
                ),
            ));
        }

        let result = sqlx::query("DELETE FROM categories WHERE category_id = $1")
            .bind(category_id)
            .execute(self.pool())
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to delete category: {}", e))
            })?;

        timer.observe_duration();

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(anyhow::anyhow!(
                "Category {} not found",
                category_id
            )));
        }

        info!(category_id = %category_id, "Category deleted");

        Ok(())
    }

    // -------------------------------------------------------------------------
    // Budget Operations
    // -------------------------------------------------------------------------

    /// Upsert the budget for `(category_id, fiscal_year)`.
    #[instrument(skip(self, input), fields(category_id = %input.category_id, fiscal_year = input.fiscal_year))]
    pub async fn set_budget(&self, input: &SetBudget) -> Result<Budget, AppError> {
        if input.fiscal_year < SetBudget::MIN_FISCAL_YEAR {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Fiscal year must be {} or later",
                SetBudget::MIN_FISCAL_YEAR
            )));
        }
        if input.amount_planned.is_sign_negative() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Planned amount must not be negative"
            )));
        }

        // FK violation on category_id means the category does not exist.
        let budget = sqlx::query_as::<_, Budget>(
            r#"
            INSERT INTO budgets (budget_id, category_id, fiscal_year, amount_planned)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (category_id, fiscal_year)
            DO UPDATE SET amount_planned = EXCLUDED.amount_planned, updated_utc = NOW()
            RETURNING budget_id, category_id, fiscal_year, amount_planned, created_utc, updated_utc
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(input.category_id)
        .bind(input.fiscal_year)
        .bind(input.amount_planned)
        .fetch_one(self.pool())
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                AppError::NotFound(anyhow::anyhow!(
                    "Category {} not found",
                    input.category_id
                ))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to set budget: {}", e)),
        })?;

        info!(budget_id = %budget.budget_id, "Budget set");

        Ok(budget)
    }

    /// List budgets for a fiscal year (or all years).
    pub async fn list_budgets(&self, fiscal_year: Option<i32>) -> Result<Vec<Budget>, AppError> {
        let budgets = sqlx::query_as::<_, Budget>(
            r#"
            SELECT budget_id, category_id, fiscal_year, amount_planned, created_utc, updated_utc
            FROM budgets
            WHERE ($1::int IS NULL OR fiscal_year = $1)
            ORDER BY fiscal_year DESC, category_id
            "#,
        )
        .bind(fiscal_year)
        .fetch_all(self.pool())
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to list budgets: {}", e)))?;

        Ok(budgets)
    }
}
