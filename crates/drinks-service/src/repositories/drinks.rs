//! PostgreSQL drink repository.
//!
//! All queries use parameterized statements. Recipes are stored as JSONB.

use crate::models::{Drink, DrinkUpdate, Ingredient, NewDrink};
use crate::observability::metrics::record_db_query;
use crate::repositories::{DrinkRepository, RepositoryError};
use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use std::time::Instant;
use tracing::instrument;

/// Drink repository backed by the `drinks` table.
#[derive(Clone)]
pub struct PgDrinkRepository {
    pool: PgPool,
}

impl PgDrinkRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Finish a timed query: record the outcome and map driver errors.
fn finish<T>(
    operation: &str,
    start: Instant,
    result: Result<T, sqlx::Error>,
) -> Result<T, sqlx::Error> {
    let status = if result.is_ok() { "success" } else { "error" };
    record_db_query(operation, status, start.elapsed());
    result
}

fn database_error(e: &sqlx::Error) -> RepositoryError {
    RepositoryError::Database(e.to_string())
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|db_error| db_error.is_unique_violation())
}

fn map_row_to_drink(row: &sqlx::postgres::PgRow) -> Result<Drink, RepositoryError> {
    let recipe: Json<Vec<Ingredient>> = row.try_get("recipe").map_err(|e| database_error(&e))?;
    Ok(Drink {
        id: row.try_get("id").map_err(|e| database_error(&e))?,
        title: row.try_get("title").map_err(|e| database_error(&e))?,
        recipe: recipe.0,
    })
}

#[async_trait]
impl DrinkRepository for PgDrinkRepository {
    #[instrument(skip_all, name = "drinks.repo.list")]
    async fn list(&self) -> Result<Vec<Drink>, RepositoryError> {
        let start = Instant::now();
        let rows = finish(
            "list_drinks",
            start,
            sqlx::query("SELECT id, title, recipe FROM drinks ORDER BY id")
                .fetch_all(&self.pool)
                .await,
        )
        .map_err(|e| database_error(&e))?;

        rows.iter().map(map_row_to_drink).collect()
    }

    #[instrument(skip_all, name = "drinks.repo.get", fields(id = id))]
    async fn get(&self, id: i32) -> Result<Drink, RepositoryError> {
        let start = Instant::now();
        let row = finish(
            "get_drink",
            start,
            sqlx::query("SELECT id, title, recipe FROM drinks WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await,
        )
        .map_err(|e| database_error(&e))?;

        match row {
            Some(row) => map_row_to_drink(&row),
            None => Err(RepositoryError::NotFound(id)),
        }
    }

    #[instrument(skip_all, name = "drinks.repo.insert")]
    async fn insert(&self, drink: NewDrink) -> Result<Drink, RepositoryError> {
        let start = Instant::now();
        let row = finish(
            "insert_drink",
            start,
            sqlx::query(
                r#"
                INSERT INTO drinks (title, recipe)
                VALUES ($1, $2)
                RETURNING id, title, recipe
                "#,
            )
            .bind(&drink.title)
            .bind(Json(&drink.recipe))
            .fetch_one(&self.pool)
            .await,
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                RepositoryError::DuplicateTitle(drink.title.clone())
            } else {
                database_error(&e)
            }
        })?;

        map_row_to_drink(&row)
    }

    #[instrument(skip_all, name = "drinks.repo.update", fields(id = id))]
    async fn update(&self, id: i32, update: DrinkUpdate) -> Result<Drink, RepositoryError> {
        let start = Instant::now();
        let row = finish(
            "update_drink",
            start,
            sqlx::query(
                r#"
                UPDATE drinks
                SET title = COALESCE($2, title),
                    recipe = COALESCE($3, recipe)
                WHERE id = $1
                RETURNING id, title, recipe
                "#,
            )
            .bind(id)
            .bind(update.title.as_deref())
            .bind(update.recipe.as_ref().map(Json))
            .fetch_optional(&self.pool)
            .await,
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                RepositoryError::DuplicateTitle(update.title.clone().unwrap_or_default())
            } else {
                database_error(&e)
            }
        })?;

        match row {
            Some(row) => map_row_to_drink(&row),
            None => Err(RepositoryError::NotFound(id)),
        }
    }

    #[instrument(skip_all, name = "drinks.repo.delete", fields(id = id))]
    async fn delete(&self, id: i32) -> Result<(), RepositoryError> {
        let start = Instant::now();
        let result = finish(
            "delete_drink",
            start,
            sqlx::query("DELETE FROM drinks WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await,
        )
        .map_err(|e| database_error(&e))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(id));
        }
        Ok(())
    }
}
