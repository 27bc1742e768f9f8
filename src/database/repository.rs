use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use thiserror::Error;
use tracing::{error, info};

use crate::database::models::{Drink, DrinkChanges, DrinkRow, Ingredient, NewDrink, Recipe, RecipeError};
use crate::types::DrinkId;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error("stored recipe is unreadable: {0}")]
    Recipe(#[from] RecipeError),
}

/// Persistence for the drinks table.
///
/// Every write runs in its own transaction. A failed write is rolled back
/// before the error is returned; nothing is retried.
#[async_trait]
pub trait DrinkStore: Send + Sync {
    async fn list(&self) -> Result<Vec<Drink>, StoreError>;

    async fn insert(&self, drink: NewDrink) -> Result<Drink, StoreError>;

    /// Returns `None` when no drink has this id
    async fn update(&self, id: DrinkId, changes: DrinkChanges) -> Result<Option<Drink>, StoreError>;

    /// Returns `false` when no drink has this id
    async fn delete(&self, id: DrinkId) -> Result<bool, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}

pub struct PgDrinkStore {
    pool: PgPool,
}

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS drinks (
        id SERIAL PRIMARY KEY,
        title TEXT NOT NULL CHECK (title <> ''),
        recipe TEXT NOT NULL
    )
"#;

impl PgDrinkStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        Ok(())
    }

    /// Drop and recreate the table, then seed it with a single drink
    pub async fn reset(&self) -> Result<(), StoreError> {
        let seed = Recipe::new(vec![Ingredient {
            name: "water".to_string(),
            color: Some("blue".to_string()),
            parts: 1,
        }])?
        .encode()?;

        let mut tx = self.pool.begin().await?;
        let result = async {
            sqlx::query("DROP TABLE IF EXISTS drinks").execute(&mut *tx).await?;
            sqlx::query(CREATE_TABLE).execute(&mut *tx).await?;
            sqlx::query("INSERT INTO drinks (title, recipe) VALUES ($1, $2)")
                .bind("water")
                .bind(&seed)
                .execute(&mut *tx)
                .await?;
            Ok::<_, sqlx::Error>(())
        }
        .await;

        match result {
            Ok(()) => {
                tx.commit().await?;
                info!("Reset drinks table");
                Ok(())
            }
            Err(e) => Err(rollback(tx, e).await),
        }
    }
}

/// Roll back and hand back the error that caused it
async fn rollback(tx: Transaction<'_, Postgres>, cause: sqlx::Error) -> StoreError {
    if let Err(e) = tx.rollback().await {
        error!("Rollback failed after '{}': {}", cause, e);
    }
    StoreError::Sqlx(cause)
}

#[async_trait]
impl DrinkStore for PgDrinkStore {
    async fn list(&self) -> Result<Vec<Drink>, StoreError> {
        let rows = sqlx::query_as::<_, DrinkRow>("SELECT id, title, recipe FROM drinks ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| Drink::try_from(row).map_err(StoreError::from))
            .collect()
    }

    async fn insert(&self, drink: NewDrink) -> Result<Drink, StoreError> {
        let recipe = drink.recipe.encode()?;

        let mut tx = self.pool.begin().await?;
        let row = match sqlx::query_as::<_, DrinkRow>(
            "INSERT INTO drinks (title, recipe) VALUES ($1, $2) RETURNING id, title, recipe",
        )
        .bind(&drink.title)
        .bind(&recipe)
        .fetch_one(&mut *tx)
        .await
        {
            Ok(row) => row,
            Err(e) => return Err(rollback(tx, e).await),
        };
        tx.commit().await?;

        Ok(Drink::try_from(row)?)
    }

    async fn update(&self, id: DrinkId, changes: DrinkChanges) -> Result<Option<Drink>, StoreError> {
        let recipe = changes.recipe.as_ref().map(Recipe::encode).transpose()?;

        let mut tx = self.pool.begin().await?;
        let row = match sqlx::query_as::<_, DrinkRow>(
            "UPDATE drinks SET title = COALESCE($2, title), recipe = COALESCE($3, recipe)
             WHERE id = $1
             RETURNING id, title, recipe",
        )
        .bind(id)
        .bind(changes.title.as_deref())
        .bind(recipe.as_deref())
        .fetch_optional(&mut *tx)
        .await
        {
            Ok(row) => row,
            Err(e) => return Err(rollback(tx, e).await),
        };
        tx.commit().await?;

        Ok(row.map(Drink::try_from).transpose()?)
    }

    async fn delete(&self, id: DrinkId) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        let deleted = match sqlx::query("DELETE FROM drinks WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
        {
            Ok(result) => result.rows_affected() > 0,
            Err(e) => return Err(rollback(tx, e).await),
        };
        tx.commit().await?;

        Ok(deleted)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
