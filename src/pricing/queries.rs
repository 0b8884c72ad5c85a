//! PostgreSQL backend of the durable price store.
//!
//! One row per record in `price_configs`; shared categories use an empty
//! tier column so the primary key stays total.

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::error::AppError;

use super::models::{PriceConfigRow, PriceKey};
use super::remote::RemoteStore;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS price_configs (
    product_line TEXT NOT NULL,
    category     TEXT NOT NULL,
    tier         TEXT NOT NULL DEFAULT '',
    items        JSONB NOT NULL,
    updated_at   TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (product_line, category, tier)
)
"#;

fn key_columns(key: &PriceKey) -> (&'static str, &'static str, &'static str) {
    (
        key.product_line.code(),
        key.category.key(),
        key.tier.map(|t| t.id()).unwrap_or(""),
    )
}

/// Find one stored record
pub async fn find_price_config(
    pool: &PgPool,
    product_line: &str,
    category: &str,
    tier: &str,
) -> Result<Option<PriceConfigRow>, AppError> {
    let row = sqlx::query_as::<_, PriceConfigRow>(
        r#"
        SELECT product_line, category, tier, items, updated_at
        FROM price_configs
        WHERE product_line = $1
          AND category = $2
          AND tier = $3
        "#,
    )
    .bind(product_line)
    .bind(category)
    .bind(tier)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Insert or overwrite a record. Last writer wins.
pub async fn upsert_price_config(
    pool: &PgPool,
    product_line: &str,
    category: &str,
    tier: &str,
    items: &serde_json::Value,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO price_configs (product_line, category, tier, items, updated_at)
        VALUES ($1, $2, $3, $4, now())
        ON CONFLICT (product_line, category, tier)
        DO UPDATE SET items = EXCLUDED.items, updated_at = EXCLUDED.updated_at
        "#,
    )
    .bind(product_line)
    .bind(category)
    .bind(tier)
    .bind(sqlx::types::Json(items))
    .execute(pool)
    .await?;

    Ok(())
}

/// Price store backed by PostgreSQL
#[derive(Clone)]
pub struct PgPriceStore {
    pool: PgPool,
}

impl PgPriceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Create the table when missing
    pub async fn ensure_schema(&self) -> Result<(), AppError> {
        sqlx::query(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for PgPriceStore {
    async fn fetch(&self, key: &PriceKey) -> Result<Option<serde_json::Value>, AppError> {
        let (product_line, category, tier) = key_columns(key);
        let row = find_price_config(&self.pool, product_line, category, tier).await?;
        Ok(row.map(|row| row.items.0))
    }

    async fn store(&self, key: &PriceKey, items: serde_json::Value) -> Result<(), AppError> {
        let (product_line, category, tier) = key_columns(key);
        upsert_price_config(&self.pool, product_line, category, tier, &items).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::models::{Category, ProductLine, Tier};

    #[test]
    fn test_key_columns() {
        let key = PriceKey::new(ProductLine::Er, Category::Transport, Tier::SixSeven);
        assert_eq!(key_columns(&key), ("ER", "transport", "6-7"));

        let key = PriceKey::new(ProductLine::Er, Category::AdditionalCosts, Tier::SixSeven);
        assert_eq!(key_columns(&key), ("ER", "additionalCosts", ""));
    }
}
