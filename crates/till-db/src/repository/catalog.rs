//! # Catalog Repository
//!
//! Read access to priced, taxed products, plus the upsert used by seeding.
//! The settlement engine only ever reads.

use chrono::Utc;
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use till_core::{CatalogEntry, Money, TaxRate};

#[derive(Debug, FromRow)]
struct CatalogRow {
    product_id: String,
    name: String,
    unit_price_minor: i64,
    tax_rate_bps: i64,
}

impl TryFrom<CatalogRow> for CatalogEntry {
    type Error = DbError;

    fn try_from(row: CatalogRow) -> DbResult<Self> {
        let bps = u32::try_from(row.tax_rate_bps)
            .map_err(|e| DbError::corrupt("catalog entry", &row.product_id, e))?;
        Ok(CatalogEntry {
            product_id: row.product_id,
            name: row.name,
            unit_price: Money::from_minor(row.unit_price_minor),
            tax_rate: TaxRate::from_bps(bps),
        })
    }
}

/// Repository for catalog entries.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    /// Looks up one product. `None` when the id is unknown.
    pub async fn get(&self, product_id: &str) -> DbResult<Option<CatalogEntry>> {
        let row: Option<CatalogRow> = sqlx::query_as(
            r#"
            SELECT product_id, name, unit_price_minor, tax_rate_bps
            FROM catalog_entries
            WHERE product_id = ?1
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CatalogEntry::try_from).transpose()
    }

    /// Inserts or replaces a product.
    pub async fn upsert(&self, entry: &CatalogEntry) -> DbResult<()> {
        debug!(product_id = %entry.product_id, price = %entry.unit_price, "Upserting catalog entry");
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO catalog_entries (
                product_id, name, unit_price_minor, tax_rate_bps, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            ON CONFLICT (product_id) DO UPDATE SET
                name = excluded.name,
                unit_price_minor = excluded.unit_price_minor,
                tax_rate_bps = excluded.tax_rate_bps,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&entry.product_id)
        .bind(&entry.name)
        .bind(entry.unit_price.minor())
        .bind(entry.tax_rate.bps() as i64)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Number of catalog entries.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM catalog_entries")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig};
    use till_core::{CatalogEntry, Money, TaxRate};

    fn notebook(price: i64) -> CatalogEntry {
        CatalogEntry {
            product_id: "P1".to_string(),
            name: "Notebook".to_string(),
            unit_price: Money::from_minor(price),
            tax_rate: TaxRate::from_whole_percent(18),
        }
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.catalog();

        assert!(repo.get("P1").await.unwrap().is_none());

        repo.upsert(&notebook(10000)).await.unwrap();
        assert_eq!(repo.get("P1").await.unwrap(), Some(notebook(10000)));

        repo.upsert(&notebook(12000)).await.unwrap();
        assert_eq!(repo.get("P1").await.unwrap().unwrap().unit_price.minor(), 12000);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_schema_rejects_negative_price() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.catalog().upsert(&notebook(-1)).await.is_err());
    }
}
