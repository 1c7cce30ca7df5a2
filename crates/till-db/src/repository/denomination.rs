//! # Denomination Repository
//!
//! The till's note stock: one row per denomination.
//!
//! ## Atomic Movement
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Settlement transaction                                                │
//! │                                                                         │
//! │  for each denomination with a non-zero net (tendered − change):        │
//! │                                                                         │
//! │    UPDATE denominations                                                │
//! │       SET count = count + :delta                                       │
//! │     WHERE value = :value AND count + :delta BETWEEN 0 AND u32::MAX     │
//! │                                                                         │
//! │    rows_affected == 0 ──► InsufficientStock or CountOverflow,          │
//! │                           transaction rolled back                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The guard sits in the same statement as the write, so there is no window
//! between checking a count and changing it.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use till_core::{Denomination, NoteCounts, StockMovement};

#[derive(Debug, FromRow)]
struct DenominationRow {
    value: i64,
    count: i64,
}

/// Repository for the note stock.
#[derive(Debug, Clone)]
pub struct DenominationRepository {
    pool: SqlitePool,
}

impl DenominationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        DenominationRepository { pool }
    }

    /// Reads every denomination's count. Reserves nothing.
    pub async fn snapshot(&self) -> DbResult<NoteCounts> {
        let rows: Vec<DenominationRow> =
            sqlx::query_as("SELECT value, count FROM denominations ORDER BY value")
                .fetch_all(&self.pool)
                .await?;

        let mut counts = NoteCounts::empty_till();
        for row in rows {
            let denomination = u32::try_from(row.value)
                .ok()
                .and_then(Denomination::from_value)
                .ok_or_else(|| DbError::corrupt("denomination", row.value.to_string(), "unknown note value"))?;
            let count = u32::try_from(row.count)
                .map_err(|e| DbError::corrupt("denomination", row.value.to_string(), e))?;
            counts.set(denomination, count);
        }

        Ok(counts)
    }

    /// Sets an absolute count for one denomination.
    pub async fn restock(&self, denomination: Denomination, count: u32) -> DbResult<()> {
        info!(denomination = denomination.value(), count, "Restocking till");

        sqlx::query(
            r#"
            INSERT INTO denominations (value, count, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (value) DO UPDATE SET
                count = excluded.count,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(denomination.value() as i64)
        .bind(count as i64)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// Applies `movement` on `conn`, which must be inside a transaction.
///
/// On error some denominations may already be updated; the caller rolls the
/// transaction back.
pub(crate) async fn apply_movement(
    conn: &mut SqliteConnection,
    movement: &StockMovement,
    now: DateTime<Utc>,
) -> DbResult<()> {
    for (denomination, delta) in movement.net() {
        let value = denomination.value() as i64;
        debug!(denomination = value, delta, "Moving notes");

        let result = sqlx::query(
            r#"
            UPDATE denominations
               SET count = count + ?1,
                   updated_at = ?2
             WHERE value = ?3 AND count + ?1 BETWEEN 0 AND ?4
            "#,
        )
        .bind(delta)
        .bind(now)
        .bind(value)
        .bind(u32::MAX as i64)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            let held: Option<i64> =
                sqlx::query_scalar("SELECT count FROM denominations WHERE value = ?1")
                    .bind(value)
                    .fetch_optional(&mut *conn)
                    .await?;

            if delta > 0 && held.is_some() {
                return Err(DbError::CountOverflow {
                    denomination: denomination.value(),
                });
            }

            let held = u32::try_from(held.unwrap_or(0)).unwrap_or(0);
            return Err(DbError::InsufficientStock {
                denomination: denomination.value(),
                available: held.saturating_add(movement.incoming.count(denomination)),
                requested: movement.outgoing.count(denomination),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    fn notes(pairs: &[(u32, u32)]) -> NoteCounts {
        NoteCounts::from_pairs(pairs.iter().copied()).unwrap()
    }

    #[tokio::test]
    async fn test_fresh_till_lists_every_denomination() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let till = db.denominations().snapshot().await.unwrap();

        assert_eq!(till.iter().count(), 8);
        assert!(till.is_empty());
    }

    #[tokio::test]
    async fn test_restock_sets_absolute_count() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.denominations();

        repo.restock(Denomination::Ten, 5).await.unwrap();
        repo.restock(Denomination::Ten, 2).await.unwrap();

        let till = repo.snapshot().await.unwrap();
        assert_eq!(till.count(Denomination::Ten), 2);
    }

    #[tokio::test]
    async fn test_apply_movement_guards_each_denomination() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.denominations();
        repo.restock(Denomination::Two, 1).await.unwrap();

        let movement = StockMovement::new(notes(&[(50, 1)]), notes(&[(2, 2)]));
        let mut tx = db.pool().begin().await.unwrap();
        let err = apply_movement(&mut tx, &movement, Utc::now()).await.unwrap_err();
        tx.rollback().await.unwrap();

        assert!(matches!(
            err,
            DbError::InsufficientStock {
                denomination: 2,
                available: 1,
                requested: 2
            }
        ));

        let till = repo.snapshot().await.unwrap();
        assert_eq!(till.count(Denomination::Fifty), 0);
        assert_eq!(till.count(Denomination::Two), 1);
    }

    #[tokio::test]
    async fn test_apply_movement_caps_counts() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.denominations();
        repo.restock(Denomination::One, u32::MAX - 1).await.unwrap();

        let movement = StockMovement::new(notes(&[(1, 5)]), NoteCounts::new());
        let mut tx = db.pool().begin().await.unwrap();
        let err = apply_movement(&mut tx, &movement, Utc::now()).await.unwrap_err();
        tx.rollback().await.unwrap();

        assert!(matches!(err, DbError::CountOverflow { denomination: 1 }));

        // The till is still readable and unchanged.
        let till = repo.snapshot().await.unwrap();
        assert_eq!(till.count(Denomination::One), u32::MAX - 1);

        let movement = StockMovement::new(notes(&[(1, 1)]), NoteCounts::new());
        let mut tx = db.pool().begin().await.unwrap();
        apply_movement(&mut tx, &movement, Utc::now()).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(repo.snapshot().await.unwrap().count(Denomination::One), u32::MAX);
    }
}
