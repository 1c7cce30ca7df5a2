//! # Invoice Repository
//!
//! Committed invoices and the settlement write.
//!
//! ## Settlement Write
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    commit_settlement (one transaction)                  │
//! │                                                                         │
//! │  BEGIN                                                                 │
//! │    ├── apply stock movement   (+tendered, −change, guarded)            │
//! │    ├── INSERT invoices        (totals, tender, change as JSON)         │
//! │    └── INSERT invoice_lines   (one per settled line)                   │
//! │  COMMIT                                                                │
//! │                                                                         │
//! │  Any failure ──► ROLLBACK: till and invoice store unchanged            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Invoices are never updated after the insert.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::denomination::apply_movement;
use till_core::{
    Invoice, InvoiceTotals, Money, NoteCounts, SettledLine, SettlementStatus, StockMovement,
    TaxRate,
};

#[derive(Debug, FromRow)]
struct InvoiceRow {
    id: String,
    customer_email: String,
    status: SettlementStatus,
    total_without_tax_minor: i64,
    total_tax_minor: i64,
    net_price_minor: i64,
    rounded_net_price_minor: i64,
    rounding_remainder_minor: i64,
    cash_paid_minor: i64,
    balance_payable_minor: i64,
    denominations_tendered: String,
    change_breakdown: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct InvoiceLineRow {
    product_id: String,
    product_name: String,
    unit_price_minor: i64,
    quantity: i64,
    subtotal_minor: i64,
    tax_rate_bps: i64,
    tax_payable_minor: i64,
    total_price_minor: i64,
}

impl InvoiceLineRow {
    fn into_line(self, invoice_id: &str) -> DbResult<SettledLine> {
        let bps = u32::try_from(self.tax_rate_bps)
            .map_err(|e| DbError::corrupt("invoice line", invoice_id, e))?;
        Ok(SettledLine {
            product_id: self.product_id,
            product_name: self.product_name,
            unit_price: Money::from_minor(self.unit_price_minor),
            quantity: self.quantity,
            subtotal: Money::from_minor(self.subtotal_minor),
            tax_rate: TaxRate::from_bps(bps),
            tax_payable: Money::from_minor(self.tax_payable_minor),
            total_price: Money::from_minor(self.total_price_minor),
        })
    }
}

/// Repository for invoices.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// Gets an invoice with its lines.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Invoice>> {
        let row: Option<InvoiceRow> = sqlx::query_as(
            r#"
            SELECT
                id, customer_email, status,
                total_without_tax_minor, total_tax_minor, net_price_minor,
                rounded_net_price_minor, rounding_remainder_minor,
                cash_paid_minor, balance_payable_minor,
                denominations_tendered, change_breakdown, created_at
            FROM invoices
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let lines: Vec<InvoiceLineRow> = sqlx::query_as(
            r#"
            SELECT
                product_id, product_name, unit_price_minor, quantity,
                subtotal_minor, tax_rate_bps, tax_payable_minor, total_price_minor
            FROM invoice_lines
            WHERE invoice_id = ?1
            ORDER BY line_no
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let items = lines
            .into_iter()
            .map(|line| line.into_line(id))
            .collect::<DbResult<Vec<_>>>()?;

        let denominations_tendered: NoteCounts = serde_json::from_str(&row.denominations_tendered)
            .map_err(|e| DbError::corrupt("invoice", &row.id, e))?;
        let change_breakdown: NoteCounts = serde_json::from_str(&row.change_breakdown)
            .map_err(|e| DbError::corrupt("invoice", &row.id, e))?;

        Ok(Some(Invoice {
            id: row.id,
            customer_email: row.customer_email,
            created_at: row.created_at,
            items,
            totals: InvoiceTotals {
                total_without_tax: Money::from_minor(row.total_without_tax_minor),
                total_tax: Money::from_minor(row.total_tax_minor),
                net_price: Money::from_minor(row.net_price_minor),
                rounded_net_price: Money::from_minor(row.rounded_net_price_minor),
                rounding_remainder: Money::from_minor(row.rounding_remainder_minor),
            },
            cash_paid: Money::from_minor(row.cash_paid_minor),
            denominations_tendered,
            balance_payable: Money::from_minor(row.balance_payable_minor),
            change_breakdown,
            status: row.status,
        }))
    }

    /// Number of stored invoices.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoices")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Applies the stock movement and stores the invoice atomically.
    ///
    /// ## Errors
    /// - `DbError::InsufficientStock` if any denomination would go negative
    /// - `DbError::CountOverflow` if any denomination would pass `u32::MAX`
    /// - `DbError::UniqueViolation` if the invoice id already exists
    ///
    /// Either way nothing is written.
    pub async fn commit_settlement(
        &self,
        invoice: &Invoice,
        movement: &StockMovement,
    ) -> DbResult<()> {
        debug!(invoice_id = %invoice.id, "Beginning settlement transaction");
        let mut tx = self.pool.begin().await?;

        let written = async {
            apply_movement(&mut tx, movement, invoice.created_at).await?;
            insert_invoice(&mut tx, invoice).await
        }
        .await;

        match written {
            Ok(()) => {
                tx.commit().await?;
                info!(
                    invoice_id = %invoice.id,
                    payable = %invoice.totals.rounded_net_price,
                    change = %invoice.balance_payable,
                    "Settlement committed"
                );
                Ok(())
            }
            Err(err) => {
                warn!(invoice_id = %invoice.id, error = %err, "Settlement rolled back");
                tx.rollback().await?;
                Err(err)
            }
        }
    }
}

async fn insert_invoice(conn: &mut SqliteConnection, invoice: &Invoice) -> DbResult<()> {
    let tendered = serde_json::to_string(&invoice.denominations_tendered.without_zeros())
        .map_err(|e| DbError::Internal(e.to_string()))?;
    let change = serde_json::to_string(&invoice.change_breakdown.without_zeros())
        .map_err(|e| DbError::Internal(e.to_string()))?;

    sqlx::query(
        r#"
        INSERT INTO invoices (
            id, customer_email, status,
            total_without_tax_minor, total_tax_minor, net_price_minor,
            rounded_net_price_minor, rounding_remainder_minor,
            cash_paid_minor, balance_payable_minor,
            denominations_tendered, change_breakdown, created_at
        ) VALUES (
            ?1, ?2, ?3,
            ?4, ?5, ?6,
            ?7, ?8,
            ?9, ?10,
            ?11, ?12, ?13
        )
        "#,
    )
    .bind(&invoice.id)
    .bind(&invoice.customer_email)
    .bind(invoice.status)
    .bind(invoice.totals.total_without_tax.minor())
    .bind(invoice.totals.total_tax.minor())
    .bind(invoice.totals.net_price.minor())
    .bind(invoice.totals.rounded_net_price.minor())
    .bind(invoice.totals.rounding_remainder.minor())
    .bind(invoice.cash_paid.minor())
    .bind(invoice.balance_payable.minor())
    .bind(tendered)
    .bind(change)
    .bind(invoice.created_at)
    .execute(&mut *conn)
    .await?;

    for (line_no, line) in invoice.items.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO invoice_lines (
                invoice_id, line_no, product_id, product_name,
                unit_price_minor, quantity, subtotal_minor,
                tax_rate_bps, tax_payable_minor, total_price_minor
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&invoice.id)
        .bind(line_no as i64)
        .bind(&line.product_id)
        .bind(&line.product_name)
        .bind(line.unit_price.minor())
        .bind(line.quantity)
        .bind(line.subtotal.minor())
        .bind(line.tax_rate.bps() as i64)
        .bind(line.tax_payable.minor())
        .bind(line.total_price.minor())
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}
