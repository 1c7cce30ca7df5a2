//! # Wire Types
//!
//! JSON shapes for the HTTP surface. Money is integer minor units; note
//! breakdowns are objects keyed by face value (`{"10": 1, "2": 2}`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::coordinator::SettlementPreview;
use till_core::{Invoice, Money, NoteCounts, SettledLine, SettlementStatus};

/// Response to `POST /invoices/preview`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewResponse {
    pub preview_id: String,
    pub items: Vec<SettledLine>,
    pub total_without_tax: Money,
    pub total_tax: Money,
    pub net_price: Money,
    pub rounded_net_price: Money,
    pub rounding_remainder: Money,
    pub balance_payable: Money,
    pub change_denominations: NoteCounts,
    pub available_stocks: NoteCounts,
    pub status: SettlementStatus,
}

impl From<&SettlementPreview> for PreviewResponse {
    fn from(preview: &SettlementPreview) -> Self {
        let totals = preview.totals();
        PreviewResponse {
            preview_id: preview.id().to_string(),
            items: preview.items().to_vec(),
            total_without_tax: totals.total_without_tax,
            total_tax: totals.total_tax,
            net_price: totals.net_price,
            rounded_net_price: totals.rounded_net_price,
            rounding_remainder: totals.rounding_remainder,
            balance_payable: preview.balance_payable(),
            change_denominations: preview.change_denominations().clone(),
            available_stocks: preview.available_stocks().clone(),
            status: preview.status(),
        }
    }
}

/// A committed invoice, as returned by `POST /invoices` and
/// `GET /invoices/{id}`.
///
/// `available_stocks` is only present on the commit response: the till as
/// read right after the commit. A stored invoice does not carry it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceResponse {
    pub id: String,
    pub customer_email: String,
    pub created_at: DateTime<Utc>,
    pub items: Vec<SettledLine>,
    pub total_without_tax: Money,
    pub total_tax: Money,
    pub net_price: Money,
    pub rounded_net_price: Money,
    pub rounding_remainder: Money,
    pub cash_paid: Money,
    pub denominations_tendered: NoteCounts,
    pub balance_payable: Money,
    pub change_denominations: NoteCounts,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_stocks: Option<NoteCounts>,
    pub status: SettlementStatus,
}

impl InvoiceResponse {
    pub fn with_available_stocks(mut self, stock: NoteCounts) -> Self {
        self.available_stocks = Some(stock);
        self
    }
}

impl From<&Invoice> for InvoiceResponse {
    fn from(invoice: &Invoice) -> Self {
        InvoiceResponse {
            id: invoice.id.clone(),
            customer_email: invoice.customer_email.clone(),
            created_at: invoice.created_at,
            items: invoice.items.clone(),
            total_without_tax: invoice.totals.total_without_tax,
            total_tax: invoice.totals.total_tax,
            net_price: invoice.totals.net_price,
            rounded_net_price: invoice.totals.rounded_net_price,
            rounding_remainder: invoice.totals.rounding_remainder,
            cash_paid: invoice.cash_paid,
            denominations_tendered: invoice.denominations_tendered.clone(),
            balance_payable: invoice.balance_payable,
            change_denominations: invoice.change_breakdown.clone(),
            available_stocks: None,
            status: invoice.status,
        }
    }
}

/// Body of `POST /invoices`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRequest {
    pub preview_id: String,
}

/// Body of `PUT /denominations/{value}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestockRequest {
    pub count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use till_core::{InvoiceTotals, SettlementStatus};

    #[test]
    fn test_invoice_response_shape() {
        let invoice = Invoice {
            id: "inv-1".into(),
            customer_email: "buyer@example.com".into(),
            created_at: Utc::now(),
            items: vec![],
            totals: InvoiceTotals {
                total_without_tax: Money::from_major(200),
                total_tax: Money::from_major(36),
                net_price: Money::from_major(236),
                rounded_net_price: Money::from_major(236),
                rounding_remainder: Money::zero(),
            },
            cash_paid: Money::from_major(250),
            denominations_tendered: NoteCounts::from_pairs([(100, 2), (50, 1)]).unwrap(),
            balance_payable: Money::from_major(14),
            change_breakdown: NoteCounts::from_pairs([(10, 1), (2, 2)]).unwrap(),
            status: SettlementStatus::Committed,
        };

        let json = serde_json::to_value(InvoiceResponse::from(&invoice)).unwrap();

        assert_eq!(json["net_price"], 23600);
        assert_eq!(json["balance_payable"], 1400);
        assert_eq!(json["change_denominations"]["10"], 1);
        assert_eq!(json["change_denominations"]["2"], 2);
        assert_eq!(json["status"], "committed");
        assert!(json.get("available_stocks").is_none());

        let till = NoteCounts::from_pairs([(100, 2), (50, 1), (2, 8)]).unwrap();
        let json =
            serde_json::to_value(InvoiceResponse::from(&invoice).with_available_stocks(till)).unwrap();
        assert_eq!(json["available_stocks"]["100"], 2);
        assert_eq!(json["available_stocks"]["2"], 8);
    }
}
