//! Royalty invoice model
//!
//! Table: royalty_invoices

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use camp_core::{BasisPoints, Cents, ReportingPeriod};

use crate::{Id, StatusFlow, TenantScoped};

text_enum! {
    /// Invoices are created `issued`
    pub enum InvoiceStatus {
        Issued => "issued",
        Paid => "paid",
        Void => "void",
    }
}

impl StatusFlow for InvoiceStatus {
    const ENTITY: &'static str = "invoice";

    fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (*self, next),
            (InvoiceStatus::Issued, InvoiceStatus::Paid) | (InvoiceStatus::Issued, InvoiceStatus::Void)
        )
    }
}

/// Royalty owed by one tenant for one reporting period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoyaltyInvoice {
    pub id: Id,
    pub tenant_id: Id,
    pub period_from: NaiveDate,
    /// Exclusive
    pub period_to: NaiveDate,
    pub gross_revenue_cents: Cents,
    pub refunds_cents: Cents,
    pub net_revenue_cents: Cents,
    pub rate: BasisPoints,
    pub royalty_due_cents: Cents,
    pub status: InvoiceStatus,
    pub issued_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
}

impl RoyaltyInvoice {
    pub fn period(&self) -> ReportingPeriod {
        ReportingPeriod {
            from: self.period_from,
            to: self.period_to,
        }
    }
}

impl TenantScoped for RoyaltyInvoice {
    fn tenant_id(&self) -> Id {
        self.tenant_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoice_transitions() {
        assert!(InvoiceStatus::Issued.can_transition_to(InvoiceStatus::Paid));
        assert!(InvoiceStatus::Issued.can_transition_to(InvoiceStatus::Void));
        assert!(!InvoiceStatus::Paid.can_transition_to(InvoiceStatus::Void));
        assert!(!InvoiceStatus::Void.can_transition_to(InvoiceStatus::Issued));
    }
}
