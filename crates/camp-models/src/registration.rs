//! Registration and refund models
//!
//! Tables: registrations, refunds

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use camp_core::Cents;

use crate::{Entity, Id, Identifiable, StatusFlow, TenantScoped, Timestamped};

text_enum! {
    pub enum RegistrationStatus {
        Pending => "pending",
        Confirmed => "confirmed",
        Waitlisted => "waitlisted",
        Cancelled => "cancelled",
    }
}

impl StatusFlow for RegistrationStatus {
    const ENTITY: &'static str = "registration";

    fn can_transition_to(&self, next: Self) -> bool {
        use RegistrationStatus::*;
        matches!(
            (*self, next),
            (Pending, Confirmed)
                | (Pending, Cancelled)
                | (Confirmed, Cancelled)
                | (Waitlisted, Pending)
                | (Waitlisted, Cancelled)
        )
    }
}

impl RegistrationStatus {
    /// Holds a spot against camp capacity
    pub fn holds_spot(&self) -> bool {
        matches!(self, RegistrationStatus::Confirmed | RegistrationStatus::Pending)
    }
}

text_enum! {
    pub enum PaymentStatus {
        Unpaid => "unpaid",
        Paid => "paid",
        PartiallyRefunded => "partially_refunded",
        Refunded => "refunded",
        Failed => "failed",
    }
}

impl StatusFlow for PaymentStatus {
    const ENTITY: &'static str = "payment";

    fn can_transition_to(&self, next: Self) -> bool {
        use PaymentStatus::*;
        matches!(
            (*self, next),
            (Unpaid, Paid)
                | (Unpaid, Failed)
                | (Failed, Paid)
                | (Paid, PartiallyRefunded)
                | (Paid, Refunded)
                | (PartiallyRefunded, PartiallyRefunded)
                | (PartiallyRefunded, Refunded)
        )
    }
}

impl PaymentStatus {
    /// Money was collected at some point
    pub fn was_collected(&self) -> bool {
        matches!(
            self,
            PaymentStatus::Paid | PaymentStatus::PartiallyRefunded | PaymentStatus::Refunded
        )
    }
}

/// One athlete's place in one camp
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Registration {
    pub id: Id,
    pub tenant_id: Id,
    pub camp_id: Id,
    pub athlete_id: Id,
    pub parent_id: Id,
    pub status: RegistrationStatus,
    pub payment_status: PaymentStatus,
    pub price_cents: Cents,
    pub discount_cents: Cents,
    /// `price - discount`
    pub total_cents: Cents,
    pub refunded_cents: Cents,
    pub promo_code: Option<String>,
    pub payment_ref: Option<String>,
    pub waitlist_position: Option<i32>,
    pub paid_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Registration {
    /// Amount that can still be refunded
    pub fn refundable(&self) -> Cents {
        if self.payment_status.was_collected() {
            self.total_cents.saturating_sub(self.refunded_cents)
        } else {
            Cents::ZERO
        }
    }

    /// Money kept after refunds
    pub fn net_collected(&self) -> Cents {
        self.refundable()
    }

    /// Payment status once `refunded_total` has been returned in total
    pub fn payment_status_for_refunded(&self, refunded_total: Cents) -> PaymentStatus {
        if refunded_total >= self.total_cents {
            PaymentStatus::Refunded
        } else {
            PaymentStatus::PartiallyRefunded
        }
    }
}

impl Identifiable for Registration {
    fn id(&self) -> Option<Id> {
        Some(self.id)
    }
}

impl Timestamped for Registration {
    fn created_at(&self) -> Option<DateTime<Utc>> {
        Some(self.created_at)
    }

    fn updated_at(&self) -> Option<DateTime<Utc>> {
        Some(self.updated_at)
    }
}

impl Entity for Registration {
    const TABLE_NAME: &'static str = "registrations";
    const TYPE_NAME: &'static str = "Registration";
}

impl TenantScoped for Registration {
    fn tenant_id(&self) -> Id {
        self.tenant_id
    }
}

/// Money returned on a registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Refund {
    pub id: Id,
    pub tenant_id: Id,
    pub registration_id: Id,
    pub amount_cents: Cents,
    pub reason: Option<String>,
    pub payment_ref: Option<String>,
    pub refunded_by: Option<Id>,
    pub refunded_at: DateTime<Utc>,
}
