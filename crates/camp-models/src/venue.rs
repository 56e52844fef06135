//! Venue and venue contract models
//!
//! Tables: venues, venue_contracts

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use camp_core::{Cents, DateRange};

use crate::{Entity, Id, Identifiable, StatusFlow, TenantScoped, Timestamped};

/// A facility camps are held at
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Venue {
    pub id: Id,
    pub tenant_id: Id,
    pub name: String,
    pub address: String,
    pub city: String,
    pub region: String,
    pub postal_code: String,
    pub capacity: Option<i32>,
    pub contact_name: Option<String>,
    pub contact_email: Option<String>,
    pub daily_rate_cents: Option<Cents>,
    pub notes: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Identifiable for Venue {
    fn id(&self) -> Option<Id> {
        Some(self.id)
    }
}

impl Timestamped for Venue {
    fn created_at(&self) -> Option<DateTime<Utc>> {
        Some(self.created_at)
    }

    fn updated_at(&self) -> Option<DateTime<Utc>> {
        Some(self.updated_at)
    }
}

impl Entity for Venue {
    const TABLE_NAME: &'static str = "venues";
    const TYPE_NAME: &'static str = "Venue";
}

impl TenantScoped for Venue {
    fn tenant_id(&self) -> Id {
        self.tenant_id
    }
}

text_enum! {
    pub enum ContractStatus {
        Draft => "draft",
        Sent => "sent",
        Signed => "signed",
        Cancelled => "cancelled",
        Expired => "expired",
    }
}

impl StatusFlow for ContractStatus {
    const ENTITY: &'static str = "contract";

    fn can_transition_to(&self, next: Self) -> bool {
        use ContractStatus::*;
        matches!(
            (*self, next),
            (Draft, Sent) | (Sent, Signed) | (Draft, Cancelled) | (Sent, Cancelled) | (Signed, Expired)
        )
    }
}

/// Rental agreement between a licensee and a venue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VenueContract {
    pub id: Id,
    pub tenant_id: Id,
    pub venue_id: Id,
    pub camp_id: Option<Id>,
    pub title: String,
    /// First day of the term (inclusive)
    pub term_start: NaiveDate,
    /// Last day of the term (inclusive)
    pub term_end: NaiveDate,
    pub fee_cents: Cents,
    pub deposit_cents: Cents,
    pub status: ContractStatus,
    pub document_key: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub signed_at: Option<DateTime<Utc>>,
    pub signed_by: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VenueContract {
    pub fn term(&self) -> DateRange {
        DateRange {
            start: self.term_start,
            end: self.term_end,
        }
    }

    pub fn is_editable(&self) -> bool {
        self.status == ContractStatus::Draft
    }

    /// Signed and the last term day is before `today`
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status == ContractStatus::Signed && self.term_end < today
    }
}

impl Identifiable for VenueContract {
    fn id(&self) -> Option<Id> {
        Some(self.id)
    }
}

impl Entity for VenueContract {
    const TABLE_NAME: &'static str = "venue_contracts";
    const TYPE_NAME: &'static str = "Contract";
}

impl TenantScoped for VenueContract {
    fn tenant_id(&self) -> Id {
        self.tenant_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_transitions() {
        use ContractStatus::*;
        assert!(Draft.can_transition_to(Sent));
        assert!(Sent.can_transition_to(Signed));
        assert!(!Draft.can_transition_to(Signed));
        assert!(Sent.can_transition_to(Cancelled));
        assert!(!Signed.can_transition_to(Cancelled));
        assert!(Signed.can_transition_to(Expired));
        assert!(!Expired.can_transition_to(Signed));
    }

    #[test]
    fn test_overdue_uses_inclusive_end() {
        let contract = VenueContract {
            id: 1,
            tenant_id: 1,
            venue_id: 2,
            camp_id: None,
            title: "Field rental".into(),
            term_start: NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
            term_end: NaiveDate::from_ymd_opt(2026, 6, 30).unwrap(),
            fee_cents: Cents(100_000),
            deposit_cents: Cents(25_000),
            status: ContractStatus::Signed,
            document_key: None,
            sent_at: None,
            signed_at: None,
            signed_by: Some("Pat".into()),
            cancelled_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(!contract.is_overdue(NaiveDate::from_ymd_opt(2026, 6, 30).unwrap()));
        assert!(contract.is_overdue(NaiveDate::from_ymd_opt(2026, 7, 1).unwrap()));
        assert_eq!(contract.term().days(), 30);
    }
}
