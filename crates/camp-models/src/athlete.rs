//! Athlete (camper) model
//!
//! Table: athletes

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use camp_core::dates::age_on;

use crate::{Entity, Id, Identifiable, TenantScoped, Timestamped};

/// A child registered by a parent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Athlete {
    pub id: Id,
    pub tenant_id: Id,
    pub parent_id: Id,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: NaiveDate,
    /// School grade, 0 for kindergarten
    pub grade: Option<i32>,
    pub shirt_size: Option<String>,
    pub medical_notes: Option<String>,
    pub emergency_contact_name: String,
    pub emergency_contact_phone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Athlete {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn age_on(&self, date: NaiveDate) -> i32 {
        age_on(self.birth_date, date)
    }

    pub fn has_emergency_contact(&self) -> bool {
        !self.emergency_contact_name.trim().is_empty()
            && !self.emergency_contact_phone.trim().is_empty()
    }
}

impl Identifiable for Athlete {
    fn id(&self) -> Option<Id> {
        Some(self.id)
    }
}

impl Timestamped for Athlete {
    fn created_at(&self) -> Option<DateTime<Utc>> {
        Some(self.created_at)
    }

    fn updated_at(&self) -> Option<DateTime<Utc>> {
        Some(self.updated_at)
    }
}

impl Entity for Athlete {
    const TABLE_NAME: &'static str = "athletes";
    const TYPE_NAME: &'static str = "Athlete";
}

impl TenantScoped for Athlete {
    fn tenant_id(&self) -> Id {
        self.tenant_id
    }
}
