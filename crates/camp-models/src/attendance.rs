//! Attendance model
//!
//! Table: attendance_records

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{Id, TenantScoped};

text_enum! {
    pub enum AttendanceState {
        Expected => "expected",
        CheckedIn => "checked_in",
        CheckedOut => "checked_out",
    }
}

/// One camper's attendance on one camp day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: Id,
    pub tenant_id: Id,
    pub camp_id: Id,
    pub registration_id: Id,
    pub athlete_id: Id,
    pub date: NaiveDate,
    pub checked_in_at: DateTime<Utc>,
    pub checked_in_by: Id,
    pub checked_out_at: Option<DateTime<Utc>>,
    pub checked_out_by: Option<Id>,
    pub pickup_name: Option<String>,
}

impl AttendanceRecord {
    pub fn state(&self) -> AttendanceState {
        if self.checked_out_at.is_some() {
            AttendanceState::CheckedOut
        } else {
            AttendanceState::CheckedIn
        }
    }
}

impl TenantScoped for AttendanceRecord {
    fn tenant_id(&self) -> Id {
        self.tenant_id
    }
}
