//! Camper group model
//!
//! Tables: camper_groups, camper_group_members

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Id, TenantScoped};

text_enum! {
    /// Sort order campers are banded by
    pub enum GroupStrategy {
        Age => "age",
        Grade => "grade",
        Alphabetical => "alphabetical",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CamperGroup {
    pub id: Id,
    pub tenant_id: Id,
    pub camp_id: Id,
    pub name: String,
    pub position: i32,
    pub coach_id: Option<Id>,
    pub strategy: GroupStrategy,
    pub created_at: DateTime<Utc>,
}

impl TenantScoped for CamperGroup {
    fn tenant_id(&self) -> Id {
        self.tenant_id
    }
}
