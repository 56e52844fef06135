//! The authenticated caller

use serde::Serialize;

use camp_contracts::UserContext;
use camp_core::Id;
use camp_models::{Role, User};

/// Loaded fresh from the database for every request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentUser {
    pub id: Id,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub tenant_id: Option<Id>,
}

impl CurrentUser {
    pub fn is_staff(&self) -> bool {
        self.role != Role::Parent
    }
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            tenant_id: user.tenant_id,
        }
    }
}

impl From<User> for CurrentUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
            tenant_id: user.tenant_id,
        }
    }
}

impl UserContext for CurrentUser {
    fn id(&self) -> Id {
        self.id
    }

    fn role(&self) -> Role {
        self.role
    }

    fn tenant_id(&self) -> Option<Id> {
        self.tenant_id
    }
}
