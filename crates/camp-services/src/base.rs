//! Helpers shared by the service objects

use camp_contracts::UserContext;
use camp_core::{CampError, CampResult, Id, TenantScoped};
use camp_db::{Postgres, Repository, RepositoryError, Transaction};
use camp_models::{Role, User};

use crate::context::ServiceContext;

/// Unwrap a loaded row, hiding rows of other tenants as not found
pub fn scoped<T, U>(user: &U, row: Option<T>, entity: &'static str, id: Id) -> CampResult<T>
where
    T: TenantScoped,
    U: UserContext + ?Sized,
{
    match row {
        Some(row) if user.can_access_tenant(row.tenant_id()) => Ok(row),
        _ => Err(CampError::not_found(entity, id)),
    }
}

/// The parent a request acts for: the caller when they are a parent,
/// otherwise `requested`, which must be an active parent the caller can see
pub async fn resolve_parent<U>(
    ctx: &ServiceContext,
    user: &U,
    requested: Option<Id>,
) -> CampResult<User>
where
    U: UserContext + ?Sized,
{
    let parent_id = match user.role() {
        Role::Parent => user.id(),
        _ => requested.ok_or_else(|| CampError::invalid("parent_id", "is required"))?,
    };

    match ctx.users().find_by_id(parent_id).await? {
        Some(parent)
            if parent.role == Role::Parent
                && parent.active
                && parent
                    .tenant_id
                    .map_or(false, |tenant| user.can_access_tenant(tenant)) =>
        {
            Ok(parent)
        }
        _ => Err(CampError::not_found("Parent", parent_id)),
    }
}

pub async fn commit(tx: Transaction<'static, Postgres>) -> CampResult<()> {
    tx.commit().await.map_err(RepositoryError::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use camp_contracts::Actor;

    struct Row(Id);

    impl TenantScoped for Row {
        fn tenant_id(&self) -> Id {
            self.0
        }
    }

    #[test]
    fn test_scoped_hides_other_tenants() {
        let owner = Actor::new(1, Role::LicenseeOwner, Some(5));
        assert!(scoped(&owner, Some(Row(5)), "Camp", 10).is_ok());

        let err = scoped(&owner, Some(Row(6)), "Camp", 10).err().unwrap();
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.to_string(), "Camp not found");

        assert!(scoped::<Row, _>(&owner, None, "Camp", 10).is_err());
        assert!(scoped(&Actor::hq(9), Some(Row(6)), "Camp", 10).is_ok());
    }

    fn tenant(id: Id) -> camp_models::Tenant {
        camp_models::Tenant {
            id,
            name: format!("Licensee {id}"),
            slug: format!("licensee-{id}"),
            status: camp_models::TenantStatus::Active,
            royalty_rate: camp_core::BasisPoints(800),
            minimum_royalty_cents: camp_core::Cents::ZERO,
            contact_email: "owner@licensee.example".to_string(),
            territory: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_owner_sees_only_own_tenant() {
        let owner = Actor::new(2, Role::LicenseeOwner, Some(5));
        assert_eq!(scoped(&owner, Some(tenant(5)), "Tenant", 5).unwrap().id, 5);

        let err = scoped(&owner, Some(tenant(6)), "Tenant", 6).err().unwrap();
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.to_string(), "Tenant not found");
    }
}
