//! Accounts: login, parent signup and staff user creation
//!
//! Sessions and tokens are handled by `camp_auth::Authenticator`; this
//! module only proves who someone is and writes user rows.

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use camp_auth::{hash_password, verify_password, AuthError, UserLookup};
use camp_contracts::users::{
    CreateUserContract, CreateUserParams, LoginParams, SignupContract, SignupParams,
};
use camp_contracts::{authorize, Action, Contract, UserContext};
use camp_core::{CampError, CampResult, Id};
use camp_db::{NewUser, Repository};
use camp_models::{Role, User};

use crate::context::ServiceContext;

/// Reject passwords shorter than the configured minimum
pub fn check_password_length(password: &str, min_length: usize) -> CampResult<()> {
    if password.chars().count() < min_length {
        return Err(CampError::invalid(
            "password",
            format!("must be at least {min_length} characters"),
        ));
    }
    Ok(())
}

fn hash(password: &str) -> CampResult<String> {
    hash_password(password).map_err(|e| CampError::Internal(e.to_string()))
}

pub struct AccountService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> AccountService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Unknown email, wrong password and disabled account look the same
    #[instrument(skip(self, params))]
    pub async fn login(&self, params: &LoginParams) -> CampResult<User> {
        let user = self.ctx.users().find_by_email(&params.email).await?;
        match user {
            Some(user) if user.active && verify_password(&params.password, &user.password_hash) => {
                info!(user_id = user.id, "Login succeeded");
                Ok(user)
            }
            _ => {
                warn!("Login failed");
                Err(AuthError::InvalidCredentials.into())
            }
        }
    }

    /// Parent self-signup under an active tenant's slug
    #[instrument(skip(self, params), fields(slug = %slug))]
    pub async fn signup(&self, slug: &str, params: SignupParams) -> CampResult<User> {
        let tenant = match self.ctx.tenants().find_by_slug(slug).await? {
            Some(tenant) if tenant.is_active() => tenant,
            _ => return Err(CampError::not_found("Tenant", slug)),
        };
        SignupContract.validate(&params)?;
        check_password_length(&params.password, self.ctx.settings.password_min_length)?;

        let email = User::normalize_email(&params.email);
        self.ensure_email_free(&email).await?;

        let user = self
            .ctx
            .users()
            .create(&NewUser {
                tenant_id: Some(tenant.id),
                email,
                name: params.name.trim().to_string(),
                role: Role::Parent,
                password_hash: hash(&params.password)?,
            })
            .await?;
        info!(user_id = user.id, tenant_id = tenant.id, "Parent signed up");
        Ok(user)
    }

    /// HQ creates any account; owners create directors and coaches
    #[instrument(skip(self, caller, params), fields(user_id = caller.id()))]
    pub async fn create_user<U: UserContext>(
        &self,
        caller: &U,
        params: CreateUserParams,
    ) -> CampResult<User> {
        authorize(caller, Action::ManageUsers)?;
        let contract = CreateUserContract::new(caller);
        contract.validate(&params)?;
        check_password_length(&params.password, self.ctx.settings.password_min_length)?;

        let tenant_id = contract.target_tenant(&params);
        if let Some(tenant_id) = tenant_id {
            if self.ctx.tenants().find_by_id(tenant_id).await?.is_none() {
                return Err(CampError::invalid("tenant_id", "does not exist"));
            }
        }

        let email = User::normalize_email(&params.email);
        self.ensure_email_free(&email).await?;

        let user = self
            .ctx
            .users()
            .create(&NewUser {
                tenant_id,
                email,
                name: params.name.trim().to_string(),
                role: params.role,
                password_hash: hash(&params.password)?,
            })
            .await?;
        info!(new_user_id = user.id, role = %user.role, ?tenant_id, "User created");
        Ok(user)
    }

    async fn ensure_email_free(&self, email: &str) -> CampResult<()> {
        if self.ctx.users().find_by_email(email).await?.is_some() {
            return Err(CampError::invalid("email", "has already been taken"));
        }
        Ok(())
    }
}

#[async_trait]
impl UserLookup for ServiceContext {
    async fn find_user(&self, id: Id) -> Result<Option<User>, CampError> {
        Ok(self.users().find_by_id(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_length() {
        assert!(check_password_length("0123456789", 10).is_ok());
        let err = check_password_length("short", 10).unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(check_password_length("0123456789", 12).is_err());
    }

    #[test]
    fn test_invalid_credentials_are_unauthorized() {
        let err: CampError = AuthError::InvalidCredentials.into();
        assert_eq!(err.status_code(), 401);
        assert_eq!(err.to_string(), "invalid email or password");
    }
}
