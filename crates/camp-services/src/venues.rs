//! Venues and venue rental contracts

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use camp_contracts::venues::{
    ContractAttributes, SignContractParams, UpdateContractParams, UpdateVenueParams,
    VenueAttributes, VenueContractContract, VenueRules,
};
use camp_contracts::permissions::effective_tenant;
use camp_contracts::{authorize, Action, Contract, UserContext};
use camp_core::{CampError, CampResult, Cents, Id, StatusFlow};
use camp_db::{ContractValues, Repository, VenueValues};
use camp_models::{ContractStatus, Venue, VenueContract};
use camp_notifications::{ContractSent, EmailAddress};
use camp_storage::{contract_document_key, FileMetadata};

use crate::base::scoped;
use crate::context::ServiceContext;
use crate::registrations::staff_tenant_filter;

const MAX_SIGNER_NAME: usize = 120;

/// `<uuid>-` prefix of a stored document name
const KEY_PREFIX_LEN: usize = 37;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContractListParams {
    pub status: Option<ContractStatus>,
    pub tenant_id: Option<Id>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpireParams {
    pub tenant_id: Option<Id>,
}

/// What became of a venue removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VenueRemoval {
    /// Marked inactive; camps keep their reference
    Deactivated,
    AlreadyInactive,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadedDocument {
    pub contract: VenueContract,
    pub file: FileMetadata,
}

#[derive(Debug, Clone)]
pub struct ContractDocument {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

fn venue_values(attrs: &VenueAttributes, active: bool) -> VenueValues {
    VenueValues {
        name: attrs.name.trim().to_string(),
        address: attrs.address.trim().to_string(),
        city: attrs.city.trim().to_string(),
        region: attrs.region.trim().to_string(),
        postal_code: attrs.postal_code.trim().to_string(),
        capacity: attrs.capacity,
        contact_name: attrs.contact_name.clone(),
        contact_email: attrs.contact_email.as_deref().map(|e| e.trim().to_lowercase()),
        daily_rate_cents: attrs.daily_rate_cents.map(Cents),
        notes: attrs.notes.clone(),
        active,
    }
}

fn venue_attributes(venue: &Venue) -> VenueAttributes {
    VenueAttributes {
        name: venue.name.clone(),
        address: venue.address.clone(),
        city: venue.city.clone(),
        region: venue.region.clone(),
        postal_code: venue.postal_code.clone(),
        capacity: venue.capacity,
        contact_name: venue.contact_name.clone(),
        contact_email: venue.contact_email.clone(),
        daily_rate_cents: venue.daily_rate_cents.map(Cents::value),
        notes: venue.notes.clone(),
        tenant_id: Some(venue.tenant_id),
    }
}

fn contract_values(attrs: &ContractAttributes) -> ContractValues {
    ContractValues {
        venue_id: attrs.venue_id,
        camp_id: attrs.camp_id,
        title: attrs.title.trim().to_string(),
        term_start: attrs.term_start,
        term_end: attrs.term_end,
        fee_cents: Cents(attrs.fee_cents),
        deposit_cents: Cents(attrs.deposit_cents),
    }
}

fn contract_attributes(contract: &VenueContract) -> ContractAttributes {
    ContractAttributes {
        venue_id: contract.venue_id,
        camp_id: contract.camp_id,
        title: contract.title.clone(),
        term_start: contract.term_start,
        term_end: contract.term_end,
        fee_cents: contract.fee_cents.value(),
        deposit_cents: contract.deposit_cents.value(),
    }
}

/// Name the uploader gave, recovered from a document key
pub fn document_file_name(key: &str) -> String {
    let last = key.rsplit('/').next().unwrap_or(key);
    match last.get(KEY_PREFIX_LEN..) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => last.to_string(),
    }
}

pub fn validate_signer(params: &SignContractParams) -> CampResult<String> {
    let name = params.signed_by.trim();
    if name.is_empty() {
        return Err(CampError::invalid("signed_by", "can't be blank"));
    }
    if name.chars().count() > MAX_SIGNER_NAME {
        return Err(CampError::invalid("signed_by", "is too long (maximum is 120 characters)"));
    }
    Ok(name.to_string())
}

pub struct VenueService<'a, U: UserContext> {
    ctx: &'a ServiceContext,
    user: &'a U,
}

impl<'a, U: UserContext> VenueService<'a, U> {
    pub fn new(ctx: &'a ServiceContext, user: &'a U) -> Self {
        Self { ctx, user }
    }

    pub async fn list(&self, tenant_id: Option<Id>) -> CampResult<Vec<Venue>> {
        authorize(self.user, Action::ManageCamps)?;
        let filter = staff_tenant_filter(self.user, tenant_id);
        Ok(self.ctx.venues().list_by_tenant(filter).await?)
    }

    pub async fn get(&self, id: Id) -> CampResult<Venue> {
        authorize(self.user, Action::ManageCamps)?;
        scoped(self.user, self.ctx.venues().find_by_id(id).await?, "Venue", id)
    }

    #[instrument(skip(self, attrs), fields(user_id = self.user.id()))]
    pub async fn create(&self, attrs: VenueAttributes) -> CampResult<Venue> {
        authorize(self.user, Action::ManageCamps)?;
        let tenant_id = effective_tenant(self.user, attrs.tenant_id)?;
        VenueRules.validate(&attrs)?;

        let venue = self
            .ctx
            .venues()
            .create(tenant_id, &venue_values(&attrs, true))
            .await?;
        info!(venue_id = venue.id, tenant_id, "Venue created");
        Ok(venue)
    }

    pub async fn update(&self, id: Id, params: UpdateVenueParams) -> CampResult<Venue> {
        let venue = self.get(id).await?;
        let mut attrs = venue_attributes(&venue);
        params.apply_to(&mut attrs);
        VenueRules.validate(&attrs)?;

        let active = params.active.unwrap_or(venue.active);
        Ok(self.ctx.venues().update(venue.id, &venue_values(&attrs, active)).await?)
    }

    /// Venues are never deleted: camps and contracts keep pointing at them
    pub async fn remove(&self, id: Id) -> CampResult<VenueRemoval> {
        let venue = self.get(id).await?;
        if !venue.active {
            return Ok(VenueRemoval::AlreadyInactive);
        }
        let camps = self.ctx.camps().count_for_venue(venue.id).await?;
        let attrs = venue_attributes(&venue);
        self.ctx.venues().update(venue.id, &venue_values(&attrs, false)).await?;
        info!(venue_id = venue.id, camps, "Venue deactivated");
        Ok(VenueRemoval::Deactivated)
    }
}

pub struct ContractService<'a, U: UserContext> {
    ctx: &'a ServiceContext,
    user: &'a U,
}

impl<'a, U: UserContext> ContractService<'a, U> {
    pub fn new(ctx: &'a ServiceContext, user: &'a U) -> Self {
        Self { ctx, user }
    }

    pub async fn list(&self, params: ContractListParams) -> CampResult<Vec<VenueContract>> {
        authorize(self.user, Action::ManageCamps)?;
        let filter = staff_tenant_filter(self.user, params.tenant_id);
        Ok(self.ctx.contracts().list(filter, params.status).await?)
    }

    pub async fn get(&self, id: Id) -> CampResult<VenueContract> {
        authorize(self.user, Action::ManageCamps)?;
        scoped(self.user, self.ctx.contracts().find_by_id(id).await?, "Contract", id)
    }

    /// Venue and camp must belong to the contract's tenant
    async fn check_references(&self, tenant_id: Id, attrs: &ContractAttributes) -> CampResult<Venue> {
        let venue = match self.ctx.venues().find_by_id(attrs.venue_id).await? {
            Some(venue) if venue.tenant_id == tenant_id => venue,
            _ => return Err(CampError::invalid("venue_id", "is not a venue of this licensee")),
        };
        if let Some(camp_id) = attrs.camp_id {
            match self.ctx.camps().find_by_id(camp_id).await? {
                Some(camp) if camp.tenant_id == tenant_id => {}
                _ => return Err(CampError::invalid("camp_id", "is not a camp of this licensee")),
            }
        }
        Ok(venue)
    }

    #[instrument(skip(self, attrs), fields(user_id = self.user.id()))]
    pub async fn create(
        &self,
        tenant_id: Option<Id>,
        attrs: ContractAttributes,
    ) -> CampResult<VenueContract> {
        authorize(self.user, Action::ManageCamps)?;
        let tenant_id = effective_tenant(self.user, tenant_id)?;
        VenueContractContract.validate(&attrs)?;
        self.check_references(tenant_id, &attrs).await?;

        let contract = self
            .ctx
            .contracts()
            .create(tenant_id, &contract_values(&attrs))
            .await?;
        info!(contract_id = contract.id, tenant_id, "Venue contract drafted");
        Ok(contract)
    }

    pub async fn update(&self, id: Id, params: UpdateContractParams) -> CampResult<VenueContract> {
        let contract = self.get(id).await?;
        if !contract.is_editable() {
            return Err(CampError::bad_request(format!(
                "A {} contract can no longer be edited",
                contract.status
            )));
        }
        let mut attrs = contract_attributes(&contract);
        params.apply_to(&mut attrs);
        VenueContractContract.validate(&attrs)?;
        self.check_references(contract.tenant_id, &attrs).await?;

        self.ctx
            .contracts()
            .update_draft(contract.id, &contract_values(&attrs))
            .await?
            .ok_or_else(|| CampError::bad_request("The contract was sent while being edited"))
    }

    async fn transition(
        &self,
        contract: &VenueContract,
        to: ContractStatus,
        signed_by: Option<&str>,
    ) -> CampResult<VenueContract> {
        contract.status.transition_to(to)?;
        self.ctx
            .contracts()
            .transition(contract.id, contract.status, to, signed_by)
            .await?
            .ok_or_else(|| CampError::invalid_transition("contract", contract.status, to))
    }

    /// Draft to sent; the venue contact gets the terms by email
    pub async fn send(&self, id: Id) -> CampResult<VenueContract> {
        let contract = self.get(id).await?;
        let venue = self
            .ctx
            .venues()
            .find_by_id(contract.venue_id)
            .await?
            .ok_or_else(|| CampError::not_found("Venue", contract.venue_id))?;
        let Some(contact_email) = venue.contact_email.clone() else {
            return Err(CampError::bad_request("The venue has no contact email"));
        };
        let tenant = self
            .ctx
            .tenants()
            .find_by_id(contract.tenant_id)
            .await?
            .ok_or_else(|| CampError::not_found("Tenant", contract.tenant_id))?;

        let sent = self.transition(&contract, ContractStatus::Sent, None).await?;

        let mut to = EmailAddress::new(contact_email);
        if let Some(name) = &venue.contact_name {
            to = to.with_name(name.clone());
        }
        let message = self.ctx.mailer.contract_sent(
            to,
            &ContractSent {
                tenant_name: tenant.name,
                contact_name: venue.contact_name.clone(),
                venue_name: venue.name.clone(),
                title: sent.title.clone(),
                term: sent.term(),
                fee_cents: sent.fee_cents,
                deposit_cents: sent.deposit_cents,
            },
        );
        if !self.ctx.send_email(message).await {
            warn!(contract_id = sent.id, "Contract email was not delivered");
        }
        info!(contract_id = sent.id, venue_id = venue.id, "Venue contract sent");
        Ok(sent)
    }

    pub async fn sign(&self, id: Id, params: SignContractParams) -> CampResult<VenueContract> {
        let signer = validate_signer(&params)?;
        let contract = self.get(id).await?;
        let signed = self
            .transition(&contract, ContractStatus::Signed, Some(&signer))
            .await?;
        info!(contract_id = signed.id, "Venue contract signed");
        Ok(signed)
    }

    pub async fn cancel(&self, id: Id) -> CampResult<VenueContract> {
        let contract = self.get(id).await?;
        let cancelled = self
            .transition(&contract, ContractStatus::Cancelled, None)
            .await?;
        info!(contract_id = cancelled.id, "Venue contract cancelled");
        Ok(cancelled)
    }

    /// Expire signed contracts whose term has ended; owners only touch their own
    pub async fn expire_overdue(&self, params: ExpireParams) -> CampResult<Vec<VenueContract>> {
        authorize(self.user, Action::ManageCamps)?;
        let filter = staff_tenant_filter(self.user, params.tenant_id);
        let expired = self
            .ctx
            .contracts()
            .expire_overdue(filter, self.ctx.today())
            .await?;
        if !expired.is_empty() {
            info!(count = expired.len(), "Venue contracts expired");
        }
        Ok(expired)
    }

    #[instrument(skip(self, data), fields(user_id = self.user.id(), size = data.len()))]
    pub async fn upload_document(
        &self,
        id: Id,
        file_name: &str,
        data: Bytes,
    ) -> CampResult<UploadedDocument> {
        let contract = self.get(id).await?;
        if data.is_empty() {
            return Err(CampError::invalid("file", "is empty"));
        }
        let limit = self.ctx.settings.max_upload_bytes;
        if data.len() > limit {
            return Err(CampError::invalid(
                "file",
                format!("is larger than the {limit} byte limit"),
            ));
        }

        let key = contract_document_key(contract.tenant_id, contract.id, file_name);
        let file = self.ctx.storage.put(&key, data).await?;
        let updated = self.ctx.contracts().set_document(contract.id, &key).await?;

        if let Some(previous) = contract.document_key.as_deref() {
            if let Err(e) = self.ctx.storage.delete(previous).await {
                warn!(contract_id = contract.id, key = previous, error = %e, "Old document left behind");
            }
        }
        info!(contract_id = contract.id, key = %key, "Contract document stored");
        Ok(UploadedDocument {
            contract: updated,
            file,
        })
    }

    pub async fn download_document(&self, id: Id) -> CampResult<ContractDocument> {
        let contract = self.get(id).await?;
        let Some(key) = contract.document_key else {
            return Err(CampError::not_found("Document", id));
        };
        let file = self.ctx.storage.metadata(&key).await?;
        let data = self.ctx.storage.get(&key).await?;
        Ok(ContractDocument {
            file_name: document_file_name(&key),
            content_type: file.content_type,
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_file_name() {
        let key = contract_document_key(3, 9, "Signed Lease.pdf");
        assert_eq!(document_file_name(&key), "Signed_Lease.pdf");
        assert_eq!(document_file_name("contracts/3/9/short"), "short");
    }

    #[test]
    fn test_validate_signer() {
        let ok = SignContractParams {
            signed_by: "  Pat Jones ".into(),
        };
        assert_eq!(validate_signer(&ok).unwrap(), "Pat Jones");

        let blank = SignContractParams {
            signed_by: "   ".into(),
        };
        assert_eq!(validate_signer(&blank).unwrap_err().status_code(), 400);

        let long = SignContractParams {
            signed_by: "x".repeat(121),
        };
        assert!(validate_signer(&long).is_err());
    }

    #[test]
    fn test_venue_values_normalize() {
        let attrs = VenueAttributes {
            name: " Lincoln Park ".into(),
            address: "1 Park Way".into(),
            city: "Denver".into(),
            region: "CO".into(),
            postal_code: "80202".into(),
            capacity: Some(200),
            contact_name: None,
            contact_email: Some(" Fields@Example.com ".into()),
            daily_rate_cents: Some(15_000),
            notes: None,
            tenant_id: None,
        };
        let values = venue_values(&attrs, true);
        assert_eq!(values.name, "Lincoln Park");
        assert_eq!(values.contact_email.as_deref(), Some("fields@example.com"));
        assert_eq!(values.daily_rate_cents, Some(Cents(15_000)));
    }
}
