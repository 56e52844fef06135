//! Registration lifecycle after checkout
//!
//! Cancellation, refunds, waitlist promotion and paying a promoted
//! registration. Anything that frees a spot runs the promotion in the same
//! transaction, under the camp row lock checkout also takes.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use camp_contracts::permissions::effective_tenant;
use camp_contracts::{authorize, Action, UserContext};
use camp_core::{CampError, CampResult, Cents, Id, StatusFlow};
use camp_db::{
    CampRepository, NewRefund, PgConnection, Postgres, RegistrationFilter, RegistrationRepository,
    Repository, Transaction,
};
use camp_models::{Camp, CampStatus, PaymentStatus, Refund, Registration, RegistrationStatus, Role};
use camp_notifications::{EmailAddress, WaitlistPromotion};

use crate::base::{commit, scoped};
use crate::context::{DomainCounters, ServiceContext};
use crate::payments::{refund_failed_charge, refund_then_record, ChargeRequest, RefundRequest};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CancelParams {
    /// Return whatever is still refundable
    #[serde(default)]
    pub refund: bool,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RefundParams {
    /// Defaults to everything still refundable
    pub amount_cents: Option<i64>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PayParams {
    pub payment_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegistrationListParams {
    pub camp_id: Option<Id>,
    pub status: Option<RegistrationStatus>,
    pub tenant_id: Option<Id>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CancelOutcome {
    pub registration: Registration,
    pub refund: Option<Refund>,
    /// Waitlisted registrations that moved up
    pub promoted: Vec<Registration>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefundOutcome {
    pub registration: Registration,
    pub refund: Refund,
}

/// Camps whose waitlist still moves
fn promotes_waitlist(camp: &Camp) -> bool {
    matches!(
        camp.status,
        CampStatus::Published | CampStatus::RegistrationClosed | CampStatus::InProgress
    )
}

/// Amount to refund for a request, checked against what is refundable
pub fn refund_amount(requested: Option<i64>, refundable: Cents) -> CampResult<Cents> {
    if !refundable.is_positive() {
        return Err(CampError::bad_request("Nothing left to refund"));
    }
    match requested {
        None => Ok(refundable),
        Some(cents) if cents >= 1 && Cents(cents) <= refundable => Ok(Cents(cents)),
        Some(_) => Err(CampError::invalid(
            "amount_cents",
            format!("must be between 1 and {}", refundable.value()),
        )),
    }
}

pub struct RegistrationService<'a, U: UserContext> {
    ctx: &'a ServiceContext,
    user: &'a U,
}

impl<'a, U: UserContext> RegistrationService<'a, U> {
    pub fn new(ctx: &'a ServiceContext, user: &'a U) -> Self {
        Self { ctx, user }
    }

    /// Parents see their own registrations; staff see their tenant's
    pub async fn list(&self, params: RegistrationListParams) -> CampResult<Vec<Registration>> {
        let filter = if self.user.role() == Role::Parent {
            RegistrationFilter {
                parent_id: Some(self.user.id()),
                tenant_id: self.user.tenant_id(),
                camp_id: params.camp_id,
                status: params.status,
            }
        } else {
            authorize(self.user, Action::ViewRegistrations)?;
            RegistrationFilter {
                tenant_id: staff_tenant_filter(self.user, params.tenant_id),
                camp_id: params.camp_id,
                parent_id: None,
                status: params.status,
            }
        };
        Ok(self.ctx.registrations().list(&filter).await?)
    }

    pub async fn list_for_camp(&self, camp_id: Id) -> CampResult<Vec<Registration>> {
        authorize(self.user, Action::ViewRegistrations)?;
        let camp = scoped(
            self.user,
            self.ctx.camps().find_by_id(camp_id).await?,
            "Camp",
            camp_id,
        )?;
        let filter = RegistrationFilter {
            tenant_id: Some(camp.tenant_id),
            camp_id: Some(camp.id),
            ..Default::default()
        };
        Ok(self.ctx.registrations().list(&filter).await?)
    }

    /// Load a registration the caller may act on
    async fn load(&self, id: Id) -> CampResult<Registration> {
        let row = self.ctx.registrations().find_by_id(id).await?;
        let registration = scoped(self.user, row, "Registration", id)?;
        if self.user.role() == Role::Parent && registration.parent_id != self.user.id() {
            return Err(CampError::not_found("Registration", id));
        }
        Ok(registration)
    }

    #[instrument(skip(self, params), fields(user_id = self.user.id()))]
    pub async fn cancel(&self, id: Id, params: CancelParams) -> CampResult<CancelOutcome> {
        authorize(self.user, Action::CancelRegistration)?;
        if params.refund {
            authorize(self.user, Action::Refund)?;
        }
        let current = self.load(id).await?;
        if self.user.role() == Role::Parent
            && !matches!(
                current.status,
                RegistrationStatus::Pending | RegistrationStatus::Waitlisted
            )
        {
            return Err(CampError::forbidden(
                "Confirmed registrations can only be cancelled by camp staff",
            ));
        }

        let mut tx = self.ctx.begin().await?;
        // Camp first, then registration: the order checkout locks in
        let camp = CampRepository::lock(&mut tx, current.camp_id)
            .await?
            .ok_or_else(|| CampError::not_found("Camp", current.camp_id))?;
        let registration = RegistrationRepository::lock(&mut tx, id)
            .await?
            .ok_or_else(|| CampError::not_found("Registration", id))?;
        registration.status.transition_to(RegistrationStatus::Cancelled)?;

        let mut cancelled = RegistrationRepository::cancel(&mut tx, id).await?;

        let mut staged = None;
        let refundable = registration.refundable();
        if params.refund && refundable.is_positive() {
            let (updated, row) = self
                .stage_refund(&mut tx, &registration, refundable, params.reason.clone())
                .await?;
            cancelled = updated;
            staged = Some(row);
        }

        let promoted = if registration.status.holds_spot() && promotes_waitlist(&camp) {
            promote_locked(&mut tx, &camp).await?
        } else {
            Vec::new()
        };

        let refund = match staged {
            Some(row) => Some(self.settle_refund(tx, &registration, row, params.reason).await?),
            None => {
                commit(tx).await?;
                None
            }
        };

        info!(
            registration_id = id,
            camp_id = camp.id,
            refunded_cents = refund.as_ref().map_or(0, |r| r.amount_cents.value()),
            promoted = promoted.len(),
            "Registration cancelled"
        );
        self.after_promotion(&camp, &promoted).await;

        Ok(CancelOutcome {
            registration: cancelled,
            refund,
            promoted,
        })
    }

    #[instrument(skip(self, params), fields(user_id = self.user.id()))]
    pub async fn refund(&self, id: Id, params: RefundParams) -> CampResult<RefundOutcome> {
        authorize(self.user, Action::Refund)?;
        self.load(id).await?;

        let mut tx = self.ctx.begin().await?;
        let registration = RegistrationRepository::lock(&mut tx, id)
            .await?
            .ok_or_else(|| CampError::not_found("Registration", id))?;
        let amount = refund_amount(params.amount_cents, registration.refundable())?;

        let (updated, row) = self
            .stage_refund(&mut tx, &registration, amount, params.reason.clone())
            .await?;
        let refund = self
            .settle_refund(tx, &registration, row, params.reason)
            .await?;

        Ok(RefundOutcome {
            registration: updated,
            refund,
        })
    }

    /// Write the refund bookkeeping on a locked registration; the gateway is
    /// only called by `settle_refund`
    async fn stage_refund(
        &self,
        conn: &mut PgConnection,
        registration: &Registration,
        amount: Cents,
        reason: Option<String>,
    ) -> CampResult<(Registration, Refund)> {
        let refunded_total = registration.refunded_cents + amount;
        let next_status = registration.payment_status_for_refunded(refunded_total);
        registration.payment_status.transition_to(next_status)?;

        let new_refund = NewRefund {
            amount_cents: amount,
            reason,
            payment_ref: None,
            refunded_by: Some(self.user.id()),
        };
        Ok(RegistrationRepository::record_refund(conn, registration, &new_refund, next_status).await?)
    }

    /// Return the money for a staged refund, then store the gateway
    /// reference and commit
    async fn settle_refund(
        &self,
        mut tx: Transaction<'static, Postgres>,
        registration: &Registration,
        refund: Refund,
        reason: Option<String>,
    ) -> CampResult<Refund> {
        let request = RefundRequest {
            tenant_id: registration.tenant_id,
            charge_reference: registration.payment_ref.clone(),
            amount: refund.amount_cents,
            reason,
        };
        let refund_id = refund.id;
        let refund = refund_then_record(self.ctx.payments.as_ref(), request, |receipt| async move {
            let refund =
                RegistrationRepository::set_refund_reference(&mut tx, refund_id, &receipt.reference)
                    .await?;
            commit(tx).await?;
            Ok(refund)
        })
        .await?;

        DomainCounters::incr(&self.ctx.counters.refunds, 1);
        info!(
            registration_id = registration.id,
            amount_cents = refund.amount_cents.value(),
            refund_ref = ?refund.payment_ref,
            "Refund issued"
        );
        Ok(refund)
    }

    /// Fill free spots of a camp from its waitlist
    #[instrument(skip(self), fields(user_id = self.user.id()))]
    pub async fn promote_waitlist(&self, camp_id: Id) -> CampResult<Vec<Registration>> {
        authorize(self.user, Action::ManageCampStaff)?;
        scoped(
            self.user,
            self.ctx.camps().find_by_id(camp_id).await?,
            "Camp",
            camp_id,
        )?;

        let mut tx = self.ctx.begin().await?;
        let camp = CampRepository::lock(&mut tx, camp_id)
            .await?
            .ok_or_else(|| CampError::not_found("Camp", camp_id))?;
        if !promotes_waitlist(&camp) {
            return Err(CampError::bad_request(format!(
                "The waitlist of a {} camp cannot move",
                camp.status
            )));
        }
        let promoted = promote_locked(&mut tx, &camp).await?;
        commit(tx).await?;

        self.after_promotion(&camp, &promoted).await;
        Ok(promoted)
    }

    /// Pay a promoted registration; success confirms it
    #[instrument(skip(self, params), fields(user_id = self.user.id()))]
    pub async fn pay(&self, id: Id, params: PayParams) -> CampResult<Registration> {
        authorize(self.user, Action::Checkout)?;
        self.load(id).await?;

        let mut tx = self.ctx.begin().await?;
        let registration = RegistrationRepository::lock(&mut tx, id)
            .await?
            .ok_or_else(|| CampError::not_found("Registration", id))?;
        if registration.status != RegistrationStatus::Pending {
            return Err(CampError::bad_request("Only pending registrations can be paid"));
        }
        registration.payment_status.transition_to(PaymentStatus::Paid)?;

        if !registration.total_cents.is_positive() {
            let paid = RegistrationRepository::mark_paid(&mut tx, id, None).await?;
            commit(tx).await?;
            return Ok(paid);
        }

        let token = params
            .payment_token
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| CampError::invalid("payment_token", "is required"))?;
        let charge = self
            .ctx
            .payments
            .charge(ChargeRequest {
                tenant_id: registration.tenant_id,
                payer_id: registration.parent_id,
                amount: registration.total_cents,
                token,
                description: format!("Registration {}", registration.id),
            })
            .await;

        let receipt = match charge {
            Ok(receipt) => receipt,
            Err(e) => {
                RegistrationRepository::mark_payment_failed(&mut tx, id).await?;
                commit(tx).await?;
                warn!(registration_id = id, error = %e, "Payment for promoted registration failed");
                return Err(e.into());
            }
        };

        let persisted = async {
            let paid = RegistrationRepository::mark_paid(&mut tx, id, Some(&receipt.reference)).await?;
            commit(tx).await?;
            Ok::<_, CampError>(paid)
        }
        .await;

        match persisted {
            Ok(paid) => {
                info!(registration_id = id, amount_cents = receipt.amount.value(), "Registration paid");
                Ok(paid)
            }
            Err(e) => {
                refund_failed_charge(
                    self.ctx.payments.as_ref(),
                    registration.tenant_id,
                    &receipt,
                    "payment could not be recorded",
                )
                .await;
                Err(CampError::Internal(format!("payment could not be recorded: {e}")))
            }
        }
    }

    /// Email each promoted parent
    async fn after_promotion(&self, camp: &Camp, promoted: &[Registration]) {
        if promoted.is_empty() {
            return;
        }
        DomainCounters::incr(&self.ctx.counters.waitlist_promotions, promoted.len() as u64);

        for registration in promoted {
            let parent = self.ctx.users().find_by_id(registration.parent_id).await;
            let athlete = self.ctx.athletes().find_by_id(registration.athlete_id).await;
            let (Ok(Some(parent)), Ok(Some(athlete))) = (parent, athlete) else {
                warn!(registration_id = registration.id, "Promoted registration has no contact");
                continue;
            };

            let data = WaitlistPromotion {
                parent_name: parent.name.clone(),
                athlete_name: athlete.full_name(),
                camp_name: camp.name.clone(),
                start_date: camp.start_date,
                amount_due_cents: registration.total_cents,
            };
            let to = EmailAddress::new(&parent.email).with_name(&parent.name);
            self.ctx
                .send_email(self.ctx.mailer.waitlist_promotion(to, &data))
                .await;
        }
    }
}

/// Waitlisted registrations to promote into `free_spots`, lowest
/// waitlist position first
pub fn plan_promotions(free_spots: i64, waitlist: &[Registration]) -> Vec<Id> {
    let mut queue: Vec<&Registration> = waitlist
        .iter()
        .filter(|r| r.status == RegistrationStatus::Waitlisted)
        .collect();
    queue.sort_by_key(|r| (r.waitlist_position.is_none(), r.waitlist_position, r.created_at, r.id));
    queue
        .into_iter()
        .take(usize::try_from(free_spots).unwrap_or(0))
        .map(|r| r.id)
        .collect()
}

/// Promote waitlisted registrations while the locked camp has free spots
pub(crate) async fn promote_locked(
    conn: &mut PgConnection,
    camp: &Camp,
) -> CampResult<Vec<Registration>> {
    let holding = RegistrationRepository::count_holding_spots(&mut *conn, camp.id).await?;
    let waitlist = RegistrationRepository::waitlist_locked(&mut *conn, camp.id).await?;

    let mut promoted = Vec::new();
    for id in plan_promotions(camp.spots_remaining(holding), &waitlist) {
        promoted.push(RegistrationRepository::promote(&mut *conn, id).await?);
    }
    Ok(promoted)
}

/// Tenant filter for staff listings
pub fn staff_tenant_filter<U: UserContext + ?Sized>(user: &U, requested: Option<Id>) -> Option<Id> {
    effective_tenant(user, requested).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use camp_contracts::Actor;

    #[test]
    fn test_refund_amount_defaults_to_everything() {
        assert_eq!(refund_amount(None, Cents(2_500)).unwrap(), Cents(2_500));
        assert_eq!(refund_amount(Some(1), Cents(2_500)).unwrap(), Cents(1));
        assert_eq!(refund_amount(Some(2_500), Cents(2_500)).unwrap(), Cents(2_500));
    }

    #[test]
    fn test_refund_amount_bounds() {
        let err = refund_amount(Some(0), Cents(2_500)).unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(refund_amount(Some(2_501), Cents(2_500)).is_err());
        assert!(refund_amount(Some(-5), Cents(2_500)).is_err());

        let err = refund_amount(None, Cents::ZERO).unwrap_err();
        assert_eq!(err.to_string(), "Nothing left to refund");
    }

    fn waitlisted(id: Id, position: Option<i32>, minutes_ago: i64) -> Registration {
        let created = chrono::Utc::now() - chrono::Duration::minutes(minutes_ago);
        Registration {
            id,
            tenant_id: 1,
            camp_id: 10,
            athlete_id: 100 + id,
            parent_id: 7,
            status: RegistrationStatus::Waitlisted,
            payment_status: PaymentStatus::Unpaid,
            price_cents: Cents(29_900),
            discount_cents: Cents::ZERO,
            total_cents: Cents(29_900),
            refunded_cents: Cents::ZERO,
            promo_code: None,
            payment_ref: None,
            waitlist_position: position,
            paid_at: None,
            cancelled_at: None,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_plan_promotions_takes_lowest_positions_first() {
        let waitlist = vec![
            waitlisted(3, Some(3), 10),
            waitlisted(1, Some(1), 30),
            waitlisted(4, None, 50),
            waitlisted(2, Some(2), 20),
        ];
        assert_eq!(plan_promotions(1, &waitlist), vec![1]);
        assert_eq!(plan_promotions(2, &waitlist), vec![1, 2]);
        assert_eq!(plan_promotions(10, &waitlist), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_plan_promotions_needs_a_free_spot() {
        let waitlist = vec![waitlisted(1, Some(1), 5), waitlisted(2, Some(2), 4)];
        assert!(plan_promotions(0, &waitlist).is_empty());
        assert!(plan_promotions(-3, &waitlist).is_empty());
        assert!(plan_promotions(4, &[]).is_empty());
    }

    #[test]
    fn test_plan_promotions_skips_rows_no_longer_waitlisted() {
        let mut cancelled = waitlisted(1, Some(1), 5);
        cancelled.status = RegistrationStatus::Cancelled;
        let waitlist = vec![cancelled, waitlisted(2, Some(2), 4)];
        assert_eq!(plan_promotions(1, &waitlist), vec![2]);
    }

    #[test]
    fn test_promotion_never_exceeds_capacity() {
        let camp_capacity = 20_i64;
        let waitlist: Vec<Registration> =
            (1..=6).map(|i| waitlisted(i, Some(i as i32), 60 - i)).collect();
        for holding in 15..=22 {
            let free = (camp_capacity - holding).max(0);
            let promoted = plan_promotions(free, &waitlist).len() as i64;
            if holding <= camp_capacity {
                assert!(holding + promoted <= camp_capacity);
            } else {
                assert_eq!(promoted, 0);
            }
            assert_eq!(promoted, free.min(waitlist.len() as i64));
        }
    }

    #[test]
    fn test_staff_tenant_filter() {
        let owner = Actor::new(1, Role::LicenseeOwner, Some(4));
        assert_eq!(staff_tenant_filter(&owner, Some(9)), Some(4));
        assert_eq!(staff_tenant_filter(&Actor::hq(1), Some(9)), Some(9));
        assert_eq!(staff_tenant_filter(&Actor::hq(1), None), None);
    }
}
