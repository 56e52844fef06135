//! Checkout
//!
//! A cart of (camp, athlete) pairs becomes registrations in one
//! transaction. Camp rows are locked while spots are counted, so two
//! checkouts racing for the last spot cannot both get it. The card is
//! charged before anything is written; if writing fails afterwards the
//! charge is refunded (see `charge_then_persist`).

pub mod pricing;

use std::collections::{BTreeMap, HashMap};

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, instrument, warn};

use camp_contracts::checkout::{CheckoutContract, CheckoutParams};
use camp_contracts::{authorize, Action, Contract, UserContext};
use camp_core::error::ValidationErrors;
use camp_core::{CampError, CampResult, Cents, Id};
use camp_db::{
    CampRepository, NewRegistration, PgConnection, PromoCodeRepository, RegistrationRepository,
    Repository,
};
use camp_models::{
    Athlete, Camp, PaymentStatus, PromoCode, Registration, RegistrationStatus, Tenant, User,
};
use camp_notifications::{CheckoutConfirmation, ConfirmationLine, EmailAddress};

use crate::base::{commit, resolve_parent};
use crate::context::{DomainCounters, ServiceContext};
use crate::payments::{charge_then_persist, ChargeRequest};

pub use pricing::{allocate_spots, price_cart, CartLine, CartPricing, PricedLine};

/// Line of a quote, with names for display
#[derive(Debug, Clone, Serialize)]
pub struct QuoteLine {
    pub camp_id: Id,
    pub camp_name: String,
    pub athlete_id: Id,
    pub athlete_name: String,
    pub price_cents: Cents,
    pub discount_cents: Cents,
    pub total_cents: Cents,
    pub waitlisted: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutQuote {
    pub lines: Vec<QuoteLine>,
    pub subtotal_cents: Cents,
    pub discount_cents: Cents,
    pub total_cents: Cents,
    pub promo_code: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutReceipt {
    pub registrations: Vec<Registration>,
    pub charged_cents: Cents,
    pub discount_cents: Cents,
    pub payment_ref: Option<String>,
}

/// Everything validated before the transaction starts
struct Cart {
    tenant: Tenant,
    parent: User,
    camps: HashMap<Id, Camp>,
    athletes: HashMap<Id, Athlete>,
}

/// Cart state computed under the camp locks
struct PreparedCart {
    pricing: CartPricing,
    promo: Option<PromoCode>,
}

pub struct CheckoutService<'a, U: UserContext> {
    ctx: &'a ServiceContext,
    user: &'a U,
}

impl<'a, U: UserContext> CheckoutService<'a, U> {
    pub fn new(ctx: &'a ServiceContext, user: &'a U) -> Self {
        Self { ctx, user }
    }

    /// Price the cart without charging or writing anything
    #[instrument(skip(self, params), fields(user_id = self.user.id()))]
    pub async fn quote(&self, params: CheckoutParams) -> CampResult<CheckoutQuote> {
        authorize(self.user, Action::Checkout)?;
        CheckoutContract {
            require_payment: false,
        }
        .validate(&params)?;

        let today = self.ctx.today();
        let cart = self.load_cart(&params, today).await?;

        // Dropped without commit: the locks are released and nothing persists
        let mut tx = self.ctx.begin().await?;
        let prepared = prepare(&mut tx, &cart, &params, today).await?;

        Ok(build_quote(&cart, &prepared))
    }

    #[instrument(skip(self, params), fields(user_id = self.user.id(), items = params.items.len()))]
    pub async fn checkout(&self, params: CheckoutParams) -> CampResult<CheckoutReceipt> {
        authorize(self.user, Action::Checkout)?;
        CheckoutContract {
            require_payment: true,
        }
        .validate(&params)?;

        let today = self.ctx.today();
        let cart = self.load_cart(&params, today).await?;

        let mut tx = self.ctx.begin().await?;
        let prepared = prepare(&mut tx, &cart, &params, today).await?;
        let charge_amount = prepared.pricing.total_cents;

        let charge = charge_amount.is_positive().then(|| ChargeRequest {
            tenant_id: cart.tenant.id,
            payer_id: cart.parent.id,
            amount: charge_amount,
            token: params.payment_token.clone().unwrap_or_default(),
            description: charge_description(&cart, &prepared.pricing),
        });

        let (cart_ref, prepared_ref) = (&cart, &prepared);
        let (registrations, receipt) = charge_then_persist(
            self.ctx.payments.as_ref(),
            charge,
            "checkout",
            |payment_ref| async move {
                let registrations =
                    persist(&mut tx, cart_ref, prepared_ref, payment_ref.as_deref()).await?;
                commit(tx).await?;
                Ok(registrations)
            },
        )
        .await?;
        let payment_ref = receipt.map(|r| r.reference);

        DomainCounters::incr(&self.ctx.counters.checkouts, 1);
        DomainCounters::incr(
            &self.ctx.counters.registrations_created,
            registrations.len() as u64,
        );
        info!(
            tenant_id = cart.tenant.id,
            parent_id = cart.parent.id,
            registrations = registrations.len(),
            charged_cents = charge_amount.value(),
            discount_cents = prepared.pricing.discount_cents.value(),
            "Checkout completed"
        );

        self.send_confirmation(&cart, &prepared, &registrations, payment_ref.clone())
            .await;

        Ok(CheckoutReceipt {
            registrations,
            charged_cents: charge_amount,
            discount_cents: prepared.pricing.discount_cents,
            payment_ref,
        })
    }

    /// Resolve the buyer, tenant, camps and athletes and check every item
    async fn load_cart(&self, params: &CheckoutParams, today: NaiveDate) -> CampResult<Cart> {
        let parent = resolve_parent(self.ctx, self.user, params.parent_id).await?;
        let tenant_id = parent
            .tenant_id
            .ok_or_else(|| CampError::invalid("parent_id", "does not belong to a licensee"))?;

        let tenant = self.ctx.tenants().get(tenant_id).await?;
        if !tenant.is_active() {
            return Err(CampError::bad_request(format!(
                "{} is not accepting registrations",
                tenant.name
            )));
        }

        let athlete_ids: Vec<Id> = params.items.iter().map(|item| item.athlete_id).collect();
        let athletes: HashMap<Id, Athlete> = self
            .ctx
            .athletes()
            .find_many(&athlete_ids)
            .await?
            .into_iter()
            .map(|athlete| (athlete.id, athlete))
            .collect();

        let camp_repo = self.ctx.camps();
        let mut camps = HashMap::new();
        for item in &params.items {
            if camps.contains_key(&item.camp_id) {
                continue;
            }
            match camp_repo.find_by_id(item.camp_id).await? {
                Some(camp) if camp.tenant_id == tenant.id => {
                    camps.insert(camp.id, camp);
                }
                _ => return Err(CampError::not_found("Camp", item.camp_id)),
            }
        }

        let mut errors = ValidationErrors::new();
        for item in &params.items {
            let athlete = match athletes.get(&item.athlete_id) {
                Some(a) if a.parent_id == parent.id && a.tenant_id == tenant.id => a,
                _ => return Err(CampError::not_found("Athlete", item.athlete_id)),
            };
            let camp = &camps[&item.camp_id];

            if !camp.accepts_registrations(today) {
                errors.add("items", format!("{} is not open for registration", camp.name));
                continue;
            }
            let age = athlete.age_on(camp.start_date);
            if !camp.age_allowed(age) {
                errors.add(
                    "items",
                    format!(
                        "{} will be {} at the start of {}, outside ages {} to {}",
                        athlete.full_name(),
                        age,
                        camp.name,
                        camp.min_age,
                        camp.max_age
                    ),
                );
            }
        }
        errors.into_result()?;

        Ok(Cart {
            tenant,
            parent,
            camps,
            athletes,
        })
    }

    /// Delivery failures are logged, never returned
    async fn send_confirmation(
        &self,
        cart: &Cart,
        prepared: &PreparedCart,
        registrations: &[Registration],
        payment_ref: Option<String>,
    ) {
        let lines = registrations
            .iter()
            .filter_map(|registration| {
                let camp = cart.camps.get(&registration.camp_id)?;
                let athlete = cart.athletes.get(&registration.athlete_id)?;
                Some(ConfirmationLine {
                    athlete_name: athlete.full_name(),
                    camp_name: camp.name.clone(),
                    dates: camp.dates(),
                    waitlisted: registration.status == RegistrationStatus::Waitlisted,
                    total_cents: registration.total_cents,
                })
            })
            .collect();

        let data = CheckoutConfirmation {
            parent_name: cart.parent.name.clone(),
            lines,
            discount_cents: prepared.pricing.discount_cents,
            charged_cents: prepared.pricing.total_cents,
            payment_ref,
        };
        let to = EmailAddress::new(&cart.parent.email).with_name(&cart.parent.name);
        let message = self.ctx.mailer.checkout_confirmation(to, &data);
        if !self.ctx.send_email(message).await {
            warn!(parent_id = cart.parent.id, "Checkout confirmation not delivered");
        }
    }
}

/// Lock camps, check existing registrations, assign spots and price the cart
async fn prepare(
    conn: &mut PgConnection,
    cart: &Cart,
    params: &CheckoutParams,
    today: NaiveDate,
) -> CampResult<PreparedCart> {
    // Lock in id order so concurrent carts cannot deadlock
    let mut requested: BTreeMap<Id, usize> = BTreeMap::new();
    for item in &params.items {
        *requested.entry(item.camp_id).or_default() += 1;
    }

    let mut waitlist_flags: HashMap<Id, Vec<bool>> = HashMap::new();
    for (&camp_id, &count) in &requested {
        let camp = CampRepository::lock(&mut *conn, camp_id)
            .await?
            .ok_or_else(|| CampError::not_found("Camp", camp_id))?;
        let holding = RegistrationRepository::count_holding_spots(&mut *conn, camp_id).await?;
        let free = camp.spots_remaining(holding);
        waitlist_flags.insert(camp_id, allocate_spots(free, count));
    }

    let mut errors = ValidationErrors::new();
    for item in &params.items {
        if RegistrationRepository::has_active(&mut *conn, item.camp_id, item.athlete_id).await? {
            let athlete = &cart.athletes[&item.athlete_id];
            let camp = &cart.camps[&item.camp_id];
            errors.add(
                "items",
                format!("{} is already registered for {}", athlete.full_name(), camp.name),
            );
        }
    }
    errors.into_result()?;

    let mut taken: HashMap<Id, usize> = HashMap::new();
    let lines: Vec<CartLine> = params
        .items
        .iter()
        .map(|item| {
            let index = taken.entry(item.camp_id).or_default();
            let waitlisted = waitlist_flags
                .get(&item.camp_id)
                .and_then(|flags| flags.get(*index).copied())
                .unwrap_or(true);
            *index += 1;
            CartLine {
                camp_id: item.camp_id,
                athlete_id: item.athlete_id,
                price: cart.camps[&item.camp_id].price_cents,
                waitlisted,
            }
        })
        .collect();

    let promo = match params
        .promo_code
        .as_deref()
        .map(str::trim)
        .filter(|code| !code.is_empty())
    {
        Some(code) => {
            let normalized = PromoCode::normalize(code);
            match PromoCodeRepository::lock_by_code(&mut *conn, cart.tenant.id, &normalized).await? {
                Some(promo) if promo.is_redeemable(today) => Some(promo),
                _ => return Err(CampError::invalid("promo_code", "is not valid")),
            }
        }
        None => None,
    };

    let pricing = price_cart(&lines, promo.as_ref());
    Ok(PreparedCart { pricing, promo })
}

async fn persist(
    conn: &mut PgConnection,
    cart: &Cart,
    prepared: &PreparedCart,
    payment_ref: Option<&str>,
) -> CampResult<Vec<Registration>> {
    let now = Utc::now();
    let promo_code = prepared
        .promo
        .as_ref()
        .filter(|_| prepared.pricing.discount_cents.is_positive())
        .map(|promo| promo.code.clone());

    let mut registrations = Vec::with_capacity(prepared.pricing.lines.len());
    for line in &prepared.pricing.lines {
        let new = if line.waitlisted {
            let position =
                RegistrationRepository::next_waitlist_position(&mut *conn, line.camp_id).await?;
            NewRegistration {
                tenant_id: cart.tenant.id,
                camp_id: line.camp_id,
                athlete_id: line.athlete_id,
                parent_id: cart.parent.id,
                status: RegistrationStatus::Waitlisted,
                payment_status: PaymentStatus::Unpaid,
                price_cents: line.price_cents,
                discount_cents: Cents::ZERO,
                promo_code: None,
                payment_ref: None,
                waitlist_position: Some(position),
                paid_at: None,
            }
        } else {
            NewRegistration {
                tenant_id: cart.tenant.id,
                camp_id: line.camp_id,
                athlete_id: line.athlete_id,
                parent_id: cart.parent.id,
                status: RegistrationStatus::Confirmed,
                payment_status: PaymentStatus::Paid,
                price_cents: line.price_cents,
                discount_cents: line.discount_cents,
                promo_code: promo_code.clone().filter(|_| line.discount_cents.is_positive()),
                payment_ref: payment_ref.map(String::from),
                waitlist_position: None,
                paid_at: Some(now),
            }
        };
        registrations.push(RegistrationRepository::insert(&mut *conn, &new).await?);
    }

    if let (Some(promo), Some(_)) = (&prepared.promo, &promo_code) {
        PromoCodeRepository::redeem(&mut *conn, promo.id).await?;
    }

    Ok(registrations)
}

fn build_quote(cart: &Cart, prepared: &PreparedCart) -> CheckoutQuote {
    let lines = prepared
        .pricing
        .lines
        .iter()
        .map(|line| QuoteLine {
            camp_id: line.camp_id,
            camp_name: cart.camps[&line.camp_id].name.clone(),
            athlete_id: line.athlete_id,
            athlete_name: cart.athletes[&line.athlete_id].full_name(),
            price_cents: line.price_cents,
            discount_cents: line.discount_cents,
            total_cents: line.total_cents,
            waitlisted: line.waitlisted,
        })
        .collect();

    CheckoutQuote {
        lines,
        subtotal_cents: prepared.pricing.subtotal_cents,
        discount_cents: prepared.pricing.discount_cents,
        total_cents: prepared.pricing.total_cents,
        promo_code: prepared.promo.as_ref().map(|p| p.code.clone()),
    }
}

fn charge_description(cart: &Cart, pricing: &CartPricing) -> String {
    let names: Vec<&str> = pricing
        .lines
        .iter()
        .filter(|line| !line.waitlisted)
        .filter_map(|line| cart.camps.get(&line.camp_id).map(|c| c.name.as_str()))
        .collect();
    format!("{}: {}", cart.tenant.name, names.join(", "))
}
