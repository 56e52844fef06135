//! Shared service dependencies
//!
//! One `ServiceContext` is built at startup and cloned into every request.
//! Services borrow it together with the calling user.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use camp_core::config::AppConfig;
use camp_core::{BasisPoints, CampResult, Cents};
use camp_db::{
    AthleteRepository, AttendanceRepository, CampRepository, ContractRepository,
    DashboardRepository, GroupRepository, IncentiveRepository, PgPool, PromoCodeRepository,
    Postgres, RegistrationRepository, RepositoryError, RoyaltyRepository, TenantRepository,
    Transaction, UserRepository, VenueRepository,
};
use camp_notifications::{deliver, EmailMessage, EmailSender, Mailer};
use camp_storage::Storage;

use crate::checkin::kiosk::KioskRegistry;
use crate::payments::PaymentGateway;

/// Settings services read from configuration
#[derive(Debug, Clone, Copy)]
pub struct ServiceSettings {
    pub default_royalty_rate: BasisPoints,
    pub default_minimum_royalty: Cents,
    pub password_min_length: usize,
    pub max_upload_bytes: usize,
}

impl ServiceSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            default_royalty_rate: config.default_royalty_rate(),
            default_minimum_royalty: config.default_minimum_royalty(),
            password_min_length: config.auth.password_min_length,
            max_upload_bytes: config.storage.max_upload_bytes,
        }
    }
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            default_royalty_rate: BasisPoints::percent(8),
            default_minimum_royalty: Cents::ZERO,
            password_min_length: camp_contracts::users::MIN_PASSWORD_LENGTH,
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Business event counters exported on `/metrics`
#[derive(Debug, Default)]
pub struct DomainCounters {
    pub checkouts: AtomicU64,
    pub registrations_created: AtomicU64,
    pub check_ins: AtomicU64,
    pub waitlist_promotions: AtomicU64,
    pub refunds: AtomicU64,
}

impl DomainCounters {
    pub fn incr(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }

    pub fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}

#[derive(Clone)]
pub struct ServiceContext {
    pool: PgPool,
    pub payments: Arc<dyn PaymentGateway>,
    pub email: Arc<dyn EmailSender>,
    pub mailer: Mailer,
    pub storage: Arc<dyn Storage>,
    pub kiosks: Arc<KioskRegistry>,
    pub counters: Arc<DomainCounters>,
    pub settings: ServiceSettings,
}

impl ServiceContext {
    pub fn new(
        pool: PgPool,
        payments: Arc<dyn PaymentGateway>,
        email: Arc<dyn EmailSender>,
        mailer: Mailer,
        storage: Arc<dyn Storage>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            pool,
            payments,
            email,
            mailer,
            storage,
            kiosks: Arc::new(KioskRegistry::new()),
            counters: Arc::new(DomainCounters::default()),
            settings,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn begin(&self) -> CampResult<Transaction<'static, Postgres>> {
        Ok(self.pool.begin().await.map_err(RepositoryError::from)?)
    }

    /// Current UTC calendar date
    pub fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }

    /// Fire-and-report delivery
    pub async fn send_email(&self, message: EmailMessage) -> bool {
        deliver(self.email.as_ref(), message).await
    }

    pub fn tenants(&self) -> TenantRepository {
        TenantRepository::new(self.pool.clone())
    }

    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.pool.clone())
    }

    pub fn camps(&self) -> CampRepository {
        CampRepository::new(self.pool.clone())
    }

    pub fn athletes(&self) -> AthleteRepository {
        AthleteRepository::new(self.pool.clone())
    }

    pub fn registrations(&self) -> RegistrationRepository {
        RegistrationRepository::new(self.pool.clone())
    }

    pub fn promo_codes(&self) -> PromoCodeRepository {
        PromoCodeRepository::new(self.pool.clone())
    }

    pub fn venues(&self) -> VenueRepository {
        VenueRepository::new(self.pool.clone())
    }

    pub fn contracts(&self) -> ContractRepository {
        ContractRepository::new(self.pool.clone())
    }

    pub fn incentives(&self) -> IncentiveRepository {
        IncentiveRepository::new(self.pool.clone())
    }

    pub fn attendance(&self) -> AttendanceRepository {
        AttendanceRepository::new(self.pool.clone())
    }

    pub fn groups(&self) -> GroupRepository {
        GroupRepository::new(self.pool.clone())
    }

    pub fn royalties(&self) -> RoyaltyRepository {
        RoyaltyRepository::new(self.pool.clone())
    }

    pub fn dashboard(&self) -> DashboardRepository {
        DashboardRepository::new(self.pool.clone())
    }
}
