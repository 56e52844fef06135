//! # camp-db
//!
//! PostgreSQL access for CampHQ using SQLx:
//!
//! - Connection pool and embedded migrations
//! - One repository per table family, returning domain models
//! - Aggregate queries behind royalties and the dashboards
//!
//! Status columns are TEXT and are parsed back into their enums when a row
//! is converted; a value that no longer parses surfaces as
//! `RepositoryError::InvalidData`.
//!
//! ## Example
//!
//! ```ignore
//! use camp_db::{CampRepository, Database, Repository};
//!
//! let db = Database::connect(&config.database).await?;
//! db.migrate().await?;
//!
//! let camps = CampRepository::new(db.pool().clone());
//! let camp = camps.get(42).await?;
//! ```

pub mod athletes;
pub mod attendance;
pub mod camps;
pub mod dashboard;
pub mod groups;
pub mod incentives;
pub mod pool;
pub mod promo_codes;
pub mod registrations;
pub mod repository;
pub mod royalties;
pub mod tenants;
pub mod users;
pub mod venues;

pub use athletes::{AthleteRepository, AthleteValues};
pub use attendance::{AttendanceRepository, CheckInTarget};
pub use camps::{CampRepository, CampValues, CampWithEnrollment};
pub use dashboard::{CampLoad, DashboardRepository};
pub use groups::{GroupMember, GroupRepository, NewGroup};
pub use incentives::{IncentiveRepository, NewPayout, PlanValues};
pub use pool::{Database, PoolStats};
pub use promo_codes::{NewPromoCode, PromoCodeRepository};
pub use registrations::{
    Camper, NewRefund, NewRegistration, RegistrationFilter, RegistrationRepository,
};
pub use repository::{is_unique_violation, Repository, RepositoryError, RepositoryResult};
pub use royalties::{NewInvoice, RevenueTotals, RoyaltyRepository};
pub use tenants::{TenantRepository, TenantValues};
pub use users::{NewUser, UserRepository};
pub use venues::{ContractRepository, ContractValues, VenueRepository, VenueValues};

pub use sqlx::{PgConnection, PgPool, Postgres, Transaction};
