//! # camp-services
//!
//! Business logic for CampHQ.
//!
//! Each service borrows the shared [`ServiceContext`] together with the
//! calling user, checks the action against the role matrix, loads rows
//! through the repositories and hides rows of other tenants as not found.
//! Multi-row writes run inside a single transaction.

pub mod accounts;
pub mod athletes;
pub mod base;
pub mod camps;
pub mod checkin;
pub mod checkout;
pub mod context;
pub mod dashboard;
pub mod grouping;
pub mod incentives;
pub mod overview;
pub mod payments;
pub mod promo_codes;
pub mod registrations;
pub mod royalties;
pub mod staff;
pub mod tenants;
pub mod venues;

pub use accounts::AccountService;
pub use athletes::AthleteService;
pub use camps::CampService;
pub use checkin::{CheckInService, KioskRegistry};
pub use checkout::CheckoutService;
pub use context::{DomainCounters, ServiceContext, ServiceSettings};
pub use dashboard::DashboardService;
pub use grouping::GroupingService;
pub use incentives::IncentiveService;
pub use overview::OverviewService;
pub use payments::{ManualGateway, PaymentGateway};
pub use promo_codes::PromoCodeService;
pub use registrations::RegistrationService;
pub use royalties::RoyaltyService;
pub use staff::StaffService;
pub use tenants::TenantService;
pub use venues::{ContractService, VenueService};
