//! # camp-core
//!
//! Foundational building blocks shared by every CampHQ crate:
//! - error types and the HTTP status each one maps to
//! - `ServiceResult` for service objects
//! - core traits (`Identifiable`, `Timestamped`, `TenantScoped`)
//! - exact money (`Cents`, `BasisPoints`)
//! - date ranges and reporting periods
//! - pagination
//! - configuration loading

pub mod config;
pub mod dates;
pub mod error;
pub mod money;
pub mod pagination;
pub mod result;
pub mod traits;

pub use dates::{DateRange, ReportingPeriod};
pub use error::*;
pub use money::{BasisPoints, Cents};
pub use pagination::*;
pub use result::*;
pub use traits::*;
