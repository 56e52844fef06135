//! # camp-contracts
//!
//! Validation contracts for CampHQ.
//!
//! A contract checks a set of attributes before a service persists them and
//! reports every problem at once through `ValidationErrors`. The role matrix
//! in [`permissions`] decides who may call which operation.

pub mod athletes;
pub mod base;
pub mod camps;
pub mod checkout;
pub mod incentives;
pub mod permissions;
pub mod promo_codes;
pub mod tenants;
pub mod users;
pub mod venues;

pub use base::{Actor, Contract, UserContext, ValidationResult};
pub use permissions::{authorize, ensure_tenant, Action};
