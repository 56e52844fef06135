//! API request handlers, one module per resource area

pub mod athletes;
pub mod auth;
pub mod camps;
pub mod checkin;
pub mod promo_codes;
pub mod public;
pub mod registrations;
pub mod reports;
pub mod staff;
pub mod tenants;
pub mod venues;
