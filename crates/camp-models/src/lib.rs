//! # camp-models
//!
//! Domain entities and their status enums.
//!
//! Entities are plain structs; persistence lives in `camp-db`, which maps
//! rows onto these types. Status enums are stored as snake_case text and
//! implement `StatusFlow` so every transition is checked in one place.

pub use camp_core::traits::{Entity, Id, Identifiable, StatusFlow, TenantScoped, Timestamped};

/// Text-backed enum with `as_str`, `FromStr`, `Display` and snake_case serde
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = camp_core::CampError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($text => Ok($name::$variant),)+
                    other => Err(camp_core::CampError::invalid(
                        "status",
                        format!("unknown {} '{}'", stringify!($name), other),
                    )),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

pub mod athlete;
pub mod attendance;
pub mod camp;
pub mod group;
pub mod incentive;
pub mod promo;
pub mod registration;
pub mod royalty;
pub mod tenant;
pub mod user;
pub mod venue;

pub use athlete::Athlete;
pub use attendance::{AttendanceRecord, AttendanceState};
pub use camp::{Camp, CampStatus};
pub use group::{CamperGroup, GroupStrategy};
pub use incentive::{CompensationPlan, StaffAssignment, StaffPayout, StaffRole};
pub use promo::{DiscountKind, PromoCode};
pub use registration::{PaymentStatus, Refund, Registration, RegistrationStatus};
pub use royalty::{InvoiceStatus, RoyaltyInvoice};
pub use tenant::{Tenant, TenantStatus};
pub use user::{Role, User};
pub use venue::{ContractStatus, Venue, VenueContract};
