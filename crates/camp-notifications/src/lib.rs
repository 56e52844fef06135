//! # camp-notifications
//!
//! Outbound transactional email for CampHQ.
//!
//! Messages are short plain-text bodies rendered from typed data. Delivery
//! goes through the `EmailSender` trait; callers treat delivery as
//! fire-and-report, so a failed send is logged and never fails the request
//! that triggered it.

pub mod email;
pub mod templates;

pub use email::{
    deliver, sender_from_config, EmailAddress, EmailError, EmailMessage, EmailResult, EmailSender,
    LogEmailSender, MemoryEmailSender,
};
pub use templates::{
    CheckoutConfirmation, ConfirmationLine, ContractSent, InvoiceIssued, Mailer, WaitlistPromotion,
};
