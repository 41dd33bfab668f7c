//! Outbound account notifications.
//!
//! - [`Mailer`]: the seam background workers send through.
//! - [`EmailDelivery`]: SMTP implementation backed by `lettre`.
//! - [`lifecycle`]: onboarding nudge templates.

pub mod delivery;
pub mod lifecycle;

pub use delivery::email::{EmailConfig, EmailDelivery, EmailError};
pub use delivery::{Mailer, OutgoingEmail};
pub use lifecycle::{LifecycleNudge, NudgeRecipient};
