//! Telephony provider clients

pub mod dry_run;
pub mod twilio;

pub use dry_run::DryRunProvider;
pub use twilio::{TwilioClient, TwilioSettings};
