//! callflow - IVR call-control service
//!
//! Places outbound calls through Twilio, serves the TwiML call flow that
//! greets the callee and routes a single touch-tone digit, and ends calls on
//! request. A webhook lets a conversational agent trigger calls.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interface;

// Re-export commonly used types
pub use domain::shared::error::DomainError;
pub use domain::shared::result::Result;
