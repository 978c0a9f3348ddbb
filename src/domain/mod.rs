//! Domain layer - Core business logic and rules
//!
//! This layer contains:
//! - Value Objects: call ids, session keys, phone numbers
//! - Repository Interfaces: the call record store port
//! - Domain Services: the voice flow engine and session tracker
//! - Ports to external systems: telephony provider, origination client

pub mod call_record;
pub mod intent;
pub mod session;
pub mod shared;
pub mod telephony;
pub mod voice_document;
pub mod voice_flow;

// Re-export commonly used types
pub use shared::{DomainError, Result};
