//! Infrastructure layer - Technical implementations
//!
//! This layer contains:
//! - Call record store implementations (memory, PostgreSQL)
//! - Telephony provider clients
//! - TwiML rendering
//! - Outbound HTTP to the origination endpoint

pub mod origination_client;
pub mod persistence;
pub mod telephony;
pub mod twiml;
