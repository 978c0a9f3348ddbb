//! Application layer - Use cases and application services
//!
//! This layer orchestrates domain objects to fulfill use cases:
//! - Placing and ending calls through the provider
//! - Recording and binding originated calls
//! - Bridging agent intents to call origination

pub mod call_dispatcher;
pub mod call_originator;
pub mod intent_bridge;

pub use call_dispatcher::{CallDispatcher, DispatchSettings, OriginateRequest, TerminateTarget, TerminatedCall};
pub use call_originator::CallOriginator;
pub use intent_bridge::{IntentBridge, IntentReplies};
