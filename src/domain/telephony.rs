//! Telephony provider port

use super::shared::{CallSid, PhoneNumber, Result};

/// Outbound call operations offered by the provider.
///
/// Implementations report every rejection (unknown call, call already ended,
/// bad credentials, transport failure) as `DomainError::Provider`.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait TelephonyProvider: Send + Sync {
    /// Place a call to `to`; the provider fetches `callback_url` on answer
    async fn place_call(&self, to: &PhoneNumber, callback_url: &str) -> Result<CallSid>;

    /// End an in-progress call, returning the number it was connected to
    async fn hangup(&self, call_id: &CallSid) -> Result<String>;
}
