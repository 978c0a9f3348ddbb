//! Provider that places no real calls
//!
//! Selected when no provider credentials are configured. Issues Twilio-shaped
//! call ids and remembers which calls are "in progress" so hangups behave like
//! the real API: ending an unknown or already-ended call is a provider error.
//! Calls that are never hung up expire after the provider's maximum call
//! duration.

use crate::domain::shared::{CallSid, DomainError, PhoneNumber, Result};
use crate::domain::telephony::TelephonyProvider;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use uuid::Uuid;

/// Twilio ends any call after four hours
pub const MAX_CALL_DURATION: Duration = Duration::from_secs(4 * 60 * 60);

struct LiveCall {
    to: PhoneNumber,
    placed_at: Instant,
}

pub struct DryRunProvider {
    live: Mutex<HashMap<CallSid, LiveCall>>,
    max_duration: Duration,
}

impl Default for DryRunProvider {
    fn default() -> Self {
        Self::with_max_duration(MAX_CALL_DURATION)
    }
}

impl DryRunProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_duration(max_duration: Duration) -> Self {
        Self {
            live: Mutex::new(HashMap::new()),
            max_duration,
        }
    }

    pub fn live_calls(&self) -> usize {
        self.live.lock().map(|live| live.len()).unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<CallSid, LiveCall>>> {
        self.live
            .lock()
            .map_err(|_| DomainError::Provider("dry run state poisoned".to_string()))
    }
}

#[async_trait]
impl TelephonyProvider for DryRunProvider {
    async fn place_call(&self, to: &PhoneNumber, callback_url: &str) -> Result<CallSid> {
        let call_id = CallSid::parse(format!("CA{}", Uuid::new_v4().simple()))?;
        info!(to = %to, call_id = %call_id, callback = callback_url, "Dry run: call placed");

        let mut live = self.lock()?;
        let before = live.len();
        live.retain(|_, call| call.placed_at.elapsed() < self.max_duration);
        if live.len() < before {
            debug!(expired = before - live.len(), "Dry run: expired calls dropped");
        }

        live.insert(
            call_id.clone(),
            LiveCall {
                to: to.clone(),
                placed_at: Instant::now(),
            },
        );
        Ok(call_id)
    }

    async fn hangup(&self, call_id: &CallSid) -> Result<String> {
        let removed = self
            .lock()?
            .remove(call_id)
            .filter(|call| call.placed_at.elapsed() < self.max_duration);

        match removed {
            Some(call) => {
                info!(call_id = %call_id, "Dry run: call ended");
                Ok(call.to.as_str().to_string())
            }
            None => Err(DomainError::Provider(format!(
                "call {} is not in progress",
                call_id
            ))),
        }
    }
}
