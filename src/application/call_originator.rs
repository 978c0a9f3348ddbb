//! Provider adapter for placing and ending calls

use crate::domain::shared::{CallSid, PhoneNumber, Result};
use crate::domain::telephony::TelephonyProvider;
use std::sync::Arc;
use tracing::{error, info};

/// Thin wrapper over the telephony provider. No recording, no retries.
pub struct CallOriginator {
    provider: Arc<dyn TelephonyProvider>,
}

impl CallOriginator {
    pub fn new(provider: Arc<dyn TelephonyProvider>) -> Self {
        Self { provider }
    }

    pub async fn originate(&self, destination: &PhoneNumber, callback_url: &str) -> Result<CallSid> {
        info!(to = %destination, callback = callback_url, "Placing outbound call");

        match self.provider.place_call(destination, callback_url).await {
            Ok(call_id) => {
                info!(to = %destination, call_id = %call_id, "Outbound call placed");
                Ok(call_id)
            }
            Err(e) => {
                error!(to = %destination, error = %e, "Outbound call rejected");
                Err(e)
            }
        }
    }

    /// End `call_id`, returning the destination number
    pub async fn terminate(&self, call_id: &CallSid) -> Result<String> {
        info!(call_id = %call_id, "Terminating call");

        match self.provider.hangup(call_id).await {
            Ok(destination) => {
                info!(call_id = %call_id, to = %destination, "Call terminated");
                Ok(destination)
            }
            Err(e) => {
                error!(call_id = %call_id, error = %e, "Call termination rejected");
                Err(e)
            }
        }
    }
}
