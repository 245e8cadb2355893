use tracing::info;

use super::{NotificationError, NotificationGateway};
use crate::workflows::parcels::domain::PhoneNumber;

/// Logs messages instead of sending them; selected when no provider credentials are configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunGateway;

impl NotificationGateway for DryRunGateway {
    fn send(&self, phone: &PhoneNumber, body: &str) -> Result<(), NotificationError> {
        info!(%phone, body, "SMS provider not configured, message logged only");
        Ok(())
    }
}
