pub mod dry_run;
pub mod twilio;

use chrono::NaiveDateTime;

use crate::workflows::parcels::domain::{PhoneNumber, TrackingCode, SCAN_DATETIME_FORMAT};

pub use dry_run::DryRunGateway;
pub use twilio::{TwilioCredentials, TwilioGateway};

/// Outbound text-message channel. Failures are returned, never panicked, and the caller decides
/// how loudly to report them.
pub trait NotificationGateway: Send + Sync {
    fn send(&self, phone: &PhoneNumber, body: &str) -> Result<(), NotificationError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotificationError {
    #[error("provider rejected message (HTTP {status}): {detail}")]
    Provider { status: u16, detail: String },
    #[error("provider unreachable: {0}")]
    Transport(String),
    #[error("provider misconfigured: {0}")]
    Configuration(String),
}

/// What happened to the message that accompanied a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationStatus {
    Sent,
    Failed(String),
}

impl NotificationStatus {
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }
}

/// Message bodies sent to residents.
#[derive(Debug, Clone)]
pub struct NoticeTemplates {
    building_name: String,
}

impl NoticeTemplates {
    pub fn new(building_name: impl Into<String>) -> Self {
        Self {
            building_name: building_name.into(),
        }
    }

    pub fn arrival(&self, recipient: &str, tracking_code: &TrackingCode) -> String {
        format!(
            "Dear {recipient}, your package ({tracking_code}) has arrived. Please collect it at the {} front desk.",
            self.building_name
        )
    }

    pub fn pickup(
        &self,
        recipient: &str,
        tracking_code: &TrackingCode,
        collected_at: NaiveDateTime,
    ) -> String {
        format!(
            "Dear {recipient}, your package ({tracking_code}) was collected on {}.",
            collected_at.format(SCAN_DATETIME_FORMAT)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn templates_mention_code_and_building() {
        let templates = NoticeTemplates::new("Village Liberdade");
        let code = TrackingCode::parse("BR123").expect("code");

        let arrival = templates.arrival("Ana", &code);
        assert_eq!(
            arrival,
            "Dear Ana, your package (BR123) has arrived. Please collect it at the Village Liberdade front desk."
        );

        let collected_at = NaiveDate::from_ymd_opt(2025, 3, 8)
            .expect("date")
            .and_hms_opt(18, 0, 1)
            .expect("time");
        assert_eq!(
            templates.pickup("Ana", &code, collected_at),
            "Dear Ana, your package (BR123) was collected on 08/03/2025 18:00:01."
        );
    }
}
