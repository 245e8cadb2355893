use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use super::{NotificationError, NotificationGateway};
use crate::workflows::parcels::domain::PhoneNumber;

pub const DEFAULT_TWILIO_API_BASE: &str = "https://api.twilio.com";

/// Account credentials and sender number for the Twilio messaging API.
#[derive(Clone, PartialEq, Eq)]
pub struct TwilioCredentials {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

impl fmt::Debug for TwilioCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwilioCredentials")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"<redacted>")
            .field("from_number", &self.from_number)
            .finish()
    }
}

/// Sends SMS through Twilio's REST API using a blocking client, so it must not be called from
/// inside an async runtime.
pub struct TwilioGateway {
    credentials: TwilioCredentials,
    messages_url: String,
    http_client: reqwest::blocking::Client,
}

impl TwilioGateway {
    pub fn new(
        credentials: TwilioCredentials,
        api_base: &str,
    ) -> Result<Self, NotificationError> {
        if credentials.account_sid.trim().is_empty() || credentials.auth_token.trim().is_empty()
        {
            return Err(NotificationError::Configuration(
                "account sid and auth token must not be empty".to_string(),
            ));
        }

        let http_client = reqwest::blocking::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| NotificationError::Configuration(err.to_string()))?;

        let messages_url = format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            api_base.trim_end_matches('/'),
            credentials.account_sid
        );

        Ok(Self {
            credentials,
            messages_url,
            http_client,
        })
    }
}

impl fmt::Debug for TwilioGateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwilioGateway")
            .field("messages_url", &self.messages_url)
            .finish_non_exhaustive()
    }
}

impl NotificationGateway for TwilioGateway {
    fn send(&self, phone: &PhoneNumber, body: &str) -> Result<(), NotificationError> {
        let form = [
            ("To", phone.as_str()),
            ("From", self.credentials.from_number.as_str()),
            ("Body", body),
        ];

        let response = self
            .http_client
            .post(&self.messages_url)
            .basic_auth(
                &self.credentials.account_sid,
                Some(&self.credentials.auth_token),
            )
            .form(&form)
            .send()
            .map_err(|err| NotificationError::Transport(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            debug!(%phone, status = status.as_u16(), "twilio accepted message");
            return Ok(());
        }

        let raw = response.text().unwrap_or_default();
        Err(NotificationError::Provider {
            status: status.as_u16(),
            detail: provider_detail(&raw),
        })
    }
}

#[derive(Debug, Deserialize)]
struct TwilioErrorBody {
    message: Option<String>,
    code: Option<u32>,
}

fn provider_detail(raw: &str) -> String {
    match serde_json::from_str::<TwilioErrorBody>(raw) {
        Ok(TwilioErrorBody {
            message: Some(message),
            code: Some(code),
        }) => format!("{message} (code {code})"),
        Ok(TwilioErrorBody {
            message: Some(message),
            code: None,
        }) => message,
        _ if raw.trim().is_empty() => "empty response body".to_string(),
        _ => raw.trim().to_string(),
    }
}
