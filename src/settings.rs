use crate::api_client::DashboardApi;
use crate::errors::{DashboardError, ResultExt};
use crate::models::SettingsStatus;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Credentials accepted by `POST /api/settings/update`.
///
/// Write-only: values are forwarded once and never read back or logged.
#[derive(Clone, Default, Deserialize, Serialize)]
pub struct SettingsUpdate {
    #[serde(default, skip_serializing_if = "is_blank", serialize_with = "trimmed")]
    pub openai_api_key: Option<String>,
    #[serde(default, skip_serializing_if = "is_blank", serialize_with = "trimmed")]
    pub twilio_account_sid: Option<String>,
    #[serde(default, skip_serializing_if = "is_blank", serialize_with = "trimmed")]
    pub twilio_auth_token: Option<String>,
    #[serde(default, skip_serializing_if = "is_blank", serialize_with = "trimmed")]
    pub twilio_phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "is_blank", serialize_with = "trimmed")]
    pub telegram_bot_token: Option<String>,
    #[serde(default, skip_serializing_if = "is_blank", serialize_with = "trimmed")]
    pub telegram_chat_id: Option<String>,
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |v| v.trim().is_empty())
}

fn trimmed<S: Serializer>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(value.as_deref().unwrap_or_default().trim())
}

impl SettingsUpdate {
    fn fields(&self) -> [(&'static str, &Option<String>); 6] {
        [
            ("openai_api_key", &self.openai_api_key),
            ("twilio_account_sid", &self.twilio_account_sid),
            ("twilio_auth_token", &self.twilio_auth_token),
            ("twilio_phone_number", &self.twilio_phone_number),
            ("telegram_bot_token", &self.telegram_bot_token),
            ("telegram_chat_id", &self.telegram_chat_id),
        ]
    }

    /// Names of the fields that will actually be sent.
    pub fn provided(&self) -> Vec<&'static str> {
        self.fields()
            .into_iter()
            .filter(|(_, value)| !is_blank(value))
            .map(|(name, _)| name)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.provided().is_empty()
    }
}

impl fmt::Debug for SettingsUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("SettingsUpdate");
        for (name, value) in self.fields() {
            debug.field(name, &if is_blank(value) { "<unset>" } else { "<redacted>" });
        }
        debug.finish()
    }
}

pub const SETTINGS_SAVED: &str = "Settings saved successfully!";
pub const SAVE_FAILED: &str = "Failed to save settings";

/// Forwards the provided credentials to the backend.
pub async fn save(api: &DashboardApi, update: &SettingsUpdate) -> Result<(), DashboardError> {
    if update.is_empty() {
        return Err(DashboardError::Validation(
            "No settings provided".to_string(),
        ));
    }
    tracing::info!("Saving settings: {:?}", update.provided());
    api.update_settings(update)
        .await
        .context("Settings update")
        .inspect_err(|e| tracing::warn!("{}", e))
}

/// Configured flags in display order, with unknown keys last.
pub fn configured_flags(status: &SettingsStatus) -> Vec<(String, bool)> {
    let known = SettingsUpdate::default();
    let mut rows: Vec<(String, bool)> = known
        .fields()
        .into_iter()
        .filter_map(|(name, _)| status.configured.get(name).map(|v| (name.to_string(), *v)))
        .collect();
    rows.extend(
        status
            .configured
            .iter()
            .filter(|(key, _)| !known.fields().iter().any(|(name, _)| *name == key.as_str()))
            .map(|(key, value)| (key.clone(), *value)),
    );
    rows
}
