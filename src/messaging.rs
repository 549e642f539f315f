use crate::api_client::DashboardApi;
use crate::errors::DashboardError;
use phonenumber::country::Id as CountryId;
use phonenumber::Mode;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const WHATSAPP_SENT: &str = "WhatsApp message sent successfully!";
pub const TELEGRAM_SENT: &str = "Telegram message sent successfully!";
pub const SEND_FAILED: &str = "Failed to send message";

/// Inline success/error banner shown after a user action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Banner {
    #[serde(rename = "type")]
    pub kind: BannerKind,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BannerKind {
    Success,
    Error,
}

impl Banner {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: BannerKind::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: BannerKind::Error,
            text: text.into(),
        }
    }

    /// Builds the banner for an action result.
    ///
    /// A rejected request shows the server `detail`, or `fallback` without one.
    /// Failures before any response (transport, timeout) show `Error: <error>`.
    pub fn from_result(result: &Result<(), DashboardError>, success: &str, fallback: &str) -> Self {
        match result {
            Ok(()) => Banner::success(success),
            Err(err) => match err.root() {
                DashboardError::Status { detail, .. } => Banner::error(
                    detail
                        .as_deref()
                        .filter(|d| !d.trim().is_empty())
                        .unwrap_or(fallback),
                ),
                DashboardError::Malformed { .. } => Banner::error(fallback),
                DashboardError::Validation(msg) => Banner::error(msg.clone()),
                other => Banner::error(format!("Error: {}", other)),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.kind == BannerKind::Success
    }
}

/// Outbound WhatsApp message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WhatsAppKind {
    DailySummary,
    BranchPerformance,
    Motivational,
}

impl WhatsAppKind {
    fn endpoint(&self) -> &'static str {
        match self {
            WhatsAppKind::DailySummary => "/api/messaging/whatsapp/daily-summary",
            WhatsAppKind::BranchPerformance => "/api/messaging/whatsapp/branch-performance",
            WhatsAppKind::Motivational => "/api/messaging/whatsapp/motivational",
        }
    }
}

impl FromStr for WhatsAppKind {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.replace('_', "-").as_str() {
            "daily-summary" => Ok(WhatsAppKind::DailySummary),
            "branch-performance" => Ok(WhatsAppKind::BranchPerformance),
            "motivational" => Ok(WhatsAppKind::Motivational),
            other => Err(DashboardError::Validation(format!(
                "unknown WhatsApp message type '{}'",
                other
            ))),
        }
    }
}

/// Outbound Telegram message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TelegramKind {
    DailySummary,
    BranchPerformance,
}

impl TelegramKind {
    fn endpoint(&self) -> &'static str {
        match self {
            TelegramKind::DailySummary => "/api/messaging/telegram/daily-summary",
            TelegramKind::BranchPerformance => "/api/messaging/telegram/branch-performance",
        }
    }
}

impl FromStr for TelegramKind {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.replace('_', "-").as_str() {
            "daily-summary" => Ok(TelegramKind::DailySummary),
            "branch-performance" => Ok(TelegramKind::BranchPerformance),
            other => Err(DashboardError::Validation(format!(
                "unknown Telegram message type '{}'",
                other
            ))),
        }
    }
}

/// Form fields for a messaging action.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageForm {
    #[serde(default)]
    pub to_number: Option<String>,
    #[serde(default)]
    pub branch_name: Option<String>,
}

/// Validates and normalizes a Kenyan phone number to E.164.
///
/// Accepts local (`0712 345 678`) and international (`+254712345678`) forms.
///
/// # Returns
///
/// * `Ok(String)` - The number in E.164 form (`+254712345678`).
/// * `Err(DashboardError::Validation)` - Empty, unparsable or not a valid KE number.
pub fn validate_ke_phone(raw: &str) -> Result<String, DashboardError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DashboardError::Validation(
            "Recipient phone number is required".to_string(),
        ));
    }

    match phonenumber::parse(Some(CountryId::KE), trimmed) {
        Ok(number) => {
            if phonenumber::is_valid(&number) {
                let formatted = number.format().mode(Mode::E164).to_string();
                tracing::debug!("✓ Valid KE phone: {} → {}", trimmed, formatted);
                Ok(formatted)
            } else {
                tracing::warn!("Invalid KE phone number: {}", trimmed);
                Err(DashboardError::Validation(format!(
                    "'{}' is not a valid Kenyan phone number",
                    trimmed
                )))
            }
        }
        Err(e) => {
            tracing::warn!("Failed to parse KE phone '{}': {:?}", trimmed, e);
            Err(DashboardError::Validation(format!(
                "'{}' is not a valid phone number",
                trimmed
            )))
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Builds the query parameters for a WhatsApp send.
pub fn whatsapp_params(
    kind: WhatsAppKind,
    form: &MessageForm,
) -> Result<Vec<(&'static str, String)>, DashboardError> {
    let to_number = validate_ke_phone(form.to_number.as_deref().unwrap_or_default())?;
    let mut params = vec![("to_number", to_number)];

    match (kind, non_blank(form.branch_name.as_deref())) {
        (WhatsAppKind::DailySummary, _) => {}
        (WhatsAppKind::BranchPerformance, None) => {
            return Err(DashboardError::Validation(
                "Branch name is required for branch performance reports".to_string(),
            ))
        }
        (WhatsAppKind::BranchPerformance, Some(branch)) | (WhatsAppKind::Motivational, Some(branch)) => {
            params.push(("branch_name", branch.to_string()))
        }
        (WhatsAppKind::Motivational, None) => {}
    }

    Ok(params)
}

/// Builds the query parameters for a Telegram send.
pub fn telegram_params(
    kind: TelegramKind,
    form: &MessageForm,
) -> Result<Vec<(&'static str, String)>, DashboardError> {
    match (kind, non_blank(form.branch_name.as_deref())) {
        (TelegramKind::DailySummary, _) => Ok(Vec::new()),
        (TelegramKind::BranchPerformance, Some(branch)) => {
            Ok(vec![("branch_name", branch.to_string())])
        }
        (TelegramKind::BranchPerformance, None) => Err(DashboardError::Validation(
            "Branch name is required for branch performance reports".to_string(),
        )),
    }
}

/// Sends a WhatsApp message through the backend.
pub async fn send_whatsapp(
    api: &DashboardApi,
    kind: WhatsAppKind,
    form: &MessageForm,
) -> Result<(), DashboardError> {
    let params = whatsapp_params(kind, form)?;
    api.trigger_message(kind.endpoint(), &params).await
}

/// Sends a Telegram message through the backend.
pub async fn send_telegram(
    api: &DashboardApi,
    kind: TelegramKind,
    form: &MessageForm,
) -> Result<(), DashboardError> {
    let params = telegram_params(kind, form)?;
    api.trigger_message(kind.endpoint(), &params).await
}
