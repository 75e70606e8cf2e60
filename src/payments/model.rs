use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// What the donor asked to give. Copied into the flow when the intent is created and not
/// changed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationRequest {
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub donation_text: Option<String>,
    pub donation_cause: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
}

impl DonationRequest {
    pub fn new(amount: f64, donation_cause: impl Into<String>) -> Self {
        Self { amount, donation_text: None, donation_cause: donation_cause.into(), event_id: None }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.donation_text = if text.trim().is_empty() { None } else { Some(text) };
        self
    }

    pub fn for_event(mut self, event_id: impl Into<String>) -> Self {
        self.event_id = Some(event_id.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentStatus {
    Created,
    Confirmed,
    Cancelled,
    Expired,
}

impl IntentStatus {
    pub fn is_terminal(&self) -> bool { !matches!(self, IntentStatus::Created) }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    pub payment_intent_id: String,
    pub amount: f64,
    pub currency: String,
    pub status: IntentStatus,
    /// Server-assigned deadline for confirmation, when the server sent a parsable one.
    pub expires_at: Option<DateTime<Utc>>,
}

impl PaymentIntent {
    /// Client-side view only; the server is the judge of expiry.
    pub fn appears_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|t| t < now).unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    MobileMoney,
    Card,
    BankTransfer,
}

impl PaymentMethod {
    pub fn parse(s: &str) -> Option<PaymentMethod> {
        match s.trim().to_ascii_uppercase().replace(['-', ' '], "_").as_str() {
            "MOBILE_MONEY" | "MOMO" => Some(PaymentMethod::MobileMoney),
            "CARD" => Some(PaymentMethod::Card),
            "BANK_TRANSFER" | "BANK" => Some(PaymentMethod::BankTransfer),
            _ => None,
        }
    }
}

/// Result of the externally handled payment step, reported back on confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOutcome {
    pub success: bool,
    pub transaction_id: String,
    pub gateway_response: String,
}

impl GatewayOutcome {
    pub fn succeeded(transaction_id: impl Into<String>, gateway_response: impl Into<String>) -> Self {
        Self { success: true, transaction_id: transaction_id.into(), gateway_response: gateway_response.into() }
    }

    pub fn failed(transaction_id: impl Into<String>, gateway_response: impl Into<String>) -> Self {
        Self { success: false, transaction_id: transaction_id.into(), gateway_response: gateway_response.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DonationId(pub String);

impl std::fmt::Display for DonationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(&self.0) }
}

// --- wire shapes ---

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct IntentBody<'a> {
    pub amount: f64,
    pub currency: &'a str,
    pub donation_cause: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub donation_text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct IntentWire {
    #[serde(default)]
    pub payment_intent_id: Option<serde_json::Value>,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub expires_at: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConfirmBody<'a> {
    pub payment_intent_id: &'a str,
    pub payment_method: PaymentMethod,
    pub success: bool,
    pub transaction_id: &'a str,
    pub gateway_response: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConfirmWire {
    #[serde(default)]
    pub donation_id: Option<serde_json::Value>,
}

/// Ids arrive as strings or numbers; blanks and nulls count as missing.
pub(crate) fn id_string(v: Option<&serde_json::Value>) -> Option<String> {
    match v? {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// RFC 3339, zone-less ISO date-time (taken as UTC), or epoch milliseconds.
pub fn parse_timestamp(v: &serde_json::Value) -> Option<DateTime<Utc>> {
    match v {
        serde_json::Value::String(s) => {
            let s = s.trim();
            if let Ok(t) = DateTime::parse_from_rfc3339(s) {
                return Some(t.with_timezone(&Utc));
            }
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
                .ok()
                .map(|n| n.and_utc())
        }
        serde_json::Value::Number(n) => n.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
        _ => None,
    }
}
