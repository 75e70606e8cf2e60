use tracing::{debug, info, warn};

use crate::client::{ApiClient, ApiFailure};
use crate::error::{PaymentError, PaymentResult};
use crate::identity::SessionManager;

use super::model::{
    id_string, parse_timestamp, ConfirmBody, ConfirmWire, DonationId, DonationRequest, GatewayOutcome, IntentBody,
    IntentStatus, IntentWire, PaymentIntent, PaymentMethod,
};

pub const INTENT_PATH: &str = "api/payments/intent";
pub const CONFIRM_PATH: &str = "api/payments/confirm";
pub const CANCEL_PATH_PREFIX: &str = "api/payments/cancel/";

const SIGN_IN_MESSAGE: &str = "Please sign in to make a donation.";

/// The three payment endpoints, authorized with the current session's access token.
/// Stateless: ordering rules live in `PaymentIntentFlow`.
#[derive(Clone)]
pub struct PaymentsApi {
    client: ApiClient,
    session: SessionManager,
    currency: String,
}

impl PaymentsApi {
    pub fn new(session: SessionManager, currency: impl Into<String>) -> Self {
        Self { client: session.client().clone(), session, currency: currency.into() }
    }

    pub fn currency(&self) -> &str { &self.currency }

    pub async fn create_intent(&self, req: &DonationRequest) -> PaymentResult<PaymentIntent> {
        if !req.amount.is_finite() || req.amount <= 0.0 {
            return Err(PaymentError::intent_creation("Donation amount must be greater than zero."));
        }
        if req.donation_cause.trim().is_empty() {
            return Err(PaymentError::intent_creation("Please choose a cause for your donation."));
        }
        let token = self.session.authorized_token().await
            .ok_or_else(|| PaymentError::unauthenticated(SIGN_IN_MESSAGE))?;
        let body = IntentBody {
            amount: req.amount,
            currency: &self.currency,
            donation_cause: req.donation_cause.trim(),
            donation_text: req.donation_text.as_deref(),
            event_id: req.event_id.as_deref(),
        };
        let wire: IntentWire = self.client
            .post_json(INTENT_PATH, &body, Some(&token))
            .await
            .and_then(|r| r.json())
            .map_err(|f| {
                warn!(error = %f, "payment intent creation failed");
                PaymentError::intent_creation(match &f {
                    ApiFailure::Network(_) => "Could not start the payment. Check your connection and try again.".to_string(),
                    _ => f.server_message().map(str::to_string).unwrap_or_else(|| "Could not start the payment. Please try again later.".into()),
                })
            })?;
        let Some(id) = id_string(wire.payment_intent_id.as_ref()) else {
            warn!("payment intent response carried no id");
            return Err(PaymentError::intent_creation("Could not start the payment. Please try again later."));
        };
        if let Some(s) = &wire.status { debug!(status = %s, "server intent status"); }
        let intent = PaymentIntent {
            payment_intent_id: id,
            amount: wire.amount.unwrap_or(req.amount),
            currency: wire.currency.unwrap_or_else(|| self.currency.clone()),
            status: IntentStatus::Created,
            expires_at: wire.expires_at.as_ref().and_then(parse_timestamp),
        };
        info!(intent = %intent.payment_intent_id, amount = intent.amount, currency = %intent.currency, "payment intent created");
        Ok(intent)
    }

    pub async fn confirm(&self, payment_intent_id: &str, method: PaymentMethod, outcome: &GatewayOutcome) -> PaymentResult<DonationId> {
        let token = self.session.authorized_token().await
            .ok_or_else(|| PaymentError::unauthenticated(SIGN_IN_MESSAGE))?;
        let body = ConfirmBody {
            payment_intent_id,
            payment_method: method,
            success: outcome.success,
            transaction_id: &outcome.transaction_id,
            gateway_response: &outcome.gateway_response,
        };
        let wire: ConfirmWire = self.client
            .post_json(CONFIRM_PATH, &body, Some(&token))
            .await
            .and_then(|r| r.json())
            .map_err(|f| {
                warn!(intent = payment_intent_id, error = %f, "payment confirmation failed");
                confirm_failure(&f)
            })?;
        match id_string(wire.donation_id.as_ref()) {
            Some(id) => {
                info!(intent = payment_intent_id, donation = %id, "payment confirmed");
                Ok(DonationId(id))
            }
            None => Err(PaymentError::confirmation("The payment was not confirmed and no donation was recorded. You can retry or cancel.")),
        }
    }

    /// Best-effort close of an intent on the server. Never fails.
    pub async fn cancel(&self, payment_intent_id: &str) {
        let Some(token) = self.session.authorized_token().await else {
            warn!(intent = payment_intent_id, "no valid session after refresh; skipping server-side cancel");
            return;
        };
        let path = format!("{}{}", CANCEL_PATH_PREFIX, urlencoding::encode(payment_intent_id));
        match self.client.post_empty(&path, Some(&token)).await {
            Ok(_) => info!(intent = payment_intent_id, "payment intent cancelled"),
            Err(f) => warn!(intent = payment_intent_id, error = %f, "server-side cancel failed; flow closed anyway"),
        }
    }
}

// 410 Gone, or a rejection that says so, means the intent's window has passed.
fn confirm_failure(f: &ApiFailure) -> PaymentError {
    match f {
        ApiFailure::Network(_) => PaymentError::confirmation("Could not reach the server to confirm the payment. You can retry or cancel."),
        ApiFailure::Status { status, message } => {
            let mentions_expiry = message.as_deref().map(|m| m.to_ascii_lowercase().contains("expired")).unwrap_or(false);
            if *status == 410 || mentions_expiry {
                PaymentError::expired(message.clone().unwrap_or_else(|| "This payment request has expired. Please start a new donation.".into()))
            } else {
                PaymentError::confirmation(message.clone().unwrap_or_else(|| "Payment confirmation failed. You can retry or cancel.".into()))
            }
        }
        ApiFailure::Decode(_) => PaymentError::confirmation("Unexpected response while confirming the payment. You can retry or cancel."),
        ApiFailure::Endpoint(_) => PaymentError::confirmation("The server address is not configured correctly."),
    }
}
