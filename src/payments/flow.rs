use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::{PaymentError, PaymentErrorKind, PaymentResult};

use super::api::PaymentsApi;
use super::model::{DonationId, DonationRequest, GatewayOutcome, IntentStatus, PaymentIntent, PaymentMethod};

#[derive(Debug, Clone, PartialEq)]
pub enum FlowState {
    /// No intent requested yet.
    Idle,
    /// Intent created and awaiting confirmation or cancellation.
    Open { intent: PaymentIntent, request: DonationRequest },
    Confirmed { intent: PaymentIntent, donation_id: DonationId },
    /// Closed without a donation; `intent` is None when creation never succeeded.
    Cancelled { intent: Option<PaymentIntent> },
    Expired { intent: PaymentIntent },
}

impl FlowState {
    pub fn status(&self) -> Option<IntentStatus> {
        match self {
            FlowState::Idle => None,
            FlowState::Open { .. } => Some(IntentStatus::Created),
            FlowState::Confirmed { .. } => Some(IntentStatus::Confirmed),
            FlowState::Cancelled { .. } => Some(IntentStatus::Cancelled),
            FlowState::Expired { .. } => Some(IntentStatus::Expired),
        }
    }

    pub fn is_terminal(&self) -> bool { self.status().map(|s| s.is_terminal()).unwrap_or(false) }
}

#[derive(Debug)]
struct Inner {
    state: FlowState,
    // a create or confirm call is awaiting the server
    in_flight: bool,
}

/// One donation attempt: at most one intent, confirmed or closed exactly once.
///
/// Handles are cloneable so a dialog can cancel while a confirmation is still awaiting the
/// server; whichever transition lands first wins and a late response is discarded.
#[derive(Clone)]
pub struct PaymentIntentFlow {
    api: PaymentsApi,
    inner: Arc<Mutex<Inner>>,
}

impl PaymentIntentFlow {
    pub fn new(api: PaymentsApi) -> Self {
        Self { api, inner: Arc::new(Mutex::new(Inner { state: FlowState::Idle, in_flight: false })) }
    }

    pub fn state(&self) -> FlowState { self.inner.lock().state.clone() }

    pub fn status(&self) -> Option<IntentStatus> { self.inner.lock().state.status() }

    pub fn is_terminal(&self) -> bool { self.inner.lock().state.is_terminal() }

    pub fn intent(&self) -> Option<PaymentIntent> {
        match &self.inner.lock().state {
            FlowState::Idle => None,
            FlowState::Open { intent, .. } | FlowState::Confirmed { intent, .. } | FlowState::Expired { intent } => Some(intent.clone()),
            FlowState::Cancelled { intent } => intent.clone(),
        }
    }

    pub fn donation_id(&self) -> Option<DonationId> {
        match &self.inner.lock().state {
            FlowState::Confirmed { donation_id, .. } => Some(donation_id.clone()),
            _ => None,
        }
    }

    /// Open the attempt's single intent. Any failure closes the attempt.
    pub async fn create_intent(&self, request: DonationRequest) -> PaymentResult<PaymentIntent> {
        {
            let mut g = self.inner.lock();
            if g.in_flight || g.state != FlowState::Idle {
                return Err(PaymentError::invalid_state("A payment has already been started for this donation."));
            }
            g.in_flight = true;
        }
        let result = self.api.create_intent(&request).await;

        let orphan = {
            let mut g = self.inner.lock();
            g.in_flight = false;
            if g.state != FlowState::Idle {
                // closed while the request was out; keep it closed
                result.ok()
            } else {
                return match result {
                    Ok(intent) => {
                        g.state = FlowState::Open { intent: intent.clone(), request };
                        Ok(intent)
                    }
                    Err(e) => {
                        info!(code = e.code_str(), "donation attempt aborted at intent creation");
                        g.state = FlowState::Cancelled { intent: None };
                        Err(e)
                    }
                };
            }
        };
        if let Some(intent) = orphan {
            debug!(intent = %intent.payment_intent_id, "closing intent created after the flow was cancelled");
            self.api.cancel(&intent.payment_intent_id).await;
        }
        Err(PaymentError::invalid_state("The donation was cancelled before the payment could start."))
    }

    /// Confirm the open intent with the gateway's outcome. A plain failure keeps the
    /// intent open for another attempt or a cancel; expiry ends the attempt.
    pub async fn confirm(&self, payment_intent_id: &str, method: PaymentMethod, outcome: &GatewayOutcome) -> PaymentResult<DonationId> {
        {
            let mut g = self.inner.lock();
            match &g.state {
                FlowState::Open { intent, .. } if intent.payment_intent_id == payment_intent_id => {}
                FlowState::Open { .. } => return Err(PaymentError::invalid_state("Payment id does not match the open payment.")),
                FlowState::Idle => return Err(PaymentError::invalid_state("No payment has been started yet.")),
                _ => return Err(PaymentError::invalid_state("This payment is already closed.")),
            }
            if g.in_flight {
                return Err(PaymentError::invalid_state("A confirmation is already in progress."));
            }
            g.in_flight = true;
        }
        let result = self.api.confirm(payment_intent_id, method, outcome).await;

        let mut g = self.inner.lock();
        g.in_flight = false;
        let intent = match &g.state {
            FlowState::Open { intent, .. } if intent.payment_intent_id == payment_intent_id => intent.clone(),
            _ => {
                if let Ok(id) = &result {
                    warn!(intent = payment_intent_id, donation = %id, "confirmation arrived after the flow was closed; ignoring");
                }
                return Err(PaymentError::invalid_state("The donation was closed before the confirmation completed."));
            }
        };
        match result {
            Ok(donation_id) => {
                g.state = FlowState::Confirmed { intent: PaymentIntent { status: IntentStatus::Confirmed, ..intent }, donation_id: donation_id.clone() };
                Ok(donation_id)
            }
            Err(e) if e.kind == PaymentErrorKind::IntentExpired => {
                g.state = FlowState::Expired { intent: PaymentIntent { status: IntentStatus::Expired, ..intent } };
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Close the attempt. Takes effect locally before the best-effort server call, never
    /// fails, and does nothing once the attempt is already over.
    pub async fn cancel(&self) {
        let to_cancel = {
            let mut g = self.inner.lock();
            match std::mem::replace(&mut g.state, FlowState::Idle) {
                FlowState::Idle => {
                    g.state = FlowState::Cancelled { intent: None };
                    None
                }
                FlowState::Open { intent, .. } => {
                    let id = intent.payment_intent_id.clone();
                    g.state = FlowState::Cancelled { intent: Some(PaymentIntent { status: IntentStatus::Cancelled, ..intent }) };
                    Some(id)
                }
                terminal => {
                    g.state = terminal;
                    None
                }
            }
        };
        if let Some(id) = to_cancel {
            self.api.cancel(&id).await;
        }
    }
}
