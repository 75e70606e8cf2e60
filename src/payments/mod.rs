//! Donation payments: the intent endpoints and the per-attempt state machine
//! (create → confirm, or → cancelled / expired).

mod api;
mod flow;
mod model;

pub use api::{PaymentsApi, CANCEL_PATH_PREFIX, CONFIRM_PATH, INTENT_PATH};
pub use flow::{FlowState, PaymentIntentFlow};
pub use model::{parse_timestamp, DonationId, DonationRequest, GatewayOutcome, IntentStatus, PaymentIntent, PaymentMethod};
