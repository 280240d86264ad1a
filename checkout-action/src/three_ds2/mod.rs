//! Handler for 3DS2 fingerprint and challenge actions.
//!
//! The fingerprint step creates a transaction with the native SDK and
//! returns the device data as details. A challenge that follows must run on
//! the same transaction, which is why the dispatcher hands a challenge to the
//! handler that performed the fingerprint.

mod model;
mod service;

pub use model::{
    decode_token, encode_json, AuthenticationRequestParameters, ChallengeResult, ChallengeToken,
    FingerprintToken, CHALLENGE_DETAILS_KEY, FINGERPRINT_DETAILS_KEY, TRANS_STATUS_UNKNOWN,
};
pub use service::{
    ChallengeOutcome, ChallengeParameters, DirectoryServerConfig, ThreeDS2Service,
    ThreeDS2Transaction,
};

use std::sync::{Arc, Mutex};

use checkout_core::action::{ThreeDS2ChallengeAction, ThreeDS2FingerprintAction};
use checkout_core::saved_state::{PaymentDataRepository, SavedState};
use checkout_core::{
    Action, ActionComponentData, ActivityHandle, CheckoutError, ComponentScope, Intent, Job,
    RedirectHandler, RedirectListener, StateFlow,
};
use serde_json::{json, Value};

use crate::handler::{ActionHandler, HandlerKind, HandlerOutputs, IntentHandling, Redirectable};
use crate::view::ComponentViewType;

const DEFAULT_MESSAGE_VERSION: &str = "2.1.0";

#[derive(Default)]
struct ThreeDS2State {
    scope: Option<ComponentScope>,
    transaction: Option<Arc<dyn ThreeDS2Transaction>>,
    challenge_job: Option<Job>,
}

impl ThreeDS2State {
    fn close_transaction(&mut self) {
        if let Some(transaction) = self.transaction.take() {
            transaction.close();
        }
    }
}

pub struct ThreeDS2Handler {
    service: Arc<dyn ThreeDS2Service>,
    redirect_handler: Arc<dyn RedirectHandler>,
    payment_data: PaymentDataRepository,
    outputs: HandlerOutputs,
    view: StateFlow<Option<ComponentViewType>>,
    requestor_app_url: Option<String>,
    state: Arc<Mutex<ThreeDS2State>>,
}

impl ThreeDS2Handler {
    pub fn new(
        service: Arc<dyn ThreeDS2Service>,
        redirect_handler: Arc<dyn RedirectHandler>,
        saved_state: SavedState,
    ) -> Self {
        Self {
            service,
            redirect_handler,
            payment_data: PaymentDataRepository::new(saved_state),
            outputs: HandlerOutputs::new(),
            view: StateFlow::new(None),
            requestor_app_url: None,
            state: Arc::new(Mutex::new(ThreeDS2State::default())),
        }
    }

    /// App URL the ACS returns to after an out-of-band challenge.
    pub fn with_requestor_app_url(mut self, url: impl Into<String>) -> Self {
        self.requestor_app_url = Some(url.into());
        self
    }

    /// True while a fingerprinted transaction is waiting for its challenge.
    pub fn has_transaction(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .transaction
            .is_some()
    }

    fn identify_shopper(&self, action: ThreeDS2FingerprintAction) {
        self.payment_data
            .set_payment_data(action.payment_data.as_deref());

        let Some(encoded) = action.token.filter(|t| !t.is_empty()) else {
            self.outputs
                .fail(CheckoutError::component("Fingerprint token not found."));
            return;
        };
        let token: FingerprintToken = match decode_token(&encoded) {
            Ok(token) => token,
            Err(error) => {
                self.outputs.fail(CheckoutError::component_with_cause(
                    "Failed to decode fingerprint token",
                    error,
                ));
                return;
            }
        };

        let config = DirectoryServerConfig {
            directory_server_id: token.directory_server_id,
            directory_server_public_key: token.directory_server_public_key,
            directory_server_root_certificates: token.directory_server_root_certificates,
            message_version: token
                .three_ds_message_version
                .unwrap_or_else(|| DEFAULT_MESSAGE_VERSION.to_owned()),
        };

        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.close_transaction();

        let fingerprint = self.service.create_transaction(&config).and_then(|transaction| {
            let details = transaction
                .authentication_request_parameters()
                .and_then(|params| params.to_fingerprint_json())
                .and_then(|json| encode_json(&json));
            state.transaction = Some(transaction);
            details
        });

        match fingerprint {
            Ok(encoded) => {
                drop(state);
                #[cfg(feature = "tracing")]
                tracing::debug!("Fingerprint created");
                self.outputs.complete(ActionComponentData::new(
                    json!({ FINGERPRINT_DETAILS_KEY: encoded }),
                    self.payment_data.payment_data(),
                ));
            }
            Err(error) => {
                state.close_transaction();
                drop(state);
                self.outputs.fail(CheckoutError::component_with_cause(
                    "Failed to create 3DS2 fingerprint",
                    error,
                ));
            }
        }
    }

    fn challenge_shopper(&self, action: ThreeDS2ChallengeAction) {
        if action.payment_data.is_some() {
            self.payment_data
                .set_payment_data(action.payment_data.as_deref());
        }

        let Some(encoded) = action.token.filter(|t| !t.is_empty()) else {
            self.outputs
                .fail(CheckoutError::component("Challenge token not found."));
            return;
        };
        let token: ChallengeToken = match decode_token(&encoded) {
            Ok(token) => token,
            Err(error) => {
                self.outputs.fail(CheckoutError::component_with_cause(
                    "Failed to decode challenge token",
                    error,
                ));
                return;
            }
        };

        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let Some(transaction) = state.transaction.clone() else {
            drop(state);
            self.outputs.fail(CheckoutError::component(
                "Failed to make challenge, missing reference to initial transaction.",
            ));
            return;
        };
        let Some(scope) = state.scope.clone() else {
            drop(state);
            self.outputs
                .fail(CheckoutError::checkout("Handler used before initialize"));
            return;
        };

        let parameters = ChallengeParameters {
            three_ds_server_trans_id: token.three_ds_server_trans_id,
            acs_trans_id: token.acs_trans_id,
            acs_ref_number: token.acs_reference_number,
            acs_signed_content: token.acs_signed_content,
            message_version: token.message_version,
            three_ds_requestor_app_url: self.requestor_app_url.clone(),
        };

        self.view.set(Some(ComponentViewType::ThreeDS2));
        let outputs = self.outputs.clone();
        let payment_data = self.payment_data.clone();
        let shared = self.state.clone();
        let job = scope.spawn(async move {
            let outcome = transaction.do_challenge(parameters).await;
            shared
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .close_transaction();

            let trans_status = match outcome {
                ChallengeOutcome::Completed { trans_status } => {
                    #[cfg(feature = "tracing")]
                    tracing::info!(%trans_status, "Challenge completed");
                    trans_status
                }
                ChallengeOutcome::Cancelled | ChallengeOutcome::Timeout => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("Challenge cancelled or timed out");
                    TRANS_STATUS_UNKNOWN.to_owned()
                }
                ChallengeOutcome::ProtocolError(_message) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(message = %_message, "Challenge protocol error");
                    TRANS_STATUS_UNKNOWN.to_owned()
                }
                ChallengeOutcome::RuntimeError(message) => {
                    outputs.fail(CheckoutError::component(format!(
                        "Challenge failed: {}",
                        message
                    )));
                    return;
                }
            };

            let result = serde_json::to_value(ChallengeResult { trans_status })
                .map_err(CheckoutError::from)
                .and_then(|value| encode_json(&value));
            match result {
                Ok(encoded) => {
                    outputs.complete(ActionComponentData::new(
                        json!({ CHALLENGE_DETAILS_KEY: encoded }),
                        payment_data.payment_data(),
                    ));
                }
                Err(error) => {
                    outputs.fail(error);
                }
            }
        });
        if let Some(previous) = state.challenge_job.replace(job) {
            previous.cancel();
        }
    }
}

impl ActionHandler for ThreeDS2Handler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::ThreeDS2
    }

    fn initialize(&self, scope: ComponentScope) {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).scope = Some(scope);
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip_all, fields(action_type = action.action_type()))
    )]
    fn handle_action(&self, action: Action, _activity: ActivityHandle) {
        self.outputs.begin();
        match action {
            Action::ThreeDS2Fingerprint(action) => {
                self.view.set(Some(ComponentViewType::ThreeDS2));
                self.identify_shopper(action);
            }
            Action::ThreeDS2Challenge(action) => self.challenge_shopper(action),
            _ => {
                self.outputs
                    .fail(CheckoutError::component("Unsupported action"));
            }
        }
    }

    fn outputs(&self) -> &HandlerOutputs {
        &self.outputs
    }

    fn on_cleared(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(job) = state.challenge_job.take() {
            job.cancel();
        }
        state.close_transaction();
        state.scope = None;
        drop(state);
        self.redirect_handler.remove_on_redirect_listener();
    }

    fn view_flow(&self) -> Option<StateFlow<Option<ComponentViewType>>> {
        Some(self.view.clone())
    }

    fn as_intent_handling(&self) -> Option<&dyn IntentHandling> {
        Some(self)
    }

    fn as_redirectable(&self) -> Option<&dyn Redirectable> {
        Some(self)
    }
}

impl IntentHandling for ThreeDS2Handler {
    /// Out-of-band challenges return to the app through a redirect.
    fn handle_intent(&self, intent: Intent) {
        let result: checkout_core::Result<Value> =
            self.redirect_handler.parse_redirect_result(intent.data.as_ref());
        match result {
            Ok(details) => {
                self.outputs.complete(ActionComponentData::new(
                    details,
                    self.payment_data.payment_data(),
                ));
            }
            Err(error) => {
                self.outputs.fail(error);
            }
        }
    }
}

impl Redirectable for ThreeDS2Handler {
    fn set_on_redirect_listener(&self, listener: RedirectListener) {
        self.redirect_handler.set_on_redirect_listener(listener);
    }
}
