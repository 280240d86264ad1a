//! Handler for `await` actions: the shopper completes the payment elsewhere
//! (usually another app) while the SDK polls for the result.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use checkout_core::saved_state::{PaymentDataRepository, SavedState};
use checkout_core::{
    Action, ActivityHandle, CheckoutConfiguration, CheckoutError, ComponentScope, Job, StateFlow,
    StatusRepository,
};
use serde::{Deserialize, Serialize};

use crate::handler::{ActionHandler, HandlerKind, HandlerOutputs, StatusPolling};
use crate::polling::launch_polling;
use crate::view::ComponentViewType;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwaitOutputData {
    pub is_valid: bool,
    pub payment_method_type: Option<String>,
}

#[derive(Default)]
struct AwaitState {
    scope: Option<ComponentScope>,
    polling_job: Option<Job>,
}

pub struct AwaitHandler {
    configuration: Arc<CheckoutConfiguration>,
    status_repository: Arc<dyn StatusRepository>,
    payment_data: PaymentDataRepository,
    outputs: HandlerOutputs,
    view: StateFlow<Option<ComponentViewType>>,
    output_data: StateFlow<AwaitOutputData>,
    state: Mutex<AwaitState>,
}

impl AwaitHandler {
    pub fn new(
        configuration: Arc<CheckoutConfiguration>,
        status_repository: Arc<dyn StatusRepository>,
        saved_state: SavedState,
    ) -> Self {
        Self {
            configuration,
            status_repository,
            payment_data: PaymentDataRepository::new(saved_state),
            outputs: HandlerOutputs::new(),
            view: StateFlow::new(None),
            output_data: StateFlow::new(AwaitOutputData::default()),
            state: Mutex::new(AwaitState::default()),
        }
    }

    pub fn output_data(&self) -> &StateFlow<AwaitOutputData> {
        &self.output_data
    }

    fn max_polling_duration(&self, payment_method_type: Option<&str>) -> Duration {
        let polling = &self.configuration.polling;
        polling.max_duration_for(payment_method_type, polling.default_max_duration())
    }

    fn start_polling(&self, payment_data: &str, payment_method_type: Option<String>) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let Some(scope) = state.scope.clone() else {
            self.outputs
                .fail(CheckoutError::checkout("Handler used before initialize"));
            return;
        };
        if let Some(job) = state.polling_job.take() {
            job.cancel();
        }

        let max_duration = self.max_polling_duration(payment_method_type.as_deref());
        #[cfg(feature = "tracing")]
        tracing::debug!(?max_duration, "Starting status polling");
        let stream = self.status_repository.poll(payment_data, max_duration);

        let output_data = self.output_data.clone();
        let job = launch_polling(
            &scope,
            stream,
            self.outputs.clone(),
            self.payment_data.clone(),
            move |response| {
                output_data.emit(AwaitOutputData {
                    is_valid: response.is_final(),
                    payment_method_type: payment_method_type.clone(),
                });
            },
        );
        state.polling_job = Some(job);
    }
}

impl ActionHandler for AwaitHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Await
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
        let Action::Await(action) = action else {
            self.outputs
                .fail(CheckoutError::component("Unsupported action"));
            return;
        };

        self.payment_data
            .set_payment_data(action.payment_data.as_deref());
        let Some(payment_data) = action.payment_data else {
            self.outputs
                .fail(CheckoutError::component("Payment data is null"));
            return;
        };

        self.output_data.emit(AwaitOutputData {
            is_valid: false,
            payment_method_type: action.payment_method_type.clone(),
        });
        self.view.set(Some(ComponentViewType::Await));
        self.start_polling(&payment_data, action.payment_method_type);
    }

    fn outputs(&self) -> &HandlerOutputs {
        &self.outputs
    }

    fn on_cleared(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(job) = state.polling_job.take() {
            job.cancel();
        }
        state.scope = None;
    }

    fn view_flow(&self) -> Option<StateFlow<Option<ComponentViewType>>> {
        Some(self.view.clone())
    }

    fn as_status_polling(&self) -> Option<&dyn StatusPolling> {
        Some(self)
    }
}

impl StatusPolling for AwaitHandler {
    fn refresh_status(&self) {
        if let Some(payment_data) = self.payment_data.payment_data() {
            self.status_repository.refresh_status(&payment_data);
        } else {
            #[cfg(feature = "tracing")]
            tracing::debug!("No payment data, skipping status refresh");
        }
    }
}
