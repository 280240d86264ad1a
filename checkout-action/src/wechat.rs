//! Handler for WeChat Pay SDK actions.

use std::sync::Arc;

use checkout_core::action::WeChatPaySdkData;
use checkout_core::saved_state::{PaymentDataRepository, SavedState};
use checkout_core::{
    Action, ActionComponentData, ActivityHandle, CheckoutError, ComponentScope, Intent, StateFlow,
};
use serde_json::json;

use crate::handler::{ActionHandler, HandlerKind, HandlerOutputs, IntentHandling};
use crate::view::ComponentViewType;

pub const RESULT_CODE_KEY: &str = "resultCode";

/// Result the WeChat app hands back to the merchant app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeChatPayResponse {
    pub err_code: i32,
    pub err_str: Option<String>,
}

/// Seam to the WeChat Open SDK.
pub trait WeChatPayApi: Send + Sync {
    fn is_app_installed(&self) -> bool;

    /// Hand the payment request to the WeChat app; false if it was refused.
    fn send_pay_request(&self, request: &WeChatPaySdkData) -> bool;

    /// Extract the payment response from an intent, if it carries one.
    fn parse_intent(&self, intent: &Intent) -> Option<WeChatPayResponse>;
}

pub struct WeChatPayHandler {
    api: Arc<dyn WeChatPayApi>,
    payment_data: PaymentDataRepository,
    outputs: HandlerOutputs,
    view: StateFlow<Option<ComponentViewType>>,
}

impl WeChatPayHandler {
    pub fn new(api: Arc<dyn WeChatPayApi>, saved_state: SavedState) -> Self {
        Self {
            api,
            payment_data: PaymentDataRepository::new(saved_state),
            outputs: HandlerOutputs::new(),
            view: StateFlow::new(None),
        }
    }
}

impl ActionHandler for WeChatPayHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::WeChatPay
    }

    fn initialize(&self, _scope: ComponentScope) {}

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip_all, fields(action_type = action.action_type()))
    )]
    fn handle_action(&self, action: Action, _activity: ActivityHandle) {
        self.outputs.begin();
        let Action::Sdk(action) = action else {
            self.outputs
                .fail(CheckoutError::component("Unsupported action"));
            return;
        };

        self.payment_data
            .set_payment_data(action.payment_data.as_deref());
        let request = match action.wechat_pay_data() {
            Ok(request) => request,
            Err(error) => {
                self.outputs.fail(error);
                return;
            }
        };

        if !self.api.is_app_installed() {
            self.outputs
                .fail(CheckoutError::checkout("WeChat app is not installed"));
            return;
        }

        self.view.set(Some(ComponentViewType::WeChatPay));
        #[cfg(feature = "tracing")]
        tracing::debug!(prepay_id = %request.prepayid, "Sending pay request to WeChat");
        if !self.api.send_pay_request(&request) {
            self.outputs
                .fail(CheckoutError::component("Failed to initialize WeChat app"));
        }
    }

    fn outputs(&self) -> &HandlerOutputs {
        &self.outputs
    }

    fn on_cleared(&self) {}

    fn view_flow(&self) -> Option<StateFlow<Option<ComponentViewType>>> {
        Some(self.view.clone())
    }

    fn as_intent_handling(&self) -> Option<&dyn IntentHandling> {
        Some(self)
    }
}

impl IntentHandling for WeChatPayHandler {
    fn handle_intent(&self, intent: Intent) {
        match self.api.parse_intent(&intent) {
            Some(response) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(err_code = response.err_code, "WeChat Pay returned");
                self.outputs.complete(ActionComponentData::new(
                    json!({ RESULT_CODE_KEY: response.err_code.to_string() }),
                    self.payment_data.payment_data(),
                ));
            }
            None => {
                self.outputs
                    .fail(CheckoutError::component("WeChatPay result is not available"));
            }
        }
    }
}
