//! Handler for `voucher` actions (Boleto, Multibanco, OXXO, econtext ...).
//!
//! A voucher completes as soon as it is shown: the shopper pays offline and
//! no details are submitted.

use std::sync::Arc;

use checkout_core::action::Amount;
use checkout_core::payment_method;
use checkout_core::saved_state::{PaymentDataRepository, SavedState};
use checkout_core::{
    Action, ActionComponentData, ActivityHandle, BufferedChannel, CheckoutError, ComponentScope,
    RedirectHandler, StateFlow,
};
use serde::{Deserialize, Serialize};

use crate::handler::{ActionHandler, HandlerKind, HandlerOutputs};
use crate::view::{ComponentViewType, VoucherViewType};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherOutputData {
    pub is_valid: bool,
    pub payment_method_type: Option<String>,
    pub download_url: Option<String>,
    pub total_amount: Option<Amount>,
    pub reference: Option<String>,
    pub expires_at: Option<String>,
    pub merchant_name: Option<String>,
    pub instructions_url: Option<String>,
}

/// Full layout for methods with a reference and amount to show; a simple
/// download card otherwise.
pub fn voucher_view_type(payment_method_type: Option<&str>) -> VoucherViewType {
    match payment_method_type {
        Some(
            payment_method::BOLETO
            | payment_method::BOLETO_SANTANDER
            | payment_method::MULTIBANCO
            | payment_method::OXXO
            | payment_method::ECONTEXT_ATM
            | payment_method::ECONTEXT_ONLINE
            | payment_method::ECONTEXT_SEVEN_ELEVEN
            | payment_method::ECONTEXT_STORES,
        ) => VoucherViewType::Full,
        _ => VoucherViewType::Simple,
    }
}

pub struct VoucherHandler {
    redirect_handler: Arc<dyn RedirectHandler>,
    payment_data: PaymentDataRepository,
    outputs: HandlerOutputs,
    view: StateFlow<Option<ComponentViewType>>,
    output_data: StateFlow<VoucherOutputData>,
}

impl VoucherHandler {
    pub fn new(redirect_handler: Arc<dyn RedirectHandler>, saved_state: SavedState) -> Self {
        Self {
            redirect_handler,
            payment_data: PaymentDataRepository::new(saved_state),
            outputs: HandlerOutputs::new(),
            view: StateFlow::new(None),
            output_data: StateFlow::new(VoucherOutputData::default()),
        }
    }

    pub fn output_data(&self) -> &StateFlow<VoucherOutputData> {
        &self.output_data
    }

    /// Open the voucher's download URL outside the app.
    pub fn download_voucher(&self, activity: ActivityHandle) {
        let url = self.output_data.value().download_url;
        if url.is_none() {
            self.outputs
                .report(CheckoutError::component("Download URL is null"));
            return;
        }
        if let Err(error) = self
            .redirect_handler
            .launch_uri_redirect(activity.as_ref(), url.as_deref())
        {
            self.outputs.report(error);
        }
    }
}

impl ActionHandler for VoucherHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Voucher
    }

    fn initialize(&self, _scope: ComponentScope) {}

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip_all, fields(action_type = action.action_type()))
    )]
    fn handle_action(&self, action: Action, _activity: ActivityHandle) {
        self.outputs.begin();
        let Action::Voucher(action) = action else {
            self.outputs
                .fail(CheckoutError::component("Unsupported action"));
            return;
        };

        self.payment_data
            .set_payment_data(action.payment_data.as_deref());
        let view_type = voucher_view_type(action.payment_method_type.as_deref());
        #[cfg(feature = "tracing")]
        tracing::debug!(?view_type, "Showing voucher");

        self.output_data.emit(VoucherOutputData {
            is_valid: true,
            payment_method_type: action.payment_method_type,
            download_url: action.download_url.or(action.url),
            total_amount: action.total_amount.or(action.initial_amount),
            reference: action.reference,
            expires_at: action.expires_at,
            merchant_name: action.merchant_name,
            instructions_url: action.instructions_url,
        });
        self.view.set(Some(ComponentViewType::Voucher(view_type)));
        self.outputs.finish();
    }

    fn outputs(&self) -> &HandlerOutputs {
        &self.outputs
    }

    fn on_cleared(&self) {}

    fn details_channel(&self) -> Option<BufferedChannel<ActionComponentData>> {
        None
    }

    fn view_flow(&self) -> Option<StateFlow<Option<ComponentViewType>>> {
        Some(self.view.clone())
    }
}
