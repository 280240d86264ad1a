//! Handler for `qrCode` actions.
//!
//! Viewable methods (Pix, PayNow, PromptPay, DuitNow, UPI) show the code
//! in-app with a countdown and poll for the result. Other methods hand the
//! shopper to the issuer through a redirect and wait for the intent.

mod config;
mod timer;

pub use config::{is_viewable, QrCodePaymentMethodConfig};
pub use timer::{CountDownTimer, TimerData};

use std::sync::{Arc, Mutex};
use std::time::Duration;

use checkout_core::image::ImageSaver;
use checkout_core::permission::{
    PermissionHandler, PermissionHandlerCallback, PermissionRequestData,
};
use checkout_core::saved_state::{PaymentDataRepository, SavedState};
use checkout_core::{
    Action, ActionComponentData, ActivityHandle, BufferedChannel, CheckoutConfiguration,
    CheckoutError, ComponentScope, Intent, Job, RedirectHandler, RedirectListener, StateFlow,
    StatusRepository,
};
use serde::{Deserialize, Serialize};

use crate::handler::{
    ActionHandler, HandlerKind, HandlerOutputs, IntentHandling, Redirectable, StatusPolling,
};
use crate::polling::launch_polling;
use crate::view::{ComponentViewType, QrCodeViewType};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrCodeOutputData {
    pub is_valid: bool,
    pub payment_method_type: Option<String>,
    pub qr_code_data: Option<String>,
    pub qr_image_url: Option<String>,
    pub message_key: Option<String>,
}

/// One-shot UI events of the QR flow.
#[derive(Debug, Clone, PartialEq)]
pub enum QrCodeUiEvent {
    QrImageDownloadResult(QrImageDownloadResult),
}

#[derive(Debug, Clone, PartialEq)]
pub enum QrImageDownloadResult {
    Success,
    PermissionDenied,
    Failure(CheckoutError),
}

/// Emits permission requests on the handler's permission stream.
#[derive(Clone)]
struct ChannelPermissionHandler {
    requests: BufferedChannel<PermissionRequestData>,
}

impl PermissionHandler for ChannelPermissionHandler {
    fn request_permission(
        &self,
        required_permission: &str,
        callback: Arc<dyn PermissionHandlerCallback>,
    ) {
        self.requests.send(PermissionRequestData {
            required_permission: required_permission.to_owned(),
            callback,
        });
    }
}

#[derive(Default)]
struct QrCodeState {
    scope: Option<ComponentScope>,
    polling_job: Option<Job>,
    download_job: Option<Job>,
    max_polling_duration: Duration,
}

pub struct QrCodeHandler {
    configuration: Arc<CheckoutConfiguration>,
    status_repository: Arc<dyn StatusRepository>,
    redirect_handler: Arc<dyn RedirectHandler>,
    image_saver: Arc<dyn ImageSaver>,
    payment_data: PaymentDataRepository,
    outputs: HandlerOutputs,
    permissions: ChannelPermissionHandler,
    events: BufferedChannel<QrCodeUiEvent>,
    view: StateFlow<Option<ComponentViewType>>,
    output_data: StateFlow<QrCodeOutputData>,
    timer_data: StateFlow<TimerData>,
    timer: CountDownTimer,
    state: Mutex<QrCodeState>,
}

impl QrCodeHandler {
    pub fn new(
        configuration: Arc<CheckoutConfiguration>,
        status_repository: Arc<dyn StatusRepository>,
        redirect_handler: Arc<dyn RedirectHandler>,
        image_saver: Arc<dyn ImageSaver>,
        saved_state: SavedState,
    ) -> Self {
        Self {
            configuration,
            status_repository,
            redirect_handler,
            image_saver,
            payment_data: PaymentDataRepository::new(saved_state),
            outputs: HandlerOutputs::new(),
            permissions: ChannelPermissionHandler {
                requests: BufferedChannel::new(),
            },
            events: BufferedChannel::new(),
            view: StateFlow::new(None),
            output_data: StateFlow::new(QrCodeOutputData::default()),
            timer_data: StateFlow::new(TimerData::default()),
            timer: CountDownTimer::new(),
            state: Mutex::new(QrCodeState::default()),
        }
    }

    pub fn output_data(&self) -> &StateFlow<QrCodeOutputData> {
        &self.output_data
    }

    pub fn timer_data(&self) -> &StateFlow<TimerData> {
        &self.timer_data
    }

    pub fn ui_events(&self) -> &BufferedChannel<QrCodeUiEvent> {
        &self.events
    }

    /// Polling window chosen for the current action.
    pub fn max_polling_duration(&self) -> Duration {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .max_polling_duration
    }

    fn qr_image_url(&self, qr_code_data: &str) -> Option<String> {
        let base = match self.configuration.environment.checkout_base_url() {
            Ok(base) => base,
            Err(_error) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %_error, "No base URL for QR image");
                return None;
            }
        };
        let data: String = url::form_urlencoded::byte_serialize(qr_code_data.as_bytes()).collect();
        Some(format!(
            "{}barcode.shtml?barcodeType=qrCode&fileType=png&data={}",
            base, data
        ))
    }

    fn redirect(&self, url: Option<&str>, activity: &ActivityHandle) {
        self.view
            .set(Some(ComponentViewType::QrCode(QrCodeViewType::Redirect)));
        if let Err(error) = self
            .redirect_handler
            .launch_uri_redirect(activity.as_ref(), url)
        {
            self.outputs.fail(error);
        }
    }

    fn present(&self, payment_data: &str, template: QrCodeOutputData) {
        let method_config = QrCodePaymentMethodConfig::for_payment_method(
            template.payment_method_type.as_deref(),
            self.configuration.polling.default_max_duration(),
        );
        let max_duration = self.configuration.polling.max_duration_for(
            template.payment_method_type.as_deref(),
            method_config.max_polling_duration,
        );

        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let Some(scope) = state.scope.clone() else {
            self.outputs
                .fail(CheckoutError::checkout("Handler used before initialize"));
            return;
        };
        if let Some(job) = state.polling_job.take() {
            job.cancel();
        }
        state.max_polling_duration = max_duration;

        self.view
            .set(Some(ComponentViewType::QrCode(method_config.view_type)));
        self.output_data.emit(template.clone());

        let timer_data = self.timer_data.clone();
        self.timer
            .start(&scope, max_duration, CountDownTimer::DEFAULT_TICK, move |data| {
                timer_data.emit(data)
            });

        #[cfg(feature = "tracing")]
        tracing::debug!(?max_duration, "Starting status polling");
        let stream = self.status_repository.poll(payment_data, max_duration);
        let output_data = self.output_data.clone();
        let timer = self.timer.clone();
        let job = launch_polling(
            &scope,
            stream,
            self.outputs.clone(),
            self.payment_data.clone(),
            move |response| {
                if response.is_terminal() {
                    timer.cancel();
                }
                output_data.emit(QrCodeOutputData {
                    is_valid: response.is_final(),
                    ..template.clone()
                });
            },
        );
        state.polling_job = Some(job);
    }

    /// Save the QR image to storage, asking for permission when the saver
    /// needs it. The outcome arrives on [`ui_events`](Self::ui_events).
    pub fn download_qr_image(&self) {
        let output = self.output_data.value();
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let Some(scope) = state.scope.clone() else {
            self.outputs
                .report(CheckoutError::checkout("Handler used before initialize"));
            return;
        };

        let Some(image_url) = output.qr_image_url else {
            self.events
                .send(QrCodeUiEvent::QrImageDownloadResult(QrImageDownloadResult::Failure(
                    CheckoutError::component("QR image URL is not available"),
                )));
            return;
        };
        let file_name = format!(
            "{}-{}.png",
            output.payment_method_type.as_deref().unwrap_or("qr"),
            chrono::Utc::now().format("%Y%m%d%H%M%S%3f")
        );

        let saver = self.image_saver.clone();
        let permissions = self.permissions.clone();
        let events = self.events.clone();
        let job = scope.spawn(async move {
            let result = match saver
                .save_image_from_url(&permissions, &image_url, &file_name)
                .await
            {
                Ok(path) => {
                    #[cfg(feature = "tracing")]
                    tracing::info!(path = %path.display(), "QR image saved");
                    QrImageDownloadResult::Success
                }
                Err(CheckoutError::PermissionRequest(_message)) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(message = %_message, "Storage permission denied");
                    QrImageDownloadResult::PermissionDenied
                }
                Err(error) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(error = %error, "Failed to save QR image");
                    QrImageDownloadResult::Failure(error)
                }
            };
            events.send(QrCodeUiEvent::QrImageDownloadResult(result));
        });
        if let Some(previous) = state.download_job.replace(job) {
            previous.cancel();
        }
    }
}

impl ActionHandler for QrCodeHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::QrCode
    }

    fn initialize(&self, scope: ComponentScope) {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).scope = Some(scope);
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip_all, fields(action_type = action.action_type()))
    )]
    fn handle_action(&self, action: Action, activity: ActivityHandle) {
        self.outputs.begin();
        let Action::QrCode(action) = action else {
            self.outputs
                .fail(CheckoutError::component("Unsupported action"));
            return;
        };

        self.payment_data
            .set_payment_data(action.payment_data.as_deref());
        let Some(payment_data) = action.payment_data.clone() else {
            self.outputs
                .fail(CheckoutError::component("Payment data is null"));
            return;
        };

        if !is_viewable(action.payment_method_type.as_deref()) {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                payment_method_type = ?action.payment_method_type,
                "QR code is not viewable, redirecting"
            );
            self.redirect(action.url.as_deref(), &activity);
            return;
        }

        let method_config = QrCodePaymentMethodConfig::for_payment_method(
            action.payment_method_type.as_deref(),
            self.configuration.polling.default_max_duration(),
        );
        let qr_image_url = match (method_config.view_type, action.qr_code_data.as_deref()) {
            (QrCodeViewType::Full, Some(data)) => self.qr_image_url(data),
            _ => None,
        };
        let template = QrCodeOutputData {
            is_valid: false,
            payment_method_type: action.payment_method_type,
            qr_code_data: action.qr_code_data,
            qr_image_url,
            message_key: method_config.message_key.map(str::to_owned),
        };
        self.present(&payment_data, template);
    }

    fn outputs(&self) -> &HandlerOutputs {
        &self.outputs
    }

    fn on_cleared(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        for job in [state.polling_job.take(), state.download_job.take()]
            .into_iter()
            .flatten()
        {
            job.cancel();
        }
        state.scope = None;
        self.timer.cancel();
        self.redirect_handler.remove_on_redirect_listener();
    }

    fn permission_channel(&self) -> Option<BufferedChannel<PermissionRequestData>> {
        Some(self.permissions.requests.clone())
    }

    fn view_flow(&self) -> Option<StateFlow<Option<ComponentViewType>>> {
        Some(self.view.clone())
    }

    fn as_intent_handling(&self) -> Option<&dyn IntentHandling> {
        Some(self)
    }

    fn as_status_polling(&self) -> Option<&dyn StatusPolling> {
        Some(self)
    }

    fn as_redirectable(&self) -> Option<&dyn Redirectable> {
        Some(self)
    }
}

impl IntentHandling for QrCodeHandler {
    fn handle_intent(&self, intent: Intent) {
        match self.redirect_handler.parse_redirect_result(intent.data.as_ref()) {
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

impl StatusPolling for QrCodeHandler {
    fn refresh_status(&self) {
        if let Some(payment_data) = self.payment_data.payment_data() {
            self.status_repository.refresh_status(&payment_data);
        } else {
            #[cfg(feature = "tracing")]
            tracing::debug!("No payment data, skipping status refresh");
        }
    }
}

impl Redirectable for QrCodeHandler {
    fn set_on_redirect_listener(&self, listener: RedirectListener) {
        self.redirect_handler.set_on_redirect_listener(listener);
    }
}

impl PermissionHandler for QrCodeHandler {
    fn request_permission(
        &self,
        required_permission: &str,
        callback: Arc<dyn PermissionHandlerCallback>,
    ) {
        self.permissions.request_permission(required_permission, callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkout_core::action::QrCodeAction;
    use checkout_core::config::Environment;
    use checkout_core::test_utils::{
        TestActivity, TestImageSaver, TestRedirectHandler, TestStatusRepository,
    };
    use checkout_core::StatusResponse;
    use serde_json::json;

    use crate::handler::HandlerState;

    struct Fixture {
        handler: QrCodeHandler,
        repository: Arc<TestStatusRepository>,
        redirect: Arc<TestRedirectHandler>,
    }

    fn fixture_with_saver(image_saver: TestImageSaver) -> Fixture {
        let repository = Arc::new(TestStatusRepository::new());
        let redirect = Arc::new(TestRedirectHandler::new());
        let handler = QrCodeHandler::new(
            Arc::new(CheckoutConfiguration::new(Environment::Test, "test_CLIENTKEY")),
            repository.clone(),
            redirect.clone(),
            Arc::new(image_saver),
            SavedState::new(),
        );
        handler.initialize(ComponentScope::current().unwrap());
        Fixture {
            handler,
            repository,
            redirect,
        }
    }

    fn fixture() -> Fixture {
        fixture_with_saver(TestImageSaver::succeeding())
    }

    fn qr_action(payment_method_type: &str) -> Action {
        Action::QrCode(QrCodeAction {
            payment_method_type: Some(payment_method_type.into()),
            payment_data: Some("pd-qr".into()),
            qr_code_data: Some("00020101 qr".into()),
            url: Some("https://issuer.example/pay".into()),
        })
    }

    async fn wait_until_terminal(handler: &QrCodeHandler) {
        let mut rx = handler.outputs().state_flow().subscribe();
        while !rx.borrow_and_update().is_terminal() {
            rx.changed().await.unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_viewable_code_polls_until_final() {
        let f = fixture();
        f.handler
            .handle_action(qr_action("pix"), Arc::new(TestActivity::new()));

        assert_eq!(
            f.handler.view_flow().unwrap().value(),
            Some(ComponentViewType::QrCode(QrCodeViewType::Simple))
        );
        assert_eq!(
            f.repository.poll_calls(),
            vec![("pd-qr".to_string(), Duration::from_secs(15 * 60))]
        );
        assert_eq!(f.handler.output_data().value().qr_image_url, None);

        f.repository.push(Ok(StatusResponse::pending()));
        f.repository
            .push(Ok(StatusResponse::new("authorised", Some("QR-PAYLOAD".into()))));
        wait_until_terminal(&f.handler).await;

        let details = f.handler.outputs().details().drain();
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].details, json!({"payload": "QR-PAYLOAD"}));
        assert!(f.handler.output_data().value().is_valid);
    }

    #[tokio::test]
    async fn test_each_tick_publishes_output_valid_only_when_final() {
        let f = fixture();
        f.handler
            .handle_action(qr_action("pix"), Arc::new(TestActivity::new()));
        let mut rx = f.handler.output_data().subscribe();
        rx.borrow_and_update();

        let mut validity = Vec::new();
        for response in [
            StatusResponse::pending(),
            StatusResponse::pending(),
            StatusResponse::new("finished", Some("X".into())),
        ] {
            f.repository.push(Ok(response));
            rx.changed().await.unwrap();
            validity.push(rx.borrow_and_update().is_valid);
        }

        assert_eq!(validity, vec![false, false, true]);
        wait_until_terminal(&f.handler).await;
        assert_eq!(f.handler.outputs().details().drain().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_view_builds_image_url_and_short_window() {
        let f = fixture();
        f.handler
            .handle_action(qr_action("paynow"), Arc::new(TestActivity::new()));

        let output = f.handler.output_data().value();
        assert_eq!(
            output.qr_image_url.as_deref(),
            Some(
                "https://checkoutshopper-test.adyen.com/checkoutshopper/barcode.shtml\
                 ?barcodeType=qrCode&fileType=png&data=00020101+qr"
            )
        );
        assert_eq!(f.handler.max_polling_duration(), Duration::from_secs(180));
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_publishes_progress() {
        let f = fixture();
        f.handler
            .handle_action(qr_action("paynow"), Arc::new(TestActivity::new()));

        tokio::time::sleep(Duration::from_secs(91)).await;
        let timer = f.handler.timer_data().value();
        assert!(timer.progress_percentage <= 50);
        assert!(timer.millis_until_finished <= 90_000);
    }

    #[tokio::test]
    async fn test_non_viewable_code_redirects_then_handles_intent() {
        let f = fixture();
        f.handler
            .handle_action(qr_action("bcmc_mobile"), Arc::new(TestActivity::new()));

        assert_eq!(
            f.handler.view_flow().unwrap().value(),
            Some(ComponentViewType::QrCode(QrCodeViewType::Redirect))
        );
        assert_eq!(
            f.redirect.launched_urls(),
            vec![Some("https://issuer.example/pay".to_string())]
        );
        assert!(f.repository.poll_calls().is_empty());

        f.handler.handle_intent(Intent::default());
        let details = f.handler.outputs().details().drain();
        assert_eq!(details[0].details, TestRedirectHandler::redirect_result());
        assert_eq!(details[0].payment_data.as_deref(), Some("pd-qr"));
    }

    #[tokio::test]
    async fn test_intent_parse_failure_is_reported() {
        let f = fixture();
        f.handler
            .handle_action(qr_action("bcmc_mobile"), Arc::new(TestActivity::new()));
        f.redirect
            .set_exception(Some(CheckoutError::checkout("Received a null redirect Uri")));

        f.handler.handle_intent(Intent::default());

        assert!(f.handler.outputs().details().drain().is_empty());
        let errors = f.handler.outputs().exceptions().drain();
        assert_eq!(errors.len(), 1);
        assert_eq!(f.handler.state(), HandlerState::Failed);
    }

    #[tokio::test]
    async fn test_missing_payment_data_checked_first() {
        let f = fixture();
        let action = Action::QrCode(QrCodeAction {
            payment_method_type: Some("bcmc_mobile".into()),
            ..QrCodeAction::default()
        });
        f.handler.handle_action(action, Arc::new(TestActivity::new()));

        assert_eq!(
            f.handler.outputs().exceptions().drain()[0].message(),
            "Payment data is null"
        );
        assert!(f.redirect.launched_urls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_download_qr_image_success() {
        let f = fixture();
        f.handler
            .handle_action(qr_action("promptpay"), Arc::new(TestActivity::new()));

        f.handler.download_qr_image();
        let event = f.handler.ui_events().recv().await.unwrap();

        assert_eq!(
            event,
            QrCodeUiEvent::QrImageDownloadResult(QrImageDownloadResult::Success)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_download_waits_for_permission() {
        let f = fixture_with_saver(TestImageSaver::requiring_permission(
            checkout_core::permission::WRITE_EXTERNAL_STORAGE,
        ));
        f.handler
            .handle_action(qr_action("duitnow"), Arc::new(TestActivity::new()));

        f.handler.download_qr_image();
        let request = f
            .handler
            .permission_channel()
            .unwrap()
            .recv()
            .await
            .unwrap();
        request
            .callback
            .on_permission_denied(&request.required_permission);

        let event = f.handler.ui_events().recv().await.unwrap();
        assert_eq!(
            event,
            QrCodeUiEvent::QrImageDownloadResult(QrImageDownloadResult::PermissionDenied)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_on_cleared_stops_polling_and_listener() {
        let f = fixture();
        f.handler.set_on_redirect_listener(Arc::new(|| {}));
        f.handler
            .handle_action(qr_action("pix"), Arc::new(TestActivity::new()));

        f.handler.on_cleared();
        f.repository
            .push(Ok(StatusResponse::new("authorised", Some("late".into()))));
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert!(f.handler.outputs().details().drain().is_empty());
        assert!(!f.redirect.has_listener());
    }
}
