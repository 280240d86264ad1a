//! Selects the handler for an action.
//!
//! Handlers are created from [`HandlerDependencies`], so tests and hosts can
//! swap the status backend, redirect handling and native SDK seams. The
//! dispatcher remembers the last handler it returned: a 3DS2 challenge that
//! follows a fingerprint goes to the same handler so the challenge runs on the
//! transaction created during fingerprinting.

use std::sync::{Arc, Mutex};

use checkout_core::image::{FileImageSaver, HttpImageFetcher, ImageSaver};
use checkout_core::redirect::DefaultRedirectHandler;
use checkout_core::saved_state::SavedState;
use checkout_core::status::DefaultStatusRepository;
use checkout_core::{
    Action, CheckoutConfiguration, CheckoutError, RedirectHandler, Result, StatusRepository,
    StatusService,
};

use crate::await_action::AwaitHandler;
use crate::handler::{ActionHandler, HandlerKind, ResolvedHandler};
use crate::qr_code::QrCodeHandler;
use crate::redirect_action::RedirectActionHandler;
use crate::three_ds2::{ThreeDS2Handler, ThreeDS2Service};
use crate::voucher::VoucherHandler;
use crate::wechat::{WeChatPayApi, WeChatPayHandler};

/// Collaborators handed to newly created handlers.
pub trait HandlerDependencies: Send + Sync {
    fn status_repository(&self, configuration: &CheckoutConfiguration)
        -> Arc<dyn StatusRepository>;

    fn redirect_handler(&self) -> Arc<dyn RedirectHandler>;

    fn image_saver(&self) -> Arc<dyn ImageSaver>;

    fn three_ds2_service(&self) -> Option<Arc<dyn ThreeDS2Service>> {
        None
    }

    /// App URL the ACS returns to after an out-of-band 3DS2 challenge.
    fn three_ds2_requestor_app_url(&self) -> Option<String> {
        None
    }

    fn wechat_pay_api(&self) -> Option<Arc<dyn WeChatPayApi>> {
        None
    }
}

/// Production wiring: polling over a [`StatusService`], the default
/// redirect handler and an image saver writing to a directory.
pub struct DefaultHandlerDependencies {
    status_service: Arc<dyn StatusService>,
    image_saver: Arc<dyn ImageSaver>,
    three_ds2_service: Option<Arc<dyn ThreeDS2Service>>,
    three_ds2_requestor_app_url: Option<String>,
    wechat_pay_api: Option<Arc<dyn WeChatPayApi>>,
}

impl DefaultHandlerDependencies {
    pub fn new(status_service: Arc<dyn StatusService>, image_saver: Arc<dyn ImageSaver>) -> Self {
        Self {
            status_service,
            image_saver,
            three_ds2_service: None,
            three_ds2_requestor_app_url: None,
            wechat_pay_api: None,
        }
    }

    /// Save downloaded images into `directory`, fetched over HTTP.
    pub fn with_image_directory(
        status_service: Arc<dyn StatusService>,
        directory: impl AsRef<std::path::Path>,
    ) -> Self {
        let saver = FileImageSaver::new(directory, Arc::new(HttpImageFetcher::new()));
        Self::new(status_service, Arc::new(saver))
    }

    pub fn with_three_ds2_service(mut self, service: Arc<dyn ThreeDS2Service>) -> Self {
        self.three_ds2_service = Some(service);
        self
    }

    pub fn with_three_ds2_requestor_app_url(mut self, url: impl Into<String>) -> Self {
        self.three_ds2_requestor_app_url = Some(url.into());
        self
    }

    pub fn with_wechat_pay_api(mut self, api: Arc<dyn WeChatPayApi>) -> Self {
        self.wechat_pay_api = Some(api);
        self
    }
}

impl HandlerDependencies for DefaultHandlerDependencies {
    fn status_repository(
        &self,
        configuration: &CheckoutConfiguration,
    ) -> Arc<dyn StatusRepository> {
        Arc::new(DefaultStatusRepository::with_interval(
            self.status_service.clone(),
            configuration.polling.interval(),
        ))
    }

    fn redirect_handler(&self) -> Arc<dyn RedirectHandler> {
        Arc::new(DefaultRedirectHandler::new())
    }

    fn image_saver(&self) -> Arc<dyn ImageSaver> {
        self.image_saver.clone()
    }

    fn three_ds2_service(&self) -> Option<Arc<dyn ThreeDS2Service>> {
        self.three_ds2_service.clone()
    }

    fn three_ds2_requestor_app_url(&self) -> Option<String> {
        self.three_ds2_requestor_app_url.clone()
    }

    fn wechat_pay_api(&self) -> Option<Arc<dyn WeChatPayApi>> {
        self.wechat_pay_api.clone()
    }
}

/// Outcome of [`ActionDispatcher::resolve`].
#[derive(Debug, Clone)]
pub enum Resolution {
    /// A fresh handler that still needs to be initialized.
    Created(ResolvedHandler),
    /// The previously returned handler, already initialized.
    Reused(ResolvedHandler),
}

impl Resolution {
    pub fn handler(&self) -> &ResolvedHandler {
        match self {
            Resolution::Created(handler) | Resolution::Reused(handler) => handler,
        }
    }

    pub fn into_handler(self) -> ResolvedHandler {
        match self {
            Resolution::Created(handler) | Resolution::Reused(handler) => handler,
        }
    }

    pub fn is_reused(&self) -> bool {
        matches!(self, Resolution::Reused(_))
    }
}

pub struct ActionDispatcher {
    dependencies: Arc<dyn HandlerDependencies>,
    last_resolved: Mutex<Option<ResolvedHandler>>,
}

impl ActionDispatcher {
    pub fn new(dependencies: Arc<dyn HandlerDependencies>) -> Self {
        Self {
            dependencies,
            last_resolved: Mutex::new(None),
        }
    }

    /// Handler for `action`: the previous one for a 3DS2 challenge that
    /// follows a 3DS2 handler, a new one otherwise.
    pub fn resolve(
        &self,
        action: &Action,
        configuration: &Arc<CheckoutConfiguration>,
        saved_state: &SavedState,
    ) -> Result<Resolution> {
        let mut last = self
            .last_resolved
            .lock()
            .unwrap_or_else(|e| e.into_inner());

        if let Some(previous) = last.as_ref() {
            if previous.kind() == HandlerKind::ThreeDS2
                && matches!(action, Action::ThreeDS2Challenge(_))
            {
                #[cfg(feature = "tracing")]
                tracing::debug!("Reusing 3DS2 handler for challenge");
                return Ok(Resolution::Reused(previous.clone()));
            }
        }

        let handler = self.create(action, configuration, saved_state)?;
        let resolved = ResolvedHandler::new(handler);
        #[cfg(feature = "tracing")]
        tracing::debug!(kind = %resolved.kind(), "Created action handler");
        *last = Some(resolved.clone());
        Ok(Resolution::Created(resolved))
    }

    pub fn last_resolved(&self) -> Option<ResolvedHandler> {
        self.last_resolved
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Forget the last handler.
    pub fn reset(&self) {
        *self
            .last_resolved
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = None;
    }

    fn create(
        &self,
        action: &Action,
        configuration: &Arc<CheckoutConfiguration>,
        saved_state: &SavedState,
    ) -> Result<Arc<dyn ActionHandler>> {
        let deps = &self.dependencies;
        let saved_state = saved_state.clone();
        let handler: Arc<dyn ActionHandler> = match action {
            Action::Await(_) => Arc::new(AwaitHandler::new(
                configuration.clone(),
                deps.status_repository(configuration),
                saved_state,
            )),
            Action::QrCode(_) => Arc::new(QrCodeHandler::new(
                configuration.clone(),
                deps.status_repository(configuration),
                deps.redirect_handler(),
                deps.image_saver(),
                saved_state,
            )),
            Action::Redirect(_) => Arc::new(RedirectActionHandler::new(
                deps.redirect_handler(),
                saved_state,
            )),
            Action::ThreeDS2Fingerprint(_) | Action::ThreeDS2Challenge(_) => {
                let service = deps
                    .three_ds2_service()
                    .ok_or_else(|| Self::no_delegate(action))?;
                let handler = ThreeDS2Handler::new(service, deps.redirect_handler(), saved_state);
                match deps.three_ds2_requestor_app_url() {
                    Some(url) => Arc::new(handler.with_requestor_app_url(url)),
                    None => Arc::new(handler),
                }
            }
            Action::Voucher(_) => Arc::new(VoucherHandler::new(deps.redirect_handler(), saved_state)),
            Action::Sdk(_) => {
                let api = deps
                    .wechat_pay_api()
                    .ok_or_else(|| Self::no_delegate(action))?;
                Arc::new(WeChatPayHandler::new(api, saved_state))
            }
            Action::Unknown(_) => return Err(Self::no_delegate(action)),
        };
        Ok(handler)
    }

    fn no_delegate(action: &Action) -> CheckoutError {
        CheckoutError::checkout(format!(
            "Can't find delegate for action: {}",
            action.action_type()
        ))
    }
}
