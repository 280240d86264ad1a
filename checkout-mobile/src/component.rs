//! The action component exposed to mobile hosts.
//!
//! Wraps a [`GenericActionDelegate`] together with the runtime it runs on,
//! the host lifecycle, and the bookkeeping needed to resolve permission
//! requests by id across the FFI boundary.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use checkout_action::{
    ActionComponentEvent, DefaultHandlerDependencies, GenericActionDelegate, HandlerDependencies,
    ThreeDS2Service, WeChatPayApi,
};
use checkout_core::image::ImageSaver;
use checkout_core::lifecycle::{LifecycleOwner, LifecycleState};
use checkout_core::permission::{PermissionHandlerCallback, PermissionRequestData};
use checkout_core::saved_state::SavedState;
use checkout_core::status::HttpStatusService;
use checkout_core::{
    Action, ActivityHandle, CheckoutConfiguration, CheckoutError, ComponentScope, Intent,
    RedirectHandler, StatusRepository,
};

use crate::async_bridge::AsyncRuntime;
use crate::callbacks::{
    ActionEventListener, UriLauncher, UriLauncherBridge, ViewTypeFFI, WeChatPayApiFFI,
    WeChatPayBridge,
};
use crate::{CheckoutMobileError, Result};

// ============================================================================
// Handler dependencies
// ============================================================================

/// Default wiring plus a WeChat Pay bridge the host may register at any
/// time before the `sdk` action arrives.
struct MobileHandlerDependencies {
    inner: DefaultHandlerDependencies,
    wechat_pay_api: RwLock<Option<Arc<dyn WeChatPayApi>>>,
}

impl HandlerDependencies for MobileHandlerDependencies {
    fn status_repository(
        &self,
        configuration: &CheckoutConfiguration,
    ) -> Arc<dyn StatusRepository> {
        self.inner.status_repository(configuration)
    }

    fn redirect_handler(&self) -> Arc<dyn RedirectHandler> {
        self.inner.redirect_handler()
    }

    fn image_saver(&self) -> Arc<dyn ImageSaver> {
        self.inner.image_saver()
    }

    fn three_ds2_service(&self) -> Option<Arc<dyn ThreeDS2Service>> {
        self.inner.three_ds2_service()
    }

    fn three_ds2_requestor_app_url(&self) -> Option<String> {
        self.inner.three_ds2_requestor_app_url()
    }

    fn wechat_pay_api(&self) -> Option<Arc<dyn WeChatPayApi>> {
        self.wechat_pay_api
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

// ============================================================================
// Pending permission requests
// ============================================================================

struct PendingPermission {
    permission: String,
    callback: Arc<dyn PermissionHandlerCallback>,
}

#[derive(Default)]
struct PendingPermissions {
    next_id: AtomicU64,
    requests: Mutex<HashMap<u64, PendingPermission>>,
}

impl PendingPermissions {
    fn register(&self, request: PermissionRequestData) -> (u64, String) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let permission = request.required_permission.clone();
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).insert(
            id,
            PendingPermission {
                permission: request.required_permission,
                callback: request.callback,
            },
        );
        (id, permission)
    }

    fn take(&self, id: u64) -> Option<PendingPermission> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&id)
    }

    /// Resolve every outstanding request as not handled.
    fn abandon_all(&self) {
        let pending: Vec<_> = self
            .requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain()
            .map(|(_, request)| request)
            .collect();
        for request in pending {
            request
                .callback
                .on_permission_request_not_handled(&request.permission);
        }
    }
}

// ============================================================================
// Component
// ============================================================================

/// Handles every action the backend can return for one payment flow.
///
/// # Example (Swift)
///
/// ```swift
/// let component = try CheckoutActionComponent(
///     configurationJson: configJson,
///     imageDirectory: cachesPath,
///     savedStateJson: nil,
///     uriLauncher: SafariLauncher(),
///     listener: self
/// )
/// try component.handleAction(actionJson: actionJson)
/// ```
#[derive(uniffi::Object)]
pub struct CheckoutActionComponent {
    runtime: AsyncRuntime,
    scope: ComponentScope,
    delegate: Arc<GenericActionDelegate>,
    dependencies: Arc<MobileHandlerDependencies>,
    activity: ActivityHandle,
    lifecycle: LifecycleOwner,
    permissions: Arc<PendingPermissions>,
}

#[uniffi::export]
impl CheckoutActionComponent {
    /// Create a component.
    ///
    /// # Arguments
    ///
    /// * `configuration_json` - `CheckoutConfiguration` as JSON (camelCase)
    /// * `image_directory` - where downloaded QR codes are stored
    /// * `saved_state_json` - state returned by `saved_state_json()` before
    ///   the process was killed, if any
    /// * `uri_launcher` - opens redirect URLs
    /// * `listener` - receives details, errors and permission requests
    #[uniffi::constructor]
    pub fn new(
        configuration_json: String,
        image_directory: String,
        saved_state_json: Option<String>,
        uri_launcher: Box<dyn UriLauncher>,
        listener: Box<dyn ActionEventListener>,
    ) -> Result<Arc<Self>> {
        let configuration = Arc::new(CheckoutConfiguration::from_json(&configuration_json)?);
        let saved_state = match saved_state_json {
            Some(json) => SavedState::from_json(&json)?,
            None => SavedState::new(),
        };

        let runtime = AsyncRuntime::new()?;
        let status_service = Arc::new(HttpStatusService::new(&configuration)?);
        let dependencies = Arc::new(MobileHandlerDependencies {
            inner: DefaultHandlerDependencies::with_image_directory(
                status_service,
                image_directory,
            ),
            wechat_pay_api: RwLock::new(None),
        });

        let delegate = Arc::new(GenericActionDelegate::new(
            configuration,
            saved_state,
            dependencies.clone(),
        ));
        let scope = ComponentScope::new(runtime.handle());
        delegate.initialize(scope.clone());

        let component = Self {
            runtime,
            scope,
            delegate,
            dependencies,
            activity: Arc::new(UriLauncherBridge::new(Arc::from(uri_launcher))),
            lifecycle: LifecycleOwner::new(),
            permissions: Arc::new(PendingPermissions::default()),
        };
        component.deliver_events(Arc::from(listener));
        component.lifecycle.move_to(LifecycleState::Started);

        Ok(Arc::new(component))
    }

    /// Handle an action JSON object returned by the payments endpoint.
    pub fn handle_action(&self, action_json: String) -> Result<()> {
        let _guard = self.runtime.enter();
        let action = Action::from_json(&action_json)?;
        self.delegate
            .handle_action(action, self.activity.clone())
            .map_err(CheckoutMobileError::from)
    }

    /// Deliver the deep link (and its extras) the app was reopened with.
    pub fn handle_intent(&self, uri: Option<String>, extras: HashMap<String, String>) -> Result<()> {
        let _guard = self.runtime.enter();
        let mut intent = match uri {
            Some(uri) => Intent::from_uri(&uri)?,
            None => Intent::default(),
        };
        intent.extras = extras;
        self.delegate.handle_intent(intent);
        Ok(())
    }

    /// Check the payment status now instead of waiting for the next poll.
    pub fn refresh_status(&self) {
        let _guard = self.runtime.enter();
        self.delegate.refresh_status();
    }

    /// The payment screen came to the foreground; refreshes the status.
    pub fn on_resume(&self) {
        self.lifecycle.move_to(LifecycleState::Resumed);
    }

    pub fn on_pause(&self) {
        self.lifecycle.move_to(LifecycleState::Paused);
    }

    /// Release everything. The component cannot be used afterwards.
    pub fn on_cleared(&self) {
        self.lifecycle.move_to(LifecycleState::Destroyed);
        self.delegate.on_cleared();
        self.permissions.abandon_all();
        self.scope.cancel();
    }

    /// Report an error the host detected while presenting the action.
    pub fn on_error(&self, message: String) {
        self.delegate.on_error(CheckoutError::component(message));
    }

    /// Answer the permission request delivered with `request_id`.
    pub fn resolve_permission(&self, request_id: u64, granted: bool) -> Result<()> {
        let request = self
            .permissions
            .take(request_id)
            .ok_or_else(|| CheckoutMobileError::NotFound {
                msg: format!("permission request {}", request_id),
            })?;
        if granted {
            request.callback.on_permission_granted(&request.permission);
        } else {
            request.callback.on_permission_denied(&request.permission);
        }
        Ok(())
    }

    /// Enable WeChat Pay `sdk` actions.
    pub fn register_wechat_pay_api(&self, api: Box<dyn WeChatPayApiFFI>) {
        let bridge: Arc<dyn WeChatPayApi> = Arc::new(WeChatPayBridge::new(Arc::from(api)));
        *self
            .dependencies
            .wechat_pay_api
            .write()
            .unwrap_or_else(|e| e.into_inner()) = Some(bridge);
    }

    pub fn current_view_type(&self) -> Option<ViewTypeFFI> {
        self.delegate.view_flow().value().map(ViewTypeFFI::from)
    }

    /// Snapshot of the state to hand back to the constructor after process
    /// death.
    pub fn saved_state_json(&self) -> Result<String> {
        Ok(self.delegate.saved_state().to_json()?)
    }
}

impl CheckoutActionComponent {
    fn deliver_events(&self, listener: Arc<dyn ActionEventListener>) {
        let permissions = self.permissions.clone();
        let event_listener = listener.clone();
        self.delegate.observe(
            &self.lifecycle,
            &self.scope,
            Arc::new(move |event| match event {
                ActionComponentEvent::ActionDetails(details) => {
                    event_listener.on_action_details(details.into());
                }
                ActionComponentEvent::Error(error) => {
                    event_listener.on_error((&error).into());
                }
                ActionComponentEvent::PermissionRequest(request) => {
                    let (id, permission) = permissions.register(request);
                    event_listener.on_permission_request(id, permission);
                }
            }),
        );

        let view = self.delegate.view_flow().clone();
        self.scope.spawn(async move {
            let mut rx = view.subscribe();
            loop {
                let current = (*rx.borrow_and_update()).map(ViewTypeFFI::from);
                listener.on_view_type_changed(current);
                if rx.changed().await.is_err() {
                    break;
                }
            }
        });
    }
}

impl Drop for CheckoutActionComponent {
    fn drop(&mut self) {
        self.on_cleared();
    }
}
