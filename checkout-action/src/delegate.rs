//! The generic action delegate: one entry point for every action type.
//!
//! The host hands each action to [`GenericActionDelegate::handle_action`].
//! The delegate picks a handler through the [`ActionDispatcher`], wires the
//! handler's streams into its own, and exposes a single set of streams
//! (details, exceptions, permission requests, view type) that outlives
//! individual handlers.
//!
//! # Thread Safety
//!
//! All methods take `&self`. The delegate is usually held in an `Arc` so
//! that [`observe`](GenericActionDelegate::observe) can refresh the status
//! from a lifecycle task.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use checkout_core::analytics::{AnalyticsSender, AnalyticsSetup, NoOpAnalyticsSender};
use checkout_core::lifecycle::LifecycleOwner;
use checkout_core::permission::PermissionRequestData;
use checkout_core::saved_state::SavedState;
use checkout_core::{
    Action, ActionComponentData, ActivityHandle, BufferedChannel, CheckoutConfiguration,
    CheckoutError, ComponentScope, Intent, Job, RedirectListener, Result, StateFlow,
};

use crate::dispatcher::{ActionDispatcher, HandlerDependencies, Resolution};
use crate::handler::ResolvedHandler;
use crate::observer::{ActionCallback, ActionObserverRepository, ObservedStreams};
use crate::view::ComponentViewType;

/// Component name reported to analytics.
pub const COMPONENT_NAME: &str = "action";

#[derive(Default)]
struct DelegateState {
    scope: Option<ComponentScope>,
    current: Option<ResolvedHandler>,
    forwarders: Vec<Job>,
    on_redirect: Option<RedirectListener>,
}

impl DelegateState {
    fn stop_forwarding(&mut self) {
        for job in self.forwarders.drain(..) {
            job.cancel();
        }
    }
}

pub struct GenericActionDelegate {
    configuration: Arc<CheckoutConfiguration>,
    saved_state: SavedState,
    dispatcher: ActionDispatcher,
    analytics: Arc<dyn AnalyticsSender>,
    analytics_sent: AtomicBool,
    observers: ActionObserverRepository,
    details: BufferedChannel<ActionComponentData>,
    exceptions: BufferedChannel<CheckoutError>,
    permissions: BufferedChannel<PermissionRequestData>,
    view: StateFlow<Option<ComponentViewType>>,
    state: Mutex<DelegateState>,
}

impl GenericActionDelegate {
    pub fn new(
        configuration: Arc<CheckoutConfiguration>,
        saved_state: SavedState,
        dependencies: Arc<dyn HandlerDependencies>,
    ) -> Self {
        Self {
            configuration,
            saved_state,
            dispatcher: ActionDispatcher::new(dependencies),
            analytics: Arc::new(NoOpAnalyticsSender),
            analytics_sent: AtomicBool::new(false),
            observers: ActionObserverRepository::new(),
            details: BufferedChannel::new(),
            exceptions: BufferedChannel::new(),
            permissions: BufferedChannel::new(),
            view: StateFlow::new(None),
            state: Mutex::new(DelegateState::default()),
        }
    }

    pub fn with_analytics_sender(mut self, analytics: Arc<dyn AnalyticsSender>) -> Self {
        self.analytics = analytics;
        self
    }

    pub fn configuration(&self) -> &CheckoutConfiguration {
        &self.configuration
    }

    pub fn saved_state(&self) -> &SavedState {
        &self.saved_state
    }

    // ========================================================================
    // Streams
    // ========================================================================

    pub fn details(&self) -> &BufferedChannel<ActionComponentData> {
        &self.details
    }

    pub fn exceptions(&self) -> &BufferedChannel<CheckoutError> {
        &self.exceptions
    }

    pub fn permissions(&self) -> &BufferedChannel<PermissionRequestData> {
        &self.permissions
    }

    pub fn view_flow(&self) -> &StateFlow<Option<ComponentViewType>> {
        &self.view
    }

    /// The handler processing the current action, if any.
    pub fn current_handler(&self) -> Option<ResolvedHandler> {
        self.lock_state().current.clone()
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Bind the delegate to `scope`. Analytics are set up on the first call.
    pub fn initialize(&self, scope: ComponentScope) {
        #[cfg(feature = "tracing")]
        tracing::debug!("initialize");
        self.lock_state().scope = Some(scope);
        if !self.analytics_sent.swap(true, Ordering::SeqCst) {
            self.analytics
                .setup_analytics(AnalyticsSetup::new(COMPONENT_NAME, &self.configuration));
        }
    }

    /// Deliver the delegate's events to `callback` while `lifecycle` is alive
    /// and refresh the payment status every time it resumes.
    pub fn observe(
        self: &Arc<Self>,
        lifecycle: &LifecycleOwner,
        scope: &ComponentScope,
        callback: ActionCallback,
    ) {
        let streams = ObservedStreams {
            details: Some(self.details.clone()),
            exceptions: self.exceptions.clone(),
            permissions: Some(self.permissions.clone()),
        };
        let delegate = Arc::downgrade(self);
        self.observers
            .add_observers(streams, lifecycle, scope, callback, move || {
                if let Some(delegate) = delegate.upgrade() {
                    delegate.refresh_status();
                }
            });
    }

    pub fn remove_observer(&self) {
        self.observers.remove_observers();
    }

    /// Stop observing, clear the current handler and release the scope.
    /// Safe to call more than once.
    pub fn on_cleared(&self) {
        #[cfg(feature = "tracing")]
        tracing::debug!("onCleared");
        self.remove_observer();
        let mut state = self.lock_state();
        state.stop_forwarding();
        if let Some(current) = state.current.take() {
            current.handler().on_cleared();
        }
        state.scope = None;
        state.on_redirect = None;
        drop(state);
        self.dispatcher.reset();
    }

    // ========================================================================
    // Actions
    // ========================================================================

    /// Route `action` to its handler.
    ///
    /// Fails when the delegate is not initialized or no handler exists for
    /// the action; everything after that is reported on the streams.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip_all, fields(action_type = action.action_type()))
    )]
    pub fn handle_action(&self, action: Action, activity: ActivityHandle) -> Result<()> {
        let mut state = self.lock_state();
        let scope = state.scope.clone().ok_or_else(|| {
            CheckoutError::checkout("initialize should be called before handleAction")
        })?;

        let resolution =
            self.dispatcher
                .resolve(&action, &self.configuration, &self.saved_state)?;

        let resolved = match resolution {
            Resolution::Reused(resolved) => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Continuing the 3DS2 flow with the existing handler");
                resolved
            }
            Resolution::Created(resolved) => {
                state.stop_forwarding();
                if let Some(previous) = state.current.take() {
                    previous.handler().on_cleared();
                }

                let handler = resolved.handler();
                if let Some(listener) = state.on_redirect.clone() {
                    Self::apply_redirect_listener(&resolved, listener);
                }
                handler.initialize(scope.clone());
                state.forwarders = Self::forward(&scope, &resolved, self);
                #[cfg(feature = "tracing")]
                tracing::info!(kind = %resolved.kind(), "Handling action");
                state.current = Some(resolved.clone());
                resolved
            }
        };
        drop(state);

        resolved.handler().handle_action(action, activity);
        Ok(())
    }

    pub fn handle_intent(&self, intent: Intent) {
        let Some(current) = self.current_handler() else {
            self.exceptions.send(CheckoutError::component(
                "handleIntent should not be called before handleAction",
            ));
            return;
        };
        let intent_handling = current
            .capabilities()
            .handles_intent
            .then(|| current.handler().as_intent_handling())
            .flatten();
        match intent_handling {
            Some(handler) => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Handling intent");
                handler.handle_intent(intent);
            }
            None => {
                self.exceptions.send(CheckoutError::component(
                    "Cannot handle intent with the current component",
                ));
            }
        }
    }

    /// Ask the current handler for an immediate status check. Does nothing
    /// when it does not poll.
    pub fn refresh_status(&self) {
        let Some(current) = self.current_handler() else {
            return;
        };
        if !current.capabilities().polls_status {
            return;
        }
        if let Some(poller) = current.handler().as_status_polling() {
            #[cfg(feature = "tracing")]
            tracing::debug!("Refreshing status");
            poller.refresh_status();
        }
    }

    /// Report an error detected by the host.
    pub fn on_error(&self, error: CheckoutError) {
        match self.current_handler() {
            Some(current) => current.handler().on_error(error),
            None => self.exceptions.send(error),
        }
    }

    /// Called right before the shopper leaves the app for a redirect. Applied
    /// to the current handler and to every handler created afterwards.
    pub fn set_on_redirect_listener(&self, listener: RedirectListener) {
        let mut state = self.lock_state();
        state.on_redirect = Some(listener.clone());
        if let Some(current) = state.current.as_ref() {
            Self::apply_redirect_listener(current, listener);
        }
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn lock_state(&self) -> std::sync::MutexGuard<'_, DelegateState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn apply_redirect_listener(resolved: &ResolvedHandler, listener: RedirectListener) {
        if !resolved.capabilities().redirectable {
            return;
        }
        if let Some(redirectable) = resolved.handler().as_redirectable() {
            redirectable.set_on_redirect_listener(listener);
        }
    }

    /// Pipe the handler's streams into the delegate's. Only the streams
    /// its capabilities advertise are observed; exceptions always are.
    fn forward(scope: &ComponentScope, resolved: &ResolvedHandler, to: &Self) -> Vec<Job> {
        let handler = resolved.handler();
        let capabilities = resolved.capabilities();
        let mut jobs = vec![pipe(scope, handler.exception_channel(), to.exceptions.clone())];
        if capabilities.emits_details {
            if let Some(details) = handler.details_channel() {
                #[cfg(feature = "tracing")]
                tracing::debug!("Observing details");
                jobs.push(pipe(scope, details, to.details.clone()));
            }
        }
        if capabilities.requests_permissions {
            if let Some(permissions) = handler.permission_channel() {
                #[cfg(feature = "tracing")]
                tracing::debug!("Observing permission requests");
                jobs.push(pipe(scope, permissions, to.permissions.clone()));
            }
        }
        if capabilities.provides_view {
            if let Some(view) = handler.view_flow() {
                #[cfg(feature = "tracing")]
                tracing::debug!("Observing view flow");
                jobs.push(mirror(scope, view, to.view.clone()));
            }
        }
        jobs
    }
}

fn pipe<T: Send + 'static>(
    scope: &ComponentScope,
    from: BufferedChannel<T>,
    to: BufferedChannel<T>,
) -> Job {
    scope.spawn(async move {
        while let Some(event) = from.recv().await {
            to.send(event);
        }
    })
}

fn mirror(
    scope: &ComponentScope,
    from: StateFlow<Option<ComponentViewType>>,
    to: StateFlow<Option<ComponentViewType>>,
) -> Job {
    scope.spawn(async move {
        let mut rx = from.subscribe();
        loop {
            let value = *rx.borrow_and_update();
            to.set(value);
            if rx.changed().await.is_err() {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkout_core::image::ImageSaver;
    use checkout_core::test_utils::{TestImageSaver, TestRedirectHandler, TestStatusRepository};
    use checkout_core::{Environment, RedirectHandler, StatusRepository};

    use crate::handler::ActionHandler;
    use crate::redirect_action::RedirectActionHandler;
    use crate::voucher::VoucherHandler;

    struct LocalDependencies;

    impl HandlerDependencies for LocalDependencies {
        fn status_repository(&self, _: &CheckoutConfiguration) -> Arc<dyn StatusRepository> {
            Arc::new(TestStatusRepository::new())
        }

        fn redirect_handler(&self) -> Arc<dyn RedirectHandler> {
            Arc::new(TestRedirectHandler::new())
        }

        fn image_saver(&self) -> Arc<dyn ImageSaver> {
            Arc::new(TestImageSaver::succeeding())
        }
    }

    fn delegate() -> GenericActionDelegate {
        GenericActionDelegate::new(
            Arc::new(CheckoutConfiguration::new(Environment::Test, "test_KEY")),
            SavedState::new(),
            Arc::new(LocalDependencies),
        )
    }

    fn resolved(handler: impl ActionHandler + 'static) -> ResolvedHandler {
        ResolvedHandler::new(Arc::new(handler))
    }

    #[tokio::test]
    async fn test_forwarding_follows_capabilities() {
        let scope = ComponentScope::current().unwrap();
        let delegate = delegate();
        let redirect_handler: Arc<dyn RedirectHandler> = Arc::new(TestRedirectHandler::new());

        // Exceptions and view only.
        let voucher = resolved(VoucherHandler::new(redirect_handler.clone(), SavedState::new()));
        assert!(!voucher.capabilities().emits_details);
        let jobs = GenericActionDelegate::forward(&scope, &voucher, &delegate);
        assert_eq!(jobs.len(), 2);

        // Exceptions, details and view.
        let redirect = resolved(RedirectActionHandler::new(redirect_handler, SavedState::new()));
        assert!(redirect.capabilities().emits_details);
        assert!(!redirect.capabilities().requests_permissions);
        let jobs = GenericActionDelegate::forward(&scope, &redirect, &delegate);
        assert_eq!(jobs.len(), 3);

        scope.cancel();
    }
}
