//! The handler contract shared by every action variant.
//!
//! A handler owns one kind of action. Besides the mandatory surface on
//! [`ActionHandler`] it may expose optional capabilities (details, view type,
//! permission requests, intent handling, status refresh, redirect listener).
//! The delegate discovers them once through [`Capabilities::of`] and only
//! wires up what is present.
//!
//! # Thread Safety
//!
//! Handlers are shared as `Arc<dyn ActionHandler>` between the delegate and
//! the tasks they spawn, so every implementation is `Send + Sync` and keeps
//! its mutable state behind a lock.

use std::sync::Arc;

use checkout_core::permission::PermissionRequestData;
use checkout_core::{
    Action, ActionComponentData, ActivityHandle, BufferedChannel, CheckoutError, ComponentScope,
    Intent, RedirectListener, StateFlow,
};

use crate::view::ComponentViewType;

/// Which handler family a handler instance belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    Await,
    QrCode,
    Redirect,
    ThreeDS2,
    Voucher,
    WeChatPay,
}

impl HandlerKind {
    pub fn name(&self) -> &'static str {
        match self {
            HandlerKind::Await => "await",
            HandlerKind::QrCode => "qr_code",
            HandlerKind::Redirect => "redirect",
            HandlerKind::ThreeDS2 => "three_ds2",
            HandlerKind::Voucher => "voucher",
            HandlerKind::WeChatPay => "wechat_pay",
        }
    }
}

impl std::fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Processing state of a handler for the action it was last given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandlerState {
    #[default]
    Idle,
    Processing,
    Completed,
    Failed,
}

impl HandlerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, HandlerState::Completed | HandlerState::Failed)
    }
}

// ============================================================================
// Capability interfaces
// ============================================================================

/// Handlers that accept a result delivered back to the app.
pub trait IntentHandling: Send + Sync {
    fn handle_intent(&self, intent: Intent);
}

/// Handlers backed by status polling.
pub trait StatusPolling: Send + Sync {
    /// Ask for an immediate status check of the current payment.
    fn refresh_status(&self);
}

/// Handlers that can leave the app through a redirect.
pub trait Redirectable: Send + Sync {
    fn set_on_redirect_listener(&self, listener: RedirectListener);
}

// ============================================================================
// Handler contract
// ============================================================================

pub trait ActionHandler: Send + Sync {
    fn kind(&self) -> HandlerKind;

    /// Bind the handler to the scope its background work runs in.
    fn initialize(&self, scope: ComponentScope);

    /// Start processing `action`. Outcomes are reported on the handler's
    /// streams, never returned.
    fn handle_action(&self, action: Action, activity: ActivityHandle);

    fn outputs(&self) -> &HandlerOutputs;

    /// Report an externally detected error on the exception stream.
    fn on_error(&self, error: CheckoutError) {
        self.outputs().report(error);
    }

    /// Cancel background work and release platform resources.
    fn on_cleared(&self);

    fn state(&self) -> HandlerState {
        self.outputs().state()
    }

    fn exception_channel(&self) -> BufferedChannel<CheckoutError> {
        self.outputs().exceptions().clone()
    }

    fn details_channel(&self) -> Option<BufferedChannel<ActionComponentData>> {
        Some(self.outputs().details().clone())
    }

    fn permission_channel(&self) -> Option<BufferedChannel<PermissionRequestData>> {
        None
    }

    fn view_flow(&self) -> Option<StateFlow<Option<ComponentViewType>>> {
        None
    }

    fn as_intent_handling(&self) -> Option<&dyn IntentHandling> {
        None
    }

    fn as_status_polling(&self) -> Option<&dyn StatusPolling> {
        None
    }

    fn as_redirectable(&self) -> Option<&dyn Redirectable> {
        None
    }
}

/// Optional capabilities discovered on a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub emits_details: bool,
    pub requests_permissions: bool,
    pub provides_view: bool,
    pub handles_intent: bool,
    pub polls_status: bool,
    pub redirectable: bool,
}

impl Capabilities {
    pub fn of(handler: &dyn ActionHandler) -> Self {
        Self {
            emits_details: handler.details_channel().is_some(),
            requests_permissions: handler.permission_channel().is_some(),
            provides_view: handler.view_flow().is_some(),
            handles_intent: handler.as_intent_handling().is_some(),
            polls_status: handler.as_status_polling().is_some(),
            redirectable: handler.as_redirectable().is_some(),
        }
    }
}

/// A handler together with the capabilities found on it.
#[derive(Clone)]
pub struct ResolvedHandler {
    handler: Arc<dyn ActionHandler>,
    kind: HandlerKind,
    capabilities: Capabilities,
}

impl std::fmt::Debug for ResolvedHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedHandler")
            .field("kind", &self.kind)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

impl ResolvedHandler {
    pub fn new(handler: Arc<dyn ActionHandler>) -> Self {
        let kind = handler.kind();
        let capabilities = Capabilities::of(handler.as_ref());
        Self {
            handler,
            kind,
            capabilities,
        }
    }

    pub fn handler(&self) -> &Arc<dyn ActionHandler> {
        &self.handler
    }

    pub fn kind(&self) -> HandlerKind {
        self.kind
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// True when both refer to the same handler instance.
    pub fn is_same_instance(&self, other: &ResolvedHandler) -> bool {
        Arc::ptr_eq(&self.handler, &other.handler)
    }
}

// ============================================================================
// Output streams
// ============================================================================

/// Details, exception and state outputs of one handler.
///
/// Terminal emissions ([`complete`](Self::complete), [`fail`](Self::fail))
/// are only accepted while the handler is processing, so each
/// `handle_action` produces at most one terminal outcome.
#[derive(Clone)]
pub struct HandlerOutputs {
    details: BufferedChannel<ActionComponentData>,
    exceptions: BufferedChannel<CheckoutError>,
    state: StateFlow<HandlerState>,
}

impl Default for HandlerOutputs {
    fn default() -> Self {
        Self::new()
    }
}

impl HandlerOutputs {
    pub fn new() -> Self {
        Self {
            details: BufferedChannel::new(),
            exceptions: BufferedChannel::new(),
            state: StateFlow::new(HandlerState::Idle),
        }
    }

    pub fn details(&self) -> &BufferedChannel<ActionComponentData> {
        &self.details
    }

    pub fn exceptions(&self) -> &BufferedChannel<CheckoutError> {
        &self.exceptions
    }

    pub fn state(&self) -> HandlerState {
        self.state.value()
    }

    pub fn state_flow(&self) -> &StateFlow<HandlerState> {
        &self.state
    }

    /// Enter `Processing` for a new action.
    pub(crate) fn begin(&self) {
        self.state.set(HandlerState::Processing);
    }

    /// Finish successfully with `data` on the details stream.
    pub(crate) fn complete(&self, data: ActionComponentData) -> bool {
        if self.finish_with(HandlerState::Completed) {
            self.details.send(data);
            true
        } else {
            #[cfg(feature = "tracing")]
            tracing::warn!("Dropping action details emitted outside of processing");
            false
        }
    }

    /// Finish successfully without emitting details.
    pub(crate) fn finish(&self) -> bool {
        self.finish_with(HandlerState::Completed)
    }

    /// Finish with `error` on the exception stream.
    pub(crate) fn fail(&self, error: CheckoutError) -> bool {
        if self.finish_with(HandlerState::Failed) {
            self.exceptions.send(error);
            true
        } else {
            #[cfg(feature = "tracing")]
            tracing::warn!(error = %error, "Dropping failure emitted outside of processing");
            false
        }
    }

    /// Surface a non-terminal error.
    pub(crate) fn report(&self, error: CheckoutError) {
        self.exceptions.send(error);
    }

    fn finish_with(&self, terminal: HandlerState) -> bool {
        self.state.modify(|state| {
            if *state == HandlerState::Processing {
                *state = terminal;
                true
            } else {
                false
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_one_terminal_outcome_per_action() {
        let outputs = HandlerOutputs::new();
        outputs.begin();

        assert!(outputs.complete(ActionComponentData::new(json!({"a": 1}), None)));
        assert!(!outputs.fail(CheckoutError::component("late")));
        assert!(!outputs.complete(ActionComponentData::new(json!({"a": 2}), None)));

        assert_eq!(outputs.state(), HandlerState::Completed);
        assert_eq!(outputs.details().drain().len(), 1);
        assert!(outputs.exceptions().drain().is_empty());
    }

    #[test]
    fn test_report_does_not_end_processing() {
        let outputs = HandlerOutputs::new();
        outputs.begin();
        outputs.report(CheckoutError::component("transient"));

        assert_eq!(outputs.state(), HandlerState::Processing);
        assert!(outputs.fail(CheckoutError::component("fatal")));
        assert_eq!(outputs.exceptions().drain().len(), 2);
        assert!(outputs.state().is_terminal());
    }

    #[test]
    fn test_idle_outputs_reject_terminal_emissions() {
        let outputs = HandlerOutputs::new();
        assert!(!outputs.complete(ActionComponentData::new(json!({}), None)));
        assert!(outputs.details().drain().is_empty());
    }
}
