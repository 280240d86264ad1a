//! Handler for `redirect` actions.

use std::sync::Arc;

use checkout_core::saved_state::{PaymentDataRepository, SavedState};
use checkout_core::{
    Action, ActionComponentData, ActivityHandle, CheckoutError, ComponentScope, Intent,
    RedirectHandler, RedirectListener, StateFlow,
};

use crate::handler::{ActionHandler, HandlerKind, HandlerOutputs, IntentHandling, Redirectable};
use crate::view::ComponentViewType;

pub struct RedirectActionHandler {
    redirect_handler: Arc<dyn RedirectHandler>,
    payment_data: PaymentDataRepository,
    outputs: HandlerOutputs,
    view: StateFlow<Option<ComponentViewType>>,
}

impl RedirectActionHandler {
    pub fn new(redirect_handler: Arc<dyn RedirectHandler>, saved_state: SavedState) -> Self {
        Self {
            redirect_handler,
            payment_data: PaymentDataRepository::new(saved_state),
            outputs: HandlerOutputs::new(),
            view: StateFlow::new(None),
        }
    }
}

impl ActionHandler for RedirectActionHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Redirect
    }

    fn initialize(&self, _scope: ComponentScope) {}

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(skip_all, fields(action_type = action.action_type()))
    )]
    fn handle_action(&self, action: Action, activity: ActivityHandle) {
        self.outputs.begin();
        let Action::Redirect(action) = action else {
            self.outputs
                .fail(CheckoutError::component("Unsupported action"));
            return;
        };

        self.payment_data
            .set_payment_data(action.payment_data.as_deref());
        self.view.set(Some(ComponentViewType::Redirect));

        #[cfg(feature = "tracing")]
        tracing::debug!(method = ?action.method, "Launching redirect");
        if let Err(error) = self
            .redirect_handler
            .launch_uri_redirect(activity.as_ref(), action.url.as_deref())
        {
            self.outputs.fail(error);
        }
    }

    fn outputs(&self) -> &HandlerOutputs {
        &self.outputs
    }

    fn on_cleared(&self) {
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

impl IntentHandling for RedirectActionHandler {
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

impl Redirectable for RedirectActionHandler {
    fn set_on_redirect_listener(&self, listener: RedirectListener) {
        self.redirect_handler.set_on_redirect_listener(listener);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkout_core::action::RedirectAction;
    use checkout_core::redirect::DefaultRedirectHandler;
    use checkout_core::test_utils::{TestActivity, TestRedirectHandler};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn redirect_action(url: Option<&str>) -> Action {
        Action::Redirect(RedirectAction {
            payment_method_type: Some("ideal".into()),
            payment_data: Some("pd-redirect".into()),
            method: Some("GET".into()),
            url: url.map(str::to_owned),
        })
    }

    #[test]
    fn test_launch_and_return() {
        let handler = RedirectActionHandler::new(
            Arc::new(DefaultRedirectHandler::new()),
            SavedState::new(),
        );
        let activity = Arc::new(TestActivity::new());

        handler.handle_action(
            redirect_action(Some("https://bank.example/auth")),
            activity.clone(),
        );
        assert_eq!(activity.opened_uris(), vec!["https://bank.example/auth"]);

        handler.handle_intent(Intent::from_uri("myapp://return?redirectResult=XYZ").unwrap());

        let details = handler.outputs().details().drain();
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].details, json!({"redirectResult": "XYZ"}));
        assert_eq!(details[0].payment_data.as_deref(), Some("pd-redirect"));
    }

    #[test]
    fn test_launch_failure_is_reported() {
        let handler = RedirectActionHandler::new(
            Arc::new(DefaultRedirectHandler::new()),
            SavedState::new(),
        );

        handler.handle_action(redirect_action(None), Arc::new(TestActivity::new()));

        let errors = handler.outputs().exceptions().drain();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message(), "Redirect URL is empty.");
    }

    #[test]
    fn test_listener_fires_on_launch_and_is_removed_on_clear() {
        let redirect = Arc::new(TestRedirectHandler::new());
        let handler = RedirectActionHandler::new(redirect.clone(), SavedState::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        handler.set_on_redirect_listener(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        handler.handle_action(
            redirect_action(Some("https://bank.example")),
            Arc::new(TestActivity::new()),
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        handler.on_cleared();
        assert!(!redirect.has_listener());
    }
}
