//! Handler selection and 3DS2 handler reuse.


use std::sync::Arc;

use checkout_action::{ActionDispatcher, HandlerKind};
use checkout_core::saved_state::SavedState;
use checkout_core::{CheckoutConfiguration, Environment};
use mock_implementations::*;

fn configuration() -> Arc<CheckoutConfiguration> {
    Arc::new(CheckoutConfiguration::new(Environment::Test, "test_CLIENTKEY"))
}

#[test]
fn test_each_action_gets_its_handler_kind() {
    let dispatcher = ActionDispatcher::new(Arc::new(TestHandlerDependencies::new()));
    let config = configuration();
    let state = SavedState::new();

    let cases = [
        (await_action(), HandlerKind::Await),
        (qr_action("pix"), HandlerKind::QrCode),
        (redirect_action(), HandlerKind::Redirect),
        (fingerprint_action(), HandlerKind::ThreeDS2),
        (voucher_action(), HandlerKind::Voucher),
        (wechat_action(), HandlerKind::WeChatPay),
    ];
    for (action, kind) in cases {
        let resolution = dispatcher.resolve(&action, &config, &state).unwrap();
        assert!(!resolution.is_reused());
        assert_eq!(resolution.handler().kind(), kind, "{}", action.action_type());
    }
}

#[test]
fn test_capabilities_per_handler() {
    let dispatcher = ActionDispatcher::new(Arc::new(TestHandlerDependencies::new()));
    let config = configuration();
    let state = SavedState::new();

    let qr = dispatcher
        .resolve(&qr_action("pix"), &config, &state)
        .unwrap()
        .into_handler()
        .capabilities();
    assert!(qr.emits_details && qr.requests_permissions && qr.polls_status);
    assert!(qr.handles_intent && qr.redirectable && qr.provides_view);

    let voucher = dispatcher
        .resolve(&voucher_action(), &config, &state)
        .unwrap()
        .into_handler()
        .capabilities();
    assert!(voucher.provides_view);
    assert!(!voucher.emits_details && !voucher.handles_intent && !voucher.polls_status);

    let awaiting = dispatcher
        .resolve(&await_action(), &config, &state)
        .unwrap()
        .into_handler()
        .capabilities();
    assert!(awaiting.polls_status && !awaiting.handles_intent && !awaiting.redirectable);
}

#[test]
fn test_challenge_after_fingerprint_reuses_handler() {
    let dispatcher = ActionDispatcher::new(Arc::new(TestHandlerDependencies::new()));
    let config = configuration();
    let state = SavedState::new();

    let fingerprint = dispatcher
        .resolve(&fingerprint_action(), &config, &state)
        .unwrap();
    let challenge = dispatcher
        .resolve(&challenge_action(), &config, &state)
        .unwrap();

    assert!(challenge.is_reused());
    assert!(challenge.handler().is_same_instance(fingerprint.handler()));
}

#[test]
fn test_challenge_after_other_handler_creates_new_one() {
    let dispatcher = ActionDispatcher::new(Arc::new(TestHandlerDependencies::new()));
    let config = configuration();
    let state = SavedState::new();

    dispatcher
        .resolve(&redirect_action(), &config, &state)
        .unwrap();
    let challenge = dispatcher
        .resolve(&challenge_action(), &config, &state)
        .unwrap();

    assert!(!challenge.is_reused());
    assert_eq!(challenge.handler().kind(), HandlerKind::ThreeDS2);
}

#[test]
fn test_non_challenge_after_fingerprint_creates_new_handler() {
    let dispatcher = ActionDispatcher::new(Arc::new(TestHandlerDependencies::new()));
    let config = configuration();
    let state = SavedState::new();

    let fingerprint = dispatcher
        .resolve(&fingerprint_action(), &config, &state)
        .unwrap();
    let second = dispatcher
        .resolve(&fingerprint_action(), &config, &state)
        .unwrap();

    assert!(!second.is_reused());
    assert!(!second.handler().is_same_instance(fingerprint.handler()));
}

#[test]
fn test_unknown_action_has_no_delegate() {
    let dispatcher = ActionDispatcher::new(Arc::new(TestHandlerDependencies::new()));

    let err = dispatcher
        .resolve(&unknown_action(), &configuration(), &SavedState::new())
        .unwrap_err();

    assert_eq!(err.message(), "Can't find delegate for action: bankTransfer");
    assert!(dispatcher.last_resolved().is_none());
}

#[test]
fn test_missing_native_sdk_has_no_delegate() {
    let dispatcher =
        ActionDispatcher::new(Arc::new(TestHandlerDependencies::without_native_sdks()));
    let config = configuration();
    let state = SavedState::new();

    let err = dispatcher
        .resolve(&fingerprint_action(), &config, &state)
        .unwrap_err();
    assert_eq!(
        err.message(),
        "Can't find delegate for action: threeDS2Fingerprint"
    );

    let err = dispatcher
        .resolve(&wechat_action(), &config, &state)
        .unwrap_err();
    assert_eq!(err.message(), "Can't find delegate for action: sdk");
}

#[test]
fn test_reset_forgets_last_handler() {
    let dispatcher = ActionDispatcher::new(Arc::new(TestHandlerDependencies::new()));
    let config = configuration();
    let state = SavedState::new();

    dispatcher
        .resolve(&fingerprint_action(), &config, &state)
        .unwrap();
    dispatcher.reset();

    let challenge = dispatcher
        .resolve(&challenge_action(), &config, &state)
        .unwrap();
    assert!(!challenge.is_reused());
}
