//! Property-based tests for checkout-action
//!
//! These tests use proptest to verify invariants across a wide range of inputs.

#[cfg(test)]
mod timer_properties {
    use checkout_action::qr_code::TimerData;
    use proptest::prelude::*;
    use std::time::Duration;

    proptest! {
        /// Progress stays within 0..=100 and remaining time never exceeds the total
        #[test]
        fn progress_bounded(remaining in 0u64..10_000_000u64, total in 1u64..10_000_000u64) {
            let data = TimerData::new(Duration::from_millis(remaining), Duration::from_millis(total));

            prop_assert!(data.progress_percentage <= 100);
            prop_assert!(data.millis_until_finished <= total);
        }

        /// Less time remaining never means more progress
        #[test]
        fn progress_monotonic(a in 0u64..900_000u64, b in 0u64..900_000u64) {
            let total = Duration::from_secs(900);
            let low = TimerData::new(Duration::from_millis(a.min(b)), total);
            let high = TimerData::new(Duration::from_millis(a.max(b)), total);

            prop_assert!(low.progress_percentage <= high.progress_percentage);
        }
    }
}

#[cfg(test)]
mod presentation_properties {
    use checkout_action::qr_code::{is_viewable, QrCodePaymentMethodConfig};
    use checkout_action::voucher::voucher_view_type;
    use checkout_action::{QrCodeViewType, VoucherViewType};
    use proptest::prelude::*;
    use std::time::Duration;

    proptest! {
        /// Unknown QR methods redirect and fall back to the default presentation
        #[test]
        fn unknown_qr_methods_use_defaults(method in "[a-z]{1,12}") {
            prop_assume!(!["pix", "paynow", "promptpay", "duitnow"].contains(&method.as_str()));

            let config = QrCodePaymentMethodConfig::for_payment_method(
                Some(&method),
                Duration::from_secs(15 * 60),
            );

            prop_assert!(!is_viewable(Some(&method)));
            prop_assert_eq!(config.view_type, QrCodeViewType::Simple);
            prop_assert_eq!(config.max_polling_duration, Duration::from_secs(15 * 60));
            prop_assert!(config.message_key.is_none());
        }

        /// Unknown voucher methods get the simple layout
        #[test]
        fn unknown_voucher_methods_use_simple_view(method in "[a-z]{1,10}") {
            prop_assume!(!["multibanco", "oxxo"].contains(&method.as_str()));

            prop_assert_eq!(voucher_view_type(Some(&method)), VoucherViewType::Simple);
        }
    }
}
