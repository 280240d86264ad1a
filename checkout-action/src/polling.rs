//! Status polling loop shared by the await and QR handlers.

use checkout_core::saved_state::PaymentDataRepository;
use checkout_core::status::{StatusOutcome, StatusStream};
use checkout_core::{ActionComponentData, CheckoutError, ComponentScope, Job, StatusResponse};
use futures::StreamExt;
use serde_json::json;

use crate::handler::HandlerOutputs;

/// Key of the details object sent when polling finishes with a payload.
pub const PAYLOAD_DETAILS_KEY: &str = "payload";

/// Consume `stream` in `scope` until a terminal response arrives.
///
/// `on_response` sees every successful response before it is classified.
/// A terminal response with a payload completes the handler; one without
/// fails it. Stream errors are reported and polling continues.
pub(crate) fn launch_polling<F>(
    scope: &ComponentScope,
    mut stream: StatusStream,
    outputs: HandlerOutputs,
    payment_data: PaymentDataRepository,
    on_response: F,
) -> Job
where
    F: Fn(&StatusResponse) + Send + 'static,
{
    scope.spawn(async move {
        while let Some(result) = stream.next().await {
            match result {
                Ok(response) => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(result_code = %response.result_code, "Status changed");
                    on_response(&response);
                    match response.outcome() {
                        StatusOutcome::Pending => {}
                        StatusOutcome::Completed(payload) => {
                            let details = json!({ PAYLOAD_DETAILS_KEY: payload });
                            outputs.complete(ActionComponentData::new(
                                details,
                                payment_data.payment_data(),
                            ));
                            break;
                        }
                        StatusOutcome::NotCompleted(result_code) => {
                            outputs.fail(CheckoutError::component(format!(
                                "Payment was not completed. - {}",
                                result_code
                            )));
                            break;
                        }
                    }
                }
                Err(error) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(error = %error, "Error while polling status");
                    outputs.report(CheckoutError::component_with_cause(
                        "Error while polling status",
                        error,
                    ));
                }
            }
        }
    })
}
