//! One-off payment status check.

use anyhow::Result;
use checkout_core::status::{HttpStatusService, StatusOutcome};
use checkout_core::StatusService;

use super::BackendOptions;
use crate::ui;

pub async fn run(backend: &BackendOptions, payment_data: &str, verbose: bool) -> Result<()> {
    ui::header("Payment Status");

    let configuration = backend.configuration()?;
    let service = HttpStatusService::new(&configuration)?;
    if verbose {
        ui::key_value("Endpoint", service.status_url().as_str());
    }

    let spinner = ui::spinner("Checking status...");
    let result = service.check_status(payment_data).await;
    spinner.finish_and_clear();
    let response = result?;

    ui::key_value("Result code", &response.result_code);
    if let Some(kind) = &response.response_type {
        ui::key_value("Type", kind);
    }
    match response.outcome() {
        StatusOutcome::Pending => ui::info("Payment is still pending"),
        StatusOutcome::Completed(payload) => {
            ui::success("Payment reached a final state");
            ui::key_value("Payload", &payload);
        }
        StatusOutcome::NotCompleted(code) => {
            ui::warning(&format!("Payment was not completed ({})", code));
        }
    }
    Ok(())
}
