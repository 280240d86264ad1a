//! Drive the generic action delegate from the terminal.
//!
//! Reads an action JSON file (as returned by the payments endpoint), hands it
//! to the delegate, and waits until the handler produces details, fails, or
//! the timeout elapses. Redirects are "opened" by printing the URL; the user
//! pastes the return URL back in.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use checkout_action::{
    ComponentViewType, DefaultHandlerDependencies, GenericActionDelegate, HandlerState,
    QrCodeViewType,
};
use checkout_core::saved_state::SavedState;
use checkout_core::status::HttpStatusService;
use checkout_core::{Action, ActionComponentData, Activity, ComponentScope, Intent};
use tokio::task::JoinHandle;
use url::Url;

use super::BackendOptions;
use crate::ui;

#[derive(Debug, Clone)]
pub struct HandleActionOptions {
    pub file: PathBuf,
    pub image_dir: Option<PathBuf>,
    pub timeout: Duration,
    /// Prompt for return URLs after redirects.
    pub interactive: bool,
}

/// Prints redirect URLs instead of opening a browser.
struct TerminalActivity;

impl Activity for TerminalActivity {
    fn open_uri(&self, uri: &Url) -> checkout_core::Result<()> {
        ui::info(&format!("Open this URL to continue: {}", uri));
        Ok(())
    }
}

/// How the wait for the delegate ended.
#[derive(Debug)]
enum Finish {
    Details(ActionComponentData),
    /// The handler is done but has nothing to submit (vouchers).
    Presented,
    TimedOut,
}

pub async fn run(backend: &BackendOptions, options: &HandleActionOptions, verbose: bool) -> Result<()> {
    let raw = std::fs::read_to_string(&options.file)
        .with_context(|| format!("Failed to read {}", options.file.display()))?;
    let action = Action::from_json(&raw).context("Failed to parse action JSON")?;

    ui::header(&format!("Action: {}", action.action_type()));
    for (key, value) in summary(&action) {
        ui::key_value(key, &value);
    }
    if let Action::QrCode(qr) = &action {
        if let Some(data) = &qr.qr_code_data {
            ui::qr_code(data)?;
        }
    }

    let configuration = Arc::new(backend.configuration()?);
    let status_service = Arc::new(HttpStatusService::new(&configuration)?);
    let image_dir = options.image_dir.clone().unwrap_or_else(default_image_dir);
    if verbose {
        ui::key_value("Status endpoint", status_service.status_url().as_str());
        ui::key_value("Image directory", &image_dir.display().to_string());
    }
    let dependencies = DefaultHandlerDependencies::with_image_directory(status_service, &image_dir);

    let delegate = Arc::new(GenericActionDelegate::new(
        configuration,
        SavedState::new(),
        Arc::new(dependencies),
    ));
    let scope = ComponentScope::current()?;
    delegate.initialize(scope.clone());
    delegate.set_on_redirect_listener(Arc::new(|| {
        tracing::debug!("Leaving the app for a redirect");
    }));

    delegate.handle_action(action, Arc::new(TerminalActivity))?;
    let finish = wait(&delegate, options).await;

    delegate.on_cleared();
    scope.cancel();

    ui::separator();
    match finish? {
        Finish::Details(details) => {
            ui::success("Submit these details to the payment details endpoint:");
            ui::json(&serde_json::to_value(&details)?);
        }
        Finish::Presented => ui::success("Action presented; nothing to submit"),
        Finish::TimedOut => bail!("Timed out after {}s", options.timeout.as_secs()),
    }
    Ok(())
}

const WAITING: &str = "Waiting for the payment to finish...";
const RETURN_URL_PROMPT: &str = "Paste the URL you were sent back to (empty to keep waiting)";

/// What a view change asks of the wait loop.
#[derive(Debug)]
enum ViewChange {
    Finished(Finish),
    AskForReturnUrl,
    Ignored,
}

async fn wait(delegate: &GenericActionDelegate, options: &HandleActionOptions) -> Result<Finish> {
    let deadline = tokio::time::sleep(options.timeout);
    tokio::pin!(deadline);
    let mut view = delegate.view_flow().subscribe();
    let mut spinner = ui::spinner(WAITING);
    // The prompt blocks on stdin, so it runs off the runtime while events keep flowing.
    let mut prompt: Option<JoinHandle<Result<String>>> = None;

    let mut change = on_view_change(*view.borrow_and_update(), options.interactive);
    let finish = loop {
        match std::mem::replace(&mut change, ViewChange::Ignored) {
            ViewChange::Finished(finish) => break Ok(finish),
            ViewChange::AskForReturnUrl if prompt.is_none() => {
                spinner.finish_and_clear();
                prompt = Some(tokio::task::spawn_blocking(|| ui::input(RETURN_URL_PROMPT)));
            }
            _ => {}
        }

        tokio::select! {
            Some(details) = delegate.details().recv() => break Ok(Finish::Details(details)),
            Some(error) = delegate.exceptions().recv() => {
                spinner.suspend(|| ui::error(&error.message()));
                if handler_state(delegate) == Some(HandlerState::Failed) {
                    break Err(error.into());
                }
            }
            Some(request) = delegate.permissions().recv() => {
                spinner.suspend(|| ui::info(&format!("Granting {}", request.required_permission)));
                request.callback.on_permission_granted(&request.required_permission);
            }
            answer = async {
                match prompt.as_mut() {
                    Some(task) => task.await,
                    None => std::future::pending().await,
                }
            } => {
                prompt = None;
                spinner = ui::spinner(WAITING);
                let intent = answer
                    .context("Return URL prompt stopped")
                    .and_then(|answer| answer)
                    .and_then(|answer| return_intent(&answer));
                match intent {
                    Ok(Some(intent)) => delegate.handle_intent(intent),
                    Ok(None) => {}
                    Err(e) => break Err(e),
                }
            }
            Ok(()) = view.changed() => {
                change = on_view_change(*view.borrow_and_update(), options.interactive);
            }
            _ = &mut deadline => break Ok(Finish::TimedOut),
        }
    };
    spinner.finish_and_clear();

    if let Some(task) = prompt.take() {
        ui::info("Press Enter to continue");
        // The answer no longer matters; the payment already finished.
        let _ = task.await;
    }
    finish
}

/// Vouchers end the wait; redirects ask for the return URL when interactive.
fn on_view_change(view: Option<ComponentViewType>, interactive: bool) -> ViewChange {
    match view {
        Some(ComponentViewType::Voucher(_)) => ViewChange::Finished(Finish::Presented),
        Some(ComponentViewType::Redirect)
        | Some(ComponentViewType::QrCode(QrCodeViewType::Redirect))
            if interactive =>
        {
            ViewChange::AskForReturnUrl
        }
        _ => ViewChange::Ignored,
    }
}

/// The intent to deliver for a pasted return URL. Empty answers keep waiting.
fn return_intent(answer: &str) -> Result<Option<Intent>> {
    let answer = answer.trim();
    if answer.is_empty() {
        return Ok(None);
    }
    let intent = Intent::from_uri(answer).with_context(|| format!("Invalid return URL: {}", answer))?;
    Ok(Some(intent))
}

fn handler_state(delegate: &GenericActionDelegate) -> Option<HandlerState> {
    delegate
        .current_handler()
        .map(|current| current.handler().state())
}

/// Key facts about `action` worth showing before handling it.
fn summary(action: &Action) -> Vec<(&'static str, String)> {
    let mut rows = Vec::new();
    if let Some(method) = action.payment_method_type() {
        rows.push(("Payment method", method.to_string()));
    }
    match action {
        Action::Redirect(redirect) => {
            if let Some(url) = &redirect.url {
                rows.push(("Redirect URL", url.clone()));
            }
        }
        Action::QrCode(qr) => {
            if let Some(url) = &qr.url {
                rows.push(("Issuer URL", url.clone()));
            }
        }
        Action::Voucher(voucher) => {
            let fields = [
                ("Reference", &voucher.reference),
                ("Expires at", &voucher.expires_at),
                ("Merchant", &voucher.merchant_name),
                ("Download", &voucher.download_url),
                ("Instructions", &voucher.instructions_url),
            ];
            for (key, value) in fields {
                if let Some(value) = value {
                    rows.push((key, value.clone()));
                }
            }
            if let Some(amount) = &voucher.total_amount {
                rows.push(("Total", format!("{} {}", amount.value, amount.currency)));
            }
        }
        Action::Await(_) => rows.push(("Next step", "Confirm the payment in your app".into())),
        _ => {}
    }
    rows
}

fn default_image_dir() -> PathBuf {
    dirs::picture_dir()
        .or_else(dirs::download_dir)
        .unwrap_or_else(|| Path::new(".").to_path_buf())
        .join("checkout-demo")
}
