//! Runtime permission requests.
//!
//! A handler that needs an OS permission emits [`PermissionRequestData`] on
//! its permission stream. The host asks the user and resolves the attached
//! callback. [`await_permission`] turns that round-trip into a future.

use std::sync::{Arc, Mutex};

use tokio::sync::oneshot;

use crate::{CheckoutError, Result};

pub const WRITE_EXTERNAL_STORAGE: &str = "android.permission.WRITE_EXTERNAL_STORAGE";

/// Resolution channel for a permission request.
pub trait PermissionHandlerCallback: Send + Sync {
    fn on_permission_granted(&self, required_permission: &str);
    fn on_permission_denied(&self, required_permission: &str);
    fn on_permission_request_not_handled(&self, required_permission: &str);
}

/// A pending permission request surfaced to the host.
#[derive(Clone)]
pub struct PermissionRequestData {
    pub required_permission: String,
    pub callback: Arc<dyn PermissionHandlerCallback>,
}

impl std::fmt::Debug for PermissionRequestData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionRequestData")
            .field("required_permission", &self.required_permission)
            .finish_non_exhaustive()
    }
}

/// Implemented by handlers able to surface permission requests.
pub trait PermissionHandler: Send + Sync {
    fn request_permission(
        &self,
        required_permission: &str,
        callback: Arc<dyn PermissionHandlerCallback>,
    );
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PermissionOutcome {
    Granted,
    Denied,
    NotHandled,
}

struct OneShotCallback {
    tx: Mutex<Option<oneshot::Sender<PermissionOutcome>>>,
}

impl OneShotCallback {
    fn resolve(&self, outcome: PermissionOutcome) {
        if let Some(tx) = self.tx.lock().unwrap_or_else(|e| e.into_inner()).take() {
            let _ = tx.send(outcome);
        }
    }
}

impl PermissionHandlerCallback for OneShotCallback {
    fn on_permission_granted(&self, _required_permission: &str) {
        self.resolve(PermissionOutcome::Granted);
    }

    fn on_permission_denied(&self, _required_permission: &str) {
        self.resolve(PermissionOutcome::Denied);
    }

    fn on_permission_request_not_handled(&self, _required_permission: &str) {
        self.resolve(PermissionOutcome::NotHandled);
    }
}

/// Request `required_permission` and wait until the host resolves it.
///
/// Fails with [`CheckoutError::PermissionRequest`] unless granted.
pub async fn await_permission(
    handler: &dyn PermissionHandler,
    required_permission: &str,
) -> Result<()> {
    let (tx, rx) = oneshot::channel();
    let callback = Arc::new(OneShotCallback {
        tx: Mutex::new(Some(tx)),
    });
    handler.request_permission(required_permission, callback);

    match rx.await {
        Ok(PermissionOutcome::Granted) => Ok(()),
        Ok(PermissionOutcome::Denied) => Err(CheckoutError::PermissionRequest(format!(
            "Permission request denied: {}",
            required_permission
        ))),
        Ok(PermissionOutcome::NotHandled) | Err(_) => Err(CheckoutError::PermissionRequest(
            format!("Permission request not handled: {}", required_permission),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AutoResolve(Option<PermissionOutcome>);

    impl PermissionHandler for AutoResolve {
        fn request_permission(
            &self,
            required_permission: &str,
            callback: Arc<dyn PermissionHandlerCallback>,
        ) {
            match self.0 {
                Some(PermissionOutcome::Granted) => callback.on_permission_granted(required_permission),
                Some(PermissionOutcome::Denied) => callback.on_permission_denied(required_permission),
                Some(PermissionOutcome::NotHandled) => {
                    callback.on_permission_request_not_handled(required_permission)
                }
                None => drop(callback),
            }
        }
    }

    #[tokio::test]
    async fn test_granted_permission_resolves() {
        let handler = AutoResolve(Some(PermissionOutcome::Granted));
        assert!(await_permission(&handler, WRITE_EXTERNAL_STORAGE).await.is_ok());
    }

    #[tokio::test]
    async fn test_denied_and_dropped_requests_fail() {
        for outcome in [Some(PermissionOutcome::Denied), Some(PermissionOutcome::NotHandled), None] {
            let err = await_permission(&AutoResolve(outcome), WRITE_EXTERNAL_STORAGE)
                .await
                .unwrap_err();
            assert!(matches!(err, CheckoutError::PermissionRequest(_)));
        }
    }
}
