use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use url::Url;

use crate::image::ImageSaver;
use crate::permission::{await_permission, PermissionHandler, PermissionHandlerCallback};
use crate::redirect::{Activity, RedirectHandler, RedirectListener};
use crate::{CheckoutError, Result};

pub const REDIRECT_RESULT_KEY: &str = "returnUrlQueryString";
pub const REDIRECT_RESULT_VALUE: &str = "redirect-result";

/// Redirect handler with a fixed parse result and an injectable failure.
#[derive(Default)]
pub struct TestRedirectHandler {
    exception: Mutex<Option<CheckoutError>>,
    launched: Mutex<Vec<Option<String>>>,
    listener: Mutex<Option<RedirectListener>>,
    parse_calls: AtomicUsize,
}

impl TestRedirectHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every launch and parse fail with `exception`.
    pub fn set_exception(&self, exception: Option<CheckoutError>) {
        *self.exception.lock().unwrap_or_else(|e| e.into_inner()) = exception;
    }

    pub fn redirect_result() -> Value {
        let mut details = Map::new();
        details.insert(REDIRECT_RESULT_KEY.into(), json!(REDIRECT_RESULT_VALUE));
        Value::Object(details)
    }

    pub fn launched_urls(&self) -> Vec<Option<String>> {
        self.launched.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn parse_calls(&self) -> usize {
        self.parse_calls.load(Ordering::SeqCst)
    }

    pub fn has_listener(&self) -> bool {
        self.listener
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    fn exception(&self) -> Option<CheckoutError> {
        self.exception.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl RedirectHandler for TestRedirectHandler {
    fn launch_uri_redirect(&self, _activity: &dyn Activity, url: Option<&str>) -> Result<()> {
        self.launched
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(url.map(str::to_owned));
        if let Some(exception) = self.exception() {
            return Err(exception);
        }
        let listener = self.listener.lock().unwrap_or_else(|e| e.into_inner()).clone();
        if let Some(listener) = listener {
            listener();
        }
        Ok(())
    }

    fn parse_redirect_result(&self, _data: Option<&Url>) -> Result<Value> {
        self.parse_calls.fetch_add(1, Ordering::SeqCst);
        match self.exception() {
            Some(exception) => Err(exception),
            None => Ok(Self::redirect_result()),
        }
    }

    fn set_on_redirect_listener(&self, listener: RedirectListener) {
        *self.listener.lock().unwrap_or_else(|e| e.into_inner()) = Some(listener);
    }

    fn remove_on_redirect_listener(&self) {
        *self.listener.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

/// Activity recording every URI it is asked to open.
#[derive(Default)]
pub struct TestActivity {
    opened: Mutex<Vec<String>>,
    fail: bool,
}

impl TestActivity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Activity for which no app can handle any URI.
    pub fn failing() -> Self {
        Self {
            opened: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn opened_uris(&self) -> Vec<String> {
        self.opened.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Activity for TestActivity {
    fn open_uri(&self, uri: &Url) -> Result<()> {
        if self.fail {
            return Err(CheckoutError::checkout("No activity found to handle intent"));
        }
        self.opened
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(uri.to_string());
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionResolution {
    Granted(String),
    Denied(String),
    NotHandled(String),
}

/// Permission callback that records how it was resolved.
#[derive(Default)]
pub struct RecordingPermissionCallback {
    resolutions: Mutex<Vec<PermissionResolution>>,
}

impl RecordingPermissionCallback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolutions(&self) -> Vec<PermissionResolution> {
        self.resolutions.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn record(&self, resolution: PermissionResolution) {
        self.resolutions
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(resolution);
    }
}

impl PermissionHandlerCallback for RecordingPermissionCallback {
    fn on_permission_granted(&self, required_permission: &str) {
        self.record(PermissionResolution::Granted(required_permission.to_owned()));
    }

    fn on_permission_denied(&self, required_permission: &str) {
        self.record(PermissionResolution::Denied(required_permission.to_owned()));
    }

    fn on_permission_request_not_handled(&self, required_permission: &str) {
        self.record(PermissionResolution::NotHandled(required_permission.to_owned()));
    }
}

/// Image saver that optionally asks for a permission and then reports a
/// scripted outcome.
pub struct TestImageSaver {
    required_permission: Option<String>,
    failure: Option<CheckoutError>,
    saved: Mutex<Vec<(String, String)>>,
}

impl TestImageSaver {
    pub fn succeeding() -> Self {
        Self {
            required_permission: None,
            failure: None,
            saved: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: CheckoutError) -> Self {
        Self {
            failure: Some(error),
            ..Self::succeeding()
        }
    }

    /// Ask the handler for `permission` before saving.
    pub fn requiring_permission(permission: impl Into<String>) -> Self {
        Self {
            required_permission: Some(permission.into()),
            ..Self::succeeding()
        }
    }

    /// Every `(image_url, file_name)` successfully saved.
    pub fn saved(&self) -> Vec<(String, String)> {
        self.saved.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl ImageSaver for TestImageSaver {
    async fn save_image_from_url(
        &self,
        permission_handler: &dyn PermissionHandler,
        image_url: &str,
        file_name: &str,
    ) -> Result<PathBuf> {
        if let Some(permission) = &self.required_permission {
            await_permission(permission_handler, permission).await?;
        }
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }
        self.saved
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((image_url.to_owned(), file_name.to_owned()));
        Ok(PathBuf::from(file_name))
    }
}
