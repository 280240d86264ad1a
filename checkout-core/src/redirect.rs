//! Redirect launching and result parsing.
//!
//! Handlers never talk to the platform directly. Launching goes through an
//! [`Activity`] supplied by the host, and returning deep links arrive as an
//! [`Intent`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::{json, Map, Value};
use url::Url;

use crate::{CheckoutError, Result};

/// Host capability able to open external URIs (browser, banking app).
pub trait Activity: Send + Sync {
    /// Open `uri`. Fails when nothing on the device can handle it.
    fn open_uri(&self, uri: &Url) -> Result<()>;
}

pub type ActivityHandle = Arc<dyn Activity>;

/// Data delivered by the platform when control returns to the app.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Intent {
    pub data: Option<Url>,
    pub extras: HashMap<String, String>,
}

impl Intent {
    pub fn new(data: Option<Url>) -> Self {
        Self {
            data,
            extras: HashMap::new(),
        }
    }

    /// Intent whose data is the given deep link.
    pub fn from_uri(uri: &str) -> Result<Self> {
        Ok(Self::new(Some(Url::parse(uri)?)))
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extras.insert(key.into(), value.into());
        self
    }
}

/// Invoked right before an external launch.
pub type RedirectListener = Arc<dyn Fn() + Send + Sync>;

pub trait RedirectHandler: Send + Sync {
    /// Launch `url` through `activity`.
    fn launch_uri_redirect(&self, activity: &dyn Activity, url: Option<&str>) -> Result<()>;

    /// Turn a returning deep link into a details payload.
    fn parse_redirect_result(&self, data: Option<&Url>) -> Result<Value>;

    /// Register the single redirect listener, replacing any previous one.
    fn set_on_redirect_listener(&self, listener: RedirectListener);

    fn remove_on_redirect_listener(&self);
}

const REDIRECT_RESULT: &str = "redirectResult";
const PAYLOAD: &str = "payload";
const PA_RES: &str = "PaRes";
const MD: &str = "MD";
const RETURN_URL_QUERY_STRING: &str = "returnUrlQueryString";

/// Parses redirect results and launches URIs through the host [`Activity`].
#[derive(Default)]
pub struct DefaultRedirectHandler {
    listener: Mutex<Option<RedirectListener>>,
}

impl DefaultRedirectHandler {
    pub fn new() -> Self {
        Self::default()
    }

    fn parse_launch_url(url: Option<&str>) -> Result<Url> {
        let raw = url
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| CheckoutError::checkout("Redirect URL is empty."))?;
        Url::parse(raw)
            .map_err(|e| CheckoutError::checkout(format!("Redirect URL is malformed: {}", e)))
    }

    pub fn has_listener(&self) -> bool {
        self.listener
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }
}

impl RedirectHandler for DefaultRedirectHandler {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, activity)))]
    fn launch_uri_redirect(&self, activity: &dyn Activity, url: Option<&str>) -> Result<()> {
        let url = Self::parse_launch_url(url)?;

        let listener = self
            .listener
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        if let Some(listener) = listener {
            listener();
        }

        activity.open_uri(&url).map_err(|e| {
            CheckoutError::checkout(format!("Could not launch redirect to {}: {}", url, e))
        })
    }

    fn parse_redirect_result(&self, data: Option<&Url>) -> Result<Value> {
        let data = data.ok_or_else(|| CheckoutError::checkout("Received a null redirect Uri"))?;
        let params: HashMap<String, String> = data.query_pairs().into_owned().collect();

        let mut details = Map::new();
        if let Some(value) = params.get(REDIRECT_RESULT) {
            details.insert(REDIRECT_RESULT.into(), json!(value));
        } else if let Some(value) = params.get(PAYLOAD) {
            details.insert(PAYLOAD.into(), json!(value));
        } else if let (Some(pa_res), Some(md)) = (params.get(PA_RES), params.get(MD)) {
            details.insert(PA_RES.into(), json!(pa_res));
            details.insert(MD.into(), json!(md));
        } else {
            match data.query().filter(|q| !q.is_empty()) {
                Some(query) => {
                    details.insert(RETURN_URL_QUERY_STRING.into(), json!(query));
                }
                None => {
                    return Err(CheckoutError::checkout(
                        "Error parsing redirect result, could not find any query parameters",
                    ))
                }
            }
        }
        Ok(Value::Object(details))
    }

    fn set_on_redirect_listener(&self, listener: RedirectListener) {
        *self.listener.lock().unwrap_or_else(|e| e.into_inner()) = Some(listener);
    }

    fn remove_on_redirect_listener(&self) {
        *self.listener.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct RecordingActivity {
        opened: Mutex<Vec<String>>,
        fail: bool,
    }

    impl Activity for RecordingActivity {
        fn open_uri(&self, uri: &Url) -> Result<()> {
            if self.fail {
                return Err(CheckoutError::checkout("No activity found"));
            }
            self.opened.lock().unwrap().push(uri.to_string());
            Ok(())
        }
    }

    fn activity(fail: bool) -> RecordingActivity {
        RecordingActivity {
            opened: Mutex::new(Vec::new()),
            fail,
        }
    }

    #[test]
    fn test_parse_redirect_result_variants() {
        let handler = DefaultRedirectHandler::new();

        let url = Url::parse("myapp://return?redirectResult=abc%3D%3D").unwrap();
        assert_eq!(
            handler.parse_redirect_result(Some(&url)).unwrap(),
            json!({"redirectResult": "abc=="})
        );

        let url = Url::parse("myapp://return?payload=xyz").unwrap();
        assert_eq!(
            handler.parse_redirect_result(Some(&url)).unwrap(),
            json!({"payload": "xyz"})
        );

        let url = Url::parse("myapp://return?PaRes=pa&MD=md").unwrap();
        assert_eq!(
            handler.parse_redirect_result(Some(&url)).unwrap(),
            json!({"PaRes": "pa", "MD": "md"})
        );

        let url = Url::parse("myapp://return?foo=bar").unwrap();
        assert_eq!(
            handler.parse_redirect_result(Some(&url)).unwrap(),
            json!({"returnUrlQueryString": "foo=bar"})
        );
    }

    #[test]
    fn test_parse_redirect_result_without_parameters_fails() {
        let handler = DefaultRedirectHandler::new();
        let url = Url::parse("myapp://return").unwrap();

        assert!(handler.parse_redirect_result(Some(&url)).is_err());
        assert!(handler.parse_redirect_result(None).is_err());
    }

    #[test]
    fn test_launch_invokes_listener_before_opening() {
        let handler = DefaultRedirectHandler::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        handler.set_on_redirect_listener(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let activity = activity(false);
        handler
            .launch_uri_redirect(&activity, Some("https://bank.example/pay?id=1"))
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            activity.opened.lock().unwrap().as_slice(),
            ["https://bank.example/pay?id=1"]
        );
    }

    #[test]
    fn test_launch_failures() {
        let handler = DefaultRedirectHandler::new();

        assert!(handler.launch_uri_redirect(&activity(false), None).is_err());
        assert!(handler
            .launch_uri_redirect(&activity(false), Some("not a url"))
            .is_err());
        assert!(handler
            .launch_uri_redirect(&activity(true), Some("https://bank.example"))
            .is_err());
    }

    #[test]
    fn test_listener_slot_is_single() {
        let handler = DefaultRedirectHandler::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let c = first.clone();
        handler.set_on_redirect_listener(Arc::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        let c = second.clone();
        handler.set_on_redirect_listener(Arc::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));

        handler
            .launch_uri_redirect(&activity(false), Some("https://bank.example"))
            .unwrap();
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);

        handler.remove_on_redirect_listener();
        assert!(!handler.has_listener());
    }
}
