//! Test doubles for the collaborators action handlers depend on.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use checkout_core::test_utils::{TestStatusRepository, TestRedirectHandler};
//!
//! let repository = Arc::new(TestStatusRepository::new());
//! repository.push(Ok(StatusResponse::pending()));
//! repository.push(Ok(StatusResponse::new("finished", Some("X".into()))));
//! ```

mod platform;
mod status;

pub use platform::{
    PermissionResolution, RecordingPermissionCallback, TestActivity, TestImageSaver, TestRedirectHandler,
    REDIRECT_RESULT_KEY, REDIRECT_RESULT_VALUE,
};
pub use status::TestStatusRepository;
