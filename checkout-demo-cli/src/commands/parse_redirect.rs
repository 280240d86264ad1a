//! Normalize a returning deep link into payment details.

use anyhow::{Context, Result};
use checkout_core::redirect::DefaultRedirectHandler;
use checkout_core::RedirectHandler;
use serde_json::Value;
use url::Url;

use crate::ui;

pub fn details_for(uri: &str) -> Result<Value> {
    let url = Url::parse(uri).with_context(|| format!("'{}' is not a valid URI", uri))?;
    Ok(DefaultRedirectHandler::new().parse_redirect_result(Some(&url))?)
}

pub fn run(uri: &str, verbose: bool) -> Result<()> {
    ui::header("Redirect Result");
    if verbose {
        ui::key_value("URI", uri);
    }

    let details = details_for(uri)?;
    ui::json(&details);
    Ok(())
}
