//! Terminal UI utilities

use colored::Colorize;
use console::Term;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub fn success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

pub fn error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

pub fn info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

pub fn warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

pub fn header(text: &str) {
    println!("\n{}", text.bold().underline());
}

pub fn key_value(key: &str, value: &str) {
    println!("  {}: {}", key.cyan(), value);
}

/// Spinner shown while waiting on the backend. Hidden when stdout is not a
/// terminal.
pub fn spinner(message: &str) -> ProgressBar {
    if !Term::stdout().is_term() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Prompt for text input; an empty answer is allowed.
pub fn input(prompt: &str) -> anyhow::Result<String> {
    use dialoguer::Input;
    Ok(Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?)
}

/// Render `data` as a QR code using terminal characters.
pub fn render_qr(data: &str) -> anyhow::Result<String> {
    use qrcode::QrCode;

    let code = QrCode::new(data)?;
    Ok(code
        .render::<char>()
        .quiet_zone(false)
        .module_dimensions(2, 1)
        .build())
}

pub fn qr_code(data: &str) -> anyhow::Result<()> {
    println!("\n{}\n", render_qr(data)?);
    Ok(())
}

pub fn separator() {
    println!("{}", "─".repeat(60).dimmed());
}

pub fn json(value: &serde_json::Value) {
    if let Ok(pretty) = serde_json::to_string_pretty(value) {
        println!("{}", pretty);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_qr() {
        let rendered = render_qr("00020101021226").unwrap();
        assert!(rendered.lines().count() > 10);
        assert!(rendered.contains('█'));
    }
}
