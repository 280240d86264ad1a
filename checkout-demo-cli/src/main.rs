//! Checkout Demo CLI
//!
//! Command-line interface for exercising payment actions against a checkout
//! backend: handle an action file, decode a return URL, or check a status.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod ui;

use commands::handle_action::HandleActionOptions;
use commands::BackendOptions;

#[derive(Parser)]
#[command(name = "checkout-demo")]
#[command(about = "Checkout Demo CLI - Handle payment actions from the terminal", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Backend environment: test, live, or a base URL
    #[arg(long, global = true, env = "CHECKOUT_ENVIRONMENT", default_value = "test")]
    environment: String,

    /// Client key used to authenticate against the backend
    #[arg(long, global = true, env = "CHECKOUT_CLIENT_KEY", default_value = "")]
    client_key: String,

    /// HTTP request timeout in seconds
    #[arg(long, global = true, default_value_t = 30)]
    timeout: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Handle an action returned by the payments endpoint
    HandleAction {
        /// JSON file holding the action object
        file: PathBuf,

        /// Where downloaded QR codes and vouchers are saved
        #[arg(long)]
        image_dir: Option<PathBuf>,

        /// Give up waiting for the payment after this many seconds
        #[arg(long, default_value_t = 900)]
        wait_secs: u64,

        /// Do not prompt for return URLs
        #[arg(long)]
        no_interactive: bool,
    },

    /// Turn a return URL into payment details
    ParseRedirect {
        /// The URL the shopper was sent back to
        uri: String,
    },

    /// Check the status of a payment once
    Status {
        /// Payment data from the action
        payment_data: String,
    },
}

fn init_tracing(verbose: bool) {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if verbose {
            "checkout_demo_cli=debug,checkout_action=debug,checkout_core=debug".to_string()
        } else {
            "checkout_demo_cli=info,checkout_action=warn,checkout_core=warn".to_string()
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        ui::error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let backend = BackendOptions {
        environment: cli.environment,
        client_key: cli.client_key,
        request_timeout_secs: cli.timeout,
    };

    match cli.command {
        Commands::HandleAction {
            file,
            image_dir,
            wait_secs,
            no_interactive,
        } => {
            let options = HandleActionOptions {
                file,
                image_dir,
                timeout: Duration::from_secs(wait_secs),
                interactive: !no_interactive,
            };
            commands::handle_action::run(&backend, &options, cli.verbose).await
        }
        Commands::ParseRedirect { uri } => commands::parse_redirect::run(&uri, cli.verbose),
        Commands::Status { payment_data } => {
            commands::status::run(&backend, &payment_data, cli.verbose).await
        }
    }
}
