//! Face Album CLI - a command line client for the Face Album photo gallery.
//!
//! Sign in with an emailed one-time password or Google, browse photos and
//! faces, upload images and manage face tags from the terminal.

mod commands;

use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use facealbum_core::{ApiClient, Config};

/// Directory for an additional daily-rolling log file
const LOG_DIR_ENV: &str = "FACEALBUM_LOG_DIR";

#[derive(Parser)]
#[command(
    name = "facealbum",
    about = "Command line client for the Face Album photo gallery",
    version
)]
struct Cli {
    /// API base URL (e.g. https://photos.example.com/api)
    #[arg(long, global = true, value_name = "URL")]
    api_domain: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in with a one-time password sent by email
    Login {
        /// Email address (defaults to the last one used)
        #[arg(long)]
        email: Option<String>,
    },

    /// Print the Google sign-in URL
    GoogleUrl {
        /// Origin Google should redirect back to
        #[arg(long)]
        domain: String,
    },

    /// Finish a Google sign-in with the code from the redirect
    GoogleCallback {
        #[arg(long)]
        code: String,

        /// The `state` value from the redirect (web or app)
        #[arg(long)]
        state: Option<String>,
    },

    /// Check whether the stored session is still valid
    Status,

    /// Sign out
    Logout {
        /// Sign out from every device
        #[arg(long)]
        all_devices: bool,
    },

    /// Permanently delete the account and all photos
    DeleteAccount {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },

    /// List detected faces
    Faces {
        #[arg(long, default_value_t = 1)]
        page: u32,
    },

    /// List photos
    Photos {
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Fetch every page
        #[arg(long, conflicts_with = "page")]
        all: bool,
    },

    /// Show one face
    Face { id: i64 },

    /// List photos that show a face
    FacePhotos {
        id: i64,

        #[arg(long, default_value_t = 1)]
        page: u32,
    },

    /// Check whether more photos can be uploaded
    Capacity,

    /// Upload one or more photos
    Upload {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Delete a photo
    DeletePhoto { id: i64 },

    /// Delete a face
    DeleteFace { id: i64 },

    /// Rename a face
    RenameFace { id: i64, name: String },

    /// List faces for a photo, linked faces first
    PhotoFaces {
        photo_id: i64,

        #[arg(long, default_value_t = 1)]
        page: u32,
    },

    /// Tag a face on a photo
    Link { photo_id: i64, face_id: i64 },

    /// Remove a face tag from a photo
    Unlink { photo_id: i64, face_id: i64 },
}

/// Initialize the tracing subscriber for logging
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::env::var(LOG_DIR_ENV) {
        Ok(dir) if !dir.is_empty() => {
            let appender = tracing_appender::rolling::daily(dir, "facealbum.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _log_guard = init_tracing();
    let cli = Cli::parse();

    let mut config = Config::load()?;
    let api_domain = config.resolve_api_domain(cli.api_domain.as_deref());
    info!(api_domain = %api_domain, "Face Album CLI starting");

    let store = config.token_store()?;
    let cookies = config.session_cookies()?;
    let client = ApiClient::with_cookies(api_domain, store, cookies)?;

    commands::run(cli.command, &client, &mut config).await
}
