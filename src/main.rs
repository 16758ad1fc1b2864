//! drive_transfer CLI - Offer ownership of a Drive folder tree to another user.

use std::num::NonZeroU32;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufRead, BufReader};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use drive_transfer::auth::load_client_secrets;
use drive_transfer::client::DEFAULT_REQUESTS_PER_SECOND;
use drive_transfer::walker::DEFAULT_CONCURRENCY;
use drive_transfer::{
    folder_id, Authenticator, DriveClient, Session, TreeWalker, WalkOptions, WalkSummary,
};

/// Start ownership transfers to USER_EMAIL for everything you own under FOLDER.
#[derive(Parser)]
#[command(name = "drive_transfer")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Root folder URL or ID.
    folder: Option<String>,

    /// Email of the user who should become owner.
    user_email: Option<String>,

    /// Path to the OAuth2 client credentials JSON file.
    #[arg(long, env = "GOOGLE_OAUTH_CREDENTIALS", default_value = "credentials.json")]
    credentials: PathBuf,

    /// Path of the cached user token.
    #[arg(long, env = "GOOGLE_OAUTH_TOKEN", default_value = "token.json")]
    token: PathBuf,

    /// Number of folders processed at the same time.
    #[arg(long, env = "DRIVE_TRANSFER_CONCURRENCY", default_value_t = DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Maximum Drive API requests per second.
    #[arg(long, env = "DRIVE_TRANSFER_RATE_LIMIT", default_value_t = DEFAULT_REQUESTS_PER_SECOND)]
    rate_limit: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();
    let stdin = BufReader::new(tokio::io::stdin());

    if let Some(summary) = run(cli, stdin).await? {
        info!("Done: {}", summary);
    }

    Ok(())
}

/// Authorize, look up the caller and walk the tree.
///
/// Returns `None` when the run stops early on a logged condition; errors are
/// reserved for unusable command-line values.
async fn run<R>(cli: Cli, input: R) -> Result<Option<WalkSummary>>
where
    R: AsyncBufRead + Unpin,
{
    let (folder, user_email) = match (cli.folder, cli.user_email) {
        (Some(folder), Some(user_email)) => (folder, user_email),
        _ => {
            println!("Both a folder ID and user email must be provided!");
            return Ok(None);
        }
    };

    let root_id =
        folder_id(&folder).with_context(|| format!("Invalid folder URL or ID: {}", folder))?;

    let rate_limit =
        NonZeroU32::new(cli.rate_limit).context("--rate-limit must be at least 1")?;

    let secrets = match load_client_secrets(&cli.credentials) {
        Ok(secrets) => secrets,
        Err(e) => {
            error!("Error loading client secret file {:?}: {}", cli.credentials, e);
            return Ok(None);
        }
    };

    let auth = match Authenticator::load_or_authorize_with(secrets, &cli.token, input).await {
        Ok(auth) => auth,
        Err(e) => {
            error!("{}", e);
            return Ok(None);
        }
    };

    let client = DriveClient::new(auth, rate_limit);

    let session = match Session::start(client, user_email).await {
        Ok(session) => session,
        Err(e) => {
            error!("Failed to look up the authenticated user: {}", e);
            return Ok(None);
        }
    };

    let options = WalkOptions {
        concurrency: cli.concurrency,
    };
    let summary = TreeWalker::new(Arc::new(session), options)
        .walk(&root_id)
        .await;

    Ok(Some(summary))
}
