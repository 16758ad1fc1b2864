//! drive_transfer - Hand over ownership of a Google Drive folder tree.
//!
//! This library provides functionality to:
//! - Authorize against Google with an installed-app OAuth2 client and a cached token
//! - Walk a Drive folder tree with a bounded number of concurrent folder jobs
//! - Start Drive's two-phase ownership transfer for every file the caller owns
//!   and the target user can already access
//!
//! # Example
//!
//! ```no_run
//! use std::num::NonZeroU32;
//! use std::sync::Arc;
//!
//! use drive_transfer::{Authenticator, DriveClient, Session, TreeWalker, WalkOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let auth = Authenticator::load_or_authorize("credentials.json", "token.json").await?;
//!     let client = DriveClient::new(auth, NonZeroU32::new(10).unwrap());
//!     let session = Session::start(client, "new-owner@example.com".to_string()).await?;
//!
//!     let summary = TreeWalker::new(Arc::new(session), WalkOptions::default())
//!         .walk("folder-id")
//!         .await;
//!     println!("{}", summary);
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod transfer;
pub mod url_parser;
pub mod walker;

// Re-exports for convenience
pub use auth::Authenticator;
pub use client::{DriveClient, Endpoints};
pub use error::{DriveError, Result};
pub use models::{DriveEntry, Permission};
pub use transfer::{decide, maybe_transfer, TransferDecision, TransferOutcome};
pub use url_parser::folder_id;
pub use walker::{Session, TreeWalker, WalkOptions, WalkSummary};
