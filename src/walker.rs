//! Folder tree traversal driving the ownership transfers.

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{error, info};

use crate::client::DriveClient;
use crate::error::Result;
use crate::transfer::{maybe_transfer, TransferOutcome};

/// Default number of folders processed at the same time.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// The authenticated session shared read-only by every folder job.
pub struct Session {
    pub client: DriveClient,
    /// User who should become owner.
    pub target_email: String,
    /// Authenticated user; only entries it owns can be handed over.
    pub caller_email: String,
}

impl Session {
    pub fn new(client: DriveClient, target_email: String, caller_email: String) -> Self {
        Self {
            client,
            target_email,
            caller_email,
        }
    }

    /// Look up the authenticated user once and build the session around it.
    pub async fn start(client: DriveClient, target_email: String) -> Result<Self> {
        let user = client.current_user().await?;
        info!("Authenticated as {}", user.email);
        Ok(Self::new(client, target_email, user.email))
    }
}

#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Upper bound on folders listed and processed concurrently.
    pub concurrency: usize,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

/// Totals for a whole traversal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkSummary {
    pub folders_listed: usize,
    pub entries_seen: usize,
    pub transfers_initiated: usize,
    pub errors: usize,
}

impl WalkSummary {
    fn absorb(&mut self, report: &FolderReport) {
        if report.listed {
            self.folders_listed += 1;
        }
        self.entries_seen += report.entries_seen;
        self.transfers_initiated += report.transfers_initiated;
        self.errors += report.errors;
    }
}

impl fmt::Display for WalkSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} folders listed, {} entries seen, {} transfers initiated, {} errors",
            self.folders_listed, self.entries_seen, self.transfers_initiated, self.errors
        )
    }
}

/// What one folder job found.
#[derive(Debug, Default)]
struct FolderReport {
    listed: bool,
    entries_seen: usize,
    transfers_initiated: usize,
    errors: usize,
    subfolders: Vec<String>,
}

/// Walks a folder tree, offering ownership of every eligible entry.
///
/// Folders wait in a FIFO queue and at most `concurrency` of them are in
/// flight. [`TreeWalker::walk`] returns once every reachable folder has been
/// processed.
pub struct TreeWalker {
    session: Arc<Session>,
    options: WalkOptions,
}

impl TreeWalker {
    pub fn new(session: Arc<Session>, options: WalkOptions) -> Self {
        Self { session, options }
    }

    pub async fn walk(&self, root_id: &str) -> WalkSummary {
        let concurrency = self.options.concurrency.max(1);
        let mut summary = WalkSummary::default();
        let mut queue = VecDeque::from([root_id.to_string()]);
        let mut visited = HashSet::from([root_id.to_string()]);
        let mut jobs = JoinSet::new();

        loop {
            while jobs.len() < concurrency {
                let Some(folder_id) = queue.pop_front() else {
                    break;
                };
                let session = Arc::clone(&self.session);
                jobs.spawn(async move { visit_folder(&session, &folder_id).await });
            }

            let Some(joined) = jobs.join_next().await else {
                break;
            };

            match joined {
                Ok(report) => {
                    summary.absorb(&report);
                    for folder_id in report.subfolders {
                        if visited.insert(folder_id.clone()) {
                            queue.push_back(folder_id);
                        }
                    }
                }
                Err(e) => {
                    error!("Folder task failed: {}", e);
                    summary.errors += 1;
                }
            }
        }

        summary
    }
}

/// List one folder and run the transfer step on each of its entries.
async fn visit_folder(session: &Session, folder_id: &str) -> FolderReport {
    let mut report = FolderReport::default();

    let listing = match session.client.list_children(folder_id).await {
        Ok(listing) => listing,
        Err(e) => {
            error!(folder = %folder_id, "The API returned an error: {}", e);
            report.errors += 1;
            return report;
        }
    };
    report.listed = true;

    if listing.files.is_empty() {
        info!(folder = %folder_id, "No (more) files found.");
        return report;
    }

    info!(folder = %folder_id, "Files:");

    for entry in &listing.files {
        if !entry.is_drive_file() {
            continue;
        }

        info!(folder = %folder_id, "{}", entry);
        report.entries_seen += 1;

        match maybe_transfer(session, entry).await {
            Ok(TransferOutcome::Initiated) => report.transfers_initiated += 1,
            Ok(TransferOutcome::Skipped) => {}
            Err(_) => report.errors += 1,
        }

        if entry.is_folder() {
            report.subfolders.push(entry.id.clone());
        }
    }

    // Per listing, including entries skipped for their kind.
    info!(folder = %folder_id, "Total {} files found", listing.files.len());

    report
}
