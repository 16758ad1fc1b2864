//! Ownership transfer decisions for a single Drive entry.

use tracing::{error, info};

use crate::error::Result;
use crate::models::{DriveEntry, PermissionUpdate};
use crate::walker::Session;

/// What to do with one entry, given the target and the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferDecision {
    /// The target already owns the entry.
    AlreadyOwner,
    /// The target has no permission on the entry at all.
    NoAccess,
    /// A transfer to the target is already waiting for acceptance.
    AlreadyPending,
    /// The authenticated user does not own the entry, so cannot hand it over.
    CallerNotOwner,
    /// Flag the target's existing permission as pending owner.
    Initiate { permission_id: String },
}

/// Result of visiting one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    Skipped,
    Initiated,
}

/// Decide whether `target_email` should be offered ownership of `entry`.
///
/// Guards are checked in a fixed order and the first match wins. Email
/// comparison is exact.
pub fn decide(entry: &DriveEntry, target_email: &str, caller_email: &str) -> TransferDecision {
    if entry.is_owned_by(target_email) {
        return TransferDecision::AlreadyOwner;
    }

    let target = match entry.permission_for(target_email) {
        Some(permission) => permission,
        None => return TransferDecision::NoAccess,
    };

    if target.pending_owner {
        return TransferDecision::AlreadyPending;
    }

    if !entry.is_owned_by(caller_email) {
        return TransferDecision::CallerNotOwner;
    }

    TransferDecision::Initiate {
        permission_id: target.id.clone(),
    }
}

/// Apply [`decide`] to an entry and issue the update when eligible.
///
/// At most one mutating call is made. Update failures are returned to the
/// caller, which logs them and moves on.
pub async fn maybe_transfer(session: &Session, entry: &DriveEntry) -> Result<TransferOutcome> {
    let target = session.target_email.as_str();

    let permission_id = match decide(entry, target, &session.caller_email) {
        TransferDecision::AlreadyOwner => {
            info!("User {} is already owner of the file {} {}", target, entry.id, entry.name);
            return Ok(TransferOutcome::Skipped);
        }
        TransferDecision::NoAccess => {
            info!("User {} does not have access to file {} {}", target, entry.id, entry.name);
            return Ok(TransferOutcome::Skipped);
        }
        TransferDecision::AlreadyPending => {
            info!(
                "User {} is already pending ownership for {} {}",
                target, entry.id, entry.name
            );
            return Ok(TransferOutcome::Skipped);
        }
        TransferDecision::CallerNotOwner => {
            info!("Current user is not the owner of {} {}", entry.id, entry.name);
            return Ok(TransferOutcome::Skipped);
        }
        TransferDecision::Initiate { permission_id } => permission_id,
    };

    match session
        .client
        .update_permission(&entry.id, &permission_id, &PermissionUpdate::pending_owner())
        .await
    {
        Ok(_) => {
            info!("Owner transfer initiated");
            Ok(TransferOutcome::Initiated)
        }
        Err(e) => {
            error!("The API returned an error: {}", e);
            Err(e)
        }
    }
}
