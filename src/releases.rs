//! Releases: immutable builds deployed to a fleet.
//!
//! - [`list_fleet_releases`] — releases of a fleet, optionally filtered
//!   (e.g. `Filter::new().eq("is_final", false)` for drafts).
//! - [`get_release`] — one release by id.
//! - [`remove_release`] — delete a release.

use serde::{Deserialize, Serialize};

use crate::client::BalenaCloud;
use crate::error::Result;
use crate::odata::{self, Filter};

/// A deployable build of a fleet's application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub id: u64,

    /// Commit hash the release was built from.
    pub commit: String,

    /// Build state: `"success"`, `"failed"`, `"running"`, ...
    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub semver: Option<String>,

    #[serde(default)]
    pub raw_version: Option<String>,

    #[serde(default)]
    pub revision: Option<u64>,

    /// Draft releases are not final and may be superseded.
    #[serde(default)]
    pub is_final: bool,

    #[serde(default)]
    pub is_passing_tests: bool,

    #[serde(rename = "belongs_to__application", with = "odata::reference_id")]
    pub fleet_id: u64,

    #[serde(default)]
    pub created_at: Option<String>,

    #[serde(default)]
    pub start_timestamp: Option<String>,

    #[serde(default)]
    pub end_timestamp: Option<String>,
}

// ── Endpoint functions ──────────────────────────────────────────────────

/// Lists the releases of a fleet, AND-combining `filter` with the fleet
/// membership clause.
///
/// # Errors
///
/// - `Authentication` — the token was rejected (401).
/// - `Connection` — transport failure, timeout or other non-2xx status.
/// - `Decode` — a row did not match [`Release`].
pub async fn list_fleet_releases(
    client: &BalenaCloud,
    fleet_id: u64,
    filter: Option<Filter>,
) -> Result<Vec<Release>> {
    let filter = Filter::new()
        .eq("belongs_to__application", fleet_id)
        .and(filter.unwrap_or_default());
    client.get_collection("release", &filter.to_query()).await
}

/// Retrieves one release by id.
///
/// # Errors
///
/// `ResourceNotFound` when no release has this id, otherwise as for
/// [`list_fleet_releases`].
pub async fn get_release(client: &BalenaCloud, release_id: u64) -> Result<Release> {
    client
        .get_first(&format!("release({release_id})"), &[], || {
            format!("no release found with id {release_id}")
        })
        .await
}

/// Deletes a release. Devices pinned to it are not moved.
///
/// # Errors
///
/// - `Authentication` — the token was rejected (401).
/// - `Connection` — transport failure, timeout or other non-2xx status.
pub async fn remove_release(client: &BalenaCloud, release_id: u64) -> Result<()> {
    client.delete(&format!("release({release_id})")).await
}
