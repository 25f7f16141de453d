//! Fleet lookup and fleet-scoped listings.
//!
//! Fleets are called `application` on the wire. This module covers:
//!
//! - [`list_fleets`] — fleets directly accessible by the user.
//! - [`get_fleet`] — one fleet by id, slug or name.
//! - [`list_organization_fleets`] — fleets owned by an organization.
//! - [`list_fleet_devices`] — devices in a fleet, optionally filtered.
//!
//! Releases of a fleet live in [`crate::releases::list_fleet_releases`].

use serde::{Deserialize, Serialize};

use crate::client::BalenaCloud;
use crate::devices::Device;
use crate::error::{BalenaCloudError, Result};
use crate::odata::{self, Filter, quote};

/// A named group of devices running the same application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fleet {
    pub id: u64,

    #[serde(rename = "app_name")]
    pub name: String,

    /// `<organization handle>/<fleet name>`, lowercase.
    pub slug: String,

    #[serde(rename = "organization", with = "odata::reference_id")]
    pub organization_id: u64,

    #[serde(
        rename = "is_for__device_type",
        default,
        with = "odata::option_reference_id"
    )]
    pub device_type_id: Option<u64>,

    #[serde(default)]
    pub is_public: bool,

    #[serde(default)]
    pub is_host: bool,

    #[serde(default)]
    pub is_archived: bool,

    #[serde(default)]
    pub created_at: Option<String>,
}

/// How to identify a single fleet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FleetRef {
    Id(u64),
    Slug(String),
    Name(String),
}

/// Optional identifying fields. Precedence: id, then slug, then name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FleetLookup {
    pub id: Option<u64>,
    pub slug: Option<String>,
    pub name: Option<String>,
}

impl TryFrom<FleetLookup> for FleetRef {
    type Error = BalenaCloudError;

    fn try_from(lookup: FleetLookup) -> Result<Self> {
        match (lookup.id, lookup.slug, lookup.name) {
            (Some(id), _, _) => Ok(FleetRef::Id(id)),
            (None, Some(slug), _) => Ok(FleetRef::Slug(slug)),
            (None, None, Some(name)) => Ok(FleetRef::Name(name)),
            (None, None, None) => Err(BalenaCloudError::ParameterValidation(
                "you must provide either a fleet id, a fleet slug or a fleet name".to_string(),
            )),
        }
    }
}

// ── Endpoint functions ──────────────────────────────────────────────────

/// Lists every fleet the authenticated user can access directly.
///
/// # Errors
///
/// - `Authentication` — the token was rejected (401).
/// - `Connection` — transport failure, timeout or other non-2xx status.
/// - `Decode` — a row did not match [`Fleet`]. One bad row fails the
///   whole list.
pub async fn list_fleets(client: &BalenaCloud) -> Result<Vec<Fleet>> {
    let filter = Filter::new().raw("is_directly_accessible_by__user/any(dau:true)");
    client.get_collection("application", &filter.to_query()).await
}

/// Retrieves one fleet by id, slug or name.
///
/// Lookup by name goes through a `$filter` on the collection; the other
/// two address the entity by key. Names are unique only within an
/// organization, so a name lookup returns the first match.
///
/// # Errors
///
/// - `ParameterValidation` — an empty [`FleetLookup`] was given.
/// - `ResourceNotFound` — the API returned no row.
/// - `Authentication`, `Connection` — as for [`list_fleets`].
/// - `Decode` — the first row did not match [`Fleet`].
pub async fn get_fleet<R>(client: &BalenaCloud, fleet: R) -> Result<Fleet>
where
    R: TryInto<FleetRef>,
    BalenaCloudError: From<R::Error>,
{
    let (uri, query) = match fleet.try_into()? {
        FleetRef::Id(id) => (format!("application({id})"), Vec::new()),
        FleetRef::Slug(slug) => (format!("application(slug={})", quote(&slug)), Vec::new()),
        FleetRef::Name(name) => (
            "application".to_string(),
            Filter::new().eq("app_name", name).to_query(),
        ),
    };
    client
        .get_first(&uri, &query, || {
            "no fleet found with the provided id, slug or name".to_string()
        })
        .await
}

/// Lists the fleets owned by the organization with the given handle.
/// An unknown handle yields an empty list, not an error.
pub async fn list_organization_fleets(
    client: &BalenaCloud,
    org_handle: &str,
) -> Result<Vec<Fleet>> {
    let filter = Filter::new().any("organization", "o", "handle", org_handle);
    client.get_collection("application", &filter.to_query()).await
}

/// Lists the devices of a fleet.
///
/// `filter` narrows the result further; it is AND-combined with the
/// fleet membership clause, e.g. `Filter::new().eq("is_online", true)`.
///
/// # Errors
///
/// - `Connection` — includes 400 for a filter the API cannot parse.
/// - `Authentication` — the token was rejected (401).
/// - `Decode` — a row did not match [`Device`].
pub async fn list_fleet_devices(
    client: &BalenaCloud,
    fleet_id: u64,
    filter: Option<Filter>,
) -> Result<Vec<Device>> {
    let filter = Filter::new()
        .eq("belongs_to__application", fleet_id)
        .and(filter.unwrap_or_default());
    client.get_collection("device", &filter.to_query()).await
}
