//! Organization lookup.
//!
//! - [`list_organizations`] — every organization the token can see.
//! - [`get_organization`] — one organization by id or handle.

use serde::{Deserialize, Serialize};

use crate::client::BalenaCloud;
use crate::error::{BalenaCloudError, Result};
use crate::odata::quote;

/// An account-level grouping that owns fleets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: u64,
    pub name: String,
    /// URL-safe unique handle, e.g. `"acme"`.
    pub handle: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// How to identify a single organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrganizationRef {
    Id(u64),
    Handle(String),
}

/// Optional identifying fields, resolved to an [`OrganizationRef`] with
/// the id taking precedence over the handle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrganizationLookup {
    pub id: Option<u64>,
    pub handle: Option<String>,
}

impl TryFrom<OrganizationLookup> for OrganizationRef {
    type Error = BalenaCloudError;

    fn try_from(lookup: OrganizationLookup) -> Result<Self> {
        match (lookup.id, lookup.handle) {
            (Some(id), _) => Ok(OrganizationRef::Id(id)),
            (None, Some(handle)) => Ok(OrganizationRef::Handle(handle)),
            (None, None) => Err(BalenaCloudError::ParameterValidation(
                "you must provide either an organization id or handle".to_string(),
            )),
        }
    }
}

// ── Endpoint functions ──────────────────────────────────────────────────

/// Lists every organization the authenticated user belongs to.
///
/// # Errors
///
/// - `Authentication` — the token was rejected (401).
/// - `Connection` — transport failure, timeout or other non-2xx status.
/// - `Decode` — a row did not match [`Organization`].
pub async fn list_organizations(client: &BalenaCloud) -> Result<Vec<Organization>> {
    client.get_collection("organization", &[]).await
}

/// Retrieves one organization by id or handle.
///
/// # Errors
///
/// - `ParameterValidation` — an empty [`OrganizationLookup`] was given.
///   No request is sent.
/// - `ResourceNotFound` — the API returned no row.
/// - `Authentication`, `Connection`, `Decode` — as for
///   [`list_organizations`].
pub async fn get_organization<R>(client: &BalenaCloud, organization: R) -> Result<Organization>
where
    R: TryInto<OrganizationRef>,
    BalenaCloudError: From<R::Error>,
{
    let uri = match organization.try_into()? {
        OrganizationRef::Id(id) => format!("organization({id})"),
        OrganizationRef::Handle(handle) => format!("organization(handle={})", quote(&handle)),
    };
    client
        .get_first(&uri, &[], || {
            "no organization found with the provided id or handle".to_string()
        })
        .await
}
