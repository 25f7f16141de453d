//! Device lookup and management.
//!
//! - [`get_device`] — one device by id or UUID.
//! - [`update_device`] — PATCH arbitrary device fields.
//! - [`remove_device`] — delete a device.
//!
//! Updates send raw field/value data and return nothing. Call
//! [`get_device`] again to observe the new state. Neither update nor
//! removal checks that the device exists; the API may accept both for an
//! unknown id.

use serde::{Deserialize, Serialize};

use crate::client::BalenaCloud;
use crate::error::{BalenaCloudError, Result};
use crate::odata::{self, quote};

/// A single managed unit belonging to a fleet.
///
/// Optional fields are the ones the API leaves null until the device has
/// provisioned and reported in (OS version, addresses, supervisor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: u64,

    /// 32 or 62 character hex identifier assigned at provisioning.
    pub uuid: String,

    #[serde(rename = "device_name")]
    pub name: String,

    #[serde(rename = "belongs_to__application", with = "odata::reference_id")]
    pub fleet_id: u64,

    #[serde(default)]
    pub is_online: bool,

    /// Legacy status string (`"Idle"`, `"Updating"`, ...).
    #[serde(default)]
    pub status: Option<String>,

    /// `"online"`, `"offline"`, `"timeout"` or `"unknown"`.
    #[serde(default)]
    pub api_heartbeat_state: Option<String>,

    #[serde(default)]
    pub is_active: bool,

    #[serde(default)]
    pub is_undervolted: bool,

    #[serde(default)]
    pub os_version: Option<String>,

    #[serde(default)]
    pub os_variant: Option<String>,

    #[serde(default)]
    pub supervisor_version: Option<String>,

    /// Space-separated list of local addresses.
    #[serde(default)]
    pub ip_address: Option<String>,

    #[serde(default)]
    pub mac_address: Option<String>,

    #[serde(default)]
    pub public_address: Option<String>,

    #[serde(default)]
    pub note: Option<String>,

    #[serde(default)]
    pub created_at: Option<String>,

    #[serde(default)]
    pub last_connectivity_event: Option<String>,
}

/// How to identify a single device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceRef {
    Id(u64),
    Uuid(String),
}

/// Optional identifying fields. The id takes precedence over the UUID.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceLookup {
    pub id: Option<u64>,
    pub uuid: Option<String>,
}

impl TryFrom<DeviceLookup> for DeviceRef {
    type Error = BalenaCloudError;

    fn try_from(lookup: DeviceLookup) -> Result<Self> {
        match (lookup.id, lookup.uuid) {
            (Some(id), _) => Ok(DeviceRef::Id(id)),
            (None, Some(uuid)) => Ok(DeviceRef::Uuid(uuid)),
            (None, None) => Err(BalenaCloudError::ParameterValidation(
                "you must provide either a device id or a device uuid".to_string(),
            )),
        }
    }
}

/// Common device fields for [`update_device`]. `None` fields are left
/// out of the body and stay unchanged server-side.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeviceUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_latitude: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_longitude: Option<String>,
}

// ── Endpoint functions ──────────────────────────────────────────────────

/// Retrieves one device by id or UUID.
///
/// # Errors
///
/// - `ParameterValidation` — an empty [`DeviceLookup`] was given. No
///   request is sent.
/// - `ResourceNotFound` — the API returned no row.
/// - `Authentication` — the token was rejected (401).
/// - `Connection` — transport failure, timeout or other non-2xx status.
/// - `Decode` — the row did not match [`Device`].
pub async fn get_device<R>(client: &BalenaCloud, device: R) -> Result<Device>
where
    R: TryInto<DeviceRef>,
    BalenaCloudError: From<R::Error>,
{
    let uri = match device.try_into()? {
        DeviceRef::Id(id) => format!("device({id})"),
        DeviceRef::Uuid(uuid) => format!("device(uuid={})", quote(&uuid)),
    };
    client
        .get_first(&uri, &[], || {
            "no device found with the provided id or uuid".to_string()
        })
        .await
}

/// Changes device fields. `data` is any JSON-serializable object, either a
/// [`DeviceUpdate`] or raw `serde_json::json!({...})` data.
///
/// # Errors
///
/// - `Connection` — non-2xx status, e.g. 400 for an unknown field, or a
///   transport failure. The response body is not inspected otherwise.
/// - `Authentication` — the token was rejected (401).
pub async fn update_device<B: Serialize + ?Sized>(
    client: &BalenaCloud,
    device_id: u64,
    data: &B,
) -> Result<()> {
    client.patch(&format!("device({device_id})"), data).await
}

/// Removes a device from its fleet.
///
/// # Errors
///
/// Same as [`update_device`].
pub async fn remove_device(client: &BalenaCloud, device_id: u64) -> Result<()> {
    client.delete(&format!("device({device_id})")).await
}
