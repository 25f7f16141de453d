//! Key/value tags attached to devices (`device_tag` on the wire).
//!
//! Tags are addressed two ways: by their own id for removal, and by the
//! natural key `(device, tag_key)` for updates.

use serde::{Deserialize, Serialize};

use crate::client::BalenaCloud;
use crate::devices::DeviceRef;
use crate::error::{BalenaCloudError, Result};
use crate::odata::{self, Filter, quote};

/// A key/value tag on a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: u64,

    #[serde(rename = "tag_key")]
    pub key: String,

    pub value: String,

    #[serde(rename = "device", with = "odata::reference_id")]
    pub device_id: u64,
}

// ── Request types ───────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct NewTag<'a> {
    device: u64,
    tag_key: &'a str,
    value: &'a str,
}

#[derive(Debug, Serialize)]
struct ValueUpdate<'a> {
    value: &'a str,
}

// ── Endpoint functions ──────────────────────────────────────────────────

/// Lists the tags of a device, in server order.
///
/// # Errors
///
/// - `ParameterValidation` — an empty [`crate::devices::DeviceLookup`].
/// - `Authentication` — the token was rejected (401).
/// - `Connection` — transport failure, timeout or other non-2xx status.
/// - `Decode` — a row did not match [`Tag`].
pub async fn list_device_tags<R>(client: &BalenaCloud, device: R) -> Result<Vec<Tag>>
where
    R: TryInto<DeviceRef>,
    BalenaCloudError: From<R::Error>,
{
    let filter = match device.try_into()? {
        DeviceRef::Id(id) => Filter::new().eq("device", id),
        DeviceRef::Uuid(uuid) => Filter::new().raw(format!("device/uuid eq {}", quote(&uuid))),
    };
    client.get_collection("device_tag", &filter.to_query()).await
}

/// Adds a tag to a device and returns the created row.
///
/// # Errors
///
/// - `Connection` — e.g. 409 when the device already has a tag `key`.
/// - `Authentication` — the token was rejected (401).
/// - `Unexpected` — the created row came back without a JSON content type.
/// - `Decode` — the created row did not match [`Tag`].
pub async fn add_device_tag(
    client: &BalenaCloud,
    device_id: u64,
    key: &str,
    value: &str,
) -> Result<Tag> {
    let body = NewTag {
        device: device_id,
        tag_key: key,
        value,
    };
    client.post("device_tag", &body).await
}

/// Sets the value of the tag `key` on a device.
///
/// # Errors
///
/// - `Authentication` — the token was rejected (401).
/// - `Connection` — transport failure, timeout or other non-2xx status.
pub async fn update_device_tag(
    client: &BalenaCloud,
    device_id: u64,
    key: &str,
    value: &str,
) -> Result<()> {
    let uri = format!("device_tag(device={device_id},tag_key={})", quote(key));
    client.patch(&uri, &ValueUpdate { value }).await
}

/// Removes a tag by its id.
pub async fn remove_device_tag(client: &BalenaCloud, tag_id: u64) -> Result<()> {
    client.delete(&format!("device_tag({tag_id})")).await
}
