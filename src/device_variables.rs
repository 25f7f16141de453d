//! Device environment variables (`device_environment_variable` on the wire).

use serde::{Deserialize, Serialize};

use crate::client::BalenaCloud;
use crate::devices::DeviceRef;
use crate::error::{BalenaCloudError, Result};
use crate::odata::{self, Filter};

/// An environment variable set on a single device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentVariable {
    pub id: u64,
    pub name: String,
    pub value: String,

    #[serde(rename = "device", with = "odata::reference_id")]
    pub device_id: u64,

    #[serde(default)]
    pub created_at: Option<String>,
}

// ── Request types ───────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct NewVariable<'a> {
    device: u64,
    name: &'a str,
    value: &'a str,
}

#[derive(Debug, Serialize)]
struct ValueUpdate<'a> {
    value: &'a str,
}

// ── Endpoint functions ──────────────────────────────────────────────────

/// Lists the environment variables of a device, in server order.
///
/// # Errors
///
/// - `ParameterValidation` — an empty [`crate::devices::DeviceLookup`].
/// - `Authentication` — the token was rejected (401).
/// - `Connection` — transport failure, timeout or other non-2xx status.
/// - `Decode` — a row did not match [`EnvironmentVariable`].
pub async fn list_device_variables<R>(
    client: &BalenaCloud,
    device: R,
) -> Result<Vec<EnvironmentVariable>>
where
    R: TryInto<DeviceRef>,
    BalenaCloudError: From<R::Error>,
{
    let filter = match device.try_into()? {
        DeviceRef::Id(id) => Filter::new().eq("device", id),
        DeviceRef::Uuid(uuid) => Filter::new().any("device", "d", "uuid", uuid),
    };
    client
        .get_collection("device_environment_variable", &filter.to_query())
        .await
}

/// Retrieves one environment variable by id.
///
/// # Errors
///
/// - `ResourceNotFound` — no variable has this id.
/// - `Authentication`, `Connection`, `Decode` — as for
///   [`list_device_variables`].
pub async fn get_device_variable(
    client: &BalenaCloud,
    variable_id: u64,
) -> Result<EnvironmentVariable> {
    client
        .get_first(
            &format!("device_environment_variable({variable_id})"),
            &[],
            || format!("no environment variable found with id {variable_id}"),
        )
        .await
}

/// Creates an environment variable on a device and returns the new row.
///
/// # Errors
///
/// - `Connection` — e.g. 400 for an invalid name, 409 for a duplicate.
/// - `Authentication` — the token was rejected (401).
/// - `Decode` — the created row did not match [`EnvironmentVariable`].
pub async fn add_device_variable(
    client: &BalenaCloud,
    device_id: u64,
    name: &str,
    value: &str,
) -> Result<EnvironmentVariable> {
    let body = NewVariable {
        device: device_id,
        name,
        value,
    };
    client.post("device_environment_variable", &body).await
}

/// Replaces the value of an environment variable.
///
/// # Errors
///
/// - `Authentication` — the token was rejected (401).
/// - `Connection` — transport failure, timeout or other non-2xx status.
pub async fn update_device_variable(
    client: &BalenaCloud,
    variable_id: u64,
    value: &str,
) -> Result<()> {
    client
        .patch(
            &format!("device_environment_variable({variable_id})"),
            &ValueUpdate { value },
        )
        .await
}

/// Deletes an environment variable by id.
///
/// # Errors
///
/// Same as [`update_device_variable`].
pub async fn remove_device_variable(client: &BalenaCloud, variable_id: u64) -> Result<()> {
    client
        .delete(&format!("device_environment_variable({variable_id})"))
        .await
}
