//! Async Rust client library for the balena cloud API.
//!
//! Every operation is one authenticated HTTPS round trip through
//! [`BalenaCloud::request`], decoded into a typed record or mapped to a
//! [`BalenaCloudError`]. There is no caching and no retry: updates return
//! nothing, so re-fetch to observe new state.
//!
//! # Modules
//!
//! - [`client`] — `BalenaCloud`, the request executor and session owner.
//! - [`error`] — Typed error hierarchy (`BalenaCloudError`).
//! - [`odata`] — Collection envelope, navigation references, `$filter` builder.
//! - [`organizations`] — Organization listing and lookup.
//! - [`fleets`] — Fleet lookup, organization fleets, fleet devices.
//! - [`devices`] — Device lookup, update, removal.
//! - [`device_tags`] — Device tag CRUD.
//! - [`device_variables`] — Device environment variable CRUD.
//! - [`releases`] — Fleet releases.
//!
//! # Quick Start
//!
//! ```ignore
//! use balena_cloud::BalenaCloud;
//! use balena_cloud::fleets::{FleetRef, get_fleet, list_fleet_devices};
//! use balena_cloud::odata::Filter;
//!
//! let client = BalenaCloud::new("api-token");
//! let fleet = get_fleet(&client, FleetRef::Slug("acme/edge".into())).await?;
//! let online_only = Filter::new().eq("is_online", true);
//! let online = list_fleet_devices(&client, fleet.id, Some(online_only)).await?;
//! ```

pub mod client;
pub mod device_tags;
pub mod device_variables;
pub mod devices;
pub mod error;
pub mod fleets;
pub mod odata;
pub mod organizations;
pub mod releases;

pub use client::{BalenaCloud, BalenaCloudBuilder};
pub use error::{BalenaCloudError, Result};
