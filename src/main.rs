//! CLI entry point for balena-cloud — a thin front end over the library.
//!
//! Each subcommand performs one API call and prints the decoded result as
//! pretty JSON on stdout. Logging goes to stderr and is controlled by
//! `RUST_LOG` (e.g. `RUST_LOG=balena_cloud=debug`).
//!
//! Exit codes:
//! - 0: success
//! - 1: runtime error (auth failure, not found, connection error, etc.)
//! - 2: argument validation error (clap handles this automatically)

use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use balena_cloud::devices::DeviceLookup;
use balena_cloud::fleets::FleetLookup;
use balena_cloud::odata::Filter;
use balena_cloud::organizations::OrganizationLookup;
use balena_cloud::{
    BalenaCloud, device_tags, device_variables, devices, fleets, organizations, releases,
};

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// balena cloud API token. Prefer setting via the BALENA_API_TOKEN
    /// environment variable to keep it out of shell history.
    #[arg(long, env = "BALENA_API_TOKEN", hide_env_values = true)]
    token: String,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List organizations the token belongs to.
    Organizations,

    /// Show one organization.
    Organization {
        #[arg(long)]
        id: Option<u64>,
        #[arg(long)]
        handle: Option<String>,
    },

    /// List accessible fleets, or the fleets of one organization.
    Fleets {
        /// Organization handle to restrict the listing to.
        #[arg(long)]
        organization: Option<String>,
    },

    /// Show one fleet. Precedence: --id, then --slug, then --name.
    Fleet {
        #[arg(long)]
        id: Option<u64>,
        #[arg(long)]
        slug: Option<String>,
        #[arg(long)]
        name: Option<String>,
    },

    /// List the devices of a fleet.
    Devices {
        #[arg(long)]
        fleet_id: u64,
        /// Only devices with this online state.
        #[arg(long)]
        online: Option<bool>,
    },

    /// Show one device. --id takes precedence over --uuid.
    Device {
        #[arg(long)]
        id: Option<u64>,
        #[arg(long)]
        uuid: Option<String>,
    },

    /// List the tags of a device.
    Tags {
        #[arg(long)]
        id: Option<u64>,
        #[arg(long)]
        uuid: Option<String>,
    },

    /// List the environment variables of a device.
    Variables {
        #[arg(long)]
        id: Option<u64>,
        #[arg(long)]
        uuid: Option<String>,
    },

    /// List the releases of a fleet.
    Releases {
        #[arg(long)]
        fleet_id: u64,
        /// Only final (true) or draft (false) releases.
        #[arg(long)]
        is_final: Option<bool>,
    },

    /// Show one release.
    Release {
        #[arg(long)]
        id: u64,
    },
}

/// Runs one subcommand and returns its result as JSON.
async fn run(client: &BalenaCloud, command: Command) -> balena_cloud::Result<Value> {
    let value = match command {
        Command::Organizations => {
            serde_json::to_value(organizations::list_organizations(client).await?)?
        }
        Command::Organization { id, handle } => serde_json::to_value(
            organizations::get_organization(client, OrganizationLookup { id, handle }).await?,
        )?,
        Command::Fleets {
            organization: Some(handle),
        } => serde_json::to_value(fleets::list_organization_fleets(client, &handle).await?)?,
        Command::Fleets { organization: None } => {
            serde_json::to_value(fleets::list_fleets(client).await?)?
        }
        Command::Fleet { id, slug, name } => serde_json::to_value(
            fleets::get_fleet(client, FleetLookup { id, slug, name }).await?,
        )?,
        Command::Devices { fleet_id, online } => {
            let filter = online.map(|online| Filter::new().eq("is_online", online));
            serde_json::to_value(fleets::list_fleet_devices(client, fleet_id, filter).await?)?
        }
        Command::Device { id, uuid } => {
            serde_json::to_value(devices::get_device(client, DeviceLookup { id, uuid }).await?)?
        }
        Command::Tags { id, uuid } => serde_json::to_value(
            device_tags::list_device_tags(client, DeviceLookup { id, uuid }).await?,
        )?,
        Command::Variables { id, uuid } => serde_json::to_value(
            device_variables::list_device_variables(client, DeviceLookup { id, uuid }).await?,
        )?,
        Command::Releases { fleet_id, is_final } => {
            let filter = is_final.map(|is_final| Filter::new().eq("is_final", is_final));
            serde_json::to_value(releases::list_fleet_releases(client, fleet_id, filter).await?)?
        }
        Command::Release { id } => serde_json::to_value(releases::get_release(client, id).await?)?,
    };
    Ok(value)
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Cli::parse();
    let mut client = BalenaCloud::builder(args.token)
        .request_timeout(Duration::from_secs(args.timeout))
        .build();

    let outcome = run(&client, args.command).await;
    client.close();

    match outcome {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(text) => {
                println!("{text}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("Error: {e}");
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
