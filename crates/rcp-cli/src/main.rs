//! `rackcorp`: drive the provisioning engine against a JSON state file.
//!
//! Every lifecycle command prints `key=value` status lines followed by the
//! state document, and exits non-zero with the engine error otherwise.

mod state_file;

use std::fs;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rcp_api::{FirewallPolicy, RackcorpClient};
use rcp_config::{EngineSettings, UnusedKeyPolicy};
use rcp_engine::{AttributeStore, Provisioner, ReadOutcome};
use rcp_poll::SystemClock;
use serde_json::{Map, Value};
use tracing::{info, warn};

use state_file::FileStore;

#[derive(Parser)]
#[command(name = "rackcorp")]
#[command(about = "Rackcorp virtual server provisioning", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Order, activate and power on a server described by a spec file.
    Create {
        /// Layered config YAML paths, in merge order
        #[arg(long = "config")]
        config_paths: Vec<String>,

        /// Server spec YAML (country, server_class, operating_system, ...)
        #[arg(long)]
        spec: String,

        /// State file; created if missing
        #[arg(long)]
        state: String,
    },

    /// Refresh the state file from the provider; clears the id if the server is gone.
    Read {
        #[arg(long = "config")]
        config_paths: Vec<String>,

        #[arg(long)]
        state: String,
    },

    /// Replace the device firewall policies.
    Update {
        #[arg(long = "config")]
        config_paths: Vec<String>,

        #[arg(long)]
        state: String,

        /// Desired firewall policies (JSON or YAML list)
        #[arg(long)]
        firewall: String,
    },

    /// Cancel the server and wait for the cancellation to complete.
    Delete {
        #[arg(long = "config")]
        config_paths: Vec<String>,

        #[arg(long)]
        state: String,
    },

    /// Print the merged config hash and canonical JSON.
    ConfigHash {
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

fn main() -> Result<()> {
    // Best effort; a missing .env.local is normal outside dev.
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = rcp_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Create {
            config_paths,
            spec,
            state,
        } => {
            let provisioner = build_provisioner(&config_paths)?;
            let mut store = FileStore::open(&state)?;
            store.merge_inputs(load_spec(&spec)?)?;

            provisioner.create(&mut store)?;
            println!("resource_id={}", store.id().unwrap_or_default());
            print_state(&store)?;
        }

        Commands::Read {
            config_paths,
            state,
        } => {
            let provisioner = build_provisioner(&config_paths)?;
            let mut store = FileStore::open(&state)?;

            match provisioner.read(&mut store)? {
                ReadOutcome::Present => println!("outcome=present"),
                ReadOutcome::Absent => println!("outcome=absent"),
            }
            print_state(&store)?;
        }

        Commands::Update {
            config_paths,
            state,
            firewall,
        } => {
            let provisioner = build_provisioner(&config_paths)?;
            let mut store = FileStore::open(&state)?;
            let desired = load_firewall(&firewall)?;

            let changeset = provisioner.update(&mut store, &desired)?;
            println!("firewall_added={}", changeset.added.len());
            println!("firewall_deleted={}", changeset.deleted.len());
            print_state(&store)?;
        }

        Commands::Delete {
            config_paths,
            state,
        } => {
            let provisioner = build_provisioner(&config_paths)?;
            let mut store = FileStore::open(&state)?;

            provisioner.delete(&mut store)?;
            println!("deleted=true");
            print_state(&store)?;
        }
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Load config, resolve credentials and wire the client into an engine.
fn build_provisioner(config_paths: &[String]) -> Result<Provisioner<RackcorpClient, SystemClock>> {
    let path_refs: Vec<&str> = config_paths.iter().map(|s| s.as_str()).collect();
    let loaded = rcp_config::load_layered_yaml(&path_refs)?;

    let report = rcp_config::report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)?;
    for pointer in &report.unused_leaf_pointers {
        warn!(%pointer, "config key is not consumed");
    }

    let settings = EngineSettings::from_config_json(&loaded.config_json)?;
    let creds = rcp_config::resolve_credentials(&loaded.config_json)?;
    info!(
        config_hash = %loaded.config_hash,
        api_address = %settings.api_address,
        "config loaded"
    );

    let client = RackcorpClient::new(creds.api_uuid, creds.api_secret)
        .context("CLIENT_INIT_FAILED")?
        .with_address(settings.api_address)
        .with_timeout(settings.http_timeout)
        .context("CLIENT_INIT_FAILED")?;

    Ok(Provisioner::new(client, creds.customer_id, SystemClock::new()).with_waits(settings.waits))
}

/// A spec file is a YAML mapping of input attributes.
fn load_spec(path: &str) -> Result<Map<String, Value>> {
    let raw = fs::read_to_string(path).with_context(|| format!("read spec failed: {path}"))?;
    let v: Value = serde_yaml::from_str(&raw).with_context(|| format!("spec is not valid YAML: {path}"))?;
    match v {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Map::new()),
        _ => bail!("SPEC_INVALID: {path} must be a mapping of attributes"),
    }
}

fn load_firewall(path: &str) -> Result<Vec<FirewallPolicy>> {
    let raw = fs::read_to_string(path).with_context(|| format!("read firewall failed: {path}"))?;
    let raw = raw.trim_start_matches('\u{feff}');
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_yaml::from_str(raw).with_context(|| format!("FIREWALL_INVALID: {path}"))
}

fn print_state(store: &FileStore) -> Result<()> {
    let json = serde_json::to_string_pretty(&store.snapshot()).context("serialize state failed")?;
    println!("state_file={}", store.path().display());
    if let Some(ts) = store.updated_at_utc() {
        println!("updated_at_utc={}", ts.to_rfc3339());
    }
    println!("{json}");
    Ok(())
}
