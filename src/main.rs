use clap::{Parser, ValueEnum};
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use vpn_provision::application::provisioner::{Outcome, Ports, Provisioner, ProvisionerSettings};
use vpn_provision::domain::host::HostSelection;
use vpn_provision::domain::ports::{PreferenceStore, PreferenceStoreBox};
use vpn_provision::domain::preferences::StoredPreferences;
use vpn_provision::infrastructure::in_memory::{
    CountingReconciler, InMemoryConnection, InMemoryPreferenceStore,
};
use vpn_provision::infrastructure::scripted::ScriptedGateway;
use vpn_provision::interfaces::console::ConsoleNotifier;
use vpn_provision::interfaces::json::profile_writer::ProfileWriter;
use vpn_provision::interfaces::json::scenario_reader::ScenarioReader;

#[derive(Clone, Copy, ValueEnum)]
enum HostSelectionArg {
    LeastLoaded,
    Random,
}

impl From<HostSelectionArg> for HostSelection {
    fn from(arg: HostSelectionArg) -> Self {
        match arg {
            HostSelectionArg::LeastLoaded => HostSelection::LeastLoaded,
            HostSelectionArg::Random => HostSelection::Random,
        }
    }
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Scenario JSON file with the scripted service responses
    scenario: PathBuf,

    /// Device timezone identifier
    #[arg(long, env = "TZ", default_value = "Etc/UTC")]
    timezone: String,

    /// Region picked by the user for this attempt ("automatic" to follow the timezone)
    #[arg(long)]
    region: Option<String>,

    /// WireGuard public key of this device
    #[arg(long)]
    client_public_key: Option<String>,

    /// How to pick a host within the resolved region
    #[arg(long, value_enum, default_value_t = HostSelectionArg::LeastLoaded)]
    host_selection: HostSelectionArg,

    /// Path to persistent preferences (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,
}

#[cfg(feature = "storage-rocksdb")]
fn open_store(db_path: Option<PathBuf>) -> Result<Option<PreferenceStoreBox>> {
    use vpn_provision::infrastructure::rocksdb::RocksDbPreferenceStore;

    match db_path {
        Some(path) => {
            let store = RocksDbPreferenceStore::open(path).into_diagnostic()?;
            Ok(Some(Box::new(store)))
        }
        None => Ok(None),
    }
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_store(db_path: Option<PathBuf>) -> Result<Option<PreferenceStoreBox>> {
    if db_path.is_some() {
        eprintln!(
            "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
        );
    }
    Ok(None)
}

/// Persistent stores keep their own region choice; only a missing purchase is
/// filled in from the scenario.
async fn seed(store: &PreferenceStoreBox, scenario_prefs: StoredPreferences) -> Result<()> {
    let mut prefs = store.load().await.into_diagnostic()?;
    if !prefs.has_purchase() {
        prefs.purchase_token = scenario_prefs.purchase_token;
        prefs.product_id = scenario_prefs.product_id;
        prefs.purchase_expiry = scenario_prefs.purchase_expiry;
        prefs.is_subscription_purchase = scenario_prefs.is_subscription_purchase;
        store.save(prefs).await.into_diagnostic()?;
    }
    Ok(())
}

/// `TZ` may carry a leading colon (`:America/New_York`) or be empty.
fn device_timezone(raw: &str) -> String {
    match raw.trim().trim_start_matches(':') {
        "" => "Etc/UTC".to_string(),
        tz => tz.to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let file = File::open(&cli.scenario).into_diagnostic()?;
    let scenario = ScenarioReader::new(file).scenario().into_diagnostic()?;

    let preferences: PreferenceStoreBox = match open_store(cli.db_path)? {
        Some(store) => {
            seed(&store, scenario.preferences.clone()).await?;
            store
        }
        None => Box::new(InMemoryPreferenceStore::with(scenario.preferences.clone())),
    };

    let client_public_key = cli
        .client_public_key
        .or_else(|| scenario.client_public_key.clone())
        .unwrap_or_else(|| "client-public-key".to_string());
    let reconciler = CountingReconciler::new();

    let mut provisioner = Provisioner::new(
        Ports {
            connection: Box::new(InMemoryConnection::new(scenario.vpn_connected)),
            gateway: Box::new(ScriptedGateway::new(scenario)),
            preferences,
            reconciler: Box::new(reconciler.clone()),
            notifier: Box::new(ConsoleNotifier),
        },
        ProvisionerSettings {
            device_timezone: device_timezone(&cli.timezone),
            client_public_key,
            host_selection: cli.host_selection.into(),
        },
    );
    if let Some(region) = cli.region {
        provisioner.select_region(region);
    }

    let outcome = provisioner.run().await.into_diagnostic()?;
    tracing::debug!(passes = reconciler.passes(), "purchase reconciliation passes");

    match outcome {
        Outcome::ProfileReady(profile) => {
            let stdout = io::stdout();
            ProfileWriter::new(stdout.lock())
                .write_profile(&profile)
                .into_diagnostic()?;
            Ok(ExitCode::SUCCESS)
        }
        Outcome::Aborted { .. } => Ok(ExitCode::FAILURE),
        Outcome::Abandoned => Ok(ExitCode::from(2)),
    }
}
