use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, error, info, warn};
use pitwatch::client::{ClientHook, DashboardSnapshot, HookOptions};
use pitwatch::config::{Config, StorageBackend, StorageConfig};
use pitwatch::error::{ConfigError, StoreError};
use pitwatch::gateway::{Gateway, MemoryStore, SqliteStore, Store};
use pitwatch::ingest::Ingestor;
use pitwatch::scheduler::PeriodicTrigger;
use pitwatch::simulation::LocalSimulator;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Command-line arguments for the rockfall risk monitor
#[derive(Parser)]
#[command(
    name = "pitwatch",
    about = "Open-pit mine rockfall risk monitor",
    long_about = "Scores simulated vibration, temperature and moisture readings per mine sector, \
                  raises alerts when combined risk crosses configured thresholds and keeps a live \
                  view of the latest readings, risk and alerts."
)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Configuration file path (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(
        short,
        long,
        help = "Enable verbose logging output (sets RUST_LOG=debug)"
    )]
    verbose: bool,

    /// Run the local simulation instead of the persisted pipeline
    #[arg(long, conflicts_with = "once")]
    local: bool,

    /// Run a single trigger cycle, print the result as JSON and exit
    #[arg(long)]
    once: bool,
}

impl Cli {
    /// Validate the CLI arguments
    ///
    /// Missing config files are accepted here; [`load_config`] falls back
    /// to defaults for them.
    fn validate(&self) -> Result<(), String> {
        if let Some(ref config_path) = self.config {
            if config_path.exists() {
                if !config_path.is_file() {
                    return Err(format!(
                        "Configuration path is not a file: {}",
                        config_path.display()
                    ));
                }

                if let Some(extension) = config_path.extension() {
                    if extension != "toml" {
                        warn!(
                            "Configuration file does not have .toml extension: {}",
                            config_path.display()
                        );
                    }
                }
            }
        }

        Ok(())
    }

    /// Config path as UTF-8, or an error naming the offending path
    fn config_path_str(&self) -> Result<Option<&str>, String> {
        match &self.config {
            Some(path) => match path.to_str() {
                Some(path_str) => Ok(Some(path_str)),
                None => Err(format!(
                    "Configuration file path contains invalid UTF-8 characters: {}",
                    path.display()
                )),
            },
            None => Ok(None),
        }
    }
}

/// Load configuration, falling back to defaults for unreadable or invalid files
fn load_config(config_path: Option<&str>) -> Config {
    match config_path {
        Some(path) => {
            info!("Loading configuration from: {}", path);
            match Config::from_file(std::path::Path::new(path)) {
                Ok(config) => config,
                Err(ConfigError::ReadError(_)) => {
                    warn!(
                        "Configuration file '{}' not found or unreadable, using defaults",
                        path
                    );
                    Config::default()
                }
                Err(e) => {
                    error!("Configuration error in '{}': {}", path, e);
                    warn!("Using default configuration due to invalid config file");
                    Config::default()
                }
            }
        }
        None => {
            info!("Using default configuration");
            Config::default()
        }
    }
}

fn open_store(storage: &StorageConfig) -> Result<Box<dyn Store>, StoreError> {
    match storage.backend {
        StorageBackend::Memory => {
            info!("Using in-memory store");
            Ok(Box::new(MemoryStore::new()))
        }
        StorageBackend::Sqlite => Ok(Box::new(SqliteStore::open(&storage.path)?)),
    }
}

fn report(snapshot: &DashboardSnapshot) {
    let risk = &snapshot.risk;
    info!(
        "Risk {} ({}/100, sensor {}, image {}) | system {} | {} reading(s), {} alert(s){}",
        risk.risk_level.as_str(),
        risk.overall_risk,
        risk.sensor_risk,
        risk.image_risk,
        snapshot.system_status.as_str(),
        snapshot.readings.len(),
        snapshot.alerts.len(),
        if snapshot.stale { " [stale]" } else { "" }
    );
}

/// Wait for Ctrl-C, reporting the observer view on every `period`
async fn report_until_shutdown<F>(period: std::time::Duration, mut snapshot: F) -> Result<()>
where
    F: FnMut() -> DashboardSnapshot,
{
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut ticker = tokio::time::interval(period);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                result.context("Failed to listen for Ctrl-C")?;
                info!("Received interrupt signal, shutting down gracefully...");
                return Ok(());
            }
            _ = ticker.tick() => report(&snapshot()),
        }
    }
}

async fn run_persisted(config: Config) -> Result<()> {
    let store = open_store(&config.storage).context("Failed to open store")?;
    let gateway = Arc::new(Gateway::new(store));

    let mut ingestor = Ingestor::from_config(Arc::clone(&gateway), &config);
    let trigger = PeriodicTrigger::start(
        "simulate-sensor-data",
        config.simulation.interval(),
        move || {
            ingestor.trigger().map(|response| {
                debug!("{} ({} reading(s))", response.message, response.data.len())
            })
        },
    );

    let hook = ClientHook::activate(&gateway, HookOptions::from(&config.client), Some(trigger));
    info!("Rockfall monitor is running. Press Ctrl+C to stop.");

    let result = report_until_shutdown(config.simulation.interval(), || hook.snapshot()).await;

    hook.deactivate();
    gateway.close();
    result
}

async fn run_local(config: Config) -> Result<()> {
    let simulator = Arc::new(Mutex::new(LocalSimulator::new(&config)));
    let ticking = Arc::clone(&simulator);
    let trigger = PeriodicTrigger::start(
        "local-simulation",
        config.simulation.local_interval(),
        move || {
            let mut simulator = ticking
                .lock()
                .map_err(|_| "simulator lock poisoned".to_string())?;
            simulator.tick();
            Ok::<(), String>(())
        },
    );
    info!("Local simulation is running. Press Ctrl+C to stop.");

    let result = report_until_shutdown(config.simulation.local_interval(), || {
        match simulator.lock() {
            Ok(simulator) => simulator.snapshot(),
            Err(poisoned) => poisoned.into_inner().snapshot(),
        }
    })
    .await;

    trigger.cancel();
    result
}

fn run_once(config: Config) -> Result<()> {
    let store = open_store(&config.storage).context("Failed to open store")?;
    let gateway = Arc::new(Gateway::new(store));
    let mut ingestor = Ingestor::from_config(gateway, &config);

    match ingestor.trigger() {
        Ok(response) => {
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Err(e) => {
            println!("{}", serde_json::to_string_pretty(&e.to_response())?);
            Err(e).context("Trigger cycle failed")
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        std::env::set_var("RUST_LOG", "debug");
    }
    env_logger::init();

    info!("Starting rockfall risk monitor");

    if let Err(e) = cli.validate() {
        error!("Invalid arguments: {}", e);
        std::process::exit(1);
    }

    let config_path = match cli.config_path_str() {
        Ok(path) => path,
        Err(e) => {
            error!("Invalid configuration path: {}", e);
            std::process::exit(1);
        }
    };
    let config = load_config(config_path);

    let result = if cli.once {
        run_once(config)
    } else if cli.local {
        run_local(config).await
    } else {
        run_persisted(config).await
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }

    info!("Rockfall monitor shutdown complete");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn cli(config: Option<PathBuf>) -> Cli {
        Cli {
            config,
            verbose: false,
            local: false,
            once: false,
        }
    }

    #[test]
    fn test_cli_validation_with_existing_file() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(file, "[simulation]\ninterval_seconds = 5").unwrap();

        assert!(cli(Some(file.path().to_path_buf())).validate().is_ok());
    }

    #[test]
    fn test_cli_validation_with_missing_file() {
        // missing files fall back to defaults later
        assert!(cli(Some(PathBuf::from("/nonexistent/config.toml")))
            .validate()
            .is_ok());
    }

    #[test]
    fn test_cli_validation_with_directory() {
        let dir = TempDir::new().unwrap();
        assert!(cli(Some(dir.path().to_path_buf())).validate().is_err());
    }

    #[test]
    fn test_cli_validation_no_config() {
        assert!(cli(None).validate().is_ok());
    }

    #[test]
    fn test_config_path_str() {
        let with_path = cli(Some(PathBuf::from("pitwatch.toml")));
        assert_eq!(with_path.config_path_str().unwrap(), Some("pitwatch.toml"));
        assert_eq!(cli(None).config_path_str().unwrap(), None);
    }

    #[test]
    fn test_cli_flags_parse() {
        let parsed = Cli::try_parse_from(["pitwatch", "--local", "-v"]).unwrap();
        assert!(parsed.local);
        assert!(parsed.verbose);
        assert!(!parsed.once);

        assert!(Cli::try_parse_from(["pitwatch", "--local", "--once"]).is_err());
    }

    #[test]
    fn test_load_config_falls_back_to_defaults() {
        assert_eq!(load_config(None), Config::default());
        assert_eq!(
            load_config(Some("/nonexistent/pitwatch.toml")),
            Config::default()
        );

        let mut invalid = NamedTempFile::new().unwrap();
        writeln!(invalid, "[simulation]\ninterval_seconds = 0").unwrap();
        assert_eq!(
            load_config(invalid.path().to_str()),
            Config::default()
        );
    }

    #[test]
    fn test_load_config_reads_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[client]\nalert_buffer = 4").unwrap();
        let config = load_config(file.path().to_str());
        assert_eq!(config.client.alert_buffer, 4);
    }

    #[test]
    fn test_open_sqlite_store() {
        let dir = TempDir::new().unwrap();
        let storage = StorageConfig {
            backend: StorageBackend::Sqlite,
            path: dir.path().join("db").join("pitwatch.db"),
        };
        assert!(open_store(&storage).is_ok());
        assert!(storage.path.exists());
    }
}
