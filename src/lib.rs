use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tracing::{info, warn};

pub mod application;
pub mod domain;
pub mod infrastructure;
#[cfg(feature = "stdio-server")]
pub mod interfaces;
pub mod settings;

use application::{ContactService, ContactStore};
use infrastructure::{InMemoryContactStore, SledContactStore, SystemClock};
use settings::{ConfigManager, StoreBackend};

const ENV_DATA_DIR: &str = "CONTACTS_DATA_DIR";
const ENV_STORE: &str = "CONTACTS_STORE";
#[cfg(feature = "stdio-server")]
const ENV_LOG: &str = "CONTACTS_LOG";

/// Everything a front end needs to serve requests.
pub struct AppHandles {
    pub service: Arc<ContactService>,
    pub store: Arc<dyn ContactStore>,
    pub config: Arc<ConfigManager>,
    pub data_dir: PathBuf,
}

/// Bootstrap against the data directory from `CONTACTS_DATA_DIR` or the OS
/// default location.
pub fn build_environment() -> Result<AppHandles> {
    let data_dir = resolve_data_dir()?;
    build_environment_in(data_dir)
}

/// Bootstrap against an explicit data directory.
pub fn build_environment_in(data_dir: impl Into<PathBuf>) -> Result<AppHandles> {
    let data_dir = data_dir.into();
    std::fs::create_dir_all(&data_dir).context("failed to create data directory")?;

    let config = Arc::new(ConfigManager::load(&data_dir).context("failed to load config file")?);
    let active_config = config.current();

    let backend = store_override().unwrap_or_else(|| active_config.store.clone());
    let store = open_store(&backend, &data_dir)?;

    let service = Arc::new(ContactService::new(
        Arc::clone(&store),
        Arc::new(SystemClock),
        active_config.service_config(),
    ));

    info!(
        target: "contacts::bootstrap",
        data_dir = %data_dir.display(),
        config = %config.path().display(),
        store = backend.id(),
        search = ?active_config.search,
        "contact service ready: {}",
        backend.description()
    );

    Ok(AppHandles {
        service,
        store,
        config,
        data_dir,
    })
}

/// Run the JSON-lines driver on stdin/stdout until EOF.
#[cfg(feature = "stdio-server")]
pub async fn run_stdio() -> Result<()> {
    let handles = build_environment().context("failed to bootstrap contacts")?;
    init_tracing(&handles.config.current().log_level);

    handles
        .store
        .ping()
        .context("contact store failed its readiness check")?;
    info!(
        target: "contacts::bootstrap",
        data_dir = %handles.data_dir.display(),
        "serving contacts over stdio"
    );

    interfaces::run_stdio_server(handles.service)
        .await
        .context("stdio driver failed")?;

    Ok(())
}

/// Logs go to stderr; stdout carries protocol traffic. `CONTACTS_LOG`
/// overrides the configured level.
#[cfg(feature = "stdio-server")]
fn init_tracing(default_level: &str) {
    static INIT: std::sync::OnceLock<()> = std::sync::OnceLock::new();

    let _ = INIT.get_or_init(|| {
        let filter = std::env::var(ENV_LOG).unwrap_or_else(|_| default_level.to_string());
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .compact()
            .try_init();
    });
}

fn open_store(backend: &StoreBackend, data_dir: &Path) -> Result<Arc<dyn ContactStore>> {
    match backend {
        StoreBackend::Sled { path } => {
            let store_path = data_dir.join(path);
            let store =
                SledContactStore::open(&store_path).context("failed to open embedded store")?;
            Ok(Arc::new(store))
        }
        StoreBackend::Memory => Ok(Arc::new(InMemoryContactStore::new())),
    }
}

fn store_override() -> Option<StoreBackend> {
    let id = std::env::var(ENV_STORE).ok()?;
    let backend = StoreBackend::with_default_settings(id.trim());
    if backend.is_none() {
        warn!(target: "contacts::bootstrap", "ignoring unknown {ENV_STORE} value '{id}'");
    }
    backend
}

fn resolve_data_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_DATA_DIR) {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }

    let dirs = directories::ProjectDirs::from("dev", "contacts", "Contacts")
        .ok_or_else(|| anyhow!("unable to determine OS data dir"))?;
    let dir = dirs.data_dir().to_path_buf();
    std::fs::create_dir_all(&dir).context("failed to create data directory")?;
    Ok(dir)
}
