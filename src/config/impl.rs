use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;

use super::StaticConfig;

static CONFIG: OnceLock<ArcSwap<StaticConfig>> = OnceLock::new();

/// Get the global configuration instance
///
/// Returns an Arc pointer to the configuration, which is cheap to clone
/// and doesn't hold any locks. Falls back to defaults when nothing has been
/// initialized yet (library use without a binary entry point).
pub fn get_config() -> Arc<StaticConfig> {
    CONFIG
        .get_or_init(|| ArcSwap::from_pointee(StaticConfig::default()))
        .load_full()
}

/// Initialize the global configuration from `config.toml` + `FL__*` env vars
///
/// # Examples
/// ```no_run
/// use fundlinker::config::init_config;
/// init_config();
/// ```
pub fn init_config() {
    init_config_from(None);
}

/// Initialize the global configuration from an explicit file path
pub fn init_config_from(path: Option<&str>) {
    let loaded = StaticConfig::load(path);
    match CONFIG.get() {
        Some(cell) => cell.store(Arc::new(loaded)),
        None => {
            let _ = CONFIG.set(ArcSwap::from_pointee(loaded));
        }
    }
}

/// Install a fully built configuration (used by tests and embedders)
pub fn init_config_with(config: StaticConfig) {
    update_config(|c| *c = config);
}

/// Atomically replace the configuration with a modified copy
pub fn update_config<F>(f: F)
where
    F: FnOnce(&mut StaticConfig),
{
    let cell = CONFIG.get_or_init(|| ArcSwap::from_pointee(StaticConfig::default()));
    let mut next = (*cell.load_full()).clone();
    f(&mut next);
    cell.store(Arc::new(next));
}
