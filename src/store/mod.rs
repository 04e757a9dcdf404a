pub mod disk;
pub mod memory;

use crate::core::config::AppConfig;
use crate::core::preferences::PreferenceStore;
use anyhow::{Context, Result};
use disk::DiskPreferenceStore;
use memory::MemoryPreferenceStore;
use tracing::warn;

/// Opens the on-disk preference store, or an in-memory one when `persist` is off.
///
/// When the data directory cannot be opened the preference falls back to
/// memory for this run so the pages still render.
pub fn open_preference_store(config: &AppConfig, persist: bool) -> Box<dyn PreferenceStore> {
    if !persist {
        return Box::new(MemoryPreferenceStore::new());
    }
    match open_disk_store(config) {
        Ok(store) => Box::new(store),
        Err(e) => {
            warn!(error = %e, "Preferences will not be saved");
            Box::new(MemoryPreferenceStore::new())
        }
    }
}

/// Opens the on-disk preference store, failing when the data directory is unusable.
pub fn open_disk_store(config: &AppConfig) -> Result<DiskPreferenceStore> {
    let path = config.data_path()?.join("prefs");
    DiskPreferenceStore::open(&path)
        .with_context(|| format!("Cannot open preference store at {}", path.display()))
}
