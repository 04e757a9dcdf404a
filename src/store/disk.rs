use crate::core::preferences::PreferenceStore;
use anyhow::{Context, Result};
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use std::path::Path;
use tracing::debug;

const PARTITION: &str = "preferences";

/// Preferences persisted in a fjall keyspace under the data directory.
pub struct DiskPreferenceStore {
    keyspace: Keyspace,
    partition: PartitionHandle,
}

impl DiskPreferenceStore {
    pub fn open(path: &Path) -> Result<Self> {
        std::fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
        let keyspace = Config::new(path)
            .open()
            .with_context(|| format!("Failed to open preference store: {}", path.display()))?;
        let partition = keyspace
            .open_partition(PARTITION, PartitionCreateOptions::default())
            .context("Failed to open preferences partition")?;
        debug!("Opened preference store at {}", path.display());
        Ok(Self {
            keyspace,
            partition,
        })
    }
}

impl PreferenceStore for DiskPreferenceStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .partition
            .get(key.as_bytes())
            .with_context(|| format!("Failed to read preference: {key}"))?;
        value
            .map(|bytes| {
                String::from_utf8(bytes.to_vec())
                    .with_context(|| format!("Preference {key} is not valid UTF-8"))
            })
            .transpose()
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.partition
            .insert(key.as_bytes(), value.as_bytes())
            .with_context(|| format!("Failed to write preference: {key}"))?;
        self.keyspace
            .persist(PersistMode::SyncAll)
            .context("Failed to persist preferences")?;
        debug!(key, value, "Preference saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::Currency;
    use tempfile::tempdir;

    #[test]
    fn test_currency_survives_reopen() -> Result<()> {
        let dir = tempdir()?;
        let prefs_path = dir.path().join("prefs");

        {
            let store = DiskPreferenceStore::open(&prefs_path)?;
            assert_eq!(store.currency()?, None);
            store.set_currency(Currency::Usd)?;
        }

        let store = DiskPreferenceStore::open(&prefs_path)?;
        assert_eq!(store.currency()?, Some(Currency::Usd));

        store.set_currency(Currency::Nzd)?;
        assert_eq!(store.currency()?, Some(Currency::Nzd));
        Ok(())
    }
}
