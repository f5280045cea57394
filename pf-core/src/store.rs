//! Live config store
//!
//! Holds the active config as an `Arc` snapshot. Readers clone the `Arc` and
//! keep a consistent view for as long as they hold it; a load builds the next
//! config off to the side and swaps it in with a single pointer write.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::data::{load_section, ConfigWarning, SectionConfig};
use crate::error::Result;

/// Summary of a load or reload
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub warnings: Vec<ConfigWarning>,
    pub source_found: bool,
    pub applied: usize,
    /// Whether the active config differs from the one before the load
    pub changed: bool,
}

/// Owner of the active config of one controller
#[derive(Debug)]
pub struct ConfigStore<C: SectionConfig> {
    source: Option<PathBuf>,
    current: RwLock<Arc<C>>,
    // serializes loads so two reloads cannot both start from the same base
    load_lock: Mutex<()>,
}

impl<C: SectionConfig> ConfigStore<C> {
    /// Store without a backing file; `load` and `reload` are no-ops
    pub fn new(initial: C) -> Self {
        Self {
            source: None,
            current: RwLock::new(Arc::new(initial)),
            load_lock: Mutex::new(()),
        }
    }

    /// Store backed by a config file
    pub fn with_source(initial: C, path: impl Into<PathBuf>) -> Self {
        Self {
            source: Some(path.into()),
            current: RwLock::new(Arc::new(initial)),
            load_lock: Mutex::new(()),
        }
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Current config; stays valid even if a reload happens afterwards
    pub fn snapshot(&self) -> Arc<C> {
        Arc::clone(&self.current.read())
    }

    /// Read the source on top of the active config and swap the result in
    ///
    /// Warnings are logged and returned. On a validation or read error the
    /// active config is left untouched.
    pub fn load(&self) -> Result<LoadReport> {
        let _guard = self.load_lock.lock();

        let Some(path) = self.source.as_deref() else {
            debug!("No config source configured, keeping current {} settings", C::SECTION);
            return Ok(LoadReport::default());
        };

        let base = self.snapshot();
        let outcome = load_section(base.as_ref(), path)?;

        for warning in &outcome.warnings {
            warn!("{}", warning);
        }

        if !outcome.source_found {
            debug!("Config file {:?} not found, keeping current {} settings", path, C::SECTION);
        }

        let changed = outcome.config != *base;
        if changed {
            *self.current.write() = Arc::new(outcome.config);
        }

        Ok(LoadReport {
            warnings: outcome.warnings,
            source_found: outcome.source_found,
            applied: outcome.applied,
            changed,
        })
    }

    /// Re-read the same source; identical to `load` but logs the outcome
    pub fn reload(&self) -> Result<LoadReport> {
        match self.load() {
            Ok(report) => {
                info!(
                    applied = report.applied,
                    warnings = report.warnings.len(),
                    changed = report.changed,
                    "Configuration reloaded"
                );
                Ok(report)
            }
            Err(e) => {
                warn!("Config reload failed: {} - continuing with existing config", e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ControlConfig, StageConfig};
    use crate::error::PifanError;
    use std::fs;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> (ConfigStore<ControlConfig>, PathBuf) {
        let path = dir.path().join("fan_control.cfg");
        (ConfigStore::with_source(ControlConfig::default(), &path), path)
    }

    #[test]
    fn test_store_without_source() {
        let store = ConfigStore::new(ControlConfig::default());
        let report = store.reload().unwrap();
        assert!(!report.changed);
        assert!(store.source().is_none());
        assert_eq!(*store.snapshot(), ControlConfig::default());
    }

    #[test]
    fn test_load_absent_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let (store, _) = store_in(&dir);
        let report = store.load().unwrap();
        assert!(!report.source_found);
        assert!(!report.changed);
        assert_eq!(*store.snapshot(), ControlConfig::default());
    }

    #[test]
    fn test_reload_partial_overwrite() {
        let dir = TempDir::new().unwrap();
        let (store, path) = store_in(&dir);

        fs::write(&path, "[fan_control]\nmin_temp = 50\nfan_low = 20\n").unwrap();
        store.load().unwrap();
        assert_eq!(store.snapshot().min_temp, 50);
        assert_eq!(store.snapshot().fan_low, 20);

        // second file no longer mentions fan_low
        fs::write(&path, "[fan_control]\nmin_temp = 48\n").unwrap();
        let report = store.reload().unwrap();
        assert!(report.changed);
        assert_eq!(store.snapshot().min_temp, 48);
        assert_eq!(store.snapshot().fan_low, 20);
    }

    #[test]
    fn test_reload_invalid_keeps_prior_config() {
        let dir = TempDir::new().unwrap();
        let (store, path) = store_in(&dir);

        fs::write(&path, "[fan_control]\nmax_temp = 80\n").unwrap();
        store.load().unwrap();
        let before = store.snapshot();

        fs::write(&path, "[fan_control]\nmin_temp = 90\n").unwrap();
        let result = store.reload();
        assert!(matches!(result, Err(PifanError::InvalidConfig { .. })));
        assert_eq!(store.snapshot(), before);
        assert_eq!(store.snapshot().max_temp, 80);
    }

    #[test]
    fn test_snapshot_survives_reload() {
        let dir = TempDir::new().unwrap();
        let (store, path) = store_in(&dir);

        let held = store.snapshot();
        fs::write(&path, "[fan_control]\noff_temp = 30\nmin_temp = 35\nmax_temp = 60\n").unwrap();
        store.reload().unwrap();

        // the held snapshot still sees the old values, all of them
        assert_eq!((held.off_temp, held.min_temp, held.max_temp), (40, 45, 70));
        let fresh = store.snapshot();
        assert_eq!((fresh.off_temp, fresh.min_temp, fresh.max_temp), (30, 35, 60));
    }

    #[test]
    fn test_reload_reports_warnings() {
        let dir = TempDir::new().unwrap();
        let (store, path) = store_in(&dir);
        fs::write(&path, "[fan_control]\nbogus = 1\nmin_temp = x\n").unwrap();
        let report = store.reload().unwrap();
        assert_eq!(report.warnings.len(), 2);
        assert!(!report.changed);
    }

    #[test]
    fn test_stage_reload_validates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fan_control_discrete.cfg");
        let store = ConfigStore::with_source(StageConfig::default(), &path);

        // lists of different length are rejected as a whole
        fs::write(&path, "[fan_control_discrete]\nfan_pins = 5, 6\non_temp = 40\n").unwrap();
        assert!(matches!(store.reload(), Err(PifanError::InvalidConfig { .. })));
        assert_eq!(*store.snapshot(), StageConfig::default());

        fs::write(
            &path,
            "[fan_control_discrete]\nfan_pins = 5, 6\non_temp = 40, 50\noff_temp = 35, 45\nwait_time = 2\n",
        )
        .unwrap();
        store.reload().unwrap();
        let expected = StageConfig { fan_pins: vec![5, 6], on_temp: vec![40, 50], off_temp: vec![35, 45], wait_time: 2 };
        assert_eq!(*store.snapshot(), expected);
    }

    #[test]
    fn test_store_is_shareable_across_threads() {
        let dir = TempDir::new().unwrap();
        let (store, path) = store_in(&dir);
        fs::write(&path, "[fan_control]\nmin_temp = 50\nmax_temp = 75\n").unwrap();
        let store = Arc::new(store);

        let reloader = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for _ in 0..50 {
                    store.reload().unwrap();
                }
            })
        };
        for _ in 0..50 {
            let snap = store.snapshot();
            assert!(snap.min_temp < snap.max_temp);
        }
        reloader.join().unwrap();
        assert_eq!(store.snapshot().min_temp, 50);
    }
}
