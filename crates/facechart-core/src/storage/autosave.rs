//! Periodic autosave of the in-progress chart.
//!
//! Autosave snapshots the working collections onto the active session record
//! via [`ChartingStore::save_session`]. It never touches the pending queue.

use crate::config::ChartingSettings;
use crate::store::ChartingStore;
use std::time::{Duration, Instant};

/// Default autosave interval in seconds.
pub const DEFAULT_AUTOSAVE_INTERVAL_SECS: u64 = 30;

/// Timer driving [`ChartingStore::save_session`].
#[derive(Debug, Clone)]
pub struct AutoSave {
    interval: Duration,
    enabled: bool,
    last_save: Option<Instant>,
}

impl Default for AutoSave {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_AUTOSAVE_INTERVAL_SECS))
    }
}

impl AutoSave {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            enabled: true,
            last_save: None,
        }
    }

    /// Timer using the configured interval and on/off switch.
    pub fn from_settings(settings: &ChartingSettings) -> Self {
        let mut autosave = Self::new(settings.autosave_interval());
        autosave.set_enabled(settings.autosave);
        autosave
    }

    /// Set the autosave interval.
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Check if the store has unsaved changes and the interval has passed.
    pub fn should_save(&self, store: &ChartingStore) -> bool {
        if !self.enabled || !store.is_dirty() {
            return false;
        }

        match self.last_save {
            Some(last) => last.elapsed() >= self.interval,
            None => true,
        }
    }

    /// Snapshot the chart if needed. Returns true if a snapshot was taken.
    pub fn maybe_save(&mut self, store: &mut ChartingStore) -> bool {
        if !self.should_save(store) {
            return false;
        }

        let saved = store.save_session();
        if saved {
            self.last_save = Some(Instant::now());
            log::debug!("Autosaved session {:?}", store.current_session().map(|s| s.id));
        }
        saved
    }
}
