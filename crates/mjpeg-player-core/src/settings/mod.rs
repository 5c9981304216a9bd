//! Persisted display preference.

pub mod record;

use core::fmt::Debug;

use log::{info, warn};

/// Display polarity that survives power cycles.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DisplayPreference {
    /// Panel color inversion flag, applied globally.
    pub invert: bool,
}

impl DisplayPreference {
    /// Value used on first boot, before any record was written.
    pub const DEFAULT: Self = Self { invert: true };

    pub const fn new(invert: bool) -> Self {
        Self { invert }
    }

    pub const fn toggled(self) -> Self {
        Self {
            invert: !self.invert,
        }
    }
}

impl Default for DisplayPreference {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Abstract preference persistence backend.
pub trait PreferenceStore {
    type Error;

    fn load(&mut self) -> Result<Option<DisplayPreference>, Self::Error>;
    fn save(&mut self, preference: &DisplayPreference) -> Result<(), Self::Error>;
}

/// In-memory view of the preference backed by an optional store.
///
/// A missing or failing store degrades to the default value; writes are
/// best effort and never stall the caller.
#[derive(Debug)]
pub struct Preferences<S> {
    store: Option<S>,
    current: DisplayPreference,
}

impl<S> Preferences<S>
where
    S: PreferenceStore,
    S::Error: Debug,
{
    pub fn new(store: Option<S>) -> Self {
        Self {
            store,
            current: DisplayPreference::DEFAULT,
        }
    }

    /// Reads the persisted value, falling back to the default.
    pub fn load(&mut self) -> DisplayPreference {
        let Some(store) = self.store.as_mut() else {
            info!("prefs: storage unavailable; using default invert={}", self.current.invert);
            return self.current;
        };

        self.current = match store.load() {
            Ok(Some(saved)) => {
                info!("prefs: restored invert={}", saved.invert);
                saved
            }
            Ok(None) => {
                info!("prefs: no saved record; first boot defaults");
                DisplayPreference::DEFAULT
            }
            Err(err) => {
                warn!("prefs: load failed ({:?}); using defaults", err);
                DisplayPreference::DEFAULT
            }
        };
        self.current
    }

    pub const fn current(&self) -> DisplayPreference {
        self.current
    }

    /// Updates the in-memory value and writes it through.
    ///
    /// Returns `true` when the value reached durable storage.
    pub fn save(&mut self, preference: DisplayPreference) -> bool {
        self.current = preference;
        let Some(store) = self.store.as_mut() else {
            return false;
        };

        match store.save(&preference) {
            Ok(()) => true,
            Err(err) => {
                warn!("prefs: save failed ({:?}); keeping value in memory", err);
                false
            }
        }
    }

    /// Flips the polarity, persists it and returns the new value.
    pub fn toggle(&mut self) -> DisplayPreference {
        let next = self.current.toggled();
        let persisted = self.save(next);
        info!("prefs: invert={} persisted={}", next.invert, persisted);
        next
    }

    pub fn store(&self) -> Option<&S> {
        self.store.as_ref()
    }
}
