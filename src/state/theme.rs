use crate::config::THEME_STORAGE_KEY;
use crate::storage::{KeyValueStore, load_json, save_json};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// User-selected theme preference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemePreference {
    Light,
    Dark,
    #[default]
    System,
}

/// Theme actually applied after resolving `System`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Light,
    Dark,
}

const LIGHT_VARIABLES: [(&str, &str); 7] = [
    ("--background", "#ffffff"),
    ("--foreground", "#0f172a"),
    ("--card", "#f8fafc"),
    ("--border", "#e2e8f0"),
    ("--muted", "#64748b"),
    ("--positive", "#16a34a"),
    ("--negative", "#dc2626"),
];

const DARK_VARIABLES: [(&str, &str); 7] = [
    ("--background", "#0f172a"),
    ("--foreground", "#f1f5f9"),
    ("--card", "#1e293b"),
    ("--border", "#334155"),
    ("--muted", "#94a3b8"),
    ("--positive", "#4ade80"),
    ("--negative", "#f87171"),
];

pub struct ThemeStore {
    preference: ThemePreference,
    system_prefers_dark: bool,
    storage: Arc<dyn KeyValueStore>,
}

impl ThemeStore {
    /// Restore the persisted preference; unreadable values fall back to `System`.
    pub fn load(storage: Arc<dyn KeyValueStore>) -> Self {
        let preference = match load_json::<ThemePreference>(storage.as_ref(), THEME_STORAGE_KEY) {
            Ok(Some(p)) => p,
            Ok(None) => ThemePreference::default(),
            Err(e) => {
                warn!(error = %e, "[STORE] stored theme unreadable, using system");
                ThemePreference::default()
            }
        };
        Self {
            preference,
            system_prefers_dark: false,
            storage,
        }
    }

    pub fn preference(&self) -> ThemePreference {
        self.preference
    }

    pub fn set_preference(&mut self, preference: ThemePreference) {
        self.preference = preference;
        debug!(?preference, "[STORE] theme preference changed");
        if let Err(e) = save_json(self.storage.as_ref(), THEME_STORAGE_KEY, &preference) {
            warn!(error = %e, "[STORE] failed to persist theme");
        }
    }

    /// Host hint consulted when the preference is `System`.
    pub fn set_system_prefers_dark(&mut self, dark: bool) {
        self.system_prefers_dark = dark;
    }

    pub fn resolved(&self) -> Theme {
        match self.preference {
            ThemePreference::Light => Theme::Light,
            ThemePreference::Dark => Theme::Dark,
            ThemePreference::System if self.system_prefers_dark => Theme::Dark,
            ThemePreference::System => Theme::Light,
        }
    }

    /// Flip the resolved theme, pinning it as an explicit preference.
    pub fn toggle(&mut self) -> Theme {
        let next = match self.resolved() {
            Theme::Light => ThemePreference::Dark,
            Theme::Dark => ThemePreference::Light,
        };
        self.set_preference(next);
        self.resolved()
    }

    /// Document-level style variables for the resolved theme.
    pub fn style_variables(&self) -> BTreeMap<&'static str, &'static str> {
        let table = match self.resolved() {
            Theme::Light => LIGHT_VARIABLES,
            Theme::Dark => DARK_VARIABLES,
        };
        table.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn defaults_to_system_and_follows_host_hint() {
        let mut theme = ThemeStore::load(Arc::new(MemoryStore::new()));
        assert_eq!(theme.preference(), ThemePreference::System);
        assert_eq!(theme.resolved(), Theme::Light);
        theme.set_system_prefers_dark(true);
        assert_eq!(theme.resolved(), Theme::Dark);
    }

    #[test]
    fn preference_survives_reload() {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let mut theme = ThemeStore::load(storage.clone());
        theme.set_preference(ThemePreference::Dark);

        assert_eq!(storage.get(THEME_STORAGE_KEY).unwrap().as_deref(), Some("\"dark\""));
        let reloaded = ThemeStore::load(storage);
        assert_eq!(reloaded.preference(), ThemePreference::Dark);
    }

    #[test]
    fn malformed_stored_value_falls_back_to_system() {
        let storage: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        storage.set(THEME_STORAGE_KEY, "\"sepia\"").unwrap();
        let theme = ThemeStore::load(storage);
        assert_eq!(theme.preference(), ThemePreference::System);
    }

    #[test]
    fn toggle_pins_opposite_of_resolved_theme() {
        let mut theme = ThemeStore::load(Arc::new(MemoryStore::new()));
        theme.set_system_prefers_dark(true);
        assert_eq!(theme.toggle(), Theme::Light);
        assert_eq!(theme.preference(), ThemePreference::Light);
        assert_eq!(theme.toggle(), Theme::Dark);
    }

    #[test]
    fn style_variables_track_resolved_theme() {
        let mut theme = ThemeStore::load(Arc::new(MemoryStore::new()));
        assert_eq!(theme.style_variables()["--background"], "#ffffff");
        theme.set_preference(ThemePreference::Dark);
        assert_eq!(theme.style_variables()["--background"], "#0f172a");
    }
}
