//! Persisted user settings

use std::sync::Arc;

use agrilink_core::KeyValueStore;
use agrilink_domain::constants::SETTINGS_KEY;
use agrilink_domain::{AgriLinkError, Result, Settings};
use tracing::{info, warn};

pub struct SettingsStore {
    store: Arc<dyn KeyValueStore>,
}

impl SettingsStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Load saved settings, falling back to defaults when nothing is stored
    /// or the stored document is unreadable.
    pub async fn load(&self) -> Result<Settings> {
        let Some(text) = self.store.get(SETTINGS_KEY).await? else {
            return Ok(Settings::default());
        };
        match serde_json::from_str(&text) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                warn!(error = %e, "stored settings unreadable; using defaults");
                Ok(Settings::default())
            }
        }
    }

    /// # Errors
    /// Returns [`AgriLinkError::InvalidInput`] for an unsupported language.
    pub async fn save(&self, settings: &Settings) -> Result<()> {
        if !Settings::is_supported_language(&settings.language) {
            return Err(AgriLinkError::InvalidInput(format!(
                "unsupported language '{}'",
                settings.language
            )));
        }
        let text = serde_json::to_string(settings)?;
        self.store.set(SETTINGS_KEY, &text).await?;
        info!(language = %settings.language, "settings saved");
        Ok(())
    }
}
