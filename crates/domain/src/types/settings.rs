//! Last-known user settings

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_LANGUAGE, SUPPORTED_LANGUAGES};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub language: String,
    pub translate_to: Option<String>,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            translate_to: None,
            user_id: None,
            session_id: None,
        }
    }
}

impl Settings {
    pub fn is_supported_language(language: &str) -> bool {
        SUPPORTED_LANGUAGES.contains(&language)
    }
}
