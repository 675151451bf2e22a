//! Persistent application settings.

use std::error::Error;
use std::path::Path;

use serde::{Deserialize, Serialize};

const CONFIG_PATH: &str = "midiroll.toml";

#[derive(Default, Serialize, Deserialize)]
pub struct Config {
    /// Directory the file dialog opens in.
    pub midi_folder: Option<String>,
    pub dark_theme: Option<bool>,
    pub gamma: Option<f32>,
}

impl Config {
    pub fn load() -> Result<Self, Box<dyn Error>> {
        let s = std::fs::read_to_string(CONFIG_PATH)?;
        Ok(toml::from_str(&s)?)
    }

    pub fn save(&self) -> Result<(), Box<dyn Error>> {
        let s = toml::to_string(self)?;
        std::fs::write(CONFIG_PATH, s)?;
        Ok(())
    }
}

/// Returns a path's parent directory as a string, for remembering where a
/// file was opened from.
pub fn dir_as_string(path: &Path) -> Option<String> {
    path.parent()
        .and_then(|p| p.to_str())
        .map(|s| s.to_owned())
}
