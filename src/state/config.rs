//! Configuration management
//!
//! Persisted speech settings, stored as INI at `~/.readaloud.cfg`:
//!
//! ```ini
//! [speech]
//! lang=pt-BR
//! rate=1
//! volume=1
//! pitch=1
//! voice=
//! ```

use crate::speech::options::{OptionsUpdate, DEFAULT_LANG};
use crate::widgets::VoiceSettings;
use crate::{ReadAloudError, Result};
use ini::Ini;
use log::{debug, info};
use std::path::{Path, PathBuf};

const SECTION: &str = "speech";

/// Persistent read-aloud settings
pub struct Config {
    /// INI configuration storage
    ini: Ini,

    /// Config file path
    path: PathBuf,
}

impl Config {
    /// Load configuration from `~/.readaloud.cfg`, creating it if missing
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_path())
    }

    /// Load configuration from `path`, creating a default file if missing
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        debug!("Loading config from {:?}", path);

        let ini = if path.exists() {
            Ini::load_from_file(&path)
                .map_err(|e| ReadAloudError::IniParse(format!("Failed to load config: {}", e)))?
        } else {
            info!("Config file not found, creating default");
            let default = Self::default_config();
            default
                .write_to_file(&path)
                .map_err(|e| ReadAloudError::IniParse(format!("Failed to write config: {}", e)))?;
            default
        };

        Ok(Self { ini, path })
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        debug!("Saving config to {:?}", self.path);
        self.ini
            .write_to_file(&self.path)
            .map_err(|e| ReadAloudError::Config(format!("Failed to save config: {}", e)))
    }

    fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".readaloud.cfg")
    }

    /// Expose the config file path for display
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn default_config() -> Ini {
        let mut ini = Ini::new();
        ini.with_section(Some(SECTION))
            .set("lang", DEFAULT_LANG)
            .set("rate", "1")
            .set("volume", "1")
            .set("pitch", "1");
        ini
    }

    /// Get a string value from config
    pub fn get_string(&self, section: &str, key: &str, default: &str) -> String {
        self.ini
            .get_from(Some(section), key)
            .unwrap_or(default)
            .to_string()
    }

    /// Get a float value, `None` when missing or unparsable
    pub fn get_float(&self, section: &str, key: &str) -> Option<f32> {
        self.ini
            .get_from(Some(section), key)
            .and_then(|v| v.trim().parse().ok())
    }

    /// Set a value in config
    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        self.ini.with_section(Some(section)).set(key, value);
    }

    /// Speech language tag
    pub fn lang(&self) -> String {
        self.get_string(SECTION, "lang", DEFAULT_LANG)
    }

    /// Rate multiplier, 1 is normal
    pub fn rate(&self) -> Option<f32> {
        self.get_float(SECTION, "rate")
    }

    /// Volume, 0-1
    pub fn volume(&self) -> Option<f32> {
        self.get_float(SECTION, "volume")
    }

    /// Pitch multiplier, 1 is normal
    pub fn pitch(&self) -> Option<f32> {
        self.get_float(SECTION, "pitch")
    }

    /// Engine id of the chosen voice
    pub fn voice_id(&self) -> Option<String> {
        self.ini
            .get_from(Some(SECTION), "voice")
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
    }

    /// Stored settings as an options update
    ///
    /// The voice is not included; it has to be resolved against the
    /// engine's voice list first (see `voice_id`).
    pub fn options_update(&self) -> OptionsUpdate {
        OptionsUpdate {
            lang: Some(self.lang()),
            rate: self.rate(),
            volume: self.volume(),
            pitch: self.pitch(),
            ..Default::default()
        }
    }

    /// Record a settings snapshot, e.g. from the voice panel
    pub fn apply_settings(&mut self, settings: &VoiceSettings) {
        self.set(SECTION, "lang", &settings.lang);
        self.set(SECTION, "rate", &settings.rate.to_string());
        self.set(SECTION, "volume", &settings.volume.to_string());
        self.set(SECTION, "pitch", &settings.pitch.to_string());
        let voice = settings.voice.as_ref().map(|v| v.id.as_str()).unwrap_or("");
        self.set(SECTION, "voice", voice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(dir.path().join("cfg")).unwrap();

        assert_eq!(config.lang(), "pt-BR");
        assert_eq!(config.rate(), Some(1.0));
        assert!(config.voice_id().is_none());
        assert!(dir.path().join("cfg").exists());
    }

    #[test]
    fn test_unparsable_float_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg");
        std::fs::write(&path, "[speech]\nrate=fast\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert!(config.rate().is_none());
        assert_eq!(config.options_update().rate, None);
    }
}
