use crate::models::ClientSettings;
use anyhow::{Context, Result, bail};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Default configuration directory, relative to the working directory
pub const DEFAULT_CONFIG_DIR: &str = "LodTex Data";

/// Name of the settings file inside the configuration directory
pub const SETTINGS_FILE_NAME: &str = "lodtex.yaml";

/// Loads and saves `lodtex.yaml`.
///
/// Only client settings live on disk. Column exclusions and widths belong to
/// the session and start from their defaults every run.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    settings_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a ConfigManager for `config_dir`, creating the directory if needed.
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            settings_path: config_dir.join(SETTINGS_FILE_NAME),
            config_dir,
        })
    }

    /// Load the settings file.
    ///
    /// # Returns
    /// The loaded settings, or defaults if the file doesn't exist
    pub fn load_settings(&self) -> Result<ClientSettings> {
        if !self.settings_path.exists() {
            tracing::warn!(
                "Settings file not found at {}, using defaults",
                self.settings_path
            );
            return Ok(ClientSettings::default());
        }

        let file_contents = fs::read_to_string(&self.settings_path)
            .with_context(|| format!("Failed to read settings: {}", self.settings_path))?;

        // An empty file deserializes to unit, not to an empty mapping
        if file_contents.trim().is_empty() {
            tracing::warn!("Settings file {} is empty, using defaults", self.settings_path);
            return Ok(ClientSettings::default());
        }

        let settings: ClientSettings = serde_yaml_ng::from_str(&file_contents)
            .with_context(|| format!("Failed to parse settings: {}", self.settings_path))?;

        Self::check(&settings)
            .with_context(|| format!("Invalid settings in {}", self.settings_path))?;

        tracing::info!("Loaded settings from {}", self.settings_path);
        Ok(settings)
    }

    /// Save the settings file.
    pub fn save_settings(&self, settings: &ClientSettings) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(settings).context("Failed to serialize settings to YAML")?;

        fs::write(&self.settings_path, yaml_string)
            .with_context(|| format!("Failed to write settings: {}", self.settings_path))?;

        tracing::info!("Saved settings to {}", self.settings_path);
        Ok(())
    }

    /// Write a default settings file if none exists, so users have something to edit.
    ///
    /// # Returns
    /// `true` if a file was written
    pub fn ensure_settings_file(&self) -> Result<bool> {
        if self.settings_path.exists() {
            return Ok(false);
        }
        self.save_settings(&ClientSettings::default())?;
        Ok(true)
    }

    fn check(settings: &ClientSettings) -> Result<()> {
        if settings.service.base_url.trim().is_empty() {
            bail!("service.base_url must not be empty");
        }

        let validation = &settings.validation;
        if validation.min_width > validation.max_width {
            bail!(
                "validation.min_width ({}) is greater than validation.max_width ({})",
                validation.min_width,
                validation.max_width
            );
        }

        Ok(())
    }

    pub fn settings_path(&self) -> &Utf8Path {
        &self.settings_path
    }

    /// Get the configuration directory path.
    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_config_manager() -> (ConfigManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
        let manager = ConfigManager::new(&config_path).unwrap();
        (manager, temp_dir)
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let (manager, _temp_dir) = create_test_config_manager();

        let settings = manager.load_settings().unwrap();
        assert_eq!(settings, ClientSettings::default());
    }

    #[test]
    fn test_load_save_settings() {
        let (manager, _temp_dir) = create_test_config_manager();

        let mut settings = ClientSettings::default();
        settings.service.base_url = "http://lod.internal:9000".to_string();
        settings.debug_mode = true;
        manager.save_settings(&settings).unwrap();

        let loaded = manager.load_settings().unwrap();
        assert_eq!(loaded.service.base_url, "http://lod.internal:9000");
        assert!(loaded.debug_mode);
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let (manager, _temp_dir) = create_test_config_manager();
        fs::write(manager.settings_path(), "\n").unwrap();

        assert_eq!(manager.load_settings().unwrap(), ClientSettings::default());
    }

    #[test]
    fn test_inverted_width_range_is_rejected() {
        let (manager, _temp_dir) = create_test_config_manager();
        fs::write(
            manager.settings_path(),
            "validation:\n  min_width: 8.0\n  max_width: 2.0\n",
        )
        .unwrap();

        assert!(manager.load_settings().is_err());
    }

    #[test]
    fn test_ensure_settings_file() {
        let (manager, _temp_dir) = create_test_config_manager();

        assert!(manager.ensure_settings_file().unwrap());
        assert!(manager.settings_path().exists());
        assert!(!manager.ensure_settings_file().unwrap());
    }

    #[test]
    fn test_creates_missing_directory() {
        let temp_dir = TempDir::new().unwrap();
        let nested = Utf8PathBuf::try_from(temp_dir.path().join("a/b")).unwrap();

        let manager = ConfigManager::new(&nested).unwrap();
        assert!(manager.config_dir().is_dir());
    }
}
