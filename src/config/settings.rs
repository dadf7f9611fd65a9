use crate::world::dispatcher::DEFAULT_WORLD_BOUND;
use crate::world::skeleton::DefaultRig;
use crate::world::AvatarCapabilities;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

const CONFIG_FILE: &str = "avatar_sync.toml";
const ENV_PREFIX: &str = "SLV_AVATAR";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to load settings: {0}")]
    Load(#[from] config::ConfigError),
    #[error("Failed to encode settings: {0}")]
    Encode(#[from] toml::ser::Error),
    #[error("Settings I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("No configuration directory for this platform")]
    NoConfigDir,
}

/// Which optional avatar presentation features are built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilitySettings {
    pub name_overlay: bool,
    pub hovering_text: bool,
    pub highlight: bool,
    pub touch_cursor: bool,
}

impl Default for CapabilitySettings {
    fn default() -> Self {
        Self {
            name_overlay: true,
            hovering_text: false,
            highlight: false,
            touch_cursor: false,
        }
    }
}

impl CapabilitySettings {
    pub fn to_capabilities(self) -> AvatarCapabilities {
        let mut caps = AvatarCapabilities::empty();
        caps.set(AvatarCapabilities::NAME_OVERLAY, self.name_overlay);
        caps.set(AvatarCapabilities::HOVERING_TEXT, self.hovering_text);
        caps.set(AvatarCapabilities::HIGHLIGHT, self.highlight);
        caps.set(AvatarCapabilities::TOUCH_CURSOR, self.touch_cursor);
        caps
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvatarSyncSettings {
    /// Positions with any coordinate beyond this are rejected
    pub world_bound: f32,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    /// Appearance address for the own avatar when the server gives none
    pub default_avatar_storage_url: String,
    /// Appearance XML whose `<animation>` table new avatars start with
    pub default_animations_file: Option<PathBuf>,
    pub capabilities: CapabilitySettings,
    pub default_rig: DefaultRig,
}

impl Default for AvatarSyncSettings {
    fn default() -> Self {
        Self {
            world_bound: DEFAULT_WORLD_BOUND,
            log_level: "info".to_string(),
            log_file: None,
            default_avatar_storage_url: String::new(),
            default_animations_file: None,
            capabilities: CapabilitySettings::default(),
            default_rig: DefaultRig::default(),
        }
    }
}

impl AvatarSyncSettings {
    /// Layer defaults, an optional TOML file and `SLV_AVATAR__*` environment variables
    pub fn load(path: Option<&Path>) -> Result<Self, SettingsError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        let settings = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).prefix_separator("__").separator("__"))
            .build()?
            .try_deserialize::<Self>()?;
        Ok(settings)
    }

    pub fn from_toml_str(data: &str) -> Result<Self, SettingsError> {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(data, config::FileFormat::Toml))
            .build()?
            .try_deserialize::<Self>()?;
        Ok(settings)
    }

    pub fn to_toml_string(&self) -> Result<String, SettingsError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }
}

pub fn settings_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "slv", "slv-avatar-sync").map(|proj| proj.config_dir().join(CONFIG_FILE))
}

pub fn save_settings(settings: &AvatarSyncSettings) -> Result<(), SettingsError> {
    let path = settings_path().ok_or(SettingsError::NoConfigDir)?;
    settings.save_to(&path)
}

/// Settings from the per-user config file, falling back to defaults
pub fn load_settings() -> AvatarSyncSettings {
    match AvatarSyncSettings::load(settings_path().as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!("Using default settings: {}", e);
            AvatarSyncSettings::default()
        }
    }
}
