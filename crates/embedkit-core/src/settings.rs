use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::whitelist::Whitelist;
use crate::{ConfigError, WhitelistError};

/// Providers trusted out of the box when no settings file is configured.
pub const DEFAULT_WHITELIST: &[&str] = &[
    "amazon.*",
    "angel.co",
    "hulu.com",
    "amcharts.com",
    "codepen.io",
    "*.dailymotion.com",
    "deviantart.com",
    "embed.ly",
    "facebook.com",
    "fb.me",
    "flickr.com",
    "giphy.com",
    "gist.github.com",
    "*.google.com",
    "*.googleapis.com",
    "imgur.com",
    "instagram.com",
    "issuu.com",
    "kickstarter.com",
    "meetup.com",
    "player.pbs.org",
    "pinterest.com",
    "*.reddit.com",
    "slideshare.net",
    "soundcloud.com",
    "spotify.com",
    "ted.com",
    "tumblr.com",
    "twitch.tv",
    "twitter.com",
    "x.com",
    "vimeo.com",
    "vine.co",
    "wikipedia.org",
    "wikimedia.org",
    "wordpress.com",
    "youtube.com",
    "youtu.be",
    "youtube-nocookie.com",
];

/// One extra query parameter sent with every oEmbed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OembedParameter {
    pub param: String,
    pub value: String,
}

/// Embed policy settings, loaded from YAML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_whitelist")]
    pub whitelist: Vec<String>,
    #[serde(default)]
    pub parameters: Vec<OembedParameter>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            whitelist: default_whitelist(),
            parameters: Vec::new(),
        }
    }
}

impl Settings {
    /// Compiles the configured patterns.
    ///
    /// # Errors
    ///
    /// Returns [`WhitelistError`] if a pattern is blank.
    pub fn compile_whitelist(&self) -> Result<Whitelist, WhitelistError> {
        Whitelist::new(&self.whitelist)
    }
}

fn default_whitelist() -> Vec<String> {
    DEFAULT_WHITELIST.iter().map(ToString::to_string).collect()
}

/// Load and validate embed settings from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SettingsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let settings: Settings = serde_yaml::from_str(&content)?;
    validate_settings(&settings)?;

    tracing::debug!(
        path = %path.display(),
        patterns = settings.whitelist.len(),
        parameters = settings.parameters.len(),
        "loaded embed settings"
    );
    Ok(settings)
}

/// Settings from `path` when given, otherwise the built-in defaults.
///
/// # Errors
///
/// Returns `ConfigError` if a given file cannot be loaded.
pub fn load_settings_or_default(path: Option<&Path>) -> Result<Settings, ConfigError> {
    path.map_or_else(|| Ok(Settings::default()), load_settings)
}

fn validate_settings(settings: &Settings) -> Result<(), ConfigError> {
    if settings.whitelist.iter().any(|p| p.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "whitelist patterns must be non-empty".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for parameter in &settings.parameters {
        if parameter.param.trim().is_empty() {
            return Err(ConfigError::Validation(
                "oEmbed parameter name must be non-empty".to_string(),
            ));
        }
        if !seen.insert(parameter.param.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate oEmbed parameter: '{}'",
                parameter.param
            )));
        }
    }

    Ok(())
}
