use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read settings file {path}: {source}")]
    SettingsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings file: {0}")]
    SettingsFileParse(#[from] serde_yaml::Error),

    #[error("settings validation error: {0}")]
    Validation(String),
}

/// Why an input could not become an [`crate::EmbeddedAsset`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("unknown field \"{0}\"")]
    UnknownField(String),

    #[error("invalid value for {field}: {reason}")]
    InvalidField { field: String, reason: String },

    #[error("asset failed validation: {0}")]
    Validation(String),
}

#[derive(Debug, Error)]
pub enum WhitelistError {
    #[error("whitelist pattern must be non-empty")]
    EmptyPattern,

    #[error("whitelist pattern \"{pattern}\" does not compile: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}
