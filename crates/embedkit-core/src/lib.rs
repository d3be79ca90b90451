//! Core model and policy for embed metadata.
//!
//! Normalizes provider or legacy data into an [`EmbeddedAsset`] through the
//! closed-schema [`builder`], matches URLs against a domain [`Whitelist`],
//! and picks best-fit images with [`images`].

pub mod app_config;
pub mod asset;
pub mod builder;
pub mod config;
pub mod error;
pub mod images;
pub mod legacy;
pub mod settings;
pub mod whitelist;

pub use app_config::{AppConfig, Environment, ProviderKeys};
pub use asset::{aspect_ratio, EmbeddedAsset, Image, Markup, ASSET_FIELDS};
pub use builder::{build_asset, build_from_document, fields_from_json, AssetFields, FieldValue};
pub use config::{load_app_config, load_app_config_from_env};
pub use error::{BuildError, ConfigError, WhitelistError};
pub use images::{display_image_to_size, is_large_enough, provider_icon_to_size, select_image_to_size};
pub use legacy::{convert_legacy, is_legacy, LEGACY_MARKER};
pub use settings::{load_settings, load_settings_or_default, OembedParameter, Settings};
pub use whitelist::Whitelist;
