//! Command handlers. Each returns what `main` prints so it can be tested
//! without capturing stdout.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use embedkit_core::{
    display_image_to_size, provider_icon_to_size, AppConfig, EmbeddedAsset, Settings,
};
use embedkit_fetch::{CacheFront, FetchOptions, OembedClient};
use embedkit_safety::SafetyValidator;
use embedkit_store::{from_document, read_document, to_document, AssetStore, SavedAsset};

pub(crate) fn build_cache(config: &AppConfig, settings: &Settings) -> anyhow::Result<CacheFront> {
    let client = OembedClient::new(FetchOptions::from_app_config(config, settings))?;
    Ok(CacheFront::new(
        Arc::new(client),
        config.cache_ttl_secs,
        config.min_image_size,
    ))
}

pub(crate) fn build_validator(settings: &Settings) -> anyhow::Result<SafetyValidator> {
    let whitelist = settings
        .compile_whitelist()
        .context("invalid whitelist in settings")?;
    Ok(SafetyValidator::new(whitelist))
}

pub(crate) async fn run_fetch(cache: &CacheFront, url: &str) -> anyhow::Result<String> {
    let asset = cache.get_or_fetch(url).await?;
    Ok(to_document(&asset)?)
}

pub(crate) async fn run_save(
    cache: &CacheFront,
    store: &AssetStore,
    url: &str,
    folder: &str,
) -> anyhow::Result<SavedAsset> {
    let asset = cache.get_or_fetch(url).await?;
    Ok(store.save(&asset, folder).await?)
}

async fn load_asset(file: &Path) -> anyhow::Result<EmbeddedAsset> {
    read_document(file)
        .await?
        .with_context(|| format!("{} is not an embedded asset", file.display()))
}

/// Human-readable verdict for a stored document, and whether it is safe.
pub(crate) async fn run_check(
    validator: &SafetyValidator,
    file: &Path,
) -> anyhow::Result<(String, bool)> {
    let asset = load_asset(file).await?;
    let report = validator.inspect(&asset);

    let mut out = format!(
        "{}: {}",
        asset.url(),
        if report.is_safe() { "safe" } else { "unsafe" }
    );
    for violation in report.violations() {
        let _ = write!(out, "\n  - {violation}");
    }
    Ok((out, report.is_safe()))
}

/// `url widthxheight` of the best-fitting image or icon.
pub(crate) async fn run_image(file: &Path, size: u32, icon: bool) -> anyhow::Result<Option<String>> {
    let asset = load_asset(file).await?;
    let image = if icon {
        provider_icon_to_size(&asset, size)
    } else {
        display_image_to_size(&asset, size)
    };
    Ok(image.map(|i| format!("{} {}x{}", i.url, i.width, i.height)))
}

/// Rewrites a document in the current schema. Returns the path written.
pub(crate) async fn run_migrate(file: &Path, output: Option<&Path>) -> anyhow::Result<PathBuf> {
    let text = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let asset = from_document(&text)
        .with_context(|| format!("{} is not an embedded asset", file.display()))?;

    let target = output.unwrap_or(file).to_path_buf();
    replace_file(&target, &to_document(&asset)?).await?;
    tracing::info!(from = %file.display(), to = %target.display(), "document migrated");
    Ok(target)
}

/// Writes `contents` to a temp file beside `target`, then renames it over
/// `target`. On failure `target` is left as it was.
async fn replace_file(target: &Path, contents: &str) -> anyhow::Result<()> {
    let dir = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let temp_path = dir.join(format!(".{}.tmp", uuid::Uuid::new_v4()));

    let written = async {
        tokio::fs::write(&temp_path, contents)
            .await
            .with_context(|| format!("failed to write {}", temp_path.display()))?;
        tokio::fs::rename(&temp_path, target)
            .await
            .with_context(|| format!("failed to replace {}", target.display()))
    }
    .await;

    if written.is_err() {
        if let Err(e) = tokio::fs::remove_file(&temp_path).await {
            tracing::debug!(path = %temp_path.display(), error = %e, "temp file not removed");
        }
    }
    written
}
