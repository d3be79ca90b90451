mod api;
mod middleware;

use std::sync::Arc;
use std::time::Duration;

use embedkit_fetch::{CacheFront, FetchOptions, OembedClient};
use embedkit_safety::SafetyValidator;
use embedkit_store::AssetStore;
use tracing_subscriber::EnvFilter;

use crate::api::{build_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = embedkit_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let settings = embedkit_core::load_settings_or_default(config.settings_path.as_deref())?;
    let whitelist = settings.compile_whitelist()?;
    let client = OembedClient::new(FetchOptions::from_app_config(&config, &settings))?;
    let cache = Arc::new(CacheFront::new(
        Arc::new(client),
        config.cache_ttl_secs,
        config.min_image_size,
    ));

    spawn_cache_purge(Arc::clone(&cache), config.cache_ttl_secs);

    let state = AppState {
        cache,
        validator: Arc::new(SafetyValidator::new(whitelist)),
        store: Arc::new(AssetStore::from_app_config(&config)),
    };
    let app = build_app(state);

    tracing::info!(
        env = %config.env,
        bind_addr = %config.bind_addr,
        storage_path = %config.storage_path.display(),
        "starting embedkit server"
    );
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

/// Drops expired cache entries once per TTL period.
fn spawn_cache_purge(cache: Arc<CacheFront>, ttl_secs: u64) {
    let period = Duration::from_secs(ttl_secs.max(60));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await;
        loop {
            interval.tick().await;
            cache.purge_expired().await;
        }
    });
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
