use anyhow::Context;
use landlord::config::{self, load_config, LogFormat};
use landlord::landlord::Landlord;
use landlord::{eviction, node, AppConfig};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::subscriber::set_global_default;
use tracing::{error, info};
use tracing_error::ErrorLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

fn init_logging(config: &config::Log) -> anyhow::Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.level))?;

    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .boxed(),
        LogFormat::Text => tracing_subscriber::fmt::layer().with_target(false).boxed(),
    };

    let subscriber = Registry::default()
        .with(env_filter)
        .with(fmt_layer)
        .with(ErrorLayer::default());

    set_global_default(subscriber).context("Failed to set subscriber")?;

    Ok(())
}

/// Cancels the returned token on SIGINT or SIGTERM.
fn shutdown_token() -> anyhow::Result<CancellationToken> {
    let token = CancellationToken::new();
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::spawn({
        let token = token.clone();
        async move {
            tokio::select! {
                _ = sigterm.recv() => info!("Received SIGTERM"),
                _ = sigint.recv() => info!("Received SIGINT"),
            }
            token.cancel();
        }
    });

    Ok(token)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;
    init_logging(&config.log)?;

    let token = shutdown_token()?;

    let result = run(config, token).await;
    if let Err(e) = &result {
        error!("{:#}", e);
    }

    result
}

async fn run(config: AppConfig, token: CancellationToken) -> anyhow::Result<()> {
    let lister = node::lister::build_from_config(Arc::clone(&config))
        .await
        .context("Failed to build node lister")?;
    let evicter = eviction::build_from_config(Arc::clone(&config))
        .await
        .context("Failed to build evicter")?;

    let rand = match config.landlord.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    Landlord::new(&config.landlord, lister, evicter, rand)
        .start(token)
        .await;

    Ok(())
}
