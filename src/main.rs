mod config;
mod notifier;
mod platform;
mod template;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::notifier::Notifier;
use crate::platform::discord::DiscordConnection;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const COMMIT: &str = match option_env!("MAINTBOT_COMMIT") {
    Some(commit) => commit,
    None => "unknown",
};

const BUILD_DATE: &str = match option_env!("MAINTBOT_BUILD_DATE") {
    Some(date) => date,
    None => "???",
};

#[tokio::main]
async fn main() -> Result<()> {
    config::load_dotenv()?;

    // Initialize logging
    let debug = config::debug_requested();
    let default_filter = if debug {
        "info,maintbot=debug"
    } else {
        "info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Using v{} (commit={}, built={}) of maintbot",
        VERSION, COMMIT, BUILD_DATE
    );
    if debug {
        info!("Debug logging enabled");
    }

    let config = Config::from_env()?;
    let template = config.template()?;

    match &config.prefix {
        Some(prefix) => info!("  Prefix: {}", prefix),
        None => warn!(
            "`{}` is not set; no messages will be answered",
            config::PREFIX_VAR
        ),
    }
    if config.discord_server.is_empty() {
        info!("  Support server: (none)");
    } else {
        info!("  Support server: {}", config.discord_server);
    }

    let notifier = Notifier::new(template, config.prefix.clone(), config.discord_server.clone());

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let connection = DiscordConnection::connect(&config.discord_token, events_tx).await?;

    let gateway = connection.gateway();
    let consumer = tokio::spawn(async move {
        platform::run_event_loop(notifier, events_rx, &*gateway).await;
    });

    info!("We are now running! Press CTRL-C to exit");
    connection.run_until(shutdown_signal()).await?;

    // In-flight sends are not awaited
    consumer.abort();

    info!("Goodbye...");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Unable to listen for CTRL-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Unable to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received CTRL-C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
