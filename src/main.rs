//! paperless-metrics - Prometheus exporter for Paperless-ngx.

use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use paperless_metrics::config::{self, Cli, Settings};
use paperless_metrics::http_client::HttpClient;
use paperless_metrics::metrics::PaperlessMetrics;
use paperless_metrics::paperless::PaperlessApi;
use paperless_metrics::poller::{PollExit, Poller};
use paperless_metrics::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let level = config::parse_verbosity(&cli.verbosity);
    let default_filter = format!(
        "paperless_metrics={}",
        level.unwrap_or(tracing::Level::INFO).as_str().to_lowercase()
    );

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if level.is_none() {
        tracing::error!("Invalid log level set: {:?}, using INFO", cli.verbosity);
    }

    let settings = Settings::from_cli(&cli)?;
    tracing::debug!("Loaded settings: {:?}", settings);

    let metrics = Arc::new(PaperlessMetrics::with_policy(settings.label_policy)?);
    tracing::info!("Stale label policy: {}", metrics.label_policy());

    let client = HttpClient::builder(settings.request_timeout)
        .build()
        .map_err(anyhow::Error::msg)?;
    let api = PaperlessApi::new(
        Arc::new(client),
        &settings.base_url,
        &settings.token,
        &settings.host_header,
    );

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received ctrl-c, shutting down");
            shutdown.cancel();
        }
    });

    let mut poller =
        Poller::new(api, metrics.clone(), settings.refresh_interval).spawn(cancel.clone());
    let mut server = tokio::spawn(server::serve(
        metrics,
        settings.metrics_port,
        cancel.clone(),
    ));

    tokio::select! {
        exit = &mut poller => {
            match exit? {
                PollExit::TooManyFailures { failures } => {
                    anyhow::bail!("Too many failures ({}) polling Paperless, exiting", failures);
                }
                PollExit::Cancelled => server.await??,
            }
        }
        result = &mut server => {
            cancel.cancel();
            result??;
            poller.await?;
        }
    }

    Ok(())
}
