use std::sync::Arc;

use livescore_shared::config::Config;
use livescore_shared::services::fetch::BatchFetcher;
use livescore_shared::services::live::{EventFilter, HttpLiveSource, LivePoller};
use livescore_shared::services::metrics::FeedMetrics;
use livescore_shared::services::notify::MailServiceNotifier;
use livescore_shared::services::publish::RedisPublisher;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "livescore_shared=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    let client = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()?;
    let metrics = FeedMetrics::new()?;

    let publisher = RedisPublisher::connect(&config.redis_url).await?;
    tracing::info!("Connected to Redis");

    let notifier = MailServiceNotifier::new(client.clone(), config.mail_service_url.clone());

    let batch = BatchFetcher::new(client.clone()).with_metrics(metrics.clone());
    let mut source = HttpLiveSource::new(client, config.live_feed_urls.clone()).with_batch(
        batch,
        config.feed_concurrency,
        config.feed_rps,
    );
    if let Some(api_key) = &config.live_feed_api_key {
        source = source.with_api_key(api_key.clone());
    }

    let poller = LivePoller::new(
        Arc::new(source),
        Arc::new(notifier),
        Arc::new(publisher),
        EventFilter::new(&config.tournament_filter),
        config.poller_config(),
    )
    .with_metrics(metrics.clone());
    let handle = poller.spawn();

    let app = livescore_shared::create_app(metrics);
    let listener = tokio::net::TcpListener::bind(config.status_addr).await?;
    tracing::info!("Status server running on http://{}", config.status_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutdown requested");
        })
        .await?;

    // Let the current tick finish before exiting
    handle.shutdown().await?;
    Ok(())
}
