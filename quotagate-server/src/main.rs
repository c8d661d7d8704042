use anyhow::Result;
use quotagate::SystemClock;
use quotagate_server::config::Config;
use quotagate_server::generator::EchoGenerator;
use quotagate_server::metrics::Metrics;
use quotagate_server::plans::load_plans;
use quotagate_server::store;
use quotagate_server::transport::{Transport, http::HttpTransport};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse configuration from environment variables and CLI arguments
    let config = Config::from_env_and_args()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("quotagate={}", config.log_level).parse()?)
                .add_directive(format!("quotagate_server={}", config.log_level).parse()?),
        )
        .init();

    let plans = load_plans(config.limits.plans_file.as_deref())?;
    tracing::info!("Loaded {} plans", plans.len());

    let entitlements = store::create_entitlements(&config, plans)?;

    tracing::info!(
        "quotagate started with store type: {:?}, cooldown: {}s",
        config.store.store_type,
        config.limits.cooldown_seconds
    );
    tracing::info!(
        "Store capacity: {}, Buffer size: {}",
        config.store.capacity,
        config.buffer_size
    );

    let transport = HttpTransport::new(
        &config.http.host,
        config.http.port,
        Arc::new(EchoGenerator),
        config.generator.timeout,
        Arc::new(Metrics::new()),
    )
    .with_clock(Arc::new(SystemClock))
    .trust_client_context(config.http.trust_client_context);

    if let Err(e) = transport.start(entitlements).await {
        tracing::error!("HTTP transport failed: {}", e);
        return Err(e);
    }

    Ok(())
}
