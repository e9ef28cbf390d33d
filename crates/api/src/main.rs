use std::sync::Arc;

use anyhow::Context;
use tokio::signal;

use zyra_api::app::{AppState, build_app};
use zyra_auth::{AuthGate, HmacCredentialValidator, StripeSignatureVerifier, WebhookVerifier};
use zyra_infra::breaker::BreakerRegistry;
use zyra_infra::channels::ChannelRegistry;
use zyra_infra::config::GatewayConfig;
use zyra_infra::dispatch::DispatchExecutor;
use zyra_infra::revocation::RedisRevocationStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is normal outside local development.
    let _ = dotenvy::dotenv();
    zyra_observability::init();

    let config = GatewayConfig::from_env().context("failed to load configuration")?;
    tracing::info!(?config, "configuration loaded");

    let revocations = RedisRevocationStore::connect(&config.redis_url)
        .await
        .context("failed to connect to redis")?;

    let gate = AuthGate::new(
        Arc::new(HmacCredentialValidator::new(config.jwt_secret.as_bytes())),
        Arc::new(revocations),
    )
    .with_revocation_timeout(config.revocation_timeout);

    let channels = Arc::new(
        ChannelRegistry::connect_http(&config.endpoints).context("failed to build downstream channels")?,
    );

    let executor = DispatchExecutor::new(Arc::new(BreakerRegistry::new(config.breaker)))
        .with_call_timeout(config.call_timeout);

    let webhook = config
        .stripe_webhook_secret
        .as_ref()
        .map(|secret| Arc::new(StripeSignatureVerifier::new(secret)) as Arc<dyn WebhookVerifier>);
    if webhook.is_none() {
        tracing::warn!("STRIPE_WEBHOOK_SECRET not set; POST /webhook is disabled");
    }

    let app = build_app(AppState {
        gate: Arc::new(gate),
        executor,
        channels: channels.clone(),
        webhook,
        cors_allowed_origins: config.cors_allowed_origins.clone().into(),
    });

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    channels.shutdown().await;
    tracing::info!("gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received SIGINT"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}
