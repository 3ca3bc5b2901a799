//! InCommon attribute gateway entry point.
//!
//! # Purpose
//! Wires configuration, credentials, the upstream token and the HTTP router,
//! then serves until Ctrl-C.
//!
//! # Notes
//! The initial token acquisition is fatal; later renewal failures are not.
use anyhow::Context;
use gateway::app::{AppState, build_router};
use gateway::auth::TokenManager;
use gateway::config::GatewayConfig;
use gateway::credentials::load_credentials;
use gateway::observability;
use gateway::person::PersonAggregator;
use gateway::upstream::IdentityClient;
use incommon_affiliation::AffiliationClassifier;
use std::future::Future;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let telemetry = observability::init_observability(observability::SERVICE_NAME)
        .context("install metrics recorder")?;
    let config = GatewayConfig::from_env_or_yaml().context("gateway config")?;
    let metrics_listener = tokio::net::TcpListener::bind(config.metrics_bind)
        .await
        .with_context(|| format!("bind metrics {}", config.metrics_bind))?;
    tracing::info!(addr = %metrics_listener.local_addr()?, "metrics listening");
    let metrics_app = observability::metrics_router(telemetry.clone());
    let metrics_task = tokio::spawn(async move {
        if let Err(err) = axum::serve(metrics_listener, metrics_app).await {
            tracing::error!(error = %err, "metrics listener stopped");
        }
    });

    let result = run_with_shutdown(config, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await;
    metrics_task.abort();
    let _ = metrics_task.await;
    telemetry.shutdown();
    result
}

async fn run_with_shutdown<F>(config: GatewayConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (state, tokens) = build_state(&config).await?;
    let renew_task = tokens.start_auto_renew(config.token_renew_interval());

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("bind {}", config.bind_addr))?;
    tracing::info!(addr = %listener.local_addr()?, realm = %config.realm, "gateway listening");

    tokio::pin!(shutdown);
    let served = tokio::select! {
        result = axum::serve(listener, app.into_make_service()) => result.map_err(anyhow::Error::from),
        _ = &mut shutdown => Ok(()),
    };

    renew_task.abort();
    let _ = renew_task.await;
    tracing::info!("gateway stopped");
    served
}

async fn build_state(config: &GatewayConfig) -> anyhow::Result<(AppState, Arc<TokenManager>)> {
    let credentials = load_credentials(&config.credentials_path)?;
    let classifier = AffiliationClassifier::new(config.classification_tables()?, &config.realm)
        .context("affiliation realm")?;
    let client = reqwest::Client::builder()
        .timeout(config.upstream_timeout())
        .build()
        .context("build upstream http client")?;

    let tokens = TokenManager::bootstrap(client.clone(), &config.token_url, credentials)
        .await
        .context("acquire initial upstream token")?;
    let source = IdentityClient::new(client, &config.api_base_url, Arc::clone(&tokens));

    let state = AppState {
        aggregator: Arc::new(PersonAggregator::new(Arc::new(source), classifier)),
        tokens: Some(Arc::clone(&tokens)),
    };
    Ok((state, tokens))
}
