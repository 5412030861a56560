use std::net::SocketAddr;
use std::process::ExitCode;

use tokio_util::sync::CancellationToken;
use tracing::info;

use astra_lib::gateway::{self, GatewayConfig};
use astra_lib::output::ASTRA_OUTPUT_VERSION;
use astra_lib::{connect_backend, AstraOutput, Config, HealthOutput, RelayOptions};

use crate::pipeline::Invocation;

/// Run the health command through the relay.
pub async fn run_health(invocation: &Invocation) -> ExitCode {
    let config = match Config::load(invocation.config_path.as_deref()) {
        Ok(config) => config,
        Err(err) => return invocation.fail(err),
    };
    let backend_url = invocation
        .backend_url
        .clone()
        .unwrap_or(config.backend_url);
    let options = RelayOptions {
        request_timeout: config.timeouts.request,
        ready_timeout: config.timeouts.ready,
    };
    let relay = match connect_backend(&backend_url, options).await {
        Ok(relay) => relay,
        Err(err) => return invocation.fail(err),
    };
    let response = match relay.health_check().await {
        Ok(response) => response,
        Err(err) => return invocation.fail(err),
    };
    let body = HealthOutput {
        version: ASTRA_OUTPUT_VERSION.to_string(),
        backend_url,
        response,
    };
    invocation.emit(&AstraOutput::Health(body), ExitCode::SUCCESS)
}

/// Run the analysis gateway until the process stops.
pub async fn run_serve(invocation: &Invocation, bind: Option<SocketAddr>) -> ExitCode {
    let mut config = match GatewayConfig::from_env() {
        Ok(config) => config,
        Err(err) => return invocation.fail(err),
    };
    if let Some(addr) = bind {
        config.bind = addr;
    }
    info!(
        bind = %config.bind,
        model = %config.model,
        key_configured = config.api_key.is_some(),
        "starting analysis gateway"
    );
    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
            trigger.cancel();
        }
    });
    match gateway::serve(config, shutdown).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => invocation.fail(err),
    }
}
