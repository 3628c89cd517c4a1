//! Rosetta gateway HTTP entrypoint.
//!
//! Boots the axum server with the construction and data services wired to
//! the configured Stacks node and datastore.
//!
//! Environment:
//! - `.env` values loaded at startup
//! - `HOST`, `PORT` control the bind address
//! - `STACKS_NETWORK` picks mainnet/testnet
//! - `STACKS_NODE_RPC_URL`, `STACKS_DATASTORE_URL` point at the upstreams

use axum::http::Method;
use dotenvy::dotenv;
use std::sync::Arc;
use tower_http::cors;
use tower_http::trace::TraceLayer;

use stacks_rosetta_rs::config::Config;
use stacks_rosetta_rs::construction::ConstructionApi;
use stacks_rosetta_rs::data::{DataApi, HttpDataAdapter};
use stacks_rosetta_rs::handlers::{self, AppState};
use stacks_rosetta_rs::node_client::HttpNodeClient;
use stacks_rosetta_rs::{shutdown, telemetry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    telemetry::init();

    let config = Config::load();
    tracing::info!(network = %config.network, "configured chain");

    let node = Arc::new(HttpNodeClient::new(
        config.node_rpc_url.clone(),
        config.upstream_timeout(),
    )?);
    let datastore = Arc::new(HttpDataAdapter::new(
        config.datastore_url.clone(),
        config.upstream_timeout(),
    )?);

    let state = AppState {
        network: config.network,
        construction: Arc::new(ConstructionApi::new(config.network, node.clone())),
        data: Arc::new(DataApi::new(config.network, datastore, node)),
    };

    let app = handlers::routes()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            cors::CorsLayer::new()
                .allow_origin(cors::Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers(cors::Any),
        );

    let addr = config.socket_addr();
    tracing::info!("starting server at http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let shutdown_token = shutdown::signal_token()?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown_token.cancelled().await })
        .await?;

    Ok(())
}
