//! Configuration for the gateway process.
//!
//! Everything is settable as a CLI flag or an environment variable (flags
//! win). `.env` files are loaded by `main` before parsing.

use clap::Parser;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use url::Url;

use crate::network::Network;

#[derive(Parser, Debug, Clone)]
#[command(name = "stacks-rosetta-rs")]
#[command(about = "Rosetta HTTP gateway for the Stacks blockchain")]
pub struct Config {
    /// Address to bind the HTTP server to.
    #[arg(long, env = "HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    /// Port to bind the HTTP server to.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Chain served by this process; every request's network_identifier
    /// must match.
    #[arg(long, env = "STACKS_NETWORK", value_enum, default_value_t = Network::Testnet)]
    pub network: Network,

    /// Stacks node RPC endpoint (nonce lookup, fee estimation, broadcast).
    #[arg(long, env = "STACKS_NODE_RPC_URL", default_value = "http://127.0.0.1:20443")]
    pub node_rpc_url: Url,

    /// Datastore REST endpoint backing the Data endpoints.
    #[arg(long, env = "STACKS_DATASTORE_URL", default_value = "http://127.0.0.1:3999")]
    pub datastore_url: Url,

    /// Per-request timeout for node and datastore calls, in seconds.
    #[arg(long, env = "UPSTREAM_TIMEOUT_SECS", default_value_t = 10)]
    pub upstream_timeout_secs: u64,
}

impl Config {
    pub fn load() -> Self {
        Config::parse()
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn upstream_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.upstream_timeout_secs)
    }
}
