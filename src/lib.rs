//! Rosetta API gateway for the Stacks blockchain.
//!
//! This crate exposes the [Rosetta](https://docs.cdp.coinbase.com/mesh/docs)
//! Data and Construction interfaces for a Stacks chain over HTTP. External
//! indexers, wallets, and exchanges use it to read on-chain state and to
//! build, sign, and broadcast token transfers through the stateless
//! construction flow (derive → preprocess → metadata → payloads → combine →
//! hash → submit).
//!
//! # Modules
//!
//! - [`address`] — c32check address codec and key → address derivation.
//! - [`codec`] — transaction wire format, txid/pre-sign hashing, and
//!   recoverable ECDSA verification.
//! - [`operations`] — mapping between Rosetta operation lists and transfer
//!   intents, in both directions.
//! - [`construction`] — the eight construction endpoints.
//! - [`data`] — datastore adapter and the Data endpoints.
//! - [`node_client`] — the upstream Stacks node RPC seam.
//! - [`network`] — chain parameters and the per-request network guard.
//! - [`error`] — the fixed error catalog every failure renders through.
//! - [`types`] — Rosetta request/response shapes.
//! - [`handlers`] — the axum router wiring it all under `/rosetta/v1`.
//! - [`config`], [`telemetry`], [`shutdown`] — process plumbing.

pub mod address;
pub mod codec;
pub mod config;
pub mod construction;
pub mod data;
pub mod error;
pub mod handlers;
pub mod network;
pub mod node_client;
pub mod operations;
pub mod shutdown;
pub mod telemetry;
pub mod types;
