//! HTTP endpoints of the Rosetta gateway.
//!
//! All endpoints are POST under `/rosetta/v1`, take and produce JSON, and
//! run the network guard before any endpoint logic. Failures funnel through
//! [`ApiError`]'s `IntoResponse`, so every error body is a catalog entry.

use axum::extract::{FromRequest, Request, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::instrument;

use crate::construction::ConstructionApi;
use crate::data::DataApi;
use crate::error::ApiError;
use crate::network::Network;
use crate::types::{
    AccountBalanceRequest, BlockRequest, BlockTransactionRequest, ConstructionCombineRequest,
    ConstructionDeriveRequest, ConstructionHashRequest, ConstructionMetadataRequest,
    ConstructionParseRequest, ConstructionPayloadsRequest, ConstructionPreprocessRequest,
    ConstructionSubmitRequest, MempoolRequest, MempoolTransactionRequest, MetadataRequest,
    NetworkRequest,
};

#[derive(Clone)]
pub struct AppState {
    pub network: Network,
    pub construction: Arc<ConstructionApi>,
    pub data: Arc<DataApi>,
}

/// JSON extractor that renders body rejections as catalog errors instead of
/// the framework's default 422. A body whose failure names the
/// `network_identifier` maps to code 613 regardless of endpoint.
pub struct RosettaJson<T>(pub T);

impl<T, S> FromRequest<S> for RosettaJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(RosettaJson(value)),
            Err(rejection) => {
                let message = rejection.body_text();
                if message.contains("network_identifier") {
                    Err(ApiError::EmptyNetworkIdentifier)
                } else {
                    Err(ApiError::InvalidParams {
                        message: Some(message),
                    })
                }
            }
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/rosetta/v1/network/list", post(network_list))
        .route("/rosetta/v1/network/options", post(network_options))
        .route("/rosetta/v1/network/status", post(network_status))
        .route("/rosetta/v1/block", post(block))
        .route("/rosetta/v1/block/transaction", post(block_transaction))
        .route("/rosetta/v1/mempool", post(mempool))
        .route("/rosetta/v1/mempool/transaction", post(mempool_transaction))
        .route("/rosetta/v1/account/balance", post(account_balance))
        .route("/rosetta/v1/construction/derive", post(construction_derive))
        .route(
            "/rosetta/v1/construction/preprocess",
            post(construction_preprocess),
        )
        .route(
            "/rosetta/v1/construction/metadata",
            post(construction_metadata),
        )
        .route(
            "/rosetta/v1/construction/payloads",
            post(construction_payloads),
        )
        .route("/rosetta/v1/construction/parse", post(construction_parse))
        .route(
            "/rosetta/v1/construction/combine",
            post(construction_combine),
        )
        .route("/rosetta/v1/construction/hash", post(construction_hash))
        .route("/rosetta/v1/construction/submit", post(construction_submit))
}

#[instrument(skip_all)]
async fn network_list(
    State(state): State<AppState>,
    RosettaJson(_body): RosettaJson<MetadataRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    Ok(Json(state.data.network_list()))
}

#[instrument(skip_all)]
async fn network_options(
    State(state): State<AppState>,
    RosettaJson(body): RosettaJson<NetworkRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state.network.check(body.network_identifier.as_ref())?;
    Ok(Json(state.data.network_options()))
}

#[instrument(skip_all)]
async fn network_status(
    State(state): State<AppState>,
    RosettaJson(body): RosettaJson<NetworkRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state.network.check(body.network_identifier.as_ref())?;
    Ok(Json(state.data.network_status().await?))
}

#[instrument(skip_all)]
async fn block(
    State(state): State<AppState>,
    RosettaJson(body): RosettaJson<BlockRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state.network.check(body.network_identifier.as_ref())?;
    Ok(Json(state.data.block(&body).await?))
}

#[instrument(skip_all)]
async fn block_transaction(
    State(state): State<AppState>,
    RosettaJson(body): RosettaJson<BlockTransactionRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state.network.check(body.network_identifier.as_ref())?;
    Ok(Json(state.data.block_transaction(&body).await?))
}

#[instrument(skip_all)]
async fn mempool(
    State(state): State<AppState>,
    RosettaJson(body): RosettaJson<MempoolRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state.network.check(body.network_identifier.as_ref())?;
    Ok(Json(state.data.mempool(&body).await?))
}

#[instrument(skip_all)]
async fn mempool_transaction(
    State(state): State<AppState>,
    RosettaJson(body): RosettaJson<MempoolTransactionRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state.network.check(body.network_identifier.as_ref())?;
    Ok(Json(state.data.mempool_transaction(&body).await?))
}

#[instrument(skip_all)]
async fn account_balance(
    State(state): State<AppState>,
    RosettaJson(body): RosettaJson<AccountBalanceRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state.network.check(body.network_identifier.as_ref())?;
    Ok(Json(state.data.account_balance(&body).await?))
}

#[instrument(skip_all)]
async fn construction_derive(
    State(state): State<AppState>,
    RosettaJson(body): RosettaJson<ConstructionDeriveRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state.network.check(body.network_identifier.as_ref())?;
    Ok(Json(state.construction.derive(&body)?))
}

#[instrument(skip_all)]
async fn construction_preprocess(
    State(state): State<AppState>,
    RosettaJson(body): RosettaJson<ConstructionPreprocessRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state.network.check(body.network_identifier.as_ref())?;
    Ok(Json(state.construction.preprocess(&body)?))
}

#[instrument(skip_all)]
async fn construction_metadata(
    State(state): State<AppState>,
    RosettaJson(body): RosettaJson<ConstructionMetadataRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state.network.check(body.network_identifier.as_ref())?;
    Ok(Json(state.construction.metadata(&body).await?))
}

#[instrument(skip_all)]
async fn construction_payloads(
    State(state): State<AppState>,
    RosettaJson(body): RosettaJson<ConstructionPayloadsRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state.network.check(body.network_identifier.as_ref())?;
    Ok(Json(state.construction.payloads(&body)?))
}

#[instrument(skip_all)]
async fn construction_parse(
    State(state): State<AppState>,
    RosettaJson(body): RosettaJson<ConstructionParseRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state.network.check(body.network_identifier.as_ref())?;
    Ok(Json(state.construction.parse(&body)?))
}

#[instrument(skip_all)]
async fn construction_combine(
    State(state): State<AppState>,
    RosettaJson(body): RosettaJson<ConstructionCombineRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state.network.check(body.network_identifier.as_ref())?;
    Ok(Json(state.construction.combine(&body)?))
}

#[instrument(skip_all)]
async fn construction_hash(
    State(state): State<AppState>,
    RosettaJson(body): RosettaJson<ConstructionHashRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state.network.check(body.network_identifier.as_ref())?;
    Ok(Json(
        state
            .construction
            .hash(body.signed_transaction.as_deref())?,
    ))
}

#[instrument(skip_all)]
async fn construction_submit(
    State(state): State<AppState>,
    RosettaJson(body): RosettaJson<ConstructionSubmitRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    state.network.check(body.network_identifier.as_ref())?;
    Ok(Json(state.construction.submit(&body).await?))
}
