//! Read-only projection of the chain datastore for the Data endpoints.
//!
//! The construction flow never touches these; they answer `/network/*`,
//! `/block*`, `/mempool*`, and `/account/balance` from the companion
//! indexer's REST surface. Every adapter read has a `found`/not-found shape
//! (`Option`), which the handlers turn into the retriable lookup errors of
//! the catalog.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::sync::Arc;
use url::Url;

use crate::address::StacksAddress;
use crate::codec::{StacksTransaction, decode_hex};
use crate::error::ApiError;
use crate::network::Network;
use crate::node_client::NodeClient;
use crate::operations::operations_from_transaction;
use crate::types::{
    AccountBalanceMetadata, AccountBalanceRequest, AccountBalanceResponse, Allow, Amount, Block,
    BlockIdentifier, BlockRequest, BlockResponse, BlockTransaction, BlockTransactionRequest,
    BlockTransactionResponse, MempoolRequest, MempoolResponse, MempoolTransactionRequest,
    MempoolTransactionResponse, NetworkListResponse, NetworkOptionsResponse,
    NetworkStatusResponse, OperationStatus, OperationStatusDefinition, OperationType,
    PartialBlockIdentifier, ROSETTA_VERSION, RosettaVersion, TransactionIdentifier,
};

/// Height of the first Stacks block.
const GENESIS_BLOCK_HEIGHT: u64 = 1;

const DEFAULT_MEMPOOL_PAGE: u32 = 20;

/// A block row as stored by the datastore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRow {
    pub height: u64,
    pub hash: String,
    pub parent_hash: String,
    pub timestamp_ms: i64,
    pub tx_ids: Vec<String>,
}

/// A transaction row: where it was mined (if at all) plus the raw bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRow {
    pub tx_id: String,
    pub block_hash: Option<String>,
    pub block_height: Option<u64>,
    pub raw: String,
    pub status: OperationStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceRow {
    pub balance: u128,
}

/// Read-only view of the datastore.
#[async_trait]
pub trait DataAdapter: Send + Sync {
    async fn get_block_by_height(&self, height: u64) -> Result<Option<BlockRow>, ApiError>;
    async fn get_block_by_hash(&self, hash: &str) -> Result<Option<BlockRow>, ApiError>;
    async fn get_current_block(&self) -> Result<Option<BlockRow>, ApiError>;
    async fn get_tx(&self, tx_id: &str) -> Result<Option<TxRow>, ApiError>;
    async fn get_mempool_tx_ids(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<(Vec<String>, u64), ApiError>;
    async fn get_mempool_tx(&self, tx_id: &str) -> Result<Option<TxRow>, ApiError>;
    /// Balance at the given block hash, or at the tip when `None`.
    async fn get_account_balance(
        &self,
        address: &str,
        block_hash: Option<&str>,
    ) -> Result<Option<BalanceRow>, ApiError>;
}

static HASH_64_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(0x)?[0-9a-fA-F]{64}$").expect("invalid hash regex"));

fn is_hash_string(input: &str) -> bool {
    HASH_64_RE.is_match(input)
}

/// The Rosetta-facing Data API, generic over the datastore and node seams.
#[derive(Clone)]
pub struct DataApi {
    network: Network,
    data: Arc<dyn DataAdapter>,
    node: Arc<dyn NodeClient>,
}

impl DataApi {
    pub fn new(network: Network, data: Arc<dyn DataAdapter>, node: Arc<dyn NodeClient>) -> Self {
        DataApi {
            network,
            data,
            node,
        }
    }

    /// `/network/list`: the single chain this process serves.
    pub fn network_list(&self) -> NetworkListResponse {
        NetworkListResponse {
            network_identifiers: vec![self.network.identifier()],
        }
    }

    /// `/network/options`: versions, statuses, types, and the error catalog.
    pub fn network_options(&self) -> NetworkOptionsResponse {
        NetworkOptionsResponse {
            version: RosettaVersion {
                rosetta_version: ROSETTA_VERSION.to_string(),
                node_version: env!("CARGO_PKG_VERSION").to_string(),
                middleware_version: env!("CARGO_PKG_VERSION").to_string(),
            },
            allow: Allow {
                operation_statuses: vec![
                    OperationStatusDefinition {
                        status: OperationStatus::Success,
                        successful: true,
                    },
                    // kept successful=true for wire compatibility with the
                    // original service, even though pending is not terminal
                    OperationStatusDefinition {
                        status: OperationStatus::Pending,
                        successful: true,
                    },
                    OperationStatusDefinition {
                        status: OperationStatus::AbortByResponse,
                        successful: false,
                    },
                    OperationStatusDefinition {
                        status: OperationStatus::AbortByPostCondition,
                        successful: false,
                    },
                ],
                operation_types: OperationType::all().to_vec(),
                errors: ApiError::all_errors(),
                historical_balance_lookup: true,
            },
        }
    }

    /// `/network/status`: tip and genesis identifiers.
    pub async fn network_status(&self) -> Result<NetworkStatusResponse, ApiError> {
        let tip = self
            .data
            .get_current_block()
            .await?
            .ok_or(ApiError::BlockNotFound)?;
        let genesis = self
            .data
            .get_block_by_height(GENESIS_BLOCK_HEIGHT)
            .await?
            .ok_or(ApiError::BlockNotFound)?;
        Ok(NetworkStatusResponse {
            current_block_identifier: block_identifier(&tip),
            current_block_timestamp: tip.timestamp_ms,
            genesis_block_identifier: block_identifier(&genesis),
            peers: Vec::new(),
        })
    }

    async fn resolve_block(
        &self,
        identifier: Option<&PartialBlockIdentifier>,
    ) -> Result<BlockRow, ApiError> {
        let row = match identifier {
            None
            | Some(PartialBlockIdentifier {
                index: None,
                hash: None,
            }) => self.data.get_current_block().await?,
            Some(PartialBlockIdentifier {
                hash: Some(hash), ..
            }) => {
                if !is_hash_string(hash) {
                    return Err(ApiError::InvalidBlockHash);
                }
                self.data.get_block_by_hash(hash).await?
            }
            Some(PartialBlockIdentifier {
                index: Some(height),
                ..
            }) => self.data.get_block_by_height(*height).await?,
        };
        row.ok_or(ApiError::BlockNotFound)
    }

    /// `/block`: a block with its transactions, looked up by index or hash.
    pub async fn block(&self, request: &BlockRequest) -> Result<BlockResponse, ApiError> {
        let row = self.resolve_block(request.block_identifier.as_ref()).await?;
        if let Some(requested_height) = request
            .block_identifier
            .as_ref()
            .and_then(|identifier| identifier.index)
        {
            if requested_height != row.height {
                return Err(ApiError::InvalidBlockIndex);
            }
        }

        let mut transactions = Vec::with_capacity(row.tx_ids.len());
        for tx_id in &row.tx_ids {
            let tx_row = self.data.get_tx(tx_id).await?;
            transactions.push(match tx_row {
                Some(tx_row) => self.render_transaction(&tx_row),
                None => BlockTransaction {
                    transaction_identifier: TransactionIdentifier {
                        hash: tx_id.clone(),
                    },
                    operations: Vec::new(),
                },
            });
        }

        Ok(BlockResponse {
            block: Some(Block {
                block_identifier: block_identifier(&row),
                parent_block_identifier: BlockIdentifier {
                    index: row.height.saturating_sub(1),
                    hash: row.parent_hash.clone(),
                },
                timestamp: row.timestamp_ms,
                transactions,
            }),
        })
    }

    /// `/block/transaction`: one transaction within a known block.
    pub async fn block_transaction(
        &self,
        request: &BlockTransactionRequest,
    ) -> Result<BlockTransactionResponse, ApiError> {
        let block = request
            .block_identifier
            .as_ref()
            .ok_or(ApiError::InvalidBlockIdentifier)?;
        let tx_id = request
            .transaction_identifier
            .as_ref()
            .ok_or(ApiError::InvalidTransactionHash)?;
        if !is_hash_string(&tx_id.hash) {
            return Err(ApiError::InvalidTransactionHash);
        }

        let row = self
            .data
            .get_tx(&tx_id.hash)
            .await?
            .ok_or(ApiError::TransactionNotFound)?;
        if row.block_hash.as_deref() != Some(block.hash.as_str()) {
            return Err(ApiError::TransactionNotFound);
        }
        Ok(BlockTransactionResponse {
            transaction: self.render_transaction(&row),
        })
    }

    /// `/mempool`: a page of pending transaction ids.
    pub async fn mempool(&self, request: &MempoolRequest) -> Result<MempoolResponse, ApiError> {
        let page = request.metadata.clone().unwrap_or_default();
        let limit = page.limit.unwrap_or(DEFAULT_MEMPOOL_PAGE);
        let offset = page.offset.unwrap_or(0);
        let (tx_ids, total) = self.data.get_mempool_tx_ids(limit, offset).await?;
        Ok(MempoolResponse {
            transaction_identifiers: tx_ids
                .into_iter()
                .map(|hash| TransactionIdentifier { hash })
                .collect(),
            metadata: Some(serde_json::json!({ "total": total })),
        })
    }

    /// `/mempool/transaction`: a pending transaction with its operations.
    pub async fn mempool_transaction(
        &self,
        request: &MempoolTransactionRequest,
    ) -> Result<MempoolTransactionResponse, ApiError> {
        let tx_id = request
            .transaction_identifier
            .as_ref()
            .ok_or(ApiError::InvalidTransactionHash)?;
        if !is_hash_string(&tx_id.hash) {
            return Err(ApiError::InvalidTransactionHash);
        }
        let row = self
            .data
            .get_mempool_tx(&tx_id.hash)
            .await?
            .ok_or(ApiError::MempoolTransactionNotFound)?;
        Ok(MempoolTransactionResponse {
            transaction: self.render_transaction(&row),
        })
    }

    /// `/account/balance`: balance at the tip or at a historical block.
    pub async fn account_balance(
        &self,
        request: &AccountBalanceRequest,
    ) -> Result<AccountBalanceResponse, ApiError> {
        let account = request
            .account_identifier
            .as_ref()
            .ok_or(ApiError::EmptyAccountIdentifier)?;
        StacksAddress::parse_for_network(&account.address, self.network)
            .map_err(|_| ApiError::InvalidAccount)?;

        let block = self.resolve_block(request.block_identifier.as_ref()).await?;
        let at_tip = request
            .block_identifier
            .as_ref()
            .is_none_or(|identifier| identifier.index.is_none() && identifier.hash.is_none());
        let block_hash = (!at_tip).then_some(block.hash.as_str());

        let balance = self
            .data
            .get_account_balance(&account.address, block_hash)
            .await?
            .ok_or(ApiError::InvalidAccount)?;

        // sequence number is only meaningful at the tip
        let metadata = if at_tip {
            let account_info = self.node.get_account(&account.address).await?;
            Some(AccountBalanceMetadata {
                sequence_number: account_info.nonce,
            })
        } else {
            None
        };

        Ok(AccountBalanceResponse {
            block_identifier: block_identifier(&block),
            balances: vec![Amount::stx(balance.balance.to_string())],
            metadata,
        })
    }

    /// Projects a stored transaction into Rosetta operations. Rows whose raw
    /// bytes are not a token transfer (or do not parse) are surfaced as
    /// identifiers without operations.
    fn render_transaction(&self, row: &TxRow) -> BlockTransaction {
        let operations = decode_hex(&row.raw)
            .ok()
            .and_then(|bytes| StacksTransaction::deserialize(&bytes).ok())
            .and_then(|tx| {
                operations_from_transaction(&tx, self.network, Some(row.status)).ok()
            })
            .unwrap_or_default();
        BlockTransaction {
            transaction_identifier: TransactionIdentifier {
                hash: row.tx_id.clone(),
            },
            operations,
        }
    }
}

// ---------------------------------------------------------------------------
// HTTP datastore adapter
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ApiBlock {
    height: u64,
    hash: String,
    parent_block_hash: String,
    block_time: i64,
    txs: Vec<String>,
}

impl From<ApiBlock> for BlockRow {
    fn from(block: ApiBlock) -> Self {
        BlockRow {
            height: block.height,
            hash: block.hash,
            parent_hash: block.parent_block_hash,
            timestamp_ms: block.block_time * 1000,
            tx_ids: block.txs,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiBlockList {
    results: Vec<ApiBlock>,
}

#[derive(Debug, Deserialize)]
struct ApiTx {
    tx_id: String,
    tx_status: String,
    #[serde(default)]
    block_hash: Option<String>,
    #[serde(default)]
    block_height: Option<u64>,
    raw_tx: String,
}

impl From<ApiTx> for TxRow {
    fn from(tx: ApiTx) -> Self {
        let status = match tx.tx_status.as_str() {
            "success" => OperationStatus::Success,
            "abort_by_response" => OperationStatus::AbortByResponse,
            "abort_by_post_condition" => OperationStatus::AbortByPostCondition,
            _ => OperationStatus::Pending,
        };
        TxRow {
            tx_id: tx.tx_id,
            block_hash: tx.block_hash,
            block_height: tx.block_height,
            raw: tx.raw_tx,
            status,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiMempoolPage {
    total: u64,
    results: Vec<ApiMempoolEntry>,
}

#[derive(Debug, Deserialize)]
struct ApiMempoolEntry {
    tx_id: String,
}

#[derive(Debug, Deserialize)]
struct ApiStxBalance {
    balance: String,
}

/// Datastore adapter speaking the indexer's REST API.
#[derive(Debug, Clone)]
pub struct HttpDataAdapter {
    base_url: Url,
    client: reqwest::Client,
}

impl HttpDataAdapter {
    pub fn new(base_url: Url, timeout: std::time::Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(HttpDataAdapter { base_url, client })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.as_str().trim_end_matches('/'))
    }

    /// GET returning `Ok(None)` on 404 and a transport error otherwise.
    async fn fetch_optional<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Option<T>, ApiError> {
        let response = self
            .client
            .get(self.endpoint(path))
            .send()
            .await
            .map_err(datastore_error)?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response.error_for_status().map_err(datastore_error)?;
        let value = response.json::<T>().await.map_err(datastore_error)?;
        Ok(Some(value))
    }
}

fn datastore_error(err: reqwest::Error) -> ApiError {
    ApiError::UnknownError {
        message: Some(err.to_string()),
        retriable: err.is_timeout() || err.is_connect(),
    }
}

#[async_trait]
impl DataAdapter for HttpDataAdapter {
    async fn get_block_by_height(&self, height: u64) -> Result<Option<BlockRow>, ApiError> {
        let block: Option<ApiBlock> = self
            .fetch_optional(&format!("/extended/v1/block/by_height/{height}"))
            .await?;
        Ok(block.map(BlockRow::from))
    }

    async fn get_block_by_hash(&self, hash: &str) -> Result<Option<BlockRow>, ApiError> {
        let block: Option<ApiBlock> = self
            .fetch_optional(&format!("/extended/v1/block/{hash}"))
            .await?;
        Ok(block.map(BlockRow::from))
    }

    async fn get_current_block(&self) -> Result<Option<BlockRow>, ApiError> {
        let page: Option<ApiBlockList> = self.fetch_optional("/extended/v1/block?limit=1").await?;
        Ok(page.and_then(|page| page.results.into_iter().next().map(BlockRow::from)))
    }

    async fn get_tx(&self, tx_id: &str) -> Result<Option<TxRow>, ApiError> {
        let tx: Option<ApiTx> = self
            .fetch_optional(&format!("/extended/v1/tx/{tx_id}?include_raw=true"))
            .await?;
        Ok(tx.map(TxRow::from))
    }

    async fn get_mempool_tx_ids(
        &self,
        limit: u32,
        offset: u32,
    ) -> Result<(Vec<String>, u64), ApiError> {
        let page: Option<ApiMempoolPage> = self
            .fetch_optional(&format!(
                "/extended/v1/tx/mempool?limit={limit}&offset={offset}"
            ))
            .await?;
        let page = page.ok_or(ApiError::UnknownError {
            message: Some("datastore returned no mempool page".to_string()),
            retriable: true,
        })?;
        Ok((
            page.results.into_iter().map(|entry| entry.tx_id).collect(),
            page.total,
        ))
    }

    async fn get_mempool_tx(&self, tx_id: &str) -> Result<Option<TxRow>, ApiError> {
        let tx = self.get_tx(tx_id).await?;
        Ok(tx.filter(|row| row.block_hash.is_none()))
    }

    async fn get_account_balance(
        &self,
        address: &str,
        block_hash: Option<&str>,
    ) -> Result<Option<BalanceRow>, ApiError> {
        let path = match block_hash {
            Some(hash) => format!("/extended/v1/address/{address}/stx?until_block={hash}"),
            None => format!("/extended/v1/address/{address}/stx"),
        };
        let balance: Option<ApiStxBalance> = self.fetch_optional(&path).await?;
        match balance {
            Some(balance) => {
                let value: u128 =
                    balance
                        .balance
                        .parse()
                        .map_err(|_| ApiError::UnknownError {
                            message: Some("datastore returned malformed balance".to_string()),
                            retriable: false,
                        })?;
                Ok(Some(BalanceRow { balance: value }))
            }
            None => Ok(None),
        }
    }
}

fn block_identifier(row: &BlockRow) -> BlockIdentifier {
    BlockIdentifier {
        index: row.height,
        hash: row.hash.clone(),
    }
}
