//! Rosetta object model and the request/response shapes of every endpoint.
//!
//! These mirror the Rosetta 1.4.6 wire types as external SDKs expect them.
//! `network_identifier` fields are optional on purpose: their absence must
//! surface as the catalog's code 613 (via the network guard) rather than as
//! a framework-level deserialization failure.

use serde::{Deserialize, Serialize};

/// Rosetta specification version implemented by this gateway.
pub const ROSETTA_VERSION: &str = "1.4.6";

/// Ticker of the chain's native token.
pub const CURRENCY_SYMBOL: &str = "STX";

/// Decimal places of the native token (1 STX = 10^6 microSTX).
pub const CURRENCY_DECIMALS: u32 = 6;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkIdentifier {
    pub blockchain: String,
    pub network: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_network_identifier: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockIdentifier {
    pub index: u64,
    pub hash: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialBlockIdentifier {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionIdentifier {
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountIdentifier {
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_account: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl AccountIdentifier {
    pub fn new(address: impl Into<String>) -> Self {
        AccountIdentifier {
            address: address.into(),
            sub_account: None,
            metadata: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    pub symbol: String,
    pub decimals: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Currency {
    pub fn stx() -> Self {
        Currency {
            symbol: CURRENCY_SYMBOL.to_string(),
            decimals: CURRENCY_DECIMALS,
            metadata: None,
        }
    }

    pub fn is_stx(&self) -> bool {
        self.symbol == CURRENCY_SYMBOL && self.decimals == CURRENCY_DECIMALS
    }
}

/// A signed decimal string amount; negative values are debits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    pub value: String,
    pub currency: Currency,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Amount {
    pub fn stx(value: impl Into<String>) -> Self {
        Amount {
            value: value.into(),
            currency: Currency::stx(),
            metadata: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationIdentifier {
    pub index: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_index: Option<i64>,
}

impl OperationIdentifier {
    pub fn new(index: i64) -> Self {
        OperationIdentifier {
            index,
            network_index: None,
        }
    }
}

/// The six transaction shapes the chain distinguishes, as Rosetta operation
/// types. Only token transfers participate in construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    TokenTransfer,
    ContractCall,
    SmartContract,
    Coinbase,
    PoisonMicroblock,
    Fee,
}

impl OperationType {
    pub fn all() -> &'static [OperationType] {
        &[
            OperationType::TokenTransfer,
            OperationType::ContractCall,
            OperationType::SmartContract,
            OperationType::Coinbase,
            OperationType::PoisonMicroblock,
            OperationType::Fee,
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Success,
    Pending,
    AbortByResponse,
    AbortByPostCondition,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoinAction {
    CoinSpent,
    CoinCreated,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinIdentifier {
    pub identifier: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinChange {
    pub coin_identifier: CoinIdentifier,
    pub coin_action: CoinAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub operation_identifier: OperationIdentifier,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub related_operations: Option<Vec<OperationIdentifier>>,
    #[serde(rename = "type")]
    pub operation_type: OperationType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OperationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account: Option<AccountIdentifier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Amount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coin_change: Option<CoinChange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// `curve_type` stays a plain string so unsupported curves reach the
/// handler and map to the catalog's `invalidCurveType` instead of a
/// schema-level rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKey {
    pub hex_bytes: String,
    pub curve_type: String,
}

pub const CURVE_SECP256K1: &str = "secp256k1";

pub const SIGNATURE_TYPE_ECDSA_RECOVERY: &str = "ecdsa_recovery";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_identifier: Option<AccountIdentifier>,
    pub hex_bytes: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub signing_payload: SigningPayload,
    pub public_key: PublicKey,
    pub signature_type: String,
    pub hex_bytes: String,
}

// ---------------------------------------------------------------------------
// Construction endpoints
// ---------------------------------------------------------------------------

/// The options blob `/construction/preprocess` emits and
/// `/construction/metadata` consumes, unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstructionOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_address: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub operation_type: Option<OperationType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_transfer_recipient_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_fee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_fee_multiplier: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

/// Metadata travelling from `/construction/metadata` into
/// `/construction/payloads`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_sequence: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_block_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConstructionDeriveRequest {
    pub network_identifier: Option<NetworkIdentifier>,
    pub public_key: Option<PublicKey>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstructionDeriveResponse {
    pub account_identifier: AccountIdentifier,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConstructionPreprocessRequest {
    pub network_identifier: Option<NetworkIdentifier>,
    pub operations: Option<Vec<Operation>>,
    #[serde(default)]
    pub metadata: Option<TransactionMetadata>,
    #[serde(default)]
    pub max_fee: Option<Vec<Amount>>,
    #[serde(default)]
    pub suggested_fee_multiplier: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstructionPreprocessResponse {
    pub options: ConstructionOptions,
    pub required_public_keys: Vec<AccountIdentifier>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConstructionMetadataRequest {
    pub network_identifier: Option<NetworkIdentifier>,
    pub options: Option<ConstructionOptions>,
    #[serde(default)]
    pub public_keys: Option<Vec<PublicKey>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstructionMetadataResponse {
    pub metadata: TransactionMetadata,
    pub suggested_fee: Vec<Amount>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConstructionPayloadsRequest {
    pub network_identifier: Option<NetworkIdentifier>,
    pub operations: Option<Vec<Operation>>,
    #[serde(default)]
    pub metadata: Option<TransactionMetadata>,
    #[serde(default)]
    pub public_keys: Option<Vec<PublicKey>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstructionPayloadsResponse {
    pub unsigned_transaction: String,
    pub payloads: Vec<SigningPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConstructionParseRequest {
    pub network_identifier: Option<NetworkIdentifier>,
    #[serde(default)]
    pub signed: Option<bool>,
    pub transaction: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstructionParseResponse {
    pub operations: Vec<Operation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_identifier_signers: Option<Vec<AccountIdentifier>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConstructionCombineRequest {
    pub network_identifier: Option<NetworkIdentifier>,
    pub unsigned_transaction: Option<String>,
    pub signatures: Option<Vec<Signature>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstructionCombineResponse {
    pub signed_transaction: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConstructionHashRequest {
    pub network_identifier: Option<NetworkIdentifier>,
    pub signed_transaction: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConstructionSubmitRequest {
    pub network_identifier: Option<NetworkIdentifier>,
    pub signed_transaction: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionIdentifierResponse {
    pub transaction_identifier: TransactionIdentifier,
}

// ---------------------------------------------------------------------------
// Data endpoints
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct MetadataRequest {
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkListResponse {
    pub network_identifiers: Vec<NetworkIdentifier>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NetworkRequest {
    pub network_identifier: Option<NetworkIdentifier>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosettaVersion {
    pub rosetta_version: String,
    pub node_version: String,
    pub middleware_version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationStatusDefinition {
    pub status: OperationStatus,
    pub successful: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Allow {
    pub operation_statuses: Vec<OperationStatusDefinition>,
    pub operation_types: Vec<OperationType>,
    pub errors: Vec<crate::error::ErrorResponse>,
    pub historical_balance_lookup: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkOptionsResponse {
    pub version: RosettaVersion,
    pub allow: Allow,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkStatusResponse {
    pub current_block_identifier: BlockIdentifier,
    pub current_block_timestamp: i64,
    pub genesis_block_identifier: BlockIdentifier,
    pub peers: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockRequest {
    pub network_identifier: Option<NetworkIdentifier>,
    pub block_identifier: Option<PartialBlockIdentifier>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockTransaction {
    pub transaction_identifier: TransactionIdentifier,
    pub operations: Vec<Operation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    pub block_identifier: BlockIdentifier,
    pub parent_block_identifier: BlockIdentifier,
    pub timestamp: i64,
    pub transactions: Vec<BlockTransaction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block: Option<Block>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockTransactionRequest {
    pub network_identifier: Option<NetworkIdentifier>,
    pub block_identifier: Option<BlockIdentifier>,
    pub transaction_identifier: Option<TransactionIdentifier>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockTransactionResponse {
    pub transaction: BlockTransaction,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MempoolPage {
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MempoolRequest {
    pub network_identifier: Option<NetworkIdentifier>,
    #[serde(default)]
    pub metadata: Option<MempoolPage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MempoolResponse {
    pub transaction_identifiers: Vec<TransactionIdentifier>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MempoolTransactionRequest {
    pub network_identifier: Option<NetworkIdentifier>,
    pub transaction_identifier: Option<TransactionIdentifier>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MempoolTransactionResponse {
    pub transaction: BlockTransaction,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountBalanceRequest {
    pub network_identifier: Option<NetworkIdentifier>,
    pub account_identifier: Option<AccountIdentifier>,
    #[serde(default)]
    pub block_identifier: Option<PartialBlockIdentifier>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountBalanceMetadata {
    pub sequence_number: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountBalanceResponse {
    pub block_identifier: BlockIdentifier,
    pub balances: Vec<Amount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<AccountBalanceMetadata>,
}
