//! The fixed Rosetta error catalog and its single JSON rendering.
//!
//! Every failure an endpoint can produce is one of the kinds below, with a
//! stable `{code, message, retriable}` triple taken from one static table.
//! Handlers never emit unstructured error strings; upstream diagnostics
//! travel in the optional `details` map.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::address::AddressError;
use crate::codec::CodecError;

/// Wire shape of every error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: u32,
    pub message: String,
    pub retriable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<BTreeMap<String, String>>,
}

/// One row of the static catalog.
struct CatalogEntry {
    code: u32,
    message: &'static str,
    retriable: bool,
}

const fn entry(code: u32, message: &'static str, retriable: bool) -> CatalogEntry {
    CatalogEntry {
        code,
        message,
        retriable,
    }
}

/// The full catalog, dense over 601–639. Codes are frozen; clients match on
/// them. 638 historically covered both `signatureTypeNotSupported` and
/// `missingTransactionSize`; the latter now has its own code 639.
const CATALOG: &[CatalogEntry] = &[
    entry(601, "Invalid account.", false),
    entry(602, "Insufficient funds.", false),
    entry(603, "Account is empty.", false),
    entry(604, "Invalid block index.", false),
    entry(605, "Block not found.", true),
    entry(606, "Invalid block hash.", false),
    entry(607, "Transaction not found.", true),
    entry(608, "Invalid transaction hash.", false),
    entry(609, "Invalid params.", false),
    entry(610, "Invalid network.", false),
    entry(611, "Invalid blockchain.", false),
    entry(612, "Unknown error.", false),
    entry(613, "Network identifier object is null.", false),
    entry(614, "Account identifier object is null.", false),
    entry(615, "Block identifier is null.", false),
    entry(616, "Blockchain name is null.", false),
    entry(617, "Network name is null.", false),
    entry(618, "Invalid public key.", false),
    entry(619, "Invalid curve type.", false),
    entry(620, "Invalid amount.", false),
    entry(621, "Invalid fees.", false),
    entry(622, "Invalid intention.", false),
    entry(623, "Invalid fee.", false),
    entry(624, "Invalid sender address.", false),
    entry(625, "Invalid recipient address.", false),
    entry(626, "Invalid transaction type.", false),
    entry(627, "Invalid operation.", false),
    entry(628, "Invalid transaction string.", false),
    entry(629, "Transaction is not signed.", false),
    entry(630, "Public key not provided.", false),
    entry(631, "Need exactly one public key.", false),
    entry(632, "Transaction not found in the mempool.", true),
    entry(633, "Operations not provided.", false),
    entry(634, "Invalid signature.", false),
    entry(635, "Signature could not be verified.", false),
    entry(636, "Invalid memo.", false),
    entry(637, "Need only one signature.", false),
    entry(638, "Signature type is not supported.", false),
    entry(639, "Transaction size is missing.", false),
];

/// Every failure the API can report, keyed into [`CATALOG`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("invalid account")]
    InvalidAccount,
    #[error("insufficient funds")]
    InsufficientFunds,
    #[error("account is empty")]
    AccountEmpty,
    #[error("invalid block index")]
    InvalidBlockIndex,
    #[error("block not found")]
    BlockNotFound,
    #[error("invalid block hash")]
    InvalidBlockHash,
    #[error("transaction not found")]
    TransactionNotFound,
    #[error("invalid transaction hash")]
    InvalidTransactionHash,
    #[error("invalid params: {message:?}")]
    InvalidParams { message: Option<String> },
    #[error("invalid network")]
    InvalidNetwork,
    #[error("invalid blockchain")]
    InvalidBlockchain,
    #[error("unknown error: {message:?}")]
    UnknownError {
        message: Option<String>,
        retriable: bool,
    },
    #[error("network identifier missing")]
    EmptyNetworkIdentifier,
    #[error("account identifier missing")]
    EmptyAccountIdentifier,
    #[error("block identifier missing")]
    InvalidBlockIdentifier,
    #[error("blockchain name missing")]
    EmptyBlockchain,
    #[error("network name missing")]
    EmptyNetwork,
    #[error("invalid public key")]
    InvalidPublicKey,
    #[error("invalid curve type")]
    InvalidCurveType,
    #[error("invalid amount")]
    InvalidAmount,
    #[error("invalid fees")]
    InvalidFees,
    #[error("invalid intention")]
    InvalidIntention,
    #[error("invalid fee")]
    InvalidFee,
    #[error("invalid sender address")]
    InvalidSender,
    #[error("invalid recipient address")]
    InvalidRecipient,
    #[error("invalid transaction type")]
    InvalidTransactionType,
    #[error("invalid operation")]
    InvalidOperation,
    #[error("invalid transaction string: {message:?}")]
    InvalidTransactionString { message: Option<String> },
    #[error("transaction is not signed")]
    TransactionNotSigned,
    #[error("public key not provided")]
    EmptyPublicKey,
    #[error("need exactly one public key")]
    NeedOnePublicKey,
    #[error("transaction not found in the mempool")]
    MempoolTransactionNotFound,
    #[error("operations not provided")]
    EmptyOperations,
    #[error("invalid signature")]
    InvalidSignature,
    #[error("signature could not be verified")]
    SignatureNotVerified,
    #[error("invalid memo")]
    InvalidMemo,
    #[error("need only one signature")]
    NeedOnlyOneSignature,
    #[error("signature type is not supported")]
    SignatureTypeNotSupported,
    #[error("transaction size is missing")]
    MissingTransactionSize,
}

impl ApiError {
    fn catalog_index(&self) -> usize {
        match self {
            ApiError::InvalidAccount => 0,
            ApiError::InsufficientFunds => 1,
            ApiError::AccountEmpty => 2,
            ApiError::InvalidBlockIndex => 3,
            ApiError::BlockNotFound => 4,
            ApiError::InvalidBlockHash => 5,
            ApiError::TransactionNotFound => 6,
            ApiError::InvalidTransactionHash => 7,
            ApiError::InvalidParams { .. } => 8,
            ApiError::InvalidNetwork => 9,
            ApiError::InvalidBlockchain => 10,
            ApiError::UnknownError { .. } => 11,
            ApiError::EmptyNetworkIdentifier => 12,
            ApiError::EmptyAccountIdentifier => 13,
            ApiError::InvalidBlockIdentifier => 14,
            ApiError::EmptyBlockchain => 15,
            ApiError::EmptyNetwork => 16,
            ApiError::InvalidPublicKey => 17,
            ApiError::InvalidCurveType => 18,
            ApiError::InvalidAmount => 19,
            ApiError::InvalidFees => 20,
            ApiError::InvalidIntention => 21,
            ApiError::InvalidFee => 22,
            ApiError::InvalidSender => 23,
            ApiError::InvalidRecipient => 24,
            ApiError::InvalidTransactionType => 25,
            ApiError::InvalidOperation => 26,
            ApiError::InvalidTransactionString { .. } => 27,
            ApiError::TransactionNotSigned => 28,
            ApiError::EmptyPublicKey => 29,
            ApiError::NeedOnePublicKey => 30,
            ApiError::MempoolTransactionNotFound => 31,
            ApiError::EmptyOperations => 32,
            ApiError::InvalidSignature => 33,
            ApiError::SignatureNotVerified => 34,
            ApiError::InvalidMemo => 35,
            ApiError::NeedOnlyOneSignature => 36,
            ApiError::SignatureTypeNotSupported => 37,
            ApiError::MissingTransactionSize => 38,
        }
    }

    pub fn code(&self) -> u32 {
        CATALOG[self.catalog_index()].code
    }

    pub fn retriable(&self) -> bool {
        match self {
            // node timeouts report retriable even though the catalog
            // default for code 612 is not
            ApiError::UnknownError { retriable, .. } => *retriable,
            other => CATALOG[other.catalog_index()].retriable,
        }
    }

    fn details(&self) -> Option<BTreeMap<String, String>> {
        let message = match self {
            ApiError::InvalidParams { message }
            | ApiError::UnknownError { message, .. }
            | ApiError::InvalidTransactionString { message } => message.clone()?,
            _ => return None,
        };
        Some(BTreeMap::from([("message".to_string(), message)]))
    }

    pub fn to_response(&self) -> ErrorResponse {
        let entry = &CATALOG[self.catalog_index()];
        ErrorResponse {
            code: entry.code,
            message: entry.message.to_string(),
            retriable: self.retriable(),
            details: self.details(),
        }
    }

    /// Classifies the text of a node-side broadcast rejection (spec'd
    /// pattern matching: rejections map to a transaction error, fund
    /// shortfalls to their own code, the rest stays opaque).
    pub fn from_node_rejection(text: String) -> ApiError {
        let lowered = text.to_ascii_lowercase();
        if lowered.contains("notenoughfunds") || lowered.contains("insufficient funds") {
            ApiError::InsufficientFunds
        } else if lowered.contains("rejected")
            || lowered.contains("badnonce")
            || lowered.contains("conflictingnonceinmempool")
            || lowered.contains("deserial")
        {
            ApiError::InvalidTransactionString {
                message: Some(text),
            }
        } else {
            ApiError::UnknownError {
                message: Some(text),
                retriable: false,
            }
        }
    }

    /// The catalog rows advertised by `/network/options`.
    pub fn all_errors() -> Vec<ErrorResponse> {
        CATALOG
            .iter()
            .map(|entry| ErrorResponse {
                code: entry.code,
                message: entry.message.to_string(),
                retriable: entry.retriable,
                details: None,
            })
            .collect()
    }
}

impl From<CodecError> for ApiError {
    fn from(err: CodecError) -> Self {
        ApiError::InvalidTransactionString {
            message: Some(err.to_string()),
        }
    }
}

impl From<AddressError> for ApiError {
    fn from(_: AddressError) -> Self {
        ApiError::InvalidAccount
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::UnknownError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        };
        (status, Json(self.to_response())).into_response()
    }
}
