//! Mapping between Rosetta operation lists and the chain's transfer shape.
//!
//! Forward: a balanced debit/credit pair of `token_transfer` operations
//! becomes a [`TransferIntent`]. Reverse: a parsed token-transfer
//! transaction becomes the canonical three-operation list (fee, debit,
//! credit).

use serde_json::json;

use crate::address::StacksAddress;
use crate::codec::{StacksTransaction, TOKEN_TRANSFER_TX_SIZE, TransactionPayload, encode_hex};
use crate::error::ApiError;
use crate::network::Network;
use crate::types::{
    AccountIdentifier, Amount, CoinAction, CoinChange, CoinIdentifier, ConstructionOptions,
    Operation, OperationIdentifier, OperationStatus, OperationType,
};

/// What a balanced operation pair asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferIntent {
    pub sender_address: String,
    pub recipient_address: String,
    pub amount: u64,
}

/// Extracts the transfer intent from exactly one debit and one credit
/// `token_transfer` operation. Any other count, type, sign arrangement, or
/// amount imbalance is an invalid operation list.
pub fn intent_from_operations(operations: &[Operation]) -> Result<TransferIntent, ApiError> {
    if operations.is_empty() {
        return Err(ApiError::EmptyOperations);
    }
    if operations.len() != 2 {
        return Err(ApiError::InvalidOperation);
    }

    let mut debit: Option<(&Operation, i128)> = None;
    let mut credit: Option<(&Operation, i128)> = None;
    for operation in operations {
        if operation.operation_type != OperationType::TokenTransfer {
            return Err(ApiError::InvalidOperation);
        }
        let amount = operation
            .amount
            .as_ref()
            .ok_or(ApiError::InvalidOperation)?;
        if !amount.currency.is_stx() {
            return Err(ApiError::InvalidOperation);
        }
        let value: i128 = amount
            .value
            .parse()
            .map_err(|_| ApiError::InvalidAmount)?;
        let slot = if value < 0 { &mut debit } else { &mut credit };
        if slot.replace((operation, value)).is_some() {
            return Err(ApiError::InvalidOperation);
        }
    }

    let (debit_op, debit_value) = debit.ok_or(ApiError::InvalidOperation)?;
    let (credit_op, credit_value) = credit.ok_or(ApiError::InvalidOperation)?;
    if debit_value.checked_add(credit_value) != Some(0) {
        return Err(ApiError::InvalidOperation);
    }
    let amount = u64::try_from(credit_value).map_err(|_| ApiError::InvalidAmount)?;

    let sender = debit_op
        .account
        .as_ref()
        .ok_or(ApiError::EmptyAccountIdentifier)?;
    let recipient = credit_op
        .account
        .as_ref()
        .ok_or(ApiError::EmptyAccountIdentifier)?;

    Ok(TransferIntent {
        sender_address: sender.address.clone(),
        recipient_address: recipient.address.clone(),
        amount,
    })
}

/// Assembles the preprocess `options` blob: the transfer intent, the fixed
/// size estimate, and the fee knobs passed through from the request.
pub fn options_from_operations(
    intent: &TransferIntent,
    max_fee: Option<&[Amount]>,
    suggested_fee_multiplier: Option<f64>,
    memo: Option<&str>,
) -> Result<ConstructionOptions, ApiError> {
    let max_fee = match max_fee.and_then(|fees| fees.first()) {
        Some(amount) => {
            if !amount.currency.is_stx() {
                return Err(ApiError::InvalidFees);
            }
            let value: u64 = amount.value.parse().map_err(|_| ApiError::InvalidFees)?;
            Some(value.to_string())
        }
        None => None,
    };

    Ok(ConstructionOptions {
        sender_address: Some(intent.sender_address.clone()),
        operation_type: Some(OperationType::TokenTransfer),
        token_transfer_recipient_address: Some(intent.recipient_address.clone()),
        amount: Some(intent.amount.to_string()),
        symbol: Some(crate::types::CURRENCY_SYMBOL.to_string()),
        decimals: Some(crate::types::CURRENCY_DECIMALS),
        max_fee,
        suggested_fee_multiplier,
        size: Some(TOKEN_TRANSFER_TX_SIZE),
        memo: memo.map(str::to_string),
    })
}

/// Renders a parsed token transfer as its canonical operation list:
///
/// * index 0 — `fee` at the sender, negative fee
/// * index 1 — `token_transfer` debit at the sender, spending `txid:1`
/// * index 2 — `token_transfer` credit at the recipient, creating `txid:2`,
///   related to index 1
///
/// `status` is set for mined transactions and absent when rendering parsed,
/// not-yet-broadcast transactions.
pub fn operations_from_transaction(
    tx: &StacksTransaction,
    network: Network,
    status: Option<OperationStatus>,
) -> Result<Vec<Operation>, ApiError> {
    let TransactionPayload::TokenTransfer {
        recipient,
        amount,
        memo,
    } = &tx.payload
    else {
        return Err(ApiError::InvalidTransactionType);
    };

    let sender = StacksAddress {
        version: network.address_version(),
        hash160: tx.auth.signer,
    }
    .encode();
    let recipient = StacksAddress {
        version: recipient.version(),
        hash160: *recipient.hash160(),
    }
    .encode();
    let txid = encode_hex(&tx.txid());
    let memo_metadata = memo.as_text().map(|text| json!({ "memo": text }));

    let fee_operation = Operation {
        operation_identifier: OperationIdentifier::new(0),
        related_operations: None,
        operation_type: OperationType::Fee,
        status,
        account: Some(AccountIdentifier::new(sender.clone())),
        amount: Some(Amount::stx(format!("-{}", tx.auth.fee))),
        coin_change: None,
        metadata: None,
    };
    let debit_operation = Operation {
        operation_identifier: OperationIdentifier::new(1),
        related_operations: None,
        operation_type: OperationType::TokenTransfer,
        status,
        account: Some(AccountIdentifier::new(sender)),
        amount: Some(Amount::stx(format!("-{amount}"))),
        coin_change: Some(CoinChange {
            coin_identifier: CoinIdentifier {
                identifier: format!("{txid}:1"),
            },
            coin_action: CoinAction::CoinSpent,
        }),
        metadata: memo_metadata.clone(),
    };
    let credit_operation = Operation {
        operation_identifier: OperationIdentifier::new(2),
        related_operations: Some(vec![OperationIdentifier::new(1)]),
        operation_type: OperationType::TokenTransfer,
        status,
        account: Some(AccountIdentifier::new(recipient)),
        amount: Some(Amount::stx(amount.to_string())),
        coin_change: Some(CoinChange {
            coin_identifier: CoinIdentifier {
                identifier: format!("{txid}:2"),
            },
            coin_action: CoinAction::CoinCreated,
        }),
        metadata: memo_metadata,
    };

    Ok(vec![fee_operation, debit_operation, credit_operation])
}
