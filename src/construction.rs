//! The stateless construction flow: derive → preprocess → metadata →
//! payloads → (external signing) → combine → hash → submit.
//!
//! Every step is a pure function of its request; only `metadata` and
//! `submit` reach out to the node. The steps must agree byte-for-byte on
//! serialization and hashing, so they all go through [`crate::codec`].

use std::sync::Arc;
use tracing::instrument;

use crate::address::StacksAddress;
use crate::codec::{
    self, Principal, StacksTransaction, TokenTransferMemo, encode_hex, signature_candidates,
    verify_signature,
};
use crate::error::ApiError;
use crate::network::Network;
use crate::node_client::NodeClient;
use crate::operations::{intent_from_operations, operations_from_transaction,
    options_from_operations};
use crate::types::{
    AccountIdentifier, Amount, ConstructionCombineRequest, ConstructionCombineResponse,
    ConstructionDeriveRequest, ConstructionDeriveResponse, ConstructionMetadataRequest,
    ConstructionMetadataResponse, ConstructionParseRequest, ConstructionParseResponse,
    ConstructionPayloadsRequest, ConstructionPayloadsResponse, ConstructionPreprocessRequest,
    ConstructionPreprocessResponse, ConstructionSubmitRequest, CURVE_SECP256K1, OperationType,
    PublicKey, SIGNATURE_TYPE_ECDSA_RECOVERY, SigningPayload, TransactionIdentifier,
    TransactionIdentifierResponse, TransactionMetadata,
};

#[derive(Clone)]
pub struct ConstructionApi {
    network: Network,
    node: Arc<dyn NodeClient>,
}

impl ConstructionApi {
    pub fn new(network: Network, node: Arc<dyn NodeClient>) -> Self {
        ConstructionApi { network, node }
    }

    /// `/construction/derive`: public key → account address.
    #[instrument(skip_all)]
    pub fn derive(
        &self,
        request: &ConstructionDeriveRequest,
    ) -> Result<ConstructionDeriveResponse, ApiError> {
        let public_key = request
            .public_key
            .as_ref()
            .ok_or(ApiError::EmptyPublicKey)?;
        let key_bytes = validated_public_key(public_key)?;
        let address = StacksAddress::from_public_key(self.network, &key_bytes);
        Ok(ConstructionDeriveResponse {
            account_identifier: AccountIdentifier::new(address.encode()),
        })
    }

    /// `/construction/preprocess`: operations → the options blob `metadata`
    /// needs, plus the key the wallet must supply.
    #[instrument(skip_all)]
    pub fn preprocess(
        &self,
        request: &ConstructionPreprocessRequest,
    ) -> Result<ConstructionPreprocessResponse, ApiError> {
        let operations = request.operations.as_deref().unwrap_or_default();
        let intent = intent_from_operations(operations)?;
        let memo = request
            .metadata
            .as_ref()
            .and_then(|metadata| metadata.memo.as_deref());
        let options = options_from_operations(
            &intent,
            request.max_fee.as_deref(),
            request.suggested_fee_multiplier,
            memo,
        )?;
        Ok(ConstructionPreprocessResponse {
            options,
            required_public_keys: vec![AccountIdentifier::new(intent.sender_address)],
        })
    }

    /// `/construction/metadata`: resolves the account nonce, the chain tip,
    /// and a suggested fee from the node.
    #[instrument(skip_all)]
    pub async fn metadata(
        &self,
        request: &ConstructionMetadataRequest,
    ) -> Result<ConstructionMetadataResponse, ApiError> {
        let options = request.options.as_ref().ok_or(ApiError::InvalidParams {
            message: Some("should have required property 'options'".to_string()),
        })?;
        if options.operation_type != Some(OperationType::TokenTransfer) {
            return Err(ApiError::InvalidTransactionType);
        }

        let sender = options
            .sender_address
            .as_deref()
            .ok_or(ApiError::InvalidSender)?;
        StacksAddress::parse_for_network(sender, self.network)
            .map_err(|_| ApiError::InvalidSender)?;
        let recipient = options
            .token_transfer_recipient_address
            .as_deref()
            .ok_or(ApiError::InvalidRecipient)?;
        StacksAddress::parse_for_network(recipient, self.network)
            .map_err(|_| ApiError::InvalidRecipient)?;

        if let Some(public_key) = request.public_keys.as_deref().and_then(<[_]>::first) {
            let key_bytes = validated_public_key(public_key)?;
            let derived = StacksAddress::from_public_key(self.network, &key_bytes);
            if derived.encode() != sender {
                return Err(ApiError::InvalidPublicKey);
            }
        }

        let size = options.size.ok_or(ApiError::MissingTransactionSize)?;

        let account = self.node.get_account(sender).await?;
        let fee_rate = self.node.get_fee_rate().await?;
        let info = self.node.get_info().await?;

        let fee = suggested_fee(fee_rate, size, options.suggested_fee_multiplier);
        let fee = match options.max_fee.as_deref() {
            Some(max_fee) => {
                let cap: u64 = max_fee.parse().map_err(|_| ApiError::InvalidFees)?;
                fee.min(cap)
            }
            None => fee,
        };

        Ok(ConstructionMetadataResponse {
            metadata: TransactionMetadata {
                fee: Some(fee.to_string()),
                nonce: None,
                account_sequence: Some(account.nonce),
                recent_block_hash: Some(info.stacks_tip),
                memo: options.memo.clone(),
            },
            suggested_fee: vec![Amount::stx(fee.to_string())],
        })
    }

    /// `/construction/payloads`: builds the unsigned transaction and the
    /// pre-sign digest the wallet must sign.
    #[instrument(skip_all)]
    pub fn payloads(
        &self,
        request: &ConstructionPayloadsRequest,
    ) -> Result<ConstructionPayloadsResponse, ApiError> {
        let operations = request.operations.as_deref().unwrap_or_default();
        let intent = intent_from_operations(operations)?;

        let public_key = match request.public_keys.as_deref() {
            None | Some([]) => return Err(ApiError::EmptyPublicKey),
            Some([public_key]) => public_key,
            Some(_) => return Err(ApiError::NeedOnePublicKey),
        };
        let key_bytes = validated_public_key(public_key)?;
        let derived = StacksAddress::from_public_key(self.network, &key_bytes);
        if derived.encode() != intent.sender_address {
            return Err(ApiError::InvalidPublicKey);
        }

        let sender = StacksAddress::parse_for_network(&intent.sender_address, self.network)
            .map_err(|_| ApiError::InvalidSender)?;
        let recipient = StacksAddress::parse_for_network(&intent.recipient_address, self.network)
            .map_err(|_| ApiError::InvalidRecipient)?;

        let metadata = request.metadata.as_ref().ok_or(ApiError::InvalidFee)?;
        let fee: u64 = metadata
            .fee
            .as_deref()
            .ok_or(ApiError::InvalidFee)?
            .parse()
            .map_err(|_| ApiError::InvalidFee)?;
        let nonce = metadata
            .nonce
            .or(metadata.account_sequence)
            .unwrap_or_default();
        let memo = match metadata.memo.as_deref() {
            Some(text) => {
                TokenTransferMemo::from_text(text).map_err(|_| ApiError::InvalidMemo)?
            }
            None => TokenTransferMemo::empty(),
        };

        let tx = StacksTransaction::token_transfer(
            self.network,
            sender.hash160,
            nonce,
            fee,
            Principal::standard(recipient.version, recipient.hash160),
            intent.amount,
            memo,
        );

        Ok(ConstructionPayloadsResponse {
            unsigned_transaction: encode_hex(&tx.serialize()),
            payloads: vec![SigningPayload {
                address: Some(intent.sender_address.clone()),
                account_identifier: Some(AccountIdentifier::new(intent.sender_address)),
                hex_bytes: encode_hex(&tx.presign_hash()),
                signature_type: Some(SIGNATURE_TYPE_ECDSA_RECOVERY.to_string()),
            }],
        })
    }

    /// `/construction/parse`: transaction bytes → operations (and, for
    /// signed transactions, the recovered signer).
    #[instrument(skip_all)]
    pub fn parse(
        &self,
        request: &ConstructionParseRequest,
    ) -> Result<ConstructionParseResponse, ApiError> {
        let transaction = request
            .transaction
            .as_deref()
            .ok_or(ApiError::InvalidTransactionString { message: None })?;
        let tx = StacksTransaction::deserialize(&codec::decode_hex(transaction)?)?;

        let signers = if request.signed.unwrap_or(false) {
            if !tx.is_signed() {
                return Err(ApiError::TransactionNotSigned);
            }
            let recovered = tx.verify_origin()?;
            let signer = StacksAddress::from_public_key(self.network, &recovered);
            Some(vec![AccountIdentifier::new(signer.encode())])
        } else {
            None
        };

        Ok(ConstructionParseResponse {
            operations: operations_from_transaction(&tx, self.network, None)?,
            account_identifier_signers: signers,
        })
    }

    /// `/construction/combine`: injects a wallet signature into the
    /// unsigned transaction after verifying it against the claimed key.
    #[instrument(skip_all)]
    pub fn combine(
        &self,
        request: &ConstructionCombineRequest,
    ) -> Result<ConstructionCombineResponse, ApiError> {
        let unsigned = request
            .unsigned_transaction
            .as_deref()
            .ok_or(ApiError::InvalidTransactionString { message: None })?;
        let mut tx = StacksTransaction::deserialize(&codec::decode_hex(unsigned)?)?;

        let signature = match request.signatures.as_deref() {
            Some([signature]) => signature,
            _ => return Err(ApiError::NeedOnlyOneSignature),
        };
        if signature.signature_type != SIGNATURE_TYPE_ECDSA_RECOVERY {
            return Err(ApiError::SignatureTypeNotSupported);
        }
        let signature_bytes: [u8; 65] = codec::decode_hex(&signature.hex_bytes)
            .map_err(|_| ApiError::InvalidSignature)?
            .try_into()
            .map_err(|_| ApiError::InvalidSignature)?;
        let claimed_key = validated_public_key(&signature.public_key)?;

        // The wallet may have produced [r ‖ s ‖ recovery]; try every
        // plausible wire-order reading against the pre-sign digest instead
        // of guessing.
        let digest = tx.presign_hash();
        let verified = signature_candidates(&signature_bytes)
            .into_iter()
            .find(|candidate| verify_signature(&digest, candidate, &claimed_key))
            .ok_or(ApiError::SignatureNotVerified)?;

        tx.set_signature(verified);
        Ok(ConstructionCombineResponse {
            signed_transaction: encode_hex(&tx.serialize()),
        })
    }

    /// `/construction/hash`: txid of a signed transaction.
    #[instrument(skip_all)]
    pub fn hash(
        &self,
        signed_transaction: Option<&str>,
    ) -> Result<TransactionIdentifierResponse, ApiError> {
        let tx = decode_signed_transaction(signed_transaction)?;
        Ok(TransactionIdentifierResponse {
            transaction_identifier: TransactionIdentifier {
                hash: encode_hex(&tx.txid()),
            },
        })
    }

    /// `/construction/submit`: broadcasts a signed transaction through the
    /// node and echoes the assigned txid.
    #[instrument(skip_all)]
    pub async fn submit(
        &self,
        request: &ConstructionSubmitRequest,
    ) -> Result<TransactionIdentifierResponse, ApiError> {
        let tx = decode_signed_transaction(request.signed_transaction.as_deref())?;
        let txid = self.node.broadcast(&tx.serialize()).await?;
        Ok(TransactionIdentifierResponse {
            transaction_identifier: TransactionIdentifier { hash: txid },
        })
    }
}

fn decode_signed_transaction(hex_input: Option<&str>) -> Result<StacksTransaction, ApiError> {
    let hex_input = hex_input.ok_or(ApiError::InvalidTransactionString { message: None })?;
    let tx = StacksTransaction::deserialize(&codec::decode_hex(hex_input)?)?;
    if !tx.is_signed() {
        return Err(ApiError::TransactionNotSigned);
    }
    Ok(tx)
}

fn validated_public_key(public_key: &PublicKey) -> Result<[u8; 33], ApiError> {
    if public_key.curve_type != CURVE_SECP256K1 {
        return Err(ApiError::InvalidCurveType);
    }
    let bytes = codec::decode_hex(&public_key.hex_bytes).map_err(|_| ApiError::InvalidPublicKey)?;
    codec::parse_public_key(&bytes).map_err(|_| ApiError::InvalidPublicKey)
}

/// `fee_rate × size × max(1, multiplier)`, rounded up. The multiplier is a
/// rational ≥ 1; sub-unit inputs do not discount the fee.
fn suggested_fee(fee_rate: u64, size: u64, multiplier: Option<f64>) -> u64 {
    let multiplier = multiplier.unwrap_or(1.0).max(1.0);
    ((fee_rate * size) as f64 * multiplier).ceil() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::node_client::{AccountInfo, NodeInfo};
    use crate::types::{NetworkIdentifier, Operation, OperationIdentifier, Signature};

    const SENDER: &str = "ST34786BDYFQQHPMYT3740NF8B0PJNPFEPMH16KHR";
    const SENDER_PUBKEY: &str =
        "0380eb9d7075c83fd37c8a61dc24a130297a4c723ecf85690f1aaa7f129d72b00b";
    const RECIPIENT: &str = "STDE7Y8HV3RX8VBM2TZVWJTS7ZA1XB0SSC3NEVH0";

    const UNSIGNED_HEX: &str = "0x80800000000400c874196df3ef78da9ed0ce4055e8582d2ad9eeb5000000000000000300000000000000b400000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000003020000000000051a1ae3f911d8f1d46d7416bfbe4b593fd41eac19cb000000000007a12000000000000000000000000000000000000000000000000000000000000000000000";
    const PRESIGN_HEX: &str =
        "0xb8af45db5e2b8895b3d5a67a3e83b8bc80a89921bd238f9ff111feab35f62d4a";
    // wallet ordering [r ‖ s ‖ recovery]
    const SIGNATURE_RSV_HEX: &str = "0xc02999fbb15278cb9ba128fba41ba13971aae960068ef28f78c5e88269e995d73b6f1478798d73534c64888c09f13795b0f0000c9bb38ae20335c9cfc4a0025400";
    const SIGNED_HEX: &str = "0x80800000000400c874196df3ef78da9ed0ce4055e8582d2ad9eeb5000000000000000300000000000000b40000c02999fbb15278cb9ba128fba41ba13971aae960068ef28f78c5e88269e995d73b6f1478798d73534c64888c09f13795b0f0000c9bb38ae20335c9cfc4a0025403020000000000051a1ae3f911d8f1d46d7416bfbe4b593fd41eac19cb000000000007a12000000000000000000000000000000000000000000000000000000000000000000000";
    const SIGNED_TXID: &str =
        "0x0b98f0fd42eecc13823a7c7fd136a4c61aebc67024ba9a79af6a6d642b30d1c2";

    struct StubNode;

    #[async_trait]
    impl NodeClient for StubNode {
        async fn get_account(&self, _address: &str) -> Result<AccountInfo, ApiError> {
            Ok(AccountInfo {
                nonce: 3,
                balance: 100_000_000,
            })
        }

        async fn get_fee_rate(&self) -> Result<u64, ApiError> {
            Ok(10)
        }

        async fn get_info(&self) -> Result<NodeInfo, ApiError> {
            Ok(NodeInfo {
                stacks_tip: "6d1bd93f84cd3b1e4c56a1c4a5b1f2b3d4e5f60718293a4b5c6d7e8f90a1b2c3".to_string(),
                stacks_tip_height: 100,
                server_version: "stacks-node 2.5".to_string(),
            })
        }

        async fn broadcast(&self, _transaction: &[u8]) -> Result<String, ApiError> {
            Ok(SIGNED_TXID.to_string())
        }
    }

    fn api() -> ConstructionApi {
        ConstructionApi::new(Network::Testnet, Arc::new(StubNode))
    }

    fn secp256k1_key(hex_bytes: &str) -> PublicKey {
        PublicKey {
            hex_bytes: hex_bytes.to_string(),
            curve_type: CURVE_SECP256K1.to_string(),
        }
    }

    fn transfer_op(index: i64, address: &str, value: &str) -> Operation {
        Operation {
            operation_identifier: OperationIdentifier::new(index),
            related_operations: None,
            operation_type: OperationType::TokenTransfer,
            status: None,
            account: Some(AccountIdentifier::new(address)),
            amount: Some(Amount::stx(value)),
            coin_change: None,
            metadata: None,
        }
    }

    fn network_identifier() -> Option<NetworkIdentifier> {
        Some(Network::Testnet.identifier())
    }

    fn payloads_request() -> ConstructionPayloadsRequest {
        ConstructionPayloadsRequest {
            network_identifier: network_identifier(),
            operations: Some(vec![
                transfer_op(0, SENDER, "-500000"),
                transfer_op(1, RECIPIENT, "500000"),
            ]),
            metadata: Some(TransactionMetadata {
                fee: Some("180".to_string()),
                nonce: Some(3),
                ..Default::default()
            }),
            public_keys: Some(vec![secp256k1_key(SENDER_PUBKEY)]),
        }
    }

    fn combine_request(signature_hex: &str, public_key: &str) -> ConstructionCombineRequest {
        ConstructionCombineRequest {
            network_identifier: network_identifier(),
            unsigned_transaction: Some(UNSIGNED_HEX.to_string()),
            signatures: Some(vec![Signature {
                signing_payload: SigningPayload {
                    address: Some(SENDER.to_string()),
                    account_identifier: Some(AccountIdentifier::new(SENDER)),
                    hex_bytes: PRESIGN_HEX.to_string(),
                    signature_type: Some(SIGNATURE_TYPE_ECDSA_RECOVERY.to_string()),
                },
                public_key: secp256k1_key(public_key),
                signature_type: SIGNATURE_TYPE_ECDSA_RECOVERY.to_string(),
                hex_bytes: signature_hex.to_string(),
            }]),
        }
    }

    #[test]
    fn test_derive_known_key() {
        let response = api()
            .derive(&ConstructionDeriveRequest {
                network_identifier: network_identifier(),
                public_key: Some(secp256k1_key(
                    "025c13b2fc2261956d8a4ad07d481b1a3b2cbf93a24f992249a61c3a1c4de79c51",
                )),
                metadata: None,
            })
            .unwrap();
        assert_eq!(
            response.account_identifier.address,
            "ST19SH1QSCR8VMEX6SVWP33WCF08RPDY5QVHX94BM"
        );
    }

    #[test]
    fn test_derive_rejects_foreign_curve() {
        let err = api()
            .derive(&ConstructionDeriveRequest {
                network_identifier: network_identifier(),
                public_key: Some(PublicKey {
                    hex_bytes: "0000".to_string(),
                    curve_type: "edwards25519".to_string(),
                }),
                metadata: None,
            })
            .unwrap_err();
        assert_eq!(err.code(), 619);
    }

    #[test]
    fn test_derive_rejects_invalid_point() {
        let err = api()
            .derive(&ConstructionDeriveRequest {
                network_identifier: network_identifier(),
                public_key: Some(secp256k1_key("deadbeef")),
                metadata: None,
            })
            .unwrap_err();
        assert_eq!(err, ApiError::InvalidPublicKey);
    }

    #[test]
    fn test_preprocess_options() {
        let sender = "STB44HYPYAT2BB2QE513NSP81HTMYWBJP02HPGK6";
        let response = api()
            .preprocess(&ConstructionPreprocessRequest {
                network_identifier: network_identifier(),
                operations: Some(vec![
                    transfer_op(0, sender, "-500000"),
                    transfer_op(1, RECIPIENT, "500000"),
                ]),
                metadata: None,
                max_fee: Some(vec![Amount::stx("12380898")]),
                suggested_fee_multiplier: Some(1.0),
            })
            .unwrap();

        let options = &response.options;
        assert_eq!(options.sender_address.as_deref(), Some(sender));
        assert_eq!(
            options.token_transfer_recipient_address.as_deref(),
            Some(RECIPIENT)
        );
        assert_eq!(options.amount.as_deref(), Some("500000"));
        assert_eq!(options.size, Some(180));
        assert_eq!(options.max_fee.as_deref(), Some("12380898"));
        assert_eq!(
            response.required_public_keys,
            vec![AccountIdentifier::new(sender)]
        );
    }

    #[tokio::test]
    async fn test_metadata_suggests_fee() {
        let preprocess = api()
            .preprocess(&ConstructionPreprocessRequest {
                network_identifier: network_identifier(),
                operations: Some(vec![
                    transfer_op(0, SENDER, "-500000"),
                    transfer_op(1, RECIPIENT, "500000"),
                ]),
                metadata: None,
                max_fee: None,
                suggested_fee_multiplier: None,
            })
            .unwrap();

        let response = api()
            .metadata(&ConstructionMetadataRequest {
                network_identifier: network_identifier(),
                options: Some(preprocess.options),
                public_keys: Some(vec![secp256k1_key(SENDER_PUBKEY)]),
            })
            .await
            .unwrap();

        // rate 10 × size 180 × multiplier 1
        assert_eq!(response.metadata.fee.as_deref(), Some("1800"));
        assert_eq!(response.metadata.account_sequence, Some(3));
        assert!(response.metadata.recent_block_hash.is_some());
        assert_eq!(response.suggested_fee, vec![Amount::stx("1800")]);
    }

    #[tokio::test]
    async fn test_metadata_caps_fee_at_max_fee() {
        let mut options = api().preprocess(&ConstructionPreprocessRequest {
            network_identifier: network_identifier(),
            operations: Some(vec![
                transfer_op(0, SENDER, "-500000"),
                transfer_op(1, RECIPIENT, "500000"),
            ]),
            metadata: None,
            max_fee: Some(vec![Amount::stx("700")]),
            suggested_fee_multiplier: Some(2.0),
        })
        .unwrap()
        .options;
        assert_eq!(options.max_fee.as_deref(), Some("700"));
        options.suggested_fee_multiplier = Some(2.0);

        let response = api()
            .metadata(&ConstructionMetadataRequest {
                network_identifier: network_identifier(),
                options: Some(options),
                public_keys: None,
            })
            .await
            .unwrap();
        assert_eq!(response.metadata.fee.as_deref(), Some("700"));
    }

    #[tokio::test]
    async fn test_metadata_requires_size() {
        let mut options = api().preprocess(&ConstructionPreprocessRequest {
            network_identifier: network_identifier(),
            operations: Some(vec![
                transfer_op(0, SENDER, "-500000"),
                transfer_op(1, RECIPIENT, "500000"),
            ]),
            metadata: None,
            max_fee: None,
            suggested_fee_multiplier: None,
        })
        .unwrap()
        .options;
        options.size = None;

        let err = api()
            .metadata(&ConstructionMetadataRequest {
                network_identifier: network_identifier(),
                options: Some(options),
                public_keys: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::MissingTransactionSize);
        assert_eq!(err.code(), 639);
    }

    #[tokio::test]
    async fn test_metadata_validates_addresses() {
        let make_options = |sender: &str, recipient: &str| {
            crate::types::ConstructionOptions {
                sender_address: Some(sender.to_string()),
                operation_type: Some(OperationType::TokenTransfer),
                token_transfer_recipient_address: Some(recipient.to_string()),
                amount: Some("500000".to_string()),
                size: Some(180),
                ..Default::default()
            }
        };

        let err = api()
            .metadata(&ConstructionMetadataRequest {
                network_identifier: network_identifier(),
                options: Some(make_options("not-an-address", RECIPIENT)),
                public_keys: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::InvalidSender);

        let err = api()
            .metadata(&ConstructionMetadataRequest {
                network_identifier: network_identifier(),
                options: Some(make_options(SENDER, "not-an-address")),
                public_keys: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::InvalidRecipient);
    }

    #[tokio::test]
    async fn test_metadata_rejects_mismatched_key() {
        let options = crate::types::ConstructionOptions {
            sender_address: Some(SENDER.to_string()),
            operation_type: Some(OperationType::TokenTransfer),
            token_transfer_recipient_address: Some(RECIPIENT.to_string()),
            amount: Some("500000".to_string()),
            size: Some(180),
            ..Default::default()
        };
        let err = api()
            .metadata(&ConstructionMetadataRequest {
                network_identifier: network_identifier(),
                options: Some(options),
                public_keys: Some(vec![secp256k1_key(
                    "025c13b2fc2261956d8a4ad07d481b1a3b2cbf93a24f992249a61c3a1c4de79c51",
                )]),
            })
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::InvalidPublicKey);
    }

    #[test]
    fn test_payloads_builds_fixture_transaction() {
        let response = api().payloads(&payloads_request()).unwrap();
        assert_eq!(response.unsigned_transaction, UNSIGNED_HEX);
        assert_eq!(response.payloads.len(), 1);
        let payload = &response.payloads[0];
        assert_eq!(payload.address.as_deref(), Some(SENDER));
        assert_eq!(payload.hex_bytes, PRESIGN_HEX);
        assert_eq!(
            payload.signature_type.as_deref(),
            Some(SIGNATURE_TYPE_ECDSA_RECOVERY)
        );
    }

    #[test]
    fn test_payloads_public_key_count() {
        let mut request = payloads_request();
        request.public_keys = Some(vec![]);
        assert_eq!(
            api().payloads(&request).unwrap_err(),
            ApiError::EmptyPublicKey
        );

        let mut request = payloads_request();
        request.public_keys = Some(vec![
            secp256k1_key(SENDER_PUBKEY),
            secp256k1_key(SENDER_PUBKEY),
        ]);
        assert_eq!(
            api().payloads(&request).unwrap_err(),
            ApiError::NeedOnePublicKey
        );
    }

    #[test]
    fn test_payloads_rejects_foreign_key() {
        let mut request = payloads_request();
        request.public_keys = Some(vec![secp256k1_key(
            "025c13b2fc2261956d8a4ad07d481b1a3b2cbf93a24f992249a61c3a1c4de79c51",
        )]);
        assert_eq!(
            api().payloads(&request).unwrap_err(),
            ApiError::InvalidPublicKey
        );
    }

    #[test]
    fn test_payloads_rejects_long_memo() {
        let mut request = payloads_request();
        request.metadata.as_mut().unwrap().memo = Some("x".repeat(40));
        assert_eq!(api().payloads(&request).unwrap_err(), ApiError::InvalidMemo);
    }

    #[test]
    fn test_combine_accepts_wallet_ordering() {
        let response = api()
            .combine(&combine_request(SIGNATURE_RSV_HEX, SENDER_PUBKEY))
            .unwrap();
        assert_eq!(response.signed_transaction, SIGNED_HEX);
    }

    #[test]
    fn test_combine_accepts_wire_ordering() {
        // rotate [r ‖ s ‖ v] into [v ‖ r ‖ s]
        let rsv = codec::decode_hex(SIGNATURE_RSV_HEX).unwrap();
        let mut vrs = vec![rsv[64]];
        vrs.extend_from_slice(&rsv[..64]);
        let response = api()
            .combine(&combine_request(&encode_hex(&vrs), SENDER_PUBKEY))
            .unwrap();
        assert_eq!(response.signed_transaction, SIGNED_HEX);
    }

    #[test]
    fn test_combine_rejects_two_signatures() {
        let mut request = combine_request(SIGNATURE_RSV_HEX, SENDER_PUBKEY);
        let signature = request.signatures.as_ref().unwrap()[0].clone();
        request.signatures.as_mut().unwrap().push(signature);
        let err = api().combine(&request).unwrap_err();
        assert_eq!(err, ApiError::NeedOnlyOneSignature);
        assert_eq!(err.code(), 637);
    }

    #[test]
    fn test_combine_rejects_wrong_signer() {
        let err = api()
            .combine(&combine_request(
                SIGNATURE_RSV_HEX,
                "025c13b2fc2261956d8a4ad07d481b1a3b2cbf93a24f992249a61c3a1c4de79c51",
            ))
            .unwrap_err();
        assert_eq!(err, ApiError::SignatureNotVerified);
        assert_eq!(err.code(), 635);
    }

    #[test]
    fn test_combine_rejects_short_signature() {
        let mut request = combine_request(SIGNATURE_RSV_HEX, SENDER_PUBKEY);
        request.signatures.as_mut().unwrap()[0].hex_bytes = "0xdead".to_string();
        assert_eq!(
            api().combine(&request).unwrap_err(),
            ApiError::InvalidSignature
        );
    }

    #[test]
    fn test_combine_rejects_plain_ecdsa() {
        let mut request = combine_request(SIGNATURE_RSV_HEX, SENDER_PUBKEY);
        request.signatures.as_mut().unwrap()[0].signature_type = "ecdsa".to_string();
        let err = api().combine(&request).unwrap_err();
        assert_eq!(err.code(), 638);
    }

    #[test]
    fn test_parse_unsigned_round_trips_operations() {
        let response = api()
            .parse(&ConstructionParseRequest {
                network_identifier: network_identifier(),
                signed: Some(false),
                transaction: Some(UNSIGNED_HEX.to_string()),
            })
            .unwrap();
        assert!(response.account_identifier_signers.is_none());
        assert_eq!(response.operations.len(), 3);
        let intent = intent_from_operations(&response.operations[1..]).unwrap();
        assert_eq!(intent.sender_address, SENDER);
        assert_eq!(intent.recipient_address, RECIPIENT);
        assert_eq!(intent.amount, 500_000);
    }

    #[test]
    fn test_parse_signed_reports_signer() {
        let response = api()
            .parse(&ConstructionParseRequest {
                network_identifier: network_identifier(),
                signed: Some(true),
                transaction: Some(SIGNED_HEX.to_string()),
            })
            .unwrap();
        assert_eq!(
            response.account_identifier_signers,
            Some(vec![AccountIdentifier::new(SENDER)])
        );
    }

    #[test]
    fn test_parse_signed_requires_signature() {
        let err = api()
            .parse(&ConstructionParseRequest {
                network_identifier: network_identifier(),
                signed: Some(true),
                transaction: Some(UNSIGNED_HEX.to_string()),
            })
            .unwrap_err();
        assert_eq!(err, ApiError::TransactionNotSigned);
    }

    #[test]
    fn test_hash_signed_fixture() {
        let response = api().hash(Some(SIGNED_HEX)).unwrap();
        assert_eq!(response.transaction_identifier.hash, SIGNED_TXID);
    }

    #[test]
    fn test_hash_rejects_odd_hex() {
        let err = api().hash(Some("0x123")).unwrap_err();
        assert_eq!(err.code(), 628);
    }

    #[test]
    fn test_hash_rejects_unsigned() {
        let err = api().hash(Some(UNSIGNED_HEX)).unwrap_err();
        assert_eq!(err, ApiError::TransactionNotSigned);
        assert_eq!(err.code(), 629);
    }

    #[tokio::test]
    async fn test_submit_returns_node_txid() {
        let response = api()
            .submit(&ConstructionSubmitRequest {
                network_identifier: network_identifier(),
                signed_transaction: Some(SIGNED_HEX.to_string()),
            })
            .await
            .unwrap();
        assert_eq!(response.transaction_identifier.hash, SIGNED_TXID);
    }

    #[tokio::test]
    async fn test_submit_rejects_unsigned() {
        let err = api()
            .submit(&ConstructionSubmitRequest {
                network_identifier: network_identifier(),
                signed_transaction: Some(UNSIGNED_HEX.to_string()),
            })
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::TransactionNotSigned);
    }

    #[test]
    fn test_full_offline_flow() {
        // payloads → combine → parse(signed) → hash, all byte-stable
        let payloads = api().payloads(&payloads_request()).unwrap();
        let combined = api()
            .combine(&combine_request(SIGNATURE_RSV_HEX, SENDER_PUBKEY))
            .unwrap();
        assert_eq!(payloads.unsigned_transaction, UNSIGNED_HEX);
        let parsed = api()
            .parse(&ConstructionParseRequest {
                network_identifier: network_identifier(),
                signed: Some(true),
                transaction: Some(combined.signed_transaction.clone()),
            })
            .unwrap();
        assert_eq!(
            parsed.account_identifier_signers,
            Some(vec![AccountIdentifier::new(SENDER)])
        );
        let hashed = api().hash(Some(&combined.signed_transaction)).unwrap();
        assert_eq!(hashed.transaction_identifier.hash, SIGNED_TXID);
    }
}
