//! Wire codec for Stacks transactions.
//!
//! Covers the single-sig standard transaction shape the construction flow
//! produces and parses: header, spending condition, post-conditions, and the
//! token-transfer payload. Other recognized payload kinds are carried
//! opaquely so externally mined transactions still round-trip.
//!
//! Hashing follows the chain's scheme: the txid is the SHA-512/256 of the
//! full serialization; signing binds the txid of the fee/nonce/signature
//! cleared transaction to the authorization flag, fee, and nonce.

use once_cell::sync::Lazy;
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, Secp256k1, VerifyOnly};
use sha2::{Digest, Sha512_256};

use crate::address::{HASH160_LEN, hash160};
use crate::network::Network;

/// Serialized length of a single-sig standard token transfer. Doubles as the
/// size estimate used for fee suggestion.
pub const TOKEN_TRANSFER_TX_SIZE: u64 = 180;

/// Fixed memo slot length in the token-transfer payload.
pub const MEMO_LEN: usize = 34;

const SIGNATURE_LEN: usize = 65;

const TRANSACTION_VERSION_MAINNET: u8 = 0x00;
const TRANSACTION_VERSION_TESTNET: u8 = 0x80;

/// Authorization flags; also the domain byte in the pre-sign hash.
pub const AUTH_FLAG_STANDARD: u8 = 0x04;
pub const AUTH_FLAG_SPONSORED: u8 = 0x05;

const HASH_MODE_P2PKH: u8 = 0x00;

const KEY_ENCODING_COMPRESSED: u8 = 0x00;
const KEY_ENCODING_UNCOMPRESSED: u8 = 0x01;

const ANCHOR_MODE_ANY: u8 = 0x03;
const POST_CONDITION_MODE_DENY: u8 = 0x02;

const PRINCIPAL_STANDARD: u8 = 0x05;
const PRINCIPAL_CONTRACT: u8 = 0x06;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("invalid hex encoding")]
    InvalidHex,
    #[error("transaction buffer is truncated")]
    Truncated,
    #[error("unexpected bytes after the payload")]
    TrailingBytes,
    #[error("unknown transaction version {0:#04x}")]
    UnknownVersion(u8),
    #[error("unsupported authorization type {0:#04x}")]
    UnsupportedAuth(u8),
    #[error("unsupported spending condition hash mode {0:#04x}")]
    UnsupportedHashMode(u8),
    #[error("invalid public key encoding {0:#04x}")]
    InvalidKeyEncoding(u8),
    #[error("invalid anchor mode {0:#04x}")]
    InvalidAnchorMode(u8),
    #[error("invalid post-condition mode {0:#04x}")]
    InvalidPostConditionMode(u8),
    #[error("unsupported post-condition")]
    UnsupportedPostCondition,
    #[error("unknown payload type {0:#04x}")]
    UnknownPayload(u8),
    #[error("invalid principal tag {0:#04x}")]
    InvalidPrincipal(u8),
    #[error("invalid contract name")]
    InvalidContractName,
    #[error("memo exceeds {MEMO_LEN} bytes")]
    MemoTooLong,
    #[error("not a compressed secp256k1 public key")]
    InvalidPublicKey,
    #[error("transaction is not signed")]
    NotSigned,
    #[error("signature recovery failed")]
    RecoveryFailed,
    #[error("recovered key does not hash to the signer")]
    SignerMismatch,
}

static SECP: Lazy<Secp256k1<VerifyOnly>> = Lazy::new(Secp256k1::verification_only);

/// Decodes hex with or without a `0x` prefix. An odd digit count or a
/// non-hex character is a codec error.
pub fn decode_hex(input: &str) -> Result<Vec<u8>, CodecError> {
    let stripped = input.strip_prefix("0x").unwrap_or(input);
    hex::decode(stripped).map_err(|_| CodecError::InvalidHex)
}

/// Lowercase hex with the `0x` prefix all responses carry.
pub fn encode_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

fn sha512_256(bytes: &[u8]) -> [u8; 32] {
    Sha512_256::digest(bytes).into()
}

struct ByteReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        ByteReader { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        let end = self.pos.checked_add(n).ok_or(CodecError::Truncated)?;
        if end > self.buf.len() {
            return Err(CodecError::Truncated);
        }
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    fn read_u32(&mut self) -> Result<u32, CodecError> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    fn read_u64(&mut self) -> Result<u64, CodecError> {
        Ok(u64::from_be_bytes(self.read_array()?))
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn read_remaining(&mut self) -> &'a [u8] {
        let slice = &self.buf[self.pos..];
        self.pos = self.buf.len();
        slice
    }

    fn is_empty(&self) -> bool {
        self.pos == self.buf.len()
    }
}

/// Recipient of a token transfer: a standard account or a contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    Standard {
        version: u8,
        hash160: [u8; HASH160_LEN],
    },
    Contract {
        version: u8,
        hash160: [u8; HASH160_LEN],
        name: String,
    },
}

impl Principal {
    pub fn standard(version: u8, hash160: [u8; HASH160_LEN]) -> Self {
        Principal::Standard { version, hash160 }
    }

    pub fn version(&self) -> u8 {
        match self {
            Principal::Standard { version, .. } | Principal::Contract { version, .. } => *version,
        }
    }

    pub fn hash160(&self) -> &[u8; HASH160_LEN] {
        match self {
            Principal::Standard { hash160, .. } | Principal::Contract { hash160, .. } => hash160,
        }
    }

    fn write(&self, out: &mut Vec<u8>) {
        match self {
            Principal::Standard { version, hash160 } => {
                out.push(PRINCIPAL_STANDARD);
                out.push(*version);
                out.extend_from_slice(hash160);
            }
            Principal::Contract {
                version,
                hash160,
                name,
            } => {
                out.push(PRINCIPAL_CONTRACT);
                out.push(*version);
                out.extend_from_slice(hash160);
                out.push(name.len() as u8);
                out.extend_from_slice(name.as_bytes());
            }
        }
    }

    fn read(r: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        let tag = r.read_u8()?;
        let version = r.read_u8()?;
        let hash160 = r.read_array()?;
        match tag {
            PRINCIPAL_STANDARD => Ok(Principal::Standard { version, hash160 }),
            PRINCIPAL_CONTRACT => {
                let name = read_short_string(r)?;
                Ok(Principal::Contract {
                    version,
                    hash160,
                    name,
                })
            }
            other => Err(CodecError::InvalidPrincipal(other)),
        }
    }
}

fn read_short_string(r: &mut ByteReader<'_>) -> Result<String, CodecError> {
    let len = r.read_u8()? as usize;
    let bytes = r.take(len)?;
    let name = std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidContractName)?;
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_graphic()) {
        return Err(CodecError::InvalidContractName);
    }
    Ok(name.to_string())
}

/// The 34-byte zero-padded token transfer memo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenTransferMemo(pub [u8; MEMO_LEN]);

impl TokenTransferMemo {
    pub fn empty() -> Self {
        TokenTransferMemo([0u8; MEMO_LEN])
    }

    pub fn from_text(text: &str) -> Result<Self, CodecError> {
        if text.len() > MEMO_LEN {
            return Err(CodecError::MemoTooLong);
        }
        let mut memo = [0u8; MEMO_LEN];
        memo[..text.len()].copy_from_slice(text.as_bytes());
        Ok(TokenTransferMemo(memo))
    }

    /// The memo with trailing padding stripped; `None` when empty.
    pub fn as_text(&self) -> Option<String> {
        let end = self
            .0
            .iter()
            .rposition(|b| *b != 0)
            .map(|i| i + 1)
            .unwrap_or(0);
        if end == 0 {
            return None;
        }
        Some(String::from_utf8_lossy(&self.0[..end]).into_owned())
    }
}

/// Payload kinds recognized by tag. Only token transfers are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    TokenTransfer,
    ContractCall,
    SmartContract,
    PoisonMicroblock,
    Coinbase,
    CoinbaseToAltRecipient,
    VersionedSmartContract,
    TenureChange,
    NakamotoCoinbase,
}

impl PayloadKind {
    fn tag(&self) -> u8 {
        match self {
            PayloadKind::TokenTransfer => 0x00,
            PayloadKind::ContractCall => 0x01,
            PayloadKind::SmartContract => 0x02,
            PayloadKind::PoisonMicroblock => 0x03,
            PayloadKind::Coinbase => 0x04,
            PayloadKind::CoinbaseToAltRecipient => 0x05,
            PayloadKind::VersionedSmartContract => 0x06,
            PayloadKind::TenureChange => 0x07,
            PayloadKind::NakamotoCoinbase => 0x08,
        }
    }

    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0x00 => Some(PayloadKind::TokenTransfer),
            0x01 => Some(PayloadKind::ContractCall),
            0x02 => Some(PayloadKind::SmartContract),
            0x03 => Some(PayloadKind::PoisonMicroblock),
            0x04 => Some(PayloadKind::Coinbase),
            0x05 => Some(PayloadKind::CoinbaseToAltRecipient),
            0x06 => Some(PayloadKind::VersionedSmartContract),
            0x07 => Some(PayloadKind::TenureChange),
            0x08 => Some(PayloadKind::NakamotoCoinbase),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionPayload {
    TokenTransfer {
        recipient: Principal,
        amount: u64,
        memo: TokenTransferMemo,
    },
    /// A recognized non-transfer payload, kept byte-for-byte. The payload is
    /// the final transaction element, so the remainder of the buffer is its
    /// exact extent.
    Opaque { kind: PayloadKind, body: Vec<u8> },
}

impl TransactionPayload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            TransactionPayload::TokenTransfer { .. } => PayloadKind::TokenTransfer,
            TransactionPayload::Opaque { kind, .. } => *kind,
        }
    }

    fn write(&self, out: &mut Vec<u8>) {
        match self {
            TransactionPayload::TokenTransfer {
                recipient,
                amount,
                memo,
            } => {
                out.push(PayloadKind::TokenTransfer.tag());
                recipient.write(out);
                out.extend_from_slice(&amount.to_be_bytes());
                out.extend_from_slice(&memo.0);
            }
            TransactionPayload::Opaque { kind, body } => {
                out.push(kind.tag());
                out.extend_from_slice(body);
            }
        }
    }

    fn read(r: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        let tag = r.read_u8()?;
        let kind = PayloadKind::from_tag(tag).ok_or(CodecError::UnknownPayload(tag))?;
        match kind {
            PayloadKind::TokenTransfer => {
                let recipient = Principal::read(r)?;
                let amount = r.read_u64()?;
                let memo = TokenTransferMemo(r.read_array()?);
                Ok(TransactionPayload::TokenTransfer {
                    recipient,
                    amount,
                    memo,
                })
            }
            other => Ok(TransactionPayload::Opaque {
                kind: other,
                body: r.read_remaining().to_vec(),
            }),
        }
    }
}

/// A post-condition carried opaquely: parsed far enough to know its extent,
/// re-serialized byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostCondition(pub Vec<u8>);

impl PostCondition {
    fn read(r: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        let start = r.pos;
        let kind = r.read_u8()?;
        Self::skip_principal(r)?;
        match kind {
            // STX: condition code + amount
            0x00 => {
                r.read_u8()?;
                r.read_u64()?;
            }
            // fungible token: asset info + condition code + amount
            0x01 => {
                Self::skip_asset_info(r)?;
                r.read_u8()?;
                r.read_u64()?;
            }
            // non-fungible conditions embed a Clarity value
            _ => return Err(CodecError::UnsupportedPostCondition),
        }
        Ok(PostCondition(r.buf[start..r.pos].to_vec()))
    }

    fn skip_principal(r: &mut ByteReader<'_>) -> Result<(), CodecError> {
        match r.read_u8()? {
            // origin
            0x01 => Ok(()),
            // standard principal
            0x02 => {
                r.take(1 + HASH160_LEN)?;
                Ok(())
            }
            // contract principal
            0x03 => {
                r.take(1 + HASH160_LEN)?;
                read_short_string(r)?;
                Ok(())
            }
            other => Err(CodecError::InvalidPrincipal(other)),
        }
    }

    fn skip_asset_info(r: &mut ByteReader<'_>) -> Result<(), CodecError> {
        r.take(1 + HASH160_LEN)?;
        read_short_string(r)?;
        read_short_string(r)?;
        Ok(())
    }
}

/// Single-sig standard spending condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpendingCondition {
    pub signer: [u8; HASH160_LEN],
    pub nonce: u64,
    pub fee: u64,
    pub key_encoding: u8,
    pub signature: [u8; SIGNATURE_LEN],
}

impl SpendingCondition {
    pub fn unsigned(signer: [u8; HASH160_LEN], nonce: u64, fee: u64) -> Self {
        SpendingCondition {
            signer,
            nonce,
            fee,
            key_encoding: KEY_ENCODING_COMPRESSED,
            signature: [0u8; SIGNATURE_LEN],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StacksTransaction {
    pub version: u8,
    pub chain_id: u32,
    pub auth: SpendingCondition,
    pub anchor_mode: u8,
    pub post_condition_mode: u8,
    pub post_conditions: Vec<PostCondition>,
    pub payload: TransactionPayload,
}

impl StacksTransaction {
    /// Builds the unsigned token transfer the construction flow emits: the
    /// signature slot zero-filled, no post-conditions, anchored anywhere.
    pub fn token_transfer(
        network: Network,
        signer: [u8; HASH160_LEN],
        nonce: u64,
        fee: u64,
        recipient: Principal,
        amount: u64,
        memo: TokenTransferMemo,
    ) -> Self {
        StacksTransaction {
            version: network.transaction_version(),
            chain_id: network.chain_id(),
            auth: SpendingCondition::unsigned(signer, nonce, fee),
            anchor_mode: ANCHOR_MODE_ANY,
            post_condition_mode: POST_CONDITION_MODE_DENY,
            post_conditions: Vec::new(),
            payload: TransactionPayload::TokenTransfer {
                recipient,
                amount,
                memo,
            },
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(TOKEN_TRANSFER_TX_SIZE as usize);
        out.push(self.version);
        out.extend_from_slice(&self.chain_id.to_be_bytes());
        out.push(AUTH_FLAG_STANDARD);
        out.push(HASH_MODE_P2PKH);
        out.extend_from_slice(&self.auth.signer);
        out.extend_from_slice(&self.auth.nonce.to_be_bytes());
        out.extend_from_slice(&self.auth.fee.to_be_bytes());
        out.push(self.auth.key_encoding);
        out.extend_from_slice(&self.auth.signature);
        out.push(self.anchor_mode);
        out.push(self.post_condition_mode);
        out.extend_from_slice(&(self.post_conditions.len() as u32).to_be_bytes());
        for condition in &self.post_conditions {
            out.extend_from_slice(&condition.0);
        }
        self.payload.write(&mut out);
        out
    }

    pub fn deserialize(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut r = ByteReader::new(bytes);

        let version = r.read_u8()?;
        if version != TRANSACTION_VERSION_MAINNET && version != TRANSACTION_VERSION_TESTNET {
            return Err(CodecError::UnknownVersion(version));
        }
        let chain_id = r.read_u32()?;

        let auth_flag = r.read_u8()?;
        if auth_flag != AUTH_FLAG_STANDARD {
            return Err(CodecError::UnsupportedAuth(auth_flag));
        }
        let hash_mode = r.read_u8()?;
        if hash_mode != HASH_MODE_P2PKH {
            return Err(CodecError::UnsupportedHashMode(hash_mode));
        }
        let signer = r.read_array()?;
        let nonce = r.read_u64()?;
        let fee = r.read_u64()?;
        let key_encoding = r.read_u8()?;
        if key_encoding != KEY_ENCODING_COMPRESSED && key_encoding != KEY_ENCODING_UNCOMPRESSED {
            return Err(CodecError::InvalidKeyEncoding(key_encoding));
        }
        let signature = r.read_array()?;

        let anchor_mode = r.read_u8()?;
        if !(0x01..=0x03).contains(&anchor_mode) {
            return Err(CodecError::InvalidAnchorMode(anchor_mode));
        }
        let post_condition_mode = r.read_u8()?;
        if post_condition_mode != 0x01 && post_condition_mode != 0x02 {
            return Err(CodecError::InvalidPostConditionMode(post_condition_mode));
        }
        let condition_count = r.read_u32()?;
        let mut post_conditions = Vec::new();
        for _ in 0..condition_count {
            post_conditions.push(PostCondition::read(&mut r)?);
        }

        let payload = TransactionPayload::read(&mut r)?;
        if !r.is_empty() {
            return Err(CodecError::TrailingBytes);
        }

        Ok(StacksTransaction {
            version,
            chain_id,
            auth: SpendingCondition {
                signer,
                nonce,
                fee,
                key_encoding,
                signature,
            },
            anchor_mode,
            post_condition_mode,
            post_conditions,
            payload,
        })
    }

    /// SHA-512/256 of the full serialization.
    pub fn txid(&self) -> [u8; 32] {
        sha512_256(&self.serialize())
    }

    /// True iff the signature slot is populated with a plausible recoverable
    /// signature (non-zero, recovery byte 0 or 1).
    pub fn is_signed(&self) -> bool {
        self.auth.signature != [0u8; SIGNATURE_LEN] && self.auth.signature[0] <= 1
    }

    /// The txid of this transaction with fee, nonce, and signature cleared —
    /// the structural hash signing starts from.
    pub fn initial_sighash(&self) -> [u8; 32] {
        let mut cleared = self.clone();
        cleared.auth.fee = 0;
        cleared.auth.nonce = 0;
        cleared.auth.signature = [0u8; SIGNATURE_LEN];
        cleared.txid()
    }

    /// The digest a wallet signs: the initial sighash bound to the
    /// authorization flag and this transaction's fee and nonce.
    pub fn presign_hash(&self) -> [u8; 32] {
        presign_hash(
            &self.initial_sighash(),
            AUTH_FLAG_STANDARD,
            self.auth.fee,
            self.auth.nonce,
        )
    }

    pub fn set_signature(&mut self, signature: [u8; SIGNATURE_LEN]) {
        self.auth.signature = signature;
    }

    /// Recovers the origin public key from the signature and checks that it
    /// hashes to the signer bytes. Returns the compressed key.
    pub fn verify_origin(&self) -> Result<[u8; 33], CodecError> {
        if !self.is_signed() {
            return Err(CodecError::NotSigned);
        }
        let public_key = recover_public_key(&self.presign_hash(), &self.auth.signature)?;
        if hash160(&public_key) != self.auth.signer {
            return Err(CodecError::SignerMismatch);
        }
        Ok(public_key)
    }
}

/// Domain-separated pre-sign digest: `H(sighash ‖ auth_flag ‖ fee ‖ nonce)`
/// with fee and nonce big-endian 8 bytes.
pub fn presign_hash(sighash: &[u8; 32], auth_flag: u8, fee: u64, nonce: u64) -> [u8; 32] {
    let mut bytes = Vec::with_capacity(32 + 1 + 8 + 8);
    bytes.extend_from_slice(sighash);
    bytes.push(auth_flag);
    bytes.extend_from_slice(&fee.to_be_bytes());
    bytes.extend_from_slice(&nonce.to_be_bytes());
    sha512_256(&bytes)
}

/// Recovers the compressed public key from a `[recovery ‖ r ‖ s]` signature
/// over the given digest.
pub fn recover_public_key(
    digest: &[u8; 32],
    signature: &[u8; SIGNATURE_LEN],
) -> Result<[u8; 33], CodecError> {
    let recovery_id =
        RecoveryId::from_i32(signature[0] as i32).map_err(|_| CodecError::RecoveryFailed)?;
    let recoverable = RecoverableSignature::from_compact(&signature[1..], recovery_id)
        .map_err(|_| CodecError::RecoveryFailed)?;
    let message = Message::from_digest(*digest);
    let public_key = SECP
        .recover_ecdsa(&message, &recoverable)
        .map_err(|_| CodecError::RecoveryFailed)?;
    Ok(public_key.serialize())
}

/// Recoverable verification: true iff the key recovered from `signature`
/// over `digest` equals `expected` byte-for-byte.
pub fn verify_signature(
    digest: &[u8; 32],
    signature: &[u8; SIGNATURE_LEN],
    expected: &[u8; 33],
) -> bool {
    match recover_public_key(digest, signature) {
        Ok(recovered) => recovered == *expected,
        Err(_) => false,
    }
}

/// Validates a 33-byte compressed secp256k1 point encoding.
pub fn parse_public_key(bytes: &[u8]) -> Result<[u8; 33], CodecError> {
    let array: [u8; 33] = bytes.try_into().map_err(|_| CodecError::InvalidPublicKey)?;
    secp256k1::PublicKey::from_slice(&array).map_err(|_| CodecError::InvalidPublicKey)?;
    Ok(array)
}

/// Wire order is `[recovery ‖ r ‖ s]` but many wallets emit `[r ‖ s ‖
/// recovery]`. Returns the plausible wire-order readings of the input, found
/// by looking for a valid recovery byte (0 or 1) at either end. Both ends
/// can qualify; callers try each against the pre-sign digest rather than
/// guessing.
pub fn signature_candidates(signature: &[u8; SIGNATURE_LEN]) -> Vec<[u8; SIGNATURE_LEN]> {
    let mut candidates = Vec::new();
    if signature[0] <= 1 {
        candidates.push(*signature);
    }
    if signature[SIGNATURE_LEN - 1] <= 1 {
        let mut rotated = [0u8; SIGNATURE_LEN];
        rotated[0] = signature[SIGNATURE_LEN - 1];
        rotated[1..].copy_from_slice(&signature[..SIGNATURE_LEN - 1]);
        candidates.push(rotated);
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    // 500000 µSTX from ST34786BDYFQQHPMYT3740NF8B0PJNPFEPMH16KHR to
    // STDE7Y8HV3RX8VBM2TZVWJTS7ZA1XB0SSC3NEVH0, fee 180, nonce 3
    const UNSIGNED_HEX: &str = "0x80800000000400c874196df3ef78da9ed0ce4055e8582d2ad9eeb5000000000000000300000000000000b400000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000003020000000000051a1ae3f911d8f1d46d7416bfbe4b593fd41eac19cb000000000007a12000000000000000000000000000000000000000000000000000000000000000000000";
    const PRESIGN_HEX: &str = "b8af45db5e2b8895b3d5a67a3e83b8bc80a89921bd238f9ff111feab35f62d4a";
    const SIGNATURE_VRS_HEX: &str = "00c02999fbb15278cb9ba128fba41ba13971aae960068ef28f78c5e88269e995d73b6f1478798d73534c64888c09f13795b0f0000c9bb38ae20335c9cfc4a00254";
    const SIGNED_HEX: &str = "0x80800000000400c874196df3ef78da9ed0ce4055e8582d2ad9eeb5000000000000000300000000000000b40000c02999fbb15278cb9ba128fba41ba13971aae960068ef28f78c5e88269e995d73b6f1478798d73534c64888c09f13795b0f0000c9bb38ae20335c9cfc4a0025403020000000000051a1ae3f911d8f1d46d7416bfbe4b593fd41eac19cb000000000007a12000000000000000000000000000000000000000000000000000000000000000000000";
    const SIGNED_TXID: &str = "0x0b98f0fd42eecc13823a7c7fd136a4c61aebc67024ba9a79af6a6d642b30d1c2";
    const SENDER_PUBKEY_HEX: &str =
        "0380eb9d7075c83fd37c8a61dc24a130297a4c723ecf85690f1aaa7f129d72b00b";

    fn sig65(hex_str: &str) -> [u8; 65] {
        decode_hex(hex_str).unwrap().try_into().unwrap()
    }

    #[test]
    fn test_unsigned_round_trip() {
        let bytes = decode_hex(UNSIGNED_HEX).unwrap();
        assert_eq!(bytes.len(), TOKEN_TRANSFER_TX_SIZE as usize);
        let tx = StacksTransaction::deserialize(&bytes).unwrap();
        assert_eq!(tx.serialize(), bytes);
        assert_eq!(tx.auth.nonce, 3);
        assert_eq!(tx.auth.fee, 180);
        assert!(!tx.is_signed());
        match &tx.payload {
            TransactionPayload::TokenTransfer { amount, memo, .. } => {
                assert_eq!(*amount, 500_000);
                assert_eq!(memo.as_text(), None);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn test_hex_prefix_is_optional() {
        let with_prefix = decode_hex(UNSIGNED_HEX).unwrap();
        let without_prefix = decode_hex(UNSIGNED_HEX.trim_start_matches("0x")).unwrap();
        assert_eq!(with_prefix, without_prefix);
    }

    #[test]
    fn test_odd_hex_rejected() {
        assert_eq!(decode_hex("0x123"), Err(CodecError::InvalidHex));
    }

    #[test]
    fn test_truncated_buffer_rejected() {
        let bytes = decode_hex(UNSIGNED_HEX).unwrap();
        assert_eq!(
            StacksTransaction::deserialize(&bytes[..bytes.len() - 4]),
            Err(CodecError::Truncated)
        );
    }

    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = decode_hex(UNSIGNED_HEX).unwrap();
        bytes.push(0);
        assert_eq!(
            StacksTransaction::deserialize(&bytes),
            Err(CodecError::TrailingBytes)
        );
    }

    #[test]
    fn test_unknown_version_rejected() {
        let mut bytes = decode_hex(UNSIGNED_HEX).unwrap();
        bytes[0] = 0x42;
        assert_eq!(
            StacksTransaction::deserialize(&bytes),
            Err(CodecError::UnknownVersion(0x42))
        );
    }

    #[test]
    fn test_unknown_payload_rejected() {
        let mut bytes = decode_hex(UNSIGNED_HEX).unwrap();
        // payload tag sits right after the 4-byte post-condition count
        bytes[115] = 0x7f;
        assert_eq!(
            StacksTransaction::deserialize(&bytes),
            Err(CodecError::UnknownPayload(0x7f))
        );
    }

    #[test]
    fn test_presign_hash_matches_fixture() {
        let tx = StacksTransaction::deserialize(&decode_hex(UNSIGNED_HEX).unwrap()).unwrap();
        assert_eq!(hex::encode(tx.presign_hash()), PRESIGN_HEX);
    }

    #[test]
    fn test_signed_txid_matches_fixture() {
        let tx = StacksTransaction::deserialize(&decode_hex(SIGNED_HEX).unwrap()).unwrap();
        assert!(tx.is_signed());
        assert_eq!(encode_hex(&tx.txid()), SIGNED_TXID);
    }

    #[test]
    fn test_presign_hash_is_signature_independent() {
        let unsigned = StacksTransaction::deserialize(&decode_hex(UNSIGNED_HEX).unwrap()).unwrap();
        let signed = StacksTransaction::deserialize(&decode_hex(SIGNED_HEX).unwrap()).unwrap();
        assert_eq!(unsigned.presign_hash(), signed.presign_hash());
    }

    #[test]
    fn test_verify_origin_recovers_sender_key() {
        let tx = StacksTransaction::deserialize(&decode_hex(SIGNED_HEX).unwrap()).unwrap();
        let recovered = tx.verify_origin().unwrap();
        assert_eq!(hex::encode(recovered), SENDER_PUBKEY_HEX);
    }

    #[test]
    fn test_verify_origin_rejects_tampered_amount() {
        let mut tx = StacksTransaction::deserialize(&decode_hex(SIGNED_HEX).unwrap()).unwrap();
        if let TransactionPayload::TokenTransfer { amount, .. } = &mut tx.payload {
            *amount += 1;
        }
        assert!(tx.verify_origin().is_err());
    }

    #[test]
    fn test_signing_flow_reproduces_signed_fixture() {
        let mut tx = StacksTransaction::deserialize(&decode_hex(UNSIGNED_HEX).unwrap()).unwrap();
        tx.set_signature(sig65(SIGNATURE_VRS_HEX));
        assert_eq!(encode_hex(&tx.serialize()), SIGNED_HEX);
    }

    #[test]
    fn test_signature_candidate_normalization() {
        let wire = sig65(SIGNATURE_VRS_HEX);

        // already wire order
        let candidates = signature_candidates(&wire);
        assert_eq!(candidates[0], wire);

        // wallet order: [r ‖ s ‖ recovery]
        let mut wallet = [0u8; 65];
        wallet[..64].copy_from_slice(&wire[1..]);
        wallet[64] = wire[0];
        let candidates = signature_candidates(&wallet);
        assert!(candidates.contains(&wire));

        // recovery byte valid at neither end
        let mut garbage = wire;
        garbage[0] = 0x7a;
        garbage[64] = 0x7b;
        assert!(signature_candidates(&garbage).is_empty());
    }

    #[test]
    fn test_verify_signature_against_expected_key() {
        let tx = StacksTransaction::deserialize(&decode_hex(UNSIGNED_HEX).unwrap()).unwrap();
        let digest = tx.presign_hash();
        let signature = sig65(SIGNATURE_VRS_HEX);
        let expected: [u8; 33] = decode_hex(SENDER_PUBKEY_HEX).unwrap().try_into().unwrap();
        assert!(verify_signature(&digest, &signature, &expected));

        let other: [u8; 33] =
            decode_hex("025c13b2fc2261956d8a4ad07d481b1a3b2cbf93a24f992249a61c3a1c4de79c51")
                .unwrap()
                .try_into()
                .unwrap();
        assert!(!verify_signature(&digest, &signature, &other));
    }

    #[test]
    fn test_memo_round_trip() {
        let memo = TokenTransferMemo::from_text("test transaction").unwrap();
        assert_eq!(memo.as_text().as_deref(), Some("test transaction"));
        assert!(TokenTransferMemo::from_text(&"x".repeat(35)).is_err());
        assert_eq!(TokenTransferMemo::empty().as_text(), None);
    }
}
