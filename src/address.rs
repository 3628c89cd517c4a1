//! c32check address encoding and public-key → address derivation.
//!
//! Stacks addresses are c32check strings: a Crockford base32 alphabet over
//! `hash160(pubkey)` plus a 4-byte double-SHA256 checksum, prefixed with `S`
//! and the one-character version. Mainnet single-sig uses version 22 (`P`),
//! testnet uses 26 (`T`).

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

use crate::network::Network;

/// Crockford-style base32 alphabet used by c32check.
const C32_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Size of the address payload: `ripemd160(sha256(pubkey))`.
pub const HASH160_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("address contains a character outside the c32 alphabet")]
    BadCharacter,
    #[error("address checksum mismatch")]
    BadChecksum,
    #[error("address has an invalid length")]
    BadLength,
    #[error("address version {0} is not valid for this chain")]
    BadVersion(u8),
}

/// A decoded single-sig Stacks address: version byte plus key hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StacksAddress {
    pub version: u8,
    pub hash160: [u8; HASH160_LEN],
}

impl StacksAddress {
    /// Derives the single-sig address of a compressed secp256k1 public key.
    /// Identical keys always produce identical addresses.
    pub fn from_public_key(network: Network, public_key: &[u8]) -> Self {
        StacksAddress {
            version: network.address_version(),
            hash160: hash160(public_key),
        }
    }

    /// Decodes a c32check string, verifying alphabet, length and checksum.
    pub fn parse(address: &str) -> Result<Self, AddressError> {
        let rest = address
            .strip_prefix(['S', 's'])
            .ok_or(AddressError::BadLength)?
            .as_bytes();
        let (version_char, body) = rest.split_first().ok_or(AddressError::BadLength)?;
        let version = c32_value(*version_char)?;
        let decoded = c32_decode(body)?;
        if decoded.len() != HASH160_LEN + CHECKSUM_LEN {
            return Err(AddressError::BadLength);
        }
        let (payload, checksum) = decoded.split_at(HASH160_LEN);
        if checksum != c32_checksum(version, payload) {
            return Err(AddressError::BadChecksum);
        }
        let mut hash160 = [0u8; HASH160_LEN];
        hash160.copy_from_slice(payload);
        Ok(StacksAddress { version, hash160 })
    }

    /// Decodes an address and additionally checks its version byte against
    /// the given network.
    pub fn parse_for_network(address: &str, network: Network) -> Result<Self, AddressError> {
        let decoded = Self::parse(address)?;
        if decoded.version != network.address_version() {
            return Err(AddressError::BadVersion(decoded.version));
        }
        Ok(decoded)
    }

    /// Renders the c32check string form.
    pub fn encode(&self) -> String {
        let mut data = self.hash160.to_vec();
        data.extend_from_slice(&c32_checksum(self.version, &self.hash160));
        format!(
            "S{}{}",
            C32_ALPHABET[self.version as usize] as char,
            c32_encode(&data)
        )
    }
}

impl std::fmt::Display for StacksAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.encode().fmt(f)
    }
}

/// `ripemd160(sha256(data))`.
pub fn hash160(data: &[u8]) -> [u8; HASH160_LEN] {
    let sha = Sha256::digest(data);
    Ripemd160::digest(sha).into()
}

const CHECKSUM_LEN: usize = 4;

/// First four bytes of `sha256(sha256(version ‖ payload))`.
fn c32_checksum(version: u8, payload: &[u8]) -> [u8; CHECKSUM_LEN] {
    let mut hasher = Sha256::new();
    hasher.update([version]);
    hasher.update(payload);
    let once = hasher.finalize();
    let twice = Sha256::digest(once);
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&twice[..CHECKSUM_LEN]);
    out
}

/// Maps one c32 character to its 5-bit value, folding the Crockford
/// ambiguities (lowercase, `O`→`0`, `I`/`L`→`1`).
fn c32_value(c: u8) -> Result<u8, AddressError> {
    let c = c.to_ascii_uppercase();
    let c = match c {
        b'O' => b'0',
        b'I' | b'L' => b'1',
        other => other,
    };
    C32_ALPHABET
        .iter()
        .position(|a| *a == c)
        .map(|v| v as u8)
        .ok_or(AddressError::BadCharacter)
}

fn c32_encode(data: &[u8]) -> String {
    let mut result: Vec<u8> = Vec::with_capacity(data.len() * 2);
    let mut carry: u16 = 0;
    let mut carry_bits: u8 = 0;

    for byte in data.iter().rev() {
        let low_bits_to_take = 5 - carry_bits;
        let low_bits = byte & ((1 << low_bits_to_take) - 1);
        let c32_value = ((low_bits as u16) << carry_bits) + carry;
        result.push(C32_ALPHABET[c32_value as usize]);
        carry_bits = (8 + carry_bits) - 5;
        carry = (*byte >> (8 - carry_bits)) as u16;
        if carry_bits >= 5 {
            result.push(C32_ALPHABET[(carry & 0x1f) as usize]);
            carry_bits -= 5;
            carry >>= 5;
        }
    }
    if carry_bits > 0 {
        result.push(C32_ALPHABET[carry as usize]);
    }

    // drop encoding zeros, then mirror the input's leading zero bytes
    while result.last() == Some(&C32_ALPHABET[0]) {
        result.pop();
    }
    for byte in data.iter() {
        if *byte == 0 {
            result.push(C32_ALPHABET[0]);
        } else {
            break;
        }
    }

    result.reverse();
    String::from_utf8(result).expect("c32 alphabet is ASCII")
}

fn c32_decode(input: &[u8]) -> Result<Vec<u8>, AddressError> {
    let mut result: Vec<u8> = Vec::with_capacity(input.len());
    let mut carry: u16 = 0;
    let mut carry_bits: u8 = 0;

    for c in input.iter().rev() {
        let value = c32_value(*c)? as u16;
        carry += value << carry_bits;
        carry_bits += 5;
        if carry_bits >= 8 {
            result.push((carry & 0xff) as u8);
            carry_bits -= 8;
            carry >>= 8;
        }
    }
    if carry_bits > 0 && carry != 0 {
        result.push(carry as u8);
    }

    while result.last() == Some(&0) {
        result.pop();
    }
    for c in input.iter() {
        if c32_value(*c)? == 0 {
            result.push(0);
        } else {
            break;
        }
    }

    result.reverse();
    Ok(result)
}
