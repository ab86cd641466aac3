//! NFT DIDs and their fixed-width slug encoding.
//!
//! A DID identifies an on-chain entity (vehicle, device, producer) by the
//! triple `(chain id, contract address, token id)`. Inside an index key it is
//! rendered as a 64 character hex slug:
//!
//! ```text
//! chain id (16 hex) | contract address (40 hex, EIP-55 case) | token id (8 hex)
//! ```

use std::fmt;
use std::str::FromStr;

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use super::error::IndexError;

/// Length of an encoded DID slug.
pub const DID_LENGTH: usize = CHAIN_ID_LENGTH + ADDRESS_LENGTH + TOKEN_ID_LENGTH;
/// Length of the chain id segment of a DID slug.
pub const CHAIN_ID_LENGTH: usize = 16;
/// Length of an unprefixed hex address.
pub const ADDRESS_LENGTH: usize = 40;
/// Length of the token id segment of a DID slug.
pub const TOKEN_ID_LENGTH: usize = 8;

/// Method prefix of the string form of an NFT DID.
pub const NFT_DID_PREFIX: &str = "did:nft:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NftDid {
    pub chain_id: u64,
    pub contract_address: Address,
    pub token_id: u32,
}

impl NftDid {
    pub fn new(chain_id: u64, contract_address: Address, token_id: u32) -> Self {
        Self {
            chain_id,
            contract_address,
            token_id,
        }
    }

    /// Render the 64 character index slug.
    pub fn encode(&self) -> String {
        format!(
            "{:016x}{}{:08x}",
            self.chain_id,
            encode_address(&self.contract_address),
            self.token_id
        )
    }

    /// Parse a 64 character index slug. Exact inverse of [`NftDid::encode`].
    pub fn decode(slug: &str) -> Result<Self, IndexError> {
        if slug.len() != DID_LENGTH || !slug.is_ascii() {
            return Err(IndexError::format(format!(
                "NFT DID slug must be {} ASCII characters, got {:?}",
                DID_LENGTH, slug
            )));
        }

        let (chain_part, rest) = slug.split_at(CHAIN_ID_LENGTH);
        let (contract_part, token_part) = rest.split_at(ADDRESS_LENGTH);

        let chain_id = parse_hex_u64("chain ID", chain_part)?;
        let contract_address = decode_address(contract_part)?;
        let token_id = parse_hex_u64("token ID", token_part)? as u32;

        Ok(Self {
            chain_id,
            contract_address,
            token_id,
        })
    }
}

/// `did:nft:<chain id>:<0x checksummed address>_<token id>`
impl fmt::Display for NftDid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}:{}_{}",
            NFT_DID_PREFIX,
            self.chain_id,
            self.contract_address.to_checksum(None),
            self.token_id
        )
    }
}

impl FromStr for NftDid {
    type Err = IndexError;

    fn from_str(did: &str) -> Result<Self, Self::Err> {
        let malformed = || IndexError::format(format!("{:?} is not an NFT DID", did));

        let body = did.strip_prefix(NFT_DID_PREFIX).ok_or_else(malformed)?;
        let (chain_part, rest) = body.split_once(':').ok_or_else(malformed)?;
        let (contract_part, token_part) = rest.split_once('_').ok_or_else(malformed)?;

        let chain_id = parse_decimal::<u64>(chain_part)
            .ok_or_else(|| IndexError::format(format!("invalid chain ID in {:?}", did)))?;
        let token_id = parse_decimal::<u32>(token_part)
            .ok_or_else(|| IndexError::format(format!("invalid token ID in {:?}", did)))?;
        let contract_address = decode_address(contract_part)?;

        Ok(Self {
            chain_id,
            contract_address,
            token_id,
        })
    }
}

/// Encode an address as EIP-55 checksummed hex without the `0x` prefix.
pub fn encode_address(address: &Address) -> String {
    let checksummed = address.to_checksum(None);
    checksummed
        .strip_prefix("0x")
        .unwrap_or(&checksummed)
        .to_string()
}

/// Decode a 40 character hex address. The `0x` prefix is optional and case is
/// ignored.
pub fn decode_address(encoded: &str) -> Result<Address, IndexError> {
    let hex = encoded
        .strip_prefix("0x")
        .or_else(|| encoded.strip_prefix("0X"))
        .unwrap_or(encoded);

    if hex.len() != ADDRESS_LENGTH || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(IndexError::InvalidAddress(format!(
            "{:?} is not a valid hex-encoded Ethereum address",
            encoded
        )));
    }

    hex.parse::<Address>()
        .map_err(|e| IndexError::InvalidAddress(format!("{:?}: {}", encoded, e)))
}

/// Unsigned decimal with digits only; `str::parse` would accept a `+` sign.
fn parse_decimal<T: FromStr>(part: &str) -> Option<T> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

fn parse_hex_u64(field: &'static str, part: &str) -> Result<u64, IndexError> {
    // from_str_radix tolerates a leading sign, the slug never carries one
    if !part.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(IndexError::InvalidNumeric {
            field,
            value: part.to_string(),
        });
    }
    u64::from_str_radix(part, 16).map_err(|_| IndexError::InvalidNumeric {
        field,
        value: part.to_string(),
    })
}
