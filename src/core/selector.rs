use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    #[error("Invalid hex in interface id: {0}")]
    InvalidHex(String),
    #[error("Invalid interface id length: expected 4 bytes, got {0}")]
    InvalidLength(usize),
}

/// 4-byte capability identifier (ERC165 interface id)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterfaceId([u8; 4]);

impl InterfaceId {
    /// ERC165 itself: supportsInterface(bytes4)
    pub const ERC165: InterfaceId = InterfaceId([0x01, 0xff, 0xc9, 0xa7]);
    /// ERC721 ownership and transfer
    pub const ERC721: InterfaceId = InterfaceId([0x80, 0xac, 0x58, 0xcd]);
    /// ERC721 metadata extension
    pub const ERC721_METADATA: InterfaceId = InterfaceId([0x5b, 0x5e, 0x13, 0x9f]);
    /// Reserved by ERC165, must never be reported as supported
    pub const INVALID: InterfaceId = InterfaceId([0xff, 0xff, 0xff, 0xff]);

    pub const fn new(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// XOR of the function selectors of every signature in the interface
    pub fn from_signatures(signatures: &[&str]) -> Self {
        let id = signatures
            .iter()
            .map(|sig| function_selector(sig))
            .fold([0u8; 4], |mut acc, sel| {
                for (a, s) in acc.iter_mut().zip(sel) {
                    *a ^= s;
                }
                acc
            });
        Self(id)
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

/// First 4 bytes of Keccak-256 over a canonical function signature
pub fn function_selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Canonical ERC721 signatures (safeTransferFrom appears in both overloads)
pub const ERC721_SIGNATURES: &[&str] = &[
    "balanceOf(address)",
    "ownerOf(uint256)",
    "safeTransferFrom(address,address,uint256,bytes)",
    "safeTransferFrom(address,address,uint256)",
    "transferFrom(address,address,uint256)",
    "approve(address,uint256)",
    "setApprovalForAll(address,bool)",
    "getApproved(uint256)",
    "isApprovedForAll(address,address)",
];

pub const ERC721_METADATA_SIGNATURES: &[&str] = &["name()", "symbol()", "tokenURI(uint256)"];

pub const ERC165_SIGNATURES: &[&str] = &["supportsInterface(bytes4)"];

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InterfaceId({})", self)
    }
}

impl FromStr for InterfaceId {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
        let decoded = hex::decode(raw).map_err(|_| SelectorError::InvalidHex(s.to_string()))?;
        let bytes: [u8; 4] = decoded
            .as_slice()
            .try_into()
            .map_err(|_| SelectorError::InvalidLength(decoded.len()))?;
        Ok(Self(bytes))
    }
}

impl Serialize for InterfaceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for InterfaceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
