use crate::core::Address;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountRefError {
    #[error("Signer index {index} out of range ({count} signers)")]
    IndexOutOfRange { index: usize, count: usize },
    #[error("Not a signer index or address: {0}")]
    Unparseable(String),
}

/// Deterministic development accounts: first 20 bytes of SHA3-256("<seed>/<index>")
pub fn derive_signers(seed: &str, count: usize) -> Vec<Address> {
    (0..count)
        .map(|index| Address::derive(format!("{}/{}", seed, index).as_bytes()))
        .collect()
}

/// Resolve "3" (signer index) or "0x..." (raw address) to an address
pub fn resolve_account(signers: &[Address], raw: &str) -> Result<Address, AccountRefError> {
    let raw = raw.trim();
    if raw.starts_with("0x") || raw.starts_with("0X") {
        return raw
            .parse()
            .map_err(|_| AccountRefError::Unparseable(raw.to_string()));
    }

    let index: usize = raw
        .parse()
        .map_err(|_| AccountRefError::Unparseable(raw.to_string()))?;
    signers
        .get(index)
        .copied()
        .ok_or(AccountRefError::IndexOutOfRange { index, count: signers.len() })
}
