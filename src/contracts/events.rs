use crate::core::{Address, Amount, TokenId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Log entry emitted by a contract call
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// Fungible value moved (from = null on mint, to = null on burn)
    Transfer { from: Address, to: Address, value: Amount },
    /// Fungible allowance set
    Approval { owner: Address, spender: Address, value: Amount },
    /// Item ownership moved
    NftTransfer { from: Address, to: Address, token_id: TokenId },
    /// Single-item approval set (approved = null clears it)
    NftApproval { owner: Address, approved: Address, token_id: TokenId },
    ApprovalForAll { owner: Address, operator: Address, approved: bool },
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Transfer { from, to, value } => write!(f, "Transfer({} -> {}, {})", from, to, value),
            Event::Approval { owner, spender, value } => {
                write!(f, "Approval({} -> {}, {})", owner, spender, value)
            }
            Event::NftTransfer { from, to, token_id } => {
                write!(f, "Transfer({} -> {}, #{})", from, to, token_id)
            }
            Event::NftApproval { owner, approved, token_id } => {
                write!(f, "Approval({} -> {}, #{})", owner, approved, token_id)
            }
            Event::ApprovalForAll { owner, operator, approved } => {
                write!(f, "ApprovalForAll({} -> {}, {})", owner, operator, approved)
            }
        }
    }
}
