use crate::contracts::Event;
use crate::core::{Address, Amount, InterfaceId, TokenId};
use serde::{Deserialize, Serialize};

/// Gas costs for contract operations (in gas units)
pub mod gas_costs {
    pub const BASE_CALL: u64 = 1_000;
    pub const BASE_DEPLOY: u64 = 50_000;
    pub const STORAGE_READ: u64 = 100;
    pub const STORAGE_WRITE: u64 = 200;
    pub const EVENT: u64 = 50;
}

/// Contract construction parameters
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "standard", rename_all = "snake_case")]
pub enum Deployment {
    /// Decimals is kept textual, matching how deploy scripts pass it ("18")
    Fungible { name: String, symbol: String, decimals: String },
    NonFungible { name: String, symbol: String, base_uri: String },
}

/// Calls understood by a fungible ledger
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum FungibleCall {
    Mint { to: Address, amount: Amount },
    Transfer { to: Address, amount: Amount },
    Approve { spender: Address, amount: Amount },
    TransferFrom { from: Address, to: Address, amount: Amount },
    Burn { amount: Amount },
    BalanceOf { account: Address },
    Allowance { owner: Address, spender: Address },
    TotalSupply,
    Name,
    Symbol,
    Decimals,
}

impl FungibleCall {
    pub fn method(&self) -> &'static str {
        match self {
            FungibleCall::Mint { .. } => "mint",
            FungibleCall::Transfer { .. } => "transfer",
            FungibleCall::Approve { .. } => "approve",
            FungibleCall::TransferFrom { .. } => "transferFrom",
            FungibleCall::Burn { .. } => "burn",
            FungibleCall::BalanceOf { .. } => "balanceOf",
            FungibleCall::Allowance { .. } => "allowance",
            FungibleCall::TotalSupply => "totalSupply",
            FungibleCall::Name => "name",
            FungibleCall::Symbol => "symbol",
            FungibleCall::Decimals => "decimals",
        }
    }

    /// (storage reads, storage writes)
    fn storage_access(&self) -> (u64, u64) {
        match self {
            FungibleCall::Mint { .. } | FungibleCall::Burn { .. } => (2, 2),
            FungibleCall::Transfer { .. } => (2, 2),
            FungibleCall::Approve { .. } => (0, 1),
            FungibleCall::TransferFrom { .. } => (3, 3),
            _ => (1, 0),
        }
    }
}

/// Calls understood by a non-fungible registry
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum NonFungibleCall {
    Mint { to: Address, token_id: TokenId },
    Approve { to: Address, token_id: TokenId },
    SetApprovalForAll { operator: Address, approved: bool },
    TransferFrom { from: Address, to: Address, token_id: TokenId },
    Burn { token_id: TokenId },
    SupportsInterface { interface_id: InterfaceId },
    BalanceOf { owner: Address },
    OwnerOf { token_id: TokenId },
    GetApproved { token_id: TokenId },
    IsApprovedForAll { owner: Address, operator: Address },
    #[serde(rename = "tokenURI")]
    TokenUri { token_id: TokenId },
    Name,
    Symbol,
}

impl NonFungibleCall {
    pub fn method(&self) -> &'static str {
        match self {
            NonFungibleCall::Mint { .. } => "mint",
            NonFungibleCall::Approve { .. } => "approve",
            NonFungibleCall::SetApprovalForAll { .. } => "setApprovalForAll",
            NonFungibleCall::TransferFrom { .. } => "transferFrom",
            NonFungibleCall::Burn { .. } => "burn",
            NonFungibleCall::SupportsInterface { .. } => "supportsInterface",
            NonFungibleCall::BalanceOf { .. } => "balanceOf",
            NonFungibleCall::OwnerOf { .. } => "ownerOf",
            NonFungibleCall::GetApproved { .. } => "getApproved",
            NonFungibleCall::IsApprovedForAll { .. } => "isApprovedForAll",
            NonFungibleCall::TokenUri { .. } => "tokenURI",
            NonFungibleCall::Name => "name",
            NonFungibleCall::Symbol => "symbol",
        }
    }

    fn storage_access(&self) -> (u64, u64) {
        match self {
            NonFungibleCall::Mint { .. } => (2, 2),
            NonFungibleCall::Approve { .. } => (2, 1),
            NonFungibleCall::SetApprovalForAll { .. } => (0, 1),
            NonFungibleCall::TransferFrom { .. } => (4, 4),
            NonFungibleCall::Burn { .. } => (3, 3),
            // Static interface table, no storage touched
            NonFungibleCall::SupportsInterface { .. } => (0, 0),
            _ => (1, 0),
        }
    }
}

/// A call routed to a deployed contract
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Call {
    Fungible(FungibleCall),
    NonFungible(NonFungibleCall),
}

impl Call {
    pub fn method(&self) -> &'static str {
        match self {
            Call::Fungible(call) => call.method(),
            Call::NonFungible(call) => call.method(),
        }
    }

    /// Read-only calls never change state
    pub fn is_view(&self) -> bool {
        let (_, writes) = self.storage_access();
        writes == 0
    }

    /// Gas charged before execution (events are charged afterwards)
    pub fn base_gas(&self) -> u64 {
        let (reads, writes) = self.storage_access();
        gas_costs::BASE_CALL + reads * gas_costs::STORAGE_READ + writes * gas_costs::STORAGE_WRITE
    }

    fn storage_access(&self) -> (u64, u64) {
        match self {
            Call::Fungible(call) => call.storage_access(),
            Call::NonFungible(call) => call.storage_access(),
        }
    }
}

impl From<FungibleCall> for Call {
    fn from(call: FungibleCall) -> Self {
        Call::Fungible(call)
    }
}

impl From<NonFungibleCall> for Call {
    fn from(call: NonFungibleCall) -> Self {
        Call::NonFungible(call)
    }
}

/// Value returned by a call
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallOutput {
    None,
    Amount(Amount),
    Count(u64),
    Bool(bool),
    Address(Address),
    Text(String),
}

impl CallOutput {
    pub fn as_amount(&self) -> Option<Amount> {
        match self {
            CallOutput::Amount(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CallOutput::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_address(&self) -> Option<Address> {
        match self {
            CallOutput::Address(value) => Some(*value),
            _ => None,
        }
    }
}

impl std::fmt::Display for CallOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallOutput::None => write!(f, "()"),
            CallOutput::Amount(v) => write!(f, "{}", v),
            CallOutput::Count(v) => write!(f, "{}", v),
            CallOutput::Bool(v) => write!(f, "{}", v),
            CallOutput::Address(v) => write!(f, "{}", v),
            CallOutput::Text(v) => write!(f, "{}", v),
        }
    }
}

/// Result of a committed state-changing call
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Receipt {
    pub tx_hash: String,
    pub block_number: u64,
    pub caller: Address,
    pub contract: Address,
    pub call: Call,
    pub output: CallOutput,
    pub events: Vec<Event>,
    pub gas_used: u64,
    pub timestamp: i64,
}
