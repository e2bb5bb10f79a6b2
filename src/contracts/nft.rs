/// Non-fungible token registry (ERC721-style)
/// Tracks item ownership, per-item and operator approvals, and answers
/// ERC165 capability queries from a fixed interface set.

use crate::contracts::events::Event;
use crate::core::{Address, InterfaceId, TokenId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Interfaces this registry reports as supported
pub const SUPPORTED_INTERFACES: &[InterfaceId] = &[
    InterfaceId::ERC165,
    InterfaceId::ERC721,
    InterfaceId::ERC721_METADATA,
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NonFungibleError {
    #[error("Nonexistent token: #{0}")]
    NonexistentToken(TokenId),
    #[error("Token already minted: #{0}")]
    TokenAlreadyMinted(TokenId),
    #[error("Invalid owner: {0}")]
    InvalidOwner(Address),
    #[error("Incorrect owner of #{token_id}: claimed {claimed}, actual {owner}")]
    IncorrectOwner { token_id: TokenId, claimed: Address, owner: Address },
    #[error("Insufficient approval: {operator} may not move #{token_id}")]
    InsufficientApproval { operator: Address, token_id: TokenId },
    #[error("Invalid approver: {0}")]
    InvalidApprover(Address),
    #[error("Invalid operator: {0}")]
    InvalidOperator(Address),
    #[error("Invalid receiver: {0}")]
    InvalidReceiver(Address),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonFungibleRegistry {
    name: String,
    symbol: String,
    base_uri: String,
    owners: HashMap<TokenId, Address>,
    balances: HashMap<Address, u64>,
    token_approvals: HashMap<TokenId, Address>,
    operator_approvals: HashMap<Address, HashMap<Address, bool>>,
}

impl NonFungibleRegistry {
    pub fn new(
        name: impl Into<String>,
        symbol: impl Into<String>,
        base_uri: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            base_uri: base_uri.into(),
            owners: HashMap::new(),
            balances: HashMap::new(),
            token_approvals: HashMap::new(),
            operator_approvals: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    /// ERC165 capability lookup. Never fails.
    pub fn supports_interface(&self, id: InterfaceId) -> bool {
        SUPPORTED_INTERFACES.contains(&id)
    }

    pub fn total_minted(&self) -> usize {
        self.owners.len()
    }

    pub fn balance_of(&self, owner: &Address) -> Result<u64, NonFungibleError> {
        if owner.is_zero() {
            return Err(NonFungibleError::InvalidOwner(*owner));
        }
        Ok(self.balances.get(owner).copied().unwrap_or(0))
    }

    pub fn owner_of(&self, token_id: TokenId) -> Result<Address, NonFungibleError> {
        self.owners
            .get(&token_id)
            .copied()
            .ok_or(NonFungibleError::NonexistentToken(token_id))
    }

    pub fn get_approved(&self, token_id: TokenId) -> Result<Address, NonFungibleError> {
        self.owner_of(token_id)?;
        Ok(self.token_approvals.get(&token_id).copied().unwrap_or(Address::ZERO))
    }

    pub fn is_approved_for_all(&self, owner: &Address, operator: &Address) -> bool {
        self.operator_approvals
            .get(owner)
            .and_then(|ops| ops.get(operator))
            .copied()
            .unwrap_or(false)
    }

    /// `base_uri` followed by the decimal token id, empty when no base is set
    pub fn token_uri(&self, token_id: TokenId) -> Result<String, NonFungibleError> {
        self.owner_of(token_id)?;
        if self.base_uri.is_empty() {
            Ok(String::new())
        } else {
            Ok(format!("{}{}", self.base_uri, token_id))
        }
    }

    pub fn mint(&mut self, to: Address, token_id: TokenId) -> Result<Vec<Event>, NonFungibleError> {
        if to.is_zero() {
            return Err(NonFungibleError::InvalidReceiver(to));
        }
        if self.owners.contains_key(&token_id) {
            return Err(NonFungibleError::TokenAlreadyMinted(token_id));
        }

        self.owners.insert(token_id, to);
        *self.balances.entry(to).or_insert(0) += 1;

        Ok(vec![Event::NftTransfer { from: Address::ZERO, to, token_id }])
    }

    /// Approve `to` for one token. Caller must own it or operate for its owner.
    pub fn approve(
        &mut self,
        caller: Address,
        to: Address,
        token_id: TokenId,
    ) -> Result<Vec<Event>, NonFungibleError> {
        let owner = self.owner_of(token_id)?;
        if caller != owner && !self.is_approved_for_all(&owner, &caller) {
            return Err(NonFungibleError::InvalidApprover(caller));
        }

        self.token_approvals.insert(token_id, to);
        Ok(vec![Event::NftApproval { owner, approved: to, token_id }])
    }

    pub fn set_approval_for_all(
        &mut self,
        caller: Address,
        operator: Address,
        approved: bool,
    ) -> Result<Vec<Event>, NonFungibleError> {
        if operator.is_zero() {
            return Err(NonFungibleError::InvalidOperator(operator));
        }

        self.operator_approvals
            .entry(caller)
            .or_default()
            .insert(operator, approved);
        Ok(vec![Event::ApprovalForAll { owner: caller, operator, approved }])
    }

    pub fn transfer_from(
        &mut self,
        caller: Address,
        from: Address,
        to: Address,
        token_id: TokenId,
    ) -> Result<Vec<Event>, NonFungibleError> {
        if to.is_zero() {
            return Err(NonFungibleError::InvalidReceiver(to));
        }
        let owner = self.owner_of(token_id)?;
        self.check_authorized(owner, caller, token_id)?;
        if owner != from {
            return Err(NonFungibleError::IncorrectOwner { token_id, claimed: from, owner });
        }

        self.token_approvals.remove(&token_id);
        self.decrement_balance(from);
        *self.balances.entry(to).or_insert(0) += 1;
        self.owners.insert(token_id, to);

        Ok(vec![Event::NftTransfer { from, to, token_id }])
    }

    pub fn burn(&mut self, caller: Address, token_id: TokenId) -> Result<Vec<Event>, NonFungibleError> {
        let owner = self.owner_of(token_id)?;
        self.check_authorized(owner, caller, token_id)?;

        self.token_approvals.remove(&token_id);
        self.decrement_balance(owner);
        self.owners.remove(&token_id);

        Ok(vec![Event::NftTransfer { from: owner, to: Address::ZERO, token_id }])
    }

    fn check_authorized(
        &self,
        owner: Address,
        operator: Address,
        token_id: TokenId,
    ) -> Result<(), NonFungibleError> {
        let approved = self.token_approvals.get(&token_id) == Some(&operator);
        if operator == owner || approved || self.is_approved_for_all(&owner, &operator) {
            Ok(())
        } else {
            Err(NonFungibleError::InsufficientApproval { operator, token_id })
        }
    }

    fn decrement_balance(&mut self, owner: Address) {
        if let Some(count) = self.balances.get_mut(&owner) {
            *count = count.saturating_sub(1);
        }
    }
}
