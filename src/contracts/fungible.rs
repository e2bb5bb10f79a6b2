/// Fungible token ledger (ERC20-style)
/// Balances and allowances are owned by the ledger value, so every
/// deployment is independent of every other.

use crate::contracts::events::Event;
use crate::core::{Address, Amount};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FungibleError {
    #[error("Insufficient balance: {account} has {balance}, needs {needed}")]
    InsufficientBalance { account: Address, balance: Amount, needed: Amount },
    #[error("Insufficient allowance: {spender} may move {allowance} from {owner}, needs {needed}")]
    InsufficientAllowance {
        owner: Address,
        spender: Address,
        allowance: Amount,
        needed: Amount,
    },
    #[error("Invalid receiver: {0}")]
    InvalidReceiver(Address),
    #[error("Invalid sender: {0}")]
    InvalidSender(Address),
    #[error("Invalid spender: {0}")]
    InvalidSpender(Address),
    #[error("Invalid decimals: {0}")]
    InvalidDecimals(String),
    #[error("Total supply overflow")]
    SupplyOverflow,
}

/// Parse the decimals construction parameter ("18" or 18)
pub fn parse_decimals(raw: &str) -> Result<u8, FungibleError> {
    raw.trim()
        .parse::<u8>()
        .map_err(|_| FungibleError::InvalidDecimals(raw.to_string()))
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FungibleLedger {
    name: String,
    symbol: String,
    decimals: u8,
    total_supply: Amount,
    balances: HashMap<Address, Amount>,
    allowances: HashMap<Address, HashMap<Address, Amount>>,
}

impl FungibleLedger {
    pub fn new(name: impl Into<String>, symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            decimals,
            total_supply: 0,
            balances: HashMap::new(),
            allowances: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    /// Balance of an account, zero if it was never referenced
    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Amount `spender` may still move out of `owner`'s balance
    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(owner)
            .and_then(|spenders| spenders.get(spender))
            .copied()
            .unwrap_or(0)
    }

    /// Create `amount` new tokens in `to`'s balance
    pub fn mint(&mut self, to: Address, amount: Amount) -> Result<Vec<Event>, FungibleError> {
        if to.is_zero() {
            return Err(FungibleError::InvalidReceiver(to));
        }
        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(FungibleError::SupplyOverflow)?;

        // supply bounds every balance, so the credit cannot overflow
        self.total_supply = supply;
        *self.balances.entry(to).or_insert(0) += amount;

        Ok(vec![Event::Transfer { from: Address::ZERO, to, value: amount }])
    }

    /// Destroy `amount` of the caller's tokens
    pub fn burn(&mut self, caller: Address, amount: Amount) -> Result<Vec<Event>, FungibleError> {
        if caller.is_zero() {
            return Err(FungibleError::InvalidSender(caller));
        }
        self.debit(caller, amount)?;
        self.total_supply -= amount;

        Ok(vec![Event::Transfer { from: caller, to: Address::ZERO, value: amount }])
    }

    /// Move `amount` from the caller to `to`
    pub fn transfer(
        &mut self,
        caller: Address,
        to: Address,
        amount: Amount,
    ) -> Result<Vec<Event>, FungibleError> {
        self.move_balance(caller, to, amount)?;
        Ok(vec![Event::Transfer { from: caller, to, value: amount }])
    }

    /// Set (not add to) the caller's allowance for `spender`
    pub fn approve(
        &mut self,
        caller: Address,
        spender: Address,
        amount: Amount,
    ) -> Result<Vec<Event>, FungibleError> {
        if caller.is_zero() {
            return Err(FungibleError::InvalidSender(caller));
        }
        if spender.is_zero() {
            return Err(FungibleError::InvalidSpender(spender));
        }
        self.allowances.entry(caller).or_default().insert(spender, amount);

        Ok(vec![Event::Approval { owner: caller, spender, value: amount }])
    }

    /// Move `amount` from `owner` to `to` on behalf of the caller
    pub fn transfer_from(
        &mut self,
        caller: Address,
        owner: Address,
        to: Address,
        amount: Amount,
    ) -> Result<Vec<Event>, FungibleError> {
        let allowance = self.allowance(&owner, &caller);
        if allowance < amount {
            return Err(FungibleError::InsufficientAllowance {
                owner,
                spender: caller,
                allowance,
                needed: amount,
            });
        }

        // Validate the move before touching the allowance so a failure leaves both intact
        self.check_move(owner, to, amount)?;

        // Amount::MAX is an infinite approval
        if allowance != Amount::MAX {
            self.allowances
                .entry(owner)
                .or_default()
                .insert(caller, allowance - amount);
        }
        self.move_balance(owner, to, amount)?;

        Ok(vec![Event::Transfer { from: owner, to, value: amount }])
    }

    fn check_move(&self, from: Address, to: Address, amount: Amount) -> Result<(), FungibleError> {
        if from.is_zero() {
            return Err(FungibleError::InvalidSender(from));
        }
        if to.is_zero() {
            return Err(FungibleError::InvalidReceiver(to));
        }
        let balance = self.balance_of(&from);
        if balance < amount {
            return Err(FungibleError::InsufficientBalance {
                account: from,
                balance,
                needed: amount,
            });
        }
        Ok(())
    }

    fn move_balance(&mut self, from: Address, to: Address, amount: Amount) -> Result<(), FungibleError> {
        self.check_move(from, to, amount)?;
        self.debit(from, amount)?;
        *self.balances.entry(to).or_insert(0) += amount;
        Ok(())
    }

    fn debit(&mut self, account: Address, amount: Amount) -> Result<(), FungibleError> {
        let balance = self.balance_of(&account);
        if balance < amount {
            return Err(FungibleError::InsufficientBalance {
                account,
                balance,
                needed: amount,
            });
        }
        self.balances.insert(account, balance - amount);
        Ok(())
    }

    /// Sum of all balances (equals total supply)
    pub fn circulating(&self) -> Amount {
        self.balances.values().sum()
    }
}
