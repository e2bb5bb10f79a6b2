/// In-process execution environment for token contracts
/// Every state-changing call runs against a working copy of the target
/// contract and is committed only when it succeeds within its gas limit.

use crate::config::RuntimeConfig;
use crate::contracts::{
    Contract, ContractError, Event, FungibleLedger, NonFungibleRegistry, parse_decimals,
};
use crate::core::Address;
use crate::metrics;
use crate::runtime::call::{
    gas_costs, Call, CallOutput, Deployment, FungibleCall, NonFungibleCall, Receipt,
};
use crate::runtime::signers::derive_signers;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("Reverted: {0}")]
    Reverted(#[from] ContractError),
    #[error("Out of gas: used {used}, limit {limit}")]
    OutOfGas { limit: u64, used: u64 },
    #[error("Unknown contract: {0}")]
    UnknownContract(Address),
    #[error("Call {method} not supported by {kind} contract")]
    UnsupportedCall { kind: &'static str, method: &'static str },
    #[error("Call {0} is read-only, use query")]
    ViewCall(&'static str),
    #[error("Call {0} changes state, use execute")]
    StateChangingQuery(&'static str),
    #[error("Invalid deployment: {0}")]
    InvalidDeployment(String),
}

/// Failure of a call whose result must also reach durable storage
#[derive(Error, Debug)]
pub enum CommitError<E> {
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error("Persist failed, call rolled back: {0}")]
    Persist(E),
}

/// Gas meter for tracking execution costs
#[derive(Clone, Debug)]
pub struct GasMeter {
    gas_limit: u64,
    gas_used: u64,
}

impl GasMeter {
    pub fn new(gas_limit: u64) -> Self {
        Self {
            gas_limit,
            gas_used: 0,
        }
    }

    pub fn consume(&mut self, amount: u64) -> Result<(), RuntimeError> {
        self.gas_used = self.gas_used.saturating_add(amount);
        if self.gas_used > self.gas_limit {
            Err(RuntimeError::OutOfGas {
                limit: self.gas_limit,
                used: self.gas_used,
            })
        } else {
            Ok(())
        }
    }

    pub fn remaining(&self) -> u64 {
        self.gas_limit.saturating_sub(self.gas_used)
    }

    pub fn used(&self) -> u64 {
        self.gas_used
    }
}

/// Everything that persists between calls
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldState {
    pub contracts: BTreeMap<Address, Contract>,
    pub nonces: HashMap<Address, u64>,
    pub block_number: u64,
    pub calls_executed: u64,
    pub calls_reverted: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RuntimeStats {
    pub chain_id: u64,
    pub block_number: u64,
    pub fungible_contracts: usize,
    pub non_fungible_contracts: usize,
    pub calls_executed: u64,
    pub calls_reverted: u64,
    pub signers: usize,
}

/// Serialized, all-or-nothing call execution over a set of deployed contracts
pub struct Runtime {
    config: RuntimeConfig,
    signers: Vec<Address>,
    state: WorldState,
}

impl Runtime {
    pub fn new(config: RuntimeConfig) -> Self {
        Self::with_state(config, WorldState::default())
    }

    /// Resume from previously persisted state
    pub fn with_state(config: RuntimeConfig, state: WorldState) -> Self {
        let signers = derive_signers(&config.signer_seed, config.signer_count);
        Self { config, signers, state }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn signers(&self) -> &[Address] {
        &self.signers
    }

    pub fn state(&self) -> &WorldState {
        &self.state
    }

    pub fn block_number(&self) -> u64 {
        self.state.block_number
    }

    pub fn nonce(&self, account: &Address) -> u64 {
        self.state.nonces.get(account).copied().unwrap_or(0)
    }

    pub fn contract(&self, address: &Address) -> Option<&Contract> {
        self.state.contracts.get(address)
    }

    pub fn contracts(&self) -> impl Iterator<Item = (&Address, &Contract)> {
        self.state.contracts.iter()
    }

    pub fn stats(&self) -> RuntimeStats {
        let fungible = self
            .state
            .contracts
            .values()
            .filter(|c| matches!(c, Contract::Fungible(_)))
            .count();
        RuntimeStats {
            chain_id: self.config.chain_id,
            block_number: self.state.block_number,
            fungible_contracts: fungible,
            non_fungible_contracts: self.state.contracts.len() - fungible,
            calls_executed: self.state.calls_executed,
            calls_reverted: self.state.calls_reverted,
            signers: self.signers.len(),
        }
    }

    /// Deploy a contract. Its address is derived from the deployer and its nonce.
    pub fn deploy(&mut self, deployer: Address, deployment: Deployment) -> Result<Address, RuntimeError> {
        let mut meter = GasMeter::new(self.config.gas_limit);
        meter.consume(gas_costs::BASE_DEPLOY)?;

        let contract = match deployment {
            Deployment::Fungible { name, symbol, decimals } => {
                let decimals = parse_decimals(&decimals)
                    .map_err(|e| RuntimeError::InvalidDeployment(e.to_string()))?;
                Contract::Fungible(FungibleLedger::new(name, symbol, decimals))
            }
            Deployment::NonFungible { name, symbol, base_uri } => {
                Contract::NonFungible(NonFungibleRegistry::new(name, symbol, base_uri))
            }
        };

        let nonce = self.nonce(&deployer);
        let address = contract_address(&deployer, nonce);

        tracing::info!(
            "Deployed {} contract {} ({}) at {}",
            contract.kind(),
            contract.name(),
            contract.symbol(),
            address
        );
        self.state.contracts.insert(address, contract);
        self.state.nonces.insert(deployer, nonce + 1);
        self.state.block_number += 1;
        metrics::record_deployment(self.state.block_number);

        Ok(address)
    }

    /// Run `op` and hand its result to `persist`. When persisting fails the
    /// world state is restored to where it stood before `op` ran.
    pub fn commit<T, E>(
        &mut self,
        op: impl FnOnce(&mut Self) -> Result<T, RuntimeError>,
        persist: impl FnOnce(&Self, &T) -> Result<(), E>,
    ) -> Result<T, CommitError<E>> {
        let checkpoint = self.state.clone();
        let output = op(self)?;
        if let Err(e) = persist(self, &output) {
            tracing::warn!(
                "Persist failed at block {}, rolling back to block {}",
                self.state.block_number,
                checkpoint.block_number
            );
            self.state = checkpoint;
            metrics::set_block_number(self.state.block_number);
            return Err(CommitError::Persist(e));
        }
        Ok(output)
    }

    /// Execute a state-changing call as `caller`
    pub fn execute(&mut self, caller: Address, contract: Address, call: Call) -> Result<Receipt, RuntimeError> {
        match self.try_execute(caller, contract, &call) {
            Ok(receipt) => {
                metrics::record_call(receipt.gas_used, receipt.block_number);
                tracing::debug!(
                    "Committed {} on {} from {} (gas {})",
                    call.method(),
                    contract,
                    caller,
                    receipt.gas_used
                );
                Ok(receipt)
            }
            Err(e) => {
                self.state.calls_reverted += 1;
                metrics::record_revert();
                tracing::warn!("Call {} on {} from {} reverted: {}", call.method(), contract, caller, e);
                Err(e)
            }
        }
    }

    fn try_execute(&mut self, caller: Address, contract: Address, call: &Call) -> Result<Receipt, RuntimeError> {
        if call.is_view() {
            return Err(RuntimeError::ViewCall(call.method()));
        }
        let current = self
            .state
            .contracts
            .get(&contract)
            .ok_or(RuntimeError::UnknownContract(contract))?;

        let mut meter = GasMeter::new(self.config.gas_limit);
        meter.consume(call.base_gas())?;

        let mut working = current.clone();
        let (output, events) = apply(&mut working, caller, call)?;
        meter.consume(events.len() as u64 * gas_costs::EVENT)?;

        // Commit
        let nonce = self.nonce(&caller);
        self.state.contracts.insert(contract, working);
        self.state.nonces.insert(caller, nonce + 1);
        self.state.block_number += 1;
        self.state.calls_executed += 1;

        Ok(Receipt {
            tx_hash: transaction_hash(&caller, &contract, nonce, call),
            block_number: self.state.block_number,
            caller,
            contract,
            call: call.clone(),
            output,
            events,
            gas_used: meter.used(),
            timestamp: chrono::Utc::now().timestamp(),
        })
    }

    /// Evaluate a read-only call against current state
    pub fn query(&self, contract: Address, call: &Call) -> Result<CallOutput, RuntimeError> {
        if !call.is_view() {
            return Err(RuntimeError::StateChangingQuery(call.method()));
        }
        let current = self
            .state
            .contracts
            .get(&contract)
            .ok_or(RuntimeError::UnknownContract(contract))?;
        read(current, call)
    }
}

/// Derive a contract address from its deployer and the deployer's nonce
pub fn contract_address(deployer: &Address, nonce: u64) -> Address {
    let mut data = deployer.as_bytes().to_vec();
    data.extend_from_slice(&nonce.to_le_bytes());
    data.extend_from_slice(b"contract");
    Address::derive(&data)
}

fn transaction_hash(caller: &Address, contract: &Address, nonce: u64, call: &Call) -> String {
    let mut hasher = Sha3_256::new();
    hasher.update(caller.as_bytes());
    hasher.update(contract.as_bytes());
    hasher.update(nonce.to_le_bytes());
    // Call serialization cannot fail (no non-string map keys)
    hasher.update(serde_json::to_vec(call).unwrap_or_default());
    format!("0x{}", hex::encode(hasher.finalize()))
}

fn unsupported(contract: &Contract, call: &Call) -> RuntimeError {
    RuntimeError::UnsupportedCall {
        kind: contract.kind(),
        method: call.method(),
    }
}

fn apply(contract: &mut Contract, caller: Address, call: &Call) -> Result<(CallOutput, Vec<Event>), RuntimeError> {
    let events = match (&mut *contract, call) {
        (Contract::Fungible(ledger), Call::Fungible(call)) => match call {
            FungibleCall::Mint { to, amount } => ledger.mint(*to, *amount),
            FungibleCall::Transfer { to, amount } => ledger.transfer(caller, *to, *amount),
            FungibleCall::Approve { spender, amount } => ledger.approve(caller, *spender, *amount),
            FungibleCall::TransferFrom { from, to, amount } => {
                ledger.transfer_from(caller, *from, *to, *amount)
            }
            FungibleCall::Burn { amount } => ledger.burn(caller, *amount),
            _ => return Err(RuntimeError::ViewCall(call.method())),
        }
        .map_err(ContractError::from)?,
        (Contract::NonFungible(registry), Call::NonFungible(call)) => match call {
            NonFungibleCall::Mint { to, token_id } => registry.mint(*to, *token_id),
            NonFungibleCall::Approve { to, token_id } => registry.approve(caller, *to, *token_id),
            NonFungibleCall::SetApprovalForAll { operator, approved } => {
                registry.set_approval_for_all(caller, *operator, *approved)
            }
            NonFungibleCall::TransferFrom { from, to, token_id } => {
                registry.transfer_from(caller, *from, *to, *token_id)
            }
            NonFungibleCall::Burn { token_id } => registry.burn(caller, *token_id),
            _ => return Err(RuntimeError::ViewCall(call.method())),
        }
        .map_err(ContractError::from)?,
        (contract, call) => return Err(unsupported(contract, call)),
    };

    // ERC20 write methods return true; ERC721 writes return nothing
    let output = match call {
        Call::Fungible(FungibleCall::Transfer { .. })
        | Call::Fungible(FungibleCall::Approve { .. })
        | Call::Fungible(FungibleCall::TransferFrom { .. }) => CallOutput::Bool(true),
        _ => CallOutput::None,
    };
    Ok((output, events))
}

fn read(contract: &Contract, call: &Call) -> Result<CallOutput, RuntimeError> {
    let output = match (contract, call) {
        (Contract::Fungible(ledger), Call::Fungible(call)) => match call {
            FungibleCall::BalanceOf { account } => CallOutput::Amount(ledger.balance_of(account)),
            FungibleCall::Allowance { owner, spender } => {
                CallOutput::Amount(ledger.allowance(owner, spender))
            }
            FungibleCall::TotalSupply => CallOutput::Amount(ledger.total_supply()),
            FungibleCall::Name => CallOutput::Text(ledger.name().to_string()),
            FungibleCall::Symbol => CallOutput::Text(ledger.symbol().to_string()),
            FungibleCall::Decimals => CallOutput::Count(u64::from(ledger.decimals())),
            _ => return Err(RuntimeError::StateChangingQuery(call.method())),
        },
        (Contract::NonFungible(registry), Call::NonFungible(call)) => {
            let result: Result<CallOutput, ContractError> = match call {
                NonFungibleCall::SupportsInterface { interface_id } => {
                    Ok(CallOutput::Bool(registry.supports_interface(*interface_id)))
                }
                NonFungibleCall::BalanceOf { owner } => {
                    registry.balance_of(owner).map(CallOutput::Count).map_err(Into::into)
                }
                NonFungibleCall::OwnerOf { token_id } => {
                    registry.owner_of(*token_id).map(CallOutput::Address).map_err(Into::into)
                }
                NonFungibleCall::GetApproved { token_id } => {
                    registry.get_approved(*token_id).map(CallOutput::Address).map_err(Into::into)
                }
                NonFungibleCall::IsApprovedForAll { owner, operator } => {
                    Ok(CallOutput::Bool(registry.is_approved_for_all(owner, operator)))
                }
                NonFungibleCall::TokenUri { token_id } => {
                    registry.token_uri(*token_id).map(CallOutput::Text).map_err(Into::into)
                }
                NonFungibleCall::Name => Ok(CallOutput::Text(registry.name().to_string())),
                NonFungibleCall::Symbol => Ok(CallOutput::Text(registry.symbol().to_string())),
                _ => return Err(RuntimeError::StateChangingQuery(call.method())),
            };
            result?
        }
        (contract, call) => return Err(unsupported(contract, call)),
    };
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::InterfaceId;

    fn runtime() -> Runtime {
        Runtime::new(RuntimeConfig::default())
    }

    fn token(rt: &mut Runtime) -> Address {
        let deployer = rt.signers()[0];
        rt.deploy(
            deployer,
            Deployment::Fungible {
                name: "SimpleToken".into(),
                symbol: "STT".into(),
                decimals: "18".into(),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_gas_meter() {
        let mut meter = GasMeter::new(1000);
        assert_eq!(meter.remaining(), 1000);

        meter.consume(300).unwrap();
        assert_eq!(meter.used(), 300);
        assert_eq!(meter.remaining(), 700);

        meter.consume(700).unwrap();
        assert_eq!(meter.used(), 1000);

        assert_eq!(
            meter.consume(1),
            Err(RuntimeError::OutOfGas { limit: 1000, used: 1001 })
        );
    }

    #[test]
    fn test_deploy_addresses_are_unique() {
        let mut rt = runtime();
        let a = token(&mut rt);
        let b = token(&mut rt);
        assert_ne!(a, b);
        assert_eq!(rt.nonce(&rt.signers()[0]), 2);
        assert_eq!(rt.stats().fungible_contracts, 2);
    }

    #[test]
    fn test_deploy_rejects_bad_decimals() {
        let mut rt = runtime();
        let deployer = rt.signers()[0];
        let err = rt
            .deploy(
                deployer,
                Deployment::Fungible { name: "T".into(), symbol: "T".into(), decimals: "x".into() },
            )
            .unwrap_err();
        assert!(matches!(err, RuntimeError::InvalidDeployment(_)));
        assert_eq!(rt.stats().fungible_contracts, 0);
    }

    #[test]
    fn test_execute_emits_receipt() {
        let mut rt = runtime();
        let address = token(&mut rt);
        let owner = rt.signers()[0];

        let receipt = rt
            .execute(owner, address, FungibleCall::Mint { to: owner, amount: 10_000 }.into())
            .unwrap();
        assert_eq!(receipt.events.len(), 1);
        assert_eq!(
            receipt.gas_used,
            gas_costs::BASE_CALL + 2 * gas_costs::STORAGE_READ + 2 * gas_costs::STORAGE_WRITE + gas_costs::EVENT
        );
        assert!(receipt.tx_hash.starts_with("0x"));
        assert_eq!(receipt.block_number, rt.block_number());

        let balance = rt.query(address, &FungibleCall::BalanceOf { account: owner }.into()).unwrap();
        assert_eq!(balance, CallOutput::Amount(10_000));
    }

    #[test]
    fn test_failed_call_leaves_state_untouched() {
        let mut rt = runtime();
        let address = token(&mut rt);
        let owner = rt.signers()[0];
        let other = rt.signers()[1];
        rt.execute(owner, address, FungibleCall::Mint { to: owner, amount: 100 }.into()).unwrap();

        let before = rt.state().clone();
        let err = rt
            .execute(owner, address, FungibleCall::Transfer { to: other, amount: 101 }.into())
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Reverted(ContractError::Fungible(_))));

        assert_eq!(rt.state().contracts, before.contracts);
        assert_eq!(rt.state().block_number, before.block_number);
        assert_eq!(rt.state().calls_reverted, before.calls_reverted + 1);
    }

    #[test]
    fn test_out_of_gas_reverts() {
        let config = RuntimeConfig { gas_limit: 60_000, ..RuntimeConfig::default() };
        let mut rt = Runtime::new(config);
        let address = token(&mut rt);
        let owner = rt.signers()[0];

        let mut tight = Runtime::with_state(
            RuntimeConfig { gas_limit: 1_500, ..RuntimeConfig::default() },
            rt.state().clone(),
        );
        let err = tight
            .execute(owner, address, FungibleCall::Mint { to: owner, amount: 1 }.into())
            .unwrap_err();
        assert!(matches!(err, RuntimeError::OutOfGas { limit: 1_500, .. }));
        assert_eq!(
            tight.query(address, &FungibleCall::TotalSupply.into()).unwrap(),
            CallOutput::Amount(0)
        );
    }

    #[test]
    fn test_call_kind_mismatch() {
        let mut rt = runtime();
        let address = token(&mut rt);
        let err = rt
            .query(
                address,
                &NonFungibleCall::SupportsInterface { interface_id: InterfaceId::ERC721 }.into(),
            )
            .unwrap_err();
        assert_eq!(
            err,
            RuntimeError::UnsupportedCall { kind: "fungible", method: "supportsInterface" }
        );
    }

    #[test]
    fn test_view_and_write_separation() {
        let mut rt = runtime();
        let address = token(&mut rt);
        let owner = rt.signers()[0];

        assert_eq!(
            rt.execute(owner, address, FungibleCall::TotalSupply.into()).unwrap_err(),
            RuntimeError::ViewCall("totalSupply")
        );
        assert_eq!(
            rt.query(address, &FungibleCall::Burn { amount: 1 }.into()).unwrap_err(),
            RuntimeError::StateChangingQuery("burn")
        );
    }

    #[test]
    fn test_unknown_contract() {
        let mut rt = runtime();
        let ghost = Address::derive(b"ghost");
        let owner = rt.signers()[0];
        assert_eq!(
            rt.execute(owner, ghost, FungibleCall::Mint { to: owner, amount: 1 }.into()).unwrap_err(),
            RuntimeError::UnknownContract(ghost)
        );
    }

    #[test]
    fn test_persist_failure_rolls_back_call() {
        let mut rt = runtime();
        let token = token(&mut rt);
        let (owner, other) = (rt.signers()[0], rt.signers()[1]);
        rt.execute(owner, token, FungibleCall::Mint { to: owner, amount: 100 }.into())
            .unwrap();
        let before = rt.state().clone();

        let result: Result<Receipt, CommitError<&str>> = rt.commit(
            |rt| rt.execute(owner, token, FungibleCall::Transfer { to: other, amount: 40 }.into()),
            |_, _| Err("disk full"),
        );

        assert!(matches!(result, Err(CommitError::Persist("disk full"))));
        assert_eq!(rt.state(), &before);
        assert_eq!(
            rt.query(token, &FungibleCall::BalanceOf { account: other }.into()).unwrap(),
            CallOutput::Amount(0)
        );
    }

    #[test]
    fn test_persist_failure_rolls_back_deploy() {
        let mut rt = runtime();
        let deployer = rt.signers()[0];
        let result: Result<Address, CommitError<&str>> = rt.commit(
            |rt| {
                rt.deploy(
                    deployer,
                    Deployment::NonFungible { name: "N".into(), symbol: "N".into(), base_uri: "".into() },
                )
            },
            |_, _| Err("disk full"),
        );

        assert!(matches!(result, Err(CommitError::Persist(_))));
        assert_eq!(rt.contracts().count(), 0);
        assert_eq!(rt.block_number(), 0);
        assert_eq!(rt.nonce(&deployer), 0);
    }

    #[test]
    fn test_commit_persists_committed_state() {
        let mut rt = runtime();
        let token = token(&mut rt);
        let owner = rt.signers()[0];

        let mut seen_block = 0;
        let result: Result<Receipt, CommitError<&str>> = rt.commit(
            |rt| rt.execute(owner, token, FungibleCall::Mint { to: owner, amount: 5 }.into()),
            |rt, receipt| {
                seen_block = rt.block_number();
                assert_eq!(receipt.block_number, seen_block);
                Ok(())
            },
        );
        let receipt = result.unwrap();

        assert_eq!(receipt.block_number, rt.block_number());
        assert_eq!(seen_block, rt.block_number());
    }

    #[test]
    fn test_commit_passes_runtime_errors_through() {
        let mut rt = runtime();
        let token = token(&mut rt);
        let (owner, other) = (rt.signers()[0], rt.signers()[1]);
        let result: Result<Receipt, CommitError<&str>> = rt.commit(
            |rt| rt.execute(owner, token, FungibleCall::Transfer { to: other, amount: 1 }.into()),
            |_, _| panic!("persist must not run for a reverted call"),
        );
        assert!(matches!(result, Err(CommitError::Runtime(RuntimeError::Reverted(_)))));
    }
}
