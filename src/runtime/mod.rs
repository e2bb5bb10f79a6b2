pub mod call;
pub mod executor;
pub mod signers;

pub use call::{gas_costs, Call, CallOutput, Deployment, FungibleCall, NonFungibleCall, Receipt};
pub use executor::{contract_address, CommitError, GasMeter, Runtime, RuntimeError, RuntimeStats, WorldState};
pub use signers::{derive_signers, resolve_account, AccountRefError};
