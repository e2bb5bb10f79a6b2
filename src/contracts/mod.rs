pub mod events;
pub mod fungible;
pub mod nft;

pub use events::Event;
pub use fungible::{FungibleError, FungibleLedger, parse_decimals};
pub use nft::{NonFungibleError, NonFungibleRegistry, SUPPORTED_INTERFACES};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Revert reason raised by a contract
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractError {
    #[error(transparent)]
    Fungible(#[from] FungibleError),
    #[error(transparent)]
    NonFungible(#[from] NonFungibleError),
}

/// Deployed contract state
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Contract {
    Fungible(FungibleLedger),
    NonFungible(NonFungibleRegistry),
}

impl Contract {
    pub fn kind(&self) -> &'static str {
        match self {
            Contract::Fungible(_) => "fungible",
            Contract::NonFungible(_) => "non_fungible",
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Contract::Fungible(ledger) => ledger.name(),
            Contract::NonFungible(registry) => registry.name(),
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            Contract::Fungible(ledger) => ledger.symbol(),
            Contract::NonFungible(registry) => registry.symbol(),
        }
    }
}
