pub mod address;
pub mod selector;

pub use address::{Address, AddressError, Amount, TokenId};
pub use selector::{InterfaceId, SelectorError, function_selector};
