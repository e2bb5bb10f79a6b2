pub mod db;

pub use db::{RuntimeStorage, StorageError};
