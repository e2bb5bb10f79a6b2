use sled::Db;
use crate::runtime::{Receipt, WorldState};
use std::path::Path;
use thiserror::Error;

const STATE_KEY: &[u8] = b"world_state";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Receipt not found: {0}")]
    ReceiptNotFound(String),
}

/// Persistent storage for runtime state and receipts
pub struct RuntimeStorage {
    db: Db,
}

impl RuntimeStorage {
    /// Open or create the runtime database
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path)?;
        tracing::info!("Runtime database opened");
        Ok(Self { db })
    }

    /// Save the full world state
    pub fn save_state(&self, state: &WorldState) -> Result<(), StorageError> {
        let value = serde_json::to_vec(state)?;
        self.db.insert(STATE_KEY, value)?;
        self.db.flush()?;
        tracing::debug!("World state saved at block {}", state.block_number);
        Ok(())
    }

    /// Load the world state, if one was ever saved
    pub fn load_state(&self) -> Result<Option<WorldState>, StorageError> {
        match self.db.get(STATE_KEY)? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    pub fn save_receipt(&self, receipt: &Receipt) -> Result<(), StorageError> {
        let key = format!("receipt:{}", receipt.tx_hash);
        let value = serde_json::to_vec(receipt)?;
        self.db.insert(key.as_bytes(), value)?;
        self.db.flush()?;
        tracing::debug!("Receipt {} saved to database", receipt.tx_hash);
        Ok(())
    }

    pub fn load_receipt(&self, tx_hash: &str) -> Result<Receipt, StorageError> {
        let key = format!("receipt:{}", tx_hash);
        let value = self
            .db
            .get(key.as_bytes())?
            .ok_or_else(|| StorageError::ReceiptNotFound(tx_hash.to_string()))?;
        Ok(serde_json::from_slice(&value)?)
    }

    /// Number of stored receipts
    pub fn receipt_count(&self) -> usize {
        self.db.scan_prefix(b"receipt:").count()
    }

    /// Clear all data (use with caution!)
    pub fn clear(&self) -> Result<(), StorageError> {
        self.db.clear()?;
        self.db.flush()?;
        tracing::warn!("Database cleared");
        Ok(())
    }
}
