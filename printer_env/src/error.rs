//! Error types for the printer environment abstraction.

use thiserror::Error;

/// Errors reported by external collaborators.
#[derive(Debug, Error)]
pub enum EnvError {
    /// The ledger refused a deposit or withdrawal
    #[error("Ledger error: {0}")]
    LedgerError(String),
    
    /// An inventory operation could not be completed
    #[error("Inventory error: {0}")]
    InventoryError(String),
    
    /// The actor has no account or inventory known to the collaborator
    #[error("Unknown actor: {0}")]
    UnknownActor(String),
    
    /// A spatial key could not be parsed from its textual form
    #[error("Invalid spatial key: {0}")]
    InvalidKey(String),
}

impl EnvError {
    /// Creates a ledger error.
    pub fn ledger(msg: impl Into<String>) -> Self {
        Self::LedgerError(msg.into())
    }
    
    /// Creates an inventory error.
    pub fn inventory(msg: impl Into<String>) -> Self {
        Self::InventoryError(msg.into())
    }
    
    /// Creates an unknown-actor error.
    pub fn unknown(actor: impl std::fmt::Display) -> Self {
        Self::UnknownActor(actor.to_string())
    }
}
