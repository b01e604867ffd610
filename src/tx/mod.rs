//! Transaction management.
//!
//! Every logical operation on [`crate::UgvGraph`] runs in its own
//! transaction: begun at the start of the operation, committed when it
//! succeeds, rolled back when it fails. Transactions are never stored on
//! the graph handle or shared between operations.

use serde::{Deserialize, Serialize};

/// Transaction mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxMode {
    ReadOnly,
    ReadWrite,
}

/// Opaque transaction identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxId(pub u64);

impl std::fmt::Display for TxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tx-{}", self.0)
    }
}

/// Transaction trait that all backends must implement.
pub trait Transaction: Send + Sync {
    fn mode(&self) -> TxMode;
    fn id(&self) -> TxId;
}
