//! # Storage Backend Trait
//!
//! The contract between the UGV domain layer and the graph engine.
//! Every primitive the mutator and the analyses need is defined here;
//! nothing above this trait knows how the engine is reached.
//!
//! ## Implementations
//!
//! | Backend | Module | Description |
//! |---------|--------|-------------|
//! | `MemoryBackend` | `memory` | In-memory for testing/embedding |
//! | `BoltBackend` | `bolt` | External Neo4j via Bolt protocol |

pub mod memory;
#[cfg(feature = "bolt")]
pub mod bolt;

use async_trait::async_trait;
use crate::model::*;
use crate::schema::{Label, RelType};
use crate::tx::{Transaction, TxMode};
use crate::Result;

pub use memory::MemoryBackend;
#[cfg(feature = "bolt")]
pub use bolt::BoltBackend;

// ============================================================================
// Backend Configuration
// ============================================================================

/// Configuration for connecting to a storage backend.
#[derive(Clone)]
pub enum BackendConfig {
    /// In-memory (no persistence)
    Memory,

    /// Neo4j Bolt protocol
    Bolt {
        uri: String,
        user: String,
        password: String,
        database: Option<String>,
    },
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendConfig::Memory => f.write_str("Memory"),
            BackendConfig::Bolt { uri, user, database, .. } => f
                .debug_struct("Bolt")
                .field("uri", uri)
                .field("user", user)
                .field("password", &"<redacted>")
                .field("database", database)
                .finish(),
        }
    }
}

// ============================================================================
// Constraint types
// ============================================================================

/// Type of constraint to create on a label+property pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintType {
    /// Property value must be unique for nodes with this label.
    Unique,
}

// ============================================================================
// StorageBackend Trait
// ============================================================================

/// The storage contract.
///
/// Labels and relationship types are typed so that a backend which
/// renders statements can only ever interpolate tokens from the closed
/// schema vocabulary. Property keys are plain strings and must be
/// validated by such a backend before use.
#[async_trait]
pub trait StorageBackend: Send + Sync + 'static {
    /// The transaction type for this backend.
    type Tx: Transaction;

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Release the engine connection. Must be safe to call repeatedly.
    async fn shutdown(&self) -> Result<()>;

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Begin a new transaction.
    async fn begin_tx(&self, mode: TxMode) -> Result<Self::Tx>;

    /// Commit a transaction.
    async fn commit_tx(&self, tx: Self::Tx) -> Result<()>;

    /// Roll back a transaction.
    async fn rollback_tx(&self, tx: Self::Tx) -> Result<()>;

    // ========================================================================
    // Node CRUD
    // ========================================================================

    /// Create a node with the given labels and properties.
    async fn create_node(
        &self,
        tx: &mut Self::Tx,
        labels: &[Label],
        props: PropertyMap,
    ) -> Result<NodeId>;

    /// Get a node by ID. Returns None if not found.
    async fn get_node(&self, tx: &Self::Tx, id: NodeId) -> Result<Option<Node>>;

    /// Set a property on a node (upsert).
    async fn set_node_property(
        &self,
        tx: &mut Self::Tx,
        id: NodeId,
        key: &str,
        val: Value,
    ) -> Result<()>;

    // ========================================================================
    // Relationship CRUD
    // ========================================================================

    /// Create a relationship between two existing nodes.
    async fn create_relationship(
        &self,
        tx: &mut Self::Tx,
        src: NodeId,
        dst: NodeId,
        rel_type: RelType,
        props: PropertyMap,
    ) -> Result<RelId>;

    /// Delete a relationship. Returns true if it existed.
    async fn delete_relationship(&self, tx: &mut Self::Tx, id: RelId) -> Result<bool>;

    // ========================================================================
    // Traversal
    // ========================================================================

    /// Get all relationships of a node, optionally filtered by direction and type.
    /// Results are ordered by relationship id.
    async fn get_relationships(
        &self,
        tx: &Self::Tx,
        node: NodeId,
        dir: Direction,
        rel_type: Option<RelType>,
    ) -> Result<Vec<Relationship>>;

    // ========================================================================
    // Scan
    // ========================================================================

    /// Find all nodes with a given label, ordered by node id.
    async fn nodes_by_label(&self, tx: &Self::Tx, label: Label) -> Result<Vec<Node>>;

    /// Find nodes by label + property value, ordered by node id.
    async fn nodes_by_property(
        &self,
        tx: &Self::Tx,
        label: Label,
        key: &str,
        value: &Value,
    ) -> Result<Vec<Node>>;

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Total number of nodes.
    async fn node_count(&self, tx: &Self::Tx) -> Result<u64>;

    /// Total number of relationships.
    async fn relationship_count(&self, tx: &Self::Tx) -> Result<u64>;

    // ========================================================================
    // Schema
    // ========================================================================

    /// Create a named schema constraint.
    ///
    /// Returns `Error::SchemaConflict` when an equivalent constraint
    /// already exists.
    async fn create_constraint(
        &self,
        name: &str,
        label: Label,
        property: &str,
        constraint_type: ConstraintType,
    ) -> Result<()>;

    /// Create a named index on a label+property combination.
    ///
    /// Returns `Error::SchemaConflict` when it already exists.
    async fn create_index(&self, name: &str, label: Label, property: &str) -> Result<()>;
}
