//! # ugv-graph: UGV Product-Line Knowledge Graph
//!
//! Domain model and query layer for an unmanned ground vehicle product
//! line stored in a property graph: modules, chassis, interface specs,
//! mission profiles and constraints, plus the analyses run over them
//! (power budgets, pairwise compatibility, dependency lookups, manifests).
//!
//! ## Design Principles
//!
//! 1. **Trait-first**: `StorageBackend` is the contract between the domain layer and the engine
//! 2. **Clean DTOs**: `Node`, `Relationship`, `Value` cross all boundaries
//! 3. **Closed vocabulary**: labels and relationship types are enums; data is always bound
//! 4. **One session per operation**: begun, then committed or rolled back, never shared
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ugv_graph::{UgvGraph, MissionRecord, PowerBudgetReport};
//!
//! # async fn example() -> ugv_graph::Result<()> {
//! let graph = UgvGraph::open_memory();
//! graph.setup_schema().await;
//!
//! graph.create_mission(&MissionRecord::new("MX", "Mission X", "reconnaissance", 4.0)).await?;
//! if let PowerBudgetReport::Evaluated(budget) =
//!     graph.validate_mission_power_budget("MX", 3.5).await?
//! {
//!     println!("margin: {:.2} kW", budget.margin_kw);
//! }
//! graph.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Storage Backends
//!
//! | Backend | Feature | Description |
//! |---------|---------|-------------|
//! | Memory | (default) | In-memory graph for testing/embedding |
//! | Bolt | `bolt` | Connect to external Neo4j via Bolt protocol |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod schema;
pub mod cypher;
pub mod storage;
pub mod tx;
pub mod domain;
pub mod graph;
pub mod analysis;
pub mod config;
pub mod demo;

// ============================================================================
// Re-exports: Model (the DTOs)
// ============================================================================

pub use model::{
    Node, Relationship, Value, PropertyMap,
    NodeId, RelId, Direction,
};

// ============================================================================
// Re-exports: Schema & Storage
// ============================================================================

pub use schema::{Label, RelType, SchemaReport};
pub use storage::{StorageBackend, BackendConfig, ConstraintType, MemoryBackend};
#[cfg(feature = "bolt")]
pub use storage::BoltBackend;

// ============================================================================
// Re-exports: Transactions
// ============================================================================

pub use tx::{Transaction, TxMode, TxId};

// ============================================================================
// Re-exports: Domain & Analyses
// ============================================================================

pub use domain::{
    ChassisRecord, ConstraintRecord, Created, ElectricalInterface, ForceLimits,
    InterfaceKind, InterfaceSpec, LifecycleStatus, MechanicalInterface, MissionRecord,
    ModuleRecord, ModuleType, MomentLimits, PhysicalProperties, ThermalInterface,
    ValidationStatus,
};
pub use graph::{CreatedModule, Position, UgvGraph};
pub use analysis::{
    CompatibilityReport, InterfaceCoverage, ManifestEntry, MissionManifest,
    MissionValidation, ModuleDependencies, ModulePower, ModuleUtilization, MountChain, PairClass,
    PairReport, PowerBudget, PowerBudgetReport,
};
pub use config::{ConfigError, GraphConfig};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Validation error: {entity} requires a non-empty '{field}'")]
    Validation { entity: &'static str, field: &'static str },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Schema conflict: {0}")]
    SchemaConflict(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Invalid statement token: {0}")]
    InvalidToken(String),

    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Type error: expected {expected}, got {got}")]
    TypeError { expected: String, got: String },

    #[error("Transaction error: {0}")]
    TxError(String),

    /// A multi-step creation stopped part-way. `written` lists what was
    /// persisted before the failure; none of it is rolled back.
    #[error("Module {module_id} only partially created (written: {written:?}): {source}")]
    Incomplete {
        module_id: String,
        written: Vec<String>,
        #[source]
        source: Box<Error>,
    },
}

pub type Result<T> = std::result::Result<T, Error>;
