//! # Graph handle
//!
//! [`UgvGraph`] owns one backend connection for its whole lifetime and
//! runs every logical operation in its own session. The mutation
//! operations live in [`mutation`]; the read analyses in
//! [`crate::analysis`].

pub mod mutation;

pub use mutation::{CreatedModule, Position};

use std::sync::atomic::{AtomicBool, Ordering};

use crate::domain::{ChassisRecord, ConstraintRecord, GraphRecord, MissionRecord, ModuleRecord};
use crate::model::{Direction, Node, NodeId, Relationship, Value};
use crate::schema::{self, Label, RelType, SchemaReport};
use crate::storage::{MemoryBackend, StorageBackend};
use crate::tx::TxMode;
use crate::{Error, Result};

// ============================================================================
// UgvGraph
// ============================================================================

/// The primary entry point: a storage backend plus the UGV domain
/// operations over it.
pub struct UgvGraph<B: StorageBackend> {
    backend: B,
    closed: AtomicBool,
}

impl<B: StorageBackend> UgvGraph<B> {
    /// Wrap an already-connected backend.
    pub fn with_backend(backend: B) -> Self {
        Self { backend, closed: AtomicBool::new(false) }
    }

    /// Access the underlying backend (for advanced use).
    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Release the backend connection. Safe to call more than once;
    /// every operation afterwards fails with [`Error::Connection`].
    pub async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.backend.shutdown().await?;
        tracing::info!("graph handle closed");
        Ok(())
    }

    /// Declare the uniqueness constraints and secondary indexes.
    /// Never aborts; see [`SchemaReport`] for per-item outcomes.
    pub async fn setup_schema(&self) -> SchemaReport {
        if self.is_closed() {
            let mut report = SchemaReport::default();
            for item in schema::SCHEMA {
                report.failed.push((item.name().to_string(), "graph handle is closed".into()));
            }
            return report;
        }
        schema::setup_schema(&self.backend).await
    }

    // ========================================================================
    // Sessions
    // ========================================================================

    /// Begin a session scoped to one operation.
    pub(crate) async fn session(&self, mode: TxMode) -> Result<B::Tx> {
        if self.is_closed() {
            return Err(Error::Connection("graph handle is closed".into()));
        }
        self.backend.begin_tx(mode).await
    }

    /// End a session: commit on success, roll back on failure. A failed
    /// rollback is logged and the original error returned.
    pub(crate) async fn finish<T>(&self, tx: B::Tx, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                self.backend.commit_tx(tx).await?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = self.backend.rollback_tx(tx).await {
                    tracing::warn!(error = %rollback, "rollback failed");
                }
                Err(e)
            }
        }
    }

    // ========================================================================
    // Lookups
    // ========================================================================

    /// Resolve a business id to its node. With duplicates (possible only
    /// before the schema is set up) the lowest node id wins.
    pub(crate) async fn find(&self, tx: &B::Tx, at: Endpoint<'_>) -> Result<Option<Node>> {
        let mut nodes = self
            .backend
            .nodes_by_property(tx, at.label, at.key, &Value::from(at.id))
            .await?;
        if nodes.len() > 1 {
            tracing::warn!(
                label = at.label.as_str(),
                id = at.id,
                count = nodes.len(),
                "business id resolves to several nodes"
            );
        }
        Ok(if nodes.is_empty() { None } else { Some(nodes.swap_remove(0)) })
    }

    /// Neighbours of `node` over `rel_type`, one entry per distinct node in
    /// edge order. Repeated edges are reported and collapsed.
    pub(crate) async fn neighbours(
        &self,
        tx: &B::Tx,
        node: NodeId,
        dir: Direction,
        rel_type: RelType,
    ) -> Result<Vec<(Node, Relationship)>> {
        let rels = self.backend.get_relationships(tx, node, dir, Some(rel_type)).await?;
        let mut seen = Vec::with_capacity(rels.len());
        let mut out = Vec::with_capacity(rels.len());

        for rel in rels {
            let Some(other) = rel.other_node(node) else { continue };
            if seen.contains(&other) {
                tracing::warn!(
                    rel_type = rel_type.as_str(),
                    node = %node,
                    other = %other,
                    "duplicate relationship ignored"
                );
                continue;
            }
            seen.push(other);
            if let Some(n) = self.backend.get_node(tx, other).await? {
                out.push((n, rel));
            }
        }
        Ok(out)
    }

    /// Edges of `rel_type` between `a` and `b`, either direction.
    pub(crate) async fn edges_between(
        &self,
        tx: &B::Tx,
        a: NodeId,
        b: NodeId,
        rel_type: RelType,
    ) -> Result<Vec<Relationship>> {
        let rels = self.backend.get_relationships(tx, a, Direction::Both, Some(rel_type)).await?;
        Ok(rels.into_iter().filter(|r| r.joins(a, b)).collect())
    }
}

/// In-memory graph for testing and embedding.
impl UgvGraph<MemoryBackend> {
    pub fn open_memory() -> Self {
        Self::with_backend(MemoryBackend::new())
    }
}

#[cfg(feature = "bolt")]
impl UgvGraph<crate::storage::BoltBackend> {
    /// Open a Bolt connection to an external Neo4j instance.
    pub async fn connect(config: &crate::BackendConfig) -> Result<Self> {
        let backend = crate::storage::BoltBackend::from_config(config).await?;
        Ok(Self::with_backend(backend))
    }
}

// ============================================================================
// Endpoints
// ============================================================================

/// A node addressed by business id.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Endpoint<'a> {
    pub label: Label,
    pub key: &'static str,
    pub id: &'a str,
}

impl<'a> Endpoint<'a> {
    /// Address a node of record type `R` under `label`.
    fn of<R: GraphRecord>(label: Label, id: &'a str) -> Self {
        Self { label, key: R::ID_KEY, id }
    }

    pub fn module(id: &'a str) -> Self {
        Self::of::<ModuleRecord>(Label::UgvModule, id)
    }

    pub fn chassis(id: &'a str) -> Self {
        Self::of::<ChassisRecord>(Label::BaseChassis, id)
    }

    pub fn mission(id: &'a str) -> Self {
        Self::of::<MissionRecord>(Label::MissionProfile, id)
    }

    pub fn constraint(id: &'a str) -> Self {
        Self::of::<ConstraintRecord>(Label::Constraint, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let graph = UgvGraph::open_memory();
        graph.close().await.unwrap();
        graph.close().await.unwrap();
        assert!(graph.is_closed());
    }

    #[tokio::test]
    async fn test_operations_fail_after_close() {
        let graph = UgvGraph::open_memory();
        graph.close().await.unwrap();

        let err = graph.session(TxMode::ReadOnly).await.err().unwrap();
        assert!(matches!(err, Error::Connection(_)));

        let report = graph.setup_schema().await;
        assert!(report.created.is_empty());
        assert_eq!(report.failed.len(), schema::SCHEMA.len());
    }

    #[tokio::test]
    async fn test_find_returns_none_for_unknown_id() {
        let graph = UgvGraph::open_memory();
        let tx = graph.session(TxMode::ReadOnly).await.unwrap();
        assert!(graph.find(&tx, Endpoint::module("ghost")).await.unwrap().is_none());
        graph.finish(tx, Ok(())).await.unwrap();
    }

    #[test]
    fn test_endpoints_use_record_id_keys() {
        use crate::schema::keys;

        assert_eq!(Endpoint::module("m").key, keys::MODULE_ID);
        assert_eq!(Endpoint::chassis("c").key, keys::CHASSIS_ID);
        assert_eq!(Endpoint::mission("x").key, keys::MISSION_ID);
        assert_eq!(Endpoint::constraint("k").key, keys::CONSTRAINT_ID);
        assert_eq!(Endpoint::mission("x").label, Label::MissionProfile);
    }
}
