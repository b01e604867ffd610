//! In-memory storage backend.
//!
//! This is the reference implementation of `StorageBackend`.
//! It uses simple HashMaps protected by RwLock.
//!
//! ## Limitations
//!
//! - **No real transactions**: `commit_tx()` and `rollback_tx()` are no-ops.
//!   Writes are applied immediately. Rollback does NOT undo mutations.
//!   This matches the single-statement granularity the domain layer
//!   assumes of the external engine.
//! - **No property indexes**: `create_index()` only records the
//!   declaration. All property lookups do a full label scan.
//!
//! Unique constraints, once declared, are enforced on node creation and
//! property updates.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use parking_lot::RwLock;
use async_trait::async_trait;

use crate::model::*;
use crate::schema::{Label, RelType};
use crate::tx::{Transaction, TxMode, TxId};
use crate::{Error, Result};
use super::{ConstraintType, StorageBackend};

// ============================================================================
// MemoryBackend
// ============================================================================

/// In-memory property graph storage.
#[derive(Clone)]
pub struct MemoryBackend {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    nodes: RwLock<HashMap<NodeId, Node>>,
    relationships: RwLock<HashMap<RelId, Relationship>>,
    /// node_id → list of relationship IDs
    adjacency: RwLock<HashMap<NodeId, Vec<RelId>>>,
    /// label → node IDs in creation order
    label_index: RwLock<HashMap<String, Vec<NodeId>>>,
    schema: RwLock<SchemaState>,
    next_node_id: AtomicU64,
    next_rel_id: AtomicU64,
    next_tx_id: AtomicU64,
    shut_down: AtomicBool,
}

#[derive(Default)]
struct SchemaState {
    names: HashSet<String>,
    /// (label, property) pairs with a uniqueness constraint
    unique: HashSet<(String, String)>,
    indexes: HashSet<(String, String)>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                nodes: RwLock::new(HashMap::new()),
                relationships: RwLock::new(HashMap::new()),
                adjacency: RwLock::new(HashMap::new()),
                label_index: RwLock::new(HashMap::new()),
                schema: RwLock::new(SchemaState::default()),
                next_node_id: AtomicU64::new(1),
                next_rel_id: AtomicU64::new(1),
                next_tx_id: AtomicU64::new(1),
                shut_down: AtomicBool::new(false),
            }),
        }
    }

    fn ensure_running(&self) -> Result<()> {
        if self.inner.shut_down.load(Ordering::Acquire) {
            return Err(Error::Connection("memory backend has been shut down".into()));
        }
        Ok(())
    }

    /// Reject a write that would duplicate a uniquely-constrained value.
    fn check_unique(
        &self,
        nodes: &HashMap<NodeId, Node>,
        labels: &[String],
        props: &PropertyMap,
        exclude: Option<NodeId>,
    ) -> Result<()> {
        let schema = self.inner.schema.read();
        for (label, key) in &schema.unique {
            if !labels.contains(label) {
                continue;
            }
            let Some(value) = props.get(key) else { continue };
            let clash = nodes.values().any(|n| {
                Some(n.id) != exclude && n.has_label(label) && n.get(key) == Some(value)
            });
            if clash {
                return Err(Error::ConstraintViolation(format!(
                    "node with label {label} and {key} = {value} already exists"
                )));
            }
        }
        Ok(())
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn ensure_writable(tx: &MemoryTx) -> Result<()> {
    if tx.mode == TxMode::ReadOnly {
        return Err(Error::TxError(format!("write attempted in read-only transaction {}", tx.id)));
    }
    Ok(())
}

// ============================================================================
// MemoryTx
// ============================================================================

/// In-memory transaction (a marker; no MVCC).
pub struct MemoryTx {
    id: TxId,
    mode: TxMode,
}

impl Transaction for MemoryTx {
    fn mode(&self) -> TxMode { self.mode }
    fn id(&self) -> TxId { self.id }
}

// ============================================================================
// StorageBackend impl
// ============================================================================

#[async_trait]
impl StorageBackend for MemoryBackend {
    type Tx = MemoryTx;

    async fn shutdown(&self) -> Result<()> {
        self.inner.shut_down.store(true, Ordering::Release);
        Ok(())
    }

    async fn begin_tx(&self, mode: TxMode) -> Result<MemoryTx> {
        self.ensure_running()?;
        let id = TxId(self.inner.next_tx_id.fetch_add(1, Ordering::Relaxed));
        Ok(MemoryTx { id, mode })
    }

    /// No-op: memory backend applies writes immediately, not on commit.
    async fn commit_tx(&self, _tx: MemoryTx) -> Result<()> { Ok(()) }

    /// WARNING: No-op. Memory backend has no write-ahead log.
    /// Mutations applied during this transaction are NOT reverted.
    async fn rollback_tx(&self, _tx: MemoryTx) -> Result<()> { Ok(()) }

    // ========================================================================
    // Node CRUD
    // ========================================================================

    async fn create_node(
        &self,
        tx: &mut MemoryTx,
        labels: &[Label],
        props: PropertyMap,
    ) -> Result<NodeId> {
        ensure_writable(tx)?;
        let labels: Vec<String> = labels.iter().map(|l| l.as_str().to_string()).collect();

        let mut nodes = self.inner.nodes.write();
        self.check_unique(&nodes, &labels, &props, None)?;

        let id = NodeId(self.inner.next_node_id.fetch_add(1, Ordering::Relaxed));
        nodes.insert(id, Node { id, labels: labels.clone(), properties: props });
        drop(nodes);

        // Update label index
        {
            let mut idx = self.inner.label_index.write();
            for label in labels {
                idx.entry(label).or_default().push(id);
            }
        }
        self.inner.adjacency.write().insert(id, Vec::new());

        Ok(id)
    }

    async fn get_node(&self, _tx: &MemoryTx, id: NodeId) -> Result<Option<Node>> {
        Ok(self.inner.nodes.read().get(&id).cloned())
    }

    async fn set_node_property(
        &self,
        tx: &mut MemoryTx,
        id: NodeId,
        key: &str,
        val: Value,
    ) -> Result<()> {
        ensure_writable(tx)?;
        let mut nodes = self.inner.nodes.write();
        let labels = nodes
            .get(&id)
            .map(|n| n.labels.clone())
            .ok_or_else(|| Error::NotFound(format!("Node {id}")))?;

        let mut probe = PropertyMap::new();
        probe.insert(key.to_string(), val.clone());
        self.check_unique(&nodes, &labels, &probe, Some(id))?;

        if let Some(node) = nodes.get_mut(&id) {
            node.properties.insert(key.to_string(), val);
        }
        Ok(())
    }

    // ========================================================================
    // Relationship CRUD
    // ========================================================================

    async fn create_relationship(
        &self,
        tx: &mut MemoryTx,
        src: NodeId,
        dst: NodeId,
        rel_type: RelType,
        props: PropertyMap,
    ) -> Result<RelId> {
        ensure_writable(tx)?;
        // Verify both nodes exist
        {
            let nodes = self.inner.nodes.read();
            if !nodes.contains_key(&src) {
                return Err(Error::NotFound(format!("Source node {src}")));
            }
            if !nodes.contains_key(&dst) {
                return Err(Error::NotFound(format!("Target node {dst}")));
            }
        }

        let id = RelId(self.inner.next_rel_id.fetch_add(1, Ordering::Relaxed));
        let rel = Relationship {
            id,
            src,
            dst,
            rel_type: rel_type.as_str().to_string(),
            properties: props,
        };

        self.inner.relationships.write().insert(id, rel);

        // Update adjacency for both endpoints
        let mut adj = self.inner.adjacency.write();
        adj.entry(src).or_default().push(id);
        if src != dst {
            adj.entry(dst).or_default().push(id);
        }

        Ok(id)
    }

    async fn delete_relationship(&self, tx: &mut MemoryTx, id: RelId) -> Result<bool> {
        ensure_writable(tx)?;
        let removed = self.inner.relationships.write().remove(&id);
        if let Some(rel) = &removed {
            let mut adj = self.inner.adjacency.write();
            if let Some(rels) = adj.get_mut(&rel.src) {
                rels.retain(|rid| *rid != id);
            }
            if rel.src != rel.dst {
                if let Some(rels) = adj.get_mut(&rel.dst) {
                    rels.retain(|rid| *rid != id);
                }
            }
        }
        Ok(removed.is_some())
    }

    // ========================================================================
    // Traversal
    // ========================================================================

    async fn get_relationships(
        &self,
        _tx: &MemoryTx,
        node: NodeId,
        dir: Direction,
        rel_type: Option<RelType>,
    ) -> Result<Vec<Relationship>> {
        let adj = self.inner.adjacency.read();
        let rels = self.inner.relationships.read();

        let rel_ids = adj.get(&node).cloned().unwrap_or_default();
        let mut result = Vec::new();

        for rid in rel_ids {
            if let Some(rel) = rels.get(&rid) {
                // Direction filter
                let matches_dir = match dir {
                    Direction::Outgoing => rel.src == node,
                    Direction::Incoming => rel.dst == node,
                    Direction::Both => true,
                };
                // Type filter
                let matches_type = rel_type.is_none_or(|t| rel.rel_type == t.as_str());

                if matches_dir && matches_type {
                    result.push(rel.clone());
                }
            }
        }

        result.sort_by_key(|r| r.id);
        Ok(result)
    }

    // ========================================================================
    // Scan
    // ========================================================================

    async fn nodes_by_label(&self, _tx: &MemoryTx, label: Label) -> Result<Vec<Node>> {
        let idx = self.inner.label_index.read();
        let nodes = self.inner.nodes.read();

        let ids = idx.get(label.as_str()).cloned().unwrap_or_default();
        Ok(ids.iter().filter_map(|id| nodes.get(id).cloned()).collect())
    }

    async fn nodes_by_property(
        &self,
        _tx: &MemoryTx,
        label: Label,
        key: &str,
        value: &Value,
    ) -> Result<Vec<Node>> {
        // Brute force scan (memory backend doesn't have real property indexes)
        let idx = self.inner.label_index.read();
        let nodes = self.inner.nodes.read();

        let ids = idx.get(label.as_str()).cloned().unwrap_or_default();
        Ok(ids.iter()
            .filter_map(|id| nodes.get(id))
            .filter(|n| n.get(key) == Some(value))
            .cloned()
            .collect())
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    async fn node_count(&self, _tx: &MemoryTx) -> Result<u64> {
        Ok(self.inner.nodes.read().len() as u64)
    }

    async fn relationship_count(&self, _tx: &MemoryTx) -> Result<u64> {
        Ok(self.inner.relationships.read().len() as u64)
    }

    // ========================================================================
    // Schema
    // ========================================================================

    async fn create_constraint(
        &self,
        name: &str,
        label: Label,
        property: &str,
        constraint_type: ConstraintType,
    ) -> Result<()> {
        self.ensure_running()?;
        match constraint_type {
            ConstraintType::Unique => {}
        }
        let key = (label.as_str().to_string(), property.to_string());

        // Lock order matches create_node: nodes before schema.
        let nodes = self.inner.nodes.read();
        let mut schema = self.inner.schema.write();
        if schema.names.contains(name) || schema.unique.contains(&key) {
            return Err(Error::SchemaConflict(format!("constraint {name} already exists")));
        }

        // Existing data must already satisfy the constraint.
        let mut seen = Vec::new();
        for node in nodes.values().filter(|n| n.has_label(&key.0)) {
            if let Some(v) = node.get(property) {
                if seen.contains(&v) {
                    return Err(Error::ConstraintViolation(format!(
                        "cannot create {name}: duplicate {property} = {v}"
                    )));
                }
                seen.push(v);
            }
        }

        schema.names.insert(name.to_string());
        schema.unique.insert(key);
        Ok(())
    }

    async fn create_index(&self, name: &str, label: Label, property: &str) -> Result<()> {
        self.ensure_running()?;
        let key = (label.as_str().to_string(), property.to_string());

        let mut schema = self.inner.schema.write();
        if schema.names.contains(name) || schema.indexes.contains(&key) {
            return Err(Error::SchemaConflict(format!("index {name} already exists")));
        }
        schema.names.insert(name.to_string());
        schema.indexes.insert(key);
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn module_props(id: &str) -> PropertyMap {
        props([("module_id", id)])
    }

    #[tokio::test]
    async fn test_create_and_get_node() {
        let db = MemoryBackend::new();
        let mut tx = db.begin_tx(TxMode::ReadWrite).await.unwrap();

        let id = db.create_node(&mut tx, &[Label::UgvModule], module_props("cam")).await.unwrap();
        let node = db.get_node(&tx, id).await.unwrap().unwrap();

        assert_eq!(node.labels, vec!["UGV_Module"]);
        assert_eq!(node.get("module_id"), Some(&Value::from("cam")));
    }

    #[tokio::test]
    async fn test_create_relationship() {
        let db = MemoryBackend::new();
        let mut tx = db.begin_tx(TxMode::ReadWrite).await.unwrap();

        let a = db.create_node(&mut tx, &[Label::UgvModule], PropertyMap::new()).await.unwrap();
        let b = db.create_node(&mut tx, &[Label::BaseChassis], PropertyMap::new()).await.unwrap();

        db.create_relationship(&mut tx, a, b, RelType::MountedOn, PropertyMap::new()).await.unwrap();
        let out = db.get_relationships(&tx, a, Direction::Outgoing, Some(RelType::MountedOn)).await.unwrap();
        let inc = db.get_relationships(&tx, a, Direction::Incoming, None).await.unwrap();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].src, a);
        assert_eq!(out[0].dst, b);
        assert_eq!(out[0].rel_type, "MOUNTED_ON");
        assert!(inc.is_empty());
    }

    #[tokio::test]
    async fn test_relationship_requires_endpoints() {
        let db = MemoryBackend::new();
        let mut tx = db.begin_tx(TxMode::ReadWrite).await.unwrap();

        let a = db.create_node(&mut tx, &[Label::UgvModule], PropertyMap::new()).await.unwrap();
        let result = db.create_relationship(&mut tx, a, NodeId(999), RelType::MountedOn, PropertyMap::new()).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_relationship() {
        let db = MemoryBackend::new();
        let mut tx = db.begin_tx(TxMode::ReadWrite).await.unwrap();

        let a = db.create_node(&mut tx, &[Label::UgvModule], PropertyMap::new()).await.unwrap();
        let b = db.create_node(&mut tx, &[Label::UgvModule], PropertyMap::new()).await.unwrap();
        let rel = db.create_relationship(&mut tx, a, b, RelType::CompatibleWith, PropertyMap::new()).await.unwrap();

        assert!(db.delete_relationship(&mut tx, rel).await.unwrap());
        assert!(!db.delete_relationship(&mut tx, rel).await.unwrap());
        assert_eq!(db.relationship_count(&tx).await.unwrap(), 0);
        assert!(db.get_relationships(&tx, b, Direction::Both, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unique_constraint_enforced() {
        let db = MemoryBackend::new();
        db.create_constraint("module_id_unique", Label::UgvModule, "module_id", ConstraintType::Unique)
            .await
            .unwrap();
        let mut tx = db.begin_tx(TxMode::ReadWrite).await.unwrap();

        db.create_node(&mut tx, &[Label::UgvModule], module_props("cam")).await.unwrap();
        let dup = db.create_node(&mut tx, &[Label::UgvModule], module_props("cam")).await;
        assert!(matches!(dup, Err(Error::ConstraintViolation(_))));

        // Same value under a different label is fine.
        db.create_node(&mut tx, &[Label::Constraint], module_props("cam")).await.unwrap();
    }

    #[tokio::test]
    async fn test_unique_constraint_on_set_property() {
        let db = MemoryBackend::new();
        db.create_constraint("module_id_unique", Label::UgvModule, "module_id", ConstraintType::Unique)
            .await
            .unwrap();
        let mut tx = db.begin_tx(TxMode::ReadWrite).await.unwrap();

        db.create_node(&mut tx, &[Label::UgvModule], module_props("cam")).await.unwrap();
        let arm = db.create_node(&mut tx, &[Label::UgvModule], module_props("arm")).await.unwrap();

        let clash = db.set_node_property(&mut tx, arm, "module_id", Value::from("cam")).await;
        assert!(matches!(clash, Err(Error::ConstraintViolation(_))));
        db.set_node_property(&mut tx, arm, "module_id", Value::from("arm")).await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_schema_declaration_conflicts() {
        let db = MemoryBackend::new();
        db.create_index("module_type", Label::UgvModule, "module_type").await.unwrap();
        let again = db.create_index("module_type", Label::UgvModule, "module_type").await;
        assert!(matches!(again, Err(Error::SchemaConflict(_))));
    }

    #[tokio::test]
    async fn test_read_only_tx_rejects_writes() {
        let db = MemoryBackend::new();
        let mut tx = db.begin_tx(TxMode::ReadOnly).await.unwrap();
        let result = db.create_node(&mut tx, &[Label::UgvModule], PropertyMap::new()).await;
        assert!(matches!(result, Err(Error::TxError(_))));
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let db = MemoryBackend::new();
        db.shutdown().await.unwrap();
        db.shutdown().await.unwrap();
        assert!(matches!(db.begin_tx(TxMode::ReadOnly).await, Err(Error::Connection(_))));
    }

    #[tokio::test]
    async fn test_nodes_by_property() {
        let db = MemoryBackend::new();
        let mut tx = db.begin_tx(TxMode::ReadWrite).await.unwrap();

        db.create_node(&mut tx, &[Label::UgvModule], module_props("cam")).await.unwrap();
        db.create_node(&mut tx, &[Label::UgvModule], module_props("arm")).await.unwrap();

        let found = db
            .nodes_by_property(&tx, Label::UgvModule, "module_id", &Value::from("arm"))
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].get_str("module_id"), Some("arm"));

        let all = db.nodes_by_label(&tx, Label::UgvModule).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(db.node_count(&tx).await.unwrap(), 2);
    }
}
