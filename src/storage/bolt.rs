//! Neo4j storage backend over the Bolt protocol.
//!
//! Every primitive is rendered by [`crate::cypher::statement`] into one
//! parameterized statement and submitted as its own auto-commit
//! transaction. `BoltTx` is therefore a session marker: the engine's
//! single-statement transaction granularity is preserved as-is and
//! `commit_tx` / `rollback_tx` have nothing to flush.
//!
//! The connection pool is opened once in [`BoltBackend::connect`] and
//! released by `shutdown`, which may be called any number of times.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use neo4rs::{BoltNull, BoltType, ConfigBuilder, Graph, Row};
use parking_lot::RwLock;

use crate::cypher::statement::{self, Statement};
use crate::model::*;
use crate::schema::{Label, RelType};
use crate::tx::{Transaction, TxId, TxMode};
use crate::{Error, Result};
use super::{BackendConfig, ConstraintType, StorageBackend};

// ============================================================================
// BoltBackend
// ============================================================================

/// Connection to an external Neo4j instance.
pub struct BoltBackend {
    graph: RwLock<Option<Arc<Graph>>>,
    next_tx_id: AtomicU64,
}

impl BoltBackend {
    /// Open the connection pool.
    pub async fn connect(uri: &str, user: &str, password: &str, database: Option<&str>) -> Result<Self> {
        let mut builder = ConfigBuilder::default().uri(uri).user(user).password(password);
        if let Some(db) = database {
            builder = builder.db(db);
        }
        let config = builder
            .build()
            .map_err(|e| Error::Connection(format!("invalid Bolt configuration: {e}")))?;
        let graph = Graph::connect(config)
            .await
            .map_err(|e| Error::Connection(format!("failed to connect to {uri}: {e}")))?;

        tracing::info!(uri, "connected to graph engine");
        Ok(Self {
            graph: RwLock::new(Some(Arc::new(graph))),
            next_tx_id: AtomicU64::new(1),
        })
    }

    /// Open the connection described by a [`BackendConfig::Bolt`].
    pub async fn from_config(config: &BackendConfig) -> Result<Self> {
        match config {
            BackendConfig::Bolt { uri, user, password, database } => {
                Self::connect(uri, user, password, database.as_deref()).await
            }
            BackendConfig::Memory => Err(Error::Connection(
                "Bolt backend requires a Bolt configuration".into(),
            )),
        }
    }

    fn graph(&self) -> Result<Arc<Graph>> {
        self.graph
            .read()
            .clone()
            .ok_or_else(|| Error::Connection("Bolt connection has been shut down".into()))
    }

    /// Submit one statement and collect every row.
    async fn fetch(&self, stmt: Statement) -> Result<Vec<Row>> {
        let graph = self.graph()?;
        tracing::debug!(statement = %stmt.text, params = stmt.params.len(), "submitting statement");

        let mut stream = graph.execute(to_query(&stmt)).await.map_err(engine_error)?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next().await.map_err(engine_error)? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Submit a schema statement, discarding the result.
    async fn run(&self, stmt: Statement) -> Result<()> {
        let graph = self.graph()?;
        graph.run(to_query(&stmt)).await.map_err(engine_error)
    }
}

// ============================================================================
// Conversions
// ============================================================================

fn to_query(stmt: &Statement) -> neo4rs::Query {
    stmt.params
        .iter()
        .fold(neo4rs::query(&stmt.text), |q, (k, v)| q.param(k, to_bolt(v)))
}

fn to_bolt(value: &Value) -> BoltType {
    match value {
        Value::Null => BoltType::Null(BoltNull),
        Value::Bool(b) => BoltType::from(*b),
        Value::Int(i) => BoltType::from(*i),
        Value::Float(f) => BoltType::from(*f),
        Value::String(s) => BoltType::from(s.as_str()),
        Value::List(items) => BoltType::from(items.iter().map(to_bolt).collect::<Vec<BoltType>>()),
        Value::Map(map) => BoltType::from(
            map.iter()
                .map(|(k, v)| (k.clone(), to_bolt(v)))
                .collect::<HashMap<String, BoltType>>(),
        ),
    }
}

/// Schema status codes meaning the declaration is already in place.
const SCHEMA_EXISTS_CODES: &[&str] = &[
    "Neo.ClientError.Schema.EquivalentSchemaRuleAlreadyExists",
    "Neo.ClientError.Schema.ConstraintAlreadyExists",
    "Neo.ClientError.Schema.IndexAlreadyExists",
];

const CONSTRAINT_FAILED_CODE: &str = "Neo.ClientError.Schema.ConstraintValidationFailed";

/// Classify by status code. Uniqueness failures also say "already
/// exists" in their text, so the message alone is not enough.
fn engine_error(e: neo4rs::Error) -> Error {
    let msg = e.to_string();
    if msg.contains(CONSTRAINT_FAILED_CODE) {
        Error::ConstraintViolation(msg)
    } else if SCHEMA_EXISTS_CODES.iter().any(|code| msg.contains(code)) {
        Error::SchemaConflict(msg)
    } else {
        Error::Engine(msg)
    }
}

fn column<T: serde::de::DeserializeOwned>(row: &Row, key: &str) -> Result<T> {
    row.get::<T>(key)
        .map_err(|e| Error::Engine(format!("column '{key}': {e}")))
}

fn to_id(raw: i64) -> Result<u64> {
    u64::try_from(raw).map_err(|_| Error::TypeError {
        expected: "non-negative id".into(),
        got: raw.to_string(),
    })
}

fn decode_props(row: &Row) -> Result<PropertyMap> {
    let raw: HashMap<String, serde_json::Value> = column(row, "props")?;
    Ok(raw.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
}

fn decode_node(row: &Row) -> Result<Node> {
    Ok(Node {
        id: NodeId(to_id(column(row, "id")?)?),
        labels: column(row, "labels")?,
        properties: decode_props(row)?,
    })
}

fn decode_relationship(row: &Row) -> Result<Relationship> {
    Ok(Relationship {
        id: RelId(to_id(column(row, "id")?)?),
        src: NodeId(to_id(column(row, "src")?)?),
        dst: NodeId(to_id(column(row, "dst")?)?),
        rel_type: column(row, "rel_type")?,
        properties: decode_props(row)?,
    })
}

fn single_count(rows: &[Row], key: &str) -> Result<i64> {
    match rows.first() {
        Some(row) => column(row, key),
        None => Ok(0),
    }
}

// ============================================================================
// BoltTx
// ============================================================================

/// Session marker; statements auto-commit.
pub struct BoltTx {
    id: TxId,
    mode: TxMode,
}

impl Transaction for BoltTx {
    fn mode(&self) -> TxMode { self.mode }
    fn id(&self) -> TxId { self.id }
}

// ============================================================================
// StorageBackend impl
// ============================================================================

#[async_trait]
impl StorageBackend for BoltBackend {
    type Tx = BoltTx;

    async fn shutdown(&self) -> Result<()> {
        if self.graph.write().take().is_some() {
            tracing::info!("Bolt connection released");
        }
        Ok(())
    }

    async fn begin_tx(&self, mode: TxMode) -> Result<BoltTx> {
        self.graph()?;
        let id = TxId(self.next_tx_id.fetch_add(1, Ordering::Relaxed));
        Ok(BoltTx { id, mode })
    }

    async fn commit_tx(&self, _tx: BoltTx) -> Result<()> { Ok(()) }

    async fn rollback_tx(&self, _tx: BoltTx) -> Result<()> { Ok(()) }

    // ========================================================================
    // Node CRUD
    // ========================================================================

    async fn create_node(
        &self,
        _tx: &mut BoltTx,
        labels: &[Label],
        props: PropertyMap,
    ) -> Result<NodeId> {
        let rows = self.fetch(statement::create_node(labels, &props)?).await?;
        let row = rows
            .first()
            .ok_or_else(|| Error::Engine("CREATE returned no id".into()))?;
        Ok(NodeId(to_id(column(row, "id")?)?))
    }

    async fn get_node(&self, _tx: &BoltTx, id: NodeId) -> Result<Option<Node>> {
        let rows = self.fetch(statement::get_node(id)).await?;
        rows.first().map(decode_node).transpose()
    }

    async fn set_node_property(
        &self,
        _tx: &mut BoltTx,
        id: NodeId,
        key: &str,
        val: Value,
    ) -> Result<()> {
        let rows = self.fetch(statement::set_node_property(id, key, val)?).await?;
        if single_count(&rows, "updated")? == 0 {
            return Err(Error::NotFound(format!("Node {id}")));
        }
        Ok(())
    }

    // ========================================================================
    // Relationship CRUD
    // ========================================================================

    async fn create_relationship(
        &self,
        _tx: &mut BoltTx,
        src: NodeId,
        dst: NodeId,
        rel_type: RelType,
        props: PropertyMap,
    ) -> Result<RelId> {
        let rows = self
            .fetch(statement::create_relationship(src, dst, rel_type, &props)?)
            .await?;
        let row = rows
            .first()
            .ok_or_else(|| Error::NotFound(format!("endpoint {src} or {dst}")))?;
        Ok(RelId(to_id(column(row, "id")?)?))
    }

    async fn delete_relationship(&self, _tx: &mut BoltTx, id: RelId) -> Result<bool> {
        let rows = self.fetch(statement::delete_relationship(id)).await?;
        Ok(single_count(&rows, "deleted")? > 0)
    }

    // ========================================================================
    // Traversal
    // ========================================================================

    async fn get_relationships(
        &self,
        _tx: &BoltTx,
        node: NodeId,
        dir: Direction,
        rel_type: Option<RelType>,
    ) -> Result<Vec<Relationship>> {
        let rows = self.fetch(statement::relationships(node, dir, rel_type)).await?;
        let mut rels = rows.iter().map(decode_relationship).collect::<Result<Vec<_>>>()?;
        // A self-loop matches an undirected pattern twice.
        rels.dedup_by_key(|r| r.id);
        Ok(rels)
    }

    // ========================================================================
    // Scan
    // ========================================================================

    async fn nodes_by_label(&self, _tx: &BoltTx, label: Label) -> Result<Vec<Node>> {
        let rows = self.fetch(statement::nodes_by_label(label)).await?;
        rows.iter().map(decode_node).collect()
    }

    async fn nodes_by_property(
        &self,
        _tx: &BoltTx,
        label: Label,
        key: &str,
        value: &Value,
    ) -> Result<Vec<Node>> {
        let rows = self.fetch(statement::nodes_by_property(label, key, value)?).await?;
        rows.iter().map(decode_node).collect()
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    async fn node_count(&self, _tx: &BoltTx) -> Result<u64> {
        let rows = self.fetch(statement::count_nodes()).await?;
        to_id(single_count(&rows, "count")?)
    }

    async fn relationship_count(&self, _tx: &BoltTx) -> Result<u64> {
        let rows = self.fetch(statement::count_relationships()).await?;
        to_id(single_count(&rows, "count")?)
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
        let stmt = match constraint_type {
            ConstraintType::Unique => statement::create_unique_constraint(name, label, property)?,
        };
        self.run(stmt).await
    }

    async fn create_index(&self, name: &str, label: Label, property: &str) -> Result<()> {
        self.run(statement::create_index(name, label, property)?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_bolt_scalars() {
        assert!(matches!(to_bolt(&Value::Int(7)), BoltType::Integer(_)));
        assert!(matches!(to_bolt(&Value::from("24VDC")), BoltType::String(_)));
        assert!(matches!(to_bolt(&Value::List(vec![Value::Float(1.5)])), BoltType::List(_)));
        assert!(matches!(to_bolt(&Value::Null), BoltType::Null(_)));
    }

    #[test]
    fn test_engine_error_classification() {
        let duplicate = neo4rs::Error::UnexpectedMessage(
            "Neo.ClientError.Schema.ConstraintValidationFailed: Node(12) already exists with label \
             `UGV_Module` and property `module_id` = 'cam'"
                .into(),
        );
        assert!(matches!(engine_error(duplicate), Error::ConstraintViolation(_)));

        let redeclared = neo4rs::Error::UnexpectedMessage(
            "Neo.ClientError.Schema.EquivalentSchemaRuleAlreadyExists: An equivalent constraint \
             already exists"
                .into(),
        );
        assert!(matches!(engine_error(redeclared), Error::SchemaConflict(_)));

        let index = neo4rs::Error::UnexpectedMessage(
            "Neo.ClientError.Schema.IndexAlreadyExists: There already exists an index".into(),
        );
        assert!(matches!(engine_error(index), Error::SchemaConflict(_)));

        let other = neo4rs::Error::UnexpectedMessage("Neo.ClientError.Statement.SyntaxError".into());
        assert!(matches!(engine_error(other), Error::Engine(_)));
    }
}
