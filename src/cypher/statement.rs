//! Statement builder and the statements used by the Bolt backend.

use std::fmt::Write as _;

use crate::model::{Direction, NodeId, PropertyMap, RelId, Value};
use crate::schema::{Label, RelType};
use crate::{Error, Result};

/// Columns every node-returning statement yields.
pub const NODE_COLUMNS: &str = "RETURN id(n) AS id, labels(n) AS labels, properties(n) AS props";

/// Columns every relationship-returning statement yields.
pub const REL_COLUMNS: &str = "RETURN id(r) AS id, type(r) AS rel_type, \
     id(startNode(r)) AS src, id(endNode(r)) AS dst, properties(r) AS props";

/// A statement ready for submission: text plus bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub text: String,
    pub params: PropertyMap,
}

/// Check that a property key or schema name is a plain identifier.
pub fn validate_ident(key: &str) -> Result<&str> {
    let mut chars = key.chars();
    let head_ok = chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if head_ok && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(key)
    } else {
        Err(Error::InvalidToken(format!("'{key}' is not a valid identifier")))
    }
}

/// Incremental statement builder.
///
/// Text is appended only through the typed methods; values always go
/// through [`param`](Self::param) or [`named_param`](Self::named_param).
#[derive(Debug, Default)]
pub struct StatementBuilder {
    text: String,
    params: PropertyMap,
    next_param: usize,
}

impl StatementBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fixed fragment.
    pub fn push(&mut self, fragment: &'static str) -> &mut Self {
        self.text.push_str(fragment);
        self
    }

    /// Append `:Label` for each label.
    pub fn labels(&mut self, labels: &[Label]) -> &mut Self {
        for label in labels {
            self.text.push(':');
            self.text.push_str(label.as_str());
        }
        self
    }

    /// Append a relationship type token.
    pub fn rel_type(&mut self, rel_type: RelType) -> &mut Self {
        self.text.push_str(rel_type.as_str());
        self
    }

    /// Append a validated identifier (property key or schema name).
    pub fn ident(&mut self, key: &str) -> Result<&mut Self> {
        self.text.push_str(validate_ident(key)?);
        Ok(self)
    }

    /// Bind an anonymous parameter and append its placeholder.
    pub fn param(&mut self, value: impl Into<Value>) -> &mut Self {
        let name = format!("p{}", self.next_param);
        self.next_param += 1;
        let _ = write!(self.text, "${name}");
        self.params.insert(name, value.into());
        self
    }

    /// Bind a named parameter and append its placeholder.
    pub fn named_param(&mut self, name: &'static str, value: impl Into<Value>) -> &mut Self {
        let _ = write!(self.text, "${name}");
        self.params.insert(name.to_string(), value.into());
        self
    }

    /// Append `{k1: $p0, k2: $p1}`; keys are sorted so text is stable.
    pub fn property_map(&mut self, props: &PropertyMap) -> Result<&mut Self> {
        if props.is_empty() {
            return Ok(self);
        }
        let mut entries: Vec<_> = props.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        self.push(" {");
        for (i, (key, value)) in entries.into_iter().enumerate() {
            if i > 0 {
                self.push(", ");
            }
            self.ident(key)?.push(": ").param(value.clone());
        }
        self.push("}");
        Ok(self)
    }

    pub fn build(self) -> Statement {
        Statement { text: self.text, params: self.params }
    }
}

// ============================================================================
// Statements used by the Bolt backend
// ============================================================================

fn node_id_value(id: NodeId) -> Value {
    Value::Int(id.0 as i64)
}

pub fn create_node(labels: &[Label], props: &PropertyMap) -> Result<Statement> {
    let mut b = StatementBuilder::new();
    b.push("CREATE (n").labels(labels);
    b.property_map(props)?;
    b.push(") RETURN id(n) AS id");
    Ok(b.build())
}

pub fn get_node(id: NodeId) -> Statement {
    let mut b = StatementBuilder::new();
    b.push("MATCH (n) WHERE id(n) = ").named_param("id", node_id_value(id));
    b.push(" ").push(NODE_COLUMNS);
    b.build()
}

pub fn set_node_property(id: NodeId, key: &str, value: Value) -> Result<Statement> {
    let mut b = StatementBuilder::new();
    b.push("MATCH (n) WHERE id(n) = ").named_param("id", node_id_value(id));
    b.push(" SET n.").ident(key)?.push(" = ").named_param("value", value);
    b.push(" RETURN count(n) AS updated");
    Ok(b.build())
}

pub fn nodes_by_label(label: Label) -> Statement {
    let mut b = StatementBuilder::new();
    b.push("MATCH (n").labels(&[label]).push(") ").push(NODE_COLUMNS);
    b.push(" ORDER BY id");
    b.build()
}

pub fn nodes_by_property(label: Label, key: &str, value: &Value) -> Result<Statement> {
    let mut b = StatementBuilder::new();
    b.push("MATCH (n").labels(&[label]).push(" {");
    b.ident(key)?.push(": ").named_param("value", value.clone());
    b.push("}) ").push(NODE_COLUMNS).push(" ORDER BY id");
    Ok(b.build())
}

pub fn create_relationship(
    src: NodeId,
    dst: NodeId,
    rel_type: RelType,
    props: &PropertyMap,
) -> Result<Statement> {
    let mut b = StatementBuilder::new();
    b.push("MATCH (a) WHERE id(a) = ").named_param("src", node_id_value(src));
    b.push(" MATCH (b) WHERE id(b) = ").named_param("dst", node_id_value(dst));
    b.push(" CREATE (a)-[r:").rel_type(rel_type);
    b.property_map(props)?;
    b.push("]->(b) RETURN id(r) AS id");
    Ok(b.build())
}

pub fn delete_relationship(id: RelId) -> Statement {
    let mut b = StatementBuilder::new();
    b.push("MATCH ()-[r]->() WHERE id(r) = ").named_param("id", Value::Int(id.0 as i64));
    b.push(" DELETE r RETURN count(*) AS deleted");
    b.build()
}

pub fn relationships(node: NodeId, dir: Direction, rel_type: Option<RelType>) -> Statement {
    let mut b = StatementBuilder::new();
    b.push("MATCH (a)");
    b.push(match dir {
        Direction::Incoming => "<-[r",
        Direction::Outgoing | Direction::Both => "-[r",
    });
    if let Some(t) = rel_type {
        b.push(":").rel_type(t);
    }
    b.push(match dir {
        Direction::Outgoing => "]->(b)",
        Direction::Incoming | Direction::Both => "]-(b)",
    });
    b.push(" WHERE id(a) = ").named_param("id", node_id_value(node));
    b.push(" ").push(REL_COLUMNS).push(" ORDER BY id");
    b.build()
}

pub fn count_nodes() -> Statement {
    let mut b = StatementBuilder::new();
    b.push("MATCH (n) RETURN count(n) AS count");
    b.build()
}

pub fn count_relationships() -> Statement {
    let mut b = StatementBuilder::new();
    b.push("MATCH ()-[r]->() RETURN count(r) AS count");
    b.build()
}

/// No `IF NOT EXISTS`: a redundant declaration must fail so setup can
/// report it as already present.
pub fn create_unique_constraint(name: &str, label: Label, property: &str) -> Result<Statement> {
    let mut b = StatementBuilder::new();
    b.push("CREATE CONSTRAINT ").ident(name)?;
    b.push(" FOR (n").labels(&[label]);
    b.push(") REQUIRE n.").ident(property)?.push(" IS UNIQUE");
    Ok(b.build())
}

pub fn create_index(name: &str, label: Label, property: &str) -> Result<Statement> {
    let mut b = StatementBuilder::new();
    b.push("CREATE INDEX ").ident(name)?;
    b.push(" FOR (n").labels(&[label]);
    b.push(") ON (n.").ident(property)?.push(")");
    Ok(b.build())
}
