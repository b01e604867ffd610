//! # Cypher Statements
//!
//! Parameterized Cypher generation for engines reached over the network.
//! Pure functions with no I/O or storage dependency.
//!
//! Only three kinds of token ever reach statement text: fixed fragments
//! written in this module, schema tokens ([`Label`](crate::schema::Label),
//! [`RelType`](crate::schema::RelType)), and property keys that pass
//! [`validate_ident`]. Every data value is bound as a parameter.

pub mod statement;

pub use statement::{Statement, StatementBuilder, validate_ident};
