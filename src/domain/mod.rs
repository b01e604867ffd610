//! # Domain Records
//!
//! Typed UGV records and their mapping onto graph nodes. Each record
//! knows its labels, its business id and how to flatten itself into a
//! property map; [`crate::UgvGraph`] does the writing.
//!
//! Records are validated before any backend call. Only identifying
//! fields are required.

pub mod chassis;
pub mod constraint;
pub mod interface;
pub mod mission;
pub mod module;

pub use chassis::ChassisRecord;
pub use constraint::ConstraintRecord;
pub use interface::{
    ElectricalInterface, ForceLimits, InterfaceKind, InterfaceRecord, InterfaceSpec,
    MechanicalInterface, MomentLimits, ThermalInterface,
};
pub use mission::{MissionRecord, ValidationStatus};
pub use module::{LifecycleStatus, ModuleRecord, ModuleType, PhysicalProperties};

use serde::Serialize;

use crate::model::{NodeId, PropertyMap};
use crate::schema::Label;
use crate::{Error, Result};

/// A record that maps onto exactly one node.
pub trait GraphRecord {
    /// Human-readable entity name for logs and errors.
    const ENTITY: &'static str;
    /// Property holding the business id.
    const ID_KEY: &'static str;

    /// Labels for the node; the first is the primary label used for lookups.
    fn labels(&self) -> Vec<Label>;

    fn business_id(&self) -> String;

    /// Reject the record if an identifying field is missing.
    fn validate(&self) -> Result<()>;

    fn to_properties(&self) -> PropertyMap;
}

/// Result of a single-node creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Created {
    pub node_id: NodeId,
    pub business_id: String,
}

/// Fail with a validation error when `value` is empty or whitespace.
pub(crate) fn require(entity: &'static str, field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Validation { entity, field });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require() {
        assert!(require("UGV_Module", "module_id", "cam_001").is_ok());
        assert!(matches!(
            require("UGV_Module", "module_id", "  \t"),
            Err(Error::Validation { entity: "UGV_Module", field: "module_id" })
        ));
    }
}
