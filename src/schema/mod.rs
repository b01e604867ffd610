//! # UGV Graph Schema
//!
//! The closed vocabulary of node labels and relationship types, the
//! property keys used on them, and the uniqueness constraints and
//! secondary indexes declared at setup.
//!
//! Labels and relationship types are the only structural tokens that may
//! ever be interpolated into statement text (see [`crate::cypher`]).

use std::fmt;

use serde::Serialize;

use crate::storage::{ConstraintType, StorageBackend};
use crate::Error;

// ============================================================================
// Labels
// ============================================================================

/// Node labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Label {
    UgvModule,
    SensingModule,
    ManipulationModule,
    PayloadModule,
    AccessoryModule,
    BaseChassis,
    InterfaceSpec,
    MissionProfile,
    Constraint,
}

impl Label {
    pub fn as_str(self) -> &'static str {
        match self {
            Label::UgvModule => "UGV_Module",
            Label::SensingModule => "Sensing_Module",
            Label::ManipulationModule => "Manipulation_Module",
            Label::PayloadModule => "Payload_Module",
            Label::AccessoryModule => "Accessory_Module",
            Label::BaseChassis => "Base_Chassis",
            Label::InterfaceSpec => "Interface_Spec",
            Label::MissionProfile => "Mission_Profile",
            Label::Constraint => "Constraint",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Relationship types
// ============================================================================

/// Relationship types.
///
/// `ConnectsTo` and `DependsOn` are reserved: declared so they can be
/// used by statement generation, but no operation writes them yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RelType {
    HasInterface,
    MountedOn,
    PartOfMission,
    ConstrainedBy,
    CompatibleWith,
    ConflictsWith,
    ConnectsTo,
    DependsOn,
}

impl RelType {
    pub fn as_str(self) -> &'static str {
        match self {
            RelType::HasInterface => "HAS_INTERFACE",
            RelType::MountedOn => "MOUNTED_ON",
            RelType::PartOfMission => "PART_OF_MISSION",
            RelType::ConstrainedBy => "CONSTRAINED_BY",
            RelType::CompatibleWith => "COMPATIBLE_WITH",
            RelType::ConflictsWith => "CONFLICTS_WITH",
            RelType::ConnectsTo => "CONNECTS_TO",
            RelType::DependsOn => "DEPENDS_ON",
        }
    }
}

impl fmt::Display for RelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Property keys
// ============================================================================

/// Property keys shared by the domain mapping and the analyses.
pub mod keys {
    pub const MODULE_ID: &str = "module_id";
    pub const MODULE_TYPE: &str = "module_type";
    pub const CHASSIS_ID: &str = "chassis_id";
    pub const INTERFACE_ID: &str = "interface_id";
    pub const INTERFACE_TYPE: &str = "interface_type";
    pub const MISSION_ID: &str = "mission_id";
    pub const MISSION_NAME: &str = "mission_name";
    pub const MISSION_TYPE: &str = "mission_type";
    pub const CONSTRAINT_ID: &str = "constraint_id";
    pub const STATUS: &str = "status";
    pub const VALIDATION_STATUS: &str = "validation_status";
    pub const DESCRIPTION: &str = "description";
    pub const MASS_KG: &str = "mass_kg";
    pub const POWER_DRAW_W: &str = "power_draw_w";
    pub const POWER_RAIL: &str = "power_rail";
    pub const DURATION_HOURS: &str = "duration_hours";
    pub const CREATED_TIMESTAMP: &str = "created_timestamp";

    // MOUNTED_ON edge
    pub const SLOT: &str = "slot";
    pub const POSITION_X: &str = "position_x";
    pub const POSITION_Y: &str = "position_y";
    pub const POSITION_Z: &str = "position_z";

    // CONFLICTS_WITH edge
    pub const REASON: &str = "reason";
}

// ============================================================================
// Constraints and indexes
// ============================================================================

/// One schema declaration issued during setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaItem {
    Unique { name: &'static str, label: Label, property: &'static str },
    Index { name: &'static str, label: Label, property: &'static str },
}

impl SchemaItem {
    pub fn name(&self) -> &'static str {
        match self {
            SchemaItem::Unique { name, .. } | SchemaItem::Index { name, .. } => name,
        }
    }
}

/// Everything [`setup_schema`] declares, in order.
pub const SCHEMA: &[SchemaItem] = &[
    SchemaItem::Unique { name: "module_id_unique", label: Label::UgvModule, property: keys::MODULE_ID },
    SchemaItem::Unique { name: "interface_id_unique", label: Label::InterfaceSpec, property: keys::INTERFACE_ID },
    SchemaItem::Unique { name: "mission_id_unique", label: Label::MissionProfile, property: keys::MISSION_ID },
    SchemaItem::Unique { name: "chassis_id_unique", label: Label::BaseChassis, property: keys::CHASSIS_ID },
    SchemaItem::Unique { name: "constraint_id_unique", label: Label::Constraint, property: keys::CONSTRAINT_ID },
    SchemaItem::Index { name: "module_type", label: Label::UgvModule, property: keys::MODULE_TYPE },
    SchemaItem::Index { name: "module_status", label: Label::UgvModule, property: keys::STATUS },
    SchemaItem::Index { name: "mission_type", label: Label::MissionProfile, property: keys::MISSION_TYPE },
    SchemaItem::Index { name: "power_draw", label: Label::UgvModule, property: keys::POWER_DRAW_W },
];

/// Outcome of a schema setup run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SchemaReport {
    pub created: Vec<String>,
    pub already_present: Vec<String>,
    /// `(item name, engine message)`
    pub failed: Vec<(String, String)>,
}

impl SchemaReport {
    /// True when every item is now in place.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Declare every [`SCHEMA`] item against the backend.
///
/// Each item is attempted independently. An item that already exists is
/// noted and skipped; any other failure is logged and recorded, and the
/// remaining items are still attempted.
pub async fn setup_schema<B: StorageBackend>(backend: &B) -> SchemaReport {
    let mut report = SchemaReport::default();

    for item in SCHEMA {
        let outcome = match *item {
            SchemaItem::Unique { name, label, property } => {
                backend.create_constraint(name, label, property, ConstraintType::Unique).await
            }
            SchemaItem::Index { name, label, property } => {
                backend.create_index(name, label, property).await
            }
        };

        match outcome {
            Ok(()) => {
                tracing::info!(item = item.name(), "schema item created");
                report.created.push(item.name().to_string());
            }
            Err(Error::SchemaConflict(msg)) => {
                tracing::info!(item = item.name(), "schema item already present: {msg}");
                report.already_present.push(item.name().to_string());
            }
            Err(e) => {
                tracing::warn!(item = item.name(), "schema item not created: {e}");
                report.failed.push((item.name().to_string(), e.to_string()));
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;

    #[test]
    fn test_schema_names_are_unique() {
        let mut names: Vec<_> = SCHEMA.iter().map(SchemaItem::name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), SCHEMA.len());
    }

    #[tokio::test]
    async fn test_setup_is_idempotent() {
        let db = MemoryBackend::new();

        let first = setup_schema(&db).await;
        assert_eq!(first.created.len(), SCHEMA.len());
        assert!(first.already_present.is_empty());

        let second = setup_schema(&db).await;
        assert!(second.created.is_empty());
        assert_eq!(second.already_present.len(), SCHEMA.len());
        assert!(second.is_complete());
    }
}
