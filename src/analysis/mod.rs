//! # Analyses
//!
//! Read-only aggregate queries over the UGV graph. Each runs in one
//! read-only session and is a pure function of the graph state.
//!
//! Compatibility and conflict edges are read in both directions
//! wherever they are consulted.

pub mod compatibility;
pub mod dependencies;
pub mod fleet;
pub mod manifest;
pub mod power;
pub mod validation;

pub use compatibility::{unordered_pairs, CompatibilityReport, PairClass, PairReport};
pub use dependencies::{MissionRef, ModuleDependencies};
pub use fleet::{InterfaceCoverage, ModulePower, ModuleUtilization, MountChain};
pub use manifest::{ManifestEntry, MissionManifest};
pub use power::{PowerBudget, PowerBudgetReport};
pub use validation::MissionValidation;

use crate::graph::UgvGraph;
use crate::model::{Direction, Node, NodeId};
use crate::schema::{keys, Label, RelType};
use crate::storage::StorageBackend;
use crate::Result;

impl<B: StorageBackend> UgvGraph<B> {
    /// Distinct modules linked to a mission, ordered by node id.
    pub(crate) async fn mission_modules(&self, tx: &B::Tx, mission: NodeId) -> Result<Vec<Node>> {
        let mut modules: Vec<Node> = self
            .neighbours(tx, mission, Direction::Incoming, RelType::PartOfMission)
            .await?
            .into_iter()
            .map(|(node, _)| node)
            .filter(|node| node.has_label(Label::UgvModule.as_str()))
            .collect();
        modules.sort_by_key(|n| n.id);
        Ok(modules)
    }
}

/// Declared power draw of a module node; absent reads as zero.
pub(crate) fn power_of(module: &Node) -> f64 {
    module.get_f64(keys::POWER_DRAW_W).unwrap_or(0.0)
}

/// Module ids of `nodes`, sorted and deduplicated.
pub(crate) fn sorted_module_ids(nodes: impl IntoIterator<Item = Node>) -> Vec<String> {
    let mut ids: Vec<String> = nodes.into_iter().map(|n| n.str_or_empty(keys::MODULE_ID)).collect();
    ids.sort();
    ids.dedup();
    ids
}
