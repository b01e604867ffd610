//! Fleet-wide views across every module.

use serde::Serialize;

use crate::graph::UgvGraph;
use crate::model::{Direction, Node, NodeId};
use crate::schema::{keys, Label, RelType};
use crate::storage::StorageBackend;
use crate::tx::TxMode;
use crate::Result;
use super::power_of;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModulePower {
    pub module_id: String,
    pub module_type: String,
    pub power_draw_w: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleUtilization {
    pub module_id: String,
    pub module_type: String,
    pub mission_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterfaceCoverage {
    pub module_id: String,
    pub interfaces: Vec<String>,
    pub interface_count: usize,
}

/// Longest mount chains are at most this many hops.
pub const MAX_MOUNT_DEPTH: usize = 3;

/// One MOUNTED_ON path from a module down to a chassis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MountChain {
    pub module_id: String,
    pub chain_depth: usize,
    /// `<business id>::<first label>` per node, module first.
    pub path_nodes: Vec<String>,
}

fn path_entry(node: &Node) -> String {
    let id = node
        .get_str(keys::MODULE_ID)
        .or_else(|| node.get_str(keys::CHASSIS_ID))
        .unwrap_or_default();
    let label = node.labels.first().map(String::as_str).unwrap_or_default();
    format!("{id}::{label}")
}

impl<B: StorageBackend> UgvGraph<B> {
    /// Modules drawing strictly more than `threshold_w`, highest first.
    pub async fn modules_above_power(&self, threshold_w: f64) -> Result<Vec<ModulePower>> {
        let tx = self.session(TxMode::ReadOnly).await?;
        let result = self.backend().nodes_by_label(&tx, Label::UgvModule).await.map(|modules| {
            let mut rows: Vec<ModulePower> = modules
                .iter()
                .filter(|m| power_of(m) > threshold_w)
                .map(|m| ModulePower {
                    module_id: m.str_or_empty(keys::MODULE_ID),
                    module_type: m.str_or_empty(keys::MODULE_TYPE),
                    power_draw_w: power_of(m),
                })
                .collect();
            rows.sort_by(|a, b| {
                b.power_draw_w
                    .total_cmp(&a.power_draw_w)
                    .then_with(|| a.module_id.cmp(&b.module_id))
            });
            rows
        });
        self.finish(tx, result).await
    }

    /// Number of distinct missions per module, for modules on at least
    /// one mission. Most used first.
    pub async fn module_utilization(&self) -> Result<Vec<ModuleUtilization>> {
        let tx = self.session(TxMode::ReadOnly).await?;
        let result: Result<Vec<ModuleUtilization>> = async {
            let mut rows = Vec::new();
            for module in self.backend().nodes_by_label(&tx, Label::UgvModule).await? {
                let missions = self
                    .neighbours(&tx, module.id, Direction::Outgoing, RelType::PartOfMission)
                    .await?;
                if missions.is_empty() {
                    continue;
                }
                rows.push(ModuleUtilization {
                    module_id: module.str_or_empty(keys::MODULE_ID),
                    module_type: module.str_or_empty(keys::MODULE_TYPE),
                    mission_count: missions.len(),
                });
            }
            rows.sort_by(|a, b| {
                b.mission_count.cmp(&a.mission_count).then_with(|| a.module_id.cmp(&b.module_id))
            });
            Ok(rows)
        }
        .await;
        self.finish(tx, result).await
    }

    /// Distinct interface kinds per module, for modules with at least one.
    pub async fn interface_coverage(&self) -> Result<Vec<InterfaceCoverage>> {
        let tx = self.session(TxMode::ReadOnly).await?;
        let result: Result<Vec<InterfaceCoverage>> = async {
            let mut rows = Vec::new();
            for module in self.backend().nodes_by_label(&tx, Label::UgvModule).await? {
                let mut interfaces: Vec<String> = self
                    .neighbours(&tx, module.id, Direction::Outgoing, RelType::HasInterface)
                    .await?
                    .into_iter()
                    .map(|(i, _)| i.str_or_empty(keys::INTERFACE_TYPE))
                    .collect();
                if interfaces.is_empty() {
                    continue;
                }
                interfaces.sort();
                interfaces.dedup();
                rows.push(InterfaceCoverage {
                    module_id: module.str_or_empty(keys::MODULE_ID),
                    interface_count: interfaces.len(),
                    interfaces,
                });
            }
            rows.sort_by(|a, b| {
                b.interface_count.cmp(&a.interface_count).then_with(|| a.module_id.cmp(&b.module_id))
            });
            Ok(rows)
        }
        .await;
        self.finish(tx, result).await
    }

    /// Every MOUNTED_ON path of up to [`MAX_MOUNT_DEPTH`] hops that ends
    /// on a chassis, deepest first, at most `limit` rows.
    pub async fn mount_chains(&self, limit: usize) -> Result<Vec<MountChain>> {
        let tx = self.session(TxMode::ReadOnly).await?;
        let result: Result<Vec<MountChain>> = async {
            let mut rows = Vec::new();
            for module in self.backend().nodes_by_label(&tx, Label::UgvModule).await? {
                let module_id = module.str_or_empty(keys::MODULE_ID);
                let mut stack: Vec<Vec<Node>> = vec![vec![module]];

                while let Some(path) = stack.pop() {
                    let Some(last) = path.last() else { continue };
                    if last.has_label(Label::BaseChassis.as_str()) {
                        rows.push(MountChain {
                            module_id: module_id.clone(),
                            chain_depth: path.len() - 1,
                            path_nodes: path.iter().map(path_entry).collect(),
                        });
                    }
                    if path.len() > MAX_MOUNT_DEPTH {
                        continue;
                    }
                    let visited: Vec<NodeId> = path.iter().map(|n| n.id).collect();
                    for (next, _) in self
                        .neighbours(&tx, last.id, Direction::Outgoing, RelType::MountedOn)
                        .await?
                    {
                        if visited.contains(&next.id) {
                            continue;
                        }
                        let mut longer = path.clone();
                        longer.push(next);
                        stack.push(longer);
                    }
                }
            }
            rows.sort_by(|a, b| {
                b.chain_depth
                    .cmp(&a.chain_depth)
                    .then_with(|| a.module_id.cmp(&b.module_id))
                    .then_with(|| a.path_nodes.cmp(&b.path_nodes))
            });
            rows.truncate(limit);
            Ok(rows)
        }
        .await;
        self.finish(tx, result).await
    }
}
