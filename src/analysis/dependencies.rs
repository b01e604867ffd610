//! Everything one module is linked to.

use serde::Serialize;

use crate::graph::{Endpoint, UgvGraph};
use crate::model::{Direction, Node};
use crate::schema::{keys, RelType};
use crate::storage::StorageBackend;
use crate::tx::TxMode;
use crate::Result;
use super::{power_of, sorted_module_ids};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissionRef {
    pub mission_id: String,
    pub mission_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleDependencies {
    pub module_id: String,
    pub module_type: String,
    pub status: String,
    pub description: String,
    pub power_w: f64,
    /// Chassis id; with several mounts the oldest edge wins.
    pub mounted_on: Option<String>,
    pub mount_slot: Option<String>,
    pub missions: Vec<MissionRef>,
    /// Interface kinds, sorted.
    pub interfaces: Vec<String>,
    pub conflicts: Vec<String>,
    pub compatible_with: Vec<String>,
}

impl<B: StorageBackend> UgvGraph<B> {
    /// `None` when the module id does not resolve.
    pub async fn find_module_dependencies(&self, module_id: &str) -> Result<Option<ModuleDependencies>> {
        let tx = self.session(TxMode::ReadOnly).await?;
        let result: Result<Option<ModuleDependencies>> = async {
            let Some(module) = self.find(&tx, Endpoint::module(module_id)).await? else {
                return Ok(None);
            };

            let mount = self
                .neighbours(&tx, module.id, Direction::Outgoing, RelType::MountedOn)
                .await?
                .into_iter()
                .next();
            let (mounted_on, mount_slot) = match mount {
                Some((chassis, edge)) => (
                    chassis.get_str(keys::CHASSIS_ID).map(str::to_string),
                    edge.properties.get(keys::SLOT).and_then(|v| v.as_str()).map(str::to_string),
                ),
                None => (None, None),
            };

            let mut missions: Vec<MissionRef> = self
                .neighbours(&tx, module.id, Direction::Outgoing, RelType::PartOfMission)
                .await?
                .into_iter()
                .map(|(m, _)| MissionRef {
                    mission_id: m.str_or_empty(keys::MISSION_ID),
                    mission_name: m.str_or_empty(keys::MISSION_NAME),
                })
                .collect();
            missions.sort_by(|a, b| a.mission_id.cmp(&b.mission_id));

            let mut interfaces: Vec<String> = self
                .neighbours(&tx, module.id, Direction::Outgoing, RelType::HasInterface)
                .await?
                .into_iter()
                .map(|(i, _)| i.str_or_empty(keys::INTERFACE_TYPE))
                .collect();
            interfaces.sort();
            interfaces.dedup();

            let conflicts = self.paired(&tx, &module, RelType::ConflictsWith).await?;
            let compatible_with = self.paired(&tx, &module, RelType::CompatibleWith).await?;

            Ok(Some(ModuleDependencies {
                module_id: module.str_or_empty(keys::MODULE_ID),
                module_type: module.str_or_empty(keys::MODULE_TYPE),
                status: module.str_or_empty(keys::STATUS),
                description: module.str_or_empty(keys::DESCRIPTION),
                power_w: power_of(&module),
                mounted_on,
                mount_slot,
                missions,
                interfaces,
                conflicts,
                compatible_with,
            }))
        }
        .await;
        self.finish(tx, result).await
    }

    async fn paired(&self, tx: &B::Tx, module: &Node, rel_type: RelType) -> Result<Vec<String>> {
        let others = self.neighbours(tx, module.id, Direction::Both, rel_type).await?;
        Ok(sorted_module_ids(others.into_iter().map(|(n, _)| n)))
    }
}
