//! Mission manifest rollup.

use serde::Serialize;

use crate::graph::{Endpoint, UgvGraph};
use crate::model::Direction;
use crate::schema::{keys, RelType};
use crate::storage::StorageBackend;
use crate::tx::TxMode;
use crate::Result;
use super::power_of;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManifestEntry {
    pub module_id: String,
    pub module_type: String,
    pub mass_kg: f64,
    pub power_w: f64,
    /// Constraint ids, sorted.
    pub constraints: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissionManifest {
    pub mission_id: String,
    pub mission_name: String,
    pub mission_type: String,
    pub duration_hours: f64,
    pub validation_status: String,
    pub modules: Vec<ManifestEntry>,
    pub num_modules: usize,
    pub total_mass_kg: f64,
    pub total_power_w: f64,
    pub total_power_kw: f64,
}

impl<B: StorageBackend> UgvGraph<B> {
    /// Every module on the mission with mass, power and constraints, plus
    /// totals. An existing mission with no modules yields zero totals;
    /// `None` only when the mission does not exist.
    pub async fn get_mission_manifest(&self, mission_id: &str) -> Result<Option<MissionManifest>> {
        let tx = self.session(TxMode::ReadOnly).await?;
        let result: Result<Option<MissionManifest>> = async {
            let Some(mission) = self.find(&tx, Endpoint::mission(mission_id)).await? else {
                return Ok(None);
            };

            let mut modules = Vec::new();
            for module in self.mission_modules(&tx, mission.id).await? {
                let mut constraints: Vec<String> = self
                    .neighbours(&tx, module.id, Direction::Outgoing, RelType::ConstrainedBy)
                    .await?
                    .into_iter()
                    .map(|(c, _)| c.str_or_empty(keys::CONSTRAINT_ID))
                    .collect();
                constraints.sort();

                modules.push(ManifestEntry {
                    module_id: module.str_or_empty(keys::MODULE_ID),
                    module_type: module.str_or_empty(keys::MODULE_TYPE),
                    mass_kg: module.get_f64(keys::MASS_KG).unwrap_or(0.0),
                    power_w: power_of(&module),
                    constraints,
                });
            }

            let total_mass_kg: f64 = modules.iter().map(|m| m.mass_kg).sum();
            let total_power_w: f64 = modules.iter().map(|m| m.power_w).sum();
            Ok(Some(MissionManifest {
                mission_id: mission_id.to_string(),
                mission_name: mission.str_or_empty(keys::MISSION_NAME),
                mission_type: mission.str_or_empty(keys::MISSION_TYPE),
                duration_hours: mission.get_f64(keys::DURATION_HOURS).unwrap_or(0.0),
                validation_status: mission.str_or_empty(keys::VALIDATION_STATUS),
                num_modules: modules.len(),
                total_mass_kg,
                total_power_w,
                total_power_kw: total_power_w / 1000.0,
                modules,
            }))
        }
        .await;
        self.finish(tx, result).await
    }
}
