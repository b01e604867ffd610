//! Mission validation pass: runs the budget and compatibility analyses
//! and records the verdict on the mission node.

use serde::Serialize;

use crate::domain::ValidationStatus;
use crate::graph::UgvGraph;
use crate::storage::StorageBackend;
use crate::Result;
use super::{CompatibilityReport, PowerBudgetReport};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissionValidation {
    pub mission_id: String,
    pub status: ValidationStatus,
    pub power: PowerBudgetReport,
    pub compatibility: CompatibilityReport,
}

impl<B: StorageBackend> UgvGraph<B> {
    /// A mission validates when its modules fit the budget and no pair
    /// conflicts; otherwise it is rejected. The status is written back to
    /// the mission. `None` when the mission does not exist.
    pub async fn validate_mission(&self, mission_id: &str, budget_kw: f64) -> Result<Option<MissionValidation>> {
        let Some(compatibility) = self.get_mission_compatibility(mission_id).await? else {
            return Ok(None);
        };
        let power = self.validate_mission_power_budget(mission_id, budget_kw).await?;

        let status = if power.within_budget() && compatibility.mission_viable {
            ValidationStatus::Validated
        } else {
            ValidationStatus::Rejected
        };
        self.set_mission_validation_status(mission_id, status).await?;
        tracing::info!(mission = mission_id, %status, "mission validation recorded");

        Ok(Some(MissionValidation {
            mission_id: mission_id.to_string(),
            status,
            power,
            compatibility,
        }))
    }
}
