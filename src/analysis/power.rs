//! Mission power-budget validation.

use serde::Serialize;

use crate::graph::{Endpoint, UgvGraph};
use crate::schema::keys;
use crate::storage::StorageBackend;
use crate::tx::TxMode;
use crate::Result;
use super::power_of;

/// A budget evaluated over a non-empty module set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PowerBudget {
    pub mission_id: String,
    pub mission_name: String,
    pub total_power_w: f64,
    pub total_power_kw: f64,
    pub budget_kw: f64,
    pub num_modules: usize,
    /// `total_power_kw <= budget_kw`, inclusive.
    pub within_budget: bool,
    /// `budget_kw - total_power_kw`; negative when over budget.
    pub margin_kw: f64,
    pub module_ids: Vec<String>,
}

impl PowerBudget {
    /// Evaluate `budget_kw` against `(module id, draw in W)` pairs.
    pub fn evaluate(
        mission_id: impl Into<String>,
        mission_name: impl Into<String>,
        draws: &[(String, f64)],
        budget_kw: f64,
    ) -> Self {
        let total_power_w: f64 = draws.iter().map(|(_, w)| w).sum();
        let total_power_kw = total_power_w / 1000.0;
        Self {
            mission_id: mission_id.into(),
            mission_name: mission_name.into(),
            total_power_w,
            total_power_kw,
            budget_kw,
            num_modules: draws.len(),
            within_budget: total_power_kw <= budget_kw,
            margin_kw: budget_kw - total_power_kw,
            module_ids: draws.iter().map(|(id, _)| id.clone()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PowerBudgetReport {
    Evaluated(PowerBudget),
    /// Nothing to evaluate: unknown mission or no linked modules. Never
    /// a pass.
    Invalid { mission_id: String, reason: String },
}

impl PowerBudgetReport {
    pub fn within_budget(&self) -> bool {
        matches!(self, PowerBudgetReport::Evaluated(b) if b.within_budget)
    }

    pub fn budget(&self) -> Option<&PowerBudget> {
        match self {
            PowerBudgetReport::Evaluated(b) => Some(b),
            PowerBudgetReport::Invalid { .. } => None,
        }
    }
}

impl<B: StorageBackend> UgvGraph<B> {
    /// Sum the power draw of the mission's modules and compare it with
    /// `budget_kw`.
    pub async fn validate_mission_power_budget(
        &self,
        mission_id: &str,
        budget_kw: f64,
    ) -> Result<PowerBudgetReport> {
        let tx = self.session(TxMode::ReadOnly).await?;
        let result: Result<PowerBudgetReport> = async {
            let Some(mission) = self.find(&tx, Endpoint::mission(mission_id)).await? else {
                return Ok(PowerBudgetReport::Invalid {
                    mission_id: mission_id.to_string(),
                    reason: "mission not found".into(),
                });
            };

            let draws: Vec<(String, f64)> = self
                .mission_modules(&tx, mission.id)
                .await?
                .iter()
                .map(|m| (m.str_or_empty(keys::MODULE_ID), power_of(m)))
                .collect();
            if draws.is_empty() {
                return Ok(PowerBudgetReport::Invalid {
                    mission_id: mission_id.to_string(),
                    reason: "no modules found".into(),
                });
            }

            Ok(PowerBudgetReport::Evaluated(PowerBudget::evaluate(
                mission_id,
                mission.str_or_empty(keys::MISSION_NAME),
                &draws,
                budget_kw,
            )))
        }
        .await;
        self.finish(tx, result).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draws(ws: &[f64]) -> Vec<(String, f64)> {
        ws.iter().enumerate().map(|(i, w)| (format!("m{i}"), *w)).collect()
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let b = PowerBudget::evaluate("MX", "X", &draws(&[1500.0, 2000.0]), 3.5);
        assert_eq!(b.total_power_kw, 3.5);
        assert!(b.within_budget);
        assert_eq!(b.margin_kw, 0.0);
    }

    #[test]
    fn test_over_budget_has_negative_margin() {
        let b = PowerBudget::evaluate("MX", "X", &draws(&[600.0, 600.0]), 1.0);
        assert!(!b.within_budget);
        assert!(b.margin_kw < 0.0);
        assert_eq!(b.num_modules, 2);
    }

    #[test]
    fn test_invalid_is_never_within_budget() {
        let report = PowerBudgetReport::Invalid { mission_id: "MX".into(), reason: "no modules found".into() };
        assert!(!report.within_budget());
        assert!(report.budget().is_none());
    }
}
