//! Base chassis: the mounting platform with fixed power, thermal and
//! slot budgets.

use serde::Serialize;

use crate::model::{PropertyMap, Value};
use crate::schema::{keys, Label};
use crate::Result;
use super::module::{LifecycleStatus, PhysicalProperties};
use super::{require, GraphRecord};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChassisRecord {
    pub chassis_id: String,
    pub physical: PhysicalProperties,
    pub power_budget_kw: f64,
    pub thermal_limit_c: f64,
    pub num_module_slots: u32,
    pub status: LifecycleStatus,
}

impl ChassisRecord {
    pub fn new(
        chassis_id: impl Into<String>,
        physical: PhysicalProperties,
        power_budget_kw: f64,
        thermal_limit_c: f64,
        num_module_slots: u32,
    ) -> Self {
        Self {
            chassis_id: chassis_id.into(),
            physical,
            power_budget_kw,
            thermal_limit_c,
            num_module_slots,
            status: LifecycleStatus::Active,
        }
    }
}

impl GraphRecord for ChassisRecord {
    const ENTITY: &'static str = "Base_Chassis";
    const ID_KEY: &'static str = keys::CHASSIS_ID;

    fn labels(&self) -> Vec<Label> {
        vec![Label::BaseChassis]
    }

    fn business_id(&self) -> String {
        self.chassis_id.clone()
    }

    fn validate(&self) -> Result<()> {
        require(Self::ENTITY, keys::CHASSIS_ID, &self.chassis_id)
    }

    // Chassis nodes keep only the bulk physical figures.
    fn to_properties(&self) -> PropertyMap {
        [
            (keys::CHASSIS_ID, Value::from(self.chassis_id.as_str())),
            (keys::MASS_KG, self.physical.mass_kg.into()),
            ("volume_m3", self.physical.volume_m3.into()),
            ("material", self.physical.material.as_str().into()),
            ("power_budget_kw", self.power_budget_kw.into()),
            ("thermal_limit_c", self.thermal_limit_c.into()),
            ("num_module_slots", self.num_module_slots.into()),
            (keys::STATUS, self.status.as_str().into()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn chassis(id: &str) -> ChassisRecord {
        ChassisRecord::new(
            id,
            PhysicalProperties::new(25.0, 0.15, [0.2, 0.0, 0.05], "Al-7075-T73"),
            3.5,
            65.0,
            3,
        )
    }

    #[test]
    fn test_chassis_properties() {
        let props = chassis("C1").to_properties();
        assert_eq!(props.get("chassis_id"), Some(&Value::from("C1")));
        assert_eq!(props.get("power_budget_kw"), Some(&Value::Float(3.5)));
        assert_eq!(props.get("num_module_slots"), Some(&Value::Int(3)));
        assert_eq!(props.get("status"), Some(&Value::from("active")));
        assert!(!props.contains_key("cg_offset_x"));
    }

    #[test]
    fn test_blank_chassis_id_is_invalid() {
        assert!(matches!(
            chassis("").validate(),
            Err(Error::Validation { entity: "Base_Chassis", field: "chassis_id" })
        ));
    }
}
