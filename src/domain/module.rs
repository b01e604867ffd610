//! UGV modules: the physical subsystems mounted on a chassis.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::model::{PropertyMap, Value};
use crate::schema::{keys, Label};
use crate::{Error, Result};
use super::interface::{ElectricalInterface, InterfaceSpec, MechanicalInterface, ThermalInterface};
use super::{require, GraphRecord};

// ============================================================================
// Vocabulary
// ============================================================================

/// Module category. Each maps to a secondary node label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleType {
    Sensing,
    Manipulation,
    Payload,
    Accessory,
}

impl ModuleType {
    pub fn as_str(self) -> &'static str {
        match self {
            ModuleType::Sensing => "sensing",
            ModuleType::Manipulation => "manipulation",
            ModuleType::Payload => "payload",
            ModuleType::Accessory => "accessory",
        }
    }

    pub fn label(self) -> Label {
        match self {
            ModuleType::Sensing => Label::SensingModule,
            ModuleType::Manipulation => Label::ManipulationModule,
            ModuleType::Payload => Label::PayloadModule,
            ModuleType::Accessory => Label::AccessoryModule,
        }
    }
}

impl fmt::Display for ModuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModuleType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sensing" => Ok(ModuleType::Sensing),
            "manipulation" => Ok(ModuleType::Manipulation),
            "payload" => Ok(ModuleType::Payload),
            "accessory" => Ok(ModuleType::Accessory),
            other => Err(Error::TypeError { expected: "module type".into(), got: other.into() }),
        }
    }
}

/// Lifecycle status of a module or chassis. Retirement is soft: nodes
/// are never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleStatus {
    #[default]
    Active,
    Maintenance,
    Retired,
}

impl LifecycleStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LifecycleStatus::Active => "active",
            LifecycleStatus::Maintenance => "maintenance",
            LifecycleStatus::Retired => "retired",
        }
    }
}

impl fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "active" => Ok(LifecycleStatus::Active),
            "maintenance" => Ok(LifecycleStatus::Maintenance),
            "retired" => Ok(LifecycleStatus::Retired),
            other => Err(Error::TypeError { expected: "lifecycle status".into(), got: other.into() }),
        }
    }
}

// ============================================================================
// Physical properties
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhysicalProperties {
    pub mass_kg: f64,
    pub volume_m3: f64,
    /// Center-of-gravity offset `[x, y, z]`, m.
    pub cg_offset: [f64; 3],
    pub material: String,
    pub surface_treatment: Option<String>,
}

impl PhysicalProperties {
    pub fn new(mass_kg: f64, volume_m3: f64, cg_offset: [f64; 3], material: impl Into<String>) -> Self {
        Self {
            mass_kg,
            volume_m3,
            cg_offset,
            material: material.into(),
            surface_treatment: None,
        }
    }

    pub fn with_surface_treatment(mut self, treatment: impl Into<String>) -> Self {
        self.surface_treatment = Some(treatment.into());
        self
    }
}

// ============================================================================
// ModuleRecord
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleRecord {
    pub module_id: String,
    pub module_type: ModuleType,
    pub physical: PhysicalProperties,
    pub mechanical: Option<MechanicalInterface>,
    pub electrical: Option<ElectricalInterface>,
    pub thermal: Option<ThermalInterface>,
    pub description: String,
    pub status: LifecycleStatus,
}

impl ModuleRecord {
    pub fn new(module_id: impl Into<String>, module_type: ModuleType, physical: PhysicalProperties) -> Self {
        Self {
            module_id: module_id.into(),
            module_type,
            physical,
            mechanical: None,
            electrical: None,
            thermal: None,
            description: String::new(),
            status: LifecycleStatus::Active,
        }
    }

    pub fn with_mechanical(mut self, iface: MechanicalInterface) -> Self {
        self.mechanical = Some(iface);
        self
    }

    pub fn with_electrical(mut self, iface: ElectricalInterface) -> Self {
        self.electrical = Some(iface);
        self
    }

    pub fn with_thermal(mut self, iface: ThermalInterface) -> Self {
        self.thermal = Some(iface);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Declared power draw: the electrical interface's draw, or zero.
    pub fn power_draw_w(&self) -> f64 {
        self.electrical.as_ref().map_or(0.0, |e| e.power_draw_w)
    }

    /// Declared interfaces in creation order: mechanical, electrical, thermal.
    pub fn interfaces(&self) -> Vec<InterfaceSpec> {
        let mut specs = Vec::new();
        if let Some(m) = &self.mechanical {
            specs.push(InterfaceSpec::Mechanical(m.clone()));
        }
        if let Some(e) = &self.electrical {
            specs.push(InterfaceSpec::Electrical(e.clone()));
        }
        if let Some(t) = &self.thermal {
            specs.push(InterfaceSpec::Thermal(t.clone()));
        }
        specs
    }
}

impl GraphRecord for ModuleRecord {
    const ENTITY: &'static str = "UGV_Module";
    const ID_KEY: &'static str = keys::MODULE_ID;

    fn labels(&self) -> Vec<Label> {
        vec![Label::UgvModule, self.module_type.label()]
    }

    fn business_id(&self) -> String {
        self.module_id.clone()
    }

    fn validate(&self) -> Result<()> {
        require(Self::ENTITY, keys::MODULE_ID, &self.module_id)
    }

    fn to_properties(&self) -> PropertyMap {
        let p = &self.physical;
        let [cg_x, cg_y, cg_z] = p.cg_offset;
        let mut props: PropertyMap = [
            (keys::MODULE_ID, Value::from(self.module_id.as_str())),
            (keys::MODULE_TYPE, self.module_type.as_str().into()),
            (keys::MASS_KG, p.mass_kg.into()),
            ("volume_m3", p.volume_m3.into()),
            ("cg_offset_x", cg_x.into()),
            ("cg_offset_y", cg_y.into()),
            ("cg_offset_z", cg_z.into()),
            ("material", p.material.as_str().into()),
            ("surface_treatment", p.surface_treatment.as_deref().unwrap_or("standard").into()),
            (keys::STATUS, self.status.as_str().into()),
            (keys::DESCRIPTION, self.description.as_str().into()),
            (keys::POWER_DRAW_W, self.power_draw_w().into()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        if let Some(e) = &self.electrical {
            props.insert(keys::POWER_RAIL.into(), e.power_rail.as_str().into());
        }
        props
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accessory() -> ModuleRecord {
        ModuleRecord::new(
            "mount_kit",
            ModuleType::Accessory,
            PhysicalProperties::new(1.2, 0.002, [0.0, 0.0, 0.01], "Al-6061-T6"),
        )
    }

    #[test]
    fn test_mechanical_only_module_draws_nothing() {
        let module = accessory();
        let props = module.to_properties();

        assert_eq!(module.power_draw_w(), 0.0);
        assert_eq!(props.get("power_draw_w"), Some(&Value::Float(0.0)));
        assert!(!props.contains_key("power_rail"));
        assert_eq!(props.get("surface_treatment"), Some(&Value::from("standard")));
        assert_eq!(props.get("status"), Some(&Value::from("active")));
    }

    #[test]
    fn test_power_comes_from_electrical_interface() {
        let module = accessory().with_electrical(ElectricalInterface {
            power_rail: "12VDC".into(),
            max_current_a: 2.0,
            power_draw_w: 18.5,
            data_protocol: "RS-485".into(),
            telemetry_rate_hz: 1.0,
            latency_requirement_ms: 500.0,
        });
        let props = module.to_properties();

        assert_eq!(props.get("power_draw_w"), Some(&Value::Float(18.5)));
        assert_eq!(props.get("power_rail"), Some(&Value::from("12VDC")));
        assert_eq!(module.interfaces().len(), 1);
    }

    #[test]
    fn test_labels_include_type_label() {
        assert_eq!(accessory().labels(), vec![Label::UgvModule, Label::AccessoryModule]);
    }

    #[test]
    fn test_vocabulary_round_trips_through_strings() {
        for t in [ModuleType::Sensing, ModuleType::Manipulation, ModuleType::Payload, ModuleType::Accessory] {
            assert_eq!(t.as_str().parse::<ModuleType>().unwrap(), t);
        }
        assert!("optical".parse::<ModuleType>().is_err());
        assert_eq!("retired".parse::<LifecycleStatus>().unwrap(), LifecycleStatus::Retired);
    }

    #[test]
    fn test_empty_id_is_invalid() {
        let mut module = accessory();
        module.module_id = String::new();
        assert!(matches!(module.validate(), Err(Error::Validation { .. })));
    }
}
