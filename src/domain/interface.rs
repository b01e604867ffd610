//! Interface specs and their flattened, kind-prefixed property bags.
//!
//! Each kind maps to its own key namespace (`mech_`, `elec_`, `therm_`)
//! so the three kinds can never collide on one node. The kind itself is
//! stored as the first-class `interface_type` field; reading a bag back
//! dispatches on that field, never on key prefixes.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::model::{PropertyMap, Value};
use crate::schema::{keys, Label};
use crate::{Error, Result};
use super::{require, GraphRecord};

// ============================================================================
// Kinds
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InterfaceKind {
    Mechanical,
    Electrical,
    Thermal,
}

impl InterfaceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            InterfaceKind::Mechanical => "mechanical",
            InterfaceKind::Electrical => "electrical",
            InterfaceKind::Thermal => "thermal",
        }
    }

    /// Key namespace for this kind's fields.
    pub fn prefix(self) -> &'static str {
        match self {
            InterfaceKind::Mechanical => "mech_",
            InterfaceKind::Electrical => "elec_",
            InterfaceKind::Thermal => "therm_",
        }
    }
}

impl fmt::Display for InterfaceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InterfaceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mechanical" => Ok(InterfaceKind::Mechanical),
            "electrical" => Ok(InterfaceKind::Electrical),
            "thermal" => Ok(InterfaceKind::Thermal),
            other => Err(Error::TypeError {
                expected: "interface kind".into(),
                got: other.to_string(),
            }),
        }
    }
}

// ============================================================================
// Records
// ============================================================================

/// Static force limits, N.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForceLimits {
    pub fx_max: f64,
    pub fy_max: f64,
    pub fz_max: f64,
}

/// Static moment limits, N·m.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MomentLimits {
    pub mx_max: f64,
    pub my_max: f64,
    pub mz_max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MechanicalInterface {
    pub connector_class: String,
    pub static_force_limits: ForceLimits,
    pub static_moment_limits: MomentLimits,
    pub dynamic_acceleration_g: f64,
    pub shock_g: f64,
    pub deflection_limit_mm: f64,
    /// kN/mm
    pub mounting_stiffness_min: f64,
    /// Hz
    pub natural_freq_min: f64,
    pub allowed_rotation_deg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElectricalInterface {
    /// e.g. "24VDC", "48VDC"
    pub power_rail: String,
    pub max_current_a: f64,
    pub power_draw_w: f64,
    /// e.g. "CAN-FD", "Ethernet"
    pub data_protocol: String,
    pub telemetry_rate_hz: f64,
    pub latency_requirement_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThermalInterface {
    pub max_heat_dissipation_w: f64,
    pub operating_temp_min_c: f64,
    pub operating_temp_max_c: f64,
    pub thermal_resistance_k_per_w: f64,
}

/// One declared interface of a module.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InterfaceSpec {
    Mechanical(MechanicalInterface),
    Electrical(ElectricalInterface),
    Thermal(ThermalInterface),
}

impl InterfaceSpec {
    pub fn kind(&self) -> InterfaceKind {
        match self {
            InterfaceSpec::Mechanical(_) => InterfaceKind::Mechanical,
            InterfaceSpec::Electrical(_) => InterfaceKind::Electrical,
            InterfaceSpec::Thermal(_) => InterfaceKind::Thermal,
        }
    }

    /// Flatten into `(prefixed key, value)` pairs. Does not include the
    /// `interface_type` tag.
    pub fn flatten(&self) -> PropertyMap {
        let kind = self.kind();
        let fields: Vec<(&str, Value)> = match self {
            InterfaceSpec::Mechanical(m) => vec![
                ("connector_class", m.connector_class.as_str().into()),
                ("static_force_fx_max", m.static_force_limits.fx_max.into()),
                ("static_force_fy_max", m.static_force_limits.fy_max.into()),
                ("static_force_fz_max", m.static_force_limits.fz_max.into()),
                ("static_moment_mx_max", m.static_moment_limits.mx_max.into()),
                ("static_moment_my_max", m.static_moment_limits.my_max.into()),
                ("static_moment_mz_max", m.static_moment_limits.mz_max.into()),
                ("dynamic_acceleration_g", m.dynamic_acceleration_g.into()),
                ("shock_g", m.shock_g.into()),
                ("deflection_limit_mm", m.deflection_limit_mm.into()),
                ("mounting_stiffness_min", m.mounting_stiffness_min.into()),
                ("natural_freq_min", m.natural_freq_min.into()),
                ("allowed_rotation_deg", m.allowed_rotation_deg.into()),
            ],
            InterfaceSpec::Electrical(e) => vec![
                ("power_rail", e.power_rail.as_str().into()),
                ("max_current_a", e.max_current_a.into()),
                ("power_draw_w", e.power_draw_w.into()),
                ("data_protocol", e.data_protocol.as_str().into()),
                ("telemetry_rate_hz", e.telemetry_rate_hz.into()),
                ("latency_requirement_ms", e.latency_requirement_ms.into()),
            ],
            InterfaceSpec::Thermal(t) => vec![
                ("max_heat_dissipation_w", t.max_heat_dissipation_w.into()),
                ("operating_temp_min_c", t.operating_temp_min_c.into()),
                ("operating_temp_max_c", t.operating_temp_max_c.into()),
                ("thermal_resistance_k_per_w", t.thermal_resistance_k_per_w.into()),
            ],
        };

        fields
            .into_iter()
            .map(|(k, v)| (format!("{}{k}", kind.prefix()), v))
            .collect()
    }

    /// Rebuild a typed spec from a node's property bag, dispatching on
    /// its `interface_type` field.
    pub fn from_properties(props: &PropertyMap) -> Result<Self> {
        let kind: InterfaceKind = props
            .get(keys::INTERFACE_TYPE)
            .and_then(Value::as_str)
            .ok_or_else(|| missing(keys::INTERFACE_TYPE))?
            .parse()?;
        let bag = Bag { props, prefix: kind.prefix() };

        Ok(match kind {
            InterfaceKind::Mechanical => InterfaceSpec::Mechanical(MechanicalInterface {
                connector_class: bag.text("connector_class")?,
                static_force_limits: ForceLimits {
                    fx_max: bag.num("static_force_fx_max")?,
                    fy_max: bag.num("static_force_fy_max")?,
                    fz_max: bag.num("static_force_fz_max")?,
                },
                static_moment_limits: MomentLimits {
                    mx_max: bag.num("static_moment_mx_max")?,
                    my_max: bag.num("static_moment_my_max")?,
                    mz_max: bag.num("static_moment_mz_max")?,
                },
                dynamic_acceleration_g: bag.num("dynamic_acceleration_g")?,
                shock_g: bag.num("shock_g")?,
                deflection_limit_mm: bag.num("deflection_limit_mm")?,
                mounting_stiffness_min: bag.num("mounting_stiffness_min")?,
                natural_freq_min: bag.num("natural_freq_min")?,
                allowed_rotation_deg: bag.num("allowed_rotation_deg")?,
            }),
            InterfaceKind::Electrical => InterfaceSpec::Electrical(ElectricalInterface {
                power_rail: bag.text("power_rail")?,
                max_current_a: bag.num("max_current_a")?,
                power_draw_w: bag.num("power_draw_w")?,
                data_protocol: bag.text("data_protocol")?,
                telemetry_rate_hz: bag.num("telemetry_rate_hz")?,
                latency_requirement_ms: bag.num("latency_requirement_ms")?,
            }),
            InterfaceKind::Thermal => InterfaceSpec::Thermal(ThermalInterface {
                max_heat_dissipation_w: bag.num("max_heat_dissipation_w")?,
                operating_temp_min_c: bag.num("operating_temp_min_c")?,
                operating_temp_max_c: bag.num("operating_temp_max_c")?,
                thermal_resistance_k_per_w: bag.num("thermal_resistance_k_per_w")?,
            }),
        })
    }
}

fn missing(key: &str) -> Error {
    Error::TypeError { expected: format!("property '{key}'"), got: "NULL".into() }
}

/// Prefixed view over a property map.
struct Bag<'a> {
    props: &'a PropertyMap,
    prefix: &'static str,
}

impl Bag<'_> {
    fn get(&self, field: &str) -> Result<&Value> {
        let key = format!("{}{field}", self.prefix);
        self.props.get(&key).ok_or_else(|| missing(&key))
    }

    fn num(&self, field: &str) -> Result<f64> {
        let v = self.get(field)?;
        v.as_float().ok_or_else(|| Error::TypeError {
            expected: "FLOAT".into(),
            got: v.type_name().into(),
        })
    }

    fn text(&self, field: &str) -> Result<String> {
        let v = self.get(field)?;
        v.as_str().map(str::to_string).ok_or_else(|| Error::TypeError {
            expected: "STRING".into(),
            got: v.type_name().into(),
        })
    }
}

// ============================================================================
// Interface_Spec node
// ============================================================================

/// An interface spec together with its owning module.
#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceRecord<'a> {
    pub module_id: &'a str,
    pub spec: &'a InterfaceSpec,
}

impl<'a> InterfaceRecord<'a> {
    pub fn new(module_id: &'a str, spec: &'a InterfaceSpec) -> Self {
        Self { module_id, spec }
    }

    /// `<module_id>_<kind>`: unique per module and kind, so re-creating
    /// the same interface collides on the uniqueness constraint.
    pub fn interface_id(module_id: &str, kind: InterfaceKind) -> String {
        format!("{module_id}_{kind}")
    }
}

impl GraphRecord for InterfaceRecord<'_> {
    const ENTITY: &'static str = "Interface_Spec";
    const ID_KEY: &'static str = keys::INTERFACE_ID;

    fn labels(&self) -> Vec<Label> {
        vec![Label::InterfaceSpec]
    }

    fn business_id(&self) -> String {
        Self::interface_id(self.module_id, self.spec.kind())
    }

    fn validate(&self) -> Result<()> {
        require(Self::ENTITY, keys::MODULE_ID, self.module_id)
    }

    fn to_properties(&self) -> PropertyMap {
        let mut props = self.spec.flatten();
        props.insert(keys::INTERFACE_ID.into(), self.business_id().into());
        props.insert(keys::INTERFACE_TYPE.into(), self.spec.kind().as_str().into());
        props.insert(keys::CREATED_TIMESTAMP.into(), chrono::Utc::now().to_rfc3339().into());
        props
    }
}
