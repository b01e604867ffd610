//! Reference data set: one chassis, three modules, two missions and the
//! constraints that apply to them.

use serde::Serialize;

use crate::domain::{
    ChassisRecord, ConstraintRecord, ElectricalInterface, ForceLimits, MechanicalInterface,
    MissionRecord, ModuleRecord, ModuleType, MomentLimits, PhysicalProperties, ThermalInterface,
};
use crate::graph::UgvGraph;
use crate::storage::StorageBackend;
use crate::Result;

pub const CHASSIS: &str = "chassis_001";
pub const OPTICAL_CAMERA: &str = "module_optical_cam_001";
pub const EOD_ARM: &str = "module_arm_eod_001";
pub const EXTENDED_BATTERY: &str = "module_battery_extended_001";
pub const RECON_MISSION: &str = "mission_recon_001";
pub const EOD_MISSION: &str = "mission_eod_001";

/// Chassis power budget, kW.
pub const CHASSIS_BUDGET_KW: f64 = 3.5;

/// What a population run wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Population {
    /// Business ids of created nodes, interfaces included.
    pub nodes: Vec<String>,
    pub relationships: usize,
    /// Relationship requests whose endpoints did not resolve.
    pub skipped_relationships: usize,
}

impl Population {
    fn link(&mut self, created: bool) {
        if created {
            self.relationships += 1;
        } else {
            self.skipped_relationships += 1;
        }
    }
}

fn mount_v1(force: [f64; 3], moment: [f64; 3], natural_freq_min: f64) -> MechanicalInterface {
    MechanicalInterface {
        connector_class: "ISO_UGV_Mount_v1".into(),
        static_force_limits: ForceLimits { fx_max: force[0], fy_max: force[1], fz_max: force[2] },
        static_moment_limits: MomentLimits { mx_max: moment[0], my_max: moment[1], mz_max: moment[2] },
        dynamic_acceleration_g: 2.0,
        shock_g: 10.0,
        deflection_limit_mm: 1.5,
        mounting_stiffness_min: 10.0,
        natural_freq_min,
        allowed_rotation_deg: 0.5,
    }
}

fn electrical(rail: &str, max_current_a: f64, power_draw_w: f64, telemetry_rate_hz: f64, latency_ms: f64) -> ElectricalInterface {
    ElectricalInterface {
        power_rail: rail.into(),
        max_current_a,
        power_draw_w,
        data_protocol: "CAN-FD".into(),
        telemetry_rate_hz,
        latency_requirement_ms: latency_ms,
    }
}

fn thermal(dissipation_w: f64, min_c: f64, max_c: f64, resistance: f64) -> ThermalInterface {
    ThermalInterface {
        max_heat_dissipation_w: dissipation_w,
        operating_temp_min_c: min_c,
        operating_temp_max_c: max_c,
        thermal_resistance_k_per_w: resistance,
    }
}

/// The three reference modules.
pub fn reference_modules() -> Vec<ModuleRecord> {
    vec![
        ModuleRecord::new(
            OPTICAL_CAMERA,
            ModuleType::Sensing,
            PhysicalProperties::new(2.5, 0.008, [0.05, 0.0, 0.02], "Al-6061-T6").with_surface_treatment("anodized"),
        )
        .with_mechanical(mount_v1([1500.0, 800.0, 2000.0], [150.0, 200.0, 100.0], 80.0))
        .with_electrical(electrical("24VDC", 5.0, 120.0, 10.0, 100.0))
        .with_thermal(thermal(120.0, -10.0, 50.0, 0.5))
        .with_description("RGB/LWIR dual camera for reconnaissance"),
        ModuleRecord::new(
            EOD_ARM,
            ModuleType::Manipulation,
            PhysicalProperties::new(18.0, 0.025, [0.3, 0.05, 0.15], "CF-epoxy").with_surface_treatment("none"),
        )
        .with_mechanical(mount_v1([2000.0, 800.0, 2500.0], [200.0, 250.0, 250.0], 85.0))
        .with_electrical(electrical("48VDC", 15.0, 600.0, 20.0, 50.0))
        .with_thermal(thermal(600.0, -5.0, 45.0, 0.3))
        .with_description("6-DOF articulated arm for EOD tasks"),
        // Power source: draws nothing, no mechanical interface.
        ModuleRecord::new(
            EXTENDED_BATTERY,
            ModuleType::Accessory,
            PhysicalProperties::new(12.0, 0.012, [0.1, 0.0, 0.01], "Al-7075-T73").with_surface_treatment("anodized"),
        )
        .with_electrical(electrical("24VDC", 50.0, 0.0, 1.0, 1000.0))
        .with_thermal(thermal(100.0, 0.0, 40.0, 1.0))
        .with_description("Extended 4-hour battery pack"),
    ]
}

/// Write the reference data set. Expects an empty graph with the schema
/// already set up; re-running against a populated graph fails on the
/// uniqueness constraints.
pub async fn populate_reference_fleet<B: StorageBackend>(graph: &UgvGraph<B>) -> Result<Population> {
    let mut out = Population::default();

    let chassis = ChassisRecord::new(
        CHASSIS,
        PhysicalProperties::new(25.0, 0.15, [0.2, 0.0, 0.05], "Al-7075-T73").with_surface_treatment("anodized"),
        CHASSIS_BUDGET_KW,
        65.0,
        3,
    );
    out.nodes.push(graph.create_chassis(&chassis).await?.business_id);

    for module in reference_modules() {
        let created = graph.create_module(&module).await?;
        out.nodes.push(created.module_id);
        out.nodes.extend(created.interfaces.into_iter().map(|i| i.business_id));
        // HAS_INTERFACE edges
        out.relationships += module.interfaces().len();
    }

    let missions = [
        MissionRecord::new(RECON_MISSION, "Urban Reconnaissance", "reconnaissance", 4.0)
            .with_description("Multi-building surveillance with RGB/LWIR feed"),
        MissionRecord::new(EOD_MISSION, "EOD Disposal", "eod", 2.0)
            .with_description("Explosive device identification and safe disposal"),
    ];
    for mission in &missions {
        out.nodes.push(graph.create_mission(mission).await?.business_id);
    }

    let mounts = [
        (OPTICAL_CAMERA, "front_mast", (0.0, 0.15, 0.3)),
        (EOD_ARM, "rear_aft", (0.4, 0.0, 0.1)),
        (EXTENDED_BATTERY, "center_belly", (0.2, 0.0, -0.05)),
    ];
    for (module, slot, position) in mounts {
        out.link(graph.mount_module(module, CHASSIS, slot, position).await?);
    }

    let assignments = [
        (OPTICAL_CAMERA, RECON_MISSION),
        (EXTENDED_BATTERY, RECON_MISSION),
        (EOD_ARM, EOD_MISSION),
        (EXTENDED_BATTERY, EOD_MISSION),
    ];
    for (module, mission) in assignments {
        out.link(graph.add_module_to_mission(module, mission).await?);
    }

    for (a, b) in [(OPTICAL_CAMERA, EOD_ARM), (OPTICAL_CAMERA, EXTENDED_BATTERY), (EOD_ARM, EXTENDED_BATTERY)] {
        out.link(graph.mark_compatible(a, b).await?);
    }

    let constraints = [
        ConstraintRecord::new("constraint_power_limit", "power_budget", 3500.0, "watts")
            .with_description("Maximum continuous power draw from all modules"),
        ConstraintRecord::new("constraint_thermal_limit", "thermal_budget", 65.0, "celsius")
            .with_description("Chassis case temperature limit to preserve battery life"),
        ConstraintRecord::new("constraint_freq_min", "natural_frequency", 80.0, "hertz")
            .with_description("Minimum system natural frequency to avoid motor harmonics"),
    ];
    for constraint in &constraints {
        out.nodes.push(graph.create_constraint(constraint).await?.business_id);
    }

    // The battery has no mechanical mount, so the frequency limit does not apply.
    let applied = [
        (OPTICAL_CAMERA, "constraint_power_limit"),
        (OPTICAL_CAMERA, "constraint_thermal_limit"),
        (OPTICAL_CAMERA, "constraint_freq_min"),
        (EOD_ARM, "constraint_power_limit"),
        (EOD_ARM, "constraint_thermal_limit"),
        (EOD_ARM, "constraint_freq_min"),
        (EXTENDED_BATTERY, "constraint_power_limit"),
        (EXTENDED_BATTERY, "constraint_thermal_limit"),
    ];
    for (module, constraint) in applied {
        out.link(graph.apply_constraint(module, constraint).await?);
    }

    tracing::info!(
        nodes = out.nodes.len(),
        relationships = out.relationships,
        skipped = out.skipped_relationships,
        "reference fleet populated"
    );
    Ok(out)
}
