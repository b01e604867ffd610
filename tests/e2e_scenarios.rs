//! End-to-end scenarios for the domain model's core guarantees.
//!
//! Each test builds a small fleet in a fresh MemoryBackend graph and
//! checks one observable property of the mutator + analyses.

use pretty_assertions::assert_eq;
use ugv_graph::storage::MemoryBackend;
use ugv_graph::{
    ChassisRecord, ElectricalInterface, MissionRecord, ModuleRecord, ModuleType, PairClass,
    PhysicalProperties, PowerBudgetReport, UgvGraph,
};

// ============================================================================
// Helpers
// ============================================================================

fn physical(mass_kg: f64) -> PhysicalProperties {
    PhysicalProperties::new(mass_kg, 0.01, [0.0, 0.0, 0.0], "Al-6061-T6")
}

fn powered(id: &str, module_type: ModuleType, watts: f64) -> ModuleRecord {
    ModuleRecord::new(id, module_type, physical(2.0)).with_electrical(ElectricalInterface {
        power_rail: "24VDC".into(),
        max_current_a: 30.0,
        power_draw_w: watts,
        data_protocol: "CAN-FD".into(),
        telemetry_rate_hz: 10.0,
        latency_requirement_ms: 100.0,
    })
}

/// C1 (3.5 kW), M1 (120 W) and M2 (600 W), both on mission MX.
async fn mx_fleet() -> UgvGraph<MemoryBackend> {
    let graph = UgvGraph::open_memory();
    graph.setup_schema().await;

    graph
        .create_chassis(&ChassisRecord::new("C1", physical(25.0), 3.5, 65.0, 3))
        .await
        .unwrap();
    graph
        .create_module(&powered("M1", ModuleType::Sensing, 120.0).with_description("camera"))
        .await
        .unwrap();
    graph
        .create_module(&powered("M2", ModuleType::Manipulation, 600.0).with_description("arm"))
        .await
        .unwrap();
    graph
        .create_mission(&MissionRecord::new("MX", "Mission X", "reconnaissance", 4.0))
        .await
        .unwrap();
    assert!(graph.add_module_to_mission("M1", "MX").await.unwrap());
    assert!(graph.add_module_to_mission("M2", "MX").await.unwrap());

    graph
}

// ============================================================================
// 1. Create then look up returns what was supplied
// ============================================================================

#[tokio::test]
async fn test_created_module_reads_back() {
    let graph = mx_fleet().await;

    let deps = graph.find_module_dependencies("M2").await.unwrap().unwrap();
    assert_eq!(deps.module_type, "manipulation");
    assert_eq!(deps.power_w, 600.0);
    assert_eq!(deps.description, "arm");
    assert_eq!(deps.status, "active");
    assert_eq!(deps.interfaces, vec!["electrical".to_string()]);
}

// ============================================================================
// 2. Concrete power budget
// ============================================================================

#[tokio::test]
async fn test_mx_power_budget() {
    let graph = mx_fleet().await;

    let report = graph.validate_mission_power_budget("MX", 3.5).await.unwrap();
    let PowerBudgetReport::Evaluated(budget) = report else {
        panic!("expected an evaluated budget, got {report:?}");
    };
    assert_eq!(budget.total_power_w, 720.0);
    assert!((budget.total_power_kw - 0.72).abs() < 1e-9);
    assert!(budget.within_budget);
    assert!((budget.margin_kw - 2.78).abs() < 1e-9);
    assert_eq!(budget.num_modules, 2);
    assert_eq!(budget.mission_name, "Mission X");
}

// ============================================================================
// 3. Mounting
// ============================================================================

#[tokio::test]
async fn test_mount_reports_chassis() {
    let graph = mx_fleet().await;
    assert!(graph.mount_module("M1", "C1", "front_mast", (0.0, 0.15, 0.3)).await.unwrap());

    let mounted = graph.find_module_dependencies("M1").await.unwrap().unwrap();
    assert_eq!(mounted.mounted_on.as_deref(), Some("C1"));
    assert_eq!(mounted.mount_slot.as_deref(), Some("front_mast"));

    let loose = graph.find_module_dependencies("M2").await.unwrap().unwrap();
    assert_eq!(loose.mounted_on, None);
    assert_eq!(loose.mount_slot, None);
}

// ============================================================================
// 4. Contradictory assertions: conflict wins, pair appears once
// ============================================================================

#[tokio::test]
async fn test_contradictory_pair_is_conflict() {
    let graph = mx_fleet().await;
    assert!(graph.mark_compatible("M1", "M2").await.unwrap());
    assert!(graph.mark_conflict("M1", "M2", "EMI on CAN bus").await.unwrap());

    let report = graph.get_mission_compatibility("MX").await.unwrap().unwrap();
    assert_eq!(report.total_pairs, 1);
    assert_eq!(report.pairs.len(), 1);

    let pair = &report.pairs[0];
    assert_eq!((pair.module_a.as_str(), pair.module_b.as_str()), ("M1", "M2"));
    assert_eq!(pair.classification, PairClass::Conflict);
    assert!(pair.contradictory);
    assert_eq!(pair.reason.as_deref(), Some("EMI on CAN bus"));
    assert!(!report.mission_viable);
}

#[tokio::test]
async fn test_reverse_direction_assertion_is_seen() {
    let graph = mx_fleet().await;
    // Asserted from the higher node id towards the lower one.
    assert!(graph.mark_compatible("M2", "M1").await.unwrap());

    let report = graph.get_mission_compatibility("MX").await.unwrap().unwrap();
    assert_eq!(report.pairs[0].classification, PairClass::Compatible);
    assert_eq!(report.compatible_confirmed, 1);
    assert!(report.mission_viable);

    let deps = graph.find_module_dependencies("M1").await.unwrap().unwrap();
    assert_eq!(deps.compatible_with, vec!["M2".to_string()]);
}

// ============================================================================
// 5. Empty mission manifest
// ============================================================================

#[tokio::test]
async fn test_empty_mission_manifest() {
    let graph = mx_fleet().await;
    graph
        .create_mission(&MissionRecord::new("EMPTY", "Nothing Yet", "training", 1.0))
        .await
        .unwrap();

    let manifest = graph.get_mission_manifest("EMPTY").await.unwrap().unwrap();
    assert_eq!(manifest.num_modules, 0);
    assert_eq!(manifest.total_mass_kg, 0.0);
    assert_eq!(manifest.total_power_kw, 0.0);
    assert!(manifest.modules.is_empty());
    assert_eq!(manifest.validation_status, "unvalidated");

    assert!(graph.get_mission_manifest("NOPE").await.unwrap().is_none());
}

#[tokio::test]
async fn test_empty_mission_budget_is_invalid() {
    let graph = mx_fleet().await;
    graph
        .create_mission(&MissionRecord::new("EMPTY", "Nothing Yet", "training", 1.0))
        .await
        .unwrap();

    let report = graph.validate_mission_power_budget("EMPTY", 3.5).await.unwrap();
    assert!(matches!(report, PowerBudgetReport::Invalid { ref reason, .. } if reason == "no modules found"));
    assert!(!report.within_budget());
}
