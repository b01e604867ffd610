//! End-to-end integration tests for node and relationship mutations.
//!
//! Tests schema setup, validation, uniqueness, missing endpoints,
//! append-only edges, retraction and handle lifecycle.

use ugv_graph::{
    ConstraintRecord, Error, LifecycleStatus, MissionRecord, ModuleRecord, ModuleType,
    PhysicalProperties, StorageBackend, TxMode, UgvGraph, ValidationStatus,
};

fn accessory(id: &str) -> ModuleRecord {
    ModuleRecord::new(id, ModuleType::Accessory, PhysicalProperties::new(1.0, 0.001, [0.0; 3], "ABS"))
}

async fn relationship_count<B: StorageBackend>(graph: &UgvGraph<B>) -> u64 {
    let tx = graph.backend().begin_tx(TxMode::ReadOnly).await.unwrap();
    let count = graph.backend().relationship_count(&tx).await.unwrap();
    graph.backend().commit_tx(tx).await.unwrap();
    count
}

// ============================================================================
// 1. Schema setup
// ============================================================================

#[tokio::test]
async fn test_schema_setup_twice() {
    let graph = UgvGraph::open_memory();

    let first = graph.setup_schema().await;
    assert_eq!(first.created.len(), 9);
    assert!(first.is_complete());

    let second = graph.setup_schema().await;
    assert!(second.created.is_empty());
    assert_eq!(second.already_present.len(), 9);
    assert!(second.is_complete());
}

#[tokio::test]
async fn test_duplicate_module_id_rejected_after_setup() {
    let graph = UgvGraph::open_memory();
    graph.setup_schema().await;

    graph.create_module(&accessory("kit")).await.unwrap();
    let err = graph.create_module(&accessory("kit")).await.unwrap_err();
    assert!(matches!(err, Error::ConstraintViolation(_)));
}

// ============================================================================
// 2. Validation
// ============================================================================

#[tokio::test]
async fn test_blank_ids_fail_validation() {
    let graph = UgvGraph::open_memory();

    assert!(matches!(
        graph.create_module(&accessory("   ")).await,
        Err(Error::Validation { entity: "UGV_Module", field: "module_id" })
    ));
    assert!(matches!(
        graph.create_constraint(&ConstraintRecord::new("", "power_budget", 1.0, "watts")).await,
        Err(Error::Validation { entity: "Constraint", .. })
    ));
    assert!(matches!(
        graph.create_mission(&MissionRecord::new("M", "  ", "eod", 1.0)).await,
        Err(Error::Validation { field: "mission_name", .. })
    ));
}

// ============================================================================
// 3. Missing endpoints are reported, not raised
// ============================================================================

#[tokio::test]
async fn test_missing_endpoint_reports_false() {
    let graph = UgvGraph::open_memory();
    graph.create_module(&accessory("kit")).await.unwrap();

    assert!(!graph.add_module_to_mission("kit", "no_such_mission").await.unwrap());
    assert!(!graph.mount_module("ghost", "no_chassis", "front", (0.0, 0.0, 0.0)).await.unwrap());
    assert!(!graph.apply_constraint("kit", "no_constraint").await.unwrap());
    assert!(!graph.mark_conflict("kit", "ghost", "n/a").await.unwrap());
    assert_eq!(relationship_count(&graph).await, 0);
}

// ============================================================================
// 4. Append-only edges and retraction
// ============================================================================

#[tokio::test]
async fn test_repeated_membership_is_tolerated() {
    let graph = UgvGraph::open_memory();
    graph.create_module(&accessory("kit")).await.unwrap();
    graph.create_mission(&MissionRecord::new("MX", "X", "eod", 1.0)).await.unwrap();

    assert!(graph.add_module_to_mission("kit", "MX").await.unwrap());
    assert!(graph.add_module_to_mission("kit", "MX").await.unwrap());
    assert_eq!(relationship_count(&graph).await, 2);

    let manifest = graph.get_mission_manifest("MX").await.unwrap().unwrap();
    assert_eq!(manifest.num_modules, 1);

    let utilization = graph.module_utilization().await.unwrap();
    assert_eq!(utilization[0].mission_count, 1);
}

#[tokio::test]
async fn test_retract_then_recreate() {
    let graph = UgvGraph::open_memory();
    graph.create_module(&accessory("a")).await.unwrap();
    graph.create_module(&accessory("b")).await.unwrap();

    assert!(graph.mark_compatible("a", "b").await.unwrap());
    assert!(graph.mark_compatible("b", "a").await.unwrap());
    // Both directions go.
    assert_eq!(graph.retract_compatibility("a", "b").await.unwrap(), 2);
    assert_eq!(graph.retract_compatibility("a", "b").await.unwrap(), 0);

    assert!(graph.mark_conflict("a", "b", "shared slot").await.unwrap());
    let deps = graph.find_module_dependencies("b").await.unwrap().unwrap();
    assert!(deps.compatible_with.is_empty());
    assert_eq!(deps.conflicts, vec!["a".to_string()]);

    assert_eq!(graph.retract_conflict("b", "a").await.unwrap(), 1);
    assert_eq!(relationship_count(&graph).await, 0);
}

#[tokio::test]
async fn test_unmount_and_remount() {
    let graph = UgvGraph::open_memory();
    graph.create_module(&accessory("kit")).await.unwrap();
    graph
        .create_chassis(&ugv_graph::ChassisRecord::new(
            "C1",
            PhysicalProperties::new(25.0, 0.15, [0.0; 3], "Al-7075-T73"),
            3.5,
            65.0,
            3,
        ))
        .await
        .unwrap();

    assert!(graph.mount_module("kit", "C1", "front_mast", (0.0, 0.1, 0.2)).await.unwrap());
    assert_eq!(graph.unmount_module("kit", "C1").await.unwrap(), 1);
    assert!(graph.mount_module("kit", "C1", "rear_aft", (0.4, 0.0, 0.1)).await.unwrap());

    let deps = graph.find_module_dependencies("kit").await.unwrap().unwrap();
    assert_eq!(deps.mount_slot.as_deref(), Some("rear_aft"));
    assert_eq!(graph.unmount_module("kit", "missing").await.unwrap(), 0);
}

#[tokio::test]
async fn test_repeated_mounts_are_tolerated() {
    let graph = UgvGraph::open_memory();
    graph.create_module(&accessory("kit")).await.unwrap();
    for chassis_id in ["C1", "C2"] {
        graph
            .create_chassis(&ugv_graph::ChassisRecord::new(
                chassis_id,
                PhysicalProperties::new(25.0, 0.15, [0.0; 3], "Al-7075-T73"),
                3.5,
                65.0,
                3,
            ))
            .await
            .unwrap();
    }

    assert!(graph.mount_module("kit", "C1", "front_mast", (0.0, 0.1, 0.2)).await.unwrap());
    assert!(graph.mount_module("kit", "C1", "rear_aft", (0.4, 0.0, 0.1)).await.unwrap());
    assert!(graph.mount_module("kit", "C2", "center_belly", (0.2, 0.0, 0.0)).await.unwrap());
    assert_eq!(relationship_count(&graph).await, 3);

    // The oldest mount wins.
    let deps = graph.find_module_dependencies("kit").await.unwrap().unwrap();
    assert_eq!(deps.mounted_on.as_deref(), Some("C1"));
    assert_eq!(deps.mount_slot.as_deref(), Some("front_mast"));

    // Repeated edges to C1 collapse to one chain.
    let chains = graph.mount_chains(10).await.unwrap();
    assert_eq!(chains.len(), 2);

    assert_eq!(graph.unmount_module("kit", "C1").await.unwrap(), 2);
    let deps = graph.find_module_dependencies("kit").await.unwrap().unwrap();
    assert_eq!(deps.mounted_on.as_deref(), Some("C2"));
}

// ============================================================================
// 5. Status updates
// ============================================================================

#[tokio::test]
async fn test_status_updates() {
    let graph = UgvGraph::open_memory();
    graph.create_module(&accessory("kit")).await.unwrap();
    graph.create_mission(&MissionRecord::new("MX", "X", "eod", 1.0)).await.unwrap();

    assert!(graph.set_module_status("kit", LifecycleStatus::Maintenance).await.unwrap());
    let deps = graph.find_module_dependencies("kit").await.unwrap().unwrap();
    assert_eq!(deps.status, "maintenance");

    assert!(graph.set_mission_validation_status("MX", ValidationStatus::Rejected).await.unwrap());
    let manifest = graph.get_mission_manifest("MX").await.unwrap().unwrap();
    assert_eq!(manifest.validation_status, "rejected");

    assert!(!graph.set_mission_validation_status("nope", ValidationStatus::Validated).await.unwrap());
}

// ============================================================================
// 6. Handle lifecycle
// ============================================================================

#[tokio::test]
async fn test_closed_handle_rejects_operations() {
    let graph = UgvGraph::open_memory();
    graph.create_module(&accessory("kit")).await.unwrap();

    graph.close().await.unwrap();
    graph.close().await.unwrap();

    assert!(matches!(graph.find_module_dependencies("kit").await, Err(Error::Connection(_))));
    assert!(matches!(graph.create_module(&accessory("other")).await, Err(Error::Connection(_))));
}
