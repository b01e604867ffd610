//! Property tests for pair enumeration and power budget evaluation.

use proptest::prelude::*;
use ugv_graph::analysis::unordered_pairs;
use ugv_graph::{
    ElectricalInterface, MissionRecord, ModuleRecord, ModuleType, PhysicalProperties,
    PowerBudget, PowerBudgetReport, UgvGraph,
};

fn draws(watts: &[f64]) -> Vec<(String, f64)> {
    watts.iter().enumerate().map(|(i, w)| (format!("m{i}"), *w)).collect()
}

fn module(id: &str, watts: f64) -> ModuleRecord {
    ModuleRecord::new(id, ModuleType::Payload, PhysicalProperties::new(1.0, 0.001, [0.0; 3], "ABS"))
        .with_electrical(ElectricalInterface {
            power_rail: "24VDC".into(),
            max_current_a: 10.0,
            power_draw_w: watts,
            data_protocol: "CAN-FD".into(),
            telemetry_rate_hz: 1.0,
            latency_requirement_ms: 100.0,
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Every unordered pair exactly once, never a module with itself.
    #[test]
    fn prop_pair_count(n in 0usize..40) {
        let items: Vec<usize> = (0..n).collect();
        let pairs: Vec<_> = unordered_pairs(&items).collect();

        prop_assert_eq!(pairs.len(), n * n.saturating_sub(1) / 2);
        for (a, b) in &pairs {
            prop_assert!(a < b);
        }
    }

    /// Within budget iff total_kw <= budget_kw, margin consistent with totals.
    #[test]
    fn prop_budget_is_inclusive(watts in prop::collection::vec(0.0f64..2000.0, 1..8), budget_kw in 0.0f64..10.0) {
        let budget = PowerBudget::evaluate("MX", "Mission X", &draws(&watts), budget_kw);

        prop_assert_eq!(budget.num_modules, watts.len());
        prop_assert_eq!(budget.within_budget, budget.total_power_kw <= budget_kw);
        prop_assert!((budget.margin_kw - (budget_kw - budget.total_power_kw)).abs() < 1e-9);
        prop_assert!((budget.total_power_w - watts.iter().sum::<f64>()).abs() < 1e-9);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    /// Compatibility over a mission of N modules always reports N(N-1)/2
    /// pairs, each classified once.
    #[test]
    fn prop_mission_pairs_match_module_count(watts in prop::collection::vec(0.0f64..1000.0, 0..7)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let n = watts.len();

        let (report, budget) = rt.block_on(async {
            let graph = UgvGraph::open_memory();
            graph.setup_schema().await;
            graph.create_mission(&MissionRecord::new("MX", "Mission X", "patrol", 1.0)).await.unwrap();
            for (i, w) in watts.iter().enumerate() {
                let id = format!("m{i}");
                graph.create_module(&module(&id, *w)).await.unwrap();
                graph.add_module_to_mission(&id, "MX").await.unwrap();
            }
            (
                graph.get_mission_compatibility("MX").await.unwrap().unwrap(),
                graph.validate_mission_power_budget("MX", 3.5).await.unwrap(),
            )
        });

        prop_assert_eq!(report.total_pairs, n * n.saturating_sub(1) / 2);
        prop_assert_eq!(report.pairs.len(), report.total_pairs);
        prop_assert_eq!(report.unknown, report.total_pairs);
        prop_assert!(report.mission_viable);

        match budget {
            PowerBudgetReport::Evaluated(b) => {
                prop_assert!(n > 0);
                prop_assert!((b.total_power_w - watts.iter().sum::<f64>()).abs() < 1e-6);
            }
            PowerBudgetReport::Invalid { reason, .. } => {
                prop_assert_eq!(n, 0);
                prop_assert_eq!(reason, "no modules found");
            }
        }
    }
}
