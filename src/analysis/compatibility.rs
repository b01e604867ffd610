//! Pairwise compatibility of a mission's modules.
//!
//! Every unordered pair of distinct modules is classified once. A
//! conflict edge in either direction makes the pair CONFLICT even when a
//! compatible edge also exists; such pairs are flagged `contradictory`.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::graph::{Endpoint, UgvGraph};
use crate::model::{Direction, NodeId};
use crate::schema::{keys, RelType};
use crate::storage::StorageBackend;
use crate::tx::TxMode;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PairClass {
    Conflict,
    Compatible,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairReport {
    pub module_a: String,
    pub module_b: String,
    pub classification: PairClass,
    /// Conflict reason, when one was recorded.
    pub reason: Option<String>,
    /// Both a compatible and a conflict assertion exist for this pair.
    pub contradictory: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompatibilityReport {
    pub mission_id: String,
    pub total_pairs: usize,
    pub conflicts: usize,
    pub compatible_confirmed: usize,
    pub unknown: usize,
    pub pairs: Vec<PairReport>,
    /// True iff no pair is a conflict. Unknown pairs do not count against.
    pub mission_viable: bool,
}

impl CompatibilityReport {
    fn from_pairs(mission_id: &str, pairs: Vec<PairReport>) -> Self {
        let count = |class| pairs.iter().filter(|p| p.classification == class).count();
        let conflicts = count(PairClass::Conflict);
        Self {
            mission_id: mission_id.to_string(),
            total_pairs: pairs.len(),
            conflicts,
            compatible_confirmed: count(PairClass::Compatible),
            unknown: count(PairClass::Unknown),
            mission_viable: conflicts == 0,
            pairs,
        }
    }

    pub fn conflicting_pairs(&self) -> impl Iterator<Item = &PairReport> {
        self.pairs.iter().filter(|p| p.classification == PairClass::Conflict)
    }
}

/// Every `(items[i], items[j])` with `i < j`.
pub fn unordered_pairs<T>(items: &[T]) -> impl Iterator<Item = (&T, &T)> {
    items
        .iter()
        .enumerate()
        .flat_map(move |(i, a)| items[i + 1..].iter().map(move |b| (a, b)))
}

/// Assertions recorded against one module, keyed by the other module.
#[derive(Default)]
struct Assertions {
    /// other module -> conflict reason (empty when none was given)
    conflicts: HashMap<NodeId, String>,
    compatible: HashSet<NodeId>,
}

fn classify(a_id: &str, b_id: &str, b: NodeId, assertions: &Assertions) -> PairReport {
    let conflict = assertions.conflicts.get(&b);
    let compatible = assertions.compatible.contains(&b);

    let classification = match (conflict.is_some(), compatible) {
        (true, _) => PairClass::Conflict,
        (false, true) => PairClass::Compatible,
        (false, false) => PairClass::Unknown,
    };
    let contradictory = conflict.is_some() && compatible;
    if contradictory {
        tracing::warn!(a = a_id, b = b_id, "pair is marked both compatible and conflicting");
    }

    PairReport {
        module_a: a_id.to_string(),
        module_b: b_id.to_string(),
        classification,
        reason: conflict.filter(|r| !r.is_empty()).cloned(),
        contradictory,
    }
}

impl<B: StorageBackend> UgvGraph<B> {
    /// Classify every pair of modules assigned to the mission. `None`
    /// when the mission does not exist.
    pub async fn get_mission_compatibility(&self, mission_id: &str) -> Result<Option<CompatibilityReport>> {
        let tx = self.session(TxMode::ReadOnly).await?;
        let result: Result<Option<CompatibilityReport>> = async {
            let Some(mission) = self.find(&tx, Endpoint::mission(mission_id)).await? else {
                return Ok(None);
            };
            let modules = self.mission_modules(&tx, mission.id).await?;

            let mut assertions = Vec::with_capacity(modules.len());
            for module in &modules {
                let mut found = Assertions::default();
                for (other, rel) in self
                    .neighbours(&tx, module.id, Direction::Both, RelType::ConflictsWith)
                    .await?
                {
                    let reason = rel.properties.get(keys::REASON).and_then(|v| v.as_str());
                    found.conflicts.insert(other.id, reason.unwrap_or_default().to_string());
                }
                for (other, _) in self
                    .neighbours(&tx, module.id, Direction::Both, RelType::CompatibleWith)
                    .await?
                {
                    found.compatible.insert(other.id);
                }
                assertions.push(found);
            }

            let indexed: Vec<usize> = (0..modules.len()).collect();
            let pairs = unordered_pairs(&indexed)
                .map(|(&i, &j)| {
                    classify(
                        &modules[i].str_or_empty(keys::MODULE_ID),
                        &modules[j].str_or_empty(keys::MODULE_ID),
                        modules[j].id,
                        &assertions[i],
                    )
                })
                .collect();

            Ok(Some(CompatibilityReport::from_pairs(mission_id, pairs)))
        }
        .await;
        self.finish(tx, result).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unordered_pairs() {
        let pairs: Vec<_> = unordered_pairs(&[1, 2, 3]).collect();
        assert_eq!(pairs, vec![(&1, &2), (&1, &3), (&2, &3)]);
        assert_eq!(unordered_pairs::<u8>(&[]).count(), 0);
        assert_eq!(unordered_pairs(&[7]).count(), 0);
    }

    #[test]
    fn test_conflict_takes_precedence() {
        let mut found = Assertions::default();
        found.conflicts.insert(NodeId(2), "EMI".into());
        found.compatible.insert(NodeId(2));

        let pair = classify("M1", "M2", NodeId(2), &found);
        assert_eq!(pair.classification, PairClass::Conflict);
        assert!(pair.contradictory);
        assert_eq!(pair.reason.as_deref(), Some("EMI"));
    }

    #[test]
    fn test_unknown_pairs_keep_mission_viable() {
        let pair = classify("M1", "M2", NodeId(2), &Assertions::default());
        assert_eq!(pair.classification, PairClass::Unknown);

        let report = CompatibilityReport::from_pairs("MX", vec![pair]);
        assert!(report.mission_viable);
        assert_eq!((report.total_pairs, report.unknown), (1, 1));
    }
}
