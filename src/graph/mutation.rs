//! Node and relationship mutations.
//!
//! Relationship operations look both endpoints up by business id and
//! report a missing endpoint as `Ok(false)`; only engine failures are
//! errors. Edges are append-only: repeated calls write repeated edges,
//! and corrections go through the retraction operations.

use serde::Serialize;

use crate::domain::{
    ChassisRecord, ConstraintRecord, Created, GraphRecord, InterfaceRecord, InterfaceSpec,
    LifecycleStatus, MissionRecord, ModuleRecord, ValidationStatus,
};
use crate::model::{Direction, NodeId, PropertyMap, Value};
use crate::schema::{keys, RelType};
use crate::storage::StorageBackend;
use crate::tx::TxMode;
use crate::{Error, Result};
use super::{Endpoint, UgvGraph};

/// Chassis-relative mount position, m.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl From<(f64, f64, f64)> for Position {
    fn from((x, y, z): (f64, f64, f64)) -> Self {
        Self { x, y, z }
    }
}

/// Result of [`UgvGraph::create_module`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedModule {
    pub node_id: NodeId,
    pub module_id: String,
    /// One entry per declared interface kind, in creation order.
    pub interfaces: Vec<Created>,
}

impl<B: StorageBackend> UgvGraph<B> {
    // ========================================================================
    // Node construction
    // ========================================================================

    /// Write one record as one node in its own session.
    async fn create_record<R: GraphRecord>(&self, record: &R) -> Result<Created> {
        record.validate()?;
        let mut tx = self.session(TxMode::ReadWrite).await?;
        let result = self
            .backend
            .create_node(&mut tx, &record.labels(), record.to_properties())
            .await;
        let node_id = self.finish(tx, result).await?;

        let business_id = record.business_id();
        tracing::info!(entity = R::ENTITY, id = %business_id, node = %node_id, "created node");
        Ok(Created { node_id, business_id })
    }

    /// Create a module together with one Interface_Spec node and one
    /// HAS_INTERFACE edge per declared interface kind.
    ///
    /// Each step is its own session. If a step fails after the module
    /// node exists, the error is [`Error::Incomplete`] and names every
    /// item already written; nothing is undone.
    pub async fn create_module(&self, module: &ModuleRecord) -> Result<CreatedModule> {
        let created = self.create_record(module).await?;
        let mut written = vec![created.business_id.clone()];
        let mut interfaces = Vec::new();

        for spec in module.interfaces() {
            let iface = match self.create_interface_spec(&module.module_id, &spec).await {
                Ok(iface) => iface,
                Err(e) => return Err(incomplete(module, written, e)),
            };
            written.push(iface.business_id.clone());

            if let Err(e) = self.link(created.node_id, iface.node_id, RelType::HasInterface).await {
                return Err(incomplete(module, written, e));
            }
            written.push(format!("HAS_INTERFACE:{}", iface.business_id));
            interfaces.push(iface);
        }

        Ok(CreatedModule {
            node_id: created.node_id,
            module_id: created.business_id,
            interfaces,
        })
    }

    pub async fn create_chassis(&self, chassis: &ChassisRecord) -> Result<Created> {
        self.create_record(chassis).await
    }

    pub async fn create_mission(&self, mission: &MissionRecord) -> Result<Created> {
        self.create_record(mission).await
    }

    pub async fn create_constraint(&self, constraint: &ConstraintRecord) -> Result<Created> {
        self.create_record(constraint).await
    }

    /// Create the Interface_Spec node for one interface of `module_id`.
    /// Does not link it; [`UgvGraph::create_module`] does that.
    pub async fn create_interface_spec(&self, module_id: &str, spec: &InterfaceSpec) -> Result<Created> {
        self.create_record(&InterfaceRecord::new(module_id, spec)).await
    }

    async fn link(&self, src: NodeId, dst: NodeId, rel_type: RelType) -> Result<()> {
        let mut tx = self.session(TxMode::ReadWrite).await?;
        let result = self
            .backend
            .create_relationship(&mut tx, src, dst, rel_type, PropertyMap::new())
            .await;
        self.finish(tx, result).await.map(drop)
    }

    // ========================================================================
    // Node updates
    // ========================================================================

    /// Returns false when the module does not exist.
    pub async fn set_module_status(&self, module_id: &str, status: LifecycleStatus) -> Result<bool> {
        self.set_property(Endpoint::module(module_id), keys::STATUS, status.as_str().into())
            .await
    }

    /// Returns false when the mission does not exist.
    pub async fn set_mission_validation_status(
        &self,
        mission_id: &str,
        status: ValidationStatus,
    ) -> Result<bool> {
        self.set_property(
            Endpoint::mission(mission_id),
            keys::VALIDATION_STATUS,
            status.as_str().into(),
        )
        .await
    }

    async fn set_property(&self, at: Endpoint<'_>, key: &str, value: Value) -> Result<bool> {
        let mut tx = self.session(TxMode::ReadWrite).await?;
        let result: Result<bool> = async {
            let Some(node) = self.find(&tx, at).await? else {
                return Ok(false);
            };
            self.backend.set_node_property(&mut tx, node.id, key, value).await?;
            Ok(true)
        }
        .await;
        let updated = self.finish(tx, result).await?;

        if updated {
            tracing::info!(label = at.label.as_str(), id = at.id, key, "updated node");
        } else {
            tracing::warn!(label = at.label.as_str(), id = at.id, "update skipped: node not found");
        }
        Ok(updated)
    }

    /// Read a module's interfaces back into typed specs, ordered by kind.
    /// `None` when the module does not exist.
    pub async fn module_interfaces(&self, module_id: &str) -> Result<Option<Vec<InterfaceSpec>>> {
        let tx = self.session(TxMode::ReadOnly).await?;
        let result: Result<Option<Vec<InterfaceSpec>>> = async {
            let Some(module) = self.find(&tx, Endpoint::module(module_id)).await? else {
                return Ok(None);
            };
            let mut specs = self
                .neighbours(&tx, module.id, Direction::Outgoing, RelType::HasInterface)
                .await?
                .into_iter()
                .map(|(node, _)| InterfaceSpec::from_properties(&node.properties))
                .collect::<Result<Vec<_>>>()?;
            specs.sort_by_key(InterfaceSpec::kind);
            Ok(Some(specs))
        }
        .await;
        self.finish(tx, result).await
    }

    // ========================================================================
    // Relationship construction
    // ========================================================================

    /// Create one `src -[rel_type]-> dst` edge. `Ok(false)` when either
    /// endpoint does not resolve.
    async fn relate(
        &self,
        src: Endpoint<'_>,
        dst: Endpoint<'_>,
        rel_type: RelType,
        props: PropertyMap,
    ) -> Result<bool> {
        let mut tx = self.session(TxMode::ReadWrite).await?;
        let result: Result<bool> = async {
            let Some(a) = self.find(&tx, src).await? else {
                tracing::warn!(rel_type = rel_type.as_str(), missing = src.id, "endpoint not found");
                return Ok(false);
            };
            let Some(b) = self.find(&tx, dst).await? else {
                tracing::warn!(rel_type = rel_type.as_str(), missing = dst.id, "endpoint not found");
                return Ok(false);
            };

            match rel_type {
                RelType::MountedOn => {
                    let mounts = self
                        .backend
                        .get_relationships(&tx, a.id, Direction::Outgoing, Some(RelType::MountedOn))
                        .await?;
                    if !mounts.is_empty() {
                        tracing::warn!(module = src.id, mounts = mounts.len(), "module is already mounted");
                    }
                }
                RelType::CompatibleWith | RelType::ConflictsWith => {
                    if a.id == b.id {
                        tracing::warn!(module = src.id, "a module cannot be paired with itself");
                        return Ok(false);
                    }
                    let opposite = if rel_type == RelType::CompatibleWith {
                        RelType::ConflictsWith
                    } else {
                        RelType::CompatibleWith
                    };
                    if !self.edges_between(&tx, a.id, b.id, opposite).await?.is_empty() {
                        tracing::warn!(
                            a = src.id,
                            b = dst.id,
                            existing = opposite.as_str(),
                            asserted = rel_type.as_str(),
                            "contradictory compatibility assertion"
                        );
                    }
                }
                _ => {}
            }

            self.backend.create_relationship(&mut tx, a.id, b.id, rel_type, props).await?;
            Ok(true)
        }
        .await;
        let created = self.finish(tx, result).await?;

        if created {
            tracing::info!(src = src.id, rel_type = rel_type.as_str(), dst = dst.id, "created relationship");
        }
        Ok(created)
    }

    /// Mount a module on a chassis at `slot`.
    pub async fn mount_module(
        &self,
        module_id: &str,
        chassis_id: &str,
        slot: &str,
        position: impl Into<Position>,
    ) -> Result<bool> {
        let p = position.into();
        let props: PropertyMap = [
            (keys::SLOT, Value::from(slot)),
            (keys::POSITION_X, p.x.into()),
            (keys::POSITION_Y, p.y.into()),
            (keys::POSITION_Z, p.z.into()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        self.relate(Endpoint::module(module_id), Endpoint::chassis(chassis_id), RelType::MountedOn, props)
            .await
    }

    pub async fn add_module_to_mission(&self, module_id: &str, mission_id: &str) -> Result<bool> {
        self.relate(
            Endpoint::module(module_id),
            Endpoint::mission(mission_id),
            RelType::PartOfMission,
            PropertyMap::new(),
        )
        .await
    }

    pub async fn apply_constraint(&self, module_id: &str, constraint_id: &str) -> Result<bool> {
        self.relate(
            Endpoint::module(module_id),
            Endpoint::constraint(constraint_id),
            RelType::ConstrainedBy,
            PropertyMap::new(),
        )
        .await
    }

    /// Assert that two modules work together. Written `a -> b`, read
    /// symmetrically.
    pub async fn mark_compatible(&self, a: &str, b: &str) -> Result<bool> {
        self.relate(Endpoint::module(a), Endpoint::module(b), RelType::CompatibleWith, PropertyMap::new())
            .await
    }

    /// Assert that two modules cannot be fielded together.
    pub async fn mark_conflict(&self, a: &str, b: &str, reason: &str) -> Result<bool> {
        let props = [(keys::REASON.to_string(), Value::from(reason))].into_iter().collect();
        self.relate(Endpoint::module(a), Endpoint::module(b), RelType::ConflictsWith, props)
            .await
    }

    // ========================================================================
    // Retraction
    // ========================================================================

    /// Delete `src -[rel_type]-> dst` edges, or edges in either direction
    /// when `symmetric`. Returns how many were deleted.
    async fn retract(
        &self,
        src: Endpoint<'_>,
        dst: Endpoint<'_>,
        rel_type: RelType,
        symmetric: bool,
    ) -> Result<usize> {
        let mut tx = self.session(TxMode::ReadWrite).await?;
        let result: Result<usize> = async {
            let (Some(a), Some(b)) = (self.find(&tx, src).await?, self.find(&tx, dst).await?) else {
                return Ok(0);
            };
            let targets: Vec<_> = if symmetric {
                self.edges_between(&tx, a.id, b.id, rel_type).await?
            } else {
                self.backend
                    .get_relationships(&tx, a.id, Direction::Outgoing, Some(rel_type))
                    .await?
                    .into_iter()
                    .filter(|r| r.dst == b.id)
                    .collect()
            };

            let mut deleted = 0;
            for rel in targets {
                if self.backend.delete_relationship(&mut tx, rel.id).await? {
                    deleted += 1;
                }
            }
            Ok(deleted)
        }
        .await;
        let deleted = self.finish(tx, result).await?;

        tracing::info!(src = src.id, rel_type = rel_type.as_str(), dst = dst.id, deleted, "retracted relationship");
        Ok(deleted)
    }

    pub async fn unmount_module(&self, module_id: &str, chassis_id: &str) -> Result<usize> {
        self.retract(Endpoint::module(module_id), Endpoint::chassis(chassis_id), RelType::MountedOn, false)
            .await
    }

    pub async fn remove_module_from_mission(&self, module_id: &str, mission_id: &str) -> Result<usize> {
        self.retract(Endpoint::module(module_id), Endpoint::mission(mission_id), RelType::PartOfMission, false)
            .await
    }

    pub async fn remove_constraint(&self, module_id: &str, constraint_id: &str) -> Result<usize> {
        self.retract(
            Endpoint::module(module_id),
            Endpoint::constraint(constraint_id),
            RelType::ConstrainedBy,
            false,
        )
        .await
    }

    /// Remove compatibility assertions between `a` and `b`, both directions.
    pub async fn retract_compatibility(&self, a: &str, b: &str) -> Result<usize> {
        self.retract(Endpoint::module(a), Endpoint::module(b), RelType::CompatibleWith, true)
            .await
    }

    /// Remove conflict assertions between `a` and `b`, both directions.
    pub async fn retract_conflict(&self, a: &str, b: &str) -> Result<usize> {
        self.retract(Endpoint::module(a), Endpoint::module(b), RelType::ConflictsWith, true)
            .await
    }
}

fn incomplete(module: &ModuleRecord, written: Vec<String>, source: Error) -> Error {
    tracing::warn!(module = %module.module_id, ?written, error = %source, "module creation stopped part-way");
    Error::Incomplete {
        module_id: module.module_id.clone(),
        written,
        source: Box::new(source),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ElectricalInterface, ModuleType, PhysicalProperties, ThermalInterface};

    fn camera(id: &str) -> ModuleRecord {
        ModuleRecord::new(id, ModuleType::Sensing, PhysicalProperties::new(2.5, 0.008, [0.05, 0.0, 0.02], "Al-6061-T6"))
            .with_electrical(ElectricalInterface {
                power_rail: "24VDC".into(),
                max_current_a: 5.0,
                power_draw_w: 120.0,
                data_protocol: "CAN-FD".into(),
                telemetry_rate_hz: 10.0,
                latency_requirement_ms: 100.0,
            })
            .with_thermal(ThermalInterface {
                max_heat_dissipation_w: 120.0,
                operating_temp_min_c: -10.0,
                operating_temp_max_c: 50.0,
                thermal_resistance_k_per_w: 0.5,
            })
    }

    #[tokio::test]
    async fn test_create_module_links_interfaces() {
        let graph = UgvGraph::open_memory();
        let created = graph.create_module(&camera("cam")).await.unwrap();

        let ids: Vec<_> = created.interfaces.iter().map(|c| c.business_id.as_str()).collect();
        assert_eq!(ids, ["cam_electrical", "cam_thermal"]);

        let tx = graph.session(TxMode::ReadOnly).await.unwrap();
        let rels = graph
            .backend()
            .get_relationships(&tx, created.node_id, Direction::Outgoing, Some(RelType::HasInterface))
            .await
            .unwrap();
        assert_eq!(rels.len(), 2);
    }

    #[tokio::test]
    async fn test_validation_precedes_any_write() {
        let graph = UgvGraph::open_memory();
        let err = graph.create_module(&camera("")).await.unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));

        let tx = graph.session(TxMode::ReadOnly).await.unwrap();
        assert_eq!(graph.backend().node_count(&tx).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_partial_module_creation_is_reported() {
        let graph = UgvGraph::open_memory();
        graph.setup_schema().await;
        // Occupies the id the camera's electrical interface will derive.
        graph
            .create_interface_spec("cam", &camera("cam").interfaces()[0])
            .await
            .unwrap();

        match graph.create_module(&camera("cam")).await {
            Err(Error::Incomplete { module_id, written, source }) => {
                assert_eq!(module_id, "cam");
                assert_eq!(written, vec!["cam".to_string()]);
                assert!(matches!(*source, Error::ConstraintViolation(_)));
            }
            other => panic!("expected Incomplete, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_status_update_reports_missing_node() {
        let graph = UgvGraph::open_memory();
        graph.create_module(&camera("cam")).await.unwrap();

        assert!(graph.set_module_status("cam", LifecycleStatus::Retired).await.unwrap());
        assert!(!graph.set_module_status("ghost", LifecycleStatus::Retired).await.unwrap());
    }

    #[tokio::test]
    async fn test_self_pairing_is_refused() {
        let graph = UgvGraph::open_memory();
        graph.create_module(&camera("cam")).await.unwrap();
        assert!(!graph.mark_compatible("cam", "cam").await.unwrap());
    }

    #[tokio::test]
    async fn test_interfaces_read_back_typed() {
        let graph = UgvGraph::open_memory();
        let module = camera("cam");
        graph.create_module(&module).await.unwrap();

        let specs = graph.module_interfaces("cam").await.unwrap().unwrap();
        assert_eq!(specs, module.interfaces());
        assert!(graph.module_interfaces("ghost").await.unwrap().is_none());
    }
}
