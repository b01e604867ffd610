//! Named numeric limits applied to modules.

use serde::Serialize;

use crate::model::{PropertyMap, Value};
use crate::schema::{keys, Label};
use crate::Result;
use super::{require, GraphRecord};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConstraintRecord {
    pub constraint_id: String,
    /// e.g. "power_budget", "thermal_budget", "natural_frequency".
    pub constraint_type: String,
    pub limit_value: f64,
    pub unit: String,
    pub description: String,
}

impl ConstraintRecord {
    pub fn new(
        constraint_id: impl Into<String>,
        constraint_type: impl Into<String>,
        limit_value: f64,
        unit: impl Into<String>,
    ) -> Self {
        Self {
            constraint_id: constraint_id.into(),
            constraint_type: constraint_type.into(),
            limit_value,
            unit: unit.into(),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

impl GraphRecord for ConstraintRecord {
    const ENTITY: &'static str = "Constraint";
    const ID_KEY: &'static str = keys::CONSTRAINT_ID;

    fn labels(&self) -> Vec<Label> {
        vec![Label::Constraint]
    }

    fn business_id(&self) -> String {
        self.constraint_id.clone()
    }

    fn validate(&self) -> Result<()> {
        require(Self::ENTITY, keys::CONSTRAINT_ID, &self.constraint_id)
    }

    fn to_properties(&self) -> PropertyMap {
        [
            (keys::CONSTRAINT_ID, Value::from(self.constraint_id.as_str())),
            ("constraint_type", self.constraint_type.as_str().into()),
            ("limit_value", self.limit_value.into()),
            ("unit", self.unit.as_str().into()),
            (keys::DESCRIPTION, self.description.as_str().into()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }
}
