//! Mission profiles: named operational scenarios grouping modules.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::model::{PropertyMap, Value};
use crate::schema::{keys, Label};
use crate::{Error, Result};
use super::{require, GraphRecord};

/// Outcome of the last validation pass over a mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    #[default]
    Unvalidated,
    Validated,
    Rejected,
}

impl ValidationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ValidationStatus::Unvalidated => "unvalidated",
            ValidationStatus::Validated => "validated",
            ValidationStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ValidationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValidationStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "unvalidated" => Ok(ValidationStatus::Unvalidated),
            "validated" => Ok(ValidationStatus::Validated),
            "rejected" => Ok(ValidationStatus::Rejected),
            other => Err(Error::TypeError { expected: "validation status".into(), got: other.into() }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissionRecord {
    pub mission_id: String,
    pub mission_name: String,
    /// Free-form tag, e.g. "reconnaissance", "eod".
    pub mission_type: String,
    pub duration_hours: f64,
    pub description: String,
}

impl MissionRecord {
    pub fn new(
        mission_id: impl Into<String>,
        mission_name: impl Into<String>,
        mission_type: impl Into<String>,
        duration_hours: f64,
    ) -> Self {
        Self {
            mission_id: mission_id.into(),
            mission_name: mission_name.into(),
            mission_type: mission_type.into(),
            duration_hours,
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

impl GraphRecord for MissionRecord {
    const ENTITY: &'static str = "Mission_Profile";
    const ID_KEY: &'static str = keys::MISSION_ID;

    fn labels(&self) -> Vec<Label> {
        vec![Label::MissionProfile]
    }

    fn business_id(&self) -> String {
        self.mission_id.clone()
    }

    fn validate(&self) -> Result<()> {
        require(Self::ENTITY, keys::MISSION_ID, &self.mission_id)?;
        require(Self::ENTITY, keys::MISSION_NAME, &self.mission_name)
    }

    /// New missions always start unvalidated.
    fn to_properties(&self) -> PropertyMap {
        [
            (keys::MISSION_ID, Value::from(self.mission_id.as_str())),
            (keys::MISSION_NAME, self.mission_name.as_str().into()),
            (keys::MISSION_TYPE, self.mission_type.as_str().into()),
            (keys::DURATION_HOURS, self.duration_hours.into()),
            (keys::DESCRIPTION, self.description.as_str().into()),
            (keys::VALIDATION_STATUS, ValidationStatus::Unvalidated.as_str().into()),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }
}
