#![forbid(unsafe_code)]

use std::fmt;

use serde::{Deserialize, Serialize};

pub const OBJECT_ID_MAX_LEN: usize = 128;

/// In-game calendar tick indexing the timeline and the event log.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct LanternYear(pub u32);

impl LanternYear {
    pub fn previous(self) -> Option<Self> {
        self.0.checked_sub(1).map(Self)
    }
}

impl fmt::Display for LanternYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Server document id as it appears on the wire: `{"$oid": "..."}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId {
    #[serde(rename = "$oid", default)]
    oid: String,
}

impl ObjectId {
    pub fn new(raw: impl Into<String>) -> Result<Self, ContractViolation> {
        let id = Self { oid: raw.into() };
        id.validate()?;
        Ok(id)
    }

    pub fn as_str(&self) -> &str {
        &self.oid
    }

    pub fn is_empty(&self) -> bool {
        self.oid.is_empty()
    }

    /// Empties the id so nothing can target this asset anymore.
    pub fn clear(&mut self) {
        self.oid.clear();
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.oid)
    }
}

impl Validate for ObjectId {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.oid.trim().is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "object_id.$oid",
                reason: "must not be empty",
            });
        }
        if self.oid.len() > OBJECT_ID_MAX_LEN {
            return Err(ContractViolation::InvalidValue {
                field: "object_id.$oid",
                reason: "must be <= 128 chars",
            });
        }
        if self
            .oid
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || c == '/')
        {
            return Err(ContractViolation::InvalidValue {
                field: "object_id.$oid",
                reason: "must not contain whitespace, control chars or '/'",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContractViolation {
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: &'static str,
    },
    #[error("{field} out of range [{min}, {max}]: got {got}")]
    InvalidRange {
        field: &'static str,
        min: i64,
        max: i64,
        got: i64,
    },
}

pub trait Validate {
    fn validate(&self) -> Result<(), ContractViolation>;
}
