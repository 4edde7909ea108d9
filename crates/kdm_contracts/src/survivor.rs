#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{LanternYear, ObjectId};

pub const GROUP_AVAILABLE: &str = "available";
pub const GROUP_DEPARTING: &str = "departing";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurvivorSheet {
    #[serde(rename = "_id", default)]
    pub id: ObjectId,
    #[serde(default)]
    pub name: String,
    /// Owner login.
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub departing: bool,
    #[serde(default)]
    pub returning_survivor: Vec<LanternYear>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub epithets: Vec<String>,
    /// Everything else on the sheet, including the numeric attributes
    /// (`Survival`, `Insanity`, `hunt_xp`, ...).
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl SurvivorSheet {
    pub fn attribute(&self, name: &str) -> Option<i64> {
        let value = self.attributes.get(name)?;
        value
            .as_i64()
            .or_else(|| value.as_f64().filter(|v| v.is_finite()).map(|v| v as i64))
            .or_else(|| value.as_str().and_then(|s| s.trim().parse::<i64>().ok()))
    }

    pub fn set_attribute(&mut self, name: &str, value: i64) {
        self.attributes.insert(name.to_string(), Value::from(value));
    }
}

/// Client-only annotations, recomputed every time the document is loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SurvivorMeta {
    pub manageable: bool,
    pub returning_survivor: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurvivorEntry {
    pub sheet: SurvivorSheet,
    #[serde(skip)]
    pub meta: SurvivorMeta,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurvivorGroup {
    pub handle: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub survivors: Vec<SurvivorEntry>,
    /// Expand/collapse arrow state in the roster view. `None` until touched.
    #[serde(skip)]
    pub arrow: Option<bool>,
}
