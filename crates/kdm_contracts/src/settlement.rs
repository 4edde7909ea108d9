#![forbid(unsafe_code)]

use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::survivor::{SurvivorEntry, SurvivorGroup};
use crate::timeline::{GameEvent, TimelineYear};
use crate::{LanternYear, ObjectId};

/// Full settlement aggregate as served by `settlement/{route}/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettlementDocument {
    pub sheet: SettlementSheet,
    #[serde(default)]
    pub game_assets: GameAssets,
    #[serde(default)]
    pub user_assets: UserAssets,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettlementSheet {
    #[serde(rename = "_id", default)]
    pub id: ObjectId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub lantern_year: LanternYear,
    #[serde(default)]
    pub endeavor_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub showdown_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_quarry: Option<String>,
    #[serde(default)]
    pub timeline: Vec<TimelineYear>,
}

/// `game_assets.events` keyed by handle, in the order the server sent them.
pub type EventCatalog = IndexMap<String, Arc<GameEvent>>;

/// Static reference data. Never mutated by the client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameAssets {
    #[serde(default)]
    pub events: EventCatalog,
    #[serde(default)]
    pub showdown_options: Vec<String>,
    #[serde(default)]
    pub nemesis_encounters: Vec<String>,
    #[serde(default)]
    pub special_showdown_options: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserAssets {
    #[serde(default)]
    pub survivor_groups: Vec<SurvivorGroup>,
    #[serde(default)]
    pub survivors: Vec<SurvivorEntry>,
}

impl SettlementDocument {
    pub fn catalog_event(&self, handle: &str) -> Option<&Arc<GameEvent>> {
        self.game_assets.events.get(handle)
    }

    pub fn grouped_survivor_count(&self) -> usize {
        self.user_assets
            .survivor_groups
            .iter()
            .map(|g| g.survivors.len())
            .sum()
    }

    pub fn grouped_survivors_mut(&mut self) -> impl Iterator<Item = &mut SurvivorEntry> {
        self.user_assets
            .survivor_groups
            .iter_mut()
            .flat_map(|g| g.survivors.iter_mut())
    }

    pub fn find_grouped_survivor_mut(&mut self, survivor_id: &str) -> Option<&mut SurvivorEntry> {
        self.grouped_survivors_mut()
            .find(|s| s.sheet.id.as_str() == survivor_id)
    }
}
