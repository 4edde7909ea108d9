#![forbid(unsafe_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::LanternYear;

/// Catalog entry from `game_assets.events`. Timeline buckets hold shared
/// handles to these, so identity (not value) tells two entries apart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEvent {
    #[serde(default)]
    pub handle: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,
}

impl GameEvent {
    pub fn kind(&self) -> Option<EventKind> {
        EventKind::parse(&self.event_type)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    StoryEvent,
    SettlementEvent,
    ShowdownEvent,
    NemesisEncounter,
    SpecialShowdown,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StoryEvent => "story_event",
            Self::SettlementEvent => "settlement_event",
            Self::ShowdownEvent => "showdown_event",
            Self::NemesisEncounter => "nemesis_encounter",
            Self::SpecialShowdown => "special_showdown",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "story_event" => Some(Self::StoryEvent),
            "settlement_event" => Some(Self::SettlementEvent),
            "showdown_event" => Some(Self::ShowdownEvent),
            "nemesis_encounter" => Some(Self::NemesisEncounter),
            "special_showdown" => Some(Self::SpecialShowdown),
            _ => None,
        }
    }
}

/// One lantern year of the settlement timeline: named event-type buckets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimelineYear {
    pub year: LanternYear,
    #[serde(flatten)]
    pub buckets: BTreeMap<String, Vec<Arc<GameEvent>>>,
}

impl TimelineYear {
    pub fn v1(year: LanternYear) -> Self {
        Self {
            year,
            buckets: BTreeMap::new(),
        }
    }

    pub fn bucket(&self, event_type: &str) -> &[Arc<GameEvent>] {
        self.buckets
            .get(event_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn bucket_mut(&mut self, event_type: &str) -> &mut Vec<Arc<GameEvent>> {
        self.buckets.entry(event_type.to_string()).or_default()
    }
}
