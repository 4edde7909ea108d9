#![forbid(unsafe_code)]

use std::sync::Arc;

use kdm_contracts::event_log::EventLogLine;
use kdm_contracts::settlement::EventCatalog;
use kdm_contracts::timeline::{EventKind, GameEvent, TimelineYear};
use kdm_contracts::LanternYear;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventPartition {
    pub story_events: Vec<Arc<GameEvent>>,
    pub settlement_events: Vec<Arc<GameEvent>>,
}

/// Splits the catalog by `type`. Story events are sorted by name (byte order,
/// stable for equal names); settlement events keep catalog order.
pub fn partition_events(catalog: &EventCatalog) -> EventPartition {
    let mut out = EventPartition::default();
    for event in catalog.values() {
        match event.kind() {
            Some(EventKind::StoryEvent) => out.story_events.push(Arc::clone(event)),
            Some(EventKind::SettlementEvent) => out.settlement_events.push(Arc::clone(event)),
            _ => {}
        }
    }
    out.story_events.sort_by(|a, b| a.name.cmp(&b.name));
    out
}

/// Lines whose year equals `year`, in log order. `None` while the log has
/// not been loaded.
pub fn event_log_for_year(log: Option<&[EventLogLine]>, year: i64) -> Option<Vec<&EventLogLine>> {
    let log = log?;
    Some(log.iter().filter(|line| line.ly == Some(year)).collect())
}

pub fn timeline_year(timeline: &[TimelineYear], year: LanternYear) -> Option<&TimelineYear> {
    timeline.iter().find(|y| y.year == year)
}

/// Year entry for `year`, inserted in year order when missing.
pub fn timeline_year_mut(timeline: &mut Vec<TimelineYear>, year: LanternYear) -> &mut TimelineYear {
    let idx = match timeline.iter().position(|y| y.year == year) {
        Some(idx) => idx,
        None => {
            let at = timeline.partition_point(|y| y.year < year);
            timeline.insert(at, TimelineYear::v1(year));
            at
        }
    };
    &mut timeline[idx]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddEventOutcome {
    Added,
    Duplicate,
}

/// Appends the shared catalog handle to the year's bucket for its type.
/// Duplicates are detected by pointer identity only: a value-equal event that
/// came from a different allocation (e.g. parsed out of the timeline JSON) is
/// a different event here.
pub fn add_event(
    timeline: &mut Vec<TimelineYear>,
    year: LanternYear,
    event: &Arc<GameEvent>,
) -> AddEventOutcome {
    let bucket = timeline_year_mut(timeline, year).bucket_mut(&event.event_type);
    if bucket.iter().any(|e| Arc::ptr_eq(e, event)) {
        return AddEventOutcome::Duplicate;
    }
    bucket.push(Arc::clone(event));
    AddEventOutcome::Added
}
