#![forbid(unsafe_code)]

use std::sync::Arc;

use kdm_contracts::event_log::EventLogLine;
use kdm_contracts::mutation::FormMutation;
use kdm_contracts::settlement::SettlementDocument;
use kdm_contracts::timeline::{GameEvent, TimelineYear};
use kdm_contracts::LanternYear;
use kdm_engines::timeline::{
    add_event, event_log_for_year, partition_events, timeline_year, AddEventOutcome,
    EventPartition,
};
use tracing::{debug, error, info, warn};

use crate::fetch::{ROUTE_DEFAULT, ROUTE_EVENT_LOG};
use crate::session::SessionContext;

pub fn controls_id(year: LanternYear) -> String {
    format!("timelineControlsLY{year}")
}

/// Timeline tab: the catalog split into pickable story and settlement
/// events, plus the per-year event log.
#[derive(Debug, Clone, Default)]
pub struct TimelineView {
    events: EventPartition,
}

impl TimelineView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Two independent fetches: the settlement document and its event log.
    /// Either may fail without affecting the other.
    pub fn load_timeline(&mut self, session: &mut SessionContext) {
        match session.load_settlement::<SettlementDocument>(ROUTE_DEFAULT) {
            Ok(document) => {
                session.install_document(document);
                self.set_events(session);
                info!("timeline initialized");
            }
            Err(err) => error!(error = %err, "error loading timeline"),
        }
        match session.load_settlement::<Vec<EventLogLine>>(ROUTE_EVENT_LOG) {
            Ok(log) => {
                info!("{} item event_log initialized", log.len());
                session.set_event_log(log);
            }
            Err(err) => error!(error = %err, "error loading event_log"),
        }
    }

    pub fn set_events(&mut self, session: &SessionContext) {
        self.events = session
            .document()
            .map(|d| partition_events(&d.game_assets.events))
            .unwrap_or_default();
        info!(
            "initialized {} story events and {} settlement events",
            self.events.story_events.len(),
            self.events.settlement_events.len()
        );
    }

    pub fn story_events(&self) -> &[Arc<GameEvent>] {
        &self.events.story_events
    }

    pub fn settlement_events(&self) -> &[Arc<GameEvent>] {
        &self.events.settlement_events
    }

    /// `None` until the event log has loaded.
    pub fn event_log_for_year<'a>(
        session: &'a SessionContext,
        year: i64,
    ) -> Option<Vec<&'a EventLogLine>> {
        event_log_for_year(session.event_log(), year)
    }

    pub fn timeline_year(session: &SessionContext, year: LanternYear) -> Option<&TimelineYear> {
        session
            .document()
            .and_then(|d| timeline_year(&d.sheet.timeline, year))
    }

    /// Adds the catalog event `handle` to `year`. Returns false only for an
    /// unknown handle; a duplicate is a successful no-op.
    pub fn add_event(session: &mut SessionContext, year: LanternYear, handle: &str) -> bool {
        let Some(event) = session
            .document()
            .and_then(|d| d.catalog_event(handle))
            .cloned()
        else {
            warn!("unknown event handle {handle}");
            return false;
        };
        append_and_submit(session, year, &event);
        true
    }

    pub fn set_lantern_year(session: &mut SessionContext, year: LanternYear) -> bool {
        info!("setting LY to {year}");
        session.set_current_ly(year);
        if let Some(document) = session.document_mut() {
            document.sheet.lantern_year = year;
        }
        let id = session.settlement_id().clone();
        session.submit(FormMutation::set_lantern_year(&id, year))
    }

    pub fn show_hide_controls(session: &mut SessionContext, year: LanternYear) -> bool {
        session.dom.show_hide_controls(&controls_id(year))
    }

    pub fn show_controls(session: &mut SessionContext, year: LanternYear) -> bool {
        session.dom.show_controls(&controls_id(year))
    }
}

/// Appends `event` to its type bucket for `year` and posts the timeline
/// update. Duplicates (same shared event) are neither appended nor posted.
pub(crate) fn append_and_submit(
    session: &mut SessionContext,
    year: LanternYear,
    event: &Arc<GameEvent>,
) -> AddEventOutcome {
    let Some(document) = session.document_mut() else {
        warn!("no settlement loaded; cannot add {}", event.handle);
        return AddEventOutcome::Duplicate;
    };
    let outcome = add_event(&mut document.sheet.timeline, year, event);
    if outcome == AddEventOutcome::Duplicate {
        debug!("duplicate event {} in LY {year}", event.handle);
        return outcome;
    }
    let id = session.settlement_id().clone();
    session.submit(FormMutation::add_timeline_event(&id, year, &event.handle));
    outcome
}
