#![forbid(unsafe_code)]

use std::sync::Arc;

use kdm_contracts::mutation::ApiMutation;
use kdm_contracts::timeline::GameEvent;
use kdm_engines::endeavor::{apply_token_modifier, classify_quarry};
use kdm_engines::timeline::AddEventOutcome;
use tracing::warn;

use crate::session::SessionContext;
use crate::timeline::append_and_submit;

pub struct EndeavorView;

impl EndeavorView {
    pub fn add_token(session: &mut SessionContext) -> Option<u32> {
        Self::step_tokens(session, 1)
    }

    /// Every click posts -1, even when the local count is already zero.
    pub fn rm_token(session: &mut SessionContext) -> Option<u32> {
        Self::step_tokens(session, -1)
    }

    fn step_tokens(session: &mut SessionContext, modifier: i64) -> Option<u32> {
        let Some(document) = session.document_mut() else {
            warn!("no settlement loaded; endeavor tokens unchanged");
            return None;
        };
        let tokens = apply_token_modifier(document.sheet.endeavor_tokens, modifier);
        document.sheet.endeavor_tokens = tokens;
        let id = session.settlement_id().clone();
        session.submit(ApiMutation::update_endeavor_tokens(&id, modifier));
        Some(tokens)
    }
}

/// Departing survivors panel: showdown type, quarry and the bulk updates
/// applied to everyone in the departing group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DepartingView {
    showdown_arrow: bool,
}

impl DepartingView {
    pub fn new() -> Self {
        Self::default()
    }

    /// The showdown section starts expanded once a showdown type is set.
    pub fn init_showdown_controls(&mut self, session: &SessionContext) -> bool {
        self.showdown_arrow = session
            .document()
            .is_some_and(|d| d.sheet.showdown_type.is_some());
        self.showdown_arrow
    }

    pub fn flip_showdown_arrow(&mut self) -> bool {
        self.showdown_arrow = !self.showdown_arrow;
        self.showdown_arrow
    }

    pub fn showdown_arrow(&self) -> bool {
        self.showdown_arrow
    }

    pub fn set_showdown_type(session: &mut SessionContext, showdown_type: &str) -> bool {
        let Some(document) = session.document_mut() else {
            warn!("no settlement loaded; showdown type unchanged");
            return false;
        };
        document.sheet.showdown_type = Some(showdown_type.to_string());
        let id = session.settlement_id().clone();
        session.submit(ApiMutation::set_showdown_type(&id, showdown_type))
    }

    /// Records the quarry for the current lantern year on the timeline and
    /// sets it as the settlement's current quarry. A quarry that is in none
    /// of the option lists is still saved, but not added to the timeline.
    pub fn save_current_quarry(
        session: &mut SessionContext,
        quarry: &str,
    ) -> Option<AddEventOutcome> {
        let Some(document) = session.document_mut() else {
            warn!("no settlement loaded; quarry {quarry} not saved");
            return None;
        };
        document.sheet.current_quarry = Some(quarry.to_string());
        let year = document.sheet.lantern_year;
        let event = classify_quarry(&document.game_assets, quarry).map(|kind| {
            document
                .game_assets
                .events
                .values()
                .find(|e| e.name == quarry && e.kind() == Some(kind))
                .cloned()
                .unwrap_or_else(|| {
                    Arc::new(GameEvent {
                        handle: quarry.to_string(),
                        name: quarry.to_string(),
                        event_type: kind.as_str().to_string(),
                        desc: None,
                    })
                })
        });

        let outcome = match event {
            Some(event) => Some(append_and_submit(session, year, &event)),
            None => {
                warn!("quarry {quarry} is not a showdown, nemesis or special showdown option");
                None
            }
        };
        let id = session.settlement_id().clone();
        session.submit(ApiMutation::set_current_quarry(&id, quarry));
        outcome
    }

    pub fn return_departing_survivors(session: &mut SessionContext, aftermath: &str) -> bool {
        session.dom.show_full_page_loader();
        let id = session.settlement_id().clone();
        session.submit(ApiMutation::return_survivors(&id, aftermath))
    }

    /// Bulk attribute change for the departing group. The controls stay
    /// hidden until the next load.
    pub fn update_departing_survivors(
        session: &mut SessionContext,
        attribute: &str,
        modifier: i64,
    ) -> bool {
        session.dom.show_full_page_loader();
        session.set_hide_controls(true);
        let id = session.settlement_id().clone();
        session.submit(ApiMutation::update_departing_survivors(
            &id, attribute, modifier,
        ))
    }
}
