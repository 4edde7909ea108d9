#![forbid(unsafe_code)]

use std::time::Instant;

use kdm_contracts::identity::UserIdentity;
use kdm_contracts::mutation::ApiMutation;
use kdm_contracts::survivor::{SurvivorEntry, GROUP_DEPARTING};
use kdm_contracts::{LanternYear, ObjectId};
use kdm_engines::manageable::{ManageableBarrier, ManageableVerdict};
use kdm_engines::roster::{
    clamp_attribute, departing_toggle_for, flip_arrow, locate_survivor, move_survivor,
    scrub_unmanageable, survivor_meta, MoveOutcome,
};
use tracing::{error, info, warn};

use crate::session::{SessionContext, SubmitMode};

pub const DEPARTING_FLAG: &str = "departing";
/// Session reloads the manageable check may trigger before it only logs.
pub const MANAGEABLE_RELOAD_LIMIT: u32 = 1;

/// Campaign summary survivor cards: who may manage whom, departing groups
/// and the quick attribute steppers.
#[derive(Debug, Clone)]
pub struct RosterView {
    barrier: ManageableBarrier,
    load_generation: u64,
}

fn expected_cards(session: &SessionContext) -> Option<u32> {
    session
        .document()
        .map(|d| u32::try_from(d.grouped_survivor_count()).unwrap_or(u32::MAX))
}

impl RosterView {
    /// Expects one card per grouped survivor in the current document.
    pub fn new(session: &SessionContext) -> Self {
        Self {
            barrier: ManageableBarrier::new(expected_cards(session), session.manageable_settle()),
            load_generation: session.load_generation(),
        }
    }

    /// A newly installed document gets its own barrier.
    fn follow_load(&mut self, session: &SessionContext) {
        let generation = session.load_generation();
        if generation != self.load_generation {
            self.load_generation = generation;
            self.barrier.reset(expected_cards(session));
        }
    }

    /// Recomputes one card's meta. Returns whether the survivor is departing.
    pub fn init_survivor_card(
        &mut self,
        identity: &UserIdentity,
        current: LanternYear,
        entry: &mut SurvivorEntry,
    ) -> bool {
        entry.meta = survivor_meta(identity, &entry.sheet, current);
        let departing = entry.sheet.departing;
        self.barrier.record_card(&entry.meta, departing);
        departing
    }

    /// Initializes every card of the loaded roster and starts the settle
    /// timer. Returns the number of cards initialized.
    pub fn init_cards(&mut self, session: &mut SessionContext, now: Instant) -> u32 {
        self.follow_load(session);
        let identity = session.identity().clone();
        let current = session.current_ly();
        let mut cards = 0_u32;
        let mut departing = 0_u32;
        if let Some(document) = session.document_mut() {
            for entry in document.grouped_survivors_mut() {
                cards += 1;
                if self.init_survivor_card(&identity, current, entry) {
                    departing += 1;
                }
            }
        }
        for _ in 0..departing {
            session.note_departing_survivor();
        }
        self.barrier.arm(now);
        cards
    }

    /// Once per load. A user who cannot manage a single survivor most likely
    /// got a stale or foreign document, so the session reloads, at most
    /// `MANAGEABLE_RELOAD_LIMIT` times.
    pub fn check_manageable(
        &mut self,
        session: &mut SessionContext,
        now: Instant,
    ) -> ManageableVerdict {
        self.follow_load(session);
        let verdict = self.barrier.poll(now);
        match verdict {
            ManageableVerdict::NoneManageable => {
                error!("{} cannot manage any survivors", session.identity().login);
                if session.reload_count() < MANAGEABLE_RELOAD_LIMIT {
                    session.reinitialize();
                } else {
                    warn!(
                        reloads = session.reload_count(),
                        "reload limit reached; keeping current settlement"
                    );
                }
            }
            ManageableVerdict::Satisfied { manageable } => info!(
                "[SURVIVORS] {} can manage {manageable} survivors in the {} view",
                session.identity().login,
                session.view()
            ),
            ManageableVerdict::NothingToManage => info!("no survivors to verify"),
            ManageableVerdict::Pending | ManageableVerdict::AlreadyChecked => {}
        }
        verdict
    }

    pub fn manageable_survivors(&self) -> u32 {
        self.barrier.manageable_count()
    }

    /// Flips the departing flag, moves the card to the matching group and
    /// submits the flag change.
    pub fn toggle_departing_status(session: &mut SessionContext, survivor_id: &str) -> MoveOutcome {
        let Some(document) = session.document_mut() else {
            warn!("no settlement loaded; cannot toggle {survivor_id}");
            return MoveOutcome::SurvivorNotFound;
        };
        let groups = &mut document.user_assets.survivor_groups;
        let Some((gi, si)) = locate_survivor(groups, survivor_id) else {
            warn!("survivor {survivor_id} not found in any group");
            return MoveOutcome::SurvivorNotFound;
        };
        let toggle = departing_toggle_for(groups[gi].survivors[si].sheet.departing);
        groups[gi].survivors[si].sheet.departing = !toggle.unset;

        let outcome = move_survivor(groups, survivor_id, toggle.target_group);
        if outcome == MoveOutcome::GroupNotFound {
            warn!("group {} missing; {survivor_id} stays put", toggle.target_group);
        }
        session.submit(
            ObjectId::new(survivor_id)
                .and_then(|id| ApiMutation::set_status_flag(&id, DEPARTING_FLAG, toggle.unset)),
        );
        outcome
    }

    /// `value = clamp(old + delta, 0, max)`. Returns false iff the value had
    /// to be clamped. The server gets the change that was actually applied.
    pub fn modify_survivor_attrib(
        session: &mut SessionContext,
        survivor_id: &str,
        attribute: &str,
        delta: i64,
        max: Option<i64>,
        mode: SubmitMode,
    ) -> bool {
        let Some(entry) = session
            .document_mut()
            .and_then(|d| d.find_grouped_survivor_mut(survivor_id))
        else {
            warn!("survivor {survivor_id} not found; {attribute} unchanged");
            return false;
        };
        let previous = entry.sheet.attribute(attribute).unwrap_or(0);
        let update = clamp_attribute(previous, delta, max);
        entry.sheet.set_attribute(attribute, update.value);
        let target = entry.sheet.id.clone();
        session.mirror_survivor_attribute(survivor_id, attribute, update.value);

        if mode == SubmitMode::Submit && update.effective_delta() != 0 {
            session.submit(ApiMutation::update_attribute(
                &target,
                attribute,
                update.effective_delta(),
            ));
        }
        !update.clamped
    }

    /// Returns the new arrow state, or `None` for an unknown group.
    pub fn flip_arrow(session: &mut SessionContext, group_handle: &str) -> Option<bool> {
        let group = session
            .document_mut()?
            .user_assets
            .survivor_groups
            .iter_mut()
            .find(|g| g.handle == group_handle)?;
        let next = flip_arrow(group.arrow);
        group.arrow = Some(next);
        Some(next)
    }

    /// Toggles `{id}_modal_controls`, only for survivors the user manages.
    pub fn show_survivor_controls(session: &mut SessionContext, survivor_id: &str) -> bool {
        let manageable = session
            .document_mut()
            .and_then(|d| d.find_grouped_survivor_mut(survivor_id))
            .is_some_and(|entry| entry.meta.manageable);
        if !manageable {
            return false;
        }
        session.show_hide(&format!("{survivor_id}_modal_controls"))
    }

    /// Search results: empties the id of every survivor the user may not
    /// manage. Returns how many were scrubbed.
    pub fn scrub_unmanageable_survivors(session: &mut SessionContext) -> usize {
        let identity = session.identity().clone();
        let Some(document) = session.document_mut() else {
            return 0;
        };
        let mut scrubbed = 0;
        let flat = document.user_assets.survivors.iter_mut();
        let grouped = document
            .user_assets
            .survivor_groups
            .iter_mut()
            .flat_map(|g| g.survivors.iter_mut());
        for entry in flat.chain(grouped) {
            if !scrub_unmanageable(&identity, &mut entry.sheet) {
                entry.meta.manageable = false;
                scrubbed += 1;
            }
        }
        scrubbed
    }

    pub fn departing_group_len(session: &SessionContext) -> usize {
        session
            .document()
            .and_then(|d| {
                d.user_assets
                    .survivor_groups
                    .iter()
                    .find(|g| g.handle == GROUP_DEPARTING)
            })
            .map_or(0, |g| g.survivors.len())
    }
}
