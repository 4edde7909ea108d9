#![forbid(unsafe_code)]

use kdm_contracts::identity::UserIdentity;
use kdm_contracts::survivor::{
    SurvivorEntry, SurvivorGroup, SurvivorMeta, SurvivorSheet, GROUP_AVAILABLE, GROUP_DEPARTING,
};
use kdm_contracts::LanternYear;
use tracing::debug;

/// Advisory only: admins manage everything, owners manage their own survivors.
pub fn user_can_manage(identity: &UserIdentity, sheet: &SurvivorSheet) -> bool {
    identity.is_settlement_admin || sheet.email == identity.login
}

/// Clears the id of a survivor the caller may not manage so no mutation can
/// target it afterwards. Returns whether the survivor is manageable.
pub fn scrub_unmanageable(identity: &UserIdentity, sheet: &mut SurvivorSheet) -> bool {
    if user_can_manage(identity, sheet) {
        return true;
    }
    sheet.id.clear();
    false
}

/// Returning if the current or the immediately preceding year is listed.
pub fn is_returning(returning_years: &[LanternYear], current: LanternYear) -> bool {
    returning_years.contains(&current)
        || current
            .previous()
            .is_some_and(|prev| returning_years.contains(&prev))
}

pub fn survivor_meta(
    identity: &UserIdentity,
    sheet: &SurvivorSheet,
    current: LanternYear,
) -> SurvivorMeta {
    SurvivorMeta {
        manageable: user_can_manage(identity, sheet),
        returning_survivor: is_returning(&sheet.returning_survivor, current),
    }
}

pub fn locate_survivor(groups: &[SurvivorGroup], survivor_id: &str) -> Option<(usize, usize)> {
    if survivor_id.is_empty() {
        return None;
    }
    groups.iter().enumerate().find_map(|(gi, g)| {
        g.survivors
            .iter()
            .position(|s| s.sheet.id.as_str() == survivor_id)
            .map(|si| (gi, si))
    })
}

/// Removes the survivor from whichever group holds it.
pub fn pop_survivor(groups: &mut [SurvivorGroup], survivor_id: &str) -> Option<SurvivorEntry> {
    let (gi, si) = locate_survivor(groups, survivor_id)?;
    Some(groups[gi].survivors.remove(si))
}

/// Appends to the group with `group_handle`. Hands the entry back when no
/// group matches.
pub fn push_survivor(
    groups: &mut [SurvivorGroup],
    entry: SurvivorEntry,
    group_handle: &str,
) -> Result<(), SurvivorEntry> {
    match groups.iter_mut().find(|g| g.handle == group_handle) {
        Some(group) => {
            group.survivors.push(entry);
            Ok(())
        }
        None => Err(entry),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved,
    SurvivorNotFound,
    GroupNotFound,
}

/// Remove-then-insert. On an unknown target group the survivor goes back
/// where it was, so it never drops out of the roster.
pub fn move_survivor(
    groups: &mut [SurvivorGroup],
    survivor_id: &str,
    group_handle: &str,
) -> MoveOutcome {
    let Some((gi, si)) = locate_survivor(groups, survivor_id) else {
        return MoveOutcome::SurvivorNotFound;
    };
    let entry = groups[gi].survivors.remove(si);
    match push_survivor(groups, entry, group_handle) {
        Ok(()) => MoveOutcome::Moved,
        Err(entry) => {
            debug!("no group {group_handle}; {survivor_id} restored");
            groups[gi].survivors.insert(si, entry);
            MoveOutcome::GroupNotFound
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepartingToggle {
    pub target_group: &'static str,
    pub unset: bool,
}

pub fn departing_toggle_for(currently_departing: bool) -> DepartingToggle {
    if currently_departing {
        DepartingToggle {
            target_group: GROUP_AVAILABLE,
            unset: true,
        }
    } else {
        DepartingToggle {
            target_group: GROUP_DEPARTING,
            unset: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeUpdate {
    pub previous: i64,
    pub value: i64,
    pub clamped: bool,
}

impl AttributeUpdate {
    pub fn effective_delta(&self) -> i64 {
        self.value - self.previous
    }
}

/// `clamp(old + delta, 0, max)`, or `[0, inf)` without a max.
pub fn clamp_attribute(previous: i64, delta: i64, max: Option<i64>) -> AttributeUpdate {
    let raw = previous.saturating_add(delta);
    let (value, clamped) = if raw < 0 {
        (0, true)
    } else {
        match max.map(|m| m.max(0)) {
            Some(m) if raw > m => (m, true),
            _ => (raw, false),
        }
    };
    AttributeUpdate {
        previous,
        value,
        clamped,
    }
}

/// Group arrows start collapsed; the first flip expands.
pub fn flip_arrow(state: Option<bool>) -> bool {
    !state.unwrap_or(false)
}
