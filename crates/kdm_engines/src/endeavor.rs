#![forbid(unsafe_code)]

use kdm_contracts::settlement::GameAssets;
use kdm_contracts::timeline::EventKind;

/// `max(0, tokens + modifier)`, saturating at `u32::MAX`.
pub fn apply_token_modifier(tokens: u32, modifier: i64) -> u32 {
    let next = i64::from(tokens).saturating_add(modifier);
    u32::try_from(next.max(0)).unwrap_or(u32::MAX)
}

/// Timeline event type for a selected quarry. The three option lists are
/// disjoint; the first list that contains the quarry wins.
pub fn classify_quarry(assets: &GameAssets, quarry: &str) -> Option<EventKind> {
    if assets.showdown_options.iter().any(|q| q == quarry) {
        Some(EventKind::ShowdownEvent)
    } else if assets.nemesis_encounters.iter().any(|q| q == quarry) {
        Some(EventKind::NemesisEncounter)
    } else if assets.special_showdown_options.iter().any(|q| q == quarry) {
        Some(EventKind::SpecialShowdown)
    } else {
        None
    }
}
