#![forbid(unsafe_code)]

//! Survivor and settlement sheet inputs that save as soon as they change.

use kdm_contracts::mutation::{Collection, FormMutation, PreferenceMutation};
use kdm_contracts::ObjectId;
use kdm_engines::attributes::{attribute_total, total_class, AttributeLayer};
use kdm_engines::notes::{TagAddOutcome, TagList};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::dom::StepDirection;
use crate::session::SessionContext;

pub const BLANK_VALUE_ALERT: &str = "Blank values cannot be saved!";
pub const CANNOT_USE_FIGHTING_ARTS_ID: &str = "survivor_sheet_cannot_use_fighting_arts";
pub const FIGHTING_ART_CLASS: &str = "survivor_sheet_fighting_art";
pub const STRIKETHROUGH_CLASS: &str = "strikethrough";
pub const CANNOT_SPEND_SURVIVAL_ID: &str = "cannot_spend_survival";
pub const SURVIVAL_ACTION_CLASS: &str = "survival_action_available";
pub const SURVIVAL_EMPHASIZE_CLASS: &str = "survival_action_emphasize";
pub const DAMAGE_CHECKED_CLASS: &str = "damage_box_checked";

/// Base, gear and token inputs of one survivor attribute.
#[derive(Debug, Clone)]
pub struct AttributeController {
    survivor_id: ObjectId,
}

impl AttributeController {
    pub fn new(survivor_id: ObjectId) -> Self {
        Self { survivor_id }
    }

    /// Recomputes the attribute total from the three layer inputs, writes it
    /// into every total element and saves the layer that changed.
    pub fn refresh(
        &self,
        session: &mut SessionContext,
        attribute: &str,
        changed: AttributeLayer,
    ) -> i64 {
        let read = |layer: AttributeLayer| {
            session
                .dom
                .value_of(&layer.input_id(attribute))
                .and_then(|v| v.trim().parse::<i64>().ok())
        };
        let base = read(AttributeLayer::Base);
        let gear = read(AttributeLayer::Gear);
        let tokens = read(AttributeLayer::Tokens);
        let source = read(changed).unwrap_or(0);

        let total = attribute_total(base, gear, tokens);
        session
            .dom
            .set_text_on_class(&total_class(attribute), &total.to_string());
        session.submit(FormMutation::attribute_controller_update(
            &self.survivor_id,
            attribute,
            changed.as_str(),
            source,
        ));
        total
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Notes,
    Epithets,
}

/// Notes or epithets list on the survivor sheet.
#[derive(Debug, Clone)]
pub struct SurvivorTagsView {
    kind: TagKind,
    survivor_id: ObjectId,
    list: TagList,
}

impl SurvivorTagsView {
    pub fn notes(survivor_id: ObjectId, existing: Vec<String>) -> Self {
        Self {
            kind: TagKind::Notes,
            survivor_id,
            list: TagList::notes().seeded(existing),
        }
    }

    pub fn epithets(survivor_id: ObjectId, existing: Vec<String>) -> Self {
        Self {
            kind: TagKind::Epithets,
            survivor_id,
            list: TagList::epithets().seeded(existing),
        }
    }

    pub fn items(&self) -> &[String] {
        self.list.items()
    }

    pub fn error_text(&self) -> &str {
        self.list.error_text()
    }

    /// Blank input does nothing. A duplicate sets the error text and is not
    /// posted. An entry the server would refuse raises an alert instead.
    pub fn add(&mut self, session: &mut SessionContext, raw: &str) -> TagAddOutcome {
        let outcome = self.list.add(raw);
        match outcome {
            TagAddOutcome::Added => {
                let request = match self.kind {
                    TagKind::Notes => FormMutation::add_survivor_note(&self.survivor_id, raw),
                    TagKind::Epithets => FormMutation::add_epithet(&self.survivor_id, raw),
                };
                session.submit(request);
            }
            TagAddOutcome::TooLong => session.dom.alert(self.list.error_text()),
            TagAddOutcome::Duplicate | TagAddOutcome::Blank => {}
        }
        outcome
    }

    pub fn remove(&mut self, session: &mut SessionContext, index: usize) -> Option<String> {
        let removed = self.list.remove_at(index)?;
        let request = match self.kind {
            TagKind::Notes => FormMutation::rm_survivor_note(&self.survivor_id, &removed),
            TagKind::Epithets => FormMutation::remove_epithet(&self.survivor_id, &removed),
        };
        session.submit(request);
        Some(removed)
    }
}

/// Generic `name=value` save for a sheet input. Blank values are refused
/// with a blocking alert.
pub fn update_asset_attrib(
    session: &mut SessionContext,
    input_id: &str,
    collection: Collection,
    asset_id: &ObjectId,
) -> bool {
    let Some(input) = session.dom.get(input_id) else {
        warn!("could not find input id {input_id}");
        return false;
    };
    let Some(name) = input.name.clone() else {
        warn!("input {input_id} has no name");
        return false;
    };
    let value = input.value.clone();
    let checked = input.checked;

    if value.is_empty() {
        session.dom.alert(BLANK_VALUE_ALERT);
        return false;
    }

    match input_id {
        CANNOT_USE_FIGHTING_ARTS_ID => {
            session
                .dom
                .set_class_on_class(FIGHTING_ART_CLASS, STRIKETHROUGH_CLASS, checked);
        }
        CANNOT_SPEND_SURVIVAL_ID => {
            if checked {
                session.dom.set_bold_on_class(SURVIVAL_ACTION_CLASS, false);
                session
                    .dom
                    .set_class_on_class(SURVIVAL_ACTION_CLASS, SURVIVAL_EMPHASIZE_CLASS, false);
            } else {
                session.dom.set_bold_on_class(SURVIVAL_ACTION_CLASS, true);
            }
        }
        _ => {}
    }

    session.submit(FormMutation::field_value(
        collection, asset_id, &name, &value,
    ))
}

/// Steps a numeric input and saves its new value.
pub fn step_and_save(
    session: &mut SessionContext,
    direction: StepDirection,
    input_id: &str,
    collection: Collection,
    asset_id: &ObjectId,
) -> Option<i64> {
    let value = session.dom.step(input_id, direction)?;
    let Some(name) = session.dom.get(input_id).and_then(|e| e.name.clone()) else {
        warn!("input {input_id} has no name");
        return Some(value);
    };
    session.submit(FormMutation::field_value(
        collection,
        asset_id,
        &name,
        &value.to_string(),
    ));
    Some(value)
}

pub fn toggle_damage(session: &mut SessionContext, box_id: &str, survivor_id: &ObjectId) -> bool {
    if !session.dom.toggle_class(box_id, DAMAGE_CHECKED_CLASS) {
        return false;
    }
    let Some(name) = session.dom.get(box_id).and_then(|e| e.name.clone()) else {
        warn!("damage box {box_id} has no name");
        return false;
    };
    session.submit(FormMutation::toggle_damage(survivor_id, &name))
}

/// Hides the tapped item's row and posts `remove_{group}={item text}`.
pub fn remove_settlement_sheet_asset(
    session: &mut SessionContext,
    item_id: &str,
    group: &str,
    settlement_id: &ObjectId,
) -> bool {
    let Some(item) = session.dom.get(item_id) else {
        warn!("could not find item id {item_id}");
        return false;
    };
    let item_name = item.text.trim().to_string();
    if let Some(parent) = item.parent.clone() {
        session.dom.hide(&parent);
    }
    session.submit(FormMutation::remove_settlement_asset(
        settlement_id,
        group,
        &item_name,
    ))
}

pub fn update_user_preference(session: &mut SessionContext, input_id: &str) -> bool {
    let Some(input) = session.dom.get(input_id) else {
        warn!("could not find preference input {input_id}");
        return false;
    };
    let Some(name) = input.name.clone() else {
        warn!("preference input {input_id} has no name");
        return false;
    };
    let value = input.value.clone();
    session.submit(PreferenceMutation::v1(&name, &value))
}

/// New-settlement form: campaign, expansion and survivor option catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSettlementView {
    pub show_loader: bool,
    pub assets: Option<Value>,
}

impl Default for NewSettlementView {
    fn default() -> Self {
        Self {
            show_loader: true,
            assets: None,
        }
    }
}

impl NewSettlementView {
    pub fn new() -> Self {
        Self::default()
    }

    /// The loader stays up when the catalog fails to load.
    pub fn init_new_settlement(&mut self, session: &mut SessionContext, api_base: &str) -> bool {
        match session.fetch_new_settlement_assets(api_base) {
            Ok(assets) => {
                self.assets = Some(assets);
                self.show_loader = false;
                info!("new settlement assets loaded");
                true
            }
            Err(err) => {
                error!(error = %err, "error loading new settlement assets");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Element;
    use crate::session::tests::{document_json, session_with, API};
    use crate::session::SessionContext;
    use crate::transport::RecordingMutationLog;
    use kdm_engines::notes::DUPLICATE_TAG_ERROR;

    fn survivor() -> ObjectId {
        ObjectId::new("s1").unwrap()
    }

    fn with_attribute_inputs(session: &mut SessionContext) {
        for (layer, value) in [("base", "2"), ("gear", "1"), ("tokens", "")] {
            session.dom.insert(
                Element::new("input", &format!("{layer}_value_Movement_controller"))
                    .with_value(value),
            );
        }
        session.dom.insert(
            Element::new("span", "mv_total_a").with_class("synthetic_attrib_total_Movement"),
        );
        session.dom.insert(
            Element::new("span", "mv_total_b").with_class("synthetic_attrib_total_Movement"),
        );
    }

    #[test]
    fn at_sheet_01_attribute_refresh_writes_totals_and_posts_layer() {
        let (mut session, log, _) = session_with(document_json(), "ann@kdm.test", false);
        with_attribute_inputs(&mut session);
        let controller = AttributeController::new(survivor());
        assert_eq!(controller.refresh(&mut session, "Movement", AttributeLayer::Gear), 3);
        assert_eq!(session.dom.get("mv_total_a").unwrap().text, "3");
        assert_eq!(session.dom.get("mv_total_b").unwrap().text, "3");
        assert_eq!(
            log.wire_lines(),
            vec!["modify=survivor&asset_id=s1&angularjs_attrib_update=Movement&angularjs_attrib_type=gear&angularjs_attrib_value=1&norefresh=True".to_string()]
        );
    }

    #[test]
    fn at_sheet_02_notes_insert_first_and_skip_duplicates() {
        let (mut session, log, _) = session_with(document_json(), "ann@kdm.test", false);
        let mut notes = SurvivorTagsView::notes(survivor(), vec!["old".to_string()]);
        assert_eq!(notes.add(&mut session, "new"), TagAddOutcome::Added);
        assert_eq!(notes.items(), &["new".to_string(), "old".to_string()]);
        assert_eq!(notes.add(&mut session, "old"), TagAddOutcome::Duplicate);
        assert_eq!(notes.error_text(), DUPLICATE_TAG_ERROR);
        assert_eq!(notes.add(&mut session, ""), TagAddOutcome::Blank);
        assert_eq!(notes.remove(&mut session, 1).as_deref(), Some("old"));
        assert_eq!(notes.remove(&mut session, 5), None);
        assert_eq!(
            log.wire_lines(),
            vec![
                "modify=survivor&asset_id=s1&add_survivor_note=new".to_string(),
                "modify=survivor&asset_id=s1&rm_survivor_note=old".to_string(),
            ]
        );
    }

    #[test]
    fn at_sheet_02b_oversized_note_alerts_and_stays_local_only() {
        let (mut session, log, _) = session_with(document_json(), "ann@kdm.test", false);
        let mut notes = SurvivorTagsView::notes(survivor(), Vec::new());
        let long = "n".repeat(kdm_contracts::mutation::MUTATION_PARAM_MAX_LEN + 1);
        assert_eq!(notes.add(&mut session, &long), TagAddOutcome::TooLong);
        assert!(notes.items().is_empty());
        assert_eq!(
            session.dom.alerts(),
            &[kdm_engines::notes::TOO_LONG_TAG_ERROR.to_string()]
        );
        assert!(log.is_empty());
        assert_eq!(session.dom.saved_flashes(), 0);
    }

    #[test]
    fn at_sheet_03_epithets_append() {
        let (mut session, log, _) = session_with(document_json(), "ann@kdm.test", false);
        let mut epithets = SurvivorTagsView::epithets(survivor(), vec!["Lucky".to_string()]);
        assert_eq!(epithets.add(&mut session, "Iron Will"), TagAddOutcome::Added);
        assert_eq!(epithets.items(), &["Lucky".to_string(), "Iron Will".to_string()]);
        assert_eq!(
            log.wire_lines(),
            vec!["modify=survivor&asset_id=s1&add_epithet=Iron+Will".to_string()]
        );
    }

    #[test]
    fn at_sheet_04_blank_value_alerts_and_is_not_sent() {
        let (mut session, log, _) = session_with(document_json(), "ann@kdm.test", false);
        session
            .dom
            .insert(Element::new("input", "survivor_name").with_name("name"));
        assert!(!update_asset_attrib(
            &mut session,
            "survivor_name",
            Collection::Survivor,
            &survivor()
        ));
        assert_eq!(session.dom.alerts(), &[BLANK_VALUE_ALERT.to_string()]);
        assert!(log.is_empty());

        session.dom.set_value("survivor_name", "Allister");
        assert!(update_asset_attrib(
            &mut session,
            "survivor_name",
            Collection::Survivor,
            &survivor()
        ));
        assert_eq!(
            log.wire_lines(),
            vec!["modify=survivor&asset_id=s1&name=Allister&norefresh=True".to_string()]
        );
    }

    #[test]
    fn at_sheet_05_fighting_art_and_survival_side_effects() {
        let (mut session, _, _) = session_with(document_json(), "ann@kdm.test", false);
        session.dom.insert(
            Element::new("input", CANNOT_USE_FIGHTING_ARTS_ID)
                .with_name("cannot_use_fighting_arts")
                .with_value("checked")
                .with_checked(true),
        );
        session
            .dom
            .insert(Element::new("p", "fa1").with_class(FIGHTING_ART_CLASS));
        session.dom.insert(
            Element::new("input", CANNOT_SPEND_SURVIVAL_ID)
                .with_name("cannot_spend_survival")
                .with_value("checked"),
        );
        session.dom.insert(
            Element::new("font", "dodge")
                .with_class(SURVIVAL_ACTION_CLASS)
                .with_class(SURVIVAL_EMPHASIZE_CLASS),
        );

        update_asset_attrib(
            &mut session,
            CANNOT_USE_FIGHTING_ARTS_ID,
            Collection::Survivor,
            &survivor(),
        );
        assert!(session.dom.get("fa1").unwrap().has_class(STRIKETHROUGH_CLASS));

        update_asset_attrib(
            &mut session,
            CANNOT_SPEND_SURVIVAL_ID,
            Collection::Survivor,
            &survivor(),
        );
        assert!(session.dom.get("dodge").unwrap().bold);

        session.dom.set_checked(CANNOT_SPEND_SURVIVAL_ID, true);
        update_asset_attrib(
            &mut session,
            CANNOT_SPEND_SURVIVAL_ID,
            Collection::Survivor,
            &survivor(),
        );
        let dodge = session.dom.get("dodge").unwrap();
        assert!(!dodge.bold);
        assert!(!dodge.has_class(SURVIVAL_EMPHASIZE_CLASS));
    }

    #[test]
    fn at_sheet_06_step_and_save_and_damage() {
        let (mut session, log, _) = session_with(document_json(), "ann@kdm.test", false);
        session.dom.insert(
            Element::new("input", "hunt_xp_input")
                .with_name("hunt_xp")
                .with_value("2"),
        );
        session
            .dom
            .insert(Element::new("input", "dmg_head").with_name("head_damage_light"));
        assert_eq!(
            step_and_save(
                &mut session,
                StepDirection::Up,
                "hunt_xp_input",
                Collection::Survivor,
                &survivor()
            ),
            Some(3)
        );
        assert!(toggle_damage(&mut session, "dmg_head", &survivor()));
        assert!(session.dom.get("dmg_head").unwrap().has_class(DAMAGE_CHECKED_CLASS));
        assert!(!toggle_damage(&mut session, "dmg_missing", &survivor()));
        assert_eq!(
            log.wire_lines(),
            vec![
                "modify=survivor&asset_id=s1&hunt_xp=3&norefresh=True".to_string(),
                "modify=survivor&asset_id=s1&head_damage_light=checked&norefresh=True".to_string(),
            ]
        );
    }

    #[test]
    fn at_sheet_07_remove_settlement_asset_hides_row() {
        let (mut session, log, _) = session_with(document_json(), "ann@kdm.test", false);
        session.dom.insert(Element::new("li", "row_1"));
        session.dom.append_child(
            "row_1",
            Element::new("span", "item_1").with_text("  Lantern Oven "),
        );
        let sid = session.settlement_id().clone();
        assert!(remove_settlement_sheet_asset(
            &mut session,
            "item_1",
            "innovation",
            &sid
        ));
        assert_eq!(
            session.dom.get("row_1").unwrap().display,
            crate::dom::Display::None
        );
        assert_eq!(
            log.wire_lines(),
            vec!["modify=settlement&asset_id=set1&remove_innovation=Lantern+Oven&norefresh=True".to_string()]
        );
    }

    #[test]
    fn at_sheet_08_user_preference() {
        let (mut session, log, _) = session_with(document_json(), "ann@kdm.test", false);
        session.dom.insert(
            Element::new("input", "pref_confirm")
                .with_name("confirm_on_return")
                .with_value("yes"),
        );
        assert!(update_user_preference(&mut session, "pref_confirm"));
        assert_eq!(
            log.wire_lines(),
            vec!["update_user_preferences=True&norefresh=True&confirm_on_return=yes".to_string()]
        );
    }

    #[test]
    fn at_sheet_09_new_settlement_loader() {
        let (mut session, _, _) = session_with(document_json(), "ann@kdm.test", false);
        let mut view = NewSettlementView::new();
        assert!(view.show_loader);
        assert!(!view.init_new_settlement(&mut session, API));
        assert!(view.show_loader);

        let snapshot = crate::fetch::SnapshotTransport::new()
            .with_reply("new_settlement", serde_json::json!({"campaigns": ["People of the Lantern"]}));
        let mut session = SessionContext::new(
            crate::fetch::DocumentFetchService::new(Box::new(snapshot)),
            Box::new(RecordingMutationLog::new()),
            std::time::Duration::from_millis(1_500),
        );
        assert!(view.init_new_settlement(&mut session, API));
        assert!(!view.show_loader);
        assert_eq!(view.assets.as_ref().unwrap()["campaigns"][0], "People of the Lantern");
    }
}
