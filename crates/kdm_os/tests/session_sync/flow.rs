#![forbid(unsafe_code)]

use std::time::{Duration, Instant};

use kdm_contracts::mutation::MutationRequest;
use kdm_contracts::LanternYear;
use kdm_engines::manageable::ManageableVerdict;
use kdm_engines::roster::MoveOutcome;
use kdm_os::dom::{Display, Element, ViewTree};
use kdm_os::endeavor::{DepartingView, EndeavorView};
use kdm_os::fetch::{DocumentFetchService, SnapshotTransport};
use kdm_os::roster::RosterView;
use kdm_os::timeline::TimelineView;
use kdm_os::transport::RecordingMutationLog;
use kdm_os::{SessionContext, SubmitMode};
use serde_json::{json, Value};

const API: &str = "https://api.kdm.test/";

fn settlement() -> Value {
    json!({
        "sheet": {
            "_id": {"$oid": "5a1f"},
            "name": "Bone Garden",
            "lantern_year": 5,
            "endeavor_tokens": 0,
            "timeline": [{"year": 4}, {"year": 5, "story_event": [{"handle": "core_hooded_knight", "name": "Hooded Knight", "type": "story_event"}]}]
        },
        "game_assets": {
            "events": {
                "core_hooded_knight": {"handle": "core_hooded_knight", "name": "Hooded Knight", "type": "story_event"},
                "core_plague": {"handle": "core_plague", "name": "Plague", "type": "settlement_event"},
                "core_antelope": {"handle": "core_antelope", "name": "Screaming Antelope", "type": "showdown_event"}
            },
            "showdown_options": ["Screaming Antelope"],
            "nemesis_encounters": ["The Hand"],
            "special_showdown_options": []
        },
        "user_assets": {
            "survivor_groups": [
                {"handle": "available", "name": "Available", "survivors": [
                    {"sheet": {"_id": {"$oid": "a1"}, "name": "Ada", "email": "ada@kdm.test", "Survival": 2}},
                    {"sheet": {"_id": {"$oid": "b1"}, "name": "Bo", "email": "bo@kdm.test", "Survival": 0}}
                ]},
                {"handle": "departing", "name": "Departing", "survivors": []}
            ],
            "survivors": [
                {"sheet": {"_id": {"$oid": "a1"}, "name": "Ada", "email": "ada@kdm.test"}},
                {"sheet": {"_id": {"$oid": "b1"}, "name": "Bo", "email": "bo@kdm.test"}}
            ]
        }
    })
}

fn event_log() -> Value {
    json!([
        {"ly": 4, "event": "Ada joined"},
        {"ly": 5, "event": "Hooded Knight"},
        {"ly": "5", "event": "Bo departed"},
        {"ly": "", "event": "founding"}
    ])
}

fn open(login: &str, admin: bool) -> (SessionContext, RecordingMutationLog, SnapshotTransport) {
    let snapshot = SnapshotTransport::new()
        .with_reply("settlement/get/5a1f", settlement())
        .with_reply("settlement/event_log/5a1f", event_log());
    let log = RecordingMutationLog::new();
    let mut dom = ViewTree::new();
    dom.insert(Element::new("div", "saved_dialog").with_display(Display::None));
    dom.insert(Element::new("div", "timelineControlsLY5").with_display(Display::None));
    let mut session = SessionContext::new(
        DocumentFetchService::new(Box::new(snapshot.clone())),
        Box::new(log.clone()),
        Duration::from_millis(1_500),
    )
    .with_dom(dom);
    session
        .initialize("campaign_summary", login, admin, API, "5a1f")
        .unwrap();
    (session, log, snapshot)
}

fn total_survivors(session: &SessionContext) -> usize {
    session.document().unwrap().grouped_survivor_count()
}

#[test]
fn at_flow_01_campaign_summary_round() {
    let (mut session, log, _) = open("ada@kdm.test", false);
    let now = Instant::now();

    let mut roster = RosterView::new(&session);
    assert_eq!(roster.init_cards(&mut session, now), 2);
    assert_eq!(
        roster.check_manageable(&mut session, now),
        ManageableVerdict::Satisfied { manageable: 1 }
    );

    let before = total_survivors(&session);
    assert_eq!(
        RosterView::toggle_departing_status(&mut session, "a1"),
        MoveOutcome::Moved
    );
    assert_eq!(total_survivors(&session), before);
    assert_eq!(RosterView::departing_group_len(&session), 1);

    assert!(RosterView::modify_survivor_attrib(
        &mut session,
        "a1",
        "Survival",
        1,
        Some(3),
        SubmitMode::Submit
    ));
    assert_eq!(EndeavorView::add_token(&mut session), Some(1));
    assert_eq!(
        DepartingView::save_current_quarry(&mut session, "Screaming Antelope"),
        Some(kdm_engines::timeline::AddEventOutcome::Added)
    );

    let kinds: Vec<&str> = log
        .entries()
        .iter()
        .map(|m| match m {
            MutationRequest::Form(_) => "form",
            MutationRequest::Api(_) => "api",
            MutationRequest::Preferences(_) => "prefs",
        })
        .collect();
    assert_eq!(kinds, vec!["api", "api", "api", "form", "api"]);
    assert_eq!(session.dom.saved_flashes(), 5);
}

#[test]
fn at_flow_02_timeline_tab() {
    let (mut session, log, snapshot) = open("bo@kdm.test", false);
    let mut timeline = TimelineView::new();
    timeline.load_timeline(&mut session);

    let story: Vec<_> = timeline.story_events().iter().map(|e| e.handle.clone()).collect();
    assert_eq!(story, vec!["core_hooded_knight".to_string()]);

    let year5: Vec<_> = TimelineView::event_log_for_year(&session, 5)
        .unwrap()
        .into_iter()
        .map(|l| l.event.clone())
        .collect();
    assert_eq!(year5, vec!["Hooded Knight".to_string(), "Bo departed".to_string()]);
    assert_eq!(TimelineView::event_log_for_year(&session, 0).unwrap().len(), 1);

    // The parsed timeline copy is a different allocation from the catalog
    // event, so adding the catalog event still appends.
    assert!(TimelineView::add_event(&mut session, LanternYear(5), "core_hooded_knight"));
    assert!(TimelineView::add_event(&mut session, LanternYear(5), "core_hooded_knight"));
    let year = TimelineView::timeline_year(&session, LanternYear(5)).unwrap();
    assert_eq!(year.bucket("story_event").len(), 2);
    assert_eq!(log.len(), 1);

    assert!(TimelineView::show_hide_controls(&mut session, LanternYear(5)));
    assert!(TimelineView::set_lantern_year(&mut session, LanternYear(6)));
    assert_eq!(
        log.wire_lines()[1],
        "modify=settlement&asset_id=5a1f&lantern_year=6&norefresh=True"
    );
    assert_eq!(snapshot.calls().len(), 3);
}

#[test]
fn at_flow_03_stranger_reload_is_checked_again_and_capped() {
    let (mut session, log, snapshot) = open("mallory@kdm.test", false);
    let start = Instant::now();
    let mut roster = RosterView::new(&session);
    roster.init_cards(&mut session, start);
    assert_eq!(
        roster.check_manageable(&mut session, start),
        ManageableVerdict::NoneManageable
    );
    assert_eq!(session.reload_count(), 1);
    assert_eq!(snapshot.calls().len(), 2);

    let later = start + Duration::from_millis(10);
    assert_eq!(roster.check_manageable(&mut session, later), ManageableVerdict::Pending);
    assert_eq!(roster.init_cards(&mut session, later), 2);
    assert_eq!(
        roster.check_manageable(&mut session, later),
        ManageableVerdict::NoneManageable
    );
    assert_eq!(session.reload_count(), 1);
    assert_eq!(snapshot.calls().len(), 2);

    assert_eq!(RosterView::scrub_unmanageable_survivors(&mut session), 4);
    assert!(!RosterView::modify_survivor_attrib(
        &mut session,
        "a1",
        "Survival",
        1,
        None,
        SubmitMode::Submit
    ));
    assert!(log.is_empty());
}

#[test]
fn at_flow_04_transport_failures_never_roll_back_local_state() {
    let snapshot = SnapshotTransport::for_document("5a1f", settlement());
    let mut session = SessionContext::new(
        DocumentFetchService::new(Box::new(snapshot)),
        Box::new(RecordingMutationLog::always_fail("connection refused")),
        Duration::from_millis(1_500),
    );
    session
        .initialize("campaign_summary", "ada@kdm.test", true, API, "5a1f")
        .unwrap();
    assert_eq!(EndeavorView::add_token(&mut session), Some(1));
    assert_eq!(EndeavorView::add_token(&mut session), Some(2));
    assert_eq!(session.document().unwrap().sheet.endeavor_tokens, 2);
    assert_eq!(session.dom.saved_flashes(), 2);
}
