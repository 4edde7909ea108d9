#![forbid(unsafe_code)]

use std::time::Duration;

use kdm_contracts::event_log::EventLogLine;
use kdm_contracts::identity::UserIdentity;
use kdm_contracts::mutation::MutationRequest;
use kdm_contracts::settlement::SettlementDocument;
use kdm_contracts::survivor::SurvivorSheet;
use kdm_contracts::{ContractViolation, LanternYear, ObjectId, Validate};
use kdm_engines::roster::survivor_meta;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::ClientConfig;
use crate::dom::ViewTree;
use crate::fetch::{DocumentFetchService, FetchError, ROUTE_DEFAULT};
use crate::transport::{HttpMutationLog, MutationLog};

#[derive(Debug, Clone, PartialEq)]
pub enum SurvivorLookup {
    Unloaded,
    NotFound,
    Found(Box<SurvivorSheet>),
}

impl SurvivorLookup {
    pub fn sheet(&self) -> Option<&SurvivorSheet> {
        match self {
            Self::Found(sheet) => Some(sheet),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitMode {
    Submit,
    /// Local change only.
    Silent,
}

/// Everything a rendered view shares: who is looking, which settlement, the
/// last fetched document and the page itself. Created when a view loads and
/// dropped when the user navigates away.
pub struct SessionContext {
    pub dom: ViewTree,
    view: String,
    identity: UserIdentity,
    api_base: String,
    settlement_id: ObjectId,
    document: Option<SettlementDocument>,
    event_log: Option<Vec<EventLogLine>>,
    survivor: SurvivorLookup,
    current_ly: LanternYear,
    departing_survivor_count: u32,
    hide_controls: bool,
    manageable_settle: Duration,
    reload_count: u32,
    load_generation: u64,
    fetch: DocumentFetchService,
    mutations: Box<dyn MutationLog>,
}

impl SessionContext {
    pub fn new(
        fetch: DocumentFetchService,
        mutations: Box<dyn MutationLog>,
        manageable_settle: Duration,
    ) -> Self {
        Self {
            dom: ViewTree::new(),
            view: String::new(),
            identity: UserIdentity::v1("", false),
            api_base: String::new(),
            settlement_id: ObjectId::default(),
            document: None,
            event_log: None,
            survivor: SurvivorLookup::Unloaded,
            current_ly: LanternYear::default(),
            departing_survivor_count: 0,
            hide_controls: false,
            manageable_settle,
            reload_count: 0,
            load_generation: 0,
            fetch,
            mutations,
        }
    }

    pub fn http(config: &ClientConfig) -> Self {
        Self::new(
            DocumentFetchService::http(config),
            Box::new(HttpMutationLog::new(config)),
            Duration::from_millis(config.manageable_settle_ms),
        )
    }

    pub fn with_dom(mut self, dom: ViewTree) -> Self {
        self.dom = dom;
        self
    }

    /// Binds the session to a user and a settlement, then loads the default
    /// settlement view. A failed load is logged and leaves no document.
    pub fn initialize(
        &mut self,
        view: &str,
        login: &str,
        is_admin: bool,
        api_base: &str,
        settlement_id: &str,
    ) -> Result<(), ContractViolation> {
        let identity = UserIdentity::v1(login, is_admin);
        identity.validate()?;
        let settlement_id = ObjectId::new(settlement_id)?;

        self.view = view.to_string();
        self.identity = identity;
        self.api_base = api_base.to_string();
        self.settlement_id = settlement_id;
        self.reset_view_state();
        self.load_and_install();

        info!("appRoot controller ({}) initialized", self.view);
        info!("{} admin = {}", self.identity.login, self.identity.is_settlement_admin);
        Ok(())
    }

    /// Throws away everything derived from the last load and loads again with
    /// the same user and settlement.
    pub fn reinitialize(&mut self) {
        self.reload_count = self.reload_count.saturating_add(1);
        warn!(
            reload = self.reload_count,
            "reinitializing {} view for {}", self.view, self.identity.login
        );
        self.document = None;
        self.reset_view_state();
        self.load_and_install();
    }

    fn reset_view_state(&mut self) {
        self.event_log = None;
        self.survivor = SurvivorLookup::Unloaded;
        self.departing_survivor_count = 0;
        self.hide_controls = false;
    }

    fn load_and_install(&mut self) {
        match self.load_settlement(ROUTE_DEFAULT) {
            Ok(document) => {
                self.install_document(document);
                info!("settlement initialized");
            }
            Err(err) => error!(error = %err, "error loading settlement"),
        }
    }

    /// One fetch of a named settlement view. Nothing is installed.
    pub fn load_settlement<T: serde::de::DeserializeOwned>(
        &self,
        route: &str,
    ) -> Result<T, FetchError> {
        self.fetch
            .fetch_route(&self.api_base, route, &self.settlement_id)
    }

    /// Makes `document` the current one and recomputes every survivor's
    /// client-side meta against the new lantern year. Every install starts a
    /// new load generation.
    pub fn install_document(&mut self, mut document: SettlementDocument) {
        self.load_generation = self.load_generation.wrapping_add(1);
        self.current_ly = document.sheet.lantern_year;
        let current = self.current_ly;
        let identity = &self.identity;
        for entry in document.user_assets.survivors.iter_mut() {
            entry.meta = survivor_meta(identity, &entry.sheet, current);
        }
        for entry in document.grouped_survivors_mut() {
            entry.meta = survivor_meta(identity, &entry.sheet, current);
        }
        self.document = Some(document);
    }

    /// Refetches the settlement and picks the survivor with `survivor_id`
    /// out of its flat survivor list. A failed fetch keeps the previous
    /// lookup.
    pub fn load_survivor(&mut self, survivor_id: &str) -> &SurvivorLookup {
        let document: SettlementDocument = match self.load_settlement(ROUTE_DEFAULT) {
            Ok(document) => document,
            Err(err) => {
                error!(error = %err, "error loading survivor {survivor_id}");
                return &self.survivor;
            }
        };
        self.survivor = document
            .user_assets
            .survivors
            .into_iter()
            .map(|entry| entry.sheet)
            .find(|sheet| !survivor_id.is_empty() && sheet.id.as_str() == survivor_id)
            .map(|sheet| SurvivorLookup::Found(Box::new(sheet)))
            .unwrap_or(SurvivorLookup::NotFound);
        match self.survivor {
            SurvivorLookup::Found(_) => info!("survivor {survivor_id} initialized"),
            _ => warn!("survivor {survivor_id} not found in settlement"),
        }
        &self.survivor
    }

    pub fn fetch_new_settlement_assets(&mut self, api_base: &str) -> Result<Value, FetchError> {
        self.api_base = api_base.to_string();
        self.fetch.fetch_new_settlement_assets(api_base)
    }

    pub fn register_modal_div(&mut self, button_id: &str, modal_id: &str) -> bool {
        self.dom.register_modal_div(button_id, modal_id)
    }

    pub fn show_hide(&mut self, id: &str) -> bool {
        self.dom.show_hide(id)
    }

    pub fn range(count: usize) -> Vec<usize> {
        (0..count).collect()
    }

    pub fn array_contains<T: PartialEq>(needle: &T, haystack: &[T]) -> bool {
        haystack.contains(needle)
    }

    /// Sends one mutation and flashes the saved toast. The local change has
    /// already happened; a transport failure is logged and otherwise ignored.
    /// Returns false only when the request could not be built.
    pub fn submit<M>(&mut self, request: Result<M, ContractViolation>) -> bool
    where
        M: Into<MutationRequest>,
    {
        let request: MutationRequest = match request {
            Ok(m) => m.into(),
            Err(violation) => {
                warn!(%violation, "mutation not sent");
                return false;
            }
        };
        let described = request.describe();
        debug!(mutation = %described, "submitting");
        if let Err(err) = self.mutations.submit(&request) {
            warn!(error = %err, mutation = %described, "mutation failed");
        }
        self.dom.flash_saved();
        true
    }

    pub fn view(&self) -> &str {
        &self.view
    }

    pub fn identity(&self) -> &UserIdentity {
        &self.identity
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn settlement_id(&self) -> &ObjectId {
        &self.settlement_id
    }

    pub fn document(&self) -> Option<&SettlementDocument> {
        self.document.as_ref()
    }

    pub fn document_mut(&mut self) -> Option<&mut SettlementDocument> {
        self.document.as_mut()
    }

    pub fn event_log(&self) -> Option<&[EventLogLine]> {
        self.event_log.as_deref()
    }

    pub fn set_event_log(&mut self, log: Vec<EventLogLine>) {
        self.event_log = Some(log);
    }

    pub fn survivor(&self) -> &SurvivorLookup {
        &self.survivor
    }

    /// Copies an attribute change made on a survivor card into the flat
    /// survivor list and the loaded survivor sheet.
    pub fn mirror_survivor_attribute(&mut self, survivor_id: &str, attribute: &str, value: i64) {
        if let Some(document) = self.document.as_mut() {
            document
                .user_assets
                .survivors
                .iter_mut()
                .filter(|entry| entry.sheet.id.as_str() == survivor_id)
                .for_each(|entry| entry.sheet.set_attribute(attribute, value));
        }
        if let SurvivorLookup::Found(sheet) = &mut self.survivor {
            if sheet.id.as_str() == survivor_id {
                sheet.set_attribute(attribute, value);
            }
        }
    }

    pub fn current_ly(&self) -> LanternYear {
        self.current_ly
    }

    pub fn set_current_ly(&mut self, year: LanternYear) {
        self.current_ly = year;
    }

    pub fn departing_survivor_count(&self) -> u32 {
        self.departing_survivor_count
    }

    pub fn note_departing_survivor(&mut self) {
        self.departing_survivor_count = self.departing_survivor_count.saturating_add(1);
    }

    pub fn hide_controls(&self) -> bool {
        self.hide_controls
    }

    pub fn set_hide_controls(&mut self, hide: bool) {
        self.hide_controls = hide;
    }

    pub fn manageable_settle(&self) -> Duration {
        self.manageable_settle
    }

    pub fn reload_count(&self) -> u32 {
        self.reload_count
    }

    /// Bumped by every installed document; views holding per-load state
    /// compare against it.
    pub fn load_generation(&self) -> u64 {
        self.load_generation
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::dom::{Display, Element};
    use crate::fetch::SnapshotTransport;
    use crate::transport::RecordingMutationLog;
    use serde_json::json;

    pub(crate) const API: &str = "http://api.test/";
    pub(crate) const SETTLEMENT: &str = "set1";

    pub(crate) fn document_json() -> Value {
        json!({
            "sheet": {
                "_id": {"$oid": SETTLEMENT},
                "name": "Lantern Hoard",
                "lantern_year": 3,
                "endeavor_tokens": 1,
                "timeline": [{"year": 2}, {"year": 3}]
            },
            "game_assets": {
                "events": {
                    "core_first_day": {"handle": "core_first_day", "name": "First Day", "type": "story_event"},
                    "core_bone_witch": {"handle": "core_bone_witch", "name": "Bone Witch", "type": "story_event"},
                    "core_haunted": {"handle": "core_haunted", "name": "Haunted", "type": "settlement_event"},
                    "core_lion": {"handle": "core_lion", "name": "White Lion", "type": "showdown_event"}
                },
                "showdown_options": ["White Lion", "Screaming Antelope"],
                "nemesis_encounters": ["Butcher"],
                "special_showdown_options": ["Watcher"]
            },
            "user_assets": {
                "survivor_groups": [
                    {"handle": "available", "name": "Available", "survivors": [
                        {"sheet": {"_id": {"$oid": "s1"}, "name": "Allister", "email": "ann@kdm.test", "Survival": 1, "Insanity": 0}},
                        {"sheet": {"_id": {"$oid": "s2"}, "name": "Zach", "email": "bob@kdm.test", "returning_survivor": [2]}}
                    ]},
                    {"handle": "departing", "name": "Departing", "survivors": [
                        {"sheet": {"_id": {"$oid": "s3"}, "name": "Erza", "email": "ann@kdm.test", "departing": true, "hunt_xp": 2}}
                    ]}
                ],
                "survivors": [
                    {"sheet": {"_id": {"$oid": "s1"}, "name": "Allister", "email": "ann@kdm.test"}},
                    {"sheet": {"_id": {"$oid": "s2"}, "name": "Zach", "email": "bob@kdm.test"}}
                ]
            }
        })
    }

    pub(crate) fn session_with(
        document: Value,
        login: &str,
        admin: bool,
    ) -> (SessionContext, RecordingMutationLog, SnapshotTransport) {
        let snapshot = SnapshotTransport::for_document(SETTLEMENT, document);
        let log = RecordingMutationLog::new();
        let mut session = SessionContext::new(
            DocumentFetchService::new(Box::new(snapshot.clone())),
            Box::new(log.clone()),
            Duration::from_millis(1_500),
        );
        session
            .initialize("campaign_summary", login, admin, API, SETTLEMENT)
            .unwrap();
        (session, log, snapshot)
    }

    #[test]
    fn at_session_01_initialize_loads_document_and_year() {
        let (session, log, snapshot) = session_with(document_json(), "ann@kdm.test", false);
        let doc = session.document().unwrap();
        assert_eq!(doc.sheet.name, "Lantern Hoard");
        assert_eq!(session.current_ly(), LanternYear(3));
        assert_eq!(session.view(), "campaign_summary");
        assert!(log.is_empty());
        assert_eq!(snapshot.calls()[0].1, "http://api.test/settlement/get/set1");
    }

    #[test]
    fn at_session_02_install_recomputes_meta() {
        let (session, _, _) = session_with(document_json(), "ann@kdm.test", false);
        let groups = &session.document().unwrap().user_assets.survivor_groups;
        let allister = &groups[0].survivors[0];
        let zach = &groups[0].survivors[1];
        assert!(allister.meta.manageable);
        assert!(!allister.meta.returning_survivor);
        assert!(!zach.meta.manageable);
        assert!(zach.meta.returning_survivor);
    }

    #[test]
    fn at_session_03_failed_load_leaves_no_document() {
        let mut session = SessionContext::new(
            DocumentFetchService::new(Box::new(SnapshotTransport::new())),
            Box::new(RecordingMutationLog::new()),
            Duration::from_millis(1_500),
        );
        session
            .initialize("campaign_summary", "ann@kdm.test", false, API, SETTLEMENT)
            .unwrap();
        assert!(session.document().is_none());
        assert_eq!(session.current_ly(), LanternYear(0));
    }

    #[test]
    fn at_session_04_initialize_rejects_bad_inputs() {
        let mut session = SessionContext::new(
            DocumentFetchService::new(Box::new(SnapshotTransport::new())),
            Box::new(RecordingMutationLog::new()),
            Duration::from_millis(1_500),
        );
        assert!(session.initialize("v", "", false, API, SETTLEMENT).is_err());
        assert!(session.initialize("v", "ann", false, API, "").is_err());
    }

    #[test]
    fn at_session_05_load_survivor_found_and_not_found() {
        let (mut session, _, _) = session_with(document_json(), "ann@kdm.test", false);
        assert_eq!(session.survivor(), &SurvivorLookup::Unloaded);
        let found = session.load_survivor("s2").sheet().map(|s| s.name.clone());
        assert_eq!(found.as_deref(), Some("Zach"));
        assert_eq!(session.load_survivor("nobody"), &SurvivorLookup::NotFound);
        assert_eq!(session.load_survivor(""), &SurvivorLookup::NotFound);
    }

    #[test]
    fn at_session_06_submit_flashes_even_when_transport_fails() {
        let mut session = SessionContext::new(
            DocumentFetchService::new(Box::new(SnapshotTransport::new())),
            Box::new(RecordingMutationLog::always_fail("offline")),
            Duration::from_millis(1_500),
        );
        let id = ObjectId::new("set1").unwrap();
        assert!(session.submit(kdm_contracts::mutation::FormMutation::set_lantern_year(
            &id,
            LanternYear(2)
        )));
        assert_eq!(session.dom.saved_flashes(), 1);
    }

    #[test]
    fn at_session_07_invalid_request_is_not_sent() {
        let (mut session, log, _) = session_with(document_json(), "ann@kdm.test", false);
        let scrubbed = ObjectId::default();
        assert!(!session.submit(kdm_contracts::mutation::ApiMutation::update_attribute(
            &scrubbed, "Survival", 1
        )));
        assert!(log.is_empty());
        assert_eq!(session.dom.saved_flashes(), 0);
    }

    #[test]
    fn at_session_08_reinitialize_refetches() {
        let (mut session, _, snapshot) = session_with(document_json(), "ann@kdm.test", false);
        session.note_departing_survivor();
        session.reinitialize();
        assert_eq!(session.reload_count(), 1);
        assert_eq!(session.load_generation(), 2);
        assert_eq!(session.departing_survivor_count(), 0);
        assert!(session.document().is_some());
        assert_eq!(snapshot.calls().len(), 2);
    }

    #[test]
    fn at_session_09_helpers() {
        assert_eq!(SessionContext::range(3), vec![0, 1, 2]);
        assert!(SessionContext::range(0).is_empty());
        assert!(SessionContext::array_contains(&"Butcher", &["Watcher", "Butcher"][..]));
        assert!(!SessionContext::array_contains(&"Lion", &["Watcher"][..]));

        let (mut session, _, _) = session_with(document_json(), "ann@kdm.test", false);
        session.dom.insert(Element::new("button", "b"));
        session
            .dom
            .insert(Element::new("div", "m").with_display(Display::None));
        assert!(session.register_modal_div("b", "m"));
        assert!(!session.register_modal_div("b", "missing"));
        assert!(session.show_hide("m"));
        assert!(!session.show_hide("missing"));
    }
}
