#![forbid(unsafe_code)]

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

use kdm_contracts::event_log::EventLogLine;
use kdm_contracts::settlement::SettlementDocument;
use kdm_contracts::{ContractViolation, ObjectId, Validate};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::config::ClientConfig;

pub const ROUTE_DEFAULT: &str = "get";
pub const ROUTE_EVENT_LOG: &str = "event_log";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMethod {
    Get,
    Post,
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("invalid request: {0}")]
    Contract(#[from] ContractViolation),
    #[error("invalid url {url}: {reason}")]
    Url { url: String, reason: String },
    #[error("http status {code} from {url}")]
    Status { code: u16, url: String },
    #[error("{kind} transport error for {url}")]
    Transport { kind: &'static str, url: String },
    #[error("response from {url} did not decode: {reason}")]
    Decode { url: String, reason: String },
}

/// Single-shot JSON request. No retry, no backoff.
pub trait JsonTransport {
    fn request_json(&self, method: FetchMethod, url: &Url) -> Result<Value, FetchError>;
}

/// Reads settlement views and the new-settlement catalog from the API.
pub struct DocumentFetchService {
    transport: Box<dyn JsonTransport>,
}

impl DocumentFetchService {
    pub fn new(transport: Box<dyn JsonTransport>) -> Self {
        Self { transport }
    }

    pub fn http(config: &ClientConfig) -> Self {
        Self::new(Box::new(UreqJsonTransport::new(config)))
    }

    /// `POST {api_base}settlement/{route}/{id}`, decoded into whatever shape
    /// that route serves.
    pub fn fetch_route<T: DeserializeOwned>(
        &self,
        api_base: &str,
        route: &str,
        settlement_id: &ObjectId,
    ) -> Result<T, FetchError> {
        validate_route(route)?;
        settlement_id.validate()?;
        let url = endpoint(
            api_base,
            &format!("settlement/{route}/{}", settlement_id.as_str()),
        )?;
        let raw = self.transport.request_json(FetchMethod::Post, &url)?;
        decode(&url, raw)
    }

    pub fn fetch_settlement(
        &self,
        api_base: &str,
        route: &str,
        settlement_id: &ObjectId,
    ) -> Result<SettlementDocument, FetchError> {
        self.fetch_route(api_base, route, settlement_id)
    }

    pub fn fetch_event_log(
        &self,
        api_base: &str,
        settlement_id: &ObjectId,
    ) -> Result<Vec<EventLogLine>, FetchError> {
        self.fetch_route(api_base, ROUTE_EVENT_LOG, settlement_id)
    }

    /// `GET {api_base}new_settlement`. The catalog is passed through as-is.
    pub fn fetch_new_settlement_assets(&self, api_base: &str) -> Result<Value, FetchError> {
        let url = endpoint(api_base, "new_settlement")?;
        self.transport.request_json(FetchMethod::Get, &url)
    }
}

fn validate_route(route: &str) -> Result<(), ContractViolation> {
    if route.is_empty()
        || !route
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(ContractViolation::InvalidValue {
            field: "fetch.route",
            reason: "must be non-empty [a-z0-9_]",
        });
    }
    Ok(())
}

pub fn endpoint(base: &str, path: &str) -> Result<Url, FetchError> {
    let base_url = Url::parse(base).map_err(|e| FetchError::Url {
        url: base.to_string(),
        reason: e.to_string(),
    })?;
    base_url.join(path).map_err(|e| FetchError::Url {
        url: format!("{base}{path}"),
        reason: e.to_string(),
    })
}

fn decode<T: DeserializeOwned>(url: &Url, raw: Value) -> Result<T, FetchError> {
    serde_json::from_value(raw).map_err(|e| FetchError::Decode {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

pub struct UreqJsonTransport {
    agent: ureq::Agent,
    bearer_token: Option<String>,
}

impl UreqJsonTransport {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            agent: build_agent(config),
            bearer_token: config.bearer_token.clone(),
        }
    }
}

impl JsonTransport for UreqJsonTransport {
    fn request_json(&self, method: FetchMethod, url: &Url) -> Result<Value, FetchError> {
        let mut req = match method {
            FetchMethod::Get => self.agent.get(url.as_str()),
            FetchMethod::Post => self.agent.post(url.as_str()),
        }
        .set("Accept", "application/json");
        if let Some(token) = self.bearer_token.as_ref() {
            req = req.set("Authorization", &format!("Bearer {token}"));
        }
        let resp = req.call().map_err(|e| fetch_error_from_ureq(url, e))?;
        resp.into_json::<Value>().map_err(|e| FetchError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Serves canned JSON by endpoint path suffix (`settlement/get/{id}`,
/// `settlement/event_log/{id}`, `new_settlement`). Unknown paths answer 404.
/// Clones share the call journal.
#[derive(Debug, Clone, Default)]
pub struct SnapshotTransport {
    replies: BTreeMap<String, Value>,
    calls: Rc<RefCell<Vec<(FetchMethod, String)>>>,
}

impl SnapshotTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(mut self, path: &str, body: Value) -> Self {
        self.replies
            .insert(path.trim_start_matches('/').to_string(), body);
        self
    }

    /// Same document for every settlement route of `settlement_id`, with an
    /// empty event log.
    pub fn for_document(settlement_id: &str, document: Value) -> Self {
        Self::new()
            .with_reply(&format!("settlement/{ROUTE_DEFAULT}/{settlement_id}"), document)
            .with_reply(
                &format!("settlement/{ROUTE_EVENT_LOG}/{settlement_id}"),
                Value::Array(Vec::new()),
            )
    }

    pub fn calls(&self) -> Vec<(FetchMethod, String)> {
        self.calls.borrow().clone()
    }
}

impl JsonTransport for SnapshotTransport {
    fn request_json(&self, method: FetchMethod, url: &Url) -> Result<Value, FetchError> {
        self.calls.borrow_mut().push((method, url.to_string()));
        self.replies
            .iter()
            .find(|(path, _)| url.path().ends_with(path.as_str()))
            .map(|(_, body)| body.clone())
            .ok_or_else(|| FetchError::Status {
                code: 404,
                url: url.to_string(),
            })
    }
}

pub(crate) fn build_agent(config: &ClientConfig) -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout_connect(Duration::from_millis(config.connect_timeout_ms.max(100)))
        .timeout_read(Duration::from_millis(config.request_timeout_ms.max(100)))
        .timeout_write(Duration::from_millis(config.request_timeout_ms.max(100)))
        .user_agent(concat!("kdm-client/", env!("CARGO_PKG_VERSION")))
        .build()
}

fn fetch_error_from_ureq(url: &Url, err: ureq::Error) -> FetchError {
    match err {
        ureq::Error::Status(code, _) => FetchError::Status {
            code,
            url: url.to_string(),
        },
        ureq::Error::Transport(transport) => FetchError::Transport {
            kind: classify_transport_error_kind(&format!("{:?} {}", transport.kind(), transport)),
            url: url.to_string(),
        },
    }
}

pub(crate) fn classify_transport_error_kind(raw: &str) -> &'static str {
    let lower = raw.to_ascii_lowercase();
    if lower.contains("timeout") || lower.contains("timed out") {
        "timeout"
    } else if lower.contains("tls") || lower.contains("ssl") {
        "tls"
    } else if lower.contains("dns") {
        "dns"
    } else if lower.contains("connection") || lower.contains("connect") {
        "connection"
    } else {
        "transport"
    }
}
