#![forbid(unsafe_code)]

use std::cell::RefCell;
use std::rc::Rc;

use kdm_contracts::mutation::{MutationRequest, FORM_CONTENT_TYPE};
use tracing::debug;
use url::Url;

use crate::config::ClientConfig;
use crate::fetch::{build_agent, classify_transport_error_kind, endpoint, FetchError};

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("invalid mutation target: {0}")]
    Target(#[from] FetchError),
    #[error("mutation rejected with http status {code}")]
    Status { code: u16 },
    #[error("{kind} transport error while posting mutation")]
    Transport { kind: &'static str },
    #[error("{0}")]
    Simulated(String),
}

/// Where every write goes. Calls are fire-and-forget: the caller has already
/// applied the change locally and only logs a failure. Retry or ack handling
/// belongs behind this trait.
pub trait MutationLog {
    fn submit(&mut self, request: &MutationRequest) -> Result<(), TransportError>;
}

/// Posts form mutations to the webapp root and JSON mutations to the API.
pub struct HttpMutationLog {
    agent: ureq::Agent,
    webapp_url: String,
    api_url: String,
    bearer_token: Option<String>,
}

impl HttpMutationLog {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            agent: build_agent(config),
            webapp_url: config.webapp_url.clone(),
            api_url: config.api_url.clone(),
            bearer_token: config.bearer_token.clone(),
        }
    }

    fn post_form(&self, body: &str) -> Result<(), TransportError> {
        let url = endpoint(&self.webapp_url, "")?;
        let resp = self
            .agent
            .post(url.as_str())
            .set("Content-Type", FORM_CONTENT_TYPE)
            .send_string(body);
        settle(&url, resp)
    }

    fn post_json(&self, path: &str, body: &serde_json::Value) -> Result<(), TransportError> {
        let url = endpoint(&self.api_url, path)?;
        let mut req = self
            .agent
            .post(url.as_str())
            .set("Content-Type", "application/json");
        if let Some(token) = self.bearer_token.as_ref() {
            req = req.set("Authorization", &format!("Bearer {token}"));
        }
        settle(&url, req.send_json(body.clone()))
    }
}

impl MutationLog for HttpMutationLog {
    fn submit(&mut self, request: &MutationRequest) -> Result<(), TransportError> {
        match request {
            MutationRequest::Form(m) => self.post_form(&m.encode_body()),
            MutationRequest::Preferences(m) => self.post_form(&m.encode_body()),
            MutationRequest::Api(m) => self.post_json(&m.path(), &m.body),
        }
    }
}

/// The response body is never read; only the status matters for logging.
fn settle(url: &Url, resp: Result<ureq::Response, ureq::Error>) -> Result<(), TransportError> {
    match resp {
        Ok(resp) => {
            debug!(status = resp.status(), %url, "mutation posted");
            Ok(())
        }
        Err(ureq::Error::Status(code, _)) => Err(TransportError::Status { code }),
        Err(ureq::Error::Transport(t)) => Err(TransportError::Transport {
            kind: classify_transport_error_kind(&format!("{:?} {}", t.kind(), t)),
        }),
    }
}

/// Keeps submitted mutations in memory. Clones share the same journal, so a
/// caller can hand one clone to a session and inspect the other.
#[derive(Debug, Clone, Default)]
pub struct RecordingMutationLog {
    journal: Rc<RefCell<Vec<MutationRequest>>>,
    fail_with: Option<String>,
}

impl RecordingMutationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records every request, then reports it as failed.
    pub fn always_fail(message: &str) -> Self {
        Self {
            journal: Rc::default(),
            fail_with: Some(message.to_string()),
        }
    }

    pub fn entries(&self) -> Vec<MutationRequest> {
        self.journal.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.journal.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.journal.borrow().is_empty()
    }

    /// Encoded form bodies in submission order; JSON mutations render as
    /// `POST {path} {body}`.
    pub fn wire_lines(&self) -> Vec<String> {
        self.journal
            .borrow()
            .iter()
            .map(|m| match m {
                MutationRequest::Form(f) => f.encode_body(),
                MutationRequest::Preferences(p) => p.encode_body(),
                MutationRequest::Api(a) => format!("POST {} {}", a.path(), a.body),
            })
            .collect()
    }
}

impl MutationLog for RecordingMutationLog {
    fn submit(&mut self, request: &MutationRequest) -> Result<(), TransportError> {
        self.journal.borrow_mut().push(request.clone());
        match &self.fail_with {
            Some(message) => Err(TransportError::Simulated(message.clone())),
            None => Ok(()),
        }
    }
}
