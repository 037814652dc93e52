use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::auth::SessionManager;
use crate::auth::token_store::MemoryTokenStore;
use crate::error::{Error, Result};
use crate::mail::api::MailApi;
use crate::mail::transport::{HttpRequest, HttpResponse, HttpTransport};

/// Replays queued responses in order and records every request it sees.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    replies: Arc<Mutex<VecDeque<Result<HttpResponse>>>>,
    seen: Arc<Mutex<Vec<HttpRequest>>>,
}

impl ScriptedTransport {
    pub fn push(&self, status: u16, body: &str) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Ok(HttpResponse::new(status, body)));
    }

    pub fn push_ok(&self, body: &str) {
        self.push(200, body);
    }

    pub fn push_network_error(&self) {
        self.replies
            .lock()
            .unwrap()
            .push_back(Err(Error::Network("connection refused".into())));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.seen.lock().unwrap().clone()
    }
}

impl HttpTransport for ScriptedTransport {
    fn execute(&self, req: &HttpRequest) -> Result<HttpResponse> {
        self.seen.lock().unwrap().push(req.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("no scripted reply for {req:?}"))
    }
}

pub fn api_with(token: Option<&str>) -> (MailApi, ScriptedTransport) {
    let store = match token {
        Some(t) => MemoryTokenStore::with_token(t),
        None => MemoryTokenStore::new(),
    };
    let transport = ScriptedTransport::default();
    let api = MailApi::new(
        Box::new(transport.clone()),
        SessionManager::new(Box::new(store)),
    );
    (api, transport)
}

pub fn logged_in_api() -> (MailApi, ScriptedTransport) {
    api_with(Some("test-token"))
}

/// `GET /fetch-emails` body with ids `ids`.
pub fn page_json(page: u32, has_more: bool, ids: &[&str]) -> String {
    let emails: Vec<_> = ids
        .iter()
        .map(|id| {
            serde_json::json!({
                "id": id,
                "subject": format!("subject {id}"),
                "sender": "sender@example.com",
                "date": "Mon, 1 Jan 2024 10:00:00 +0000",
            })
        })
        .collect();
    serde_json::json!({
        "emails": emails,
        "pagination": { "page": page, "has_more": has_more },
    })
    .to_string()
}
