use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::auth::session::LoginResponse;
use crate::auth::{Credentials, SessionManager, SessionToken};
use crate::domain::email::{EmailDetail, EmailPage, EmailPatch, OutgoingEmail};
use crate::error::{Error, Result};
use crate::mail::decoders::decode_mime_words;
use crate::mail::transport::{HttpRequest, HttpResponse, HttpTransport, Method};

/// Authenticated gateway to the webmail backend. Every call goes through
/// here: credentials are attached, responses classified, a rejected token
/// ends the session.
pub struct MailApi {
    transport: Box<dyn HttpTransport>,
    session: SessionManager,
}

/// Generic `{success, message|error}` acknowledgement.
#[derive(Debug, Deserialize)]
struct Ack {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl MailApi {
    pub fn new(transport: Box<dyn HttpTransport>, session: SessionManager) -> Self {
        Self { transport, session }
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// `POST /login`. Stores the returned token; a rejection clears any
    /// earlier session.
    pub fn authenticate(&self, credentials: &Credentials) -> Result<SessionToken> {
        log::info!("logging in as {}", credentials.email);
        let body = serde_json::to_value(credentials).map_err(|e| Error::Decode(e.to_string()))?;
        let req = HttpRequest::new(Method::Post, &["login"]).json(body);

        let resp = self.dispatch(req)?;
        match classify(resp, None) {
            Ok(body) => match decode::<LoginResponse>(&body) {
                Ok(reply) => self.session.establish(reply),
                Err(e) => {
                    log::warn!("unreadable login reply: {e}");
                    self.session.reject("Login failed".into())
                }
            },
            Err(Error::Unauthorized(message)) | Err(Error::Client { message: Some(message), .. }) => {
                self.session.reject(message)
            }
            Err(Error::Client { message: None, .. }) => self.session.reject("Login failed".into()),
            Err(e) => Err(e),
        }
    }

    pub fn logout(&self) -> Result<()> {
        self.session.invalidate()
    }

    /// `GET /fetch-emails?page=&per_page=`
    pub fn fetch_emails(&self, page: u32, per_page: u32) -> Result<EmailPage> {
        let req = HttpRequest::new(Method::Get, &["fetch-emails"])
            .query("page", page)
            .query("per_page", per_page);
        let mut page: EmailPage = decode(&self.authed(req, None)?)?;
        for e in &mut page.emails {
            e.sender = decode_mime_words(&e.sender);
        }
        log::debug!(
            "page {} -> {} emails (has_more={})",
            page.pagination.page,
            page.emails.len(),
            page.pagination.has_more
        );
        Ok(page)
    }

    /// `GET /email/:id`
    pub fn get_email(&self, id: &str) -> Result<EmailDetail> {
        let req = HttpRequest::new(Method::Get, &["email", id]);
        let detail: EmailDetail = decode(&self.authed(req, Some(id))?)?;
        Ok(decode_addresses(detail))
    }

    /// `PUT /email/:id` with the fields present in `patch`. Returns the
    /// updated record when the backend echoes one, otherwise re-reads it.
    pub fn update_email(&self, id: &str, patch: &EmailPatch) -> Result<EmailDetail> {
        if patch.is_empty() {
            return Err(Error::Validation("nothing to update".into()));
        }
        let body = serde_json::to_value(patch).map_err(|e| Error::Decode(e.to_string()))?;
        let req = HttpRequest::new(Method::Put, &["email", id]).json(body);
        let body = self.authed(req, Some(id))?;
        match serde_json::from_str::<EmailDetail>(&body) {
            Ok(detail) => Ok(decode_addresses(detail)),
            Err(_) => {
                expect_ack(&body)?;
                self.get_email(id)
            }
        }
    }

    /// `POST /send-email`
    pub fn send_email(&self, email: &OutgoingEmail) -> Result<()> {
        let body = serde_json::to_value(email).map_err(|e| Error::Decode(e.to_string()))?;
        let req = HttpRequest::new(Method::Post, &["send-email"]).json(body);
        let body = self.authed(req, None)?;
        expect_ack(&body)
    }

    /// `POST /refresh-cache`: asks the backend to drop its cached listing.
    /// Treated as idempotent; only the acknowledgement is inspected.
    pub fn purge_cache(&self) -> Result<()> {
        let req = HttpRequest::new(Method::Post, &["refresh-cache"]);
        let body = self.authed(req, None)?;
        expect_ack(&body)
    }

    /// Authenticated call: refuses to touch the network without a token and
    /// drops the session when the server rejects it.
    fn authed(&self, req: HttpRequest, detail_id: Option<&str>) -> Result<String> {
        let token = self.session.require_token()?;
        let resp = self.transport_send(req.bearer(Some(token)))?;
        match classify(resp, detail_id) {
            Err(Error::Unauthorized(message)) => {
                log::warn!("server rejected the session token, logging out");
                if let Err(e) = self.session.invalidate() {
                    log::error!("could not clear rejected session: {e}");
                }
                Err(Error::Unauthorized(message))
            }
            other => other,
        }
    }

    /// Sends with whatever token is stored, or none.
    fn dispatch(&self, req: HttpRequest) -> Result<HttpResponse> {
        let token = self.session.current_token()?;
        self.transport_send(req.bearer(token))
    }

    fn transport_send(&self, req: HttpRequest) -> Result<HttpResponse> {
        let credential = if req.bearer.is_some() { "bearer" } else { "none" };
        match self.transport.execute(&req) {
            Ok(resp) => {
                log::debug!(
                    "{} {} -> {} (credential: {credential})",
                    req.method,
                    req.path(),
                    resp.status
                );
                if req.segments.first().map(String::as_str) != Some("login") {
                    log::trace!("{} body: {}", req.path(), resp.body);
                }
                Ok(resp)
            }
            Err(e) => {
                log::warn!("{} {} failed: {e} (credential: {credential})", req.method, req.path());
                Err(e)
            }
        }
    }
}

/// Maps a response that reached us onto success or the error taxonomy.
fn classify(resp: HttpResponse, detail_id: Option<&str>) -> Result<String> {
    let status = resp.status;
    match status {
        200..=299 => Ok(resp.body),
        401 => Err(Error::Unauthorized(
            server_message(&resp.body).unwrap_or_else(|| "credential rejected".into()),
        )),
        404 if detail_id.is_some() => Err(Error::NotFound(
            detail_id.map(str::to_string).unwrap_or_default(),
        )),
        400..=499 => Err(Error::Client {
            status,
            message: server_message(&resp.body),
        }),
        500..=599 => Err(Error::Server {
            status,
            message: server_message(&resp.body),
        }),
        _ => Err(Error::Decode(format!("unexpected HTTP status {status}"))),
    }
}

fn server_message(body: &str) -> Option<String> {
    let v: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "error"]
        .iter()
        .filter_map(|k| v.get(*k).and_then(|m| m.as_str()))
        .map(str::trim)
        .find(|m| !m.is_empty())
        .map(str::to_string)
}

/// A 2xx reply that still says `success: false` is a rejection.
fn expect_ack(body: &str) -> Result<()> {
    if body.trim().is_empty() {
        return Ok(());
    }
    let ack: Ack = decode(body)?;
    match ack.success {
        Some(false) => Err(Error::Client {
            status: 200,
            message: ack.message.or(ack.error),
        }),
        _ => Ok(()),
    }
}

fn decode_addresses(mut detail: EmailDetail) -> EmailDetail {
    detail.sender = decode_mime_words(&detail.sender);
    detail.recipient = decode_mime_words(&detail.recipient);
    detail
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| Error::Decode(e.to_string()))
}
