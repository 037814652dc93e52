use std::fmt;
use std::time::Duration;

use reqwest::blocking::Client;
use url::Url;

use crate::auth::SessionToken;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
        })
    }
}

/// Backend-agnostic request. Path segments are percent-encoded by the
/// transport, so ids can be passed verbatim.
#[derive(Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub segments: Vec<String>,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    pub bearer: Option<SessionToken>,
}

impl HttpRequest {
    pub fn new(method: Method, segments: &[&str]) -> Self {
        Self {
            method,
            segments: segments.iter().map(|s| s.to_string()).collect(),
            query: Vec::new(),
            body: None,
            bearer: None,
        }
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn bearer(mut self, token: Option<SessionToken>) -> Self {
        self.bearer = token;
        self
    }

    /// `/a/b` form, for logs.
    pub fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }
}

// Bodies may carry a password, so only their presence is shown.
impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("path", &self.path())
            .field("query", &self.query)
            .field("has_body", &self.body.is_some())
            .field("has_bearer", &self.bearer.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// One network round trip. Only `Error::Network` is expected back: any
/// response that reached us, whatever its status, is an `Ok`.
pub trait HttpTransport: Send + Sync {
    fn execute(&self, req: &HttpRequest) -> Result<HttpResponse>;
}

pub struct ReqwestTransport {
    client: Client,
    base: Url,
}

impl ReqwestTransport {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| Error::Network(format!("invalid API base URL '{base_url}': {e}")))?;
        if base.cannot_be_a_base() {
            return Err(Error::Network(format!(
                "API base URL '{base_url}' cannot carry a path"
            )));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;
        Ok(Self { client, base })
    }

    fn url_for(&self, req: &HttpRequest) -> Result<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Network("API base URL cannot carry a path".into()))?
            .pop_if_empty()
            .extend(&req.segments);
        if !req.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&req.query);
        }
        Ok(url)
    }
}

impl HttpTransport for ReqwestTransport {
    fn execute(&self, req: &HttpRequest) -> Result<HttpResponse> {
        let url = self.url_for(req)?;
        let mut rb = match req.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
            Method::Put => self.client.put(url),
        };
        if let Some(token) = &req.bearer {
            rb = rb.bearer_auth(token.expose());
        }
        if let Some(body) = &req.body {
            rb = rb.json(body);
        }

        let resp = rb.send().map_err(|e| network_error(req, &e))?;
        let status = resp.status().as_u16();
        let body = resp.text().map_err(|e| network_error(req, &e))?;
        Ok(HttpResponse { status, body })
    }
}

fn network_error(req: &HttpRequest, e: &reqwest::Error) -> Error {
    let what = if e.is_timeout() {
        "request timed out".to_string()
    } else if e.is_connect() {
        "could not reach the server".to_string()
    } else {
        e.to_string()
    };
    Error::Network(format!("{} {}: {what}", req.method, req.path()))
}
