use std::io::Read;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use rs_webmail_client::Error;
use rs_webmail_client::auth::token_store::{FileTokenStore, MemoryTokenStore, TokenStore};
use rs_webmail_client::auth::{Credentials, SessionManager};
use rs_webmail_client::compose::{Composer, SubmitOutcome};
use rs_webmail_client::domain::email::ComposeDraft;
use rs_webmail_client::inbox::{InboxLoader, refresh};
use rs_webmail_client::mail::{MailApi, ReqwestTransport};
use rs_webmail_client::render::{ContentMode, Rendered, render};
use tiny_http::{Header, Response, Server};

#[derive(Debug)]
struct Seen {
    method: String,
    url: String,
    authorization: Option<String>,
    body: String,
}

/// Loopback backend answering each request with the next canned reply.
fn backend(replies: Vec<(u16, &'static str)>) -> (String, mpsc::Receiver<Seen>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let base = format!("http://{}", server.server_addr());
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        for (status, body) in replies {
            let Ok(mut request) = server.recv() else {
                return;
            };
            let authorization = request
                .headers()
                .iter()
                .find(|h| h.field.equiv("Authorization"))
                .map(|h| h.value.as_str().to_string());
            let mut req_body = String::new();
            let _ = request.as_reader().read_to_string(&mut req_body);
            let _ = tx.send(Seen {
                method: request.method().to_string(),
                url: request.url().to_string(),
                authorization,
                body: req_body,
            });

            let json = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]).unwrap();
            let _ = request.respond(
                Response::from_string(body)
                    .with_status_code(status)
                    .with_header(json),
            );
        }
    });

    (base, rx)
}

fn api_for(base: &str, store: Box<dyn TokenStore>) -> MailApi {
    let transport = ReqwestTransport::new(base, Duration::from_secs(5)).unwrap();
    MailApi::new(Box::new(transport), SessionManager::new(store))
}

#[test]
fn login_then_list_sends_bearer_token() {
    let (base, seen) = backend(vec![
        (200, r#"{"success":true,"token":"tok-abc"}"#),
        (
            200,
            r#"{"emails":[{"id":"12","subject":"Hello","sender":"a@example.com","date":"Tue"}],
                "pagination":{"total":21,"page":1,"per_page":20,"has_more":true}}"#,
        ),
    ]);
    let dir = tempfile::tempdir().unwrap();
    let api = api_for(
        &base,
        Box::new(FileTokenStore::new(dir.path().join("session.json"))),
    );

    api.authenticate(&Credentials::new("me@example.com", "pw"))
        .unwrap();
    let mut loader = InboxLoader::new(20);
    loader.load_initial(&api).unwrap();

    let login = seen.recv().unwrap();
    assert_eq!(login.method, "POST");
    assert_eq!(login.url, "/login");
    let login_body: serde_json::Value = serde_json::from_str(&login.body).unwrap();
    assert_eq!(login_body["email"], "me@example.com");

    let list = seen.recv().unwrap();
    assert_eq!(list.url, "/fetch-emails?page=1&per_page=20");
    assert_eq!(list.authorization.as_deref(), Some("Bearer tok-abc"));

    assert_eq!(loader.items()[0].subject, "Hello");
    assert!(loader.has_more());

    // a fresh store over the same file still sees the session
    let reopened = FileTokenStore::new(dir.path().join("session.json"));
    assert_eq!(reopened.load().unwrap().as_deref(), Some("tok-abc"));
}

#[test]
fn rejected_token_logs_out() {
    let (base, _seen) = backend(vec![(401, r#"{"error":"Invalid token"}"#)]);
    let api = api_for(&base, Box::new(MemoryTokenStore::with_token("expired")));

    let err = api.get_email("3").unwrap_err();
    assert!(err.requires_login());
    assert!(!api.session().is_authenticated());
}

#[test]
fn detail_is_sanitized_before_display() {
    let (base, seen) = backend(vec![(
        200,
        r#"{"id":"3","subject":"Promo","sender":"shop@example.com","to":"me@example.com",
            "date":"Wed","content":{"text":"","html":"<p onclick=\"x()\">Sale</p><script>steal()</script>"}}"#,
    )]);
    let api = api_for(&base, Box::new(MemoryTokenStore::with_token("t")));

    let detail = api.get_email("3").unwrap();
    assert_eq!(seen.recv().unwrap().url, "/email/3");
    assert_eq!(detail.recipient, "me@example.com");

    match render(&detail.content, ContentMode::Html) {
        Rendered::Markup(m) => {
            assert!(m.contains("Sale"));
            assert!(!m.contains("onclick"));
            assert!(!m.contains("steal"));
        }
        other => panic!("expected markup, got {other:?}"),
    }
    assert!(render(&detail.content, ContentMode::Text).is_placeholder());
}

#[test]
fn refresh_purges_then_reloads() {
    let (base, seen) = backend(vec![
        (200, r#"{"success":true,"message":"Cache refreshed successfully"}"#),
        (200, r#"{"emails":[],"pagination":{"page":1,"has_more":false}}"#),
    ]);
    let api = api_for(&base, Box::new(MemoryTokenStore::with_token("t")));
    let mut loader = InboxLoader::new(20);

    assert_eq!(refresh(&api, &mut loader), Ok(0));
    let purge = seen.recv().unwrap();
    assert_eq!((purge.method.as_str(), purge.url.as_str()), ("POST", "/refresh-cache"));
    assert_eq!(seen.recv().unwrap().method, "GET");
}

#[test]
fn send_failure_surfaces_server_message() {
    let (base, seen) = backend(vec![(500, r#"{"error":"SMTP unavailable"}"#)]);
    let api = api_for(&base, Box::new(MemoryTokenStore::with_token("t")));
    let mut composer = Composer::with_draft(
        ComposeDraft {
            to: "bob@example.com".into(),
            subject: "Hi".into(),
            content: "<b>hello</b>".into(),
            is_html: true,
        },
        Duration::from_millis(10),
    );

    let outcome = composer.submit(&api).unwrap();
    assert_eq!(
        outcome,
        SubmitOutcome::Failed {
            message: "SMTP unavailable".into()
        }
    );
    let sent: serde_json::Value = serde_json::from_str(&seen.recv().unwrap().body).unwrap();
    assert_eq!(sent["isHtml"], true);
    assert_eq!(sent["content"], "<b>hello</b>");
    assert_eq!(composer.draft().subject, "Hi");
}

#[test]
fn slow_backend_times_out_as_network_error() {
    let server = Server::http("127.0.0.1:0").unwrap();
    let base = format!("http://{}", server.server_addr());
    thread::spawn(move || {
        if let Ok(request) = server.recv() {
            thread::sleep(Duration::from_secs(2));
            let _ = request.respond(Response::from_string("{}"));
        }
    });

    let transport = ReqwestTransport::new(&base, Duration::from_millis(300)).unwrap();
    let api = MailApi::new(
        Box::new(transport),
        SessionManager::new(Box::new(MemoryTokenStore::with_token("t"))),
    );
    match api.fetch_emails(1, 20) {
        Err(Error::Network(msg)) => assert!(msg.contains("timed out"), "{msg}"),
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[test]
fn unreachable_backend_is_network_error() {
    let port = {
        let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        probe.local_addr().unwrap().port()
    };
    let api = api_for(
        &format!("http://127.0.0.1:{port}"),
        Box::new(MemoryTokenStore::with_token("t")),
    );
    assert!(matches!(api.purge_cache(), Err(Error::Network(_))));
}
