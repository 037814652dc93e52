use anyhow::{Result, anyhow, bail};
use clap::{Parser, Subcommand};
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use rs_webmail_client::auth::{Credentials, SessionManager};
use rs_webmail_client::compose::{Composer, SubmitOutcome};
use rs_webmail_client::config::{Config, TokenBackend, load_config};
use rs_webmail_client::domain::email::{ComposeDraft, EmailContent, EmailPatch};
use rs_webmail_client::inbox::loader::PageTicket;
use rs_webmail_client::inbox::{InboxLoader, RefreshError, refresh};
use rs_webmail_client::mail::decoders::preview_line;
use rs_webmail_client::mail::{MailApi, ReqwestTransport};
use rs_webmail_client::render::{ContentMode, Rendered, render, to_terminal_text};

const PASSWORD_ENV: &str = "WEBMAIL_PASSWORD";
const TOKEN_ENV: &str = "WEBMAIL_TOKEN";

#[derive(Parser)]
#[command(name = "rs_webmail_client")]
#[command(about = "Command-line client for the webmail HTTP backend", long_about = None)]
struct Cli {
    /// Keep the session token in memory only, seeded from WEBMAIL_TOKEN.
    /// The configured token backend is never touched.
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and store the session token
    Login {
        /// Account email (defaults to `user_email` from the config)
        #[arg(long)]
        email: Option<String>,
    },

    /// Forget the stored session token
    Logout,

    /// List the inbox, newest first
    Inbox {
        /// How many pages to load
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },

    /// Ask the server to rebuild its inbox cache, then list page 1
    Refresh,

    /// Show one email
    Read {
        id: String,

        /// Show the HTML body instead of the plain one
        #[arg(long)]
        html: bool,

        /// With --html, print the sanitized markup instead of wrapped text
        #[arg(long)]
        raw: bool,

        #[arg(long, default_value_t = 100)]
        width: usize,
    },

    /// Send an email; the body is read from stdin
    Send {
        #[arg(long)]
        to: String,

        #[arg(long)]
        subject: String,

        /// Treat the body as HTML markup
        #[arg(long)]
        html: bool,
    },

    /// Update fields of an existing email
    Edit {
        id: String,

        #[arg(long)]
        to: Option<String>,

        #[arg(long)]
        subject: Option<String>,

        #[arg(long)]
        body: Option<String>,
    },
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let cfg = load_config().map_err(|e| anyhow!("Configuration error: {e}"))?;
    let api = Arc::new(open_api(&cfg, cli.ephemeral)?);

    let result = match cli.cmd {
        Command::Login { email } => login(&api, &cfg, email),
        Command::Logout => {
            api.logout()?;
            println!("Logged out.");
            Ok(())
        }
        Command::Inbox { pages } => show_inbox(&api, &cfg, pages),
        Command::Refresh => {
            let mut loader = InboxLoader::new(cfg.page_size());
            let n = refresh(&api, &mut loader)?;
            println!("Inbox refreshed, {n} emails on page 1.");
            print_listing(&loader);
            Ok(())
        }
        Command::Read {
            id,
            html,
            raw,
            width,
        } => read_email(&api, &id, html, raw, width),
        Command::Send { to, subject, html } => send_email(&api, &cfg, to, subject, html),
        Command::Edit {
            id,
            to,
            subject,
            body,
        } => {
            let patch = EmailPatch {
                recipient: to,
                subject,
                content: body.map(|text| EmailContent {
                    text: Some(text),
                    html: None,
                }),
                ..EmailPatch::default()
            };
            let detail = api.update_email(&id, &patch)?;
            println!("Updated email {}: {}", detail.id, detail.subject);
            Ok(())
        }
    };

    if let Err(e) = &result
        && let Some(lib) = e
            .downcast_ref::<rs_webmail_client::Error>()
            .or_else(|| e.downcast_ref::<RefreshError>().map(RefreshError::source_error))
        && lib.requires_login()
    {
        eprintln!("Not logged in or session expired; run `rs_webmail_client login`.");
    }
    result
}

fn open_api(cfg: &Config, ephemeral: bool) -> Result<MailApi> {
    let store = if ephemeral {
        let memory = Config {
            token_backend: TokenBackend::Memory,
            ..cfg.clone()
        };
        memory.token_store(std::env::var(TOKEN_ENV).ok().as_deref())?
    } else {
        cfg.token_store(None)?
    };
    let transport = ReqwestTransport::new(&cfg.api_base_url, cfg.request_timeout())?;
    Ok(MailApi::new(Box::new(transport), SessionManager::new(store)))
}

fn login(api: &MailApi, cfg: &Config, email: Option<String>) -> Result<()> {
    let email = email
        .or_else(|| cfg.user_email.clone())
        .ok_or_else(|| anyhow!("pass --email or set user_email in the config"))?;

    let password = match std::env::var(PASSWORD_ENV) {
        Ok(p) if !p.is_empty() => p,
        _ => {
            eprintln!("Password for {email} (end with Ctrl-D):");
            let mut secret = String::new();
            std::io::stdin().read_to_string(&mut secret)?;
            secret.trim_end_matches(['\r', '\n']).to_string()
        }
    };

    api.authenticate(&Credentials::new(&email, password))?;
    println!("Logged in as {email}.");
    Ok(())
}

fn show_inbox(api: &Arc<MailApi>, cfg: &Config, pages: u32) -> Result<()> {
    // Ctrl-C tears the listing down: the pending page is abandoned.
    let running = Arc::new(AtomicBool::new(true));
    let r2 = running.clone();
    ctrlc::set_handler(move || {
        r2.store(false, Ordering::SeqCst);
    })?;

    let mut loader = InboxLoader::new(cfg.page_size());
    let ticket = loader.begin_initial();
    if !fetch_cancellable(api, &mut loader, ticket, &running)? {
        println!("Cancelled.");
        return Ok(());
    }

    for _ in 1..pages {
        if !loader.has_more() {
            break;
        }
        let ticket = loader.begin_more()?;
        if !fetch_cancellable(api, &mut loader, ticket, &running)? {
            println!("Cancelled, showing what was loaded.");
            break;
        }
    }

    print_listing(&loader);
    Ok(())
}

/// Runs the page fetch off the main thread so Ctrl-C can cancel the loader
/// while the request is still out. Returns false when cancelled.
fn fetch_cancellable(
    api: &Arc<MailApi>,
    loader: &mut InboxLoader,
    ticket: PageTicket,
    running: &AtomicBool,
) -> Result<bool> {
    let (tx, rx) = mpsc::channel();
    let worker_api = Arc::clone(api);
    let (page, per_page) = (ticket.page(), loader.per_page());
    thread::spawn(move || {
        let _ = tx.send(worker_api.fetch_emails(page, per_page));
    });

    loop {
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(result) => {
                loader.complete(ticket, result)?;
                return Ok(true);
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                if !running.load(Ordering::SeqCst) {
                    loader.cancel();
                    return Ok(false);
                }
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                loader.cancel();
                bail!("page fetch worker exited without a result");
            }
        }
    }
}

fn print_listing(loader: &InboxLoader) {
    if loader.items().is_empty() {
        println!("No emails found");
        return;
    }
    for e in loader.items() {
        println!("{:>6}  {:<31}  {}", e.id, e.date, e.sender);
        println!("        {}", e.subject);
        if let Some(preview) = e.preview.as_deref().and_then(|p| preview_line(p, 100)) {
            println!("        {preview}");
        }
    }
    println!(
        "-- page {}{} --",
        loader.page(),
        if loader.has_more() { ", more available" } else { "" }
    );
}

fn read_email(api: &MailApi, id: &str, html: bool, raw: bool, width: usize) -> Result<()> {
    let detail = api.get_email(id)?;
    let mode = if html {
        ContentMode::Html
    } else {
        ContentMode::Text
    };

    let subject = if detail.subject.is_empty() {
        "No Subject"
    } else {
        detail.subject.as_str()
    };
    println!("Subject: {subject}");
    println!("From:    {}", detail.sender);
    println!("To:      {}", detail.recipient);
    println!("Date:    {}", detail.date);
    println!();

    match render(&detail.content, mode) {
        Rendered::Markup(markup) if !raw => println!("{}", to_terminal_text(&markup, width)),
        other => println!("{other}"),
    }
    Ok(())
}

fn send_email(api: &Arc<MailApi>, cfg: &Config, to: String, subject: String, html: bool) -> Result<()> {
    eprintln!("Message body (end with Ctrl-D):");
    let mut content = String::new();
    std::io::stdin().read_to_string(&mut content)?;

    let mut composer = Composer::with_draft(
        ComposeDraft {
            to,
            subject,
            content,
            is_html: html,
        },
        cfg.confirm_delay(),
    );

    match composer.submit(api)? {
        SubmitOutcome::Sent { return_after } => {
            println!("Email sent successfully.");
            thread::sleep(return_after);
            show_inbox(api, cfg, 1)
        }
        SubmitOutcome::Failed { message } => bail!("Failed to send email: {message}"),
    }
}
