use crate::domain::email::{EmailPage, EmailSummary};
use crate::error::{Error, Result};
use crate::mail::MailApi;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadPhase {
    #[default]
    Idle,
    LoadingInitial,
    LoadingMore,
    Loaded,
    Errored(String),
}

impl LoadPhase {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadPhase::LoadingInitial | LoadPhase::LoadingMore)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadKind {
    Initial,
    More,
}

/// Handle for one issued page request. Only the ticket of the latest
/// generation may change the loader's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub struct PageTicket {
    generation: u64,
    page: u32,
    kind: LoadKind,
}

impl PageTicket {
    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn kind(&self) -> LoadKind {
        self.kind
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    /// A newer request or a cancel superseded this one; nothing changed.
    Stale,
}

/// Inbox pages accumulated in arrival order.
///
/// The loader does no I/O itself: `begin_*` hands out a ticket, the caller
/// fetches the page, and `complete` applies the result. `load_initial` and
/// `load_more` chain the three for synchronous callers.
#[derive(Debug)]
pub struct InboxLoader {
    phase: LoadPhase,
    items: Vec<EmailSummary>,
    page: u32,
    has_more: bool,
    per_page: u32,
    generation: u64,
    /// Phase to fall back to when an in-flight load is cancelled.
    settled: LoadPhase,
}

impl InboxLoader {
    pub fn new(per_page: u32) -> Self {
        Self {
            phase: LoadPhase::Idle,
            items: Vec::new(),
            page: 0,
            has_more: false,
            per_page: per_page.max(1),
            generation: 0,
            settled: LoadPhase::Idle,
        }
    }

    pub fn phase(&self) -> &LoadPhase {
        &self.phase
    }

    pub fn items(&self) -> &[EmailSummary] {
        &self.items
    }

    /// Highest page loaded since the last reset; 0 before the first success.
    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    /// Starts a page-1 load. Always accepted; any request still in flight
    /// is superseded and its reply will be dropped.
    pub fn begin_initial(&mut self) -> PageTicket {
        if self.phase.is_loading() {
            log::debug!("initial load supersedes generation {}", self.generation);
        } else {
            self.settled = self.phase.clone();
        }
        self.generation += 1;
        self.phase = LoadPhase::LoadingInitial;
        PageTicket {
            generation: self.generation,
            page: 1,
            kind: LoadKind::Initial,
        }
    }

    /// Starts loading the next page. Rejected while any load is in flight
    /// or when the server reported no further pages.
    pub fn begin_more(&mut self) -> Result<PageTicket> {
        if self.phase.is_loading() {
            return Err(Error::LoadInFlight);
        }
        if !self.has_more {
            return Err(Error::NoMorePages);
        }
        let next = self.page.checked_add(1).ok_or(Error::NoMorePages)?;
        self.settled = self.phase.clone();
        self.generation += 1;
        self.phase = LoadPhase::LoadingMore;
        Ok(PageTicket {
            generation: self.generation,
            page: next,
            kind: LoadKind::More,
        })
    }

    /// Applies a fetched page, or the error that prevented it.
    pub fn complete(
        &mut self,
        ticket: PageTicket,
        result: Result<EmailPage>,
    ) -> Result<Completion> {
        if ticket.generation != self.generation || !self.phase.is_loading() {
            log::debug!(
                "dropping stale reply for page {} (generation {} < {})",
                ticket.page,
                ticket.generation,
                self.generation
            );
            return Ok(Completion::Stale);
        }

        match (ticket.kind, result) {
            (LoadKind::Initial, Ok(page)) => {
                self.items = page.emails;
                self.page = page.pagination.page.max(1);
                self.has_more = page.pagination.has_more;
                self.phase = LoadPhase::Loaded;
            }
            (LoadKind::More, Ok(mut page)) => {
                self.items.append(&mut page.emails);
                self.page = page.pagination.page.max(ticket.page);
                self.has_more = page.pagination.has_more;
                self.phase = LoadPhase::Loaded;
            }
            (LoadKind::Initial, Err(e)) => {
                log::warn!("inbox load failed: {e}");
                self.items.clear();
                self.page = 0;
                self.has_more = false;
                self.phase = LoadPhase::Errored(e.to_string());
                return Err(e);
            }
            (LoadKind::More, Err(e)) => {
                log::warn!("loading page {} failed: {e}", ticket.page);
                self.phase = LoadPhase::Errored(e.to_string());
                return Err(e);
            }
        }
        Ok(Completion::Applied)
    }

    /// Abandons whatever is in flight, e.g. when the owning view goes away.
    pub fn cancel(&mut self) {
        if self.phase.is_loading() {
            log::debug!("cancelling inbox load generation {}", self.generation);
            self.generation += 1;
            self.phase = self.settled.clone();
        }
    }

    pub fn load_initial(&mut self, api: &MailApi) -> Result<&[EmailSummary]> {
        let ticket = self.begin_initial();
        let result = api.fetch_emails(ticket.page(), self.per_page);
        self.complete(ticket, result)?;
        Ok(&self.items)
    }

    pub fn load_more(&mut self, api: &MailApi) -> Result<&[EmailSummary]> {
        let ticket = self.begin_more()?;
        let result = api.fetch_emails(ticket.page(), self.per_page);
        self.complete(ticket, result)?;
        Ok(&self.items)
    }
}
