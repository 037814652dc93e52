use std::time::Duration;

use crate::domain::email::{ComposeDraft, OutgoingEmail};
use crate::error::{Error, Result};
use crate::mail::MailApi;
use crate::render::{ContentMode, Rendered, render_draft};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComposePhase {
    #[default]
    Editing,
    Sending,
    Sent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Delivered. The view should show a confirmation and leave after
    /// `return_after`.
    Sent { return_after: Duration },
    /// Not delivered; the draft is untouched and may be resubmitted.
    Failed { message: String },
}

/// One compose interaction: a draft plus the single-flight send pipeline.
#[derive(Debug)]
pub struct Composer {
    draft: ComposeDraft,
    phase: ComposePhase,
    confirm_delay: Duration,
}

impl Composer {
    pub fn new(mode: ContentMode, confirm_delay: Duration) -> Self {
        Self {
            draft: ComposeDraft {
                is_html: mode.is_html(),
                ..ComposeDraft::default()
            },
            phase: ComposePhase::Editing,
            confirm_delay,
        }
    }

    pub fn with_draft(draft: ComposeDraft, confirm_delay: Duration) -> Self {
        Self {
            draft,
            phase: ComposePhase::Editing,
            confirm_delay,
        }
    }

    pub fn draft(&self) -> &ComposeDraft {
        &self.draft
    }

    /// Editable draft; `None` once a send is in flight or done.
    pub fn draft_mut(&mut self) -> Option<&mut ComposeDraft> {
        (self.phase == ComposePhase::Editing).then_some(&mut self.draft)
    }

    pub fn phase(&self) -> ComposePhase {
        self.phase
    }

    /// The send affordance should be disabled unless this is true.
    pub fn can_submit(&self) -> bool {
        self.phase == ComposePhase::Editing
    }

    pub fn preview(&self) -> Rendered {
        render_draft(&self.draft)
    }

    /// Validates the draft and moves to `Sending`. Returns the wire body to
    /// post; nothing is sent if this fails.
    pub fn begin_submit(&mut self) -> Result<OutgoingEmail> {
        match self.phase {
            ComposePhase::Sending => return Err(Error::SubmissionInFlight),
            ComposePhase::Sent => return Err(Error::AlreadySent),
            ComposePhase::Editing => {}
        }
        validate(&self.draft)?;
        self.phase = ComposePhase::Sending;
        Ok(OutgoingEmail::from(&self.draft))
    }

    /// Applies the transport result of the send started by `begin_submit`.
    pub fn finish_submit(&mut self, result: Result<()>) -> SubmitOutcome {
        if self.phase != ComposePhase::Sending {
            log::warn!("send result arrived in phase {:?}, ignoring", self.phase);
            return SubmitOutcome::Failed {
                message: "no send in progress".to_string(),
            };
        }
        match result {
            Ok(()) => {
                log::info!("email sent");
                self.draft = ComposeDraft {
                    is_html: self.draft.is_html,
                    ..ComposeDraft::default()
                };
                self.phase = ComposePhase::Sent;
                SubmitOutcome::Sent {
                    return_after: self.confirm_delay,
                }
            }
            Err(e) => {
                log::warn!("sending email failed: {e}");
                self.phase = ComposePhase::Editing;
                SubmitOutcome::Failed {
                    message: e.to_string(),
                }
            }
        }
    }

    /// Validate, send and settle in one go. Local rejections (validation,
    /// a send already running) come back as `Err` without any request.
    pub fn submit(&mut self, api: &MailApi) -> Result<SubmitOutcome> {
        let email = self.begin_submit()?;
        let result = api.send_email(&email);
        Ok(self.finish_submit(result))
    }
}

fn validate(draft: &ComposeDraft) -> Result<()> {
    let missing: Vec<&str> = [
        ("to", &draft.to),
        ("subject", &draft.subject),
        ("content", &draft.content),
    ]
    .into_iter()
    .filter(|(_, v)| v.trim().is_empty())
    .map(|(name, _)| name)
    .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation(format!("required: {}", missing.join(", "))))
    }
}
