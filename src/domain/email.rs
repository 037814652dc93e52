use serde::{Deserialize, Serialize};

/// Backend identifier of a message. Opaque; the server currently hands out
/// mailbox sequence numbers as strings.
pub type EmailId = String;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailSummary {
    pub id: EmailId,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub sender: String,
    #[serde(default)]
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailContent {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub html: Option<String>,
}

impl EmailContent {
    /// Plain body, treating an empty string as missing.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref().filter(|s| !s.is_empty())
    }

    /// HTML body, treating an empty string as missing.
    pub fn html(&self) -> Option<&str> {
        self.html.as_deref().filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailDetail {
    pub id: EmailId,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub sender: String,
    #[serde(default, alias = "to")]
    pub recipient: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub content: EmailContent,
}

/// Partial update for `PUT /email/:id`. Absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(rename = "to", skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<EmailContent>,
}

impl EmailPatch {
    pub fn is_empty(&self) -> bool {
        self == &EmailPatch::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub has_more: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
}

/// One decoded `GET /fetch-emails` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailPage {
    #[serde(default)]
    pub emails: Vec<EmailSummary>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComposeDraft {
    pub to: String,
    pub subject: String,
    pub content: String,
    pub is_html: bool,
}

/// Wire body of `POST /send-email`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub content: String,
    #[serde(rename = "isHtml")]
    pub is_html: bool,
}

impl From<&ComposeDraft> for OutgoingEmail {
    fn from(d: &ComposeDraft) -> Self {
        Self {
            to: d.to.trim().to_string(),
            subject: d.subject.clone(),
            content: d.content.clone(),
            is_html: d.is_html,
        }
    }
}
