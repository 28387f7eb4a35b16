use serde::Serialize;

/// Everything the external trigger supplies for one run.
///
/// Core components never read the process environment; the caller collects
/// these values and hands them over explicitly.
#[derive(Clone, Default, Serialize)]
pub struct IssueContext {
    pub title: String,
    pub body: String,
    pub number: String,
    pub author: String,
    /// Credential for the oracle. Never serialized or logged.
    #[serde(skip)]
    pub token: Option<String>,
}

impl IssueContext {
    pub fn from_body(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            ..Self::default()
        }
    }
}

impl std::fmt::Debug for IssueContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssueContext")
            .field("title", &self.title)
            .field("number", &self.number)
            .field("author", &self.author)
            .field("body_len", &self.body.len())
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
