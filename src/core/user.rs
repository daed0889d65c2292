use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl User {
    pub fn new(username: impl Into<String>, email: Option<String>) -> Self {
        Self {
            username: username.into(),
            email,
        }
    }

    /// Name shown in the dashboard header: the email when there is one.
    pub fn display_name(&self) -> &str {
        match self.email.as_deref().map(str::trim) {
            Some(email) if !email.is_empty() => email,
            _ => self.username.as_str(),
        }
    }
}
