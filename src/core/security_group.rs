use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupStatus {
    Secure,
    Warning,
    Critical,
}

impl GroupStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            GroupStatus::Secure => "secure",
            GroupStatus::Warning => "warning",
            GroupStatus::Critical => "critical",
        }
    }
}

impl fmt::Display for GroupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroup {
    pub id: u32,
    pub name: String,
    /// Number of rules attached to the group.
    pub rules: u32,
    pub status: GroupStatus,
}

impl SecurityGroup {
    pub fn new(id: u32, name: impl Into<String>, rules: u32, status: GroupStatus) -> Self {
        Self {
            id,
            name: name.into(),
            rules,
            status,
        }
    }
}
