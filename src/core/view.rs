use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::{Finding, FindingStatus, SecurityGroup, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tab {
    #[default]
    Overview = 0,
    Findings = 1,
    Security = 2,
    Reports = 3,
}

impl Tab {
    pub const ALL: [Tab; 4] = [Tab::Overview, Tab::Findings, Tab::Security, Tab::Reports];

    pub const fn as_str(self) -> &'static str {
        match self {
            Tab::Overview => "overview",
            Tab::Findings => "findings",
            Tab::Security => "security",
            Tab::Reports => "reports",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Tab::Overview => "Overview",
            Tab::Findings => "Findings",
            Tab::Security => "Security Groups",
            Tab::Reports => "Reports",
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn next(self) -> Self {
        match self {
            Tab::Overview => Tab::Findings,
            Tab::Findings => Tab::Security,
            Tab::Security => Tab::Reports,
            Tab::Reports => Tab::Overview,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Tab::Overview => Tab::Reports,
            Tab::Findings => Tab::Overview,
            Tab::Security => Tab::Findings,
            Tab::Reports => Tab::Security,
        }
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "overview" => Ok(Tab::Overview),
            "findings" => Ok(Tab::Findings),
            "security" => Ok(Tab::Security),
            "reports" => Ok(Tab::Reports),
            other => Err(format!(
                "unknown tab: {other} (expected overview|findings|security|reports)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ViewState {
    pub active_tab: Tab,
    pub is_loading: bool,
}

/// Counts shown on the overview panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Overview {
    pub total_findings: usize,
    pub security_groups: usize,
    pub high_severity: usize,
    pub resolved: usize,
}

impl Overview {
    pub fn from_collections(findings: &[Finding], groups: &[SecurityGroup]) -> Self {
        Self {
            total_findings: findings.len(),
            security_groups: groups.len(),
            high_severity: findings
                .iter()
                .filter(|f| f.severity == Severity::High)
                .count(),
            resolved: findings
                .iter()
                .filter(|f| f.status == FindingStatus::Resolved)
                .count(),
        }
    }
}
