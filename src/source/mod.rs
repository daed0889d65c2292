use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::{Finding, FindingStatus, GroupStatus, SecurityGroup, Severity};

/// Both collections as delivered by a single fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditData {
    #[serde(default)]
    pub findings: Vec<Finding>,
    #[serde(default)]
    pub security_groups: Vec<SecurityGroup>,
}

/// Where the dashboard gets its findings and security groups from.
///
/// A fetch returns both collections or fails as a whole.
pub trait AuditSource {
    fn name(&self) -> &str;
    fn fetch(&self) -> Result<AuditData>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MockSource;

impl AuditSource for MockSource {
    fn name(&self) -> &str {
        "mock"
    }

    fn fetch(&self) -> Result<AuditData> {
        Ok(AuditData {
            findings: mock_findings(),
            security_groups: mock_security_groups(),
        })
    }
}

pub fn mock_findings() -> Vec<Finding> {
    vec![
        Finding::new(
            1,
            Severity::High,
            "Public S3 Bucket",
            "S3 bucket is publicly accessible",
            FindingStatus::Open,
        ),
        Finding::new(
            2,
            Severity::Medium,
            "Weak IAM Policy",
            "IAM policy allows excessive permissions",
            FindingStatus::Open,
        ),
        Finding::new(
            3,
            Severity::Low,
            "Unused Security Group",
            "Security group has no attached resources",
            FindingStatus::Resolved,
        ),
    ]
}

pub fn mock_security_groups() -> Vec<SecurityGroup> {
    vec![
        SecurityGroup::new(1, "Web Server SG", 5, GroupStatus::Secure),
        SecurityGroup::new(2, "Database SG", 3, GroupStatus::Warning),
        SecurityGroup::new(3, "Load Balancer SG", 2, GroupStatus::Secure),
    ]
}

/// Reads a previously exported JSON document of findings and security groups.
#[derive(Debug, Clone)]
pub struct SnapshotSource {
    path: PathBuf,
}

impl SnapshotSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl AuditSource for SnapshotSource {
    fn name(&self) -> &str {
        "snapshot"
    }

    fn fetch(&self) -> Result<AuditData> {
        let s = std::fs::read_to_string(&self.path).with_context(|| {
            format!("failed to read snapshot: {}", self.path.display())
        })?;
        let data: AuditData = serde_json::from_str(&s).with_context(|| {
            format!("failed to parse snapshot (JSON): {}", self.path.display())
        })?;
        validate_unique_ids(&data)
            .with_context(|| format!("invalid snapshot: {}", self.path.display()))?;
        Ok(data)
    }
}

fn validate_unique_ids(data: &AuditData) -> Result<()> {
    let mut seen = HashSet::new();
    for f in &data.findings {
        if !seen.insert(f.id) {
            return Err(anyhow!("duplicate finding id: {}", f.id));
        }
    }
    seen.clear();
    for g in &data.security_groups {
        if !seen.insert(g.id) {
            return Err(anyhow!("duplicate security group id: {}", g.id));
        }
    }
    Ok(())
}
