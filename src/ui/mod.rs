use anyhow::Error;
use std::io::{self, Write};
use unicode_width::UnicodeWidthChar;

use crate::core::{Finding, FindingStatus, GroupStatus, Overview, SecurityGroup, Severity, User};

#[derive(Debug, Clone)]
pub struct UiConfig {
    pub color: bool,
    pub stdin_is_tty: bool,
    pub stdout_is_tty: bool,
    pub stderr_is_tty: bool,
    pub max_table_rows: usize,
    pub quiet: bool,
}

pub fn eprintln_error(err: &Error) {
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr, "error:");
    let _ = writeln!(stderr, "  {err}");

    let mut causes = err.chain().skip(1).peekable();
    if causes.peek().is_some() {
        let _ = writeln!(stderr, "caused by:");
        for cause in causes {
            let _ = writeln!(stderr, "  - {cause}");
        }
    }

    let _ = writeln!(stderr, "next:");
    let logs_hint = std::env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .map(|home| crate::logs::logs_hint(std::path::Path::new(&home)))
        .unwrap_or_else(|| "re-run with `--verbose` for debug logs".to_string());
    let _ = writeln!(stderr, "  - {logs_hint}");
    let _ = writeln!(
        stderr,
        "  - see `cloud-auditor --help` for available commands and options"
    );
}

pub fn print_overview(overview: &Overview, user: &User, cfg: &UiConfig) {
    if cfg.quiet {
        return;
    }
    let mut out = io::stdout().lock();
    write_overview(&mut out, overview, user);
}

pub fn print_findings(findings: &[Finding], cfg: &UiConfig) {
    if cfg.quiet {
        return;
    }
    let mut out = io::stdout().lock();
    let rows = cfg.max_table_rows.min(findings.len());
    if findings.len() > rows {
        let _ = writeln!(out, "Security findings ({rows} shown / {} total):", findings.len());
    } else {
        let _ = writeln!(out, "Security findings ({rows}):");
    }
    write_findings_table(&mut out, findings, rows, cfg.color);
}

pub fn print_security_groups(groups: &[SecurityGroup], cfg: &UiConfig) {
    if cfg.quiet {
        return;
    }
    let mut out = io::stdout().lock();
    let rows = cfg.max_table_rows.min(groups.len());
    if groups.len() > rows {
        let _ = writeln!(out, "Security groups ({rows} shown / {} total):", groups.len());
    } else {
        let _ = writeln!(out, "Security groups ({rows}):");
    }
    write_groups_table(&mut out, groups, rows, cfg.color);
}

fn write_overview(out: &mut dyn Write, overview: &Overview, user: &User) {
    let _ = writeln!(out, "Cloud Auditor: signed in as {}", user.display_name());
    let _ = writeln!(out);
    let rows = [
        ("Total Findings", overview.total_findings, "Security issues detected"),
        ("Security Groups", overview.security_groups, "Groups monitored"),
        ("High Severity", overview.high_severity, "Critical issues"),
        ("Resolved", overview.resolved, "Issues fixed"),
    ];
    let label_w = rows
        .iter()
        .map(|(label, _, _)| visible_width_ansi(label))
        .max()
        .unwrap_or(0);
    for (label, n, hint) in rows {
        let _ = writeln!(
            out,
            "{}  {}  {hint}",
            pad_end_display(label, label_w),
            pad_start_display(&n.to_string(), 3)
        );
    }
}

fn write_findings_table(out: &mut dyn Write, findings: &[Finding], rows: usize, color: bool) {
    let label_id = "ID";
    let label_severity = "SEVERITY";
    let label_status = "STATUS";
    let label_title = "TITLE";

    let id_w = findings
        .iter()
        .take(rows)
        .map(|f| f.id.to_string().len())
        .max()
        .unwrap_or(0)
        .max(label_id.len());
    let severity_w = visible_width_ansi(label_severity).max(6);
    let status_w = visible_width_ansi(label_status).max(8);
    let title_w = visible_width_ansi(label_title).max(5);

    let _ = writeln!(
        out,
        "{}  {}  {}  {}",
        pad_start_display(label_id, id_w),
        pad_end_display(label_severity, severity_w),
        pad_end_display(label_status, status_w),
        label_title
    );
    let _ = writeln!(
        out,
        "{}  {}  {}  {}",
        "-".repeat(id_w),
        "-".repeat(severity_w),
        "-".repeat(status_w),
        "-".repeat(title_w)
    );

    for finding in findings.iter().take(rows) {
        let id = pad_start_display(&finding.id.to_string(), id_w);
        let severity = pad_end_ansi(&format_severity(finding.severity, color), severity_w);
        let status = pad_end_display(finding.status.as_str(), status_w);
        let _ = writeln!(
            out,
            "{id}  {severity}  {status}  {} ({})",
            finding.title,
            truncate_middle(&finding.description, 60)
        );
    }
}

fn write_groups_table(out: &mut dyn Write, groups: &[SecurityGroup], rows: usize, color: bool) {
    let label_id = "ID";
    let label_name = "NAME";
    let label_rules = "RULES";
    let label_status = "STATUS";

    let id_w = groups
        .iter()
        .take(rows)
        .map(|g| g.id.to_string().len())
        .max()
        .unwrap_or(0)
        .max(label_id.len());
    let name_w = groups
        .iter()
        .take(rows)
        .map(|g| visible_width_ansi(&g.name))
        .max()
        .unwrap_or(0)
        .max(label_name.len());
    let rules_w = label_rules.len();

    let _ = writeln!(
        out,
        "{}  {}  {}  {}",
        pad_start_display(label_id, id_w),
        pad_end_display(label_name, name_w),
        pad_start_display(label_rules, rules_w),
        label_status
    );
    let _ = writeln!(
        out,
        "{}  {}  {}  {}",
        "-".repeat(id_w),
        "-".repeat(name_w),
        "-".repeat(rules_w),
        "-".repeat(label_status.len())
    );

    for group in groups.iter().take(rows) {
        let _ = writeln!(
            out,
            "{}  {}  {}  {}",
            pad_start_display(&group.id.to_string(), id_w),
            pad_end_display(&group.name, name_w),
            pad_start_display(&group.rules.to_string(), rules_w),
            format_group_status(group.status, color)
        );
    }
}

fn format_severity(severity: Severity, color: bool) -> String {
    let s = severity.as_str();
    if !color {
        return s.to_string();
    }

    let code = match severity {
        Severity::High => "31",
        Severity::Medium => "33",
        Severity::Low => "32",
    };
    format!("\x1b[{code}m{s}\x1b[0m")
}

fn format_group_status(status: GroupStatus, color: bool) -> String {
    let s = status.as_str();
    if !color {
        return s.to_string();
    }

    let code = match status {
        GroupStatus::Secure => "32",
        GroupStatus::Warning => "33",
        GroupStatus::Critical => "31",
    };
    format!("\x1b[{code}m{s}\x1b[0m")
}

pub fn finding_status_label(status: FindingStatus) -> &'static str {
    match status {
        FindingStatus::Open => "OPEN",
        FindingStatus::Resolved => "RESOLVED",
    }
}

fn truncate_middle(s: &str, max_chars: usize) -> String {
    let len = s.chars().count();
    if len <= max_chars {
        return s.to_string();
    }

    let keep = max_chars.saturating_sub(3);
    let left = keep / 2;
    let right = keep.saturating_sub(left);

    let prefix: String = s.chars().take(left).collect();
    let suffix: String = s
        .chars()
        .skip(len.saturating_sub(right))
        .collect();

    format!("{prefix}...{suffix}")
}

fn pad_end_ansi(s: &str, width: usize) -> String {
    let w = visible_width_ansi(s);
    if w >= width {
        return s.to_string();
    }
    format!("{s}{}", " ".repeat(width - w))
}

fn pad_end_display(s: &str, width: usize) -> String {
    let w = visible_width_ansi(s);
    if w >= width {
        return s.to_string();
    }
    format!("{s}{}", " ".repeat(width - w))
}

fn pad_start_display(s: &str, width: usize) -> String {
    let w = visible_width_ansi(s);
    if w >= width {
        return s.to_string();
    }
    format!("{}{}", " ".repeat(width - w), s)
}

fn visible_width_ansi(s: &str) -> usize {
    let mut width: usize = 0;
    let mut chars = s.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\x1b' && chars.peek() == Some(&'[') {
            let _ = chars.next();
            for ch2 in chars.by_ref() {
                if ch2 == 'm' {
                    break;
                }
            }
            continue;
        }
        width = width.saturating_add(UnicodeWidthChar::width(ch).unwrap_or(0));
    }
    width
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{mock_findings, mock_security_groups};

    fn render(f: impl FnOnce(&mut Vec<u8>)) -> String {
        let mut buf = Vec::new();
        f(&mut buf);
        String::from_utf8(buf).expect("utf8")
    }

    #[test]
    fn visible_width_ignores_ansi_sequences() {
        assert_eq!(visible_width_ansi(&format_severity(Severity::High, true)), 4);
        assert_eq!(visible_width_ansi("セキュリティ"), 12);
    }

    #[test]
    fn truncate_middle_keeps_both_ends() {
        assert_eq!(truncate_middle("abcdefghij", 7), "ab...ij");
        assert_eq!(truncate_middle("short", 7), "short");
    }

    #[test]
    fn findings_table_lists_rows_in_order_without_color() {
        let findings = mock_findings();
        let s = render(|out| write_findings_table(out, &findings, findings.len(), false));
        let lines: Vec<&str> = s.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].contains("SEVERITY"));
        assert!(lines[2].contains("high") && lines[2].contains("Public S3 Bucket"));
        assert!(lines[3].contains("medium") && lines[3].contains("Weak IAM Policy"));
        assert!(lines[4].contains("resolved") && lines[4].contains("Unused Security Group"));
        assert!(!s.contains('\x1b'));
    }

    #[test]
    fn findings_table_respects_row_limit() {
        let findings = mock_findings();
        let s = render(|out| write_findings_table(out, &findings, 1, false));
        assert_eq!(s.lines().count(), 3);
    }

    #[test]
    fn groups_table_shows_rule_counts_and_status() {
        let groups = mock_security_groups();
        let s = render(|out| write_groups_table(out, &groups, groups.len(), false));
        let db = s
            .lines()
            .find(|l| l.contains("Database SG"))
            .expect("database row");
        assert!(db.contains(" 3 "));
        assert!(db.ends_with("warning"));
    }

    #[test]
    fn overview_uses_display_name() {
        let overview = Overview::from_collections(&mock_findings(), &mock_security_groups());
        let user = User::new("ops", Some("ops@example.com".to_string()));
        let s = render(|out| write_overview(out, &overview, &user));
        assert!(s.starts_with("Cloud Auditor: signed in as ops@example.com"));
        let high = s.lines().find(|l| l.starts_with("High Severity")).expect("row");
        assert!(high.contains("  1  "));
    }
}
