use std::time::{Duration, Instant};

use crate::auth::AuthProvider;
use crate::clock::Clock;
use crate::core::{Finding, FindingStatus, Overview, SecurityGroup, Tab, User, ViewState};
use crate::source::AuditSource;

pub const DEFAULT_LOAD_DELAY: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Copy)]
pub struct DashboardOptions {
    pub load_delay: Duration,
}

impl Default for DashboardOptions {
    fn default() -> Self {
        Self {
            load_delay: DEFAULT_LOAD_DELAY,
        }
    }
}

#[derive(Debug)]
struct PendingLoad {
    due: Instant,
}

#[derive(Debug)]
enum LoadPhase {
    NotStarted,
    Loading(PendingLoad),
    Settled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOutOutcome {
    SignedOut,
    Failed,
}

/// View state of the dashboard: active tab, loading flag, and the two
/// collections populated by a single deferred load.
///
/// The pending load is owned by the dashboard. It only fires from [`poll`],
/// and dropping the dashboard discards it.
///
/// [`poll`]: Dashboard::poll
pub struct Dashboard {
    source: Box<dyn AuditSource>,
    auth: Box<dyn AuthProvider>,
    clock: Box<dyn Clock>,
    load_delay: Duration,
    view: ViewState,
    phase: LoadPhase,
    findings: Vec<Finding>,
    security_groups: Vec<SecurityGroup>,
    diagnostics: Vec<Diagnostic>,
    signed_out: bool,
}

impl Dashboard {
    pub fn new(
        source: Box<dyn AuditSource>,
        auth: Box<dyn AuthProvider>,
        clock: Box<dyn Clock>,
        options: DashboardOptions,
    ) -> Self {
        Self {
            source,
            auth,
            clock,
            load_delay: options.load_delay,
            view: ViewState::default(),
            phase: LoadPhase::NotStarted,
            findings: Vec::new(),
            security_groups: Vec::new(),
            diagnostics: Vec::new(),
            signed_out: false,
        }
    }

    /// `new` followed by `initialize`.
    pub fn mount(
        source: Box<dyn AuditSource>,
        auth: Box<dyn AuthProvider>,
        clock: Box<dyn Clock>,
        options: DashboardOptions,
    ) -> Self {
        let mut dashboard = Self::new(source, auth, clock, options);
        dashboard.initialize();
        dashboard
    }

    /// Schedules the one-shot load. Later calls do nothing.
    pub fn initialize(&mut self) {
        if !matches!(self.phase, LoadPhase::NotStarted) {
            return;
        }
        let due = self.clock.now() + self.load_delay;
        self.phase = LoadPhase::Loading(PendingLoad { due });
        self.view.is_loading = true;
        tracing::debug!(
            source = self.source.name(),
            delay_ms = self.load_delay.as_millis() as u64,
            "scheduled dashboard load"
        );
    }

    /// Fires the pending load once its deadline has passed. Returns whether
    /// anything changed.
    pub fn poll(&mut self) -> bool {
        let due = match &self.phase {
            LoadPhase::Loading(pending) => pending.due,
            LoadPhase::NotStarted | LoadPhase::Settled => return false,
        };
        if self.clock.now() < due {
            return false;
        }

        self.phase = LoadPhase::Settled;
        match self.source.fetch() {
            Ok(data) => {
                tracing::info!(
                    source = self.source.name(),
                    findings = data.findings.len(),
                    security_groups = data.security_groups.len(),
                    "dashboard data loaded"
                );
                self.findings = data.findings;
                self.security_groups = data.security_groups;
            }
            Err(err) => {
                let detail = format!("{err:#}");
                tracing::error!(source = self.source.name(), error = %detail, "dashboard load failed");
                self.diagnostics.push(Diagnostic {
                    message: format!("Error loading audit data: {detail}"),
                });
            }
        }
        self.view.is_loading = false;
        true
    }

    /// Time left before the pending load fires, if one is pending.
    pub fn remaining(&self) -> Option<Duration> {
        match &self.phase {
            LoadPhase::Loading(pending) => {
                Some(pending.due.saturating_duration_since(self.clock.now()))
            }
            LoadPhase::NotStarted | LoadPhase::Settled => None,
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self.phase, LoadPhase::Settled)
    }

    pub fn select_tab(&mut self, tab: Tab) {
        if self.view.active_tab != tab {
            tracing::debug!(from = %self.view.active_tab, to = %tab, "tab selected");
        }
        self.view.active_tab = tab;
    }

    /// Marks an open finding as resolved. Returns `false` for unknown ids and
    /// findings that are already resolved.
    pub fn resolve_finding(&mut self, id: u32) -> bool {
        let Some(finding) = self.findings.iter_mut().find(|f| f.id == id) else {
            return false;
        };
        if finding.status == FindingStatus::Resolved {
            return false;
        }
        finding.status = FindingStatus::Resolved;
        tracing::info!(finding_id = id, "finding marked resolved");
        true
    }

    /// Signs out through the auth collaborator. A failure is logged and kept
    /// as a diagnostic; the dashboard stays as it was.
    pub fn sign_out(&mut self) -> SignOutOutcome {
        match self.auth.sign_out() {
            Ok(()) => {
                tracing::info!(user = self.auth.user().display_name(), "signed out");
                self.signed_out = true;
                SignOutOutcome::SignedOut
            }
            Err(err) => {
                let detail = format!("{err:#}");
                tracing::error!(error = %detail, "sign-out failed");
                self.diagnostics.push(Diagnostic {
                    message: format!("Error signing out: {detail}"),
                });
                SignOutOutcome::Failed
            }
        }
    }

    /// Drops the dashboard. A load that has not fired yet goes with it: the
    /// pending deadline lives only in this value and nothing else can poll it.
    pub fn teardown(self) {}

    pub fn view(&self) -> ViewState {
        self.view
    }

    pub fn active_tab(&self) -> Tab {
        self.view.active_tab
    }

    pub fn is_loading(&self) -> bool {
        self.view.is_loading
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn security_groups(&self) -> &[SecurityGroup] {
        &self.security_groups
    }

    pub fn overview(&self) -> Overview {
        Overview::from_collections(&self.findings, &self.security_groups)
    }

    pub fn user(&self) -> &User {
        self.auth.user()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn is_signed_out(&self) -> bool {
        self.signed_out
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        if let LoadPhase::Loading(pending) = &self.phase {
            let remaining = pending.due.saturating_duration_since(self.clock.now());
            tracing::debug!(
                remaining_ms = remaining.as_millis() as u64,
                "pending dashboard load discarded"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::core::Severity;
    use crate::source::{AuditData, MockSource};
    use std::cell::Cell;
    use std::rc::Rc;

    struct FakeAuth {
        user: User,
        fail: bool,
        calls: Rc<Cell<usize>>,
    }

    impl AuthProvider for FakeAuth {
        fn user(&self) -> &User {
            &self.user
        }

        fn sign_out(&self) -> anyhow::Result<()> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                Err(anyhow::anyhow!("network unreachable"))
            } else {
                Ok(())
            }
        }
    }

    struct CountingSource {
        fetches: Rc<Cell<usize>>,
    }

    impl AuditSource for CountingSource {
        fn name(&self) -> &str {
            "counting"
        }

        fn fetch(&self) -> anyhow::Result<AuditData> {
            self.fetches.set(self.fetches.get() + 1);
            MockSource.fetch()
        }
    }

    struct FailingSource;

    impl AuditSource for FailingSource {
        fn name(&self) -> &str {
            "failing"
        }

        fn fetch(&self) -> anyhow::Result<AuditData> {
            Err(anyhow::anyhow!("backend unavailable"))
        }
    }

    fn auth(fail: bool) -> (Box<dyn AuthProvider>, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        let auth = FakeAuth {
            user: User::new("auditor", Some("auditor@example.com".to_string())),
            fail,
            calls: calls.clone(),
        };
        (Box::new(auth), calls)
    }

    fn mounted(clock: &ManualClock) -> Dashboard {
        let (auth, _) = auth(false);
        Dashboard::mount(
            Box::new(MockSource),
            auth,
            Box::new(clock.clone()),
            DashboardOptions::default(),
        )
    }

    #[test]
    fn new_dashboard_starts_on_overview_not_loading() {
        let clock = ManualClock::new();
        let (auth, _) = auth(false);
        let d = Dashboard::new(
            Box::new(MockSource),
            auth,
            Box::new(clock),
            DashboardOptions::default(),
        );
        assert_eq!(d.view(), ViewState::default());
        assert!(d.remaining().is_none());
    }

    #[test]
    fn mount_is_loading_with_empty_collections() {
        let clock = ManualClock::new();
        let d = mounted(&clock);
        assert!(d.is_loading());
        assert!(d.findings().is_empty());
        assert!(d.security_groups().is_empty());
        assert_eq!(d.remaining(), Some(DEFAULT_LOAD_DELAY));
    }

    #[test]
    fn load_fires_exactly_at_two_seconds() {
        let clock = ManualClock::new();
        let mut d = mounted(&clock);

        clock.advance(Duration::from_millis(1999));
        assert!(!d.poll());
        assert!(d.is_loading());
        assert!(d.findings().is_empty());

        clock.advance(Duration::from_millis(1));
        assert!(d.poll());
        assert!(!d.is_loading());
        assert_eq!(d.findings().len(), 3);
        assert_eq!(d.security_groups().len(), 3);
        assert!(d.is_settled());
        assert!(!d.poll());
    }

    #[test]
    fn loaded_findings_match_fixed_collection_in_order() {
        let clock = ManualClock::new();
        let mut d = mounted(&clock);
        clock.advance(DEFAULT_LOAD_DELAY);
        d.poll();

        let expected = vec![
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
        ];
        assert_eq!(d.findings(), expected.as_slice());
    }

    #[test]
    fn initialize_twice_schedules_one_load() {
        let clock = ManualClock::new();
        let fetches = Rc::new(Cell::new(0));
        let (auth, _) = auth(false);
        let mut d = Dashboard::mount(
            Box::new(CountingSource {
                fetches: fetches.clone(),
            }),
            auth,
            Box::new(clock.clone()),
            DashboardOptions::default(),
        );
        clock.advance(Duration::from_millis(1500));
        d.initialize();
        assert_eq!(d.remaining(), Some(Duration::from_millis(500)));

        clock.advance(Duration::from_secs(10));
        d.poll();
        d.initialize();
        d.poll();
        assert_eq!(fetches.get(), 1);
        assert!(!d.is_loading());
    }

    #[test]
    fn teardown_before_deadline_never_fetches() {
        let clock = ManualClock::new();
        let fetches = Rc::new(Cell::new(0));
        let (auth, _) = auth(false);
        let d = Dashboard::mount(
            Box::new(CountingSource {
                fetches: fetches.clone(),
            }),
            auth,
            Box::new(clock.clone()),
            DashboardOptions::default(),
        );
        clock.advance(Duration::from_millis(500));
        d.teardown();
        clock.advance(Duration::from_secs(5));
        assert_eq!(fetches.get(), 0);
    }

    #[test]
    fn select_tab_last_selection_wins() {
        let clock = ManualClock::new();
        let mut d = mounted(&clock);
        d.select_tab(Tab::Security);
        d.select_tab(Tab::Findings);
        assert_eq!(d.active_tab(), Tab::Findings);
    }

    #[test]
    fn reselecting_active_tab_changes_nothing() {
        let clock = ManualClock::new();
        let mut d = mounted(&clock);
        d.select_tab(Tab::Reports);
        let before = d.view();
        d.select_tab(Tab::Reports);
        assert_eq!(d.view(), before);
    }

    #[test]
    fn tab_selection_during_pending_load_keeps_loading() {
        let clock = ManualClock::new();
        let mut d = mounted(&clock);
        d.select_tab(Tab::Findings);
        assert!(d.is_loading());
        clock.advance(DEFAULT_LOAD_DELAY);
        d.poll();
        assert_eq!(d.active_tab(), Tab::Findings);
        assert_eq!(d.findings().len(), 3);
    }

    #[test]
    fn failed_sign_out_is_swallowed_and_recorded_once() {
        let clock = ManualClock::new();
        let (auth, calls) = auth(true);
        let mut d = Dashboard::mount(
            Box::new(MockSource),
            auth,
            Box::new(clock.clone()),
            DashboardOptions::default(),
        );
        d.select_tab(Tab::Security);

        assert_eq!(d.sign_out(), SignOutOutcome::Failed);
        assert_eq!(calls.get(), 1);
        assert!(!d.is_signed_out());
        assert_eq!(d.active_tab(), Tab::Security);
        assert_eq!(d.diagnostics().len(), 1);
        assert!(d.diagnostics()[0].message.contains("network unreachable"));
    }

    #[test]
    fn successful_sign_out_ends_session() {
        let clock = ManualClock::new();
        let (auth, calls) = auth(false);
        let mut d = Dashboard::mount(
            Box::new(MockSource),
            auth,
            Box::new(clock),
            DashboardOptions::default(),
        );
        assert_eq!(d.sign_out(), SignOutOutcome::SignedOut);
        assert_eq!(calls.get(), 1);
        assert!(d.is_signed_out());
        assert!(d.diagnostics().is_empty());
    }

    #[test]
    fn resolve_finding_only_changes_open_findings() {
        let clock = ManualClock::new();
        let mut d = mounted(&clock);
        assert!(!d.resolve_finding(1));

        clock.advance(DEFAULT_LOAD_DELAY);
        d.poll();
        assert!(d.resolve_finding(1));
        assert_eq!(d.findings()[0].status, FindingStatus::Resolved);
        assert!(!d.resolve_finding(1));
        assert!(!d.resolve_finding(3));
        assert!(!d.resolve_finding(42));
        assert_eq!(d.overview().resolved, 2);
    }

    #[test]
    fn failed_load_settles_empty_with_diagnostic() {
        let clock = ManualClock::new();
        let (auth, _) = auth(false);
        let mut d = Dashboard::mount(
            Box::new(FailingSource),
            auth,
            Box::new(clock.clone()),
            DashboardOptions::default(),
        );
        clock.advance(DEFAULT_LOAD_DELAY);
        assert!(d.poll());
        assert!(!d.is_loading());
        assert!(d.findings().is_empty());
        assert!(d.security_groups().is_empty());
        assert_eq!(d.diagnostics().len(), 1);
    }

    #[test]
    fn zero_delay_loads_on_first_poll() {
        let clock = ManualClock::new();
        let (auth, _) = auth(false);
        let mut d = Dashboard::mount(
            Box::new(MockSource),
            auth,
            Box::new(clock),
            DashboardOptions {
                load_delay: Duration::ZERO,
            },
        );
        assert!(d.is_loading());
        assert!(d.poll());
        assert_eq!(d.overview().total_findings, 3);
        assert_eq!(d.user().display_name(), "auditor@example.com");
    }
}
