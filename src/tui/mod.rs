use std::io;
use std::panic;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Tabs, Wrap};

use crate::controller::{Dashboard, SignOutOutcome};
use crate::core::{Finding, FindingStatus, GroupStatus, SecurityGroup, Severity, Tab};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Quit,
    SignedOut,
}

/// Runs the interactive dashboard until it is closed.
///
/// Terminal setup and terminal I/O failures are classified as environment
/// errors (exit code 2).
pub fn run(dashboard: Dashboard, color: bool, initial_tab: Option<Tab>) -> Result<ExitReason> {
    let mut tui = setup_terminal().map_err(crate::exit::invalid_args_err)?;
    tui.terminal.clear().ok();

    let res = panic::catch_unwind(panic::AssertUnwindSafe(|| {
        let mut app = App::new(dashboard, color);
        if let Some(tab) = initial_tab {
            app.dashboard.select_tab(tab);
        }
        run_app(&mut tui.terminal, &mut app)
    }));

    let _ = tui.terminal.show_cursor();
    let _ = disable_raw_mode();
    let mut stdout = io::stdout();
    let _ = execute!(stdout, LeaveAlternateScreen);

    match res {
        Ok(res) => res.map_err(crate::exit::invalid_args_err),
        Err(_) => Err(anyhow::anyhow!(
            "the dashboard panicked (terminal state should have been restored)"
        )),
    }
}

struct Tui {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

fn setup_terminal() -> Result<Tui> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    if let Err(err) = execute!(stdout, EnterAlternateScreen) {
        let _ = disable_raw_mode();
        return Err(err).context("failed to enter alternate screen");
    }
    match Terminal::new(CrosstermBackend::new(stdout)) {
        Ok(terminal) => Ok(Tui { terminal }),
        Err(err) => {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
            Err(err).context("failed to initialise terminal")
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Dashboard,
    Help,
}

struct App {
    dashboard: Dashboard,
    color: bool,
    screen: Screen,
    findings_state: ListState,
    groups_state: ListState,
    exit: Option<ExitReason>,
    tick: u64,
}

impl App {
    fn new(dashboard: Dashboard, color: bool) -> Self {
        let mut findings_state = ListState::default();
        findings_state.select(Some(0));

        let mut groups_state = ListState::default();
        groups_state.select(Some(0));

        Self {
            dashboard,
            color,
            screen: Screen::Dashboard,
            findings_state,
            groups_state,
            exit: None,
            tick: 0,
        }
    }

    fn move_list_selection(state: &mut ListState, len: usize, delta: i32) {
        if len == 0 {
            state.select(None);
            return;
        }
        let selected = state.selected().unwrap_or(0) as i32;
        let next = (selected + delta).clamp(0, (len as i32).saturating_sub(1));
        state.select(Some(next as usize));
    }

    fn selected_finding(&self) -> Option<&Finding> {
        let idx = self.findings_state.selected()?;
        self.dashboard.findings().get(idx)
    }
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<ExitReason> {
    let tick_rate = Duration::from_millis(200);
    let mut last_tick = Instant::now();

    loop {
        if app.dashboard.poll() {
            let findings = app.dashboard.findings().len();
            let groups = app.dashboard.security_groups().len();
            App::move_list_selection(&mut app.findings_state, findings, 0);
            App::move_list_selection(&mut app.groups_state, groups, 0);
        }

        terminal.draw(|f| draw(f, app)).context("failed to draw")?;

        if let Some(reason) = app.exit {
            return Ok(reason);
        }

        let mut timeout = tick_rate.saturating_sub(last_tick.elapsed());
        if let Some(remaining) = app.dashboard.remaining() {
            timeout = timeout.min(remaining);
        }
        if event::poll(timeout).context("failed to poll terminal events")? {
            match event::read().context("failed to read terminal event")? {
                Event::Key(key) => {
                    if key.kind == KeyEventKind::Press && handle_key(app, key) {
                        app.exit.get_or_insert(ExitReason::Quit);
                    }
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }

        if last_tick.elapsed() >= tick_rate {
            app.tick = app.tick.wrapping_add(1);
            last_tick = Instant::now();
        }
    }
}

/// Returns `true` when the dashboard should close.
fn handle_key(app: &mut App, key: KeyEvent) -> bool {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return true;
    }

    if app.screen == Screen::Help {
        match key.code {
            KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('b') => {
                app.screen = Screen::Dashboard;
            }
            KeyCode::Char('q') => return true,
            _ => {}
        }
        return false;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return true,
        KeyCode::Char('?') => app.screen = Screen::Help,
        KeyCode::Tab | KeyCode::Right | KeyCode::Char('l') => {
            let next = app.dashboard.active_tab().next();
            app.dashboard.select_tab(next);
        }
        KeyCode::BackTab | KeyCode::Left | KeyCode::Char('h') => {
            let prev = app.dashboard.active_tab().prev();
            app.dashboard.select_tab(prev);
        }
        KeyCode::Char(c @ '1'..='4') => {
            let idx = (c as usize) - ('1' as usize);
            app.dashboard.select_tab(Tab::ALL[idx]);
        }
        KeyCode::Down | KeyCode::Char('j') => move_selection(app, 1),
        KeyCode::Up | KeyCode::Char('k') => move_selection(app, -1),
        KeyCode::Char('r') => {
            if app.dashboard.active_tab() == Tab::Findings {
                if let Some(id) = app.selected_finding().map(|f| f.id) {
                    app.dashboard.resolve_finding(id);
                }
            }
        }
        KeyCode::Char('s') => {
            if app.dashboard.sign_out() == SignOutOutcome::SignedOut {
                app.exit = Some(ExitReason::SignedOut);
            }
        }
        _ => {}
    }
    false
}

fn move_selection(app: &mut App, delta: i32) {
    match app.dashboard.active_tab() {
        Tab::Findings => {
            let len = app.dashboard.findings().len();
            App::move_list_selection(&mut app.findings_state, len, delta);
        }
        Tab::Security => {
            let len = app.dashboard.security_groups().len();
            App::move_list_selection(&mut app.groups_state, len, delta);
        }
        Tab::Overview | Tab::Reports => {}
    }
}

fn panel_title(tab: Tab) -> &'static str {
    match tab {
        Tab::Overview => "Dashboard Overview",
        Tab::Findings => "Security Findings",
        Tab::Security => "Security Group Inventory",
        Tab::Reports => "Compliance Reports",
    }
}

fn draw(f: &mut ratatui::Frame, app: &mut App) {
    let size = f.size();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(2),
        ])
        .split(size);

    draw_header(f, chunks[0], app);
    draw_tabs(f, chunks[1], app);
    draw_footer(f, chunks[3], app);

    match app.dashboard.active_tab() {
        Tab::Overview => draw_overview(f, chunks[2], app),
        Tab::Findings => draw_findings(f, chunks[2], app),
        Tab::Security => draw_security_groups(f, chunks[2], app),
        Tab::Reports => draw_reports(f, chunks[2]),
    }

    if app.screen == Screen::Help {
        draw_help(f, size);
    }
}

fn draw_header(f: &mut ratatui::Frame, area: Rect, app: &App) {
    let line = Line::from(vec![
        Span::styled("Cloud Auditor", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" | Security & Compliance Dashboard "),
        Span::styled(
            app.dashboard.user().display_name().to_string(),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let w = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
    f.render_widget(w, area);
}

fn draw_tabs(f: &mut ratatui::Frame, area: Rect, app: &App) {
    let titles: Vec<Line> = Tab::ALL
        .iter()
        .enumerate()
        .map(|(i, tab)| Line::from(format!("{} {}", i + 1, tab.label())))
        .collect();
    let tabs = Tabs::new(titles)
        .select(app.dashboard.active_tab().index())
        .block(Block::default().borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .add_modifier(Modifier::BOLD)
                .add_modifier(Modifier::REVERSED),
        );
    f.render_widget(tabs, area);
}

fn draw_footer(f: &mut ratatui::Frame, area: Rect, app: &App) {
    let line1 = match app.screen {
        Screen::Help => "Esc/? close",
        Screen::Dashboard => match app.dashboard.active_tab() {
            Tab::Findings => "Tab/1-4 switch tab | Up/Down/j/k select | r mark resolved",
            Tab::Security => "Tab/1-4 switch tab | Up/Down/j/k select",
            Tab::Overview | Tab::Reports => "Tab/1-4 switch tab",
        },
    };
    let line2 = "s sign out | q quit | ? help | Ctrl-C force quit";
    let w = Paragraph::new(Text::from(vec![Line::from(line1), Line::from(line2)]))
        .style(Style::default().fg(Color::DarkGray))
        .wrap(Wrap { trim: true });
    f.render_widget(w, area);
}

fn draw_loading(f: &mut ratatui::Frame, area: Rect, tick: u64, msg: &str) {
    let spinner = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
    let s = spinner[(tick as usize) % spinner.len()];
    let w = Paragraph::new(Line::from(vec![
        Span::styled(s, Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" "),
        Span::raw(msg.to_string()),
    ]))
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(w, centered_rect(60, 30, area));
}

fn draw_overview(f: &mut ratatui::Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(panel_title(Tab::Overview));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let overview = app.dashboard.overview();
    let cards = [
        ("Total Findings", overview.total_findings, "Security issues detected", Color::Cyan),
        ("Security Groups", overview.security_groups, "Groups monitored", Color::Cyan),
        ("High Severity", overview.high_severity, "Critical issues", Color::Red),
        ("Resolved", overview.resolved, "Issues fixed", Color::Green),
    ];

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(6), Constraint::Min(0)])
        .split(inner);
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(25),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
            Constraint::Percentage(25),
        ])
        .split(rows[0]);

    for (i, (title, n, label, accent)) in cards.into_iter().enumerate() {
        let number_style = if app.color {
            Style::default().fg(accent).add_modifier(Modifier::BOLD)
        } else {
            Style::default().add_modifier(Modifier::BOLD)
        };
        let text = Text::from(vec![
            Line::from(""),
            Line::from(Span::styled(n.to_string(), number_style)),
            Line::from(Span::styled(label, Style::default().fg(Color::DarkGray))),
        ]);
        let w = Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL).title(title))
            .wrap(Wrap { trim: true });
        f.render_widget(w, cols[i]);
    }

    if app.dashboard.is_loading() {
        draw_loading(f, rows[1], app.tick, "Loading audit data...");
    }
}

fn draw_findings(f: &mut ratatui::Frame, area: Rect, app: &mut App) {
    let findings = app.dashboard.findings();
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("{} ({})", panel_title(Tab::Findings), findings.len()));

    if app.dashboard.is_loading() {
        let inner = block.inner(area);
        f.render_widget(block, area);
        draw_loading(f, inner, app.tick, "Loading findings...");
        return;
    }

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    let items: Vec<ListItem> = if findings.is_empty() {
        vec![ListItem::new(Line::from("No findings."))]
    } else {
        findings
            .iter()
            .map(|finding| {
                let line = Line::from(vec![
                    Span::styled(
                        format!("{:<6}", finding.severity.as_str()),
                        severity_style(finding.severity, app.color),
                    ),
                    Span::raw(" "),
                    Span::raw(finding.title.clone()),
                    Span::raw(" "),
                    Span::styled(
                        format!("[{}]", finding.status),
                        finding_status_style(finding.status, app.color),
                    ),
                ]);
                ListItem::new(line)
            })
            .collect()
    };

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    f.render_stateful_widget(list, body[0], &mut app.findings_state);

    let detail = app
        .selected_finding()
        .map(finding_detail)
        .unwrap_or_else(|| Text::from("No finding selected."));
    let w = Paragraph::new(detail)
        .block(Block::default().borders(Borders::ALL).title("Details"))
        .wrap(Wrap { trim: false });
    f.render_widget(w, body[1]);
}

fn finding_detail(finding: &Finding) -> Text<'static> {
    let mut lines = Vec::<Line>::new();
    lines.push(Line::from(Span::styled(
        finding.title.clone(),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("id: ", Style::default().fg(Color::DarkGray)),
        Span::raw(finding.id.to_string()),
    ]));
    lines.push(Line::from(vec![
        Span::styled("severity: ", Style::default().fg(Color::DarkGray)),
        Span::raw(finding.severity.to_string()),
        Span::raw("  "),
        Span::styled("status: ", Style::default().fg(Color::DarkGray)),
        Span::raw(crate::ui::finding_status_label(finding.status)),
    ]));
    lines.push(Line::from(""));
    lines.push(Line::from(finding.description.clone()));

    if finding.is_open() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "hint: press 'r' to mark this finding resolved.",
            Style::default().fg(Color::DarkGray),
        )));
    }

    Text::from(lines)
}

fn draw_security_groups(f: &mut ratatui::Frame, area: Rect, app: &mut App) {
    let groups = app.dashboard.security_groups();
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("{} ({})", panel_title(Tab::Security), groups.len()));

    if app.dashboard.is_loading() {
        let inner = block.inner(area);
        f.render_widget(block, area);
        draw_loading(f, inner, app.tick, "Loading security groups...");
        return;
    }

    let items: Vec<ListItem> = if groups.is_empty() {
        vec![ListItem::new(Line::from("No security groups."))]
    } else {
        groups.iter().map(|g| group_item(g, app.color)).collect()
    };
    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    f.render_stateful_widget(list, area, &mut app.groups_state);
}

fn group_item(group: &SecurityGroup, color: bool) -> ListItem<'static> {
    let line = Line::from(vec![
        Span::styled("● ", group_status_style(group.status, color)),
        Span::raw(format!("{:<24}", group.name)),
        Span::styled(
            format!("{:>3} rules  ", group.rules),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled(group.status.to_string(), group_status_style(group.status, color)),
    ]);
    ListItem::new(line)
}

fn draw_reports(f: &mut ratatui::Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(panel_title(Tab::Reports));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(inner);

    let cards = [
        (
            "Weekly Security Report",
            "Comprehensive security analysis for the past week",
            "Last generated: 2 days ago",
        ),
        (
            "Compliance Report",
            "PCI DSS and SOC 2 compliance status",
            "Last generated: 1 week ago",
        ),
    ];
    for (i, (title, description, meta)) in cards.into_iter().enumerate() {
        let text = Text::from(vec![
            Line::from(description),
            Line::from(""),
            Line::from(Span::styled(meta, Style::default().fg(Color::DarkGray))),
        ]);
        let w = Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL).title(title))
            .wrap(Wrap { trim: true });
        f.render_widget(w, cols[i]);
    }
}

fn draw_help(f: &mut ratatui::Frame, area: Rect) {
    let text = Text::from(vec![
        Line::from(Span::styled(
            "Cloud Auditor dashboard",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Tabs:"),
        Line::from("  Tab / Right / l      : next tab"),
        Line::from("  Shift-Tab / Left / h : previous tab"),
        Line::from("  1 2 3 4              : overview, findings, security groups, reports"),
        Line::from(""),
        Line::from("Lists:"),
        Line::from("  Up/Down / j/k : move selection"),
        Line::from("  r             : mark the selected finding resolved (findings tab)"),
        Line::from(""),
        Line::from("Session:"),
        Line::from("  s      : sign out"),
        Line::from("  q/Esc  : quit"),
        Line::from("  Ctrl-C : force quit (any screen)"),
    ]);

    let w = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title("Help"))
        .wrap(Wrap { trim: false });
    let popup = centered_rect(70, 70, area);
    f.render_widget(ratatui::widgets::Clear, popup);
    f.render_widget(w, popup);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

fn severity_style(severity: Severity, enabled: bool) -> Style {
    if !enabled {
        return Style::default();
    }
    match severity {
        Severity::High => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        Severity::Medium => Style::default().fg(Color::Yellow),
        Severity::Low => Style::default().fg(Color::Green),
    }
}

fn finding_status_style(status: FindingStatus, enabled: bool) -> Style {
    if !enabled {
        return Style::default();
    }
    match status {
        FindingStatus::Open => Style::default().fg(Color::Yellow),
        FindingStatus::Resolved => Style::default().fg(Color::DarkGray),
    }
}

fn group_status_style(status: GroupStatus, enabled: bool) -> Style {
    if !enabled {
        return Style::default();
    }
    match status {
        GroupStatus::Secure => Style::default().fg(Color::Green),
        GroupStatus::Warning => Style::default().fg(Color::Yellow),
        GroupStatus::Critical => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthProvider;
    use crate::clock::ManualClock;
    use crate::controller::{DEFAULT_LOAD_DELAY, DashboardOptions};
    use crate::core::User;
    use crate::source::MockSource;
    use ratatui::backend::TestBackend;

    struct StaticAuth {
        user: User,
        fail: bool,
    }

    impl AuthProvider for StaticAuth {
        fn user(&self) -> &User {
            &self.user
        }

        fn sign_out(&self) -> anyhow::Result<()> {
            if self.fail {
                Err(anyhow::anyhow!("provider rejected sign-out"))
            } else {
                Ok(())
            }
        }
    }

    fn test_app(clock: &ManualClock, fail_sign_out: bool) -> App {
        let dashboard = Dashboard::mount(
            Box::new(MockSource),
            Box::new(StaticAuth {
                user: User::new("auditor", Some("auditor@example.com".to_string())),
                fail: fail_sign_out,
            }),
            Box::new(clock.clone()),
            DashboardOptions::default(),
        );
        App::new(dashboard, false)
    }

    fn loaded_app(clock: &ManualClock) -> App {
        let mut app = test_app(clock, false);
        clock.advance(DEFAULT_LOAD_DELAY);
        assert!(app.dashboard.poll());
        app
    }

    fn press(app: &mut App, code: KeyCode) -> bool {
        handle_key(app, KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn render(app: &mut App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 32)).expect("test terminal");
        terminal.draw(|f| draw(f, app)).expect("draw");
        let buffer = terminal.backend().buffer();
        let width = buffer.area.width as usize;
        buffer
            .content
            .chunks(width)
            .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn each_tab_renders_only_its_own_panel() {
        let clock = ManualClock::new();
        let mut app = loaded_app(&clock);

        for tab in Tab::ALL {
            app.dashboard.select_tab(tab);
            let screen = render(&mut app);
            for other in Tab::ALL {
                let shown = screen.contains(panel_title(other));
                assert_eq!(shown, other == tab, "tab={tab} panel={other}");
            }
        }
    }

    #[test]
    fn findings_panel_shows_spinner_until_loaded() {
        let clock = ManualClock::new();
        let mut app = test_app(&clock, false);
        app.dashboard.select_tab(Tab::Findings);

        let screen = render(&mut app);
        assert!(screen.contains("Loading findings..."));
        assert!(!screen.contains("Public S3 Bucket"));

        clock.advance(DEFAULT_LOAD_DELAY);
        app.dashboard.poll();
        let screen = render(&mut app);
        assert!(!screen.contains("Loading findings..."));
        assert!(screen.contains("Public S3 Bucket"));
        assert!(screen.contains("Weak IAM Policy"));
    }

    #[test]
    fn header_shows_user_email() {
        let clock = ManualClock::new();
        let mut app = test_app(&clock, false);
        assert!(render(&mut app).contains("auditor@example.com"));
    }

    #[test]
    fn overview_cards_show_counts_after_load() {
        let clock = ManualClock::new();
        let mut app = loaded_app(&clock);
        let screen = render(&mut app);
        assert!(screen.contains("Total Findings"));
        assert!(screen.contains("High Severity"));
        assert!(screen.contains("Issues fixed"));
    }

    #[test]
    fn number_keys_and_tab_cycle_select_tabs() {
        let clock = ManualClock::new();
        let mut app = test_app(&clock, false);

        assert!(!press(&mut app, KeyCode::Char('3')));
        assert_eq!(app.dashboard.active_tab(), Tab::Security);
        press(&mut app, KeyCode::Char('2'));
        assert_eq!(app.dashboard.active_tab(), Tab::Findings);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.dashboard.active_tab(), Tab::Security);
        press(&mut app, KeyCode::BackTab);
        press(&mut app, KeyCode::BackTab);
        assert_eq!(app.dashboard.active_tab(), Tab::Overview);
        press(&mut app, KeyCode::Left);
        assert_eq!(app.dashboard.active_tab(), Tab::Reports);
    }

    #[test]
    fn r_resolves_selected_finding() {
        let clock = ManualClock::new();
        let mut app = loaded_app(&clock);
        press(&mut app, KeyCode::Char('2'));
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Char('r'));

        assert_eq!(app.dashboard.findings()[0].status, FindingStatus::Open);
        assert_eq!(app.dashboard.findings()[1].status, FindingStatus::Resolved);
    }

    #[test]
    fn r_outside_findings_tab_does_nothing() {
        let clock = ManualClock::new();
        let mut app = loaded_app(&clock);
        press(&mut app, KeyCode::Char('r'));
        assert_eq!(app.dashboard.overview().resolved, 1);
    }

    #[test]
    fn selection_is_clamped_to_list_length() {
        let clock = ManualClock::new();
        let mut app = loaded_app(&clock);
        press(&mut app, KeyCode::Char('3'));
        for _ in 0..10 {
            press(&mut app, KeyCode::Char('j'));
        }
        assert_eq!(app.groups_state.selected(), Some(2));
        press(&mut app, KeyCode::Up);
        assert_eq!(app.groups_state.selected(), Some(1));
    }

    #[test]
    fn failed_sign_out_keeps_dashboard_open() {
        let clock = ManualClock::new();
        let mut app = test_app(&clock, true);
        press(&mut app, KeyCode::Char('4'));

        assert!(!press(&mut app, KeyCode::Char('s')));
        assert!(app.exit.is_none());
        assert_eq!(app.screen, Screen::Dashboard);
        assert_eq!(app.dashboard.active_tab(), Tab::Reports);
        assert_eq!(app.dashboard.diagnostics().len(), 1);
        assert!(!render(&mut app).contains("provider rejected"));
    }

    #[test]
    fn successful_sign_out_closes_dashboard() {
        let clock = ManualClock::new();
        let mut app = test_app(&clock, false);
        press(&mut app, KeyCode::Char('s'));
        assert_eq!(app.exit, Some(ExitReason::SignedOut));
    }

    #[test]
    fn help_screen_opens_and_closes() {
        let clock = ManualClock::new();
        let mut app = test_app(&clock, false);
        press(&mut app, KeyCode::Char('?'));
        assert_eq!(app.screen, Screen::Help);
        assert!(render(&mut app).contains("mark the selected finding resolved"));
        assert!(!press(&mut app, KeyCode::Esc));
        assert_eq!(app.screen, Screen::Dashboard);
        assert!(press(&mut app, KeyCode::Char('q')));
    }

    #[test]
    fn ctrl_c_quits_from_any_screen() {
        let clock = ManualClock::new();
        let mut app = test_app(&clock, false);
        app.screen = Screen::Help;
        assert!(handle_key(
            &mut app,
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)
        ));
    }
}
