use std::io;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use serde::Serialize;

use crate::auth::{AuthProvider, SessionFile};
use crate::clock::SystemClock;
use crate::config::EffectiveConfig;
use crate::controller::{Dashboard, DashboardOptions};
use crate::core::{Overview, Tab, User};
use crate::source::{AuditSource, MockSource, SnapshotSource};
use crate::tui::ExitReason;
use crate::ui::UiConfig;

#[derive(Debug, Parser)]
#[command(
    name = "cloud-auditor",
    version,
    about = "Security & compliance dashboard for cloud findings and security groups"
)]
pub struct Cli {
    #[arg(long, global = true)]
    pub json: bool,
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,
    #[arg(long, global = true)]
    pub verbose: bool,
    #[arg(long, global = true)]
    pub quiet: bool,
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Open the interactive dashboard.
    Ui(UiArgs),
    /// Start a local session.
    Login(LoginArgs),
    /// End the local session.
    Logout,
    /// Print the overview counts.
    Overview,
    /// Print the security findings.
    Findings,
    /// Print the security groups.
    Groups,
    Completion(CompletionArgs),
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
pub struct UiArgs {
    /// Tab to open: overview, findings, security or reports.
    #[arg(long)]
    pub tab: Option<Tab>,
}

#[derive(Debug, Args)]
pub struct LoginArgs {
    #[arg(long)]
    pub username: String,
    #[arg(long)]
    pub email: Option<String>,
}

#[derive(Debug, Args)]
pub struct CompletionArgs {
    pub shell: String,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[arg(long)]
    pub show: bool,
}

#[derive(Debug, Serialize)]
struct OverviewOutput<'a> {
    user: &'a str,
    #[serde(flatten)]
    overview: Overview,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let stdin_is_tty = io::stdin().is_terminal();
    let stdout_is_tty = io::stdout().is_terminal();
    let stderr_is_tty = io::stderr().is_terminal();

    let home_dir = effective_home_dir()?;

    let env_config_path = std::env::var_os("CLOUD_AUDITOR_CONFIG").map(PathBuf::from);
    let cfg = crate::config::load(
        cli.config.as_deref().or(env_config_path.as_deref()),
        &home_dir,
    )
    .map_err(crate::exit::invalid_args_err)?;

    if !matches!(cli.command, Commands::Completion(_)) {
        if let Err(err) = crate::logs::init_tracing(&home_dir, cli.verbose) {
            if cli.verbose {
                eprintln!("warning: logging disabled: {err:#}");
            }
        }
    }
    tracing::debug!(command = ?cli.command, config = ?cfg.config_path, "starting");

    let color = stdout_is_tty && cfg.ui.color && !cli.no_color;

    let ui_cfg = UiConfig {
        color,
        stdin_is_tty,
        stdout_is_tty,
        stderr_is_tty,
        max_table_rows: cfg.ui.max_table_rows,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Ui(args) => {
            if cli.json {
                return Err(crate::exit::invalid_args("ui cannot be combined with --json"));
            }
            if !(ui_cfg.stdin_is_tty && ui_cfg.stdout_is_tty) {
                return Err(crate::exit::invalid_args(
                    "ui requires a TTY (stdin + stdout)",
                ));
            }
            let session = require_session(&home_dir)?;
            let dashboard = mount_dashboard(&cfg, session);
            let reason = crate::tui::run(dashboard, ui_cfg.color, args.tab)?;
            if reason == ExitReason::SignedOut && !ui_cfg.quiet {
                println!("Signed out.");
            }
        }
        Commands::Login(args) => {
            let username = args.username.trim();
            if username.is_empty() {
                return Err(crate::exit::invalid_args("login: --username must not be empty"));
            }
            let email = args
                .email
                .map(|e| e.trim().to_string())
                .filter(|e| !e.is_empty());
            let session = SessionFile::create(&home_dir, User::new(username, email))
                .map_err(crate::exit::invalid_args_err)?;
            tracing::info!(user = session.user().display_name(), "signed in");
            if !ui_cfg.quiet {
                println!("Signed in as {}.", session.user().display_name());
                println!(
                    "session: {}",
                    crate::logs::display_path(session.path(), &home_dir)
                );
            }
        }
        Commands::Logout => {
            let session = require_session(&home_dir)?;
            session
                .sign_out()
                .map_err(crate::exit::auth_failed_err)?;
            tracing::info!(user = session.user().display_name(), "signed out");
            if !ui_cfg.quiet {
                println!("Signed out.");
            }
        }
        Commands::Overview => {
            let dashboard = load_dashboard(&cfg, &home_dir, &ui_cfg, cli.json)?;
            let overview = dashboard.overview();
            if cli.json {
                write_json(&OverviewOutput {
                    user: dashboard.user().display_name(),
                    overview,
                })?;
            } else {
                crate::ui::print_overview(&overview, dashboard.user(), &ui_cfg);
            }
        }
        Commands::Findings => {
            let dashboard = load_dashboard(&cfg, &home_dir, &ui_cfg, cli.json)?;
            if cli.json {
                write_json(&dashboard.findings())?;
            } else {
                crate::ui::print_findings(dashboard.findings(), &ui_cfg);
            }
        }
        Commands::Groups => {
            let dashboard = load_dashboard(&cfg, &home_dir, &ui_cfg, cli.json)?;
            if cli.json {
                write_json(&dashboard.security_groups())?;
            } else {
                crate::ui::print_security_groups(dashboard.security_groups(), &ui_cfg);
            }
        }
        Commands::Completion(args) => {
            let shell = parse_shell(&args.shell)?;
            let mut cmd = Cli::command();
            let mut out = std::io::stdout().lock();
            clap_complete::generate(shell, &mut cmd, "cloud-auditor", &mut out);
        }
        Commands::Config(args) => {
            if args.show {
                if cli.json {
                    write_json(&cfg)?;
                } else {
                    let rendered = toml::to_string_pretty(&cfg)
                        .context("failed to render config as TOML")
                        .map_err(crate::exit::invalid_args_err)?;
                    println!("{rendered}");
                }
            } else if !ui_cfg.quiet {
                eprintln!("config: use `cloud-auditor config --show`");
            }
        }
    }

    Ok(())
}

fn effective_home_dir() -> Result<PathBuf> {
    std::env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| crate::exit::invalid_args("environment variable HOME is not set"))
}

fn require_session(home_dir: &Path) -> Result<SessionFile> {
    SessionFile::load(home_dir)
        .map_err(crate::exit::invalid_args_err)?
        .ok_or_else(|| {
            crate::exit::invalid_args(
                "not signed in: run `cloud-auditor login --username <name>` first",
            )
        })
}

fn audit_source(cfg: &EffectiveConfig) -> Box<dyn AuditSource> {
    match &cfg.source.snapshot {
        Some(path) => Box::new(SnapshotSource::new(path)),
        None => Box::new(MockSource),
    }
}

fn mount_dashboard(cfg: &EffectiveConfig, session: SessionFile) -> Dashboard {
    Dashboard::mount(
        audit_source(cfg),
        Box::new(session),
        Box::new(SystemClock),
        DashboardOptions {
            load_delay: cfg.dashboard.load_delay(),
        },
    )
}

/// Mounts a dashboard and blocks until its load has settled.
fn load_dashboard(
    cfg: &EffectiveConfig,
    home_dir: &Path,
    ui_cfg: &UiConfig,
    json: bool,
) -> Result<Dashboard> {
    let session = require_session(home_dir)?;
    let mut dashboard = mount_dashboard(cfg, session);

    let pb = if ui_cfg.stderr_is_tty && !ui_cfg.quiet && !json {
        let pb = indicatif::ProgressBar::new_spinner();
        pb.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        pb.set_message("Loading audit data...");
        pb.enable_steady_tick(Duration::from_millis(120));
        Some(pb)
    } else {
        None
    };

    while !dashboard.poll() {
        let wait = dashboard
            .remaining()
            .unwrap_or(Duration::ZERO)
            .min(Duration::from_millis(50));
        std::thread::sleep(wait);
    }

    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    if let Some(diag) = dashboard.diagnostics().first() {
        return Err(crate::exit::load_failed(diag.message.clone()));
    }
    Ok(dashboard)
}

fn write_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    use std::io::Write;

    let buf = serde_json::to_vec_pretty(value)?;

    let mut stdout = std::io::stdout().lock();
    match stdout.write_all(&buf) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => return Ok(()),
        Err(err) => return Err(err.into()),
    }
    match stdout.write_all(b"\n") {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == std::io::ErrorKind::BrokenPipe => Ok(()),
        Err(err) => Err(err.into()),
    }
}

fn parse_shell(s: &str) -> Result<clap_complete::Shell> {
    let s = s.trim().to_ascii_lowercase();
    match s.as_str() {
        "bash" => Ok(clap_complete::Shell::Bash),
        "zsh" => Ok(clap_complete::Shell::Zsh),
        "fish" => Ok(clap_complete::Shell::Fish),
        other => Err(crate::exit::invalid_args(format!(
            "unsupported shell: {other} (expected bash|zsh|fish)"
        ))),
    }
}
