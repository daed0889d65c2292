use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

use anyhow::{Context, Result, anyhow};
use tracing_subscriber::EnvFilter;

/// Per-process log files kept in the logs directory, counting the new one.
pub const MAX_LOG_FILES: usize = 10;

pub fn logs_dir(home_dir: &Path) -> PathBuf {
    crate::config::config_dir(home_dir).join("logs")
}

pub fn log_file_path(home_dir: &Path) -> PathBuf {
    logs_dir(home_dir).join(format!("cloud-auditor-{}.log", std::process::id()))
}

/// Installs the global subscriber, writing to a per-process file under the
/// logs directory. The dashboard owns the terminal, so nothing goes to stderr.
/// Older files beyond [`MAX_LOG_FILES`] are removed first.
///
/// `RUST_LOG` takes precedence over the level picked from `verbose`.
pub fn init_tracing(home_dir: &Path, verbose: bool) -> Result<PathBuf> {
    let dir = logs_dir(home_dir);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create log directory: {}", dir.display()))?;
    let pruned = prune_logs(&dir, MAX_LOG_FILES.saturating_sub(1))?;

    let path = log_file_path(home_dir);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file: {}", path.display()))?;

    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .try_init()
        .map_err(|e| anyhow!("failed to initialise logging: {e}"))?;

    if pruned > 0 {
        tracing::debug!(pruned, dir = %dir.display(), "removed old log files");
    }
    Ok(path)
}

/// Deletes `cloud-auditor-*.log` files in `dir`, newest first kept, until at
/// most `keep` remain. Returns how many were removed.
pub fn prune_logs(dir: &Path, keep: usize) -> Result<usize> {
    let mut entries = Vec::<(Option<SystemTime>, String, PathBuf)>::new();
    for ent in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read log directory: {}", dir.display()))?
    {
        let ent = ent.with_context(|| format!("failed to read log entry: {}", dir.display()))?;
        let file_name = ent.file_name().to_string_lossy().to_string();
        if !(file_name.starts_with("cloud-auditor-") && file_name.ends_with(".log")) {
            continue;
        }
        let md = ent
            .metadata()
            .with_context(|| format!("failed to stat: {}", ent.path().display()))?;
        if !md.is_file() {
            continue;
        }
        entries.push((md.modified().ok(), file_name, ent.path()));
    }

    entries.sort_by(|(a_time, a_name, _), (b_time, b_name, _)| {
        match (a_time, b_time) {
            (Some(a), Some(b)) => b.cmp(a),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        }
        .then_with(|| b_name.cmp(a_name))
    });

    let mut removed = 0;
    for (_, _, path) in entries.into_iter().skip(keep) {
        std::fs::remove_file(&path)
            .with_context(|| format!("failed to remove old log: {}", path.display()))?;
        removed += 1;
    }
    Ok(removed)
}

/// Hint for the error footer pointing at where debug logs end up.
pub fn logs_hint(home_dir: &Path) -> String {
    format!(
        "re-run with `--verbose` for debug logs in {}",
        display_path(&logs_dir(home_dir), home_dir)
    )
}

/// Renders `path` relative to the home directory as `~/...` when possible.
pub fn display_path(path: &Path, home_dir: &Path) -> String {
    path.strip_prefix(home_dir)
        .map(|p| format!("~/{p}", p = p.display()))
        .unwrap_or_else(|_| path.display().to_string())
}
