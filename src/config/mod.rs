use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::controller::DEFAULT_LOAD_DELAY;

#[derive(Debug, Clone, Serialize)]
pub struct EffectiveConfig {
    pub ui: UiConfig,
    pub dashboard: DashboardConfig,
    pub source: SourceConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UiConfig {
    pub color: bool,
    pub max_table_rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardConfig {
    pub load_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<PathBuf>,
}

impl Default for EffectiveConfig {
    fn default() -> Self {
        Self {
            ui: UiConfig {
                color: true,
                max_table_rows: 20,
            },
            dashboard: DashboardConfig {
                load_delay_ms: DEFAULT_LOAD_DELAY.as_millis() as u64,
            },
            source: SourceConfig { snapshot: None },
            config_path: None,
        }
    }
}

impl DashboardConfig {
    pub fn load_delay(&self) -> Duration {
        Duration::from_millis(self.load_delay_ms)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    ui: Option<RawUiConfig>,
    dashboard: Option<RawDashboardConfig>,
    source: Option<RawSourceConfig>,
}

#[derive(Debug, Deserialize)]
struct RawUiConfig {
    color: Option<bool>,
    max_table_rows: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RawDashboardConfig {
    load_delay_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawSourceConfig {
    snapshot: Option<PathBuf>,
}

pub fn config_dir(home_dir: &Path) -> PathBuf {
    home_dir.join(".config/cloud-auditor")
}

pub fn default_config_path(home_dir: &Path) -> PathBuf {
    config_dir(home_dir).join("config.toml")
}

pub fn load(config_path: Option<&Path>, home_dir: &Path) -> Result<EffectiveConfig> {
    let mut cfg = EffectiveConfig::default();

    let path = config_path
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| default_config_path(home_dir));

    if path.exists() {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let raw: RawConfig = toml::from_str(&s).context("failed to parse config file (TOML)")?;
        apply_raw_config(&mut cfg, raw, path.parent());
        cfg.config_path = Some(path.display().to_string());
    }

    apply_env_overrides(&mut cfg)?;

    Ok(cfg)
}

fn apply_raw_config(cfg: &mut EffectiveConfig, raw: RawConfig, base_dir: Option<&Path>) {
    if let Some(ui) = raw.ui {
        if let Some(color) = ui.color {
            cfg.ui.color = color;
        }
        if let Some(max_table_rows) = ui.max_table_rows {
            cfg.ui.max_table_rows = max_table_rows;
        }
    }

    if let Some(dashboard) = raw.dashboard {
        if let Some(load_delay_ms) = dashboard.load_delay_ms {
            cfg.dashboard.load_delay_ms = load_delay_ms;
        }
    }

    if let Some(source) = raw.source {
        if let Some(snapshot) = source.snapshot {
            // Relative snapshot paths are resolved against the config file.
            cfg.source.snapshot = Some(match base_dir {
                Some(dir) if snapshot.is_relative() => dir.join(snapshot),
                _ => snapshot,
            });
        }
    }
}

fn apply_env_overrides(cfg: &mut EffectiveConfig) -> Result<()> {
    if let Ok(v) = std::env::var("CLOUD_AUDITOR_UI_COLOR") {
        cfg.ui.color = parse_bool(&v).with_context(|| "CLOUD_AUDITOR_UI_COLOR")?;
    }
    if let Ok(v) = std::env::var("CLOUD_AUDITOR_UI_MAX_TABLE_ROWS") {
        cfg.ui.max_table_rows = v
            .trim()
            .parse::<usize>()
            .with_context(|| "CLOUD_AUDITOR_UI_MAX_TABLE_ROWS")?;
    }
    if let Ok(v) = std::env::var("CLOUD_AUDITOR_LOAD_DELAY_MS") {
        cfg.dashboard.load_delay_ms = v
            .trim()
            .parse::<u64>()
            .with_context(|| "CLOUD_AUDITOR_LOAD_DELAY_MS")?;
    }
    if let Ok(v) = std::env::var("CLOUD_AUDITOR_SOURCE_SNAPSHOT") {
        let v = v.trim();
        cfg.source.snapshot = if v.is_empty() {
            None
        } else {
            Some(PathBuf::from(v))
        };
    }

    Ok(())
}

fn parse_bool(s: &str) -> Result<bool> {
    let s = s.trim().to_ascii_lowercase();
    match s.as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow::anyhow!(
            "invalid boolean: {s} (expected true|false|1|0|yes|no|on|off)"
        )),
    }
}
