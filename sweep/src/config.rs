//! Sweep configuration stored as TOML.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::decompose::Direction;
use crate::middle::MiddleSource;

/// How an instance is split, fixed for the whole sweep.
///
/// One closed mode instead of two independent flags: the middle-state source
/// and the second-half direction are chosen together and cannot drift apart
/// mid-sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecompositionMode {
    AutomatedReverse,
    AutomatedForward,
    FullSolveReverse,
    FullSolveForward,
}

impl DecompositionMode {
    pub fn middle_source(self) -> MiddleSource {
        match self {
            DecompositionMode::AutomatedReverse | DecompositionMode::AutomatedForward => {
                MiddleSource::Automated
            }
            DecompositionMode::FullSolveReverse | DecompositionMode::FullSolveForward => {
                MiddleSource::FullSolve
            }
        }
    }

    pub fn direction(self) -> Direction {
        match self {
            DecompositionMode::AutomatedReverse | DecompositionMode::FullSolveReverse => {
                Direction::Reverse
            }
            DecompositionMode::AutomatedForward | DecompositionMode::FullSolveForward => {
                Direction::Forward
            }
        }
    }
}

/// Sweep configuration (TOML).
///
/// This file is intended to be edited by humans and must remain stable and
/// automatable. Missing fields default to a small smoke-test sweep.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SweepConfig {
    /// Square grid edge lengths, outermost sweep dimension.
    pub grid_sizes: Vec<usize>,
    /// Obstacle densities in percent of cells.
    pub obstacle_percents: Vec<u32>,
    pub agent_counts: Vec<usize>,
    /// Instances generated per (grid, obstacles, agents) setting.
    pub instances_per_setting: usize,

    /// Per-solve wall-clock budget in milliseconds.
    pub solve_budget_ms: u64,
    /// Timeouts per strategy before a (grid, obstacles) pair is abandoned.
    pub max_fail_count: u32,
    pub mode: DecompositionMode,
    /// Never generate instances; a missing instance file aborts the sweep.
    pub read_only: bool,
    /// Seed for instance generation.
    pub seed: u64,

    pub instances_dir: PathBuf,
    pub results_file: PathBuf,
    pub checkpoint_file: PathBuf,
    pub summary_file: PathBuf,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            grid_sizes: vec![8],
            obstacle_percents: vec![10, 20],
            agent_counts: vec![2, 3],
            instances_per_setting: 2,
            solve_budget_ms: 30_000,
            max_fail_count: 20,
            mode: DecompositionMode::AutomatedReverse,
            read_only: false,
            seed: 0,
            instances_dir: PathBuf::from("instances"),
            results_file: PathBuf::from("results.csv"),
            checkpoint_file: PathBuf::from("current-problem"),
            summary_file: PathBuf::from("summary.json"),
        }
    }
}

impl SweepConfig {
    pub fn validate(&self) -> Result<()> {
        if self.grid_sizes.is_empty() {
            return Err(anyhow!("grid_sizes must be non-empty"));
        }
        if self.grid_sizes.contains(&0) {
            return Err(anyhow!("grid_sizes entries must be > 0"));
        }
        if self.obstacle_percents.is_empty() {
            return Err(anyhow!("obstacle_percents must be non-empty"));
        }
        if self.obstacle_percents.iter().any(|percent| *percent >= 100) {
            return Err(anyhow!("obstacle_percents entries must be < 100"));
        }
        if self.agent_counts.is_empty() || self.agent_counts.contains(&0) {
            return Err(anyhow!("agent_counts must be non-empty and > 0"));
        }
        if self.instances_per_setting == 0 {
            return Err(anyhow!("instances_per_setting must be > 0"));
        }
        if self.solve_budget_ms == 0 {
            return Err(anyhow!("solve_budget_ms must be > 0"));
        }
        if self.max_fail_count == 0 {
            return Err(anyhow!("max_fail_count must be > 0"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `SweepConfig::default()`.
pub fn load_config(path: &Path) -> Result<SweepConfig> {
    if !path.exists() {
        let cfg = SweepConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: SweepConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &SweepConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, buf)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
