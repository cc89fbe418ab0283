//! Running per-phase totals for the whole sweep.
//!
//! Four buckets: the full solve, the two halves, and their combination.
//! Totals only ever grow; there is no decay and no per-instance reset.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use mapf::search::SolveMetrics;

/// Accumulated sums for one solve strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTotals {
    pub cost: u64,
    pub time_ms: u64,
    pub expanded: u64,
    pub generated: u64,
    pub open: u64,
}

impl PhaseTotals {
    pub fn add(&mut self, metrics: SolveMetrics) {
        self.cost += metrics.cost;
        self.time_ms += metrics.time_ms;
        self.expanded += metrics.expanded;
        self.generated += metrics.generated;
        self.open += metrics.open;
    }
}

/// The four running buckets plus the number of instances aggregated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunningTotals {
    pub instances: u64,
    pub full: PhaseTotals,
    pub bidirectional: PhaseTotals,
    pub first_half: PhaseTotals,
    pub second_half: PhaseTotals,
}

impl RunningTotals {
    /// Fold one instance's three outcomes in. The bidirectional bucket is
    /// the sum of the two halves.
    pub fn record_instance(
        &mut self,
        full: SolveMetrics,
        first: SolveMetrics,
        second: SolveMetrics,
    ) {
        self.instances += 1;
        self.full.add(full);
        self.first_half.add(first);
        self.second_half.add(second);
        self.bidirectional.add(first);
        self.bidirectional.add(second);
    }

    /// Fold in an instance that was abandoned after its full solve.
    pub fn record_full_only(&mut self, full: SolveMetrics) {
        self.full.add(full);
    }

    /// Human-readable per-phase totals block.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("totals after {} instances:\n", self.instances));
        for (label, totals) in [
            ("full", &self.full),
            ("bidirectional", &self.bidirectional),
            ("first half", &self.first_half),
            ("second half", &self.second_half),
        ] {
            out.push_str(&format!(
                "  {label:<13} cost={} time_ms={} expanded={} generated={} open={}\n",
                totals.cost, totals.time_ms, totals.expanded, totals.generated, totals.open
            ));
        }
        out
    }

    /// Persist the totals as pretty JSON with trailing newline.
    pub fn write_summary(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self).context("serialize totals")?;
        fs::write(path, format!("{contents}\n"))
            .with_context(|| format!("write summary {}", path.display()))?;
        Ok(())
    }

    pub fn load_summary(path: &Path) -> Result<RunningTotals> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("read summary {}", path.display()))?;
        serde_json::from_str(&contents).with_context(|| format!("parse summary {}", path.display()))
    }
}
