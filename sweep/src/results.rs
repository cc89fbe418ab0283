//! Append-only CSV results file, one row per solver invocation.
//!
//! The file is opened once per process. The header is written only when the
//! file did not already exist, so interrupted sweeps keep appending to the
//! same report. Column layout is illustrative, not a stable contract.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;

use mapf::instance::ProblemInstance;
use mapf::search::{Phase, SolveOutcome};

const HEADER: &str =
    "timestamp,instance,grid_size,obstacle_percent,agents,index,phase,result,cost,time_ms,expanded,generated,open";

/// Sweep-parameter columns of a row.
#[derive(Debug, Clone, Copy)]
pub struct RowParams {
    pub grid_size: usize,
    pub obstacle_percent: u32,
    pub agent_count: usize,
    pub index: usize,
}

impl RowParams {
    /// Derive the columns from an instance itself, for single-instance runs
    /// outside a parameter sweep.
    pub fn from_instance(instance: &ProblemInstance) -> Self {
        let cells = instance.grid.cells();
        let obstacles = cells - instance.grid.free_cells();
        Self {
            grid_size: instance.grid.width(),
            obstacle_percent: (obstacles * 100 / cells.max(1)) as u32,
            agent_count: instance.agents.len(),
            index: 0,
        }
    }
}

pub struct ResultsWriter {
    file: File,
}

impl ResultsWriter {
    /// Open (or create) the results file for appending.
    pub fn open(path: &Path) -> Result<Self> {
        let existed = path.exists();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open results file {}", path.display()))?;
        if !existed {
            writeln!(file, "{HEADER}")
                .with_context(|| format!("write results header {}", path.display()))?;
        }
        Ok(Self { file })
    }

    pub fn append(
        &mut self,
        instance_name: &str,
        params: RowParams,
        phase: Phase,
        outcome: &SolveOutcome,
    ) -> Result<()> {
        let metrics = outcome.metrics();
        let result = if outcome.is_timeout() { "timeout" } else { "solved" };
        writeln!(
            self.file,
            "{},{},{},{},{},{},{},{},{},{},{},{},{}",
            Utc::now().to_rfc3339(),
            instance_name,
            params.grid_size,
            params.obstacle_percent,
            params.agent_count,
            params.index,
            phase,
            result,
            metrics.cost,
            metrics.time_ms,
            metrics.expanded,
            metrics.generated,
            metrics.open
        )
        .context("append results row")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapf::test_support::{solved, straight_path, timed_out};

    fn params() -> RowParams {
        RowParams {
            grid_size: 10,
            obstacle_percent: 10,
            agent_count: 3,
            index: 0,
        }
    }

    #[test]
    fn header_written_only_for_new_files() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("results.csv");

        {
            let mut writer = ResultsWriter::open(&path).expect("open");
            let outcome = solved(5, vec![straight_path(0, 0, 5)]);
            writer
                .append("Instance-10-10-3-0", params(), Phase::Full, &outcome)
                .expect("append");
        }
        {
            let mut writer = ResultsWriter::open(&path).expect("reopen");
            writer
                .append("Instance-10-10-3-0", params(), Phase::FirstHalf, &timed_out(30))
                .expect("append");
        }

        let contents = fs::read_to_string(&path).expect("read");
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], HEADER);
        assert!(lines[1].contains(",full,solved,5,"));
        assert!(lines[2].contains(",first_half,timeout,0,30,"));
    }

    #[test]
    fn params_derived_from_instance() {
        use mapf::grid::{Coord, Grid};
        use mapf::instance::Agent;

        let mut grid = Grid::open(10, 10);
        for x in 0..10 {
            grid.set_obstacle(Coord::new(x, 0));
        }
        let instance = ProblemInstance::new(
            "den502d-1-0",
            grid,
            vec![Agent::new(0, Coord::new(0, 5), Coord::new(9, 5))],
        );
        let params = RowParams::from_instance(&instance);
        assert_eq!(params.grid_size, 10);
        assert_eq!(params.obstacle_percent, 10);
        assert_eq!(params.agent_count, 1);
    }
}
