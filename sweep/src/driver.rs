//! The sweep driver: walks the parameter space one tuple at a time and runs
//! the three-phase pipeline per instance.
//!
//! Strictly sequential. Per tuple: load or generate the instance, resolve
//! the middle state, solve full / first-half / second-half, fold metrics
//! into the running totals, write the checkpoint. Solver timeouts feed the
//! per-strategy failure counters that drive the early-exit rule; everything
//! else that goes wrong with a single instance is logged and skipped.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, info, instrument, warn};

use mapf::instance::{ProblemInstance, grid_instance_name};
use mapf::search::{Phase, SolveOutcome, Solver};

use crate::checkpoint::{CheckpointRecord, CheckpointStore};
use crate::config::SweepConfig;
use crate::cursor::{ParamSpace, TupleIndices};
use crate::decompose;
use crate::metrics::RunningTotals;
use crate::middle::{self, MiddleSource};
use crate::results::{ResultsWriter, RowParams};

pub struct SweepDriver<S: Solver> {
    config: SweepConfig,
    space: ParamSpace,
    solver: S,
    checkpoint: CheckpointStore,
    results: ResultsWriter,
    totals: RunningTotals,
    counters: Vec<u32>,
    rng: StdRng,
}

impl<S: Solver> SweepDriver<S> {
    pub fn new(config: SweepConfig, solver: S) -> Result<Self> {
        config.validate()?;
        let space = ParamSpace::from_config(&config);
        let checkpoint = CheckpointStore::new(config.checkpoint_file.clone());
        let results = ResultsWriter::open(&config.results_file)?;
        let rng = StdRng::seed_from_u64(config.seed);
        Ok(Self {
            space,
            solver,
            checkpoint,
            results,
            totals: RunningTotals::default(),
            counters: vec![0; Phase::COUNTED],
            rng,
            config,
        })
    }

    pub fn totals(&self) -> &RunningTotals {
        &self.totals
    }

    pub fn counters(&self) -> &[u32] {
        &self.counters
    }

    /// Run the sweep to the end of the parameter space, resuming from the
    /// checkpoint when one exists.
    pub fn run(&mut self) -> Result<()> {
        let mut index = 0usize;
        let mut current_pair: Option<(usize, usize)> = None;

        if let Some(record) = self.checkpoint.load(Phase::COUNTED)? {
            // the recorded tuple is already done; pick up right after it
            index = self.space.linear(record.indices) + 1;
            current_pair = Some((record.indices.grid, record.indices.obstacle));
            self.counters = record.counters;
            info!(resume_at = index, "resuming sweep from checkpoint");
        }

        while let Some(tuple) = self.space.tuple(index) {
            let pair = self.space.pair(tuple);
            if current_pair != Some(pair) {
                self.counters = vec![0; Phase::COUNTED];
                current_pair = Some(pair);
            }

            if self.pair_abandoned() {
                info!(
                    grid_size = self.space.grid_size(tuple),
                    obstacle_percent = self.space.obstacle_percent(tuple),
                    "every strategy exhausted its failure budget, abandoning pair"
                );
                index = self.space.next_pair_start(index);
                continue;
            }

            if !self.space.feasible(tuple) {
                debug!(
                    grid_size = self.space.grid_size(tuple),
                    obstacle_percent = self.space.obstacle_percent(tuple),
                    agent_count = self.space.agent_count(tuple),
                    "not enough free cells, skipping tuple"
                );
                self.write_checkpoint(tuple)?;
                index += 1;
                continue;
            }

            match self.load_or_generate(tuple) {
                Ok(instance) => {
                    let params = self.row_params(tuple);
                    if let Err(err) = self.solve_pipeline(&instance, params) {
                        warn!(
                            instance = %instance.name,
                            error = format!("{err:#}"),
                            "instance abandoned"
                        );
                    }
                }
                Err(err) if self.config.read_only => {
                    return Err(err.context("instance unavailable in read-only sweep"));
                }
                Err(err) => warn!(error = format!("{err:#}"), "skipping instance"),
            }

            self.write_checkpoint(tuple)?;
            index += 1;
        }

        self.totals.write_summary(&self.config.summary_file)?;
        Ok(())
    }

    /// Run a single named instance through the same three-phase pipeline.
    /// Import failure is fatal; nothing is generated and no checkpoint is
    /// written.
    pub fn run_single(&mut self, name: &str) -> Result<()> {
        let path = self.config.instances_dir.join(name);
        let instance =
            ProblemInstance::import(&path).with_context(|| format!("import instance {name}"))?;
        let params = RowParams::from_instance(&instance);
        self.solve_pipeline(&instance, params)?;
        self.totals.write_summary(&self.config.summary_file)?;
        Ok(())
    }

    #[instrument(skip_all, fields(instance = %instance.name))]
    fn solve_pipeline(&mut self, instance: &ProblemInstance, params: RowParams) -> Result<()> {
        let budget = Duration::from_millis(self.config.solve_budget_ms);

        // In automated mode the middle state exists before the full solve;
        // in full-solve mode the full solve itself supplies it.
        let automated = match self.config.mode.middle_source() {
            MiddleSource::Automated => Some(middle::resolve_automated(
                &mut self.solver,
                instance,
                budget,
            )?),
            MiddleSource::FullSolve => None,
        };

        let full = self.solver.solve(instance, Phase::Full, budget)?;
        self.note_timeout(Phase::Full, &full);
        self.results
            .append(&instance.name, params, Phase::Full, &full)?;

        let middle = match automated {
            Some(middle) => middle,
            None => match full.plan() {
                Some(plan) => middle::from_joint_plan(instance, plan)?,
                None => {
                    self.totals.record_full_only(full.metrics());
                    bail!("no middle state: full solve timed out");
                }
            },
        };
        println!("middle positions for {}: {}", instance.name, middle.render());

        let first_instance = decompose::first_half(instance, &middle)?;
        let first = self.solver.solve(&first_instance, Phase::FirstHalf, budget)?;
        self.note_timeout(Phase::FirstHalf, &first);
        self.results
            .append(&instance.name, params, Phase::FirstHalf, &first)?;

        let second_instance =
            decompose::second_half(instance, &middle, self.config.mode.direction())?;
        let second = self
            .solver
            .solve(&second_instance, Phase::SecondHalf, budget)?;
        self.note_timeout(Phase::SecondHalf, &second);
        self.results
            .append(&instance.name, params, Phase::SecondHalf, &second)?;

        self.totals
            .record_instance(full.metrics(), first.metrics(), second.metrics());
        println!("{}", self.totals.render());
        Ok(())
    }

    /// Import the tuple's instance; when that fails outside read-only mode,
    /// generate, export, and use the fresh instance instead.
    fn load_or_generate(&mut self, tuple: TupleIndices) -> Result<ProblemInstance> {
        let name = grid_instance_name(
            self.space.grid_size(tuple),
            self.space.obstacle_percent(tuple),
            self.space.agent_count(tuple),
            tuple.instance,
        );
        let path = self.config.instances_dir.join(&name);
        match ProblemInstance::import(&path) {
            Ok(instance) => {
                debug!(%name, "imported existing instance");
                Ok(instance)
            }
            Err(err) if self.config.read_only => Err(err),
            Err(import_err) => {
                debug!(%name, error = format!("{import_err:#}"), "import failed, generating");
                let instance = ProblemInstance::generate(
                    &name,
                    self.space.grid_size(tuple),
                    self.space.agent_count(tuple),
                    self.space.obstacle_count(tuple),
                    &mut self.rng,
                )?;
                instance.export(&self.config.instances_dir)?;
                Ok(instance)
            }
        }
    }

    fn note_timeout(&mut self, phase: Phase, outcome: &SolveOutcome) {
        if outcome.is_timeout()
            && let Some(slot) = phase.counter_slot()
        {
            self.counters[slot] += 1;
            debug!(%phase, count = self.counters[slot], "strategy timed out");
        }
    }

    fn pair_abandoned(&self) -> bool {
        !self.counters.is_empty()
            && self.counters.iter().sum::<u32>()
                == self.counters.len() as u32 * self.config.max_fail_count
    }

    fn write_checkpoint(&self, tuple: TupleIndices) -> Result<()> {
        self.checkpoint
            .write(&CheckpointRecord {
                indices: tuple,
                counters: self.counters.clone(),
            })
            .context("write checkpoint")
    }

    fn row_params(&self, tuple: TupleIndices) -> RowParams {
        RowParams {
            grid_size: self.space.grid_size(tuple),
            obstacle_percent: self.space.obstacle_percent(tuple),
            agent_count: self.space.agent_count(tuple),
            index: tuple.instance,
        }
    }
}
