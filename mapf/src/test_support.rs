//! Test-only scripted solver for driving the harness without real search.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, bail};

use crate::grid::Coord;
use crate::instance::ProblemInstance;
use crate::search::{Phase, Plan, SolveMetrics, SolveOutcome, Solver};

/// One recorded solver invocation: instance name and phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub instance: String,
    pub phase: Phase,
}

/// Solver that replays queued outcomes in order and records invocations.
#[derive(Debug, Clone)]
pub struct ScriptedSolver {
    script: Arc<Mutex<VecDeque<SolveOutcome>>>,
    invocations: Arc<Mutex<Vec<Invocation>>>,
}

impl ScriptedSolver {
    pub fn new(outcomes: Vec<SolveOutcome>) -> Self {
        Self {
            script: Arc::new(Mutex::new(outcomes.into())),
            invocations: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().expect("invocations lock").clone()
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().expect("script lock").len()
    }
}

impl Solver for ScriptedSolver {
    fn solve(
        &mut self,
        instance: &ProblemInstance,
        phase: Phase,
        _budget: Duration,
    ) -> Result<SolveOutcome> {
        self.invocations
            .lock()
            .expect("invocations lock")
            .push(Invocation {
                instance: instance.name.clone(),
                phase,
            });
        let Some(outcome) = self.script.lock().expect("script lock").pop_front() else {
            bail!("scripted solver exhausted at {} {}", instance.name, phase);
        };
        Ok(outcome)
    }
}

/// A solved outcome with the given cost and plan.
pub fn solved(cost: u64, plan: Plan) -> SolveOutcome {
    SolveOutcome::Solved {
        metrics: SolveMetrics {
            cost,
            time_ms: 1,
            expanded: cost,
            generated: cost * 2,
            open: 1,
        },
        plan,
    }
}

/// A timeout outcome carrying only elapsed time.
pub fn timed_out(time_ms: u64) -> SolveOutcome {
    SolveOutcome::Timeout {
        metrics: SolveMetrics {
            cost: 0,
            time_ms,
            expanded: 0,
            generated: 0,
            open: 0,
        },
    }
}

/// Straight horizontal path from `(x0, y)` to `(x1, y)` inclusive.
pub fn straight_path(y: i32, x0: i32, x1: i32) -> Vec<Coord> {
    let step = if x1 >= x0 { 1 } else { -1 };
    let mut path = Vec::new();
    let mut x = x0;
    loop {
        path.push(Coord::new(x, y));
        if x == x1 {
            break;
        }
        x += step;
    }
    path
}
