//! Solver contract and a joint-configuration A* implementation.
//!
//! The harness talks to solvers only through [`Solver`]: an instance, a
//! [`Phase`] tag, and a time budget go in; a [`SolveOutcome`] comes out.
//! Exceeding the budget is an ordinary [`SolveOutcome::Timeout`] value, never
//! an error — the solver checks its own deadline and is never interrupted
//! from outside.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use tracing::debug;

use crate::grid::Coord;
use crate::instance::ProblemInstance;

/// Which solve of an instance's three-phase pipeline an invocation is.
///
/// `SingleAgent` tags the per-agent sub-solves used to derive middle
/// positions; it has no failure-counter slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Full,
    FirstHalf,
    SecondHalf,
    SingleAgent,
}

impl Phase {
    /// Number of phases that carry a failure counter.
    pub const COUNTED: usize = 3;

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Full => "full",
            Phase::FirstHalf => "first_half",
            Phase::SecondHalf => "second_half",
            Phase::SingleAgent => "single_agent",
        }
    }

    /// Failure-counter slot for this phase.
    pub fn counter_slot(self) -> Option<usize> {
        match self {
            Phase::Full => Some(0),
            Phase::FirstHalf => Some(1),
            Phase::SecondHalf => Some(2),
            Phase::SingleAgent => None,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Joint plan: one position sequence per agent, index-aligned with the
/// instance's agent list. All sequences share time step 0.
pub type Plan = Vec<Vec<Coord>>;

/// Counters reported by every solve, successful or not.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SolveMetrics {
    pub cost: u64,
    pub time_ms: u64,
    pub expanded: u64,
    pub generated: u64,
    pub open: u64,
}

/// Result of a solver invocation. Timeouts are values, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveOutcome {
    Solved { metrics: SolveMetrics, plan: Plan },
    Timeout { metrics: SolveMetrics },
}

impl SolveOutcome {
    pub fn metrics(&self) -> SolveMetrics {
        match self {
            SolveOutcome::Solved { metrics, .. } | SolveOutcome::Timeout { metrics } => *metrics,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, SolveOutcome::Timeout { .. })
    }

    pub fn plan(&self) -> Option<&Plan> {
        match self {
            SolveOutcome::Solved { plan, .. } => Some(plan),
            SolveOutcome::Timeout { .. } => None,
        }
    }
}

/// A search strategy the sweep can invoke.
pub trait Solver {
    /// Solve `instance` within `budget`.
    ///
    /// Errors signal a broken instance (missing heuristics, no solution);
    /// running out of time is reported through the outcome instead.
    fn solve(
        &mut self,
        instance: &ProblemInstance,
        phase: Phase,
        budget: Duration,
    ) -> Result<SolveOutcome>;
}

/// A* over joint agent configurations.
///
/// States are full position vectors; successors are the cartesian product of
/// per-agent moves filtered for vertex and edge collisions. Cost is
/// sum-of-costs: every move and off-goal wait costs 1, waiting at the goal
/// costs 0. The heuristic is the sum of per-agent BFS goal distances.
#[derive(Debug, Default)]
pub struct AStarSolver;

struct SearchNode {
    positions: Vec<Coord>,
    parent: Option<usize>,
}

impl Solver for AStarSolver {
    fn solve(
        &mut self,
        instance: &ProblemInstance,
        phase: Phase,
        budget: Duration,
    ) -> Result<SolveOutcome> {
        if instance.agents.is_empty() {
            bail!("instance {} has no agents", instance.name);
        }
        if !instance.has_heuristics() {
            bail!("goal-distance tables not computed for {}", instance.name);
        }

        let started = Instant::now();
        let start_positions: Vec<Coord> = instance
            .agents
            .iter()
            .map(|agent| agent.search_start())
            .collect();
        let Some(root_h) = heuristic_sum(instance, &start_positions) else {
            bail!("some agent of {} cannot reach its goal", instance.name);
        };

        let mut nodes = vec![SearchNode {
            positions: start_positions.clone(),
            parent: None,
        }];
        let mut best: HashMap<Vec<Coord>, u64> = HashMap::from([(start_positions, 0)]);
        // (f, g, node) — min-f ordering via Reverse.
        let mut open: BinaryHeap<Reverse<(u64, u64, usize)>> = BinaryHeap::new();
        open.push(Reverse((root_h, 0, 0)));

        let mut expanded: u64 = 0;
        let mut generated: u64 = 1;

        while let Some(Reverse((_, g, id))) = open.pop() {
            if started.elapsed() >= budget {
                debug!(instance = %instance.name, %phase, expanded, "solve timed out");
                return Ok(SolveOutcome::Timeout {
                    metrics: SolveMetrics {
                        cost: 0,
                        time_ms: started.elapsed().as_millis() as u64,
                        expanded,
                        generated,
                        open: open.len() as u64,
                    },
                });
            }

            let positions = nodes[id].positions.clone();
            if best.get(&positions).is_some_and(|known| *known < g) {
                continue; // stale heap entry
            }

            if at_goals(instance, &positions) {
                let plan = reconstruct_plan(instance, &nodes, id);
                let metrics = SolveMetrics {
                    cost: g,
                    time_ms: started.elapsed().as_millis() as u64,
                    expanded,
                    generated,
                    open: open.len() as u64,
                };
                debug!(instance = %instance.name, %phase, cost = g, expanded, "solved");
                return Ok(SolveOutcome::Solved { metrics, plan });
            }

            expanded += 1;
            for (next_positions, step_cost) in joint_moves(instance, &positions) {
                let next_g = g + step_cost;
                if best
                    .get(&next_positions)
                    .is_some_and(|known| *known <= next_g)
                {
                    continue;
                }
                let Some(h) = heuristic_sum(instance, &next_positions) else {
                    continue;
                };
                best.insert(next_positions.clone(), next_g);
                nodes.push(SearchNode {
                    positions: next_positions,
                    parent: Some(id),
                });
                open.push(Reverse((next_g + h, next_g, nodes.len() - 1)));
                generated += 1;
            }
        }

        bail!("instance {} has no collision-free solution", instance.name)
    }
}

fn at_goals(instance: &ProblemInstance, positions: &[Coord]) -> bool {
    instance
        .agents
        .iter()
        .zip(positions)
        .all(|(agent, position)| agent.goal == *position)
}

fn heuristic_sum(instance: &ProblemInstance, positions: &[Coord]) -> Option<u64> {
    let mut sum: u64 = 0;
    for (index, position) in positions.iter().enumerate() {
        let h = instance.heuristic(index, *position);
        if h == u32::MAX {
            return None;
        }
        sum += u64::from(h);
    }
    Some(sum)
}

/// All collision-free joint successor configurations with their step cost.
fn joint_moves(instance: &ProblemInstance, current: &[Coord]) -> Vec<(Vec<Coord>, u64)> {
    let mut results = Vec::new();
    let mut scratch = Vec::with_capacity(current.len());
    extend_moves(instance, current, 0, &mut scratch, &mut results);
    results
}

fn extend_moves(
    instance: &ProblemInstance,
    current: &[Coord],
    cost_so_far: u64,
    scratch: &mut Vec<Coord>,
    results: &mut Vec<(Vec<Coord>, u64)>,
) {
    let agent_index = scratch.len();
    if agent_index == current.len() {
        results.push((scratch.clone(), cost_so_far));
        return;
    }
    let agent = &instance.agents[agent_index];
    for next in instance.grid.moves(current[agent_index]) {
        // Vertex collision with an already-placed agent.
        if scratch.contains(&next) {
            continue;
        }
        // Edge swap: a placed agent moved from `next` into our current cell.
        let swaps = scratch
            .iter()
            .enumerate()
            .any(|(placed, position)| *position == current[agent_index] && current[placed] == next);
        if swaps {
            continue;
        }
        let step = u64::from(!(next == current[agent_index] && next == agent.goal));
        scratch.push(next);
        extend_moves(instance, current, cost_so_far + step, scratch, results);
        scratch.pop();
    }
}

/// Walk parents back to the root and split the joint states into per-agent
/// paths. Trailing goal-waits are trimmed per agent.
fn reconstruct_plan(instance: &ProblemInstance, nodes: &[SearchNode], goal_id: usize) -> Plan {
    let mut chain = Vec::new();
    let mut cursor = Some(goal_id);
    while let Some(id) = cursor {
        chain.push(id);
        cursor = nodes[id].parent;
    }
    chain.reverse();

    let mut plan: Plan = vec![Vec::with_capacity(chain.len()); instance.agents.len()];
    for id in chain {
        for (agent_index, position) in nodes[id].positions.iter().enumerate() {
            plan[agent_index].push(*position);
        }
    }
    for (agent_index, path) in plan.iter_mut().enumerate() {
        let goal = instance.agents[agent_index].goal;
        while path.len() >= 2 && path[path.len() - 1] == goal && path[path.len() - 2] == goal {
            path.pop();
        }
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Grid;
    use crate::instance::Agent;

    const BUDGET: Duration = Duration::from_secs(10);

    fn instance_with(agents: Vec<Agent>) -> ProblemInstance {
        let mut instance = ProblemInstance::new("test", Grid::open(5, 5), agents);
        instance.precompute_heuristics();
        instance
    }

    fn solve(instance: &ProblemInstance) -> SolveOutcome {
        AStarSolver
            .solve(instance, Phase::Full, BUDGET)
            .expect("solve")
    }

    #[test]
    fn single_agent_shortest_path() {
        let instance = instance_with(vec![Agent::new(0, Coord::new(0, 0), Coord::new(3, 0))]);
        let SolveOutcome::Solved { metrics, plan } = solve(&instance) else {
            panic!("expected a solution");
        };
        assert_eq!(metrics.cost, 3);
        assert_eq!(plan[0].first(), Some(&Coord::new(0, 0)));
        assert_eq!(plan[0].last(), Some(&Coord::new(3, 0)));
        assert_eq!(plan[0].len(), 4);
    }

    #[test]
    fn crossing_agents_produce_collision_free_plan() {
        let instance = instance_with(vec![
            Agent::new(0, Coord::new(0, 2), Coord::new(4, 2)),
            Agent::new(1, Coord::new(2, 0), Coord::new(2, 4)),
        ]);
        let SolveOutcome::Solved { plan, .. } = solve(&instance) else {
            panic!("expected a solution");
        };

        let makespan = plan.iter().map(Vec::len).max().expect("non-empty plan");
        for step in 0..makespan {
            let first = position_at(&plan[0], step);
            let second = position_at(&plan[1], step);
            assert_ne!(first, second, "vertex collision at step {step}");
            if step > 0 {
                let swapped = first == position_at(&plan[1], step - 1)
                    && second == position_at(&plan[0], step - 1);
                assert!(!swapped, "edge collision at step {step}");
            }
        }
    }

    #[test]
    fn alternate_start_moves_the_search_origin() {
        let mut agent = Agent::new(0, Coord::new(0, 0), Coord::new(4, 4));
        agent.alternate_start = Some(Coord::new(4, 0));
        let instance = instance_with(vec![agent]);
        let SolveOutcome::Solved { metrics, plan } = solve(&instance) else {
            panic!("expected a solution");
        };
        assert_eq!(plan[0][0], Coord::new(4, 0));
        assert_eq!(metrics.cost, 4);
    }

    #[test]
    fn zero_budget_times_out() {
        let instance = instance_with(vec![Agent::new(0, Coord::new(0, 0), Coord::new(4, 4))]);
        let outcome = AStarSolver
            .solve(&instance, Phase::Full, Duration::ZERO)
            .expect("solve");
        assert!(outcome.is_timeout());
        assert_eq!(outcome.metrics().cost, 0);
    }

    #[test]
    fn missing_heuristics_is_an_error() {
        let instance = ProblemInstance::new(
            "bare",
            Grid::open(3, 3),
            vec![Agent::new(0, Coord::new(0, 0), Coord::new(2, 2))],
        );
        let result = AStarSolver.solve(&instance, Phase::Full, BUDGET);
        assert!(result.is_err());
    }

    #[test]
    fn unreachable_goal_is_an_error_not_a_timeout() {
        let mut grid = Grid::open(3, 3);
        grid.set_obstacle(Coord::new(1, 0));
        grid.set_obstacle(Coord::new(1, 1));
        grid.set_obstacle(Coord::new(1, 2));
        let mut instance = ProblemInstance::new(
            "walled",
            grid,
            vec![Agent::new(0, Coord::new(0, 0), Coord::new(2, 0))],
        );
        instance.precompute_heuristics();
        assert!(AStarSolver.solve(&instance, Phase::Full, BUDGET).is_err());
    }

    fn position_at(path: &[Coord], step: usize) -> Coord {
        *path.get(step).unwrap_or_else(|| path.last().expect("path"))
    }
}
