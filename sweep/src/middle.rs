//! Middle-state resolution: the per-agent configuration an instance is
//! split at.
//!
//! Two mutually exclusive sources, fixed for a whole sweep:
//!
//! - **Automated**: each agent's single-agent shortest path is solved
//!   independently (no collision avoidance) and its midpoint taken.
//! - **Full-solve**: the joint plan from the full solve supplies every
//!   agent's position at half the makespan.
//!
//! Either way the result covers every agent index; a missing midpoint is a
//! hard failure for the instance, never silently defaulted.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::debug;

use mapf::grid::Coord;
use mapf::instance::ProblemInstance;
use mapf::search::{Phase, Plan, Solver};

/// Where the middle state comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MiddleSource {
    Automated,
    FullSolve,
}

/// One coordinate per agent index of the source instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiddleState(Vec<Coord>);

impl MiddleState {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, agent_index: usize) -> Coord {
        self.0[agent_index]
    }

    pub fn positions(&self) -> &[Coord] {
        &self.0
    }

    /// Render as `|(x,y)|(x,y)|...` for the per-instance console block.
    pub fn render(&self) -> String {
        let mut out = String::from("|");
        for position in &self.0 {
            out.push_str(&format!("{position}|"));
        }
        out
    }
}

/// Resolve the middle state by solving each agent's single-agent problem and
/// taking the coordinate at `floor(len / 2)` of its path.
pub fn resolve_automated<S: Solver>(
    solver: &mut S,
    instance: &ProblemInstance,
    budget: Duration,
) -> Result<MiddleState> {
    let mut midpoints = Vec::with_capacity(instance.agents.len());
    for agent_index in 0..instance.agents.len() {
        let single = instance.single_agent_instance(agent_index)?;
        let outcome = solver
            .solve(&single, Phase::SingleAgent, budget)
            .with_context(|| format!("single-agent solve for agent {agent_index}"))?;
        let Some(plan) = outcome.plan() else {
            bail!(
                "no midpoint for agent {} of {}: single-agent solve timed out",
                agent_index,
                instance.name
            );
        };
        let path = plan
            .first()
            .filter(|path| !path.is_empty())
            .with_context(|| format!("empty single-agent path for agent {agent_index}"))?;
        midpoints.push(path[path.len() / 2]);
    }
    debug!(instance = %instance.name, agents = midpoints.len(), "middle state resolved");
    Ok(MiddleState(midpoints))
}

/// Extract the middle state from a joint plan: every agent's position at
/// time step `floor(makespan / 2)`. Agents whose paths end earlier are
/// already parked at their goal.
pub fn from_joint_plan(instance: &ProblemInstance, plan: &Plan) -> Result<MiddleState> {
    if plan.len() != instance.agents.len() {
        bail!(
            "joint plan covers {} agents, instance {} has {}",
            plan.len(),
            instance.name,
            instance.agents.len()
        );
    }
    let makespan = plan
        .iter()
        .map(Vec::len)
        .max()
        .context("joint plan is empty")?
        .saturating_sub(1);
    let step = makespan / 2;
    let mut midpoints = Vec::with_capacity(plan.len());
    for (agent_index, path) in plan.iter().enumerate() {
        if path.is_empty() {
            bail!("joint plan has no positions for agent {agent_index}");
        }
        midpoints.push(path[step.min(path.len() - 1)]);
    }
    Ok(MiddleState(midpoints))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapf::grid::Grid;
    use mapf::instance::Agent;
    use mapf::test_support::{ScriptedSolver, solved, straight_path, timed_out};

    const BUDGET: Duration = Duration::from_secs(1);

    fn two_agent_instance() -> ProblemInstance {
        let agents = vec![
            Agent::new(0, Coord::new(0, 0), Coord::new(4, 0)),
            Agent::new(1, Coord::new(0, 1), Coord::new(2, 1)),
        ];
        let mut instance = ProblemInstance::new("Instance-5-0-2-0", Grid::open(5, 5), agents);
        instance.precompute_heuristics();
        instance
    }

    #[test]
    fn automated_midpoints_cover_every_agent() {
        let instance = two_agent_instance();
        let mut solver = ScriptedSolver::new(vec![
            solved(4, vec![straight_path(0, 0, 4)]),
            solved(2, vec![straight_path(1, 0, 2)]),
        ]);
        let middle = resolve_automated(&mut solver, &instance, BUDGET).expect("resolve");
        assert_eq!(middle.len(), instance.agents.len());
        // 5-coordinate path: midpoint index 2; 3-coordinate path: index 1
        assert_eq!(middle.get(0), Coord::new(2, 0));
        assert_eq!(middle.get(1), Coord::new(1, 1));

        let phases: Vec<Phase> = solver
            .invocations()
            .iter()
            .map(|invocation| invocation.phase)
            .collect();
        assert_eq!(phases, vec![Phase::SingleAgent, Phase::SingleAgent]);
    }

    #[test]
    fn automated_timeout_is_a_hard_failure() {
        let instance = two_agent_instance();
        let mut solver =
            ScriptedSolver::new(vec![solved(4, vec![straight_path(0, 0, 4)]), timed_out(10)]);
        let err = resolve_automated(&mut solver, &instance, BUDGET).expect_err("must fail");
        assert!(err.to_string().contains("agent 1"));
    }

    #[test]
    fn joint_plan_midpoint_clamps_short_paths() {
        let instance = two_agent_instance();
        // makespan 4 (5 steps for agent 0), agent 1 parks after 2 moves
        let plan = vec![straight_path(0, 0, 4), straight_path(1, 0, 2)];
        let middle = from_joint_plan(&instance, &plan).expect("extract");
        assert_eq!(middle.len(), 2);
        assert_eq!(middle.get(0), Coord::new(2, 0));
        // step 2 is this path's last coordinate
        assert_eq!(middle.get(1), Coord::new(2, 1));
    }

    #[test]
    fn joint_plan_must_cover_all_agents() {
        let instance = two_agent_instance();
        let plan = vec![straight_path(0, 0, 4)];
        assert!(from_joint_plan(&instance, &plan).is_err());
    }
}
