//! Pure derivation of the two half-instances from a source instance and a
//! middle state. The source is never mutated; both halves are clones with
//! rewired agents and freshly computed goal-distance tables.

use anyhow::{Result, bail};

use mapf::instance::ProblemInstance;

use crate::middle::MiddleState;

/// How the second half is searched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Start at the true goal and search backward to the middle.
    Reverse,
    /// Start at the middle and search forward to the true goal.
    Forward,
}

/// First half: original starts, goals replaced by the middle state.
pub fn first_half(source: &ProblemInstance, middle: &MiddleState) -> Result<ProblemInstance> {
    check_coverage(source, middle)?;
    let mut half = source.clone();
    half.name = format!("{}-first", source.name);
    for (agent_index, agent) in half.agents.iter_mut().enumerate() {
        agent.goal = middle.get(agent_index);
        agent.alternate_start = None;
    }
    // goal-dependent tables are stale after the rewiring
    half.precompute_heuristics();
    Ok(half)
}

/// Second half, from the middle state to the true goal.
///
/// Reverse direction searches from the true goal (as alternate start) back
/// to the middle; forward direction searches from the middle (as alternate
/// start) on to the untouched true goal.
pub fn second_half(
    source: &ProblemInstance,
    middle: &MiddleState,
    direction: Direction,
) -> Result<ProblemInstance> {
    check_coverage(source, middle)?;
    let mut half = source.clone();
    half.name = format!("{}-second", source.name);
    for (agent_index, agent) in half.agents.iter_mut().enumerate() {
        match direction {
            Direction::Reverse => {
                agent.alternate_start = Some(agent.goal);
                agent.goal = middle.get(agent_index);
            }
            Direction::Forward => {
                agent.alternate_start = Some(middle.get(agent_index));
            }
        }
    }
    half.precompute_heuristics();
    Ok(half)
}

fn check_coverage(source: &ProblemInstance, middle: &MiddleState) -> Result<()> {
    if middle.len() != source.agents.len() {
        bail!(
            "middle state covers {} agents, instance {} has {}",
            middle.len(),
            source.name,
            source.agents.len()
        );
    }
    Ok(())
}
