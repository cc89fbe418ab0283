//! Linearized enumeration of the 4-D sweep parameter space.
//!
//! Order is fixed: grid size, then obstacle density, then agent count, then
//! instance index. A tuple maps to a single linear index, so resuming after
//! a restart is "skip to index N" rather than loop-variable surgery.

use crate::config::SweepConfig;

/// Index tuple into the four sweep dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TupleIndices {
    pub grid: usize,
    pub obstacle: usize,
    pub agents: usize,
    pub instance: usize,
}

impl TupleIndices {
    pub fn new(grid: usize, obstacle: usize, agents: usize, instance: usize) -> Self {
        Self {
            grid,
            obstacle,
            agents,
            instance,
        }
    }
}

/// The cartesian product the sweep walks, with value lookups per dimension.
#[derive(Debug, Clone)]
pub struct ParamSpace {
    grid_sizes: Vec<usize>,
    obstacle_percents: Vec<u32>,
    agent_counts: Vec<usize>,
    instances_per_setting: usize,
}

impl ParamSpace {
    pub fn from_config(config: &SweepConfig) -> Self {
        Self {
            grid_sizes: config.grid_sizes.clone(),
            obstacle_percents: config.obstacle_percents.clone(),
            agent_counts: config.agent_counts.clone(),
            instances_per_setting: config.instances_per_setting,
        }
    }

    pub fn total(&self) -> usize {
        self.grid_sizes.len()
            * self.obstacle_percents.len()
            * self.agent_counts.len()
            * self.instances_per_setting
    }

    /// Tuple at `linear`, or `None` past the end of the space.
    pub fn tuple(&self, linear: usize) -> Option<TupleIndices> {
        if linear >= self.total() {
            return None;
        }
        let instance = linear % self.instances_per_setting;
        let rest = linear / self.instances_per_setting;
        let agents = rest % self.agent_counts.len();
        let rest = rest / self.agent_counts.len();
        let obstacle = rest % self.obstacle_percents.len();
        let grid = rest / self.obstacle_percents.len();
        Some(TupleIndices {
            grid,
            obstacle,
            agents,
            instance,
        })
    }

    pub fn linear(&self, tuple: TupleIndices) -> usize {
        ((tuple.grid * self.obstacle_percents.len() + tuple.obstacle) * self.agent_counts.len()
            + tuple.agents)
            * self.instances_per_setting
            + tuple.instance
    }

    pub fn grid_size(&self, tuple: TupleIndices) -> usize {
        self.grid_sizes[tuple.grid]
    }

    pub fn obstacle_percent(&self, tuple: TupleIndices) -> u32 {
        self.obstacle_percents[tuple.obstacle]
    }

    pub fn agent_count(&self, tuple: TupleIndices) -> usize {
        self.agent_counts[tuple.agents]
    }

    /// Obstacles to place when generating this tuple's instance.
    pub fn obstacle_count(&self, tuple: TupleIndices) -> usize {
        let cells = self.grid_size(tuple) * self.grid_size(tuple);
        cells * self.obstacle_percent(tuple) as usize / 100
    }

    /// False when the grid cannot hold the agents next to its obstacles:
    /// `gridSize^2 * (1 - density) < agentCount`.
    pub fn feasible(&self, tuple: TupleIndices) -> bool {
        let cells = (self.grid_size(tuple) * self.grid_size(tuple)) as u64;
        let free_share = cells * (100 - self.obstacle_percent(tuple)) as u64;
        free_share >= self.agent_count(tuple) as u64 * 100
    }

    /// The (grid, obstacle) pair the tuple belongs to; failure counters are
    /// scoped to these pairs.
    pub fn pair(&self, tuple: TupleIndices) -> (usize, usize) {
        (tuple.grid, tuple.obstacle)
    }

    /// First linear index of the pair following the one `linear` is in.
    /// Lands past the end for the last pair.
    pub fn next_pair_start(&self, linear: usize) -> usize {
        let per_pair = self.agent_counts.len() * self.instances_per_setting;
        (linear / per_pair + 1) * per_pair
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn space() -> ParamSpace {
        ParamSpace {
            grid_sizes: vec![5, 10],
            obstacle_percents: vec![10, 80],
            agent_counts: vec![3, 10],
            instances_per_setting: 2,
        }
    }

    #[test]
    fn linear_tuple_round_trips_in_nested_order() {
        let space = space();
        assert_eq!(space.total(), 16);
        let mut last = None;
        for linear in 0..space.total() {
            let tuple = space.tuple(linear).expect("in range");
            assert_eq!(space.linear(tuple), linear);
            last = Some(tuple);
        }
        assert_eq!(space.tuple(space.total()), None);
        // innermost dimension is the instance index
        assert_eq!(space.tuple(1), Some(TupleIndices::new(0, 0, 0, 1)));
        assert_eq!(space.tuple(2), Some(TupleIndices::new(0, 0, 1, 0)));
        // outermost is the grid size
        assert_eq!(last, Some(TupleIndices::new(1, 1, 1, 1)));
    }

    #[test]
    fn feasibility_filters_crowded_settings() {
        let space = space();
        // 5x5 at 80% leaves 5 free cells: too small for 10 agents.
        let crowded = TupleIndices::new(0, 1, 1, 0);
        assert!(!space.feasible(crowded));
        // but fine for 3 agents
        assert!(space.feasible(TupleIndices::new(0, 1, 0, 0)));
        assert!(space.feasible(TupleIndices::new(1, 0, 1, 0)));
    }

    #[test]
    fn next_pair_start_skips_remaining_agent_and_instance_combos() {
        let space = space();
        // pair (0,0) covers linear 0..4
        assert_eq!(space.next_pair_start(0), 4);
        assert_eq!(space.next_pair_start(3), 4);
        assert_eq!(space.next_pair_start(4), 8);
        // last pair runs off the end
        assert_eq!(space.next_pair_start(15), 16);
    }

    #[test]
    fn obstacle_count_follows_percentage() {
        let space = space();
        assert_eq!(space.obstacle_count(TupleIndices::new(0, 1, 0, 0)), 20);
        assert_eq!(space.obstacle_count(TupleIndices::new(1, 0, 0, 0)), 10);
    }
}
