//! Problem instances: agents on a grid, plus generation and import/export.
//!
//! Instances are value types. Derived instances (for decomposed solves) are
//! produced by cloning and rewiring agents; the goal-distance tables carried
//! by an instance are goal-dependent and must be rebuilt via
//! [`ProblemInstance::precompute_heuristics`] after any such rewiring.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::grid::{Coord, Grid};

const FORMAT_HEADER: &str = "mapf-instance v1";
const GENERATION_ATTEMPTS: usize = 100;

/// One agent: where it starts, where it must end up.
///
/// `alternate_start` carries a second position into a decomposed solve: the
/// search begins there instead of at `start` when it is set. The true
/// `start` is kept untouched so the source assignment stays recoverable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    pub id: usize,
    pub start: Coord,
    pub goal: Coord,
    pub alternate_start: Option<Coord>,
}

impl Agent {
    pub fn new(id: usize, start: Coord, goal: Coord) -> Self {
        Self {
            id,
            start,
            goal,
            alternate_start: None,
        }
    }

    /// Position the search actually begins from.
    pub fn search_start(&self) -> Coord {
        self.alternate_start.unwrap_or(self.start)
    }
}

/// A MAPF problem: a grid and an ordered list of agents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemInstance {
    pub name: String,
    pub grid: Grid,
    pub agents: Vec<Agent>,
    /// Per-agent BFS distance-to-goal over the grid (row-major), rebuilt by
    /// [`Self::precompute_heuristics`]. Empty until computed.
    heuristics: Vec<Vec<u32>>,
}

impl ProblemInstance {
    pub fn new(name: impl Into<String>, grid: Grid, agents: Vec<Agent>) -> Self {
        Self {
            name: name.into(),
            grid,
            agents,
            heuristics: Vec::new(),
        }
    }

    /// Rebuild the per-agent goal-distance tables.
    ///
    /// Required before solving, and again after any mutation of agent goals
    /// or search starts (the tables are goal-dependent).
    pub fn precompute_heuristics(&mut self) {
        self.heuristics = self
            .agents
            .iter()
            .map(|agent| distances_from(&self.grid, agent.goal))
            .collect();
    }

    pub fn has_heuristics(&self) -> bool {
        self.heuristics.len() == self.agents.len()
    }

    /// BFS distance from `coord` to agent `agent_index`'s goal.
    ///
    /// `u32::MAX` marks unreachable cells. Tables must have been computed.
    pub fn heuristic(&self, agent_index: usize, coord: Coord) -> u32 {
        self.heuristics[agent_index][self.grid.index(coord)]
    }

    /// Extract agent `agent_index` as a standalone single-agent instance.
    pub fn single_agent_instance(&self, agent_index: usize) -> Result<ProblemInstance> {
        let Some(agent) = self.agents.get(agent_index).copied() else {
            bail!("instance {} has no agent {}", self.name, agent_index);
        };
        let mut single = ProblemInstance::new(
            format!("{}-agent-{}", self.name, agent_index),
            self.grid.clone(),
            vec![agent],
        );
        single.precompute_heuristics();
        Ok(single)
    }

    /// Generate a random solvable instance on a `grid_size` square grid.
    ///
    /// Obstacles and distinct start/goal cells are sampled from `rng`;
    /// placements where some agent cannot reach its goal are re-rolled.
    pub fn generate(
        name: impl Into<String>,
        grid_size: usize,
        agent_count: usize,
        obstacle_count: usize,
        rng: &mut impl Rng,
    ) -> Result<ProblemInstance> {
        let name = name.into();
        if agent_count == 0 {
            bail!("instance {} needs at least one agent", name);
        }
        if grid_size * grid_size < obstacle_count + agent_count {
            bail!("grid {0}x{0} cannot fit {1} obstacles and {2} agents", grid_size, obstacle_count, agent_count);
        }

        for _ in 0..GENERATION_ATTEMPTS {
            let mut grid = Grid::open(grid_size, grid_size);
            let mut cells: Vec<Coord> = grid.free_coords();
            cells.shuffle(rng);
            for obstacle in cells.iter().take(obstacle_count) {
                grid.set_obstacle(*obstacle);
            }

            let free = grid.free_coords();
            if free.len() < agent_count {
                continue;
            }
            let starts: Vec<Coord> = free.choose_multiple(rng, agent_count).copied().collect();
            let goals: Vec<Coord> = free.choose_multiple(rng, agent_count).copied().collect();

            let agents: Vec<Agent> = starts
                .iter()
                .zip(&goals)
                .enumerate()
                .map(|(id, (start, goal))| Agent::new(id, *start, *goal))
                .collect();

            let reachable = agents.iter().all(|agent| {
                distances_from(&grid, agent.goal)[grid.index(agent.start)] != u32::MAX
            });
            if !reachable {
                continue;
            }

            let mut instance = ProblemInstance::new(name.clone(), grid, agents);
            instance.precompute_heuristics();
            return Ok(instance);
        }
        bail!(
            "gave up generating a solvable {0}x{0} instance with {1} agents after {2} attempts",
            grid_size,
            agent_count,
            GENERATION_ATTEMPTS
        )
    }

    /// Write the instance to `dir` under its own name.
    pub fn export(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
        let path = dir.join(&self.name);
        let mut contents = String::new();
        contents.push_str(FORMAT_HEADER);
        contents.push('\n');
        contents.push_str(&format!("{} {}\n", self.grid.width(), self.grid.height()));
        contents.push_str(&self.grid.render());
        contents.push_str(&format!("agents {}\n", self.agents.len()));
        for agent in &self.agents {
            contents.push_str(&format!(
                "{} {} {} {} {}\n",
                agent.id, agent.start.x, agent.start.y, agent.goal.x, agent.goal.y
            ));
        }
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }

    /// Import an instance file written by [`Self::export`].
    ///
    /// The instance takes its name from the file name; goal-distance tables
    /// are computed before returning.
    pub fn import(path: &Path) -> Result<ProblemInstance> {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .with_context(|| format!("instance path {} has no file name", path.display()))?
            .to_string();
        let contents =
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        parse_instance(name, &contents).with_context(|| format!("parse {}", path.display()))
    }
}

/// Name for a generated grid instance: `Instance-<gs>-<obs%>-<agents>-<idx>`.
pub fn grid_instance_name(
    grid_size: usize,
    obstacle_percent: u32,
    agent_count: usize,
    index: usize,
) -> String {
    format!("Instance-{grid_size}-{obstacle_percent}-{agent_count}-{index}")
}

/// Name for a map-driven instance: `<mapBase>-<agents>-<idx>`.
pub fn map_instance_name(map_base: &str, agent_count: usize, index: usize) -> String {
    format!("{map_base}-{agent_count}-{index}")
}

fn parse_instance(name: String, contents: &str) -> Result<ProblemInstance> {
    let mut lines = contents.lines();
    let header = lines.next().context("missing header line")?;
    if header != FORMAT_HEADER {
        bail!("unexpected header {:?}", header);
    }

    let size_line = lines.next().context("missing size line")?;
    let mut size_parts = size_line.split_whitespace();
    let width: usize = size_parts
        .next()
        .context("missing width")?
        .parse()
        .context("parse width")?;
    let height: usize = size_parts
        .next()
        .context("missing height")?
        .parse()
        .context("parse height")?;

    let rows: Vec<&str> = lines.by_ref().take(height).collect();
    let grid = Grid::parse(width, height, &rows)?;

    let agents_line = lines.next().context("missing agents line")?;
    let agent_count: usize = agents_line
        .strip_prefix("agents ")
        .with_context(|| format!("malformed agents line {:?}", agents_line))?
        .parse()
        .context("parse agent count")?;

    let mut agents = Vec::with_capacity(agent_count);
    for index in 0..agent_count {
        let line = lines
            .next()
            .with_context(|| format!("missing agent line {}", index))?;
        let fields: Vec<i32> = line
            .split_whitespace()
            .map(|field| field.parse::<i32>().with_context(|| format!("agent line {:?}", line)))
            .collect::<Result<_>>()?;
        if fields.len() != 5 {
            bail!("agent line {:?} must have 5 fields", line);
        }
        let agent = Agent::new(
            fields[0] as usize,
            Coord::new(fields[1], fields[2]),
            Coord::new(fields[3], fields[4]),
        );
        if !grid.is_free(agent.start) || !grid.is_free(agent.goal) {
            bail!("agent {} placed on an obstacle or out of bounds", agent.id);
        }
        agents.push(agent);
    }

    let mut instance = ProblemInstance::new(name, grid, agents);
    instance.precompute_heuristics();
    Ok(instance)
}

/// BFS distances from `from` to every cell; `u32::MAX` where unreachable.
fn distances_from(grid: &Grid, from: Coord) -> Vec<u32> {
    let mut distances = vec![u32::MAX; grid.cells()];
    if !grid.is_free(from) {
        return distances;
    }
    distances[grid.index(from)] = 0;
    let mut queue = VecDeque::from([from]);
    while let Some(current) = queue.pop_front() {
        let next_distance = distances[grid.index(current)] + 1;
        for neighbor in grid.neighbors(current) {
            let slot = &mut distances[grid.index(neighbor)];
            if *slot == u32::MAX {
                *slot = next_distance;
                queue.push_back(neighbor);
            }
        }
    }
    distances
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn sample_instance() -> ProblemInstance {
        let mut grid = Grid::open(4, 4);
        grid.set_obstacle(Coord::new(1, 1));
        let agents = vec![
            Agent::new(0, Coord::new(0, 0), Coord::new(3, 3)),
            Agent::new(1, Coord::new(3, 0), Coord::new(0, 3)),
        ];
        let mut instance = ProblemInstance::new("Instance-4-6-2-0", grid, agents);
        instance.precompute_heuristics();
        instance
    }

    #[test]
    fn heuristic_is_goal_distance() {
        let instance = sample_instance();
        assert_eq!(instance.heuristic(0, Coord::new(3, 3)), 0);
        assert_eq!(instance.heuristic(0, Coord::new(3, 2)), 1);
        // Walks around the obstacle at (1,1).
        assert_eq!(instance.heuristic(0, Coord::new(0, 0)), 6);
    }

    #[test]
    fn search_start_prefers_alternate() {
        let mut agent = Agent::new(0, Coord::new(0, 0), Coord::new(1, 1));
        assert_eq!(agent.search_start(), Coord::new(0, 0));
        agent.alternate_start = Some(Coord::new(2, 2));
        assert_eq!(agent.search_start(), Coord::new(2, 2));
    }

    #[test]
    fn generated_instances_are_reachable_and_named() {
        let mut rng = StdRng::seed_from_u64(7);
        let name = grid_instance_name(8, 20, 3, 0);
        let instance =
            ProblemInstance::generate(&name, 8, 3, 12, &mut rng).expect("generate");
        assert_eq!(instance.name, "Instance-8-20-3-0");
        assert_eq!(instance.agents.len(), 3);
        assert!(instance.has_heuristics());
        for agent in &instance.agents {
            assert_ne!(
                instance.heuristic(agent.id, agent.start),
                u32::MAX,
                "agent {} cannot reach its goal",
                agent.id
            );
        }
    }

    #[test]
    fn export_import_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let instance = sample_instance();
        let path = instance.export(temp.path()).expect("export");
        let imported = ProblemInstance::import(&path).expect("import");
        assert_eq!(imported, instance);
    }

    #[test]
    fn import_rejects_agent_on_obstacle() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("Instance-2-0-1-0");
        fs::write(
            &path,
            "mapf-instance v1\n2 2\n.@\n..\nagents 1\n0 0 0 1 0\n",
        )
        .expect("write");
        assert!(ProblemInstance::import(&path).is_err());
    }

    #[test]
    fn single_agent_extraction_keeps_assignment() {
        let instance = sample_instance();
        let single = instance.single_agent_instance(1).expect("extract");
        assert_eq!(single.agents.len(), 1);
        assert_eq!(single.agents[0].start, Coord::new(3, 0));
        assert_eq!(single.agents[0].goal, Coord::new(0, 3));
        assert!(single.has_heuristics());
    }

    #[test]
    fn naming_schemes_are_deterministic() {
        assert_eq!(grid_instance_name(10, 15, 4, 2), "Instance-10-15-4-2");
        assert_eq!(map_instance_name("den502d", 8, 1), "den502d-8-1");
    }
}
