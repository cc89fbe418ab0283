//! Multi-agent pathfinding (MAPF) problem model and solver.
//!
//! This crate owns everything the sweep harness treats as a collaborator:
//!
//! - **[`grid`]**: occupancy grid and coordinate type.
//! - **[`instance`]**: problem instances (agents, generation, import/export,
//!   deterministic naming, goal-distance precomputation).
//! - **[`search`]**: the [`search::Solver`] contract and a joint A*
//!   implementation with an in-band time budget.
//!
//! The harness never reaches past these seams: it decomposes instances and
//! sequences solves, but the search itself lives here.

pub mod grid;
pub mod instance;
pub mod logging;
pub mod search;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
