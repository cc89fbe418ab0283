//! Sweep orchestration for bidirectional MAPF decomposition experiments.
//!
//! A sweep walks a 4-dimensional parameter space (grid size, obstacle
//! density, agent count, instance index) and, for every tuple, solves the
//! instance three ways: once whole, then as a first-half and a second-half
//! sub-problem split at a middle configuration. The modules separate the
//! stateful phases:
//!
//! - **[`cursor`]**: linearized enumeration of the parameter space.
//! - **[`middle`]** / **[`decompose`]**: middle-state resolution and pure
//!   sub-instance derivation.
//! - **[`checkpoint`]** / **[`metrics`]** / **[`results`]**: persistence of
//!   progress, running totals, and per-phase result rows.
//! - **[`driver`]**: sequences everything, one tuple at a time.

pub mod checkpoint;
pub mod config;
pub mod cursor;
pub mod decompose;
pub mod driver;
pub mod metrics;
pub mod middle;
pub mod results;
