pub mod config;
pub mod constants;
pub mod error;
pub mod export;
pub mod observations;
pub mod optimize;
pub mod session;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::{CnAlignError, Result};
pub use export::{ResultTable, RunSummary};
pub use observations::{ObservationTable, read_observations};
pub use optimize::{PoolStatus, Solution, SolutionPool, solve_pool};
pub use session::SolverSession;
