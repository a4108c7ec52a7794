pub mod alignment;
pub mod driver;
pub mod model;
pub mod objective;
pub mod pool;
pub mod relation;
pub mod variables;

pub use driver::SolverDriver;
pub use pool::{PoolStatus, Solution, SolutionPool};

use crate::config::Config;
use crate::error::Result;
use crate::observations::ObservationTable;
use crate::session::SolverSession;

/// Validates the configuration and runs the two-stage solve for the whole pool
pub fn solve_pool(
    table: &ObservationTable,
    config: &Config,
    session: &SolverSession,
) -> Result<SolutionPool> {
    config.validate()?;
    SolverDriver::new(session, config).solve_pool(table)
}
