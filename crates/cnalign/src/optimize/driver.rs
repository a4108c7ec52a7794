use std::time::{Duration, Instant};

use good_lp::{ResolutionError, SolutionStatus, SolverModel, highs};
use strum_macros::Display;

use crate::config::Config;
use crate::error::{CnAlignError, Result};
use crate::observations::ObservationTable;
use crate::optimize::model::{Formulation, PoolCut};
use crate::optimize::pool::{PoolStatus, Solution, SolutionPool};
use crate::session::SolverSession;

/// HiGHS stopped at a limit without a primal feasible point
const NO_INCUMBENT: &str = "NoSolutionFound";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
enum Stage {
    /// maximise Σ mb·allmatch
    Coverage,
    /// minimise the weighted error with coverage held at its optimum
    Error,
}

/// Solver time shared by every stage of every rank
#[derive(Debug, Clone, Copy)]
struct TimeBudget {
    deadline: Instant,
}

impl TimeBudget {
    fn start(limit: Duration) -> Self {
        Self {
            deadline: Instant::now() + limit,
        }
    }

    fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    fn is_spent(&self) -> bool {
        self.remaining().is_zero()
    }
}

/// How a single stage ended
#[derive(Debug)]
enum StageEnd<S> {
    /// optimal, or within the requested MIP gap
    Solved(S),
    /// stopped at the time limit holding a feasible incumbent
    Incumbent(S),
    /// stopped at the time limit before any feasible point
    Unfinished,
}

impl<S> StageEnd<S> {
    fn map<T>(self, f: impl FnOnce(S) -> T) -> StageEnd<T> {
        match self {
            StageEnd::Solved(s) => StageEnd::Solved(f(s)),
            StageEnd::Incumbent(s) => StageEnd::Incumbent(f(s)),
            StageEnd::Unfinished => StageEnd::Unfinished,
        }
    }
}

#[derive(Debug)]
struct RankOutcome {
    solution: Solution,
    suboptimal: bool,
}

/// Lexicographic two-stage solve with an enumerated solution pool
pub struct SolverDriver<'a> {
    session: &'a SolverSession,
    config: &'a Config,
}

impl<'a> SolverDriver<'a> {
    pub fn new(session: &'a SolverSession, config: &'a Config) -> Self {
        Self { session, config }
    }

    /// Up to sol_count solutions, best first
    ///
    /// Each rank adds a distinctness cut against every earlier rank, so the
    /// feasible set only shrinks and objective values never improve down
    /// the pool. All stages draw on one run-wide budget of `timeout`
    /// seconds; once it is spent the solutions found so far are returned
    /// with a suboptimal status.
    pub fn solve_pool(&self, table: &ObservationTable) -> Result<SolutionPool> {
        log::info!(
            "=== start alignment: {} samples x {} segments, license {} ===",
            table.n_samples(),
            table.n_segments(),
            self.session.license().display()
        );

        let budget = TimeBudget::start(Duration::from_secs(self.config.timeout));
        let mut solutions: Vec<Solution> = Vec::new();
        let mut cuts: Vec<PoolCut> = Vec::new();
        let mut status = PoolStatus::Optimal;

        while solutions.len() < self.config.sol_count {
            let rank = solutions.len() + 1;

            if !cuts.iter().all(|cut| cut.is_satisfiable(self.config)) {
                log::info!("pool exhausted at rank {}: no distinct purity/ploidy left", rank);
                break;
            }

            if rank > 1 && budget.is_spent() {
                log::warn!("time budget spent after {} solution(s)", solutions.len());
                status = PoolStatus::Suboptimal;
                break;
            }

            let result = self.solve_rank(table, &cuts, &budget);
            let outcome = match next_step(rank, result, self.config)? {
                Next::Keep(outcome) => outcome,
                Next::Stop { suboptimal } => {
                    if suboptimal {
                        status = PoolStatus::Suboptimal;
                    }
                    break;
                }
            };

            if outcome.suboptimal {
                status = PoolStatus::Suboptimal;
            }

            log::info!(
                "solution {}: Obj1={:.3}, Obj2={:.6}",
                rank,
                outcome.solution.obj1,
                outcome.solution.obj2
            );
            cuts.push(PoolCut::from_solution(&outcome.solution));
            solutions.push(outcome.solution);
        }

        let pool = SolutionPool::new(solutions, status);
        log::info!("=== {} solution(s), status {} ===", pool.len(), pool.status());
        Ok(pool)
    }

    /// Coverage first, then error with coverage fixed to its optimum
    ///
    /// `None` when the coverage stage ran out of time without any incumbent.
    /// When the error stage cannot finish, the coverage-stage solution is
    /// kept and flagged suboptimal.
    fn solve_rank(
        &self,
        table: &ObservationTable,
        cuts: &[PoolCut],
        budget: &TimeBudget,
    ) -> Result<Option<RankOutcome>> {
        let first = match self.run_stage(
            Formulation::build(table, self.config, cuts, None),
            Stage::Coverage,
            budget,
        )? {
            StageEnd::Solved(solution) => RankOutcome {
                solution,
                suboptimal: false,
            },
            StageEnd::Incumbent(solution) => RankOutcome {
                solution,
                suboptimal: true,
            },
            StageEnd::Unfinished => return Ok(None),
        };

        if budget.is_spent() {
            log::warn!("time budget spent after the coverage stage; keeping its solution");
            return Ok(Some(RankOutcome {
                suboptimal: true,
                ..first
            }));
        }

        let best = first.solution.obj1;
        let floor = best - (self.config.obj1_tolerance + 1e-9 * best.abs());
        let second = match self.run_stage(
            Formulation::build(table, self.config, cuts, Some(floor)),
            Stage::Error,
            budget,
        ) {
            Ok(end) => end,
            Err(e) if e.is_no_solution() => {
                log::warn!("{}; keeping the coverage-stage solution", e);
                StageEnd::Unfinished
            }
            Err(e) => return Err(e),
        };

        Ok(Some(match second {
            StageEnd::Solved(solution) => RankOutcome {
                solution,
                suboptimal: first.suboptimal,
            },
            StageEnd::Incumbent(solution) => RankOutcome {
                solution,
                suboptimal: true,
            },
            StageEnd::Unfinished => RankOutcome {
                suboptimal: true,
                ..first
            },
        }))
    }

    fn run_stage(
        &self,
        formulation: Formulation,
        stage: Stage,
        budget: &TimeBudget,
    ) -> Result<StageEnd<Solution>> {
        let Formulation {
            problem,
            vars,
            constraints,
            objectives,
        } = formulation;

        let time_limit = budget.remaining().as_secs_f64();
        let unsolved = match stage {
            Stage::Coverage => problem.maximise(objectives.coverage.clone()),
            Stage::Error => problem.minimise(objectives.error.clone()),
        };
        let mut model = unsolved
            .using(highs)
            .set_option("output_flag", false)
            .set_option("time_limit", time_limit)
            .set_option("mip_rel_gap", self.config.mip_rel_gap);
        for constraint in constraints {
            model = model.with(constraint);
        }

        log::debug!("solving {} stage ({:.1}s left)...", stage, time_limit);
        let started = Instant::now();
        let end = classify(model.solve(), stage)?;
        log::debug!(
            "{} stage done in {:.2}s",
            stage,
            started.elapsed().as_secs_f64()
        );

        match &end {
            StageEnd::Incumbent(_) => {
                log::warn!("{} stage reached the time budget; keeping the incumbent", stage)
            }
            StageEnd::Unfinished => {
                log::warn!("{} stage reached the time budget without a feasible point", stage)
            }
            StageEnd::Solved(_) => {}
        }

        Ok(end.map(|solution| Solution::capture(&solution, &vars, &objectives)))
    }
}

/// What enumeration does after one rank
#[derive(Debug)]
enum Next {
    Keep(RankOutcome),
    Stop { suboptimal: bool },
}

/// Earlier ranks survive anything but a hard solver failure
fn next_step(rank: usize, result: Result<Option<RankOutcome>>, config: &Config) -> Result<Next> {
    match result {
        Ok(Some(outcome)) => Ok(Next::Keep(outcome)),
        Ok(None) if rank == 1 => Err(CnAlignError::Solver(format!(
            "no feasible solution found within the {}s time budget",
            config.timeout
        ))),
        Ok(None) => {
            log::warn!("rank {} found no incumbent before the time budget ran out", rank);
            Ok(Next::Stop { suboptimal: true })
        }
        Err(e) if rank > 1 && e.is_no_solution() => {
            log::info!("pool exhausted at rank {}: model infeasible", rank);
            Ok(Next::Stop { suboptimal: false })
        }
        Err(e) => Err(e),
    }
}

/// Maps a solver result onto how the stage ended
fn classify<S: good_lp::Solution>(
    result: std::result::Result<S, ResolutionError>,
    stage: Stage,
) -> Result<StageEnd<S>> {
    match result {
        Ok(solution) => match solution.status() {
            SolutionStatus::Optimal | SolutionStatus::GapLimit => Ok(StageEnd::Solved(solution)),
            SolutionStatus::TimeLimit => Ok(StageEnd::Incumbent(solution)),
        },
        Err(ResolutionError::Other(NO_INCUMBENT)) => Ok(StageEnd::Unfinished),
        Err(ResolutionError::Infeasible) => Err(CnAlignError::NoSolution(format!(
            "{} stage is infeasible: no purity/ploidy/copy-number assignment satisfies all constraints",
            stage
        ))),
        Err(e) => Err(CnAlignError::Solver(format!(
            "{} stage failed: {}",
            stage, e
        ))),
    }
}
