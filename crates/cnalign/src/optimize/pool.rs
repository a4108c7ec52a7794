use good_lp::Variable;
use serde::Serialize;
use strum_macros::{Display, EnumString};

use crate::constants::BINARY_THRESHOLD;
use crate::error::{CnAlignError, Result};
use crate::optimize::objective::Objectives;
use crate::optimize::variables::ModelVars;

/// Whether every stage finished inside the run's time budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PoolStatus {
    Optimal,
    /// the budget ran out; the pool holds the best solutions found so far
    Suboptimal,
}

/// Owned snapshot of one solve, captured as soon as the solver returns
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Σ mb·allmatch over eligible segments
    pub obj1: f64,
    /// negated weighted error; larger is better
    pub obj2: f64,
    pub ploidy: Vec<f64>,
    /// 1/z
    pub purity: Vec<f64>,
    pub allmatch: Vec<bool>,
    tcn: Vec<f64>,
    mcn: Vec<f64>,
    matched: Vec<bool>,
    n_segments: usize,
}

impl Solution {
    pub fn capture<S: good_lp::Solution>(
        solution: &S,
        vars: &ModelVars,
        objectives: &Objectives,
    ) -> Self {
        let n_segments = vars.n_segments();
        let binary = |v: Variable| solution.value(v) > BINARY_THRESHOLD;

        let ploidy = vars.samples.iter().map(|s| solution.value(s.ploidy)).collect();
        let purity = vars
            .samples
            .iter()
            .map(|s| 1.0 / solution.value(s.purity_inv))
            .collect();
        let allmatch = vars.segments.iter().map(|g| binary(g.allmatch)).collect();

        let cells = (0..vars.samples.len())
            .flat_map(|s| (0..n_segments).map(move |g| (s, g)))
            .map(|(s, g)| vars.cell(s, g));
        let mut tcn = Vec::new();
        let mut mcn = Vec::new();
        let mut matched = Vec::new();
        for cell in cells {
            tcn.push(solution.value(cell.tcn));
            mcn.push(solution.value(cell.mcn));
            matched.push(binary(cell.matched));
        }

        Self {
            obj1: solution.eval(&objectives.coverage),
            obj2: -solution.eval(&objectives.error),
            ploidy,
            purity,
            allmatch,
            tcn,
            mcn,
            matched,
            n_segments,
        }
    }

    pub fn n_samples(&self) -> usize {
        self.ploidy.len()
    }

    pub fn n_segments(&self) -> usize {
        self.n_segments
    }

    pub fn tcn(&self, sample: usize, segment: usize) -> f64 {
        self.tcn[sample * self.n_segments + segment]
    }

    pub fn mcn(&self, sample: usize, segment: usize) -> f64 {
        self.mcn[sample * self.n_segments + segment]
    }

    pub fn matched(&self, sample: usize, segment: usize) -> bool {
        self.matched[sample * self.n_segments + segment]
    }
}

/// Ranked solutions, best first
#[derive(Debug, Clone)]
pub struct SolutionPool {
    solutions: Vec<Solution>,
    status: PoolStatus,
}

impl SolutionPool {
    pub fn new(mut solutions: Vec<Solution>, status: PoolStatus) -> Self {
        // stable: enumeration order breaks exact ties
        solutions.sort_by(|a, b| {
            b.obj1
                .total_cmp(&a.obj1)
                .then_with(|| b.obj2.total_cmp(&a.obj2))
        });
        Self { solutions, status }
    }

    pub fn len(&self) -> usize {
        self.solutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solutions.is_empty()
    }

    pub fn status(&self) -> PoolStatus {
        self.status
    }

    pub fn is_suboptimal(&self) -> bool {
        self.status == PoolStatus::Suboptimal
    }

    pub fn solutions(&self) -> &[Solution] {
        &self.solutions
    }

    /// Copy of the solution at a 0-based rank
    pub fn extract(&self, rank: usize) -> Result<Solution> {
        self.solutions
            .get(rank)
            .cloned()
            .ok_or_else(|| CnAlignError::Model {
                message: format!(
                    "rank {} requested from a pool of {} solutions",
                    rank,
                    self.solutions.len()
                ),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solution(obj1: f64, obj2: f64) -> Solution {
        Solution {
            obj1,
            obj2,
            ploidy: vec![2.0],
            purity: vec![0.5],
            allmatch: vec![true],
            tcn: vec![2.0],
            mcn: vec![1.0],
            matched: vec![true],
            n_segments: 1,
        }
    }

    #[test]
    fn test_pool_orders_by_coverage_then_error() {
        let pool = SolutionPool::new(
            vec![
                solution(10.0, -0.5),
                solution(30.0, -0.9),
                solution(30.0, -0.1),
                solution(20.0, 0.0),
            ],
            PoolStatus::Optimal,
        );
        let order: Vec<(f64, f64)> = pool.solutions().iter().map(|s| (s.obj1, s.obj2)).collect();
        assert_eq!(
            order,
            vec![(30.0, -0.1), (30.0, -0.9), (20.0, 0.0), (10.0, -0.5)]
        );
    }

    #[test]
    fn test_extract_returns_copy() {
        let pool = SolutionPool::new(vec![solution(5.0, 0.0)], PoolStatus::Suboptimal);
        let first = pool.extract(0).unwrap();
        assert_eq!(first, pool.solutions()[0]);
        assert_eq!(first.tcn(0, 0), 2.0);
        assert!(first.matched(0, 0));
        assert!(pool.is_suboptimal());
        assert!(matches!(pool.extract(1), Err(CnAlignError::Model { .. })));
    }

    #[test]
    fn test_status_display() {
        assert_eq!(PoolStatus::Optimal.to_string(), "optimal");
        assert_eq!(PoolStatus::Suboptimal.to_string(), "suboptimal");
        assert_eq!("suboptimal".parse::<PoolStatus>().unwrap(), PoolStatus::Suboptimal);
    }
}
