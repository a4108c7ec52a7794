use good_lp::{Constraint, Expression, ProblemVariables, Variable, variable};

use crate::config::Config;
use crate::observations::ObservationTable;
use crate::optimize::pool::Solution;
use crate::optimize::relation::{CellBounds, CopyNumberRelation, ParameterBox};
use crate::optimize::variables::{ModelVars, SampleVars};
use crate::optimize::{alignment, objective, objective::Objectives, relation};

/// One sample's purity/ploidy in an earlier pool entry
#[derive(Debug, Clone, Copy, PartialEq)]
struct Anchor {
    ploidy: f64,
    purity: f64,
}

/// Way to move one sample away from an anchor
#[derive(Debug, Clone, Copy, PartialEq)]
enum Branch {
    PloidyAtLeast(f64),
    PloidyAtMost(f64),
    /// purity ≥ p, i.e. z ≤ 1/p
    PurityAtLeast(f64),
    /// purity ≤ p, i.e. z ≥ 1/p
    PurityAtMost(f64),
}

/// Distinctness cut against an earlier pool entry
///
/// A later entry must move at least one sample's ploidy by
/// pool_min_ploidy_diff or its purity by pool_min_purity_diff.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolCut {
    anchors: Vec<Anchor>,
}

impl PoolCut {
    pub fn from_solution(solution: &Solution) -> Self {
        let anchors = solution
            .ploidy
            .iter()
            .zip(&solution.purity)
            .map(|(&ploidy, &purity)| Anchor { ploidy, purity })
            .collect();
        Self { anchors }
    }

    /// Branches that stay inside the configured box, per sample
    fn branches(&self, config: &Config) -> Vec<(usize, Branch)> {
        let d_pl = config.pool_min_ploidy_diff;
        let d_pu = config.pool_min_purity_diff;
        let mut out = Vec::new();

        for (s, anchor) in self.anchors.iter().enumerate() {
            let candidates = [
                Branch::PloidyAtLeast(anchor.ploidy + d_pl),
                Branch::PloidyAtMost(anchor.ploidy - d_pl),
                Branch::PurityAtLeast(anchor.purity + d_pu),
                Branch::PurityAtMost(anchor.purity - d_pu),
            ];
            out.extend(
                candidates
                    .into_iter()
                    .filter(|b| b.reachable(config))
                    .map(|b| (s, b)),
            );
        }
        out
    }

    /// false once every sample is pinned against its bounds
    pub fn is_satisfiable(&self, config: &Config) -> bool {
        !self.branches(config).is_empty()
    }

    /// Σ branch ≥ 1, each branch binding its sample through a big-M row
    fn encode(
        &self,
        constraints: &mut Vec<Constraint>,
        problem: &mut ProblemVariables,
        samples: &[SampleVars],
        config: &Config,
    ) {
        let domain = ParameterBox::from_config(config);
        let mut any: Expression = Expression::from(0.0);

        for (s, branch) in self.branches(config) {
            let on = problem.add(variable().binary());
            constraints.push(branch.constraint(&samples[s], on, &domain));
            any += on;
        }
        constraints.push(any.geq(1.0));
    }
}

impl Branch {
    fn reachable(&self, config: &Config) -> bool {
        match *self {
            Branch::PloidyAtLeast(v) => v <= config.max_ploidy,
            Branch::PloidyAtMost(v) => v >= config.min_ploidy,
            Branch::PurityAtLeast(v) => v <= config.max_purity,
            Branch::PurityAtMost(v) => v >= config.min_purity && v > 0.0,
        }
    }

    fn constraint(&self, sample: &SampleVars, on: Variable, domain: &ParameterBox) -> Constraint {
        let (z_lo, z_hi) = domain.z;
        let (pl_lo, pl_hi) = domain.psi;
        match *self {
            // pl ≥ pl_lo + (v − pl_lo)·on
            Branch::PloidyAtLeast(v) => {
                Expression::from(sample.ploidy).geq(Expression::from(pl_lo) + (v - pl_lo) * on)
            }
            // pl ≤ pl_hi − (pl_hi − v)·on
            Branch::PloidyAtMost(v) => {
                Expression::from(sample.ploidy).leq(Expression::from(pl_hi) - (pl_hi - v) * on)
            }
            // z ≤ z_hi − (z_hi − 1/v)·on
            Branch::PurityAtLeast(v) => Expression::from(sample.purity_inv)
                .leq(Expression::from(z_hi) - (z_hi - 1.0 / v) * on),
            // z ≥ z_lo + (1/v − z_lo)·on
            Branch::PurityAtMost(v) => Expression::from(sample.purity_inv)
                .geq(Expression::from(z_lo) + (1.0 / v - z_lo) * on),
        }
    }
}

/// Everything one solve stage needs; rebuilt for every stage
pub struct Formulation {
    pub problem: ProblemVariables,
    pub vars: ModelVars,
    pub constraints: Vec<Constraint>,
    pub objectives: Objectives,
}

impl Formulation {
    /// Assembles one stage's model
    ///
    /// 1. per-cell tcn/mcn ranges over the purity/ploidy box
    /// 2. decision variables
    /// 3. copy-number relation, alignment, filters and objectives
    /// 4. distinctness cuts against earlier pool entries
    /// 5. optional floor on the coverage objective
    pub fn build(
        table: &ObservationTable,
        config: &Config,
        cuts: &[PoolCut],
        coverage_floor: Option<f64>,
    ) -> Self {
        let domain = ParameterBox::from_config(config);
        let n_segments = table.n_segments();

        let relations: Vec<CopyNumberRelation> = (0..table.n_samples())
            .flat_map(|s| (0..n_segments).map(move |g| (s, g)))
            .map(|(s, g)| CopyNumberRelation::from_observation(table.observation(s, g), config.logr_gamma))
            .collect();
        let bounds: Vec<CellBounds> = relations
            .iter()
            .map(|r| CellBounds::new(r, &domain))
            .collect();

        let mut problem = ProblemVariables::new();
        let vars = ModelVars::create(&mut problem, table, &bounds, config);
        let mut constraints = Vec::new();

        for (s, sample) in vars.samples.iter().enumerate() {
            for g in 0..n_segments {
                relation::encode(
                    &mut constraints,
                    sample,
                    vars.cell(s, g),
                    &relations[s * n_segments + g],
                );
            }
        }

        alignment::encode(&mut constraints, &vars, &bounds, config);
        let objectives = objective::encode(&mut constraints, &vars, table, &bounds, config);

        for cut in cuts {
            cut.encode(&mut constraints, &mut problem, &vars.samples, config);
        }

        if let Some(floor) = coverage_floor {
            constraints.push(objectives.coverage.clone().geq(floor));
        }

        log::debug!(
            "model: {} constraints, {} pool cuts, coverage floor {:?}",
            constraints.len(),
            cuts.len(),
            coverage_floor
        );

        Self {
            problem,
            vars,
            constraints,
            objectives,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cut(ploidy: f64, purity: f64) -> PoolCut {
        PoolCut {
            anchors: vec![Anchor { ploidy, purity }],
        }
    }

    #[test]
    fn test_branches_inside_box() {
        let config = Config::default();
        let branches = cut(2.0, 0.5).branches(&config);
        assert_eq!(branches.len(), 4);

        let close = |a: f64, b: f64| (a - b).abs() < 1e-12;
        for (s, branch) in branches {
            assert_eq!(s, 0);
            match branch {
                Branch::PloidyAtLeast(v) => assert!(close(v, 2.05)),
                Branch::PloidyAtMost(v) => assert!(close(v, 1.95)),
                Branch::PurityAtLeast(v) => assert!(close(v, 0.51)),
                Branch::PurityAtMost(v) => assert!(close(v, 0.49)),
            }
        }
    }

    #[test]
    fn test_branches_drop_at_bounds() {
        let config = Config::default();
        let branches = cut(config.max_ploidy, config.min_purity).branches(&config);
        assert_eq!(branches.len(), 2);
        assert!(branches.iter().all(|(_, b)| matches!(
            b,
            Branch::PloidyAtMost(_) | Branch::PurityAtLeast(_)
        )));
    }

    #[test]
    fn test_cut_unsatisfiable_in_degenerate_box() {
        let config = Config {
            min_ploidy: 2.0,
            max_ploidy: 2.0,
            min_purity: 0.5,
            max_purity: 0.5,
            ..Default::default()
        };
        assert!(!cut(2.0, 0.5).is_satisfiable(&config));
        assert!(cut(2.0, 0.5).is_satisfiable(&Config::default()));
    }
}
