//! Alignment indicators
//!
//! matched[s,g] = 1 only if tcn and mcn of sample s sit close to an integer and
//! close to the cross-sample average at segment g, and that average is itself
//! close to an integer. allmatch[g] = 1 only if enough samples are matched.

use good_lp::{Constraint, Expression, Variable};

use crate::config::Config;
use crate::constants::NEAREST_INT_RADIUS;
use crate::optimize::relation::CellBounds;
use crate::optimize::variables::ModelVars;

/// Number of matched samples an aligned segment needs: ⌈rho·n⌉, at least one
pub fn required_matches(rho: f64, n_samples: usize) -> usize {
    ((rho * n_samples as f64 - 1e-9).ceil().max(0.0) as usize).max(1)
}

/// Largest distance between a cell value and the segment average
#[derive(Debug, Clone, Copy, PartialEq)]
struct Spread {
    tcn: f64,
    mcn: f64,
}

impl Spread {
    fn of_segment(bounds: &[CellBounds], n_samples: usize, n_segments: usize, segment: usize) -> Self {
        let column = (0..n_samples).map(|s| &bounds[s * n_segments + segment]);
        let (tcn_lo, tcn_hi, mcn_lo, mcn_hi) = column.fold(
            (f64::INFINITY, f64::NEG_INFINITY, f64::INFINITY, f64::NEG_INFINITY),
            |(tl, th, ml, mh), b| (tl.min(b.tcn.0), th.max(b.tcn.1), ml.min(b.mcn.0), mh.max(b.mcn.1)),
        );
        Self {
            tcn: (tcn_hi - tcn_lo).max(0.0),
            mcn: (mcn_hi - mcn_lo).max(0.0),
        }
    }
}

/// Adds nearest-integer ties, the matched implications and the all-match threshold
pub fn encode(
    constraints: &mut Vec<Constraint>,
    vars: &ModelVars,
    bounds: &[CellBounds],
    config: &Config,
) {
    let n_samples = vars.samples.len();
    let n_segments = vars.n_segments();
    let need = required_matches(config.rho, n_samples) as f64;

    for (g, segment) in vars.segments.iter().enumerate() {
        let spread = Spread::of_segment(bounds, n_samples, n_segments, g);
        let tcn_avg = average(vars.column(g).map(|c| c.tcn), n_samples);
        let mcn_avg = average(vars.column(g).map(|c| c.mcn), n_samples);

        nearest_int(constraints, tcn_avg.clone() - segment.tcn_avg_int);
        nearest_int(constraints, mcn_avg.clone() - segment.mcn_avg_int);

        for cell in vars.column(g) {
            nearest_int(constraints, Expression::from(cell.tcn) - cell.tcn_int);
            nearest_int(constraints, Expression::from(cell.mcn) - cell.mcn_int);

            let checks = [
                (
                    Expression::from(cell.tcn) - cell.tcn_int,
                    config.delta_tcn_to_int,
                    NEAREST_INT_RADIUS,
                ),
                (
                    Expression::from(cell.tcn) - tcn_avg.clone(),
                    config.delta_tcn_to_avg,
                    spread.tcn,
                ),
                (
                    tcn_avg.clone() - segment.tcn_avg_int,
                    config.delta_tcnavg_to_int,
                    NEAREST_INT_RADIUS,
                ),
                (
                    Expression::from(cell.mcn) - cell.mcn_int,
                    config.delta_mcn_to_int,
                    NEAREST_INT_RADIUS,
                ),
                (
                    Expression::from(cell.mcn) - mcn_avg.clone(),
                    config.delta_mcn_to_avg,
                    spread.mcn,
                ),
                (
                    mcn_avg.clone() - segment.mcn_avg_int,
                    config.delta_mcnavg_to_int,
                    NEAREST_INT_RADIUS,
                ),
            ];
            for (diff, delta, reach) in checks {
                within_if(constraints, diff, delta, reach, cell.matched);
            }
        }

        // need·allmatch ≤ Σ_s matched
        let matched: Expression = vars.column(g).map(|c| c.matched).sum();
        constraints.push((need * segment.allmatch).leq(matched));
    }
}

fn average(values: impl Iterator<Item = Variable>, n: usize) -> Expression {
    let sum: Expression = values.sum();
    sum * (1.0 / n as f64)
}

/// |diff| ≤ ½
fn nearest_int(constraints: &mut Vec<Constraint>, diff: Expression) {
    constraints.push(diff.clone().leq(NEAREST_INT_RADIUS));
    constraints.push(diff.geq(-NEAREST_INT_RADIUS));
}

/// indicator = 1 ⇒ |diff| ≤ delta, where |diff| ≤ reach holds anyway
///
/// M = reach − delta; nothing is added when the check can never bind.
fn within_if(
    constraints: &mut Vec<Constraint>,
    diff: Expression,
    delta: f64,
    reach: f64,
    indicator: Variable,
) {
    let big_m = reach - delta;
    if big_m <= 0.0 {
        return;
    }
    let upper = Expression::from(delta + big_m) - big_m * indicator;
    let lower = Expression::from(-(delta + big_m)) + big_m * indicator;
    constraints.push(diff.clone().leq(upper));
    constraints.push(diff.geq(lower));
}
