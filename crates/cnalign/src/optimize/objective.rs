use good_lp::{Constraint, Expression};

use crate::config::Config;
use crate::constants::NEAREST_INT_RADIUS;
use crate::observations::{ObservationTable, Segment};
use crate::optimize::relation::{CellBounds, ParameterBox};
use crate::optimize::variables::{ModelVars, int_upper, ploidy_int_range};

/// The two objectives, evaluated lexicographically
#[derive(Debug, Clone)]
pub struct Objectives {
    /// Σ mb·allmatch over eligible segments, maximised first
    pub coverage: Expression,
    /// weighted distance of tcn/mcn to integers, minimised second
    pub error: Expression,
}

/// Segments long enough to count toward coverage and error
pub fn is_eligible(segment: &Segment, config: &Config) -> bool {
    segment.mb >= config.min_aligned_seg_mb
}

/// Builds both objectives and the constraints that feed them
///
/// Coverage:  Σ_{g: mb_g ≥ min_aligned_seg_mb} mb_g · allmatch[g]
/// Error:     w_mcn · Σ e_mcn + (1 − w_mcn) · Σ e_tcn,   e ≥ |x − x_int|
///
/// The feasibility filters (homozygous deletion budget, CNA count) are
/// added here as well since they share the integer partners.
pub fn encode(
    constraints: &mut Vec<Constraint>,
    vars: &ModelVars,
    table: &ObservationTable,
    bounds: &[CellBounds],
    config: &Config,
) -> Objectives {
    add_homdel_budget(constraints, vars, table, config);
    add_cna_count(constraints, vars, bounds, config);

    let mut coverage = Expression::from(0.0);
    let mut tcn_error = Expression::from(0.0);
    let mut mcn_error = Expression::from(0.0);

    for (g, segment) in table.segments().iter().enumerate() {
        if !is_eligible(segment, config) {
            continue;
        }

        let allmatch = vars.segments[g].allmatch;
        coverage += segment.mb * allmatch;

        for cell in vars.column(g) {
            // e ≥ |x − x_int|
            constraints.push((Expression::from(cell.tcn_err) - cell.tcn).geq(-1.0 * cell.tcn_int));
            constraints.push((Expression::from(cell.tcn_err) + cell.tcn).geq(cell.tcn_int));
            constraints.push((Expression::from(cell.mcn_err) - cell.mcn).geq(-1.0 * cell.mcn_int));
            constraints.push((Expression::from(cell.mcn_err) + cell.mcn).geq(cell.mcn_int));

            match (cell.tcn_err_clonal, cell.mcn_err_clonal) {
                (Some(tcn_c), Some(mcn_c)) => {
                    // c ≥ e − ½(1 − allmatch)
                    let slack = Expression::from(NEAREST_INT_RADIUS) - NEAREST_INT_RADIUS * allmatch;
                    constraints.push((Expression::from(tcn_c) + slack.clone()).geq(cell.tcn_err));
                    constraints.push((Expression::from(mcn_c) + slack).geq(cell.mcn_err));
                    tcn_error += tcn_c;
                    mcn_error += mcn_c;
                }
                _ => {
                    tcn_error += cell.tcn_err;
                    mcn_error += cell.mcn_err;
                }
            }
        }
    }

    let error = mcn_error * config.mcn_weight + tcn_error * config.tcn_weight();
    Objectives { coverage, error }
}

/// Per sample: Σ_g mb_g · homdel[s,g] ≤ max_homdel_mb, with homdel = 0 ⇒ tcn_int ≥ 1
fn add_homdel_budget(
    constraints: &mut Vec<Constraint>,
    vars: &ModelVars,
    table: &ObservationTable,
    config: &Config,
) {
    for s in 0..vars.samples.len() {
        let mut deleted = Expression::from(0.0);
        for (g, segment) in table.segments().iter().enumerate() {
            let cell = vars.cell(s, g);
            constraints.push((Expression::from(cell.tcn_int) + cell.homdel).geq(1.0));
            deleted += segment.mb * cell.homdel;
        }
        constraints.push(deleted.leq(config.max_homdel_mb));
    }
}

/// Per sample: at least min_cna_segments_per_sample segments with tcn_int ≠ pl_int
///
///   gain = 1 ⇒ tcn_int − pl_int ≥ 1
///   loss = 1 ⇒ pl_int − tcn_int ≥ 1
fn add_cna_count(
    constraints: &mut Vec<Constraint>,
    vars: &ModelVars,
    bounds: &[CellBounds],
    config: &Config,
) {
    let (pl_int_min, pl_int_max) = ploidy_int_range(&ParameterBox::from_config(config));
    let n_segments = vars.n_segments();

    for (s, sample) in vars.samples.iter().enumerate() {
        constraints.push((Expression::from(sample.ploidy) - sample.ploidy_int).leq(NEAREST_INT_RADIUS));
        constraints.push((Expression::from(sample.ploidy) - sample.ploidy_int).geq(-NEAREST_INT_RADIUS));

        let mut changed = Expression::from(0.0);
        for g in 0..n_segments {
            let cell = vars.cell(s, g);
            let tcn_int_max = int_upper(bounds[s * n_segments + g].tcn.1);

            let gain_m = 1.0 + pl_int_max;
            constraints.push(
                (Expression::from(cell.tcn_int) - sample.ploidy_int)
                    .geq(Expression::from(1.0 - gain_m) + gain_m * cell.gain),
            );

            let loss_m = 1.0 + tcn_int_max - pl_int_min;
            constraints.push(
                (Expression::from(sample.ploidy_int) - cell.tcn_int)
                    .geq(Expression::from(1.0 - loss_m) + loss_m * cell.loss),
            );

            constraints.push((Expression::from(cell.gain) + cell.loss).leq(1.0));
            changed += cell.gain;
            changed += cell.loss;
        }
        constraints.push(changed.geq(config.min_cna_segments_per_sample as f64));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_segments_are_not_eligible() {
        let config = Config::default();
        let short = Segment {
            id: "short".to_string(),
            mb: 4.99,
            gc: 0.4,
        };
        let edge = Segment {
            id: "edge".to_string(),
            mb: 5.0,
            gc: 0.4,
        };
        assert!(!is_eligible(&short, &config));
        assert!(is_eligible(&edge, &config));
    }
}
