//! Copy-number relation between observations and purity/ploidy
//!
//! Observation model:
//!   R = 2^(logR/γ) = (2(1−ρ) + ρ·n) / (2(1−ρ) + ρ·ψ)
//!   BAF·(2(1−ρ) + ρ·n) = (1−ρ) + ρ·n_B
//!
//! With the purity inverse z = 1/ρ both relations become linear in (z, ψ, n):
//!   tcn = 2(R−1)·(z−1) + R·ψ
//!   mcn = b·(2(z−1) + tcn) − (z−1),   b = min(BAF, 1−BAF)
//!
//! The substitution is exact for every purity, so at ρ = 1 (z = 1) it reduces
//! to tcn = R·ψ and mcn = b·tcn.

use good_lp::{Constraint, Expression};
use itertools::iproduct;

use crate::config::Config;
use crate::observations::Observation;
use crate::optimize::variables::{CellVars, SampleVars};

/// a_z·z + a_ψ·ψ + a_0
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Affine {
    pub z: f64,
    pub psi: f64,
    pub constant: f64,
}

impl Affine {
    pub fn eval(&self, z: f64, psi: f64) -> f64 {
        self.z * z + self.psi * psi + self.constant
    }

    /// Exact range over the (z, ψ) box; an affine map attains it at the corners
    pub fn range(&self, domain: &ParameterBox) -> (f64, f64) {
        iproduct!(
            [domain.z.0, domain.z.1].into_iter(),
            [domain.psi.0, domain.psi.1].into_iter()
        )
        .map(|(z, psi)| self.eval(z, psi))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        })
    }
}

/// Feasible box of (purity inverse, ploidy)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterBox {
    pub z: (f64, f64),
    pub psi: (f64, f64),
}

impl ParameterBox {
    pub fn from_config(config: &Config) -> Self {
        Self {
            z: config.purity_inverse_bounds(),
            psi: config.ploidy_bounds(),
        }
    }
}

/// Per-observation coefficients of the copy-number relation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CopyNumberRelation {
    /// R = 2^(logR/γ)
    pub ratio: f64,
    /// mirrored BAF, b ≤ 0.5
    pub minor_baf: Option<f64>,
}

impl CopyNumberRelation {
    pub fn from_observation(obs: &Observation, gamma: f64) -> Self {
        Self {
            ratio: 2f64.powf(obs.logr / gamma),
            minor_baf: obs.baf.map(|b| b.min(1.0 - b)),
        }
    }

    /// tcn = 2(R−1)·z + R·ψ − 2(R−1)
    pub fn tcn_affine(&self) -> Affine {
        let r = self.ratio;
        Affine {
            z: 2.0 * (r - 1.0),
            psi: r,
            constant: -2.0 * (r - 1.0),
        }
    }

    /// mcn with tcn substituted: (2bR−1)·(z−1) + bR·ψ
    pub fn mcn_affine(&self) -> Option<Affine> {
        self.minor_baf.map(|b| {
            let br = b * self.ratio;
            Affine {
                z: 2.0 * br - 1.0,
                psi: br,
                constant: -(2.0 * br - 1.0),
            }
        })
    }

    /// TCN implied by a purity/ploidy pair
    pub fn tcn(&self, purity: f64, ploidy: f64) -> f64 {
        self.tcn_affine().eval(1.0 / purity, ploidy)
    }

    /// MCN implied by a purity/ploidy pair, if BAF was observed
    pub fn mcn(&self, purity: f64, ploidy: f64) -> Option<f64> {
        self.mcn_affine().map(|a| a.eval(1.0 / purity, ploidy))
    }
}

/// Range of tcn/mcn one cell can take inside the parameter box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellBounds {
    pub tcn: (f64, f64),
    pub mcn: (f64, f64),
}

impl CellBounds {
    /// Non-negativity and minor ≤ major clip the raw affine ranges
    pub fn new(relation: &CopyNumberRelation, domain: &ParameterBox) -> Self {
        let (tcn_lo, tcn_hi) = relation.tcn_affine().range(domain);
        let tcn = (tcn_lo.max(0.0), tcn_hi.max(0.0));

        let mcn = match relation.mcn_affine() {
            Some(affine) => {
                let (lo, hi) = affine.range(domain);
                (lo.max(0.0), hi.min(tcn.1 / 2.0).max(0.0))
            }
            None => (0.0, tcn.1 / 2.0),
        };

        Self { tcn, mcn }
    }
}

/// Encodes the relation for one (sample, segment) cell
///
/// tcn = 2(R−1)·z + R·ψ − 2(R−1)
/// mcn = b·tcn + (2b−1)·z − (2b−1)     (BAF observed)
/// 2·mcn ≤ tcn
///
/// tcn ≥ 0 and mcn ≥ 0 are variable bounds, so an observation that no
/// purity/ploidy in the box can explain leaves the model infeasible.
pub fn encode(
    constraints: &mut Vec<Constraint>,
    sample: &SampleVars,
    cell: &CellVars,
    relation: &CopyNumberRelation,
) {
    let t = relation.tcn_affine();
    let tcn_rhs = t.z * sample.purity_inv + t.psi * sample.ploidy + t.constant;
    constraints.push(Expression::from(cell.tcn).eq(tcn_rhs));

    if let Some(b) = relation.minor_baf {
        let slope = 2.0 * b - 1.0;
        let mcn_rhs = b * cell.tcn + slope * sample.purity_inv - slope;
        constraints.push(Expression::from(cell.mcn).eq(mcn_rhs));
    }

    // minor ≤ major
    constraints.push((2.0 * cell.mcn).leq(cell.tcn));
}

#[cfg(test)]
mod tests {
    use super::*;

    /// logR/BAF observed for a clonal (n, n_B) state at the given purity/ploidy
    fn observe(n: f64, n_b: f64, purity: f64, ploidy: f64) -> Observation {
        let normal = 2.0 * (1.0 - purity);
        let r = (normal + purity * n) / (normal + purity * ploidy);
        let baf = ((1.0 - purity) + purity * n_b) / (normal + purity * n);
        Observation {
            logr: r.log2(),
            baf: Some(baf),
        }
    }

    #[test]
    fn test_relation_recovers_generating_state() {
        for &(n, n_b) in &[(1.0, 0.0), (2.0, 1.0), (3.0, 1.0), (4.0, 2.0), (5.0, 0.0)] {
            for &(purity, ploidy) in &[(0.4, 2.0), (0.7, 2.0), (0.3, 3.2), (0.9, 4.0)] {
                let rel = CopyNumberRelation::from_observation(&observe(n, n_b, purity, ploidy), 1.0);
                assert!((rel.tcn(purity, ploidy) - n).abs() < 1e-9);
                assert!((rel.mcn(purity, ploidy).unwrap() - n_b).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn test_relation_exact_at_full_purity() {
        let obs = Observation {
            logr: 0.58,
            baf: Some(0.3),
        };
        let rel = CopyNumberRelation::from_observation(&obs, 1.0);
        let r = 2f64.powf(0.58);
        for ploidy in [1.6, 2.0, 3.5, 6.0] {
            assert!((rel.tcn(1.0, ploidy) - r * ploidy).abs() < 1e-12);
            assert!((rel.mcn(1.0, ploidy).unwrap() - 0.3 * r * ploidy).abs() < 1e-12);
        }
    }

    #[test]
    fn test_tcn_monotone_in_intensity() {
        for &(purity, ploidy) in &[(0.05, 1.6), (0.5, 2.0), (0.95, 6.0)] {
            let mut prev = f64::NEG_INFINITY;
            for step in -20..=20 {
                let obs = Observation {
                    logr: step as f64 * 0.1,
                    baf: None,
                };
                let tcn = CopyNumberRelation::from_observation(&obs, 1.0).tcn(purity, ploidy);
                assert!(tcn > prev);
                prev = tcn;
            }
        }
    }

    #[test]
    fn test_baf_is_mirrored() {
        let upper = CopyNumberRelation::from_observation(
            &Observation {
                logr: 0.0,
                baf: Some(0.8),
            },
            1.0,
        );
        assert!((upper.minor_baf.unwrap() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_gamma_scales_log_ratio() {
        let obs = Observation {
            logr: 0.55,
            baf: None,
        };
        let rel = CopyNumberRelation::from_observation(&obs, 0.55);
        assert!((rel.ratio - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_affine_range_covers_box() {
        let domain = ParameterBox {
            z: (1.0 / 0.95, 20.0),
            psi: (1.6, 6.0),
        };
        let rel = CopyNumberRelation::from_observation(&observe(3.0, 1.0, 0.4, 2.0), 1.0);
        let (lo, hi) = rel.tcn_affine().range(&domain);
        for purity in [0.05, 0.2, 0.5, 0.95] {
            for ploidy in [1.6, 2.5, 6.0] {
                let v = rel.tcn(purity, ploidy);
                assert!(v >= lo - 1e-9 && v <= hi + 1e-9);
            }
        }
    }

    #[test]
    fn test_cell_bounds_clip_to_minor_allele() {
        let domain = ParameterBox {
            z: (1.0 / 0.95, 20.0),
            psi: (1.6, 6.0),
        };
        let rel = CopyNumberRelation::from_observation(&observe(1.0, 0.0, 0.4, 2.0), 1.0);
        let bounds = CellBounds::new(&rel, &domain);
        assert!(bounds.tcn.0 >= 0.0);
        assert!(bounds.mcn.0 >= 0.0);
        assert!(bounds.mcn.1 <= bounds.tcn.1 / 2.0 + 1e-12);

        let no_baf = CopyNumberRelation {
            ratio: rel.ratio,
            minor_baf: None,
        };
        let bounds = CellBounds::new(&no_baf, &domain);
        assert_eq!(bounds.mcn.0, 0.0);
        assert!((bounds.mcn.1 - bounds.tcn.1 / 2.0).abs() < 1e-12);
    }
}
