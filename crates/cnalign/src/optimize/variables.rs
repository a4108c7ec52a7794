use good_lp::{ProblemVariables, Variable, variable};

use crate::config::Config;
use crate::constants::NEAREST_INT_RADIUS;
use crate::observations::ObservationTable;
use crate::optimize::relation::{CellBounds, ParameterBox};

/// Per-sample decision variables
#[derive(Debug, Clone, Copy)]
pub struct SampleVars {
    /// ψ_s ∈ [min_ploidy, max_ploidy]
    pub ploidy: Variable,
    /// z_s = 1/ρ_s ∈ [1/max_purity, 1/min_purity]
    pub purity_inv: Variable,
    /// nearest integer to ψ_s (baseline for the CNA count)
    pub ploidy_int: Variable,
}

/// Per-(sample, segment) decision variables
#[derive(Debug, Clone, Copy)]
pub struct CellVars {
    pub tcn: Variable,
    pub mcn: Variable,
    pub tcn_int: Variable,
    pub mcn_int: Variable,
    /// e ≥ |x − x_int|
    pub tcn_err: Variable,
    pub mcn_err: Variable,
    /// error counted only when the segment is clonal (obj2_clonalonly)
    pub tcn_err_clonal: Option<Variable>,
    pub mcn_err_clonal: Option<Variable>,
    /// sample is individually aligned at the segment
    pub matched: Variable,
    /// tcn rounds to 0
    pub homdel: Variable,
    /// tcn_int ≥ ploidy_int + 1 / tcn_int ≤ ploidy_int − 1
    pub gain: Variable,
    pub loss: Variable,
}

/// Per-segment decision variables
#[derive(Debug, Clone, Copy)]
pub struct SegmentVars {
    pub allmatch: Variable,
    pub tcn_avg_int: Variable,
    pub mcn_avg_int: Variable,
}

/// All model variables, indexed like the observation table
#[derive(Debug, Clone)]
pub struct ModelVars {
    pub samples: Vec<SampleVars>,
    pub segments: Vec<SegmentVars>,
    /// sample-major: cells[s * n_segments + g]
    cells: Vec<CellVars>,
    n_segments: usize,
}

impl ModelVars {
    /// Declares every decision variable
    ///
    /// - ψ_s, z_s ∈ ℝ, ψ̂_s ∈ ℤ                         (per sample)
    /// - tcn, mcn ∈ ℝ≥0, t̂cn, m̂cn ∈ ℤ≥0, e ∈ [0, ½]   (per cell)
    /// - matched, homdel, gain, loss ∈ {0,1}             (per cell)
    /// - allmatch ∈ {0,1}, avg integers ∈ ℤ≥0          (per segment)
    pub fn create(
        vars: &mut ProblemVariables,
        table: &ObservationTable,
        bounds: &[CellBounds],
        config: &Config,
    ) -> Self {
        let domain = ParameterBox::from_config(config);
        let n_segments = table.n_segments();

        let samples: Vec<SampleVars> = table
            .samples()
            .iter()
            .map(|sample| SampleVars {
                ploidy: vars.add(
                    variable()
                        .min(domain.psi.0)
                        .max(domain.psi.1)
                        .name(format!("pl[{}]", sample.id)),
                ),
                purity_inv: vars.add(
                    variable()
                        .min(domain.z.0)
                        .max(domain.z.1)
                        .name(format!("z[{}]", sample.id)),
                ),
                ploidy_int: {
                    let (lo, hi) = ploidy_int_range(&domain);
                    vars.add(
                        variable()
                            .integer()
                            .min(lo)
                            .max(hi)
                            .name(format!("pl_int[{}]", sample.id)),
                    )
                },
            })
            .collect();

        let mut cells = Vec::with_capacity(table.n_samples() * n_segments);
        for (s, sample) in table.samples().iter().enumerate() {
            for (g, segment) in table.segments().iter().enumerate() {
                let b = &bounds[s * n_segments + g];
                let key = format!("{},{}", sample.id, segment.id);
                let clonal_err = |vars: &mut ProblemVariables, name: &str| {
                    config.obj2_clonalonly.then(|| {
                        vars.add(
                            variable()
                                .min(0.0)
                                .max(NEAREST_INT_RADIUS)
                                .name(format!("{}[{}]", name, key)),
                        )
                    })
                };

                let cell = CellVars {
                    tcn: vars.add(
                        variable()
                            .min(0.0)
                            .max(b.tcn.1)
                            .name(format!("tcn[{}]", key)),
                    ),
                    mcn: vars.add(
                        variable()
                            .min(0.0)
                            .max(b.mcn.1)
                            .name(format!("mcn[{}]", key)),
                    ),
                    tcn_int: vars.add(
                        variable()
                            .integer()
                            .min(0)
                            .max(int_upper(b.tcn.1))
                            .name(format!("tcn_int[{}]", key)),
                    ),
                    mcn_int: vars.add(
                        variable()
                            .integer()
                            .min(0)
                            .max(int_upper(b.mcn.1))
                            .name(format!("mcn_int[{}]", key)),
                    ),
                    tcn_err: vars.add(
                        variable()
                            .min(0.0)
                            .max(NEAREST_INT_RADIUS)
                            .name(format!("tcn_err[{}]", key)),
                    ),
                    mcn_err: vars.add(
                        variable()
                            .min(0.0)
                            .max(NEAREST_INT_RADIUS)
                            .name(format!("mcn_err[{}]", key)),
                    ),
                    tcn_err_clonal: clonal_err(vars, "tcn_err_clonal"),
                    mcn_err_clonal: clonal_err(vars, "mcn_err_clonal"),
                    matched: vars.add(variable().binary().name(format!("matched[{}]", key))),
                    homdel: vars.add(variable().binary().name(format!("homdel[{}]", key))),
                    gain: vars.add(variable().binary().name(format!("gain[{}]", key))),
                    loss: vars.add(variable().binary().name(format!("loss[{}]", key))),
                };
                cells.push(cell);
            }
        }

        let segments: Vec<SegmentVars> = table
            .segments()
            .iter()
            .enumerate()
            .map(|(g, segment)| {
                let column = (0..table.n_samples()).map(|s| &bounds[s * n_segments + g]);
                let (tcn_hi, mcn_hi) = column.fold((0.0f64, 0.0f64), |(t, m), b| {
                    (t.max(b.tcn.1), m.max(b.mcn.1))
                });
                SegmentVars {
                    allmatch: vars.add(
                        variable()
                            .binary()
                            .name(format!("allmatch[{}]", segment.id)),
                    ),
                    tcn_avg_int: vars.add(
                        variable()
                            .integer()
                            .min(0)
                            .max(int_upper(tcn_hi))
                            .name(format!("tcn_avg_int[{}]", segment.id)),
                    ),
                    mcn_avg_int: vars.add(
                        variable()
                            .integer()
                            .min(0)
                            .max(int_upper(mcn_hi))
                            .name(format!("mcn_avg_int[{}]", segment.id)),
                    ),
                }
            })
            .collect();

        log::debug!(
            "variables: samples={}, cells={}, segments={}",
            samples.len(),
            cells.len(),
            segments.len()
        );

        Self {
            samples,
            segments,
            cells,
            n_segments,
        }
    }

    pub fn cell(&self, sample: usize, segment: usize) -> &CellVars {
        &self.cells[sample * self.n_segments + segment]
    }

    pub fn n_segments(&self) -> usize {
        self.n_segments
    }

    /// Cells of one segment across all samples
    pub fn column(&self, segment: usize) -> impl Iterator<Item = &CellVars> + '_ {
        (0..self.samples.len()).map(move |s| self.cell(s, segment))
    }
}

/// Largest integer within ½ of a value bounded by `hi`
pub fn int_upper(hi: f64) -> f64 {
    (hi + NEAREST_INT_RADIUS).floor().max(0.0)
}

/// Integers that can sit within ½ of a ploidy in the box
pub fn ploidy_int_range(domain: &ParameterBox) -> (f64, f64) {
    (
        (domain.psi.0 - NEAREST_INT_RADIUS).ceil(),
        (domain.psi.1 + NEAREST_INT_RADIUS).floor(),
    )
}
