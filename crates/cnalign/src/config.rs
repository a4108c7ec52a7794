use crate::{
    constants::*,
    error::{CnAlignError, Result},
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Model and solver settings
///
/// Every field has a default, so a TOML file only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    // sample-level bounds
    pub min_ploidy: f64,
    pub max_ploidy: f64,
    pub min_purity: f64,
    pub max_purity: f64,

    // segment filters
    pub min_aligned_seg_mb: f64,
    pub max_homdel_mb: f64,
    pub min_cna_segments_per_sample: usize,

    // alignment tolerances
    pub delta_tcn_to_int: f64,
    pub delta_tcn_to_avg: f64,
    pub delta_tcnavg_to_int: f64,
    pub delta_mcn_to_int: f64,
    pub delta_mcn_to_avg: f64,
    pub delta_mcnavg_to_int: f64,
    pub rho: f64,

    // objective 2
    pub mcn_weight: f64,
    pub obj2_clonalonly: bool,

    // solver
    pub timeout: u64, // [s]
    pub sol_count: usize,
    pub mip_rel_gap: f64,
    pub obj1_tolerance: f64, // [Mb]

    /// logR compression: R = 2^(logR / gamma)
    pub logr_gamma: f64,

    /// Solution pool: ranks must differ in at least one sample's purity or ploidy
    pub pool_min_purity_diff: f64,
    pub pool_min_ploidy_diff: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_ploidy: DEFAULT_MIN_PLOIDY,
            max_ploidy: DEFAULT_MAX_PLOIDY,
            min_purity: DEFAULT_MIN_PURITY,
            max_purity: DEFAULT_MAX_PURITY,
            min_aligned_seg_mb: DEFAULT_MIN_ALIGNED_SEG_MB,
            max_homdel_mb: DEFAULT_MAX_HOMDEL_MB,
            min_cna_segments_per_sample: DEFAULT_MIN_CNA_SEGMENTS,
            delta_tcn_to_int: DEFAULT_DELTA_TO_INT,
            delta_tcn_to_avg: DEFAULT_DELTA_TO_AVG,
            delta_tcnavg_to_int: DEFAULT_DELTA_AVG_TO_INT,
            delta_mcn_to_int: DEFAULT_DELTA_TO_INT,
            delta_mcn_to_avg: DEFAULT_DELTA_TO_AVG,
            delta_mcnavg_to_int: DEFAULT_DELTA_AVG_TO_INT,
            rho: DEFAULT_RHO,
            mcn_weight: DEFAULT_MCN_WEIGHT,
            obj2_clonalonly: false,
            timeout: DEFAULT_TIMEOUT_SECS,
            sol_count: DEFAULT_SOL_COUNT,
            mip_rel_gap: DEFAULT_MIP_REL_GAP,
            obj1_tolerance: DEFAULT_OBJ1_TOLERANCE,
            logr_gamma: DEFAULT_LOGR_GAMMA,
            pool_min_purity_diff: DEFAULT_POOL_MIN_PURITY_DIFF,
            pool_min_ploidy_diff: DEFAULT_POOL_MIN_PLOIDY_DIFF,
        }
    }
}

impl Config {
    /// Load settings from a TOML file and validate them
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CnAlignError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| {
            CnAlignError::Config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        config.validate()?;
        Ok(config)
    }

    pub fn tcn_weight(&self) -> f64 {
        1.0 - self.mcn_weight
    }

    /// Bounds of the purity-inverse variable z = 1/purity
    pub fn purity_inverse_bounds(&self) -> (f64, f64) {
        (1.0 / self.max_purity, 1.0 / self.min_purity)
    }

    pub fn ploidy_bounds(&self) -> (f64, f64) {
        (self.min_ploidy, self.max_ploidy)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.min_purity > 0.0 && self.max_purity <= 1.0 && self.min_purity <= self.max_purity)
        {
            return Err(CnAlignError::Config(format!(
                "purity bounds must satisfy 0 < min_purity <= max_purity <= 1, got [{}, {}]",
                self.min_purity, self.max_purity
            )));
        }

        if !(self.min_ploidy > 0.0 && self.min_ploidy <= self.max_ploidy) {
            return Err(CnAlignError::Config(format!(
                "ploidy bounds must satisfy 0 < min_ploidy <= max_ploidy, got [{}, {}]",
                self.min_ploidy, self.max_ploidy
            )));
        }

        if self.min_aligned_seg_mb < 0.0 || self.max_homdel_mb < 0.0 {
            return Err(CnAlignError::Config(
                "min_aligned_seg_mb and max_homdel_mb must be non-negative".to_string(),
            ));
        }

        let deltas = [
            ("delta_tcn_to_int", self.delta_tcn_to_int),
            ("delta_tcn_to_avg", self.delta_tcn_to_avg),
            ("delta_tcnavg_to_int", self.delta_tcnavg_to_int),
            ("delta_mcn_to_int", self.delta_mcn_to_int),
            ("delta_mcn_to_avg", self.delta_mcn_to_avg),
            ("delta_mcnavg_to_int", self.delta_mcnavg_to_int),
        ];
        for (name, value) in deltas {
            if !(0.0..=NEAREST_INT_RADIUS).contains(&value) {
                return Err(CnAlignError::Config(format!(
                    "{} must be within [0, {}], got {}",
                    name, NEAREST_INT_RADIUS, value
                )));
            }
        }

        if !(0.0..=1.0).contains(&self.mcn_weight) {
            return Err(CnAlignError::Config(format!(
                "mcn_weight must be within [0, 1], got {}",
                self.mcn_weight
            )));
        }

        if !(self.rho > 0.0 && self.rho <= 1.0) {
            return Err(CnAlignError::Config(format!(
                "rho must be within (0, 1], got {}",
                self.rho
            )));
        }

        if self.timeout == 0 {
            return Err(CnAlignError::Config("timeout must be positive".to_string()));
        }

        if self.sol_count == 0 {
            return Err(CnAlignError::Config(
                "sol_count must be at least 1".to_string(),
            ));
        }

        if self.logr_gamma <= 0.0 {
            return Err(CnAlignError::Config(format!(
                "logr_gamma must be positive, got {}",
                self.logr_gamma
            )));
        }

        if self.mip_rel_gap < 0.0 || self.obj1_tolerance < 0.0 {
            return Err(CnAlignError::Config(
                "mip_rel_gap and obj1_tolerance must be non-negative".to_string(),
            ));
        }

        if self.pool_min_purity_diff <= 0.0 || self.pool_min_ploidy_diff <= 0.0 {
            return Err(CnAlignError::Config(
                "pool_min_purity_diff and pool_min_ploidy_diff must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
