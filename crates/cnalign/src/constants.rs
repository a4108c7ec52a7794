/// Expected headers in the observation table
pub const COL_SAMPLE: &str = "sample";
pub const COL_SEGMENT: &str = "segment";
pub const COL_LOGR: &str = "logR";
pub const COL_BAF: &str = "BAF";
pub const COL_GC: &str = "GC";
pub const COL_MB: &str = "mb";
pub const REQUIRED_COLUMNS: [&str; 6] = [COL_SAMPLE, COL_SEGMENT, COL_LOGR, COL_BAF, COL_GC, COL_MB];

/// Missing BAF markers (segments without heterozygous SNPs)
pub const MISSING_VALUES: [&str; 4] = ["", "NA", "NaN", "nan"];

/// Output table
pub const OUTPUT_VARIABLE_HEADER: &str = "Variable";
pub const OUTPUT_SOLUTION_PREFIX: &str = "Solution_";
pub const OUTPUT_DECIMALS: i32 = 6;

/// Default model parameters
pub const DEFAULT_MIN_PLOIDY: f64 = 1.6;
pub const DEFAULT_MAX_PLOIDY: f64 = 6.0;
pub const DEFAULT_MIN_PURITY: f64 = 0.05;
pub const DEFAULT_MAX_PURITY: f64 = 0.95;
pub const DEFAULT_MIN_ALIGNED_SEG_MB: f64 = 5.0;
pub const DEFAULT_MAX_HOMDEL_MB: f64 = 100.0;
pub const DEFAULT_DELTA_TO_INT: f64 = 0.2; // tcn/mcn -> nearest integer
pub const DEFAULT_DELTA_TO_AVG: f64 = 0.1; // tcn/mcn -> segment average
pub const DEFAULT_DELTA_AVG_TO_INT: f64 = 0.1; // segment average -> nearest integer
pub const DEFAULT_MCN_WEIGHT: f64 = 0.5;
pub const DEFAULT_RHO: f64 = 1.0;
pub const DEFAULT_TIMEOUT_SECS: u64 = 3 * 60;
pub const DEFAULT_MIN_CNA_SEGMENTS: usize = 5;
pub const DEFAULT_SOL_COUNT: usize = 10;
pub const DEFAULT_LOGR_GAMMA: f64 = 1.0; // sequencing data
pub const DEFAULT_POOL_MIN_PURITY_DIFF: f64 = 0.01;
pub const DEFAULT_POOL_MIN_PLOIDY_DIFF: f64 = 0.05;
pub const DEFAULT_OBJ1_TOLERANCE: f64 = 1e-6; // [Mb]
pub const DEFAULT_MIP_REL_GAP: f64 = 1e-4;

/// |x - round(x)| never exceeds this for a nearest integer
pub const NEAREST_INT_RADIUS: f64 = 0.5;

/// Binary variables are read back against this threshold
pub const BINARY_THRESHOLD: f64 = 0.5;
