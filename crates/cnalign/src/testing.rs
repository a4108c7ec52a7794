//! Synthetic multi-region data for solver-backed tests

use std::io::Write;

use tempfile::NamedTempFile;

use crate::observations::{ObservationRow, ObservationTable};
use crate::session::SolverSession;

/// Clonal (total, minor) copy-number state of one segment
pub type State = (f64, f64);

/// Two regions of one tumor, both diploid-baseline
pub const PURITIES: [f64; 2] = [0.4, 0.7];
pub const PLOIDY: f64 = 2.0;
pub const STATES: [State; 5] = [(1.0, 0.0), (3.0, 1.0), (4.0, 1.0), (3.0, 1.0), (1.0, 0.0)];
pub const MBS: [f64; 5] = [20.0, 30.0, 25.0, 15.0, 40.0];

/// logR and BAF a clonal state produces at the given purity/ploidy
pub fn observe(state: State, purity: f64, ploidy: f64) -> (f64, f64) {
    let (n, n_b) = state;
    let normal = 2.0 * (1.0 - purity);
    let logr = ((normal + purity * n) / (normal + purity * ploidy)).log2();
    let baf = ((1.0 - purity) + purity * n_b) / (normal + purity * n);
    (logr, baf)
}

pub fn rows(purities: &[f64], ploidy: f64, states: &[State], mbs: &[f64]) -> Vec<ObservationRow> {
    let mut out = Vec::new();
    for (s, &purity) in purities.iter().enumerate() {
        for (g, (&state, &mb)) in states.iter().zip(mbs).enumerate() {
            let (logr, baf) = observe(state, purity, ploidy);
            out.push(ObservationRow {
                sample: format!("S{}", s + 1),
                segment: format!("seg{}", g + 1),
                logr,
                baf: Some(baf),
                gc: 0.4,
                mb,
            });
        }
    }
    out
}

pub fn table(purities: &[f64], ploidy: f64, states: &[State], mbs: &[f64]) -> ObservationTable {
    ObservationTable::from_rows(rows(purities, ploidy, states, mbs)).unwrap()
}

/// 2 samples × 5 segments, purity 0.4/0.7, ploidy 2.0
pub fn two_region_table() -> ObservationTable {
    table(&PURITIES, PLOIDY, &STATES, &MBS)
}

/// Session backed by a throwaway credential; keep the file alive with it
pub fn session() -> (NamedTempFile, SolverSession) {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "LICENSEID=test").unwrap();
    let session = SolverSession::acquire(file.path()).unwrap();
    (file, session)
}
