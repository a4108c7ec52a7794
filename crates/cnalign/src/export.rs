use std::fs;
use std::path::{Path, PathBuf};

use csv::WriterBuilder;
use itertools::Itertools;
use serde::Serialize;

use crate::config::Config;
use crate::constants::{OUTPUT_DECIMALS, OUTPUT_SOLUTION_PREFIX, OUTPUT_VARIABLE_HEADER};
use crate::error::{CnAlignError, Result};
use crate::observations::ObservationTable;
use crate::optimize::{PoolStatus, Solution, SolutionPool};

/// Variable-by-solution result table, assembled fully in memory
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable {
    header: Vec<String>,
    rows: Vec<(String, Vec<f64>)>,
}

impl ResultTable {
    /// Rows: Obj1, Obj2, pl[s], pu[s], allmatch[g], tcn[s,g], mcn[s,g]
    pub fn from_pool(table: &ObservationTable, pool: &SolutionPool) -> Self {
        let solutions = pool.solutions();
        let header = std::iter::once(OUTPUT_VARIABLE_HEADER.to_string())
            .chain((1..=solutions.len()).map(|i| format!("{}{}", OUTPUT_SOLUTION_PREFIX, i)))
            .collect();

        let flag = |b: bool| if b { 1.0 } else { 0.0 };
        let mut rows = vec![
            ("Obj1".to_string(), values(solutions, |sol| sol.obj1)),
            ("Obj2".to_string(), values(solutions, |sol| sol.obj2)),
        ];
        for (s, sample) in table.samples().iter().enumerate() {
            rows.push((format!("pl[{}]", sample.id), values(solutions, |sol| sol.ploidy[s])));
        }
        for (s, sample) in table.samples().iter().enumerate() {
            rows.push((format!("pu[{}]", sample.id), values(solutions, |sol| sol.purity[s])));
        }
        for (g, segment) in table.segments().iter().enumerate() {
            rows.push((
                format!("allmatch[{}]", segment.id),
                values(solutions, |sol| flag(sol.allmatch[g])),
            ));
        }
        for (s, sample) in table.samples().iter().enumerate() {
            for (g, segment) in table.segments().iter().enumerate() {
                rows.push((
                    format!("tcn[{},{}]", sample.id, segment.id),
                    values(solutions, |sol| sol.tcn(s, g)),
                ));
            }
        }
        for (s, sample) in table.samples().iter().enumerate() {
            for (g, segment) in table.segments().iter().enumerate() {
                rows.push((
                    format!("mcn[{},{}]", sample.id, segment.id),
                    values(solutions, |sol| sol.mcn(s, g)),
                ));
            }
        }

        Self { header, rows }
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn row(&self, name: &str) -> Option<&[f64]> {
        self.rows
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, values)| values.as_slice())
    }

    pub fn row_names(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|(name, _)| name.as_str())
    }

    /// Tab-delimited, written to a sibling temp file and renamed into place
    pub fn write_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut writer = WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(Vec::new());

        writer.write_record(&self.header)?;
        for (name, values) in &self.rows {
            let record = std::iter::once(name.clone()).chain(values.iter().map(|&v| format_value(v)));
            writer.write_record(record)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| CnAlignError::Io(e.into_error()))?;

        write_atomically(path, &bytes)?;
        log::info!(
            "wrote {} rows x {} solutions to {}",
            self.rows.len(),
            self.header.len() - 1,
            path.display()
        );
        Ok(())
    }
}

fn values(solutions: &[Solution], value: impl Fn(&Solution) -> f64) -> Vec<f64> {
    solutions.iter().map(value).collect()
}

/// Round to the output precision; whole numbers keep one decimal place
pub fn format_value(value: f64) -> String {
    let scale = 10f64.powi(OUTPUT_DECIMALS);
    let mut rounded = (value * scale).round() / scale;
    if rounded == 0.0 {
        // drop the sign of -0
        rounded = 0.0;
    }
    if rounded.fract() == 0.0 {
        format!("{:.1}", rounded)
    } else {
        format!("{}", rounded)
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.tmp", name))
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = temp_sibling(path);
    let result = fs::write(&tmp, bytes).and_then(|_| fs::rename(&tmp, path));
    if let Err(source) = result {
        let _ = fs::remove_file(&tmp);
        return Err(CnAlignError::WriteFile {
            path: path.to_path_buf(),
            source,
        });
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct SolutionSummary {
    rank: usize,
    obj1: f64,
    obj2: f64,
    purity: Vec<(String, f64)>,
    ploidy: Vec<(String, f64)>,
    aligned_segments: Vec<String>,
}

/// JSON run summary written next to the result table
#[derive(Debug, Serialize)]
pub struct RunSummary<'a> {
    timestamp: String,
    input: String,
    samples: usize,
    segments: usize,
    total_mb: f64,
    status: PoolStatus,
    config: &'a Config,
    solutions: Vec<SolutionSummary>,
}

impl<'a> RunSummary<'a> {
    pub fn new(
        input: &Path,
        table: &ObservationTable,
        pool: &SolutionPool,
        config: &'a Config,
    ) -> Self {
        let sample_ids = table.samples().iter().map(|s| s.id.clone()).collect_vec();
        let solutions = pool
            .solutions()
            .iter()
            .enumerate()
            .map(|(i, sol)| SolutionSummary {
                rank: i + 1,
                obj1: sol.obj1,
                obj2: sol.obj2,
                purity: sample_ids.iter().cloned().zip(sol.purity.iter().copied()).collect(),
                ploidy: sample_ids.iter().cloned().zip(sol.ploidy.iter().copied()).collect(),
                aligned_segments: table
                    .segments()
                    .iter()
                    .zip(&sol.allmatch)
                    .filter(|(_, all)| **all)
                    .map(|(seg, _)| seg.id.clone())
                    .collect(),
            })
            .collect();

        Self {
            timestamp: chrono::Local::now().to_rfc3339(),
            input: input.display().to_string(),
            samples: table.n_samples(),
            segments: table.n_segments(),
            total_mb: table.total_mb(),
            status: pool.status(),
            config,
            solutions,
        }
    }

    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        write_atomically(path, json.as_bytes())?;
        log::info!("run summary saved to {}", path.display());
        Ok(())
    }
}
