use crate::constants::{
    COL_BAF, COL_GC, COL_LOGR, COL_MB, COL_SAMPLE, COL_SEGMENT, MISSING_VALUES, REQUIRED_COLUMNS,
};
use crate::error::{CnAlignError, Result};

use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

/// One sequenced tumor region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub id: String,
}

/// One genomic interval shared by all samples
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub id: String,
    pub mb: f64,
    pub gc: f64,
}

/// Raw measurement of one (sample, segment) pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub logr: f64,
    /// `None` when the segment has no heterozygous SNPs
    pub baf: Option<f64>,
}

/// One parsed row of the input table
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationRow {
    pub sample: String,
    pub segment: String,
    pub logr: f64,
    pub baf: Option<f64>,
    pub gc: f64,
    pub mb: f64,
}

/// Validated rectangular table: every sample has exactly one observation per segment
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationTable {
    samples: Vec<Sample>,
    segments: Vec<Segment>,
    /// sample-major: observations[s * n_segments + g]
    observations: Vec<Observation>,
}

impl ObservationTable {
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }

    pub fn n_segments(&self) -> usize {
        self.segments.len()
    }

    pub fn observation(&self, sample: usize, segment: usize) -> &Observation {
        &self.observations[sample * self.segments.len() + segment]
    }

    /// Total length of all segments [Mb]
    pub fn total_mb(&self) -> f64 {
        self.segments.iter().map(|seg| seg.mb).sum()
    }

    /// Builds the table from parsed rows
    ///
    /// Samples keep their order of first appearance, segments follow the order
    /// of the first sample. Every other sample must cover the same segment set.
    pub fn from_rows(rows: Vec<ObservationRow>) -> Result<Self> {
        if rows.is_empty() {
            return Err(CnAlignError::EmptyTable);
        }

        let mut sample_index: HashMap<String, usize> = HashMap::new();
        let mut samples: Vec<Sample> = Vec::new();
        let mut per_sample: Vec<HashMap<String, ObservationRow>> = Vec::new();
        let mut first_sample_order: Vec<String> = Vec::new();

        for row in rows {
            let s = *sample_index.entry(row.sample.clone()).or_insert_with(|| {
                samples.push(Sample {
                    id: row.sample.clone(),
                });
                per_sample.push(HashMap::new());
                samples.len() - 1
            });

            if s == 0 && !per_sample[0].contains_key(&row.segment) {
                first_sample_order.push(row.segment.clone());
            }

            if per_sample[s].contains_key(&row.segment) {
                return Err(CnAlignError::DuplicateObservation {
                    sample: row.sample,
                    segment: row.segment,
                });
            }
            per_sample[s].insert(row.segment.clone(), row);
        }

        let segments: Vec<Segment> = first_sample_order
            .iter()
            .map(|id| {
                let row = &per_sample[0][id];
                Segment {
                    id: id.clone(),
                    mb: row.mb,
                    gc: row.gc,
                }
            })
            .collect();

        let mut observations = Vec::with_capacity(samples.len() * segments.len());
        for (s, sample) in samples.iter().enumerate() {
            let rows = &per_sample[s];
            if rows.len() != segments.len() {
                return Err(CnAlignError::NonRectangular {
                    sample: sample.id.clone(),
                    detail: format!(
                        "{} segments observed, {} expected",
                        rows.len(),
                        segments.len()
                    ),
                });
            }

            for segment in &segments {
                let row = rows
                    .get(&segment.id)
                    .ok_or_else(|| CnAlignError::NonRectangular {
                        sample: sample.id.clone(),
                        detail: format!("missing segment '{}'", segment.id),
                    })?;

                // segmentation is shared, so the segment length must agree
                if (row.mb - segment.mb).abs() > 1e-9 {
                    return Err(CnAlignError::InconsistentSegment {
                        segment: segment.id.clone(),
                        column: COL_MB,
                    });
                }
                if (row.gc - segment.gc).abs() > 1e-9 {
                    log::warn!(
                        "segment '{}': GC differs between samples ({} vs {}), keeping the first",
                        segment.id,
                        segment.gc,
                        row.gc
                    );
                }

                observations.push(Observation {
                    logr: row.logr,
                    baf: row.baf,
                });
            }
        }

        Ok(Self {
            samples,
            segments,
            observations,
        })
    }
}

/// Reads the tab-delimited observation table
///
/// # Errors
/// Returns error if the file cannot be read, a required column is missing,
/// a value does not parse, or samples do not share one segment set
pub fn read_observations<P: AsRef<Path>>(path: P) -> Result<ObservationTable> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let table = read_observations_from_reader(file)?;
    log::info!(
        "loaded {} samples x {} segments ({:.1} Mb) from {}",
        table.n_samples(),
        table.n_segments(),
        table.total_mb(),
        path.display()
    );
    Ok(table)
}

/// Reads `sample, segment, logR, BAF, GC, mb` columns in any order
pub fn read_observations_from_reader<R: Read>(reader: R) -> Result<ObservationTable> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(reader);

    let columns = resolve_columns(&mut rdr)?;

    let mut rows = Vec::new();
    for (i, result) in rdr.records().enumerate() {
        let rec = result?;
        let row = i + 2; // 1-indexed, +1 for header

        if rec.iter().all(|f| f.is_empty()) {
            continue;
        }
        rows.push(parse_record(&rec, row, &columns)?);
    }

    ObservationTable::from_rows(rows)
}

/// Column positions of the required headers
#[derive(Debug, Clone, Copy)]
struct ColumnIndex {
    sample: usize,
    segment: usize,
    logr: usize,
    baf: usize,
    gc: usize,
    mb: usize,
    width: usize,
}

fn resolve_columns<R: Read>(csv_reader: &mut csv::Reader<R>) -> Result<ColumnIndex> {
    let headers = csv_reader
        .headers()
        .map_err(|e| CnAlignError::TableHeader(format!("Failed to read headers: {}", e)))?;

    let find = |name: &str| -> Result<usize> {
        headers.iter().position(|h| h == name).ok_or_else(|| {
            CnAlignError::TableHeader(format!(
                "missing column '{}' (required: {})",
                name,
                REQUIRED_COLUMNS.join(", ")
            ))
        })
    };

    Ok(ColumnIndex {
        sample: find(COL_SAMPLE)?,
        segment: find(COL_SEGMENT)?,
        logr: find(COL_LOGR)?,
        baf: find(COL_BAF)?,
        gc: find(COL_GC)?,
        mb: find(COL_MB)?,
        width: headers.len(),
    })
}

fn parse_record(rec: &StringRecord, row: usize, columns: &ColumnIndex) -> Result<ObservationRow> {
    if rec.len() != columns.width {
        return Err(CnAlignError::TableRow {
            row,
            expected: columns.width,
            got: rec.len(),
        });
    }

    let sample = get_column_value(rec, columns.sample, row, columns.width)?;
    let segment = get_column_value(rec, columns.segment, row, columns.width)?;
    if sample.is_empty() || segment.is_empty() {
        return Err(CnAlignError::TableRow {
            row,
            expected: columns.width,
            got: rec.iter().filter(|f| !f.is_empty()).count(),
        });
    }

    let logr = parse_float(
        get_column_value(rec, columns.logr, row, columns.width)?,
        row,
        COL_LOGR,
    )?;
    let gc = parse_float(
        get_column_value(rec, columns.gc, row, columns.width)?,
        row,
        COL_GC,
    )?;
    let mb = parse_float(
        get_column_value(rec, columns.mb, row, columns.width)?,
        row,
        COL_MB,
    )?;
    if mb < 0.0 {
        return Err(CnAlignError::ValueRange {
            row,
            column: COL_MB,
            value: mb,
        });
    }

    let baf_str = get_column_value(rec, columns.baf, row, columns.width)?;
    let baf = if MISSING_VALUES.contains(&baf_str) {
        None
    } else {
        let baf = parse_float(baf_str, row, COL_BAF)?;
        if !(0.0..=1.0).contains(&baf) {
            return Err(CnAlignError::ValueRange {
                row,
                column: COL_BAF,
                value: baf,
            });
        }
        Some(baf)
    };

    Ok(ObservationRow {
        sample: sample.to_string(),
        segment: segment.to_string(),
        logr,
        baf,
        gc,
        mb,
    })
}

fn get_column_value(
    record: &StringRecord,
    column_index: usize,
    row_number: usize,
    expected: usize,
) -> Result<&str> {
    record
        .get(column_index)
        .ok_or_else(|| CnAlignError::TableRow {
            row: row_number,
            expected,
            got: record.len(),
        })
}

/// Parses a finite float
fn parse_float(value: &str, row: usize, column: &'static str) -> Result<f64> {
    let parsed: f64 = value.parse().map_err(|source| CnAlignError::ValueParse {
        row,
        column,
        value: value.to_string(),
        source,
    })?;
    if !parsed.is_finite() {
        return Err(CnAlignError::ValueRange {
            row,
            column,
            value: parsed,
        });
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "sample\tsegment\tlogR\tBAF\tGC\tmb\n";

    fn read(body: &str) -> Result<ObservationTable> {
        read_observations_from_reader(format!("{HEADER}{body}").as_bytes())
    }

    #[test]
    fn test_read_rectangular_table() {
        let table = read(
            "S1\tseg1\t0.1\t0.3\t0.41\t10\n\
             S1\tseg2\t-0.2\t0.5\t0.39\t20\n\
             S2\tseg1\t0.05\t0.4\t0.41\t10\n\
             S2\tseg2\t-0.1\t0.45\t0.39\t20\n",
        )
        .unwrap();

        assert_eq!(table.n_samples(), 2);
        assert_eq!(table.n_segments(), 2);
        assert_eq!(table.samples()[1].id, "S2");
        assert_eq!(table.segments()[1].id, "seg2");
        assert_eq!(table.segments()[1].mb, 20.0);
        assert_eq!(table.observation(1, 0).logr, 0.05);
        assert_eq!(table.observation(0, 1).baf, Some(0.5));
        assert!((table.total_mb() - 30.0).abs() < 1e-12);
    }

    #[test]
    fn test_segment_order_follows_first_sample() {
        let table = read(
            "S1\tb\t0.1\t0.3\t0.4\t5\n\
             S1\ta\t0.1\t0.3\t0.4\t6\n\
             S2\ta\t0.2\t0.3\t0.4\t6\n\
             S2\tb\t0.3\t0.3\t0.4\t5\n",
        )
        .unwrap();

        let ids: Vec<&str> = table.segments().iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        // S2 rows are reordered onto the shared segment order
        assert_eq!(table.observation(1, 0).logr, 0.3);
        assert_eq!(table.observation(1, 1).logr, 0.2);
    }

    #[test]
    fn test_columns_in_any_order_with_extra_columns() {
        let input = "mb\tGC\tBAF\tlogR\tsegment\tsample\tnote\n\
                     10\t0.4\t0.25\t0.3\tseg1\tS1\tx\n";
        let table = read_observations_from_reader(input.as_bytes()).unwrap();
        assert_eq!(table.samples()[0].id, "S1");
        assert_eq!(table.observation(0, 0).logr, 0.3);
        assert_eq!(table.observation(0, 0).baf, Some(0.25));
        assert_eq!(table.segments()[0].mb, 10.0);
    }

    #[test]
    fn test_missing_baf_is_none() {
        let table = read("S1\tseg1\t0.1\tNA\t0.4\t10\nS1\tseg2\t0.1\t\t0.4\t10\n").unwrap();
        assert_eq!(table.observation(0, 0).baf, None);
        assert_eq!(table.observation(0, 1).baf, None);
    }

    #[test]
    fn test_missing_column_rejected() {
        let input = "sample\tsegment\tlogR\tGC\tmb\nS1\tseg1\t0.1\t0.4\t10\n";
        let result = read_observations_from_reader(input.as_bytes());
        match result {
            Err(CnAlignError::TableHeader(msg)) => assert!(msg.contains("BAF")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_non_rectangular_rejected() {
        let result = read(
            "S1\tseg1\t0.1\t0.3\t0.4\t10\n\
             S1\tseg2\t0.1\t0.3\t0.4\t10\n\
             S2\tseg1\t0.1\t0.3\t0.4\t10\n",
        );
        assert!(matches!(
            result,
            Err(CnAlignError::NonRectangular { ref sample, .. }) if sample == "S2"
        ));

        let result = read(
            "S1\tseg1\t0.1\t0.3\t0.4\t10\n\
             S1\tseg2\t0.1\t0.3\t0.4\t10\n\
             S2\tseg1\t0.1\t0.3\t0.4\t10\n\
             S2\tseg3\t0.1\t0.3\t0.4\t10\n",
        );
        assert!(matches!(result, Err(CnAlignError::NonRectangular { .. })));
    }

    #[test]
    fn test_duplicate_observation_rejected() {
        let result = read("S1\tseg1\t0.1\t0.3\t0.4\t10\nS1\tseg1\t0.2\t0.3\t0.4\t10\n");
        assert!(matches!(
            result,
            Err(CnAlignError::DuplicateObservation { .. })
        ));
    }

    #[test]
    fn test_inconsistent_segment_length_rejected() {
        let result = read("S1\tseg1\t0.1\t0.3\t0.4\t10\nS2\tseg1\t0.1\t0.3\t0.4\t12\n");
        assert!(matches!(
            result,
            Err(CnAlignError::InconsistentSegment { column: "mb", .. })
        ));
    }

    #[test]
    fn test_bad_values_rejected() {
        let result = read("S1\tseg1\tabc\t0.3\t0.4\t10\n");
        assert!(matches!(
            result,
            Err(CnAlignError::ValueParse {
                row: 2,
                column: "logR",
                ..
            })
        ));

        let result = read("S1\tseg1\t0.1\t1.3\t0.4\t10\n");
        assert!(matches!(
            result,
            Err(CnAlignError::ValueRange { column: "BAF", .. })
        ));

        let result = read("S1\tseg1\t0.1\t0.3\t0.4\t-1\n");
        assert!(matches!(
            result,
            Err(CnAlignError::ValueRange { column: "mb", .. })
        ));
    }

    #[test]
    fn test_empty_table_rejected() {
        assert!(matches!(read(""), Err(CnAlignError::EmptyTable)));
    }

    #[test]
    fn test_read_observations_nonexistent_file() {
        let result = read_observations("nonexistent_directory/input.tsv");
        assert!(matches!(result, Err(CnAlignError::Io(_))));
    }
}
