//! Tabular data exchanged between the sampling and ranking stages, and its CSV format
//!
//! Sample tables are written with a `sample` column holding the sample id followed by one column
//! per reaction. Ranked tables are written with the columns of [`RankedTable::columns`].
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Writer};
use indexmap::IndexMap;
use nalgebra::DMatrix;
use thiserror::Error;

use crate::ranking::RankedTable;

/// Header of the sample id column of a sample table
pub const SAMPLE_COLUMN: &str = "sample";

// region Sample Table
/// Flux samples, one row per sample and one column per reaction
#[derive(Debug, Clone, PartialEq)]
pub struct SampleTable {
    /// Sample ids, one per row
    index: Vec<String>,
    /// Reaction ids, one per column
    columns: Vec<String>,
    values: DMatrix<f64>,
    row_lookup: IndexMap<String, usize>,
    column_lookup: IndexMap<String, usize>,
}

impl SampleTable {
    /// Create a new sample table, checking that the labels match the shape of `values` and
    /// are unique
    pub fn new(
        index: Vec<String>,
        columns: Vec<String>,
        values: DMatrix<f64>,
    ) -> Result<Self, TableError> {
        if values.nrows() != index.len() || values.ncols() != columns.len() {
            return Err(TableError::ShapeMismatch {
                rows: index.len(),
                columns: columns.len(),
                value_rows: values.nrows(),
                value_columns: values.ncols(),
            });
        }
        let column_lookup = position_lookup(&columns).map_err(TableError::DuplicateColumn)?;
        let row_lookup = position_lookup(&index).map_err(TableError::DuplicateSample)?;
        Ok(Self {
            index,
            columns,
            values,
            row_lookup,
            column_lookup,
        })
    }

    /// Create a sample table from rows of values, labelling samples `0..n`
    pub fn from_rows(columns: Vec<String>, rows: &[Vec<f64>]) -> Result<Self, TableError> {
        let ncols = columns.len();
        if let Some((row, values)) = rows.iter().enumerate().find(|(_, r)| r.len() != ncols) {
            return Err(TableError::RowLength {
                row,
                expected: ncols,
                found: values.len(),
            });
        }
        let values = DMatrix::from_fn(rows.len(), ncols, |i, j| rows[i][j]);
        let index = (0..rows.len()).map(|i| i.to_string()).collect();
        Self::new(index, columns, values)
    }

    pub fn index(&self) -> &[String] {
        &self.index
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }

    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }

    /// Position of a reaction column
    pub fn column_position(&self, reaction_id: &str) -> Option<usize> {
        self.column_lookup.get(reaction_id).copied()
    }

    /// Position of a sample row
    pub fn row_position(&self, sample_id: &str) -> Option<usize> {
        self.row_lookup.get(sample_id).copied()
    }

    /// Read a sample table from a CSV file
    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self, TableError> {
        let file = File::open(path.as_ref()).map_err(|source| TableError::Io {
            path: path.as_ref().display().to_string(),
            reason: source.to_string(),
        })?;
        Self::from_reader(file)
    }

    /// Read a sample table from any CSV source
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, TableError> {
        let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);
        let headers = rdr.headers()?.clone();
        let mut header_iter = headers.iter();
        match header_iter.next() {
            Some(first) if first == SAMPLE_COLUMN => {}
            _ => return Err(TableError::MissingSampleColumn),
        }
        let columns: Vec<String> = header_iter.map(|h| h.to_string()).collect();

        let mut index = Vec::new();
        let mut data = Vec::new();
        for (row, record) in rdr.records().enumerate() {
            let record = record?;
            let (sample, values) = Self::parse_record(&record, row, &columns)?;
            index.push(sample);
            data.extend(values);
        }
        let values = DMatrix::from_row_slice(index.len(), columns.len(), &data);
        Self::new(index, columns, values)
    }

    fn parse_record(
        record: &StringRecord,
        row: usize,
        columns: &[String],
    ) -> Result<(String, Vec<f64>), TableError> {
        if record.len() != columns.len() + 1 {
            return Err(TableError::RowLength {
                row,
                expected: columns.len() + 1,
                found: record.len(),
            });
        }
        let sample = record.get(0).unwrap_or_default().to_string();
        let values = record
            .iter()
            .skip(1)
            .zip(columns)
            .map(|(field, column)| {
                parse_float(field).ok_or_else(|| TableError::InvalidValue {
                    row,
                    column: column.clone(),
                    value: field.to_string(),
                })
            })
            .collect::<Result<Vec<f64>, TableError>>()?;
        Ok((sample, values))
    }

    /// Write the sample table to a CSV file
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), TableError> {
        let file = create_file(path.as_ref())?;
        self.to_writer(file)
    }

    /// Write the sample table to any CSV sink
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<(), TableError> {
        let mut wtr = Writer::from_writer(writer);
        wtr.write_record(std::iter::once(SAMPLE_COLUMN).chain(self.columns.iter().map(|c| c.as_str())))?;
        for (i, sample) in self.index.iter().enumerate() {
            let row = self.values.row(i);
            wtr.write_record(
                std::iter::once(sample.clone()).chain(row.iter().map(|v| v.to_string())),
            )?;
        }
        wtr.flush().map_err(|e| TableError::Csv(e.to_string()))?;
        Ok(())
    }
}
// endregion Sample Table

// region Ranked Table
impl RankedTable {
    /// Write the ranked table to a CSV file
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), TableError> {
        let file = create_file(path.as_ref())?;
        self.to_writer(file)
    }

    /// Write the ranked table to any CSV sink
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<(), TableError> {
        let mut wtr = Writer::from_writer(writer);
        wtr.write_record(self.columns())?;
        for entry in &self.entries {
            let mut record = vec![
                entry.rxn_id.clone(),
                entry.z_score.to_string(),
                entry.rank.to_string(),
                entry.rxn_name.clone(),
                entry.gene_id.clone(),
            ];
            for key in &self.annotation_keys {
                record.push(entry.annotations.get(key).cloned().unwrap_or_default());
            }
            wtr.write_record(&record)?;
        }
        wtr.flush().map_err(|e| TableError::Csv(e.to_string()))?;
        Ok(())
    }
}

/// One bin of a z-score histogram
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

/// Histogram of the finite z-scores of a ranked table over `bins` equal width bins
///
/// The last bin is closed on both ends. An empty table, or one whose scores are all infinite,
/// yields no bins.
pub fn z_score_histogram(table: &RankedTable, bins: usize) -> Vec<HistogramBin> {
    let scores: Vec<f64> = table
        .entries
        .iter()
        .map(|e| e.z_score)
        .filter(|z| z.is_finite())
        .collect();
    if scores.is_empty() || bins == 0 {
        return Vec::new();
    }
    let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min == max {
        return vec![HistogramBin {
            start: min,
            end: max,
            count: scores.len(),
        }];
    }
    let width = (max - min) / bins as f64;
    let mut counts = vec![0usize; bins];
    for z in scores {
        let bin = (((z - min) / width) as usize).min(bins - 1);
        counts[bin] += 1;
    }
    counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBin {
            start: min + i as f64 * width,
            end: if i == bins - 1 { max } else { min + (i + 1) as f64 * width },
            count,
        })
        .collect()
}

/// Write a histogram as `bin_start,bin_end,count` rows
pub fn write_histogram_csv<P: AsRef<Path>>(
    path: P,
    histogram: &[HistogramBin],
) -> Result<(), TableError> {
    let file = create_file(path.as_ref())?;
    histogram_to_writer(file, histogram)
}

/// Write a histogram to any CSV sink
pub fn histogram_to_writer<W: Write>(
    writer: W,
    histogram: &[HistogramBin],
) -> Result<(), TableError> {
    let mut wtr = Writer::from_writer(writer);
    wtr.write_record(["bin_start", "bin_end", "count"])?;
    for bin in histogram {
        wtr.write_record([
            bin.start.to_string(),
            bin.end.to_string(),
            bin.count.to_string(),
        ])?;
    }
    wtr.flush().map_err(|e| TableError::Csv(e.to_string()))?;
    Ok(())
}
// endregion Ranked Table

fn create_file(path: &Path) -> Result<File, TableError> {
    File::create(path).map_err(|source| TableError::Io {
        path: path.display().to_string(),
        reason: source.to_string(),
    })
}

/// Parse a float field, `inf`, `-infinity` and `NaN` spellings included
fn parse_float(field: &str) -> Option<f64> {
    field.trim().parse().ok()
}

/// Map each label to its position, failing on the first repeated label
fn position_lookup(labels: &[String]) -> Result<IndexMap<String, usize>, String> {
    let mut lookup = IndexMap::with_capacity(labels.len());
    for (i, label) in labels.iter().enumerate() {
        if lookup.insert(label.clone(), i).is_some() {
            return Err(label.clone());
        }
    }
    Ok(lookup)
}

/// Errors raised while reading or writing tables
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TableError {
    /// The file could not be opened or created
    #[error("Unable to access {path}: {reason}")]
    Io { path: String, reason: String },
    /// Malformed CSV, or a failed write
    #[error("CSV error: {0}")]
    Csv(String),
    /// The first column of a sample table must hold the sample ids
    #[error("Sample table is missing its leading `sample` column")]
    MissingSampleColumn,
    /// A row has the wrong number of fields
    #[error("Row {row} has {found} fields, expected {expected}")]
    RowLength {
        row: usize,
        expected: usize,
        found: usize,
    },
    /// A flux value is not a number
    #[error("Invalid value {value:?} in row {row}, column {column}")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },
    /// The labels do not match the value matrix
    #[error("Table labels describe a {rows}x{columns} table but values are {value_rows}x{value_columns}")]
    ShapeMismatch {
        rows: usize,
        columns: usize,
        value_rows: usize,
        value_columns: usize,
    },
    #[error("Duplicate reaction column {0}")]
    DuplicateColumn(String),
    #[error("Duplicate sample id {0}")]
    DuplicateSample(String),
}

impl From<csv::Error> for TableError {
    fn from(value: csv::Error) -> Self {
        TableError::Csv(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ranking::RankedEntry;
    use indexmap::IndexMap;

    fn columns(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn sample_table_csv() {
        let table =
            SampleTable::from_rows(columns(&["R1", "R2"]), &[vec![1.5, -2.], vec![0., 3.25]])
                .unwrap();
        assert_eq!(table.index(), &["0".to_string(), "1".to_string()]);

        let mut buffer = Vec::new();
        table.to_writer(&mut buffer).unwrap();
        let text = String::from_utf8(buffer.clone()).unwrap();
        assert_eq!(text, "sample,R1,R2\n0,1.5,-2\n1,0,3.25\n");

        let reread = SampleTable::from_reader(buffer.as_slice()).unwrap();
        assert_eq!(reread, table);
        assert_eq!(reread.column_position("R2"), Some(1));
        assert_eq!(reread.row_position("1"), Some(1));
    }

    #[test]
    fn sample_table_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("samples.csv");
        let table = SampleTable::from_rows(columns(&["R1"]), &[vec![1.], vec![2.]]).unwrap();
        table.write_csv(&path).unwrap();
        assert_eq!(SampleTable::read_csv(&path).unwrap(), table);
        assert!(matches!(
            SampleTable::read_csv(dir.path().join("missing.csv")),
            Err(TableError::Io { .. })
        ));
    }

    #[test]
    fn malformed_sample_tables() {
        assert_eq!(
            SampleTable::from_reader("R1,R2\n1,2\n".as_bytes()),
            Err(TableError::MissingSampleColumn)
        );
        assert_eq!(
            SampleTable::from_reader("sample,R1\n0,abc\n".as_bytes()),
            Err(TableError::InvalidValue {
                row: 0,
                column: "R1".to_string(),
                value: "abc".to_string()
            })
        );
        assert_eq!(
            SampleTable::from_reader("sample,R1,R1\n0,1,2\n".as_bytes()),
            Err(TableError::DuplicateColumn("R1".to_string()))
        );
        assert_eq!(
            SampleTable::from_reader("sample,R1\na,1\na,2\n".as_bytes()),
            Err(TableError::DuplicateSample("a".to_string()))
        );
        assert!(matches!(
            SampleTable::from_rows(columns(&["R1"]), &[vec![1., 2.]]),
            Err(TableError::RowLength { .. })
        ));
    }

    #[test]
    fn infinite_values_are_read() {
        let table =
            SampleTable::from_reader("sample,R1\n0,inf\n1,-Infinity\n2, NaN\n".as_bytes())
                .unwrap();
        assert_eq!(table.values()[(0, 0)], f64::INFINITY);
        assert_eq!(table.values()[(1, 0)], f64::NEG_INFINITY);
        assert!(table.values()[(2, 0)].is_nan());
    }

    #[test]
    fn label_positions() {
        let table = SampleTable::from_rows(
            columns(&["R3", "R1", "R2"]),
            &[vec![1., 2., 3.], vec![4., 5., 6.], vec![7., 8., 9.]],
        )
        .unwrap();
        assert_eq!(table.column_position("R1"), Some(1));
        assert_eq!(table.column_position("R9"), None);
        assert_eq!(table.row_position("2"), Some(2));
        assert_eq!(table.row_position("3"), None);
    }

    #[test]
    fn ranked_table_csv() {
        let mut entry = RankedEntry::new("R1", -2.5);
        entry.rank = 1;
        entry.rxn_name = "A to B".to_string();
        entry.gene_id = "g1;g2".to_string();
        let mut annotations = IndexMap::new();
        annotations.insert("uniprot".to_string(), "P1;".to_string());
        entry.annotations = annotations;
        let table = RankedTable {
            annotation_keys: vec!["uniprot".to_string()],
            entries: vec![entry],
        };

        let mut buffer = Vec::new();
        table.to_writer(&mut buffer).unwrap();
        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            "rxn_id,z-score,rank,rxn_name,gene_id,uniprot\nR1,-2.5,1,A to B,g1;g2,P1;\n"
        );
    }

    #[test]
    fn histogram() {
        let table = RankedTable {
            annotation_keys: vec![],
            entries: [4., -2., 1., 0.5, f64::INFINITY]
                .iter()
                .map(|z| RankedEntry::new("R", *z))
                .collect(),
        };
        let bins = z_score_histogram(&table, 3);
        assert_eq!(bins.len(), 3);
        assert!((bins[0].start + 2.).abs() < 1e-12);
        assert!((bins[2].end - 4.).abs() < 1e-12);
        let counts: Vec<usize> = bins.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![1, 2, 1]);
        assert!(z_score_histogram(&RankedTable::default(), 3).is_empty());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("distribution.csv");
        write_histogram_csv(&path, &bins).unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.starts_with("bin_start,bin_end,count\n-2,0,1\n"));
    }
}
