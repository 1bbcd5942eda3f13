// src/utils/array_file.rs
//! Numeric arrays to and from delimited text files
//!
//! Values are written with four decimals, one row per line. Readers accept
//! comma and/or whitespace separated values and skip blank lines and `#`
//! comments, so both the saved error series and the `time, sample,
//! amplitude` dataset tables round-trip through the same code.

use crate::config::constants::persistence::DECIMALS;
use crate::error::{CaloError, CaloResult, ErrorContext, IntoCaloError};
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use ndarray::{Array1, Array2};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const COMPONENT: &str = "array_file";

fn csv_error(path: &Path, err: csv::Error, operation: &str) -> CaloError {
    let line = err.position().map_or(0, |p| p.line() as usize);
    match err.into_kind() {
        csv::ErrorKind::Io(source) => CaloError::from_io(source, path, COMPONENT, operation),
        other => CaloError::Parse {
            path: path.to_path_buf(),
            line,
            reason: format!("{:?}", other),
            context: ErrorContext::new(COMPONENT, operation),
        },
    }
}

/// Target directory must exist and be writable
fn writable_target(directory: &Path, filename: &str, operation: &str) -> CaloResult<PathBuf> {
    if !directory.is_dir() {
        return Err(CaloError::NotFound {
            path: directory.to_path_buf(),
            context: ErrorContext::new(COMPONENT, operation),
        });
    }

    let metadata = std::fs::metadata(directory).calo_err(directory, COMPONENT, operation)?;
    if metadata.permissions().readonly() {
        return Err(CaloError::PermissionDenied {
            path: directory.to_path_buf(),
            context: ErrorContext::new(COMPONENT, operation),
        });
    }

    Ok(directory.join(filename))
}

fn write_rows<I>(path: &Path, rows: I, operation: &str) -> CaloResult<()>
where
    I: IntoIterator<Item = Vec<f64>>,
{
    let file = File::create(path).calo_err(path, COMPONENT, operation)?;
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);

    for row in rows {
        let fields: Vec<String> = row.iter().map(|v| format!("{:.*}", DECIMALS, v)).collect();
        writer
            .write_record(&fields)
            .map_err(|e| csv_error(path, e, operation))?;
    }

    writer.flush().calo_err(path, COMPONENT, operation)
}

/// Save a flat array, one value per line
pub fn save_array_to_file<P: AsRef<Path>>(
    directory: P,
    filename: &str,
    values: &[f64],
) -> CaloResult<PathBuf> {
    let path = writable_target(directory.as_ref(), filename, "save_array_to_file")?;
    write_rows(&path, values.iter().map(|v| vec![*v]), "save_array_to_file")?;

    info!(path = %path.display(), count = values.len(), "array saved");
    Ok(path)
}

/// Save a 2-D table, one comma separated row per line
pub fn save_table_to_file<P: AsRef<Path>>(
    directory: P,
    filename: &str,
    table: &Array2<f64>,
) -> CaloResult<PathBuf> {
    let path = writable_target(directory.as_ref(), filename, "save_table_to_file")?;
    write_rows(&path, table.rows().into_iter().map(|r| r.to_vec()), "save_table_to_file")?;

    info!(path = %path.display(), rows = table.nrows(), cols = table.ncols(), "table saved");
    Ok(path)
}

fn parse_record(path: &Path, record: &StringRecord, operation: &str) -> CaloResult<Vec<f64>> {
    let line = record.position().map_or(0, |p| p.line() as usize);
    record
        .iter()
        .flat_map(str::split_whitespace)
        .map(|token| {
            token.parse::<f64>().map_err(|_| CaloError::Parse {
                path: path.to_path_buf(),
                line,
                reason: format!("'{}' is not a number", token),
                context: ErrorContext::new(COMPONENT, operation),
            })
        })
        .collect()
}

/// Parse every non-empty line of a delimited numeric file
pub(crate) fn read_rows(path: &Path, operation: &str) -> CaloResult<Vec<Vec<f64>>> {
    if !path.is_file() {
        return Err(CaloError::NotFound {
            path: path.to_path_buf(),
            context: ErrorContext::new(COMPONENT, operation),
        });
    }

    let file = File::open(path).calo_err(path, COMPONENT, operation)?;
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .comment(Some(b'#'))
        .from_reader(file);

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| csv_error(path, e, operation))?;
        let row = parse_record(path, &record, operation)?;
        if !row.is_empty() {
            rows.push(row);
        }
    }

    debug!(path = %path.display(), rows = rows.len(), "numeric file read");
    Ok(rows)
}

/// Read every value of a file as one flat array, in row-major order
pub fn read_array_from_file<P: AsRef<Path>>(directory: P, filename: &str) -> CaloResult<Array1<f64>> {
    let path = directory.as_ref().join(filename);
    let rows = read_rows(&path, "read_array_from_file")?;
    Ok(rows.into_iter().flatten().collect())
}

/// Read a rectangular table; every row must have the same width
pub fn read_table_from_file<P: AsRef<Path>>(directory: P, filename: &str) -> CaloResult<Array2<f64>> {
    let path = directory.as_ref().join(filename);
    let rows = read_rows(&path, "read_table_from_file")?;

    let n_cols = rows.first().map_or(0, Vec::len);
    if let Some(index) = rows.iter().position(|r| r.len() != n_cols) {
        return Err(CaloError::Parse {
            path,
            line: 0,
            reason: format!(
                "data row {} has {} columns, expected {}",
                index + 1,
                rows[index].len(),
                n_cols
            ),
            context: ErrorContext::new(COMPONENT, "read_table_from_file"),
        });
    }

    let n_rows = rows.len();
    let values: Vec<f64> = rows.into_iter().flatten().collect();
    Array2::from_shape_vec((n_rows, n_cols), values).map_err(|e| CaloError::Parse {
        path,
        line: 0,
        reason: e.to_string(),
        context: ErrorContext::new(COMPONENT, "read_table_from_file"),
    })
}
