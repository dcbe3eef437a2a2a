//! CSV ingestion of measured energy and price series.

use std::fs;
use std::path::Path;

use thiserror::Error;

/// Failure to turn a CSV file into a series.
#[derive(Error, Debug)]
pub enum SeriesReadError {
    #[error("cannot read \"{path}\": {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    /// A data row without any numeric field.
    #[error("row {row}: no numeric value in \"{content}\"")]
    NotNumeric { row: usize, content: String },

    #[error("no values found")]
    Empty,
}

/// Reads a series from the CSV file at `path`.
///
/// See [`parse_series_csv`] for the accepted layout.
pub fn read_series_csv(path: &Path) -> Result<Vec<f64>, SeriesReadError> {
    let content = fs::read_to_string(path).map_err(|source| SeriesReadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_series_csv(&content)
}

/// Extracts one value per row: the last field that parses as a number.
///
/// The delimiter is `;` when the first line contains one, `,` otherwise.
/// With `;` separated files decimal commas (`0,25`) are accepted. A first
/// row without any numeric field is treated as a header.
///
/// # Examples
///
/// ```
/// use battery_roi::io::import::parse_series_csv;
///
/// let csv = "timestamp;kwh\n2025-01-01 00:00;0,25\n2025-01-01 01:00;0,5\n";
/// assert_eq!(parse_series_csv(csv).unwrap(), vec![0.25, 0.5]);
/// ```
pub fn parse_series_csv(content: &str) -> Result<Vec<f64>, SeriesReadError> {
    let first_line = content.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    let delimiter = if first_line.contains(';') { b';' } else { b',' };

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let mut values = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record = record?;
        match record.iter().filter_map(|field| parse_number(field, delimiter)).last() {
            Some(v) => values.push(v),
            None if row == 0 => {}
            None => {
                return Err(SeriesReadError::NotNumeric {
                    row: row + 1,
                    content: record
                        .iter()
                        .collect::<Vec<_>>()
                        .join(if delimiter == b';' { ";" } else { "," }),
                });
            }
        }
    }

    if values.is_empty() {
        return Err(SeriesReadError::Empty);
    }
    Ok(values)
}

fn parse_number(field: &str, delimiter: u8) -> Option<f64> {
    if field.is_empty() {
        return None;
    }
    let parsed = if delimiter == b';' {
        field.replace(',', ".").parse::<f64>()
    } else {
        field.parse::<f64>()
    };
    parsed.ok().filter(|v| v.is_finite())
}
