//! Reading already-normalized hourly profiles from CSV.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{Error, ProfileError, Result};
use crate::profiles::horizon::check_values;

/// Reads a single-column profile (24 or 8,760 values) from a CSV file.
///
/// A non-numeric first row is taken as a header. Only the first column of
/// each row is used.
///
/// # Errors
///
/// Returns `Error::Read` if the file cannot be opened, or a `ProfileError`
/// for a cell that is not a finite, non-negative number.
pub fn read_profile_csv(path: &Path) -> Result<Vec<f64>> {
    let file = File::open(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    read_profile(file, &path.display().to_string())
}

/// Reads a single-column profile from any reader.
///
/// # Errors
///
/// Same as [`read_profile_csv`], plus `Error::Csv` for malformed CSV.
pub fn read_profile(reader: impl Read, profile: &str) -> Result<Vec<f64>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut values = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record = record?;
        let Some(cell) = record.get(0).filter(|c| !c.is_empty()) else {
            continue;
        };
        match cell.parse::<f64>() {
            Ok(value) => values.push(value),
            Err(_) if row == 0 => {}
            Err(_) => {
                return Err(ProfileError::Parse {
                    profile: profile.to_string(),
                    line: record.position().map_or(row as u64 + 1, |p| p.line()),
                    value: cell.to_string(),
                }
                .into());
            }
        }
    }
    check_values(&values, profile)?;
    Ok(values)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn header_row_is_skipped() {
        let values = read_profile("load_kw\n1.5\n2\n3.25\n".as_bytes(), "load").unwrap();
        assert_eq!(values, vec![1.5, 2.0, 3.25]);
    }

    #[test]
    fn extra_columns_and_blank_lines_are_ignored() {
        let values = read_profile("1,a\n\n2,b\n".as_bytes(), "load").unwrap();
        assert_eq!(values, vec![1.0, 2.0]);
    }

    #[test]
    fn bad_cell_reports_line() {
        let err = read_profile("kw\n1\nx\n".as_bytes(), "load").unwrap_err();
        assert!(matches!(
            err,
            Error::Profile(ProfileError::Parse { line: 3, .. })
        ));
    }

    #[test]
    fn negative_value_rejected() {
        let err = read_profile("1\n-2\n".as_bytes(), "load").unwrap_err();
        assert!(matches!(
            err,
            Error::Profile(ProfileError::Negative { index: 1, .. })
        ));
    }

    #[test]
    fn reads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for h in 0..24 {
            writeln!(file, "{h}").unwrap();
        }
        let values = read_profile_csv(file.path()).unwrap();
        assert_eq!(values.len(), 24);
        assert_eq!(values[23], 23.0);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = read_profile_csv(Path::new("/nonexistent/profile.csv")).unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
    }
}
