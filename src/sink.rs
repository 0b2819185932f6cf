//! Result persistence: the two-column CSV table.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::pool::ResultMap;

/// Errors that can occur while writing results.
#[derive(Debug)]
#[non_exhaustive]
pub enum PersistenceError {
    /// The destination's parent directory could not be created.
    CreateDir { path: PathBuf, source: io::Error },
    /// The result file could not be written.
    Write { path: PathBuf, source: io::Error },
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateDir { path, source } => {
                write!(f, "failed to create {}: {source}", path.display())
            }
            Self::Write { path, source } => {
                write!(f, "failed to write {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for PersistenceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::CreateDir { source, .. } | Self::Write { source, .. } => Some(source),
        }
    }
}

/// Write the merged results as a two-column CSV file.
///
/// The destination's extension is forced to `.csv`, parent directories are
/// created as needed, and rows are sorted by descending plate length then
/// lexicographically. Returns the path actually written.
///
/// # Errors
///
/// Returns [`PersistenceError`] when the destination is unwritable.
pub fn save_results(results: &ResultMap, destination: &Path) -> Result<PathBuf, PersistenceError> {
    let mut path = destination.to_path_buf();
    path.set_extension("csv");

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| PersistenceError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    fs::write(&path, render_csv(results)).map_err(|source| PersistenceError::Write {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}

/// Render the results as CSV text, sorted by descending length then
/// lexicographically.
#[must_use]
pub fn render_csv(results: &ResultMap) -> String {
    let mut rows: Vec<(&str, String)> = results
        .iter()
        .map(|(plate, status)| (plate.as_str(), status.to_string()))
        .collect();
    rows.sort_by(|(a, _), (b, _)| {
        let (la, lb) = (a.chars().count(), b.chars().count());
        lb.cmp(&la).then_with(|| a.cmp(b))
    });

    let mut out = String::from("Plate,Status\n");
    for (plate, status) in rows {
        out.push_str(&csv_field(plate));
        out.push(',');
        out.push_str(&csv_field(&status));
        out.push('\n');
    }
    out
}

/// Quote a field only when CSV requires it. Plates are alphanumeric, but
/// pass-through status codes come from the service verbatim.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::Status;
    use std::collections::HashMap;

    fn results(entries: &[(&str, Status)]) -> ResultMap {
        entries
            .iter()
            .map(|(plate, status)| (plate.to_string(), status.clone()))
            .collect()
    }

    #[test]
    fn renders_sorted_rows_with_header() {
        let map = results(&[
            ("bb", Status::Available),
            ("aaa", Status::Unavailable),
            ("aa", Status::Unknown),
        ]);
        let csv = render_csv(&map);
        assert_eq!(
            csv,
            "Plate,Status\naaa,UNAVAILABLE\naa,UNKNOWN\nbb,AVAILABLE\n"
        );
    }

    #[test]
    fn quotes_awkward_passthrough_codes() {
        let map = results(&[("cat", Status::Other("NO, REALLY".into()))]);
        let csv = render_csv(&map);
        assert!(csv.contains("cat,\"NO, REALLY\""));
    }

    #[test]
    fn forces_csv_extension_and_creates_parents() {
        let dir = std::env::temp_dir().join(format!(
            "plate-avail-sink-{}",
            std::process::id()
        ));
        let map = results(&[("cat", Status::Available)]);

        let written = save_results(&map, &dir.join("nested/out.txt")).unwrap();
        assert_eq!(written.extension().unwrap(), "csv");
        let contents = fs::read_to_string(&written).unwrap();
        assert_eq!(contents, "Plate,Status\ncat,AVAILABLE\n");

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn empty_results_still_write_a_header() {
        let map = HashMap::new();
        assert_eq!(render_csv(&map), "Plate,Status\n");
    }
}
