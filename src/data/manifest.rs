//! Sample manifest loading.
//!
//! The manifest is a CSV file with a header row: column 0 holds the
//! image path (relative to an image root), every remaining column holds
//! a numeric label. All label columns are kept; the pipeline reduces
//! them to a single target column later.

use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use thiserror::Error;

/// Errors from manifest parsing.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed manifest {path}: {source}")]
    Csv {
        path: PathBuf,
        source: csv::Error,
    },

    #[error("manifest {path} has no label columns (need image column + at least one label)")]
    NoLabelColumns { path: PathBuf },

    #[error("manifest {path} row {row}: empty image path")]
    EmptyImagePath { path: PathBuf, row: usize },

    #[error("manifest {path} row {row} column {column}: `{value}` is not a number")]
    BadLabel {
        path: PathBuf,
        row: usize,
        column: String,
        value: String,
    },
}

/// One manifest row: the resolved image path and its label values.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestEntry {
    pub image: PathBuf,
    pub labels: Vec<f32>,
}

/// Parsed sample list.
#[derive(Debug, Clone)]
pub struct Manifest {
    entries: Vec<ManifestEntry>,
    label_width: usize,
}

impl Manifest {
    /// Read a manifest CSV, resolving image paths against `image_root`.
    ///
    /// Rows are kept in file order. An empty manifest (header only) is
    /// valid and yields zero entries.
    pub fn read(csv_path: &Path, image_root: &Path) -> Result<Self, ManifestError> {
        let file = std::fs::File::open(csv_path).map_err(|source| ManifestError::Io {
            path: csv_path.to_path_buf(),
            source,
        })?;
        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(file);

        let headers = reader.headers().map_err(|source| ManifestError::Csv {
            path: csv_path.to_path_buf(),
            source,
        })?;
        if headers.len() < 2 {
            return Err(ManifestError::NoLabelColumns {
                path: csv_path.to_path_buf(),
            });
        }
        let label_columns: Vec<String> = headers.iter().skip(1).map(String::from).collect();
        let label_width = label_columns.len();

        let mut entries = Vec::new();
        for (row_idx, record) in reader.records().enumerate() {
            let record = record.map_err(|source| ManifestError::Csv {
                path: csv_path.to_path_buf(),
                source,
            })?;
            // Data row numbering starts after the header.
            let row = row_idx + 2;

            let image_rel = record.get(0).unwrap_or("");
            if image_rel.is_empty() {
                return Err(ManifestError::EmptyImagePath {
                    path: csv_path.to_path_buf(),
                    row,
                });
            }

            let mut labels = Vec::with_capacity(label_width);
            for (col_idx, column) in label_columns.iter().enumerate() {
                let raw = record.get(col_idx + 1).unwrap_or("").trim();
                let value: f32 = raw.parse().map_err(|_| ManifestError::BadLabel {
                    path: csv_path.to_path_buf(),
                    row,
                    column: column.clone(),
                    value: raw.to_string(),
                })?;
                labels.push(value);
            }

            entries.push(ManifestEntry {
                image: image_root.join(image_rel),
                labels,
            });
        }

        Ok(Self {
            entries,
            label_width,
        })
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of label columns.
    pub fn label_width(&self) -> usize {
        self.label_width
    }

    /// Samples in manifest order.
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_manifest(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("valid_images.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn reads_rows_in_order() {
        let dir = TempDir::new().unwrap();
        let path = write_manifest(&dir, "image,score\na.png,1.5\nb.png,-2.0\n");
        let manifest = Manifest::read(&path, Path::new("/data/images")).unwrap();

        assert_eq!(manifest.len(), 2);
        assert_eq!(manifest.label_width(), 1);
        assert_eq!(
            manifest.entries()[0].image,
            Path::new("/data/images/a.png")
        );
        assert_eq!(manifest.entries()[0].labels, vec![1.5]);
        assert_eq!(manifest.entries()[1].labels, vec![-2.0]);
    }

    #[test]
    fn keeps_all_label_columns() {
        let dir = TempDir::new().unwrap();
        let path = write_manifest(&dir, "image,a,b,c\nx.png,1,2,3\n");
        let manifest = Manifest::read(&path, Path::new("")).unwrap();
        assert_eq!(manifest.label_width(), 3);
        assert_eq!(manifest.entries()[0].labels, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn header_only_manifest_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = write_manifest(&dir, "image,score\n");
        let manifest = Manifest::read(&path, Path::new("")).unwrap();
        assert!(manifest.is_empty());
        assert_eq!(manifest.label_width(), 1);
    }

    #[test]
    fn rejects_manifest_without_labels() {
        let dir = TempDir::new().unwrap();
        let path = write_manifest(&dir, "image\na.png\n");
        let err = Manifest::read(&path, Path::new("")).unwrap_err();
        assert!(matches!(err, ManifestError::NoLabelColumns { .. }));
    }

    #[test]
    fn rejects_non_numeric_label() {
        let dir = TempDir::new().unwrap();
        let path = write_manifest(&dir, "image,score\na.png,not-a-number\n");
        let err = Manifest::read(&path, Path::new("")).unwrap_err();
        match err {
            ManifestError::BadLabel { row, column, value, .. } => {
                assert_eq!(row, 2);
                assert_eq!(column, "score");
                assert_eq!(value, "not-a-number");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_missing_file() {
        let err = Manifest::read(Path::new("/nonexistent/manifest.csv"), Path::new("")).unwrap_err();
        assert!(matches!(err, ManifestError::Io { .. }));
    }
}
