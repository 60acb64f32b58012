// ============================================================
// Layer 4 — Shape Manifest (CSV)
// ============================================================
// The shape classifier reads a CSV manifest:
//
//   image_path,label
//   shape_00000.png,0
//   shape_00001.png,1
//
// The header row is skipped, blank lines are ignored and
// relative image paths resolve against the manifest's own
// directory. Labels must be 0 (circle) or 1 (square); any
// malformed row aborts the load with its line number.

use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::data::error::{DatasetError, DatasetResult};
use crate::domain::sample::ShapeKind;

pub const MANIFEST_HEADER: &str = "image_path,label";

/// One row of the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub image_path: PathBuf,
    pub label:      ShapeKind,
}

/// Read and parse a manifest file.
pub fn read_manifest(path: &Path) -> DatasetResult<Vec<ManifestEntry>> {
    let text = fs::read_to_string(path).map_err(|e| DatasetError::io(path, e))?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    parse_manifest(&text, base, path)
}

/// Parse manifest text. `origin` is only used in error messages.
pub fn parse_manifest(text: &str, base: &Path, origin: &Path) -> DatasetResult<Vec<ManifestEntry>> {
    let mut entries = Vec::new();

    // Line 1 is the header, whatever it says
    for (idx, line) in text.lines().enumerate().skip(1) {
        let line_no = idx + 1;
        let line    = line.trim();
        if line.is_empty() {
            continue;
        }

        let bad = |msg: String| DatasetError::Manifest {
            path: origin.to_path_buf(),
            line: line_no,
            msg,
        };

        let (path_col, label_col) = line
            .rsplit_once(',')
            .ok_or_else(|| bad(format!("expected 'image_path,label', got '{line}'")))?;

        let label: usize = label_col
            .trim()
            .parse()
            .map_err(|_| bad(format!("label '{}' is not an integer", label_col.trim())))?;
        let label = ShapeKind::from_label(label)
            .ok_or_else(|| bad(format!("label {label} is neither 0 (circle) nor 1 (square)")))?;

        let raw = PathBuf::from(path_col.trim());
        let image_path = if raw.is_absolute() { raw } else { base.join(raw) };

        entries.push(ManifestEntry { image_path, label });
    }

    Ok(entries)
}

/// Write a manifest. Paths are written as given.
pub fn write_manifest(path: &Path, rows: &[(String, ShapeKind)]) -> DatasetResult<()> {
    let mut out = String::with_capacity(rows.len() * 24);
    out.push_str(MANIFEST_HEADER);
    out.push('\n');
    for (image, kind) in rows {
        out.push_str(&format!("{},{}\n", image, kind.label()));
    }
    fs::write(path, out).map_err(|e| DatasetError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skips_header_and_blank_lines() {
        let text    = "image_path,label\na.png,0\n\nsub/b.png,1\n";
        let entries = parse_manifest(text, Path::new("/data"), Path::new("m.csv")).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].image_path, PathBuf::from("/data/a.png"));
        assert_eq!(entries[0].label, ShapeKind::Circle);
        assert_eq!(entries[1].image_path, PathBuf::from("/data/sub/b.png"));
        assert_eq!(entries[1].label, ShapeKind::Square);
    }

    #[test]
    fn test_absolute_paths_are_kept() {
        let text    = "image_path,label\n/abs/a.png,1\n";
        let entries = parse_manifest(text, Path::new("/data"), Path::new("m.csv")).unwrap();
        assert_eq!(entries[0].image_path, PathBuf::from("/abs/a.png"));
    }

    #[test]
    fn test_bad_label_reports_line() {
        let text = "image_path,label\na.png,0\nb.png,7\n";
        match parse_manifest(text, Path::new("."), Path::new("m.csv")) {
            Err(DatasetError::Manifest { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected manifest error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_column_is_an_error() {
        let text = "image_path,label\njust_a_path.png\n";
        assert!(parse_manifest(text, Path::new("."), Path::new("m.csv")).is_err());
    }

    #[test]
    fn test_write_then_read() {
        let dir  = tempfile::tempdir().unwrap();
        let path = dir.path().join("dataset.csv");
        write_manifest(&path, &[
            ("a.png".to_string(), ShapeKind::Square),
            ("b.png".to_string(), ShapeKind::Circle),
        ]).unwrap();

        let entries = read_manifest(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].image_path, dir.path().join("a.png"));
        assert_eq!(entries[1].label, ShapeKind::Circle);
    }
}
