//! Validity debug artifacts (C13): one text file per violated check
//! family, written to a directory, mirroring the original source's
//! `set_validity_errors_directory` / per-invalid-entity dump convention
//! but through this crate's structured [`ValidityReport`] instead of ad
//! hoc mesh exports.

use crate::error::Result;
use crate::validity::ValidityReport;
use std::fs;
use std::path::Path;

/// Writes `<directory>/<family>.txt` for every check family with at least
/// one violation in `report`. Creates `directory` if it does not exist.
/// Returns the paths written.
pub fn write_debug_artifacts(report: &ValidityReport, directory: &Path) -> Result<Vec<std::path::PathBuf>> {
    if report.is_valid() {
        return Ok(Vec::new());
    }
    fs::create_dir_all(directory)?;

    let mut grouped: Vec<(&'static str, Vec<&crate::validity::Violation>)> = Vec::new();
    for (family, violation) in report.by_family() {
        match grouped.iter_mut().find(|(f, _)| *f == family) {
            Some((_, violations)) => violations.push(violation),
            None => grouped.push((family, vec![violation])),
        }
    }

    let mut written = Vec::new();
    for (family, violations) in grouped {
        let path = directory.join(format!("{family}.txt"));
        let mut text = String::new();
        for violation in violations {
            use std::fmt::Write as _;
            match violation.entity {
                Some(entity) => writeln!(text, "{entity}: {}", violation.description).unwrap(),
                None => writeln!(text, "{}", violation.description).unwrap(),
            }
        }
        fs::write(&path, text)?;
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validity::Violation;

    /// A scratch directory under the OS temp dir, removed on drop, so
    /// these tests don't need a `tempfile` dev-dependency.
    struct ScratchDir(std::path::PathBuf);
    impl ScratchDir {
        fn new(tag: &str) -> Self {
            let path = std::env::temp_dir().join(format!("geobrep-debug-artifacts-{tag}-{}", std::process::id()));
            ScratchDir(path)
        }
    }
    impl Drop for ScratchDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.0);
        }
    }

    #[test]
    fn writes_one_file_per_violated_family() {
        let mut report = ValidityReport::default();
        report.connectivity.push(Violation {
            entity: None,
            description: "dangling boundary".to_string(),
        });
        let dir = ScratchDir::new("one-family");
        let written = write_debug_artifacts(&report, &dir.0).unwrap();
        assert_eq!(written.len(), 1);
        assert!(written[0].ends_with("connectivity.txt"));
    }

    #[test]
    fn valid_report_writes_nothing() {
        let report = ValidityReport::default();
        let dir = ScratchDir::new("valid");
        let written = write_debug_artifacts(&report, &dir.0).unwrap();
        assert!(written.is_empty());
    }
}
