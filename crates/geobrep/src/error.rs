//! Error taxonomy (C9, `spec.md` §7).
//!
//! Five kinds, not five meanings of "this call failed": `ProgrammerError`
//! never reaches a caller as a propagated `Result::Err` in a release build
//! (it degrades to a `NO_ID`-typed sentinel and is asserted against in debug
//! builds); `GeometryError` never reaches a caller at all, it is only a
//! vocabulary shared with [`crate::validity::ValidityReport`] and
//! [`crate::repair::RepairSummary`].

use crate::validity::ValidityReport;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeoBrepError {
    /// Type-incompatible relation, out-of-range id, double free. Fatal in
    /// debug builds (the constructing helper panics before this variant is
    /// ever built); kept as a variant so release-mode callers that do
    /// construct it explicitly (rare) have somewhere to put the detail.
    #[error("programmer error: {detail}")]
    ProgrammerError { detail: String },

    /// Malformed input file, surfaced with file/line when known.
    #[error("parse error{}: {detail}", location(file, line))]
    ParseError {
        file: Option<PathBuf>,
        line: Option<usize>,
        detail: String,
    },

    /// Colocation, degeneracy, non-manifold edge. Never propagated as an
    /// `Err` by this crate's own API; exists for shared vocabulary with
    /// repair/validity reports.
    #[error("geometry error: {detail}")]
    GeometryError { detail: String },

    /// I/O failure in an importer or exporter.
    #[error("resource error: {0}")]
    ResourceError(#[from] std::io::Error),

    /// A graph invariant was violated; carries the full structured report.
    #[error("model is invalid: {} violation(s)", report.total_violations())]
    ValidityError { report: ValidityReport },

    /// A named external format is not implemented by this crate (`spec.md`
    /// §1 lists these as out-of-scope external collaborators); distinct
    /// from `ResourceError` so callers can distinguish "no I/O was even
    /// attempted" from "I/O failed".
    #[error("format not implemented: {0}")]
    FormatNotImplemented(&'static str),
}

fn location(file: &Option<PathBuf>, line: &Option<usize>) -> String {
    match (file, line) {
        (Some(f), Some(l)) => format!(" at {}:{l}", f.display()),
        (Some(f), None) => format!(" in {}", f.display()),
        (None, Some(l)) => format!(" at line {l}"),
        (None, None) => String::new(),
    }
}

impl GeoBrepError {
    pub fn parse(file: impl Into<PathBuf>, line: usize, detail: impl Into<String>) -> Self {
        GeoBrepError::ParseError {
            file: Some(file.into()),
            line: Some(line),
            detail: detail.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GeoBrepError>;

/// Panics in debug builds; in release builds returns `default`. This is the
/// one place `ProgrammerError`'s "abort in debug / localize damage in
/// release" policy (`spec.md` §7) is implemented, so every call site gets
/// the same behavior instead of a scattered mix of asserts and early
/// returns.
#[track_caller]
pub(crate) fn programmer_error<T>(condition: bool, detail: &str, default: T) -> T {
    if condition {
        return default;
    }
    debug_assert!(condition, "programmer error: {detail}");
    default
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_formats_file_and_line() {
        let err = GeoBrepError::parse("model.ml", 42, "unexpected token");
        let msg = err.to_string();
        assert!(msg.contains("model.ml"));
        assert!(msg.contains("42"));
    }
}
