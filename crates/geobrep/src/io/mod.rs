//! External format I/O (C10/C11): the Gocad `.ml` reader/writer that is
//! this crate's primary interchange format, plus a handful of mesh-only
//! exporters and declared-but-unimplemented format stubs.

pub mod debug_artifacts;
pub mod gocad_ml;
pub mod other_formats;
