//! Command-line model/mesh converter (C12): reads a model or mesh in one
//! format and writes it out in another, following the original source's
//! `ringmesco` flag convention (`in:model`, `in:mesh`, `out:model`,
//! `out:mesh`) rather than inventing a new one.

use clap::Parser;
use geobrep::io::gocad_ml;
use geobrep::io::other_formats;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use std::process::ExitCode;

/// Converts between geological model and mesh file formats.
#[derive(Parser, Debug)]
#[command(name = "geobrep", version, about, propagate_version = true)]
struct Cli {
    /// Input model file (Gocad `.ml`).
    #[arg(long = "in:model", value_name = "FILE")]
    in_model: Option<PathBuf>,

    /// Input mesh file. Not yet supported as an entry point; reserved for
    /// a future mesh-only importer.
    #[arg(long = "in:mesh", value_name = "FILE")]
    in_mesh: Option<PathBuf>,

    /// Output model file (Gocad `.ml`).
    #[arg(long = "out:model", value_name = "FILE")]
    out_model: Option<PathBuf>,

    /// Output mesh file. Extension selects the format: `.obj` or `.stl`.
    #[arg(long = "out:mesh", value_name = "FILE")]
    out_mesh: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("geobrep: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> geobrep::error::Result<()> {
    let Some(in_model) = &cli.in_model else {
        return Err(geobrep::error::GeoBrepError::ProgrammerError {
            detail: "--in:model is required".to_string(),
        });
    };

    let file = File::open(in_model)?;
    let mut reader = BufReader::new(file);
    let source_name = in_model.to_string_lossy().to_string();
    let builder = gocad_ml::read_ml(&mut reader, &source_name)?;

    if let Some(out_model) = &cli.out_model {
        let file = File::create(out_model)?;
        let mut writer = BufWriter::new(file);
        let name = out_model
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "model".to_string());
        gocad_ml::write_ml(&builder, &name, &mut writer)?;
    }

    if let Some(out_mesh) = &cli.out_mesh {
        let file = File::create(out_mesh)?;
        let mut writer = BufWriter::new(file);
        match out_mesh.extension().and_then(|e| e.to_str()) {
            Some("stl") => {
                let name = out_mesh
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_else(|| "model".to_string());
                other_formats::write_stl(&builder, &name, &mut writer)?;
            }
            _ => other_formats::write_obj(&builder, &mut writer)?,
        }
    }

    if cli.in_mesh.is_some() {
        return Err(geobrep::error::GeoBrepError::FormatNotImplemented("--in:mesh"));
    }

    Ok(())
}
