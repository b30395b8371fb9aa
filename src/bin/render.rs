//! ewa-render: Render images of a point cloud from a set of camera views
//!
//! Usage:
//!   ewa-render --model scan.ply --coords views.json --out renders/
//!   ewa-render --model scan.ply --coords views.txt --out renders/ --delta 2 --background 1,1,1

use anyhow::{bail, Context, Result};
use clap::Parser;
use ewa_splat::RenderOptions;
use std::path::PathBuf;

/// EWA surface splatting renderer
#[derive(Parser, Debug)]
#[command(name = "ewa-render")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Point cloud (PLY with positions, normals and colors)
    #[arg(short, long)]
    model: PathBuf,

    /// Coordinate file with one camera view per entry (.json or text)
    #[arg(short, long)]
    coords: PathBuf,

    /// Output directory for `<model>_<index>.png`
    #[arg(short, long)]
    out: PathBuf,

    /// JSON options file; flags below override its values
    #[arg(long)]
    options: Option<PathBuf>,

    /// Reconstruction method
    #[arg(long)]
    method: Option<String>,

    /// World-space depth band treated as one surface
    #[arg(long)]
    surface_thickness: Option<f32>,

    /// Screen-space low-pass variance (pixel²)
    #[arg(long)]
    delta: Option<f32>,

    /// World-space kernel radius
    #[arg(long)]
    point_size: Option<f32>,

    /// Linear RGB background as r,g,b in [0, 1] (default: transparent)
    #[arg(long)]
    background: Option<String>,
}

fn parse_background(text: &str) -> Result<[f32; 3]> {
    let parts = text
        .split(',')
        .map(|s| s.trim().parse::<f32>())
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("invalid --background '{}'", text))?;
    match parts.as_slice() {
        [r, g, b] => Ok([*r, *g, *b]),
        _ => bail!("--background must be three comma-separated numbers, e.g. '0.5,0.5,0.5'"),
    }
}

fn build_options(args: &Args) -> Result<RenderOptions> {
    let mut options = match &args.options {
        Some(path) => RenderOptions::from_json_file(path)?,
        None => RenderOptions::default(),
    };

    if let Some(method) = &args.method {
        options.method = method.clone();
    }
    if let Some(thickness) = args.surface_thickness {
        options.surface_thickness = thickness;
    }
    if let Some(delta) = args.delta {
        options.delta = delta;
    }
    if let Some(point_size) = args.point_size {
        options.point_size = point_size;
    }
    if let Some(bg) = &args.background {
        options.background = Some(parse_background(bg)?);
    }
    Ok(options)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    tracing::info!("ewa-render v{}", ewa_splat::VERSION);

    let options = build_options(&args)?;
    let report = ewa_splat::render(&args.model, &args.coords, &args.out, &options)
        .with_context(|| format!("rendering {}", args.model.display()))?;

    for (path, stats) in report.outputs.iter().zip(&report.stats) {
        println!(
            "{}  ({} / {} points splatted, {} pixels covered)",
            path.display(),
            stats.projected,
            stats.points,
            stats.touched_pixels
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_background() {
        assert_eq!(parse_background("1, 0.5,0").unwrap(), [1.0, 0.5, 0.0]);
        assert!(parse_background("1,0").is_err());
        assert!(parse_background("red").is_err());
    }

    #[test]
    fn test_flags_override_defaults() {
        let args = Args::parse_from([
            "ewa-render",
            "--model",
            "m.ply",
            "--coords",
            "c.json",
            "--out",
            "out",
            "--delta",
            "3.5",
            "--background",
            "1,1,1",
        ]);
        let options = build_options(&args).unwrap();
        assert_eq!(options.delta, 3.5);
        assert_eq!(options.background, Some([1.0, 1.0, 1.0]));
        assert_eq!(options.point_size, RenderOptions::default().point_size);
    }
}
