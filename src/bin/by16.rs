use anyhow::{Context, Result};
use by16::{Cluster, quantize_image};
use clap::Parser;
use log::info;
use serde_json::json;
use std::path::PathBuf;

/// Print the 16-bucket palette of one or more images.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// One or more input image paths
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Sampling step, 1 visits every pixel. Derived from the image size if omitted.
    #[arg(short, long)]
    step: Option<f64>,

    /// Print a JSON array per image instead of one line per cluster
    #[arg(short, long)]
    json: bool,

    /// Log the sampling plan (same as RUST_LOG=debug)
    #[arg(short, long)]
    verbose: bool,
}

fn cluster_json(c: &Cluster) -> serde_json::Value {
    json!({
        "id": c.id,
        "code": c.code,
        "area": c.area,
        "bytes": c.bytes,
        "hex": c.hex(),
        "name": c.name(),
    })
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    for input in &args.inputs {
        let img = image::open(input)
            .with_context(|| format!("unable to decode {}", input.display()))?;
        info!("{}: {}x{}", input.display(), img.width(), img.height());

        let clusters = quantize_image(&img, args.step)
            .with_context(|| format!("quantize failed for {}", input.display()))?;

        if args.json {
            let list: Vec<_> = clusters.iter().map(cluster_json).collect();
            println!("{}", serde_json::to_string(&list)?);
        } else {
            println!("{}", input.display());
            for c in &clusters {
                println!(
                    "{:2} {} {:.6} #{} {}",
                    c.id,
                    c.code,
                    c.area,
                    c.hex(),
                    c.name()
                );
            }
        }
    }

    Ok(())
}
