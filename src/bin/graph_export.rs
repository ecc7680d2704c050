//! Schema graph export
//!
//! Writes the schema graph of a factory definition as GraphViz DOT, or as SVG
//! through the `dot` tool.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use schema_factory::factory::load_definition_schemas;
use schema_factory::FactoryConfig;

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Dot,
    Svg,
}

#[derive(Parser)]
#[command(name = "schema-graph-export")]
#[command(about = "Export the schema graph of a factory definition")]
struct Cli {
    /// Factory definition file (YAML)
    #[arg(short, long)]
    config: PathBuf,

    /// Output file; DOT goes to stdout when omitted, SVG to schemas.svg
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = Format::Dot)]
    format: Format,
}

fn main() {
    if let Err(e) = run(Cli::parse()) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = FactoryConfig::load(&cli.config)?;
    let base_path = FactoryConfig::base_path(&cli.config)?;
    let dot = load_definition_schemas(&config, &base_path)?.graph.to_dot();

    match (cli.format, cli.output) {
        (Format::Dot, None) => print!("{}", dot),
        (Format::Dot, Some(path)) => {
            std::fs::write(&path, dot).with_context(|| format!("Failed to write {:?}", path))?;
            eprintln!("✅ Exported DOT to {:?}", path);
        }
        (Format::Svg, output) => {
            let path = output.unwrap_or_else(|| PathBuf::from("schemas.svg"));
            render_svg(&dot, &path)?;
            eprintln!("✅ Exported SVG to {:?}", path);
        }
    }
    Ok(())
}

/// Pipe `dot` source through GraphViz into `path`
fn render_svg(dot: &str, path: &Path) -> anyhow::Result<()> {
    let mut child = Command::new("dot")
        .arg("-Tsvg")
        .arg("-o")
        .arg(path)
        .stdin(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .context("Failed to start GraphViz `dot`")?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(dot.as_bytes())?;
    }
    let output = child.wait_with_output()?;
    if !output.status.success() {
        bail!(
            "GraphViz conversion failed: {}",
            String::from_utf8_lossy(&output.stderr).trim_end()
        );
    }
    Ok(())
}
