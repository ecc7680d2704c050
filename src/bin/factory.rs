//! Schema Factory CLI
//!
//! Runs one or more factory definitions.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use schema_factory::config::split_config_paths;
use schema_factory::{Factory, MemorySink, Settings};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-factory")]
#[command(about = "Generate code from Avro schemas through template sets")]
struct Cli {
    /// Factory definition files (YAML); a single argument may list several, comma separated
    #[arg(required_unless_present_any = ["print_settings", "save_settings"])]
    configs: Vec<String>,

    /// Tool settings file (TOML)
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Render post-call commands without running them
    #[arg(long)]
    skip_post_calls: bool,

    /// Render into memory and print the paths instead of writing files
    #[arg(long)]
    dry_run: bool,

    /// Print the effective settings and exit
    #[arg(long)]
    print_settings: bool,

    /// Write the effective settings to a TOML file and exit
    #[arg(long, value_name = "FILE")]
    save_settings: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut settings = match &cli.settings {
        Some(path) => Settings::load_from(Some(&path.display().to_string())),
        None => Settings::load(),
    }
    .context("Failed to load settings")?;
    if cli.skip_post_calls || cli.dry_run {
        settings.skip_post_calls = true;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if cli.print_settings {
        print!("{}", settings.to_toml()?);
        return Ok(());
    }

    if let Some(path) = &cli.save_settings {
        settings.save(path)?;
        println!("✅ Settings saved to {}", path);
        return Ok(());
    }

    let definitions = split_config_paths(&cli.configs);
    if definitions.is_empty() {
        anyhow::bail!("Path to generator definition file is missed");
    }

    if cli.dry_run {
        let sink = MemorySink::new();
        let factory = Factory::new(settings).with_sink(sink.clone());
        factory.run_all(&definitions)?;
        for (path, content) in sink.files() {
            println!("{} ({} bytes)", path.display(), content.len());
        }
        println!("✅ Dry run rendered {} files", sink.len());
        return Ok(());
    }

    let reports = Factory::new(settings).run_all(&definitions)?;
    let files: usize = reports.iter().map(|r| r.files().count()).sum();
    println!(
        "✅ Generated {} files from {} definition(s)",
        files,
        reports.len()
    );
    Ok(())
}
