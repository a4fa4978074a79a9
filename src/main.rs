mod config;
mod extract;
mod fetch;
mod filters;
mod model;
mod output;
mod pipeline;
mod rank;
mod sources;

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};

use config::SiteKind;
use model::JobRecord;

#[derive(Parser)]
#[command(name = "jobscout", about = "Aggregate, dedupe, filter and rank job postings")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Json,
    Csv,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch all enabled sources and write the ranked result sets
    Run {
        /// Path to the JSON config file
        #[arg(short, long)]
        config: PathBuf,
        /// Output file for the filtered, ranked set
        #[arg(short, long)]
        output: PathBuf,
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
        /// Extra include keyword (repeatable)
        #[arg(short, long)]
        keyword: Vec<String>,
        /// Also write the unfiltered, ranked set here
        #[arg(long)]
        unfiltered: Option<PathBuf>,
        /// Also write the high-confidence subset (2+ title keywords) here
        #[arg(long)]
        high_confidence: Option<PathBuf>,
    },
    /// Validate a config file and list its sites
    Check {
        /// Path to the JSON config file
        #[arg(short, long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            config,
            output,
            format,
            keyword,
            unfiltered,
            high_confidence,
        } => {
            let app_config = config::load(&config)?;
            let run = pipeline::run(&app_config, &keyword, chrono::Utc::now()).await?;

            run.stats.print();
            write_records(&output, format, &run.filtered)?;
            println!(
                "Wrote {} filtered jobs to {}",
                run.filtered.len(),
                output.display()
            );
            if let Some(path) = unfiltered {
                write_records(&path, format, &run.unfiltered)?;
                println!(
                    "Wrote {} unfiltered jobs to {}",
                    run.unfiltered.len(),
                    path.display()
                );
            }
            if let Some(path) = high_confidence {
                write_records(&path, format, &run.high_confidence)?;
                println!(
                    "Wrote {} high-confidence jobs to {}",
                    run.high_confidence.len(),
                    path.display()
                );
            }
            Ok(())
        }
        Commands::Check { config } => {
            let app_config = config::load(&config)?;
            for site in &app_config.sites {
                let kind = match &site.kind {
                    SiteKind::Generic(_) => "generic",
                    SiteKind::Workday(_) => "workday",
                };
                println!(
                    "{:<24} {:<8} {}",
                    site.name,
                    kind,
                    if site.enabled { "enabled" } else { "disabled" }
                );
            }
            println!(
                "{} sites, target states: {:?}, days back: {}",
                app_config.sites.len(),
                app_config.filters.target_states,
                app_config.filters.days_back
            );
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {:.1}s", elapsed.as_secs_f64());
    }

    result
}

fn write_records(path: &PathBuf, format: OutputFormat, records: &[JobRecord]) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => output::write_json(path, records),
        OutputFormat::Csv => output::write_csv(path, records),
    }
}
