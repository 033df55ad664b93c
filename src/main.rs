use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use mart_builder::config::TransformConfig;
use mart_builder::domain::Snapshot;
use mart_builder::logging;
use mart_builder::sink::{InMemorySink, JsonDirSink, SchemaSink, SinkReport};
use mart_builder::testdata::{self, GeneratorOptions};
use mart_builder::{analytics, transform, validate};

#[derive(Parser)]
#[command(name = "mart_builder")]
#[command(about = "Builds Star and Snowflake schemas from a normalized e-commerce snapshot")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a seeded sample snapshot and write it to a directory
    Generate {
        /// Directory to write the snapshot tables into
        #[arg(long, default_value = "data/processed")]
        out_dir: PathBuf,
        /// Seed for the generator; same seed, same snapshot
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long, default_value_t = 50)]
        users: usize,
        #[arg(long, default_value_t = 100)]
        products: usize,
        #[arg(long, default_value_t = 200)]
        orders: usize,
    },
    /// Validate a snapshot and build both dimensional schemas
    Run {
        /// Snapshot directory; omitted means a seeded sample snapshot
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Directory for the output tables; omitted means in-memory only
        #[arg(long)]
        out_dir: Option<PathBuf>,
        /// Optional TOML config with date bounds, fiscal month, holidays
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate { out_dir, seed, users, products, orders } => {
            let config = TransformConfig::default();
            let snapshot = testdata::generate_snapshot(&GeneratorOptions {
                seed,
                users,
                products,
                orders,
                start_date: config.start_date,
                end_date: config.end_date,
            });
            snapshot
                .write_dir(&out_dir)
                .with_context(|| format!("writing snapshot to {}", out_dir.display()))?;

            println!("📦 Snapshot written to {}", out_dir.display());
            println!("   Users: {}", snapshot.users.len());
            println!("   Products: {}", snapshot.products.len());
            println!("   Orders: {}", snapshot.orders.len());
            println!("   Order items: {}", snapshot.order_items.len());
        }
        Commands::Run { data_dir, out_dir, config } => {
            let config = match config {
                Some(path) => TransformConfig::load(&path)
                    .with_context(|| format!("loading config from {}", path.display()))?,
                None => TransformConfig::default(),
            };

            let snapshot = match data_dir {
                Some(dir) => Snapshot::from_dir(&dir)
                    .with_context(|| format!("loading snapshot from {}", dir.display()))?,
                None => {
                    info!("No data directory given, using a seeded sample snapshot");
                    testdata::generate_snapshot(&GeneratorOptions {
                        start_date: config.start_date,
                        end_date: config.end_date,
                        ..Default::default()
                    })
                }
            };

            let report = validate::validate_snapshot(&snapshot);
            if !report.passed() {
                println!("\n⚠️  Snapshot validation failed:");
                for issue in &report.errors {
                    println!("   - {issue}");
                }
                error!("Aborting: snapshot failed validation");
                anyhow::bail!("snapshot failed validation with {} errors", report.errors.len());
            }
            for issue in &report.warnings {
                println!("   ⚠ {issue}");
            }

            let star = transform::build_star(&snapshot, &config)?;
            let snow = transform::build_snowflake(&snapshot, &config)?;

            let fact_report = validate::validate_facts(&star.facts);
            if !fact_report.passed() {
                anyhow::bail!("fact output failed validation with {} errors", fact_report.errors.len());
            }

            let (star_report, snow_report) = match out_dir {
                Some(dir) => {
                    let sink = JsonDirSink::new(&dir);
                    (sink.load_star(&star).await?, sink.load_snowflake(&snow).await?)
                }
                None => {
                    let sink = InMemorySink::new();
                    (sink.load_star(&star).await?, sink.load_snowflake(&snow).await?)
                }
            };

            print_report("STAR SCHEMA", &star_report);
            print_report("SNOWFLAKE SCHEMA", &snow_report);

            let months = analytics::monthly_revenue(&star.facts);
            if !months.is_empty() {
                println!("\n📈 Monthly revenue:");
                for m in &months {
                    let growth = m
                        .growth_pct
                        .map(|g| format!("{g:+.1}%"))
                        .unwrap_or_else(|| "n/a".to_string());
                    println!(
                        "   {}-{:02}: {:10.2} ({} orders, growth {})",
                        m.year, m.month, m.revenue, m.orders_count, growth
                    );
                }
            }
        }
    }

    Ok(())
}

fn print_report(title: &str, report: &SinkReport) {
    println!("\n📊 {title}");
    for (table, records) in &report.tables {
        println!("   {table:25}: {records:8} records");
    }
    println!(
        "   {:25}: {:8} records in {:.3}s",
        "TOTAL",
        report.total_records(),
        report.elapsed.as_secs_f64()
    );
}
