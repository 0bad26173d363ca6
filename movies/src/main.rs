use anyhow::Context;
use clap::{Arg, ArgAction, Command};
use common::config::Settings;
use movies::input::resolve_paths;
use movies::storage::{MemorySink, PostgresSink};
use movies::run_movies_pipeline;
use std::io;
use std::process;
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sqlx=warn".into()),
        )
        .init();

    let matches = Command::new("movies-etl")
        .version("1.0")
        .about("Loads the Wikipedia, Kaggle and MovieLens movie data into Postgres")
        .arg(Arg::new("wiki").value_name("WIKI_JSON").help("Wikipedia movies JSON"))
        .arg(Arg::new("metadata").value_name("METADATA_CSV").help("Kaggle movies metadata CSV"))
        .arg(Arg::new("ratings").value_name("RATINGS_CSV").help("MovieLens ratings CSV"))
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Sets a custom config file"),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .action(ArgAction::SetTrue)
                .help("Runs every stage without writing to the database"),
        )
        .get_matches();

    let config_path = matches
        .get_one::<String>("config")
        .map(|s| s.as_str())
        .unwrap_or("config/movies.toml");
    let dry_run = matches.get_flag("dry-run");
    let given = ["wiki", "metadata", "ratings"].map(|id| matches.get_one::<String>(id).cloned());

    if let Err(e) = run(config_path, given, dry_run).await {
        error!("Movies pipeline error: {:#}", e);
        process::exit(1);
    }
}

async fn run(config_path: &str, given: [Option<String>; 3], dry_run: bool) -> anyhow::Result<()> {
    let settings = Settings::new(config_path)
        .with_context(|| format!("loading configuration from {}", config_path))?;

    let paths = resolve_paths(given, &mut io::stdin().lock(), &mut io::stdout())?;
    info!(?paths, dry_run, "Starting movies pipeline");

    let report = if dry_run {
        let sink = MemorySink::new();
        let report = run_movies_pipeline(&settings, &paths, &sink).await?;
        for table in sink.table_names() {
            info!(table = %table, rows = sink.row_count(&table), "Dry run table");
        }
        report
    } else {
        let sink = PostgresSink::connect(&settings.database)
            .await
            .context("connecting to Postgres")?;
        run_movies_pipeline(&settings, &paths, &sink).await?
    };

    info!(
        movies = report.movies_written,
        ratings = report.ratings.rows_written,
        ratings_skipped = report.ratings.rows_skipped,
        "Movies pipeline finished"
    );
    Ok(())
}
