//! fear-index: command-line front end for the visual fear index pipeline
//!
//! Usage:
//!   fear-index batch [--images DIR] [--output CSV] [--jobs N] [--json]
//!   fear-index vix [--period 7d] [--output CSV]
//!   fear-index merge [--emotions CSV] [--period 7d] [--output CSV]
//!   fear-index score <IMAGE> [--json]
//!   fear-index summary [--emotions CSV]
//!   fear-index run [--images DIR] [--jobs N] [--period 7d]
//!
//! Logging goes to stderr and honours `RUST_LOG` (default: info).

use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use visual_fear_index::analysis::summary::ranked_by_fear;
use visual_fear_index::emotion::classifier::DeepFaceClassifier;
use visual_fear_index::io::table::EmotionTable;
use visual_fear_index::market::provider::YahooChartProvider;
use visual_fear_index::market::series;
use visual_fear_index::{
    run_pipeline, BatchOutcome, BatchRunner, EmotionRecord, EmotionScorer, FearSummary,
    MarketDataFetcher, MergeError, MergedDataset, Merger, PipelineConfig, PipelineError,
    TableError,
};

type CliResult = Result<(), Box<dyn Error>>;

#[derive(Parser)]
#[command(name = "fear-index", version, about = "Visual fear index: image emotion scores vs. VIX")]
struct Cli {
    /// Base URL of the DeepFace-compatible emotion service
    #[arg(long, global = true, env = "FEAR_INDEX_CLASSIFIER_URL")]
    classifier_url: Option<String>,

    /// Seconds to wait for one emotion analysis
    #[arg(long, global = true, env = "FEAR_INDEX_CLASSIFIER_TIMEOUT")]
    classifier_timeout_secs: Option<u64>,

    /// Ticker requested from the market data provider
    #[arg(long, global = true, env = "FEAR_INDEX_VIX_SYMBOL")]
    symbol: Option<String>,

    /// Seconds to wait for market data before treating it as unavailable
    #[arg(long, global = true, env = "FEAR_INDEX_FETCH_TIMEOUT")]
    fetch_timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score every image of a directory and write the emotion table
    Batch(BatchArgs),
    /// Fetch recent VIX closes and write them to a table
    Vix(VixArgs),
    /// Join the emotion table with the latest VIX close
    Merge(MergeArgs),
    /// Score a single image
    Score(ScoreArgs),
    /// Describe the fear scores of an emotion table
    Summary(SummaryArgs),
    /// Batch then merge
    Run(RunArgs),
}

#[derive(Args)]
struct BatchArgs {
    /// Directory of .jpg/.jpeg/.png images
    #[arg(long)]
    images: Option<PathBuf>,
    /// Emotion table to write
    #[arg(long)]
    output: Option<PathBuf>,
    /// Parallel workers (default: CPU-1)
    #[arg(long)]
    jobs: Option<usize>,
    /// Emit one JSON object per image (JSONL)
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Args)]
struct VixArgs {
    /// Provider period token, e.g. 7d or 1mo
    #[arg(long)]
    period: Option<String>,
    /// Volatility table to write
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct MergeArgs {
    /// Emotion table to read
    #[arg(long)]
    emotions: Option<PathBuf>,
    /// Provider period token, e.g. 7d or 1mo
    #[arg(long)]
    period: Option<String>,
    /// Final dataset to write
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Args)]
struct ScoreArgs {
    /// Image file to score
    image: PathBuf,
    /// Print the record as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Args)]
struct SummaryArgs {
    /// Emotion table to read
    #[arg(long)]
    emotions: Option<PathBuf>,
}

#[derive(Args)]
struct RunArgs {
    /// Directory of .jpg/.jpeg/.png images
    #[arg(long)]
    images: Option<PathBuf>,
    /// Parallel workers (default: CPU-1)
    #[arg(long)]
    jobs: Option<usize>,
    /// Provider period token, e.g. 7d or 1mo
    #[arg(long)]
    period: Option<String>,
    /// Emotion table to write
    #[arg(long)]
    emotions: Option<PathBuf>,
    /// Final dataset to write
    #[arg(long)]
    output: Option<PathBuf>,
}

impl Cli {
    fn config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        if let Some(url) = &self.classifier_url {
            config.classifier_url = url.clone();
        }
        if let Some(secs) = self.classifier_timeout_secs {
            config.classifier_timeout = Duration::from_secs(secs);
        }
        if let Some(symbol) = &self.symbol {
            config.vix_symbol = symbol.clone();
        }
        if let Some(secs) = self.fetch_timeout_secs {
            config.fetch_timeout = Duration::from_secs(secs);
        }
        config
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = cli.config();

    let result = match cli.command {
        Commands::Batch(args) => {
            override_path(&mut config.image_dir, args.images);
            override_path(&mut config.emotion_table, args.output);
            config.jobs = args.jobs.or(config.jobs);
            batch(&config, args.json)
        }
        Commands::Vix(args) => {
            override_value(&mut config.vix_period, args.period);
            override_path(&mut config.vix_table, args.output);
            vix(&config)
        }
        Commands::Merge(args) => {
            override_path(&mut config.emotion_table, args.emotions);
            override_value(&mut config.vix_period, args.period);
            override_path(&mut config.final_dataset, args.output);
            merge(&config)
        }
        Commands::Score(args) => score(&config, &args.image, args.json),
        Commands::Summary(args) => {
            override_path(&mut config.emotion_table, args.emotions);
            summary(&config)
        }
        Commands::Run(args) => {
            override_path(&mut config.image_dir, args.images);
            override_path(&mut config.emotion_table, args.emotions);
            override_path(&mut config.final_dataset, args.output);
            override_value(&mut config.vix_period, args.period);
            config.jobs = args.jobs.or(config.jobs);
            run(&config)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn override_path(target: &mut PathBuf, value: Option<PathBuf>) {
    if let Some(value) = value {
        *target = value;
    }
}

fn override_value(target: &mut String, value: Option<String>) {
    if let Some(value) = value {
        *target = value;
    }
}

fn classifier(config: &PipelineConfig) -> DeepFaceClassifier {
    DeepFaceClassifier::new(&config.classifier_url, config.classifier_timeout)
}

fn provider(config: &PipelineConfig) -> YahooChartProvider {
    YahooChartProvider::new(config.fetch_timeout)
}

fn batch(config: &PipelineConfig, json: bool) -> CliResult {
    let runner = BatchRunner::new(classifier(config)).with_jobs(config.worker_count());
    let outcome = runner.run_and_save(&config.image_dir, &config.emotion_table)?;
    print_batch(&outcome, json)?;
    println!(
        "Batch analysis complete: {} scored, {} skipped, table written to {}",
        outcome.records.len(),
        outcome.failures.len(),
        config.emotion_table.display()
    );
    Ok(())
}

fn print_batch(outcome: &BatchOutcome, json: bool) -> CliResult {
    if json {
        for record in &outcome.records {
            println!("{}", serde_json::to_string(record)?);
        }
        for failure in &outcome.failures {
            println!(
                "{{\"image\":{},\"error\":{}}}",
                serde_json::to_string(failure.image())?,
                serde_json::to_string(&failure.to_string())?
            );
        }
        return Ok(());
    }

    let total = outcome.records.len();
    for (idx, record) in outcome.records.iter().enumerate() {
        println!(
            "[{}/{}] {}: fear_score={:.2} dominant={}",
            idx + 1,
            total,
            record.image,
            record.fear_score,
            record.dominant_emotion
        );
    }
    for failure in &outcome.failures {
        println!("{}: ERROR: {}", failure.image(), failure);
    }
    Ok(())
}

fn vix(config: &PipelineConfig) -> CliResult {
    let fetcher = MarketDataFetcher::new(provider(config), config.vix_symbol.clone());
    let series = fetcher
        .fetch(&config.vix_period)
        .ok_or("Failed to fetch VIX data")?;
    if !series::save(&series, &config.vix_table) {
        return Err(format!("Failed to save VIX data to {}", config.vix_table.display()).into());
    }

    println!(
        "VIX data saved to {} ({} rows)",
        config.vix_table.display(),
        series.len()
    );
    println!("Latest VIX value: {:.2}", series.latest_vix_value()?);
    println!();
    println!("date,vix_close");
    for point in series.points() {
        println!("{},{:.2}", point.date, point.value);
    }
    Ok(())
}

fn merge(config: &PipelineConfig) -> CliResult {
    let merger = Merger::new(MarketDataFetcher::new(provider(config), config.vix_symbol.clone()));
    let merged = merger
        .merge(&config.emotion_table, &config.vix_period, &config.final_dataset)
        .map_err(|e| explain_merge_error(&e))?;
    print_merged(&merged)
}

fn explain_merge_error(err: &MergeError) -> String {
    match err {
        MergeError::Input(TableError::MissingInput { path }) => format!(
            "Could not find {}; run `fear-index batch` first",
            path.display()
        ),
        MergeError::MarketDataUnavailable { period } => format!(
            "Could not fetch VIX data for period {}; the previous dataset was left unchanged",
            period
        ),
        other => other.to_string(),
    }
}

fn print_merged(merged: &MergedDataset) -> CliResult {
    println!("Sample of merged dataset:");
    merged.write_head(std::io::stdout().lock(), 5)?;
    println!();
    println!("VIX-Fear Score Summary:");
    match merged.mean_fear_score() {
        Some(mean) => println!("Average Fear Score: {:.2}", mean),
        None => println!("Average Fear Score: n/a (no records)"),
    }
    println!("Current VIX: {:.2}", merged.snapshot().vix_close);
    Ok(())
}

fn score(config: &PipelineConfig, image: &Path, json: bool) -> CliResult {
    let scorer = EmotionScorer::new(classifier(config));
    let record = scorer.score_file(image)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        print_record(&record);
    }
    Ok(())
}

fn print_record(record: &EmotionRecord) {
    println!("Detected emotions:");
    for (emotion, value) in record.emotions.iter() {
        println!("{}: {:.2}", emotion, value);
    }
    println!();
    println!("Dominant emotion: {}", record.dominant_emotion);
    println!();
    println!("Fear Score: {:.2}", record.fear_score);
}

fn summary(config: &PipelineConfig) -> CliResult {
    let table = EmotionTable::load(&config.emotion_table)?;
    let ranked = ranked_by_fear(table.rows().iter().map(|r| (r.image.as_str(), r.fear_score)));

    println!("Fear score by image (highest first):");
    for (image, score) in &ranked {
        println!("{:>8.2}  {}", score, image);
    }
    println!();
    println!("Fear Score Summary:");
    match FearSummary::from_scores(&table.fear_scores()) {
        Some(summary) => println!("{}", summary),
        None => println!("count 0 (no records)"),
    }
    Ok(())
}

fn run(config: &PipelineConfig) -> CliResult {
    let report = run_pipeline(config, classifier(config), provider(config)).map_err(|e| match e {
        PipelineError::Merge(merge) => explain_merge_error(&merge),
        other => other.to_string(),
    })?;
    print_batch(&report.batch, false)?;
    println!();
    print_merged(&report.merged)
}
