//! Offline tooling: synthetic history generation, catalog import, training and
//! one-off predictions.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use meditrust_core::ProductKey;
use meditrust_forecast::history::{read_order_history_file, write_feature_set_file};
use meditrust_forecast::{
    ArtifactPaths, DemandForecaster, DemandPredictor, GeneratorConfig, InferenceBackend,
    OrderGenerator, SequenceStep, TrainingBackend, TrainingConfig,
};

#[derive(Parser, Debug)]
#[command(name = "meditrust", author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Synthesize an order history with engineered features from a catalog.
    Generate(GenerateArgs),
    /// Load a catalog spreadsheet (.xlsx/.xls/.ods/.csv) into the database.
    Import(ImportArgs),
    /// Train the demand model and write its artifact bundle.
    Train(TrainArgs),
    /// Predict next-order quantity for one product from a trained bundle.
    Predict(PredictArgs),
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Catalog spreadsheet providing the `SR.NO.` product keys.
    #[arg(long)]
    catalog: Option<PathBuf>,
    /// Read product keys from the database; `--catalog` takes precedence.
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,
    #[arg(long, default_value = "synthetic_order_history.csv")]
    output: PathBuf,
    #[arg(long, default_value_t = 2000)]
    orders: usize,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    #[arg(long, default_value = "2023-01-01")]
    start: NaiveDate,
    /// Exclusive upper bound of order dates.
    #[arg(long, default_value = "2025-01-01")]
    end: NaiveDate,
}

#[derive(Args, Debug)]
struct ImportArgs {
    file: PathBuf,
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://meditrust.db")]
    database_url: String,
    #[arg(long, env = "MEDITRUST_DB_POOL", default_value_t = 5)]
    pool: u32,
}

#[derive(Args, Debug)]
struct TrainArgs {
    /// Order history CSV as written by `generate`.
    #[arg(long, default_value = "synthetic_order_history.csv")]
    history: PathBuf,
    #[arg(long, env = "MEDITRUST_ARTIFACTS", default_value = "models")]
    artifacts: PathBuf,
    #[arg(long, default_value_t = 100)]
    epochs: usize,
    #[arg(long, default_value_t = 32)]
    batch_size: usize,
    #[arg(long, default_value_t = 1.0e-4)]
    learning_rate: f64,
    #[arg(long, default_value_t = 5)]
    patience: usize,
    #[arg(long, default_value_t = 5)]
    sequence_len: usize,
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

#[derive(Args, Debug)]
struct PredictArgs {
    #[arg(long)]
    product: ProductKey,
    /// JSON array of steps (`[{"RollingQuantity": .., ...}]`); empty pads fully.
    #[arg(long, default_value = "[]")]
    seq: String,
    #[arg(long, env = "MEDITRUST_ARTIFACTS", default_value = "models")]
    artifacts: PathBuf,
}

async fn catalog_keys(args: &GenerateArgs) -> anyhow::Result<Vec<ProductKey>> {
    if let Some(path) = &args.catalog {
        let sheet = meditrust_infra::read_catalog(path)
            .with_context(|| format!("failed to read catalog {}", path.display()))?;
        return Ok(sheet.medicines.iter().map(|m| m.sr_number).collect());
    }
    if let Some(url) = &args.database_url {
        let pool = meditrust_infra::connect(url, 1)
            .await
            .with_context(|| format!("failed to open database {url}"))?;
        let keys = meditrust_infra::CatalogRepository::new(pool).keys().await?;
        return Ok(keys);
    }
    bail!("either --catalog or --database-url is required")
}

async fn generate(args: GenerateArgs) -> anyhow::Result<()> {
    let mut products = catalog_keys(&args).await?;
    products.sort();
    products.dedup();
    tracing::info!(products = products.len(), "generating synthetic history");

    let generator = OrderGenerator::new(GeneratorConfig {
        orders: args.orders,
        start: args.start,
        end: args.end,
        seed: args.seed,
        ..GeneratorConfig::default()
    });
    let lags = generator.config().features.lags;
    let set = generator.generate_features(&products)?;

    write_feature_set_file(&args.output, &set, lags)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    println!(
        "wrote {} rows ({} dropped for missing lags) to {}",
        set.rows.len(),
        set.dropped,
        args.output.display()
    );
    Ok(())
}

async fn import(args: ImportArgs) -> anyhow::Result<()> {
    let pool = meditrust_infra::connect(&args.database_url, args.pool)
        .await
        .with_context(|| format!("failed to open database {}", args.database_url))?;
    let repo = meditrust_infra::CatalogRepository::new(pool);
    let report = meditrust_infra::import_catalog(&repo, &args.file)
        .await
        .with_context(|| format!("failed to import {}", args.file.display()))?;
    println!(
        "imported {} medicines, skipped {} rows",
        report.inserted, report.skipped
    );
    Ok(())
}

fn train(args: TrainArgs) -> anyhow::Result<()> {
    tracing::info!(history = %args.history.display(), "loading order history");
    let records = read_order_history_file(&args.history)
        .with_context(|| format!("failed to read {}", args.history.display()))?;

    let config = TrainingConfig::with_defaults()
        .with_num_epochs(args.epochs)
        .with_batch_size(args.batch_size)
        .with_learning_rate(args.learning_rate)
        .with_patience(args.patience)
        .with_sequence_len(args.sequence_len)
        .with_seed(args.seed);

    let paths = ArtifactPaths::new(&args.artifacts);
    let report = meditrust_forecast::training::train::<TrainingBackend>(
        &paths,
        &records,
        config,
        &Default::default(),
    )?;

    println!(
        "trained on {} windows over {} products; best validation MAE {:.4} at epoch {} of {}; artifacts in {}",
        report.windows,
        report.products,
        report.best_valid_mae,
        report.best_epoch,
        report.epochs_run,
        args.artifacts.display()
    );
    Ok(())
}

fn predict(args: PredictArgs) -> anyhow::Result<()> {
    let steps: Vec<SequenceStep> =
        serde_json::from_str(&args.seq).context("--seq must be a JSON array of steps")?;
    let predictor = load_predictor(&args.artifacts)?;
    let quantity = predictor.predict(args.product, &steps)?;
    println!("{quantity}");
    Ok(())
}

fn load_predictor(dir: &Path) -> anyhow::Result<DemandPredictor<InferenceBackend>> {
    DemandPredictor::load(&ArtifactPaths::new(dir), Default::default())
        .with_context(|| format!("failed to load demand model from {}", dir.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    meditrust_observability::init_cli();

    match Cli::parse().command {
        Command::Generate(args) => generate(args).await,
        Command::Import(args) => import(args).await,
        Command::Train(args) => train(args),
        Command::Predict(args) => predict(args),
    }
}
