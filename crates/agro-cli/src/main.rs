//! `agro`: command-line front end for the prediction engine.
//!
//! # Usage
//!
//! ```
//! agro import --json crop_yield.json
//! agro diagnose --crop Rice --image leaf.jpg --location Ludhiana
//! agro predict --crop Rice --state Punjab --season Kharif --area 2 \
//!   --fertilizer 300 --pesticide 4
//! agro gap --crop Rice --state Punjab --season Kharif --current-yield 3.1
//! agro benchmarks --crop Wheat --state Punjab
//! ```
//!
//! Every command prints pretty JSON on stdout. Logs go to stderr and follow
//! `RUST_LOG`.

mod settings;

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use agro_core::{
  stamp::SystemStamp,
  yields::{YieldRecord, YieldRequest},
};
use agro_engine::Engine;
use agro_models::{ClassifierHandle, RegressorHandle};
use agro_reference::{BenchmarkStore, KnowledgeBase};
use agro_store_sqlite::SqliteStore;
use anyhow::Context as _;
use clap::{Parser, Subcommand};
use serde::Serialize;
use settings::CliConfig;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Crop disease diagnosis and yield analytics")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "agro.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Diagnose a disease from a leaf photo.
  Diagnose {
    #[arg(long)]
    crop:     String,
    /// PNG, JPEG or WebP file.
    #[arg(long)]
    image:    PathBuf,
    #[arg(long)]
    location: Option<String>,
    /// Free-text description of what the farmer observed.
    #[arg(long)]
    symptoms: Option<String>,
  },

  /// Predict yield in tonnes per hectare.
  Predict {
    #[arg(long)]
    crop:       String,
    #[arg(long)]
    state:      String,
    #[arg(long)]
    season:     String,
    /// Hectares.
    #[arg(long)]
    area:       f64,
    /// Total kg over the whole area.
    #[arg(long)]
    fertilizer: f64,
    /// Total kg over the whole area.
    #[arg(long)]
    pesticide:  f64,
    #[arg(long)]
    temp:       Option<f64>,
    /// Annual rainfall, mm.
    #[arg(long)]
    rainfall:   Option<f64>,
    #[arg(long)]
    humidity:   Option<f64>,
  },

  /// Compare a yield with historical benchmarks.
  Gap {
    #[arg(long)]
    crop:          String,
    #[arg(long)]
    state:         String,
    #[arg(long)]
    season:        Option<String>,
    /// Tonnes per hectare.
    #[arg(long)]
    current_yield: f64,
  },

  /// Show cohort statistics.
  Benchmarks {
    #[arg(long)]
    crop:   String,
    #[arg(long)]
    state:  String,
    #[arg(long)]
    season: Option<String>,
  },

  /// Load yield records into the reference database.
  Import {
    /// JSON array of yield records.
    #[arg(long, value_name = "FILE")]
    json: PathBuf,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let cfg = CliConfig::load(&cli.config)?;

  let store = SqliteStore::open(&cfg.reference_db)
    .await
    .with_context(|| format!("failed to open reference db at {:?}", cfg.reference_db))?;

  match cli.command {
    Command::Import { json } => import(&store, &json).await,
    command => {
      let engine = build_engine(&cfg, &store).await?;
      run(command, &engine).await
    }
  }
}

async fn run(command: Command, engine: &Engine) -> anyhow::Result<()> {
  match command {
    Command::Diagnose {
      crop,
      image,
      location,
      symptoms,
    } => {
      let bytes = tokio::fs::read(&image)
        .await
        .with_context(|| format!("failed to read image {}", image.display()))?;
      print_json(&engine.diagnose(crop, bytes, location, symptoms).await?)
    }
    Command::Predict {
      crop,
      state,
      season,
      area,
      fertilizer,
      pesticide,
      temp,
      rainfall,
      humidity,
    } => {
      let request = YieldRequest {
        crop,
        state,
        season,
        area,
        fertilizer,
        pesticide,
        avg_temp_c: temp,
        total_rainfall_mm: rainfall,
        avg_humidity_percent: humidity,
      };
      print_json(&engine.predict_yield(request).await?)
    }
    Command::Gap {
      crop,
      state,
      season,
      current_yield,
    } => print_json(
      &engine
        .analyze_gap(crop, state, season, current_yield)
        .await?,
    ),
    Command::Benchmarks {
      crop,
      state,
      season,
    } => print_json(&engine.get_benchmarks(&crop, &state, season.as_deref())?),
    Command::Import { json } => anyhow::bail!(
      "import of {} needs the reference store, not the engine",
      json.display()
    ),
  }
}

/// Load reference data and model artifacts once.
async fn build_engine(cfg: &CliConfig, store: &SqliteStore) -> anyhow::Result<Engine> {
  let knowledge = match &cfg.knowledge_base {
    Some(path) => KnowledgeBase::from_json_file(path)
      .with_context(|| format!("failed to load knowledge base {}", path.display()))?,
    None => KnowledgeBase::builtin().context("built-in knowledge base is invalid")?,
  };

  let records = store
    .load_records()
    .await
    .context("failed to load yield records")?;
  if records.is_empty() {
    tracing::warn!(
      db = %cfg.reference_db.display(),
      "reference db is empty; run `agro import` first"
    );
  }
  let benchmarks =
    BenchmarkStore::from_records(records).context("reference db holds invalid records")?;

  let classifier = ClassifierHandle::load(
    cfg.classifier_model.as_deref(),
    Some(cfg.engine.classifier_top_k),
  );
  let regressor = RegressorHandle::load(cfg.regressor_model.as_deref());

  Ok(Engine::from_parts(
    cfg.engine.clone(),
    Arc::new(knowledge),
    Arc::new(benchmarks),
    classifier,
    regressor,
    Arc::new(SystemStamp),
  ))
}

async fn import(store: &SqliteStore, path: &Path) -> anyhow::Result<()> {
  let json = tokio::fs::read_to_string(path)
    .await
    .with_context(|| format!("failed to read {}", path.display()))?;
  let records: Vec<YieldRecord> = serde_json::from_str(&json)
    .with_context(|| format!("{} is not a JSON array of yield records", path.display()))?;
  let submitted = records.len();

  let source = path.display().to_string();
  let batch = store
    .import_records(&source, records)
    .await
    .context("import failed")?;
  let total = store.count().await?;

  print_json(&serde_json::json!({
    "batch_id": batch.batch_id,
    "imported_at": batch.imported_at,
    "source": batch.source,
    "inserted": batch.record_count,
    "skipped": submitted - batch.record_count,
    "total_records": total,
  }))
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}
