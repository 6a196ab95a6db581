//! Stress Sensor Data CLI
//!
//! Downloads the record store and prepares balanced datasets.

use anyhow::Context;
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::path::{Path, PathBuf};
use std::time::Duration;
use stress_sensor_data::{
    clear_cache, core::DEFAULT_FILE_KEY, load_combined, load_or_fetch, refresh, BalanceMode,
    Config, DatasetSource, Pipeline, PipelineConfig, RecordTree, StoreError, Task, TreeSource,
    UserSelector, VERSION,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "stress-data")]
#[command(version = VERSION)]
#[command(about = "Dataset construction for wearable stress-sensing research", long_about = None)]
struct Cli {
    #[command(flatten)]
    store: StoreArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct StoreArgs {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Cached record tree location
    #[arg(long, global = true)]
    cache: Option<PathBuf>,

    /// Remote store endpoint
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Store credentials file
    #[arg(long, global = true)]
    credentials: Option<PathBuf>,

    /// Download timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the record tree into the local cache
    Fetch {
        /// Re-download even if a cache file exists
        #[arg(long)]
        force: bool,
    },

    /// Delete the cached record tree
    ClearCache,

    /// List users and their data categories
    Users,

    /// Build a prepared dataset and export it as JSON
    Build(BuildArgs),

    /// Show configuration
    Config,
}

#[derive(Args)]
struct BuildArgs {
    /// Classification (stress) or regression (energy)
    #[arg(long, value_enum, default_value = "stress")]
    task: Task,

    /// Users to include, by index or id (repeatable).
    /// Use `id:<key>` for ids that are all digits.
    #[arg(long = "user")]
    users: Vec<UserSelector>,

    /// Data category (defaults to the task's category)
    #[arg(long)]
    category: Option<String>,

    /// Source dataset files to include (repeatable)
    #[arg(long = "file")]
    files: Vec<PathBuf>,

    /// Key of the window array in source files
    #[arg(long, default_value = DEFAULT_FILE_KEY)]
    file_key: String,

    /// Balancing strategy (defaults to the configured one)
    #[arg(long, value_enum)]
    balance: Option<BalanceMode>,

    /// Fraction of rows held out for testing
    #[arg(long)]
    test_fraction: Option<f64>,

    /// Apply the energy transform to energy labels
    #[arg(long)]
    energy_transform: bool,

    /// Seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Output file (defaults to the export directory)
    #[arg(long, short)]
    output: Option<PathBuf>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let (config_path, config) = load_config(&cli.store)?;

    match cli.command {
        Commands::Fetch { force } => cmd_fetch(&config, force),
        Commands::ClearCache => cmd_clear_cache(&config),
        Commands::Users => cmd_users(&config),
        Commands::Build(args) => cmd_build(&config, args),
        Commands::Config => cmd_config(&config_path, &config),
    }
}

/// Load the config file and apply command-line overrides. Returns the path
/// that was read alongside the result.
fn load_config(args: &StoreArgs) -> anyhow::Result<(PathBuf, Config)> {
    let path = args.config.clone().unwrap_or_else(Config::config_path);
    let mut config =
        Config::load_from(&path).with_context(|| format!("loading config {path:?}"))?;

    if let Some(cache) = &args.cache {
        config.cache_file = Some(cache.clone());
    }
    if let Some(url) = &args.database_url {
        config.database_url = url.clone();
    }
    if let Some(credentials) = &args.credentials {
        config.credentials_path = Some(credentials.clone());
    }
    if let Some(secs) = args.timeout {
        config.fetch_timeout = Duration::from_secs(secs);
    }

    Ok((path, config))
}

/// The real store, constructed but not yet connected.
#[cfg(feature = "remote")]
fn tree_source(config: &Config) -> Box<dyn TreeSource> {
    let mut store = stress_sensor_data::StoreConfig::new(config.database_url.clone())
        .with_timeout(config.fetch_timeout);
    if let Some(path) = &config.credentials_path {
        store = store.with_credentials(path);
    }
    Box::new(stress_sensor_data::BlockingStoreClient::new(store))
}

#[cfg(not(feature = "remote"))]
fn tree_source(_config: &Config) -> Box<dyn TreeSource> {
    Box::new(Offline)
}

#[cfg(not(feature = "remote"))]
struct Offline;

#[cfg(not(feature = "remote"))]
impl TreeSource for Offline {
    fn fetch_tree(&self) -> Result<RecordTree, StoreError> {
        Err(StoreError::Connectivity(
            "built without the `remote` feature; only a cached tree can be used".to_string(),
        ))
    }
}

fn load_tree(config: &Config) -> Result<RecordTree, StoreError> {
    let source = tree_source(config);
    load_or_fetch(&config.cache_path(), source.as_ref())
}

fn cmd_fetch(config: &Config, force: bool) -> anyhow::Result<()> {
    let path = config.cache_path();
    let tree = if force {
        refresh(&path, tree_source(config).as_ref())?
    } else {
        load_tree(config)?
    };
    let users = tree.users()?;
    println!("Record tree cached at {path:?}");
    println!("Found data from {} users", users.len());
    Ok(())
}

fn cmd_clear_cache(config: &Config) -> anyhow::Result<()> {
    let path = config.cache_path();
    if clear_cache(&path)? {
        println!("Cleared cache {path:?}");
    } else {
        println!("No cache found at {path:?}");
    }
    Ok(())
}

fn cmd_users(config: &Config) -> anyhow::Result<()> {
    let tree = load_tree(config)?;
    let users = tree.users()?;

    println!("Users");
    println!("=====");
    for (index, user) in users.iter().enumerate() {
        println!(
            "[{index}] {} ({})",
            user.display_name().unwrap_or("?"),
            user.id()
        );
        for category in user.categories() {
            let count = user
                .get(category)
                .and_then(|v| v.as_object())
                .map(|m| m.len())
                .unwrap_or(0);
            println!("      {category}: {count} windows");
        }
    }
    Ok(())
}

fn cmd_build(config: &Config, args: BuildArgs) -> anyhow::Result<()> {
    let category = args
        .category
        .clone()
        .unwrap_or_else(|| args.task.default_category().to_string());

    let mut users = args.users.clone();
    if users.is_empty() && args.files.is_empty() {
        users.push(UserSelector::Index(0));
    }

    let mut sources: Vec<DatasetSource> = users
        .into_iter()
        .map(|user| DatasetSource::Store {
            user,
            category: category.clone(),
        })
        .collect();
    sources.extend(args.files.iter().map(|path| DatasetSource::File {
        path: path.clone(),
        key: args.file_key.clone(),
    }));

    let tree = if sources.iter().any(DatasetSource::needs_tree) {
        Some(load_tree(config)?)
    } else {
        None
    };
    let dataset = load_combined(&sources, tree.as_ref())?;

    let mut pipeline_config =
        PipelineConfig::new(args.task, args.balance.unwrap_or(config.balance))
            .with_test_fraction(args.test_fraction.unwrap_or(config.test_fraction))
            .with_max_split_attempts(config.max_split_attempts);
    if args.task == Task::Energy && args.energy_transform {
        pipeline_config = pipeline_config.with_energy_scale(config.energy_scale);
    }

    let seed = args.seed.or(config.seed).unwrap_or_else(rand::random);
    tracing::info!(seed, "seeding random source");
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let prepared = Pipeline::new(pipeline_config).run(dataset, &mut rng)?;

    println!("{}", prepared.summary);
    println!("Samples used for training: {}", prepared.train.len());
    println!("Samples used for validation: {}", prepared.test.len());

    let output = args.output.unwrap_or_else(|| {
        config.export_path.join(format!(
            "{}_{}.json",
            args.task.default_category(),
            Utc::now().format("%Y%m%d_%H%M%S")
        ))
    });
    prepared.write_json(&output)?;
    println!("Exported prepared dataset to {output:?}");
    Ok(())
}

fn cmd_config(config_path: &Path, config: &Config) -> anyhow::Result<()> {
    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {config_path:?}");
    println!("Cache file: {:?}", config.cache_path());
    println!();
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}
