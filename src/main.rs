use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

use banyan_forest::{Cascade, CascadeConfig, DEF_STATS_FILE, RandomForestConfig, Stat, StatWriter};
use banyan_sample::{LnSmote, OversampleConfig, Smote};

mod loader;

#[derive(Parser)]
#[command(name = "banyan")]
#[command(about = "Decision-tree ensembles and minority oversampling for tabular classification")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for reproducibility
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Train a Random Forest, optionally evaluating a test set
    Forest(ForestArgs),
    /// Train a Cascaded Random Forest, optionally evaluating a test set
    Cascade(CascadeArgs),
    /// Oversample the minority class with SMOTE
    Smote(OversampleArgs),
    /// Oversample the minority class with LN-SMOTE
    Lnsmote(OversampleArgs),
}

#[derive(Args)]
struct ForestArgs {
    /// Training dataset metadata file
    #[arg(long)]
    train: PathBuf,

    /// Test dataset metadata file
    #[arg(long)]
    test: Option<PathBuf>,

    /// Learner configuration file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of trees
    #[arg(long)]
    ntree: Option<usize>,

    /// Number of features sampled per tree
    #[arg(long)]
    nrandomfeature: Option<usize>,

    /// Percentage of samples bootstrapped per tree
    #[arg(long)]
    percentboot: Option<usize>,

    /// File where per-tree OOB statistics are appended
    #[arg(long)]
    oobstatsfile: Option<PathBuf>,

    /// File where test-set performance is appended
    #[arg(long)]
    perffile: Option<PathBuf>,
}

#[derive(Args)]
struct CascadeArgs {
    #[command(flatten)]
    forest: ForestArgs,

    /// Number of cascade stages
    #[arg(long)]
    nstage: Option<usize>,

    /// File where per-stage statistics are appended
    #[arg(long)]
    statsfile: Option<PathBuf>,
}

#[derive(Args)]
struct OversampleArgs {
    /// Dataset metadata file
    #[arg(long)]
    train: PathBuf,

    /// Oversampler configuration file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Oversampling percentage
    #[arg(long)]
    percentover: Option<usize>,

    /// Number of nearest neighbors
    #[arg(long)]
    knn: Option<usize>,

    /// File where synthetic rows are written
    #[arg(long)]
    syntheticfile: Option<PathBuf>,

    /// Also append the original rows to the synthetic file
    #[arg(long)]
    merge: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Forest(args) => run_forest(args, cli.seed),
        Command::Cascade(args) => run_cascade(args, cli.seed),
        Command::Smote(args) => run_oversample(args, cli.seed, false),
        Command::Lnsmote(args) => run_oversample(args, cli.seed, true),
    }
}

/// Load a JSON config file, or the type's defaults when no file given.
fn load_config<T: serde::de::DeserializeOwned + Default>(path: Option<&PathBuf>) -> Result<T> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("parsing config {}", path.display()))
        }
        None => Ok(T::default()),
    }
}

fn forest_config(args: &ForestArgs, seed: u64) -> Result<RandomForestConfig> {
    let mut config: RandomForestConfig = load_config(args.config.as_ref())?;
    // Command-line flags override the config file.
    if let Some(n) = args.ntree {
        config = config.with_n_trees(n);
    }
    if let Some(n) = args.nrandomfeature {
        config = config.with_n_random_feature(n);
    }
    if let Some(n) = args.percentboot {
        config = config.with_percent_boot(n);
    }
    if let Some(path) = &args.oobstatsfile {
        config = config
            .with_oob_stats_file(Some(path.clone()))
            .with_run_oob(true);
    }
    if let Some(path) = &args.perffile {
        config = config.with_perf_file(Some(path.clone()));
    }
    Ok(config.with_seed(seed))
}

fn run_forest(args: ForestArgs, seed: u64) -> Result<()> {
    let config = forest_config(&args, seed)?;
    let trainset = loader::load_dataset(&args.train)?;

    let forest = config.fit(&trainset).context("training random forest")?;
    info!(
        n_trees = forest.n_trees(),
        oob_error_mean = forest.oob_error_total_mean(),
        "forest trained"
    );

    if let Some(test_path) = &args.test {
        let mut testset = loader::load_dataset(test_path)?;
        let cm = forest.classify_set(&mut testset, &[], false);
        println!("{cm}");
        write_performance(config.perf_file().cloned(), forest.n_trees() as i64, &cm)?;
    }
    Ok(())
}

fn run_cascade(args: CascadeArgs, seed: u64) -> Result<()> {
    let mut config: CascadeConfig = load_config(args.forest.config.as_ref())?;
    if let Some(n) = args.nstage {
        config = config.with_n_stages(n);
    }
    if let Some(n) = args.forest.ntree {
        config = config.with_n_trees(n);
    }
    if let Some(n) = args.forest.nrandomfeature {
        config = config.with_n_random_feature(n);
    }
    if let Some(n) = args.forest.percentboot {
        config = config.with_percent_boot(n);
    }
    if let Some(path) = &args.statsfile {
        config = config.with_stats_file(Some(path.clone()));
    }
    if config.stats_file().is_none() {
        config = config.with_stats_file(Some(PathBuf::from(DEF_STATS_FILE)));
    }
    let config = config.with_seed(seed);

    let mut trainset = loader::load_dataset(&args.forest.train)?;
    let cascade = Cascade::build(&config, &mut trainset).context("training cascade")?;
    info!(n_stages = cascade.n_stages(), "cascade trained");

    if let Some(test_path) = &args.forest.test {
        let testset = loader::load_dataset(test_path)?;
        let (_, cm) = cascade.classify_set_by_weight(&testset, &[]);
        println!("{cm}");
        write_performance(
            args.forest.perffile.clone(),
            cascade.n_stages() as i64,
            &cm,
        )?;
    }
    Ok(())
}

fn write_performance(
    path: Option<PathBuf>,
    id: i64,
    cm: &banyan_forest::ConfusionMatrix,
) -> Result<()> {
    if let Some(path) = path {
        let mut stat = Stat::from_matrix(id, cm);
        stat.oob_error = cm.false_rate();
        StatWriter::new(&path)
            .append(&stat)
            .context("writing performance file")?;
    }
    Ok(())
}

fn run_oversample(args: OversampleArgs, seed: u64, local_neighborhood: bool) -> Result<()> {
    let mut config: OversampleConfig = load_config(args.config.as_ref())?;
    if let Some(p) = args.percentover {
        config.percent_over = p;
    }
    if let Some(k) = args.knn {
        config.k = k;
    }
    if let Some(path) = &args.syntheticfile {
        config.synthetic_file = Some(path.clone());
    }

    let dataset = loader::load_dataset(&args.train)?;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let synthetic = if local_neighborhood {
        let mut lnsmote = LnSmote::from_config(&config)?;
        if config.class_minor.is_empty() {
            // Fall back to the dataset's own minority class.
            let minor = dataset
                .minority_class()
                .context("dataset has no class values")?
                .to_string();
            lnsmote = lnsmote.with_class_minor(minor);
        }
        lnsmote.resample(&dataset, &mut rng)?
    } else {
        let minority = dataset.minority_rows();
        info!(n_minority = minority.len(), "minority set selected");
        Smote::from_config(&config)?.resample(&minority, &mut rng)?
    };

    info!(n_synthetic = synthetic.len(), "oversampling complete");

    if let Some(path) = &config.synthetic_file {
        let written = loader::write_rows(path, &synthetic, ",", false)?;
        info!(written, path = %path.display(), "synthetic rows written");
        if args.merge {
            let appended = loader::write_rows(path, &dataset, ",", true)?;
            info!(appended, "original rows merged");
        }
    }
    Ok(())
}
