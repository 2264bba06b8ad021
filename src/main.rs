use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use gap_insight_engine::arrow_handler::{
    build_distribution_result, build_gap_ranking_result, build_pivot_result, parse_arrow_ipc,
};
use gap_insight_engine::dataset::SourceFormat;
use gap_insight_engine::{Dashboard, Dataset, EngineConfig, GapEngine, Outcome, Selection};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "gap-insight-engine")]
#[command(author = "Hummer Team")]
#[command(version = "0.1.0")]
#[command(about = "Socioeconomic gap statistics for standardized-test results", long_about = None)]
struct Cli {
    /// TOML file with a [columns] mapping
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a CSV results table and compute the dashboard views
    Csv {
        /// Path to CSV file
        #[arg(short, long)]
        file: PathBuf,

        #[command(flatten)]
        selection: SelectionArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Load a JSON array of rows and compute the dashboard views
    Json {
        /// Path to JSON file
        #[arg(short, long)]
        file: PathBuf,

        #[command(flatten)]
        selection: SelectionArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Load an Arrow IPC stream and compute the dashboard views
    Arrow {
        /// Path to Arrow IPC stream file
        #[arg(short, long)]
        file: PathBuf,

        #[command(flatten)]
        selection: SelectionArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// List the municipalities, strata and education values in a table
    Options {
        /// Path to a CSV, JSON or Arrow IPC file (format taken from the extension)
        #[arg(short, long)]
        file: PathBuf,
    },
}

#[derive(Args)]
struct SelectionArgs {
    /// Municipality to include (repeatable; default all)
    #[arg(short, long = "municipality")]
    municipalities: Vec<String>,

    /// Stratum to include, e.g. "Estrato 2" or 2 (repeatable; default all)
    #[arg(short, long = "stratum")]
    strata: Vec<String>,

    /// Education variable for the cross-tab: mother or father
    #[arg(short, long, default_value = "mother")]
    education: String,
}

impl SelectionArgs {
    fn to_selection(&self) -> anyhow::Result<Selection> {
        Ok(Selection::parse(&self.municipalities, &self.strata, &self.education)?)
    }
}

#[derive(Args)]
struct OutputArgs {
    /// Write each populated view as an Arrow IPC stream into this directory
    #[arg(long)]
    arrow_dir: Option<PathBuf>,

    /// Print a readable summary instead of JSON
    #[arg(long)]
    summary: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let mapping = &config.columns;

    match cli.command {
        Commands::Csv {
            file,
            selection,
            output,
        } => {
            let content = read(&file)?;
            let dataset = Dataset::from_csv(dataset_name(&file), &content, mapping)?;
            run(dataset, &selection, &output)?;
        }

        Commands::Json {
            file,
            selection,
            output,
        } => {
            let content = read(&file)?;
            let dataset = Dataset::from_json(dataset_name(&file), &content, mapping)?;
            run(dataset, &selection, &output)?;
        }

        Commands::Arrow {
            file,
            selection,
            output,
        } => {
            let bytes = fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
            let dataset = parse_arrow_ipc(dataset_name(&file), &bytes, mapping)?;
            run(dataset, &selection, &output)?;
        }

        Commands::Options { file } => {
            let name = dataset_name(&file);
            let dataset = match SourceFormat::from_path(&file) {
                SourceFormat::Csv => Dataset::from_csv(name, &read(&file)?, mapping)?,
                SourceFormat::Json => Dataset::from_json(name, &read(&file)?, mapping)?,
                SourceFormat::Arrow => {
                    let bytes =
                        fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
                    parse_arrow_ipc(name, &bytes, mapping)?
                }
            };
            let engine = GapEngine::new(dataset);
            println!("{}", serde_json::to_string_pretty(&engine.options())?);
        }
    }

    Ok(())
}

fn read(file: &Path) -> anyhow::Result<String> {
    fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))
}

fn dataset_name(file: &Path) -> String {
    file.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "dataset".to_string())
}

fn run(dataset: Dataset, args: &SelectionArgs, output: &OutputArgs) -> anyhow::Result<()> {
    let selection = args.to_selection()?;
    let engine = GapEngine::new(dataset);
    let dashboard = engine.compute(&selection);

    if let Some(dir) = &output.arrow_dir {
        write_arrow(dir, &dashboard)?;
    }

    if output.summary {
        print_summary(&dashboard);
    } else {
        println!("{}", serde_json::to_string_pretty(&dashboard)?);
    }
    Ok(())
}

fn write_arrow(dir: &Path, dashboard: &Dashboard) -> anyhow::Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;

    let mut outputs = Vec::new();
    if let Some(distribution) = dashboard.distribution.data() {
        outputs.push(("distribution.arrow", build_distribution_result(distribution)?));
    }
    if let Some(pivot) = dashboard.cross_tab.data() {
        outputs.push(("cross_tab.arrow", build_pivot_result(pivot)?));
    }
    if let Some(ranking) = dashboard.ranking.data() {
        outputs.push(("gap_ranking.arrow", build_gap_ranking_result(ranking)?));
    }

    for (name, bytes) in outputs {
        let path = dir.join(name);
        fs::write(&path, bytes).with_context(|| format!("writing {}", path.display()))?;
        log::info!("wrote {}", path.display());
    }
    Ok(())
}

fn print_summary(dashboard: &Dashboard) {
    println!("\n=== Selection ===");
    println!("Rows:           {}", dashboard.rows);
    println!("Municipalities: {}", dashboard.filters.municipalities.len());
    println!("Education:      {}", dashboard.filters.education);

    println!("\n=== Distribution ===");
    match &dashboard.distribution {
        Outcome::Data(distribution) => {
            for group in &distribution.groups {
                match &group.stats {
                    Some(stats) => println!(
                        "{}: n={} mean={:.2} median={:.2}",
                        group.stratum, stats.count, stats.mean, stats.median
                    ),
                    None => println!("{}: n=0 (no scores)", group.stratum),
                }
            }
        }
        Outcome::NoData(no_data) => println!("{}", no_data),
    }

    println!("\n=== Cross-tab ===");
    match &dashboard.cross_tab {
        Outcome::Data(pivot) => println!(
            "{} strata x {} {} education values",
            pivot.strata.len(),
            pivot.columns.len(),
            pivot.education
        ),
        Outcome::NoData(no_data) => println!("{}", no_data),
    }

    println!("\n=== Gap ranking ===");
    match &dashboard.ranking {
        Outcome::Data(ranking) => {
            println!("min_n: {}", ranking.min_n);
            for row in ranking.rows.iter().rev() {
                println!(
                    "{:<28} gap={:>8.2}  low={:.2} (n={})  high={:.2} (n={})",
                    row.municipality,
                    row.gap,
                    row.mean_low,
                    row.count_low,
                    row.mean_high,
                    row.count_high
                );
            }
            if !ranking.excluded.is_empty() {
                println!("excluded below min_n: {}", ranking.excluded.join(", "));
            }
        }
        Outcome::NoData(no_data) => println!("{}", no_data),
    }
}
