use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::{error::Error, path::PathBuf};
use tally::{
    config::{Config, ConfigStore, FileConfigStore},
    rating::{DrawSummary, ProgressionSignals, Rating, RatingDistribution},
    records::{load_records, RecordFormat},
    report::{render_review, review_json, ReportOptions, Review},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// adaptive performance scoring for study sessions
#[derive(Parser, Debug)]
#[command(
    name = "tally",
    version,
    about,
    long_about = "Draws skewed review ratings from a student's level and study streak, and turns graded question records into per-topic stats and a ranked weakness report."
)]
struct Cli {
    /// log debug output to stderr (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// use this config file instead of the platform default
    #[arg(long, global = true)]
    config_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the rating distribution for a level and streak
    Distribution {
        /// player level (1-6, anything else counts as 1)
        #[arg(short, long, default_value_t = 1)]
        level: u32,

        /// consecutive study days
        #[arg(short, long, default_value_t = 0)]
        streak: u32,

        #[arg(long)]
        json: bool,
    },
    /// Draw one or more review ratings
    Sample {
        #[arg(short, long, default_value_t = 1)]
        level: u32,

        #[arg(short, long, default_value_t = 0)]
        streak: u32,

        /// number of independent draws
        #[arg(short = 'n', long)]
        draws: Option<usize>,

        /// seed for reproducible draws
        #[arg(long)]
        seed: Option<u64>,

        #[arg(long)]
        json: bool,
    },
    /// Aggregate graded records and report weak areas
    Review {
        /// CSV or JSON file of graded records
        file: PathBuf,

        /// record format (inferred from the file extension when omitted)
        #[arg(short, long, value_enum)]
        format: Option<RecordFormat>,

        /// number of weakness entries to keep
        #[arg(short = 'k', long)]
        limit: Option<usize>,

        #[arg(long)]
        json: bool,
    },
    /// Inspect or change stored preferences
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the current config and where it lives
    Show,
    /// Restore defaults
    Reset,
    /// Change individual values
    Set {
        #[arg(long)]
        weakness_limit: Option<usize>,

        #[arg(long)]
        ranking_limit: Option<usize>,

        #[arg(long)]
        draws: Option<usize>,
    },
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let store = match &cli.config_file {
        Some(path) => FileConfigStore::with_path(path),
        None => FileConfigStore::new(),
    };
    let config = store.load();

    match cli.command {
        Commands::Distribution {
            level,
            streak,
            json,
        } => print_distribution(ProgressionSignals::new(level, streak), json)?,
        Commands::Sample {
            level,
            streak,
            draws,
            seed,
            json,
        } => {
            let dist = RatingDistribution::for_signals(ProgressionSignals::new(level, streak));
            let mut rng = match seed {
                Some(seed) => ChaCha8Rng::seed_from_u64(seed),
                None => ChaCha8Rng::from_entropy(),
            };
            let draws = draws.unwrap_or(config.draws).max(1);
            let summary = dist.sample_many(draws, &mut rng);
            print_draws(&summary, json)?;
        }
        Commands::Review {
            file,
            format,
            limit,
            json,
        } => {
            let records = load_records(&file, format)?;
            info!(count = records.len(), path = %file.display(), "reviewing graded records");

            let review = Review::build(&records, limit.unwrap_or(config.weakness_limit));
            let opts = ReportOptions {
                ranking_limit: config.ranking_limit,
                source: Some(file.display().to_string()),
                ..ReportOptions::default()
            };
            if json {
                println!("{}", review_json(&review, &opts)?);
            } else {
                print!("{}", render_review(&review, &opts));
            }
        }
        Commands::Config { action } => run_config(&store, config, action)?,
    }

    Ok(())
}

fn print_distribution(signals: ProgressionSignals, json: bool) -> Result<(), Box<dyn Error>> {
    let dist = RatingDistribution::for_signals(signals);

    if json {
        println!("{}", serde_json::to_string_pretty(&dist.as_map())?);
        return Ok(());
    }

    println!(
        "level {} (x{:.2}), streak {} days (x{:.2}, {} band), total factor {:.2}",
        signals.level,
        signals.level_factor(),
        signals.streak_days,
        signals.streak_factor(),
        signals.streak_band(),
        signals.total_factor()
    );
    for (rating, mass) in dist.iter() {
        println!("rating {rating}: {mass:.4}");
    }
    Ok(())
}

fn print_draws(summary: &DrawSummary, json: bool) -> Result<(), Box<dyn Error>> {
    if json {
        let doc = serde_json::json!({
            "draws": summary.draws,
            "counts": summary.counts,
            "mean": summary.mean(),
            "stdDev": summary.std_dev(),
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    if summary.draws == 1 {
        if let Some(rating) = Rating::ALL.iter().find(|&&r| summary.count(r) == 1) {
            println!("{rating}");
        }
        return Ok(());
    }

    for rating in Rating::ALL {
        println!("rating {rating}: {}", summary.count(rating));
    }
    if let (Some(mean), Some(sd)) = (summary.mean(), summary.std_dev()) {
        println!("mean {mean:.2}, std dev {sd:.2} over {} draws", summary.draws);
    }
    Ok(())
}

fn run_config(
    store: &FileConfigStore,
    mut config: Config,
    action: ConfigAction,
) -> Result<(), Box<dyn Error>> {
    match action {
        ConfigAction::Show => {}
        ConfigAction::Reset => {
            config = Config::default();
            store.save(&config)?;
        }
        ConfigAction::Set {
            weakness_limit,
            ranking_limit,
            draws,
        } => {
            if let Some(v) = weakness_limit {
                config.weakness_limit = v;
            }
            if let Some(v) = ranking_limit {
                config.ranking_limit = v;
            }
            if let Some(v) = draws {
                config.draws = v;
            }
            store.save(&config)?;
        }
    }

    println!("# {}", store.path().display());
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
