use std::path::{Path, PathBuf};
use structopt::StructOpt;

use travel_sentinel::config::Config;
use travel_sentinel::detection::ImpossibleTravelAnalyzer;

/// Impossible travel detection command line interface
#[derive(StructOpt, Debug)]
#[structopt(name = "travel", about = "Impossible travel detection CLI")]
pub enum Cli {
    /// Generate a default configuration file
    Config {
        /// Output path for the configuration file
        #[structopt(short, long, default_value = "config.toml")]
        output: PathBuf,
    },
    /// Analyze a single login against the stored history
    Analyze {
        /// Path to configuration file
        #[structopt(short, long, default_value = "config.toml")]
        config: PathBuf,
        #[structopt(short, long)]
        user: String,
        #[structopt(short, long)]
        ip: String,
        /// ISO-8601 timestamp of the login
        #[structopt(short, long)]
        ts: String,
    },
    /// Show record and user counts
    Stats {
        #[structopt(short, long, default_value = "config.toml")]
        config: PathBuf,
    },
    /// Delete all stored login history
    Purge {
        #[structopt(short, long, default_value = "config.toml")]
        config: PathBuf,
    },
    /// List the most recent logins of a user
    History {
        #[structopt(short, long, default_value = "config.toml")]
        config: PathBuf,
        #[structopt(short, long)]
        user: String,
        #[structopt(short, long, default_value = "10")]
        limit: usize,
    },
}

fn open(path: &Path) -> Result<ImpossibleTravelAnalyzer, Box<dyn std::error::Error>> {
    let config = Config::load(path)?;
    Ok(ImpossibleTravelAnalyzer::from_config(&config, None)?)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::from_args();

    match cli {
        Cli::Config { output } => {
            let config = Config::default();
            config.to_file(&output)?;
            println!("Default configuration written to: {:?}", output);
        }
        Cli::Analyze { config, user, ip, ts } => {
            let analyzer = open(&config)?;
            let result = analyzer.analyze(&user, &ip, &ts).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            if result.impossible_travel_detected {
                std::process::exit(2);
            }
        }
        Cli::Stats { config } => {
            let stats = open(&config)?.stats().await?;
            println!("Total records: {}", stats.total_records);
            println!("Unique users:  {}", stats.unique_users);
        }
        Cli::Purge { config } => {
            let result = open(&config)?.purge_all().await?;
            println!("{}", result.message);
        }
        Cli::History { config, user, limit } => {
            let records = open(&config)?.history(&user, limit).await?;
            if records.is_empty() {
                println!("No logins recorded for {}", user);
            }
            for record in records {
                println!(
                    "  [{}] {}  {:<39}  {}, {}  ({:.4}, {:.4})",
                    record.id,
                    record.timestamp.to_rfc3339(),
                    record.source_ip,
                    record.location.city,
                    record.location.country,
                    record.location.latitude,
                    record.location.longitude
                );
            }
        }
    }

    Ok(())
}
