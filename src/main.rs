mod catalog;
mod config;
mod hover;
mod net;
mod parser;
mod pipeline;
mod store;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use tracing::warn;

use config::Settings;
use net::HttpFetcher;
use pipeline::{Cancel, Pipeline};

#[derive(Parser)]
#[command(name = "x86_scraper", about = "x86 instruction reference scraper (felixcloutier.com)")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Instruction store (JSON)
    #[arg(long, global = true, default_value = config::STORE_PATH)]
    store: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover mnemonics and scrape every one not yet stored (default)
    Run {
        /// Directory for the mnemonic list and mapping reports
        #[arg(long, default_value = config::REPORTS_DIR)]
        reports_dir: PathBuf,
        /// Mnemonics per batch; the store is saved after each
        #[arg(short = 'b', long, default_value_t = config::BATCH_SIZE)]
        batch_size: usize,
        /// Seconds to pause between batches
        #[arg(long, default_value_t = config::BATCH_PAUSE_SECS)]
        pause: u64,
    },
    /// Print the stored documentation for one mnemonic
    Lookup { mnemonic: String },
    /// Show store statistics
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Run {
        reports_dir: PathBuf::from(config::REPORTS_DIR),
        batch_size: config::BATCH_SIZE,
        pause: config::BATCH_PAUSE_SECS,
    });

    let result = match command {
        Commands::Run {
            reports_dir,
            batch_size,
            pause,
        } => {
            let settings = Settings {
                store_path: cli.store,
                reports_dir,
                batch_size,
                batch_pause: Duration::from_secs(pause),
                ..Settings::default()
            };

            let cancel = Cancel::new();
            let on_signal = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, stopping after current instruction");
                    on_signal.cancel();
                }
            });

            let fetcher = HttpFetcher::new()?;
            Pipeline::new(&fetcher, &settings, cancel).run().await.map(|_| ())
        }
        Commands::Lookup { mnemonic } => {
            let store = store::load(&cli.store);
            if store.is_empty() {
                println!("Store is empty. Run `x86_scraper run` first.");
                return Ok(());
            }
            match hover::lookup(&store, &mnemonic) {
                Some(md) => println!("{}", md),
                None => println!("{} not found in {}", mnemonic.to_uppercase(), cli.store.display()),
            }
            Ok(())
        }
        Commands::Stats => {
            let store = store::load(&cli.store);
            let s = hover::stats(&store);
            println!("Records:             {}", s.records);
            println!("Missing title:       {}", s.missing_title);
            println!("Missing opcode:      {}", s.missing_opcode);
            println!("Missing description: {}", s.missing_description);
            println!("Missing operation:   {}", s.missing_operation);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
