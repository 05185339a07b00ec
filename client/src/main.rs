//! Blackjack client - finds a table over UDP and plays rounds over TCP

mod config;
mod discovery;
mod output;
mod session;
mod strategy;

use anyhow::{Context, Result};
use clap::Parser;
use output::Statistics;
use session::SessionDriver;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines, Stdin};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "blackjack-client")]
#[command(author = "Florian Schüller <schuellerf@gmail.com>")]
#[command(version)]
#[command(about = "Blackjack client - discovers a server and plays a session", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "client.conf")]
    config: PathBuf,

    /// Player name sent to the server (overrides the config file)
    #[arg(short, long)]
    name: Option<String>,

    /// Play one session of this many rounds and exit
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..))]
    rounds: Option<u8>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (mut config, source) = config::Config::load(&args.config)?;
    if let Some(name) = args.name {
        config.general.client_name = name;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!("Blackjack client v{}", env!("CARGO_PKG_VERSION"));
    match source {
        config::ConfigSource::File => info!("Loaded configuration from {:?}", args.config),
        config::ConfigSource::Defaults => {
            info!("No config file at {:?}, using defaults", args.config)
        }
    }

    let strategy = strategy::from_config(&config.strategy);
    let mut driver = SessionDriver::new(config, strategy);

    if let Some(rounds) = args.rounds {
        let stats = driver
            .run_session(rounds)
            .await
            .context("Session failed")?;
        output::statistics("Session", &stats);
        return Ok(());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut overall = Statistics::default();

    while let Some(rounds) = prompt_rounds(&mut lines).await? {
        match driver.run_session(rounds).await {
            Ok(stats) => {
                overall.merge(&stats);
                output::statistics("Session", &stats);
                output::statistics("Overall", &overall);
            }
            Err(e) => error!("Session aborted: {}", e),
        }
    }

    info!("Goodbye");
    Ok(())
}

/// Ask for a round count. `None` on 0 or end of input.
async fn prompt_rounds(lines: &mut Lines<BufReader<Stdin>>) -> Result<Option<u8>> {
    let mut stdout = tokio::io::stdout();
    loop {
        stdout
            .write_all(b"How many rounds would you like to play? (1-255, 0 to quit): ")
            .await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            return Ok(None);
        };
        match line.trim().parse::<u8>() {
            Ok(0) => return Ok(None),
            Ok(rounds) => return Ok(Some(rounds)),
            Err(_) => println!("Please enter a number between 0 and 255"),
        }
    }
}
