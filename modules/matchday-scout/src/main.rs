use std::process::ExitCode;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;

use matchday_common::{AnalyzeResponse, Config};
use matchday_scout::{narrative, Pipeline, SnapshotSource};

#[derive(Parser)]
#[command(name = "matchday-scout", about = "Fixture snapshot and generated match commentary")]
struct Cli {
    /// Home team name
    #[arg(long)]
    home: String,

    /// Away team name
    #[arg(long)]
    away: String,

    /// Overall time limit in seconds (overrides REQUEST_DEADLINE_SECS)
    #[arg(long)]
    deadline_secs: Option<u64>,

    /// Print the snapshot and rendered prompt without calling any backend
    #[arg(long)]
    no_commentary: bool,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = EnvFilter::from_default_env().add_directive("matchday=info".parse()?);
    let logs = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if cli.log_json {
        logs.json().init();
    } else {
        logs.init();
    }

    info!("Matchday scout starting...");

    let mut config = Config::from_env()?;
    if let Some(secs) = cli.deadline_secs {
        config.timeouts.request_deadline = Some(Duration::from_secs(secs));
    }
    let pipeline = Pipeline::from_config(&config).await?;

    if cli.no_commentary {
        return match pipeline.snapshot(&cli.home, &cli.away).await {
            Ok(assembled) => {
                let prompt = narrative::render(&assembled.snapshot);
                let body = json!({
                    "matchData": assembled.snapshot,
                    "source": match assembled.source {
                        SnapshotSource::Cache => "cache",
                        SnapshotSource::Fresh => "fresh",
                    },
                    "prompt": prompt,
                });
                println!("{}", serde_json::to_string_pretty(&body)?);
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => {
                let (status, body) = AnalyzeResponse::from_result(Err(e));
                println!("{}", serde_json::to_string_pretty(&body)?);
                Ok(exit_code(status))
            }
        };
    }

    let (status, body) =
        AnalyzeResponse::from_result(pipeline.analyze(&cli.home, &cli.away).await);
    println!("{}", serde_json::to_string_pretty(&body)?);
    info!(status, "Done");

    Ok(exit_code(status))
}

fn exit_code(status: u16) -> ExitCode {
    match status {
        200 => ExitCode::SUCCESS,
        400..=499 => ExitCode::from(2),
        _ => ExitCode::FAILURE,
    }
}
