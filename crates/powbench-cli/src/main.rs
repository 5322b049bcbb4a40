//! PowBench: run a proof-of-work batch through the sync and async paths.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod args;
mod render;

use args::{Command, RunArgs};
use powbench_runtime::Engine;

const PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

async fn run_batch(engine: &Engine, run_args: &RunArgs) -> anyhow::Result<bool> {
    let request = run_args.to_request()?;
    info!("Backend: {}", engine.endpoint());

    let shutdown = CancellationToken::new();
    let liveness = engine.start_liveness(shutdown.clone());

    let run = match engine.start_batch(request).await {
        Ok(run) => run,
        Err(e) => {
            stop_liveness(&shutdown, liveness).await;
            return Err(e.into());
        }
    };
    if !run_args.json {
        println!("{}", render::processing_details(run.request()));
    }

    let mut ticker = tokio::time::interval(PROGRESS_INTERVAL);
    let interrupted = loop {
        tokio::select! {
            _ = run.finished() => break false,
            _ = tokio::signal::ctrl_c() => {
                warn!("Interrupted; cancelling batch {}", run.id());
                break true;
            }
            _ = ticker.tick() => {
                if !run_args.json {
                    println!("{}", render::progress_line(&run.snapshot()));
                }
            }
        }
    };

    engine.teardown().await;
    stop_liveness(&shutdown, liveness).await;

    let snapshot = run.snapshot();
    if run_args.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        println!();
        print!("{}", render::report(&snapshot));
    }
    Ok(!interrupted && snapshot.error.is_none())
}

/// Cancel the liveness monitor and wait for it. Returns whether it ended cleanly.
async fn stop_liveness(shutdown: &CancellationToken, liveness: JoinHandle<()>) -> bool {
    shutdown.cancel();
    match liveness.await {
        Ok(()) => true,
        Err(e) => {
            error!("Liveness task ended abnormally: {}", e);
            false
        }
    }
}

async fn check_health(engine: &Engine) -> bool {
    let online = engine.monitor().check().await;
    println!("{}", render::health_line(engine.endpoint(), &engine.health().snapshot()));
    online
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let command = match args::parse(&argv) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    if command == Command::Help {
        args::print_help();
        return Ok(());
    }

    let config = powbench_core::PowBenchConfig::from_env()?;
    let engine = Engine::from_config(config)?;

    let ok = match command {
        Command::Run(run_args) => run_batch(&engine, &run_args).await?,
        Command::Health => check_health(&engine).await,
        Command::Help => true,
    };
    if !ok {
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_stop_liveness_waits_for_monitor() {
        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let liveness = tokio::spawn(async move { token.cancelled().await });

        assert!(stop_liveness(&shutdown, liveness).await);
    }

    #[tokio::test]
    async fn test_stop_liveness_reports_crashed_monitor() {
        let shutdown = CancellationToken::new();
        let liveness = tokio::spawn(async { panic!("monitor crashed") });

        assert!(!stop_liveness(&shutdown, liveness).await);
        assert!(shutdown.is_cancelled());
    }
}
