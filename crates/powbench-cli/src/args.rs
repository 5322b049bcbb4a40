//! Command-line parsing.

use anyhow::{anyhow, bail, Result};
use powbench_core::{BatchRequest, HashAlgorithm, SeedSource};

pub const DEFAULT_COUNT: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct RunArgs {
    pub seeds: SeedSource,
    pub difficulty: i64,
    pub algorithm: HashAlgorithm,
    /// Print the final snapshot as JSON instead of tables.
    pub json: bool,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            seeds: SeedSource::Auto { count: DEFAULT_COUNT },
            difficulty: 1,
            algorithm: HashAlgorithm::default(),
            json: false,
        }
    }
}

impl RunArgs {
    pub fn to_request(&self) -> powbench_core::Result<BatchRequest> {
        BatchRequest::new(self.seeds.generate(), self.difficulty, self.algorithm)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Run(RunArgs),
    Health,
    Help,
}

fn value<'a>(flag: &str, it: &mut impl Iterator<Item = &'a String>) -> Result<&'a String> {
    it.next().ok_or_else(|| anyhow!("{} requires a value", flag))
}

/// Parse everything after the program name.
pub fn parse(args: &[String]) -> Result<Command> {
    let Some(command) = args.first() else {
        return Ok(Command::Help);
    };

    match command.as_str() {
        "run" => {
            let mut run = RunArgs::default();
            let mut manual: Vec<String> = Vec::new();
            let mut it = args[1..].iter();
            while let Some(flag) = it.next() {
                match flag.as_str() {
                    "--count" | "-n" => {
                        let raw = value(flag, &mut it)?;
                        let count: usize = raw
                            .parse()
                            .map_err(|_| anyhow!("--count expects a positive number, got '{}'", raw))?;
                        run.seeds = SeedSource::Auto { count };
                    }
                    "--difficulty" | "-d" => {
                        let raw = value(flag, &mut it)?;
                        run.difficulty = raw
                            .parse()
                            .map_err(|_| anyhow!("--difficulty expects a number, got '{}'", raw))?;
                    }
                    "--algorithm" | "-a" => {
                        run.algorithm = HashAlgorithm::normalize(value(flag, &mut it)?);
                    }
                    "--seed" | "-s" => manual.push(value(flag, &mut it)?.clone()),
                    "--json" => run.json = true,
                    other => bail!("Unknown option for run: {}", other),
                }
            }
            if !manual.is_empty() {
                run.seeds = SeedSource::Manual { seeds: manual };
            }
            Ok(Command::Run(run))
        }
        "health" => Ok(Command::Health),
        "--help" | "-h" | "help" => Ok(Command::Help),
        other => bail!("Unknown command: {}. Use 'powbench help' for usage.", other),
    }
}

pub fn print_help() {
    println!("PowBench - sync vs async proof-of-work batch runner");
    println!();
    println!("Usage: powbench <command> [options]");
    println!();
    println!("Commands:");
    println!("  run                      Run one batch through both strategies");
    println!("  health                   Check the backend once");
    println!("  help                     Show this help message");
    println!();
    println!("Run options:");
    println!("  -n, --count <N>          Number of generated seeds (default {})", DEFAULT_COUNT);
    println!("  -s, --seed <SEED>        Use this seed; repeat for more (overrides --count)");
    println!("  -d, --difficulty <D>     Work multiplier, at least 1 (default 1)");
    println!(
        "  -a, --algorithm <A>      One of: {}",
        HashAlgorithm::all().iter().map(|a| a.name()).collect::<Vec<_>>().join(", ")
    );
    println!("      --json               Print the final snapshot as JSON");
    println!();
    println!("Environment:");
    println!("  POWBENCH_API_BASE              Backend base URL (default http://localhost:8000)");
    println!("  POWBENCH_REQUEST_TIMEOUT_SECS  Per-request timeout (default 120)");
    println!("  RUST_LOG                       Log filter (default info)");
}
