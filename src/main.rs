use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use rundown_core::audit::{run_audit, AuditConfig};
use rundown_core::logging::{init_tracing, LogLevel};
use rundown_core::validate::validate_level;
use rundown_core::{
    build_rundown, Bulkhead, Complex, GenerationConfig, GenerationContext, LevelRequest, Tier,
};

#[derive(Parser, Debug)]
#[command(name = "rundown-gen", version, about = "Seeded rundown generator")]
struct Cli {
    /// RON or JSON generation config
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the config's seed
    #[arg(short, long, global = true)]
    seed: Option<String>,

    /// -v info, -vv debug, -vvv trace
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Write JSON here instead of stdout
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the whole rundown the config describes
    Rundown,
    /// Build a single level
    Level {
        #[arg(short, long, default_value = "C")]
        tier: String,
        #[arg(long, default_value_t = 1)]
        index: u32,
        #[arg(long)]
        extreme: bool,
        #[arg(long)]
        overload: bool,
    },
    /// Monte-Carlo audit over many seeds
    Audit {
        #[arg(short, long, default_value_t = 200)]
        runs: u32,
    },
}

fn load_config(cli: &Cli) -> Result<GenerationConfig> {
    let mut config = match &cli.config {
        Some(path) => GenerationConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => GenerationConfig::default(),
    };
    if let Some(seed) = &cli.seed {
        config = config.with_seed(seed);
    }
    if cli.verbose > 0 {
        config.logging = config.logging.with_level(LogLevel::from_verbosity(cli.verbose));
    }
    config.validate()?;
    Ok(config)
}

fn emit(cli: &Cli, json: String) -> Result<()> {
    match &cli.output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            info!(path = %path.display(), "output written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_tracing(&config.logging);

    match &cli.command {
        Command::Rundown => {
            let rundown = build_rundown(&config);
            emit(&cli, serde_json::to_string_pretty(&rundown)?)?;
            if !rundown.failures.is_empty() {
                bail!("{} level(s) failed to build", rundown.failures.len());
            }
        }
        Command::Level {
            tier,
            index,
            extreme,
            overload,
        } => {
            let tier = Tier::from_label(tier).with_context(|| format!("unknown tier {tier:?}"))?;
            let mut bulkheads = Vec::new();
            if *extreme {
                bulkheads.push(Bulkhead::Extreme);
            }
            if *overload {
                bulkheads.push(Bulkhead::Overload);
            }
            let mut ctx = GenerationContext::new(config);
            let complex = Complex::roll(ctx.rng());
            let request = LevelRequest::new(tier, *index, complex).with_bulkheads(&bulkheads);
            let level = ctx.build_level(&request)?;
            let violations = validate_level(&level);
            emit(&cli, serde_json::to_string_pretty(&level)?)?;
            if !violations.is_empty() {
                bail!("level {} failed validation: {:?}", level.label(), violations);
            }
        }
        Command::Audit { runs } => {
            let audit = AuditConfig {
                base_seed: config.seed.clone(),
                runs: *runs,
                generation: config,
            };
            let report = run_audit(&audit);
            emit(&cli, serde_json::to_string_pretty(&report)?)?;
        }
    }
    Ok(())
}
