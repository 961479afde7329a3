#![deny(warnings)]

//! Headless CLI for profit planning, channel comparison and rule previews.

mod preview;
mod report;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use plan_config::{load_inputs, resolve_config, PlannerConfig};
use plan_core::{ChannelId, FunnelPlanId};
use plan_rules::MetricSnapshot;
use rust_decimal::Decimal;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_SHA"),
    " ",
    env!("BUILD_DATE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "adplan", version = VERSION, about = "Profit and ad-budget planner")]
struct Cli {
    /// Config file (fee profiles, funnel plans, rules). Falls back to $ADPLAN_CONFIG.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Print JSON instead of a table.
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve targets, size the budget and split it over the funnel.
    Plan {
        #[arg(long)]
        inputs: PathBuf,
    },
    /// Run the plan once per sales channel.
    Compare {
        #[arg(long)]
        inputs: PathBuf,
        /// Restrict to these channel ids.
        #[arg(long, value_delimiter = ',')]
        channels: Vec<String>,
    },
    /// Split a fixed budget over funnel stages and accounts.
    Allocate {
        #[arg(long)]
        budget: Decimal,
        #[arg(long, default_value = "balanced")]
        plan: String,
        #[arg(long, default_value_t = 1)]
        accounts: u32,
    },
    /// Dry-run the configured automation rules.
    Rules {
        /// Metric readings, e.g. CPA=250,ROAS=1.8
        #[arg(long)]
        snapshot: Option<MetricSnapshot>,
        /// Synthesize readings near each threshold from this seed.
        #[arg(long, conflicts_with = "snapshot")]
        preview_seed: Option<u64>,
    },
    /// Print the effective configuration.
    Config,
}

fn emit<T: Serialize>(json: bool, value: &T, text: impl FnOnce() -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print!("{}", text());
    }
    Ok(())
}

fn read_inputs(path: &Path) -> Result<plan_core::PlanInputs> {
    load_inputs(path).with_context(|| format!("loading inputs from {}", path.display()))
}

fn run(cli: Cli, cfg: PlannerConfig) -> Result<()> {
    match cli.command {
        Command::Plan { inputs } => {
            let inputs = read_inputs(&inputs)?;
            let outcome = plan_econ::run_pipeline(&inputs, &cfg.funnel_plans)?;
            emit(cli.json, &outcome, || report::plan(&inputs, &outcome))
        }
        Command::Compare { inputs, channels } => {
            let inputs = read_inputs(&inputs)?;
            let cmp = if channels.is_empty() {
                plan_econ::compare_across_channels(
                    &inputs,
                    &cfg.fee_profiles,
                    &cfg.funnel_plans,
                )?
            } else {
                let ids: Vec<ChannelId> = channels.into_iter().map(ChannelId).collect();
                plan_econ::compare_selected(
                    &inputs,
                    &cfg.fee_profiles,
                    &ids,
                    &cfg.funnel_plans,
                )?
            };
            emit(cli.json, &cmp, || report::comparison(&cmp))
        }
        Command::Allocate {
            budget,
            plan,
            accounts,
        } => {
            let alloc =
                plan_econ::allocate(budget, &FunnelPlanId(plan), accounts, &cfg.funnel_plans)?;
            emit(cli.json, &alloc, || report::allocation(&alloc))
        }
        Command::Rules {
            snapshot,
            preview_seed,
        } => {
            if cfg.rules.is_empty() {
                bail!("no automation rules configured");
            }
            let results = match (snapshot, preview_seed) {
                (Some(snap), _) => plan_rules::dry_run(&cfg.rules, &snap)?.results,
                (None, Some(seed)) => preview::evaluate_with_seed(&cfg.rules, seed)?,
                (None, None) => bail!("pass --snapshot or --preview-seed"),
            };
            emit(cli.json, &results, || report::rules(&cfg.rules, &results))
        }
        Command::Config => {
            for (idx, err) in cfg.rule_errors() {
                tracing::warn!(rule = idx, %err, "rule will fail evaluation");
            }
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&cfg)?);
            } else {
                print!("{}", cfg.to_yaml()?);
            }
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    // Logs go to stderr so stdout stays parseable.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    info!(command = ?cli.command, "starting adplan");
    let cfg = resolve_config(cli.config.as_deref())?;
    run(cli, cfg)
}
