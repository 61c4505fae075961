use anyhow::{Context, Result, bail};
use pawfect_gate::application::services::limits_for_plan;
use pawfect_gate::infrastructure::LoggingUpgradePrompt;
use pawfect_gate::{AppConfig, AppState, FeatureId, PlanTier, UpgradeHooks, init_logging};
use std::env;
use std::str::FromStr;
use std::sync::Arc;
use tokio::runtime::Runtime;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Overview,
    Check(String),
    Limits,
    PlanTable(PlanTier),
}

#[derive(Debug, Clone)]
struct CliOptions {
    command: Command,
    pretty: bool,
    base_url: Option<String>,
    database_url: Option<String>,
}

fn usage() -> &'static str {
    "Usage: entitlement_probe [--check <feature>] [--limits] [--plan <free|premium|ultimate>] [--pretty] [--base-url <url>] [--database-url <url>]"
}

fn main() -> Result<()> {
    init_logging();

    let args: Vec<String> = env::args().skip(1).collect();
    let options = parse_args(args)?;

    if let Command::PlanTable(plan) = options.command {
        let payload = to_json(&limits_for_plan(plan), options.pretty)?;
        println!("{payload}");
        return Ok(());
    }

    let mut config = AppConfig::from_env();
    if let Some(url) = &options.base_url {
        config.authority.base_url = url.clone();
    }
    if let Some(url) = &options.database_url {
        config.storage.database_url = Some(url.clone());
    }

    let rt = Runtime::new().context("Failed to create Tokio runtime")?;
    rt.block_on(run(config, &options))
}

async fn run(config: AppConfig, options: &CliOptions) -> Result<()> {
    let prompt = Arc::new(LoggingUpgradePrompt);
    let hooks = UpgradeHooks {
        presenter: prompt.clone(),
        navigator: prompt,
        navigation_delay: config.gate.upgrade_navigation_delay(),
    };
    let state = AppState::from_config(config, hooks).await?;

    let payload = match &options.command {
        Command::Overview => to_json(&state.gate.overview().await, options.pretty)?,
        Command::Check(feature) => {
            to_json(&state.gate.check_access_str(feature).await, options.pretty)?
        }
        Command::Limits => to_json(&state.gate.current_limits().await, options.pretty)?,
        Command::PlanTable(plan) => to_json(&limits_for_plan(*plan), options.pretty)?,
    };
    println!("{payload}");

    state.shutdown().await;
    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<String> {
    if pretty {
        Ok(serde_json::to_string_pretty(value)?)
    } else {
        Ok(serde_json::to_string(value)?)
    }
}

fn parse_args<I>(args: I) -> Result<CliOptions>
where
    I: IntoIterator<Item = String>,
{
    let mut command = Command::Overview;
    let mut pretty = false;
    let mut base_url: Option<String> = None;
    let mut database_url: Option<String> = None;

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--check" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--check requires a feature\n{}", usage()))?;
                if FeatureId::from_str(&value).is_err() {
                    tracing::warn!(feature = %value, "unknown feature, decision will fail closed");
                }
                command = Command::Check(value);
            }
            "--limits" => {
                command = Command::Limits;
            }
            "--plan" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--plan requires a value\n{}", usage()))?;
                command = Command::PlanTable(parse_plan(&value)?);
            }
            "--pretty" => {
                pretty = true;
            }
            "--base-url" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--base-url requires a value\n{}", usage()))?;
                base_url = Some(value);
            }
            "--database-url" => {
                let value = iter.next().ok_or_else(|| {
                    anyhow::anyhow!("--database-url requires a value\n{}", usage())
                })?;
                database_url = Some(value);
            }
            "-h" | "--help" => {
                println!("{}", usage());
                std::process::exit(0);
            }
            other => {
                bail!("Unknown argument: {other}\n{}", usage());
            }
        }
    }

    Ok(CliOptions {
        command,
        pretty,
        base_url,
        database_url,
    })
}

fn parse_plan(value: &str) -> Result<PlanTier> {
    match value.to_ascii_lowercase().as_str() {
        "free" => Ok(PlanTier::Free),
        "premium" => Ok(PlanTier::Premium),
        "ultimate" => Ok(PlanTier::Ultimate),
        other => bail!("Unknown plan: {other}. Expected 'free', 'premium' or 'ultimate'."),
    }
}
