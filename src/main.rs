use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use session_driver::EngineProfile;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use wizard_runner::{
    init_logging, ExecutionResult, LogFormat, RequestCheck, RunnerConfig, UserData, WizardInfo,
    WizardService, WizardSummary,
};

/// Wizard Runner - contract-first execution of multi-page web wizards
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Log line format
    #[arg(long, value_enum, default_value = "human")]
    log_format: LogFormat,

    /// Output format
    #[arg(short, long, value_enum, default_value = "human")]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum OutputFormat {
    Human,
    Json,
    Yaml,
}

#[derive(Subcommand)]
enum Commands {
    /// List available wizards
    List,

    /// Show a wizard's data contract and an example payload
    Info(InfoArgs),

    /// Check user data against a wizard without opening a browser
    Validate(DataArgs),

    /// Execute a wizard with the given user data
    Execute(ExecuteArgs),

    /// Show build information
    Version,
}

#[derive(Args)]
struct InfoArgs {
    wizard_id: String,
}

#[derive(Args)]
struct DataArgs {
    wizard_id: String,

    /// JSON object with the user data, `-` reads stdin
    #[arg(short, long, value_name = "FILE")]
    data: PathBuf,
}

#[derive(Args)]
struct ExecuteArgs {
    #[command(flatten)]
    request: DataArgs,

    /// Show the browser window
    #[arg(long)]
    headful: bool,

    /// Browsing-engine identity announced to the site
    #[arg(long, value_name = "PROFILE")]
    engine_profile: Option<EngineProfile>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let logging =
        init_logging(&cli.log_level, cli.log_format).context("Failed to initialise logging")?;
    let config = RunnerConfig::load(cli.config.as_deref())
        .await
        .context("Failed to load configuration")?;
    let _log_guard = logging
        .attach_files(&config.logging)
        .context("Failed to open log directory")?;

    info!("Starting wizard-runner v{}", env!("CARGO_PKG_VERSION"));

    let result = match cli.command {
        Commands::List => cmd_list(&config, cli.output).await,
        Commands::Info(args) => cmd_info(args, &config, cli.output).await,
        Commands::Validate(args) => cmd_validate(args, &config, cli.output).await,
        Commands::Execute(args) => cmd_execute(args, config, cli.output).await,
        Commands::Version => {
            cmd_version();
            Ok(())
        }
    };

    match result {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Command failed: {:#}", e);
            std::process::exit(1);
        }
    }
}

async fn cmd_list(config: &RunnerConfig, output: OutputFormat) -> Result<()> {
    let service = WizardService::from_config(config);
    let wizards = service.list_wizards().await;
    emit(&wizards, output, print_summaries)
}

async fn cmd_info(args: InfoArgs, config: &RunnerConfig, output: OutputFormat) -> Result<()> {
    let service = WizardService::from_config(config);
    let info = service.get_wizard_info(&args.wizard_id).await?;
    emit(&info, output, print_info)
}

async fn cmd_validate(args: DataArgs, config: &RunnerConfig, output: OutputFormat) -> Result<()> {
    let user_data = read_user_data(&args.data).await?;
    let service = WizardService::from_config(config);
    let check = service
        .validate_request(&args.wizard_id, &user_data)
        .await?;
    emit(&check, output, print_check)?;
    if !check.ready {
        bail!("request for '{}' would be rejected", args.wizard_id);
    }
    Ok(())
}

async fn cmd_execute(args: ExecuteArgs, mut config: RunnerConfig, output: OutputFormat) -> Result<()> {
    if args.headful {
        config.session.headless = false;
    }
    if let Some(profile) = args.engine_profile {
        config.session.engine_profile = profile;
    }

    let user_data = read_user_data(&args.request.data).await?;
    let service = WizardService::from_config(&config);

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, cancelling run and closing the session");
                cancel.cancel();
            }
        })
    };

    let outcome = service
        .execute_wizard_with_cancel(&args.request.wizard_id, &user_data, cancel)
        .await;
    interrupt.abort();

    let result = outcome?;
    emit(&result, output, print_result)?;
    if !result.success {
        bail!(
            "run {} for '{}' ended as {:?}",
            result.run_id,
            result.wizard_id,
            result.status
        );
    }
    Ok(())
}

fn cmd_version() {
    println!("wizard-runner {}", env!("CARGO_PKG_VERSION"));
    println!("commit:  {} ({})", env!("GIT_HASH"), env!("GIT_BRANCH"));
    println!("built:   {}", env!("BUILD_DATE"));
}

async fn read_user_data(source: &Path) -> Result<UserData> {
    let raw = if source.as_os_str() == "-" {
        let mut raw = String::new();
        tokio::io::stdin()
            .read_to_string(&mut raw)
            .await
            .context("Failed to read user data from stdin")?;
        raw
    } else {
        tokio::fs::read_to_string(source)
            .await
            .with_context(|| format!("Failed to read user data from {}", source.display()))?
    };

    match serde_json::from_str::<serde_json::Value>(&raw).context("User data is not valid JSON")? {
        serde_json::Value::Object(map) => Ok(map),
        other => bail!("User data must be a JSON object, got {}", json_kind(&other)),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

fn emit<T: Serialize>(value: &T, output: OutputFormat, human: fn(&T)) -> Result<()> {
    match output {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(value)?);
        }
        OutputFormat::Human => human(value),
    }
    Ok(())
}

#[allow(clippy::ptr_arg)]
fn print_summaries(wizards: &Vec<WizardSummary>) {
    if wizards.is_empty() {
        println!("No wizards found");
        return;
    }
    for wizard in wizards {
        let discovered = wizard
            .discovered_at
            .map(|at| at.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<28} pages={:<3} discovered={}  {}",
            wizard.wizard_id, wizard.total_pages, discovered, wizard.name
        );
    }
}

fn print_info(info: &WizardInfo) {
    println!("{} ({})", info.name, info.wizard_id);
    println!("url:   {}", info.url);
    println!("pages: {}", info.page_count);
    println!("fields:");
    for (name, schema) in &info.contract.properties {
        let required = if info.contract.is_required(name) {
            "required"
        } else {
            "optional"
        };
        let kind = schema
            .value_type
            .map(|value_type| value_type.as_str())
            .unwrap_or("any");
        let description = schema.description.as_deref().unwrap_or("");
        println!("  {:<24} {:<8} {:<9} {}", name, kind, required, description);
    }
    if let Ok(example) = serde_json::to_string_pretty(&info.example_user_data) {
        println!("example user_data:");
        println!("{}", example);
    }
}

fn print_check(check: &RequestCheck) {
    if check.ready {
        println!("'{}' is ready to execute", check.wizard_id);
        for page in &check.pages {
            println!(
                "  page {:<3} {:<32} actions={}",
                page.page_number, page.page_title, page.actions
            );
        }
        return;
    }
    println!("'{}' would be rejected", check.wizard_id);
    if let Some(failure) = &check.error {
        println!("  {:?}: {}", failure.kind, failure.message);
        for violation in &failure.violations {
            println!("  - {}", violation);
        }
        for fault in &failure.drift_faults {
            println!("  - {}", fault);
        }
    }
}

fn print_result(result: &ExecutionResult) {
    println!(
        "run {} {:?} in {} ms (pages completed: {}, furthest page: {})",
        result.run_id,
        result.status,
        result.elapsed_ms,
        result.pages_completed,
        result.furthest_page
    );
    for (name, value) in &result.outputs {
        println!("  {} = {}", name, value);
    }
    for evidence in &result.evidence {
        let location = evidence
            .saved_to
            .as_ref()
            .map(|path| format!(" saved={}", path.display()))
            .unwrap_or_default();
        println!("  evidence {} bytes={}{}", evidence.label, evidence.byte_len, location);
    }
    if let Some(failure) = &result.error {
        println!("  {:?}: {}", failure.kind, failure.message);
        if let Some(page) = failure.page_number {
            println!("    page:     {}", page);
        }
        if let Some(field) = &failure.field_id {
            println!("    field:    {}", field);
        }
        if let Some(selector) = &failure.selector {
            println!("    selector: {}", selector);
        }
        for violation in &failure.violations {
            println!("    - {}", violation);
        }
        for fault in &failure.drift_faults {
            println!("    - {}", fault);
        }
    }
}
