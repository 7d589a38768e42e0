use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use redgreen_core::roles::{Implementer, Refactorer, Tester};
use redgreen_core::{RunOutcome, Supervisor};
use redgreen_git::SnapshotStore;
use redgreen_llm::{LlmClient, OpenAiClient, Provider};
use redgreen_logging::{LogFormat, Logger, SessionWriter};
use redgreen_runner::{create_runner, Language, ProjectRunner};

mod config;
use config::{resolve_api_key, ProjectConfig, RoleConfig};

const DEFAULT_MODEL: &str = "gpt-4.1-mini";

#[derive(Parser, Debug)]
#[command(
    name = "redgreen",
    about = "Multi-agent TDD loop: red, green, refactor, commit",
    version
)]
struct Cli {
    /// Path to the kata markdown file containing the rules
    kata: PathBuf,

    /// Generation backend provider (openai, perplexity, deepseek)
    #[arg(short, long)]
    provider: Option<String>,

    /// Model identifier, applied to every role
    #[arg(short, long)]
    model: Option<String>,

    /// API key for the provider (overrides environment variables)
    #[arg(short = 'k', long)]
    api_key: Option<String>,

    /// Working directory for the kata workspace
    #[arg(short = 'w', long, default_value = "./redgreen-kata")]
    work_dir: PathBuf,

    /// Maximum number of red-green-refactor cycles
    #[arg(long, default_value_t = 5)]
    max_cycles: usize,

    /// Maximum attempts for the implement and refactor phases
    #[arg(long, default_value_t = 5)]
    max_attempts: usize,

    /// Target language for the kata
    #[arg(short, long, default_value = "rust")]
    language: String,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty")]
    log_format: LogFormatChoice,

    /// Print the final outcome as JSON
    #[arg(long)]
    json_output: bool,

    /// Skip writing a session transcript
    #[arg(long)]
    no_session: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("REDGREEN_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let rules = std::fs::read_to_string(&cli.kata)
        .with_context(|| format!("failed to read kata rules from {}", cli.kata.display()))?;

    let invocation_dir = std::env::current_dir().context("failed to get current directory")?;
    let project_config = ProjectConfig::load(&invocation_dir)?.unwrap_or_default();

    let provider: Provider = cli
        .provider
        .clone()
        .or_else(|| project_config.provider.clone())
        .unwrap_or_else(|| "openai".to_string())
        .parse()
        .map_err(anyhow::Error::msg)?;
    let api_key = resolve_api_key(provider, cli.api_key.as_deref())?;

    let language: Language = cli.language.parse().map_err(anyhow::Error::msg)?;

    std::fs::create_dir_all(&cli.work_dir)
        .with_context(|| format!("failed to create {}", cli.work_dir.display()))?;
    let work_dir = cli
        .work_dir
        .canonicalize()
        .with_context(|| format!("failed to resolve {}", cli.work_dir.display()))?;

    let logger = Arc::new(Logger::new(cli.log_format.into()));
    let runner: Arc<dyn ProjectRunner> = Arc::from(create_runner(language, work_dir.clone()));
    let store = Arc::new(SnapshotStore::new(work_dir.clone()));

    let default_model = cli
        .model
        .clone()
        .or_else(|| project_config.model.clone())
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());

    let tester = Tester::new(
        role_client(&cli, &project_config, &project_config.tester, provider, &api_key)?,
        runner.clone(),
        store.clone(),
        logger.clone(),
        rules.clone(),
    );
    let implementer = Implementer::new(
        role_client(&cli, &project_config, &project_config.implementer, provider, &api_key)?,
        runner.clone(),
        store.clone(),
        logger.clone(),
        rules.clone(),
        cli.max_attempts,
    );
    let refactorer = Refactorer::new(
        role_client(&cli, &project_config, &project_config.refactorer, provider, &api_key)?,
        runner.clone(),
        store.clone(),
        logger.clone(),
        rules.clone(),
        cli.max_attempts,
    );

    let mut supervisor = Supervisor::new(
        tester,
        implementer,
        refactorer,
        runner,
        store,
        logger,
        cli.max_cycles,
    );

    if !cli.no_session {
        match SessionWriter::new(&rules) {
            Ok(session) => {
                session.write_start(
                    &work_dir,
                    &provider.to_string(),
                    &default_model,
                    &language.to_string(),
                    cli.max_cycles,
                    cli.max_attempts,
                );
                supervisor = supervisor.with_session(session);
            }
            Err(e) => {
                eprintln!("warning: session transcript disabled: {}", e);
            }
        }
    }

    let interrupt_handle = supervisor.interrupt_handle();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted. Finishing the current cycle...");
        interrupt_handle.store(true, Ordering::SeqCst);
    })
    .context("failed to set Ctrl+C handler")?;

    let outcome = supervisor.run().await;

    if cli.json_output {
        let json = serde_json::to_string_pretty(&outcome)?;
        println!("{}", json);
    } else {
        print_outcome(&outcome);
    }

    std::process::exit(outcome.exit_code());
}

/// Build the generation client for one role.
/// Model priority: `--model` flag > role override > global model > default.
fn role_client(
    cli: &Cli,
    project_config: &ProjectConfig,
    role: &RoleConfig,
    provider: Provider,
    api_key: &str,
) -> Result<Arc<dyn LlmClient>> {
    let model = cli
        .model
        .clone()
        .or_else(|| project_config.role_model(role).map(String::from))
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());

    let client = OpenAiClient::new(
        model,
        api_key.to_string(),
        provider.base_url().to_string(),
    )?;
    Ok(Arc::new(client))
}

fn print_outcome(outcome: &RunOutcome) {
    match outcome {
        RunOutcome::Completed {
            cycles,
            total_duration_secs,
            ..
        } => {
            eprintln!();
            eprintln!("=== DONE ===");
            eprintln!("Cycles: {}", cycles);
            eprintln!("Duration: {:.1}s", total_duration_secs);
            eprintln!("The workspace ends at its last green commit.");
        }
        RunOutcome::KataComplete {
            cycles,
            total_duration_secs,
            ..
        } => {
            eprintln!();
            eprintln!("=== KATA COMPLETE ===");
            eprintln!("Cycles: {}", cycles);
            eprintln!("Duration: {:.1}s", total_duration_secs);
        }
        RunOutcome::Failed {
            cycles,
            error,
            total_duration_secs,
            ..
        } => {
            eprintln!();
            eprintln!("=== FAILED ===");
            eprintln!("Error after {} cycle(s): {}", cycles, error);
            eprintln!("Duration: {:.1}s", total_duration_secs);
        }
        RunOutcome::Interrupted {
            cycles,
            total_duration_secs,
            ..
        } => {
            eprintln!();
            eprintln!("=== INTERRUPTED ===");
            eprintln!("Stopped after {} cycle(s)", cycles);
            eprintln!("Duration: {:.1}s", total_duration_secs);
        }
    }
}
