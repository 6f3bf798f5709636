use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use codescreen::config::Config;
use codescreen::llm::{HttpTransport, InvocationClient};
use codescreen::optimizer::{self, Mode};
use codescreen::screening::model::{ReportStatus, ScreeningOptions};
use codescreen::screening::Screener;
use codescreen::{input, language};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(
    name = "codescreen",
    about = "First-tier screening of source files for code-quality analysis",
    version
)]
struct Cli {
    /// Config file (defaults to ~/.config/codescreen/config.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Screen a JSON batch or every file under a directory
    Screen(ScreenArgs),
    /// Print the compressed form of one file
    Optimize(OptimizeArgs),
    /// Print the effective configuration as TOML
    Config,
}

#[derive(Args, Debug)]
struct ScreenArgs {
    /// JSON batch file or directory
    input: PathBuf,
    #[arg(long, default_value = "local")]
    analysis_id: String,
    /// Defaults to a fresh UUID
    #[arg(long)]
    session_id: Option<String>,
    /// Skip the classifier and use extension-based verdicts
    #[arg(long)]
    offline: bool,
    /// Write the report here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
    #[arg(long)]
    compact: bool,
}

#[derive(Args, Debug)]
struct OptimizeArgs {
    file: PathBuf,
    #[arg(long, value_enum, default_value_t = OptimizeMode::Screening)]
    mode: OptimizeMode,
    /// Overrides the language guessed from the extension
    #[arg(long)]
    language: Option<String>,
    /// Issue type for suggestion mode
    #[arg(long, default_value = "general")]
    issue_type: String,
    /// 1-based inclusive line range of the issue, e.g. 10-24 (suggestion mode)
    #[arg(long)]
    lines: Option<String>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OptimizeMode {
    Screening,
    Detection,
    Suggestion,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,codescreen=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    match cli.command {
        Commands::Screen(args) => run_screen(args, &config).await,
        Commands::Optimize(args) => run_optimize(args),
        Commands::Config => {
            let text = toml::to_string_pretty(&config).context("Failed to serialize config")?;
            print!("{}", text);
            Ok(())
        }
    }
}

async fn run_screen(args: ScreenArgs, config: &Config) -> Result<()> {
    let session_id = args
        .session_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let mut request = input::load_request(&args.input, &args.analysis_id, &session_id)?;
    if args.offline {
        request
            .options
            .get_or_insert_with(ScreeningOptions::default)
            .enable_classifier = false;
    }

    let transport = HttpTransport::new(
        &config.model.base_url(),
        Duration::from_secs(config.model.request_timeout_secs),
    )?;
    let screener = Screener::new(InvocationClient::new(transport, config), config);
    let report = screener.screen(&request).await;

    let json = if args.compact {
        serde_json::to_string(&report)?
    } else {
        serde_json::to_string_pretty(&report)?
    };
    match &args.output {
        Some(path) => fs::write(path, json)
            .with_context(|| format!("Failed to write report {}", path.display()))?,
        None => println!("{}", json),
    }

    if report.status == ReportStatus::Error {
        std::process::exit(1);
    }
    Ok(())
}

fn run_optimize(args: OptimizeArgs) -> Result<()> {
    let content = read_source(&args.file)?;
    let path = args.file.to_string_lossy();
    let language = args
        .language
        .map(|l| l.to_lowercase())
        .unwrap_or_else(|| language::from_path(&path).to_string());

    let output = match args.mode {
        OptimizeMode::Screening => optimizer::optimize(&content, &language, Mode::Screening),
        OptimizeMode::Detection => optimizer::optimize(&content, &language, Mode::Detection),
        OptimizeMode::Suggestion => {
            let issue_code = match &args.lines {
                Some(range) => select_lines(&content, range)?,
                None => content.clone(),
            };
            let context =
                optimizer::suggestion_context(&issue_code, &content, &language, &args.issue_type);
            serde_json::to_string_pretty(&context)?
        }
    };
    println!("{}", output);
    Ok(())
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn select_lines(content: &str, range: &str) -> Result<String> {
    let (start, end) = range
        .split_once('-')
        .ok_or_else(|| anyhow!("Line range must look like START-END, got {}", range))?;
    let start: usize = start.trim().parse().context("Invalid range start")?;
    let end: usize = end.trim().parse().context("Invalid range end")?;
    if start == 0 || end < start {
        return Err(anyhow!("Invalid line range {}", range));
    }
    Ok(content
        .lines()
        .skip(start - 1)
        .take(end - start + 1)
        .collect::<Vec<_>>()
        .join("\n"))
}
