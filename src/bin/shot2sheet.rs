//! CLI binary for shot2sheet.
//!
//! A thin shim over the library crate: maps CLI flags and environment
//! variables to `PipelineConfig` + `Secrets`, then feeds links to the
//! pipeline one at a time and prints what each stage produced.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use shot2sheet::{
    connect, AppendReceipt, ImageSummary, PipelineConfig, Secrets, SheetRow, Stage,
    SubmissionError, SubmissionObserver, SubmissionReport, COLUMNS,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI observer using indicatif ─────────────────────────────────────────────

/// Terminal observer: one spinner per submission plus a log line per stage.
///
/// Lines go to stderr so stdout carries only the appended rows.
struct CliObserver {
    spinner: bool,
    bar: Mutex<Option<ProgressBar>>,
}

impl CliObserver {
    fn new(spinner: bool) -> Arc<Self> {
        Arc::new(Self {
            spinner,
            bar: Mutex::new(None),
        })
    }

    fn println(&self, line: String) {
        match self.bar.lock().unwrap().as_ref() {
            Some(bar) => bar.println(line),
            None => eprintln!("{line}"),
        }
    }

    fn set_message(&self, prefix: &'static str, msg: String) {
        if let Some(bar) = self.bar.lock().unwrap().as_ref() {
            bar.set_prefix(prefix);
            bar.set_message(msg);
        }
    }

    fn finish(&self) {
        if let Some(bar) = self.bar.lock().unwrap().take() {
            bar.finish_and_clear();
        }
    }
}

impl SubmissionObserver for CliObserver {
    fn on_submission_start(&self, raw_link: &str) {
        if !self.spinner {
            return;
        }
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Fetching");
        bar.set_message(raw_link.to_string());
        bar.enable_steady_tick(Duration::from_millis(80));
        *self.bar.lock().unwrap() = Some(bar);
    }

    fn on_link_resolved(&self, raw_link: &str, resolved: &str) {
        if raw_link != resolved {
            self.println(format!("  {} Link   {}", green("✓"), dim(resolved)));
        }
    }

    fn on_image_fetched(&self, url: &str, summary: &ImageSummary) {
        self.println(format!(
            "  {} Image  {}  {}",
            green("✓"),
            describe_image(summary),
            dim(url)
        ));
        self.set_message("Extracting", "waiting for model…".into());
    }

    fn on_rate_limited(&self, attempt: u32, max_attempts: u32, wait_secs: u64) {
        self.println(format!(
            "  {} Model  rate limited (attempt {attempt}/{max_attempts}), retrying in {wait_secs}s",
            yellow("⚠")
        ));
        self.set_message("Waiting", format!("quota window, attempt {}/{}", attempt + 1, max_attempts));
    }

    fn on_extraction_complete(&self, text: &str) {
        self.println(format!("  {} Model  {}", green("✓"), text));
        self.set_message("Appending", "writing row…".into());
    }

    fn on_row_appended(&self, _row: &SheetRow, receipt: &AppendReceipt) {
        let range = receipt.updated_range.as_deref().unwrap_or("(range not reported)");
        self.println(format!("  {} Sheet  {}", green("✓"), dim(range)));
        self.finish();
    }

    fn on_stage_error(&self, stage: Stage, message: String) {
        self.println(format!("  {} {:<6} {}", red("✗"), capitalize(stage), red(&message)));
        self.finish();
    }
}

fn describe_image(summary: &ImageSummary) -> String {
    let dims = match summary.dimensions {
        Some((w, h)) => format!("{w}×{h}"),
        None => "?×?".into(),
    };
    format!(
        "{}  {}  {}",
        summary.mime_type,
        dims,
        dim(&format!("{:.1} KiB", summary.byte_len as f64 / 1024.0))
    )
}

fn capitalize(stage: Stage) -> String {
    let s = stage.to_string();
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => s,
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Interactive: paste one link per line, Ctrl-D to quit
  shot2sheet

  # Submit links given on the command line
  shot2sheet https://example.com/chat.png "https://drive.google.com/file/d/1AbC/view"

  # Another worksheet, JSON report per submission
  shot2sheet --worksheet Leads --json https://example.com/chat.png

  # Custom extraction prompt
  shot2sheet --prompt prompt.txt https://example.com/chat.png

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (default provider)
  SPREADSHEET_ID          Target spreadsheet id
  GOOGLE_SERVICE_ACCOUNT  Service-account JSON key, inline or as a file path
  RUST_LOG                Override log filter

  A .env file in the working directory is loaded if present.

SETUP:
  1. Create a service account and download its JSON key.
  2. Share the spreadsheet with the service account's client_email (Editor).
  3. export GEMINI_API_KEY=... SPREADSHEET_ID=... GOOGLE_SERVICE_ACCOUNT=key.json
"#;

/// Extract contact details from chat screenshots into a Google Sheet.
#[derive(Parser, Debug)]
#[command(
    name = "shot2sheet",
    version,
    about = "Extract contact details from chat screenshots into a Google Sheet",
    long_about = "Download a chat screenshot from a public link (Google Drive share links \
are rewritten to direct downloads), read the customer's name, phone, center and source app \
with a Vision Language Model, and append them as one row to a Google Sheet.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Public image links. Without any, links are read interactively from stdin.
    links: Vec<String>,

    /// Target spreadsheet id.
    #[arg(long, env = "SPREADSHEET_ID", hide_env_values = true)]
    spreadsheet_id: Option<String>,

    /// Service-account JSON key: the payload itself or a path to the key file.
    #[arg(long, env = "GOOGLE_SERVICE_ACCOUNT", hide_env_values = true)]
    service_account: Option<String>,

    /// Worksheet (tab) to append to.
    #[arg(long, env = "SHOT2SHEET_WORKSHEET", default_value = shot2sheet::config::DEFAULT_WORKSHEET)]
    worksheet: String,

    /// LLM provider: gemini, openai, anthropic, ollama, …
    #[arg(long, env = "SHOT2SHEET_PROVIDER", default_value = shot2sheet::config::DEFAULT_PROVIDER)]
    provider: String,

    /// Vision model ID.
    #[arg(long, env = "SHOT2SHEET_MODEL", default_value = shot2sheet::config::DEFAULT_MODEL)]
    model: String,

    /// Model calls per submission when rate-limited.
    #[arg(long, env = "SHOT2SHEET_MAX_ATTEMPTS", default_value_t = 5,
          value_parser = clap::value_parser!(u32).range(1..))]
    max_attempts: u32,

    /// Seconds to wait between rate-limited attempts.
    #[arg(long, env = "SHOT2SHEET_RETRY_DELAY", default_value_t = 60)]
    retry_delay: u64,

    /// Path to a text file containing a custom extraction prompt.
    #[arg(long, env = "SHOT2SHEET_PROMPT")]
    prompt: Option<PathBuf>,

    /// Print a JSON report per submission instead of the row.
    #[arg(long)]
    json: bool,

    /// Disable the spinner.
    #[arg(long, env = "SHOT2SHEET_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SHOT2SHEET_VERBOSE")]
    verbose: bool,

    /// Suppress all output except results and errors.
    #[arg(short, long, env = "SHOT2SHEET_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Must precede parsing so clap's `env` fallbacks see the file.
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner and stage lines already say what is happening; library
    // INFO logs would only interleave with them.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build pipeline ───────────────────────────────────────────────────
    let config = build_config(&cli).await?;
    let secrets = build_secrets(&cli)?;
    let mut pipeline = connect(&config, &secrets).context("Failed to start")?;

    if !cli.quiet && !cli.json {
        pipeline = pipeline.with_observer(CliObserver::new(show_progress));
        eprintln!(
            "{} {} → {}",
            cyan("◆"),
            bold(&format!("{}/{}", config.provider_name, config.model)),
            bold(&format!("{} ({})", secrets.spreadsheet_id, config.worksheet)),
        );
    }

    // ── Submit ───────────────────────────────────────────────────────────
    if cli.links.is_empty() {
        let stdin = BufReader::new(tokio::io::stdin());
        let mut lines = stdin.lines();
        loop {
            eprint!("{} ", bold("Paste public image URL:"));
            io::stderr().flush().ok();

            let Some(line) = lines.next_line().await.context("Failed to read stdin")? else {
                eprintln!();
                break;
            };
            if line.trim().is_empty() {
                continue;
            }
            let outcome = pipeline.submit(&line).await;
            print_outcome(&cli, &line, outcome)?;
        }
        return Ok(());
    }

    let total = cli.links.len();
    let mut succeeded = 0usize;
    for link in &cli.links {
        let outcome = pipeline.submit(link).await;
        if outcome.is_ok() {
            succeeded += 1;
        }
        print_outcome(&cli, link, outcome)?;
    }

    if total > 1 && !cli.quiet && !cli.json {
        let failed = total - succeeded;
        eprintln!(
            "{} {}/{} rows appended{}",
            if failed == 0 { green("✔") } else if succeeded == 0 { red("✘") } else { cyan("⚠") },
            bold(&succeeded.to_string()),
            total,
            if failed > 0 { format!("  ({} failed)", red(&failed.to_string())) } else { String::new() },
        );
    }

    if succeeded == 0 {
        anyhow::bail!("No rows appended: all {total} submission(s) failed");
    }
    Ok(())
}

/// Print one submission's result to stdout.
fn print_outcome(
    cli: &Cli,
    link: &str,
    outcome: std::result::Result<SubmissionReport, SubmissionError>,
) -> Result<()> {
    if cli.json {
        let value = match outcome {
            Ok(report) => serde_json::to_value(&report).context("Failed to serialise report")?,
            Err(e) => serde_json::json!({
                "raw_link": link.trim(),
                "stage": e.stage(),
                "error": e.user_message(),
                "detail": e.to_string(),
            }),
        };
        println!(
            "{}",
            serde_json::to_string_pretty(&value).context("Failed to serialise report")?
        );
        return Ok(());
    }

    match outcome {
        Ok(report) => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            for (column, value) in COLUMNS.iter().zip(report.row.values()) {
                writeln!(handle, "{column:<7} {value}").context("Failed to write to stdout")?;
            }
            if report.attempts > 1 && !cli.quiet {
                eprintln!("{}", dim(&format!("({} model attempts)", report.attempts)));
            }
        }
        // The observer already printed the failure line; quiet mode still
        // needs to hear about it.
        Err(e) if cli.quiet => eprintln!("{} {}", red("✗"), e.user_message()),
        Err(_) => {}
    }
    Ok(())
}

/// Map CLI args to `PipelineConfig`.
async fn build_config(cli: &Cli) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::builder()
        .provider_name(&cli.provider)
        .model(&cli.model)
        .max_attempts(cli.max_attempts)
        .retry_delay(Duration::from_secs(cli.retry_delay))
        .worksheet(&cli.worksheet);

    if let Some(ref path) = cli.prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt from {:?}", path))?;
        builder = builder.prompt(prompt.trim());
    }

    builder.build().context("Invalid configuration")
}

fn build_secrets(cli: &Cli) -> Result<Secrets> {
    let spreadsheet_id = cli
        .spreadsheet_id
        .as_deref()
        .context("Missing spreadsheet id: set SPREADSHEET_ID or pass --spreadsheet-id")?;
    let service_account = cli
        .service_account
        .as_deref()
        .context("Missing service account: set GOOGLE_SERVICE_ACCOUNT or pass --service-account")?;
    Secrets::new(spreadsheet_id, service_account).context("Invalid secrets")
}
