//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use snipbook_core::assembler::check_tolerance;
use snipbook_core::pipeline::{
    CancelFlag, GenerateResult, ProgressReporter, generate_book, generate_library,
};
use snipbook_shared::{
    AppConfig, BuildConfig, DedupPolicy, OutputFormat, init_config, load_config, load_config_from,
};
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// snipbook: compile snippet corpora into ordered, deduplicated books.
#[derive(Parser)]
#[command(
    name = "snipbook",
    version,
    about = "Compile directories of packed documentation snippets into books.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Config file (defaults to ~/.snipbook/snipbook.toml).
    #[arg(long, global = true, env = "SNIPBOOK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Document format flag.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum FormatArg {
    Markdown,
    Json,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Markdown => OutputFormat::Markdown,
            FormatArg::Json => OutputFormat::Json,
        }
    }
}

/// Duplicate-id policy flag.
#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub(crate) enum DedupArg {
    LastWins,
    FirstWins,
}

impl From<DedupArg> for DedupPolicy {
    fn from(arg: DedupArg) -> Self {
        match arg {
            DedupArg::LastWins => DedupPolicy::LastWins,
            DedupArg::FirstWins => DedupPolicy::FirstWins,
        }
    }
}

/// Flags shared by `build` and `build-all`; each overrides the config file.
#[derive(Args, Debug, Default)]
pub(crate) struct BuildArgs {
    /// Output format.
    #[arg(short, long)]
    pub format: Option<FormatArg>,

    /// Literal token separating packed entries in one file.
    #[arg(long)]
    pub separator: Option<String>,

    /// Malformed entries tolerated before exiting non-zero.
    #[arg(long)]
    pub max_malformed: Option<usize>,

    /// Which entry survives a duplicate id.
    #[arg(long)]
    pub dedup: Option<DedupArg>,

    /// Drop snippets scoring below this value.
    #[arg(long, allow_negative_numbers = true)]
    pub min_score: Option<i64>,

    /// Chapters indexed in parallel.
    #[arg(long)]
    pub concurrency: Option<u32>,
}

impl BuildArgs {
    fn apply(&self, config: &mut BuildConfig) {
        if let Some(format) = self.format {
            config.format = format.into();
        }
        if let Some(separator) = &self.separator {
            config.separator = separator.clone();
        }
        if let Some(max) = self.max_malformed {
            config.max_malformed = max;
        }
        if let Some(dedup) = self.dedup {
            config.dedup = dedup.into();
        }
        if self.min_score.is_some() {
            config.min_score = self.min_score;
        }
        if let Some(concurrency) = self.concurrency {
            config.concurrency = concurrency;
        }
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Compile one book directory into a single document.
    Build {
        /// Book root (a directory of chapter directories).
        book: PathBuf,

        /// Destination file for the document.
        #[arg(short, long)]
        out: PathBuf,

        #[command(flatten)]
        opts: BuildArgs,
    },

    /// Compile every book under a books directory.
    BuildAll {
        /// Directory whose sub-directories are books.
        books: PathBuf,

        /// Directory receiving one `<book>.md` (or `.json`) per book.
        #[arg(short, long)]
        out_dir: PathBuf,

        #[command(flatten)]
        opts: BuildArgs,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "snipbook=info",
        1 => "snipbook=debug",
        _ => "snipbook=trace",
    };

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config;
    match cli.command {
        Command::Build { book, out, opts } => {
            let config = resolve_build_config(config_path.as_deref(), &opts)?;
            cmd_build(&book, &out, &config).await
        }
        Command::BuildAll {
            books,
            out_dir,
            opts,
        } => {
            let config = resolve_build_config(config_path.as_deref(), &opts)?;
            cmd_build_all(&books, &out_dir, &config).await
        }
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(config_path.as_deref()),
        },
    }
}

/// Config file, then CLI flags on top.
fn resolve_build_config(config_path: Option<&Path>, opts: &BuildArgs) -> Result<BuildConfig> {
    let app = load_app_config(config_path)?;
    let mut config = BuildConfig::from(&app);
    opts.apply(&mut config);
    config.validate()?;
    Ok(config)
}

fn load_app_config(config_path: Option<&Path>) -> Result<AppConfig> {
    let config = match config_path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    Ok(config)
}

/// Cancel the run on Ctrl-C; chapters already started finish, nothing is written.
fn cancel_on_ctrl_c() -> CancelFlag {
    let cancel = CancelFlag::new();
    let flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling");
            flag.cancel();
        }
    });
    cancel
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_build(book: &Path, out: &Path, config: &BuildConfig) -> Result<()> {
    if !book.is_dir() {
        return Err(eyre!("book root '{}' is not a directory", book.display()));
    }

    info!(
        book = %book.display(),
        out = %out.display(),
        separator = %config.separator,
        dedup = %config.dedup,
        "building book"
    );

    let cancel = cancel_on_ctrl_c();
    let reporter = CliProgress::new();
    let result = generate_book(book, out, config, &reporter, &cancel).await;
    reporter.finish();
    let result = result?;

    print_summary(&result);
    check_tolerance(&result.book, config.max_malformed)?;

    Ok(())
}

async fn cmd_build_all(books: &Path, out_dir: &Path, config: &BuildConfig) -> Result<()> {
    if !books.is_dir() {
        return Err(eyre!("books directory '{}' is not a directory", books.display()));
    }

    info!(books = %books.display(), out_dir = %out_dir.display(), "building all books");

    let cancel = cancel_on_ctrl_c();
    let reporter = CliProgress::new();
    let entries = generate_library(books, out_dir, config, &reporter, &cancel).await;
    reporter.finish();
    let entries = entries?;

    if entries.is_empty() {
        return Err(eyre!("no books found under '{}'", books.display()));
    }

    let mut failed = 0;
    for entry in &entries {
        match &entry.result {
            Ok(result) => {
                print_summary(result);
                if let Err(e) = check_tolerance(&result.book, config.max_malformed) {
                    println!("  ! {}: {e}", entry.name);
                    failed += 1;
                }
            }
            Err(e) => {
                println!();
                println!("  ! {}: {e}", entry.name);
                failed += 1;
            }
        }
    }
    println!();

    if failed > 0 {
        return Err(eyre!("{failed} of {} books failed", entries.len()));
    }
    Ok(())
}

fn print_summary(result: &GenerateResult) {
    let book = &result.book;
    println!();
    println!("  Book written: {}", book.title);
    println!("  Chapters:    {}", book.chapters.len());
    println!("  Snippets:    {}", book.snippet_count());
    println!("  Diagnostics: {}", book.diagnostics.len());
    println!("  Path:        {}", result.output.path.display());
    println!("  SHA-256:     {}", result.output.sha256);
    println!("  Time:        {:.1}s", result.elapsed.as_secs_f64());
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let config = load_app_config(config_path)?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn chapter_indexed(&self, title: &str, current: usize, total: usize) {
        self.spinner
            .set_message(format!("Indexed [{current}/{total}] {title}"));
    }

    fn done(&self, result: &GenerateResult) {
        self.spinner
            .set_message(format!("Wrote {}", result.output.path.display()));
    }
}
