//! CLI command definitions, routing, and tracing setup.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use courseatlas_core::{
    FactsExtractor, FixedNavigator, Navigator, ProgressReporter, RunConfig, RunSummary, run_crawl,
};
use courseatlas_crawler::{CATALOG_LINK_SELECTOR, HttpPageLoader, PageLoader, extract_labeled_links};
use courseatlas_extract::LlmExtractor;
use courseatlas_shared::{CatalogError, config_file_path, init_config, load_config};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use url::Url;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// CourseAtlas — build a course directory from a public catalog.
#[derive(Parser)]
#[command(
    name = "courseatlas",
    version,
    about = "Crawl a university course catalog into a flat-file course directory.",
    long_about = None,
)]
pub(crate) struct Cli {
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

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Crawl a semester's catalog and write the course directory.
    Crawl {
        /// Academic year to crawl (defaults to the configured year).
        #[arg(short, long)]
        year: Option<String>,

        /// Skip the semester prompt and crawl this semester page directly.
        #[arg(long)]
        semester_url: Option<String>,

        /// Output file path (defaults to the configured output path).
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Max subjects crawled in parallel.
        #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
        subjects: Option<u16>,

        /// Max concurrent LLM extraction calls.
        #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
        llm: Option<u16>,
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
        0 => "courseatlas=info",
        1 => "courseatlas=debug",
        _ => "courseatlas=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Crawl {
            year,
            semester_url,
            out,
            subjects,
            llm,
        } => cmd_crawl(year.as_deref(), semester_url.as_deref(), out, subjects, llm).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// crawl
// ---------------------------------------------------------------------------

async fn cmd_crawl(
    year: Option<&str>,
    semester_url: Option<&str>,
    out: Option<PathBuf>,
    subjects: Option<u16>,
    llm: Option<u16>,
) -> Result<()> {
    let config = load_config()?;

    let loader: Arc<dyn PageLoader> = Arc::new(HttpPageLoader::new()?);
    let extractor: Arc<dyn FactsExtractor> = Arc::new(LlmExtractor::from_config(&config.llm)?);

    let navigator: Box<dyn Navigator> = match semester_url {
        Some(raw) => {
            let url = Url::parse(raw).map_err(|e| eyre!("invalid semester URL '{raw}': {e}"))?;
            Box::new(FixedNavigator::new(url))
        }
        None => {
            let year = year.unwrap_or(&config.catalog.year);
            Box::new(PromptNavigator::new(&config.catalog.base_url, year)?)
        }
    };

    let run_config = RunConfig {
        subject_concurrency: subjects
            .map(usize::from)
            .unwrap_or(config.limits.subject_concurrency),
        llm_concurrency: llm.map(usize::from).unwrap_or(config.limits.llm_concurrency),
        output_path: out.unwrap_or_else(|| PathBuf::from(&config.catalog.output_path)),
    };

    info!(
        subjects = run_config.subject_concurrency,
        llm = run_config.llm_concurrency,
        output = %run_config.output_path.display(),
        "starting crawl"
    );

    let reporter = CliProgress::new();
    let summary = run_crawl(&run_config, navigator.as_ref(), loader, extractor, &reporter).await?;

    println!();
    println!("  Course directory written!");
    println!("  Subjects: {}/{}", summary.subjects_ok, summary.subjects_total);
    println!("  Courses:  {}", summary.courses);
    println!("  Degraded: {}", summary.degraded);
    println!("  Warnings: {}", summary.warnings);
    println!("  Path:     {}", summary.output_path.display());
    println!("  Time:     {:.1}s", summary.elapsed.as_secs_f64());
    if !summary.failed.is_empty() {
        println!();
        println!("  Failed subjects:");
        for (label, message) in &summary.failed {
            println!("    {label}: {message}");
        }
    }
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// Interactive semester selection
// ---------------------------------------------------------------------------

/// Navigator that lists the year page's semesters and asks the operator to
/// pick one by number or name.
struct PromptNavigator {
    year_page: Url,
}

impl PromptNavigator {
    fn new(base_url: &str, year: &str) -> Result<Self> {
        let base = Url::parse(base_url).map_err(|e| eyre!("invalid base URL '{base_url}': {e}"))?;
        let year_page = base
            .join(&format!("{year}/"))
            .map_err(|e| eyre!("cannot build year URL for '{year}': {e}"))?;
        Ok(Self { year_page })
    }
}

#[async_trait]
impl Navigator for PromptNavigator {
    async fn semester_url(
        &self,
        loader: &dyn PageLoader,
    ) -> courseatlas_shared::Result<Url> {
        let html = loader.fetch(&self.year_page).await?;
        let semesters = extract_labeled_links(&html, CATALOG_LINK_SELECTOR, &self.year_page)?;
        if semesters.is_empty() {
            return Err(CatalogError::validation(format!(
                "no semester links found on {}",
                self.year_page
            )));
        }

        println!("Available semesters:");
        for (idx, semester) in semesters.iter().enumerate() {
            println!("  {}. {}", idx + 1, semester.label);
        }
        print!("Select a semester: ");
        std::io::stdout()
            .flush()
            .map_err(|e| CatalogError::validation(format!("cannot write prompt: {e}")))?;

        let mut line = String::new();
        std::io::stdin()
            .read_line(&mut line)
            .map_err(|e| CatalogError::validation(format!("cannot read selection: {e}")))?;
        let choice = line.trim();

        let selected = if let Ok(number) = choice.parse::<usize>() {
            semesters.get(number.wrapping_sub(1))
        } else {
            semesters
                .iter()
                .find(|s| s.label.eq_ignore_ascii_case(choice))
        };

        match selected {
            Some(semester) => {
                info!(semester = %semester.label, url = %semester.url, "semester selected");
                Ok(semester.url.clone())
            }
            None => Err(CatalogError::validation(format!(
                "'{choice}' does not match any listed semester"
            ))),
        }
    }
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
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, _summary: &RunSummary) {
        self.spinner.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Created config file: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config = load_config()?;
    let path = config_file_path()?;

    println!("Config file: {}", path.display());
    if !path.exists() {
        println!("  (not found — showing defaults; run `courseatlas config init`)");
    }
    println!();
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
