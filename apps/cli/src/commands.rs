//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use blogwriter_core::{
    ChatInput, Collaborators, Controller, ProgressReporter, RunInput, run_chat,
};
use blogwriter_fetch::WebFetcher;
use blogwriter_images::ImageRouter;
use blogwriter_llm::LlmRouter;
use blogwriter_shared::{
    AppConfig, ImageProvider, LlmProvider, PipelineOutput, RunConfig, RunId, RunStore,
    ScraperKind, StatePatch, StepName, init_config, load_config, validate_api_key,
};
use blogwriter_storage::{MemoryRunStore, SqliteRunStore};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// Blog Writer: turn any web page into an SEO-ready blog post.
#[derive(Parser)]
#[command(
    name = "blogwriter",
    version,
    about = "Turn a web page into an SEO-optimized HTML blog post.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Run database (defaults to ~/.blogwriter/runs.db).
    #[arg(long, global = true, env = "BLOGWRITER_DB")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Per-run overrides of the `[defaults]` config section.
#[derive(Args, Debug, Clone, Default)]
pub(crate) struct RunOpts {
    /// Keyword hint for the suggestion step (repeatable).
    #[arg(short = 'k', long = "keyword")]
    pub keywords: Vec<String>,

    /// Language model provider: openai, anthropic or google.
    #[arg(long)]
    pub llm: Option<LlmProvider>,

    /// Image provider: dalle, stability, unsplash or pexels.
    #[arg(long)]
    pub image: Option<ImageProvider>,

    /// Content scraper: static or rendered.
    #[arg(long)]
    pub scraper: Option<ScraperKind>,

    /// Sampling temperature for every model call.
    #[arg(long)]
    pub temperature: Option<f32>,
}

impl RunOpts {
    /// Flags over config file over built-in defaults.
    fn run_config(&self, config: &AppConfig) -> RunConfig {
        let base = config.defaults.run_config();
        RunConfig {
            llm_provider: self.llm.unwrap_or(base.llm_provider),
            image_provider: self.image.unwrap_or(base.image_provider),
            scraper: self.scraper.unwrap_or(base.scraper),
            temperature: self.temperature.unwrap_or(base.temperature),
        }
    }

    fn user_keywords(&self) -> Option<Vec<String>> {
        (!self.keywords.is_empty()).then(|| self.keywords.clone())
    }
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Run the whole pipeline for a URL.
    Write {
        /// Source page URL.
        url: String,

        #[command(flatten)]
        opts: RunOpts,

        /// Keywords to write with (repeatable). Defaults to the suggestions.
        #[arg(long)]
        select: Vec<String>,

        /// Show the suggestions and pick keywords on stdin.
        #[arg(short, long, conflicts_with = "select")]
        interactive: bool,

        /// Keep the run in memory instead of the run database.
        #[arg(long)]
        ephemeral: bool,

        /// Write the HTML here instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Run up to keyword selection and stop.
    Start {
        /// Source page URL.
        url: String,

        #[command(flatten)]
        opts: RunOpts,

        /// Run id to use (a thread id). Generated when omitted.
        #[arg(long)]
        run_id: Option<RunId>,
    },

    /// Finish a run paused by `start`.
    Resume {
        /// Run id printed by `start`.
        run_id: RunId,

        /// Keywords to write with (repeatable). Defaults to the suggestions.
        #[arg(long)]
        select: Vec<String>,

        /// Write the HTML here instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Show one run.
    Status {
        run_id: RunId,

        /// Print the full record as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List runs, most recent first.
    Runs,

    /// Run the Chat example graph.
    Chat {
        query: String,
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
        0 => "blogwriter=info",
        1 => "blogwriter=debug",
        _ => "blogwriter=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

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
    let db = cli.db;
    match cli.command {
        Command::Write {
            url,
            opts,
            select,
            interactive,
            ephemeral,
            out,
        } => {
            let store = if ephemeral {
                None
            } else {
                Some(db.as_deref())
            };
            cmd_write(store, &url, &opts, select, interactive, out.as_deref()).await
        }
        Command::Start { url, opts, run_id } => {
            cmd_start(db.as_deref(), &url, &opts, run_id).await
        }
        Command::Resume {
            run_id,
            select,
            out,
        } => cmd_resume(db.as_deref(), &run_id, select, out.as_deref()).await,
        Command::Status { run_id, json } => cmd_status(db.as_deref(), &run_id, json).await,
        Command::Runs => cmd_runs(db.as_deref()).await,
        Command::Chat { query } => cmd_chat(query),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

// ---------------------------------------------------------------------------
// Composition
// ---------------------------------------------------------------------------

/// `None` keeps runs in memory; `Some(None)` uses the configured database.
async fn open_store(db: Option<Option<&Path>>, config: &AppConfig) -> Result<Arc<dyn RunStore>> {
    let Some(db) = db else {
        return Ok(Arc::new(MemoryRunStore::new()));
    };
    let path = match db {
        Some(p) => p.to_path_buf(),
        None => config.db_path()?,
    };
    info!(path = %path.display(), "opening run database");
    let store = SqliteRunStore::open(&path)
        .await
        .wrap_err_with(|| format!("failed to open run database at {}", path.display()))?;
    Ok(Arc::new(store))
}

fn collaborators(config: &AppConfig) -> Result<Collaborators> {
    Ok(Collaborators {
        fetcher: Arc::new(WebFetcher::new(&config.fetch)?),
        model: Arc::new(LlmRouter::from_config(config)?),
        images: Arc::new(ImageRouter::from_config(config)?),
    })
}

async fn controller(db: Option<Option<&Path>>, config: &AppConfig) -> Result<Controller> {
    let store = open_store(db, config).await?;
    Ok(Controller::blog_writer(collaborators(config)?, store))
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_write(
    db: Option<Option<&Path>>,
    url: &str,
    opts: &RunOpts,
    select: Vec<String>,
    interactive: bool,
    out: Option<&Path>,
) -> Result<()> {
    let config = load_config()?;
    let run_config = opts.run_config(&config);
    validate_api_key(&config, run_config.llm_provider)?;

    let ctl = controller(db, &config).await?;
    let input = RunInput {
        run_id: None,
        url: url.to_string(),
        user_keywords: opts.user_keywords(),
        config: run_config,
    };
    info!(url, llm = %run_config.llm_provider, image = %run_config.image_provider, "writing blog post");

    let (run_id, output) = if interactive {
        let handle = ctl.start(input, &CliProgress::new()).await?;
        let chosen = prompt_selection(&handle.suggested_keywords).await?;
        let output = ctl
            .resume(&handle.run_id, selection_patch(chosen), &CliProgress::new())
            .await?;
        (handle.run_id, output)
    } else {
        ctl.run_to_completion(input, selection_patch(select), &CliProgress::new())
            .await?
    };

    emit_output(&run_id, &output, out).await
}

async fn cmd_start(
    db: Option<&Path>,
    url: &str,
    opts: &RunOpts,
    run_id: Option<RunId>,
) -> Result<()> {
    let config = load_config()?;
    let run_config = opts.run_config(&config);
    validate_api_key(&config, run_config.llm_provider)?;

    let ctl = controller(Some(db), &config).await?;
    let handle = ctl
        .start(
            RunInput {
                run_id,
                url: url.to_string(),
                user_keywords: opts.user_keywords(),
                config: run_config,
            },
            &CliProgress::new(),
        )
        .await?;

    println!();
    println!("  Run:      {}", handle.run_id);
    println!("  Status:   {}", handle.status);
    println!("  Keywords: {}", handle.suggested_keywords.join(", "));
    println!();
    println!(
        "  Continue with: blogwriter resume {} [--select <keyword>...]",
        handle.run_id
    );
    println!();

    Ok(())
}

async fn cmd_resume(
    db: Option<&Path>,
    run_id: &RunId,
    select: Vec<String>,
    out: Option<&Path>,
) -> Result<()> {
    let config = load_config()?;
    let ctl = controller(Some(db), &config).await?;

    // The run keeps the provider it was started with.
    let record = ctl.status(run_id).await?;
    validate_api_key(&config, record.state.run_config.llm_provider)?;

    let output = ctl
        .resume(run_id, selection_patch(select), &CliProgress::new())
        .await?;
    emit_output(run_id, &output, out).await
}

async fn cmd_status(db: Option<&Path>, run_id: &RunId, json: bool) -> Result<()> {
    let config = load_config()?;
    let store = open_store(Some(db), &config).await?;
    let record = store.load(run_id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    let state = &record.state;
    println!();
    println!("  Run:       {}", record.run_id);
    println!("  URL:       {}", state.url);
    println!("  Status:    {}", record.status);
    println!("  Created:   {}", record.created_at.to_rfc3339());
    println!("  Updated:   {}", record.updated_at.to_rfc3339());
    if let Some(suggested) = &state.suggested_keywords {
        println!("  Suggested: {}", suggested.join(", "));
    }
    if let Some(selected) = &state.selected_keywords {
        println!("  Selected:  {}", selected.join(", "));
    }
    if let Some(seo) = &state.seo_meta {
        println!("  Title:     {}", seo.title);
    }
    println!();

    Ok(())
}

async fn cmd_runs(db: Option<&Path>) -> Result<()> {
    let config = load_config()?;
    let store = open_store(Some(db), &config).await?;
    let runs = store.list().await?;

    if runs.is_empty() {
        println!("No runs yet.");
        return Ok(());
    }

    for record in runs {
        println!(
            "{:<38} {:<10} {}  {}",
            record.run_id.as_str(),
            record.status.label(),
            record.updated_at.format("%Y-%m-%d %H:%M"),
            record.state.url
        );
    }
    Ok(())
}

fn cmd_chat(query: String) -> Result<()> {
    let output = run_chat(&ChatInput { query });
    println!("{}", output.messages);
    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config.resolved())?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// Keyword selection
// ---------------------------------------------------------------------------

fn selection_patch(select: Vec<String>) -> StatePatch {
    let cleaned: Vec<String> = select
        .into_iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect();
    if cleaned.is_empty() {
        StatePatch::default()
    } else {
        StatePatch::with_keywords(cleaned)
    }
}

/// Parse a comma-separated answer. Numbers pick suggestions (1-based),
/// anything else is taken as a keyword. Empty means "all suggestions".
fn parse_selection(line: &str, suggestions: &[String]) -> Vec<String> {
    line.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|token| match token.parse::<usize>() {
            Ok(n) if (1..=suggestions.len()).contains(&n) => suggestions[n - 1].clone(),
            _ => token.to_string(),
        })
        .collect()
}

async fn prompt_selection(suggestions: &[String]) -> Result<Vec<String>> {
    println!();
    println!("  Suggested keywords:");
    for (i, keyword) in suggestions.iter().enumerate() {
        println!("    {}. {keyword}", i + 1);
    }
    println!();
    println!("  Pick numbers or type keywords, comma-separated (empty = all):");

    let line = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).map(|_| line)
    })
    .await
    .wrap_err("stdin reader panicked")?
    .wrap_err("failed to read keyword selection")?;

    Ok(parse_selection(&line, suggestions))
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

async fn emit_output(run_id: &RunId, output: &PipelineOutput, out: Option<&Path>) -> Result<()> {
    let Some(path) = out else {
        print!("{}", output.html_content);
        return Ok(());
    };

    tokio::fs::write(path, &output.html_content)
        .await
        .map_err(|e| eyre!("failed to write {}: {e}", path.display()))?;

    println!();
    println!("  Blog post written!");
    println!("  Run:      {run_id}");
    println!("  Title:    {}", output.seo_meta.title);
    println!("  Keywords: {}", output.selected_keywords.join(", "));
    println!("  Images:   {}", output.image_urls.len());
    println!("  Path:     {}", path.display());
    println!();

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
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn step_started(&self, step: StepName) {
        self.spinner.set_message(step_label(step).to_string());
    }

    fn step_finished(&self, _step: StepName) {}

    fn suspended(&self, _run_id: &RunId, _step: StepName) {
        self.spinner.finish_and_clear();
    }

    fn done(&self, _run_id: &RunId) {
        self.spinner.finish_and_clear();
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        // Failed runs never reach `done`.
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

fn step_label(step: StepName) -> &'static str {
    match step {
        StepName::FetchContent => "Fetching page",
        StepName::AnalyzeContent => "Analyzing content",
        StepName::SuggestKeywords => "Suggesting keywords",
        StepName::HumanSelectKeywords => "Applying keyword selection",
        StepName::WriteBlog => "Writing blog post",
        StepName::OptimizeSeo => "Optimizing SEO metadata",
        StepName::GenerateImages => "Generating images",
        StepName::ConvertToHtml => "Rendering HTML",
    }
}
