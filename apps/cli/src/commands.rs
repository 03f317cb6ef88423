//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use masterlist_core::validator::PDF_CONTENT_TYPE;
use masterlist_core::{IngestOutcome, MasterlistPipeline};
use masterlist_extract::{PdfTextExtractor, TextExtractor};
use masterlist_roster::RosterParser;
use masterlist_shared::{
    AppConfig, ParserConfig, StudentRecord, UploadEvent, init_config, load_config, paths,
};
use masterlist_storage::{LocalBuckets, Storage};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// masterlist: turn class roster PDFs into student records.
#[derive(Parser)]
#[command(
    name = "masterlist",
    version,
    about = "Ingest class masterlist PDFs into per-class student collections.",
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
    /// Upload a masterlist PDF for a class and ingest it.
    Upload {
        /// PDF file to upload.
        file: PathBuf,

        /// Owning professor ID.
        #[arg(long)]
        professor: String,

        /// Class ID.
        #[arg(long = "class")]
        class_id: String,

        /// Bucket to upload into (defaults to storage.default_bucket).
        #[arg(long)]
        bucket: Option<String>,

        /// Content type to report (inferred from the file extension by default).
        #[arg(long)]
        content_type: Option<String>,
    },

    /// Dispatch a storage upload event through the pipeline.
    Ingest {
        /// Object path of the uploaded file.
        #[arg(long, required_unless_present = "event", conflicts_with = "event")]
        path: Option<String>,

        /// Bucket holding the object (defaults to storage.default_bucket).
        #[arg(long)]
        bucket: Option<String>,

        /// Content type reported by the uploader.
        #[arg(long, default_value = PDF_CONTENT_TYPE)]
        content_type: String,

        /// JSON event payload (`{"bucket", "name", "contentType"}`).
        #[arg(long)]
        event: Option<PathBuf>,
    },

    /// Extract and parse a PDF locally without writing anything.
    Parse {
        /// PDF file to parse.
        file: PathBuf,

        /// Print records as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List the students stored for a class.
    Students {
        /// Owning professor ID.
        #[arg(long)]
        professor: String,

        /// Class ID.
        #[arg(long = "class")]
        class_id: String,

        /// Print records as JSON.
        #[arg(long)]
        json: bool,
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
        0 => "masterlist=info",
        1 => "masterlist=debug",
        _ => "masterlist=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

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
    match cli.command {
        Command::Upload {
            file,
            professor,
            class_id,
            bucket,
            content_type,
        } => {
            cmd_upload(
                &file,
                &professor,
                &class_id,
                bucket.as_deref(),
                content_type.as_deref(),
            )
            .await
        }
        Command::Ingest {
            path,
            bucket,
            content_type,
            event,
        } => cmd_ingest(path, bucket, content_type, event.as_deref()).await,
        Command::Parse { file, json } => cmd_parse(&file, json).await,
        Command::Students {
            professor,
            class_id,
            json,
        } => cmd_students(&professor, &class_id, json).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Pipeline wiring
// ---------------------------------------------------------------------------

/// Build the pipeline and its clients once from config.
async fn open_pipeline(config: &AppConfig) -> Result<(MasterlistPipeline, Arc<LocalBuckets>)> {
    let buckets = Arc::new(LocalBuckets::new(config.storage.buckets_root_path()?));
    let db_path = config.storage.database_path_buf()?;
    let storage = Arc::new(Storage::open(&db_path).await?);
    let parser = RosterParser::new(&ParserConfig::from(config))?;

    let pipeline = MasterlistPipeline::new(
        buckets.clone(),
        Arc::new(PdfTextExtractor::new()),
        storage,
        parser,
    );
    Ok((pipeline, buckets))
}

/// Dispatch an event with a spinner and print what happened.
async fn dispatch(pipeline: &MasterlistPipeline, event: &UploadEvent) -> Result<()> {
    let spinner = Spinner::start("Processing masterlist");
    let outcome = pipeline.handle(event).await;
    spinner.finish();

    let path = event.name.as_deref().unwrap_or("<none>");
    match outcome {
        IngestOutcome::Written { count } => {
            println!();
            println!("  Masterlist ingested.");
            println!("  Object:   {path}");
            println!("  Students: {count}");
            println!();
            Ok(())
        }
        IngestOutcome::Empty => {
            println!("No students found in {path}; nothing was written.");
            Ok(())
        }
        IngestOutcome::Rejected(rejection) => {
            println!("Skipped: {rejection}");
            Ok(())
        }
        IngestOutcome::Failed { message } => Err(eyre!("ingestion of {path} failed: {message}")),
    }
}

/// Content type a bucket would report for `file`.
fn infer_content_type(file: &Path) -> &'static str {
    match file
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("pdf") => PDF_CONTENT_TYPE,
        _ => "application/octet-stream",
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_upload(
    file: &Path,
    professor: &str,
    class_id: &str,
    bucket: Option<&str>,
    content_type: Option<&str>,
) -> Result<()> {
    let config = load_config()?;
    let (pipeline, buckets) = open_pipeline(&config).await?;

    let file_name = file
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| eyre!("'{}' has no usable file name", file.display()))?;
    let data = std::fs::read(file)
        .wrap_err_with(|| format!("failed to read {}", file.display()))?;

    let bucket = bucket.unwrap_or(config.storage.default_bucket.as_str());
    let object_path = paths::masterlist_object(professor, class_id, file_name);
    let content_type = content_type.unwrap_or_else(|| infer_content_type(file));

    let stored = buckets.upload(bucket, &object_path, &data).await?;
    info!(
        bucket,
        object_path = %object_path,
        stored = %stored.display(),
        content_type,
        size = data.len(),
        "masterlist uploaded"
    );

    let event = UploadEvent::finalized(bucket, object_path, Some(content_type));
    dispatch(&pipeline, &event).await
}

async fn cmd_ingest(
    path: Option<String>,
    bucket: Option<String>,
    content_type: String,
    event_file: Option<&Path>,
) -> Result<()> {
    let config = load_config()?;

    let event = match event_file {
        Some(file) => {
            let raw = std::fs::read_to_string(file)
                .wrap_err_with(|| format!("failed to read {}", file.display()))?;
            UploadEvent::from_json(&raw)
                .wrap_err_with(|| format!("failed to load event from {}", file.display()))?
        }
        None => UploadEvent {
            bucket: bucket.unwrap_or_else(|| config.storage.default_bucket.clone()),
            name: path,
            content_type: Some(content_type),
        },
    };

    let (pipeline, _buckets) = open_pipeline(&config).await?;
    dispatch(&pipeline, &event).await
}

async fn cmd_parse(file: &Path, json: bool) -> Result<()> {
    let config = load_config()?;
    let parser = RosterParser::new(&ParserConfig::from(&config))?;

    let data = std::fs::read(file)
        .wrap_err_with(|| format!("failed to read {}", file.display()))?;
    let text = PdfTextExtractor::new().extract_text(data.into()).await?;
    let roster = parser.parse(&text, Utc::now());

    let records: Vec<&StudentRecord> = roster.students.values().collect();
    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    print_students(&records);
    let stats = roster.stats;
    println!();
    println!(
        "  {} students from {} lines ({} ID lines, {} dropped, {} duplicates)",
        roster.yield_count(),
        stats.lines,
        stats.id_lines,
        stats.dropped,
        stats.duplicates
    );
    Ok(())
}

async fn cmd_students(professor: &str, class_id: &str, json: bool) -> Result<()> {
    let config = load_config()?;
    let db_path = config.storage.database_path_buf()?;
    let storage = Storage::open_readonly(&db_path).await?;

    let students = storage.list_students(professor, class_id).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&students)?);
        return Ok(());
    }

    if students.is_empty() {
        println!("No students at {}", paths::students(professor, class_id));
        return Ok(());
    }

    let records: Vec<&StudentRecord> = students.iter().collect();
    print_students(&records);
    Ok(())
}

fn print_students(records: &[&StudentRecord]) {
    let width = records
        .iter()
        .map(|r| r.student_id.len())
        .max()
        .unwrap_or(0)
        .max("STUDENT ID".len());

    println!("  {:<width$}  NAME", "STUDENT ID");
    for record in records {
        println!("  {:<width$}  {}", record.student_id, record.name);
    }
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress
// ---------------------------------------------------------------------------

/// Steady spinner shown while the pipeline runs.
struct Spinner {
    bar: ProgressBar,
}

impl Spinner {
    fn start(message: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        bar.set_style(style);
        bar.set_message(message.to_string());
        bar.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { bar }
    }

    fn finish(self) {
        self.bar.finish_and_clear();
    }
}
