// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use indicatif::{ProgressBar, ProgressStyle};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, error, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

use docweave::app_config::{Config, LogLevel};
use docweave::document::AssetLedger;
use docweave::file_utils::{DOCUMENT_SUFFIX, FileManager};
use docweave::language_utils;
use docweave::pipeline::{Pipeline, PipelineConfig};
use docweave::translation::{IdentityTranslator, PseudoTranslator, SegmentTranslator};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the columns detected on every page
    Columns {
        /// Document JSON file
        #[arg(value_name = "DOC")]
        document: PathBuf,
    },

    /// Anchor every asset of a ledger to a block and write the anchored ledger
    Anchor {
        /// Document JSON file
        #[arg(value_name = "DOC")]
        document: PathBuf,

        /// Asset ledger JSON file
        #[arg(value_name = "LEDGER")]
        ledger: PathBuf,

        /// Output path of the anchored ledger
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Inject asset markers for an anchored ledger
    Inject {
        /// Document JSON file
        #[arg(value_name = "DOC")]
        document: PathBuf,

        /// Anchored asset ledger JSON file
        #[arg(value_name = "LEDGER")]
        ledger: PathBuf,

        /// Output path of the marked document
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Write one protected segment per block for an external translator
    Segment {
        /// Marked document JSON file
        #[arg(value_name = "DOC")]
        document: PathBuf,

        /// Output path of the segment batch
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Merge translated texts back into a document
    Merge {
        /// Marked document JSON file
        #[arg(value_name = "DOC")]
        document: PathBuf,

        /// Segment batch the translations were produced from
        #[arg(value_name = "SEGMENTS")]
        segments: PathBuf,

        /// JSON array of translated texts, in segment order
        #[arg(value_name = "TRANSLATIONS")]
        translations: PathBuf,

        /// Output path of the translated document
        #[arg(short, long)]
        output: PathBuf,

        /// Keep placeholders encoded instead of restoring the literals
        #[arg(long)]
        no_decode: bool,
    },

    /// Run every stage with an in-process translator
    Run {
        /// Document JSON file, or a directory searched for *.doc.json files
        #[arg(value_name = "INPUT_PATH")]
        input_path: PathBuf,

        /// Asset ledger JSON file, or '-' to use the ledger next to each document
        #[arg(value_name = "LEDGER", default_value = "-")]
        ledger: String,

        /// Directory receiving every stage output
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Pseudo-translate instead of echoing the source text
        #[arg(long)]
        pseudo: bool,

        /// Force overwrite of existing output files
        #[arg(short, long)]
        force_overwrite: bool,
    },

    /// Generate shell completions for docweave
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// docweave - geometry-aware document preparation for translation
///
/// Detects page columns, anchors visual assets to text blocks, and turns
/// blocks into placeholder-protected translation segments.
#[derive(Parser, Debug)]
#[command(name = "docweave")]
#[command(version)]
#[command(about = "Geometry-aware document segmentation for translation")]
#[command(long_about = "docweave prepares paginated documents for machine translation and restores them afterwards.

EXAMPLES:
    docweave columns pattern.doc.json
    docweave anchor pattern.doc.json pattern.ledger.json -o anchored.ledger.json
    docweave inject pattern.doc.json anchored.ledger.json -o marked.doc.json
    docweave segment marked.doc.json -o segments.json
    docweave merge marked.doc.json segments.json translated.json -o pattern.fr.doc.json
    docweave run ./documents -o ./out --pseudo
    docweave completions bash > docweave.bash

CONFIGURATION:
    Configuration is stored in docweave.json by default. You can specify a different
    config file with --config-path. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Source language code (e.g., 'en', 'es', 'fr')
    #[arg(short, long, global = true)]
    source_language: Option<String>,

    /// Target language code (e.g., 'en', 'es', 'fr')
    #[arg(short, long, global = true)]
    target_language: Option<String>,

    /// Configuration file path
    #[arg(short, long, default_value = "docweave.json", global = true)]
    config_path: String,

    /// Set logging level
    #[arg(short, long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger;

impl CustomLogger {
    // @initializes: Global logger, filtering through the global max level
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Marker and ANSI colour for a log level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("ERROR", "\x1B[1;31m"),
            Level::Warn => ("WARN ", "\x1B[1;33m"),
            Level::Info => ("INFO ", "\x1B[1;32m"),
            Level::Debug => ("DEBUG", "\x1B[1;36m"),
            Level::Trace => ("TRACE", "\x1B[1;35m"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (label, colour) = Self::style_for_level(record.level());

            let mut stderr = std::io::stderr();
            let _ = writeln!(stderr, "{}{} {} {}\x1B[0m", colour, now, label, record.args());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn main() -> Result<()> {
    // Initialize the logger once with info level by default
    // We'll update the level after loading the config if needed
    CustomLogger::init(LevelFilter::Info)?;

    // Parse command line arguments using clap
    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "docweave", &mut std::io::stdout());
        return Ok(());
    }

    let config = load_config(&cli)?;
    let pipeline = Pipeline::new(PipelineConfig::from(&config));

    match cli.command {
        Commands::Columns { document } => run_columns(&pipeline, &document),
        Commands::Anchor { document, ledger, output } => run_anchor(&pipeline, &document, &ledger, &output),
        Commands::Inject { document, ledger, output } => run_inject(&pipeline, &document, &ledger, &output),
        Commands::Segment { document, output } => run_segment(&pipeline, &document, &output),
        Commands::Merge {
            document,
            segments,
            translations,
            output,
            no_decode,
        } => {
            let mut pipeline_config = PipelineConfig::from(&config);
            if no_decode {
                pipeline_config.decode_after_merge = false;
            }
            run_merge(&Pipeline::new(pipeline_config), &document, &segments, &translations, &output)
        }
        Commands::Run {
            input_path,
            ledger,
            output_dir,
            pseudo,
            force_overwrite,
        } => {
            let translator: Box<dyn SegmentTranslator> = if pseudo {
                Box::new(PseudoTranslator::new())
            } else {
                Box::new(IdentityTranslator)
            };
            run_full(&pipeline, &input_path, &ledger, &output_dir, translator.as_ref(), force_overwrite)
        }
        Commands::Completions { .. } => Ok(()),
    }
}

/// Load or create the configuration, then apply command line overrides
fn load_config(cli: &CommandLineOptions) -> Result<Config> {
    if let Some(cmd_log_level) = &cli.log_level {
        let level: LogLevel = cmd_log_level.clone().into();
        log::set_max_level(level.to_level_filter());
    }

    let mut config = Config::load_or_create(Path::new(&cli.config_path))?;

    // Override config with CLI options if provided
    if let Some(source_lang) = &cli.source_language {
        config.source_language = source_lang.clone();
    }
    if let Some(target_lang) = &cli.target_language {
        config.target_language = target_lang.clone();
    }
    if let Some(log_level) = &cli.log_level {
        config.log_level = log_level.clone().into();
    }

    // Validate the configuration after loading and overriding
    config.validate().context("Configuration validation failed")?;

    // If log level was not set via command line, update it from config now
    if cli.log_level.is_none() {
        log::set_max_level(config.log_level.to_level_filter());
    }

    if language_utils::language_codes_match(&config.source_language, &config.target_language) {
        warn!(
            "Source and target language are the same ({})",
            config.source_language
        );
    }

    Ok(config)
}

fn run_columns(pipeline: &Pipeline, document_path: &Path) -> Result<()> {
    let document = FileManager::load_document(document_path)?;
    let layout = pipeline.detect_columns(&document);

    for (page, columns) in &layout.pages {
        println!("Page {}: {} column(s)", page, columns.len());
        for column in columns {
            println!(
                "  {} x=[{:.1}, {:.1}] y=[{:.1}, {:.1}] {} block(s)",
                column.id,
                column.x_min,
                column.x_max,
                column.y_min,
                column.y_max,
                column.block_ids.len()
            );
        }
    }

    Ok(())
}

fn run_anchor(pipeline: &Pipeline, document_path: &Path, ledger_path: &Path, output: &Path) -> Result<()> {
    let document = FileManager::load_document(document_path)?;
    let mut ledger = FileManager::load_ledger(ledger_path)?;

    let layout = pipeline.detect_columns(&document);
    let report = pipeline
        .anchor(&document, &mut ledger, &layout)
        .context(format!("Failed to anchor assets of {:?}", ledger_path))?;

    FileManager::save_ledger(output, &ledger)?;
    info!(
        "Anchored {} asset(s) ({} fallback), written to {:?}",
        report.anchored_count(),
        report.fallback_count,
        output
    );
    Ok(())
}

fn run_inject(pipeline: &Pipeline, document_path: &Path, ledger_path: &Path, output: &Path) -> Result<()> {
    let document = FileManager::load_document(document_path)?;
    let ledger = FileManager::load_ledger(ledger_path)?;

    let marked = pipeline
        .inject(&document, &ledger)
        .context(format!("Failed to inject markers into {:?}", document_path))?;

    FileManager::save_document(output, &marked)?;
    info!("Marked document written to {:?}", output);
    Ok(())
}

fn run_segment(pipeline: &Pipeline, document_path: &Path, output: &Path) -> Result<()> {
    let document = FileManager::load_document(document_path)?;
    let batch = pipeline
        .segment(&document)
        .context(format!("Failed to segment {:?}", document_path))?;

    FileManager::save_batch(output, &batch)?;
    info!("{} segment(s) written to {:?}", batch.len(), output);
    Ok(())
}

fn run_merge(
    pipeline: &Pipeline,
    document_path: &Path,
    segments_path: &Path,
    translations_path: &Path,
    output: &Path,
) -> Result<()> {
    let document = FileManager::load_document(document_path)?;
    let batch = FileManager::load_batch(segments_path)?;
    let translations = FileManager::load_translations(translations_path)?;

    let merged = pipeline
        .merge(&document, &batch, &translations)
        .context(format!("Failed to merge translations from {:?}", translations_path))?;

    FileManager::save_document(output, &merged)?;
    info!("Translated document written to {:?}", output);
    Ok(())
}

fn run_full(
    pipeline: &Pipeline,
    input_path: &Path,
    ledger: &str,
    output_dir: &Path,
    translator: &dyn SegmentTranslator,
    force_overwrite: bool,
) -> Result<()> {
    if input_path.is_file() {
        let ledger_path = if ledger == "-" {
            FileManager::sibling_ledger_path(input_path)
        } else {
            PathBuf::from(ledger)
        };
        return process_document(pipeline, input_path, &ledger_path, output_dir, translator, force_overwrite)
            .map(|_| ());
    }

    if !input_path.is_dir() {
        return Err(anyhow!("Input path does not exist: {:?}", input_path));
    }
    if ledger != "-" {
        warn!("A ledger path is ignored for directory input, using the ledger next to each document");
    }

    // Outputs of earlier runs also end in .doc.json
    let documents: Vec<PathBuf> = FileManager::find_files(input_path, DOCUMENT_SUFFIX)?
        .into_iter()
        .filter(|p| !p.starts_with(output_dir))
        .collect();
    if documents.is_empty() {
        return Err(anyhow!("No *{} files found in directory: {:?}", DOCUMENT_SUFFIX, input_path));
    }

    let start_time = Instant::now();
    let folder_pb = ProgressBar::new(documents.len() as u64);
    let template_result = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} documents ({percent}%) {msg}")
        .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    folder_pb.set_style(template_result.progress_chars("=>-"));

    // Track success and failure counts
    let mut success_count = 0;
    let mut error_count = 0;
    let mut skip_count = 0;

    for document_path in &documents {
        let file_name = document_path
            .file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        folder_pb.set_message(format!("Processing: {}", file_name));

        let ledger_path = FileManager::sibling_ledger_path(document_path);
        match process_document(pipeline, document_path, &ledger_path, output_dir, translator, force_overwrite) {
            Ok(true) => success_count += 1,
            Ok(false) => skip_count += 1,
            Err(e) => {
                error!("Error processing {}: {:#}", file_name, e);
                error_count += 1;
            }
        }

        folder_pb.inc(1);
    }

    folder_pb.finish_with_message("Folder processing complete");
    info!(
        "Folder processing completed in {:.1}s: {} processed, {} skipped, {} errors",
        start_time.elapsed().as_secs_f32(),
        success_count,
        skip_count,
        error_count
    );

    if error_count > 0 {
        return Err(anyhow!("{} of {} document(s) failed", error_count, documents.len()));
    }
    Ok(())
}

/// Run the full pipeline on one document, writing every stage output.
/// Returns `false` when the document was skipped.
fn process_document(
    pipeline: &Pipeline,
    document_path: &Path,
    ledger_path: &Path,
    output_dir: &Path,
    translator: &dyn SegmentTranslator,
    force_overwrite: bool,
) -> Result<bool> {
    let target_language = &pipeline.config().target_language;
    let translated_path =
        FileManager::generate_output_path(document_path, output_dir, &format!("{}{}", target_language, DOCUMENT_SUFFIX));
    if translated_path.exists() && !force_overwrite {
        warn!("Skipping {:?}, output already exists (use -f to force overwrite)", document_path);
        return Ok(false);
    }

    let document = FileManager::load_document(document_path)?;
    let ledger = if FileManager::file_exists(ledger_path) {
        FileManager::load_ledger(ledger_path)?
    } else {
        warn!("No ledger at {:?}, processing without assets", ledger_path);
        let total_pages = document.pages().last().copied().unwrap_or(0);
        AssetLedger::new(
            document.source_ref.as_deref().unwrap_or_default(),
            total_pages,
        )
    };

    let output = pipeline
        .run(&document, &ledger, translator)
        .context(format!("Pipeline failed for {:?}", document_path))?;

    FileManager::ensure_dir(output_dir)?;
    FileManager::save_ledger(FileManager::generate_output_path(document_path, output_dir, "anchored.ledger.json"), &output.ledger)?;
    FileManager::save_document(FileManager::generate_output_path(document_path, output_dir, "marked.doc.json"), &output.marked_document)?;
    FileManager::save_batch(FileManager::generate_output_path(document_path, output_dir, "segments.json"), &output.batch)?;
    FileManager::save_json(FileManager::generate_output_path(document_path, output_dir, "report.json"), &output.report)?;
    FileManager::save_document(&translated_path, &output.translated_document)?;

    info!("{}: {}", document_path.display(), output.report.summary());
    Ok(true)
}
