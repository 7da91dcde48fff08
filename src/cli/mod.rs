//! Command-line interface for symi.
//!
//! Provides commands for composing entries, browsing history, generating
//! doctor reports, and managing settings.

use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::adapters::{
    AudioRecorder, FabricAdapter, FileRecorder, MockSummarizer, MockTranscriber, MockTranslator,
    WhisperTranscriber,
};
use crate::config::{self, Backend, ResolvedConfig};
use crate::core::{
    Composition, CompositionHandle, CompositionOptions, CompositionServices, ReportBuilder,
};
use crate::domain::{EntrySource, Language, SymptomEntry};
use crate::storage::settings::keys;
use crate::storage::{CloudStore, LocalStore, Storage};

pub mod settings;

/// symi - Symptom journal for doctor visits
#[derive(Parser, Debug)]
#[command(name = "symi")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compose and save a new entry
    New {
        /// Entry text (reads from stdin if neither --text nor --audio is given)
        #[arg(short, long, conflicts_with = "audio")]
        text: Option<String>,

        /// Audio file to transcribe as a voice entry
        #[arg(short, long)]
        audio: Option<PathBuf>,

        /// Generate an AI summary before saving
        #[arg(short, long)]
        summarize: bool,

        /// Translate text and summary into the entry language before saving
        #[arg(long)]
        translate: bool,

        /// Files to attach (repeatable)
        #[arg(long = "attach")]
        attachments: Vec<PathBuf>,

        /// Entry language (en, zh, es, fr); defaults to the stored setting
        #[arg(short, long)]
        language: Option<Language>,
    },

    /// List saved entries, newest first
    History {
        /// Only show entries whose text or summary contains this
        #[arg(short, long)]
        search: Option<String>,

        /// Maximum number of entries to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show one entry in full
    Show {
        /// Entry ID (or unique prefix)
        entry_id: String,
    },

    /// Delete an entry and its attachments
    Delete {
        /// Entry ID (or unique prefix)
        entry_id: String,
    },

    /// Generate a doctor report from all entries
    Report {
        /// Keep the report in report history
        #[arg(long)]
        save: bool,
    },

    /// List saved reports
    Reports {
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Read or change settings
    Settings {
        #[command(subcommand)]
        command: settings::SettingsCommands,
    },

    /// Delete every entry, report, setting, and attachment
    Clear {
        /// Skip the safety check
        #[arg(long)]
        yes: bool,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let cfg = config::config()?;
        let local = Arc::new(
            LocalStore::open(&cfg.home)
                .await
                .with_context(|| format!("Failed to open data directory {}", cfg.home.display()))?,
        );

        match self.command {
            Commands::New {
                text,
                audio,
                summarize,
                translate,
                attachments,
                language,
            } => {
                let request = NewEntry {
                    text,
                    audio,
                    summarize,
                    translate,
                    attachments,
                    language,
                };
                new_entry(cfg, local, request).await
            }
            Commands::History { search, limit } => {
                let storage = open_storage(&local).await;
                list_history(storage.as_ref(), search.as_deref(), limit).await
            }
            Commands::Show { entry_id } => {
                let storage = open_storage(&local).await;
                show_entry(storage.as_ref(), &entry_id).await
            }
            Commands::Delete { entry_id } => {
                let storage = open_storage(&local).await;
                delete_entry(storage.as_ref(), &entry_id).await
            }
            Commands::Report { save } => {
                let storage = open_storage(&local).await;
                generate_report(storage.as_ref(), save).await
            }
            Commands::Reports { limit } => {
                let storage = open_storage(&local).await;
                list_reports(storage.as_ref(), limit).await
            }
            Commands::Settings { command } => match command {
                settings::SettingsCommands::Get { key } => {
                    settings::execute_get(&local, key.as_deref()).await
                }
                settings::SettingsCommands::Set { key, value } => {
                    settings::execute_set(&local, &key, &value).await
                }
            },
            Commands::Clear { yes } => clear_all(local.as_ref(), yes).await,
            Commands::Config => show_config(cfg),
        }
    }
}

/// Arguments of `symi new`
struct NewEntry {
    text: Option<String>,
    audio: Option<PathBuf>,
    summarize: bool,
    translate: bool,
    attachments: Vec<PathBuf>,
    language: Option<Language>,
}

/// Pick the storage backend from the `cloud_storage_enabled` setting
async fn open_storage(local: &Arc<LocalStore>) -> Arc<dyn Storage> {
    let cloud = local
        .settings()
        .get::<bool>(keys::CLOUD_STORAGE_ENABLED)
        .await
        .unwrap_or(false);

    if cloud {
        Arc::new(CloudStore::new())
    } else {
        Arc::clone(local) as Arc<dyn Storage>
    }
}

/// Wire collaborators for the configured backend
fn build_services(
    cfg: &ResolvedConfig,
    storage: Arc<dyn Storage>,
    language: Language,
) -> CompositionServices {
    match cfg.backend {
        Backend::Mock => CompositionServices {
            storage,
            transcriber: Arc::new(MockTranscriber::new()),
            summarizer: Arc::new(MockSummarizer::new()),
            translator: Arc::new(MockTranslator::new()),
        },
        Backend::Local => {
            let fabric = Arc::new(FabricAdapter::from_settings(&cfg.fabric));
            CompositionServices {
                storage,
                transcriber: Arc::new(
                    WhisperTranscriber::from_settings(&cfg.whisper).with_language(language),
                ),
                summarizer: fabric.clone(),
                translator: fabric,
            }
        }
    }
}

/// Compose, enrich, and save one entry
async fn new_entry(cfg: &ResolvedConfig, local: Arc<LocalStore>, request: NewEntry) -> Result<()> {
    let language = match request.language {
        Some(language) => language,
        None => local
            .settings()
            .get::<Language>(keys::LANGUAGE)
            .await
            .unwrap_or(cfg.language),
    };

    let storage = open_storage(&local).await;
    let services = build_services(cfg, storage, language);
    let recorder: Box<dyn AudioRecorder> = match &request.audio {
        Some(path) => Box::new(FileRecorder::new(path)),
        // Text entries never start a capture
        None => Box::new(FileRecorder::new(PathBuf::new())),
    };
    let options = CompositionOptions {
        language,
        progress: cfg.progress.clone(),
    };

    let handle = Composition::spawn(services, recorder, options);

    match compose(&handle, &request).await {
        Ok(entry) => {
            println!("Saved entry {}", entry.id);
            print_entry(&entry);
            Ok(())
        }
        Err(e) => {
            // Blobs already written for this composition stay on disk
            let _ = handle.cancel().await;
            Err(e)
        }
    }
}

async fn compose(handle: &CompositionHandle, request: &NewEntry) -> Result<SymptomEntry> {
    let source = match &request.audio {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Audio file not found: {}", path.display());
            }
            handle.start_recording().await?;
            let progress = tokio::spawn(report_progress(handle.clone()));
            let transcript = handle.stop_recording().await;
            progress.abort();
            let transcript = transcript.context("Transcription failed")?;
            eprintln!("\nTranscript: {}", transcript);
            EntrySource::Voice
        }
        None => {
            let text = match &request.text {
                Some(text) => text.clone(),
                None => read_stdin()?,
            };
            handle.set_text(text).await?;
            EntrySource::Text
        }
    };

    for path in &request.attachments {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read attachment: {}", path.display()))?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "attachment".to_string());
        let attachment = handle.add_attachment(bytes, filename).await?;
        eprintln!("Attached {} ({})", attachment.filename, attachment.kind.display_name());
    }

    if request.summarize {
        eprintln!("Generating summary...");
        handle.generate_summary().await.context("Summary generation failed")?;
    }

    if request.translate {
        eprintln!("Translating...");
        handle.translate().await.context("Translation failed")?;
    }

    let entry = handle.save(source).await.context("Failed to save entry")?;
    Ok(entry)
}

/// Print transcription progress until aborted
async fn report_progress(handle: CompositionHandle) {
    let mut snapshots = handle.subscribe();
    while snapshots.changed().await.is_ok() {
        let progress = snapshots.borrow_and_update().transcription.progress();
        if let Some(progress) = progress {
            eprint!("\rTranscribing... {:>3.0}%", progress * 100.0);
        }
    }
}

fn read_stdin() -> Result<String> {
    if io::stdin().is_terminal() {
        anyhow::bail!("No input provided. Use --text, --audio <file>, or pipe text to stdin");
    }

    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .context("Failed to read from stdin")?;
    Ok(buffer.trim().to_string())
}

/// Resolve a full ID or unique prefix against the stored entries
async fn find_entry(storage: &dyn Storage, id_or_prefix: &str) -> Result<SymptomEntry> {
    let entries = storage.load_entries().await?;

    if let Ok(id) = Uuid::parse_str(id_or_prefix) {
        return entries
            .into_iter()
            .find(|entry| entry.id == id)
            .with_context(|| format!("Entry not found: {}", id_or_prefix));
    }

    let mut matches: Vec<_> = entries
        .into_iter()
        .filter(|entry| entry.id.to_string().starts_with(id_or_prefix))
        .collect();

    match matches.len() {
        0 => anyhow::bail!("Entry not found: {}", id_or_prefix),
        1 => Ok(matches.remove(0)),
        n => anyhow::bail!("{} entries match '{}', use a longer prefix", n, id_or_prefix),
    }
}

async fn list_history(storage: &dyn Storage, search: Option<&str>, limit: usize) -> Result<()> {
    let entries: Vec<_> = storage
        .load_entries()
        .await?
        .into_iter()
        .filter(|entry| search.map_or(true, |query| entry.matches(query)))
        .take(limit)
        .collect();

    if entries.is_empty() {
        println!("No entries found");
        return Ok(());
    }

    println!("{:<10} {:<18} {:<6} {:<4} {}", "ID", "CREATED", "SOURCE", "ATT", "TEXT");
    println!("{}", "-".repeat(80));

    for entry in entries {
        let preview: String = entry.raw_text.chars().take(40).collect();
        println!(
            "{:<10} {:<18} {:<6} {:<4} {}",
            &entry.id.to_string()[..8],
            entry.created_at.format("%Y-%m-%d %H:%M"),
            entry.source,
            entry.attachments.len(),
            preview.replace('\n', " ")
        );
    }

    Ok(())
}

fn print_entry(entry: &SymptomEntry) {
    println!("ID:       {}", entry.id);
    println!("Created:  {}", entry.created_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("Source:   {}", entry.source.display_name());
    println!("Language: {}", entry.language.display_name());
    println!();
    println!("{}", entry.raw_text);

    if let Some(summary) = &entry.ai_summary {
        println!();
        println!("AI summary:");
        println!("{}", summary);
    }

    if !entry.attachments.is_empty() {
        println!();
        println!("Attachments:");
        for attachment in &entry.attachments {
            println!(
                "  {} [{}] {}",
                attachment.filename,
                attachment.kind.display_name(),
                attachment.local_path.display()
            );
        }
    }
}

async fn show_entry(storage: &dyn Storage, id: &str) -> Result<()> {
    let entry = find_entry(storage, id).await?;
    print_entry(&entry);
    Ok(())
}

async fn delete_entry(storage: &dyn Storage, id: &str) -> Result<()> {
    let entry = find_entry(storage, id).await?;
    storage
        .delete_entry(entry.id)
        .await
        .with_context(|| format!("Failed to delete entry {}", entry.id))?;

    println!(
        "Deleted entry {} ({} attachment(s))",
        entry.id,
        entry.attachments.len()
    );
    Ok(())
}

async fn generate_report(storage: &dyn Storage, save: bool) -> Result<()> {
    let entries = storage.load_entries().await?;
    let report = ReportBuilder::new().generate(&entries);

    print!("{}", report.to_markdown());

    if save {
        storage
            .save_report(&report)
            .await
            .context("Failed to save report")?;
        eprintln!("\n[Report {} saved]", report.id);
    }

    Ok(())
}

async fn list_reports(storage: &dyn Storage, limit: usize) -> Result<()> {
    let reports = storage.load_reports().await?;

    if reports.is_empty() {
        println!("No reports found");
        return Ok(());
    }

    println!("{:<38} {:<18} {}", "REPORT ID", "GENERATED", "ENTRIES");
    println!("{}", "-".repeat(66));

    for report in reports.into_iter().take(limit) {
        println!(
            "{:<38} {:<18} {}",
            report.id,
            report.generated_at.format("%Y-%m-%d %H:%M"),
            report.entry_ids.len()
        );
    }

    Ok(())
}

async fn clear_all(local: &LocalStore, yes: bool) -> Result<()> {
    if !yes {
        anyhow::bail!(
            "This deletes all entries, reports, settings, and attachments in {}. Re-run with --yes",
            local.root().display()
        );
    }

    local.clear_all().await.context("Failed to clear data")?;
    println!("All data cleared");
    Ok(())
}

/// Show resolved configuration
fn show_config(cfg: &ResolvedConfig) -> Result<()> {
    println!("symi configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:        {}", cfg.home.display());
    println!("  Entries:     {}", config::paths::entries_file_in(&cfg.home).display());
    println!("  Reports:     {}", config::paths::reports_file_in(&cfg.home).display());
    println!("  Settings:    {}", config::paths::settings_file_in(&cfg.home).display());
    println!("  Attachments: {}", config::paths::attachments_dir_in(&cfg.home).display());
    println!();
    println!("Backend:  {:?}", cfg.backend);
    println!("Language: {}", cfg.language.display_name());
    println!();
    println!("Transcription:");
    println!("  Whisper:  {}", cfg.whisper.binary);
    println!("  Model:    {}", cfg.whisper.model);
    println!(
        "  Progress: +{} every {}ms (max {})",
        cfg.progress.step,
        cfg.progress.interval.as_millis(),
        cfg.progress.ceiling
    );
    println!();
    println!("Fabric:");
    println!(
        "  Binary:   {}",
        cfg.fabric.binary.as_deref().unwrap_or("(auto-detect)")
    );
    println!("  Summary:  {}", cfg.fabric.summary_pattern);
    println!("  Translate: {}", cfg.fabric.translate_pattern);
    println!("  Timeout:  {}s", cfg.fabric.timeout.as_secs());

    Ok(())
}
