//! Entry composition pipeline.
//!
//! One [`Composition`] drives a single in-progress entry from capture through
//! optional enrichment to a persisted [`SymptomEntry`]. It runs as an actor:
//! the task owns all mutable state, [`CompositionHandle`]s send it commands,
//! and collaborator calls run on spawned tasks whose results are posted back
//! and applied in one step. Observers read [`CompositionSnapshot`]s from a
//! watch channel, so partially applied results are never visible.
//!
//! ```text
//! idle -> recording -> transcribing(p) -> ready(text) -> [summary|translate|attach]* -> saved
//!   \________________________________________ cancel ____________________________/
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{self, Interval, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::adapters::{
    AudioRecorder, CaptureError, Summarizer, SummaryError, Transcriber, TranscriptionError,
    TranslationError, Translator,
};
use crate::domain::{Attachment, EntrySource, Language, SymptomEntry, TranscriptionState};
use crate::storage::{Storage, StorageError};

/// Pending commands per composition before senders wait
const COMMAND_BUFFER: usize = 32;

/// Errors surfaced by composition commands
#[derive(Debug, Error)]
pub enum CompositionError {
    #[error("Entry text is empty")]
    EmptyText,

    #[error("{0} is already in progress")]
    AlreadyInFlight(&'static str),

    #[error("Cannot {action} while {state}")]
    InvalidTransition { action: &'static str, state: String },

    #[error("No attachment with id {0}")]
    UnknownAttachment(Uuid),

    #[error("Composition is closed")]
    Closed,

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Transcription(#[from] TranscriptionError),

    #[error(transparent)]
    Summary(#[from] SummaryError),

    #[error(transparent)]
    Translation(#[from] TranslationError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Simulated transcription progress while the backend works
#[derive(Debug, Clone)]
pub struct ProgressSettings {
    /// Time between progress ticks
    pub interval: Duration,

    /// Amount added per tick
    pub step: f64,

    /// Progress never passes this until the transcript arrives
    pub ceiling: f64,
}

impl Default for ProgressSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(100),
            step: 0.15,
            ceiling: 0.9,
        }
    }
}

/// Collaborators a composition talks to
#[derive(Clone)]
pub struct CompositionServices {
    pub storage: Arc<dyn Storage>,
    pub transcriber: Arc<dyn Transcriber>,
    pub summarizer: Arc<dyn Summarizer>,
    pub translator: Arc<dyn Translator>,
}

#[derive(Debug, Clone, Default)]
pub struct CompositionOptions {
    /// Initial language for the entry, summary, and translations
    pub language: Language,
    pub progress: ProgressSettings,
}

/// Lifecycle of a composition
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Editing,

    /// Persisted; the composition accepts no further commands
    Saved(SymptomEntry),

    /// Discarded without writing an entry
    Cancelled,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Editing)
    }
}

/// Everything an observer can see of a composition at one instant
#[derive(Debug, Clone)]
pub struct CompositionSnapshot {
    pub transcription: TranscriptionState,
    pub text: String,
    pub summary: String,
    pub language: Language,
    pub attachments: Vec<Attachment>,
    pub is_summarizing: bool,
    pub is_translating: bool,
    pub is_saving: bool,

    /// Last failed command, kept until dismissed
    pub error: Option<String>,
    pub phase: Phase,
}

impl CompositionSnapshot {
    fn new(language: Language) -> Self {
        Self {
            transcription: TranscriptionState::Idle,
            text: String::new(),
            summary: String::new(),
            language,
            attachments: Vec::new(),
            is_summarizing: false,
            is_translating: false,
            is_saving: false,
            error: None,
            phase: Phase::Editing,
        }
    }

    fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }

    pub fn can_save(&self) -> bool {
        self.phase == Phase::Editing && self.has_text() && !self.is_saving
    }

    pub fn can_generate_summary(&self) -> bool {
        self.phase == Phase::Editing && self.has_text() && !self.is_summarizing && !self.is_translating
    }

    pub fn can_translate(&self) -> bool {
        self.phase == Phase::Editing
            && self.has_text()
            && !self.is_translating
            && !self.is_summarizing
            && !self.transcription.is_transcribing()
    }

    /// Whether discarding would lose user input
    pub fn has_content(&self) -> bool {
        self.has_text() || !self.summary.is_empty() || !self.attachments.is_empty()
    }
}

type Reply<T> = oneshot::Sender<Result<T, CompositionError>>;

enum Command {
    StartRecording(Reply<()>),
    StopRecording(Reply<String>),
    SetText(String, Reply<()>),
    SetLanguage(Language, Reply<()>),
    GenerateSummary(Reply<String>),
    Translate(Reply<()>),
    AddAttachment {
        bytes: Vec<u8>,
        filename: String,
        reply: Reply<Attachment>,
    },
    RemoveAttachment {
        id: Uuid,
        reply: Reply<()>,
    },
    Save {
        source: EntrySource,
        reply: Reply<SymptomEntry>,
    },
    Cancel(Reply<()>),
    DismissError(Reply<()>),
}

/// Results of spawned collaborator calls, applied on the actor task
enum Completion {
    Transcribed {
        result: Result<String, TranscriptionError>,
        reply: Reply<String>,
    },
    Summarized {
        result: Result<String, SummaryError>,
        reply: Reply<String>,
    },
    Translated {
        result: Result<(String, Option<String>), TranslationError>,
        reply: Reply<()>,
    },
    AttachmentAdded {
        result: Result<Attachment, StorageError>,
        reply: Reply<Attachment>,
    },
    AttachmentRemoved {
        id: Uuid,
        result: Result<(), StorageError>,
        reply: Reply<()>,
    },
    Saved {
        entry: SymptomEntry,
        result: Result<(), StorageError>,
        reply: Reply<SymptomEntry>,
    },
}

/// The actor owning one in-progress entry
pub struct Composition {
    services: CompositionServices,
    recorder: Box<dyn AudioRecorder>,
    progress: ProgressSettings,
    state: CompositionSnapshot,
    snapshots: watch::Sender<CompositionSnapshot>,
    completions: mpsc::UnboundedSender<Completion>,
}

impl Composition {
    /// Start a composition on the current runtime and return its handle
    pub fn spawn(
        services: CompositionServices,
        recorder: Box<dyn AudioRecorder>,
        options: CompositionOptions,
    ) -> CompositionHandle {
        let state = CompositionSnapshot::new(options.language);
        let (snapshot_tx, snapshot_rx) = watch::channel(state.clone());
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();

        let actor = Self {
            services,
            recorder,
            progress: options.progress,
            state,
            snapshots: snapshot_tx,
            completions: completion_tx,
        };
        tokio::spawn(actor.run(command_rx, completion_rx));

        CompositionHandle {
            commands: command_tx,
            snapshots: snapshot_rx,
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<Command>,
        mut completions: mpsc::UnboundedReceiver<Completion>,
    ) {
        let mut ticker = time::interval(self.progress.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        debug!("Composition started");

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command, &mut ticker).await,
                    None => {
                        debug!("All handles dropped, discarding composition");
                        if self.state.transcription.is_recording() {
                            self.recorder.discard().await;
                        }
                        break;
                    }
                },
                Some(completion) = completions.recv() => self.handle_completion(completion),
                _ = ticker.tick(), if self.state.transcription.is_transcribing() => {
                    self.advance_progress();
                }
            }

            if self.state.phase.is_terminal() {
                break;
            }
        }

        // Results still in flight land on a closed channel and are dropped
        debug!(phase = ?self.state.phase, "Composition finished");
    }

    async fn handle_command(&mut self, command: Command, ticker: &mut Interval) {
        if self.state.phase.is_terminal() {
            reply_closed(command);
            return;
        }

        match command {
            Command::StartRecording(reply) => {
                let result = self.start_recording().await;
                let _ = reply.send(result);
            }
            Command::StopRecording(reply) => self.stop_recording(reply, ticker).await,
            Command::SetText(text, reply) => {
                if self.state.is_translating {
                    let _ = reply.send(Err(CompositionError::AlreadyInFlight("Translation")));
                    return;
                }
                self.state.text = text;
                self.publish();
                let _ = reply.send(Ok(()));
            }
            Command::SetLanguage(language, reply) => {
                self.state.language = language;
                self.publish();
                let _ = reply.send(Ok(()));
            }
            Command::GenerateSummary(reply) => self.generate_summary(reply),
            Command::Translate(reply) => self.translate(reply),
            Command::AddAttachment {
                bytes,
                filename,
                reply,
            } => self.add_attachment(bytes, filename, reply),
            Command::RemoveAttachment { id, reply } => self.remove_attachment(id, reply),
            Command::Save { source, reply } => self.save(source, reply),
            Command::Cancel(reply) => {
                if self.state.transcription.is_recording() {
                    self.recorder.discard().await;
                }
                info!(
                    orphaned_attachments = self.state.attachments.len(),
                    "Composition cancelled"
                );
                self.state.transcription = TranscriptionState::Idle;
                self.state.phase = Phase::Cancelled;
                self.publish();
                let _ = reply.send(Ok(()));
            }
            Command::DismissError(reply) => {
                self.state.error = None;
                if self.state.transcription.error_message().is_some() {
                    self.state.transcription = TranscriptionState::Idle;
                }
                self.publish();
                let _ = reply.send(Ok(()));
            }
        }
    }

    async fn start_recording(&mut self) -> Result<(), CompositionError> {
        if self.state.transcription.is_recording() {
            return Ok(());
        }
        if !self.state.transcription.can_start_recording() {
            return Err(self.invalid("start recording"));
        }

        if let Err(e) = self.recorder.start().await {
            warn!(error = %e, "Failed to start recording");
            self.state.transcription = TranscriptionState::Error {
                message: e.to_string(),
            };
            self.publish();
            return Err(e.into());
        }

        info!("Recording started");
        self.state.transcription = TranscriptionState::Recording;
        self.publish();
        Ok(())
    }

    #[instrument(skip_all)]
    async fn stop_recording(&mut self, reply: Reply<String>, ticker: &mut Interval) {
        if !self.state.transcription.is_recording() {
            let _ = reply.send(Err(self.invalid("stop recording")));
            return;
        }
        // The transcript replaces the text, which a translation is about to replace too
        if self.state.is_translating {
            let _ = reply.send(Err(CompositionError::AlreadyInFlight("Translation")));
            return;
        }

        let audio = match self.recorder.stop().await {
            Ok(audio) => audio,
            Err(e) => {
                warn!(error = %e, "Failed to read recording");
                self.state.transcription = TranscriptionState::Error {
                    message: e.to_string(),
                };
                self.publish();
                let _ = reply.send(Err(e.into()));
                return;
            }
        };

        info!(bytes = audio.len(), "Recording stopped, transcribing");
        self.state.transcription = TranscriptionState::Transcribing { progress: 0.0 };
        self.publish();
        ticker.reset();

        let transcriber = Arc::clone(&self.services.transcriber);
        self.spawn_task(async move {
            let result = transcriber.transcribe(&audio).await;
            Completion::Transcribed { result, reply }
        });
    }

    fn generate_summary(&mut self, reply: Reply<String>) {
        if self.state.is_summarizing {
            let _ = reply.send(Err(CompositionError::AlreadyInFlight("Summary generation")));
            return;
        }
        if self.state.is_translating {
            let _ = reply.send(Err(CompositionError::AlreadyInFlight("Translation")));
            return;
        }
        if !self.state.has_text() {
            let _ = reply.send(Err(CompositionError::EmptyText));
            return;
        }

        self.state.is_summarizing = true;
        self.publish();

        let summarizer = Arc::clone(&self.services.summarizer);
        let text = self.state.text.clone();
        let language = self.state.language;
        self.spawn_task(async move {
            let result = summarizer.summarize(&text, language).await;
            Completion::Summarized { result, reply }
        });
    }

    fn translate(&mut self, reply: Reply<()>) {
        if self.state.is_translating {
            let _ = reply.send(Err(CompositionError::AlreadyInFlight("Translation")));
            return;
        }
        // Results landing mid-flight would be overwritten by the translation
        if self.state.is_summarizing {
            let _ = reply.send(Err(CompositionError::AlreadyInFlight("Summary generation")));
            return;
        }
        if self.state.transcription.is_transcribing() {
            let _ = reply.send(Err(self.invalid("translate")));
            return;
        }
        if !self.state.has_text() {
            let _ = reply.send(Err(CompositionError::EmptyText));
            return;
        }

        self.state.is_translating = true;
        self.publish();

        let translator = Arc::clone(&self.services.translator);
        let text = self.state.text.clone();
        let summary = Some(self.state.summary.clone()).filter(|s| !s.is_empty());
        let target = self.state.language;
        self.spawn_task(async move {
            let result = translate_together(translator.as_ref(), &text, summary.as_deref(), target).await;
            Completion::Translated { result, reply }
        });
    }

    fn add_attachment(&mut self, bytes: Vec<u8>, filename: String, reply: Reply<Attachment>) {
        // The entry being saved was built without it
        if self.state.is_saving {
            let _ = reply.send(Err(CompositionError::AlreadyInFlight("Save")));
            return;
        }

        let storage = Arc::clone(&self.services.storage);
        self.spawn_task(async move {
            let result = storage.save_attachment(&bytes, &filename).await;
            Completion::AttachmentAdded { result, reply }
        });
    }

    fn remove_attachment(&mut self, id: Uuid, reply: Reply<()>) {
        if self.state.is_saving {
            let _ = reply.send(Err(CompositionError::AlreadyInFlight("Save")));
            return;
        }
        let Some(attachment) = self.state.attachments.iter().find(|a| a.id == id).cloned() else {
            let _ = reply.send(Err(CompositionError::UnknownAttachment(id)));
            return;
        };

        let storage = Arc::clone(&self.services.storage);
        self.spawn_task(async move {
            let result = storage.delete_attachment(&attachment).await;
            Completion::AttachmentRemoved { id, result, reply }
        });
    }

    fn save(&mut self, source: EntrySource, reply: Reply<SymptomEntry>) {
        if self.state.is_saving {
            let _ = reply.send(Err(CompositionError::AlreadyInFlight("Save")));
            return;
        }
        if !self.state.has_text() {
            let _ = reply.send(Err(CompositionError::EmptyText));
            return;
        }

        let entry = SymptomEntry::new(source, self.state.text.clone(), self.state.language)
            .with_summary(self.state.summary.clone())
            .with_attachments(self.state.attachments.clone());

        self.state.is_saving = true;
        self.publish();

        let storage = Arc::clone(&self.services.storage);
        self.spawn_task(async move {
            let result = storage.save_entry(&entry).await;
            Completion::Saved {
                entry,
                result,
                reply,
            }
        });
    }

    fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Transcribed { result, reply } => {
                let outcome = match result {
                    Ok(text) => {
                        info!(chars = text.len(), "Transcription ready");
                        self.state.text = text.clone();
                        self.state.transcription = TranscriptionState::Ready { text: text.clone() };
                        Ok(text)
                    }
                    Err(e) => {
                        warn!(error = %e, "Transcription failed");
                        self.state.transcription = TranscriptionState::Error {
                            message: e.to_string(),
                        };
                        Err(e.into())
                    }
                };
                self.publish();
                let _ = reply.send(outcome);
            }
            Completion::Summarized { result, reply } => {
                self.state.is_summarizing = false;
                let outcome = match result {
                    Ok(summary) => {
                        self.state.summary = summary.clone();
                        Ok(summary)
                    }
                    Err(e) => Err(self.surface(e.into())),
                };
                self.publish();
                let _ = reply.send(outcome);
            }
            Completion::Translated { result, reply } => {
                self.state.is_translating = false;
                let outcome = match result {
                    Ok((text, summary)) => {
                        self.state.text = text;
                        if let Some(summary) = summary {
                            self.state.summary = summary;
                        }
                        Ok(())
                    }
                    Err(e) => Err(self.surface(e.into())),
                };
                self.publish();
                let _ = reply.send(outcome);
            }
            Completion::AttachmentAdded { result, reply } => {
                let outcome = match result {
                    Ok(attachment) => {
                        self.state.attachments.push(attachment.clone());
                        Ok(attachment)
                    }
                    Err(e) => Err(self.surface(e.into())),
                };
                self.publish();
                let _ = reply.send(outcome);
            }
            Completion::AttachmentRemoved { id, result, reply } => {
                let outcome = match result {
                    Ok(()) => {
                        self.state.attachments.retain(|a| a.id != id);
                        Ok(())
                    }
                    Err(e) => Err(self.surface(e.into())),
                };
                self.publish();
                let _ = reply.send(outcome);
            }
            Completion::Saved {
                entry,
                result,
                reply,
            } => {
                self.state.is_saving = false;
                let outcome = match result {
                    Ok(()) => {
                        info!(id = %entry.id, source = %entry.source, "Entry saved");
                        self.state.transcription = TranscriptionState::Idle;
                        self.state.phase = Phase::Saved(entry.clone());
                        Ok(entry)
                    }
                    Err(e) => Err(self.surface(e.into())),
                };
                self.publish();
                let _ = reply.send(outcome);
            }
        }
    }

    fn advance_progress(&mut self) {
        if let TranscriptionState::Transcribing { progress } = &mut self.state.transcription {
            *progress = (*progress + self.progress.step).min(self.progress.ceiling);
            self.publish();
        }
    }

    /// Record a failure in the snapshot and hand it back for the reply
    fn surface(&mut self, error: CompositionError) -> CompositionError {
        warn!(error = %error, "Composition command failed");
        self.state.error = Some(error.to_string());
        error
    }

    fn invalid(&self, action: &'static str) -> CompositionError {
        CompositionError::InvalidTransition {
            action,
            state: self.state.transcription.label().to_string(),
        }
    }

    fn spawn_task<F>(&self, task: F)
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        let completions = self.completions.clone();
        tokio::spawn(async move {
            let _ = completions.send(task.await);
        });
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.state.clone());
    }
}

/// Translate the text and, if present, the summary; both or neither succeed
async fn translate_together(
    translator: &dyn Translator,
    text: &str,
    summary: Option<&str>,
    target: Language,
) -> Result<(String, Option<String>), TranslationError> {
    match summary {
        Some(summary) => {
            let (text, summary) = tokio::try_join!(
                translator.translate(text, target),
                translator.translate(summary, target)
            )?;
            Ok((text, Some(summary)))
        }
        None => Ok((translator.translate(text, target).await?, None)),
    }
}

fn reply_closed(command: Command) {
    fn closed<T>(reply: Reply<T>) {
        let _ = reply.send(Err(CompositionError::Closed));
    }

    match command {
        Command::StartRecording(reply)
        | Command::SetText(_, reply)
        | Command::SetLanguage(_, reply)
        | Command::Translate(reply)
        | Command::Cancel(reply)
        | Command::DismissError(reply)
        | Command::RemoveAttachment { reply, .. } => closed(reply),
        Command::StopRecording(reply) | Command::GenerateSummary(reply) => closed(reply),
        Command::AddAttachment { reply, .. } => closed(reply),
        Command::Save { reply, .. } => closed(reply),
    }
}

/// Cloneable handle for sending commands to a running composition.
///
/// Enrichment commands resolve when their collaborator call finishes; the
/// composition keeps serving other commands in the meantime.
#[derive(Clone)]
pub struct CompositionHandle {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<CompositionSnapshot>,
}

impl CompositionHandle {
    async fn request<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, CompositionError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| CompositionError::Closed)?;
        response.await.map_err(|_| CompositionError::Closed)?
    }

    /// Begin audio capture (no-op while already recording)
    pub async fn start_recording(&self) -> Result<(), CompositionError> {
        self.request(Command::StartRecording).await
    }

    /// Stop capture and wait for the transcript
    pub async fn stop_recording(&self) -> Result<String, CompositionError> {
        self.request(Command::StopRecording).await
    }

    pub async fn set_text(&self, text: impl Into<String>) -> Result<(), CompositionError> {
        let text = text.into();
        self.request(|reply| Command::SetText(text, reply)).await
    }

    pub async fn set_language(&self, language: Language) -> Result<(), CompositionError> {
        self.request(|reply| Command::SetLanguage(language, reply)).await
    }

    pub async fn generate_summary(&self) -> Result<String, CompositionError> {
        self.request(Command::GenerateSummary).await
    }

    /// Translate the working text and summary into the selected language
    pub async fn translate(&self) -> Result<(), CompositionError> {
        self.request(Command::Translate).await
    }

    pub async fn add_attachment(
        &self,
        bytes: Vec<u8>,
        filename: impl Into<String>,
    ) -> Result<Attachment, CompositionError> {
        let filename = filename.into();
        self.request(|reply| Command::AddAttachment {
            bytes,
            filename,
            reply,
        })
        .await
    }

    pub async fn remove_attachment(&self, id: Uuid) -> Result<(), CompositionError> {
        self.request(|reply| Command::RemoveAttachment { id, reply })
            .await
    }

    /// Persist the entry; on success the composition is finished
    pub async fn save(&self, source: EntrySource) -> Result<SymptomEntry, CompositionError> {
        self.request(|reply| Command::Save { source, reply }).await
    }

    /// Discard the composition without writing an entry
    pub async fn cancel(&self) -> Result<(), CompositionError> {
        self.request(Command::Cancel).await
    }

    pub async fn dismiss_error(&self) -> Result<(), CompositionError> {
        self.request(Command::DismissError).await
    }

    /// Current state
    pub fn snapshot(&self) -> CompositionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<CompositionSnapshot> {
        self.snapshots.clone()
    }

    /// Wait until a snapshot satisfies `predicate`
    pub async fn wait_for(
        &self,
        mut predicate: impl FnMut(&CompositionSnapshot) -> bool,
    ) -> Result<CompositionSnapshot, CompositionError> {
        let mut snapshots = self.snapshots.clone();
        let snapshot = snapshots
            .wait_for(|snapshot| predicate(snapshot))
            .await
            .map_err(|_| CompositionError::Closed)?;
        Ok(snapshot.clone())
    }

    /// Wait for the composition to finish: the saved entry, or `None` if cancelled
    pub async fn completed(&self) -> Result<Option<SymptomEntry>, CompositionError> {
        let snapshot = self.wait_for(|s| s.phase.is_terminal()).await?;
        match snapshot.phase {
            Phase::Saved(entry) => Ok(Some(entry)),
            Phase::Cancelled | Phase::Editing => Ok(None),
        }
    }
}
