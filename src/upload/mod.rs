//! # Upload Widget
//!
//! Floor plan intake and the simulated analysis progress that follows it.
//!
//! ## State Machine
//! - `Idle`: nothing selected, dropzone visible
//! - `Reading`: file handed to the read step, waiting for its data URL
//! - `Analyzing`: progress advances by a fixed step on every tick
//! - `Complete`: progress is 100, redirect timer armed
//!
//! ## Generations
//! Every accepted file bumps the generation. Reads, ticks and redirects carry the
//! generation that started them, anything older than the current one is dropped.
//! This is what keeps a replaced file's late read or leftover tick from touching
//! the new upload.
use std::{path::PathBuf, sync::Arc, time::Duration};

use thiserror::Error;
use tracing::{debug, info, warn};

pub mod driver;
pub mod encode;

pub use driver::UploadDriver;
pub use encode::{data_url, has_accepted_extension, is_accepted_mime};

use crate::constants::{SIGNED_IN_PROMPT, SIGNED_OUT_PROMPT, SIZE_HELP, Timing};

#[derive(Error, Debug)]
pub enum ReadFailure {
    #[error("Failed to read {name}: {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    Memory(Arc<[u8]>),
    Path(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    name: String,
    mime_type: String,
    source: FileSource,
}

impl FileHandle {
    pub fn from_bytes(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            source: FileSource::Memory(Arc::from(bytes.into())),
        }
    }

    /// MIME type is guessed from the extension, empty when unknown.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime_type = encode::mime_for_name(&name).to_string();

        Self {
            name,
            mime_type,
            source: FileSource::Path(path),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Reading,
    Analyzing,
    Complete,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UploadSession {
    pub file: Option<FileHandle>,
    pub is_dragging: bool,
    pub progress: u8,
}

#[derive(Debug)]
pub enum Event {
    DragOver,
    DragLeave,
    Drop(Vec<FileHandle>),
    Pick(Vec<FileHandle>),
    ReadFinished {
        generation: u64,
        result: Result<String, ReadFailure>,
    },
    Tick {
        generation: u64,
    },
    RedirectDue {
        generation: u64,
    },
    Unmount,
}

/// Side effects the host must perform on behalf of the widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Read { generation: u64, file: FileHandle },
    StartTicker { generation: u64, period: Duration },
    StopTicker,
    ScheduleRedirect { generation: u64, delay: Duration },
    CancelRedirect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Dropzone {
        dragging: bool,
        input_enabled: bool,
        prompt: &'static str,
        help: &'static str,
    },
    Status {
        file_name: String,
        progress: u8,
        complete: bool,
        status_text: String,
    },
}

pub type OnComplete = Box<dyn FnMut(String) + Send>;

pub struct Upload {
    signed_in: bool,
    timing: Timing,
    session: UploadSession,
    phase: Phase,
    generation: u64,
    encoded: Option<String>,
    ticker_armed: bool,
    redirect_armed: bool,
    completed: bool,
    mounted: bool,
    on_complete: Option<OnComplete>,
}

impl Upload {
    pub fn new(signed_in: bool) -> Self {
        Self {
            signed_in,
            timing: Timing::default(),
            session: UploadSession::default(),
            phase: Phase::Idle,
            generation: 0,
            encoded: None,
            ticker_armed: false,
            redirect_armed: false,
            completed: false,
            mounted: true,
            on_complete: None,
        }
    }

    pub fn with_timing(mut self, timing: Timing) -> Self {
        self.timing = timing;
        self
    }

    pub fn on_complete(mut self, callback: impl FnMut(String) + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    pub fn set_signed_in(&mut self, signed_in: bool) {
        self.signed_in = signed_in;
    }

    pub fn is_signed_in(&self) -> bool {
        self.signed_in
    }

    pub fn session(&self) -> &UploadSession {
        &self.session
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn progress(&self) -> u8 {
        self.session.progress
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    /// True once `onComplete` has fired for the current file.
    pub fn has_completed(&self) -> bool {
        self.completed
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn handle(&mut self, event: Event) -> Vec<Command> {
        if !self.mounted {
            return Vec::new();
        }

        match event {
            Event::DragOver => {
                if self.signed_in {
                    self.session.is_dragging = true;
                }
                Vec::new()
            }
            Event::DragLeave => {
                self.session.is_dragging = false;
                Vec::new()
            }
            Event::Drop(files) => self.drop_files(files),
            Event::Pick(files) => self.pick_files(files),
            Event::ReadFinished { generation, result } => self.read_finished(generation, result),
            Event::Tick { generation } => self.tick(generation),
            Event::RedirectDue { generation } => self.redirect(generation),
            Event::Unmount => self.unmount(),
        }
    }

    pub fn view(&self) -> View {
        match &self.session.file {
            None => View::Dropzone {
                dragging: self.session.is_dragging,
                input_enabled: self.signed_in,
                prompt: if self.signed_in {
                    SIGNED_IN_PROMPT
                } else {
                    SIGNED_OUT_PROMPT
                },
                help: SIZE_HELP,
            },
            Some(file) => {
                let progress = self.session.progress;
                let status_text = if progress < 100 {
                    format!("Analyzing Floor Plan... {progress}%")
                } else {
                    "Redirecting...".to_string()
                };

                View::Status {
                    file_name: file.name.clone(),
                    progress,
                    complete: progress == 100,
                    status_text,
                }
            }
        }
    }

    fn drop_files(&mut self, files: Vec<FileHandle>) -> Vec<Command> {
        self.session.is_dragging = false;

        if !self.signed_in {
            return Vec::new();
        }

        match files.into_iter().next() {
            Some(file) if is_accepted_mime(&file.mime_type) => self.process_file(file),
            Some(file) => {
                debug!(name = %file.name, mime = %file.mime_type, "Rejected dropped file");
                Vec::new()
            }
            None => Vec::new(),
        }
    }

    // The picker's accept filter already narrowed the choice, nothing else is checked here.
    fn pick_files(&mut self, files: Vec<FileHandle>) -> Vec<Command> {
        if !self.signed_in {
            return Vec::new();
        }

        match files.into_iter().next() {
            Some(file) => self.process_file(file),
            None => Vec::new(),
        }
    }

    fn process_file(&mut self, file: FileHandle) -> Vec<Command> {
        let mut commands = self.cancel_timers();

        self.generation += 1;
        self.encoded = None;
        self.completed = false;
        self.session.file = Some(file.clone());
        self.session.progress = 0;
        self.phase = Phase::Reading;

        info!(name = %file.name, generation = self.generation, "Reading floor plan");

        commands.push(Command::Read {
            generation: self.generation,
            file,
        });
        commands
    }

    fn read_finished(
        &mut self,
        generation: u64,
        result: Result<String, ReadFailure>,
    ) -> Vec<Command> {
        if generation != self.generation || self.phase != Phase::Reading {
            debug!(generation, current = self.generation, "Ignoring stale read");
            return Vec::new();
        }

        match result {
            Ok(encoded) => {
                self.encoded = Some(encoded);
                self.phase = Phase::Analyzing;
                self.ticker_armed = true;

                vec![Command::StartTicker {
                    generation,
                    period: self.timing.interval,
                }]
            }
            Err(e) => {
                warn!("Failed to read floor plan, resetting upload: {e}");
                self.reset();
                Vec::new()
            }
        }
    }

    fn tick(&mut self, generation: u64) -> Vec<Command> {
        if generation != self.generation || self.phase != Phase::Analyzing {
            return Vec::new();
        }

        let next = self
            .session
            .progress
            .saturating_add(self.timing.step.max(1))
            .min(100);
        self.session.progress = next;

        if next < 100 {
            return Vec::new();
        }

        debug!(generation, "Analysis complete");

        self.phase = Phase::Complete;
        self.ticker_armed = false;
        self.redirect_armed = true;

        vec![
            Command::StopTicker,
            Command::ScheduleRedirect {
                generation,
                delay: self.timing.redirect_delay,
            },
        ]
    }

    fn redirect(&mut self, generation: u64) -> Vec<Command> {
        if generation != self.generation || self.phase != Phase::Complete || !self.redirect_armed {
            return Vec::new();
        }

        self.redirect_armed = false;
        self.completed = true;

        let encoded = self.encoded.clone().unwrap_or_default();
        if let Some(callback) = self.on_complete.as_mut() {
            callback(encoded);
        }

        Vec::new()
    }

    fn unmount(&mut self) -> Vec<Command> {
        let commands = self.cancel_timers();
        self.mounted = false;
        commands
    }

    fn cancel_timers(&mut self) -> Vec<Command> {
        let mut commands = Vec::new();

        if std::mem::take(&mut self.ticker_armed) {
            commands.push(Command::StopTicker);
        }
        if std::mem::take(&mut self.redirect_armed) {
            commands.push(Command::CancelRedirect);
        }

        commands
    }

    fn reset(&mut self) {
        self.session.file = None;
        self.session.progress = 0;
        self.encoded = None;
        self.phase = Phase::Idle;
    }
}
