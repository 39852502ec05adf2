//! File-level orchestration of one synchronization run.
//!
//! # Responsibility
//! - Decide the conversion from the source file type and its siblings.
//! - Load both documents, synchronize, and save the target.
//! - Turn every outcome into a status message; errors carry
//!   `ERROR_MARKER`.
//!
//! # Invariants
//! - The target is written only after synchronization succeeded.
//! - Silent mode skips the overwrite confirmation, never error reporting.

use crate::config::SyncConfig;
use crate::model::graph::GraphError;
use crate::novel::splitter::split_scenes;
use crate::novel::{NovelDocument, NovelError, NOVEL_EXTENSION};
use crate::sync::{synchronize, Direction};
use crate::timeline::{TimelineDocument, TimelineError, TIMELINE_EXTENSION};
use log::{error, info};
use std::error::Error;
use std::ffi::OsStr;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// Leading character of every error message.
pub const ERROR_MARKER: char = '!';

/// Returns whether `message` reports a failure.
pub fn is_error_message(message: &str) -> bool {
    message.starts_with(ERROR_MARKER)
}

/// Interaction callbacks supplied by the front end.
pub trait Ui {
    /// Asks a yes/no question; `true` means yes.
    fn ask_yes_no(&mut self, prompt: &str) -> bool;
    /// Shows progress or the final status message.
    fn set_info(&mut self, message: &str);
}

/// Failures of a conversion run.
#[derive(Debug)]
pub enum ConvertError {
    FileNotFound(PathBuf),
    UnsupportedFileType(PathBuf),
    /// The document to update does not exist.
    TargetMissing(PathBuf),
    /// The user declined to overwrite the target.
    Canceled,
    Graph(GraphError),
    Timeline(TimelineError),
    Novel(NovelError),
}

impl Display for ConvertError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FileNotFound(path) => write!(f, "File \"{}\" not found.", path.display()),
            Self::UnsupportedFileType(path) => {
                write!(f, "File type of \"{}\" not supported.", path.display())
            }
            Self::TargetMissing(path) => {
                write!(f, "Target file \"{}\" not found.", path.display())
            }
            Self::Canceled => write!(f, "Action canceled by user."),
            Self::Graph(err) => write!(f, "{err}"),
            Self::Timeline(err) => write!(f, "{err}"),
            Self::Novel(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ConvertError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Graph(err) => Some(err),
            Self::Timeline(err) => Some(err),
            Self::Novel(err) => Some(err),
            Self::FileNotFound(_)
            | Self::UnsupportedFileType(_)
            | Self::TargetMissing(_)
            | Self::Canceled => None,
        }
    }
}

impl From<GraphError> for ConvertError {
    fn from(value: GraphError) -> Self {
        Self::Graph(value)
    }
}

impl From<TimelineError> for ConvertError {
    fn from(value: TimelineError) -> Self {
        Self::Timeline(value)
    }
}

impl From<NovelError> for ConvertError {
    fn from(value: NovelError) -> Self {
        Self::Novel(value)
    }
}

/// What a run will do, derived from the source path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conversion {
    UpdateNovel { timeline: PathBuf, novel: PathBuf },
    CreateNovel { timeline: PathBuf, novel: PathBuf },
    UpdateTimeline { novel: PathBuf, timeline: PathBuf },
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(OsStr::to_str)
        .is_some_and(|found| found.eq_ignore_ascii_case(extension))
}

/// Chooses the conversion for `source`.
///
/// # Errors
/// - `FileNotFound` when `source` does not exist.
/// - `UnsupportedFileType` for extensions other than timeline and novel.
/// - `TargetMissing` for a novel source without a sibling timeline.
pub fn plan(source: &Path) -> Result<Conversion, ConvertError> {
    if !source.is_file() {
        return Err(ConvertError::FileNotFound(source.to_path_buf()));
    }
    if has_extension(source, TIMELINE_EXTENSION) {
        let novel = source.with_extension(NOVEL_EXTENSION);
        let timeline = source.to_path_buf();
        return Ok(if novel.is_file() {
            Conversion::UpdateNovel { timeline, novel }
        } else {
            Conversion::CreateNovel { timeline, novel }
        });
    }
    if has_extension(source, NOVEL_EXTENSION) {
        let timeline = source.with_extension(TIMELINE_EXTENSION);
        if !timeline.is_file() {
            return Err(ConvertError::TargetMissing(timeline));
        }
        return Ok(Conversion::UpdateTimeline {
            novel: source.to_path_buf(),
            timeline,
        });
    }
    Err(ConvertError::UnsupportedFileType(source.to_path_buf()))
}

/// Runs conversions against a front end.
pub struct Converter<'a, U: Ui> {
    ui: &'a mut U,
    config: SyncConfig,
    silent: bool,
}

impl<'a, U: Ui> Converter<'a, U> {
    pub fn new(ui: &'a mut U, config: SyncConfig, silent: bool) -> Self {
        Self { ui, config, silent }
    }

    /// Converts `source` and reports the final message to the front end.
    ///
    /// Returns the same message; use `is_error_message` to tell failure
    /// from success.
    pub fn run(&mut self, source: &Path) -> String {
        let message = match self.execute(source) {
            Ok(message) => {
                info!(
                    "event=conversion_finished module=convert status=ok source={}",
                    source.display()
                );
                message
            }
            Err(err) => {
                error!(
                    "event=conversion_finished module=convert status=error source={} reason={}",
                    source.display(),
                    crate::logging::sanitize_message(&err.to_string(), 200)
                );
                format!("{ERROR_MARKER}{err}")
            }
        };
        self.ui.set_info(&message);
        message
    }

    fn execute(&mut self, source: &Path) -> Result<String, ConvertError> {
        match plan(source)? {
            Conversion::UpdateNovel { timeline, novel } => self.update_novel(&timeline, &novel),
            Conversion::CreateNovel { timeline, novel } => self.create_novel(&timeline, &novel),
            Conversion::UpdateTimeline { novel, timeline } => {
                self.update_timeline(&novel, &timeline)
            }
        }
    }

    fn update_novel(&mut self, timeline_path: &Path, novel_path: &Path) -> Result<String, ConvertError> {
        self.ui.set_info(&format!(
            "Update novel \"{}\" from timeline \"{}\".",
            novel_path.display(),
            timeline_path.display()
        ));
        let (_, source) = TimelineDocument::load(timeline_path, &self.config)?;
        let (mut novel, mut target) = NovelDocument::open(novel_path)?;
        self.confirm_overwrite(novel_path)?;

        let report = synchronize(&source, &mut target, Direction::TimelineToNovel, &self.config.options)?;
        if self.config.options.split_scenes {
            split_scenes(&mut target);
        }
        self.ui.set_info(&report.message());
        Ok(novel.save(&target)?)
    }

    fn create_novel(&mut self, timeline_path: &Path, novel_path: &Path) -> Result<String, ConvertError> {
        self.ui.set_info(&format!(
            "Create novel \"{}\" from timeline \"{}\".",
            novel_path.display(),
            timeline_path.display()
        ));
        let (_, source) = TimelineDocument::load(timeline_path, &self.config)?;
        let title = novel_path
            .file_stem()
            .and_then(OsStr::to_str)
            .unwrap_or_default();
        let (mut novel, mut target) = NovelDocument::create(novel_path, title);

        let report = synchronize(&source, &mut target, Direction::TimelineToNovel, &self.config.options)?;
        if self.config.options.split_scenes {
            split_scenes(&mut target);
        }
        self.ui.set_info(&report.message());
        Ok(novel.save(&target)?)
    }

    fn update_timeline(&mut self, novel_path: &Path, timeline_path: &Path) -> Result<String, ConvertError> {
        self.ui.set_info(&format!(
            "Update timeline \"{}\" from novel \"{}\".",
            timeline_path.display(),
            novel_path.display()
        ));
        let (_, source) = NovelDocument::open(novel_path)?;
        let (mut timeline, mut target) = TimelineDocument::load(timeline_path, &self.config)?;
        self.confirm_overwrite(timeline_path)?;

        let report = synchronize(&source, &mut target, Direction::NovelToTimeline, &self.config.options)?;
        self.ui.set_info(&report.message());
        Ok(timeline.save(&target)?)
    }

    fn confirm_overwrite(&mut self, path: &Path) -> Result<(), ConvertError> {
        if self.silent || !path.exists() {
            return Ok(());
        }
        let prompt = format!("Overwrite existing file \"{}\"?", path.display());
        if self.ui.ask_yes_no(&prompt) {
            Ok(())
        } else {
            info!(
                "event=conversion_canceled module=convert status=ok target={}",
                path.display()
            );
            Err(ConvertError::Canceled)
        }
    }
}
