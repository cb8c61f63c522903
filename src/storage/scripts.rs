//! Save each attempt's code to disk as the session runs.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::jsonl::JsonlLog;
use crate::domain::{Attempt, CodeLanguage, Task};
use crate::error::Result;
use crate::session::{SessionObserver, SessionReport};

/// One line of the attempt history file.
#[derive(Debug, Serialize)]
struct HistoryEntry<'a> {
    language: &'a str,
    request: &'a str,
    #[serde(flatten)]
    attempt: &'a Attempt,
}

/// Writes scripts into a directory:
///
/// - `script_attempt_<n>.<ext>` for every attempt
/// - `script_initial.<ext>` for the first attempt
/// - `script_debugged.<ext>` for the successful attempt, even the first
/// - `script_final.<ext>` for the last code of the session
///
/// and optionally appends each attempt to a JSONL history file. Write
/// failures are logged and otherwise ignored.
pub struct ScriptStore {
    dir: PathBuf,
    history: Option<JsonlLog>,
}

impl ScriptStore {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, history: None })
    }

    /// Also append attempts to a JSONL file at `path`.
    pub fn with_history(mut self, path: impl AsRef<Path>) -> Result<Self> {
        self.history = Some(JsonlLog::open(path)?);
        Ok(self)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path for a named script in this store.
    pub fn script_path(&self, name: &str, language: &CodeLanguage) -> PathBuf {
        self.dir.join(format!("script_{}.{}", name, language.extension()))
    }

    /// Write `code` as `script_<name>.<ext>`.
    pub fn save(&self, name: &str, language: &CodeLanguage, code: &str) -> Result<PathBuf> {
        let path = self.script_path(name, language);
        fs::write(&path, code)?;
        log::debug!("scripts: wrote {}", path.display());
        Ok(path)
    }

    fn save_logged(&self, name: &str, language: &CodeLanguage, code: &str) {
        if let Err(e) = self.save(name, language, code) {
            log::warn!("scripts: failed to save script_{}: {}", name, e);
        }
    }
}

impl SessionObserver for ScriptStore {
    fn on_attempt(&self, task: &Task, attempt: &Attempt) {
        let language = &task.language;
        self.save_logged(&format!("attempt_{}", attempt.index), language, &attempt.code);
        if attempt.index == 1 {
            self.save_logged("initial", language, &attempt.code);
        }
        if attempt.outcome.is_success() {
            self.save_logged("debugged", language, &attempt.code);
        }

        if let Some(history) = &self.history {
            let entry = HistoryEntry {
                language: language.tag(),
                request: task.request(),
                attempt,
            };
            if let Err(e) = history.append(&entry) {
                log::warn!("scripts: failed to append history: {}", e);
            }
        }
    }

    fn on_finished(&self, task: &Task, report: &SessionReport) {
        if let Some(code) = report.last_code() {
            self.save_logged("final", &task.language, code);
        }
    }
}
