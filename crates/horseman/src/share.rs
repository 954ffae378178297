//! Native sharing through an external command (`wl-copy`, a portal helper, ...).

use horseman_core::export::{ExportError, PhotoFile, ShareTarget, PHOTO_MIME};
use std::path::PathBuf;
use std::process::Command;

/// Writes the photo to a scratch file and runs a configured command on it.
///
/// The command line is split on whitespace; the photo path is appended as
/// the last argument. Title and text go through `HORSEMAN_SHARE_TITLE` and
/// `HORSEMAN_SHARE_TEXT`.
#[derive(Debug, Clone)]
pub struct CommandShare {
    program: String,
    args: Vec<String>,
    scratch_dir: PathBuf,
}

impl CommandShare {
    /// Returns `None` for an empty command line.
    pub fn parse(command_line: &str) -> Option<Self> {
        let mut words = command_line.split_whitespace().map(str::to_string);
        let program = words.next()?;
        Some(Self {
            program,
            args: words.collect(),
            scratch_dir: std::env::temp_dir().join("horseman"),
        })
    }

    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl ShareTarget for CommandShare {
    fn can_share(&self, file: &PhotoFile) -> bool {
        file.mime == PHOTO_MIME
    }

    fn share(&self, file: &PhotoFile, title: &str, text: &str) -> Result<(), ExportError> {
        std::fs::create_dir_all(&self.scratch_dir)?;
        let path = self.scratch_dir.join(&file.name);
        std::fs::write(&path, &file.bytes)?;

        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(&path)
            .env("HORSEMAN_SHARE_TITLE", title)
            .env("HORSEMAN_SHARE_TEXT", text)
            .status()?;

        if !status.success() {
            return Err(ExportError::Share(format!("{} exited with {status}", self.program)));
        }
        tracing::debug!(program = %self.program, path = %path.display(), "share command finished");
        Ok(())
    }
}
