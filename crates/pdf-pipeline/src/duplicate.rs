use crate::types::{PipelineError, Result};
use std::path::Path;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// What to do when an output file already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DuplicatePolicy {
    /// Keep the existing file and count the item as done
    #[default]
    Skip,
    Overwrite,
    /// Ask once per existing file
    AskUser,
    /// Abort with a duplicate file error
    Fail,
}

/// What to do when a single item fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ErrorPolicy {
    /// Stop the remaining items of the failing chunk
    Stop,
    /// Record the failure and move on to the next item
    #[default]
    Continue,
}

/// Decision for one destination path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Create,
    Overwrite,
    Skip,
}

/// Asks the user whether an existing file may be overwritten
pub trait OverwritePrompt: Send + Sync {
    fn confirm_overwrite(&self, path: &Path) -> bool;
}

impl<F> OverwritePrompt for F
where
    F: Fn(&Path) -> bool + Send + Sync,
{
    fn confirm_overwrite(&self, path: &Path) -> bool {
        self(path)
    }
}

impl DuplicatePolicy {
    /// Decide what happens to `path`.
    ///
    /// `AskUser` without a prompt declines, so the file is skipped.
    pub fn resolve(self, path: &Path, prompt: Option<&dyn OverwritePrompt>) -> Result<Disposition> {
        if !path.is_file() {
            return Ok(Disposition::Create);
        }

        match self {
            DuplicatePolicy::Skip => Ok(Disposition::Skip),
            DuplicatePolicy::Overwrite => Ok(Disposition::Overwrite),
            DuplicatePolicy::AskUser => {
                let confirmed = prompt.is_some_and(|p| p.confirm_overwrite(path));
                if confirmed {
                    Ok(Disposition::Overwrite)
                } else {
                    Ok(Disposition::Skip)
                }
            }
            DuplicatePolicy::Fail => Err(PipelineError::DuplicateFile(path.to_path_buf())),
        }
    }
}
