//! Work items, per-item results and the per-chunk item loop

use crate::distribute::Chunk;
use crate::duplicate::{Disposition, DuplicatePolicy, ErrorPolicy, OverwritePrompt};
use crate::pipeline::TaskContext;
use crate::types::Result;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// One page to process and where its output goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Position of the item in the run, starting at zero
    pub ordinal: usize,
    /// Zero-based page index in the source document
    pub page_index: usize,
    pub output: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Created,
    Overwritten,
    Skipped,
    Errored,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::Created => "created",
            Operation::Overwritten => "overwritten",
            Operation::Skipped => "skipped",
            Operation::Errored => "errored",
        };
        f.write_str(s)
    }
}

/// A streamed per-item result the driver can account for
pub trait ItemReport {
    /// Position of the item in the run
    fn ordinal(&self) -> usize;
    fn operation(&self) -> Operation;
    fn error(&self) -> Option<&str>;
    /// Human readable status line
    fn describe(&self) -> String;
}

/// Outcome of one page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResult {
    pub ordinal: usize,
    pub page_index: usize,
    pub output: PathBuf,
    pub operation: Operation,
    pub error: Option<String>,
}

impl ItemReport for PageResult {
    fn ordinal(&self) -> usize {
        self.ordinal
    }

    fn operation(&self) -> Operation {
        self.operation
    }

    fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn describe(&self) -> String {
        match &self.error {
            Some(error) => format!("[Error] page: {}; error: {}", self.page_index + 1, error),
            None => format!(
                "[Success] operation: {}; page: {}; output: {}",
                self.operation,
                self.page_index + 1,
                self.output.display()
            ),
        }
    }
}

/// Per-chunk tally. Skipped items also count as successes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskReturn {
    pub total: usize,
    pub success: usize,
    pub failure: usize,
    pub skipped: usize,
    /// Item ordinal to error message
    pub item_errors: BTreeMap<usize, String>,
}

impl TaskReturn {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            ..Default::default()
        }
    }
}

impl fmt::Display for TaskReturn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total: {}; success: {}; failure: {}",
            self.total, self.success, self.failure
        )
    }
}

/// Settings applied to every item of a page chunk
#[derive(Clone, Default)]
pub struct ItemPolicy {
    pub duplicates: DuplicatePolicy,
    pub errors: ErrorPolicy,
    pub prompt: Option<Arc<dyn OverwritePrompt>>,
}

impl fmt::Debug for ItemPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemPolicy")
            .field("duplicates", &self.duplicates)
            .field("errors", &self.errors)
            .field("prompt", &self.prompt.is_some())
            .finish()
    }
}

/// Run `render` over the items of a chunk, streaming one [`PageResult`]
/// per attempted item.
///
/// The cancel signal is checked between items. Existing outputs are handled
/// by the duplicate policy before `render` is called, so skipped items never
/// reach it. A `Fail` policy hit reports the item and aborts the chunk.
pub fn process_page_chunk<F, E>(
    ctx: &TaskContext<PageResult>,
    chunk: Chunk<WorkItem>,
    policy: &ItemPolicy,
    mut render: F,
) -> Result<TaskReturn>
where
    F: FnMut(&WorkItem) -> std::result::Result<(), E>,
    E: fmt::Display,
{
    let mut ret = TaskReturn::new(chunk.len());

    for item in chunk.items {
        if ctx.is_cancelled() {
            log::debug!("{} cancelled, stopping", ctx.chunk_id());
            break;
        }

        let mut result = PageResult {
            ordinal: item.ordinal,
            page_index: item.page_index,
            output: item.output.clone(),
            operation: Operation::Created,
            error: None,
        };

        let disposition = match policy
            .duplicates
            .resolve(&item.output, policy.prompt.as_deref())
        {
            Ok(disposition) => disposition,
            Err(e) => {
                let message = e.to_string();
                result.operation = Operation::Errored;
                result.error = Some(message.clone());
                ret.failure += 1;
                ret.item_errors.insert(item.ordinal, message);
                ctx.write_output(result);
                return Err(e);
            }
        };

        match disposition {
            Disposition::Skip => {
                result.operation = Operation::Skipped;
                ret.success += 1;
                ret.skipped += 1;
            }
            Disposition::Create | Disposition::Overwrite => {
                result.operation = if disposition == Disposition::Create {
                    Operation::Created
                } else {
                    Operation::Overwritten
                };
                match render(&item) {
                    Ok(()) => ret.success += 1,
                    Err(e) => {
                        let message = e.to_string();
                        result.operation = Operation::Errored;
                        result.error = Some(message.clone());
                        ret.failure += 1;
                        ret.item_errors.insert(item.ordinal, message);
                    }
                }
            }
        }

        let errored = result.operation == Operation::Errored;
        if !ctx.write_output(result) {
            log::debug!("{} output channel closed, stopping", ctx.chunk_id());
            break;
        }
        if errored && policy.errors == ErrorPolicy::Stop {
            log::warn!("{} stopping after item error", ctx.chunk_id());
            break;
        }
    }

    Ok(ret)
}
