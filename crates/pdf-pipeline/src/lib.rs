//! Core of the bulk page pipeline: page range parsing, output name
//! templates, workload distribution and the chunked worker pool.

pub mod distribute;
mod driver;
mod duplicate;
pub mod page_range;
pub mod pipeline;
mod progress;
pub mod template;
mod types;
mod work;

pub use distribute::{Chunk, ChunkId, distribute};
pub use driver::{DriverOptions, PipelineDriver, RunOutcome, RunReport, RunSummary};
pub use duplicate::{Disposition, DuplicatePolicy, ErrorPolicy, OverwritePrompt};
pub use page_range::{InvalidPageRange, PageRange};
pub use pipeline::{CancelToken, ChunkOutcome, PipelineConfig, Session, SessionState, TaskContext, TaskPipeline};
pub use progress::{LogReporter, OperationContext, ProgressReporter};
pub use template::{NameGenerator, TemplateContext, TemplateError, Value, Variable};
pub use types::*;
pub use work::{ItemPolicy, ItemReport, Operation, PageResult, TaskReturn, WorkItem, process_page_chunk};
