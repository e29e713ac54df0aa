use crate::page_range::InvalidPageRange;
use crate::template::TemplateError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Invalid parameter `{name}`: {reason}")]
    Parameter { name: String, reason: String },
    #[error(transparent)]
    PageRange(#[from] InvalidPageRange),
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),
    #[error("Duplicate file: {}", .0.display())]
    DuplicateFile(PathBuf),
    #[error("Session results requested before every chunk finished")]
    SessionPending,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        PipelineError::Parameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Fail unless `value` has non-whitespace content
pub fn ensure_non_empty(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(PipelineError::parameter(name, "empty string"));
    }
    Ok(())
}

/// Fail unless `min <= value <= max`
pub fn ensure_in_range<T>(name: &str, value: T, min: T, max: Option<T>) -> Result<()>
where
    T: PartialOrd + std::fmt::Display,
{
    if value < min {
        return Err(PipelineError::parameter(name, format!("less than {min}")));
    }
    if let Some(max) = max {
        if value > max {
            return Err(PipelineError::parameter(name, format!("greater than {max}")));
        }
    }
    Ok(())
}
