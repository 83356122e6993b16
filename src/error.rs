use std::{fmt, path::PathBuf};

use thiserror::Error;

use crate::codec::Encoding;

/// Errors raised while reading, writing or rendering task documents.
#[derive(Debug, Error)]
pub enum TaskError {
    /// The stored document is not valid JSON.
    #[error("malformed task document: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The document parsed but has no `segments` array at the top level.
    #[error("task document has no \"segments\" array")]
    MissingSegments,

    #[error("segment is not a JSON object")]
    NotAnObject,

    /// A segment carries no type tag in the active encoding.
    #[error("segment has no type tag")]
    MissingKind,

    #[error("unknown segment type \"{0}\"")]
    UnknownKind(String),

    /// A segment written in the other encoding's shape.
    #[error("segment is not in the {expected} encoding")]
    WrongEncoding { expected: Encoding },

    #[error("{kind} expects {expected} options, found {found}")]
    OptionCount {
        kind: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("selected index {index} is out of range for {len} options")]
    IndexOutOfRange { index: u64, len: usize },

    #[error("initial data for a {expected} segment is a {found} segment")]
    KindMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("submission positions start at 1")]
    SubmissionPosition,

    #[error("failed to render preview: {0}")]
    Render(String),

    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A recoverable problem found while restoring a task. Diagnostics never stop
/// the remaining segments from loading.
#[derive(Debug)]
pub struct Diagnostic {
    /// Position of the offending entry in the `segments` array, if any.
    pub index: Option<usize>,
    pub problem: TaskError,
}

impl Diagnostic {
    pub fn document(problem: TaskError) -> Self {
        Self {
            index: None,
            problem,
        }
    }

    pub fn segment(index: usize, problem: TaskError) -> Self {
        Self {
            index: Some(index),
            problem,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "segment {}: {}", index + 1, self.problem),
            None => write!(f, "{}", self.problem),
        }
    }
}
