use std::path::PathBuf;

use thiserror::Error;

use crate::cipher::CipherError;
use crate::record::{CLASSES, COURSES, LEVELS};

/// Bad operator or file input. Never reaches the indices.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("expected {expected} fields, found {found}")]
    MissingFields { expected: usize, found: usize },
    #[error("field `{field}` is not an integer: {value:?}")]
    NotAnInteger { field: &'static str, value: String },
    #[error("level {0} out of range 1..={max}", max = LEVELS)]
    LevelOutOfRange(i64),
    #[error("class {0} out of range 1..={max}", max = CLASSES)]
    ClassOutOfRange(i64),
    #[error("course {0} out of range 1..={max}", max = COURSES)]
    CourseOutOfRange(i64),
    #[error("expected {expected} grades, found {0}", expected = COURSES)]
    GradeCount(usize),
    #[error("grade {grade} for course {course} is negative")]
    NegativeGrade { course: usize, grade: i64 },
    #[error("{0} unexpected trailing token(s)")]
    TrailingTokens(usize),
    #[error("`{field}` must be 1..={max} bytes with no whitespace")]
    BadField { field: &'static str, max: usize },
}

/// Failures of a whole load or save phase.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}: line {line}: {source}", .path.display())]
    Record {
        path: PathBuf,
        line: usize,
        #[source]
        source: ValidationError,
    },
    #[error("{}: frame {frame}: {source}", .path.display())]
    FrameRecord {
        path: PathBuf,
        frame: usize,
        #[source]
        source: ValidationError,
    },
    #[error("{}: frame {frame} truncated at byte offset {offset}", .path.display())]
    TruncatedFrame {
        path: PathBuf,
        frame: usize,
        offset: usize,
    },
    #[error("{}: frame {frame} has invalid length {length}", .path.display())]
    BadFrameLength {
        path: PathBuf,
        frame: usize,
        length: i64,
    },
    #[error("{}: frame {frame} is not valid UTF-8", .path.display())]
    NotUtf8 { path: PathBuf, frame: usize },
    #[error("{}: frame {frame}: {source}", .path.display())]
    Cipher {
        path: PathBuf,
        frame: usize,
        #[source]
        source: CipherError,
    },
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }
}
