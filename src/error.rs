//! Error taxonomy shared by the reader, the checker and the emitters.
use std::{fmt, io};
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A schema or cross-reference violation in the registry, tagged with the offending line.
    #[error("Spec error on line {line}: {message}")]
    Spec { line: u64, message: String },

    #[error("failed to parse registry: {0}")]
    Xml(#[from] xml::reader::Error),

    #[error("failed to access {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("failed to format generated code")]
    Fmt(#[from] fmt::Error),
}

impl Error {
    pub fn spec<S: Into<String>>(line: u64, message: S) -> Error {
        Error::Spec { line, message: message.into() }
    }

    pub fn io<P: Into<PathBuf>>(path: P, source: io::Error) -> Error {
        Error::Io { path: path.into(), source }
    }

    /// Line number carried by a spec error, if any.
    pub fn line(&self) -> Option<u64> {
        match *self {
            Error::Spec { line, .. } => Some(line),
            _ => None,
        }
    }
}

/// Returns early with an `Error::Spec` when the condition doesn't hold.
macro_rules! check {
    ($cond:expr, $line:expr, $($arg:tt)+) => {
        if !$cond {
            return Err($crate::error::Error::spec($line, format!($($arg)+)));
        }
    };
}

/// Non-fatal schema diagnostic.
pub(crate) fn warn(line: u64, message: fmt::Arguments) {
    log::warn!("Spec warning on line {}: {}", line, message);
}
