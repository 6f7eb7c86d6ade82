//! Coordinate-file errors

use std::fmt;
use std::io;
use std::error::Error;
use std::path::Path;

/// Why did reading a coordinate file fail?
pub enum CoordError {
    /// The file could not be opened or read.
    Open(String, io::Error),
    /// A token that should have been a number was not one.
    Parse(String, usize),
    /// The file ran out before the expected number of values.
    Truncated(String, usize, usize),
}

impl fmt::Display for CoordError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CoordError::Open(path, cause) => {
                write!(f, "unable to open coordinate file '{}': {}", path, cause)
            },
            CoordError::Parse(path, line) => {
                write!(f, "'{}', line {}: expected a number", path, line)
            },
            CoordError::Truncated(path, expected, got) => {
                write!(f, "'{}' ended after {} values, expected {}", path, got, expected)
            },
        }
    }
}

impl fmt::Debug for CoordError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl Error for CoordError {}

impl CoordError {
    pub fn open<P: AsRef<Path>>(path: P, cause: io::Error) -> Self {
        Self::Open(path.as_ref().display().to_string(), cause)
    }

    pub fn parse<P: AsRef<Path>>(path: P, line: usize) -> Self {
        Self::Parse(path.as_ref().display().to_string(), line)
    }

    pub fn truncated<P: AsRef<Path>>(path: P, expected: usize, got: usize) -> Self {
        Self::Truncated(path.as_ref().display().to_string(), expected, got)
    }
}
