//! Errors returned by [`OrderedTree`][crate::OrderedTree] operations.
//!
//! Every [`Error`] classifies into one [`ErrorKind`]. Kinds have a stable numeric code and a fixed
//! human readable description, which is what diagnostics reports and log lines print.

use std::fmt;

use thiserror::Error;

/// The classification of an operation's outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorKind {
    /// The operation succeeded.
    None,
    /// A required argument was missing, e.g. constructing a tree without a comparator.
    InvalidArgument,
    /// Storage for a new node could not be obtained.
    AllocationFailure,
    /// A diagnostic check found the tree's own bookkeeping or ordering broken.
    InvariantViolation,
}

impl ErrorKind {
    /// Description printed for codes that don't name a kind.
    pub const UNKNOWN: &'static str = "unknown";

    /// The stable numeric code of this kind.
    pub fn code(self) -> u32 {
        match self {
            Self::None => 0,
            Self::InvalidArgument => 1,
            Self::AllocationFailure => 2,
            Self::InvariantViolation => 3,
        }
    }

    /// Maps a numeric code back to its kind.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::None),
            1 => Some(Self::InvalidArgument),
            2 => Some(Self::AllocationFailure),
            3 => Some(Self::InvariantViolation),
            _ => None,
        }
    }

    /// The fixed description of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::InvalidArgument => "invalid argument",
            Self::AllocationFailure => "memory allocation failed",
            Self::InvariantViolation => "tree invariant violated",
        }
    }

    /// Describes a raw code. Codes that don't name a kind are described as `"unknown"`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ordtree::ErrorKind;
    ///
    /// assert_eq!(ErrorKind::describe(2), "memory allocation failed");
    /// assert_eq!(ErrorKind::describe(42), "unknown");
    /// ```
    pub fn describe(code: u32) -> &'static str {
        Self::from_code(code).map_or(Self::UNKNOWN, Self::as_str)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error from constructing, inserting into, or verifying a tree.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// A required argument was absent.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// The global allocator could not provide storage for a node.
    #[error("memory allocation failed: could not obtain {bytes} bytes for a node")]
    AllocationFailure {
        /// Size of the node that was requested.
        bytes: usize,
    },

    /// The tree already holds as many nodes as its configuration allows.
    #[error("memory allocation failed: node limit of {limit} reached")]
    StorageExhausted {
        /// The configured node limit.
        limit: usize,
    },

    /// A diagnostic check failed.
    #[error("tree invariant violated: {0}")]
    InvariantViolation(String),
}

impl Error {
    /// Classifies this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::AllocationFailure { .. } | Self::StorageExhausted { .. } => {
                ErrorKind::AllocationFailure
            }
            Self::InvariantViolation(_) => ErrorKind::InvariantViolation,
        }
    }
}
