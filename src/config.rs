//! Runtime switches for the diagnostic code paths of an [`OrderedTree`][crate::OrderedTree].
//!
//! Verification and dumping are ordinary runtime flags so the same code runs, and is tested, in
//! every build. [`Config::default`] only picks which preset to start from.

/// How much checking runs before every insertion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum VerifyLevel {
    /// No checks.
    Off,
    /// [`OrderedTree::verify`][crate::OrderedTree::verify]: constant time bookkeeping checks.
    Shallow,
    /// [`OrderedTree::verify`][crate::OrderedTree::verify] followed by
    /// [`OrderedTree::verify_structure`][crate::OrderedTree::verify_structure], which walks every
    /// node.
    Deep,
}

/// What an insertion does once a failed verification has been reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum FailurePosture {
    /// Panic with the error. Suits debugging builds.
    Panic,
    /// Return the error to the caller and leave the tree untouched.
    Propagate,
}

/// What happens when a [`DiagnosticsSink`][crate::DiagnosticsSink] fails to render.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum SinkErrorPolicy {
    /// Log a warning and carry on.
    Warn,
    /// Panic.
    Panic,
    /// Terminate the process with exit status 1.
    Exit,
}

/// Diagnostic configuration of a tree.
///
/// # Examples
///
/// ```
/// use ordtree::{Config, FailurePosture, VerifyLevel};
///
/// let config = Config {
///     verify: VerifyLevel::Deep,
///     posture: FailurePosture::Propagate,
///     ..Config::production()
/// };
/// assert!(!config.dump_on_insert);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Config {
    /// Checks run before every insertion.
    pub verify: VerifyLevel,
    /// Render a snapshot to the installed sink after every successful insertion.
    pub dump_on_insert: bool,
    /// Reaction to a failed verification.
    pub posture: FailurePosture,
    /// Reaction to a failing sink.
    pub on_sink_error: SinkErrorPolicy,
    /// Most nodes the tree may hold. Insertions past it fail like an allocation failure.
    pub node_limit: Option<usize>,
}

impl Config {
    /// Checks and dumps everything, panicking on a broken tree.
    pub fn diagnostic() -> Self {
        Self {
            verify: VerifyLevel::Shallow,
            dump_on_insert: true,
            posture: FailurePosture::Panic,
            on_sink_error: SinkErrorPolicy::Warn,
            node_limit: None,
        }
    }

    /// No checks and no dumps. Errors are returned, never raised.
    pub fn production() -> Self {
        Self {
            verify: VerifyLevel::Off,
            dump_on_insert: false,
            posture: FailurePosture::Propagate,
            on_sink_error: SinkErrorPolicy::Warn,
            node_limit: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            Self::diagnostic()
        } else {
            Self::production()
        }
    }
}
