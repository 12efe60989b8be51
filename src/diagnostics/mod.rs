//! Structural snapshots of a tree and the sinks that render them.
//!
//! When a tree is configured to dump or verify, it captures a [`Snapshot`] of its nodes and hands
//! it to its [`DiagnosticsSink`] together with a [`Context`] describing when, where and why the
//! snapshot was taken. The tree never looks at what a sink produces, only whether `render`
//! succeeded.
//!
//! # Examples
//!
//! ```
//! use ordtree::{diagnostics::GraphvizSink, Config, OrderedTree};
//!
//! let mut tree = OrderedTree::<i32>::natural()
//!     .with_config(Config::diagnostic())
//!     .with_sink(GraphvizSink::new(Vec::new()));
//!
//! tree.insert(2).unwrap();
//! tree.insert(1).unwrap();
//!
//! let snapshot = tree.snapshot();
//! let root = snapshot.root().unwrap();
//! assert_eq!(*root.key, 2);
//! assert_eq!(snapshot.get(root.left.unwrap()).map(|n| *n.key), Some(1));
//! ```

pub mod dot;

use std::collections::HashMap;
use std::fmt;
use std::io;
use std::panic::Location;

use chrono::{DateTime, Local};
use thiserror::Error;
use tracing::{debug, error, trace, warn};

use crate::config::SinkErrorPolicy;
use crate::error::ErrorKind;
use crate::ordered::Node;

pub use dot::GraphvizSink;

/// Identity of a node for as long as it is attached to its tree. This is the node's address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    fn of<K>(node: &Node<K>) -> Self {
        Self(node as *const Node<K> as usize)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// One node as seen by a [`Snapshot`].
#[derive(Debug)]
pub struct NodeRecord<'a, K> {
    /// This node.
    pub id: NodeId,
    /// The key stored in this node.
    pub key: &'a K,
    /// The left child, if any.
    pub left: Option<NodeId>,
    /// The right child, if any.
    pub right: Option<NodeId>,
    /// Depth of this node counting the root as rank 1.
    pub rank: usize,
}

/// A read-only picture of a tree's structure.
#[derive(Debug)]
pub struct Snapshot<'a, K> {
    /// Pre-order, so the root (if any) comes first.
    records: Vec<NodeRecord<'a, K>>,
    index: HashMap<NodeId, usize>,
    size: usize,
}

impl<'a, K> Snapshot<'a, K> {
    /// Walks the tree from `root` with an explicit stack. `size` is what the tree believes it
    /// holds, which may disagree with the number of records when the tree is broken.
    pub(crate) fn capture(root: Option<&'a Node<K>>, size: usize) -> Self {
        let mut records = Vec::with_capacity(size);
        let mut stack: Vec<(&'a Node<K>, usize)> = root.map(|n| (n, 1)).into_iter().collect();

        while let Some((node, rank)) = stack.pop() {
            records.push(NodeRecord {
                id: NodeId::of(node),
                key: &node.key,
                left: node.left.as_deref().map(NodeId::of),
                right: node.right.as_deref().map(NodeId::of),
                rank,
            });
            // Right first so the left subtree is recorded first.
            if let Some(right) = node.right.as_deref() {
                stack.push((right, rank + 1));
            }
            if let Some(left) = node.left.as_deref() {
                stack.push((left, rank + 1));
            }
        }

        let index = records
            .iter()
            .enumerate()
            .map(|(i, record)| (record.id, i))
            .collect();
        Self {
            records,
            index,
            size,
        }
    }

    /// The root node, if the tree isn't empty.
    pub fn root(&self) -> Option<&NodeRecord<'a, K>> {
        self.records.first()
    }

    /// Looks a node up by its id.
    pub fn get(&self, id: NodeId) -> Option<&NodeRecord<'a, K>> {
        self.index.get(&id).map(|&i| &self.records[i])
    }

    /// All nodes in pre-order.
    pub fn nodes(&self) -> &[NodeRecord<'a, K>] {
        &self.records
    }

    /// Number of nodes reached from the root.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the tree had no root.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The element count the tree recorded when the snapshot was taken.
    pub fn size(&self) -> usize {
        self.size
    }
}

/// How loudly a [`Context`] should be reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    /// Routine dump after a successful operation.
    Debug,
    /// Dump accompanying a failure.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Debug => "DEBUG",
            Self::Error => "ERROR",
        })
    }
}

/// When, where and why a snapshot was taken.
#[derive(Clone, Debug)]
pub struct Context<'a> {
    /// Local wall clock time of the capture.
    pub timestamp: DateTime<Local>,
    /// The call site of the tree operation that produced the snapshot.
    pub location: &'static Location<'static>,
    /// Outcome being reported. [`ErrorKind::None`] for routine dumps.
    pub kind: ErrorKind,
    /// Free text describing what happened.
    pub message: Option<&'a str>,
}

impl<'a> Context<'a> {
    /// A context stamped with the current time.
    pub fn new(kind: ErrorKind, location: &'static Location<'static>) -> Self {
        Self {
            timestamp: Local::now(),
            location,
            kind,
            message: None,
        }
    }

    /// Attaches a message.
    pub fn with_message(self, message: &'a str) -> Self {
        Self {
            message: Some(message),
            ..self
        }
    }

    /// [`Severity::Error`] for anything but [`ErrorKind::None`].
    pub fn severity(&self) -> Severity {
        match self.kind {
            ErrorKind::None => Severity::Debug,
            _ => Severity::Error,
        }
    }
}

/// Why a sink could not render a snapshot.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Writing the rendered output failed.
    #[error("failed to write diagnostics: {0}")]
    Io(#[from] io::Error),
    /// The renderer could not be reached at all.
    #[error("renderer unavailable: {0}")]
    Unavailable(String),
}

/// Receives snapshots from a tree.
pub trait DiagnosticsSink<K> {
    /// Renders `snapshot` described by `context`.
    fn render(&mut self, snapshot: &Snapshot<'_, K>, context: &Context<'_>)
        -> Result<(), SinkError>;
}

/// Reports snapshots through `tracing`: routine dumps at `DEBUG`, failures at `ERROR`, and the
/// Graphviz source of the tree at `TRACE`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl<K: fmt::Debug> DiagnosticsSink<K> for TracingSink {
    fn render(
        &mut self,
        snapshot: &Snapshot<'_, K>,
        context: &Context<'_>,
    ) -> Result<(), SinkError> {
        let message = context.message.unwrap_or_default();
        match context.severity() {
            Severity::Debug => debug!(
                at = %context.location,
                nodes = snapshot.len(),
                size = snapshot.size(),
                what = message,
                "tree snapshot"
            ),
            Severity::Error => error!(
                at = %context.location,
                error = %context.kind,
                nodes = snapshot.len(),
                size = snapshot.size(),
                what = message,
                "tree snapshot"
            ),
        }
        trace!(graph = %dot::render(snapshot), "tree graph");
        Ok(())
    }
}

/// Hands a snapshot to `sink`, applying `policy` if it fails.
pub(crate) fn report<K>(
    sink: &mut dyn DiagnosticsSink<K>,
    snapshot: &Snapshot<'_, K>,
    context: &Context<'_>,
    policy: SinkErrorPolicy,
) {
    let Err(e) = sink.render(snapshot, context) else {
        return;
    };
    match policy {
        SinkErrorPolicy::Warn => warn!(error = %e, at = %context.location, "diagnostics sink failed"),
        SinkErrorPolicy::Panic => panic!("diagnostics sink failed: {}", e),
        SinkErrorPolicy::Exit => {
            error!(error = %e, at = %context.location, "diagnostics sink failed, exiting");
            std::process::exit(1);
        }
    }
}
