//! A comparator-driven BST that only grows. Keys are placed by comparing the new key against the
//! nodes on the way down, so the shape of the tree is entirely decided by insertion order. There
//! is no balancing: inserting sorted keys builds a list-shaped tree of depth `N`.
//!
//! # Examples
//!
//! ```
//! use ordtree::OrderedTree;
//!
//! // Order keys from largest to smallest.
//! let mut tree = OrderedTree::new(|a: &i32, b: &i32| b.cmp(a));
//!
//! tree.insert(1).unwrap();
//! tree.insert(3).unwrap();
//! tree.insert(3).unwrap();
//! assert_eq!(tree.len(), 3);
//!
//! // 3 ranks before 1 so it went left.
//! let snapshot = tree.snapshot();
//! let root = snapshot.root().unwrap();
//! assert_eq!(*root.key, 1);
//! assert_eq!(snapshot.get(root.left.unwrap()).map(|n| *n.key), Some(3));
//! assert_eq!(root.right, None);
//!
//! // Tearing down reports how many nodes were released.
//! assert_eq!(tree.destroy(), 3);
//! ```
//!
//! # Concurrency
//!
//! The tree does no synchronisation of its own. Inserting needs `&mut self`; callers sharing a
//! tree between threads must serialise access themselves (e.g. behind a `Mutex`).

use std::alloc::{self, Layout};
use std::cmp::Ordering;
use std::fmt;
use std::panic::Location;
use std::ptr::NonNull;

use tracing::{debug, error, trace};

use crate::config::{Config, FailurePosture, VerifyLevel};
use crate::diagnostics::{self, Context, DiagnosticsSink, Snapshot};
use crate::error::{Error, ErrorKind};

pub(crate) type Link<K> = Option<Box<Node<K>>>;

pub(crate) struct Node<K> {
    pub(crate) key: K,
    pub(crate) left: Link<K>,
    pub(crate) right: Link<K>,
}

impl<K> Node<K> {
    /// Allocates a leaf holding `key`. Unlike `Box::new`, running out of memory is reported
    /// instead of aborting.
    fn try_new_boxed(key: K) -> Result<Box<Self>, Error> {
        let layout = Layout::new::<Self>();
        // SAFETY: A `Node` always holds two links so `layout` is never zero-sized.
        let ptr = unsafe { alloc::alloc(layout) }.cast::<Self>();
        let Some(ptr) = NonNull::new(ptr) else {
            return Err(Error::AllocationFailure {
                bytes: layout.size(),
            });
        };
        // SAFETY: `ptr` was just returned by the global allocator for the layout of `Self` so it
        // is valid for writes, and a `Box` built from it frees it with that same layout.
        unsafe {
            ptr.as_ptr().write(Self {
                key,
                left: None,
                right: None,
            });
            Ok(Box::from_raw(ptr.as_ptr()))
        }
    }
}

/// Releases every node under `root`, children before their parent, and returns how many were
/// released. Uses an explicit stack so depth is only bounded by memory.
fn release<K>(root: Link<K>) -> usize {
    let mut released = 0;
    let mut stack: Vec<Box<Node<K>>> = root.into_iter().collect();

    while let Some(node) = stack.last_mut() {
        match node.left.take().or_else(|| node.right.take()) {
            Some(child) => stack.push(child),
            None => {
                // Both children are gone so this drops exactly one node.
                stack.pop();
                released += 1;
            }
        }
    }

    released
}

/// Adapts a "first ranks before second" predicate into a comparator.
///
/// # Examples
///
/// ```
/// use ordtree::{ordered::from_less, OrderedTree};
///
/// let mut tree = OrderedTree::new(from_less(|a: &i32, b: &i32| a < b));
/// tree.insert(2).unwrap();
/// tree.insert(1).unwrap();
///
/// let snapshot = tree.snapshot();
/// assert!(snapshot.root().unwrap().left.is_some());
/// ```
pub fn from_less<K, L>(less: L) -> impl Fn(&K, &K) -> Ordering
where
    L: Fn(&K, &K) -> bool,
{
    move |a, b| {
        if less(a, b) {
            Ordering::Less
        } else if less(b, a) {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }
}

/// A binary search tree ordered by the comparator `C`. It supports insertion only and owns all of
/// its nodes.
///
/// The comparator must be pure: comparing the same two keys must always give the same answer for
/// as long as the tree lives.
pub struct OrderedTree<K, C = fn(&K, &K) -> Ordering> {
    root: Link<K>,
    cmp: C,
    size: usize,
    config: Config,
    sink: Option<Box<dyn DiagnosticsSink<K>>>,
}

impl<K, C> Drop for OrderedTree<K, C> {
    fn drop(&mut self) {
        release(self.root.take());
    }
}

impl<K, C> fmt::Debug for OrderedTree<K, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderedTree")
            .field("size", &self.size)
            .field("config", &self.config)
            .field("sink", &self.sink.is_some())
            .finish_non_exhaustive()
    }
}

impl<K: Ord> OrderedTree<K> {
    /// Generates a new, empty tree ordered by `K`'s [`Ord`] implementation.
    pub fn natural() -> Self {
        Self::new(K::cmp)
    }
}

impl<K, C> OrderedTree<K, C> {
    /// Replaces the diagnostic configuration.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Installs the sink that receives snapshots.
    pub fn with_sink<S>(mut self, sink: S) -> Self
    where
        S: DiagnosticsSink<K> + 'static,
    {
        self.sink = Some(Box::new(sink));
        self
    }

    /// Number of keys in the tree.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Whether the tree holds no keys.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// The diagnostic configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Captures the current structure of the tree.
    pub fn snapshot(&self) -> Snapshot<'_, K> {
        Snapshot::capture(self.root.as_deref(), self.size)
    }

    /// Checks that the tree's bookkeeping is consistent: it has a root exactly when it records at
    /// least one node. Runs in constant time.
    ///
    /// # Errors
    ///
    /// [`Error::InvariantViolation`] describing the inconsistency.
    pub fn verify(&self) -> Result<(), Error> {
        match (self.root.is_some(), self.size) {
            (false, 0) | (true, 1..=usize::MAX) => Ok(()),
            (false, size) => Err(Error::InvariantViolation(format!(
                "tree has no root but records {} nodes",
                size
            ))),
            (true, _) => Err(Error::InvariantViolation(
                "tree has a root but records no nodes".to_string(),
            )),
        }
    }

    /// Releases every node, children before their parents, and returns how many were released.
    /// Consuming the tree means it can't be used afterwards.
    pub fn destroy(mut self) -> usize {
        let released = release(self.root.take());
        debug!(released, recorded = self.size, "released tree");
        self.size = 0;
        released
    }

    /// Renders the current structure to the sink, if one is installed.
    fn dump(&mut self, context: Context<'_>) {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };
        let snapshot = Snapshot::capture(self.root.as_deref(), self.size);
        diagnostics::report(&mut **sink, &snapshot, &context, self.config.on_sink_error);
    }

    /// Reports `err` with context and hands it back to be returned. The sink reports it when one
    /// is installed, `tracing` otherwise.
    fn fail(&mut self, err: Error, location: &'static Location<'static>) -> Error {
        if self.sink.is_none() {
            error!(error = %err, at = %location, "tree operation failed");
            return err;
        }
        let message = err.to_string();
        self.dump(Context::new(err.kind(), location).with_message(&message));
        err
    }
}

impl<K, C> OrderedTree<K, C>
where
    C: Fn(&K, &K) -> Ordering,
{
    /// Generates a new, empty tree ordered by `cmp` with the [default][Config::default]
    /// configuration.
    pub fn new(cmp: C) -> Self {
        Self {
            root: None,
            cmp,
            size: 0,
            config: Config::default(),
            sink: None,
        }
    }

    /// Like [`new`][Self::new] but for callers whose comparator may be missing.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if `cmp` is `None`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ordtree::{ErrorKind, OrderedTree};
    ///
    /// let err = OrderedTree::<i32>::try_new(None).unwrap_err();
    /// assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    /// ```
    pub fn try_new(cmp: Option<C>) -> Result<Self, Error> {
        cmp.map(Self::new)
            .ok_or(Error::InvalidArgument("a comparator is required"))
    }

    /// Inserts `key` as a new leaf. Walking down from the root, the key goes left of every node
    /// it ranks before and right of every other node, so equal keys end up to the right of the
    /// keys already present.
    ///
    /// On success the tree holds exactly one more node and nothing else moved. On failure the
    /// tree is left exactly as it was.
    ///
    /// # Errors
    ///
    /// - [`Error::AllocationFailure`] or [`Error::StorageExhausted`] when no node can be
    ///   obtained for `key`.
    /// - [`Error::InvariantViolation`] when verification is [configured][Config::verify], finds
    ///   the tree broken, and the [posture][Config::posture] is
    ///   [`Propagate`][FailurePosture::Propagate].
    ///
    /// # Panics
    ///
    /// When verification finds the tree broken under [`FailurePosture::Panic`].
    ///
    /// # Examples
    ///
    /// ```
    /// use ordtree::OrderedTree;
    ///
    /// let mut tree = OrderedTree::<i32>::natural();
    /// tree.insert(1).unwrap();
    /// tree.insert(1).unwrap();
    ///
    /// assert_eq!(tree.len(), 2);
    /// ```
    #[track_caller]
    pub fn insert(&mut self, key: K) -> Result<(), Error> {
        let location = Location::caller();
        self.check(location)?;

        if let Some(limit) = self.config.node_limit {
            if self.size >= limit {
                return Err(self.fail(Error::StorageExhausted { limit }, location));
            }
        }
        let node = match Node::try_new_boxed(key) {
            Ok(node) => node,
            Err(e) => return Err(self.fail(e, location)),
        };

        let mut depth = 0usize;
        let mut slot = &mut self.root;
        while let Some(parent) = slot {
            slot = match (self.cmp)(&node.key, &parent.key) {
                Ordering::Less => &mut parent.left,
                Ordering::Equal | Ordering::Greater => &mut parent.right,
            };
            depth += 1;
        }
        *slot = Some(node);
        self.size += 1;
        trace!(depth, size = self.size, "inserted key");

        if self.config.dump_on_insert {
            self.dump(Context::new(ErrorKind::None, location).with_message("inserted key"));
        }
        Ok(())
    }

    /// Walks every node and checks the ordering of the whole tree: every key in a node's left
    /// subtree ranks before it and no key in its right subtree does. Also checks that exactly
    /// [`len`][Self::len] nodes are reachable. The walk gives up as soon as more nodes are seen
    /// than recorded, so it always terminates.
    ///
    /// # Errors
    ///
    /// [`Error::InvariantViolation`] describing the first problem found.
    pub fn verify_structure(&self) -> Result<(), Error> {
        // (node, key every node here must not rank before, key every node here must rank before)
        let mut stack: Vec<(&Node<K>, Option<&K>, Option<&K>)> = self
            .root
            .as_deref()
            .map(|root| (root, None, None))
            .into_iter()
            .collect();
        let mut visited = 0usize;

        while let Some((node, lower, upper)) = stack.pop() {
            visited += 1;
            if visited > self.size {
                return Err(Error::InvariantViolation(format!(
                    "more than the recorded {} nodes are reachable",
                    self.size
                )));
            }
            if let Some(lower) = lower {
                if (self.cmp)(&node.key, lower) == Ordering::Less {
                    return Err(Error::InvariantViolation(format!(
                        "node {} of the right subtree ranks before its ancestor",
                        visited
                    )));
                }
            }
            if let Some(upper) = upper {
                if (self.cmp)(&node.key, upper) != Ordering::Less {
                    return Err(Error::InvariantViolation(format!(
                        "node {} of the left subtree doesn't rank before its ancestor",
                        visited
                    )));
                }
            }

            if let Some(right) = node.right.as_deref() {
                stack.push((right, Some(&node.key), upper));
            }
            if let Some(left) = node.left.as_deref() {
                stack.push((left, lower, Some(&node.key)));
            }
        }

        if visited != self.size {
            return Err(Error::InvariantViolation(format!(
                "{} nodes are reachable but {} are recorded",
                visited, self.size
            )));
        }
        Ok(())
    }

    /// Runs the configured verification, reporting and reacting to a failure.
    fn check(&mut self, location: &'static Location<'static>) -> Result<(), Error> {
        let result = match self.config.verify {
            VerifyLevel::Off => return Ok(()),
            VerifyLevel::Shallow => self.verify(),
            VerifyLevel::Deep => self.verify().and_then(|()| self.verify_structure()),
        };
        let Err(e) = result else {
            return Ok(());
        };

        let e = self.fail(e, location);
        match self.config.posture {
            FailurePosture::Panic => panic!("ordered tree is broken: {}", e),
            FailurePosture::Propagate => Err(e),
        }
    }
}
