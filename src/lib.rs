//! This crate exposes an insert-only Binary Search Tree ordered by a caller supplied comparator,
//! along with hooks for checking and drawing its structure while debugging.
//!
//! ## Binary Search Tree
//!
//! A Binary Search Tree is built out of `Node`s. A `Node` stores a key and may have a left and a
//! right child `Node`. The tree keeps this invariant, where "ranks before" is decided by the
//! comparator the tree was created with:
//!
//! 1. For every `Node`, all the `Node`s in its left subtree rank before it.
//! 2. For every `Node`, none of the `Node`s in its right subtree rank before it (so equal keys
//!    live to the right).
//!
//! > Note that some `Node`s have no children. These `Node`s are called "leaf nodes".
//!
//! [`OrderedTree`] never rebalances. The shape of the tree is whatever the order of insertion
//! made it, so inserting sorted keys gives a tree as deep as it is large.
//!
//! ## Diagnostics
//!
//! A tree can be [configured][Config] to check itself before every insertion and to hand a
//! [`Snapshot`][diagnostics::Snapshot] of its nodes to a [`DiagnosticsSink`] after it. The checks
//! and dumps are runtime switches so the same code runs in every build.
//!
//! ```
//! use ordtree::{diagnostics::TracingSink, Config, OrderedTree, VerifyLevel};
//!
//! let mut tree = OrderedTree::<i32>::natural()
//!     .with_config(Config {
//!         verify: VerifyLevel::Deep,
//!         ..Config::diagnostic()
//!     })
//!     .with_sink(TracingSink);
//!
//! for key in [6, 2, 0, 4, 8, 5] {
//!     tree.insert(key).unwrap();
//! }
//! assert_eq!(tree.len(), 6);
//! assert!(tree.verify_structure().is_ok());
//! ```

#![deny(missing_docs, clippy::clone_on_ref_ptr)]

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod ordered;

#[cfg(test)]
mod test;

pub use config::{Config, FailurePosture, SinkErrorPolicy, VerifyLevel};
pub use diagnostics::DiagnosticsSink;
pub use error::{Error, ErrorKind};
pub use ordered::OrderedTree;
