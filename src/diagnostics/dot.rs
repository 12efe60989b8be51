//! Graphviz rendering of [`Snapshot`]s.

use std::collections::HashMap;
use std::ffi::{OsStr, OsString};
use std::fmt::{self, Write as _};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use super::{Context, DiagnosticsSink, NodeId, Severity, SinkError, Snapshot};

/// Renders `snapshot` as a Graphviz digraph of record-shaped nodes.
///
/// Nodes are named `node_0`, `node_1`, ... in pre-order. The numbering restarts on every call.
///
/// # Examples
///
/// ```
/// use ordtree::{diagnostics::dot, OrderedTree};
///
/// let mut tree = OrderedTree::<i32>::natural();
/// tree.insert(1).unwrap();
/// tree.insert(0).unwrap();
///
/// let graph = dot::render(&tree.snapshot());
/// assert!(graph.starts_with("digraph {"));
/// assert!(graph.contains("node_0 -> node_1;"));
/// ```
pub fn render<K: fmt::Debug>(snapshot: &Snapshot<'_, K>) -> String {
    let names: HashMap<NodeId, usize> = snapshot
        .nodes()
        .iter()
        .enumerate()
        .map(|(i, node)| (node.id, i))
        .collect();

    let mut out = String::from("digraph {\nrankdir=TB;\nnodesep=0.9;\nranksep=0.75;\n");
    // Writing to a `String` can't fail.
    for node in snapshot.nodes() {
        let _ = writeln!(
            out,
            "node_{}[shape=record,label=\" {{ addr: {} | data: {:?} | {{ L: {} | R: {} }} }} \",rank={}];",
            names[&node.id],
            node.id,
            node.key,
            Child(node.left),
            Child(node.right),
            node.rank,
        );
        for child in node.left.iter().chain(node.right.iter()) {
            let _ = writeln!(out, "node_{} -> node_{};", names[&node.id], names[child]);
        }
    }
    out.push('}');
    out
}

struct Child(Option<NodeId>);

impl fmt::Display for Child {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(id) => fmt::Display::fmt(&id, f),
            None => f.write_str("nil"),
        }
    }
}

/// Appends an HTML report block per snapshot to a writer: a heading with the severity, timestamp
/// and call site, the error description, the message, and the Graphviz source of the tree.
///
/// With [`with_images`][Self::with_images] every snapshot is also drawn as an SVG by the Graphviz
/// `dot` binary and linked from its block. Failing to run the renderer is reported as
/// [`SinkError::Unavailable`].
#[derive(Debug)]
pub struct GraphvizSink<W> {
    out: W,
    images: Option<PathBuf>,
    renderer: OsString,
    drawn: usize,
}

impl<W: io::Write> GraphvizSink<W> {
    /// Reports into `out`.
    pub fn new(out: W) -> Self {
        Self {
            out,
            images: None,
            renderer: OsString::from("dot"),
            drawn: 0,
        }
    }

    /// Draws every snapshot into `dir` as `graph-N.svg`, next to the `graph-N.dot` it was drawn
    /// from. `dir` is created when needed.
    pub fn with_images(mut self, dir: impl Into<PathBuf>) -> Self {
        self.images = Some(dir.into());
        self
    }

    /// Program drawing the images, `dot` by default. It's run as
    /// `<program> -Tsvg -o <image> <source>`.
    pub fn with_renderer(mut self, program: impl Into<OsString>) -> Self {
        self.renderer = program.into();
        self
    }

    /// Returns the writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Borrows the writer.
    pub fn get_ref(&self) -> &W {
        &self.out
    }
}

impl<K, W> DiagnosticsSink<K> for GraphvizSink<W>
where
    K: fmt::Debug,
    W: io::Write,
{
    fn render(
        &mut self,
        snapshot: &Snapshot<'_, K>,
        context: &Context<'_>,
    ) -> Result<(), SinkError> {
        let time = context.timestamp.format("%F %T");
        let mut block = String::from("<pre>\n");
        match context.severity() {
            Severity::Debug => {
                let _ = writeln!(block, "<h3>[DEBUG] [{}] from {}</h3>", time, context.location);
            }
            Severity::Error => {
                let _ = writeln!(
                    block,
                    "<h3 style=\"color:red;\">[ERROR] [{}] from {}</h3>",
                    time, context.location
                );
                let _ = writeln!(block, "<h4><font color=\"red\">err: {}</font></h4>", context.kind);
            }
        }
        if let Some(message) = context.message {
            let _ = writeln!(block, "what: {}", message);
        }
        let _ = writeln!(block, "size: {} (reachable: {})", snapshot.size(), snapshot.len());
        let graph = render(snapshot);
        block.push_str(&graph);
        block.push('\n');
        if let Some(dir) = &self.images {
            let image = draw(dir, &self.renderer, self.drawn, &graph)?;
            self.drawn += 1;
            let _ = writeln!(block, "<img src={} width=50%>", image.display());
        }
        block.push_str("</pre>\n<hr color=\"black\" />\n");

        self.out.write_all(block.as_bytes())?;
        self.out.flush()?;
        Ok(())
    }
}

/// Writes `graph` to `dir/graph-{n}.dot` and runs `renderer` on it. Returns the image path.
fn draw(dir: &Path, renderer: &OsStr, n: usize, graph: &str) -> Result<PathBuf, SinkError> {
    fs::create_dir_all(dir)?;
    let source = dir.join(format!("graph-{}.dot", n));
    let image = source.with_extension("svg");
    fs::write(&source, graph)?;

    let status = Command::new(renderer)
        .arg("-Tsvg")
        .arg("-o")
        .arg(&image)
        .arg(&source)
        .stdin(Stdio::null())
        .status()
        .map_err(|e| SinkError::Unavailable(format!("failed to run {:?}: {}", renderer, e)))?;
    if !status.success() {
        return Err(SinkError::Unavailable(format!("{:?} failed with {}", renderer, status)));
    }
    Ok(image)
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::panic::Location;
    use std::process;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{Config, ErrorKind, OrderedTree, SinkErrorPolicy};

    /// A fresh scratch directory for one test.
    fn scratch(name: &str) -> PathBuf {
        let dir = env::temp_dir().join(format!("ordtree-{}-{}", name, process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn tree_of(keys: &[i32]) -> OrderedTree<i32> {
        let mut tree = OrderedTree::natural().with_config(Config::production());
        for &key in keys {
            tree.insert(key).unwrap();
        }
        tree
    }

    #[test]
    fn empty_graph() {
        let tree = tree_of(&[]);
        assert_eq!(
            render(&tree.snapshot()),
            "digraph {\nrankdir=TB;\nnodesep=0.9;\nranksep=0.75;\n}"
        );
    }

    #[test]
    fn edges_follow_children() {
        let tree = tree_of(&[2, 1, 3]);
        let graph = render(&tree.snapshot());

        assert!(graph.contains("node_0 -> node_1;"));
        assert!(graph.contains("node_0 -> node_2;"));
        assert!(!graph.contains("node_1 ->"));
        assert_eq!(graph.matches("shape=record").count(), 3);
        assert!(graph.contains("| data: 3 | { L: nil | R: nil } } \",rank=2];"));
    }

    #[test]
    fn numbering_restarts_every_render() {
        let tree = tree_of(&[4, 2, 6, 1]);
        let snapshot = tree.snapshot();

        assert_eq!(render(&snapshot), render(&snapshot));
        assert!(!render(&snapshot).contains("node_4"));
    }

    #[test]
    fn report_block() {
        let tree = tree_of(&[1]);
        let mut sink = GraphvizSink::new(Vec::new());

        let context = Context::new(ErrorKind::AllocationFailure, Location::caller())
            .with_message("no room");
        sink.render(&tree.snapshot(), &context).unwrap();

        let report = String::from_utf8(sink.into_inner()).unwrap();
        assert!(report.starts_with("<pre>\n<h3 style=\"color:red;\">[ERROR] ["));
        assert!(report.contains("err: memory allocation failed"));
        assert!(report.contains("what: no room\n"));
        assert!(report.contains("size: 1 (reachable: 1)\n"));
        assert!(report.contains("data: 1"));
        assert!(report.ends_with("</pre>\n<hr color=\"black\" />\n"));
    }

    #[test]
    fn debug_reports_skip_the_error_line() {
        let tree = tree_of(&[1]);
        let mut sink = GraphvizSink::new(Vec::new());

        sink.render(
            &tree.snapshot(),
            &Context::new(ErrorKind::None, Location::caller()),
        )
        .unwrap();

        let report = String::from_utf8(sink.into_inner()).unwrap();
        assert!(report.contains("<h3>[DEBUG] ["));
        assert!(!report.contains("err:"));
        assert!(!report.contains("what:"));
    }

    #[test]
    fn missing_renderer_is_unavailable() {
        let tree = tree_of(&[2, 1]);
        let dir = scratch("missing-renderer");
        let mut sink = GraphvizSink::new(Vec::new())
            .with_images(&dir)
            .with_renderer("ordtree-no-such-renderer");

        let err = sink
            .render(
                &tree.snapshot(),
                &Context::new(ErrorKind::None, Location::caller()),
            )
            .unwrap_err();

        assert!(matches!(err, SinkError::Unavailable(_)));
        // The graph source is written before the renderer runs.
        let source = fs::read_to_string(dir.join("graph-0.dot")).unwrap();
        assert!(source.contains("node_0 -> node_1;"));
        assert!(sink.get_ref().is_empty());
        let _ = fs::remove_dir_all(&dir);
    }

    #[cfg(unix)]
    #[test]
    fn failing_renderer_is_unavailable() {
        let tree = tree_of(&[1]);
        let dir = scratch("failing-renderer");
        let mut sink = GraphvizSink::new(Vec::new())
            .with_images(&dir)
            .with_renderer("false");

        let err = sink
            .render(
                &tree.snapshot(),
                &Context::new(ErrorKind::None, Location::caller()),
            )
            .unwrap_err();

        assert!(matches!(err, SinkError::Unavailable(_)));
        let _ = fs::remove_dir_all(&dir);
    }

    #[cfg(unix)]
    #[test]
    fn drawn_images_are_linked() {
        let tree = tree_of(&[1]);
        let dir = scratch("linked-images");
        let mut sink = GraphvizSink::new(Vec::new())
            .with_images(&dir)
            .with_renderer("true");
        let context = Context::new(ErrorKind::None, Location::caller());

        sink.render(&tree.snapshot(), &context).unwrap();
        sink.render(&tree.snapshot(), &context).unwrap();

        let report = String::from_utf8(sink.into_inner()).unwrap();
        let first = format!("<img src={} width=50%>\n", dir.join("graph-0.svg").display());
        let second = format!("<img src={} width=50%>\n", dir.join("graph-1.svg").display());
        assert!(report.contains(&first));
        assert!(report.contains(&second));
        assert!(dir.join("graph-1.dot").exists());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    #[should_panic(expected = "renderer unavailable")]
    fn tree_applies_policy_to_missing_renderer() {
        let dir = scratch("tree-policy");
        let mut tree = OrderedTree::<i32>::natural()
            .with_config(Config {
                dump_on_insert: true,
                on_sink_error: SinkErrorPolicy::Panic,
                ..Config::production()
            })
            .with_sink(
                GraphvizSink::new(io::sink())
                    .with_images(dir)
                    .with_renderer("ordtree-no-such-renderer"),
            );

        let _ = tree.insert(1);
    }
}
