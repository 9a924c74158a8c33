//! Staleness analysis: decides which units must be rebuilt by comparing the
//! mtimes of sources, cached artifacts and binaries.
//!
//! A unit is fresh only if it and all of its transitive dependencies are
//! fresh, so the build plan can skip a fresh unit's whole subtree.

use crate::fs::{FileSystem, MTime};
use crate::graph::{Graph, Node, NodeId};
use std::fmt;
use std::path::PathBuf;

/// Why a unit must be rebuilt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reason {
    /// The build was forced.
    Forced,
    /// Test binaries are never cached.
    TestScope,
    /// No cached artifact.
    Missing(PathBuf),
    /// A dependency is itself stale.
    DependencyStale(String),
    /// A dependency's artifact is newer than ours, or gone.
    DependencyNewer(PathBuf),
    /// The binary is older than the artifact it was linked from, or gone.
    BinaryOutdated(PathBuf),
    /// A source file changed since the artifact was built, or is gone.
    SourceNewer(PathBuf),
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::Forced => write!(f, "build forced"),
            Reason::TestScope => write!(f, "test scoped"),
            Reason::Missing(path) => write!(f, "{} is missing", path.display()),
            Reason::DependencyStale(id) => write!(f, "dependency {} is stale", id),
            Reason::DependencyNewer(path) => {
                write!(f, "dependency {} is newer", path.display())
            }
            Reason::BinaryOutdated(path) => write!(f, "{} is out of date", path.display()),
            Reason::SourceNewer(path) => write!(f, "source {} is newer", path.display()),
        }
    }
}

/// Judges a single node whose dependencies have all been judged already.
/// Returns None when the node is fresh.
fn check(graph: &Graph, node: &Node, fs: &dyn FileSystem) -> std::io::Result<Option<Reason>> {
    let unit = node.unit();
    let ctx = node.ctx();
    if unit.synthetic {
        return Ok(None);
    }
    if ctx.force {
        return Ok(Some(Reason::Forced));
    }
    if ctx.test_scope {
        return Ok(Some(Reason::TestScope));
    }

    let artifact = node.artifact_path();
    let built = fs.stat(&artifact)?;
    if built.is_missing() {
        return Ok(Some(Reason::Missing(artifact)));
    }

    for &dep in node.deps() {
        let dep = graph.node(dep);
        if dep.unit().synthetic {
            continue;
        }
        if !dep.is_fresh() {
            return Ok(Some(Reason::DependencyStale(dep.identity().to_string())));
        }
    }

    for &dep in node.deps() {
        let dep = graph.node(dep);
        if dep.unit().synthetic {
            continue;
        }
        let path = dep.artifact_path();
        let mtime = fs.stat(&path)?;
        if mtime.is_missing() || mtime.newer_than(built) {
            return Ok(Some(Reason::DependencyNewer(path)));
        }
    }

    if unit.entry {
        let bin = node.binary_path();
        let mtime = fs.stat(&bin)?;
        if mtime.is_missing() || built.newer_than(mtime) {
            return Ok(Some(Reason::BinaryOutdated(bin)));
        }
    }

    for src in unit.source_paths() {
        // A source touched in the same instant as the artifact was written
        // may not be in it.
        match fs.stat(&src)? {
            MTime::Stamp(t) if MTime::Stamp(t) < built => {}
            _ => return Ok(Some(Reason::SourceNewer(src))),
        }
    }

    Ok(None)
}

/// Annotates every node reachable from the graph's roots with its verdict.
/// Each node is judged once, after all of its dependencies.  Stale verdicts
/// are reported through the context's Progress.
///
/// Returns the number of stale nodes.
pub fn compute(graph: &mut Graph, fs: &dyn FileSystem) -> anyhow::Result<usize> {
    let mut stale = 0;
    let roots = graph.roots().to_vec();
    for root in roots {
        walk(graph, fs, root, &mut stale)?;
    }
    Ok(stale)
}

fn walk(
    graph: &mut Graph,
    fs: &dyn FileSystem,
    id: NodeId,
    stale: &mut usize,
) -> anyhow::Result<bool> {
    if let Some(fresh) = graph.node(id).verdict() {
        return Ok(fresh);
    }
    let deps = graph.node(id).deps().to_vec();
    for dep in deps {
        walk(graph, fs, dep, stale)?;
    }

    let node = graph.node(id);
    let reason = check(graph, node, fs)
        .map_err(|err| anyhow::anyhow!("checking {}: {}", node.identity(), err))?;
    let fresh = match reason {
        None => true,
        Some(reason) => {
            node.ctx().progress.explain(node.identity(), &reason);
            *stale += 1;
            false
        }
    };
    graph.node_mut(id).set_fresh(fresh);
    Ok(fresh)
}
