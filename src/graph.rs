//! The build graph, a DAG between compilation units.
//!
//! Nodes live in an arena and refer to their dependencies by NodeId, so a
//! unit imported from many places is one shared node.

use crate::densemap::{dense_id, DenseMap};
use crate::error::GraphError;
use crate::unit::{valid_identity, Context, Unit};
use rustc_hash::{FxHashMap, FxHashSet};
use std::path::PathBuf;

dense_id!(
    /// Index of a unit in the graph.
    NodeId
);

/// A unit as placed in the graph: the descriptor, the context it is built in,
/// and its resolved dependencies.
#[derive(Debug)]
pub struct Node<'a> {
    unit: &'a Unit,
    ctx: &'a Context,
    deps: Vec<NodeId>,
    /// Staleness verdict; None until the analyzer has visited the node.
    fresh: Option<bool>,
}

impl<'a> Node<'a> {
    pub fn unit(&self) -> &'a Unit {
        self.unit
    }

    pub fn ctx(&self) -> &'a Context {
        self.ctx
    }

    pub fn identity(&self) -> &'a str {
        &self.unit.identity
    }

    pub fn deps(&self) -> &[NodeId] {
        &self.deps
    }

    /// True if this node and everything it depends on is up to date.
    /// Unvisited nodes count as stale.
    pub fn is_fresh(&self) -> bool {
        self.fresh == Some(true)
    }

    pub fn verdict(&self) -> Option<bool> {
        self.fresh
    }

    pub(crate) fn set_fresh(&mut self, fresh: bool) {
        debug_assert!(self.fresh.is_none(), "{} judged twice", self.identity());
        self.fresh = Some(fresh);
    }

    pub fn artifact_path(&self) -> PathBuf {
        self.ctx.artifact_path(self.unit)
    }

    pub fn binary_path(&self) -> PathBuf {
        self.ctx.binary_path(self.unit)
    }
}

pub struct Graph<'a> {
    ctx: &'a Context,
    nodes: DenseMap<NodeId, Node<'a>>,
    by_identity: FxHashMap<&'a str, NodeId>,
    roots: Vec<NodeId>,
}

/// Internal state used while constructing a Graph.
struct Builder<'a> {
    ctx: &'a Context,
    units: FxHashMap<&'a str, &'a Unit>,
    nodes: DenseMap<NodeId, Node<'a>>,
    seen: FxHashMap<&'a str, NodeId>,
    /// Units currently being walked, for cycle reporting.
    stack: Vec<&'a str>,
}

impl<'a> Builder<'a> {
    fn new(ctx: &'a Context, units: &'a [Unit]) -> Result<Self, GraphError> {
        let mut map = FxHashMap::default();
        for unit in units {
            if !valid_identity(&unit.identity) {
                return Err(GraphError::InvalidIdentity {
                    identity: unit.identity.clone(),
                });
            }
            if !unit.synthetic && unit.srcs.is_empty() {
                return Err(GraphError::NoSources {
                    identity: unit.identity.clone(),
                });
            }
            if map.insert(unit.identity.as_str(), unit).is_some() {
                return Err(GraphError::DuplicateIdentity {
                    identity: unit.identity.clone(),
                });
            }
        }
        Ok(Builder {
            ctx,
            units: map,
            nodes: DenseMap::default(),
            seen: FxHashMap::default(),
            stack: Vec::new(),
        })
    }

    /// Depth-first: a node is only created once all its dependencies exist.
    fn walk(&mut self, unit: &'a Unit) -> Result<NodeId, GraphError> {
        let identity = unit.identity.as_str();
        if let Some(&id) = self.seen.get(identity) {
            return Ok(id);
        }
        if let Some(pos) = self.stack.iter().position(|&i| i == identity) {
            let mut path: Vec<String> =
                self.stack[pos..].iter().map(|s| s.to_string()).collect();
            path.push(identity.to_string());
            return Err(GraphError::Cycle { path });
        }

        self.stack.push(identity);
        let mut deps = Vec::with_capacity(unit.imports.len());
        for import in &unit.imports {
            let dep = match self.units.get(import.as_str()) {
                Some(&dep) => dep,
                None => {
                    return Err(GraphError::MissingDependency {
                        identity: import.clone(),
                        required_by: identity.to_string(),
                    })
                }
            };
            deps.push(self.walk(dep)?);
        }
        self.stack.pop();

        let id = self.nodes.push(Node {
            unit,
            ctx: self.ctx,
            deps,
            fresh: None,
        });
        self.seen.insert(identity, id);
        Ok(id)
    }

    fn finish(self, roots: Vec<NodeId>) -> Result<Graph<'a>, GraphError> {
        // Every identity must map to exactly one node, and that node must be
        // the one recorded for it.  `walk` upholds this for any input, so a
        // violation here is a bug in the builder, not in the manifest.
        for (id, node) in self.nodes.iter() {
            if self.seen.get(node.identity()) != Some(&id) {
                return Err(GraphError::Divergent {
                    identity: node.identity().to_string(),
                });
            }
        }
        let mut check = FxHashSet::default();
        for &root in &roots {
            if !check.insert(root) {
                return Err(GraphError::Divergent {
                    identity: self.nodes[root].identity().to_string(),
                });
            }
        }
        Ok(Graph {
            ctx: self.ctx,
            nodes: self.nodes,
            by_identity: self.seen,
            roots,
        })
    }
}

impl<'a> Graph<'a> {
    /// Builds the graph with every unit as a root, in the given order.
    pub fn build(ctx: &'a Context, units: &'a [Unit]) -> Result<Self, GraphError> {
        let mut builder = Builder::new(ctx, units)?;
        let mut roots = Vec::with_capacity(units.len());
        for unit in units {
            roots.push(builder.walk(unit)?);
        }
        builder.finish(roots)
    }

    /// Builds the graph reachable from the named roots only.  Naming the
    /// same root twice yields it once.
    pub fn build_roots(
        ctx: &'a Context,
        units: &'a [Unit],
        names: &[&str],
    ) -> Result<Self, GraphError> {
        let mut builder = Builder::new(ctx, units)?;
        let mut roots = Vec::with_capacity(names.len());
        let mut requested = FxHashSet::default();
        for &name in names {
            if !requested.insert(name) {
                continue;
            }
            let unit = match builder.units.get(name) {
                Some(&unit) => unit,
                None => {
                    return Err(GraphError::UnknownRoot {
                        identity: name.to_string(),
                    })
                }
            };
            roots.push(builder.walk(unit)?);
        }
        builder.finish(roots)
    }

    pub fn ctx(&self) -> &'a Context {
        self.ctx
    }

    pub fn node(&self, id: NodeId) -> &Node<'a> {
        &self.nodes[id]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node<'a> {
        &mut self.nodes[id]
    }

    pub fn lookup(&self, identity: &str) -> Option<NodeId> {
        self.by_identity.get(identity).copied()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Number of unique units reachable from the roots.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes, dependencies before dependents.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node<'a>)> {
        self.nodes.iter()
    }
}
