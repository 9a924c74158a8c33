//! Build planning and execution.
//!
//! A Plan holds one action per unique unit reachable from the graph's roots.
//! An action for a stale unit runs its dependencies' actions before its own
//! pipeline, so ordering comes from the structure of the actions alone.

use crate::densemap::{dense_id, DenseMap};
use crate::error::{BuildError, Stage};
use crate::graph::{Graph, NodeId};
use crate::pipeline::{self, Toolchain};
use rustc_hash::FxHashMap;

dense_id!(
    /// Index of an action in a Plan.
    ActionId
);

#[derive(Debug)]
enum Action {
    /// The unit and everything below it is fresh; nothing to run.
    UpToDate(NodeId),
    /// Build the dependencies, then the unit itself.
    Build { node: NodeId, deps: Vec<ActionId> },
}

impl Action {
    fn node(&self) -> NodeId {
        match *self {
            Action::UpToDate(node) => node,
            Action::Build { node, .. } => node,
        }
    }
}

/// Per-action state while a plan runs.
#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    Pending,
    Done,
    /// Failed; carries the identity whose pipeline failed.
    Failed(String),
}

/// What a successful run did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Report {
    pub compiled: usize,
    pub linked: usize,
    pub up_to_date: usize,
}

impl Report {
    pub fn is_noop(&self) -> bool {
        self.compiled == 0 && self.linked == 0
    }
}

pub struct Plan<'a> {
    actions: DenseMap<ActionId, Action>,
    by_identity: FxHashMap<&'a str, ActionId>,
    roots: Vec<ActionId>,
}

impl<'a> Plan<'a> {
    /// Plans a build of all of `graph`'s roots.  Staleness must already have
    /// been computed.
    pub fn new(graph: &Graph<'a>) -> Self {
        let mut plan = Plan {
            actions: DenseMap::default(),
            by_identity: FxHashMap::default(),
            roots: Vec::new(),
        };
        for &root in graph.roots() {
            let action = plan.action_for(graph, root);
            plan.roots.push(action);
        }
        plan
    }

    /// Get-or-create the action for a node.
    fn action_for(&mut self, graph: &Graph<'a>, id: NodeId) -> ActionId {
        let node = graph.node(id);
        if let Some(&action) = self.by_identity.get(node.identity()) {
            return action;
        }
        if node.is_fresh() {
            // Freshness covers the whole subtree; no need to descend.
            let action = self.actions.push(Action::UpToDate(id));
            self.by_identity.insert(node.identity(), action);
            return action;
        }

        let action = self.actions.push(Action::Build {
            node: id,
            deps: Vec::new(),
        });
        self.by_identity.insert(node.identity(), action);
        let deps: Vec<ActionId> = node
            .deps()
            .iter()
            .map(|&dep| self.action_for(graph, dep))
            .collect();
        if let Action::Build { deps: slot, .. } = &mut self.actions[action] {
            *slot = deps;
        }
        action
    }

    /// Number of distinct actions, one per unit.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn roots(&self) -> &[ActionId] {
        &self.roots
    }

    pub fn lookup(&self, identity: &str) -> Option<ActionId> {
        self.by_identity.get(identity).copied()
    }

    /// True if the unit's action does nothing.
    pub fn is_up_to_date(&self, action: ActionId) -> bool {
        matches!(self.actions[action], Action::UpToDate(_))
    }

    /// Runs every root in order.  Stops once `keep_going` roots have failed
    /// (0 means never stop), and returns the first failure.
    pub fn run(
        &self,
        graph: &Graph<'a>,
        toolchain: &dyn Toolchain,
        keep_going: usize,
    ) -> Result<Report, BuildError> {
        let mut run = Run {
            plan: self,
            graph,
            toolchain,
            states: DenseMap::parallel(&self.actions, State::Pending),
            report: Report::default(),
        };
        let mut failures = 0;
        let mut first = None;
        for &root in &self.roots {
            if let Err(err) = run.action(root) {
                failures += 1;
                if first.is_none() {
                    first = Some(err);
                }
                if keep_going > 0 && failures >= keep_going {
                    break;
                }
            }
        }
        match first {
            Some(err) => Err(err),
            None => Ok(run.report),
        }
    }
}

/// State of one execution of a Plan.
struct Run<'p, 'a> {
    plan: &'p Plan<'a>,
    graph: &'p Graph<'a>,
    toolchain: &'p dyn Toolchain,
    states: DenseMap<ActionId, State>,
    report: Report,
}

impl<'p, 'a> Run<'p, 'a> {
    /// Runs an action once; later calls return the first outcome.
    fn action(&mut self, id: ActionId) -> Result<(), BuildError> {
        let (plan, graph) = (self.plan, self.graph);
        let action = &plan.actions[id];
        let node = graph.node(action.node());
        match &self.states[id] {
            State::Done => return Ok(()),
            State::Failed(cause) if cause == node.identity() => {
                return Err(BuildError::new(
                    node.identity(),
                    Stage::Dependency,
                    anyhow::anyhow!("failed earlier"),
                ));
            }
            State::Failed(cause) => return Err(BuildError::dependency(node.identity(), cause)),
            State::Pending => {}
        }

        let result = match action {
            Action::UpToDate(_) => {
                node.ctx().progress.up_to_date(node.identity());
                self.report.up_to_date += 1;
                Ok(())
            }
            Action::Build { deps, .. } => self.build(id, deps),
        };
        self.states[id] = match &result {
            Ok(()) => State::Done,
            Err(err) => State::Failed(err.identity.clone()),
        };
        result
    }

    fn build(&mut self, id: ActionId, deps: &[ActionId]) -> Result<(), BuildError> {
        // Fail fast: the first failing dependency aborts the rest.
        for &dep in deps {
            self.action(dep)?;
        }

        let graph = self.graph;
        let node = graph.node(self.plan.actions[id].node());
        let progress = &node.ctx().progress;
        let artifact = pipeline::compile(node, self.toolchain).map_err(|err| {
            progress.failed(&err);
            err
        })?;
        self.report.compiled += 1;
        if node.unit().entry {
            pipeline::link(node, &artifact, self.toolchain).map_err(|err| {
                progress.failed(&err);
                err
            })?;
            self.report.linked += 1;
        }
        Ok(())
    }
}
