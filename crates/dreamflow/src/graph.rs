//! Workflow graph builder and the built, immutable graph.
//!
//! A graph is a static registry of named nodes plus, for each node, either
//! an unconditional edge to one successor or a conditional edge table keyed
//! on the value of `state.next` after the node runs. Graphs are validated
//! once at construction and shared read-only; they are never part of
//! per-thread state.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::error::EngineError;
use crate::node::Node;
use crate::state::FlowState;

/// Sentinel target for terminal edges and the reserved terminal value of
/// `state.next`.
pub const END: &str = "end";

/// Errors detected while building a workflow graph. Fatal at startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphError {
    #[error("workflow entry point not set")]
    NoEntryPoint,

    #[error("unknown node id: {0}")]
    UnknownNode(String),

    #[error("node registered twice: {0}")]
    DuplicateNode(String),

    #[error("node '{0}' has no outgoing edge")]
    MissingEdge(String),

    #[error("node '{0}' has both a direct edge and a conditional edge table")]
    ConflictingEdges(String),
}

#[derive(Debug, Clone)]
enum Edge {
    Direct(String),
    Conditional(HashMap<String, String>),
}

/// Builder for workflow graphs with a fluent API.
pub struct GraphBuilder<S: FlowState> {
    name: String,
    nodes: HashMap<String, Arc<dyn Node<S>>>,
    order: Vec<String>,
    edges: HashMap<String, Edge>,
    entry: Option<String>,
    duplicate: Option<String>,
    conflict: Option<String>,
}

impl<S: FlowState> Default for GraphBuilder<S> {
    fn default() -> Self {
        Self {
            name: String::new(),
            nodes: HashMap::new(),
            order: Vec::new(),
            edges: HashMap::new(),
            entry: None,
            duplicate: None,
            conflict: None,
        }
    }
}

impl<S: FlowState> GraphBuilder<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the workflow name, used in logs.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Register a node under a unique name.
    pub fn node(mut self, id: impl Into<String>, node: impl Node<S> + 'static) -> Self {
        let id = id.into();
        if self.nodes.insert(id.clone(), Arc::new(node)).is_some() {
            self.duplicate.get_or_insert(id.clone());
        } else {
            self.order.push(id);
        }
        self
    }

    /// Set the entry point node.
    pub fn entry(mut self, id: impl Into<String>) -> Self {
        self.entry = Some(id.into());
        self
    }

    /// Add an unconditional edge; `to` may be [`END`].
    pub fn edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        let from = from.into();
        if self.edges.insert(from.clone(), Edge::Direct(to.into())).is_some() {
            self.conflict.get_or_insert(from);
        }
        self
    }

    /// Add a conditional edge table keyed on the value of `state.next`
    /// after `from` runs; targets may be [`END`].
    pub fn conditional_edges(
        mut self,
        from: impl Into<String>,
        table: Vec<(&str, &str)>,
    ) -> Self {
        let from = from.into();
        let table = table
            .into_iter()
            .map(|(value, target)| (value.to_string(), target.to_string()))
            .collect();
        if self.edges.insert(from.clone(), Edge::Conditional(table)).is_some() {
            self.conflict.get_or_insert(from);
        }
        self
    }

    /// Validate and build the graph.
    pub fn build(self) -> Result<Graph<S>, GraphError> {
        if let Some(id) = self.duplicate {
            return Err(GraphError::DuplicateNode(id));
        }
        if let Some(id) = self.conflict {
            return Err(GraphError::ConflictingEdges(id));
        }

        let entry = self.entry.ok_or(GraphError::NoEntryPoint)?;
        if !self.nodes.contains_key(&entry) {
            return Err(GraphError::UnknownNode(entry));
        }

        for (from, edge) in &self.edges {
            if !self.nodes.contains_key(from) {
                return Err(GraphError::UnknownNode(from.clone()));
            }
            let targets: Vec<&String> = match edge {
                Edge::Direct(to) => vec![to],
                Edge::Conditional(table) => table.values().collect(),
            };
            for to in targets {
                if to != END && !self.nodes.contains_key(to) {
                    return Err(GraphError::UnknownNode(to.clone()));
                }
            }
        }

        // Every node must route somewhere; terminal nodes point at END.
        for id in &self.order {
            if !self.edges.contains_key(id) {
                return Err(GraphError::MissingEdge(id.clone()));
            }
        }

        Ok(Graph {
            name: self.name,
            nodes: self.nodes,
            edges: self.edges,
            entry,
        })
    }
}

/// A validated, immutable workflow graph.
pub struct Graph<S: FlowState> {
    name: String,
    nodes: HashMap<String, Arc<dyn Node<S>>>,
    edges: HashMap<String, Edge>,
    entry: String,
}

impl<S: FlowState> Graph<S> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }

    /// Look up a registered node.
    pub(crate) fn node(&self, id: &str) -> Result<&Arc<dyn Node<S>>, EngineError> {
        self.nodes
            .get(id)
            .ok_or_else(|| EngineError::UnknownNode(id.to_string()))
    }

    /// Resolve the successor of `from` given the value of `state.next`.
    ///
    /// Returns `None` when the hop terminates the run: a direct edge to
    /// [`END`], a conditional entry targeting [`END`], or the reserved
    /// terminal value itself, which needs no table lookup.
    pub(crate) fn successor(
        &self,
        from: &str,
        next_value: &str,
    ) -> Result<Option<&str>, EngineError> {
        let edge = self
            .edges
            .get(from)
            .ok_or_else(|| EngineError::UnknownNode(from.to_string()))?;

        let target = match edge {
            Edge::Direct(to) => to.as_str(),
            Edge::Conditional(_) if next_value == END => END,
            Edge::Conditional(table) => table
                .get(next_value)
                .map(String::as_str)
                .ok_or_else(|| EngineError::NoMatchingEdge {
                    node: from.to_string(),
                    value: next_value.to_string(),
                })?,
        };

        Ok(if target == END { None } else { Some(target) })
    }
}
