//! Schema Dependency Graph
//!
//! Primary data structure using petgraph for record/enum dependencies.
//! - one node per fullname; adding a known fullname returns the existing node
//! - `Field` edges for record/enum typed fields
//! - `Items` edges for record/enum elements of (possibly nested) arrays, which
//!   also register the enclosing record as an owner of the element
//! - roots are record nodes nobody depends on, computed once every source is loaded
//!
//! The graph is shared by all generators of a run and is immutable once
//! [`SchemaGraph::build`] returns.

pub mod flatten;

pub use flatten::{flatten, DependencyGraph};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{GenError, Result};
use crate::schema::{FieldDef, NamedKind, NamedSchema, RawSchema, SchemaBody, SchemaSet};
use crate::types::PROP_PRIMARY;

/// Kind of dependency edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// Record or enum typed field
    Field,
    /// Record or enum element of an array field (1-N)
    Items,
}

/// A graph node: one named definition
#[derive(Debug, Clone)]
pub struct SchemaNode {
    pub schema: Arc<NamedSchema>,
    /// Records containing this node through an array field
    pub owners: Vec<NodeIndex>,
    pub is_root: bool,
}

impl SchemaNode {
    pub fn fullname(&self) -> &str {
        &self.schema.fullname
    }

    pub fn kind(&self) -> NamedKind {
        self.schema.kind()
    }
}

/// Dependency / ownership graph over named definitions
#[derive(Debug, Clone, Default)]
pub struct SchemaGraph {
    pub(crate) graph: DiGraph<SchemaNode, EdgeKind>,
    by_name: HashMap<String, NodeIndex>,
    roots: Vec<NodeIndex>,
}

impl SchemaGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add every top-level definition of `set` and detect roots
    pub fn build(set: &SchemaSet) -> Result<Self> {
        let mut graph = Self::new();
        for fullname in set.top_level() {
            graph.add_node(set, fullname)?;
        }
        let roots = graph.find_roots();
        info!(
            "Schema graph: {} nodes, {} edges, {} roots",
            graph.node_count(),
            graph.edge_count(),
            roots.len()
        );
        Ok(graph)
    }

    /// Add the definition `fullname` and everything its fields reach.
    ///
    /// Idempotent per fullname: a second call returns the same node.
    pub fn add_node(&mut self, set: &SchemaSet, fullname: &str) -> Result<NodeIndex> {
        if let Some(&idx) = self.by_name.get(fullname) {
            return Ok(idx);
        }

        let schema = set
            .get(fullname)
            .ok_or_else(|| GenError::schema(fullname, "undefined type"))?
            .clone();
        let idx = self.graph.add_node(SchemaNode {
            schema: schema.clone(),
            owners: Vec::new(),
            is_root: false,
        });
        self.by_name.insert(fullname.to_string(), idx);

        for field in schema.fields() {
            match &field.schema.body {
                SchemaBody::Named(target) if is_entity(set, target) => {
                    let child = self.add_node(set, target)?;
                    self.add_dependency(idx, child, EdgeKind::Field);
                }
                SchemaBody::Array(items) => self.unfold_array(set, idx, items)?,
                _ => {}
            }
        }

        debug!("Added {} node `{}`", schema.kind().as_str(), fullname);
        Ok(idx)
    }

    // Descend through array-of-array wrappers to the element
    fn unfold_array(&mut self, set: &SchemaSet, owner: NodeIndex, items: &RawSchema) -> Result<()> {
        match &items.body {
            SchemaBody::Array(inner) => self.unfold_array(set, owner, inner),
            SchemaBody::Named(target) if is_entity(set, target) => {
                let child = self.add_node(set, target)?;
                let owners = &mut self.graph[child].owners;
                if !owners.contains(&owner) {
                    owners.push(owner);
                }
                self.add_dependency(owner, child, EdgeKind::Items);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn add_dependency(&mut self, from: NodeIndex, to: NodeIndex, kind: EdgeKind) {
        if self.graph.find_edge(from, to).is_none() {
            self.graph.add_edge(from, to, kind);
        }
    }

    /// Mark record nodes without incoming dependency edges as roots.
    ///
    /// Must run after every source has been added.
    pub fn find_roots(&mut self) -> Vec<NodeIndex> {
        let roots: Vec<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|&idx| {
                self.graph[idx].kind() == NamedKind::Record
                    && self
                        .graph
                        .edges_directed(idx, Direction::Incoming)
                        .next()
                        .is_none()
            })
            .collect();

        for idx in self.graph.node_indices() {
            let is_root = roots.contains(&idx);
            self.graph[idx].is_root = is_root;
        }
        for &idx in &roots {
            info!("Found root `{}`", self.graph[idx].fullname());
        }

        self.roots = roots.clone();
        roots
    }

    pub fn roots(&self) -> &[NodeIndex] {
        &self.roots
    }

    pub fn node(&self, idx: NodeIndex) -> &SchemaNode {
        &self.graph[idx]
    }

    pub fn get(&self, fullname: &str) -> Option<NodeIndex> {
        self.by_name.get(fullname).copied()
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Direct dependencies in discovery order
    pub fn dependencies(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|edge| (edge.id().index(), edge.target()))
            .collect();
        edges.sort_by_key(|(order, _)| *order);
        edges.into_iter().map(|(_, target)| target).collect()
    }

    /// Nodes that depend on `idx`
    pub fn dependents(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.graph
            .neighbors_directed(idx, Direction::Incoming)
            .collect()
    }

    pub fn owners(&self, idx: NodeIndex) -> &[NodeIndex] {
        &self.graph[idx].owners
    }

    pub fn is_dependent(&self, idx: NodeIndex) -> bool {
        !self.graph[idx].owners.is_empty()
    }

    /// Has an array field whose element is a record or enum node
    pub fn is_owner(&self, idx: NodeIndex) -> bool {
        self.graph[idx].schema.fields().iter().any(|field| match &field.schema.body {
            SchemaBody::Array(items) => items
                .named()
                .and_then(|name| self.get(name))
                .map(|element| self.graph[element].kind() != NamedKind::Fixed)
                .unwrap_or(false),
            _ => false,
        })
    }

    /// Everything reachable from the roots in dependency order, then the roots
    pub fn scope_of_work(&self) -> Vec<NodeIndex> {
        let mut scope = flatten(self, &self.roots);
        for &root in &self.roots {
            if !scope.contains(&root) {
                scope.push(root);
            }
        }
        scope
    }

    /// Every dependent record and each of its owners needs exactly one primary key field
    pub fn validate_primary_keys(&self) -> Result<()> {
        for idx in self.graph.node_indices() {
            let node = &self.graph[idx];
            if node.kind() != NamedKind::Record || node.owners.is_empty() {
                continue;
            }
            check_primary_key(&node.schema)?;
            for &owner in &node.owners {
                check_primary_key(&self.graph[owner].schema)?;
            }
        }
        Ok(())
    }

    /// Export graph to DOT format for GraphViz visualization
    pub fn to_dot(&self) -> String {
        let mut output = String::new();

        output.push_str("digraph SchemaGraph {\n");
        output.push_str("  rankdir=LR;\n");
        output.push_str("  node [shape=box, style=\"filled,rounded\", fontname=\"Helvetica\", fontsize=10];\n");
        output.push_str("  edge [fontname=\"Helvetica\", fontsize=8, fontcolor=\"#808080\"];\n");
        output.push('\n');

        for idx in self.graph.node_indices() {
            let node = &self.graph[idx];
            let color = if node.kind() == NamedKind::Enum {
                "#FF5722"
            } else if node.is_root {
                "#4CAF50"
            } else if self.is_dependent(idx) {
                "#00BCD4"
            } else if self.is_owner(idx) {
                "#FF9800"
            } else {
                "#9E9E9E"
            };
            let mut label = node.schema.name.clone();
            for field in node.schema.fields() {
                label.push_str(&format!("\\n{}{}", field.name, if is_primary_field(field) { " *" } else { "" }));
            }
            output.push_str(&format!(
                "  \"{}\" [label=\"{}\", fillcolor=\"{}\"];\n",
                dot_id(node.fullname()),
                label,
                color
            ));
        }

        output.push('\n');

        for edge in self.graph.edge_references() {
            let source = dot_id(self.graph[edge.source()].fullname());
            let target = dot_id(self.graph[edge.target()].fullname());
            let style = match edge.weight() {
                EdgeKind::Field => "",
                EdgeKind::Items => " [style=dashed, label=\"1..N\"]",
            };
            output.push_str(&format!("  \"{}\" -> \"{}\"{};\n", source, target, style));
        }

        output.push_str("}\n");
        output
    }
}

impl DependencyGraph for SchemaGraph {
    type Id = NodeIndex;

    fn key(&self, id: NodeIndex) -> &str {
        self.graph[id].fullname()
    }

    fn dependencies_of(&self, id: NodeIndex) -> Vec<NodeIndex> {
        self.dependencies(id)
    }
}

fn is_entity(set: &SchemaSet, fullname: &str) -> bool {
    set.get(fullname)
        .map(|schema| schema.kind() != NamedKind::Fixed)
        .unwrap_or(false)
}

fn is_primary_field(field: &FieldDef) -> bool {
    let primary = |props: &crate::schema::Properties| matches!(props.get(PROP_PRIMARY), Some(Value::Bool(true)));
    primary(&field.props) || primary(&field.schema.props)
}

fn check_primary_key(schema: &NamedSchema) -> Result<()> {
    let count = schema.fields().iter().filter(|f| is_primary_field(f)).count();
    match count {
        1 => Ok(()),
        0 => Err(GenError::graph(
            &schema.fullname,
            "record in a 1-N relation has no primary key field",
        )),
        n => Err(GenError::graph(
            &schema.fullname,
            format!("record has {} primary key fields, expected exactly one", n),
        )),
    }
}

fn dot_id(fullname: &str) -> String {
    fullname.replace(['.', '-'], "_")
}
