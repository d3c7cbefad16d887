//! Class hierarchy index built from the classes of one archive.
//!
//! Each class is a node in an arena graph with edges pointing at its direct supertypes.
//! Supertypes outside the archive get placeholder nodes with no outgoing edges, so a walk
//! stops at the first class the archive does not define.

use deobf_core::ClassFile;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use std::collections::{HashMap, HashSet, VecDeque};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassNode {
    pub name: String,
    /// False for placeholder nodes created from a supertype reference.
    pub in_archive: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupertypeKind {
    Extends,
    Implements,
}

/// Edge weight: the kind of supertype and its position in the declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Supertype {
    pub kind: SupertypeKind,
    pub order: usize,
}

#[derive(Debug, Default)]
pub struct ClassHierarchy {
    graph: DiGraph<ClassNode, Supertype>,
    index: HashMap<String, NodeIndex>,
}

impl ClassHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a class and its direct supertypes.
    ///
    /// A class already registered from the archive keeps its first declaration.
    pub fn insert(&mut self, name: &str, super_name: Option<&str>, interfaces: &[&str]) {
        let node = self.node(name);
        if self.graph[node].in_archive {
            tracing::warn!("class {} defined more than once, keeping first", name);
            return;
        }
        self.graph[node].in_archive = true;

        let supertypes = super_name
            .map(|s| (s, SupertypeKind::Extends))
            .into_iter()
            .chain(interfaces.iter().map(|i| (*i, SupertypeKind::Implements)));
        for (order, (parent, kind)) in supertypes.enumerate() {
            let parent = self.node(parent);
            self.graph.add_edge(node, parent, Supertype { kind, order });
        }
    }

    /// Registers a decoded class.
    pub fn insert_class(&mut self, class: &ClassFile) -> deobf_core::Result<()> {
        let interfaces = class.interface_names()?;
        self.insert(class.name()?, class.super_name()?, &interfaces);
        Ok(())
    }

    fn node(&mut self, name: &str) -> NodeIndex {
        if let Some(&index) = self.index.get(name) {
            return index;
        }
        let index = self.graph.add_node(ClassNode {
            name: name.to_string(),
            in_archive: false,
        });
        self.index.insert(name.to_string(), index);
        index
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// True only for classes defined by the archive itself.
    pub fn is_in_archive(&self, name: &str) -> bool {
        self.index
            .get(name)
            .is_some_and(|&index| self.graph[index].in_archive)
    }

    /// Number of classes defined by the archive.
    pub fn len(&self) -> usize {
        self.graph.node_weights().filter(|n| n.in_archive).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Direct supertypes in declaration order (superclass first).
    pub fn supertypes(&self, name: &str) -> Vec<&str> {
        let Some(&node) = self.index.get(name) else {
            return Vec::new();
        };
        self.ordered_parents(node)
            .into_iter()
            .map(|parent| self.graph[parent].name.as_str())
            .collect()
    }

    fn ordered_parents(&self, node: NodeIndex) -> Vec<NodeIndex> {
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(node, Direction::Outgoing)
            .map(|edge| (edge.weight().order, edge.target()))
            .collect();
        edges.sort_by_key(|(order, _)| *order);
        edges.into_iter().map(|(_, target)| target).collect()
    }

    /// Every transitive supertype, breadth first, superclass before interfaces at each
    /// level. `name` itself is not included.
    pub fn ancestors(&self, name: &str) -> Vec<&str> {
        let Some(&start) = self.index.get(name) else {
            return Vec::new();
        };
        let mut seen = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        let mut out = Vec::new();
        while let Some(node) = queue.pop_front() {
            for parent in self.ordered_parents(node) {
                if seen.insert(parent) {
                    out.push(self.graph[parent].name.as_str());
                    queue.push_back(parent);
                }
            }
        }
        out
    }
}
