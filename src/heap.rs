//! Per-call object graph.
//!
//! The stack and the memo hold `NodeId`s into this arena instead of values,
//! so a memoized container keeps receiving APPEND/SETITEM effects and every
//! GET sees the same object, as in CPython's unpickler. Once STOP is reached the
//! graph is turned into an owned `Value` tree.

use crate::config::DecoderConfig;
use crate::error::DecodeError;
use crate::types::{dedup_pairs, Value};

pub type NodeId = usize;

pub enum Node {
    Scalar(Value),
    List(Vec<NodeId>),
    Tuple(Vec<NodeId>),
    /// Pairs in insertion order; duplicates are collapsed when materialized.
    Dict(Vec<(NodeId, NodeId)>),
}

impl Node {
    fn kind(&self) -> &'static str {
        match self {
            Node::Scalar(v) => v.kind(),
            Node::List(_) => "list",
            Node::Tuple(_) => "tuple",
            Node::Dict(_) => "dict",
        }
    }

    fn for_each_child(&self, mut f: impl FnMut(NodeId)) {
        match self {
            Node::Scalar(_) => {}
            Node::List(items) | Node::Tuple(items) => items.iter().copied().for_each(f),
            Node::Dict(pairs) => {
                for &(k, v) in pairs {
                    f(k);
                    f(v);
                }
            }
        }
    }

    fn child_count(&self) -> usize {
        match self {
            Node::Scalar(_) => 0,
            Node::List(items) | Node::Tuple(items) => items.len(),
            Node::Dict(pairs) => pairs.len() * 2,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    New,
    Open,
    Done,
}

/// Output shape of the subtree under one node.
#[derive(Clone, Copy, Default)]
struct Extent {
    /// Containers on the longest path down, counting this one.
    depth: usize,
    /// Values in the materialized subtree, with every shared use counted.
    nodes: usize,
}

enum Step {
    Enter(NodeId),
    Close(NodeId),
}

pub struct Heap {
    nodes: Vec<Node>,
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}

impl Heap {
    pub fn new() -> Self {
        Self {
            nodes: Vec::with_capacity(64),
        }
    }

    pub fn alloc(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    pub fn kind(&self, id: NodeId) -> &'static str {
        self.nodes[id].kind()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Build the owned tree rooted at `root`.
    ///
    /// The graph is measured first, so cycles, over-deep nesting and
    /// oversized output are rejected before any `Value` is built. The tree is
    /// then assembled with an explicit work stack; a node reachable from
    /// several parents is rebuilt from the graph for each use.
    pub fn materialize(
        mut self,
        root: NodeId,
        config: &DecoderConfig,
    ) -> Result<Value, DecodeError> {
        let order = self.measure(root, config)?;

        // Times each node will be entered: one per path from the root.
        let mut uses = vec![0usize; self.nodes.len()];
        uses[root] = 1;
        for &id in order.iter().rev() {
            let paths = uses[id];
            self.nodes[id].for_each_child(|c| uses[c] += paths);
        }

        let mut out: Vec<Value> = Vec::new();
        let mut work = vec![Step::Enter(root)];
        while let Some(step) = work.pop() {
            match step {
                Step::Enter(id) => {
                    uses[id] -= 1;
                    let last = uses[id] == 0;
                    match &mut self.nodes[id] {
                        Node::Scalar(v) if last => out.push(std::mem::replace(v, Value::None)),
                        Node::Scalar(v) => out.push(v.clone()),
                        node => {
                            work.push(Step::Close(id));
                            let first = work.len();
                            node.for_each_child(|c| work.push(Step::Enter(c)));
                            // Children must be entered in order.
                            work[first..].reverse();
                        }
                    }
                }
                Step::Close(id) => {
                    let node = &self.nodes[id];
                    let items = out.split_off(out.len() - node.child_count());
                    out.push(match node {
                        Node::List(_) => Value::List(items),
                        Node::Tuple(_) => Value::Tuple(items),
                        _ => {
                            let mut pairs = Vec::with_capacity(items.len() / 2);
                            let mut items = items.into_iter();
                            while let (Some(k), Some(v)) = (items.next(), items.next()) {
                                pairs.push((k, v));
                            }
                            Value::Dict(dedup_pairs(pairs))
                        }
                    });
                }
            }
        }

        out.pop().ok_or(DecodeError::RecursiveStructure)
    }

    /// Post-order walk checking the depth and size of every reachable node.
    /// Returns the reachable nodes, children before parents.
    fn measure(
        &self,
        root: NodeId,
        config: &DecoderConfig,
    ) -> Result<Vec<NodeId>, DecodeError> {
        let n = self.nodes.len();
        let mut order = Vec::new();
        let mut extent = vec![Extent::default(); n];
        let mut state = vec![Visit::New; n];
        // (node, children already scheduled)
        let mut work: Vec<(NodeId, bool)> = vec![(root, false)];

        while let Some((id, expanded)) = work.pop() {
            let node = &self.nodes[id];
            if expanded {
                let mut ext = Extent { depth: 0, nodes: 1 };
                node.for_each_child(|c| {
                    ext.depth = ext.depth.max(extent[c].depth);
                    ext.nodes = ext.nodes.saturating_add(extent[c].nodes);
                });
                if !matches!(node, Node::Scalar(_)) {
                    ext.depth += 1;
                }
                if ext.depth > config.max_depth {
                    return Err(DecodeError::LimitExceeded {
                        what: "nesting depth",
                        limit: config.max_depth,
                    });
                }
                if ext.nodes > config.max_nodes {
                    return Err(DecodeError::LimitExceeded {
                        what: "decoded value count",
                        limit: config.max_nodes,
                    });
                }
                extent[id] = ext;
                state[id] = Visit::Done;
                order.push(id);
                continue;
            }
            match state[id] {
                Visit::Done => continue,
                // Everything above an open node's entry descends from it.
                Visit::Open => return Err(DecodeError::RecursiveStructure),
                Visit::New => {}
            }
            state[id] = Visit::Open;
            work.push((id, true));
            node.for_each_child(|c| {
                if state[c] != Visit::Done {
                    work.push((c, false));
                }
            });
        }

        Ok(order)
    }
}
