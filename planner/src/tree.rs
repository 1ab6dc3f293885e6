use domain::Blacklist;
use state::{State, Value};
use timeline::Timeline;

/// Addresses a node in a [`SolutionTree`]'s arena. No parent pointer is
/// stored on the node itself — the refine loop carries its own explicit
/// ancestry stack while walking top-down, so nothing in the tree needs to
/// walk upward.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
pub struct NodeId(u32);

impl NodeId {
    pub fn to_u32(self) -> u32 {
        self.0
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    Task,
    Method,
    Action,
    Goal,
    Multigoal,
}

pub struct Node {
    pub id: NodeId,
    pub label: String,
    pub kind: NodeKind,
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
    pub state_before: State,
    pub state_after: Option<State>,
    pub method_chosen: Option<String>,
    pub blacklist_snapshot: Blacklist,
    /// Populated only for `Action`-kind leaves: the registered action/command
    /// name and the arguments it was invoked with during planning, so the
    /// executor can re-invoke the same (or a preferred command) binding.
    pub action_name: Option<String>,
    pub action_args: Vec<Value>,
    pub durative: bool,
    /// Populated only for `Method`-kind nodes: the args (or single-element
    /// goal-value fingerprint) the method was invoked with, i.e. the same
    /// `args` a blacklist entry for this method must be keyed on to actually
    /// exclude it on a later attempt.
    pub method_args: Vec<Value>,
}

/// A rooted, node-addressed arena of refinements. Nodes are appended and
/// never removed — a failed refinement attempt is simply abandoned by not
/// recording it (the caller backtracks by discarding the attempt's node
/// range), which keeps the tree an honest record of the accepted plan rather
/// than a log of every dead end tried.
pub struct SolutionTree {
    nodes: Vec<Node>,
    root: NodeId,
    /// The working timeline accumulated while refining durative actions.
    /// Owned by the tree rather than threaded separately, matching the way a
    /// planning attempt owns its STN/Timeline for the attempt's lifetime.
    timeline: Timeline,
}

impl SolutionTree {
    pub fn new(initial_state: State) -> Self {
        let root = Node {
            id: NodeId(0),
            label: "root".to_string(),
            kind: NodeKind::Root,
            children: Vec::new(),
            parent: None,
            state_before: initial_state,
            state_after: None,
            method_chosen: None,
            blacklist_snapshot: Blacklist::new(),
            action_name: None,
            action_args: Vec::new(),
            durative: false,
            method_args: Vec::new(),
        };
        SolutionTree { nodes: vec![root], root: NodeId(0), timeline: Timeline::new() }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn timeline_mut(&mut self) -> &mut Timeline {
        &mut self.timeline
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Appends a new node as a child of `parent` and returns its id.
    pub fn push_child(
        &mut self,
        parent: NodeId,
        label: impl Into<String>,
        kind: NodeKind,
        state_before: State,
        blacklist_snapshot: Blacklist,
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            id,
            label: label.into(),
            kind,
            children: Vec::new(),
            parent: Some(parent),
            state_before,
            state_after: None,
            method_chosen: None,
            blacklist_snapshot,
            action_name: None,
            action_args: Vec::new(),
            durative: false,
            method_args: Vec::new(),
        });
        self.nodes[parent.0 as usize].children.push(id);
        id
    }

    /// Discards every node from `from` onward (inclusive); used to undo a
    /// failed refinement attempt before trying the next method alternative.
    pub fn truncate_from(&mut self, from: NodeId) {
        self.truncate_to(from.0 as usize);
    }

    /// Current node count, usable as a rollback marker with [`truncate_to`]
    /// when the node id of the attempt's first new node isn't in hand yet.
    pub fn mark(&self) -> usize {
        self.nodes.len()
    }

    pub fn truncate_to(&mut self, mark: usize) {
        self.nodes.truncate(mark);
        for node in &mut self.nodes {
            node.children.retain(|child| (child.0 as usize) < mark);
        }
    }

    /// Walks from `node` up to the root, yielding each ancestor in order
    /// (nearest first). Used only for the goal cycle guard, never for
    /// correctness-critical state propagation.
    pub fn ancestors(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut current = self.node(node).parent;
        while let Some(id) = current {
            out.push(id);
            current = self.node(id).parent;
        }
        out
    }

    /// Flattens the tree into its leftmost-to-rightmost sequence of
    /// action/durative-action leaf node ids, the realized plan the executor
    /// walks linearly.
    pub fn flatten_actions(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.flatten_from(self.root, &mut out);
        out
    }

    fn flatten_from(&self, node: NodeId, out: &mut Vec<NodeId>) {
        let n = self.node(node);
        if n.kind == NodeKind::Action && n.children.is_empty() {
            out.push(node);
            return;
        }
        for &child in &n.children {
            self.flatten_from(child, out);
        }
    }
}
