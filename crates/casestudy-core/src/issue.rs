//! Issue maps: the nested issue / sub-issue / element / defense trees the
//! evaluator returns, and how they are laid out for display.
//!
//! Trees come from a fresh JSON parse, so they are acyclic by construction.
//! Layout never mutates a tree; per-node expansion lives in [`Expansion`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Nodes at a depth below this start expanded; deeper nodes start collapsed.
pub const DEFAULT_EXPANDED_DEPTH: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueKind {
    Issue,
    SubIssue,
    Element,
    Defense,
}

impl IssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Issue => "Issue",
            Self::SubIssue => "SubIssue",
            Self::Element => "Element",
            Self::Defense => "Defense",
        }
    }

    /// Short badge used in text rendering.
    pub fn badge(&self) -> &'static str {
        match self {
            Self::Issue => "[ISSUE]",
            Self::SubIssue => "[SUB]",
            Self::Element => "[ELEM]",
            Self::Defense => "[DEF]",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueNode {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: IssueKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<IssueNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl IssueNode {
    pub fn new(title: impl Into<String>, kind: IssueKind) -> Self {
        Self {
            title: title.into(),
            kind,
            children: Vec::new(),
            notes: None,
        }
    }

    pub fn with_children(mut self, children: Vec<IssueNode>) -> Self {
        self.children = children;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(IssueNode::count).sum::<usize>()
    }

    /// Levels in this subtree; a leaf has depth 1.
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(IssueNode::depth).max().unwrap_or(0)
    }
}

/// Index path from the root list to a node: `[2, 0]` is the first child of
/// the third root.
pub type NodePath = Vec<usize>;

/// One laid-out line of an issue tree.
#[derive(Debug, Clone, PartialEq)]
pub struct IssueRow<'a> {
    pub depth: usize,
    pub path: NodePath,
    pub kind: IssueKind,
    pub title: &'a str,
    pub notes: Option<&'a str>,
    pub has_children: bool,
    pub expanded: bool,
}

/// Per-node expansion overrides on top of the depth default.
#[derive(Debug, Clone, Default)]
pub struct Expansion {
    overrides: HashMap<NodePath, bool>,
    expand_all: bool,
}

impl Expansion {
    /// Every node expanded, regardless of depth.
    pub fn all_expanded() -> Self {
        Self {
            overrides: HashMap::new(),
            expand_all: true,
        }
    }

    pub fn is_expanded(&self, path: &[usize], depth: usize) -> bool {
        if let Some(&state) = self.overrides.get(path) {
            return state;
        }
        self.expand_all || depth < DEFAULT_EXPANDED_DEPTH
    }

    /// Flip a node's state. Depth is the node's depth (`path.len() - 1`).
    pub fn toggle(&mut self, path: &[usize]) {
        let depth = path.len().saturating_sub(1);
        let next = !self.is_expanded(path, depth);
        self.overrides.insert(path.to_vec(), next);
    }

    pub fn set(&mut self, path: &[usize], expanded: bool) {
        self.overrides.insert(path.to_vec(), expanded);
    }
}

pub struct IssueTree;

impl IssueTree {
    /// One row per node, depth-first pre-order, with default expansion state.
    pub fn rows(nodes: &[IssueNode]) -> Vec<IssueRow<'_>> {
        let mut rows = Vec::new();
        let expansion = Expansion::default();
        let mut path = Vec::new();
        walk(nodes, 0, &mut path, &expansion, false, &mut rows);
        rows
    }

    /// Rows a reader sees: descendants of collapsed nodes are omitted.
    pub fn visible_rows<'a>(nodes: &'a [IssueNode], expansion: &Expansion) -> Vec<IssueRow<'a>> {
        let mut rows = Vec::new();
        let mut path = Vec::new();
        walk(nodes, 0, &mut path, expansion, true, &mut rows);
        rows
    }

    /// Total node count across a forest.
    pub fn count(nodes: &[IssueNode]) -> usize {
        nodes.iter().map(IssueNode::count).sum()
    }

    /// Look up a node by path.
    pub fn get<'a>(nodes: &'a [IssueNode], path: &[usize]) -> Option<&'a IssueNode> {
        let (first, rest) = path.split_first()?;
        let mut node = nodes.get(*first)?;
        for &idx in rest {
            node = node.children.get(idx)?;
        }
        Some(node)
    }
}

fn walk<'a>(
    nodes: &'a [IssueNode],
    depth: usize,
    path: &mut NodePath,
    expansion: &Expansion,
    visible_only: bool,
    rows: &mut Vec<IssueRow<'a>>,
) {
    for (idx, node) in nodes.iter().enumerate() {
        path.push(idx);
        let expanded = expansion.is_expanded(path, depth);
        rows.push(IssueRow {
            depth,
            path: path.clone(),
            kind: node.kind,
            title: &node.title,
            notes: node.notes.as_deref(),
            has_children: node.has_children(),
            expanded,
        });
        if !visible_only || expanded {
            walk(&node.children, depth + 1, path, expansion, visible_only, rows);
        }
        path.pop();
    }
}

/// Indented plain-text rendering of the visible part of a tree.
pub fn render_text(nodes: &[IssueNode], expansion: &Expansion) -> String {
    let mut out = String::new();
    for row in IssueTree::visible_rows(nodes, expansion) {
        let indent = "  ".repeat(row.depth);
        let marker = match (row.has_children, row.expanded) {
            (false, _) => " ",
            (true, true) => "▾",
            (true, false) => "▸",
        };
        out.push_str(&format!("{indent}{marker} {} {}\n", row.kind.badge(), row.title));
        if let Some(notes) = row.notes {
            out.push_str(&format!("{indent}    | {notes}\n"));
        }
    }
    out
}
