//! Tree structure for a document's table of contents.
//!
//! A [`TreeNode`] is a section with an inclusive page range and an ordered,
//! possibly empty list of subsections; a node without subsections is a leaf.
//! All traversal utilities in this module walk the tree in document order
//! (pre-order, depth-first) through the same two visitors.

use crate::document::PageSource;
use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A node in the document tree structure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct TreeNode {
    /// Section title.
    pub title: String,

    /// Starting page index (1-indexed).
    pub start_index: usize,

    /// Ending page index (1-indexed, inclusive).
    pub end_index: usize,

    /// Sequential 4-digit identifier, assigned by [`write_node_id`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,

    /// Generated summary of the section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,

    /// Page text covered by the section, see [`add_node_text`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Child nodes (subsections).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<TreeNode>,
}

impl TreeNode {
    /// Create a new tree node.
    pub fn new(title: impl Into<String>, start_index: usize, end_index: usize) -> Self {
        Self {
            title: title.into(),
            start_index,
            end_index,
            node_id: None,
            summary: None,
            text: None,
            nodes: Vec::new(),
        }
    }

    /// Append a child node, builder-style.
    #[cfg(test)]
    pub(crate) fn with_child(mut self, child: TreeNode) -> Self {
        self.nodes.push(child);
        self
    }

    pub fn is_leaf(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Recursively count all nodes in this subtree (including self).
    pub fn node_count(&self) -> usize {
        1 + self.nodes.iter().map(|n| n.node_count()).sum::<usize>()
    }

    /// Copy of this node without its children.
    fn detached(&self) -> TreeNode {
        TreeNode {
            title: self.title.clone(),
            start_index: self.start_index,
            end_index: self.end_index,
            node_id: self.node_id.clone(),
            summary: self.summary.clone(),
            text: self.text.clone(),
            nodes: Vec::new(),
        }
    }

    /// Format the tree as a string for display.
    pub fn format_tree(&self, indent: usize) -> String {
        let prefix = "  ".repeat(indent);
        let id_str = self
            .node_id
            .as_ref()
            .map(|s| format!("[{}] ", s))
            .unwrap_or_default();

        let mut result = format!(
            "{}{}{} [pages {}-{}]\n",
            prefix, id_str, self.title, self.start_index, self.end_index
        );

        for child in &self.nodes {
            result.push_str(&child.format_tree(indent + 1));
        }

        result
    }
}

/// A complete document tree (wrapper around root nodes).
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
pub struct DocumentTree {
    /// Document name.
    pub name: String,

    /// Root-level nodes.
    pub nodes: Vec<TreeNode>,

    /// Total page count.
    pub total_pages: usize,

    /// Optional document description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl DocumentTree {
    /// Create a new document tree.
    pub fn new(name: impl Into<String>, nodes: Vec<TreeNode>, total_pages: usize) -> Self {
        Self {
            name: name.into(),
            nodes,
            total_pages,
            description: None,
        }
    }

    /// Get total node count.
    pub fn node_count(&self) -> usize {
        self.nodes.iter().map(|n| n.node_count()).sum()
    }

    /// Get maximum depth of the tree.
    pub fn max_depth(&self) -> usize {
        fn depth(node: &TreeNode) -> usize {
            if node.nodes.is_empty() {
                1
            } else {
                1 + node.nodes.iter().map(depth).max().unwrap_or(0)
            }
        }

        self.nodes.iter().map(depth).max().unwrap_or(0)
    }

    /// Format the entire tree for display.
    pub fn format(&self) -> String {
        let mut result = format!(
            "Document: {} ({} pages, {} sections)\n",
            self.name,
            self.total_pages,
            self.node_count()
        );
        result.push_str(&"─".repeat(50));
        result.push('\n');

        for node in &self.nodes {
            result.push_str(&node.format_tree(0));
        }

        result
    }

    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

fn walk<'a>(nodes: &'a [TreeNode], visit: &mut impl FnMut(&'a TreeNode)) {
    for node in nodes {
        visit(node);
        walk(&node.nodes, visit);
    }
}

pub(crate) fn walk_mut(nodes: &mut [TreeNode], visit: &mut impl FnMut(&mut TreeNode)) {
    for node in nodes {
        visit(node);
        walk_mut(&mut node.nodes, visit);
    }
}

/// Every node (internal and leaf) in document order.
pub fn structure_to_list(nodes: &[TreeNode]) -> Vec<&TreeNode> {
    let mut out = Vec::new();
    walk(nodes, &mut |node| out.push(node));
    out
}

/// Copies of every node in document order, children stripped.
pub fn get_nodes(nodes: &[TreeNode]) -> Vec<TreeNode> {
    let mut out = Vec::new();
    walk(nodes, &mut |node| out.push(node.detached()));
    out
}

/// Copies of the leaf nodes in document order.
pub fn get_leaf_nodes(nodes: &[TreeNode]) -> Vec<TreeNode> {
    let mut out = Vec::new();
    walk(nodes, &mut |node| {
        if node.is_leaf() {
            out.push(node.detached());
        }
    });
    out
}

/// Depth-first search for the first node with the given id.
pub fn find_node_by_id<'a>(nodes: &'a [TreeNode], node_id: &str) -> Option<&'a TreeNode> {
    nodes.iter().find_map(|node| {
        if node.node_id.as_deref() == Some(node_id) {
            Some(node)
        } else {
            find_node_by_id(&node.nodes, node_id)
        }
    })
}

/// True iff a node with this id exists and has no children.
pub fn is_leaf_node(nodes: &[TreeNode], node_id: &str) -> bool {
    find_node_by_id(nodes, node_id).is_some_and(TreeNode::is_leaf)
}

/// Number every node `0000`, `0001`, ... in document order.
///
/// Returns the next unused counter value.
pub fn write_node_id(nodes: &mut [TreeNode]) -> usize {
    write_node_id_from(nodes, 0)
}

/// [`write_node_id`] starting from an arbitrary counter.
pub fn write_node_id_from(nodes: &mut [TreeNode], start: usize) -> usize {
    let mut counter = start;
    walk_mut(nodes, &mut |node| {
        node.node_id = Some(format!("{:04}", counter));
        counter += 1;
    });
    counter
}

/// Attach the text of each node's page range as `text`.
pub fn add_node_text(nodes: &mut [TreeNode], pages: &impl PageSource) {
    walk_mut(nodes, &mut |node| {
        node.text = Some(pages.text_of_pages(node.start_index, node.end_index));
    });
}

/// Drop the `text` field from every node.
pub fn remove_node_text(nodes: &mut [TreeNode]) {
    walk_mut(nodes, &mut |node| node.text = None);
}

/// Title, id and summary of every node, nested, for description prompts.
pub fn create_clean_structure_for_description(nodes: &[TreeNode]) -> Value {
    fn clean(node: &TreeNode) -> Value {
        let mut map = Map::new();
        map.insert("title".to_string(), Value::String(node.title.clone()));
        if let Some(id) = &node.node_id {
            map.insert("node_id".to_string(), Value::String(id.clone()));
        }
        if let Some(summary) = &node.summary {
            map.insert("summary".to_string(), Value::String(summary.clone()));
        }
        if !node.nodes.is_empty() {
            map.insert(
                "nodes".to_string(),
                Value::Array(node.nodes.iter().map(clean).collect()),
            );
        }
        Value::Object(map)
    }

    Value::Array(nodes.iter().map(clean).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, Page};

    fn sample() -> Vec<TreeNode> {
        vec![
            TreeNode::new("Chapter 1", 1, 10)
                .with_child(TreeNode::new("Section 1.1", 1, 5))
                .with_child(
                    TreeNode::new("Section 1.2", 6, 10)
                        .with_child(TreeNode::new("Section 1.2.1", 6, 8)),
                ),
            TreeNode::new("Chapter 2", 11, 20),
        ]
    }

    fn titles<'a>(nodes: impl IntoIterator<Item = &'a TreeNode>) -> Vec<&'a str> {
        nodes.into_iter().map(|n| n.title.as_str()).collect()
    }

    #[test]
    fn test_tree_node_children() {
        let parent = TreeNode::new("Chapter 1", 1, 20)
            .with_child(TreeNode::new("Section 1.1", 1, 10))
            .with_child(TreeNode::new("Section 1.2", 11, 20));

        assert!(!parent.is_leaf());
        assert_eq!(parent.node_count(), 3);
    }

    #[test]
    fn test_document_tree() {
        let tree = DocumentTree::new("Test Doc", sample(), 20);
        assert_eq!(tree.node_count(), 5);
        assert_eq!(tree.max_depth(), 3);
        assert!(tree.format().contains("    Section 1.2.1 [pages 6-8]"));
    }

    #[test]
    fn test_structure_to_list_is_preorder() {
        let nodes = sample();
        assert_eq!(
            titles(structure_to_list(&nodes)),
            vec!["Chapter 1", "Section 1.1", "Section 1.2", "Section 1.2.1", "Chapter 2"]
        );
    }

    #[test]
    fn test_get_nodes_strips_children_without_mutating() {
        let nodes = sample();
        let flat = get_nodes(&nodes);
        assert_eq!(flat.len(), 5);
        assert!(flat.iter().all(TreeNode::is_leaf));
        assert_eq!(nodes[0].nodes.len(), 2);
    }

    #[test]
    fn test_get_leaf_nodes() {
        let nodes = sample();
        assert_eq!(
            titles(&get_leaf_nodes(&nodes)),
            vec!["Section 1.1", "Section 1.2.1", "Chapter 2"]
        );
    }

    #[test]
    fn test_write_node_id_preorder() {
        let mut nodes = sample();
        let next = write_node_id(&mut nodes);
        assert_eq!(next, 5);

        let ids: Vec<_> = structure_to_list(&nodes)
            .into_iter()
            .map(|n| n.node_id.clone().unwrap())
            .collect();
        assert_eq!(ids, vec!["0000", "0001", "0002", "0003", "0004"]);
    }

    #[test]
    fn test_write_node_id_is_deterministic() {
        let mut first = sample();
        write_node_id(&mut first);
        let mut second = first.clone();
        write_node_id(&mut second);
        assert_eq!(first, second);
    }

    #[test]
    fn test_appending_last_node_only_numbers_new_node() {
        let mut nodes = sample();
        write_node_id(&mut nodes);
        let before = nodes.clone();

        nodes.push(TreeNode::new("Appendix", 21, 25));
        write_node_id(&mut nodes);

        assert_eq!(&nodes[..2], &before[..]);
        assert_eq!(nodes[2].node_id.as_deref(), Some("0005"));
    }

    #[test]
    fn test_find_and_is_leaf() {
        let mut nodes = sample();
        write_node_id(&mut nodes);

        assert_eq!(find_node_by_id(&nodes, "0003").unwrap().title, "Section 1.2.1");
        assert!(find_node_by_id(&nodes, "9999").is_none());
        assert!(is_leaf_node(&nodes, "0003"));
        assert!(!is_leaf_node(&nodes, "0002"));
        assert!(!is_leaf_node(&nodes, "9999"));
    }

    #[test]
    fn test_node_text_add_and_remove() {
        let doc = Document::new(
            "doc",
            (1..=4).map(|i| Page::new(i, format!("page{} ", i))).collect(),
        );
        let mut nodes = vec![TreeNode::new("A", 1, 2).with_child(TreeNode::new("A.1", 2, 2))];

        add_node_text(&mut nodes, &doc);
        assert_eq!(nodes[0].text.as_deref(), Some("page1 page2 "));
        assert_eq!(nodes[0].nodes[0].text.as_deref(), Some("page2 "));

        remove_node_text(&mut nodes);
        assert!(structure_to_list(&nodes).iter().all(|n| n.text.is_none()));
    }

    #[test]
    fn test_clean_structure_for_description() {
        let mut nodes = sample();
        write_node_id(&mut nodes);
        nodes[1].summary = Some("Second chapter".to_string());
        nodes[1].text = Some("raw text".to_string());

        let clean = create_clean_structure_for_description(&nodes);
        assert_eq!(clean[0]["node_id"], "0000");
        assert_eq!(clean[0]["nodes"][1]["nodes"][0]["title"], "Section 1.2.1");
        assert_eq!(clean[1]["summary"], "Second chapter");
        assert!(clean[1].get("text").is_none());
        assert!(clean[1].get("start_index").is_none());
        assert!(clean[1].get("nodes").is_none());
    }

    #[test]
    fn test_leaf_serializes_without_nodes_key() {
        let json = serde_json::to_value(TreeNode::new("Leaf", 1, 1)).unwrap();
        assert!(json.get("nodes").is_none());
        assert!(json.get("node_id").is_none());

        let tree = DocumentTree::new("Test", sample(), 20);
        let parsed: DocumentTree = serde_json::from_str(&tree.to_json().unwrap()).unwrap();
        assert_eq!(parsed.nodes, tree.nodes);
    }
}
