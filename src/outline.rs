//! Flat outline entries and their assembly into a page-bounded tree.
//!
//! The pipeline is:
//!
//! 1. [`parse_outline_entries`] turns extracted model JSON into entries
//! 2. [`convert_physical_index_to_int`] resolves `<physical_index_N>` markers
//! 3. [`add_preface_if_needed`] covers front matter before the first entry
//! 4. [`post_processing`] assigns page ranges and calls [`list_to_tree`]

use crate::tree::TreeNode;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Page marker as emitted by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PhysicalIndex {
    Page(usize),
    /// `<physical_index_N>`, `physical_index_N` or a bare number as text.
    Marker(String),
    /// Anything else the model produced; never resolves to a page.
    Other(Value),
}

impl PhysicalIndex {
    /// The page number, if this marker resolves to one.
    pub fn page(&self) -> Option<usize> {
        match self {
            PhysicalIndex::Page(n) => Some(*n),
            PhysicalIndex::Marker(s) => parse_physical_index(s),
            PhysicalIndex::Other(_) => None,
        }
    }
}

/// One row of a flat table-of-contents extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineEntry {
    /// Dotted hierarchy path, e.g. `"1.2.3"`.
    #[serde(
        default,
        deserialize_with = "deserialize_structure",
        skip_serializing_if = "Option::is_none"
    )]
    pub structure: Option<String>,

    #[serde(default, deserialize_with = "deserialize_title")]
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_index: Option<PhysicalIndex>,

    /// `"yes"` when the heading sits at the very top of its page.
    #[serde(
        default,
        deserialize_with = "deserialize_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub appear_start: Option<String>,

    /// Printed page number from a TOC page, when the model reported one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<PhysicalIndex>,

    #[serde(
        default,
        deserialize_with = "deserialize_index",
        skip_serializing_if = "Option::is_none"
    )]
    pub start_index: Option<usize>,

    #[serde(
        default,
        deserialize_with = "deserialize_index",
        skip_serializing_if = "Option::is_none"
    )]
    pub end_index: Option<usize>,
}

/// Models emit the path as `"1.2"`, `1` or `null`.
fn deserialize_structure<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// `null` or a non-text title becomes empty rather than rejecting the row.
fn deserialize_title<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}

/// Anything but a string is treated as absent.
fn deserialize_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

/// Non-negative integers only; anything else is absent.
fn deserialize_index<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

impl OutlineEntry {
    pub fn new(
        structure: Option<&str>,
        title: impl Into<String>,
        physical_index: Option<usize>,
    ) -> Self {
        Self {
            structure: structure.map(str::to_string),
            title: title.into(),
            physical_index: physical_index.map(PhysicalIndex::Page),
            appear_start: None,
            page: None,
            start_index: None,
            end_index: None,
        }
    }

    /// Mark the heading as appearing at the top of its page.
    pub fn appearing_at_start(mut self) -> Self {
        self.appear_start = Some("yes".to_string());
        self
    }

    /// Synthetic entry for front matter before the first real section.
    pub fn preface() -> Self {
        Self::new(Some("0"), "Preface", Some(1))
    }

    /// Resolved physical page, if any.
    pub fn page_number(&self) -> Option<usize> {
        self.physical_index.as_ref().and_then(PhysicalIndex::page)
    }

    fn appears_at_start(&self) -> bool {
        self.appear_start
            .as_deref()
            .is_some_and(|s| s.trim().eq_ignore_ascii_case("yes"))
    }
}

/// Read entries from extracted JSON.
///
/// Accepts a bare array or an object wrapping it in `table_of_contents`.
/// Items that are not entry-shaped are skipped.
pub fn parse_outline_entries(value: &Value) -> Vec<OutlineEntry> {
    let items = match value {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match map.get("table_of_contents") {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        },
        _ => &[],
    };

    items
        .iter()
        .filter_map(|item| match OutlineEntry::deserialize(item) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed outline entry");
                None
            }
        })
        .collect()
}

/// Parse `<physical_index_N>`, `physical_index_N` or `N` into `N`.
pub fn parse_physical_index(raw: &str) -> Option<usize> {
    let s = raw.trim();
    let number = if let Some(rest) = s.strip_prefix("<physical_index_") {
        rest.trim_end_matches('>')
    } else if let Some(rest) = s.strip_prefix("physical_index_") {
        rest
    } else {
        s
    };
    number.trim().parse().ok()
}

/// Rewrite every resolvable `physical_index` marker as an integer.
///
/// Unresolvable markers are left as they are.
pub fn convert_physical_index_to_int(entries: &mut [OutlineEntry]) {
    for entry in entries {
        if let Some(PhysicalIndex::Marker(marker)) = &entry.physical_index {
            if let Some(page) = parse_physical_index(marker) {
                entry.physical_index = Some(PhysicalIndex::Page(page));
            }
        }
    }
}

/// Rewrite numeric `page` strings as integers.
pub fn convert_page_to_int(entries: &mut [OutlineEntry]) {
    for entry in entries {
        if let Some(PhysicalIndex::Marker(text)) = &entry.page {
            if let Ok(page) = text.trim().parse() {
                entry.page = Some(PhysicalIndex::Page(page));
            }
        }
    }
}

/// Prepend a "Preface" entry at page 1 when the first entry starts later.
pub fn add_preface_if_needed(entries: &mut Vec<OutlineEntry>) {
    let starts_late = entries
        .first()
        .and_then(OutlineEntry::page_number)
        .is_some_and(|page| page > 1);

    if starts_late {
        entries.insert(0, OutlineEntry::preface());
    }
}

/// Fallback shape of [`post_processing`] when no tree could be built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlatEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structure: Option<String>,
    pub title: String,
    pub start_index: usize,
    pub end_index: usize,
}

/// Result of [`post_processing`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PostProcessed {
    Tree(Vec<TreeNode>),
    Flat(Vec<FlatEntry>),
}

impl PostProcessed {
    /// Root nodes; flat entries become leaf roots.
    pub fn into_nodes(self) -> Vec<TreeNode> {
        match self {
            PostProcessed::Tree(nodes) => nodes,
            PostProcessed::Flat(entries) => entries
                .into_iter()
                .map(|e| TreeNode::new(e.title, e.start_index, e.end_index))
                .collect(),
        }
    }
}

/// A node promoted to root because its parent path was never declared
/// before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrphanedEntry<'a> {
    pub title: &'a str,
    pub structure: &'a str,
    pub parent: &'a str,
}

/// Assign page ranges to `entries` and assemble the tree.
///
/// `end_physical_index` is the last page of the document.
pub fn post_processing(entries: Vec<OutlineEntry>, end_physical_index: usize) -> PostProcessed {
    post_processing_with_diagnostics(entries, end_physical_index, |_| {})
}

/// [`post_processing`] reporting root promotions to `on_orphan`.
pub fn post_processing_with_diagnostics(
    mut entries: Vec<OutlineEntry>,
    end_physical_index: usize,
    on_orphan: impl FnMut(&OrphanedEntry<'_>),
) -> PostProcessed {
    assign_page_ranges(&mut entries, end_physical_index);

    let tree = list_to_tree_with_diagnostics(&entries, on_orphan);
    if !tree.is_empty() {
        return PostProcessed::Tree(tree);
    }

    PostProcessed::Flat(
        entries
            .into_iter()
            .map(|e| {
                let start_index = e.start_index.unwrap_or(1);
                FlatEntry {
                    structure: e.structure,
                    title: e.title,
                    start_index,
                    end_index: e.end_index.unwrap_or(start_index),
                }
            })
            .collect(),
    )
}

/// Fill `start_index`/`end_index` from physical indices.
///
/// A section ends on the page before the next heading, unless the next
/// heading is flagged `appear_start`, in which case both share that page.
/// Entries without a resolvable page inherit the previous start.
///
/// With `Intro` at 3 and `Background` flagged at 4, `Intro` gets 3..4 and
/// is later widened over `Background` 4..7 by `fix_page_ranges`, so children
/// always sit inside their parent and siblings overlap on at most the
/// flagged page.
fn assign_page_ranges(entries: &mut [OutlineEntry], end_physical_index: usize) {
    let mut previous = 1;
    let starts: Vec<usize> = entries
        .iter()
        .map(|entry| {
            let start = entry.page_number().unwrap_or(previous);
            previous = start;
            start
        })
        .collect();

    let last = entries.len().saturating_sub(1);
    let ends: Vec<usize> = (0..entries.len())
        .map(|i| {
            if i == last {
                end_physical_index
            } else if entries[i + 1].appears_at_start() {
                starts[i + 1]
            } else {
                starts[i + 1].saturating_sub(1)
            }
        })
        .collect();

    for ((entry, start), end) in entries.iter_mut().zip(starts).zip(ends) {
        entry.start_index = Some(start);
        entry.end_index = Some(end.max(start));
    }
}

fn parent_structure(structure: &str) -> Option<&str> {
    structure.rsplit_once('.').map(|(parent, _)| parent)
}

/// Nest entries by their dotted `structure` paths.
pub fn list_to_tree(entries: &[OutlineEntry]) -> Vec<TreeNode> {
    list_to_tree_with_diagnostics(entries, |_| {})
}

/// [`list_to_tree`] reporting root promotions to `on_orphan`.
///
/// Entries attach to the most recent entry registered under their parent
/// path. An entry whose parent path has not been seen yet becomes a root;
/// there is no later re-parenting.
pub fn list_to_tree_with_diagnostics(
    entries: &[OutlineEntry],
    mut on_orphan: impl FnMut(&OrphanedEntry<'_>),
) -> Vec<TreeNode> {
    let mut nodes: Vec<Option<TreeNode>> = Vec::with_capacity(entries.len());
    let mut children: Vec<Vec<usize>> = Vec::with_capacity(entries.len());
    let mut by_path: HashMap<&str, usize> = HashMap::new();
    let mut roots = Vec::new();

    for (idx, entry) in entries.iter().enumerate() {
        let start = entry
            .start_index
            .or_else(|| entry.page_number())
            .unwrap_or(1);
        let end = entry.end_index.unwrap_or(start);
        nodes.push(Some(TreeNode::new(entry.title.clone(), start, end)));
        children.push(Vec::new());

        let Some(path) = entry.structure.as_deref() else {
            roots.push(idx);
            continue;
        };
        by_path.insert(path, idx);

        match parent_structure(path) {
            Some(parent) => match by_path.get(parent) {
                Some(&parent_idx) => children[parent_idx].push(idx),
                None => {
                    tracing::debug!(
                        title = %entry.title,
                        structure = path,
                        missing_parent = parent,
                        "Parent section not declared yet, placing at root"
                    );
                    on_orphan(&OrphanedEntry {
                        title: &entry.title,
                        structure: path,
                        parent,
                    });
                    roots.push(idx);
                }
            },
            None => roots.push(idx),
        }
    }

    // Children always come after their parent, so a reverse sweep finishes
    // every subtree before its parent collects it.
    for idx in (0..nodes.len()).rev() {
        let kids: Vec<TreeNode> = children[idx]
            .iter()
            .filter_map(|&child| nodes[child].take())
            .collect();
        if let Some(node) = nodes[idx].as_mut() {
            node.nodes = kids;
        }
    }

    let mut tree: Vec<TreeNode> = roots
        .into_iter()
        .filter_map(|idx| nodes[idx].take())
        .collect();
    for node in &mut tree {
        fix_page_ranges(node);
    }
    tree
}

/// Widen parent ranges so they span their children.
fn fix_page_ranges(node: &mut TreeNode) {
    for child in &mut node.nodes {
        fix_page_ranges(child);
    }

    if let Some(max_end) = node.nodes.iter().map(|n| n.end_index).max() {
        node.end_index = node.end_index.max(max_end);
    }
    if let Some(min_start) = node.nodes.iter().map(|n| n.start_index).min() {
        node.start_index = node.start_index.min(min_start);
    }
}
