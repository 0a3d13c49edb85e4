//! Tree indexer - turns an extracted outline into an enriched document tree.
//!
//! This module runs the whole pipeline over one document:
//! 1. Parse the model's outline JSON and normalize page markers
//! 2. Add a preface when the outline starts after page 1
//! 3. Assign page ranges and nest entries into a tree
//! 4. Optionally number nodes, attach page text, summarize and describe

use crate::config::PipelineOptions;
use crate::document::{Document, PageSource};
use crate::json::extract_json;
use crate::llm::GenerationClient;
use crate::outline::{
    PostProcessed, add_preface_if_needed, convert_page_to_int, convert_physical_index_to_int,
    parse_outline_entries, post_processing_with_diagnostics,
};
use crate::summary::{generate_doc_description, generate_summaries_for_structure};
use crate::tree::{DocumentTree, add_node_text, remove_node_text, write_node_id};

/// Builds [`DocumentTree`]s from raw model outline output.
pub struct TreeIndexer {
    client: Option<GenerationClient>,
    model: String,
    options: PipelineOptions,
}

impl TreeIndexer {
    /// Indexer without an LLM; summary and description steps are skipped.
    pub fn new(options: PipelineOptions) -> Self {
        Self {
            client: None,
            model: String::new(),
            options,
        }
    }

    /// Indexer that can generate summaries and descriptions.
    pub fn with_client(
        client: GenerationClient,
        model: impl Into<String>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            client: Some(client),
            model: model.into(),
            options,
        }
    }

    /// Parse model output and assemble it into a page-bounded structure.
    ///
    /// Output that is not valid JSON even after repair yields an empty
    /// structure rather than an error.
    pub fn structure_from_response(response: &str, end_physical_index: usize) -> PostProcessed {
        let value = extract_json(response).unwrap_or_empty();
        let mut entries = parse_outline_entries(&value);
        if entries.is_empty() {
            tracing::warn!("No outline entries found in model output");
        }

        convert_physical_index_to_int(&mut entries);
        convert_page_to_int(&mut entries);
        add_preface_if_needed(&mut entries);

        let mut orphans = 0usize;
        let structure =
            post_processing_with_diagnostics(entries, end_physical_index, |_| orphans += 1);
        if orphans > 0 {
            tracing::info!(orphans, "Sections placed at root because their parent was missing");
        }
        structure
    }

    /// Build the tree for `document` from the model's outline `response`.
    pub async fn index(&self, document: &Document, response: &str) -> DocumentTree {
        let end_physical_index = document.end_physical_index();
        let mut nodes = Self::structure_from_response(response, end_physical_index).into_nodes();
        tracing::info!(roots = nodes.len(), "Built outline tree");

        let options = &self.options;
        if options.if_add_node_id {
            write_node_id(&mut nodes);
        }

        let mut description = None;
        match &self.client {
            Some(client) => {
                if options.if_add_node_summary || options.if_add_node_text {
                    add_node_text(&mut nodes, document);
                }
                if options.if_add_node_summary {
                    generate_summaries_for_structure(client, &self.model, &mut nodes).await;
                }
                if !options.if_add_node_text {
                    remove_node_text(&mut nodes);
                }
                if options.if_add_doc_description {
                    description = Some(generate_doc_description(client, &self.model, &nodes).await);
                }
            }
            None => {
                if options.if_add_node_summary || options.if_add_doc_description {
                    tracing::warn!("No LLM client configured, skipping summaries and description");
                }
                if options.if_add_node_text {
                    add_node_text(&mut nodes, document);
                }
            }
        }

        let mut tree = DocumentTree::new(&document.name, nodes, document.page_count());
        tree.description = description;
        tree
    }
}
