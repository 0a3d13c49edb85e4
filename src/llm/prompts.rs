//! Prompts for node summaries and document descriptions.

/// Collection of prompts used after the tree is built.
pub struct Prompts;

impl Prompts {
    /// Prompt to summarize one section's text.
    pub fn node_summary() -> &'static str {
        r#"You are given a part of a document, your task is to generate a description of the partial document about what are main points covered in the partial document.

Partial Document Text: {text}

Directly return the description, do not include any other text."#
    }

    /// Prompt to describe a whole document from its cleaned structure.
    pub fn doc_description() -> &'static str {
        r#"Your are an expert in generating descriptions for a document.
You are given a structure of a document. Your task is to generate a one-sentence description for the document, which makes it easy to distinguish the document from other documents.

Document Structure: {structure}

Directly return the description, do not include any other text."#
    }

    pub fn render_node_summary(text: &str) -> String {
        Self::node_summary().replace("{text}", text)
    }

    pub fn render_doc_description(structure: &str) -> String {
        Self::doc_description().replace("{structure}", structure)
    }
}
