//! Outline Indexer - turns LLM-extracted tables of contents into page-bounded
//! section trees.
//!
//! # Overview
//!
//! A language model reads a document and emits its table of contents as a flat
//! list of entries with dotted structure codes (`"1"`, `"1.2"`, `"1.2.3"`) and
//! physical page markers. This crate:
//! 1. Repairs and parses the model's JSON output
//! 2. Normalizes page markers and inserts a preface when needed
//! 3. Assigns page ranges and nests the entries into a tree
//! 4. Optionally numbers nodes, summarizes them in parallel and describes the
//!    whole document, retrying failed model calls with a fixed backoff
//!
//! # Quick Start
//!
//! ```no_run
//! use outline_indexer::{
//!     config::Config,
//!     document::Document,
//!     indexer::TreeIndexer,
//!     llm::GenerationClient,
//!     persistence::save_tree,
//! };
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     config.validate()?;
//!
//!     let client = GenerationClient::from_config(&config.llm)?;
//!     let document = Document::from_text_file(Path::new("document.txt"))?;
//!     let response = std::fs::read_to_string("toc_response.txt")?;
//!
//!     let indexer = TreeIndexer::with_client(client, &config.llm.model, config.pipeline);
//!     let tree = indexer.index(&document, &response).await;
//!
//!     save_tree(&tree, Path::new("tree_index.json"))?;
//!     println!("{}", tree.format());
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **outline**: Flat entries, page-range assignment and tree building
//! - **tree**: Tree types, traversal and node ids
//! - **json**: Tolerant JSON extraction from model output
//! - **llm**: Vendor backends and the retrying generation clients
//! - **summary**: Parallel node summaries and document descriptions
//! - **indexer**: The end-to-end pipeline

pub mod config;
pub mod document;
pub mod error;
pub mod indexer;
pub mod json;
pub mod llm;
pub mod outline;
pub mod persistence;
pub mod summary;
pub mod tree;

// Re-export commonly used types
pub use config::{Config, PipelineOptions, Provider};
pub use document::{Document, Page, PageSource};
pub use error::{OutlineError, Result};
pub use indexer::TreeIndexer;
pub use json::{JsonExtraction, extract_json};
pub use llm::{BlockingGenerationClient, Generation, GenerationClient, TextGenerator};
pub use outline::{OutlineEntry, PostProcessed, list_to_tree, post_processing};
pub use persistence::{load_tree, save_tree};
pub use tree::{DocumentTree, TreeNode};
