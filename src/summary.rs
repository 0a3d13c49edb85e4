//! Node summaries and document descriptions.
//!
//! Summaries are generated for every node at once: all calls are created
//! before any is awaited and then driven together on the current task. The
//! results are matched back to nodes by their position in document order,
//! so completion order does not matter.

use crate::llm::{Generation, GenerationClient, Prompts};
use crate::tree::{TreeNode, create_clean_structure_for_description, structure_to_list, walk_mut};
use futures::future::join_all;

/// Summarize one section's text.
pub async fn generate_node_summary(client: &GenerationClient, model: &str, text: &str) -> String {
    let prompt = Prompts::render_node_summary(text);
    client.generate(model, &prompt).await
}

/// Attach a generated `summary` to every node in place.
///
/// Nodes are summarized from their `text` (see
/// [`add_node_text`](crate::tree::add_node_text)); a node without text is
/// summarized from an empty string. A call that exhausts its retries
/// leaves the `"Error"` sentinel as that node's summary.
pub async fn generate_summaries_for_structure(
    client: &GenerationClient,
    model: &str,
    nodes: &mut [TreeNode],
) {
    let texts: Vec<&str> = structure_to_list(nodes)
        .into_iter()
        .map(|node| node.text.as_deref().unwrap_or(""))
        .collect();

    tracing::info!(count = texts.len(), "Generating node summaries");
    let summaries =
        join_all(texts.iter().map(|text| generate_node_summary(client, model, text))).await;

    let failed = summaries
        .iter()
        .filter(|s| s.as_str() == Generation::ERROR_TEXT)
        .count();
    if failed > 0 {
        tracing::warn!(failed, "Some node summaries could not be generated");
    }

    let mut summaries = summaries.into_iter();
    walk_mut(nodes, &mut |node| node.summary = summaries.next());
}

/// One-sentence description of the whole document.
pub async fn generate_doc_description(
    client: &GenerationClient,
    model: &str,
    nodes: &[TreeNode],
) -> String {
    let structure = create_clean_structure_for_description(nodes);
    let prompt = Prompts::render_doc_description(&structure.to_string());
    client.generate(model, &prompt).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OutlineError;
    use crate::llm::testing::ScriptedGenerator;
    use crate::llm::{FinishReason, RetryPolicy};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::Instant;

    fn tree() -> Vec<TreeNode> {
        let mut nodes = vec![
            TreeNode::new("Intro", 1, 4)
                .with_child(TreeNode::new("Background", 2, 3))
                .with_child(TreeNode::new("Scope", 4, 4)),
            TreeNode::new("Methods", 5, 9),
        ];
        for (node, text) in nodes[0].nodes.iter_mut().zip(["bg text", "scope text"]) {
            node.text = Some(text.to_string());
        }
        nodes[0].text = Some("intro text".to_string());
        nodes[1].text = Some("methods text".to_string());
        nodes
    }

    /// Echoes the section text back.
    fn echo_client() -> GenerationClient {
        let generator = ScriptedGenerator::new(|prompt, _| {
            let text = prompt
                .split("Partial Document Text: ")
                .nth(1)
                .and_then(|rest| rest.split('\n').next())
                .unwrap_or_default();
            Ok(Generation::new(format!("summary of {}", text), FinishReason::Finished))
        });
        GenerationClient::new(Arc::new(generator))
    }

    #[tokio::test]
    async fn test_summaries_attach_to_matching_nodes() {
        let client = echo_client();
        let mut nodes = tree();

        generate_summaries_for_structure(&client, "m", &mut nodes).await;

        assert_eq!(nodes[0].summary.as_deref(), Some("summary of intro text"));
        assert_eq!(nodes[0].nodes[0].summary.as_deref(), Some("summary of bg text"));
        assert_eq!(nodes[0].nodes[1].summary.as_deref(), Some("summary of scope text"));
        assert_eq!(nodes[1].summary.as_deref(), Some("summary of methods text"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_node_gets_sentinel_without_aborting_siblings() {
        let generator = ScriptedGenerator::new(|prompt, _| {
            if prompt.contains("scope text") {
                Err(OutlineError::Http("timeout".to_string()))
            } else {
                Ok(Generation::new("fine", FinishReason::Finished))
            }
        });
        let client = GenerationClient::new(Arc::new(generator)).with_policy(RetryPolicy {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        });
        let mut nodes = tree();

        generate_summaries_for_structure(&client, "m", &mut nodes).await;

        assert_eq!(nodes[0].nodes[1].summary.as_deref(), Some("Error"));
        assert_eq!(nodes[0].summary.as_deref(), Some("fine"));
        assert_eq!(nodes[0].nodes[0].summary.as_deref(), Some("fine"));
        assert_eq!(nodes[1].summary.as_deref(), Some("fine"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_node_calls_back_off_together() {
        let generator = Arc::new(ScriptedGenerator::new(|_, _| {
            Err(OutlineError::Http("unavailable".to_string()))
        }));
        let client = GenerationClient::new(generator.clone()).with_policy(RetryPolicy {
            max_attempts: 2,
            delay: Duration::from_secs(2),
        });
        let mut nodes = tree();

        let start = Instant::now();
        generate_summaries_for_structure(&client, "m", &mut nodes).await;

        // four nodes, one shared backoff window
        assert_eq!(start.elapsed(), Duration::from_secs(2));
        assert_eq!(generator.calls(), 8);
        assert!(structure_to_list(&nodes)
            .iter()
            .all(|n| n.summary.as_deref() == Some("Error")));
    }

    #[tokio::test]
    async fn test_one_call_per_node() {
        let generator = Arc::new(ScriptedGenerator::new(|_, _| {
            Ok(Generation::new("s", FinishReason::Finished))
        }));
        let client = GenerationClient::new(generator.clone());
        let mut nodes = tree();

        generate_summaries_for_structure(&client, "m", &mut nodes).await;

        assert_eq!(generator.calls(), 4);
    }

    #[tokio::test]
    async fn test_doc_description_uses_clean_structure() {
        let generator = ScriptedGenerator::new(|prompt, _| {
            assert!(prompt.contains("\"title\":\"Methods\""));
            assert!(!prompt.contains("methods text"));
            Ok(Generation::new("A methods paper.", FinishReason::Finished))
        });
        let client = GenerationClient::new(Arc::new(generator));

        let description = generate_doc_description(&client, "m", &tree()).await;
        assert_eq!(description, "A methods paper.");
    }

    #[tokio::test]
    async fn test_empty_tree_is_noop() {
        let client = echo_client();
        let mut nodes: Vec<TreeNode> = Vec::new();
        generate_summaries_for_structure(&client, "m", &mut nodes).await;
        assert!(nodes.is_empty());
    }
}
