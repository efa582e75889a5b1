//! Minimal engine example — a full summary turn against a scripted model.
//!
//! Segments an in-memory document, runs one NEW-conversation turn with a
//! canned completion, and prints the attributed summary blocks alongside
//! the source blocks they cite. No API key needed.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example canned_turn
//! ```

use sumcite_rs::prelude::*;

#[tokio::main]
async fn main() -> SumciteResult<()> {
    // 1. A document the way the external parser would deliver it.
    let documents = MemoryDocumentSource::new().insert(
        "quarterly-report",
        vec![
            Paragraph::new("Title", "Quarterly Report"),
            Paragraph::new("Heading 1", "Results"),
            Paragraph::new("Normal", "Revenue grew twelve percent. Costs fell slightly."),
        ],
    );

    // 2. A scripted completion standing in for the live model.
    let client = ScriptedClient::new(vec![serde_json::json!({
        "summary": [
            {"text": "Revenue grew while costs fell.", "sources": ["S3", "S4"]}
        ]
    })
    .to_string()]);

    // 3. Run one turn.
    let store = MemoryConversationStore::new();
    let engine = SummaryEngine::new(&client, &store, EngineConfig::default());
    let response = engine
        .generate(
            &documents,
            &SummaryRequest {
                conversation_id: None,
                document_id: "quarterly-report".into(),
                prompt_type: PromptType::General,
                source_target_text: None,
                summary_target_text: None,
                prompt: "Summarize the article.".into(),
            },
        )
        .await?;

    // 4. Print the attributed summary.
    println!("conversation: {}", response.conversation_id);
    for block in &response.summary {
        println!("[{}] {} <- {:?}", block.id, block.text, block.sources);
    }
    println!("\nsource blocks:");
    for entry in response.source.iter().filter(|e| !e.text.is_empty()) {
        println!("({}) {}", entry.id, entry.text);
    }

    Ok(())
}
