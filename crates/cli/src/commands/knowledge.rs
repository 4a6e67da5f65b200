//! `promptmaster knowledge`: inspect and edit the knowledge base.

use promptmaster_knowledge::KnowledgeStore;

use super::{open_store, report_persist_failure};
use crate::KnowledgeAction;

pub async fn run(action: KnowledgeAction) -> Result<(), Box<dyn std::error::Error>> {
    let (_config, store) = open_store().await?;

    match action {
        KnowledgeAction::Show => print!("{}", store.corpus().await),
        KnowledgeAction::Set { file } => {
            let text = std::fs::read_to_string(&file)
                .map_err(|e| format!("Failed to read {}: {e}", file.display()))?;
            store.replace_corpus(text).await;
            println!("✅ Knowledge base replaced from {}", file.display());
            report_persist_failure(&store);
        }
        KnowledgeAction::Reset => {
            store.reset().await;
            println!("✅ Knowledge base restored to default (history kept)");
            report_persist_failure(&store);
        }
        KnowledgeAction::History => print_history(&store).await,
    }
    Ok(())
}

async fn print_history(store: &KnowledgeStore) {
    let history = store.version_history().await;
    if history.is_empty() {
        println!("No documents learned yet. Try `promptmaster learn <file.pdf>`.");
        return;
    }
    println!("Learned documents ({})", history.len());
    println!("=====================");
    for version in history {
        println!(
            "  {}  {:<28} {}",
            version.timestamp.format("%Y-%m-%d %H:%M"),
            version.source_name,
            version.summary
        );
    }
}
