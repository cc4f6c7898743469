//! One-shot question from the command line (`rchat ask "<question>"`).
//!
//! Prints the classified intent, the retrieval route taken for recruitment
//! questions, and the final reply. Generation failures print the same
//! apology the chat endpoint returns.

use anyhow::Result;
use recruit_chat_core::classify::{classify_query, QueryType};

use crate::config::Config;
use crate::service;

pub async fn run_ask(config: &Config, question: &str) -> Result<()> {
    let chat = service::build_chat_service(config).await?;

    let classification = classify_query(question);
    println!(
        "intent: {} (confidence {:.2})",
        classification.query_type.as_str(),
        classification.confidence
    );

    if classification.query_type == QueryType::Recruitment {
        let retrieval = chat.retrieve(question, &[]).await;
        println!(
            "route: {} ({} {})",
            retrieval.strategy,
            retrieval.data.len(),
            retrieval.data.kind()
        );
    }

    let reply = chat.reply_or_apology(question, None, &[]).await;
    println!();
    println!("{}", reply.text);

    if !reply.suggestions.is_empty() {
        println!();
        println!("Suggestions:");
        for s in &reply.suggestions {
            println!("  - {}", s);
        }
    }

    Ok(())
}
