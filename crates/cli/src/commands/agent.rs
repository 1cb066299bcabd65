//! `localpilot agent`: interactive or single-message chat mode.

use std::io::Write;
use std::sync::Arc;

use localpilot_agent::{
    AgentLoop, AgentOptions, ContextItem, ProgressCallback, ProgressEvent, TokenBudget,
    TokenManager,
};
use localpilot_config::AppConfig;
use localpilot_core::fs::LocalFileReader;
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(
    message: Option<String>,
    context: Vec<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let agent = Arc::new(build_agent(&config));
    let items: Vec<ContextItem> = context.into_iter().map(ContextItem::from_path).collect();
    let on_update = progress_printer();

    if let Some(msg) = message {
        let answer = chat_with_interrupt(&agent, &msg, &items, on_update).await;
        println!("{answer}");
        return Ok(());
    }

    println!();
    println!("  LocalPilot: interactive mode");
    println!();
    println!("  Provider:  {}", config.model.provider);
    println!("  Endpoint:  {}", config.model.effective_endpoint());
    println!("  Model:     {}", config.model.name);
    println!("  Workspace: {}", config.tools.effective_root().display());
    if !items.is_empty() {
        println!("  Context:   {} file(s)", items.len());
    }
    println!();
    println!("  Ctrl+C cancels a running request. /reset clears the session.");
    println!("  Type 'exit' to quit.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("  You > ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        match line {
            "" => continue,
            "exit" | "quit" => break,
            "/reset" => {
                agent.reset_context().await;
                println!("  Session cleared.\n");
                continue;
            }
            _ => {}
        }

        let answer = chat_with_interrupt(&agent, line, &items, on_update.clone()).await;
        println!();
        for text in answer.lines() {
            println!("  Assistant > {text}");
        }
        println!();
    }

    println!();
    Ok(())
}

/// Build an agent from configuration.
pub fn build_agent(config: &AppConfig) -> AgentLoop {
    let provider = localpilot_providers::build_from_config(config);
    let gateway = Arc::new(localpilot_tools::default_registry(&config.tools));
    let reader = Arc::new(LocalFileReader::with_root(config.tools.effective_root()));
    let tokens = Arc::new(TokenManager::new(TokenBudget::from_config(&config.tokens)));
    AgentLoop::new(
        provider,
        gateway,
        reader,
        tokens,
        AgentOptions::from_config(config),
    )
}

/// Run one request. Ctrl+C cancels it and the cancellation text is returned.
async fn chat_with_interrupt(
    agent: &AgentLoop,
    message: &str,
    items: &[ContextItem],
    on_update: ProgressCallback,
) -> String {
    let chat = agent.chat(message, items, Some(on_update));
    tokio::pin!(chat);

    tokio::select! {
        answer = &mut chat => answer,
        _ = tokio::signal::ctrl_c() => {
            agent.cancel();
            chat.await
        }
    }
}

/// Compact status lines on stderr.
fn progress_printer() -> ProgressCallback {
    Arc::new(|event: &ProgressEvent| match event {
        ProgressEvent::Thinking { turn } => eprintln!("  ... thinking (turn {turn})"),
        ProgressEvent::Thought { content } => eprintln!("  ~ {content}"),
        ProgressEvent::ToolStart { name, parameters, .. } => {
            eprintln!("  > {name} {parameters}")
        }
        ProgressEvent::ToolEnd { name, success, .. } => {
            let mark = if *success { "ok" } else { "failed" };
            eprintln!("  < {name} {mark}")
        }
        ProgressEvent::ContextAdded { items, tokens } => {
            eprintln!("  + context: {items} file(s), ~{tokens} tokens")
        }
        ProgressEvent::Tokens { total, usage, .. } => match usage {
            Some(u) => eprintln!(
                "  tokens: ~{total} sent, {} prompt / {} completion reported",
                u.prompt_tokens, u.completion_tokens
            ),
            None => eprintln!("  tokens: ~{total} sent"),
        },
        ProgressEvent::Warning { message } => eprintln!("  [warning] {message}"),
        ProgressEvent::Error { message } => eprintln!("  [error] {message}"),
    })
}
