use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result, bail};
use clap::Args;
use engine::{CacheUpdate, ConnectionPhase, SseTransport, StreamManager};
use shared::{
    config::ClientConfig,
    models::{ConversationSummary, PageId},
};
use tokio::sync::broadcast::error::RecvError;

#[derive(Args, Debug)]
#[command(about = "Follow live inbox updates for a page")]
pub struct FollowArgs {
    /// Page identifier to follow
    #[arg(long)]
    pub page: String,

    /// Path to the configuration file (optional)
    #[arg(
        long,
        short,
        help = "Path to the configuration file (e.g., config.yaml or config.json). If not provided, defaults will be used."
    )]
    pub config: Option<PathBuf>,
}

pub async fn handle_follow(args: FollowArgs) -> Result<()> {
    let config = ClientConfig::load_config(args.config)
        .map_err(|err| anyhow::anyhow!("failed to load configuration: {err}"))?;
    let client = reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .context("failed to build HTTP client")?;
    let page_id = PageId::from(args.page.as_str());

    let transport = Arc::new(SseTransport::new(client.clone(), config.clone()));
    let manager = StreamManager::new(transport);

    // Seed the summary list before going live; stream patches only apply to
    // entries that already exist.
    match fetch_summaries(&client, &config, &page_id).await {
        Ok(summaries) => {
            println!("Loaded {} conversations for page {page_id}", summaries.len());
            manager.summaries().prime(page_id.clone(), summaries).await;
        }
        Err(err) => {
            eprintln!("warning: failed to fetch conversation list for {page_id}: {err}");
        }
    }

    let session = manager.subscribe(page_id.clone()).await;
    let mut updates = session.router().subscribe();
    let mut phases = session.phase_watch();

    println!("Following page {page_id}... (press Ctrl+C to stop)");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = phases.changed() => {
                if changed.is_err() {
                    break;
                }
                let phase = *phases.borrow_and_update();
                println!("[stream] {phase:?}");
                if phase == ConnectionPhase::Closed {
                    bail!("stream closed after exhausting reconnect attempts");
                }
            }
            update = updates.recv() => match update {
                Ok(CacheUpdate::Thread(conversation_id)) => {
                    let messages = manager.threads().messages(&conversation_id).await;
                    if let Some(message) = messages.last() {
                        println!("[{conversation_id}] {}: {}", message.from.name, message.text);
                    }
                }
                Ok(CacheUpdate::Summary(conversation_id)) => {
                    if let Some(summaries) = manager.summaries().summaries(&page_id).await
                        && let Some(summary) = summaries.iter().find(|s| s.id == conversation_id)
                    {
                        println!("[{conversation_id}] (list) {}", summary.snippet);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    eprintln!("[stream] lagged; skipped {skipped} updates");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    manager.unsubscribe(&page_id).await;
    Ok(())
}

async fn fetch_summaries(
    client: &reqwest::Client,
    config: &ClientConfig,
    page_id: &PageId,
) -> Result<Vec<ConversationSummary>> {
    let url = config
        .api_base
        .join(&format!("pages/{page_id}/conversations"))
        .context("invalid conversation-list endpoint")?;
    let summaries = client
        .get(url)
        .send()
        .await
        .context("conversation-list request failed")?
        .error_for_status()
        .context("conversation-list request rejected")?
        .json()
        .await
        .context("invalid conversation-list response body")?;
    Ok(summaries)
}
