use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Args;
use engine::{ConversationCache, FileUpload, HttpSendApi, OutgoingMessage, SendCoordinator};
use shared::{
    config::ClientConfig,
    models::{ConversationId, PageId, Sender},
};

#[derive(Args, Debug)]
#[command(about = "Send a message into a conversation")]
pub struct SendArgs {
    /// Page the conversation belongs to
    #[arg(long)]
    pub page: String,

    /// Conversation identifier to send into
    #[arg(long, alias = "conv")]
    pub conversation: String,

    /// Message text content
    #[arg()]
    pub text: Option<String>,

    /// Media kind of an attachment to send (e.g. image, file)
    #[arg(long)]
    pub file_type: Option<String>,

    /// Local preview URL for the attachment
    #[arg(long, requires = "file_type")]
    pub preview_url: Option<String>,

    /// Path to the configuration file (optional)
    #[arg(
        long,
        short,
        help = "Path to the configuration file (e.g., config.yaml or config.json). If not provided, defaults will be used."
    )]
    pub config: Option<PathBuf>,
}

pub async fn handle_send(args: SendArgs) -> Result<()> {
    let config = ClientConfig::load_config(args.config)
        .map_err(|err| anyhow::anyhow!("failed to load configuration: {err}"))?;
    let client = reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .context("failed to build HTTP client")?;

    let api = Arc::new(HttpSendApi::new(client, config));
    let identity = Sender {
        id: args.page.clone(),
        name: args.page.clone(),
    };
    let (coordinator, _notices) =
        SendCoordinator::new(api, ConversationCache::new(), identity);

    let file = args.file_type.map(|kind| FileUpload {
        kind,
        preview_url: args.preview_url,
    });
    let outgoing = OutgoingMessage {
        page_id: PageId::from(args.page.as_str()),
        conversation_id: ConversationId::from(args.conversation.as_str()),
        text: args.text,
        file,
    };

    let id = coordinator
        .submit(outgoing)
        .await
        .context("send failed")?;
    println!("Message queued as {id}; delivery confirmation arrives over the stream.");

    Ok(())
}
