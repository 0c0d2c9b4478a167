//! Interactive terminal chat with the remote AstroGuide agent.
//!
//! Stands in for the capture UI: resumes the most recent persisted
//! session, replays its task ids through the bridge, then streams each
//! turn to stdout and persists the returned checkpoint.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use astroguide_bridge::{BridgeConfig, ConversationBridge, DeltaHandler};
use astroguide_rpc::MessageRole;
use astroguide_session::{JsonlSessionStore, PersistedSession, SessionStore};

#[derive(Debug, Parser)]
#[command(
    name = "astroguide",
    about = "Interactive chat with the AstroGuide agent",
    version
)]
struct Cli {
    /// JSON-RPC endpoint of the remote agent.
    #[arg(
        long,
        env = "ASTROGUIDE_ENDPOINT",
        default_value = "http://127.0.0.1:8000/a2a"
    )]
    endpoint: String,

    /// Session store path.
    #[arg(long, default_value = "astroguide-sessions.jsonl")]
    session_file: PathBuf,

    /// Session to resume; defaults to the most recent main session.
    #[arg(long)]
    session_id: Option<String>,

    /// File whose contents are prepended once to the first message of a
    /// new conversation.
    #[arg(long)]
    context_file: Option<PathBuf>,

    /// Request timeout in milliseconds.
    #[arg(long, default_value_t = 120_000)]
    request_timeout_ms: u64,

    /// Use plain message/send instead of SSE streaming.
    #[arg(long)]
    no_stream: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut store = JsonlSessionStore::load(&cli.session_file).with_context(|| {
        format!("failed to load session store {}", cli.session_file.display())
    })?;
    let mut session = resolve_session(&store, cli.session_id.as_deref())?;

    let initial_context = match cli.context_file.as_ref() {
        Some(path) => Some(std::fs::read_to_string(path).with_context(|| {
            format!("failed to read context file {}", path.display())
        })?),
        None => None,
    };

    let mut config = BridgeConfig::new(cli.endpoint.clone());
    config.request_timeout_ms = cli.request_timeout_ms;
    config.streaming = !cli.no_stream;
    config.initial_context = initial_context;
    let mut bridge = ConversationBridge::new(config)?;

    if !session.task_ids.is_empty() {
        match bridge.restore_history(&session.task_ids).await {
            Ok(true) => print_transcript(&bridge),
            Ok(false) => {
                tracing::warn!("no stored tasks could be recovered; starting fresh");
            }
            Err(error) => {
                tracing::warn!(error = %error, "history restore failed; starting fresh");
            }
        }
    }

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        print!("you> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if text == "/quit" {
            break;
        }

        print!("guide> ");
        std::io::stdout().flush()?;
        let sink: DeltaHandler = Arc::new(|delta: String| {
            print!("{delta}");
            let _ = std::io::stdout().flush();
        });

        match bridge.send_message(text, &[], Some(sink)).await {
            Ok(outcome) => {
                println!();
                session.absorb_completion(
                    outcome.checkpoint.task_id.as_deref(),
                    outcome.checkpoint.context_id.as_deref(),
                    Utc::now(),
                );
                store.put(session.clone())?;
            }
            Err(error) => {
                println!();
                tracing::error!(error = %error, "send failed; the message was not delivered");
            }
        }
    }

    Ok(())
}

fn print_transcript(bridge: &ConversationBridge) {
    for entry in bridge.transcript() {
        let label = match entry.role {
            MessageRole::User => "you",
            MessageRole::Agent => "guide",
        };
        println!("{label}> {}", entry.text);
    }
}

fn resolve_session(
    store: &JsonlSessionStore,
    session_id: Option<&str>,
) -> Result<PersistedSession> {
    if let Some(local_id) = session_id {
        if let Some(session) = store.get(local_id)? {
            return Ok(session);
        }
        return Ok(PersistedSession::new(
            local_id,
            "AstroGuide conversation",
            Utc::now(),
        ));
    }
    if let Some(session) = store.query_latest_main_session()? {
        return Ok(session);
    }
    Ok(PersistedSession::new(
        Uuid::new_v4().to_string(),
        "AstroGuide conversation",
        Utc::now(),
    ))
}

fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use astroguide_session::{JsonlSessionStore, PersistedSession, SessionStore};
    use chrono::{TimeZone, Utc};

    use super::resolve_session;

    #[test]
    fn resolves_the_most_recent_main_session_by_default() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("sessions.jsonl");
        let mut store = JsonlSessionStore::load(&path).expect("load");

        let older = PersistedSession::new(
            "old",
            "First night",
            Utc.with_ymd_and_hms(2026, 3, 1, 20, 0, 0).single().expect("timestamp"),
        );
        let newer = PersistedSession::new(
            "new",
            "Second night",
            Utc.with_ymd_and_hms(2026, 3, 2, 20, 0, 0).single().expect("timestamp"),
        );
        store.put(older).expect("put");
        store.put(newer).expect("put");

        let resolved = resolve_session(&store, None).expect("resolve");
        assert_eq!(resolved.local_id, "new");
    }

    #[test]
    fn unknown_explicit_session_id_starts_a_fresh_session_under_that_id() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store =
            JsonlSessionStore::load(dir.path().join("sessions.jsonl")).expect("load");

        let resolved = resolve_session(&store, Some("tonight")).expect("resolve");
        assert_eq!(resolved.local_id, "tonight");
        assert!(resolved.task_ids.is_empty());
    }
}
