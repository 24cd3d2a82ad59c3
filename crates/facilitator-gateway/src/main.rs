//! Binary entry point for a single facilitation session.
//!
//! Mirrors `skynet-gateway`'s `main.rs` shape — init tracing, load config
//! with a warn-and-fallback default, construct the shared collaborators,
//! then hand off to the long-lived async engine — trimmed to a single
//! room instead of a multi-tenant HTTP server, per the Non-goal on
//! multi-room coordination by a single instance.

mod adapters;

use std::sync::Arc;

use facilitator_core::config::FacilitatorConfig;
use facilitator_core::SystemClock;
use facilitator_llm::{AnthropicFastPath, AnthropicLargePath};
use facilitator_session::{parse_room_metadata, SessionDependencies, SessionLifecycle};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use adapters::{FsDocumentSink, LoggingDataChannel, StaticParticipantRegistry, StdioTtsSink};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "facilitator=info".into()),
        )
        .init();

    let config_path = std::env::var("BEAT_CONFIG").ok();
    let config = FacilitatorConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!("config load failed ({e}), using defaults");
        FacilitatorConfig::default()
    });

    let room_id = std::env::var("BEAT_ROOM_ID").unwrap_or_else(|_| "local".to_string());
    let metadata_path = std::env::var("BEAT_ROOM_METADATA")
        .map_err(|_| anyhow::anyhow!("BEAT_ROOM_METADATA must point at a room metadata JSON file"))?;
    let raw_metadata: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&metadata_path)?)?;
    let metadata = parse_room_metadata(&raw_metadata)?;

    let participants = std::env::var("BEAT_PARTICIPANTS")
        .map(|v| v.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect())
        .unwrap_or_default();

    let api_key = std::env::var("ANTHROPIC_API_KEY").unwrap_or_default();
    let documents_dir = std::env::var("BEAT_DOCUMENTS_DIR").unwrap_or_else(|_| "./documents".to_string());

    let deps = SessionDependencies {
        tts: Arc::new(StdioTtsSink),
        data_channel: Arc::new(LoggingDataChannel),
        participant_registry: Arc::new(StaticParticipantRegistry::new(participants)),
        document_sink: Arc::new(FsDocumentSink::new(documents_dir)),
        fast_path_llm: Arc::new(AnthropicFastPath::new(api_key.clone(), None)),
        large_path_llm: Arc::new(AnthropicLargePath::new(api_key, None)),
        clock: Arc::new(SystemClock::new()),
        fast_model: "claude-3-5-haiku-20241022".to_string(),
        large_model: "claude-3-5-sonnet-20241022".to_string(),
    };

    info!(%room_id, "starting facilitation session");

    let (lifecycle, scheduler_task, scheduler_shutdown) =
        SessionLifecycle::bootstrap(room_id, metadata, &config, deps).await?;

    let (transcript_tx, transcript_rx) = mpsc::channel(64);
    let (control_tx, control_rx) = mpsc::channel(16);

    tokio::spawn(read_transcript_from_stdin(transcript_tx));
    tokio::spawn(forward_ctrl_c(control_tx));

    lifecycle.run(transcript_rx, control_rx, scheduler_task, scheduler_shutdown).await;

    info!("session ended");
    Ok(())
}

/// Reads `speaker: text` lines from stdin and forwards them as transcript
/// events. Stands in for the real STT feed in a local/dev run.
async fn read_transcript_from_stdin(tx: mpsc::Sender<facilitator_session::TranscriptEvent>) {
    use tokio::io::{AsyncBufReadExt, BufReader};

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let Some((speaker, text)) = line.split_once(':') else { continue };
                let event = facilitator_session::TranscriptEvent {
                    speaker: speaker.trim().to_string(),
                    text: text.trim().to_string(),
                };
                if tx.send(event).await.is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                error!(error = %e, "stdin read failed");
                break;
            }
        }
    }
}

/// Translates Ctrl-C into an explicit end-meeting control event so a local
/// run shuts down cleanly (and still produces documents) instead of the
/// process just dying.
async fn forward_ctrl_c(tx: mpsc::Sender<facilitator_session::ControlEvent>) {
    if tokio::signal::ctrl_c().await.is_ok() {
        let _ = tx.send(facilitator_session::ControlEvent::EndMeeting).await;
    }
}
