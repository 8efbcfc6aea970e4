//! Replay command implementation.
//!
//! Opens a channel on a frame that prints what it is sent, requests a run,
//! then feeds a transcript of runtime messages through the boundary listener.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tokio::sync::mpsc;
use webplayer_channel::{
    ChannelCallbacks, ChannelError, ChannelResult, Delivery, ExecutionChannel, FileMap, Frame,
    MessageRouter, RunMessage,
};

use crate::decode::render_payload;
use crate::url::PlayerArgs;

/// Placeholder in transcript lines replaced with the live session id.
const SESSION_PLACEHOLDER: &str = "{id}";

/// Frame that prints navigations and posted messages.
struct StdoutFrame;

impl Frame for StdoutFrame {
    fn load(&mut self, url: &str) -> ChannelResult<()> {
        println!("load {}", url);
        Ok(())
    }

    fn post_message(&mut self, message: &RunMessage) -> ChannelResult<()> {
        let json = message
            .to_json()
            .map_err(|e| ChannelError::Frame(e.to_string()))?;
        println!("post {}", json);
        Ok(())
    }
}

/// Execute the replay command.
pub async fn execute(
    transcript: &Path,
    files: &[PathBuf],
    entry: &str,
    player: &PlayerArgs,
) -> anyhow::Result<()> {
    let config = player.load()?;
    let lines = fs::read_to_string(transcript)
        .with_context(|| format!("Failed to read transcript {}", transcript.display()))?;
    let file_map = load_files(files)?;

    let router = MessageRouter::new();
    let callbacks = ChannelCallbacks::new()
        .on_run(|| println!("run requested"))
        .on_console(|payload| println!("console: {}", render_payload(payload)))
        .on_error(|payload| println!("error: {}", payload));
    let channel = ExecutionChannel::open(&router, &config, StdoutFrame, callbacks)?;

    match channel.run_application(file_map, entry)? {
        Delivery::Posted => {}
        Delivery::Queued => println!("queued {}", entry),
    }

    let (tx, rx) = mpsc::unbounded_channel();
    let mut sent = 0;
    for line in lines.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let raw = line.replace(SESSION_PLACEHOLDER, channel.session_id().as_str());
        tx.send(raw).context("Boundary listener closed early")?;
        sent += 1;
    }
    drop(tx);

    let delivered = router.listen(rx).await;
    println!(
        "status: {:?}, delivered {}/{} messages",
        channel.status(),
        delivered,
        sent
    );
    if let Some(pending) = channel.pending_run() {
        println!("undelivered run of {}", pending.entry);
    }

    channel.close();
    Ok(())
}

fn load_files(files: &[PathBuf]) -> anyhow::Result<FileMap> {
    let mut map = FileMap::new();
    for path in files {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .with_context(|| format!("Invalid file name {}", path.display()))?;
        let source = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        map.insert(format!("/{}", name), source);
    }
    Ok(map)
}
