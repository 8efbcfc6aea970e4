//! Decode command implementation.

use std::io::Read;

use anyhow::Context;
use webplayer_channel::Envelope;
use webplayer_core::Value;
use webplayer_core::ejson::format_args;

/// Execute the decode command.
pub fn execute(message: Option<&str>) -> anyhow::Result<()> {
    let raw = match message {
        Some(message) => message.to_string(),
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read message from stdin")?;
            buffer
        }
    };

    let envelope = Envelope::decode(raw.trim()).context("Not a boundary message")?;

    println!("id: {}", envelope.id);
    println!("type: {}", serde_json::to_string(&envelope.kind)?.trim_matches('"'));
    println!("payload: {}", render_payload(&envelope.payload));

    Ok(())
}

/// Console payloads that are argument lists print like `console.log` output.
pub fn render_payload(payload: &Value) -> String {
    match payload {
        Value::Array(args) if !args.is_empty() => format_args(args),
        other => other.to_string(),
    }
}
