//! Url command implementation.
//!
//! Also hosts the player flags shared with `replay`.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use webplayer_channel::{Platform, PlayerConfig, SessionId};

/// Player configuration flags. Flags override values read from `--config`.
#[derive(Args, Debug, Default)]
pub struct PlayerArgs {
    /// JSON player configuration
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Device platform (ios, android, web)
    #[arg(long)]
    pub platform: Option<String>,

    /// Base URL for runtime assets
    #[arg(long)]
    pub asset_root: Option<String>,

    /// Raw CSS injected into the player page
    #[arg(long)]
    pub css: Option<String>,

    /// Stylesheet URL injected into the player page
    #[arg(long)]
    pub style_sheet: Option<String>,

    #[arg(long)]
    pub status_bar_color: Option<String>,

    #[arg(long)]
    pub status_bar_height: Option<u32>,
}

impl PlayerArgs {
    /// Resolve the effective configuration.
    pub fn load(&self) -> anyhow::Result<PlayerConfig> {
        let mut config = match &self.config {
            Some(path) => PlayerConfig::from_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => PlayerConfig::default(),
        };

        if let Some(platform) = &self.platform {
            config.platform = parse_platform(platform)?;
        }
        if let Some(asset_root) = &self.asset_root {
            config.asset_root = asset_root.clone();
        }
        if let Some(css) = &self.css {
            config.player_css = css.clone();
        }
        if let Some(style_sheet) = &self.style_sheet {
            config.player_style_sheet = style_sheet.clone();
        }
        if let Some(color) = &self.status_bar_color {
            config.status_bar_color = color.clone();
        }
        if let Some(height) = self.status_bar_height {
            config.status_bar_height = height;
        }

        tracing::debug!("Resolved player config: {:?}", config);
        Ok(config)
    }
}

fn parse_platform(name: &str) -> anyhow::Result<Platform> {
    serde_json::from_value(serde_json::Value::String(name.to_lowercase()))
        .map_err(|_| anyhow::anyhow!("Unknown platform '{}' (expected ios, android or web)", name))
}

/// Execute the url command.
pub fn execute(player: &PlayerArgs, session: Option<&str>) -> anyhow::Result<()> {
    let config = player.load()?;
    let id = session.map(SessionId::from).unwrap_or_else(SessionId::generate);

    println!("{}", config.frame_url(&id));
    if let Some(chrome) = config.device_chrome() {
        tracing::debug!(
            "Device chrome: {:?} {}px at {}x",
            chrome.device,
            chrome.width,
            chrome.scale
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let args = PlayerArgs {
            platform: Some("Android".to_string()),
            status_bar_height: Some(24),
            ..PlayerArgs::default()
        };
        let config = args.load().unwrap();
        assert_eq!(config.platform, Platform::Android);
        assert_eq!(config.status_bar_height, 24);
        assert_eq!(config.status_bar_color, "black");
    }

    #[test]
    fn test_unknown_platform() {
        assert!(parse_platform("desktop").is_err());
    }
}
