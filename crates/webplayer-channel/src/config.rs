//! Player configuration and the frame address built from it.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::channel::SessionId;
use crate::error::ChannelResult;

/// Device the preview is framed as.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Ios,
    Android,
    /// No device chrome; the frame fills its container.
    Web,
}

/// Parameters for the device chrome drawn around the frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceChrome {
    pub device: Platform,
    pub width: u32,
    pub scale: f64,
}

/// Host-facing player options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerConfig {
    pub platform: Platform,
    /// Device width in CSS pixels.
    pub width: u32,
    pub scale: f64,
    /// Base URL for assets the runtime loads.
    pub asset_root: String,
    pub status_bar_height: u32,
    pub status_bar_color: String,
    /// Third-party component descriptors, passed to the runtime verbatim.
    pub vendor_components: Vec<serde_json::Value>,
    /// URL of a stylesheet injected into the runtime page.
    pub player_style_sheet: String,
    /// Raw CSS injected into the runtime page.
    #[serde(rename = "playerCSS")]
    pub player_css: String,
    /// Page the frame loads.
    pub player_page: String,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            platform: Platform::Ios,
            width: 300,
            scale: 1.0,
            asset_root: String::new(),
            status_bar_height: 0,
            status_bar_color: "black".to_string(),
            vendor_components: Vec::new(),
            player_style_sheet: String::new(),
            player_css: String::new(),
            player_page: "player.html".to_string(),
        }
    }
}

impl PlayerConfig {
    /// Parse a JSON configuration; missing keys keep their defaults.
    pub fn from_json(text: &str) -> ChannelResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> ChannelResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Chrome to draw around the frame, or `None` on the web platform.
    pub fn device_chrome(&self) -> Option<DeviceChrome> {
        match self.platform {
            Platform::Web => None,
            device => Some(DeviceChrome {
                device,
                width: self.width,
                scale: self.scale,
            }),
        }
    }

    /// Address of the runtime page for session `id`.
    ///
    /// Parameters travel in the fragment. `vendorComponents` (as JSON) and
    /// `css` are percent-escaped; the other values are inserted as given.
    pub fn frame_url(&self, id: &SessionId) -> String {
        let vendor_components = serde_json::to_string(&self.vendor_components)
            .unwrap_or_else(|_| "[]".to_string());

        format!(
            "{}#id={}&assetRoot={}&vendorComponents={}&styleSheet={}&css={}&statusBarColor={}&statusBarHeight={}",
            self.player_page,
            id,
            self.asset_root,
            urlencoding::encode(&vendor_components),
            self.player_style_sheet,
            urlencoding::encode(&self.player_css),
            self.status_bar_color,
            self.status_bar_height,
        )
    }
}
