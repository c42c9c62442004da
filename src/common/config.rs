use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub overlay: OverlaySettings,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct OverlaySettings {
    /// Width of the visible sliver of a stacked window, and the default strip
    /// width before a target is set.
    pub stack_margin: f64,
    /// Horizontal gap the layout engine keeps between neighbouring windows.
    pub window_gap: f64,
    /// Vertical margin between the top panel and tiled windows.
    pub margin_tb: f64,
    pub icon_size: f64,
    /// Distance between the icon and the strip edge it is docked against.
    pub icon_inset: f64,
    pub show_icon: bool,
    pub fade_duration_ms: u64,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            stack_margin: 75.0,
            window_gap: 10.0,
            margin_tb: 2.0,
            icon_size: 20.0,
            icon_inset: 2.0,
            show_icon: false,
            fade_duration_ms: 250,
        }
    }
}

impl OverlaySettings {
    pub fn fade_duration(&self) -> Duration { Duration::from_millis(self.fade_duration_ms) }
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("stack-overlay").join("config.toml"))
    }

    pub fn parse(input: &str) -> anyhow::Result<Config> {
        toml::from_str(input).context("invalid overlay config")
    }

    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let input = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config at {}", path.display()))?;
        Self::parse(&input)
    }
}
