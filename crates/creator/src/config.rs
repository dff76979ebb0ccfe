//! Creator configuration.

use crate::user_agent;
use common::CanvasSize;
use std::time::Duration;

/// Creator configuration.
#[derive(Clone, Debug)]
pub struct CreatorConfig {
    /// Kit server root.
    pub server_url: String,
    /// Server-relative folder holding the kits.
    pub kit_base: String,
    /// Canvas used until a kit reports its own.
    pub default_canvas: CanvasSize,
    /// Width the composite is drawn at, keeping the kit's aspect ratio.
    /// `None` draws at the kit's full canvas size.
    pub display_width: Option<u32>,
    /// Chance that randomize leaves a part empty.
    pub skip_probability: f64,
    /// Request timeout.
    pub request_timeout: Duration,
    /// Decoded image cache size in bytes.
    pub cache_size: usize,
    /// User agent string.
    pub user_agent: String,
}

impl CreatorConfig {
    /// Create a new configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration for exporting full-size images.
    pub fn full_size() -> Self {
        Self {
            display_width: None,
            ..Self::default()
        }
    }

    /// Set the kit server root.
    pub fn with_server(mut self, url: &str) -> Self {
        self.server_url = url.to_string();
        self
    }

    /// Set the folder holding the kits.
    pub fn with_kit_base(mut self, kit_base: &str) -> Self {
        self.kit_base = kit_base.to_string();
        self
    }

    pub fn with_canvas(mut self, canvas: CanvasSize) -> Self {
        self.default_canvas = canvas;
        self
    }

    pub fn with_display_width(mut self, width: Option<u32>) -> Self {
        self.display_width = width;
        self
    }

    /// Set the randomize skip probability. Values are clamped to `0..=1`.
    pub fn with_skip_probability(mut self, probability: f64) -> Self {
        self.skip_probability = if probability.is_nan() {
            0.0
        } else {
            probability.clamp(0.0, 1.0)
        };
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_cache_size(mut self, bytes: usize) -> Self {
        self.cache_size = bytes;
        self
    }

    /// Size the composite is drawn at for a kit canvas.
    pub fn render_size(&self, canvas: CanvasSize) -> CanvasSize {
        match self.display_width {
            Some(width) if width > 0 => canvas.scaled_to_width(width),
            _ => canvas,
        }
    }
}

impl Default for CreatorConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8000/".to_string(),
            kit_base: "downloads/".to_string(),
            default_canvas: CanvasSize::DEFAULT,
            display_width: Some(400),
            skip_probability: 0.15,
            request_timeout: Duration::from_secs(30),
            cache_size: 256 * 1024 * 1024, // 256MB
            user_agent: user_agent(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CreatorConfig::default();
        assert_eq!(config.kit_base, "downloads/");
        assert_eq!(config.default_canvas, CanvasSize::new(1436, 1902));
        assert_eq!(config.skip_probability, 0.15);
        assert_eq!(config.display_width, Some(400));
    }

    #[test]
    fn test_render_size() {
        let config = CreatorConfig::default();
        assert_eq!(config.render_size(CanvasSize::new(1000, 2000)), CanvasSize::new(400, 800));
        let config = CreatorConfig::full_size();
        assert_eq!(config.render_size(CanvasSize::DEFAULT), CanvasSize::DEFAULT);
    }

    #[test]
    fn test_config_builder() {
        let config = CreatorConfig::new()
            .with_server("http://kits.local:9000/")
            .with_skip_probability(1.5)
            .with_display_width(None);

        assert_eq!(config.server_url, "http://kits.local:9000/");
        assert_eq!(config.skip_probability, 1.0);
        assert!(config.display_width.is_none());
    }
}
