//! Configuration for the export post-processor.

/// Tags used for the outline when none are configured.
pub const DEFAULT_OUTLINE_TAGS: [&str; 6] = ["h1", "h2", "h3", "h4", "h5", "h6"];

/// Export configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    /// Heading tags that produce bookmarks, outermost level first.
    /// An empty list disables the outline.
    pub outline_tags: Vec<String>,

    /// Flate-compress streams that have no filter yet.
    pub compress_streams: bool,

    /// Write dictionaries on a single line.
    pub compact: bool,

    /// Write `/TrimBox` for pages with a bleed area.
    pub trim_boxes: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ExportConfig {
    /// Create new configuration with defaults.
    pub fn new() -> Self {
        Self {
            outline_tags: DEFAULT_OUTLINE_TAGS.iter().map(|t| t.to_string()).collect(),
            compress_streams: false,
            compact: true,
            trim_boxes: true,
        }
    }

    /// Set the outline tags.
    pub fn with_outline_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.outline_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Parse a comma-separated tag list such as `"h1,h2"`. Blank items are dropped.
    pub fn with_outline_tag_list(self, list: &str) -> Self {
        self.with_outline_tags(
            list.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>(),
        )
    }

    /// Enable stream compression.
    pub fn with_compress_streams(mut self, enable: bool) -> Self {
        self.compress_streams = enable;
        self
    }

    /// Use compact dictionary layout.
    pub fn with_compact(mut self, enable: bool) -> Self {
        self.compact = enable;
        self
    }

    /// Enable trim boxes.
    pub fn with_trim_boxes(mut self, enable: bool) -> Self {
        self.trim_boxes = enable;
        self
    }

    /// Whether an outline should be built at all.
    pub fn outline_enabled(&self) -> bool {
        !self.outline_tags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExportConfig::default();
        assert_eq!(config.outline_tags.len(), 6);
        assert_eq!(config.outline_tags[0], "h1");
        assert!(config.outline_enabled());
        assert!(!config.compress_streams);
        assert!(config.compact);
        assert!(config.trim_boxes);
    }

    #[test]
    fn test_tag_list() {
        let config = ExportConfig::new().with_outline_tag_list(" h1, h2 ,,h3");
        assert_eq!(config.outline_tags, vec!["h1", "h2", "h3"]);

        let disabled = ExportConfig::new().with_outline_tag_list("");
        assert!(!disabled.outline_enabled());
    }

    #[test]
    fn test_builder_chain() {
        let config = ExportConfig::new()
            .with_outline_tags(["h2"])
            .with_compress_streams(true)
            .with_compact(false)
            .with_trim_boxes(false);
        assert_eq!(config.outline_tags, vec!["h2"]);
        assert!(config.compress_streams);
        assert!(!config.compact);
        assert!(!config.trim_boxes);
    }
}
