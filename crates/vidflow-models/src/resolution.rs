//! The fixed quality/resolution table.
//!
//! Built once at process start and shared read-only between all concurrent
//! pipelines; it is never mutated afterwards.

use std::collections::HashMap;

/// Encoding parameters for one quality label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Target video bitrate in ffmpeg notation (e.g. "800k").
    pub video_bitrate: String,
    /// Output width in pixels.
    pub width: u32,
    /// Output height in pixels.
    pub height: u32,
}

impl Resolution {
    pub fn new(video_bitrate: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            video_bitrate: video_bitrate.into(),
            width,
            height,
        }
    }
}

/// Immutable mapping from quality label to encoding parameters.
#[derive(Debug, Clone)]
pub struct ResolutionTable {
    entries: HashMap<String, Resolution>,
}

impl ResolutionTable {
    /// The built-in ladder used by the service.
    pub fn standard() -> Self {
        let mut entries = HashMap::new();
        entries.insert("144p".to_string(), Resolution::new("200k", 256, 144));
        entries.insert("360p".to_string(), Resolution::new("800k", 640, 360));
        entries.insert("720p".to_string(), Resolution::new("2500k", 1280, 720));
        Self { entries }
    }

    /// Look up the parameters for a quality label.
    pub fn get(&self, quality: &str) -> Option<&Resolution> {
        self.entries.get(quality)
    }

    /// Whether a quality label is known.
    pub fn contains(&self, quality: &str) -> bool {
        self.entries.contains_key(quality)
    }

    /// Number of known quality labels.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ResolutionTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_ladder() {
        let table = ResolutionTable::standard();
        assert_eq!(table.len(), 3);

        let r144 = table.get("144p").unwrap();
        assert_eq!(r144.video_bitrate, "200k");
        assert_eq!((r144.width, r144.height), (256, 144));

        let r360 = table.get("360p").unwrap();
        assert_eq!(r360.video_bitrate, "800k");
        assert_eq!((r360.width, r360.height), (640, 360));

        let r720 = table.get("720p").unwrap();
        assert_eq!(r720.video_bitrate, "2500k");
        assert_eq!((r720.width, r720.height), (1280, 720));
    }

    #[test]
    fn test_unknown_quality() {
        let table = ResolutionTable::standard();
        assert!(table.get("1080p").is_none());
        assert!(!table.contains("4k"));
    }
}
