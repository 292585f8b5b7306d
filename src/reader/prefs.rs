use crate::store::{KEY_READER_PREFS, KvStore};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadMode {
    Scroll,
    Pages,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontChoice {
    Serif,
    Sans,
    Mono,
}

impl FontChoice {
    pub fn label(self) -> &'static str {
        match self {
            FontChoice::Serif => "Serif",
            FontChoice::Sans => "Sans",
            FontChoice::Mono => "Typewriter",
        }
    }
}

/// User typography settings, persisted as a JSON blob. Field names match
/// the stored shape (`lh` for line height).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderPrefs {
    pub mode: ReadMode,
    pub font: FontChoice,
    pub size: u16,
    #[serde(rename = "lh")]
    pub line_height: f32,
    pub width: u16,
    pub justify: bool,
    pub columns: u8,
}

impl Default for ReaderPrefs {
    fn default() -> Self {
        Self {
            mode: ReadMode::Scroll,
            font: FontChoice::Serif,
            size: 18,
            line_height: 1.9,
            width: 680,
            justify: false,
            columns: 1,
        }
    }
}

impl ReaderPrefs {
    /// Load from the store; absent or malformed blobs fall back to defaults.
    pub fn load(store: &dyn KvStore) -> Self {
        store
            .get(KEY_READER_PREFS)
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or_default()
    }

    pub fn save(&self, store: &dyn KvStore) {
        if let Ok(raw) = serde_json::to_string(self) {
            store.set(KEY_READER_PREFS, &raw);
        }
    }

    /// Rendered line height in px.
    pub fn line_px(&self) -> u32 {
        (self.size as f32 * self.line_height).round().max(1.0) as u32
    }

    /// Character columns that fit the configured content width, assuming
    /// an average glyph advance of 0.55em. Floor of 20 keeps degenerate
    /// widths readable.
    pub fn text_columns(&self) -> usize {
        ((self.width as f32 / (self.size as f32 * 0.55)).floor() as usize).max(20)
    }

    /// Columns are a scroll-mode feature; pages mode always renders one.
    pub fn effective_columns(&self) -> u8 {
        match self.mode {
            ReadMode::Pages => 1,
            ReadMode::Scroll => self.columns.clamp(1, 2),
        }
    }

    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            ReadMode::Scroll => ReadMode::Pages,
            ReadMode::Pages => ReadMode::Scroll,
        };
    }

    pub fn cycle_font(&mut self) {
        self.font = match self.font {
            FontChoice::Serif => FontChoice::Sans,
            FontChoice::Sans => FontChoice::Mono,
            FontChoice::Mono => FontChoice::Serif,
        };
    }

    // Adjustment steps and ranges mirror the reader controls.

    pub fn adjust_size(&mut self, delta: i16) {
        self.size = (self.size as i16 + delta).clamp(14, 24) as u16;
    }

    pub fn adjust_line_height(&mut self, delta: f32) {
        self.line_height = (self.line_height + delta).clamp(1.5, 2.2);
    }

    pub fn adjust_width(&mut self, delta: i16) {
        self.width = (self.width as i16 + delta).clamp(560, 900) as u16;
    }

    pub fn toggle_justify(&mut self) {
        self.justify = !self.justify;
    }

    pub fn toggle_columns(&mut self) {
        self.columns = if self.columns > 1 { 1 } else { 2 };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemStore;

    #[test]
    fn malformed_blob_falls_back_to_defaults() {
        let store = MemStore::new();
        store.set(KEY_READER_PREFS, "{not json");
        assert_eq!(ReaderPrefs::load(&store), ReaderPrefs::default());
    }

    #[test]
    fn partial_blob_keeps_defaults_for_missing_fields() {
        let store = MemStore::new();
        store.set(KEY_READER_PREFS, r#"{"mode":"pages","size":22}"#);
        let prefs = ReaderPrefs::load(&store);
        assert_eq!(prefs.mode, ReadMode::Pages);
        assert_eq!(prefs.size, 22);
        assert_eq!(prefs.width, 680);
        assert!((prefs.line_height - 1.9).abs() < f32::EPSILON);
    }

    #[test]
    fn round_trip_through_store() {
        let store = MemStore::new();
        let mut prefs = ReaderPrefs::default();
        prefs.toggle_mode();
        prefs.adjust_size(3);
        prefs.save(&store);
        assert_eq!(ReaderPrefs::load(&store), prefs);
    }

    #[test]
    fn adjustments_clamp_to_control_ranges() {
        let mut prefs = ReaderPrefs::default();
        for _ in 0..50 {
            prefs.adjust_size(1);
            prefs.adjust_width(10);
            prefs.adjust_line_height(0.05);
        }
        assert_eq!(prefs.size, 24);
        assert_eq!(prefs.width, 900);
        assert!((prefs.line_height - 2.2).abs() < 1e-4);
    }

    #[test]
    fn pages_mode_forces_single_column() {
        let mut prefs = ReaderPrefs::default();
        prefs.columns = 2;
        prefs.mode = ReadMode::Pages;
        assert_eq!(prefs.effective_columns(), 1);
        prefs.mode = ReadMode::Scroll;
        assert_eq!(prefs.effective_columns(), 2);
    }
}
