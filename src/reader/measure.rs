use crate::content::Block;
use crate::reader::prefs::ReaderPrefs;
use html2text::from_read;
use unicode_width::UnicodeWidthStr;

/// Capability for measuring how tall a run of blocks renders under the
/// current typography. The pagination algorithm only ever sees heights, so
/// tests drive it with a deterministic fake.
pub trait MeasureHeight {
    fn measure(&self, blocks: &[Block], prefs: &ReaderPrefs) -> u32;
}

/// Terminal measurement: flatten each block's markup at the column width
/// the typography implies and charge one line-height per wrapped line.
pub struct TerminalMeasure;

impl TerminalMeasure {
    fn block_lines(block: &Block, columns: usize) -> u32 {
        match from_read(block.html.as_bytes(), columns) {
            Ok(rendered) => rendered.lines().filter(|l| !l.trim().is_empty()).count().max(1) as u32,
            // html2text choked; wrap the raw text by display width instead.
            Err(_) => wrapped_line_count(&block.text, columns),
        }
    }
}

impl MeasureHeight for TerminalMeasure {
    fn measure(&self, blocks: &[Block], prefs: &ReaderPrefs) -> u32 {
        let columns = prefs.text_columns();
        let lines: u32 = blocks
            .iter()
            .map(|b| Self::block_lines(b, columns))
            .sum();
        lines * prefs.line_px()
    }
}

/// Greedy word wrap by display width, counting lines only.
fn wrapped_line_count(text: &str, columns: usize) -> u32 {
    let mut lines = 0u32;
    for paragraph in text.split('\n') {
        let mut used = 0usize;
        let mut line_open = false;
        for word in paragraph.split_whitespace() {
            let w = UnicodeWidthStr::width(word);
            if line_open && used + 1 + w > columns {
                lines += 1;
                used = w;
            } else {
                used += if line_open { 1 + w } else { w };
            }
            line_open = true;
        }
        if line_open {
            lines += 1;
        }
    }
    lines.max(1)
}

#[cfg(test)]
pub struct FixedMeasure {
    /// Height charged per block, keyed by the block's text.
    pub heights: std::collections::HashMap<String, u32>,
    pub default_height: u32,
}

#[cfg(test)]
impl FixedMeasure {
    pub fn uniform(height: u32) -> Self {
        Self {
            heights: std::collections::HashMap::new(),
            default_height: height,
        }
    }

    pub fn with(mut self, text: &str, height: u32) -> Self {
        self.heights.insert(text.to_string(), height);
        self
    }
}

#[cfg(test)]
impl MeasureHeight for FixedMeasure {
    fn measure(&self, blocks: &[Block], _prefs: &ReaderPrefs) -> u32 {
        blocks
            .iter()
            .map(|b| self.heights.get(&b.text).copied().unwrap_or(self.default_height))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(html: &str, text: &str) -> Block {
        Block {
            html: html.to_string(),
            text: text.to_string(),
        }
    }

    #[test]
    fn taller_typography_means_taller_blocks() {
        let blocks = vec![block(
            "<p>The quick brown fox jumps over the lazy dog, again and again and again.</p>",
            "The quick brown fox jumps over the lazy dog, again and again and again.",
        )];
        let mut small = ReaderPrefs::default();
        small.size = 14;
        small.line_height = 1.5;
        let mut large = ReaderPrefs::default();
        large.size = 24;
        large.line_height = 2.2;
        let m = TerminalMeasure;
        assert!(m.measure(&blocks, &large) > m.measure(&blocks, &small));
    }

    #[test]
    fn measure_is_monotone_in_block_count() {
        let one = vec![block("<p>alpha</p>", "alpha")];
        let two = vec![block("<p>alpha</p>", "alpha"), block("<p>beta</p>", "beta")];
        let prefs = ReaderPrefs::default();
        let m = TerminalMeasure;
        assert!(m.measure(&two, &prefs) > m.measure(&one, &prefs));
        assert_eq!(m.measure(&[], &prefs), 0);
    }

    #[test]
    fn wrap_counts_by_display_width() {
        assert_eq!(wrapped_line_count("one two three", 100), 1);
        // 3 words of width 5 at 11 columns: two fit per line.
        assert_eq!(wrapped_line_count("aaaaa bbbbb ccccc", 11), 2);
        assert_eq!(wrapped_line_count("", 40), 1);
    }
}
