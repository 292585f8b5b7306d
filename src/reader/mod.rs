pub mod measure;
pub mod prefs;

use crate::content::Block;
use measure::MeasureHeight;
use prefs::ReaderPrefs;
use std::time::{Duration, Instant};

/// Pages never shrink below this, whatever the viewport says.
pub const MIN_PAGE_HEIGHT: u32 = 420;

/// Quiet period before a resize burst triggers one repagination.
pub const RESIZE_DEBOUNCE: Duration = Duration::from_millis(150);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderState {
    /// No content loaded.
    Idle,
    /// Content present, no page sequence computed (scroll mode).
    Loaded,
    /// A pagination pass is outstanding.
    Paginating,
    /// Page sequence valid for the current generation.
    Ready,
}

/// One page of the computed sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub blocks: Vec<Block>,
}

impl Page {
    pub fn html(&self) -> String {
        self.blocks
            .iter()
            .map(|b| b.html.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Handle tying a pagination pass to the generation that started it.
/// Results from a superseded generation are discarded on apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassToken {
    generation: u64,
}

/// Chapter-view pagination state machine. Derived page state is disposable:
/// any invalidating change (content, typography, viewport, mode) bumps the
/// generation and a fresh pass fully replaces the sequence.
pub struct ReaderEngine {
    state: ReaderState,
    generation: u64,
    blocks: Vec<Block>,
    pages: Vec<Page>,
    current_page: usize,
    target_height: u32,
    scroll_offset: u32,
    scroll_range: u32,
    resize_at: Option<Instant>,
}

impl ReaderEngine {
    pub fn new() -> Self {
        Self {
            state: ReaderState::Idle,
            generation: 0,
            blocks: Vec::new(),
            pages: Vec::new(),
            current_page: 0,
            target_height: MIN_PAGE_HEIGHT,
            scroll_offset: 0,
            scroll_range: 0,
            resize_at: None,
        }
    }

    pub fn state(&self) -> ReaderState {
        self.state
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn target_height(&self) -> u32 {
        self.target_height
    }

    /// Install chapter content. Invalidates any outstanding pass.
    pub fn set_content(&mut self, blocks: Vec<Block>) {
        self.generation += 1;
        self.blocks = blocks;
        self.pages.clear();
        self.current_page = 0;
        self.scroll_offset = 0;
        self.state = if self.blocks.is_empty() {
            ReaderState::Idle
        } else {
            ReaderState::Loaded
        };
    }

    /// Tear down the view: outstanding passes must not touch state anymore.
    pub fn teardown(&mut self) {
        self.generation += 1;
        self.blocks.clear();
        self.pages.clear();
        self.current_page = 0;
        self.scroll_offset = 0;
        self.state = ReaderState::Idle;
    }

    /// Start a pagination pass against the given viewport height. Any older
    /// outstanding pass becomes stale.
    pub fn begin_pass(&mut self, viewport_height: u32) -> PassToken {
        self.generation += 1;
        self.target_height = viewport_height.max(MIN_PAGE_HEIGHT);
        self.state = ReaderState::Paginating;
        PassToken {
            generation: self.generation,
        }
    }

    /// Run the pass the token belongs to. Measurement is synchronous; the
    /// split exists so a caller can interleave passes (and tests can apply
    /// them out of order).
    pub fn run_pass(&self, measurer: &impl MeasureHeight, prefs: &ReaderPrefs) -> Vec<Page> {
        paginate(&self.blocks, self.target_height, measurer, prefs)
    }

    /// Apply a finished pass. Returns false (and changes nothing) when the
    /// token's generation has been superseded.
    pub fn apply_pass(&mut self, token: PassToken, pages: Vec<Page>) -> bool {
        if token.generation != self.generation {
            log::debug!(
                "discarding stale pagination pass (gen {} < {})",
                token.generation,
                self.generation
            );
            return false;
        }
        self.pages = pages;
        // Keep the reader inside the new sequence; no re-alignment to the
        // old content position is attempted.
        self.current_page = self
            .current_page
            .min(self.pages.len().saturating_sub(1));
        self.state = ReaderState::Ready;
        true
    }

    /// Clamped, idempotent page navigation.
    pub fn go_to(&mut self, index: usize) {
        if self.pages.is_empty() {
            self.current_page = 0;
            return;
        }
        self.current_page = index.min(self.pages.len() - 1);
    }

    pub fn next_page(&mut self) {
        self.go_to(self.current_page.saturating_add(1));
    }

    pub fn prev_page(&mut self) {
        self.go_to(self.current_page.saturating_sub(1));
    }

    /// Progress in pages mode: 0 on the first page, 100 on the last, 0 for
    /// a single-page (or empty) chapter.
    pub fn page_progress(&self) -> f32 {
        if self.pages.len() <= 1 {
            return 0.0;
        }
        (self.current_page as f32 / (self.pages.len() - 1) as f32) * 100.0
    }

    /// Scroll-mode progress inputs: current offset and the scrollable range
    /// (content height minus viewport height).
    pub fn set_scroll(&mut self, offset: u32, range: u32) {
        self.scroll_offset = offset;
        self.scroll_range = range;
    }

    pub fn scroll_progress(&self) -> f32 {
        if self.scroll_range == 0 {
            return 0.0;
        }
        ((self.scroll_offset as f32 / self.scroll_range as f32) * 100.0).clamp(0.0, 100.0)
    }

    // ---- resize debouncing ----

    /// Record a resize event; bursts coalesce into one pass.
    pub fn note_resize(&mut self) {
        self.resize_at = Some(Instant::now());
    }

    /// True once the quiet period after the last resize has elapsed.
    /// Consumes the pending marker.
    pub fn resize_due(&mut self) -> bool {
        match self.resize_at {
            Some(at) if at.elapsed() >= RESIZE_DEBOUNCE => {
                self.resize_at = None;
                true
            }
            _ => false,
        }
    }
}

impl Default for ReaderEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Greedy block pagination. Blocks accumulate into the current page until
/// the measured height exceeds `target`; the overflowing block is backed
/// out, the page closed, and a new page started with that block. A block
/// that alone exceeds the target is emitted whole as its own page. The
/// final page is always closed; blank pages are filtered.
pub fn paginate(
    blocks: &[Block],
    target: u32,
    measurer: &impl MeasureHeight,
    prefs: &ReaderPrefs,
) -> Vec<Page> {
    let mut pages: Vec<Page> = Vec::new();
    let mut current: Vec<Block> = Vec::new();

    for block in blocks {
        current.push(block.clone());
        if measurer.measure(&current, prefs) > target {
            let overflow = current.pop().expect("just pushed");
            if !current.is_empty() {
                pages.push(Page {
                    blocks: std::mem::take(&mut current),
                });
            }
            current.push(overflow);
            // Oversized-node escape: emit it whole rather than looping.
            if measurer.measure(&current, prefs) > target {
                pages.push(Page {
                    blocks: std::mem::take(&mut current),
                });
            }
        }
    }
    if !current.is_empty() {
        pages.push(Page { blocks: current });
    }
    pages.retain(|p| p.blocks.iter().any(|b| !b.html.trim().is_empty()));
    pages
}

#[cfg(test)]
mod tests {
    use super::measure::FixedMeasure;
    use super::*;

    fn blocks(n: usize) -> Vec<Block> {
        (0..n)
            .map(|i| Block {
                html: format!("<p>b{}</p>", i),
                text: format!("b{}", i),
            })
            .collect()
    }

    fn prefs() -> ReaderPrefs {
        ReaderPrefs::default()
    }

    #[test]
    fn pagination_covers_every_block_exactly_once() {
        let src = blocks(10);
        let m = FixedMeasure::uniform(100);
        let pages = paginate(&src, 420, &m, &prefs());
        // 4 blocks of 100px fit under 420.
        assert_eq!(pages.len(), 3);
        let flattened: Vec<Block> = pages.into_iter().flat_map(|p| p.blocks).collect();
        assert_eq!(flattened, src);
    }

    #[test]
    fn exact_fit_does_not_overflow() {
        let src = blocks(4);
        let m = FixedMeasure::uniform(105);
        let pages = paginate(&src, 420, &m, &prefs());
        assert_eq!(pages.len(), 1);
    }

    #[test]
    fn oversized_block_becomes_its_own_page() {
        let mut src = blocks(3);
        src.insert(1, Block {
            html: "<p>huge</p>".to_string(),
            text: "huge".to_string(),
        });
        let m = FixedMeasure::uniform(100).with("huge", 9_000);
        let pages = paginate(&src, 420, &m, &prefs());
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].blocks.len(), 1);
        assert_eq!(pages[1].blocks[0].text, "huge");
        assert_eq!(pages[2].blocks.len(), 2);
        let flattened: Vec<Block> = pages.into_iter().flat_map(|p| p.blocks).collect();
        assert_eq!(flattened, src);
    }

    #[test]
    fn zero_blocks_yield_empty_sequence_and_zero_progress() {
        let mut engine = ReaderEngine::new();
        engine.set_content(Vec::new());
        assert_eq!(engine.state(), ReaderState::Idle);
        let token = engine.begin_pass(500);
        let pages = engine.run_pass(&FixedMeasure::uniform(10), &prefs());
        assert!(engine.apply_pass(token, pages));
        assert_eq!(engine.page_count(), 0);
        assert_eq!(engine.page_progress(), 0.0);
        engine.go_to(5);
        assert_eq!(engine.current_page(), 0);
    }

    #[test]
    fn stale_pass_is_discarded() {
        let mut engine = ReaderEngine::new();
        engine.set_content(blocks(6));
        let m = FixedMeasure::uniform(100);

        // G1 starts, then a typography change supersedes it with G2.
        let g1 = engine.begin_pass(420);
        let g1_pages = engine.run_pass(&m, &prefs());
        let g2 = engine.begin_pass(9_000);
        let g2_pages = engine.run_pass(&m, &prefs());

        assert!(engine.apply_pass(g2, g2_pages.clone()));
        let visible = engine.pages().to_vec();

        // G1 finishing late must leave G2's result in place.
        assert!(!engine.apply_pass(g1, g1_pages));
        assert_eq!(engine.pages(), visible.as_slice());
        assert_eq!(engine.state(), ReaderState::Ready);
    }

    #[test]
    fn teardown_invalidates_outstanding_pass() {
        let mut engine = ReaderEngine::new();
        engine.set_content(blocks(4));
        let token = engine.begin_pass(420);
        let pages = engine.run_pass(&FixedMeasure::uniform(100), &prefs());
        engine.teardown();
        assert!(!engine.apply_pass(token, pages));
        assert_eq!(engine.state(), ReaderState::Idle);
        assert_eq!(engine.page_count(), 0);
    }

    #[test]
    fn resize_clamps_current_page_into_new_range() {
        let mut engine = ReaderEngine::new();
        engine.set_content(blocks(8));
        let m = FixedMeasure::uniform(300);

        let t = engine.begin_pass(420);
        let pages = engine.run_pass(&m, &prefs());
        assert!(engine.apply_pass(t, pages));
        assert_eq!(engine.page_count(), 8);
        engine.go_to(7);

        // Taller viewport, fewer pages; index must clamp.
        let t = engine.begin_pass(1_000);
        let pages = engine.run_pass(&m, &prefs());
        assert!(engine.apply_pass(t, pages));
        assert!(engine.page_count() < 8);
        assert_eq!(engine.current_page(), engine.page_count() - 1);
    }

    #[test]
    fn page_progress_endpoints() {
        let mut engine = ReaderEngine::new();
        engine.set_content(blocks(9));
        let t = engine.begin_pass(420);
        let pages = engine.run_pass(&FixedMeasure::uniform(150), &prefs());
        assert!(engine.apply_pass(t, pages));
        assert!(engine.page_count() > 1);

        engine.go_to(0);
        assert_eq!(engine.page_progress(), 0.0);
        engine.go_to(engine.page_count() - 1);
        assert_eq!(engine.page_progress(), 100.0);

        // Single-page chapter always reports 0.
        let mut single = ReaderEngine::new();
        single.set_content(blocks(1));
        let t = single.begin_pass(420);
        let pages = single.run_pass(&FixedMeasure::uniform(10), &prefs());
        assert!(single.apply_pass(t, pages));
        assert_eq!(single.page_count(), 1);
        assert_eq!(single.page_progress(), 0.0);
    }

    #[test]
    fn go_to_is_idempotent_and_clamped() {
        let mut engine = ReaderEngine::new();
        engine.set_content(blocks(5));
        let t = engine.begin_pass(420);
        let pages = engine.run_pass(&FixedMeasure::uniform(300), &prefs());
        assert!(engine.apply_pass(t, pages));

        engine.go_to(2);
        engine.go_to(2);
        assert_eq!(engine.current_page(), 2);
        engine.go_to(usize::MAX);
        assert_eq!(engine.current_page(), engine.page_count() - 1);
        engine.prev_page();
        engine.prev_page();
        engine.prev_page();
        engine.prev_page();
        assert_eq!(engine.current_page(), 0);
        engine.prev_page();
        assert_eq!(engine.current_page(), 0);
    }

    #[test]
    fn scroll_progress_clamps_and_guards_zero_range() {
        let mut engine = ReaderEngine::new();
        engine.set_scroll(0, 0);
        assert_eq!(engine.scroll_progress(), 0.0);
        engine.set_scroll(50, 200);
        assert_eq!(engine.scroll_progress(), 25.0);
        engine.set_scroll(500, 200);
        assert_eq!(engine.scroll_progress(), 100.0);
    }

    #[test]
    fn resize_burst_coalesces_into_one_due_signal() {
        let mut engine = ReaderEngine::new();
        assert!(!engine.resize_due());

        engine.note_resize();
        engine.note_resize();
        assert!(!engine.resize_due(), "still inside the quiet period");

        std::thread::sleep(RESIZE_DEBOUNCE + Duration::from_millis(20));
        assert!(engine.resize_due(), "quiet period elapsed");
        assert!(!engine.resize_due(), "marker consumed by the first check");
    }

    #[test]
    fn min_page_height_floor_applies() {
        let mut engine = ReaderEngine::new();
        engine.set_content(blocks(3));
        engine.begin_pass(10);
        assert_eq!(engine.target_height(), MIN_PAGE_HEIGHT);
    }
}
