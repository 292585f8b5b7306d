use crate::api::auth::Session;
use crate::api::{ApiClient, ApiError, HttpTransport};
use crate::config::AppConfig;
use crate::content;
use crate::models::{Chapter, Comment, NewChapter, NewStory, Story};
use crate::reader::ReaderEngine;
use crate::reader::measure::TerminalMeasure;
use crate::reader::prefs::{ReadMode, ReaderPrefs};
use crate::store::{FileStore, KEY_DARK, KEY_THEME, KvStore};
use anyhow::Result;
use ratatui::style::Color;
use std::sync::Arc;

#[derive(PartialEq, Clone, Copy)]
pub enum AppView {
    Stories,
    MyStories,
    Story,
    Reader,
    CommentCompose,
    Login,
    Register,
    StoryForm,
    ChapterForm,
    Help,
}

#[derive(Clone, Copy, PartialEq)]
pub enum Theme {
    Default,
    Gruvbox,
    Nord,
    Sepia,
}

impl Theme {
    pub fn from_name(name: &str) -> Self {
        match name {
            "Gruvbox" => Theme::Gruvbox,
            "Nord" => Theme::Nord,
            "Sepia" => Theme::Sepia,
            _ => Theme::Default,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Theme::Default => "Default",
            Theme::Gruvbox => "Gruvbox",
            Theme::Nord => "Nord",
            Theme::Sepia => "Sepia",
        }
    }

    pub fn accent(self) -> Color {
        match self {
            Theme::Default => Color::Cyan,
            Theme::Gruvbox => Color::Yellow,
            Theme::Nord => Color::LightBlue,
            Theme::Sepia => Color::LightRed,
        }
    }
}

#[derive(Default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub field: usize,
}

#[derive(Default)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub field: usize,
}

#[derive(Default)]
pub struct StoryDraft {
    pub title: String,
    pub summary: String,
    pub completed: bool,
    pub tags: String,
    pub field: usize,
}

pub struct ChapterDraft {
    pub title: String,
    pub content: String,
    pub position: i64,
    pub field: usize,
}

impl Default for ChapterDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            content: String::new(),
            position: 1,
            field: 0,
        }
    }
}

pub struct OpenChapter {
    pub story_id: i64,
    pub chapter: Chapter,
}

pub struct App {
    pub view: AppView,
    pub previous_view: Option<AppView>,
    pub config: AppConfig,
    pub store: Arc<dyn KvStore>,
    pub api: ApiClient<HttpTransport>,
    pub theme: Theme,
    pub dark: bool,
    pub username: Option<String>,
    pub status: Option<String>,
    pub should_quit: bool,

    // Story browsing
    pub stories: Vec<Story>,
    pub selected_story_index: usize,
    pub showing_mine: bool,

    // Story detail
    pub current_story: Option<Story>,
    pub chapters: Vec<Chapter>,
    pub selected_chapter_index: usize,

    // Reader
    pub reading: Option<OpenChapter>,
    pub prefs: ReaderPrefs,
    pub engine: ReaderEngine,
    pub scroll_top: usize,
    pub reader_lines: Vec<String>,
    pub needs_paginate: bool,

    // Comments
    pub comments: Vec<Comment>,
    pub comment_draft: String,

    // Forms
    pub login_form: LoginForm,
    pub register_form: RegisterForm,
    pub story_draft: StoryDraft,
    pub chapter_draft: ChapterDraft,
}

impl App {
    pub fn new(config: AppConfig) -> Result<Self> {
        let store: Arc<dyn KvStore> = Arc::new(FileStore::open(FileStore::default_path()));
        let session = Session::new(store.clone());
        let api = ApiClient::new(config.base_url(), HttpTransport::new(), session);
        let prefs = ReaderPrefs::load(store.as_ref());
        let theme = store
            .get(KEY_THEME)
            .map(|n| Theme::from_name(&n))
            .unwrap_or_else(|| Theme::from_name(&config.theme));
        let dark = store
            .get(KEY_DARK)
            .map(|v| v == "1" || v == "true")
            .unwrap_or(config.dark);

        Ok(Self {
            view: AppView::Stories,
            previous_view: None,
            config,
            store,
            api,
            theme,
            dark,
            username: None,
            status: None,
            should_quit: false,
            stories: Vec::new(),
            selected_story_index: 0,
            showing_mine: false,
            current_story: None,
            chapters: Vec::new(),
            selected_chapter_index: 0,
            reading: None,
            prefs,
            engine: ReaderEngine::new(),
            scroll_top: 0,
            reader_lines: Vec::new(),
            needs_paginate: false,
            comments: Vec::new(),
            comment_draft: String::new(),
            login_form: LoginForm::default(),
            register_form: RegisterForm::default(),
            story_draft: StoryDraft::default(),
            chapter_draft: ChapterDraft::default(),
        })
    }

    pub fn is_logged_in(&self) -> bool {
        self.api.session().is_logged_in()
    }

    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status = Some(msg.into());
    }

    fn report(&mut self, err: &ApiError) {
        self.status = Some(err.user_message());
    }

    /// Startup: resolve who we are (when logged in) and fetch the front
    /// page of stories.
    pub async fn init(&mut self) {
        if self.is_logged_in() {
            self.username = self.api.whoami().await;
        }
        self.load_stories().await;
    }

    // ---- story browsing ----

    pub async fn load_stories(&mut self) {
        self.showing_mine = false;
        match self.api.stories().await {
            Ok(stories) => {
                self.stories = stories;
                self.selected_story_index = 0;
            }
            Err(e) => self.report(&e),
        }
        self.view = AppView::Stories;
    }

    pub async fn load_my_stories(&mut self) {
        self.showing_mine = true;
        match self.api.my_stories().await {
            Ok(stories) => {
                self.stories = stories;
                self.selected_story_index = 0;
                self.view = AppView::MyStories;
            }
            Err(ApiError::Unauthorized) => {
                self.set_status("Please sign in to view your stories.");
                self.view = AppView::Login;
            }
            Err(e) => self.report(&e),
        }
    }

    pub fn select_next_story(&mut self) {
        if !self.stories.is_empty() {
            self.selected_story_index = (self.selected_story_index + 1) % self.stories.len();
        }
    }

    pub fn select_prev_story(&mut self) {
        if !self.stories.is_empty() {
            if self.selected_story_index > 0 {
                self.selected_story_index -= 1;
            } else {
                self.selected_story_index = self.stories.len() - 1;
            }
        }
    }

    pub async fn open_selected_story(&mut self) {
        let Some(listed) = self.stories.get(self.selected_story_index) else {
            return;
        };
        let id = listed.id;
        // List payloads can be thin; fetch the full record for the detail
        // view, falling back to what we already have.
        let story = match self.api.story(id).await {
            Ok(full) => full,
            Err(_) => listed.clone(),
        };
        match self.api.chapters(id).await {
            Ok(chapters) => {
                self.chapters = chapters;
                self.selected_chapter_index = 0;
                self.current_story = Some(story);
                self.view = AppView::Story;
            }
            Err(e) => self.report(&e),
        }
    }

    /// Flip the open story between ONGOING and COMPLETED. The server
    /// rejects this with a 403 for anyone but the author.
    pub async fn toggle_story_status(&mut self) {
        let Some(story) = &self.current_story else {
            return;
        };
        let next = if story.status == "COMPLETED" {
            "ONGOING"
        } else {
            "COMPLETED"
        };
        match self
            .api
            .update_story(story.id, serde_json::json!({ "status": next }))
            .await
        {
            Ok(updated) => {
                self.set_status(format!("Marked {}.", updated.status.to_lowercase()));
                self.current_story = Some(updated);
            }
            Err(e) => self.report(&e),
        }
    }

    pub async fn delete_selected_story(&mut self) {
        let Some(story) = self.stories.get(self.selected_story_index) else {
            return;
        };
        let id = story.id;
        match self.api.delete_story(id).await {
            Ok(()) => {
                self.stories.retain(|s| s.id != id);
                if self.selected_story_index >= self.stories.len() && !self.stories.is_empty() {
                    self.selected_story_index = self.stories.len() - 1;
                }
                self.set_status("Story deleted.");
            }
            Err(e) => self.report(&e),
        }
    }

    pub fn select_next_chapter(&mut self) {
        if !self.chapters.is_empty() {
            self.selected_chapter_index = (self.selected_chapter_index + 1) % self.chapters.len();
        }
    }

    pub fn select_prev_chapter(&mut self) {
        if !self.chapters.is_empty() {
            if self.selected_chapter_index > 0 {
                self.selected_chapter_index -= 1;
            } else {
                self.selected_chapter_index = self.chapters.len() - 1;
            }
        }
    }

    // ---- reader ----

    pub async fn open_selected_chapter(&mut self) {
        let Some(story) = &self.current_story else {
            return;
        };
        let story_id = story.id;
        let Some(listed) = self.chapters.get(self.selected_chapter_index) else {
            return;
        };
        let chapter_id = listed.id;
        match self.api.chapter(story_id, chapter_id).await {
            Ok(chapter) => {
                self.install_chapter(story_id, chapter);
                self.refresh_comments().await;
                self.view = AppView::Reader;
            }
            Err(e) => self.report(&e),
        }
    }

    fn install_chapter(&mut self, story_id: i64, chapter: Chapter) {
        let html = content::normalize_chapter(&chapter);
        let blocks = content::split_blocks(&html);
        self.engine.set_content(blocks);
        self.scroll_top = 0;
        self.needs_paginate = self.prefs.mode == ReadMode::Pages;
        self.reading = Some(OpenChapter { story_id, chapter });
        self.rebuild_reader_lines();
    }

    /// Flatten the chapter's blocks into display lines for scroll mode at
    /// the current typography's column width.
    pub fn rebuild_reader_lines(&mut self) {
        let columns = self.prefs.text_columns();
        let mut lines = Vec::new();
        for block in self.engine.blocks() {
            match html2text::from_read(block.html.as_bytes(), columns) {
                Ok(text) => lines.extend(text.lines().map(str::to_string)),
                Err(_) => lines.extend(block.text.lines().map(str::to_string)),
            }
            lines.push(String::new());
        }
        if lines.last().is_some_and(String::is_empty) {
            lines.pop();
        }
        self.reader_lines = lines;
    }

    /// Run one pagination pass sized to the given viewport height (px).
    pub fn repaginate(&mut self, viewport_px: u32) {
        let token = self.engine.begin_pass(viewport_px);
        let pages = self.engine.run_pass(&TerminalMeasure, &self.prefs);
        self.engine.apply_pass(token, pages);
        self.needs_paginate = false;
    }

    /// Viewport height in px for a reader area of `rows` terminal rows.
    pub fn viewport_px(&self, rows: u16) -> u32 {
        rows as u32 * self.prefs.line_px()
    }

    /// Mutate preferences, persist them, and invalidate derived state.
    pub fn update_prefs(&mut self, f: impl FnOnce(&mut ReaderPrefs)) {
        f(&mut self.prefs);
        self.prefs.save(self.store.as_ref());
        self.rebuild_reader_lines();
        if self.prefs.mode == ReadMode::Pages {
            self.needs_paginate = true;
        }
    }

    pub fn scroll_down(&mut self, viewport_rows: usize) {
        let range = self.reader_lines.len().saturating_sub(viewport_rows);
        if self.scroll_top < range {
            self.scroll_top += 1;
        }
        self.sync_scroll_progress(viewport_rows);
    }

    pub fn scroll_up(&mut self, viewport_rows: usize) {
        self.scroll_top = self.scroll_top.saturating_sub(1);
        self.sync_scroll_progress(viewport_rows);
    }

    pub fn sync_scroll_progress(&mut self, viewport_rows: usize) {
        let range = self.reader_lines.len().saturating_sub(viewport_rows);
        self.scroll_top = self.scroll_top.min(range);
        self.engine.set_scroll(self.scroll_top as u32, range as u32);
    }

    pub fn progress(&self) -> f32 {
        match self.prefs.mode {
            ReadMode::Scroll => self.engine.scroll_progress(),
            ReadMode::Pages => self.engine.page_progress(),
        }
    }

    pub fn close_reader(&mut self) {
        self.engine.teardown();
        self.reading = None;
        self.reader_lines.clear();
        self.comments.clear();
        self.view = AppView::Story;
    }

    /// Move to an adjacent chapter of the open story, keeping the list
    /// selection in sync.
    pub async fn step_chapter(&mut self, delta: i64) {
        let Some(open) = &self.reading else { return };
        let story_id = open.story_id;
        let Some(pos) = self.chapters.iter().position(|c| c.id == open.chapter.id) else {
            return;
        };
        let next = pos as i64 + delta;
        if next < 0 || next as usize >= self.chapters.len() {
            return;
        }
        let chapter_id = self.chapters[next as usize].id;
        match self.api.chapter(story_id, chapter_id).await {
            Ok(chapter) => {
                self.selected_chapter_index = next as usize;
                self.install_chapter(story_id, chapter);
                self.refresh_comments().await;
            }
            Err(e) => self.report(&e),
        }
    }

    // ---- comments ----

    pub async fn refresh_comments(&mut self) {
        let Some(open) = &self.reading else { return };
        match self.api.comments(open.story_id, open.chapter.id).await {
            Ok(comments) => self.comments = comments,
            Err(e) => {
                log::warn!("failed to load comments: {}", e);
                self.comments.clear();
            }
        }
    }

    pub async fn post_comment(&mut self) {
        if !self.is_logged_in() {
            self.set_status("Please log in to comment.");
            return;
        }
        let Some(open) = &self.reading else { return };
        let (story_id, chapter_id) = (open.story_id, open.chapter.id);
        let draft = self.comment_draft.trim().to_string();
        if draft.is_empty() {
            return;
        }
        match self.api.create_comment(story_id, chapter_id, &draft).await {
            Ok(comment) => {
                self.comments.insert(0, comment);
                self.comment_draft.clear();
                self.view = AppView::Reader;
            }
            // Draft stays intact so the user can retry.
            Err(e) => self.report(&e),
        }
    }

    // ---- auth flows ----

    pub async fn submit_login(&mut self) {
        let (username, password) = (
            self.login_form.username.clone(),
            self.login_form.password.clone(),
        );
        match self.api.login(&username, &password).await {
            Ok(()) => {
                self.username = self.api.whoami().await.or(Some(username));
                self.login_form = LoginForm::default();
                self.set_status("Logged in.");
                self.load_stories().await;
            }
            Err(ApiError::Unauthorized | ApiError::Validation(_)) => {
                self.set_status("Invalid username or password.");
            }
            Err(e) => self.report(&e),
        }
    }

    pub async fn submit_register(&mut self) {
        let form = &self.register_form;
        let (username, email, password) = (
            form.username.clone(),
            form.email.clone(),
            form.password.clone(),
        );
        match self.api.register(&username, &email, &password).await {
            Ok(()) => {
                self.register_form = RegisterForm::default();
                if self.is_logged_in() {
                    self.username = self.api.whoami().await.or(Some(username));
                    self.set_status("Welcome!");
                    self.load_my_stories().await;
                } else {
                    self.set_status("Account created. Please log in.");
                    self.view = AppView::Login;
                }
            }
            Err(e) => self.report(&e),
        }
    }

    pub fn logout(&mut self) {
        self.api.logout();
        self.username = None;
        self.set_status("Logged out.");
        self.view = AppView::Login;
    }

    // ---- authoring ----

    pub async fn submit_story_draft(&mut self) {
        if self.story_draft.title.trim().is_empty() {
            self.set_status("title: This field is required.");
            return;
        }
        let names: Vec<String> = self
            .story_draft
            .tags
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let status = if self.story_draft.completed {
            "COMPLETED"
        } else {
            "ONGOING"
        };
        let tag_ids = match self.api.ensure_tag_ids(&names).await {
            Ok(ids) => ids,
            Err(e) => {
                self.report(&e);
                return;
            }
        };
        let new_story = NewStory {
            title: self.story_draft.title.trim().to_string(),
            summary: self.story_draft.summary.clone(),
            status: status.to_string(),
            tag_ids,
        };
        match self.api.create_story(&new_story).await {
            Ok(story) => {
                self.story_draft = StoryDraft::default();
                self.set_status(format!("Created \"{}\".", story.title));
                self.load_my_stories().await;
            }
            Err(e) => self.report(&e),
        }
    }

    pub fn open_chapter_form(&mut self) {
        self.chapter_draft = ChapterDraft {
            position: self.chapters.len() as i64 + 1,
            ..ChapterDraft::default()
        };
        self.view = AppView::ChapterForm;
    }

    pub async fn submit_chapter_draft(&mut self) {
        let Some(story) = &self.current_story else {
            return;
        };
        let story_id = story.id;
        if self.chapter_draft.title.trim().is_empty() {
            self.set_status("title: This field is required.");
            return;
        }
        let new_chapter = NewChapter {
            story: story_id,
            title: self.chapter_draft.title.trim().to_string(),
            content: self.chapter_draft.content.clone(),
            position: self.chapter_draft.position,
        };
        match self.api.create_chapter(&new_chapter).await {
            Ok(_) => {
                self.chapter_draft = ChapterDraft::default();
                match self.api.chapters(story_id).await {
                    Ok(chapters) => self.chapters = chapters,
                    Err(e) => log::warn!("failed to reload chapters: {}", e),
                }
                self.set_status("Chapter added.");
                self.view = AppView::Story;
            }
            Err(e) => self.report(&e),
        }
    }

    // ---- theme ----

    pub fn toggle_theme(&mut self) {
        self.theme = match self.theme {
            Theme::Default => Theme::Gruvbox,
            Theme::Gruvbox => Theme::Nord,
            Theme::Nord => Theme::Sepia,
            Theme::Sepia => Theme::Default,
        };
        self.store.set(KEY_THEME, self.theme.name());
        self.config.theme = self.theme.name().to_string();
        self.persist_config();
    }

    pub fn toggle_dark(&mut self) {
        self.dark = !self.dark;
        self.store.set(KEY_DARK, if self.dark { "1" } else { "0" });
        self.config.dark = self.dark;
        self.persist_config();
    }

    fn persist_config(&self) {
        if let Err(e) = self.config.save() {
            log::warn!("failed to save config: {}", e);
        }
    }
}
