pub mod forms;
pub mod help;
pub mod login;
pub mod reader;
pub mod stories;
pub mod story;

use crate::app::{App, AppView};
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::widgets::Paragraph;

pub fn render(f: &mut Frame, app: &mut App) {
    if !app.dark {
        let bg = ratatui::widgets::Block::default()
            .style(Style::default().bg(Color::White).fg(Color::Black));
        f.render_widget(bg, f.area());
    }
    match app.view {
        AppView::Stories | AppView::MyStories => stories::render(f, app),
        AppView::Story => story::render(f, app),
        AppView::Reader | AppView::CommentCompose => reader::render(f, app),
        AppView::Login => login::render_login(f, app),
        AppView::Register => login::render_register(f, app),
        AppView::StoryForm => forms::render_story_form(f, app),
        AppView::ChapterForm => forms::render_chapter_form(f, app),
        AppView::Help => {
            // Help overlays whatever was on screen before.
            match app.previous_view {
                Some(AppView::Reader) => reader::render(f, app),
                Some(AppView::Story) => story::render(f, app),
                _ => stories::render(f, app),
            }
            help::render(f, app);
        }
    }
}

/// One-line footer: transient status message or the given key hints.
pub fn status_line(f: &mut Frame, app: &App, area: Rect, hints: &str) {
    let text = match &app.status {
        Some(msg) => format!(" {} ", msg),
        None => hints.to_string(),
    };
    let style = if app.status.is_some() {
        Style::default().fg(Color::Magenta)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    f.render_widget(Paragraph::new(text).style(style), area);
}
