use crate::app::{App, AppView};
use crate::reader::ReaderState;
use crate::reader::prefs::ReadMode;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
};

/// Rows available for chapter text given the frame height. Kept in sync
/// with the layout below; the key handlers use it for scrolling and for
/// sizing pagination passes.
pub fn content_rows(frame_height: u16) -> u16 {
    frame_height.saturating_sub(13).max(3)
}

pub fn render(f: &mut Frame, app: &mut App) {
    let Some(open) = &app.reading else {
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(8),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(f.area());

    // Header: title plus the current typography settings.
    let mode = match app.prefs.mode {
        ReadMode::Scroll => "Vertical".to_string(),
        ReadMode::Pages => format!(
            "Pages {}/{}",
            (app.engine.current_page() + 1).min(app.engine.page_count().max(1)),
            app.engine.page_count().max(1)
        ),
    };
    let header = Paragraph::new(format!(
        " {} | {} | {} {}px x{:.2} w{} ",
        open.chapter.title,
        mode,
        app.prefs.font.label(),
        app.prefs.size,
        app.prefs.line_height,
        app.prefs.width,
    ))
    .block(Block::default().borders(Borders::ALL))
    .style(
        Style::default()
            .fg(app.theme.accent())
            .add_modifier(Modifier::BOLD),
    );
    f.render_widget(header, chunks[0]);

    // Progress bar: scroll percent or page progress.
    let progress = app.progress().clamp(0.0, 100.0);
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(app.theme.accent()).bg(Color::DarkGray))
        .ratio(f64::from(progress) / 100.0)
        .label(format!("{:.0}%", progress));
    f.render_widget(gauge, chunks[1]);

    // Chapter text.
    match app.prefs.mode {
        ReadMode::Scroll if app.prefs.effective_columns() == 2 => {
            // Side-by-side columns showing consecutive line ranges.
            let halves = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
                .split(chunks[2]);
            let rows = chunks[2].height as usize;
            for (i, half) in halves.iter().enumerate() {
                let text = app
                    .reader_lines
                    .iter()
                    .skip(app.scroll_top + i * rows)
                    .take(rows)
                    .cloned()
                    .collect::<Vec<_>>()
                    .join("\n");
                let col = Paragraph::new(text).wrap(Wrap { trim: false });
                f.render_widget(col, *half);
            }
        }
        ReadMode::Scroll => {
            let text = app
                .reader_lines
                .iter()
                .skip(app.scroll_top)
                .take(chunks[2].height as usize)
                .cloned()
                .collect::<Vec<_>>()
                .join("\n");
            let content = Paragraph::new(text).wrap(Wrap { trim: false });
            f.render_widget(content, chunks[2]);
        }
        ReadMode::Pages => {
            let body = match app.engine.pages().get(app.engine.current_page()) {
                Some(page) => {
                    let columns = app.prefs.text_columns();
                    html2text::from_read(page.html().as_bytes(), columns)
                        .unwrap_or_else(|_| page.html())
                }
                None if app.engine.state() == ReaderState::Paginating => {
                    "Laying out pages...".to_string()
                }
                None => String::new(),
            };
            let content = Paragraph::new(body).wrap(Wrap { trim: false });
            f.render_widget(content, chunks[2]);
        }
    }

    // Comments pane, or the compose box while writing one.
    if app.view == AppView::CommentCompose {
        let compose = Paragraph::new(app.comment_draft.as_str())
            .block(
                Block::default()
                    .title(" Your comment ([Enter] post, [Esc] cancel) ")
                    .borders(Borders::ALL),
            )
            .wrap(Wrap { trim: false });
        f.render_widget(compose, chunks[3]);
    } else {
        let text = if app.comments.is_empty() {
            "Be the first to comment.".to_string()
        } else {
            app.comments
                .iter()
                .take(3)
                .map(|c| {
                    format!(
                        "{} {}\n  {}",
                        c.display_name(),
                        c.display_time(),
                        c.content.replace('\n', " ")
                    )
                })
                .collect::<Vec<_>>()
                .join("\n")
        };
        let comments = Paragraph::new(text)
            .block(
                Block::default()
                    .title(format!(" Comments ({}) ", app.comments.len()))
                    .borders(Borders::ALL),
            )
            .wrap(Wrap { trim: false });
        f.render_widget(comments, chunks[3]);
    }

    super::status_line(
        f,
        app,
        chunks[4],
        " [m] Mode | [f] Font | [+/-] Size | [(/)] Line | [[/]] Width | [J] Justify | [2] Cols | [c] Comment | [n/p] Chapter | [q] Back ",
    );
}
