use crate::app::App;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    widgets::{Block, Borders, Paragraph, Wrap},
};

pub fn render_story_form(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(5),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(f.area());

    let header = Paragraph::new(" New Story ")
        .block(Block::default().borders(Borders::ALL))
        .style(
            Style::default()
                .fg(app.theme.accent())
                .add_modifier(Modifier::BOLD),
        );
    f.render_widget(header, chunks[0]);

    let draft = &app.story_draft;
    field(f, chunks[1], "Title", &draft.title, draft.field == 0);
    field(f, chunks[2], "Summary", &draft.summary, draft.field == 1);
    field(f, chunks[3], "Tags (comma-separated)", &draft.tags, draft.field == 2);
    let status = if draft.completed { "COMPLETED" } else { "ONGOING" };
    field(f, chunks[4], "Status ([Space] toggles)", status, draft.field == 3);

    super::status_line(
        f,
        app,
        chunks[5],
        " [Tab] Next field | [Enter] Create | [Esc] Cancel ",
    );
}

pub fn render_chapter_form(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(5),
                Constraint::Length(3),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(f.area());

    let story_title = app
        .current_story
        .as_ref()
        .map(|s| s.title.as_str())
        .unwrap_or("?");
    let header = Paragraph::new(format!(" New Chapter - {} ", story_title))
        .block(Block::default().borders(Borders::ALL))
        .style(
            Style::default()
                .fg(app.theme.accent())
                .add_modifier(Modifier::BOLD),
        );
    f.render_widget(header, chunks[0]);

    let draft = &app.chapter_draft;
    field(f, chunks[1], "Title", &draft.title, draft.field == 0);
    field(f, chunks[2], "Content", &draft.content, draft.field == 1);
    field(
        f,
        chunks[3],
        "Position",
        &draft.position.to_string(),
        draft.field == 2,
    );

    super::status_line(
        f,
        app,
        chunks[4],
        " [Tab] Next field | [Enter] Save | [Esc] Cancel ",
    );
}

fn field(f: &mut Frame, area: Rect, label: &str, value: &str, active: bool) {
    let style = if active {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    let title = if active {
        format!(" {} < ", label)
    } else {
        format!(" {} ", label)
    };
    let widget = Paragraph::new(value.to_string())
        .block(Block::default().title(title).borders(Borders::ALL))
        .style(style)
        .wrap(Wrap { trim: false });
    f.render_widget(widget, area);
}
