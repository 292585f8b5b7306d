use crate::app::App;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
    style::{Modifier, Style},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};

pub fn render(f: &mut Frame, app: &mut App) {
    let Some(story) = &app.current_story else {
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Length(7),
                Constraint::Min(0),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(f.area());

    let title = Paragraph::new(format!(" {} - by {} ", story.title, story.author_name()))
        .block(Block::default().borders(Borders::ALL))
        .style(
            Style::default()
                .fg(app.theme.accent())
                .add_modifier(Modifier::BOLD),
        );
    f.render_widget(title, chunks[0]);

    let tags = if story.tags.is_empty() {
        "(no tags)".to_string()
    } else {
        story
            .tags
            .iter()
            .map(|t| t.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    };
    let rating = story
        .average_rating
        .map(|r| format!(" | rated {:.1}", r))
        .unwrap_or_default();
    let summary = Paragraph::new(format!(
        "{}\n\nStatus: {}{} | Tags: {}",
        story.summary, story.status, rating, tags
    ))
    .block(Block::default().title(" Summary ").borders(Borders::ALL))
    .wrap(Wrap { trim: false });
    f.render_widget(summary, chunks[1]);

    let items: Vec<ListItem> = app
        .chapters
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let style = if i == app.selected_chapter_index {
                Style::default()
                    .fg(app.theme.accent())
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            let pos = c
                .position
                .map(|p| format!("{:>3}. ", p))
                .unwrap_or_else(|| "     ".to_string());
            ListItem::new(format!("{}{}", pos, c.title)).style(style)
        })
        .collect();
    let list = List::new(items)
        .block(Block::default().title(" Chapters ").borders(Borders::ALL))
        .highlight_symbol(">> ");
    f.render_widget(list, chunks[2]);

    super::status_line(
        f,
        app,
        chunks[3],
        " [Enter] Read | [j/k] Navigate | [a] Add Chapter | [S] Toggle Status | [q] Back ",
    );
}
