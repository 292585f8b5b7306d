use crate::app::App;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
    style::{Modifier, Style},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};

pub fn render(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(f.area());

    let heading = if app.showing_mine {
        " My Stories "
    } else {
        " The Novel Way - Stories "
    };
    let who = match &app.username {
        Some(name) => format!(" {} ", name),
        None => " anonymous ".to_string(),
    };
    let title = Paragraph::new(format!("{}|{}", heading, who))
        .block(Block::default().borders(Borders::ALL))
        .style(
            Style::default()
                .fg(app.theme.accent())
                .add_modifier(Modifier::BOLD),
        );
    f.render_widget(title, chunks[0]);

    let items: Vec<ListItem> = app
        .stories
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let tags = if s.tags.is_empty() {
                String::new()
            } else {
                format!(
                    "  [{}]",
                    s.tags
                        .iter()
                        .map(|t| t.name.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            };
            let style = if i == app.selected_story_index {
                Style::default()
                    .fg(app.theme.accent())
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(format!(
                "{} - by {} ({}){}",
                s.title,
                s.author_name(),
                s.status,
                tags
            ))
            .style(style)
        })
        .collect();

    let block_title = if app.showing_mine {
        " Your stories "
    } else {
        " Browse "
    };
    let list = List::new(items)
        .block(Block::default().title(block_title).borders(Borders::ALL))
        .highlight_symbol(">> ");
    f.render_widget(list, chunks[1]);

    let hints = if app.showing_mine {
        " [Enter] Open | [n] New Story | [x] Delete | [b] Browse All | [q] Quit "
    } else {
        " [Enter] Open | [j/k] Navigate | [m] My Stories | [n] New | [L] Login | [q] Quit "
    };
    super::status_line(f, app, chunks[2], hints);
}
