use crate::app::App;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    widgets::{Block, Borders, Clear, Paragraph},
};

pub fn render_login(f: &mut Frame, app: &mut App) {
    let area = centered_rect(50, 12, f.area());
    f.render_widget(Clear, area);

    let outer = Block::default()
        .title(" Sign in ")
        .borders(Borders::ALL)
        .style(Style::default().fg(app.theme.accent()));
    f.render_widget(outer, area);

    let inner = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(area);

    field(f, inner[0], "Username", &app.login_form.username, app.login_form.field == 0, false);
    field(f, inner[1], "Password", &app.login_form.password, app.login_form.field == 1, true);

    super::status_line(
        f,
        app,
        inner[2],
        " [Tab] Next field | [Enter] Submit | [F2] Register | [Esc] Back ",
    );
}

pub fn render_register(f: &mut Frame, app: &mut App) {
    let area = centered_rect(50, 15, f.area());
    f.render_widget(Clear, area);

    let outer = Block::default()
        .title(" Create account ")
        .borders(Borders::ALL)
        .style(Style::default().fg(app.theme.accent()));
    f.render_widget(outer, area);

    let inner = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(area);

    let form = &app.register_form;
    field(f, inner[0], "Username", &form.username, form.field == 0, false);
    field(f, inner[1], "Email", &form.email, form.field == 1, false);
    field(f, inner[2], "Password", &form.password, form.field == 2, true);

    super::status_line(
        f,
        app,
        inner[3],
        " [Tab] Next field | [Enter] Submit | [Esc] Back ",
    );
}

fn field(f: &mut Frame, area: Rect, label: &str, value: &str, active: bool, mask: bool) {
    let shown = if mask {
        "*".repeat(value.chars().count())
    } else {
        value.to_string()
    };
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
    let widget = Paragraph::new(shown)
        .block(Block::default().title(title).borders(Borders::ALL))
        .style(style);
    f.render_widget(widget, area);
}

/// Fixed-height popup centered in `r`, `percent_x` wide.
pub fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let v = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Min(0),
                Constraint::Length(height),
                Constraint::Min(0),
            ]
            .as_ref(),
        )
        .split(r);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage((100 - percent_x) / 2),
                Constraint::Percentage(percent_x),
                Constraint::Percentage((100 - percent_x) / 2),
            ]
            .as_ref(),
        )
        .split(v[1])[1]
}
