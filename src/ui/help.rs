use crate::app::App;
use ratatui::{
    Frame,
    style::Style,
    widgets::{Block, Borders, Clear, Paragraph},
};

const HELP_TEXT: &str = "\
 Browse
   j/k or arrows   Move selection
   Enter           Open story / chapter
   m               My stories        b   Browse all
   n               New story         x   Delete story (mine)
   L               Log in            R   Log out

 Reader
   j/k             Scroll            h/l Previous / next page
   n/p             Previous / next chapter
   m               Toggle scroll / pages
   f               Cycle font        +/- Font size
   (/)             Line height       [/] Content width
   J               Toggle justify    2   Toggle columns
   c               Write a comment

 Anywhere
   T               Cycle theme       D   Toggle dark mode
   ?               This help         q   Back / quit";

pub fn render(f: &mut Frame, app: &mut App) {
    let area = super::login::centered_rect(70, 26, f.area());
    f.render_widget(Clear, area);
    let widget = Paragraph::new(HELP_TEXT).block(
        Block::default()
            .title(" Keys ([Esc] to close) ")
            .borders(Borders::ALL)
            .style(Style::default().fg(app.theme.accent())),
    );
    f.render_widget(widget, area);
}
