use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

fn key(k: &'static str, pad: usize, what: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(k, Style::default().fg(Color::Magenta)),
        Span::raw(" ".repeat(pad)),
        Span::raw(what),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame) {
    let p = Paragraph::new(vec![
        Line::from("Keybinds:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("q", Style::default().fg(Color::Magenta)),
            Span::raw(" / "),
            Span::styled("Ctrl-C", Style::default().fg(Color::Magenta)),
            Span::raw("  Quit"),
        ]),
        key("r", 11, "Refresh now (ignored while a refresh is running)"),
        key("tab", 9, "Switch tabs"),
        key("?", 11, "Show this help"),
        Line::from(""),
        Line::from("Dashboard:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("↑/↓", Style::default().fg(Color::Magenta)),
            Span::raw(" or "),
            Span::styled("j/k", Style::default().fg(Color::Magenta)),
            Span::raw("  Select run"),
        ]),
        key("y", 11, "Copy the selected run's report URL"),
        Line::from(""),
        Line::from("Status colours:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("COMPLETED", Style::default().fg(Color::Green)),
            Span::raw("  "),
            Span::styled("FAILED", Style::default().fg(Color::Red)),
            Span::raw("  "),
            Span::styled("RUNNING", Style::default().fg(Color::Yellow)),
            Span::raw("  "),
            Span::styled("SCHEDULED", Style::default().fg(Color::Cyan)),
            Span::raw("  "),
            Span::styled("other", Style::default().fg(Color::Magenta)),
        ]),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
