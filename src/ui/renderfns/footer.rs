use crate::notify::{Level, Toast};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the footer bar: view breadcrumb on the left, latest toast on the right
pub fn draw_footer(frame: &mut Frame, area: Rect, breadcrumb: &[String], toast: Option<&Toast>) {
  let mut spans = vec![Span::raw(" ")];

  for (i, part) in breadcrumb.iter().enumerate() {
    if i > 0 {
      spans.push(Span::styled(" > ", Style::default().fg(Color::DarkGray)));
    }

    let style = if i == breadcrumb.len() - 1 {
      // Current view
      Style::default().fg(Color::Cyan).bold()
    } else {
      Style::default().fg(Color::White)
    };

    spans.push(Span::styled(part.clone(), style));
  }

  let crumbs = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(crumbs, area);

  if let Some(toast) = toast {
    let text = format!(" {} ", toast.notification.text());
    let style = Style::default()
      .fg(Color::Black)
      .bg(level_color(toast.notification.level));
    let toast_line = Paragraph::new(Line::styled(text, style)).alignment(Alignment::Right);
    frame.render_widget(toast_line, area);
  }
}

fn level_color(level: Level) -> Color {
  match level {
    Level::Success => Color::Green,
    Level::Warning => Color::Yellow,
    Level::Error => Color::Red,
  }
}
