use crate::ui::view::ShortcutInfo;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the header bar with logo, backend, store and shortcuts
pub fn draw_header(
  frame: &mut Frame,
  area: Rect,
  title: &str,
  store_id: Option<u64>,
  shortcuts: &[ShortcutInfo],
) {
  let mut spans = vec![
    Span::styled(" restodesk ", Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(format!(" {} ", title), Style::default().fg(Color::White)),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(
      format!(" {} ", store_label(store_id)),
      Style::default().fg(Color::Yellow).bold(),
    ),
    Span::raw("  "),
  ];

  // Keys highlighted, descriptions dimmed
  for (i, shortcut) in shortcuts.iter().enumerate() {
    if i > 0 {
      spans.push(Span::raw("   "));
    }
    spans.push(Span::styled(
      format!("<{}>", shortcut.key),
      Style::default().fg(Color::Cyan),
    ));
    spans.push(Span::styled(
      format!(" {}", shortcut.label),
      Style::default().fg(Color::DarkGray),
    ));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}

fn store_label(store_id: Option<u64>) -> String {
  match store_id {
    Some(id) => format!("store #{}", id),
    None => "all stores".to_string(),
  }
}
