use crate::commands;
use crate::config::Config;
use crate::context::AppContext;
use crate::event::{Event, EventHandler, Notifier};
use crate::notify::{Notification, Toast};
use crate::ui::components::{CommandEvent, CommandInput, KeyResult};
use crate::ui::view::{Shortcut, View, ViewAction};
use crate::ui::{self, root_view};
use color_eyre::{eyre::eyre, Result};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::{Duration, Instant};
use tracing::{debug, info};

const TICK_RATE: Duration = Duration::from_millis(250);
const GC_INTERVAL: Duration = Duration::from_secs(30);

/// Main application state
pub struct App {
  /// Navigation stack - root is always at index 0
  view_stack: Vec<Box<dyn View>>,

  /// `:` palette, owned here so every view gets it
  command_input: CommandInput,

  ctx: AppContext,

  /// Latest notification, until it expires
  toast: Option<Toast>,

  should_quit: bool,
  last_gc: Instant,
}

impl App {
  /// Build the app with `initial` (a command name or alias) as the root view.
  pub fn new(config: Config, notifier: Notifier, initial: &str) -> Result<Self> {
    let ctx = AppContext::new(config, notifier)?;
    let name = commands::resolve(initial).ok_or_else(|| eyre!("Unknown view: {}", initial))?;
    let root = root_view(name, &ctx).ok_or_else(|| eyre!("Not a view: {}", name))?;
    info!(view = name, store_id = ?ctx.scope.store_id, "starting");

    Ok(Self {
      view_stack: vec![root],
      command_input: CommandInput::new(),
      ctx,
      toast: None,
      should_quit: false,
      last_gc: Instant::now(),
    })
  }

  /// Event channel for the app; the notifier passed to `new` must post into it.
  pub fn events() -> EventHandler {
    EventHandler::new(TICK_RATE)
  }

  pub async fn run(&mut self, mut events: EventHandler) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;

    let result = self.main_loop(&mut events).await;

    // Cleanup terminal, even when the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    result
  }

  async fn main_loop(&mut self, events: &mut EventHandler) -> Result<()> {
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match events.next().await {
        Some(event) => self.handle_event(event),
        None => break,
      }
    }
    Ok(())
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => self.on_tick(),
      Event::Notify(notification) => self.show(notification),
    }
  }

  fn show(&mut self, notification: Notification) {
    debug!(level = ?notification.level, message = %notification.message, "notification");
    self.toast = Some(Toast::new(notification));
  }

  fn on_tick(&mut self) {
    if self.toast.as_ref().is_some_and(Toast::is_expired) {
      self.toast = None;
    }

    // Views below the top keep polling so their data is fresh on return
    for view in &mut self.view_stack {
      view.tick();
    }

    if self.last_gc.elapsed() >= GC_INTERVAL {
      let dropped = self.ctx.cache.gc();
      if dropped > 0 {
        debug!(dropped, "cache gc");
      }
      self.last_gc = Instant::now();
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    let captured = self
      .view_stack
      .last()
      .is_some_and(|view| view.captures_input());
    if !captured {
      match self.command_input.handle_key(key) {
        KeyResult::Event(CommandEvent::Submitted(name)) => {
          self.execute_command(&name);
          return;
        }
        KeyResult::Event(CommandEvent::Cancelled) | KeyResult::Handled => return,
        KeyResult::NotHandled => {}
      }
    }

    let Some(view) = self.view_stack.last_mut() else {
      return;
    };
    match view.handle_key(key) {
      ViewAction::None => {}
      ViewAction::Push(next) => self.view_stack.push(next),
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        } else {
          self.should_quit = true;
        }
      }
    }
  }

  fn execute_command(&mut self, name: &str) {
    if name == "quit" {
      self.should_quit = true;
      return;
    }
    match root_view(name, &self.ctx) {
      Some(view) => {
        info!(view = name, "switching view");
        self.view_stack = vec![view];
      }
      None if name.is_empty() => {}
      None => self.show(Notification::warning(format!("Unknown command: {}", name))),
    }
  }

  // Accessors for UI rendering

  pub fn current_view_mut(&mut self) -> Option<&mut Box<dyn View>> {
    self.view_stack.last_mut()
  }

  pub fn command_input(&self) -> &CommandInput {
    &self.command_input
  }

  pub fn title(&self) -> String {
    self.ctx.config.display_title()
  }

  pub fn store_id(&self) -> Option<u64> {
    self.ctx.scope.store_id
  }

  pub fn toast(&self) -> Option<&Toast> {
    self.toast.as_ref()
  }

  pub fn breadcrumbs(&self) -> Vec<String> {
    self
      .view_stack
      .iter()
      .map(|v| v.breadcrumb_label())
      .collect()
  }

  pub fn header_shortcuts(&self) -> Vec<Shortcut> {
    if self.command_input.is_active() {
      return vec![
        Shortcut::new("Enter", "run").with_priority(10),
        Shortcut::new("Tab", "next").with_priority(20),
        Shortcut::new("Esc", "cancel").with_priority(30),
      ];
    }
    self
      .view_stack
      .last()
      .map(|v| v.shortcuts())
      .unwrap_or_default()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn app(initial: &str) -> App {
    let (notifier, _rx) = Notifier::channel();
    App::new(Config::default(), notifier, initial).unwrap()
  }

  fn type_command(app: &mut App, command: &str) {
    app.handle_key(key(KeyCode::Char(':')));
    for c in command.chars() {
      app.handle_key(key(KeyCode::Char(c)));
    }
    app.handle_key(key(KeyCode::Enter));
  }

  #[tokio::test]
  async fn test_initial_view_by_alias() {
    let app = app("menu");
    assert_eq!(app.breadcrumbs(), vec!["Menu Items"]);
  }

  #[tokio::test]
  async fn test_unknown_initial_view_fails() {
    let (notifier, _rx) = Notifier::channel();
    assert!(App::new(Config::default(), notifier, "spaceships").is_err());
  }

  #[tokio::test]
  async fn test_command_replaces_stack() {
    let mut app = app("products");
    type_command(&mut app, "kitchen");
    assert_eq!(app.breadcrumbs(), vec!["Kitchen"]);
    assert!(!app.command_input().is_active());
  }

  #[tokio::test]
  async fn test_unknown_command_warns() {
    let mut app = app("products");
    type_command(&mut app, "zzzz");
    assert_eq!(app.breadcrumbs(), vec!["Products"]);
    assert!(app.toast().unwrap().notification.message.starts_with("Unknown command"));
  }

  #[tokio::test]
  async fn test_back_on_root_quits() {
    let mut app = app("products");
    app.handle_key(key(KeyCode::Char('q')));
    assert!(app.should_quit);
  }

  #[tokio::test]
  async fn test_ctrl_c_quits_from_palette() {
    let mut app = app("products");
    app.handle_key(key(KeyCode::Char(':')));
    app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
    assert!(app.should_quit);
  }

  #[tokio::test]
  async fn test_expired_toast_cleared_on_tick() {
    let mut app = app("products");
    app.handle_event(Event::Notify(
      Notification::success("hello").with_ttl(Duration::ZERO),
    ));
    assert!(app.toast().is_some());
    app.handle_event(Event::Tick);
    assert!(app.toast().is_none());
  }
}
