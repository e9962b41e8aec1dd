use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::notify::Notification;

/// Application events
#[derive(Debug)]
pub enum Event {
  /// Terminal key press
  Key(KeyEvent),
  /// Periodic tick for UI refresh and query polling
  Tick,
  /// Message from a background task for the status bar
  Notify(Notification),
}

/// Event handler that produces events from terminal input and a tick timer
pub struct EventHandler {
  tx: mpsc::UnboundedSender<Event>,
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  /// Create a new event handler with the given tick rate
  pub fn new(tick_rate: Duration) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();

    // Spawn terminal event reader
    let reader_tx = tx.clone();
    tokio::task::spawn_blocking(move || loop {
      if event::poll(tick_rate).unwrap_or(false) {
        if let Ok(CrosstermEvent::Key(key)) = event::read() {
          // Windows reports releases too
          if key.kind != KeyEventKind::Press {
            continue;
          }
          if reader_tx.send(Event::Key(key)).is_err() {
            break;
          }
        }
      } else if reader_tx.send(Event::Tick).is_err() {
        break;
      }
    });

    Self { tx, rx }
  }

  /// Sender for tasks that want to post events (notifications)
  pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
    self.tx.clone()
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }
}

/// Posts notifications to the event loop from anywhere.
#[derive(Debug, Clone)]
pub struct Notifier {
  tx: mpsc::UnboundedSender<Event>,
}

impl Notifier {
  pub fn new(tx: mpsc::UnboundedSender<Event>) -> Self {
    Self { tx }
  }

  /// A notifier plus the receiving end, for tests.
  #[cfg(test)]
  pub fn channel() -> (Self, mpsc::UnboundedReceiver<Event>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Self::new(tx), rx)
  }

  pub fn notify(&self, notification: Notification) {
    // The loop is gone only while shutting down
    let _ = self.tx.send(Event::Notify(notification));
  }
}
