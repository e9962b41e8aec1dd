mod api;
mod app;
mod cache;
mod commands;
mod config;
mod context;
mod event;
mod form;
mod kiosk;
mod logging;
mod notify;
mod query;
mod summary;
#[cfg(test)]
mod testing;
mod ui;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "restodesk")]
#[command(about = "A terminal console for restaurant back office and kiosk ordering")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/restodesk/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Store to work in; overrides `store_id` from the config
  #[arg(short, long)]
  store: Option<u64>,

  /// Screen to open first, any `:` command (e.g. kiosk, kitchen)
  #[arg(short, long, default_value = "products")]
  view: String,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = logging::init()?;

  // Load configuration
  let mut config = config::Config::load(args.config.as_deref())?;
  if let Some(store) = args.store {
    config.store_id = Some(store);
  }

  let events = app::App::events();
  let notifier = event::Notifier::new(events.sender());
  let mut app = app::App::new(config, notifier, &args.view)?;
  app.run(events).await?;

  Ok(())
}
