mod api;
mod app;
mod commands;
mod config;
mod event;
mod mutation;
mod query;
mod session;
mod store;
mod ui;

use clap::Parser;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "trak")]
#[command(about = "A terminal UI for the Trak issue tracker")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/trak/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Override the API base URL from the config file
  #[arg(long)]
  api_url: Option<String>,
}

/// Route logs to a file; stderr would corrupt the alternate screen.
fn init_tracing() -> Result<tracing_appender::non_blocking::WorkerGuard> {
  let log_dir = dirs::data_dir()
    .ok_or_else(|| eyre!("Could not determine data directory"))?
    .join("trak");
  std::fs::create_dir_all(&log_dir)?;

  let appender = tracing_appender::rolling::never(log_dir, "trak.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(writer)
    .with_ansi(false)
    .init();

  Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let mut config = config::Config::load(args.config.as_deref())?;
  if let Some(api_url) = args.api_url {
    config.api.base_url = api_url;
  }

  let _guard = init_tracing()?;
  info!("Starting trak against {}", config.api.base_url);

  let sessions = session::SessionStore::open()?;

  // Environment token wins; otherwise fall back to the stored session
  let token = config::Config::get_api_token()
    .ok()
    .or_else(|| sessions.load().ok().flatten().map(|s| s.token));

  let api = api::ApiClient::new(&config.api.base_url, token)?;

  match session::check_auth(&api, &sessions).await {
    session::AuthState::Authenticated(user) => {
      info!("Signed in as {}", user.email);
      let mut app = app::App::new(&config, api, sessions, user)?;
      app.run().await?;
      Ok(())
    }
    session::AuthState::Unauthenticated => Err(eyre!(
      "Not signed in. Set TRAK_API_TOKEN (or TRAK_TOKEN) to a valid API token and try again."
    )),
  }
}
