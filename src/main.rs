mod api;
mod app;
mod config;
mod error;
mod store;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "basalt")]
#[command(about = "A command-line console for the Basalt backend platform")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/basalt/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Platform URL, overriding the config file
  #[arg(short, long)]
  url: Option<String>,

  #[command(subcommand)]
  command: app::Command,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  // Logs go to stderr; stdout carries command output only
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_env("BASALT_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info")),
    )
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();

  // Load configuration, with the command-line URL taking precedence
  let config = config::Config::load(args.config.as_deref(), args.url)?;

  // Initialize and run the console
  let app = app::App::new(&config)?;
  app.run(args.command).await?;

  Ok(())
}
