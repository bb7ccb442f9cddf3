//! `wallet`: inspect and maintain the local wallet store.
//!
//! # Usage
//!
//! ```
//! wallet connections list
//! wallet notes add EBfd... --title "Met at IIW" --message "Ask about the vLEI"
//! wallet records query ConnectionNote '{"connectionId": "EBfd..."}'
//! wallet prefs set appUserName '"alice"'
//! ```
//!
//! Settings come from `config.toml` (or `--config`) and `WALLET_*`
//! environment variables. Results are printed to stdout as JSON; logs go to
//! stderr.

mod commands;

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use commands::Command;
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use wallet_agent::AgentConfig;
use wallet_store_sqlite::SqliteStore;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "wallet", version, about = "Inspect and maintain the local wallet store")]
struct Args {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

// ─── Config ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
struct CliConfig {
  /// SQLite database file. A leading `~/` is expanded.
  store_path: PathBuf,
  agent:      AgentConfig,
}

impl Default for CliConfig {
  fn default() -> Self {
    Self {
      store_path: PathBuf::from("~/.local/share/wallet/wallet.db"),
      agent:      AgentConfig::default(),
    }
  }
}

fn load_config(path: PathBuf) -> anyhow::Result<CliConfig> {
  let settings = config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(config::Environment::with_prefix("WALLET").separator("__"))
    .build()
    .context("failed to read config file")?;

  let mut cfg: CliConfig = settings
    .try_deserialize()
    .context("failed to deserialise CliConfig")?;
  cfg.store_path = expand_tilde(&cfg.store_path);
  Ok(cfg)
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();
  let cfg = load_config(args.config)?;

  if let Command::Config = args.command {
    return commands::print_json(&cfg);
  }

  if let Some(parent) = cfg.store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {}", parent.display()))?;
  }
  let store = SqliteStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?;

  commands::run(Arc::new(store), args.command).await
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else {
      return;
    };
    assert_eq!(expand_tilde(Path::new("~/w.db")), PathBuf::from(home).join("w.db"));
    assert_eq!(expand_tilde(Path::new("/tmp/w.db")), PathBuf::from("/tmp/w.db"));
  }

  #[test]
  fn missing_config_file_uses_defaults() {
    let cfg = load_config(PathBuf::from("/nonexistent/wallet-config.toml")).unwrap();
    assert_eq!(cfg.agent.oobi_resolve_timeout_ms, 60_000);
    assert_eq!(cfg.agent.default_role, "agent");
  }

  #[test]
  fn subcommands_parse() {
    let args = Args::try_parse_from([
      "wallet",
      "records",
      "query",
      "ConnectionNote",
      r#"{"connectionId": "EA"}"#,
    ])
    .unwrap();
    assert!(matches!(args.command, Command::Records(_)));
    assert!(Args::try_parse_from(["wallet", "records", "query", "Bogus"]).is_err());
  }
}
