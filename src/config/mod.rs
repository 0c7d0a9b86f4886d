//! Server configuration: command-line flags with environment fallbacks.
//!
//! A `.env` file in the working directory is loaded before parsing, so every
//! `GUILD_*` and `SUPABASE_*` variable can live there.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::{TimeDelta, Utc};
use clap::{Args, ValueEnum};

use crate::consts::{DEFAULT_ARCHIVE_AFTER_DAYS, DEFAULT_HOST, DEFAULT_PORT, default_db_path};
use crate::store::GuildStore;
use crate::store::postgrest::PostgrestStore;
use crate::store::sqlite::SqliteStore;

/// Where board rows live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Embedded SQLite file (local development, single host).
    Sqlite,
    /// Supabase / PostgREST over HTTP.
    Postgrest,
}

impl Backend {
    pub fn label(self) -> &'static str {
        match self {
            Backend::Sqlite => "sqlite",
            Backend::Postgrest => "postgrest",
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    /// Address to listen on
    #[arg(long, env = "GUILD_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "GUILD_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Row store backend
    #[arg(long, env = "GUILD_BACKEND", value_enum, default_value_t = Backend::Sqlite)]
    pub backend: Backend,

    /// Days a DONE quest stays on the board before it is archived (sqlite)
    #[arg(long, env = "GUILD_ARCHIVE_AFTER_DAYS", default_value_t = DEFAULT_ARCHIVE_AFTER_DAYS)]
    pub archive_after_days: i64,

    /// Supabase project URL (postgrest backend)
    #[arg(long, env = "SUPABASE_URL")]
    pub supabase_url: Option<String>,

    /// Supabase service role key (postgrest backend)
    #[arg(long, env = "SUPABASE_SERVICE_KEY", hide_env_values = true)]
    pub supabase_service_key: Option<String>,
}

impl ServeArgs {
    pub fn addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .host
            .parse()
            .with_context(|| format!("invalid host address: {}", self.host))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    /// Open the configured backend. `db` is only used by the sqlite backend.
    pub fn open_store(&self, db: &str) -> Result<Arc<dyn GuildStore>> {
        match self.backend {
            Backend::Sqlite => {
                if self.archive_after_days < 0 {
                    bail!("archive retention must not be negative");
                }
                let window = TimeDelta::try_days(self.archive_after_days)
                    .filter(|w| Utc::now().checked_sub_signed(*w).is_some())
                    .with_context(|| {
                        format!(
                            "archive retention of {} days is out of range",
                            self.archive_after_days
                        )
                    })?;
                let store = SqliteStore::open(db)?.with_archive_after(window);
                Ok(Arc::new(store))
            }
            Backend::Postgrest => {
                let url = self
                    .supabase_url
                    .as_deref()
                    .context("SUPABASE_URL is required for the postgrest backend")?;
                let key = self
                    .supabase_service_key
                    .as_deref()
                    .context("SUPABASE_SERVICE_KEY is required for the postgrest backend")?;
                Ok(Arc::new(PostgrestStore::new(url, key)?))
            }
        }
    }
}

/// Resolve the database path, creating the parent directory when needed.
/// `None` means `~/.guildboard/guild.db`; `:memory:` is passed through.
pub fn resolve_db_path(db: Option<&str>) -> Result<String> {
    let path = match db {
        Some(":memory:") => return Ok(":memory:".to_string()),
        Some(path) => PathBuf::from(path),
        None => default_db_path()?,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    Ok(path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        serve: ServeArgs,
    }

    fn parse(args: &[&str]) -> ServeArgs {
        let argv = std::iter::once("guildboard").chain(args.iter().copied());
        Harness::try_parse_from(argv).unwrap().serve
    }

    #[test]
    fn flags_override_defaults() {
        let args = parse(&["--host", "0.0.0.0", "--port", "9000", "--backend", "postgrest"]);
        assert_eq!(args.addr().unwrap().to_string(), "0.0.0.0:9000");
        assert_eq!(args.backend, Backend::Postgrest);
    }

    #[test]
    fn bad_host_is_an_error() {
        let args = parse(&["--host", "guild hall"]);
        assert!(args.addr().is_err());
    }

    #[test]
    fn postgrest_needs_credentials() {
        let mut args = parse(&["--backend", "postgrest"]);
        args.supabase_url = None;
        args.supabase_service_key = None;
        let err = args.open_store(":memory:").err().unwrap();
        assert!(err.to_string().contains("SUPABASE_URL"));
    }

    #[test]
    fn sqlite_rejects_negative_retention() {
        let mut args = parse(&["--backend", "sqlite"]);
        args.archive_after_days = -1;
        assert!(args.open_store(":memory:").is_err());
    }

    #[test]
    fn sqlite_rejects_retention_past_the_calendar() {
        let args = parse(&["--backend", "sqlite", "--archive-after-days", "10000000000"]);
        let err = args.open_store(":memory:").err().unwrap();
        assert!(err.to_string().contains("out of range"));

        let mut args = parse(&["--backend", "sqlite"]);
        args.archive_after_days = i64::MAX;
        assert!(args.open_store(":memory:").is_err());
    }

    #[test]
    fn resolve_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("nested").join("guild.db");
        let resolved = resolve_db_path(Some(db.to_str().unwrap())).unwrap();
        assert!(db.parent().unwrap().is_dir());
        assert_eq!(resolved, db.to_string_lossy());
    }

    #[test]
    fn resolve_passes_memory_through() {
        assert_eq!(resolve_db_path(Some(":memory:")).unwrap(), ":memory:");
    }
}
