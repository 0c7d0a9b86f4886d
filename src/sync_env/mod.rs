//! Push `.env` values to the GitHub, Vercel and Supabase secret stores.
//!
//! Each store is driven through its own CLI (`gh`, `vercel`, `supabase`).
//! A failing store does not stop the others; the run reports per-store
//! results and fails overall if any store failed.

pub mod services;

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::LazyLock;

use anyhow::{Context, Result, bail};
use clap::{Args, ValueEnum};
use regex::Regex;
use tracing::warn;

use services::CommandRunner;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Service {
    Github,
    Vercel,
    Supabase,
}

impl Service {
    pub const ALL: [Service; 3] = [Service::Github, Service::Vercel, Service::Supabase];

    pub fn as_str(self) -> &'static str {
        match self {
            Service::Github => "github",
            Service::Vercel => "vercel",
            Service::Supabase => "supabase",
        }
    }
}

/// Which GitHub secret namespace to write to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GithubApp {
    Actions,
    Codespaces,
    Dependabot,
}

impl GithubApp {
    pub fn as_str(self) -> &'static str {
        match self {
            GithubApp::Actions => "actions",
            GithubApp::Codespaces => "codespaces",
            GithubApp::Dependabot => "dependabot",
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct SyncEnvArgs {
    /// Source .env file
    #[arg(long, env = "SYNC_ENV_FILE", default_value = ".env.local")]
    pub env_file: PathBuf,

    /// Services to sync (default: all)
    #[arg(long, env = "SYNC_ENV_ONLY", value_enum, value_delimiter = ',')]
    pub only: Vec<Service>,

    /// Only sync these keys
    #[arg(long, env = "SYNC_ENV_KEYS", value_delimiter = ',')]
    pub keys: Vec<String>,

    /// Skip these keys
    #[arg(long, env = "SYNC_ENV_SKIP_KEYS", value_delimiter = ',')]
    pub skip_keys: Vec<String>,

    /// GitHub repository as owner/repo (inferred from origin if omitted)
    #[arg(long, env = "SYNC_ENV_GITHUB_REPO")]
    pub github_repo: Option<String>,

    /// GitHub secret namespace
    #[arg(long, env = "SYNC_ENV_GITHUB_APP", value_enum, default_value_t = GithubApp::Actions)]
    pub github_app: GithubApp,

    /// Vercel environments to write
    #[arg(
        long,
        env = "SYNC_ENV_VERCEL_TARGETS",
        value_delimiter = ',',
        default_value = "production,preview,development"
    )]
    pub vercel_targets: Vec<String>,

    /// Team or user scope passed to the Vercel CLI
    #[arg(long, env = "SYNC_ENV_VERCEL_SCOPE")]
    pub vercel_scope: Option<String>,

    /// Token passed to the Vercel CLI
    #[arg(long, env = "VERCEL_TOKEN", hide_env_values = true)]
    pub vercel_token: Option<String>,

    /// Supabase project ref
    #[arg(long, env = "SYNC_ENV_SUPABASE_PROJECT_REF")]
    pub supabase_project_ref: Option<String>,

    /// Print what would be synced without changing anything
    #[arg(long)]
    pub dry_run: bool,
}

impl SyncEnvArgs {
    /// Selected services, in the fixed github, vercel, supabase order.
    pub fn services(&self) -> Vec<Service> {
        if self.only.is_empty() {
            return Service::ALL.to_vec();
        }
        Service::ALL
            .into_iter()
            .filter(|s| self.only.contains(s))
            .collect()
    }

    pub fn vercel_targets(&self) -> Result<Vec<String>> {
        let targets = trimmed(&self.vercel_targets);
        if targets.is_empty() {
            bail!("At least one Vercel target is required.");
        }
        Ok(targets)
    }
}

fn trimmed(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

/// One `KEY=VALUE` pair from an env file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvEntry {
    pub key: String,
    pub value: String,
}

static KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("Invalid env key regex pattern"));

static GITHUB_REMOTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"github\.com[:/]([^/]+)/(.+?)(?:\.git)?$").expect("Invalid GitHub remote regex pattern")
});

/// Parse env-file text. Malformed lines are skipped with a warning.
pub fn parse_env(contents: &str) -> Vec<EnvEntry> {
    let mut entries = Vec::new();
    for (index, raw) in contents.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let line = line
            .strip_prefix("export ")
            .map(str::trim)
            .unwrap_or(line);

        let Some((key, value)) = line.split_once('=').filter(|(k, _)| !k.is_empty()) else {
            warn!(line = index + 1, "skipping invalid env line");
            continue;
        };
        let key = key.trim();
        if !KEY.is_match(key) {
            warn!(line = index + 1, key, "skipping invalid env key");
            continue;
        }

        entries.push(EnvEntry {
            key: key.to_string(),
            value: unquote(value).to_string(),
        });
    }
    entries
}

/// Strip one pair of matching quotes. A lone quote character unquotes to "".
fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.starts_with(quote) && value.ends_with(quote) {
            return value.get(1..value.len() - 1).unwrap_or_default();
        }
    }
    value
}

pub fn read_env_file(path: &std::path::Path) -> Result<Vec<EnvEntry>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Env file not found: {}", path.display()))?;
    Ok(parse_env(&contents))
}

/// Keep the first occurrence of each key, then apply `only` and `skip`.
/// Empty values are dropped with a warning.
pub fn select_keys(entries: Vec<EnvEntry>, only: &[String], skip: &[String]) -> Vec<EnvEntry> {
    let only: HashSet<String> = trimmed(only).into_iter().collect();
    let skip: HashSet<String> = trimmed(skip).into_iter().collect();
    let mut seen = HashSet::new();

    entries
        .into_iter()
        .filter(|entry| seen.insert(entry.key.clone()))
        .filter(|entry| only.is_empty() || only.contains(&entry.key))
        .filter(|entry| !skip.contains(&entry.key))
        .filter(|entry| {
            if entry.value.is_empty() {
                warn!(key = %entry.key, "skipping key with empty value");
                false
            } else {
                true
            }
        })
        .collect()
}

/// `owner/repo` from a GitHub remote URL, ssh or https.
pub fn parse_github_repo(remote: &str) -> Option<String> {
    let caps = GITHUB_REMOTE.captures(remote)?;
    Some(format!("{}/{}", &caps[1], &caps[2]))
}

/// How one service fared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceOutcome {
    pub service: Service,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub outcomes: Vec<ServiceOutcome>,
}

impl SyncReport {
    pub fn is_ok(&self) -> bool {
        self.outcomes.iter().all(|o| o.error.is_none())
    }

    pub fn print(&self) {
        println!("\nSummary:");
        for outcome in &self.outcomes {
            let state = if outcome.error.is_none() { "ok" } else { "failed" };
            println!("  - {}: {state}", outcome.service.as_str());
        }
    }
}

/// Read, filter and push. Option and env-file problems fail the whole
/// run; a failing service is recorded in the report and the rest continue.
pub async fn run(args: &SyncEnvArgs, runner: &dyn CommandRunner) -> Result<SyncReport> {
    args.vercel_targets()?;
    let entries = select_keys(read_env_file(&args.env_file)?, &args.keys, &args.skip_keys);
    if entries.is_empty() {
        bail!("No env keys selected. Nothing to sync.");
    }

    let mut report = SyncReport::default();
    for service in args.services() {
        let result = match service {
            Service::Github => services::sync_github(runner, &entries, args).await,
            Service::Vercel => services::sync_vercel(runner, &entries, args).await,
            Service::Supabase => services::sync_supabase(runner, &entries, args).await,
        };
        let error = result.err().map(|e| format!("{e:#}"));
        if let Some(message) = &error {
            eprintln!("[error] {}: {message}", service.as_str());
        }
        report.outcomes.push(ServiceOutcome { service, error });
    }
    Ok(report)
}
