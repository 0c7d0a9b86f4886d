//! The three secret stores and the command runner that drives their CLIs.

use std::process::Stdio;
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::{EnvEntry, SyncEnvArgs, parse_github_repo};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Runs an external program to completion.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[String], input: Option<&str>)
    -> Result<CommandOutput>;
}

/// Spawns real processes.
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        input: Option<&str>,
    ) -> Result<CommandOutput> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to run {program}"))?;

        if let (Some(input), Some(mut stdin)) = (input, child.stdin.take()) {
            stdin.write_all(input.as_bytes()).await?;
        }

        let output = child.wait_with_output().await?;
        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// One recorded invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub program: String,
    pub args: Vec<String>,
    pub input: Option<String>,
}

impl Call {
    /// `program arg1 arg2 ...`, for compact assertions.
    pub fn line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Records invocations instead of running them. Every command succeeds
/// unless its line starts with one of the configured failure prefixes.
#[derive(Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<Call>>,
    failures: Vec<String>,
    stdout: Vec<(String, String)>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, prefix: impl Into<String>) -> Self {
        self.failures.push(prefix.into());
        self
    }

    pub fn answering(mut self, prefix: impl Into<String>, stdout: impl Into<String>) -> Self {
        self.stdout.push((prefix.into(), stdout.into()));
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.calls().iter().map(Call::line).collect()
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(
        &self,
        program: &str,
        args: &[String],
        input: Option<&str>,
    ) -> Result<CommandOutput> {
        let call = Call {
            program: program.to_string(),
            args: args.to_vec(),
            input: input.map(str::to_string),
        };
        let line = call.line();
        self.calls
            .lock()
            .map_err(|_| anyhow!("recording runner lock poisoned"))?
            .push(call);

        let success = !self.failures.iter().any(|p| line.starts_with(p.as_str()));
        let stdout = self
            .stdout
            .iter()
            .find(|(p, _)| line.starts_with(p.as_str()))
            .map(|(_, out)| out.clone())
            .unwrap_or_default();
        Ok(CommandOutput {
            success,
            stdout,
            stderr: if success {
                String::new()
            } else {
                format!("{program} failed")
            },
        })
    }
}

fn strings<const N: usize>(args: [&str; N]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

/// Run and fail on a non-zero exit, carrying the most useful output.
async fn checked(
    runner: &dyn CommandRunner,
    program: &str,
    args: Vec<String>,
    input: Option<&str>,
) -> Result<CommandOutput> {
    let output = runner.run(program, &args, input).await?;
    if !output.success {
        let detail = [output.stderr.trim(), output.stdout.trim()]
            .into_iter()
            .find(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{program} exited with failure"));
        bail!(detail);
    }
    Ok(output)
}

async fn require_command(runner: &dyn CommandRunner, program: &str, hint: &str) -> Result<()> {
    let found = runner
        .run("which", &strings([program]), None)
        .await
        .map(|o| o.success)
        .unwrap_or(false);
    if !found {
        bail!("{program} command not found. Install it first ({hint}).");
    }
    Ok(())
}

async fn infer_github_repo(runner: &dyn CommandRunner) -> Option<String> {
    let output = runner
        .run("git", &strings(["config", "--get", "remote.origin.url"]), None)
        .await
        .ok()?;
    if !output.success {
        return None;
    }
    parse_github_repo(output.stdout.trim())
}

pub async fn sync_github(
    runner: &dyn CommandRunner,
    entries: &[EnvEntry],
    args: &SyncEnvArgs,
) -> Result<()> {
    let repo = match args.github_repo.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
        Some(repo) => repo.to_string(),
        None => infer_github_repo(runner).await.context(
            "GitHub repository could not be inferred. Use --github-repo owner/repo.",
        )?,
    };

    if !args.dry_run {
        require_command(runner, "gh", "https://cli.github.com/").await?;
        checked(runner, "gh", strings(["auth", "status"]), None).await?;
    }

    for entry in entries {
        if args.dry_run {
            println!("[dry-run] github {repo} {}", entry.key);
            continue;
        }
        checked(
            runner,
            "gh",
            strings([
                "secret",
                "set",
                &entry.key,
                "--repo",
                &repo,
                "--app",
                args.github_app.as_str(),
                "--body",
                &entry.value,
            ]),
            None,
        )
        .await?;
        println!("[ok] github {repo} {}", entry.key);
    }
    Ok(())
}

fn vercel_shared_args(args: &SyncEnvArgs) -> Vec<String> {
    let mut shared = Vec::new();
    if let Some(scope) = args.vercel_scope.as_deref().filter(|s| !s.is_empty()) {
        shared.extend(strings(["--scope", scope]));
    }
    if let Some(token) = args.vercel_token.as_deref().filter(|t| !t.is_empty()) {
        shared.extend(strings(["--token", token]));
    }
    shared
}

pub async fn sync_vercel(
    runner: &dyn CommandRunner,
    entries: &[EnvEntry],
    args: &SyncEnvArgs,
) -> Result<()> {
    let shared = vercel_shared_args(args);
    let with_shared = |rest: Vec<String>| -> Vec<String> {
        shared.iter().cloned().chain(rest).collect()
    };

    if !args.dry_run {
        require_command(runner, "vercel", "https://vercel.com/docs/cli").await?;
        checked(runner, "vercel", with_shared(strings(["whoami"])), None).await?;
    }

    let targets = args.vercel_targets()?;
    for target in &targets {
        for entry in entries {
            if args.dry_run {
                println!("[dry-run] vercel {target} {}", entry.key);
                continue;
            }
            // Removing a key that was never set fails; that is expected.
            runner
                .run(
                    "vercel",
                    &with_shared(strings(["env", "rm", &entry.key, target, "--yes"])),
                    None,
                )
                .await?;
            let input = format!("{}\n", entry.value);
            checked(
                runner,
                "vercel",
                with_shared(strings(["env", "add", &entry.key, target])),
                Some(&input),
            )
            .await?;
            println!("[ok] vercel {target} {}", entry.key);
        }
    }
    Ok(())
}

pub async fn sync_supabase(
    runner: &dyn CommandRunner,
    entries: &[EnvEntry],
    args: &SyncEnvArgs,
) -> Result<()> {
    let project_ref = args
        .supabase_project_ref
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());

    let Some(project_ref) = project_ref else {
        if !args.dry_run {
            bail!(
                "Supabase project ref is required. Use --supabase-project-ref or SYNC_ENV_SUPABASE_PROJECT_REF."
            );
        }
        for entry in entries {
            println!("[dry-run] supabase <project-ref-required> {}", entry.key);
        }
        return Ok(());
    };

    if !args.dry_run {
        require_command(runner, "supabase", "https://supabase.com/docs/guides/cli").await?;
    }

    for entry in entries {
        if args.dry_run {
            println!("[dry-run] supabase {project_ref} {}", entry.key);
            continue;
        }
        let assignment = format!("{}={}", entry.key, entry.value);
        checked(
            runner,
            "supabase",
            strings(["secrets", "set", "--project-ref", project_ref, &assignment]),
            None,
        )
        .await?;
        println!("[ok] supabase {project_ref} {}", entry.key);
    }
    Ok(())
}
