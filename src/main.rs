use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use guildboard::banner::{BannerInfo, member_table, print_banner};
use guildboard::config::{Backend, ServeArgs, resolve_db_path};
use guildboard::domain::{GuildRole, MembershipStatus};
use guildboard::events::{EventBus, log_activity};
use guildboard::quests::QuestBoard;
use guildboard::server;
use guildboard::store::GuildStore;
use guildboard::store::sqlite::SqliteStore;
use guildboard::sync_env::{self, SyncEnvArgs, services::SystemRunner};

#[derive(Parser)]
#[command(name = "guildboard", version, about = "A guild quest board, served as JSON.")]
struct Cli {
    /// SQLite database path (default: ~/.guildboard/guild.db, use :memory: for ephemeral)
    #[arg(short, long, global = true, env = "GUILD_DB")]
    db: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the board over HTTP
    Serve(ServeArgs),
    /// Manage local members (sqlite backend)
    Member {
        #[command(subcommand)]
        action: MemberAction,
    },
    /// Archive DONE quests past the retention window, once
    Sweep(ServeArgs),
    /// Push .env values to GitHub, Vercel and Supabase secrets
    SyncEnv(SyncEnvArgs),
}

#[derive(Subcommand)]
enum MemberAction {
    /// Register a member and print a bearer token for them
    Add {
        /// Display name
        name: String,
        /// Grant the ADMIN role
        #[arg(long)]
        admin: bool,
        /// Approve immediately instead of leaving the member PENDING
        #[arg(long)]
        approve: bool,
    },
    /// Issue another bearer token for an existing member
    Token {
        /// Member id
        id: Uuid,
    },
    /// List every member, highest XP first
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before parsing so env-backed flags see it.
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("guildboard=info,tower_http=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Serve(args) => serve(cli.db.as_deref(), args).await,
        Command::Member { action } => manage_members(cli.db.as_deref(), action),
        Command::Sweep(args) => {
            let db = db_for(&args, cli.db.as_deref())?;
            args.open_store(&db)?.archive_expired_done_quests().await?;
            println!("archival sweep complete");
            Ok(())
        }
        Command::SyncEnv(args) => {
            let report = sync_env::run(&args, &SystemRunner).await?;
            report.print();
            if !report.is_ok() {
                bail!("one or more services failed to sync");
            }
            Ok(())
        }
    }
}

fn db_for(args: &ServeArgs, db: Option<&str>) -> anyhow::Result<String> {
    match args.backend {
        Backend::Sqlite => resolve_db_path(db),
        Backend::Postgrest => Ok(String::new()),
    }
}

async fn serve(db: Option<&str>, args: ServeArgs) -> anyhow::Result<()> {
    let addr = args.addr()?;
    let db = db_for(&args, db)?;
    let store = args.open_store(&db)?;

    let events = Arc::new(EventBus::default());
    tokio::spawn(log_activity(events.subscribe()));
    let board = Arc::new(QuestBoard::new(store, events));

    let (store_label, retention) = match args.backend {
        Backend::Sqlite => (
            if db == ":memory:" { "ephemeral".to_string() } else { db.clone() },
            format!("{} days", args.archive_after_days),
        ),
        Backend::Postgrest => (
            args.supabase_url.clone().unwrap_or_default(),
            "managed by backend".to_string(),
        ),
    };
    print_banner(&BannerInfo {
        addr,
        backend: args.backend.label(),
        store: &store_label,
        retention: &retention,
    });

    server::serve(board, addr).await
}

fn manage_members(db: Option<&str>, action: MemberAction) -> anyhow::Result<()> {
    let store = SqliteStore::open(&resolve_db_path(db)?)?;

    match action {
        MemberAction::Add {
            name,
            admin,
            approve,
        } => {
            let role = if admin { GuildRole::Admin } else { GuildRole::Member };
            let status = if approve {
                MembershipStatus::Approved
            } else {
                MembershipStatus::Pending
            };
            let name = name.trim();
            if name.is_empty() {
                bail!("display name must not be empty");
            }
            let profile = store.add_member(name, role, status)?;
            let token = store.issue_token(profile.id)?;
            println!("✓ Added {} ({}, {})", profile.display_name, role, status);
            println!("  id     {}", profile.id);
            println!("  token  {token}");
        }
        MemberAction::Token { id } => {
            let profile = store.members()?.into_iter().find(|m| m.id == id);
            let profile = profile.with_context(|| format!("no member with id {id}"))?;
            let token = store.issue_token(profile.id)?;
            println!("✓ New token for {}", profile.display_name);
            println!("  token  {token}");
        }
        MemberAction::List => {
            print!("{}", member_table(&store.members()?));
        }
    }
    Ok(())
}
