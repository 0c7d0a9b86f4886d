//! Embedded row store for local boards and tests.
//!
//! Mirrors the table layout of the managed backend (`user_profiles`,
//! `quests`, `quest_acceptances`, `quest_audit_logs`,
//! `quest_achievement_logs`) and adds `api_tokens`, which stands in for the
//! external user directory. Timestamps are RFC 3339 text with millisecond
//! precision so they sort lexicographically.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use uuid::Uuid;

use super::GuildStore;
use crate::auth::token;
use crate::consts::DEFAULT_ARCHIVE_AFTER_DAYS;
use crate::domain::{
    Acceptance, AchievementLogEntry, AuditLogEntry, Difficulty, GuildRole, MembershipStatus,
    NewQuest, PendingMember, Quest, QuestId, QuestPatch, QuestStatus, UserId, UserProfile,
    VisualSeed,
};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS user_profiles (
        id                TEXT PRIMARY KEY,
        display_name      TEXT NOT NULL,
        role              TEXT NOT NULL DEFAULT 'MEMBER',
        membership_status TEXT NOT NULL DEFAULT 'PENDING',
        total_xp          INTEGER NOT NULL DEFAULT 0,
        created_at        TEXT NOT NULL,
        updated_at        TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS api_tokens (
        token_hash TEXT PRIMARY KEY,
        user_id    TEXT NOT NULL,
        created_at TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS quests (
        id                TEXT PRIMARY KEY,
        title             TEXT NOT NULL,
        detail            TEXT,
        difficulty        INTEGER NOT NULL CHECK (difficulty BETWEEN 1 AND 5),
        status            TEXT NOT NULL CHECK (status IN ('OPEN', 'DOING', 'DONE')),
        due_date          TEXT,
        position          INTEGER NOT NULL,
        parchment_variant INTEGER NOT NULL,
        pin_variant       TEXT NOT NULL,
        pin_offset_px     INTEGER NOT NULL,
        created_by        TEXT NOT NULL,
        completed_by      TEXT,
        completed_at      TEXT,
        archived_at       TEXT,
        created_at        TEXT NOT NULL,
        updated_at        TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS quests_lane ON quests (status, position);
    CREATE TABLE IF NOT EXISTS quest_acceptances (
        quest_id    TEXT NOT NULL,
        user_id     TEXT NOT NULL,
        accepted_at TEXT NOT NULL,
        PRIMARY KEY (quest_id, user_id)
    );
    CREATE TABLE IF NOT EXISTS quest_audit_logs (
        id         INTEGER PRIMARY KEY AUTOINCREMENT,
        quest_id   TEXT NOT NULL,
        actor_id   TEXT NOT NULL,
        action     TEXT NOT NULL,
        meta       TEXT,
        created_at TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS quest_achievement_logs (
        id         TEXT PRIMARY KEY,
        quest_id   TEXT NOT NULL,
        actor_id   TEXT NOT NULL,
        created_at TEXT NOT NULL
    );
";

const QUEST_COLUMNS: &str = "id, title, detail, difficulty, status, due_date, position, \
     parchment_variant, pin_variant, pin_offset_px, created_by, completed_by, completed_at, \
     archived_at, created_at, updated_at";

const PROFILE_COLUMNS: &str =
    "id, display_name, role, membership_status, total_xp, created_at, updated_at";

/// SQLite-backed guild store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    archive_after: Duration,
}

impl SqliteStore {
    /// Open or create the board tables in the given database.
    /// Use `":memory:"` for tests.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path).context("failed to open board database")?;
        conn.execute_batch(SCHEMA)
            .context("failed to create board tables")?;
        Ok(Self {
            conn: Mutex::new(conn),
            archive_after: Duration::days(DEFAULT_ARCHIVE_AFTER_DAYS),
        })
    }

    pub fn in_memory() -> Result<Self> {
        Self::open(":memory:")
    }

    /// How long a DONE quest stays on the board before the sweep archives it.
    pub fn with_archive_after(mut self, after: Duration) -> Self {
        self.archive_after = after;
        self
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("board database lock poisoned"))
    }

    // --- local directory management (the managed backend has its own) ---

    /// Register a profile. New members normally start PENDING.
    pub fn add_member(
        &self,
        display_name: &str,
        role: GuildRole,
        status: MembershipStatus,
    ) -> Result<UserProfile> {
        let id = Uuid::new_v4();
        let now = ts(Utc::now());
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO user_profiles (id, display_name, role, membership_status, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![id.to_string(), display_name, role.as_str(), status.as_str(), now],
        )?;
        profile_by_id(&conn, id)?.context("inserted profile vanished")
    }

    /// Issue a new bearer token for `user_id`. The plain token is returned
    /// once; only its hash is stored.
    pub fn issue_token(&self, user_id: UserId) -> Result<String> {
        let plain = token::generate();
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO api_tokens (token_hash, user_id, created_at) VALUES (?1, ?2, ?3)",
            params![token::hash(&plain), user_id.to_string(), ts(Utc::now())],
        )?;
        Ok(plain)
    }

    /// Every profile, highest XP first.
    pub fn members(&self) -> Result<Vec<UserProfile>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {PROFILE_COLUMNS} FROM user_profiles ORDER BY total_xp DESC, display_name ASC"
        ))?;
        let rows = stmt
            .query_map([], ProfileRow::read)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(ProfileRow::into_profile).collect()
    }

    /// The append-only audit trail, oldest first. Kept for external review.
    pub fn audit_log(&self) -> Result<Vec<AuditLogEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT quest_id, actor_id, action, meta FROM quest_audit_logs ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|(quest_id, actor_id, action, meta)| {
                Ok(AuditLogEntry {
                    quest_id: parse_uuid(&quest_id)?,
                    actor_id: parse_uuid(&actor_id)?,
                    action: action.parse()?,
                    meta: meta
                        .as_deref()
                        .map(serde_json::from_str::<serde_json::Value>)
                        .transpose()?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl GuildStore for SqliteStore {
    async fn resolve_token(&self, token: &str) -> Result<Option<UserId>> {
        let conn = self.conn()?;
        let user_id: Option<String> = conn
            .query_row(
                "SELECT user_id FROM api_tokens WHERE token_hash = ?1",
                [token::hash(token)],
                |row| row.get(0),
            )
            .optional()?;
        user_id.as_deref().map(parse_uuid).transpose()
    }

    async fn profile(&self, id: UserId) -> Result<Option<UserProfile>> {
        let conn = self.conn()?;
        profile_by_id(&conn, id)
    }

    async fn display_names(&self, ids: &[UserId]) -> Result<Vec<(UserId, String)>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT id, display_name FROM user_profiles WHERE id IN ({})",
            placeholders(ids.len())
        ))?;
        let rows = stmt
            .query_map(params_from_iter(ids.iter().map(Uuid::to_string)), |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|(id, name)| Ok((parse_uuid(&id)?, name)))
            .collect()
    }

    async fn pending_members(&self) -> Result<Vec<PendingMember>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, display_name, created_at FROM user_profiles
             WHERE membership_status = 'PENDING'
             ORDER BY created_at ASC, rowid ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|(id, display_name, created_at)| {
                Ok(PendingMember {
                    id: parse_uuid(&id)?,
                    display_name,
                    created_at: parse_ts(&created_at)?,
                })
            })
            .collect()
    }

    async fn set_membership_status(&self, id: UserId, status: MembershipStatus) -> Result<u64> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE user_profiles SET membership_status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_str(), ts(Utc::now()), id.to_string()],
        )?;
        Ok(changed as u64)
    }

    async fn increment_xp(&self, id: UserId, amount: i64) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE user_profiles SET total_xp = total_xp + ?1, updated_at = ?2 WHERE id = ?3",
            params![amount, ts(Utc::now()), id.to_string()],
        )?;
        Ok(())
    }

    async fn quest(&self, id: QuestId) -> Result<Option<Quest>> {
        let conn = self.conn()?;
        let quests = query_quests(
            &conn,
            &format!("SELECT {QUEST_COLUMNS} FROM quests WHERE id = ?1"),
            [id.to_string()],
        )?;
        Ok(quests.into_iter().next())
    }

    async fn lane(&self, status: QuestStatus) -> Result<Vec<Quest>> {
        let conn = self.conn()?;
        query_quests(
            &conn,
            &format!(
                "SELECT {QUEST_COLUMNS} FROM quests
                 WHERE status = ?1 AND archived_at IS NULL
                 ORDER BY position ASC, created_at ASC"
            ),
            [status.as_str()],
        )
    }

    async fn archived_quests(&self) -> Result<Vec<Quest>> {
        let conn = self.conn()?;
        query_quests(
            &conn,
            &format!(
                "SELECT {QUEST_COLUMNS} FROM quests
                 WHERE archived_at IS NOT NULL
                 ORDER BY archived_at DESC"
            ),
            [],
        )
    }

    async fn max_position(&self, status: QuestStatus) -> Result<Option<i64>> {
        let conn = self.conn()?;
        let max = conn.query_row(
            "SELECT MAX(position) FROM quests WHERE status = ?1",
            [status.as_str()],
            |row| row.get::<_, Option<i64>>(0),
        )?;
        Ok(max)
    }

    async fn insert_quest(&self, quest: NewQuest) -> Result<Quest> {
        let id = Uuid::new_v4();
        {
            let now = ts(Utc::now());
            let conn = self.conn()?;
            conn.execute(
                &format!(
                    "INSERT INTO quests ({QUEST_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, NULL, NULL, NULL, ?12, ?12)"
                ),
                params![
                    id.to_string(),
                    quest.title,
                    quest.detail,
                    quest.difficulty.get(),
                    quest.status.as_str(),
                    quest.due_date.map(|d| d.to_string()),
                    quest.position,
                    quest.visual.parchment_variant,
                    quest.visual.pin_variant.as_str(),
                    quest.visual.pin_offset_px,
                    quest.created_by.to_string(),
                    now,
                ],
            )?;
        }
        self.quest(id).await?.context("inserted quest vanished")
    }

    async fn update_quest(
        &self,
        id: QuestId,
        expected: Option<QuestStatus>,
        patch: QuestPatch,
    ) -> Result<u64> {
        if patch.is_empty() {
            return Ok(0);
        }

        let mut columns: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();
        if let Some(status) = patch.status {
            columns.push("status");
            values.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(position) = patch.position {
            columns.push("position");
            values.push(Value::Integer(position));
        }
        if let Some(completed_by) = patch.completed_by {
            columns.push("completed_by");
            values.push(nullable(completed_by.map(|id| id.to_string())));
        }
        if let Some(completed_at) = patch.completed_at {
            columns.push("completed_at");
            values.push(nullable(completed_at.map(ts)));
        }
        if let Some(archived_at) = patch.archived_at {
            columns.push("archived_at");
            values.push(nullable(archived_at.map(ts)));
        }
        columns.push("updated_at");
        values.push(Value::Text(ts(Utc::now())));

        let assignments = columns
            .iter()
            .map(|column| format!("{column} = ?"))
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!("UPDATE quests SET {assignments} WHERE id = ?");
        values.push(Value::Text(id.to_string()));
        if let Some(expected) = expected {
            sql.push_str(" AND status = ?");
            values.push(Value::Text(expected.as_str().to_string()));
        }

        let conn = self.conn()?;
        let changed = conn.execute(&sql, params_from_iter(values))?;
        Ok(changed as u64)
    }

    async fn archive_expired_done_quests(&self) -> Result<()> {
        let now = Utc::now();
        let cutoff = now
            .checked_sub_signed(self.archive_after)
            .context("archive window reaches past the calendar")?;
        let conn = self.conn()?;
        conn.execute(
            "UPDATE quests SET archived_at = ?1, updated_at = ?1
             WHERE status = 'DONE' AND archived_at IS NULL
               AND completed_at IS NOT NULL AND completed_at <= ?2",
            params![ts(now), ts(cutoff)],
        )?;
        Ok(())
    }

    async fn acceptances(&self, quest_ids: &[QuestId]) -> Result<Vec<Acceptance>> {
        if quest_ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT quest_id, user_id, accepted_at FROM quest_acceptances
             WHERE quest_id IN ({})
             ORDER BY accepted_at ASC",
            placeholders(quest_ids.len())
        ))?;
        let rows = stmt
            .query_map(
                params_from_iter(quest_ids.iter().map(Uuid::to_string)),
                AcceptanceRow::read,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(AcceptanceRow::into_acceptance).collect()
    }

    async fn acceptance(&self, quest_id: QuestId, user_id: UserId) -> Result<Option<Acceptance>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT quest_id, user_id, accepted_at FROM quest_acceptances
                 WHERE quest_id = ?1 AND user_id = ?2",
                [quest_id.to_string(), user_id.to_string()],
                AcceptanceRow::read,
            )
            .optional()?;
        row.map(AcceptanceRow::into_acceptance).transpose()
    }

    async fn insert_acceptance(&self, quest_id: QuestId, user_id: UserId) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO quest_acceptances (quest_id, user_id, accepted_at) VALUES (?1, ?2, ?3)",
            params![quest_id.to_string(), user_id.to_string(), ts(Utc::now())],
        )?;
        Ok(())
    }

    async fn delete_acceptance(&self, quest_id: QuestId, user_id: UserId) -> Result<u64> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM quest_acceptances WHERE quest_id = ?1 AND user_id = ?2",
            [quest_id.to_string(), user_id.to_string()],
        )?;
        Ok(deleted as u64)
    }

    async fn count_acceptances(&self, quest_id: QuestId) -> Result<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM quest_acceptances WHERE quest_id = ?1",
            [quest_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    async fn append_audit(&self, entry: AuditLogEntry) -> Result<()> {
        let meta = entry.meta.as_ref().map(serde_json::to_string).transpose()?;
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO quest_audit_logs (quest_id, actor_id, action, meta, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.quest_id.to_string(),
                entry.actor_id.to_string(),
                entry.action.as_str(),
                meta,
                ts(Utc::now()),
            ],
        )?;
        Ok(())
    }

    async fn insert_achievement(&self, quest_id: QuestId, actor_id: UserId) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO quest_achievement_logs (id, quest_id, actor_id, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                Uuid::new_v4().to_string(),
                quest_id.to_string(),
                actor_id.to_string(),
                ts(Utc::now()),
            ],
        )?;
        Ok(())
    }

    async fn delete_achievement(&self, quest_id: QuestId, actor_id: UserId) -> Result<u64> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM quest_achievement_logs WHERE quest_id = ?1 AND actor_id = ?2",
            [quest_id.to_string(), actor_id.to_string()],
        )?;
        Ok(deleted as u64)
    }

    async fn achievements(&self) -> Result<Vec<AchievementLogEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT a.id, a.quest_id, q.title, a.actor_id, p.display_name, a.created_at
             FROM quest_achievement_logs a
             LEFT JOIN quests q ON q.id = a.quest_id
             LEFT JOIN user_profiles p ON p.id = a.actor_id
             ORDER BY a.created_at DESC, a.rowid DESC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, String>(5)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(
                |(id, quest_id, quest_title, actor_id, actor_name, created_at)| {
                    Ok(AchievementLogEntry {
                        id: parse_uuid(&id)?,
                        quest_id: parse_uuid(&quest_id)?,
                        quest_title,
                        actor_id: parse_uuid(&actor_id)?,
                        actor_name,
                        created_at: parse_ts(&created_at)?,
                    })
                },
            )
            .collect()
    }
}

// --- row decoding ---

struct QuestRow {
    id: String,
    title: String,
    detail: Option<String>,
    difficulty: i64,
    status: String,
    due_date: Option<String>,
    position: i64,
    parchment_variant: i64,
    pin_variant: String,
    pin_offset_px: i64,
    created_by: String,
    completed_by: Option<String>,
    completed_at: Option<String>,
    archived_at: Option<String>,
    created_at: String,
    updated_at: String,
}

impl QuestRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            detail: row.get(2)?,
            difficulty: row.get(3)?,
            status: row.get(4)?,
            due_date: row.get(5)?,
            position: row.get(6)?,
            parchment_variant: row.get(7)?,
            pin_variant: row.get(8)?,
            pin_offset_px: row.get(9)?,
            created_by: row.get(10)?,
            completed_by: row.get(11)?,
            completed_at: row.get(12)?,
            archived_at: row.get(13)?,
            created_at: row.get(14)?,
            updated_at: row.get(15)?,
        })
    }

    fn into_quest(self) -> Result<Quest> {
        let difficulty = u8::try_from(self.difficulty)?;
        Ok(Quest {
            id: parse_uuid(&self.id)?,
            title: self.title,
            detail: self.detail,
            difficulty: Difficulty::try_from(difficulty).map_err(|e| anyhow!(e))?,
            status: self.status.parse()?,
            due_date: self.due_date.as_deref().map(parse_date).transpose()?,
            position: self.position,
            visual: VisualSeed {
                parchment_variant: u8::try_from(self.parchment_variant)?,
                pin_variant: self.pin_variant.parse()?,
                pin_offset_px: i8::try_from(self.pin_offset_px)?,
            },
            created_by: parse_uuid(&self.created_by)?,
            completed_by: self.completed_by.as_deref().map(parse_uuid).transpose()?,
            completed_at: self.completed_at.as_deref().map(parse_ts).transpose()?,
            archived_at: self.archived_at.as_deref().map(parse_ts).transpose()?,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

struct ProfileRow {
    id: String,
    display_name: String,
    role: String,
    membership_status: String,
    total_xp: i64,
    created_at: String,
    updated_at: String,
}

impl ProfileRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            display_name: row.get(1)?,
            role: row.get(2)?,
            membership_status: row.get(3)?,
            total_xp: row.get(4)?,
            created_at: row.get(5)?,
            updated_at: row.get(6)?,
        })
    }

    fn into_profile(self) -> Result<UserProfile> {
        Ok(UserProfile {
            id: parse_uuid(&self.id)?,
            display_name: self.display_name,
            role: self.role.parse()?,
            membership_status: self.membership_status.parse()?,
            total_xp: self.total_xp,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

struct AcceptanceRow {
    quest_id: String,
    user_id: String,
    accepted_at: String,
}

impl AcceptanceRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            quest_id: row.get(0)?,
            user_id: row.get(1)?,
            accepted_at: row.get(2)?,
        })
    }

    fn into_acceptance(self) -> Result<Acceptance> {
        Ok(Acceptance {
            quest_id: parse_uuid(&self.quest_id)?,
            user_id: parse_uuid(&self.user_id)?,
            accepted_at: parse_ts(&self.accepted_at)?,
        })
    }
}

fn query_quests<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<Quest>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, QuestRow::read)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(QuestRow::into_quest).collect()
}

fn profile_by_id(conn: &Connection, id: UserId) -> Result<Option<UserProfile>> {
    let row = conn
        .query_row(
            &format!("SELECT {PROFILE_COLUMNS} FROM user_profiles WHERE id = ?1"),
            [id.to_string()],
            ProfileRow::read,
        )
        .optional()?;
    row.map(ProfileRow::into_profile).transpose()
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn nullable(value: Option<String>) -> Value {
    value.map(Value::Text).unwrap_or(Value::Null)
}

fn ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>> {
    let at = DateTime::parse_from_rfc3339(s).with_context(|| format!("bad timestamp {s:?}"))?;
    Ok(at.with_timezone(&Utc))
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("bad date {s:?}"))
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).with_context(|| format!("bad id {s:?}"))
}
