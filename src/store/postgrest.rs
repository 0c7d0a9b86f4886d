//! Client for the managed backend's REST surface (Supabase / PostgREST).
//!
//! Table reads and writes go to `/rest/v1/<table>` with PostgREST filter
//! syntax (`eq.`, `is.null`, `in.(..)`, `order=`); the XP increment and the
//! archival sweep are stored procedures under `/rest/v1/rpc/`. Bearer tokens
//! are resolved against `/auth/v1/user`.
//!
//! The client authenticates with the service key: the lifecycle layer is the
//! one enforcing who may do what.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use super::GuildStore;
use crate::domain::{
    Acceptance, AchievementLogEntry, AuditLogEntry, MembershipStatus, NewQuest, PendingMember,
    Quest, QuestId, QuestPatch, QuestStatus, UserId, UserProfile,
};

const ACHIEVEMENT_SELECT: &str = "id,quest_id,actor_id,created_at,\
     quest:quests!quest_achievement_logs_quest_id_fkey(title),\
     actor:user_profiles!quest_achievement_logs_actor_id_fkey(display_name)";

pub struct PostgrestStore {
    client: reqwest::Client,
    rest: Url,
    auth_user: Url,
    api_key: String,
}

impl PostgrestStore {
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self> {
        let mut base = Url::parse(base_url).context("invalid backend URL")?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        Ok(Self {
            client: reqwest::Client::new(),
            rest: base.join("rest/v1/")?,
            auth_user: base.join("auth/v1/user")?,
            api_key: api_key.into(),
        })
    }

    /// `rest/v1/<path>?<query>`.
    pub fn url(&self, path: &str, query: &[(&str, String)]) -> Result<Url> {
        let mut url = self.rest.join(path)?;
        if !query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let req = self.request(Method::GET, self.url(table, query)?);
        let resp = send(req, table).await?;
        Ok(resp.json().await?)
    }

    async fn insert(&self, table: &str, body: &Value) -> Result<()> {
        let req = self
            .request(Method::POST, self.url(table, &[])?)
            .header("Prefer", "return=minimal")
            .json(body);
        send(req, table).await?;
        Ok(())
    }

    /// PATCH or DELETE with filters; returns the number of rows touched.
    async fn mutate(
        &self,
        method: Method,
        table: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<u64> {
        let mut req = self
            .request(method, self.url(table, query)?)
            .header("Prefer", "return=representation");
        if let Some(body) = body {
            req = req.json(body);
        }
        let rows: Vec<Value> = send(req, table).await?.json().await?;
        Ok(rows.len() as u64)
    }

    async fn rpc(&self, function: &str, args: Value) -> Result<()> {
        let req = self
            .request(Method::POST, self.url(&format!("rpc/{function}"), &[])?)
            .json(&args);
        send(req, function).await?;
        Ok(())
    }
}

async fn send(req: RequestBuilder, what: &str) -> Result<reqwest::Response> {
    let resp = req
        .send()
        .await
        .with_context(|| format!("request to {what} failed"))?;
    if !resp.status().is_success() {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        bail!("backend error on {what} ({status}): {text}");
    }
    Ok(resp)
}

pub fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

pub fn in_list<T: std::fmt::Display>(values: &[T]) -> String {
    let joined = values
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",");
    format!("in.({joined})")
}

// --- wire rows that differ from the domain types ---

#[derive(Deserialize)]
struct AuthUser {
    id: UserId,
}

#[derive(Deserialize)]
struct NameRow {
    id: UserId,
    display_name: String,
}

#[derive(Deserialize)]
struct PositionRow {
    position: i64,
}

#[derive(Deserialize)]
struct TitleRef {
    title: String,
}

#[derive(Deserialize)]
struct NameRef {
    display_name: String,
}

#[derive(Deserialize)]
struct AchievementRow {
    id: uuid::Uuid,
    quest_id: QuestId,
    actor_id: UserId,
    created_at: DateTime<Utc>,
    quest: Option<TitleRef>,
    actor: Option<NameRef>,
}

#[async_trait]
impl GuildStore for PostgrestStore {
    async fn resolve_token(&self, token: &str) -> Result<Option<UserId>> {
        let resp = self
            .client
            .get(self.auth_user.clone())
            .header("apikey", &self.api_key)
            .bearer_auth(token)
            .send()
            .await
            .context("request to auth/v1/user failed")?;
        match resp.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            status if status.is_success() => {
                let user: AuthUser = resp.json().await?;
                Ok(Some(user.id))
            }
            status => {
                let text = resp.text().await.unwrap_or_default();
                bail!("backend error on auth/v1/user ({status}): {text}")
            }
        }
    }

    async fn profile(&self, id: UserId) -> Result<Option<UserProfile>> {
        let rows: Vec<UserProfile> = self
            .select(
                "user_profiles",
                &[("select", "*".to_string()), ("id", eq(id))],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn display_names(&self, ids: &[UserId]) -> Result<Vec<(UserId, String)>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<NameRow> = self
            .select(
                "user_profiles",
                &[
                    ("select", "id,display_name".to_string()),
                    ("id", in_list(ids)),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(|r| (r.id, r.display_name)).collect())
    }

    async fn pending_members(&self) -> Result<Vec<PendingMember>> {
        self.select(
            "user_profiles",
            &[
                ("select", "id,display_name,created_at".to_string()),
                ("membership_status", eq(MembershipStatus::Pending)),
                ("order", "created_at.asc".to_string()),
            ],
        )
        .await
    }

    async fn set_membership_status(&self, id: UserId, status: MembershipStatus) -> Result<u64> {
        self.mutate(
            Method::PATCH,
            "user_profiles",
            &[("id", eq(id))],
            Some(&json!({ "membership_status": status })),
        )
        .await
    }

    async fn increment_xp(&self, id: UserId, amount: i64) -> Result<()> {
        self.rpc(
            "increment_user_xp",
            json!({ "user_id_param": id, "amount_param": amount }),
        )
        .await
    }

    async fn quest(&self, id: QuestId) -> Result<Option<Quest>> {
        let rows: Vec<Quest> = self
            .select("quests", &[("select", "*".to_string()), ("id", eq(id))])
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn lane(&self, status: QuestStatus) -> Result<Vec<Quest>> {
        self.select(
            "quests",
            &[
                ("select", "*".to_string()),
                ("status", eq(status)),
                ("archived_at", "is.null".to_string()),
                ("order", "position.asc".to_string()),
            ],
        )
        .await
    }

    async fn archived_quests(&self) -> Result<Vec<Quest>> {
        self.select(
            "quests",
            &[
                ("select", "*".to_string()),
                ("archived_at", "not.is.null".to_string()),
                ("order", "archived_at.desc".to_string()),
            ],
        )
        .await
    }

    async fn max_position(&self, status: QuestStatus) -> Result<Option<i64>> {
        let rows: Vec<PositionRow> = self
            .select(
                "quests",
                &[
                    ("select", "position".to_string()),
                    ("status", eq(status)),
                    ("order", "position.desc".to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(rows.first().map(|r| r.position))
    }

    async fn insert_quest(&self, quest: NewQuest) -> Result<Quest> {
        let req = self
            .request(Method::POST, self.url("quests", &[])?)
            .header("Prefer", "return=representation")
            .json(&quest);
        let rows: Vec<Quest> = send(req, "quests").await?.json().await?;
        rows.into_iter()
            .next()
            .context("backend returned no row for inserted quest")
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
        let mut body = serde_json::to_value(&patch)?;
        body["updated_at"] = json!(Utc::now());

        let mut query = vec![("id", eq(id))];
        if let Some(expected) = expected {
            query.push(("status", eq(expected)));
        }
        self.mutate(Method::PATCH, "quests", &query, Some(&body))
            .await
    }

    async fn archive_expired_done_quests(&self) -> Result<()> {
        self.rpc("archive_expired_done_quests", json!({})).await
    }

    async fn acceptances(&self, quest_ids: &[QuestId]) -> Result<Vec<Acceptance>> {
        if quest_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.select(
            "quest_acceptances",
            &[
                ("select", "quest_id,user_id,accepted_at".to_string()),
                ("quest_id", in_list(quest_ids)),
            ],
        )
        .await
    }

    async fn acceptance(&self, quest_id: QuestId, user_id: UserId) -> Result<Option<Acceptance>> {
        let rows: Vec<Acceptance> = self
            .select(
                "quest_acceptances",
                &[
                    ("select", "quest_id,user_id,accepted_at".to_string()),
                    ("quest_id", eq(quest_id)),
                    ("user_id", eq(user_id)),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_acceptance(&self, quest_id: QuestId, user_id: UserId) -> Result<()> {
        self.insert(
            "quest_acceptances",
            &json!({ "quest_id": quest_id, "user_id": user_id }),
        )
        .await
    }

    async fn delete_acceptance(&self, quest_id: QuestId, user_id: UserId) -> Result<u64> {
        self.mutate(
            Method::DELETE,
            "quest_acceptances",
            &[("quest_id", eq(quest_id)), ("user_id", eq(user_id))],
            None,
        )
        .await
    }

    async fn count_acceptances(&self, quest_id: QuestId) -> Result<u64> {
        let rows: Vec<Value> = self
            .select(
                "quest_acceptances",
                &[
                    ("select", "user_id".to_string()),
                    ("quest_id", eq(quest_id)),
                ],
            )
            .await?;
        Ok(rows.len() as u64)
    }

    async fn append_audit(&self, entry: AuditLogEntry) -> Result<()> {
        self.insert("quest_audit_logs", &serde_json::to_value(&entry)?)
            .await
    }

    async fn insert_achievement(&self, quest_id: QuestId, actor_id: UserId) -> Result<()> {
        self.insert(
            "quest_achievement_logs",
            &json!({ "quest_id": quest_id, "actor_id": actor_id }),
        )
        .await
    }

    async fn delete_achievement(&self, quest_id: QuestId, actor_id: UserId) -> Result<u64> {
        self.mutate(
            Method::DELETE,
            "quest_achievement_logs",
            &[("quest_id", eq(quest_id)), ("actor_id", eq(actor_id))],
            None,
        )
        .await
    }

    async fn achievements(&self) -> Result<Vec<AchievementLogEntry>> {
        let rows: Vec<AchievementRow> = self
            .select(
                "quest_achievement_logs",
                &[
                    ("select", ACHIEVEMENT_SELECT.to_string()),
                    ("order", "created_at.desc".to_string()),
                ],
            )
            .await?;
        Ok(rows
            .into_iter()
            .map(|row| AchievementLogEntry {
                id: row.id,
                quest_id: row.quest_id,
                quest_title: row.quest.map(|q| q.title),
                actor_id: row.actor_id,
                actor_name: row.actor.map(|a| a.display_name),
                created_at: row.created_at,
            })
            .collect())
    }
}
