pub mod postgrest;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::{
    Acceptance, AchievementLogEntry, AuditLogEntry, MembershipStatus, NewQuest, PendingMember,
    Quest, QuestId, QuestPatch, QuestStatus, UserId, UserProfile,
};

/// Everything the board asks of its row store. Could be SQLite, PostgREST, etc.
///
/// Each method is one request/response round trip. Nothing here spans
/// more than one row write, so callers sequence multi-step actions themselves.
#[async_trait]
pub trait GuildStore: Send + Sync {
    // --- member directory ---

    /// Map a bearer token to the user it was issued to.
    async fn resolve_token(&self, token: &str) -> Result<Option<UserId>>;
    async fn profile(&self, id: UserId) -> Result<Option<UserProfile>>;
    /// `(id, display_name)` for every id that has a profile.
    async fn display_names(&self, ids: &[UserId]) -> Result<Vec<(UserId, String)>>;
    /// PENDING profiles, oldest first.
    async fn pending_members(&self) -> Result<Vec<PendingMember>>;
    /// Returns the number of profiles updated.
    async fn set_membership_status(&self, id: UserId, status: MembershipStatus) -> Result<u64>;
    /// Atomic `total_xp += amount`. Negative amounts debit.
    async fn increment_xp(&self, id: UserId, amount: i64) -> Result<()>;

    // --- quests ---

    async fn quest(&self, id: QuestId) -> Result<Option<Quest>>;
    /// Non-archived quests in `status`, by `position` ascending.
    async fn lane(&self, status: QuestStatus) -> Result<Vec<Quest>>;
    /// Archived quests, most recently archived first.
    async fn archived_quests(&self) -> Result<Vec<Quest>>;
    async fn max_position(&self, status: QuestStatus) -> Result<Option<i64>>;
    async fn insert_quest(&self, quest: NewQuest) -> Result<Quest>;
    /// Apply `patch` to quest `id`, only while its status equals `expected`
    /// (when given). Returns the number of rows changed.
    async fn update_quest(
        &self,
        id: QuestId,
        expected: Option<QuestStatus>,
        patch: QuestPatch,
    ) -> Result<u64>;
    /// Stamp `archived_at` on DONE quests past the retention window.
    async fn archive_expired_done_quests(&self) -> Result<()>;

    // --- acceptances ---

    async fn acceptances(&self, quest_ids: &[QuestId]) -> Result<Vec<Acceptance>>;
    async fn acceptance(&self, quest_id: QuestId, user_id: UserId) -> Result<Option<Acceptance>>;
    async fn insert_acceptance(&self, quest_id: QuestId, user_id: UserId) -> Result<()>;
    async fn delete_acceptance(&self, quest_id: QuestId, user_id: UserId) -> Result<u64>;
    async fn count_acceptances(&self, quest_id: QuestId) -> Result<u64>;

    // --- logs ---

    async fn append_audit(&self, entry: AuditLogEntry) -> Result<()>;
    async fn insert_achievement(&self, quest_id: QuestId, actor_id: UserId) -> Result<()>;
    async fn delete_achievement(&self, quest_id: QuestId, actor_id: UserId) -> Result<u64>;
    /// Achievement feed, newest first, joined with quest title and actor name.
    async fn achievements(&self) -> Result<Vec<AchievementLogEntry>>;
}
