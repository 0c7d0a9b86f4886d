//! The quest lifecycle: accept, unaccept, complete, reopen, create, list
//! and reorder.
//!
//! Every action is a read, a guard and then a short run of independent
//! writes against the [`GuildStore`]. Nothing is wrapped in a transaction;
//! a failure halfway through leaves the earlier writes in place.

pub mod aggregate;
pub mod seed;

use std::sync::Arc;

use chrono::{Local, NaiveDate, Utc};
use futures::future::join_all;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::auth;
use crate::domain::deadline::DeadlineFilter;
use crate::domain::{
    AchievementLogEntry, AuditAction, AuditLogEntry, Difficulty, Member, NewQuest, Quest, QuestId,
    QuestPatch, QuestStatus, QuestWithMeta,
};
use crate::error::{GuildError, GuildResult};
use crate::events::{BoardEvent, EventBus};
use crate::store::GuildStore;

/// Input for posting a new quest.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuest {
    pub title: Option<String>,
    pub difficulty: Option<i64>,
    pub due_date: Option<NaiveDate>,
    pub detail: Option<String>,
}

/// Which lane to read, and how to narrow it by due date.
#[derive(Debug, Clone, Copy)]
pub struct LaneQuery {
    pub status: QuestStatus,
    pub deadline: DeadlineFilter,
    pub date: Option<NaiveDate>,
}

impl LaneQuery {
    pub fn lane(status: QuestStatus) -> Self {
        Self {
            status,
            deadline: DeadlineFilter::All,
            date: None,
        }
    }
}

/// The board service shared by every request handler.
pub struct QuestBoard {
    store: Arc<dyn GuildStore>,
    events: Arc<EventBus>,
}

impl QuestBoard {
    pub fn new(store: Arc<dyn GuildStore>, events: Arc<EventBus>) -> Self {
        Self { store, events }
    }

    pub fn store(&self) -> &dyn GuildStore {
        self.store.as_ref()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Resolve a bearer token to an approved member.
    pub async fn authenticate(&self, token: Option<&str>) -> GuildResult<Member> {
        auth::require_member(self.store(), token).await
    }

    /// Read one lane, relative to the local calendar date.
    pub async fn list(&self, query: LaneQuery, caller: &Member) -> GuildResult<Vec<QuestWithMeta>> {
        self.list_on(query, caller, Local::now().date_naive()).await
    }

    /// Read one lane as of `today`.
    ///
    /// The archival sweep runs first so that quests past retention drop out
    /// of the DONE lane on the same read. A failed sweep does not fail the read.
    pub async fn list_on(
        &self,
        query: LaneQuery,
        caller: &Member,
        today: NaiveDate,
    ) -> GuildResult<Vec<QuestWithMeta>> {
        self.sweep().await;

        let quests = self.store.lane(query.status).await?;
        let mut items = aggregate::with_meta(self.store(), quests, caller.id()).await?;
        query
            .deadline
            .retain(&mut items, today, query.date, |item| &item.quest);
        Ok(items)
    }

    /// Post a new quest at the bottom of the OPEN lane. Admins only.
    pub async fn create(&self, input: CreateQuest, caller: &Member) -> GuildResult<Quest> {
        auth::require_admin(caller, "only admins can post quests")?;

        let title = input
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| GuildError::bad_request("title is required"))?
            .to_string();
        let difficulty = match input.difficulty {
            None | Some(0) => return Err(GuildError::bad_request("difficulty is required")),
            Some(d) => Difficulty::clamped(d),
        };
        let detail = input
            .detail
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());

        let position = self
            .store
            .max_position(QuestStatus::Open)
            .await?
            .map_or(0, |max| max + 1);

        let quest = self
            .store
            .insert_quest(NewQuest {
                title,
                detail,
                difficulty,
                status: QuestStatus::Open,
                due_date: input.due_date,
                position,
                visual: seed::roll(),
                created_by: caller.id(),
            })
            .await?;

        self.events.emit(BoardEvent::QuestCreated {
            quest: quest.id,
            by: caller.id(),
            title: quest.title.clone(),
        });
        Ok(quest)
    }

    /// Claim a quest. The first claim moves an OPEN quest to DOING.
    pub async fn accept(&self, id: QuestId, caller: &Member) -> GuildResult<()> {
        let quest = self.existing(id).await?;
        if quest.status == QuestStatus::Done {
            return Err(GuildError::bad_request("quest is already done"));
        }
        if self.store.acceptance(id, caller.id()).await?.is_some() {
            return Err(GuildError::bad_request("quest already accepted"));
        }

        self.store.insert_acceptance(id, caller.id()).await?;
        if quest.status == QuestStatus::Open {
            self.store
                .update_quest(
                    id,
                    Some(QuestStatus::Open),
                    QuestPatch::status(QuestStatus::Doing),
                )
                .await?;
        }

        self.events.emit(BoardEvent::QuestAccepted {
            quest: id,
            by: caller.id(),
        });
        Ok(())
    }

    /// Drop the caller's claim. When the last claim goes, the quest goes back
    /// to OPEN.
    pub async fn unaccept(&self, id: QuestId, caller: &Member) -> GuildResult<()> {
        let quest = self.existing(id).await?;
        if quest.status == QuestStatus::Done {
            return Err(GuildError::bad_request("cannot unaccept a completed quest"));
        }

        let removed = self.store.delete_acceptance(id, caller.id()).await?;
        if removed == 0 {
            return Err(GuildError::bad_request("quest was not accepted by you"));
        }

        let remaining = self.store.count_acceptances(id).await?;
        let reopened_lane = remaining == 0;
        if reopened_lane {
            self.store
                .update_quest(id, None, QuestPatch::status(QuestStatus::Open))
                .await?;
        }

        self.store
            .append_audit(AuditLogEntry {
                quest_id: id,
                actor_id: caller.id(),
                action: AuditAction::Unaccepted,
                meta: None,
            })
            .await?;

        self.events.emit(BoardEvent::QuestUnaccepted {
            quest: id,
            by: caller.id(),
            reopened_lane,
        });
        Ok(())
    }

    /// Finish a DOING quest the caller has accepted and credit the XP.
    pub async fn complete(&self, id: QuestId, caller: &Member) -> GuildResult<()> {
        let quest = self.existing(id).await?;
        if quest.status != QuestStatus::Doing {
            return Err(GuildError::bad_request("quest is not in progress"));
        }
        if self.store.acceptance(id, caller.id()).await?.is_none() {
            return Err(GuildError::forbidden(
                "only a member who accepted the quest can complete it",
            ));
        }

        let changed = self
            .store
            .update_quest(
                id,
                Some(QuestStatus::Doing),
                QuestPatch::completed(caller.id(), Utc::now()),
            )
            .await?;
        if changed == 0 {
            debug!(quest = %id, "complete lost a race");
            return Err(GuildError::bad_request("quest is not in progress"));
        }

        let xp = quest.difficulty.xp();
        self.store.increment_xp(caller.id(), xp).await?;
        self.store
            .append_audit(AuditLogEntry {
                quest_id: id,
                actor_id: caller.id(),
                action: AuditAction::Completed,
                meta: Some(json!({ "xp": xp })),
            })
            .await?;
        self.store.insert_achievement(id, caller.id()).await?;

        self.events.emit(BoardEvent::QuestCompleted {
            quest: id,
            by: caller.id(),
            xp,
        });
        Ok(())
    }

    /// Take back a completion. Only the recorded completer may do this, and
    /// the XP they were credited is debited again.
    pub async fn reopen(&self, id: QuestId, caller: &Member) -> GuildResult<()> {
        let quest = self.existing(id).await?;
        if quest.status != QuestStatus::Done {
            return Err(GuildError::bad_request("quest is not done"));
        }
        if quest.completed_by != Some(caller.id()) {
            return Err(GuildError::forbidden(
                "only the member who completed the quest can reopen it",
            ));
        }

        let changed = self
            .store
            .update_quest(id, Some(QuestStatus::Done), QuestPatch::reopened())
            .await?;
        if changed == 0 {
            debug!(quest = %id, "reopen lost a race");
            return Err(GuildError::bad_request("quest is not done"));
        }

        let xp = quest.difficulty.xp();
        self.store.increment_xp(caller.id(), -xp).await?;
        self.store
            .append_audit(AuditLogEntry {
                quest_id: id,
                actor_id: caller.id(),
                action: AuditAction::Reopened,
                meta: Some(json!({ "xpDelta": -xp })),
            })
            .await?;
        self.store.delete_achievement(id, caller.id()).await?;

        self.events.emit(BoardEvent::QuestReopened {
            quest: id,
            by: caller.id(),
            xp,
        });
        Ok(())
    }

    /// Rewrite `position` for every listed quest to its index in `ordered`.
    ///
    /// Ids that are not in `status` are skipped by the status filter. The
    /// writes go out together; whichever reorder lands last wins.
    pub async fn reorder(
        &self,
        status: QuestStatus,
        ordered: &[QuestId],
        _caller: &Member,
    ) -> GuildResult<()> {
        if ordered.is_empty() {
            return Err(GuildError::bad_request("orderedIds must not be empty"));
        }

        let updates = ordered.iter().enumerate().map(|(index, id)| {
            self.store
                .update_quest(*id, Some(status), QuestPatch::position(index as i64))
        });
        for result in join_all(updates).await {
            result?;
        }

        self.events.emit(BoardEvent::LaneReordered {
            status,
            count: ordered.len(),
        });
        Ok(())
    }

    /// Archived quests, most recently archived first.
    pub async fn archive(&self, _caller: &Member) -> GuildResult<Vec<Quest>> {
        self.sweep().await;
        Ok(self.store.archived_quests().await?)
    }

    /// The achievement feed, newest first.
    pub async fn achievements(&self, _caller: &Member) -> GuildResult<Vec<AchievementLogEntry>> {
        Ok(self.store.achievements().await?)
    }

    /// Run the archival sweep, logging rather than surfacing failures.
    pub async fn sweep(&self) {
        if let Err(e) = self.store.archive_expired_done_quests().await {
            warn!(error = %format!("{e:#}"), "archival sweep failed");
        }
    }

    async fn existing(&self, id: QuestId) -> GuildResult<Quest> {
        self.store
            .quest(id)
            .await?
            .ok_or_else(|| GuildError::not_found("quest not found"))
    }
}
