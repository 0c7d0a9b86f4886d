//! Board vocabulary: quests, lanes, members and the logs written around them.
//!
//! Every enum serializes as its upper-case tag (`"OPEN"`, `"ADMIN"`, ...) and
//! every struct in snake_case, which is also the column naming used by both
//! store backends.

pub mod deadline;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::consts::XP_BY_DIFFICULTY;

pub type QuestId = Uuid;
pub type UserId = Uuid;

/// A tag string that does not name any variant of the target enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value:?}")]
pub struct UnknownTag {
    pub kind: &'static str,
    pub value: String,
}

/// Implements `as_str`, `Display` and `FromStr` over the serde tags.
macro_rules! tags {
    ($ty:ident, $kind:literal, { $($variant:ident => $tag:literal),+ $(,)? }) => {
        impl $ty {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $tag,)+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = UnknownTag;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($tag => Ok(Self::$variant),)+
                    other => Err(UnknownTag {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

/// The lane a quest sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QuestStatus {
    Open,
    Doing,
    Done,
}

tags!(QuestStatus, "quest status", {
    Open => "OPEN",
    Doing => "DOING",
    Done => "DONE",
});

impl QuestStatus {
    pub const ALL: [QuestStatus; 3] = [QuestStatus::Open, QuestStatus::Doing, QuestStatus::Done];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MembershipStatus {
    Pending,
    Approved,
    Rejected,
}

tags!(MembershipStatus, "membership status", {
    Pending => "PENDING",
    Approved => "APPROVED",
    Rejected => "REJECTED",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GuildRole {
    Admin,
    Member,
}

tags!(GuildRole, "guild role", {
    Admin => "ADMIN",
    Member => "MEMBER",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PinVariant {
    Iron,
    Nail,
    RedPushpin,
}

tags!(PinVariant, "pin variant", {
    Iron => "IRON",
    Nail => "NAIL",
    RedPushpin => "RED_PUSHPIN",
});

impl PinVariant {
    pub const ALL: [PinVariant; 3] = [PinVariant::Iron, PinVariant::Nail, PinVariant::RedPushpin];
}

/// What an audit row records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AuditAction {
    Completed,
    Reopened,
    Unaccepted,
}

tags!(AuditAction, "audit action", {
    Completed => "COMPLETED",
    Reopened => "REOPENED",
    Unaccepted => "UNACCEPTED",
});

/// Quest difficulty, always within 1..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Difficulty(u8);

impl Difficulty {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// Pull any integer into range: `<= 1` becomes 1, `>= 5` becomes 5.
    pub fn clamped(value: i64) -> Self {
        Self(value.clamp(Self::MIN as i64, Self::MAX as i64) as u8)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// XP credited on completion (and debited on reopen).
    pub fn xp(self) -> i64 {
        XP_BY_DIFFICULTY[usize::from(self.0 - 1)]
    }
}

impl TryFrom<u8> for Difficulty {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(format!("difficulty must be within 1..=5, got {value}"))
        }
    }
}

impl From<Difficulty> for u8 {
    fn from(value: Difficulty) -> Self {
        value.0
    }
}

/// Cosmetic placement of a quest card. Rolled once at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualSeed {
    pub parchment_variant: u8,
    pub pin_variant: PinVariant,
    pub pin_offset_px: i8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quest {
    pub id: QuestId,
    pub title: String,
    pub detail: Option<String>,
    pub difficulty: Difficulty,
    pub status: QuestStatus,
    pub due_date: Option<NaiveDate>,
    pub position: i64,
    #[serde(flatten)]
    pub visual: VisualSeed,
    pub created_by: UserId,
    pub completed_by: Option<UserId>,
    pub completed_at: Option<DateTime<Utc>>,
    pub archived_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A quest row as rendered in a lane, with the per-caller acceptance view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestWithMeta {
    #[serde(flatten)]
    pub quest: Quest,
    pub accepted_count: u64,
    pub accepted_by_me: bool,
    pub accepted_at_me: Option<DateTime<Utc>>,
    pub completed_by_name: Option<String>,
}

/// Insert payload for a brand-new quest. The store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewQuest {
    pub title: String,
    pub detail: Option<String>,
    pub difficulty: Difficulty,
    pub status: QuestStatus,
    pub due_date: Option<NaiveDate>,
    pub position: i64,
    #[serde(flatten)]
    pub visual: VisualSeed,
    pub created_by: UserId,
}

/// Column changes for a quest update. `None` leaves a column untouched;
/// `Some(None)` writes NULL.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QuestPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<QuestStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_by: Option<Option<UserId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<Option<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived_at: Option<Option<DateTime<Utc>>>,
}

impl QuestPatch {
    pub fn status(status: QuestStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn position(position: i64) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }

    pub fn completed(by: UserId, at: DateTime<Utc>) -> Self {
        Self {
            status: Some(QuestStatus::Done),
            completed_by: Some(Some(by)),
            completed_at: Some(Some(at)),
            ..Self::default()
        }
    }

    /// Back to DOING with every completion marker cleared.
    pub fn reopened() -> Self {
        Self {
            status: Some(QuestStatus::Doing),
            completed_by: Some(None),
            completed_at: Some(None),
            archived_at: Some(None),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A member's claim on a quest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acceptance {
    pub quest_id: QuestId,
    pub user_id: UserId,
    pub accepted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub quest_id: QuestId,
    pub actor_id: UserId,
    pub action: AuditAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AchievementLogEntry {
    pub id: Uuid,
    pub quest_id: QuestId,
    pub quest_title: Option<String>,
    pub actor_id: UserId,
    pub actor_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub display_name: String,
    pub role: GuildRole,
    pub membership_status: MembershipStatus,
    pub total_xp: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn is_admin(&self) -> bool {
        self.role == GuildRole::Admin
    }
}

/// The slice of a PENDING profile shown in the approval panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingMember {
    pub id: UserId,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

/// An authenticated, approved caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub profile: UserProfile,
}

impl Member {
    pub fn id(&self) -> UserId {
        self.profile.id
    }

    pub fn is_admin(&self) -> bool {
        self.profile.is_admin()
    }
}
