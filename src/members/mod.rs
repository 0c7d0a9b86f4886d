use crate::auth::require_admin;
use crate::domain::{Member, MembershipStatus, PendingMember, UserId, UserProfile};
use crate::error::{GuildError, GuildResult};
use crate::events::{BoardEvent, EventBus};
use crate::store::GuildStore;

/// Profiles waiting for a decision, oldest first. Admins only.
pub async fn list_pending(store: &dyn GuildStore, caller: &Member) -> GuildResult<Vec<PendingMember>> {
    require_admin(caller, "only admins can review members")?;
    Ok(store.pending_members().await?)
}

/// Approve or reject a member. Admins only.
pub async fn set_status(
    store: &dyn GuildStore,
    events: &EventBus,
    member: UserId,
    status: MembershipStatus,
    caller: &Member,
) -> GuildResult<()> {
    require_admin(caller, "only admins can review members")?;
    if status == MembershipStatus::Pending {
        return Err(GuildError::bad_request("status must be APPROVED or REJECTED"));
    }

    if store.set_membership_status(member, status).await? == 0 {
        return Err(GuildError::not_found("member not found"));
    }

    events.emit(BoardEvent::MembershipDecided {
        member,
        status,
        by: caller.id(),
    });
    Ok(())
}

/// The caller's own profile, freshly read so XP reflects the latest writes.
pub async fn me(store: &dyn GuildStore, caller: &Member) -> GuildResult<UserProfile> {
    store
        .profile(caller.id())
        .await?
        .ok_or_else(|| GuildError::not_found("profile not found"))
}
