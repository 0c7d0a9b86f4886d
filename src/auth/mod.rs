pub mod token;

use tracing::debug;

use crate::domain::{Member, MembershipStatus};
use crate::error::{GuildError, GuildResult};
use crate::store::GuildStore;

/// Resolve a bearer token to an approved member.
///
/// This is the gate in front of every board operation: no token or an
/// unknown token is `Unauthenticated`; a user without a profile, or whose
/// membership is not yet approved, is `Forbidden`.
pub async fn require_member(store: &dyn GuildStore, token: Option<&str>) -> GuildResult<Member> {
    let token = token.ok_or(GuildError::Unauthenticated)?;
    let user_id = store
        .resolve_token(token)
        .await?
        .ok_or(GuildError::Unauthenticated)?;

    match store.profile(user_id).await? {
        Some(profile) if profile.membership_status == MembershipStatus::Approved => {
            Ok(Member { profile })
        }
        other => {
            debug!(%user_id, status = ?other.map(|p| p.membership_status), "member not approved");
            Err(GuildError::forbidden("guild membership is awaiting approval"))
        }
    }
}

/// Refuse anyone who is not an ADMIN.
pub fn require_admin(member: &Member, message: &str) -> GuildResult<()> {
    if member.is_admin() {
        Ok(())
    } else {
        Err(GuildError::forbidden(message))
    }
}
