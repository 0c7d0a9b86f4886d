use std::collections::{BTreeSet, HashMap};

use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::domain::{Quest, QuestId, QuestWithMeta, UserId};
use crate::store::GuildStore;

/// Dress a lane's rows with acceptance counts and completer names.
///
/// Two batched lookups regardless of lane size: every acceptance for the
/// lane's quest ids, then display names for the distinct completers. An
/// empty lane makes no lookups at all.
pub async fn with_meta(
    store: &dyn GuildStore,
    quests: Vec<Quest>,
    viewer: UserId,
) -> Result<Vec<QuestWithMeta>> {
    if quests.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<QuestId> = quests.iter().map(|q| q.id).collect();
    let mut tally: HashMap<QuestId, (u64, Option<DateTime<Utc>>)> =
        ids.iter().map(|id| (*id, (0, None))).collect();

    for row in store.acceptances(&ids).await? {
        let Some((count, mine)) = tally.get_mut(&row.quest_id) else {
            continue;
        };
        *count += 1;
        if row.user_id == viewer {
            *mine = Some(row.accepted_at);
        }
    }

    let completers: Vec<UserId> = quests
        .iter()
        .filter_map(|q| q.completed_by)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let names: HashMap<UserId, String> = if completers.is_empty() {
        HashMap::new()
    } else {
        store.display_names(&completers).await?.into_iter().collect()
    };

    Ok(quests
        .into_iter()
        .map(|quest| {
            let (accepted_count, accepted_at_me) =
                tally.get(&quest.id).copied().unwrap_or((0, None));
            let completed_by_name = quest.completed_by.and_then(|id| names.get(&id).cloned());
            QuestWithMeta {
                quest,
                accepted_count,
                accepted_by_me: accepted_at_me.is_some(),
                accepted_at_me,
                completed_by_name,
            }
        })
        .collect())
}
