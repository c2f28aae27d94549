//! Email digests of chat messages a participant has not read.

use schoolnet_core::conversations::{participant_needs_unread_notice, ParticipantState};
use schoolnet_core::notification_types as types;
use schoolnet_core::reminders::{unread_message_cutoff, MAX_UNREAD_MESSAGES};
use schoolnet_core::types::{DbId, Timestamp};
use schoolnet_db::models::conversation::UnreadCandidate;
use schoolnet_db::repositories::ConversationRepo;
use schoolnet_events::NewNotification;
use schoolnet_managers::ConversationManager;
use serde_json::json;

use super::{JobContext, JobResult};

/// Notify participants about messages that have sat unread for a few
/// minutes. Each participant hears about a given message at most once.
/// Returns participant ids.
pub async fn unread_messages(ctx: &JobContext, now: Timestamp) -> JobResult<Vec<DbId>> {
    let pool = ctx.pool();
    let conversations = ConversationManager::new(pool.clone());
    let mut sent = Vec::new();

    for candidate in ConversationRepo::unread_candidates(pool, unread_message_cutoff(now)).await? {
        let state = ParticipantState {
            active: candidate.active,
            phone_number: candidate.phone_number.clone(),
            last_unread_message_notification: candidate.last_unread_message_notification,
            viewer_role: candidate.role.clone(),
        };
        if !participant_needs_unread_notice(
            &state,
            &candidate.conversation_type,
            candidate.last_message,
            now,
        ) {
            continue;
        }
        match notify(ctx, &conversations, &candidate, now).await {
            Ok(true) => sent.push(candidate.participant_id),
            Ok(false) => {}
            Err(e) => tracing::error!(
                participant_id = candidate.participant_id,
                conversation_id = candidate.conversation_id,
                error = %e,
                "Failed to send unread messages notice"
            ),
        }
    }

    if !sent.is_empty() {
        tracing::info!(count = sent.len(), "Sent unread message notices");
    }
    Ok(sent)
}

async fn notify(
    ctx: &JobContext,
    conversations: &ConversationManager,
    candidate: &UnreadCandidate,
    now: Timestamp,
) -> JobResult<bool> {
    let pool = ctx.pool();
    // Only messages the participant has neither read nor been told about.
    let since = candidate
        .last_unread_message_notification
        .map_or(candidate.last_read, |n| n.max(candidate.last_read));
    let messages = ConversationRepo::messages_since(
        pool,
        candidate.conversation_id,
        since,
        candidate.user_id,
        MAX_UNREAD_MESSAGES as i64,
    )
    .await?;
    if messages.is_empty() {
        return Ok(false);
    }

    let Some(conversation) = ConversationRepo::find_by_id(pool, candidate.conversation_id).await? else {
        return Ok(false);
    };
    let name = conversations.display_name(&conversation, &candidate.role).await?;
    let lines: Vec<String> = messages
        .iter()
        .map(|m| format!("{}: {}", m.author_name, m.body))
        .collect();

    ctx.notifier
        .create(
            NewNotification::new(types::UNREAD_MESSAGES)
                .to_user(candidate.user_id)
                .related("conversation_participant", candidate.participant_id)
                .args(json!({"name": name, "count": lines.len(), "messages": lines})),
        )
        .await?;
    ConversationRepo::set_last_unread_notice(pool, candidate.participant_id, now).await?;
    Ok(true)
}
