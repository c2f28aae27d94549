//! Repository for conversations, their participants and messages.

use sqlx::PgPool;
use schoolnet_core::types::{DbId, Timestamp};

use crate::models::conversation::{
    Conversation, ConversationParticipant, CreateConversation, Message, UnreadCandidate,
};

const COLUMNS: &str = "id, conversation_type, active, student_id, parent_id, counselor_id, \
                        tutor_id, last_message, created_at";

const PARTICIPANT_COLUMNS: &str = "id, conversation_id, notification_recipient_id, active, \
                                    phone_number, last_read, last_unread_message_notification, \
                                    created_at";

const MESSAGE_COLUMNS: &str = "id, conversation_id, author_id, author_name, body, created_at";

/// Provides CRUD operations for conversations.
pub struct ConversationRepo;

impl ConversationRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateConversation,
    ) -> Result<Conversation, sqlx::Error> {
        let query = format!(
            "INSERT INTO conversations
                (conversation_type, student_id, parent_id, counselor_id, tutor_id)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Conversation>(&query)
            .bind(&input.conversation_type)
            .bind(input.student_id)
            .bind(input.parent_id)
            .bind(input.counselor_id)
            .bind(input.tutor_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<Conversation>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM conversations WHERE id = $1");
        sqlx::query_as::<_, Conversation>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Participants
    // -----------------------------------------------------------------------

    /// Add a chat participant (no phone) or an SMS participant (with phone).
    pub async fn add_participant(
        pool: &PgPool,
        conversation_id: DbId,
        notification_recipient_id: DbId,
        phone_number: Option<&str>,
    ) -> Result<ConversationParticipant, sqlx::Error> {
        let query = format!(
            "INSERT INTO conversation_participants
                (conversation_id, notification_recipient_id, phone_number)
             VALUES ($1, $2, $3)
             RETURNING {PARTICIPANT_COLUMNS}"
        );
        sqlx::query_as::<_, ConversationParticipant>(&query)
            .bind(conversation_id)
            .bind(notification_recipient_id)
            .bind(phone_number)
            .fetch_one(pool)
            .await
    }

    pub async fn find_participant(
        pool: &PgPool,
        conversation_id: DbId,
        notification_recipient_id: DbId,
    ) -> Result<Option<ConversationParticipant>, sqlx::Error> {
        let query = format!(
            "SELECT {PARTICIPANT_COLUMNS} FROM conversation_participants
             WHERE conversation_id = $1 AND notification_recipient_id = $2"
        );
        sqlx::query_as::<_, ConversationParticipant>(&query)
            .bind(conversation_id)
            .bind(notification_recipient_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn mark_read(
        pool: &PgPool,
        participant_id: DbId,
        at: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE conversation_participants SET last_read = $2 WHERE id = $1")
                .bind(participant_id)
                .bind(at)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_last_unread_notice(
        pool: &PgPool,
        participant_id: DbId,
        at: Timestamp,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE conversation_participants SET last_unread_message_notification = $2
             WHERE id = $1",
        )
        .bind(participant_id)
        .bind(at)
        .execute(pool)
        .await?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Messages
    // -----------------------------------------------------------------------

    /// Store a message, bump the conversation's `last_message` and mark it
    /// read for its author.
    pub async fn post_message(
        pool: &PgPool,
        conversation_id: DbId,
        author_id: Option<DbId>,
        author_name: &str,
        body: &str,
    ) -> Result<Message, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO messages (conversation_id, author_id, author_name, body)
             VALUES ($1, $2, $3, $4)
             RETURNING {MESSAGE_COLUMNS}"
        );
        let message = sqlx::query_as::<_, Message>(&query)
            .bind(conversation_id)
            .bind(author_id)
            .bind(author_name)
            .bind(body)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query("UPDATE conversations SET last_message = $2 WHERE id = $1")
            .bind(conversation_id)
            .bind(message.created_at)
            .execute(&mut *tx)
            .await?;

        if let Some(author_id) = author_id {
            sqlx::query(
                "UPDATE conversation_participants p SET last_read = $3
                 FROM notification_recipients r
                 WHERE p.notification_recipient_id = r.id
                   AND p.conversation_id = $1 AND r.user_id = $2",
            )
            .bind(conversation_id)
            .bind(author_id)
            .bind(message.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(message)
    }

    /// Messages after `since` not written by `reader_user_id`, oldest first.
    pub async fn messages_since(
        pool: &PgPool,
        conversation_id: DbId,
        since: Timestamp,
        reader_user_id: DbId,
        limit: i64,
    ) -> Result<Vec<Message>, sqlx::Error> {
        let query = format!(
            "SELECT {MESSAGE_COLUMNS} FROM (
                SELECT {MESSAGE_COLUMNS} FROM messages
                WHERE conversation_id = $1 AND created_at > $2
                  AND author_id IS DISTINCT FROM $3
                ORDER BY created_at DESC, id DESC
                LIMIT $4
             ) recent
             ORDER BY created_at, id"
        );
        sqlx::query_as::<_, Message>(&query)
            .bind(conversation_id)
            .bind(since)
            .bind(reader_user_id)
            .bind(limit)
            .fetch_all(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Batch job queries
    // -----------------------------------------------------------------------

    /// Participants of active conversations whose last message predates
    /// `cutoff`, joined with their user.
    pub async fn unread_candidates(
        pool: &PgPool,
        cutoff: Timestamp,
    ) -> Result<Vec<UnreadCandidate>, sqlx::Error> {
        sqlx::query_as::<_, UnreadCandidate>(
            "SELECT p.id AS participant_id, c.id AS conversation_id, c.conversation_type,
                    c.last_message, p.active, p.phone_number, p.last_read,
                    p.last_unread_message_notification, u.id AS user_id, u.role
             FROM conversation_participants p
             JOIN conversations c ON c.id = p.conversation_id
             JOIN notification_recipients r ON r.id = p.notification_recipient_id
             JOIN users u ON u.id = r.user_id
             WHERE c.active = true AND c.last_message IS NOT NULL AND c.last_message < $1
               AND p.last_read < c.last_message
             ORDER BY p.id",
        )
        .bind(cutoff)
        .fetch_all(pool)
        .await
    }
}
