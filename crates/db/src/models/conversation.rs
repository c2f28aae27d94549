//! Conversation, participant and message models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use schoolnet_core::types::{DbId, Timestamp};

/// A row from the `conversations` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Conversation {
    pub id: DbId,
    pub conversation_type: String,
    pub active: bool,
    pub student_id: Option<DbId>,
    pub parent_id: Option<DbId>,
    pub counselor_id: Option<DbId>,
    pub tutor_id: Option<DbId>,
    pub last_message: Option<Timestamp>,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateConversation {
    pub conversation_type: String,
    pub student_id: Option<DbId>,
    pub parent_id: Option<DbId>,
    pub counselor_id: Option<DbId>,
    pub tutor_id: Option<DbId>,
}

/// A row from the `conversation_participants` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ConversationParticipant {
    pub id: DbId,
    pub conversation_id: DbId,
    pub notification_recipient_id: Option<DbId>,
    pub active: bool,
    pub phone_number: Option<String>,
    pub last_read: Timestamp,
    pub last_unread_message_notification: Option<Timestamp>,
    pub created_at: Timestamp,
}

/// Participant joined with its user and conversation, for the unread sweep.
#[derive(Debug, Clone, FromRow)]
pub struct UnreadCandidate {
    pub participant_id: DbId,
    pub conversation_id: DbId,
    pub conversation_type: String,
    pub last_message: Option<Timestamp>,
    pub active: bool,
    pub phone_number: Option<String>,
    pub last_read: Timestamp,
    pub last_unread_message_notification: Option<Timestamp>,
    pub user_id: DbId,
    pub role: String,
}

/// A row from the `messages` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Message {
    pub id: DbId,
    pub conversation_id: DbId,
    pub author_id: Option<DbId>,
    pub author_name: String,
    pub body: String,
    pub created_at: Timestamp,
}

/// Request body for posting a message.
#[derive(Debug, Clone, Deserialize)]
pub struct PostMessage {
    pub body: String,
}
