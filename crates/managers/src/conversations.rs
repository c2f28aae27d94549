//! Conversation display names, posting messages and read tracking.

use chrono::Utc;
use schoolnet_core::conversations::{conversation_with_name, ConversationContext};
use schoolnet_core::types::DbId;
use schoolnet_db::models::conversation::{Conversation, ConversationParticipant, Message};
use schoolnet_db::models::user::User;
use schoolnet_db::repositories::{
    ConversationRepo, CounselorRepo, NotificationRecipientRepo, ParentRepo, StudentRepo,
    TutorRepo, UserRepo,
};
use schoolnet_db::DbPool;

use crate::error::{ManagerError, ManagerResult};

/// Longest message body accepted.
pub const MAX_MESSAGE_LENGTH: usize = 4000;

pub struct ConversationManager {
    pool: DbPool,
}

impl ConversationManager {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn load(&self, conversation_id: DbId) -> ManagerResult<Conversation> {
        ConversationRepo::find_by_id(&self.pool, conversation_id)
            .await?
            .ok_or_else(|| ManagerError::not_found("Conversation", conversation_id))
    }

    async fn user_name(&self, user_id: DbId) -> ManagerResult<Option<String>> {
        Ok(UserRepo::find_by_id(&self.pool, user_id)
            .await?
            .map(|u| u.full_name()))
    }

    async fn counselor_name(&self, counselor_id: DbId) -> ManagerResult<Option<String>> {
        match CounselorRepo::find_by_id(&self.pool, counselor_id).await? {
            Some(c) => self.user_name(c.user_id).await,
            None => Ok(None),
        }
    }

    /// Resolve the names of everyone attached to a conversation.
    pub async fn context(&self, conversation: &Conversation) -> ManagerResult<ConversationContext> {
        let mut ctx = ConversationContext {
            conversation_type: conversation.conversation_type.clone(),
            ..Default::default()
        };

        let student = match conversation.student_id {
            Some(id) => StudentRepo::find_by_id(&self.pool, id).await?,
            None => None,
        };
        if let Some(student) = &student {
            ctx.student_name = self.user_name(student.user_id).await?;
            for tutor in TutorRepo::list_for_student(&self.pool, student.id).await? {
                if let Some(name) = self.user_name(tutor.user_id).await? {
                    ctx.student_tutor_names.push(name);
                }
            }
        }

        if let Some(parent_id) = conversation.parent_id {
            if let Some(parent) = ParentRepo::find_by_id(&self.pool, parent_id).await? {
                ctx.parent_name = self.user_name(parent.user_id).await?;
            }
        }

        let counselor_id = conversation
            .counselor_id
            .or_else(|| student.as_ref().and_then(|s| s.counselor_id));
        if let Some(counselor_id) = counselor_id {
            ctx.counselor_name = self.counselor_name(counselor_id).await?;
        }

        if let Some(tutor_id) = conversation.tutor_id {
            if let Some(tutor) = TutorRepo::find_by_id(&self.pool, tutor_id).await? {
                ctx.tutor_name = self.user_name(tutor.user_id).await?;
            }
        }

        Ok(ctx)
    }

    /// Who `viewer_role` is talking to in this conversation.
    pub async fn display_name(
        &self,
        conversation: &Conversation,
        viewer_role: &str,
    ) -> ManagerResult<String> {
        let ctx = self.context(conversation).await?;
        Ok(conversation_with_name(viewer_role, &ctx))
    }

    async fn participant(
        &self,
        conversation_id: DbId,
        user_id: DbId,
    ) -> ManagerResult<ConversationParticipant> {
        let recipient = NotificationRecipientRepo::find_by_user_id(&self.pool, user_id).await?;
        let participant = match recipient {
            Some(r) => ConversationRepo::find_participant(&self.pool, conversation_id, r.id).await?,
            None => None,
        };
        participant
            .filter(|p| p.active)
            .ok_or_else(|| ManagerError::forbidden("Not a participant in this conversation"))
    }

    /// Post a message as `author`, who must be an active participant.
    pub async fn post_message(
        &self,
        conversation_id: DbId,
        author: &User,
        body: &str,
    ) -> ManagerResult<Message> {
        let body = body.trim();
        if body.is_empty() {
            return Err(ManagerError::validation("Message body is empty"));
        }
        if body.len() > MAX_MESSAGE_LENGTH {
            return Err(ManagerError::validation(format!(
                "Message is longer than {MAX_MESSAGE_LENGTH} characters"
            )));
        }

        let conversation = self.load(conversation_id).await?;
        if !conversation.active {
            return Err(ManagerError::conflict("Conversation is closed"));
        }
        self.participant(conversation_id, author.id).await?;

        let message = ConversationRepo::post_message(
            &self.pool,
            conversation_id,
            Some(author.id),
            &author.full_name(),
            body,
        )
        .await?;
        tracing::debug!(conversation_id, message_id = message.id, "Message posted");
        Ok(message)
    }

    /// Mark everything in the conversation read for the user.
    pub async fn mark_read(
        &self,
        conversation_id: DbId,
        user_id: DbId,
    ) -> ManagerResult<ConversationParticipant> {
        self.load(conversation_id).await?;
        let participant = self.participant(conversation_id, user_id).await?;
        let now = Utc::now();
        ConversationRepo::mark_read(&self.pool, participant.id, now).await?;
        Ok(ConversationParticipant {
            last_read: now,
            ..participant
        })
    }
}
