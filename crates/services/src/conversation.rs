//! # Conversations & Messages
//!
//! Direct messaging between friends. Conversation lookup and creation
//! are backend procedures; the pair-to-conversation mapping stays behind
//! the port. A chat history keeps its cache in step with the message
//! feed and marks incoming messages read while the conversation is open.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use domains::error::{AppError, Result};
use domains::models::{ChangeEvent, ChangeOp, Conversation, FeedInterest, FeedTable, Message};
use domains::traits::{ChangeFeed, ConversationRepo, FriendshipRepo, Identity, MessageRepo};

pub struct ConversationService {
    conversations: Arc<dyn ConversationRepo>,
    messages: Arc<dyn MessageRepo>,
    friendships: Arc<dyn FriendshipRepo>,
    identity: Arc<dyn Identity>,
    feed: Arc<dyn ChangeFeed>,
}

impl ConversationService {
    pub fn new(
        conversations: Arc<dyn ConversationRepo>,
        messages: Arc<dyn MessageRepo>,
        friendships: Arc<dyn FriendshipRepo>,
        identity: Arc<dyn Identity>,
        feed: Arc<dyn ChangeFeed>,
    ) -> Self {
        Self { conversations, messages, friendships, identity, feed }
    }

    /// Reuses the existing conversation between the actor and `other`,
    /// creating one only when the two are friends.
    pub async fn find_or_create(&self, other: Uuid) -> Result<Uuid> {
        let actor = self.identity.current_user().ok_or(AppError::Unauthenticated)?;
        if let Some(existing) = self
            .conversations
            .find_between(actor.id, other)
            .await
            .map_err(AppError::backend)?
        {
            return Ok(existing);
        }

        let friends = self
            .friendships
            .are_friends(actor.id, other)
            .await
            .map_err(AppError::backend)?;
        if !friends {
            return Err(AppError::Forbidden(
                "you must be friends to start a conversation".into(),
            ));
        }

        self.conversations
            .create_with_participants(actor.id, other)
            .await
            .map_err(AppError::backend)
    }

    /// The actor's conversations with last message, other participant,
    /// and unread count, as the backend's procedure hands them back.
    pub async fn conversations(&self) -> Result<Vec<Conversation>> {
        let actor = self.identity.current_user().ok_or(AppError::Unauthenticated)?;
        self.conversations
            .list_for_user(actor.id)
            .await
            .map_err(AppError::backend)
    }

    pub async fn send(&self, conversation: Uuid, content: &str) -> Result<Message> {
        let actor = self.identity.current_user().ok_or(AppError::Unauthenticated)?;
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::Validation("message content is required".into()));
        }
        self.messages
            .send(conversation, actor.id, content)
            .await
            .map_err(AppError::backend)
    }

    /// Loads a conversation's history, marks it read for the actor, and
    /// subscribes to its message events.
    pub async fn open(&self, conversation: Uuid) -> Result<ChatHistory> {
        let actor = self.identity.current_user().ok_or(AppError::Unauthenticated)?;
        let events = self
            .feed
            .subscribe(FeedInterest::scoped(FeedTable::Messages, conversation));
        let mut history = ChatHistory {
            conversations: self.conversations.clone(),
            messages: self.messages.clone(),
            reader: actor.id,
            conversation,
            items: Vec::new(),
            events,
        };
        history.reload().await?;
        Ok(history)
    }
}

/// One open conversation's cached message list.
pub struct ChatHistory {
    conversations: Arc<dyn ConversationRepo>,
    messages: Arc<dyn MessageRepo>,
    reader: Uuid,
    conversation: Uuid,
    items: Vec<Message>,
    events: broadcast::Receiver<ChangeEvent>,
}

impl ChatHistory {
    pub fn conversation(&self) -> Uuid {
        self.conversation
    }

    pub fn messages(&self) -> &[Message] {
        &self.items
    }

    /// Refetches the chronological history and marks it read.
    pub async fn reload(&mut self) -> Result<()> {
        self.items = self
            .messages
            .list(self.conversation)
            .await
            .map_err(AppError::backend)?;
        self.conversations
            .mark_read(self.conversation, self.reader)
            .await
            .map_err(AppError::backend)?;
        Ok(())
    }

    /// Drains queued message events. Incoming rows are appended and, when
    /// they are someone else's, marked read right away since the
    /// conversation is on screen.
    pub async fn pump(&mut self) -> Result<()> {
        loop {
            match self.events.try_recv() {
                Ok(event) => self.apply(event).await?,
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    debug!(conversation = %self.conversation, skipped, "message feed lagged, reloading");
                    self.reload().await?;
                }
                Err(_) => return Ok(()),
            }
        }
    }

    async fn apply(&mut self, event: ChangeEvent) -> Result<()> {
        if event.op != ChangeOp::Insert {
            return Ok(());
        }
        let Some(message) = self
            .messages
            .get(event.row_id)
            .await
            .map_err(AppError::backend)?
        else {
            return Ok(());
        };
        let from_other = message.sender.id != self.reader;
        self.items.push(message);
        if from_other {
            self.conversations
                .mark_read(self.conversation, self.reader)
                .await
                .map_err(AppError::backend)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::models::AuthUser;
    use domains::traits::{
        MockChangeFeed, MockConversationRepo, MockFriendshipRepo, MockIdentity, MockMessageRepo,
    };

    fn actor() -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            email: "deniz@hacettepe.edu.tr".into(),
            name: "Deniz".into(),
            university: "Hacettepe".into(),
        }
    }

    fn signed_in(user: AuthUser) -> Arc<MockIdentity> {
        let mut identity = MockIdentity::new();
        identity.expect_current_user().return_const(Some(user));
        Arc::new(identity)
    }

    fn service(
        conversations: MockConversationRepo,
        friendships: MockFriendshipRepo,
        identity: Arc<MockIdentity>,
    ) -> ConversationService {
        ConversationService::new(
            Arc::new(conversations),
            Arc::new(MockMessageRepo::new()),
            Arc::new(friendships),
            identity,
            Arc::new(MockChangeFeed::new()),
        )
    }

    #[tokio::test]
    async fn existing_conversations_are_reused_without_a_friend_check() {
        let existing = Uuid::new_v4();
        let mut conversations = MockConversationRepo::new();
        conversations
            .expect_find_between()
            .returning(move |_, _| Ok(Some(existing)));
        // No expectations on friendships: a check would panic the test.
        let service = service(conversations, MockFriendshipRepo::new(), signed_in(actor()));

        assert_eq!(service.find_or_create(Uuid::new_v4()).await.unwrap(), existing);
    }

    #[tokio::test]
    async fn strangers_cannot_open_a_conversation() {
        let mut conversations = MockConversationRepo::new();
        conversations.expect_find_between().returning(|_, _| Ok(None));
        let mut friendships = MockFriendshipRepo::new();
        friendships.expect_are_friends().returning(|_, _| Ok(false));
        let service = service(conversations, friendships, signed_in(actor()));

        let err = service.find_or_create(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn blank_messages_are_rejected() {
        let service = service(
            MockConversationRepo::new(),
            MockFriendshipRepo::new(),
            signed_in(actor()),
        );

        let err = service.send(Uuid::new_v4(), "  \n ").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
