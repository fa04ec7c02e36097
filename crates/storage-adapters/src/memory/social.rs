//! Friendships, direct conversations, and group chats. The friendship
//! table enforces the unique pair constraint in both orientations, and
//! mutations raise the notifications the real backend creates through
//! triggers.

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use domains::error::StoreError;
use domains::models::{
    ChangeOp, Conversation, FeedTable, FriendStatus, Friendship, GroupChat, LastMessage, Message,
    NotificationData, NotificationKind, ReadReceipt,
};
use domains::traits::{ConversationRepo, FriendshipRepo, GroupChatRepo, MessageRepo};

use super::{FriendshipRow, GroupRow, MemoryBackend, MessageRow};

impl MemoryBackend {
    fn friendship_view(&self, row: &FriendshipRow) -> Result<Friendship, StoreError> {
        Ok(Friendship {
            id: row.id,
            sender: self.author_ref(row.sender_id)?,
            receiver: self.author_ref(row.receiver_id)?,
            status: row.status,
            message: row.message.clone(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    fn message_view(&self, row: &MessageRow) -> Result<Message, StoreError> {
        Ok(Message {
            id: row.id,
            conversation_id: row.conversation_id,
            sender: self.author_ref(row.sender_id)?,
            content: row.content.clone(),
            created_at: row.created_at,
            read_by: row.read_by.clone(),
        })
    }

    fn has_read(row: &MessageRow, user: Uuid) -> bool {
        row.read_by.iter().any(|r| r.profile_id == user)
    }
}

#[async_trait]
impl FriendshipRepo for MemoryBackend {
    async fn insert_request(
        &self,
        sender: Uuid,
        receiver: Uuid,
        message: Option<String>,
    ) -> Result<Friendship, StoreError> {
        if !self.profiles.contains_key(&receiver) {
            return Err(StoreError::MissingRow);
        }
        let pair_exists = self.friendships.iter().any(|row| {
            (row.sender_id == sender && row.receiver_id == receiver)
                || (row.sender_id == receiver && row.receiver_id == sender)
        });
        if pair_exists {
            return Err(StoreError::Duplicate);
        }

        let now = Utc::now();
        let row = FriendshipRow {
            id: Uuid::new_v4(),
            sender_id: sender,
            receiver_id: receiver,
            status: FriendStatus::Pending,
            message,
            created_at: now,
            updated_at: now,
        };
        let view = self.friendship_view(&row)?;
        self.friendships.insert(row.id, row);
        self.publish(ChangeOp::Insert, FeedTable::Friendships, view.id, Some(receiver));
        self.push_notification(
            receiver,
            NotificationKind::FriendRequest,
            NotificationData {
                friendship_id: Some(view.id),
                sender_id: Some(sender),
                sender_name: Some(view.sender.name.clone()),
                ..Default::default()
            },
        );
        Ok(view)
    }

    async fn set_status(&self, id: Uuid, status: FriendStatus) -> Result<(), StoreError> {
        let (sender_id, receiver_id) = {
            let mut row = self.friendships.get_mut(&id).ok_or(StoreError::MissingRow)?;
            row.status = status;
            row.updated_at = Utc::now();
            (row.sender_id, row.receiver_id)
        };
        self.publish(ChangeOp::Update, FeedTable::Friendships, id, Some(receiver_id));
        if status == FriendStatus::Accepted {
            let receiver = self.author_ref(receiver_id)?;
            self.push_notification(
                sender_id,
                NotificationKind::FriendRequestAccepted,
                NotificationData {
                    friendship_id: Some(id),
                    sender_id: Some(receiver_id),
                    sender_name: Some(receiver.name),
                    ..Default::default()
                },
            );
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let (removed, row) = self.friendships.remove(&id).ok_or(StoreError::MissingRow)?;
        self.publish(ChangeOp::Delete, FeedTable::Friendships, removed, Some(row.receiver_id));
        Ok(())
    }

    async fn accepted_for(&self, profile: Uuid) -> Result<Vec<Friendship>, StoreError> {
        let mut views = Vec::new();
        for row in self.friendships.iter() {
            if row.status == FriendStatus::Accepted
                && (row.sender_id == profile || row.receiver_id == profile)
            {
                views.push(self.friendship_view(&row)?);
            }
        }
        views.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(views)
    }

    async fn pending_received(&self, user: Uuid) -> Result<Vec<Friendship>, StoreError> {
        let mut views = Vec::new();
        for row in self.friendships.iter() {
            if row.status == FriendStatus::Pending && row.receiver_id == user {
                views.push(self.friendship_view(&row)?);
            }
        }
        views.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(views)
    }

    async fn pending_sent(&self, user: Uuid) -> Result<Vec<Friendship>, StoreError> {
        let mut views = Vec::new();
        for row in self.friendships.iter() {
            if row.status == FriendStatus::Pending && row.sender_id == user {
                views.push(self.friendship_view(&row)?);
            }
        }
        views.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(views)
    }

    async fn are_friends(&self, a: Uuid, b: Uuid) -> Result<bool, StoreError> {
        Ok(self.friendships.iter().any(|row| {
            row.status == FriendStatus::Accepted
                && ((row.sender_id == a && row.receiver_id == b)
                    || (row.sender_id == b && row.receiver_id == a))
        }))
    }
}

#[async_trait]
impl ConversationRepo for MemoryBackend {
    async fn find_between(&self, a: Uuid, b: Uuid) -> Result<Option<Uuid>, StoreError> {
        Ok(self
            .conversations
            .iter()
            .find(|entry| {
                let [x, y] = *entry.value();
                (x == a && y == b) || (x == b && y == a)
            })
            .map(|entry| *entry.key()))
    }

    async fn create_with_participants(&self, a: Uuid, b: Uuid) -> Result<Uuid, StoreError> {
        if !self.profiles.contains_key(&a) || !self.profiles.contains_key(&b) {
            return Err(StoreError::MissingRow);
        }
        let id = Uuid::new_v4();
        self.conversations.insert(id, [a, b]);
        Ok(id)
    }

    async fn list_for_user(&self, user: Uuid) -> Result<Vec<Conversation>, StoreError> {
        let mut summaries = Vec::new();
        for entry in self.conversations.iter() {
            let [a, b] = *entry.value();
            if a != user && b != user {
                continue;
            }
            let other = if a == user { b } else { a };
            let id = *entry.key();

            let mut last: Option<LastMessage> = None;
            let mut unread = 0u32;
            for row in self.messages.iter() {
                if row.conversation_id != id {
                    continue;
                }
                if row.sender_id != user && !Self::has_read(&row, user) {
                    unread += 1;
                }
                if last.as_ref().is_none_or(|l| row.created_at > l.created_at) {
                    last = Some(LastMessage {
                        content: row.content.clone(),
                        created_at: row.created_at,
                        sender_id: row.sender_id,
                    });
                }
            }
            summaries.push(Conversation {
                id,
                other_user: self.author_ref(other)?,
                last_message: last,
                unread_count: unread,
            });
        }
        // Most recently active first; empty conversations trail.
        summaries.sort_by(|a, b| {
            let stamp = |c: &Conversation| c.last_message.as_ref().map(|m| m.created_at);
            stamp(b).cmp(&stamp(a))
        });
        Ok(summaries)
    }

    async fn mark_read(&self, conversation: Uuid, user: Uuid) -> Result<(), StoreError> {
        if !self.conversations.contains_key(&conversation) {
            return Err(StoreError::MissingRow);
        }
        let now = Utc::now();
        for mut row in self.messages.iter_mut() {
            if row.conversation_id == conversation
                && row.sender_id != user
                && !Self::has_read(&row, user)
            {
                row.read_by.push(ReadReceipt { profile_id: user, read_at: now });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl MessageRepo for MemoryBackend {
    async fn list(&self, conversation: Uuid) -> Result<Vec<Message>, StoreError> {
        let mut views = Vec::new();
        for row in self.messages.iter() {
            if row.conversation_id == conversation {
                views.push(self.message_view(&row)?);
            }
        }
        views.sort_by_key(|m| m.created_at);
        Ok(views)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Message>, StoreError> {
        match self.messages.get(&id) {
            Some(row) => Ok(Some(self.message_view(&row)?)),
            None => Ok(None),
        }
    }

    async fn send(
        &self,
        conversation: Uuid,
        sender: Uuid,
        content: &str,
    ) -> Result<Message, StoreError> {
        let participants = *self
            .conversations
            .get(&conversation)
            .ok_or(StoreError::MissingRow)?;
        if !participants.contains(&sender) {
            return Err(StoreError::Denied);
        }

        let now = Utc::now();
        let row = MessageRow {
            id: Uuid::new_v4(),
            conversation_id: conversation,
            sender_id: sender,
            content: content.to_string(),
            created_at: now,
            // The sender has read their own message.
            read_by: vec![ReadReceipt { profile_id: sender, read_at: now }],
        };
        let view = self.message_view(&row)?;
        self.messages.insert(row.id, row);
        self.publish(ChangeOp::Insert, FeedTable::Messages, view.id, Some(conversation));

        let recipient = if participants[0] == sender { participants[1] } else { participants[0] };
        self.push_notification(
            recipient,
            NotificationKind::Message,
            NotificationData {
                message_id: Some(view.id),
                conversation_id: Some(conversation),
                sender_id: Some(sender),
                sender_name: Some(view.sender.name.clone()),
                content: Some(view.content.clone()),
                ..Default::default()
            },
        );
        Ok(view)
    }
}

#[async_trait]
impl GroupChatRepo for MemoryBackend {
    async fn create<'a>(
        &'a self,
        name: &'a str,
        description: Option<&'a str>,
        creator: Uuid,
        members: &'a [Uuid],
    ) -> Result<Uuid, StoreError> {
        let mut member_ids = vec![creator];
        for member in members {
            if !self.profiles.contains_key(member) {
                return Err(StoreError::MissingRow);
            }
            if !member_ids.contains(member) {
                member_ids.push(*member);
            }
        }
        let row = GroupRow {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: description.map(str::to_string),
            member_ids,
            created_at: Utc::now(),
        };
        let id = row.id;
        self.groups.insert(id, row);
        self.publish(ChangeOp::Insert, FeedTable::GroupChats, id, None);
        Ok(id)
    }

    async fn list(&self) -> Result<Vec<GroupChat>, StoreError> {
        let mut views: Vec<GroupChat> = self
            .groups
            .iter()
            .map(|row| GroupChat {
                id: row.id,
                name: row.name.clone(),
                description: row.description.clone(),
                member_count: row.member_ids.len() as u32,
                last_message: None,
            })
            .collect();
        views.sort_by_key(|g| g.name.clone());
        Ok(views)
    }

    async fn add_members(&self, group: Uuid, members: &[Uuid]) -> Result<(), StoreError> {
        for member in members {
            if !self.profiles.contains_key(member) {
                return Err(StoreError::MissingRow);
            }
        }
        {
            let mut row = self.groups.get_mut(&group).ok_or(StoreError::MissingRow)?;
            for member in members {
                if !row.member_ids.contains(member) {
                    row.member_ids.push(*member);
                }
            }
        }
        self.publish(ChangeOp::Update, FeedTable::GroupChats, group, None);
        Ok(())
    }
}
