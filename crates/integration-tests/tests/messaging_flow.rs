//! Direct messaging end to end: conversation reuse, the friends-only
//! rule, unread accounting, and the live history feed.

use std::sync::Arc;

use domains::error::AppError;
use services::{ConversationService, FriendshipService, GroupChatService, Session};
use storage_adapters::MemoryBackend;

struct World {
    backend: Arc<MemoryBackend>,
    session: Arc<Session>,
    conversations: ConversationService,
}

async fn signed_in_world() -> World {
    let backend = Arc::new(MemoryBackend::new());
    backend.seed_account("ada@metu.edu.tr", "correct-horse", "Ada", "ODTÜ");
    let session = Arc::new(Session::new(backend.clone()));
    session
        .sign_in("ada@metu.edu.tr", "correct-horse")
        .await
        .expect("seeded credentials");
    let conversations = ConversationService::new(
        backend.clone(),
        backend.clone(),
        backend.clone(),
        session.clone(),
        backend.clone(),
    );
    World { backend, session, conversations }
}

async fn befriend(world: &World, other: uuid::Uuid) {
    let friendships = FriendshipService::new(world.backend.clone(), world.session.clone());
    let request = friendships.send_request(other, None).await.unwrap();
    friendships.respond(request.id, true).await.unwrap();
}

#[tokio::test]
async fn strangers_cannot_start_a_conversation() {
    let world = signed_in_world().await;
    let stranger = world.backend.seed_profile("Umut", "Bilkent");

    let err = world.conversations.find_or_create(stranger.id).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn friends_get_one_conversation_reused() -> anyhow::Result<()> {
    let world = signed_in_world().await;
    let bora = world.backend.seed_profile("Bora", "İTÜ");
    befriend(&world, bora.id).await;

    let first = world.conversations.find_or_create(bora.id).await?;
    let second = world.conversations.find_or_create(bora.id).await?;
    assert_eq!(first, second);
    Ok(())
}

#[tokio::test]
async fn sending_and_listing_with_unread_counts() -> anyhow::Result<()> {
    use domains::traits::ConversationRepo;

    let world = signed_in_world().await;
    let bora = world.backend.seed_profile("Bora", "İTÜ");
    befriend(&world, bora.id).await;
    let conversation = world.conversations.find_or_create(bora.id).await?;

    world.conversations.send(conversation, "selam").await?;
    world.conversations.send(conversation, "müsait misin?").await?;

    // From Bora's side both messages are unread.
    let for_bora = world.backend.list_for_user(bora.id).await?;
    assert_eq!(for_bora[0].unread_count, 2);
    assert_eq!(for_bora[0].other_user.name, "Ada");
    assert_eq!(for_bora[0].last_message.as_ref().unwrap().content, "müsait misin?");

    // The sender has nothing unread.
    let mine = world.conversations.conversations().await?;
    assert_eq!(mine[0].unread_count, 0);
    Ok(())
}

#[tokio::test]
async fn an_open_history_appends_incoming_messages_and_marks_them_read() -> anyhow::Result<()> {
    use domains::traits::{ConversationRepo, MessageRepo};

    let world = signed_in_world().await;
    let bora = world.backend.seed_profile("Bora", "İTÜ");
    befriend(&world, bora.id).await;
    let conversation = world.conversations.find_or_create(bora.id).await?;

    let mut history = world.conversations.open(conversation).await?;
    assert!(history.messages().is_empty());

    // Bora writes while the conversation is on screen.
    MessageRepo::send(world.backend.as_ref(), conversation, bora.id, "naber?").await?;
    history.pump().await?;
    assert_eq!(history.messages().len(), 1);

    // Having the conversation open marked it read.
    let actor = domains::traits::Identity::current_user(world.session.as_ref()).unwrap();
    let listed = ConversationRepo::list_for_user(world.backend.as_ref(), actor.id).await?;
    assert_eq!(listed[0].unread_count, 0);
    Ok(())
}

#[tokio::test]
async fn group_creation_covers_the_initial_membership() -> anyhow::Result<()> {
    let world = signed_in_world().await;
    let bora = world.backend.seed_profile("Bora", "İTÜ");
    let ece = world.backend.seed_profile("Ece", "Koç");
    let groups = GroupChatService::new(world.backend.clone(), world.session.clone());

    let id = groups
        .create("Calculus crew", Some("weekly sessions"), &[bora.id])
        .await?;
    groups.add_members(id, &[ece.id]).await?;

    let listed = groups.list().await?;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].member_count, 3, "creator plus two invitees");
    assert_eq!(listed[0].description.as_deref(), Some("weekly sessions"));
    Ok(())
}

#[tokio::test]
async fn blank_messages_are_rejected_locally() {
    let world = signed_in_world().await;
    let err = world
        .conversations
        .send(uuid::Uuid::new_v4(), "   ")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}
