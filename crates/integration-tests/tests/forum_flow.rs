//! Categories, topics, and reply threads over the in-memory backend,
//! including the change-feed path that keeps an open thread current.

use std::sync::Arc;

use domains::error::AppError;
use domains::models::{ForumRole, TopicSort};
use services::{ForumService, PermissionService, Session};
use storage_adapters::MemoryBackend;

struct World {
    backend: Arc<MemoryBackend>,
    session: Arc<Session>,
    forum: ForumService,
}

async fn signed_in_world() -> World {
    let backend = Arc::new(MemoryBackend::new());
    backend.seed_account("ada@metu.edu.tr", "correct-horse", "Ada", "ODTÜ");
    let session = Arc::new(Session::new(backend.clone()));
    session
        .sign_in("ada@metu.edu.tr", "correct-horse")
        .await
        .expect("seeded credentials");
    let forum = ForumService::new(
        backend.clone(),
        session.clone(),
        Arc::new(PermissionService::new(backend.clone())),
        backend.clone(),
    );
    World { backend, session, forum }
}

#[tokio::test]
async fn categories_come_back_in_display_order() {
    let world = signed_in_world().await;
    world.backend.seed_category("Second", 2, false);
    world.backend.seed_category("First", 1, false);

    let listed = world.forum.categories().await.unwrap();
    let names: Vec<_> = listed.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["First", "Second"]);
}

#[tokio::test]
async fn private_categories_need_a_moderator() {
    let world = signed_in_world().await;
    world.backend.seed_category("Public", 0, false);
    world.backend.seed_category("Staff room", 1, true);

    let listed = world.forum.categories().await.unwrap();
    assert_eq!(listed.len(), 1, "plain users only see public categories");

    let actor = domains::traits::Identity::current_user(world.session.as_ref()).unwrap();
    world.backend.set_role(actor.id, ForumRole::Moderator);
    let listed = world.forum.categories().await.unwrap();
    assert_eq!(listed.len(), 2);
}

#[tokio::test]
async fn topics_and_replies_round_trip() -> anyhow::Result<()> {
    let world = signed_in_world().await;
    let category = world.backend.seed_category("General", 0, false);

    let topic = world
        .forum
        .create_topic(category.id, "Study group", "Weekly calculus sessions?")
        .await?;
    let reply = world.forum.create_reply(topic.id, "Count me in").await?;
    assert_eq!(reply.topic_id, topic.id);

    let listed = world.forum.topics(TopicSort::Latest, Some(category.id)).await?;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].reply_count, 1);
    assert_eq!(listed[0].author.name, "Ada");
    Ok(())
}

#[tokio::test]
async fn locked_topics_reject_replies() {
    let world = signed_in_world().await;
    let category = world.backend.seed_category("General", 0, false);
    let author = world.backend.seed_profile("Bora", "İTÜ");
    let topic = world
        .backend
        .seed_topic(author.id, category.id, "Closed", "no more replies");
    world.backend.lock_topic(topic);

    let err = world.forum.create_reply(topic, "too late").await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn an_open_thread_picks_up_replies_from_the_feed() -> anyhow::Result<()> {
    let world = signed_in_world().await;
    let category = world.backend.seed_category("General", 0, false);
    let author = world.backend.seed_profile("Bora", "İTÜ");
    let topic = world
        .backend
        .seed_topic(author.id, category.id, "Hello", "first");

    let mut thread = world.forum.open_thread(topic).await?;
    assert!(thread.replies().is_empty());

    // Another student replies while the thread is on screen.
    world.backend.seed_reply(author.id, topic, "hoş geldin");
    thread.pump().await?;
    assert_eq!(thread.replies().len(), 1);
    assert_eq!(thread.replies()[0].content, "hoş geldin");
    Ok(())
}
