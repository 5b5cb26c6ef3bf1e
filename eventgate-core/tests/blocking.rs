//! Block relationships seen from both ends

use eventgate_core::storage::EventStore;
use eventgate_core::test_utils::{assert_conflict, assert_not_found, TestWorld};
use eventgate_core::{AccessError, ConflictKind, NotFoundKind, PrivacySettings, ViewerContext};

#[tokio::test]
async fn test_block_symmetry() {
    let mut world = TestWorld::new();
    let a = world.verified_user("a").user_id.unwrap();
    let b = world.verified_user("b").user_id.unwrap();

    world.service.block(a, b, None).await.unwrap();
    assert!(world.service.are_blocked(a, b).await.unwrap());
    assert!(world.service.are_blocked(b, a).await.unwrap());

    // The blocked side may add its own edge; that is a different ordered pair
    world.service.block(b, a, Some("mutual".into())).await.unwrap();
    assert_conflict(world.service.block(a, b, None).await, ConflictKind::AlreadyBlocked);

    world.service.unblock(a, b).await.unwrap();
    // b's edge keeps them apart
    assert!(world.service.are_blocked(a, b).await.unwrap());
    world.service.unblock(b, a).await.unwrap();
    assert!(!world.service.are_blocked(a, b).await.unwrap());
}

#[tokio::test]
async fn test_block_side_rules() {
    let mut world = TestWorld::new();
    let a = world.verified_user("a").user_id.unwrap();
    let b = world.verified_user("b").user_id.unwrap();

    assert!(matches!(
        world.service.block(a, a, None).await,
        Err(AccessError::InvalidRequest(_))
    ));
    assert_not_found(world.service.unblock(a, b).await, NotFoundKind::Block);
}

#[tokio::test]
async fn test_filter_by_blocks_preserves_order() {
    let mut world = TestWorld::new();
    let viewer = world.verified_user("viewer");
    let friend = world.verified_user("friend");
    let blocked = world.verified_user("blocked");
    let blocker = world.verified_user("blocker");

    let slugs = ["f1", "b1", "f2", "k1", "f3"];
    let owners = [&friend, &blocked, &friend, &blocker, &friend];
    let events: Vec<_> = slugs
        .iter()
        .zip(owners)
        .map(|(slug, owner)| {
            let id = world.event(owner, slug, None, PrivacySettings::default());
            world.store.event_by_id(id, None).unwrap().unwrap()
        })
        .collect();

    let viewer_id = viewer.user_id.unwrap();
    world
        .service
        .block(viewer_id, blocked.user_id.unwrap(), None)
        .await
        .unwrap();
    world
        .service
        .block(blocker.user_id.unwrap(), viewer_id, None)
        .await
        .unwrap();

    let kept: Vec<String> = world
        .service
        .filter_by_blocks(events.clone(), viewer)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.slug)
        .collect();
    assert_eq!(kept, vec!["f1", "f2", "f3"]);

    let untouched = world
        .service
        .filter_by_blocks(events.clone(), ViewerContext::anonymous())
        .await
        .unwrap();
    assert_eq!(untouched, events);

    // Nothing here is owned by the viewer, so the blocked user's listing is intact
    let from_blocked = world
        .service
        .filter_by_blocks(events, blocked)
        .await
        .unwrap();
    assert_eq!(from_blocked.len(), 5);
}

#[tokio::test]
async fn test_blocked_participants_disappear_from_roster() {
    let mut world = TestWorld::new();
    let host = world.verified_user("host");
    let viewer = world.verified_user("viewer");
    let troll = world.verified_user("troll");
    let event = world.event(&host, "party", None, PrivacySettings::default());

    world.service.join(event, viewer).await.unwrap();
    world.service.join(event, troll).await.unwrap();
    world
        .service
        .block(viewer.user_id.unwrap(), troll.user_id.unwrap(), Some("spam".into()))
        .await
        .unwrap();

    let roster = world.service.list_participants(event, viewer).await.unwrap();
    assert_eq!(roster.len(), 2);
    let filtered = world.service.filter_participants(roster, viewer).await.unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].user_id, viewer.user_id.unwrap());

    let listed = world.service.list_blocked(viewer.user_id.unwrap()).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].reason.as_deref(), Some("spam"));
}
