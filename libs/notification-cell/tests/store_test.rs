use std::sync::Arc;

use assert_matches::assert_matches;
use uuid::Uuid;

use notification_cell::models::{Notification, NotificationError};
use notification_cell::services::{
    MemoryNotificationStore, NotificationStore, Notifier, StoreNotifier,
};

#[tokio::test]
async fn listing_is_scoped_to_the_user_and_newest_first() {
    let store = MemoryNotificationStore::new();
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();

    let first = Notification::new(alice, "First", "body", "system");
    let mut second = Notification::new(alice, "Second", "body", "system");
    second.created_at = first.created_at + chrono::Duration::seconds(5);

    store.insert(first).await.unwrap();
    store.insert(second).await.unwrap();
    store
        .insert(Notification::new(bob, "Other", "body", "system"))
        .await
        .unwrap();

    let inbox = store.list_for_user(alice).await.unwrap();
    assert_eq!(inbox.len(), 2);
    assert_eq!(inbox[0].title, "Second");
    assert_eq!(inbox[1].title, "First");
}

#[tokio::test]
async fn mark_read_requires_ownership() {
    let store = MemoryNotificationStore::new();
    let owner = Uuid::new_v4();
    let stranger = Uuid::new_v4();

    let notification = store
        .insert(Notification::new(owner, "Hello", "body", "system"))
        .await
        .unwrap();

    assert_matches!(
        store.mark_read(notification.id, stranger).await,
        Err(NotificationError::NotFound)
    );

    let read = store.mark_read(notification.id, owner).await.unwrap();
    assert!(read.is_read);
}

#[tokio::test]
async fn store_notifier_lands_in_the_inbox() {
    let store = Arc::new(MemoryNotificationStore::new());
    let notifier = StoreNotifier::new(store.clone());
    let user = Uuid::new_v4();

    notifier
        .notify(user, "Appointment booked", "Tomorrow at 10:00", "appointment")
        .await
        .unwrap();

    let inbox = store.list_for_user(user).await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].category, "appointment");
    assert!(!inbox[0].is_read);
}

#[tokio::test]
async fn purge_removes_only_old_read_notifications() {
    let store = MemoryNotificationStore::new();
    let user = Uuid::new_v4();
    let now = chrono::Utc::now();

    let mut old_read = Notification::new(user, "Old read", "body", "system");
    old_read.is_read = true;
    old_read.created_at = now - chrono::Duration::days(40);

    let mut old_unread = Notification::new(user, "Old unread", "body", "system");
    old_unread.created_at = now - chrono::Duration::days(40);

    let mut recent_read = Notification::new(user, "Recent read", "body", "system");
    recent_read.is_read = true;

    store.insert(old_read).await.unwrap();
    store.insert(old_unread).await.unwrap();
    store.insert(recent_read).await.unwrap();

    let cutoff = now - chrono::Duration::days(30);
    let purged = store.purge_read_older_than(cutoff).await.unwrap();
    assert_eq!(purged, 1);

    let inbox = store.list_for_user(user).await.unwrap();
    assert_eq!(inbox.len(), 2);
    assert!(inbox.iter().all(|n| n.title != "Old read"));
}
