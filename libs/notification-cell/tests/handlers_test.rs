use std::sync::Arc;

use axum::body::Body;
use axum::Router;
use http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use notification_cell::models::Notification;
use notification_cell::router::notification_routes;
use notification_cell::services::{MemoryNotificationStore, NotificationStore};
use notification_cell::state::NotificationState;
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

struct TestApp {
    router: Router,
    secret: String,
    store: Arc<MemoryNotificationStore>,
}

fn test_app() -> TestApp {
    let test_config = TestConfig::default();
    let store = Arc::new(MemoryNotificationStore::new());
    let state = Arc::new(NotificationState::new(test_config.to_arc(), store.clone()));

    TestApp {
        router: notification_routes(state),
        secret: test_config.jwt_secret,
        store,
    }
}

impl TestApp {
    async fn get(&self, uri: &str, user: &TestUser) -> (StatusCode, Value) {
        self.send("GET", uri, user).await
    }

    async fn post(&self, uri: &str, user: &TestUser) -> (StatusCode, Value) {
        self.send("POST", uri, user).await
    }

    async fn send(&self, method: &str, uri: &str, user: &TestUser) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(
                "Authorization",
                JwtTestUtils::bearer_header(user, &self.secret),
            )
            .body(Body::empty())
            .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }
}

#[tokio::test]
async fn inbox_reports_unread_count() {
    let app = test_app();
    let user = TestUser::patient("pat@example.com");
    let user_id = user.user_uuid();

    app.store
        .insert(Notification::new(user_id, "One", "body", "appointment"))
        .await
        .unwrap();
    let read = app
        .store
        .insert(Notification::new(user_id, "Two", "body", "appointment"))
        .await
        .unwrap();
    app.store.mark_read(read.id, user_id).await.unwrap();
    // Someone else's mail stays out of the inbox.
    app.store
        .insert(Notification::new(Uuid::new_v4(), "Other", "body", "system"))
        .await
        .unwrap();

    let (status, body) = app.get("/", &user).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notifications"].as_array().unwrap().len(), 2);
    assert_eq!(body["unread_count"], 1);
}

#[tokio::test]
async fn marking_read_is_scoped_to_the_caller() {
    let app = test_app();
    let owner = TestUser::patient("owner@example.com");
    let stranger = TestUser::patient("stranger@example.com");

    let notification = app
        .store
        .insert(Notification::new(
            owner.user_uuid(),
            "Hello",
            "body",
            "system",
        ))
        .await
        .unwrap();

    let (status, _) = app
        .post(&format!("/{}/read", notification.id), &stranger)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .post(&format!("/{}/read", notification.id), &owner)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_read"], true);
}
