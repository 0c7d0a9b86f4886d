use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use guildboard::domain::{GuildRole, MembershipStatus, UserProfile};
use guildboard::events::EventBus;
use guildboard::quests::QuestBoard;
use guildboard::server::router;
use guildboard::store::GuildStore;
use guildboard::store::sqlite::SqliteStore;

struct App {
    router: Router,
    store: Arc<SqliteStore>,
    admin: String,
}

impl App {
    fn new() -> Self {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let board = Arc::new(QuestBoard::new(store.clone(), Arc::new(EventBus::default())));
        let admin = store
            .add_member("Guildmaster", GuildRole::Admin, MembershipStatus::Approved)
            .unwrap();
        let admin = store.issue_token(admin.id).unwrap();
        Self {
            router: router(board),
            store,
            admin,
        }
    }

    fn member(&self, name: &str, status: MembershipStatus) -> (UserProfile, String) {
        let profile = self
            .store
            .add_member(name, GuildRole::Member, status)
            .unwrap();
        let token = self.store.issue_token(profile.id).unwrap();
        (profile, token)
    }

    async fn call(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };

        let resp = self.router.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.call("GET", uri, Some(token), None).await
    }

    async fn post(&self, uri: &str, token: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.call("POST", uri, Some(token), body).await
    }

    async fn create(&self, title: &str, difficulty: i64) -> String {
        let (status, body) = self
            .post(
                "/api/quests",
                &self.admin,
                Some(json!({ "title": title, "difficulty": difficulty, "dueDate": "2026-11-01" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn health_needs_no_token() {
    let app = App::new();
    let (status, body) = app.call("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true }));
}

#[tokio::test]
async fn missing_token_is_401() {
    let app = App::new();
    let (status, body) = app.call("GET", "/api/quests?status=OPEN", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "unauthenticated");
}

#[tokio::test]
async fn pending_member_is_403() {
    let app = App::new();
    let (_, token) = app.member("Hopeful", MembershipStatus::Pending);
    let (status, body) = app.get("/api/quests?status=OPEN", &token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn list_requires_valid_status() {
    let app = App::new();
    let (status, body) = app.get("/api/quests", &app.admin).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "status is required");

    let (status, _) = app.get("/api/quests?status=LATER", &app.admin).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_and_list_round_trip() {
    let app = App::new();
    let id = app.create("Clear the cellar", 2).await;

    let (status, body) = app.get("/api/quests?status=OPEN", &app.admin).await;
    assert_eq!(status, StatusCode::OK);
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["id"], id);
    assert_eq!(items[0]["title"], "Clear the cellar");
    assert_eq!(items[0]["difficulty"], 2);
    assert_eq!(items[0]["status"], "OPEN");
    assert_eq!(items[0]["due_date"], "2026-11-01");
    assert_eq!(items[0]["accepted_count"], 0);
    assert_eq!(items[0]["accepted_by_me"], false);
}

#[tokio::test]
async fn create_is_admin_only() {
    let app = App::new();
    let (_, token) = app.member("Squire", MembershipStatus::Approved);
    let (status, _) = app
        .post(
            "/api/quests",
            &token,
            Some(json!({ "title": "Sneaky", "difficulty": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn malformed_json_is_400() {
    let app = App::new();
    let req = Request::builder()
        .method("POST")
        .uri("/api/quests")
        .header(header::AUTHORIZATION, format!("Bearer {}", app.admin))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let resp = app.router.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bad_quest_id_is_400_and_unknown_is_404() {
    let app = App::new();
    let (status, _) = app.post("/api/quests/not-a-uuid/accept", &app.admin, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let unknown = format!("/api/quests/{}/accept", uuid::Uuid::new_v4());
    let (status, body) = app.post(&unknown, &app.admin, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "quest not found");
}

#[tokio::test]
async fn full_lifecycle_over_http() {
    let app = App::new();
    let (aria, token) = app.member("Aria", MembershipStatus::Approved);
    let id = app.create("Hunt the wyvern", 5).await;

    let (status, body) = app.post(&format!("/api/quests/{id}/accept"), &token, None).await;
    assert_eq!((status, body), (StatusCode::OK, json!({ "ok": true })));

    let (_, body) = app.get("/api/quests?status=DOING", &token).await;
    assert_eq!(body["items"][0]["accepted_by_me"], true);
    assert_eq!(body["items"][0]["accepted_count"], 1);

    let (status, _) = app.post(&format!("/api/quests/{id}/complete"), &token, None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, me) = app.get("/api/me", &token).await;
    assert_eq!(me["total_xp"], 50);
    assert_eq!(me["display_name"], "Aria");

    let (_, body) = app.get("/api/quests?status=DONE", &token).await;
    assert_eq!(body["items"][0]["completed_by_name"], "Aria");

    let (_, feed) = app.get("/api/achievements", &token).await;
    assert_eq!(feed["items"][0]["actor_name"], "Aria");

    let (status, _) = app.post(&format!("/api/quests/{id}/reopen"), &token, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        app.store.profile(aria.id).await.unwrap().unwrap().total_xp,
        0
    );

    let (status, _) = app.post(&format!("/api/quests/{id}/unaccept"), &token, None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = app.get("/api/quests?status=OPEN", &token).await;
    assert_eq!(body["items"][0]["id"], id);
}

#[tokio::test]
async fn complete_by_stranger_is_403() {
    let app = App::new();
    let (_, aria) = app.member("Aria", MembershipStatus::Approved);
    let (_, bram) = app.member("Bram", MembershipStatus::Approved);
    let id = app.create("Guard duty", 1).await;

    app.post(&format!("/api/quests/{id}/accept"), &aria, None).await;
    let (status, body) = app.post(&format!("/api/quests/{id}/complete"), &bram, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["message"].as_str().unwrap().contains("accepted"));
}

#[tokio::test]
async fn reorder_over_http() {
    let app = App::new();
    let a = app.create("A", 1).await;
    let b = app.create("B", 1).await;

    let (status, _) = app
        .post(
            "/api/quests/reorder",
            &app.admin,
            Some(json!({ "status": "OPEN", "orderedIds": [b, a] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.get("/api/quests?status=OPEN", &app.admin).await;
    let ids: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|q| q["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![b.as_str(), a.as_str()]);

    let (status, _) = app
        .post(
            "/api/quests/reorder",
            &app.admin,
            Some(json!({ "status": "OPEN", "orderedIds": [] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/quests/reorder",
            &app.admin,
            Some(json!({ "orderedIds": [a] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admin_member_review() {
    let app = App::new();
    let (recruit, recruit_token) = app.member("Recruit", MembershipStatus::Pending);

    let (status, body) = app.get("/api/admin/members", &app.admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"][0]["display_name"], "Recruit");

    let (status, _) = app
        .post(
            &format!("/api/admin/members/{}", recruit.id),
            &app.admin,
            Some(json!({ "status": "PENDING" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            &format!("/api/admin/members/{}", recruit.id),
            &app.admin,
            Some(json!({ "status": "APPROVED" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get("/api/quests?status=OPEN", &recruit_token).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get("/api/admin/members", &recruit_token).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn deciding_unknown_member_is_404() {
    let app = App::new();
    let (status, _) = app
        .post(
            &format!("/api/admin/members/{}", uuid::Uuid::new_v4()),
            &app.admin,
            Some(json!({ "status": "REJECTED" })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn archive_starts_empty() {
    let app = App::new();
    let (status, body) = app.get("/api/quests/archive", &app.admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "items": [] }));
}
