use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{Json, Router};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use uuid::Uuid;

use guildboard::domain::{
    Difficulty, GuildRole, Member, MembershipStatus, NewQuest, PinVariant, QuestPatch,
    QuestStatus, UserProfile, VisualSeed,
};
use guildboard::error::GuildError;
use guildboard::events::EventBus;
use guildboard::members;
use guildboard::quests::QuestBoard;
use guildboard::store::GuildStore;
use guildboard::store::postgrest::PostgrestStore;

/// One request as the backend saw it.
#[derive(Debug, Clone)]
struct Seen {
    method: Method,
    path: String,
    query: String,
    headers: HeaderMap,
    body: Value,
}

impl Seen {
    fn header(&self, name: &str) -> &str {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }
}

/// Canned PostgREST: answers by method and path and records every request.
#[derive(Clone, Default)]
struct Backend {
    replies: Arc<Mutex<HashMap<(Method, String), (StatusCode, Value)>>>,
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl Backend {
    async fn start(&self) -> PostgrestStore {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().fallback(answer).with_state(self.clone());
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        PostgrestStore::new(&format!("http://{addr}"), "service-key").unwrap()
    }

    fn reply(&self, method: Method, path: &str, status: StatusCode, body: Value) {
        self.replies
            .lock()
            .unwrap()
            .insert((method, path.to_string()), (status, body));
    }

    fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }

    fn requests_to(&self, method: Method, path: &str) -> Vec<Seen> {
        self.seen()
            .into_iter()
            .filter(|s| s.method == method && s.path == path)
            .collect()
    }
}

async fn answer(
    State(backend): State<Backend>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    backend.seen.lock().unwrap().push(Seen {
        method: method.clone(),
        path: path.clone(),
        query: uri.query().unwrap_or_default().to_string(),
        headers,
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    });

    let reply = backend.replies.lock().unwrap().get(&(method, path)).cloned();
    match reply {
        Some((status, body)) => (status, Json(body)).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({ "message": "no route" }))).into_response(),
    }
}

fn member(role: GuildRole) -> Member {
    Member {
        profile: UserProfile {
            id: Uuid::new_v4(),
            display_name: "Asha".to_string(),
            role,
            membership_status: MembershipStatus::Approved,
            total_xp: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        },
    }
}

fn quest_row(id: Uuid, status: QuestStatus, created_by: Uuid) -> Value {
    json!({
        "id": id,
        "title": "Deliver the ale",
        "detail": null,
        "difficulty": 2,
        "status": status,
        "due_date": null,
        "position": 0,
        "parchment_variant": 3,
        "pin_variant": "RED_PUSHPIN",
        "pin_offset_px": 1,
        "created_by": created_by,
        "completed_by": null,
        "completed_at": null,
        "archived_at": null,
        "created_at": "2026-10-18T08:30:12+00:00",
        "updated_at": "2026-10-18T08:30:12+00:00"
    })
}

// ── Row counts from return=representation ─────────────────────────

#[tokio::test]
async fn membership_decision_counts_returned_rows() {
    let backend = Backend::default();
    let store = backend.start().await;
    let admin = member(GuildRole::Admin);
    let recruit = Uuid::new_v4();
    let events = EventBus::default();

    backend.reply(
        Method::PATCH,
        "/rest/v1/user_profiles",
        StatusCode::OK,
        json!([{ "id": recruit, "membership_status": "APPROVED" }]),
    );
    members::set_status(&store, &events, recruit, MembershipStatus::Approved, &admin)
        .await
        .unwrap();

    let patch = &backend.requests_to(Method::PATCH, "/rest/v1/user_profiles")[0];
    assert_eq!(patch.header("prefer"), "return=representation");
    assert_eq!(patch.header("apikey"), "service-key");
    assert!(patch.query.contains(&format!("id=eq.{recruit}")));
    assert_eq!(patch.body, json!({ "membership_status": "APPROVED" }));

    backend.reply(
        Method::PATCH,
        "/rest/v1/user_profiles",
        StatusCode::OK,
        json!([]),
    );
    let err = members::set_status(&store, &events, recruit, MembershipStatus::Rejected, &admin)
        .await
        .unwrap_err();
    assert!(matches!(err, GuildError::NotFound(_)));
}

#[tokio::test]
async fn conditional_update_filters_on_expected_status() {
    let backend = Backend::default();
    let store = backend.start().await;
    let quest = Uuid::new_v4();

    backend.reply(Method::PATCH, "/rest/v1/quests", StatusCode::OK, json!([]));
    let changed = store
        .update_quest(quest, Some(QuestStatus::Doing), QuestPatch::status(QuestStatus::Open))
        .await
        .unwrap();
    assert_eq!(changed, 0);

    let patch = &backend.requests_to(Method::PATCH, "/rest/v1/quests")[0];
    assert!(patch.query.contains(&format!("id=eq.{quest}")));
    assert!(patch.query.contains("status=eq.DOING"));
    assert_eq!(patch.body["status"], "OPEN");
    assert!(patch.body["updated_at"].is_string());
}

#[tokio::test]
async fn complete_that_loses_the_race_moves_no_xp() {
    let backend = Backend::default();
    let store = backend.start().await;
    let admin = member(GuildRole::Admin);
    let hero = member(GuildRole::Member);
    let quest = Uuid::new_v4();

    backend.reply(
        Method::GET,
        "/rest/v1/quests",
        StatusCode::OK,
        json!([quest_row(quest, QuestStatus::Doing, admin.id())]),
    );
    backend.reply(
        Method::GET,
        "/rest/v1/quest_acceptances",
        StatusCode::OK,
        json!([{ "quest_id": quest, "user_id": hero.id(), "accepted_at": "2026-10-18T09:00:00Z" }]),
    );
    backend.reply(Method::PATCH, "/rest/v1/quests", StatusCode::OK, json!([]));

    let board = QuestBoard::new(Arc::new(store), Arc::new(EventBus::default()));
    let err = board.complete(quest, &hero).await.unwrap_err();
    assert!(matches!(err, GuildError::BadRequest(_)));
    assert!(
        backend
            .requests_to(Method::POST, "/rest/v1/rpc/increment_user_xp")
            .is_empty()
    );
    assert!(
        backend
            .requests_to(Method::POST, "/rest/v1/quest_achievement_logs")
            .is_empty()
    );
}

#[tokio::test]
async fn complete_credits_xp_through_rpc() {
    let backend = Backend::default();
    let store = backend.start().await;
    let admin = member(GuildRole::Admin);
    let hero = member(GuildRole::Member);
    let quest = Uuid::new_v4();
    let row = quest_row(quest, QuestStatus::Doing, admin.id());

    backend.reply(Method::GET, "/rest/v1/quests", StatusCode::OK, json!([row.clone()]));
    backend.reply(
        Method::GET,
        "/rest/v1/quest_acceptances",
        StatusCode::OK,
        json!([{ "quest_id": quest, "user_id": hero.id(), "accepted_at": "2026-10-18T09:00:00Z" }]),
    );
    backend.reply(Method::PATCH, "/rest/v1/quests", StatusCode::OK, json!([row]));
    backend.reply(
        Method::POST,
        "/rest/v1/rpc/increment_user_xp",
        StatusCode::OK,
        Value::Null,
    );
    backend.reply(
        Method::POST,
        "/rest/v1/quest_audit_logs",
        StatusCode::CREATED,
        Value::Null,
    );
    backend.reply(
        Method::POST,
        "/rest/v1/quest_achievement_logs",
        StatusCode::CREATED,
        Value::Null,
    );

    let board = QuestBoard::new(Arc::new(store), Arc::new(EventBus::default()));
    board.complete(quest, &hero).await.unwrap();

    let rpc = &backend.requests_to(Method::POST, "/rest/v1/rpc/increment_user_xp")[0];
    assert_eq!(
        rpc.body,
        json!({ "user_id_param": hero.id(), "amount_param": 20 })
    );
    let audit = &backend.requests_to(Method::POST, "/rest/v1/quest_audit_logs")[0];
    assert_eq!(audit.header("prefer"), "return=minimal");
    assert_eq!(audit.body["action"], "COMPLETED");
    assert_eq!(audit.body["meta"], json!({ "xp": 20 }));
}

// ── Token resolution ──────────────────────────────────────────────

#[tokio::test]
async fn auth_rejections_resolve_to_no_user() {
    let backend = Backend::default();
    let store = backend.start().await;

    for status in [StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN] {
        backend.reply(
            Method::GET,
            "/auth/v1/user",
            status,
            json!({ "message": "invalid JWT" }),
        );
        assert_eq!(store.resolve_token("member-token").await.unwrap(), None);
    }

    let seen = &backend.requests_to(Method::GET, "/auth/v1/user")[0];
    assert_eq!(seen.header("authorization"), "Bearer member-token");
    assert_eq!(seen.header("apikey"), "service-key");
}

#[tokio::test]
async fn auth_success_yields_user_id() {
    let backend = Backend::default();
    let store = backend.start().await;
    let id = Uuid::new_v4();

    backend.reply(
        Method::GET,
        "/auth/v1/user",
        StatusCode::OK,
        json!({ "id": id, "email": "asha@guild.test" }),
    );
    assert_eq!(store.resolve_token("member-token").await.unwrap(), Some(id));
}

#[tokio::test]
async fn auth_outage_is_an_error() {
    let backend = Backend::default();
    let store = backend.start().await;

    backend.reply(
        Method::GET,
        "/auth/v1/user",
        StatusCode::BAD_GATEWAY,
        json!({ "message": "upstream down" }),
    );
    let err = store.resolve_token("member-token").await.unwrap_err();
    assert!(err.to_string().contains("upstream down"));
}

#[tokio::test]
async fn rejected_token_closes_the_gate() {
    let backend = Backend::default();
    let store = backend.start().await;
    backend.reply(
        Method::GET,
        "/auth/v1/user",
        StatusCode::UNAUTHORIZED,
        json!({ "message": "invalid JWT" }),
    );

    let board = QuestBoard::new(Arc::new(store), Arc::new(EventBus::default()));
    let err = board.authenticate(Some("expired")).await.unwrap_err();
    assert!(matches!(err, GuildError::Unauthenticated));
    assert!(backend.requests_to(Method::GET, "/rest/v1/user_profiles").is_empty());
}

// ── Failures and inserts ──────────────────────────────────────────

#[tokio::test]
async fn non_success_status_is_an_error() {
    let backend = Backend::default();
    let store = backend.start().await;
    backend.reply(
        Method::GET,
        "/rest/v1/quests",
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({ "message": "boom" }),
    );

    let err = store.lane(QuestStatus::Open).await.unwrap_err().to_string();
    assert!(err.contains("backend error on quests"), "{err}");
    assert!(err.contains("500"), "{err}");
    assert!(err.contains("boom"), "{err}");

    let board = QuestBoard::new(Arc::new(store), Arc::new(EventBus::default()));
    let err = board
        .complete(Uuid::new_v4(), &member(GuildRole::Member))
        .await
        .unwrap_err();
    assert!(matches!(err, GuildError::Store(_)));
}

#[tokio::test]
async fn insert_returns_the_stored_row() {
    let backend = Backend::default();
    let store = backend.start().await;
    let admin = member(GuildRole::Admin);
    let id = Uuid::new_v4();

    backend.reply(
        Method::POST,
        "/rest/v1/quests",
        StatusCode::CREATED,
        json!([quest_row(id, QuestStatus::Open, admin.id())]),
    );
    let quest = store
        .insert_quest(NewQuest {
            title: "Deliver the ale".to_string(),
            detail: None,
            difficulty: Difficulty::clamped(2),
            status: QuestStatus::Open,
            due_date: None,
            position: 0,
            visual: VisualSeed {
                parchment_variant: 3,
                pin_variant: PinVariant::RedPushpin,
                pin_offset_px: 1,
            },
            created_by: admin.id(),
        })
        .await
        .unwrap();
    assert_eq!(quest.id, id);
    assert_eq!(quest.status, QuestStatus::Open);
    assert_eq!(quest.created_by, admin.id());

    let post = &backend.requests_to(Method::POST, "/rest/v1/quests")[0];
    assert_eq!(post.header("prefer"), "return=representation");
    assert_eq!(post.body["title"], "Deliver the ale");
    assert_eq!(post.body["pin_variant"], "RED_PUSHPIN");
    assert_eq!(post.body["created_by"], json!(admin.id()));
}

#[tokio::test]
async fn insert_without_returned_row_is_an_error() {
    let backend = Backend::default();
    let store = backend.start().await;
    backend.reply(Method::POST, "/rest/v1/quests", StatusCode::CREATED, json!([]));

    let err = store
        .insert_quest(NewQuest {
            title: "Ghost".to_string(),
            detail: None,
            difficulty: Difficulty::clamped(1),
            status: QuestStatus::Open,
            due_date: None,
            position: 0,
            visual: VisualSeed {
                parchment_variant: 1,
                pin_variant: PinVariant::RedPushpin,
                pin_offset_px: 0,
            },
            created_by: Uuid::new_v4(),
        })
        .await
        .unwrap_err();
    assert!(err.to_string().contains("no row"));
}
