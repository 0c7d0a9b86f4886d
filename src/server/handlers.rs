use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{HeaderMap, header::AUTHORIZATION},
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::{Value, json};

use super::AppState;
use super::error::ApiError;
use crate::auth::token;
use crate::domain::deadline::DeadlineFilter;
use crate::domain::{Member, MembershipStatus, QuestId, QuestStatus, UserId};
use crate::members;
use crate::quests::{CreateQuest, LaneQuery};

type ApiResult = Result<Json<Value>, ApiError>;

fn ok() -> ApiResult {
    Ok(Json(json!({ "ok": true })))
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(token::from_bearer)
}

async fn caller(state: &AppState, headers: &HeaderMap) -> Result<Member, ApiError> {
    Ok(state.board.authenticate(bearer(headers)).await?)
}

pub async fn health() -> Json<Value> {
    Json(json!({ "ok": true }))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    status: Option<QuestStatus>,
    #[serde(default)]
    deadline: DeadlineFilter,
    date: Option<NaiveDate>,
}

pub async fn list_quests(
    State(state): State<AppState>,
    headers: HeaderMap,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult {
    let member = caller(&state, &headers).await?;
    let Query(params) = params?;
    let status = params
        .status
        .ok_or_else(|| ApiError::bad_request("status is required"))?;

    let items = state
        .board
        .list(
            LaneQuery {
                status,
                deadline: params.deadline,
                date: params.date,
            },
            &member,
        )
        .await?;
    Ok(Json(json!({ "items": items })))
}

pub async fn create_quest(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<CreateQuest>, JsonRejection>,
) -> ApiResult {
    let member = caller(&state, &headers).await?;
    let Json(input) = body?;
    let quest = state.board.create(input, &member).await?;
    Ok(Json(json!({ "ok": true, "id": quest.id })))
}

pub async fn accept_quest(
    State(state): State<AppState>,
    headers: HeaderMap,
    id: Result<Path<QuestId>, PathRejection>,
) -> ApiResult {
    let member = caller(&state, &headers).await?;
    let Path(id) = id?;
    state.board.accept(id, &member).await?;
    ok()
}

pub async fn unaccept_quest(
    State(state): State<AppState>,
    headers: HeaderMap,
    id: Result<Path<QuestId>, PathRejection>,
) -> ApiResult {
    let member = caller(&state, &headers).await?;
    let Path(id) = id?;
    state.board.unaccept(id, &member).await?;
    ok()
}

pub async fn complete_quest(
    State(state): State<AppState>,
    headers: HeaderMap,
    id: Result<Path<QuestId>, PathRejection>,
) -> ApiResult {
    let member = caller(&state, &headers).await?;
    let Path(id) = id?;
    state.board.complete(id, &member).await?;
    ok()
}

pub async fn reopen_quest(
    State(state): State<AppState>,
    headers: HeaderMap,
    id: Result<Path<QuestId>, PathRejection>,
) -> ApiResult {
    let member = caller(&state, &headers).await?;
    let Path(id) = id?;
    state.board.reopen(id, &member).await?;
    ok()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderBody {
    status: Option<QuestStatus>,
    ordered_ids: Option<Vec<QuestId>>,
}

pub async fn reorder_quests(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<ReorderBody>, JsonRejection>,
) -> ApiResult {
    let member = caller(&state, &headers).await?;
    let Json(body) = body?;
    let (Some(status), Some(ordered)) = (body.status, body.ordered_ids) else {
        return Err(ApiError::bad_request("status and orderedIds are required"));
    };
    state.board.reorder(status, &ordered, &member).await?;
    ok()
}

pub async fn archived_quests(State(state): State<AppState>, headers: HeaderMap) -> ApiResult {
    let member = caller(&state, &headers).await?;
    let items = state.board.archive(&member).await?;
    Ok(Json(json!({ "items": items })))
}

pub async fn achievements(State(state): State<AppState>, headers: HeaderMap) -> ApiResult {
    let member = caller(&state, &headers).await?;
    let items = state.board.achievements(&member).await?;
    Ok(Json(json!({ "items": items })))
}

pub async fn pending_members(State(state): State<AppState>, headers: HeaderMap) -> ApiResult {
    let member = caller(&state, &headers).await?;
    let items = members::list_pending(state.board.store(), &member).await?;
    Ok(Json(json!({ "items": items })))
}

#[derive(Debug, Deserialize)]
pub struct DecisionBody {
    status: MembershipStatus,
}

pub async fn decide_member(
    State(state): State<AppState>,
    headers: HeaderMap,
    id: Result<Path<UserId>, PathRejection>,
    body: Result<Json<DecisionBody>, JsonRejection>,
) -> ApiResult {
    let member = caller(&state, &headers).await?;
    let Path(id) = id?;
    let Json(body) = body?;
    members::set_status(
        state.board.store(),
        state.board.events(),
        id,
        body.status,
        &member,
    )
    .await?;
    ok()
}

pub async fn me(State(state): State<AppState>, headers: HeaderMap) -> ApiResult {
    let member = caller(&state, &headers).await?;
    let profile = members::me(state.board.store(), &member).await?;
    Ok(Json(json!(profile)))
}
