/// 웹 계층 글루: 엔진 연산을 JSON API로 노출한다
/// 렌더링/세션 등은 범위 밖이며 여기서는 타입된 오류를 그대로 응답으로 변환만 한다
// region:    --- Imports
use crate::auction::commands::{
    self, ClosedBatch, ListItemCommand, PlaceBidCommand,
};
use crate::auction::model::{Bid, Category, Item};
use crate::authentication::model::{AuthenticationMessage, AuthenticationRequest, Decision};
use crate::authentication::workflow;
use crate::database::DatabaseManager;
use crate::email::EmailSender;
use crate::errors::EngineError;
use crate::identity::{self, NewUser, User};
use crate::notification::{self, Notification};
use crate::payment::{self, FeeQuote, Payment};
use crate::query;
use crate::settings;
use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;

// endregion: --- Imports

// region:    --- App State

pub type AppState = (Arc<DatabaseManager>, Arc<dyn EmailSender>);

// endregion: --- App State

// region:    --- Command Handlers

/// 상품 등록
pub async fn handle_list_item(
    State((db, _)): State<AppState>,
    Json(cmd): Json<ListItemCommand>,
) -> Result<Json<Item>, EngineError> {
    Ok(Json(commands::list_item(&db, cmd).await?))
}

#[derive(Debug, Deserialize)]
pub struct RemoveItemRequest {
    pub requester_id: i64,
}

/// 상품 삭제
pub async fn handle_remove_item(
    State((db, _)): State<AppState>,
    Path(item_id): Path<i64>,
    Json(req): Json<RemoveItemRequest>,
) -> Result<Json<serde_json::Value>, EngineError> {
    commands::remove_item(&db, item_id, req.requester_id).await?;
    Ok(Json(serde_json::json!({ "removed": item_id })))
}

/// 입찰
pub async fn handle_place_bid(
    State((db, _)): State<AppState>,
    Json(cmd): Json<PlaceBidCommand>,
) -> Result<Json<Bid>, EngineError> {
    Ok(Json(commands::place_bid(&db, cmd).await?))
}

/// 만료 경매 수동 마감 (운영용, 스윕과 같은 경로를 쓴다)
pub async fn handle_run_sweep(
    State((db, mailer)): State<AppState>,
) -> Result<Json<ClosedBatch>, EngineError> {
    Ok(Json(
        commands::close_expired_auctions(&db, &mailer, Utc::now()).await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct AssignExpertRequest {
    pub expert_id: i64,
    pub assigner_id: i64,
}

/// 전문가 배정
pub async fn handle_assign_expert(
    State((db, _)): State<AppState>,
    Path(request_id): Path<i64>,
    Json(req): Json<AssignExpertRequest>,
) -> Result<Json<AuthenticationRequest>, EngineError> {
    let assigner = identity::principal_for(&db, req.assigner_id).await?;
    Ok(Json(
        workflow::assign_expert(&db, request_id, req.expert_id, assigner).await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub decider_id: i64,
    pub outcome: Decision,
    pub reason: Option<String>,
}

/// 감정 결정
pub async fn handle_decide(
    State((db, _)): State<AppState>,
    Path(request_id): Path<i64>,
    Json(req): Json<DecisionRequest>,
) -> Result<Json<AuthenticationRequest>, EngineError> {
    let decider = identity::principal_for(&db, req.decider_id).await?;
    Ok(Json(
        workflow::decide(&db, request_id, decider, req.outcome, req.reason).await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub sender_id: i64,
    pub body: String,
}

/// 감정 대화 메시지 작성
pub async fn handle_post_message(
    State((db, _)): State<AppState>,
    Path(request_id): Path<i64>,
    Json(req): Json<PostMessageRequest>,
) -> Result<Json<AuthenticationMessage>, EngineError> {
    Ok(Json(
        workflow::post_message(&db, request_id, req.sender_id, req.body).await?,
    ))
}

#[derive(Debug, Deserialize)]
pub struct SettleRequest {
    pub payer_id: i64,
}

/// 결제 정산
pub async fn handle_settle(
    State((db, _)): State<AppState>,
    Path(item_id): Path<i64>,
    Json(req): Json<SettleRequest>,
) -> Result<Json<Payment>, EngineError> {
    Ok(Json(payment::settle(&db, item_id, req.payer_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct SetSettingRequest {
    pub user_id: i64,
    pub value: String,
}

/// 설정 기록 (관리자 전용)
pub async fn handle_set_setting(
    State((db, _)): State<AppState>,
    Path(name): Path<String>,
    Json(req): Json<SetSettingRequest>,
) -> Result<Json<serde_json::Value>, EngineError> {
    let principal = identity::principal_for(&db, req.user_id).await?;
    settings::set(&db, principal, &name, &req.value).await?;
    Ok(Json(serde_json::json!({ "name": name, "value": req.value })))
}

/// 사용자 생성 (중복 검사 포함)
pub async fn handle_create_user(
    State((db, _)): State<AppState>,
    Json(new_user): Json<NewUser>,
) -> Result<Json<User>, EngineError> {
    Ok(Json(identity::create_user(&db, new_user).await?))
}

#[derive(Debug, Deserialize)]
pub struct MarkReadRequest {
    pub user_id: i64,
}

/// 알림 읽음 처리
pub async fn handle_mark_notification_read(
    State((db, _)): State<AppState>,
    Path(notification_id): Path<i64>,
    Json(req): Json<MarkReadRequest>,
) -> Result<Json<serde_json::Value>, EngineError> {
    notification::mark_read(&db, req.user_id, notification_id).await?;
    Ok(Json(serde_json::json!({ "read": notification_id })))
}

// endregion: --- Command Handlers

// region:    --- Query Handlers

/// 상품 조회
pub async fn handle_get_item(
    State((db, _)): State<AppState>,
    Path(item_id): Path<i64>,
) -> Result<Json<Item>, EngineError> {
    Ok(Json(query::handlers::get_item(&db, item_id).await?))
}

/// 진행 중 경매 목록 조회
pub async fn handle_list_active_items(
    State((db, _)): State<AppState>,
) -> Result<Json<Vec<Item>>, EngineError> {
    Ok(Json(query::handlers::list_active_items(&db).await?))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: String,
}

/// 상품 검색
pub async fn handle_search_items(
    State((db, _)): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Item>>, EngineError> {
    Ok(Json(
        query::handlers::search_items_by_name(&db, &params.query).await?,
    ))
}

/// 최고 입찰 조회
pub async fn handle_get_highest_bid(
    State((db, _)): State<AppState>,
    Path(item_id): Path<i64>,
) -> Result<Json<Option<Bid>>, EngineError> {
    Ok(Json(query::handlers::highest_bid(&db, item_id).await?))
}

/// 입찰 이력 조회
pub async fn handle_get_item_bids(
    State((db, _)): State<AppState>,
    Path(item_id): Path<i64>,
) -> Result<Json<Vec<Bid>>, EngineError> {
    Ok(Json(query::handlers::bids_for(&db, item_id).await?))
}

/// 수수료 견적 조회
pub async fn handle_compute_fee(
    State((db, _)): State<AppState>,
    Path(item_id): Path<i64>,
) -> Result<Json<FeeQuote>, EngineError> {
    let item = query::handlers::get_item(&db, item_id).await?;
    Ok(Json(payment::compute_fee(&db, &item).await?))
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityRequest {
    pub user_id: i64,
    pub day_of_week: i32,
    pub start_hour: i32,
    pub end_hour: i32,
}

/// 전문가 가용 시간대 등록
pub async fn handle_add_availability(
    State((db, _)): State<AppState>,
    Path(expert_id): Path<i64>,
    Json(req): Json<AvailabilityRequest>,
) -> Result<Json<identity::ExpertAvailability>, EngineError> {
    if req.user_id != expert_id {
        return Err(EngineError::AccessDenied);
    }
    let principal = identity::principal_for(&db, req.user_id).await?;
    Ok(Json(
        identity::add_availability(&db, principal, req.day_of_week, req.start_hour, req.end_hour)
            .await?,
    ))
}

/// 전문가 가용 시간대 조회
pub async fn handle_list_availability(
    State((db, _)): State<AppState>,
    Path(expert_id): Path<i64>,
) -> Result<Json<Vec<identity::ExpertAvailability>>, EngineError> {
    Ok(Json(identity::availability_for(&db, expert_id).await?))
}

/// 전문가의 검토 대기 감정 요청 조회
pub async fn handle_list_pending_for_expert(
    State((db, _)): State<AppState>,
    Path(expert_id): Path<i64>,
) -> Result<Json<Vec<AuthenticationRequest>>, EngineError> {
    Ok(Json(
        query::handlers::list_pending_for_expert(&db, expert_id).await?,
    ))
}

/// 감정 대화 내역 조회
pub async fn handle_get_request_messages(
    State((db, _)): State<AppState>,
    Path(request_id): Path<i64>,
) -> Result<Json<Vec<AuthenticationMessage>>, EngineError> {
    Ok(Json(
        query::handlers::messages_for_request(&db, request_id).await?,
    ))
}

/// 사용자 알림 조회
pub async fn handle_list_notifications(
    State((db, _)): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<Vec<Notification>>, EngineError> {
    Ok(Json(query::handlers::list_notifications(&db, user_id).await?))
}

/// 카테고리 목록 조회
pub async fn handle_list_categories(
    State((db, _)): State<AppState>,
) -> Result<Json<Vec<Category>>, EngineError> {
    Ok(Json(query::handlers::list_categories(&db).await?))
}

// endregion: --- Query Handlers
