// region:    --- Imports
use super::queries;
use crate::auction::model::{Bid, Category, Item};
use crate::authentication::model::{AuthenticationMessage, AuthenticationRequest};
use crate::database::DatabaseManager;
use crate::errors::EngineError;
use crate::notification::Notification;
use tracing::info;

// endregion: --- Imports

// region:    --- Query Handlers

/// 상품 조회
pub async fn get_item(db: &DatabaseManager, item_id: i64) -> Result<Item, EngineError> {
    info!("{:<12} --> 상품 조회 id: {}", "Query", item_id);
    sqlx::query_as::<_, Item>(queries::GET_ITEM)
        .bind(item_id)
        .fetch_optional(db.pool())
        .await?
        .ok_or(EngineError::NotFound)
}

/// 진행 중 경매 목록 조회
pub async fn list_active_items(db: &DatabaseManager) -> Result<Vec<Item>, EngineError> {
    info!("{:<12} --> 진행 중 경매 목록 조회", "Query");
    Ok(sqlx::query_as::<_, Item>(queries::LIST_ACTIVE_ITEMS)
        .fetch_all(db.pool())
        .await?)
}

/// 상품 이름 검색
pub async fn search_items_by_name(
    db: &DatabaseManager,
    term: &str,
) -> Result<Vec<Item>, EngineError> {
    info!("{:<12} --> 상품 검색 term: {}", "Query", term);
    Ok(sqlx::query_as::<_, Item>(queries::SEARCH_ITEMS_BY_NAME)
        .bind(term)
        .fetch_all(db.pool())
        .await?)
}

/// 최고 입찰 조회
pub async fn highest_bid(db: &DatabaseManager, item_id: i64) -> Result<Option<Bid>, EngineError> {
    info!("{:<12} --> 최고 입찰 조회 id: {}", "Query", item_id);
    Ok(sqlx::query_as::<_, Bid>(queries::GET_HIGHEST_BID)
        .bind(item_id)
        .fetch_optional(db.pool())
        .await?)
}

/// 상품 입찰 이력 조회
pub async fn bids_for(db: &DatabaseManager, item_id: i64) -> Result<Vec<Bid>, EngineError> {
    info!("{:<12} --> 입찰 이력 조회 id: {}", "Query", item_id);
    Ok(sqlx::query_as::<_, Bid>(queries::GET_BIDS_FOR)
        .bind(item_id)
        .fetch_all(db.pool())
        .await?)
}

/// 전문가의 검토 대기 감정 요청 조회
pub async fn list_pending_for_expert(
    db: &DatabaseManager,
    expert_id: i64,
) -> Result<Vec<AuthenticationRequest>, EngineError> {
    info!(
        "{:<12} --> 검토 대기 감정 요청 조회 expert: {}",
        "Query", expert_id
    );
    Ok(
        sqlx::query_as::<_, AuthenticationRequest>(queries::LIST_PENDING_FOR_EXPERT)
            .bind(expert_id)
            .fetch_all(db.pool())
            .await?,
    )
}

/// 감정 요청 대화 내역 조회
pub async fn messages_for_request(
    db: &DatabaseManager,
    request_id: i64,
) -> Result<Vec<AuthenticationMessage>, EngineError> {
    info!(
        "{:<12} --> 감정 대화 내역 조회 request: {}",
        "Query", request_id
    );
    Ok(
        sqlx::query_as::<_, AuthenticationMessage>(queries::LIST_MESSAGES_FOR_REQUEST)
            .bind(request_id)
            .fetch_all(db.pool())
            .await?,
    )
}

/// 사용자 알림 조회
pub async fn list_notifications(
    db: &DatabaseManager,
    user_id: i64,
) -> Result<Vec<Notification>, EngineError> {
    info!("{:<12} --> 알림 조회 user: {}", "Query", user_id);
    Ok(sqlx::query_as::<_, Notification>(queries::LIST_NOTIFICATIONS)
        .bind(user_id)
        .fetch_all(db.pool())
        .await?)
}

/// 카테고리 목록 조회
pub async fn list_categories(db: &DatabaseManager) -> Result<Vec<Category>, EngineError> {
    info!("{:<12} --> 카테고리 목록 조회", "Query");
    Ok(sqlx::query_as::<_, Category>(queries::LIST_CATEGORIES)
        .fetch_all(db.pool())
        .await?)
}

// endregion: --- Query Handlers
