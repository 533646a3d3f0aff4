/// 감정 워크플로 커맨드 처리
/// 1. 전문가 배정
/// 2. 감정 결정 (승인 / 거절 / 재감정)
/// 3. 대화 메시지
// region:    --- Imports
use crate::auction::model::{ensure_transition, ItemStatus};
use crate::authentication::model::{
    expert_matches_category, AuthenticationMessage, AuthenticationRequest, Decision, RequestStatus,
};
use crate::database::DatabaseManager;
use crate::errors::EngineError;
use crate::identity::Principal;
use crate::notification::{self, NotificationKind};
use chrono::{DateTime, Utc};
use sqlx::{Postgres, Transaction};
use tracing::info;

// endregion: --- Imports

// region:    --- Assign Expert

/// 전문가 배정 (관리자 전용)
/// 후보 전문가의 전문 분야가 상품 카테고리와 일치하지 않으면 NoEligibleExpert
/// SECOND_OPINION 상태의 요청은 재배정되며 PENDING으로 되돌아간다
pub async fn assign_expert(
    db: &DatabaseManager,
    request_id: i64,
    expert_id: i64,
    assigner: Principal,
) -> Result<AuthenticationRequest, EngineError> {
    info!(
        "{:<12} --> 전문가 배정 요청 request: {} expert: {}",
        "AuthFlow", request_id, expert_id
    );
    if !assigner.is_manager() {
        return Err(EngineError::AccessDenied);
    }
    let assigner_id = assigner.user_id().ok_or(EngineError::AccessDenied)?;

    db.transaction(|tx| {
        Box::pin(async move {
            let request = lock_request(tx, request_id).await?;
            match request.status()? {
                RequestStatus::Pending | RequestStatus::SecondOpinion => {}
                _ => return Err(EngineError::InvalidState),
            }

            // 전문가의 선언 분야와 상품 카테고리 대조
            let expertise: Option<Option<String>> = sqlx::query_scalar(
                "SELECT expertise FROM users WHERE id = $1 AND role = 2",
            )
            .bind(expert_id)
            .fetch_optional(&mut **tx)
            .await?;
            let expertise = expertise.ok_or(EngineError::NoEligibleExpert)?;

            let category_name: String = sqlx::query_scalar(
                "SELECT c.name FROM items i JOIN categories c ON c.id = i.category_id
                 WHERE i.id = $1",
            )
            .bind(request.item_id)
            .fetch_one(&mut **tx)
            .await?;

            if !expert_matches_category(expertise.as_deref(), &category_name) {
                return Err(EngineError::NoEligibleExpert);
            }

            let updated = sqlx::query_as::<_, AuthenticationRequest>(
                "UPDATE authentication_requests
                 SET expert_id = $1, status = 'PENDING', updated_at = $2
                 WHERE id = $3
                 RETURNING *",
            )
            .bind(expert_id)
            .bind(Utc::now())
            .bind(request_id)
            .fetch_one(&mut **tx)
            .await?;

            let expert_name: String = sqlx::query_scalar("SELECT username FROM users WHERE id = $1")
                .bind(expert_id)
                .fetch_one(&mut **tx)
                .await?;
            append_message(
                tx,
                request_id,
                assigner_id,
                &format!("Expert {} has been assigned to review this item.", expert_name),
            )
            .await?;

            notification::notify(
                tx,
                expert_id,
                Some(request.item_id),
                NotificationKind::Authentication,
                "You have been assigned an item to authenticate.",
            )
            .await?;

            Ok(updated)
        })
    })
    .await
}

// endregion: --- Assign Expert

// region:    --- Decide

/// 감정 결정 (배정된 전문가 전용)
/// APPROVED는 is_authenticated를 세우고, REJECTED는 플래그만 내린다
/// 두 경우 모두 상품은 ACTIVE로 시장에 풀린다 (거절이 판매를 막지 않는다)
/// SECOND_OPINION은 요청을 재배정 대기로 돌리고 상품은 PENDING에 머문다
pub async fn decide(
    db: &DatabaseManager,
    request_id: i64,
    decider: Principal,
    outcome: Decision,
    reason: Option<String>,
) -> Result<AuthenticationRequest, EngineError> {
    info!(
        "{:<12} --> 감정 결정 요청 request: {} outcome: {:?}",
        "AuthFlow", request_id, outcome
    );
    let decider_id = decider.user_id().ok_or(EngineError::AccessDenied)?;
    if !decider.is_expert() {
        return Err(EngineError::AccessDenied);
    }

    db.transaction(|tx| {
        Box::pin(async move {
            let request = lock_request(tx, request_id).await?;
            if request.expert_id != Some(decider_id) {
                return Err(EngineError::AccessDenied);
            }
            if request.status()? != RequestStatus::Pending {
                return Err(EngineError::InvalidState);
            }

            // 상품 행도 잠근다: 상태 전이는 언제나 잠금 아래에서만
            let (item_status, end_time): (String, Option<DateTime<Utc>>) =
                sqlx::query_as("SELECT status, end_time FROM items WHERE id = $1 FOR UPDATE")
                    .bind(request.item_id)
                    .fetch_one(&mut **tx)
                    .await?;
            let item_status: ItemStatus = item_status.parse()?;

            let now = Utc::now();
            // 마감 이후에 도착한 결정은 start_time을 건드리지 않는다 (end_time > start_time 유지)
            let new_start: Option<DateTime<Utc>> =
                end_time.map_or(true, |end| end > now).then_some(now);
            let (request_status, seller_message) = match outcome {
                Decision::Approved => {
                    ensure_transition(item_status, ItemStatus::Active)?;
                    sqlx::query(
                        "UPDATE items SET is_authenticated = TRUE, status = $1,
                                start_time = COALESCE($2, start_time)
                         WHERE id = $3",
                    )
                    .bind(ItemStatus::Active.to_string())
                    .bind(new_start)
                    .bind(request.item_id)
                    .execute(&mut **tx)
                    .await?;
                    (
                        RequestStatus::Approved,
                        "Your item was authenticated and is now up for auction.",
                    )
                }
                Decision::Rejected => {
                    ensure_transition(item_status, ItemStatus::Active)?;
                    sqlx::query(
                        "UPDATE items SET is_authenticated = FALSE, status = $1,
                                start_time = COALESCE($2, start_time)
                         WHERE id = $3",
                    )
                    .bind(ItemStatus::Active.to_string())
                    .bind(new_start)
                    .bind(request.item_id)
                    .execute(&mut **tx)
                    .await?;
                    (
                        RequestStatus::Rejected,
                        "Authentication was rejected. Your item is listed without the authenticated mark.",
                    )
                }
                Decision::SecondOpinion => (
                    RequestStatus::SecondOpinion,
                    "The expert requested a second opinion. Your item stays in review.",
                ),
            };

            let expert_column = match outcome {
                // 재감정은 전문가 배정으로 되돌아간다
                Decision::SecondOpinion => None,
                _ => request.expert_id,
            };

            let updated = sqlx::query_as::<_, AuthenticationRequest>(
                "UPDATE authentication_requests
                 SET status = $1, expert_id = $2, updated_at = $3
                 WHERE id = $4
                 RETURNING *",
            )
            .bind(request_status.to_string())
            .bind(expert_column)
            .bind(now)
            .bind(request_id)
            .fetch_one(&mut **tx)
            .await?;

            if let Some(reason) = reason.as_deref() {
                append_message(tx, request_id, decider_id, reason).await?;
            }

            notification::notify(
                tx,
                request.requester_id,
                Some(request.item_id),
                NotificationKind::Authentication,
                seller_message,
            )
            .await?;

            Ok(updated)
        })
    })
    .await
}

// endregion: --- Decide

// region:    --- Messages

/// 대화 메시지 작성
/// 배정된 전문가와 요청자만 쓸 수 있으며 상대방에게 알림이 간다
pub async fn post_message(
    db: &DatabaseManager,
    request_id: i64,
    sender_id: i64,
    body: String,
) -> Result<AuthenticationMessage, EngineError> {
    info!(
        "{:<12} --> 감정 메시지 작성 request: {} sender: {}",
        "AuthFlow", request_id, sender_id
    );
    db.transaction(|tx| {
        Box::pin(async move {
            let request = lock_request(tx, request_id).await?;

            let counterpart = if sender_id == request.requester_id {
                request.expert_id
            } else if Some(sender_id) == request.expert_id {
                Some(request.requester_id)
            } else {
                return Err(EngineError::AccessDenied);
            };

            let message = sqlx::query_as::<_, AuthenticationMessage>(
                "INSERT INTO authentication_messages (request_id, sender_id, body)
                 VALUES ($1, $2, $3)
                 RETURNING *",
            )
            .bind(request_id)
            .bind(sender_id)
            .bind(&body)
            .fetch_one(&mut **tx)
            .await?;

            if let Some(counterpart) = counterpart {
                notification::notify(
                    tx,
                    counterpart,
                    Some(request.item_id),
                    NotificationKind::Authentication,
                    "New message on an authentication request.",
                )
                .await?;
            }

            Ok(message)
        })
    })
    .await
}

/// 요청 행 잠금 조회
async fn lock_request(
    tx: &mut Transaction<'_, Postgres>,
    request_id: i64,
) -> Result<AuthenticationRequest, EngineError> {
    sqlx::query_as::<_, AuthenticationRequest>(
        "SELECT * FROM authentication_requests WHERE id = $1 FOR UPDATE",
    )
    .bind(request_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or(EngineError::NotFound)
}

/// 트랜잭션 안에서 대화 메시지 적재
async fn append_message(
    tx: &mut Transaction<'_, Postgres>,
    request_id: i64,
    sender_id: i64,
    body: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO authentication_messages (request_id, sender_id, body) VALUES ($1, $2, $3)",
    )
    .bind(request_id)
    .bind(sender_id)
    .bind(body)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

// endregion: --- Messages
